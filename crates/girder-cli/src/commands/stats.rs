use std::path::Path;

use anyhow::Context;

use girder_core::sqlite::AstStore;

/// Print store statistics.
pub fn run(db: &Path, json: bool) -> anyhow::Result<i32> {
    let store = AstStore::open(db)
        .with_context(|| format!("opening analysis database {}", db.display()))?;
    let stats = store.stats().context("reading store statistics")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("files:                 {}", stats.files);
        println!("nodes:                 {}", stats.nodes);
        println!("relationships:         {}", stats.relationships);
        println!("library nodes:         {}", stats.library_nodes);
        println!("library relationships: {}", stats.library_relationships);
    }
    Ok(0)
}
