use std::path::{Path, PathBuf};

use anyhow::Context;

use girder_core::sqlite::AstStore;
use girder_engine::QueryEngine;
use girder_rules::RuleSet;

use super::load_rule_files;

/// Evaluate rule files against an existing analysis database.
///
/// Files that fail to parse are reported and skipped (each rule file is an
/// independent recovery boundary); the remaining rules still evaluate.
/// Exit 0 when clean, 1 when violations were found, 2 when nothing could be
/// evaluated or the store failed.
pub fn run(db: &Path, files: &[PathBuf], json: bool) -> anyhow::Result<i32> {
    let store = AstStore::open(db)
        .with_context(|| format!("opening analysis database {}", db.display()))?;

    let loaded = load_rule_files(files);
    let mut merged = RuleSet::default();
    let mut parse_failures = 0usize;
    for file in loaded {
        match file.result {
            Ok(rules) => merged.rules.extend(rules.rules),
            Err(errors) => {
                parse_failures += 1;
                for error in errors {
                    eprintln!("{error}");
                }
            }
        }
    }
    if merged.rules.is_empty() && parse_failures > 0 {
        anyhow::bail!("no rule file parsed successfully");
    }

    let engine = QueryEngine::new(&store);
    let violations = engine
        .execute(&merged)
        .context("evaluating rules against the store")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&violations)?);
    } else {
        for violation in &violations {
            println!("{violation}");
        }
        println!(
            "{} rule(s), {} violation(s)",
            merged.rules.len(),
            violations.len()
        );
    }

    Ok(if !violations.is_empty() || parse_failures > 0 {
        1
    } else {
        0
    })
}
