pub mod check;
pub mod lint;
pub mod stats;

use std::path::{Path, PathBuf};

use anyhow::Context;
use rayon::prelude::*;

use girder_core::sqlite::AstStore;
use girder_rules::RuleSet;

/// An explicit `--db` wins; otherwise the current directory's database at
/// its default location under the OS user cache directory.
pub fn resolve_db(db: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    match db {
        Some(db) => Ok(db),
        None => {
            let root = std::env::current_dir().context("resolving current directory")?;
            Ok(AstStore::default_db_path(&root))
        }
    }
}

/// One rule file loaded from disk: the parsed set, or everything wrong with
/// it. Parse failures are recoverable per file; they never abort the run.
pub struct LoadedRuleFile {
    pub path: PathBuf,
    pub result: Result<RuleSet, Vec<String>>,
}

/// Read and parse rule files in parallel, preserving input order.
pub fn load_rule_files(files: &[PathBuf]) -> Vec<LoadedRuleFile> {
    files
        .par_iter()
        .map(|path| LoadedRuleFile {
            path: path.clone(),
            result: load_rule_file(path),
        })
        .collect()
}

fn load_rule_file(path: &Path) -> Result<RuleSet, Vec<String>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| vec![format!("{}: {}", path.display(), e)])?;
    girder_rules::parse_rules(&text, &path.to_string_lossy()).map_err(|e| match e {
        girder_rules::RuleParseError::Syntax(diagnostics) => diagnostics
            .errors
            .into_iter()
            .map(|error| error.to_string())
            .collect(),
        girder_rules::RuleParseError::Validation(error) => {
            vec![format!("{}: {}", path.display(), error)]
        }
    })
}
