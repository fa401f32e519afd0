use std::path::PathBuf;

use serde::Serialize;

use super::load_rule_files;

#[derive(Serialize)]
struct LintReport<'a> {
    path: String,
    ok: bool,
    rules: usize,
    errors: &'a [String],
}

/// Parse and validate rule files. Exit 0 when every file is clean, 1 when
/// any file has errors.
pub fn run(files: &[PathBuf], json: bool) -> anyhow::Result<i32> {
    let loaded = load_rule_files(files);
    let mut failed = false;

    if json {
        let reports: Vec<LintReport> = loaded
            .iter()
            .map(|file| match &file.result {
                Ok(rules) => LintReport {
                    path: file.path.display().to_string(),
                    ok: true,
                    rules: rules.rules.len(),
                    errors: &[],
                },
                Err(errors) => LintReport {
                    path: file.path.display().to_string(),
                    ok: false,
                    rules: 0,
                    errors,
                },
            })
            .collect();
        failed = reports.iter().any(|r| !r.ok);
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for file in &loaded {
            match &file.result {
                Ok(rules) => {
                    println!("{}: ok ({} rules)", file.path.display(), rules.rules.len());
                }
                Err(errors) => {
                    failed = true;
                    for error in errors {
                        eprintln!("{error}");
                    }
                }
            }
        }
    }

    Ok(if failed { 1 } else { 0 })
}
