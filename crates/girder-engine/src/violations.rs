use serde::Serialize;

/// Source tag every engine violation carries.
pub const VIOLATION_SOURCE: &str = "aql";

/// One reported rule violation. Violations are values, never errors; a
/// non-empty list is a finding, not a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// File the violation points at; empty for rule-level violations with no
    /// location.
    pub file: String,
    pub line: u32,
    /// Defaults to 1 when not derivable.
    pub column: u32,
    pub source: String,
    pub message: String,
    /// Name of the rule that produced the violation.
    pub rule: String,
}

impl Violation {
    /// A violation anchored at a source location.
    pub fn at(file: &str, line: u32, rule: &str, message: String) -> Violation {
        Violation {
            file: file.to_string(),
            line,
            column: 1,
            source: VIOLATION_SOURCE.to_string(),
            message,
            rule: rule.to_string(),
        }
    }

    /// A rule-level violation with no file location.
    pub fn rule_level(rule: &str, message: String) -> Violation {
        Violation {
            file: String::new(),
            line: 0,
            column: 1,
            source: VIOLATION_SOURCE.to_string(),
            message,
            rule: rule.to_string(),
        }
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.file.is_empty() {
            write!(f, "{} [{}]", self.message, self.rule)
        } else {
            write!(
                f,
                "{}:{}:{}: {} [{}]",
                self.file, self.line, self.column, self.message, self.rule
            )
        }
    }
}
