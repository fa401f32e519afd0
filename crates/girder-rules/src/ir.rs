//! The rule intermediate representation.
//!
//! Both front ends (the textual DSL and the declarative JSON form) lower to
//! these types; the query engine sees nothing else. Validation lives here so
//! errors from either front end are uniform.

use serde::{Deserialize, Serialize};

/// Numeric metrics a LIMIT condition can compare. Surface aliases
/// (`params`, `len`) canonicalize to these variants at IR construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Cyclomatic,
    Parameters,
    Returns,
    Lines,
    Imports,
    Calls,
    /// Character count of the joined identity `package:type:method:field`.
    #[serde(rename = "len")]
    NameLength,
}

impl Metric {
    /// Parse a surface spelling, including aliases. Case-insensitive.
    pub fn parse(name: &str) -> Option<Metric> {
        match name.to_ascii_lowercase().as_str() {
            "cyclomatic" => Some(Metric::Cyclomatic),
            "parameters" | "params" => Some(Metric::Parameters),
            "returns" => Some(Metric::Returns),
            "lines" => Some(Metric::Lines),
            "imports" => Some(Metric::Imports),
            "calls" => Some(Metric::Calls),
            "len" => Some(Metric::NameLength),
            _ => None,
        }
    }

    /// Canonical spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Cyclomatic => "cyclomatic",
            Metric::Parameters => "parameters",
            Metric::Returns => "returns",
            Metric::Lines => "lines",
            Metric::Imports => "imports",
            Metric::Calls => "calls",
            Metric::NameLength => "len",
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The six comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonOp {
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
}

impl ComparisonOp {
    pub fn parse(symbol: &str) -> Option<ComparisonOp> {
        match symbol {
            ">" => Some(ComparisonOp::Gt),
            "<" => Some(ComparisonOp::Lt),
            ">=" => Some(ComparisonOp::Ge),
            "<=" => Some(ComparisonOp::Le),
            "==" => Some(ComparisonOp::Eq),
            "!=" => Some(ComparisonOp::Ne),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonOp::Gt => ">",
            ComparisonOp::Lt => "<",
            ComparisonOp::Ge => ">=",
            ComparisonOp::Le => "<=",
            ComparisonOp::Eq => "==",
            ComparisonOp::Ne => "!=",
        }
    }

    /// Apply the comparison with IEEE-754 float semantics.
    pub fn compare(&self, lhs: f64, rhs: f64) -> bool {
        match self {
            ComparisonOp::Gt => lhs > rhs,
            ComparisonOp::Lt => lhs < rhs,
            ComparisonOp::Ge => lhs >= rhs,
            ComparisonOp::Le => lhs <= rhs,
            ComparisonOp::Eq => lhs == rhs,
            ComparisonOp::Ne => lhs != rhs,
        }
    }
}

impl std::fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A wildcard-capable matcher over node identity. `None` components are
/// absent and match anything; present components may contain `*` globs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pattern {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric: Option<Metric>,
}

impl Pattern {
    /// The pattern that matches every node.
    pub fn any() -> Pattern {
        Pattern::default()
    }

    /// Lower dotted pattern text segments to components, positionally:
    /// `package.type.method.field`. A lone `*` leaves every component
    /// absent.
    pub fn from_segments(segments: &[String]) -> Result<Pattern, String> {
        if segments.len() > 4 {
            return Err(format!(
                "pattern has {} segments, at most 4 (package.type.method.field) are allowed",
                segments.len()
            ));
        }
        if segments.len() == 1 && segments[0] == "*" {
            return Ok(Pattern::any());
        }
        let mut pattern = Pattern::default();
        let mut slots = [
            &mut pattern.package,
            &mut pattern.type_name,
            &mut pattern.method,
            &mut pattern.field,
        ];
        for (slot, segment) in slots.iter_mut().zip(segments) {
            if segment.is_empty() {
                return Err("pattern segment is empty".to_string());
            }
            **slot = Some(segment.clone());
        }
        Ok(pattern)
    }
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let components = [&self.package, &self.type_name, &self.method, &self.field];
        let last = components.iter().rposition(|c| c.is_some());
        match last {
            None => f.write_str("*"),
            Some(last) => {
                for (i, component) in components[..=last].iter().enumerate() {
                    if i > 0 {
                        f.write_str(".")?;
                    }
                    f.write_str(component.as_deref().unwrap_or("*"))?;
                }
                Ok(())
            }
        }
    }
}

/// A metric predicate: every node matching `pattern` must satisfy
/// `metric <op> value`.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub pattern: Pattern,
    pub op: ComparisonOp,
    pub value: f64,
}

/// One rule statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Metric limit over all nodes matching the pattern.
    Limit(Condition),
    /// No node may match `from` (when `to` is absent), or no relationship
    /// may run from a `from`-matching node to a `to`-matching node.
    Forbid { from: Pattern, to: Option<Pattern> },
    /// Every `from`-matching node needs an outgoing relationship to a
    /// `to`-matching node; without `to`, at least one node must match.
    Require { from: Pattern, to: Option<Pattern> },
    /// Documentary exception; parsed and stored, never evaluated.
    Allow { from: Pattern, to: Option<Pattern> },
}

impl Statement {
    pub fn keyword(&self) -> &'static str {
        match self {
            Statement::Limit(_) => "LIMIT",
            Statement::Forbid { .. } => "FORBID",
            Statement::Require { .. } => "REQUIRE",
            Statement::Allow { .. } => "ALLOW",
        }
    }
}

/// A named rule with its source location, for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub name: String,
    pub source_file: String,
    pub line: u32,
    pub statements: Vec<Statement>,
}

/// An ordered rule list, the unit of evaluation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSet {
    pub rules: Vec<Rule>,
}

impl RuleSet {
    /// Semantic validation at the IR boundary. Errors are path-qualified so
    /// they read the same no matter which front end produced the IR.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.rules.is_empty() {
            return Err(ValidationError::new("rules", "rule set is empty"));
        }
        for (i, rule) in self.rules.iter().enumerate() {
            let base = format!("rules[{i}]");
            if rule.name.trim().is_empty() {
                return Err(ValidationError::new(
                    format!("{base}.name"),
                    "rule name is empty",
                ));
            }
            if rule.statements.is_empty() {
                return Err(ValidationError::new(
                    format!("{base}.statements"),
                    "rule has no statements",
                ));
            }
            for (j, statement) in rule.statements.iter().enumerate() {
                if let Statement::Limit(condition) = statement {
                    let path = format!("{base}.statements[{j}].condition");
                    if condition.pattern.metric.is_none() {
                        return Err(ValidationError::new(path, "LIMIT requires a metric"));
                    }
                    if !condition.value.is_finite() {
                        return Err(ValidationError::new(path, "value must be finite"));
                    }
                }
            }
        }
        Ok(())
    }
}

/// A rule-text error with its source position.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{file}:{line}:{column}: {message}")]
pub struct ParseError {
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub message: String,
}

/// All errors collected before the DSL parser gave up on a rule set.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseDiagnostics {
    pub errors: Vec<ParseError>,
}

impl std::fmt::Display for ParseDiagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseDiagnostics {}

/// A path-qualified semantic error in the rule IR.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{path}: {message}")]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Any failure to turn rule text into a validated rule set.
#[derive(Debug, thiserror::Error)]
pub enum RuleParseError {
    #[error(transparent)]
    Syntax(#[from] ParseDiagnostics),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}
