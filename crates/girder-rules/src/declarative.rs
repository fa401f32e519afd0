//! The declarative (JSON) rule form.
//!
//! A structured document mirroring the rule IR, for toolchains that generate
//! rules rather than hand-write them. Loading and emitting are inverses:
//! `parse_declarative(to_declarative(rules))` reproduces the IR.

use serde::{Deserialize, Serialize};

use crate::ir::{
    ComparisonOp, Condition, Metric, Pattern, Rule, RuleSet, Statement, ValidationError,
};

#[derive(Debug, Default, Serialize, Deserialize)]
struct RulesDoc {
    #[serde(default)]
    rules: Vec<RuleDoc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RuleDoc {
    #[serde(default)]
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    line: Option<u32>,
    #[serde(default)]
    statements: Vec<StatementDoc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StatementDoc {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    condition: Option<ConditionDoc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pattern: Option<Pattern>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    from_pattern: Option<Pattern>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    to_pattern: Option<Pattern>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ConditionDoc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pattern: Option<PatternDoc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    operator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<f64>,
    /// Legacy spelling: the metric as a top-level field instead of inside
    /// the pattern.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    property: Option<String>,
}

/// Pattern with the metric as free text, so unknown names can be reported
/// with a path instead of failing inside serde.
#[derive(Debug, Default, Serialize, Deserialize)]
struct PatternDoc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    package: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    type_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metric: Option<String>,
}

/// Parse the declarative JSON form into an (unvalidated) rule set.
pub fn parse_declarative(input: &str, source_file: &str) -> Result<RuleSet, ValidationError> {
    let doc: RulesDoc = serde_json::from_str(input)
        .map_err(|e| ValidationError::new("$", format!("invalid document: {e}")))?;

    let mut rules = Vec::with_capacity(doc.rules.len());
    for (i, rule_doc) in doc.rules.into_iter().enumerate() {
        let base = format!("rules[{i}]");
        let mut statements = Vec::with_capacity(rule_doc.statements.len());
        for (j, statement_doc) in rule_doc.statements.into_iter().enumerate() {
            let path = format!("{base}.statements[{j}]");
            statements.push(lower_statement(statement_doc, &path)?);
        }
        rules.push(Rule {
            name: rule_doc.name,
            source_file: source_file.to_string(),
            line: rule_doc.line.unwrap_or(0),
            statements,
        });
    }
    Ok(RuleSet { rules })
}

fn lower_statement(doc: StatementDoc, path: &str) -> Result<Statement, ValidationError> {
    match doc.kind.to_ascii_uppercase().as_str() {
        "LIMIT" => {
            let condition = doc
                .condition
                .ok_or_else(|| ValidationError::new(format!("{path}.condition"), "missing"))?;
            Ok(Statement::Limit(lower_condition(
                condition,
                &format!("{path}.condition"),
            )?))
        }
        "FORBID" | "REQUIRE" | "ALLOW" => {
            let from = doc
                .from_pattern
                .or(doc.pattern)
                .map(normalize_pattern)
                .ok_or_else(|| ValidationError::new(format!("{path}.from_pattern"), "missing"))?;
            let to = doc.to_pattern.map(normalize_pattern);
            Ok(match doc.kind.to_ascii_uppercase().as_str() {
                "FORBID" => Statement::Forbid { from, to },
                "REQUIRE" => Statement::Require { from, to },
                _ => Statement::Allow { from, to },
            })
        }
        "" => Err(ValidationError::new(
            format!("{path}.type"),
            "missing statement type",
        )),
        other => Err(ValidationError::new(
            format!("{path}.type"),
            format!("unknown statement type '{other}'"),
        )),
    }
}

fn lower_condition(doc: ConditionDoc, path: &str) -> Result<Condition, ValidationError> {
    let pattern_doc = doc.pattern.unwrap_or_default();

    let metric_name = pattern_doc.metric.clone().or(doc.property);
    let metric = match metric_name {
        Some(name) => Some(Metric::parse(&name).ok_or_else(|| {
            ValidationError::new(
                format!("{path}.pattern.metric"),
                format!("unknown metric '{name}'"),
            )
        })?),
        None => None,
    };
    let metric = metric.ok_or_else(|| {
        ValidationError::new(format!("{path}.pattern.metric"), "LIMIT requires a metric")
    })?;

    let operator = doc
        .operator
        .ok_or_else(|| ValidationError::new(format!("{path}.operator"), "missing"))?;
    let op = ComparisonOp::parse(&operator).ok_or_else(|| {
        ValidationError::new(
            format!("{path}.operator"),
            format!("unknown operator '{operator}'"),
        )
    })?;

    let value = doc
        .value
        .ok_or_else(|| ValidationError::new(format!("{path}.value"), "missing"))?;

    let pattern = Pattern {
        package: normalize(pattern_doc.package),
        type_name: normalize(pattern_doc.type_name),
        method: normalize(pattern_doc.method),
        field: normalize(pattern_doc.field),
        metric: Some(metric),
    };
    Ok(Condition { pattern, op, value })
}

fn normalize(component: Option<String>) -> Option<String> {
    component.filter(|c| !c.is_empty())
}

/// Empty-string components mean "absent", same as omitting the field.
fn normalize_pattern(pattern: Pattern) -> Pattern {
    Pattern {
        package: normalize(pattern.package),
        type_name: normalize(pattern.type_name),
        method: normalize(pattern.method),
        field: normalize(pattern.field),
        metric: pattern.metric,
    }
}

/// Emit a rule set as the declarative JSON document.
pub fn to_declarative(rules: &RuleSet) -> String {
    let doc = RulesDoc {
        rules: rules
            .rules
            .iter()
            .map(|rule| RuleDoc {
                name: rule.name.clone(),
                line: Some(rule.line),
                statements: rule.statements.iter().map(emit_statement).collect(),
            })
            .collect(),
    };
    serde_json::to_string_pretty(&doc).expect("rule document serializes to JSON")
}

fn emit_statement(statement: &Statement) -> StatementDoc {
    match statement {
        Statement::Limit(condition) => StatementDoc {
            kind: "LIMIT".to_string(),
            condition: Some(ConditionDoc {
                pattern: Some(PatternDoc {
                    package: condition.pattern.package.clone(),
                    type_name: condition.pattern.type_name.clone(),
                    method: condition.pattern.method.clone(),
                    field: condition.pattern.field.clone(),
                    metric: condition.pattern.metric.map(|m| m.as_str().to_string()),
                }),
                operator: Some(condition.op.as_str().to_string()),
                value: Some(condition.value),
                property: None,
            }),
            ..StatementDoc::default()
        },
        Statement::Forbid { from, to } | Statement::Require { from, to } | Statement::Allow { from, to } => {
            let kind = statement.keyword().to_string();
            match to {
                Some(to) => StatementDoc {
                    kind,
                    from_pattern: Some(from.clone()),
                    to_pattern: Some(to.clone()),
                    ..StatementDoc::default()
                },
                None => StatementDoc {
                    kind,
                    pattern: Some(from.clone()),
                    ..StatementDoc::default()
                },
            }
        }
    }
}
