//! Rule-set evaluation against the AST cache.
//!
//! Rules compile once (patterns to glob matchers) and evaluate in
//! declaration order; matches within a statement are ordered by
//! `(file, line, column)`, so the violation list is deterministic for a
//! given store state.

use std::collections::HashMap;

use girder_core::store::AstSource;
use girder_core::types::{AstNode, AstRelationship, StoreError};
use girder_rules::{ComparisonOp, Metric, RuleSet, Statement};
use tracing::debug;

use crate::cancel::CancelFlag;
use crate::pattern::CompiledPattern;
use crate::violations::Violation;

/// Errors from rule compilation or evaluation. Violations are not errors.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("invalid pattern '{pattern}': {message}")]
    BadPattern { pattern: String, message: String },

    #[error("evaluation cancelled")]
    Cancelled,
}

enum CompiledStatement {
    Limit {
        pattern: CompiledPattern,
        metric: Metric,
        op: ComparisonOp,
        value: f64,
    },
    ForbidNode {
        pattern: CompiledPattern,
        display: String,
    },
    ForbidRelation {
        from: CompiledPattern,
        to: CompiledPattern,
    },
    RequireRelation {
        from: CompiledPattern,
        to: CompiledPattern,
        to_display: String,
    },
    RequireNode {
        pattern: CompiledPattern,
        display: String,
    },
    Allow,
}

struct CompiledRule {
    name: String,
    statements: Vec<CompiledStatement>,
}

/// A rule set with every pattern compiled, ready for repeated evaluation.
pub struct CompiledRuleSet {
    rules: Vec<CompiledRule>,
}

impl CompiledRuleSet {
    pub fn compile(rules: &RuleSet) -> Result<Self, EngineError> {
        let mut compiled = Vec::with_capacity(rules.rules.len());
        for rule in &rules.rules {
            let mut statements = Vec::with_capacity(rule.statements.len());
            for statement in &rule.statements {
                statements.push(compile_statement(statement)?);
            }
            compiled.push(CompiledRule {
                name: rule.name.clone(),
                statements,
            });
        }
        Ok(CompiledRuleSet { rules: compiled })
    }
}

fn compile_statement(statement: &Statement) -> Result<CompiledStatement, EngineError> {
    Ok(match statement {
        Statement::Limit(condition) => {
            let metric = condition.pattern.metric.ok_or_else(|| EngineError::BadPattern {
                pattern: condition.pattern.to_string(),
                message: "condition has no metric".to_string(),
            })?;
            CompiledStatement::Limit {
                pattern: CompiledPattern::compile(&condition.pattern)?,
                metric,
                op: condition.op,
                value: condition.value,
            }
        }
        Statement::Forbid { from, to } => match to {
            Some(to) => CompiledStatement::ForbidRelation {
                from: CompiledPattern::compile(from)?,
                to: CompiledPattern::compile(to)?,
            },
            None => CompiledStatement::ForbidNode {
                pattern: CompiledPattern::compile(from)?,
                display: from.to_string(),
            },
        },
        Statement::Require { from, to } => match to {
            Some(to) => CompiledStatement::RequireRelation {
                from: CompiledPattern::compile(from)?,
                to: CompiledPattern::compile(to)?,
                to_display: to.to_string(),
            },
            None => CompiledStatement::RequireNode {
                pattern: CompiledPattern::compile(from)?,
                display: from.to_string(),
            },
        },
        Statement::Allow { .. } => CompiledStatement::Allow,
    })
}

/// Evaluates rule sets against a store and produces violations.
pub struct QueryEngine<'a> {
    store: &'a dyn AstSource,
}

impl<'a> QueryEngine<'a> {
    pub fn new(store: &'a dyn AstSource) -> Self {
        QueryEngine { store }
    }

    /// Evaluate without a cancellation signal.
    pub fn execute(&self, rules: &RuleSet) -> Result<Vec<Violation>, EngineError> {
        self.execute_with_cancel(rules, &CancelFlag::new())
    }

    /// Evaluate the rule set, checking `cancel` between rules and between
    /// statements. An empty rule set yields an empty violation list.
    pub fn execute_with_cancel(
        &self,
        rules: &RuleSet,
        cancel: &CancelFlag,
    ) -> Result<Vec<Violation>, EngineError> {
        let compiled = CompiledRuleSet::compile(rules)?;

        let nodes = self.store.all_nodes()?;
        let by_id: HashMap<i64, &AstNode> = nodes.iter().map(|n| (n.id, n)).collect();
        let relationships = self.store.all_relationships()?;

        let mut violations = Vec::new();
        for rule in &compiled.rules {
            if cancel.is_cancelled() {
                return Err(EngineError::Cancelled);
            }
            for statement in &rule.statements {
                if cancel.is_cancelled() {
                    return Err(EngineError::Cancelled);
                }
                let mut matches =
                    self.eval_statement(&rule.name, statement, &nodes, &by_id, &relationships)?;
                matches.sort_by(|a, b| {
                    (&a.file, a.line, a.column).cmp(&(&b.file, b.line, b.column))
                });
                violations.extend(matches);
            }
        }

        debug!(
            rules = compiled.rules.len(),
            violations = violations.len(),
            "evaluated rule set"
        );
        Ok(violations)
    }

    fn eval_statement(
        &self,
        rule: &str,
        statement: &CompiledStatement,
        nodes: &[AstNode],
        by_id: &HashMap<i64, &AstNode>,
        relationships: &[AstRelationship],
    ) -> Result<Vec<Violation>, EngineError> {
        let mut out = Vec::new();
        match statement {
            CompiledStatement::Limit {
                pattern,
                metric,
                op,
                value,
            } => {
                for node in nodes.iter().filter(|n| pattern.matches_node(n)) {
                    let observed = self.metric_value(*metric, node)?;
                    if op.compare(observed, *value) {
                        out.push(Violation::at(
                            &node.file_path,
                            node.start_line,
                            rule,
                            format!(
                                "{}: {} is {}, violates limit {} {}",
                                node.qualified_name(),
                                metric,
                                observed,
                                op,
                                value
                            ),
                        ));
                    }
                }
            }
            CompiledStatement::ForbidNode { pattern, display } => {
                for node in nodes.iter().filter(|n| pattern.matches_node(n)) {
                    out.push(Violation::at(
                        &node.file_path,
                        node.start_line,
                        rule,
                        format!(
                            "{} matches forbidden pattern {}",
                            node.qualified_name(),
                            display
                        ),
                    ));
                }
            }
            CompiledStatement::ForbidRelation { from, to } => {
                for relationship in relationships {
                    // Dangling endpoints are tolerated and skipped; they are
                    // purged on the next replace of their file.
                    let Some(source) = by_id.get(&relationship.from_id) else {
                        continue;
                    };
                    let Some(target) = relationship.to_id.and_then(|id| by_id.get(&id)) else {
                        continue;
                    };
                    if from.matches_node(source) && to.matches_node(target) {
                        out.push(Violation::at(
                            &source.file_path,
                            relationship.line_no,
                            rule,
                            format!(
                                "forbidden {} dependency: {} -> {}",
                                relationship.kind,
                                source.qualified_name(),
                                target.qualified_name()
                            ),
                        ));
                    }
                }
            }
            CompiledStatement::RequireRelation {
                from,
                to,
                to_display,
            } => {
                for node in nodes.iter().filter(|n| from.matches_node(n)) {
                    let outgoing = self.store.relationships_of(node.id, None)?;
                    let satisfied = outgoing.iter().any(|r| {
                        r.to_id
                            .and_then(|id| by_id.get(&id))
                            .is_some_and(|target| to.matches_node(target))
                    });
                    if !satisfied {
                        out.push(Violation::at(
                            &node.file_path,
                            node.start_line,
                            rule,
                            format!(
                                "{}: missing required dependency on {}",
                                node.qualified_name(),
                                to_display
                            ),
                        ));
                    }
                }
            }
            CompiledStatement::RequireNode { pattern, display } => {
                if !nodes.iter().any(|n| pattern.matches_node(n)) {
                    out.push(Violation::rule_level(
                        rule,
                        format!("missing required declaration: no node matches {display}"),
                    ));
                }
            }
            CompiledStatement::Allow => {}
        }
        Ok(out)
    }

    fn metric_value(&self, metric: Metric, node: &AstNode) -> Result<f64, EngineError> {
        Ok(match metric {
            Metric::Cyclomatic => f64::from(node.cyclomatic_complexity),
            Metric::Parameters => f64::from(node.parameter_count),
            Metric::Returns => f64::from(node.return_count),
            Metric::Lines => f64::from(node.line_count),
            Metric::Imports => f64::from(self.store.count_imports(node.id)?),
            Metric::Calls => f64::from(self.store.count_external_calls(node.id)?),
            Metric::NameLength => node.qualified_name().chars().count() as f64,
        })
    }
}
