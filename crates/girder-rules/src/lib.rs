//! Rule parsing for girder: two surface syntaxes, one IR.
//!
//! The textual DSL ([`parser`]) and the declarative JSON form
//! ([`declarative`]) both lower to the [`ir`] types the query engine
//! consumes. [`parse_rules`] detects which syntax an input uses and returns
//! a validated rule set.

pub mod declarative;
pub mod ir;
pub mod lexer;
pub mod parser;

pub use declarative::{parse_declarative, to_declarative};
pub use ir::{
    ComparisonOp, Condition, Metric, ParseDiagnostics, ParseError, Pattern, Rule, RuleParseError,
    RuleSet, Statement, ValidationError,
};
pub use parser::parse_dsl;

/// Whether rule text is the textual DSL: trimmed input starting with the
/// keyword `RULE` (case-insensitive). Anything else is treated as the
/// declarative form.
pub fn is_dsl(input: &str) -> bool {
    let trimmed = input.trim_start();
    trimmed
        .get(..4)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("rule"))
}

/// Parse either surface syntax into a validated rule set.
pub fn parse_rules(input: &str, source_file: &str) -> Result<RuleSet, RuleParseError> {
    let rules = if is_dsl(input) {
        parse_dsl(input, source_file)?
    } else {
        parse_declarative(input, source_file)?
    };
    rules.validate()?;
    Ok(rules)
}
