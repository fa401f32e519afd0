//! Compiled glob matchers over the four-component node identity.

use girder_core::types::AstNode;
use girder_rules::Pattern;
use globset::{Glob, GlobMatcher};

use crate::engine::EngineError;

/// A [`Pattern`] with each present component compiled to a glob matcher.
///
/// A node matches when every present component matches the corresponding
/// identity field; absent components match anything. Fields the node does
/// not carry are empty strings, so a non-empty component glob will not match
/// them unless it can match the empty string (as `*` does).
pub struct CompiledPattern {
    package: Option<GlobMatcher>,
    type_name: Option<GlobMatcher>,
    method: Option<GlobMatcher>,
    field: Option<GlobMatcher>,
}

impl CompiledPattern {
    pub fn compile(pattern: &Pattern) -> Result<Self, EngineError> {
        Ok(CompiledPattern {
            package: compile_component(&pattern.package)?,
            type_name: compile_component(&pattern.type_name)?,
            method: compile_component(&pattern.method)?,
            field: compile_component(&pattern.field)?,
        })
    }

    pub fn matches_node(&self, node: &AstNode) -> bool {
        component_matches(&self.package, &node.package_name)
            && component_matches(&self.type_name, &node.type_name)
            && component_matches(&self.method, &node.method_name)
            && component_matches(&self.field, &node.field_name)
    }
}

fn compile_component(text: &Option<String>) -> Result<Option<GlobMatcher>, EngineError> {
    match text {
        None => Ok(None),
        Some(text) => Glob::new(text)
            .map(|glob| Some(glob.compile_matcher()))
            .map_err(|e| EngineError::BadPattern {
                pattern: text.clone(),
                message: e.to_string(),
            }),
    }
}

fn component_matches(matcher: &Option<GlobMatcher>, value: &str) -> bool {
    matcher.as_ref().is_none_or(|m| m.is_match(value))
}
