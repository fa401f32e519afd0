//! Architecture query engine for girder.
//!
//! Compiles rule sets (patterns to glob matchers) and evaluates them against
//! the AST cache, producing a deterministic list of violations:
//! - LIMIT — numeric metric predicates over matching nodes
//! - FORBID — forbidden declarations or forbidden dependencies
//! - REQUIRE — required dependencies or required declarations
//! - ALLOW — documentary, never evaluated

pub mod cancel;
pub mod engine;
pub mod pattern;
pub mod violations;

pub use cancel::CancelFlag;
pub use engine::{CompiledRuleSet, EngineError, QueryEngine};
pub use pattern::CompiledPattern;
pub use violations::{Violation, VIOLATION_SOURCE};
