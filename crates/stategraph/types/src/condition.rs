//! The condition capability consumed by branching states.
//!
//! The predicate language is a collaborator concern. This core only needs
//! every condition to produce its own document fragment; the renderer
//! merges that fragment with the branch's target and options.

use serde_json::Value;
use std::fmt;

/// A renderable branching condition.
///
/// Object fragments merge directly into the choice entry they guard; any
/// other value lands under a `Condition` key, the shape expression-dialect
/// predicates use.
pub trait RenderCondition: fmt::Debug + Send + Sync {
    /// The condition's document fragment, for example
    /// `{"Variable": "$.status", "StringEquals": "ok"}`.
    fn render_condition(&self) -> Value;
}

/// Any raw object fragment can serve directly as a condition.
impl RenderCondition for Value {
    fn render_condition(&self) -> Value {
        self.clone()
    }
}
