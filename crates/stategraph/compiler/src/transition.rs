//! Transition records: conditional branches and error handlers.
//!
//! Both records are declared on a state and immutable afterwards. They
//! reference their target by handle; the target itself is owned by the
//! arena, never by the record.

use serde_json::{Map, Value};

use stategraph_types::{matchers, RenderCondition};

use crate::definition::StateHandle;

// ── Choice branches ──────────────────────────────────────────────────

/// One conditional branch of a choosing state.
///
/// Branches compile in declaration order; the first condition that matches
/// at evaluation time wins.
#[derive(Debug)]
pub struct ChoiceBranch {
    pub(crate) condition: Box<dyn RenderCondition>,
    pub(crate) next: StateHandle,
    pub(crate) comment: Option<String>,
    pub(crate) assign: Map<String, Value>,
    pub(crate) output: Option<Value>,
}

impl ChoiceBranch {
    /// Create a branch guarded by `condition` that transitions to `next`.
    pub fn new(condition: impl RenderCondition + 'static, next: StateHandle) -> Self {
        Self {
            condition: Box::new(condition),
            next,
            comment: None,
            assign: Map::new(),
            output: None,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Assign a variable when this branch is taken.
    pub fn with_assigned(mut self, key: impl Into<String>, value: Value) -> Self {
        self.assign.insert(key.into(), value);
        self
    }

    /// Output expression applied when this branch is taken. Expression
    /// dialect only.
    pub fn with_output(mut self, output: Value) -> Self {
        self.output = Some(output);
        self
    }

    /// The branch's transition target.
    pub fn next(&self) -> StateHandle {
        self.next
    }
}

// ── Catch handlers ───────────────────────────────────────────────────

/// An error-handler transition: which errors it catches and where the
/// machine continues after catching one.
#[derive(Clone, Debug)]
pub struct CatchHandler {
    pub(crate) next: StateHandle,
    pub(crate) errors: Option<Vec<String>>,
    pub(crate) result_path: Option<String>,
    pub(crate) assign: Map<String, Value>,
    pub(crate) output: Option<Value>,
}

impl CatchHandler {
    /// Create a handler that catches every error, transitioning to `next`.
    pub fn new(next: StateHandle) -> Self {
        Self {
            next,
            errors: None,
            result_path: None,
            assign: Map::new(),
            output: None,
        }
    }

    /// Restrict the handler to the given error matchers.
    pub fn with_errors(mut self, errors: Vec<String>) -> Self {
        self.errors = Some(errors);
        self
    }

    /// Where the caught error lands in the handler's input. Path dialect
    /// only.
    pub fn with_result_path(mut self, path: impl Into<String>) -> Self {
        self.result_path = Some(path.into());
        self
    }

    /// Assign a variable when this handler fires.
    pub fn with_assigned(mut self, key: impl Into<String>, value: Value) -> Self {
        self.assign.insert(key.into(), value);
        self
    }

    /// Output expression applied when this handler fires. Expression
    /// dialect only.
    pub fn with_output(mut self, output: Value) -> Self {
        self.output = Some(output);
        self
    }

    /// The handler's transition target.
    pub fn next(&self) -> StateHandle {
        self.next
    }

    /// Check if this handler catches every error. An omitted or empty
    /// matcher set defaults to the wildcard.
    pub fn catches_all_errors(&self) -> bool {
        match &self.errors {
            Some(errors) if !errors.is_empty() => matchers::contains_wildcard(errors),
            _ => true,
        }
    }
}
