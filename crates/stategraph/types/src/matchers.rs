//! Well-known error-matcher names and matcher-set validation.
//!
//! Retry and catch rules carry an ordered set of matcher names that raised
//! errors are compared against. The wildcard [`ALL`] matches every error
//! and must stand alone in its set.

use crate::error::{DefinitionError, DefinitionResult};

/// Matches any raised error.
pub const ALL: &str = "States.ALL";

/// A heartbeat was not received within the configured interval.
pub const HEARTBEAT_TIMEOUT: &str = "States.HeartbeatTimeout";

/// The state ran longer than its configured timeout.
pub const TIMEOUT: &str = "States.Timeout";

/// The work item failed for any reason.
pub const TASK_FAILED: &str = "States.TaskFailed";

/// The state had insufficient privileges to execute.
pub const PERMISSIONS: &str = "States.Permissions";

/// A result-path expression could not be applied to the state's input.
pub const RESULT_PATH_MATCH_FAILURE: &str = "States.ResultPathMatchFailure";

/// A path inside the parameter template could not be applied.
pub const PARAMETER_PATH_FAILURE: &str = "States.ParameterPathFailure";

/// A branch of a parallel state failed.
pub const BRANCH_FAILED: &str = "States.BranchFailed";

/// No branching condition matched and no default target was declared.
pub const NO_CHOICE_MATCHED: &str = "States.NoChoiceMatched";

/// True when any matcher in the set is the wildcard.
pub fn contains_wildcard(matchers: &[String]) -> bool {
    matchers.iter().any(|matcher| matcher == ALL)
}

/// Validates that the wildcard, when present, is the set's only matcher.
pub fn validate_matchers(matchers: &[String]) -> DefinitionResult<()> {
    if contains_wildcard(matchers) && matchers.len() > 1 {
        return Err(DefinitionError::WildcardNotAlone {
            matchers: matchers.join(", "),
        });
    }
    Ok(())
}

/// The matcher set a rule compiles with: an omitted or empty set defaults
/// to the wildcard.
pub fn effective_matchers(matchers: Option<&[String]>) -> Vec<String> {
    match matchers {
        Some(set) if !set.is_empty() => set.to_vec(),
        _ => vec![ALL.to_string()],
    }
}
