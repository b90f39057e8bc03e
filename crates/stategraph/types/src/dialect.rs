//! Query-language dialects and their resolution rules.
//!
//! A machine declares a root dialect and any state may override it. The
//! path-based dialect selects and reshapes data through path expressions
//! (`InputPath`, `Parameters`, `OutputPath`); the expression-based dialect
//! computes data through full expressions (`Arguments`, `Output`). A state
//! may upgrade a path-based machine to the expression dialect, but never
//! downgrade an expression-based machine.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{DefinitionError, DefinitionResult};

/// The dialect a state's data-flow fields are written in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryLanguage {
    /// Path-based selection. The default for machines that declare nothing.
    #[default]
    #[serde(rename = "JSONPath")]
    JsonPath,
    /// Expression-based transformation.
    #[serde(rename = "JSONata")]
    Jsonata,
}

impl fmt::Display for QueryLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryLanguage::JsonPath => write!(f, "JSONPath"),
            QueryLanguage::Jsonata => write!(f, "JSONata"),
        }
    }
}

/// Effective dialect for one state.
///
/// The state-level override wins over the machine root; the path-based
/// dialect applies when neither is set.
pub fn resolve(root: Option<QueryLanguage>, state: Option<QueryLanguage>) -> QueryLanguage {
    state.or(root).unwrap_or_default()
}

/// Document-level dialect annotation for one state.
///
/// Returns `Some(Jsonata)` exactly when the machine root is path-based (or
/// unset) and the state explicitly upgrades. A state that requests the
/// path-based dialect under an expression-based root is not representable
/// and fails; the error re-raises on every call.
pub fn annotation(
    root: Option<QueryLanguage>,
    state: Option<QueryLanguage>,
    state_id: &str,
) -> DefinitionResult<Option<QueryLanguage>> {
    match (root.unwrap_or_default(), state) {
        (QueryLanguage::Jsonata, Some(QueryLanguage::JsonPath)) => {
            Err(DefinitionError::QueryLanguageConflict {
                state_id: state_id.to_string(),
                root: QueryLanguage::Jsonata,
                requested: QueryLanguage::JsonPath,
            })
        }
        (QueryLanguage::JsonPath, Some(QueryLanguage::Jsonata)) => {
            Ok(Some(QueryLanguage::Jsonata))
        }
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_defaults_to_json_path() {
        assert_eq!(resolve(None, None), QueryLanguage::JsonPath);
    }

    #[test]
    fn test_resolve_state_override_wins() {
        assert_eq!(
            resolve(Some(QueryLanguage::JsonPath), Some(QueryLanguage::Jsonata)),
            QueryLanguage::Jsonata
        );
        assert_eq!(resolve(Some(QueryLanguage::Jsonata), None), QueryLanguage::Jsonata);
    }

    #[test]
    fn test_annotation_emitted_on_upgrade() {
        let annotated = annotation(None, Some(QueryLanguage::Jsonata), "Transform").unwrap();
        assert_eq!(annotated, Some(QueryLanguage::Jsonata));

        let annotated = annotation(
            Some(QueryLanguage::JsonPath),
            Some(QueryLanguage::Jsonata),
            "Transform",
        )
        .unwrap();
        assert_eq!(annotated, Some(QueryLanguage::Jsonata));
    }

    #[test]
    fn test_annotation_absent_when_redundant() {
        assert_eq!(annotation(None, None, "Plain").unwrap(), None);
        assert_eq!(annotation(None, Some(QueryLanguage::JsonPath), "Plain").unwrap(), None);
        assert_eq!(
            annotation(Some(QueryLanguage::Jsonata), Some(QueryLanguage::Jsonata), "Plain")
                .unwrap(),
            None
        );
        assert_eq!(annotation(Some(QueryLanguage::Jsonata), None, "Plain").unwrap(), None);
    }

    #[test]
    fn test_annotation_rejects_downgrade() {
        let result = annotation(
            Some(QueryLanguage::Jsonata),
            Some(QueryLanguage::JsonPath),
            "Legacy",
        );
        match result {
            Err(DefinitionError::QueryLanguageConflict {
                state_id,
                root,
                requested,
            }) => {
                assert_eq!(state_id, "Legacy");
                assert_eq!(root, QueryLanguage::Jsonata);
                assert_eq!(requested, QueryLanguage::JsonPath);
            }
            other => panic!("expected QueryLanguageConflict, got {other:?}"),
        }

        // The conflict is stable across repeated resolution.
        assert!(annotation(
            Some(QueryLanguage::Jsonata),
            Some(QueryLanguage::JsonPath),
            "Legacy"
        )
        .is_err());
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(
            serde_json::to_value(QueryLanguage::JsonPath).unwrap(),
            serde_json::json!("JSONPath")
        );
        assert_eq!(
            serde_json::to_value(QueryLanguage::Jsonata).unwrap(),
            serde_json::json!("JSONata")
        );
    }
}
