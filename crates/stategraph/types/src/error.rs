//! Error types for state-graph definition and compilation

use crate::dialect::QueryLanguage;

/// Errors that can occur while declaring or compiling a state graph
#[derive(Debug, thiserror::Error)]
pub enum DefinitionError {
    #[error("State '{state_id}' already has a next transition to '{next_id}'")]
    NextAlreadySet { state_id: String, next_id: String },

    #[error("State '{state_id}' already has a default choice target")]
    DefaultChoiceAlreadySet { state_id: String },

    #[error("State '{state_id}' already has an iteration body")]
    IterationBodyAlreadySet { state_id: String },

    #[error("State '{state_id}' already has an item processor")]
    ProcessorAlreadySet { state_id: String },

    #[error("State '{state_id}' already belongs to graph '{current}' and can not be added to graph '{requested}'; a state belongs to exactly one graph")]
    StateAlreadyInGraph {
        state_id: String,
        current: String,
        requested: String,
    },

    #[error("Graph '{graph}' is already nested inside '{current}' and can not be nested inside '{requested}'")]
    GraphAlreadyNested {
        graph: String,
        current: String,
        requested: String,
    },

    #[error("Graph '{graph}' can not be nested inside '{requested}'; the nesting would be cyclic")]
    CyclicNesting { graph: String, requested: String },

    #[error("Duplicate state id '{state_id}' in graph '{graph}'")]
    DuplicateStateId { state_id: String, graph: String },

    #[error("The wildcard error matcher must stand alone in its set: [{matchers}]")]
    WildcardNotAlone { matchers: String },

    #[error("State '{state_id}' uses query language {requested} but the machine root uses {root}")]
    QueryLanguageConflict {
        state_id: String,
        root: QueryLanguage,
        requested: QueryLanguage,
    },

    #[error("Field '{field}' of state '{state_id}' is not available under the {dialect} query language")]
    FieldNotSupported {
        state_id: String,
        field: String,
        dialect: QueryLanguage,
    },

    #[error("Execution type can only be configured on a distributed item processor: state '{state_id}'")]
    InlineProcessorExecutionType { state_id: String },

    #[error("Path for '{field}' must start with '$', got '{path}'")]
    MalformedPath { field: String, path: String },
}

/// Result type alias for definition operations
pub type DefinitionResult<T> = Result<T, DefinitionError>;
