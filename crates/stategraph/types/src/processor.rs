//! Item-processor configuration for iterating states.
//!
//! An iterating state runs a sub-graph over each element of its input. The
//! processor either runs inline within the enclosing execution or as a
//! distributed child execution with its own execution type.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where the item processor's iterations run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessorMode {
    /// Iterations run within the enclosing execution.
    #[default]
    #[serde(rename = "INLINE")]
    Inline,
    /// Each iteration runs as a separate child execution.
    #[serde(rename = "DISTRIBUTED")]
    Distributed,
}

impl fmt::Display for ProcessorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessorMode::Inline => write!(f, "INLINE"),
            ProcessorMode::Distributed => write!(f, "DISTRIBUTED"),
        }
    }
}

/// Execution type of distributed iterations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessorExecutionType {
    #[default]
    #[serde(rename = "STANDARD")]
    Standard,
    #[serde(rename = "EXPRESS")]
    Express,
}

impl fmt::Display for ProcessorExecutionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessorExecutionType::Standard => write!(f, "STANDARD"),
            ProcessorExecutionType::Express => write!(f, "EXPRESS"),
        }
    }
}

/// Configuration attached to an iterating state's item processor.
///
/// An execution type is only meaningful in distributed mode; declaring one
/// on an inline processor is rejected when the processor is attached.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorConfig {
    pub mode: ProcessorMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_type: Option<ProcessorExecutionType>,
}

impl ProcessorConfig {
    /// An inline processor.
    pub fn inline() -> Self {
        Self {
            mode: ProcessorMode::Inline,
            execution_type: None,
        }
    }

    /// A distributed processor with the standard execution type.
    pub fn distributed() -> Self {
        Self {
            mode: ProcessorMode::Distributed,
            execution_type: None,
        }
    }

    pub fn with_execution_type(mut self, execution_type: ProcessorExecutionType) -> Self {
        self.execution_type = Some(execution_type);
        self
    }

    /// Check if the configuration declares a distributed processor.
    pub fn is_distributed(&self) -> bool {
        self.mode == ProcessorMode::Distributed
    }
}
