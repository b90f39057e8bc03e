//! Value types for state-graph definitions
//!
//! A state graph compiles into a declarative state-machine document. This
//! crate holds the pure vocabulary that compilation is written in; the
//! graph arena itself lives in `stategraph-compiler`.
//!
//! # Key Concepts
//!
//! - **QueryLanguage**: The dialect a state's data-flow fields are written
//!   in. States may upgrade a path-based machine to the expression dialect
//!   but never downgrade an expression-based one.
//! - **Error matchers**: Ordered sets of error names that retry and catch
//!   rules match raised errors against. The wildcard matches everything
//!   and must stand alone.
//! - **RetryPolicy**: One retry rule, matchers plus backoff parameters.
//!   Unset parameters stay absent from the compiled document.
//! - **ProcessorConfig**: Inline or distributed execution of an iterating
//!   state's item processor.
//! - **RenderCondition**: The capability a branching condition must provide
//!   to be compiled. The predicate language itself is a collaborator
//!   concern.
//! - **DefinitionError**: Every way a declaration or compilation can fail.
//!   Failures carry the offending identifiers and are never downgraded to
//!   partial output.

#![deny(unsafe_code)]

pub mod condition;
pub mod dialect;
pub mod error;
pub mod fields;
pub mod matchers;
pub mod processor;
pub mod retry;

pub use condition::RenderCondition;
pub use dialect::QueryLanguage;
pub use error::{DefinitionError, DefinitionResult};
pub use processor::{ProcessorConfig, ProcessorExecutionType, ProcessorMode};
pub use retry::{JitterStrategy, RetryPolicy};
