//! State-graph construction and compilation
//!
//! The compiler turns a declared graph of workflow states into a JSON
//! state-machine document. Callers create states inside a
//! [`MachineDefinition`], connect them with transitions, group them into
//! graphs, and render each graph into its `StartAt`/`States` document.
//!
//! # Key Principle
//!
//! **Declaration order never changes the compiled document.**
//!
//! States, transitions, and graphs may be declared in any order. Binding
//! propagates graph membership over every declared relationship, and
//! rendering depends only on the declared structure, so the same
//! definition always compiles to the same document.
//!
//! # Architecture
//!
//! - [`MachineDefinition`]: the arena owning every state and graph
//! - [`StateConfig`]: per-state configuration captured at creation
//! - [`ChoiceBranch`] and [`CatchHandler`]: conditional and error transitions
//! - [`FindStateOptions`]: reachability queries over a bound graph
//!
//! # Example
//!
//! ```rust
//! use stategraph_compiler::{MachineDefinition, StateConfig};
//! use serde_json::json;
//!
//! let mut machine = MachineDefinition::new();
//! let fetch = machine.add_state(
//!     "Fetch",
//!     StateConfig::of_type("Task").with_field("Resource", json!("resource:fetch")),
//! );
//! let done = machine.add_state("Done", StateConfig::of_type("Succeed").terminal());
//! machine.set_next(fetch, done).unwrap();
//!
//! let graph = machine.add_graph(fetch, "Main").unwrap();
//! let document = machine.render_graph(graph, None).unwrap();
//!
//! assert_eq!(document["StartAt"], json!("Fetch"));
//! assert_eq!(document["States"]["Fetch"]["Next"], json!("Done"));
//! ```

#![deny(unsafe_code)]

pub mod definition;
pub mod reachability;
pub mod render;
pub mod transition;

// Re-export main types
pub use definition::{GraphHandle, MachineDefinition, StateConfig, StateHandle};
pub use reachability::FindStateOptions;
pub use transition::{CatchHandler, ChoiceBranch};
