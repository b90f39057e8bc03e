//! The machine definition: an arena of states and graphs
//!
//! Every state and every graph of one machine lives in a single
//! [`MachineDefinition`] and is addressed by a copyable handle. All
//! cross-references (next targets, choice targets, graph membership,
//! sub-graph nesting) are handles too, so the whole structure is plain
//! owned data and graph-consistency rules are enforced in one place.
//!
//! States are created unbound. Creating a graph binds its start state, and
//! binding propagates transitively over every declared relationship, so by
//! the time a graph compiles it owns the whole connected structure no
//! matter the order in which states were declared, connected, and bound.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{HashSet, VecDeque};
use tracing::debug;

use stategraph_types::{
    matchers, DefinitionError, DefinitionResult, ProcessorConfig, QueryLanguage, RetryPolicy,
};

use crate::transition::{CatchHandler, ChoiceBranch};

// ── Handles ──────────────────────────────────────────────────────────

/// Addresses a state inside its [`MachineDefinition`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateHandle(pub(crate) usize);

/// Addresses a graph inside its [`MachineDefinition`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphHandle(pub(crate) usize);

// ── State configuration ──────────────────────────────────────────────

/// Configuration captured when a state is created.
///
/// Everything is optional. Kind-specific document fields (`"Type"`,
/// `"Resource"`, and whatever else the state kind carries) arrive through
/// [`StateConfig::with_field`]; the compiler's own fields are written over
/// them at render time and win on collision.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StateConfig {
    /// Overrides the creation id as the compiled document key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Dialect override for this state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_language: Option<QueryLanguage>,
    /// Input selection path. Path dialect only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_path: Option<String>,
    /// Output selection path. Path dialect only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    /// Where the state's result lands in its input. Path dialect only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_path: Option<String>,
    /// Parameter template, interpolated at render time. Path dialect only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
    /// Argument expression. Expression dialect only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
    /// Output expression. Expression dialect only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    /// Variables assigned when the state completes.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub assign: Map<String, Value>,
    /// Terminal state kinds never carry a default transition.
    #[serde(default)]
    pub terminal: bool,
    /// Kind-specific document fields.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub fields: Map<String, Value>,
}

impl StateConfig {
    /// Create a configuration with everything unset.
    pub fn new() -> Self {
        Self::default()
    }

    /// A configuration whose `"Type"` field is already set.
    pub fn of_type(kind: impl Into<String>) -> Self {
        Self::new().with_field("Type", Value::String(kind.into()))
    }

    pub fn with_state_name(mut self, name: impl Into<String>) -> Self {
        self.state_name = Some(name.into());
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_query_language(mut self, language: QueryLanguage) -> Self {
        self.query_language = Some(language);
        self
    }

    pub fn with_input_path(mut self, path: impl Into<String>) -> Self {
        self.input_path = Some(path.into());
        self
    }

    pub fn with_output_path(mut self, path: impl Into<String>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    pub fn with_result_path(mut self, path: impl Into<String>) -> Self {
        self.result_path = Some(path.into());
        self
    }

    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = Some(parameters);
        self
    }

    pub fn with_arguments(mut self, arguments: Value) -> Self {
        self.arguments = Some(arguments);
        self
    }

    pub fn with_output(mut self, output: Value) -> Self {
        self.output = Some(output);
        self
    }

    /// Assign a variable when the state completes.
    pub fn with_assigned(mut self, key: impl Into<String>, value: Value) -> Self {
        self.assign.insert(key.into(), value);
        self
    }

    /// Mark the state kind as terminal.
    pub fn terminal(mut self) -> Self {
        self.terminal = true;
        self
    }

    /// Set a kind-specific document field.
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }
}

// ── Arena nodes ──────────────────────────────────────────────────────

#[derive(Debug)]
pub(crate) struct StateNode {
    pub(crate) id: String,
    pub(crate) config: StateConfig,
    /// Applied front-to-back before the state name; most recent first.
    pub(crate) prefixes: Vec<String>,
    pub(crate) next: Option<StateHandle>,
    pub(crate) default_choice: Option<StateHandle>,
    pub(crate) choices: Vec<ChoiceBranch>,
    pub(crate) catches: Vec<CatchHandler>,
    pub(crate) retries: Vec<RetryPolicy>,
    pub(crate) branches: Vec<GraphHandle>,
    pub(crate) iteration: Option<GraphHandle>,
    pub(crate) processor: Option<(GraphHandle, ProcessorConfig)>,
    pub(crate) graph: Option<GraphHandle>,
    /// Back-references used only to propagate graph membership.
    pub(crate) incoming: Vec<StateHandle>,
}

#[derive(Debug)]
pub(crate) struct GraphNode {
    pub(crate) start: StateHandle,
    pub(crate) description: String,
    /// Member states in the order binding discovered them.
    pub(crate) states: Vec<StateHandle>,
    pub(crate) super_graph: Option<GraphHandle>,
}

// ── Machine definition ───────────────────────────────────────────────

/// The arena every state and graph of one machine lives in.
///
/// Declaration is synchronous and single-threaded. Binding errors are
/// fatal: a definition that failed to bind is left partially bound and
/// should be discarded.
#[derive(Debug, Default)]
pub struct MachineDefinition {
    states: Vec<StateNode>,
    graphs: Vec<GraphNode>,
}

impl MachineDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an unbound state. The creation id keys the compiled document
    /// unless a state-name override or prefixes apply; clashing ids are
    /// caught when a graph containing both states compiles.
    pub fn add_state(&mut self, id: impl Into<String>, config: StateConfig) -> StateHandle {
        let handle = StateHandle(self.states.len());
        self.states.push(StateNode {
            id: id.into(),
            config,
            prefixes: Vec::new(),
            next: None,
            default_choice: None,
            choices: Vec::new(),
            catches: Vec::new(),
            retries: Vec::new(),
            branches: Vec::new(),
            iteration: None,
            processor: None,
            graph: None,
            incoming: Vec::new(),
        });
        handle
    }

    /// Create a graph rooted at `start` and bind `start`'s connected
    /// component to it.
    pub fn add_graph(
        &mut self,
        start: StateHandle,
        description: impl Into<String>,
    ) -> DefinitionResult<GraphHandle> {
        let handle = GraphHandle(self.graphs.len());
        self.graphs.push(GraphNode {
            start,
            description: description.into(),
            states: Vec::new(),
            super_graph: None,
        });
        self.bind_to_graph(start, handle)?;
        Ok(handle)
    }

    // ── Transition declaration ───────────────────────────────────────

    /// Declare the default transition of `from`.
    pub fn set_next(&mut self, from: StateHandle, to: StateHandle) -> DefinitionResult<()> {
        if let Some(existing) = self.states[from.0].next {
            return Err(DefinitionError::NextAlreadySet {
                state_id: self.state_id(from),
                next_id: self.state_id(existing),
            });
        }
        self.states[from.0].next = Some(to);
        self.link(from, to)
    }

    /// Append a conditional branch to `from`. Branch order is preserved
    /// into the compiled document.
    pub fn add_choice(&mut self, from: StateHandle, branch: ChoiceBranch) -> DefinitionResult<()> {
        let target = branch.next;
        self.states[from.0].choices.push(branch);
        self.link(from, target)
    }

    /// Declare the branch taken when no condition matches.
    pub fn set_default_choice(
        &mut self,
        from: StateHandle,
        to: StateHandle,
    ) -> DefinitionResult<()> {
        if self.states[from.0].default_choice.is_some() {
            return Err(DefinitionError::DefaultChoiceAlreadySet {
                state_id: self.state_id(from),
            });
        }
        self.states[from.0].default_choice = Some(to);
        self.link(from, to)
    }

    /// Append a retry rule to `state`. The wildcard matcher must stand
    /// alone in the rule's set.
    pub fn add_retry(&mut self, state: StateHandle, policy: RetryPolicy) -> DefinitionResult<()> {
        if let Some(errors) = &policy.errors {
            matchers::validate_matchers(errors)?;
        }
        self.states[state.0].retries.push(policy);
        Ok(())
    }

    /// Append an error handler to `state`. The handler's target is a
    /// transition target like any other and carries graph membership.
    pub fn add_catch(&mut self, state: StateHandle, catch: CatchHandler) -> DefinitionResult<()> {
        if let Some(errors) = &catch.errors {
            matchers::validate_matchers(errors)?;
        }
        let target = catch.next;
        self.states[state.0].catches.push(catch);
        self.link(state, target)
    }

    /// Record an incoming reference on `to` and share `from`'s graph
    /// membership with it.
    fn link(&mut self, from: StateHandle, to: StateHandle) -> DefinitionResult<()> {
        self.states[to.0].incoming.push(from);
        if let Some(graph) = self.states[from.0].graph {
            self.bind_to_graph(to, graph)?;
        }
        Ok(())
    }

    // ── Sub-graph attachment ─────────────────────────────────────────

    /// Attach a parallel branch to `state`. Branch order is preserved into
    /// the compiled document; a rejected attachment leaves the state
    /// unchanged.
    pub fn add_branch(&mut self, state: StateHandle, branch: GraphHandle) -> DefinitionResult<()> {
        if let Some(graph) = self.states[state.0].graph {
            self.register_super_graph(branch, graph)?;
        }
        self.states[state.0].branches.push(branch);
        Ok(())
    }

    /// Attach the iteration body of `state`. At most one per state.
    pub fn set_iteration_body(
        &mut self,
        state: StateHandle,
        body: GraphHandle,
    ) -> DefinitionResult<()> {
        if self.states[state.0].iteration.is_some() {
            return Err(DefinitionError::IterationBodyAlreadySet {
                state_id: self.state_id(state),
            });
        }
        if let Some(graph) = self.states[state.0].graph {
            self.register_super_graph(body, graph)?;
        }
        self.states[state.0].iteration = Some(body);
        Ok(())
    }

    /// Attach the item processor of `state`. At most one per state; an
    /// execution type is only accepted in distributed mode.
    pub fn set_item_processor(
        &mut self,
        state: StateHandle,
        body: GraphHandle,
        config: ProcessorConfig,
    ) -> DefinitionResult<()> {
        if self.states[state.0].processor.is_some() {
            return Err(DefinitionError::ProcessorAlreadySet {
                state_id: self.state_id(state),
            });
        }
        if !config.is_distributed() && config.execution_type.is_some() {
            return Err(DefinitionError::InlineProcessorExecutionType {
                state_id: self.state_id(state),
            });
        }
        if let Some(graph) = self.states[state.0].graph {
            self.register_super_graph(body, graph)?;
        }
        self.states[state.0].processor = Some((body, config));
        Ok(())
    }

    // ── Graph binding ────────────────────────────────────────────────

    /// Bind `state` and everything transitively connected to it to
    /// `graph`.
    ///
    /// Rebinding to the same graph is a no-op. A state can never move to a
    /// second graph; membership propagates over incoming references and
    /// every outgoing transition (next, default choice, choice targets,
    /// catch targets), and each owned sub-graph registers `graph` as its
    /// enclosing super-graph. The walk is iterative and the already-bound
    /// check makes it terminate on cycles.
    pub fn bind_to_graph(&mut self, state: StateHandle, graph: GraphHandle) -> DefinitionResult<()> {
        let mut worklist = VecDeque::from([state]);

        while let Some(current) = worklist.pop_front() {
            match self.states[current.0].graph {
                Some(existing) if existing == graph => continue,
                Some(existing) => {
                    return Err(DefinitionError::StateAlreadyInGraph {
                        state_id: self.state_id(current),
                        current: self.graphs[existing.0].description.clone(),
                        requested: self.graphs[graph.0].description.clone(),
                    });
                }
                None => {}
            }

            self.states[current.0].graph = Some(graph);
            self.graphs[graph.0].states.push(current);
            debug!(
                state = %self.state_id(current),
                graph = %self.graphs[graph.0].description,
                "State bound to graph"
            );

            let node = &self.states[current.0];
            worklist.extend(node.incoming.iter().copied());
            worklist.extend(node.next);
            worklist.extend(node.default_choice);
            worklist.extend(node.choices.iter().map(|choice| choice.next));
            worklist.extend(node.catches.iter().map(|catch| catch.next));

            let owned: Vec<GraphHandle> = node
                .branches
                .iter()
                .copied()
                .chain(node.iteration)
                .chain(node.processor.map(|(body, _)| body))
                .collect();
            for sub in owned {
                self.register_super_graph(sub, graph)?;
            }
        }
        Ok(())
    }

    /// Record `graph` as the enclosing super-graph of `sub`. Idempotent
    /// for the same enclosing graph; a graph nests in at most one, and
    /// the nesting relation must stay acyclic.
    fn register_super_graph(
        &mut self,
        sub: GraphHandle,
        graph: GraphHandle,
    ) -> DefinitionResult<()> {
        match self.graphs[sub.0].super_graph {
            Some(existing) if existing == graph => return Ok(()),
            Some(existing) => {
                return Err(DefinitionError::GraphAlreadyNested {
                    graph: self.graphs[sub.0].description.clone(),
                    current: self.graphs[existing.0].description.clone(),
                    requested: self.graphs[graph.0].description.clone(),
                });
            }
            None => {}
        }

        // The enclosing chain is kept acyclic by this very check, so the
        // walk terminates. Rendering recurses through sub-graphs, so a
        // cycle must fail here rather than at compile time.
        let mut ancestor = Some(graph);
        while let Some(current) = ancestor {
            if current == sub {
                return Err(DefinitionError::CyclicNesting {
                    graph: self.graphs[sub.0].description.clone(),
                    requested: self.graphs[graph.0].description.clone(),
                });
            }
            ancestor = self.graphs[current.0].super_graph;
        }

        self.graphs[sub.0].super_graph = Some(graph);
        Ok(())
    }

    // ── Identity and prefixing ───────────────────────────────────────

    /// The identifier keying this state in the compiled document: every
    /// accumulated prefix, front to back, followed by the state name (or
    /// the creation id when no name is set).
    pub fn state_id(&self, state: StateHandle) -> String {
        let node = &self.states[state.0];
        let name = node.config.state_name.as_deref().unwrap_or(&node.id);
        let mut id = String::with_capacity(name.len());
        for prefix in &node.prefixes {
            id.push_str(prefix);
        }
        id.push_str(name);
        id
    }

    /// Prepend `prefix` to the state's accumulated prefix list, so the
    /// most recent prefix renders outermost. Empty prefixes are dropped.
    pub fn add_prefix(&mut self, state: StateHandle, prefix: impl Into<String>) {
        let prefix = prefix.into();
        if !prefix.is_empty() {
            self.states[state.0].prefixes.insert(0, prefix);
        }
    }

    /// Apply `prefix` to every member state of `root` and, recursively, of
    /// every sub-graph owned by those members. Walks the ownership tree,
    /// not the transition graph, so unconnected parts of other graphs are
    /// never touched.
    pub fn prefix_states(&mut self, root: GraphHandle, prefix: impl Into<String>) {
        let prefix = prefix.into();
        if prefix.is_empty() {
            return;
        }

        let mut seen = HashSet::from([root]);
        let mut pending = VecDeque::from([root]);
        while let Some(graph) = pending.pop_front() {
            let members = self.graphs[graph.0].states.clone();
            for state in members {
                self.add_prefix(state, prefix.clone());
                let node = &self.states[state.0];
                let owned: Vec<GraphHandle> = node
                    .branches
                    .iter()
                    .copied()
                    .chain(node.iteration)
                    .chain(node.processor.map(|(body, _)| body))
                    .collect();
                for sub in owned {
                    if seen.insert(sub) {
                        pending.push_back(sub);
                    }
                }
            }
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    /// The graph a state is bound to, if any.
    pub fn containing_graph(&self, state: StateHandle) -> Option<GraphHandle> {
        self.states[state.0].graph
    }

    /// The state a graph starts at.
    pub fn graph_start(&self, graph: GraphHandle) -> StateHandle {
        self.graphs[graph.0].start
    }

    /// The graph's human-readable description.
    pub fn graph_description(&self, graph: GraphHandle) -> &str {
        &self.graphs[graph.0].description
    }

    /// Member states in the order binding discovered them.
    pub fn graph_states(&self, graph: GraphHandle) -> &[StateHandle] {
        &self.graphs[graph.0].states
    }

    /// The graph a sub-graph is nested inside, if registered yet.
    pub fn super_graph(&self, graph: GraphHandle) -> Option<GraphHandle> {
        self.graphs[graph.0].super_graph
    }

    /// Total number of states in the arena.
    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// Total number of graphs in the arena.
    pub fn graph_count(&self) -> usize {
        self.graphs.len()
    }

    pub(crate) fn node(&self, state: StateHandle) -> &StateNode {
        &self.states[state.0]
    }

    pub(crate) fn graph_node(&self, graph: GraphHandle) -> &GraphNode {
        &self.graphs[graph.0]
    }
}
