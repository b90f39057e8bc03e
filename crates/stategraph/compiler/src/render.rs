//! Document rendering: compiling states and graphs into fragments.
//!
//! Rendering is pure with respect to the arena: it never mutates, and a
//! failing render returns the error without partial output. Fragments are
//! built over the caller-supplied kind fields, so compiler-owned keys win
//! on collision.

use serde_json::{Map, Value};
use tracing::debug;

use stategraph_types::{
    dialect, fields, matchers, DefinitionError, DefinitionResult, QueryLanguage, RetryPolicy,
};

use crate::definition::{GraphHandle, MachineDefinition, StateHandle, StateNode};
use crate::transition::{CatchHandler, ChoiceBranch};

impl MachineDefinition {
    /// Compile one state into its document fragment.
    ///
    /// `root` is the machine-level dialect the fragment will live under;
    /// the state's own override resolves against it. Binding is not
    /// required: identity and every fragment are graph-independent.
    pub fn render_state(
        &self,
        state: StateHandle,
        root: Option<QueryLanguage>,
    ) -> DefinitionResult<Value> {
        let node = self.node(state);
        let state_id = self.state_id(state);
        let effective = dialect::resolve(root, node.config.query_language);

        let mut document = node.config.fields.clone();

        if let Some(comment) = &node.config.comment {
            document.insert("Comment".into(), Value::String(comment.clone()));
        }
        if let Some(language) = dialect::annotation(root, node.config.query_language, &state_id)? {
            document.insert("QueryLanguage".into(), Value::String(language.to_string()));
        }

        render_data_flow(&mut document, node, &state_id, effective)?;

        if !node.retries.is_empty() {
            let mut ordered: Vec<&RetryPolicy> = node.retries.iter().collect();
            ordered.sort_by_key(|policy| policy.matches_all_errors());
            let rendered: Vec<Value> = ordered.into_iter().map(render_retry).collect();
            document.insert("Retry".into(), Value::Array(rendered));
        }
        if !node.catches.is_empty() {
            let mut ordered: Vec<&CatchHandler> = node.catches.iter().collect();
            ordered.sort_by_key(|catch| catch.catches_all_errors());
            let mut rendered = Vec::with_capacity(ordered.len());
            for catch in ordered {
                rendered.push(self.render_catch(catch, &state_id, effective)?);
            }
            document.insert("Catch".into(), Value::Array(rendered));
        }

        if !node.branches.is_empty() {
            let mut rendered = Vec::with_capacity(node.branches.len());
            for branch in &node.branches {
                rendered.push(self.render_graph(*branch, root)?);
            }
            document.insert("Branches".into(), Value::Array(rendered));
        }
        if let Some(body) = node.iteration {
            document.insert("Iterator".into(), self.render_graph(body, root)?);
        }
        if let Some((body, config)) = node.processor {
            let mut processor = self.render_graph_fragment(body, root)?;
            let mut processor_config = Map::new();
            processor_config.insert("Mode".into(), Value::String(config.mode.to_string()));
            if config.is_distributed() {
                let execution_type = config.execution_type.unwrap_or_default();
                processor_config.insert(
                    "ExecutionType".into(),
                    Value::String(execution_type.to_string()),
                );
            }
            processor.insert("ProcessorConfig".into(), Value::Object(processor_config));
            document.insert("ItemProcessor".into(), Value::Object(processor));
        }

        if !node.choices.is_empty() {
            let mut rendered = Vec::with_capacity(node.choices.len());
            for branch in &node.choices {
                rendered.push(self.render_choice(branch, &state_id, effective)?);
            }
            document.insert("Choices".into(), Value::Array(rendered));
        }
        if let Some(default) = node.default_choice {
            document.insert("Default".into(), Value::String(self.state_id(default)));
        }

        // Next/End are suppressed for terminal states and for states that
        // declare any choice content.
        if node.choices.is_empty() && node.default_choice.is_none() && !node.config.terminal {
            match node.next {
                Some(next) => {
                    document.insert("Next".into(), Value::String(self.state_id(next)));
                }
                None => {
                    document.insert("End".into(), Value::Bool(true));
                }
            }
        }

        Ok(Value::Object(document))
    }

    /// Compile a graph into its `StartAt`/`States` fragment.
    pub fn render_graph(
        &self,
        graph: GraphHandle,
        root: Option<QueryLanguage>,
    ) -> DefinitionResult<Value> {
        self.render_graph_fragment(graph, root).map(Value::Object)
    }

    pub(crate) fn render_graph_fragment(
        &self,
        graph: GraphHandle,
        root: Option<QueryLanguage>,
    ) -> DefinitionResult<Map<String, Value>> {
        let graph_node = self.graph_node(graph);

        let mut states = Map::new();
        for member in &graph_node.states {
            let state_id = self.state_id(*member);
            let rendered = self.render_state(*member, root)?;
            if states.insert(state_id.clone(), rendered).is_some() {
                return Err(DefinitionError::DuplicateStateId {
                    state_id,
                    graph: graph_node.description.clone(),
                });
            }
        }

        let mut fragment = Map::new();
        fragment.insert(
            "StartAt".into(),
            Value::String(self.state_id(graph_node.start)),
        );
        fragment.insert("States".into(), Value::Object(states));
        debug!(
            graph = %graph_node.description,
            state_count = graph_node.states.len(),
            "Graph rendered"
        );
        Ok(fragment)
    }

    // ── Transition fragments ─────────────────────────────────────────

    /// One catch entry: matchers, dialect-gated options, resolved target.
    fn render_catch(
        &self,
        catch: &CatchHandler,
        state_id: &str,
        effective: QueryLanguage,
    ) -> DefinitionResult<Value> {
        let mut entry = Map::new();
        let errors = matchers::effective_matchers(catch.errors.as_deref());
        entry.insert(
            "ErrorEquals".into(),
            Value::Array(errors.into_iter().map(Value::String).collect()),
        );

        match effective {
            QueryLanguage::JsonPath => {
                if catch.output.is_some() {
                    return Err(field_not_supported(state_id, "Output", effective));
                }
                if let Some(path) = &catch.result_path {
                    fields::validate_path("ResultPath", path)?;
                    entry.insert("ResultPath".into(), Value::String(path.clone()));
                }
                if !catch.assign.is_empty() {
                    entry.insert(
                        "Assign".into(),
                        fields::render_object(&Value::Object(catch.assign.clone())),
                    );
                }
            }
            QueryLanguage::Jsonata => {
                if catch.result_path.is_some() {
                    return Err(field_not_supported(state_id, "ResultPath", effective));
                }
                if let Some(output) = &catch.output {
                    entry.insert("Output".into(), output.clone());
                }
                if !catch.assign.is_empty() {
                    entry.insert("Assign".into(), Value::Object(catch.assign.clone()));
                }
            }
        }

        entry.insert("Next".into(), Value::String(self.state_id(catch.next)));
        Ok(Value::Object(entry))
    }

    /// One choice entry: the condition's fragment, options, resolved
    /// target. Object fragments merge; any other fragment lands under a
    /// `Condition` key.
    fn render_choice(
        &self,
        branch: &ChoiceBranch,
        state_id: &str,
        effective: QueryLanguage,
    ) -> DefinitionResult<Value> {
        let mut entry = match branch.condition.render_condition() {
            Value::Object(fragment) => fragment,
            other => {
                let mut fragment = Map::new();
                fragment.insert("Condition".into(), other);
                fragment
            }
        };

        if let Some(comment) = &branch.comment {
            entry.insert("Comment".into(), Value::String(comment.clone()));
        }
        match effective {
            QueryLanguage::JsonPath => {
                if branch.output.is_some() {
                    return Err(field_not_supported(state_id, "Output", effective));
                }
                if !branch.assign.is_empty() {
                    entry.insert(
                        "Assign".into(),
                        fields::render_object(&Value::Object(branch.assign.clone())),
                    );
                }
            }
            QueryLanguage::Jsonata => {
                if let Some(output) = &branch.output {
                    entry.insert("Output".into(), output.clone());
                }
                if !branch.assign.is_empty() {
                    entry.insert("Assign".into(), Value::Object(branch.assign.clone()));
                }
            }
        }

        entry.insert("Next".into(), Value::String(self.state_id(branch.next)));
        Ok(Value::Object(entry))
    }
}

// ── Data-flow and retry fragments ────────────────────────────────────

/// Input/output transformation fields, gated by the effective dialect.
fn render_data_flow(
    document: &mut Map<String, Value>,
    node: &StateNode,
    state_id: &str,
    effective: QueryLanguage,
) -> DefinitionResult<()> {
    match effective {
        QueryLanguage::JsonPath => {
            if node.config.arguments.is_some() {
                return Err(field_not_supported(state_id, "Arguments", effective));
            }
            if node.config.output.is_some() {
                return Err(field_not_supported(state_id, "Output", effective));
            }
            if let Some(path) = &node.config.input_path {
                fields::validate_path("InputPath", path)?;
                document.insert("InputPath".into(), Value::String(path.clone()));
            }
            if let Some(parameters) = &node.config.parameters {
                document.insert("Parameters".into(), fields::render_object(parameters));
            }
            if let Some(path) = &node.config.result_path {
                fields::validate_path("ResultPath", path)?;
                document.insert("ResultPath".into(), Value::String(path.clone()));
            }
            if let Some(path) = &node.config.output_path {
                fields::validate_path("OutputPath", path)?;
                document.insert("OutputPath".into(), Value::String(path.clone()));
            }
            if !node.config.assign.is_empty() {
                document.insert(
                    "Assign".into(),
                    fields::render_object(&Value::Object(node.config.assign.clone())),
                );
            }
        }
        QueryLanguage::Jsonata => {
            for (field, configured) in [
                ("InputPath", node.config.input_path.is_some()),
                ("Parameters", node.config.parameters.is_some()),
                ("ResultPath", node.config.result_path.is_some()),
                ("OutputPath", node.config.output_path.is_some()),
            ] {
                if configured {
                    return Err(field_not_supported(state_id, field, effective));
                }
            }
            if let Some(arguments) = &node.config.arguments {
                document.insert("Arguments".into(), arguments.clone());
            }
            if let Some(output) = &node.config.output {
                document.insert("Output".into(), output.clone());
            }
            if !node.config.assign.is_empty() {
                document.insert("Assign".into(), Value::Object(node.config.assign.clone()));
            }
        }
    }
    Ok(())
}

/// One retry entry: matchers plus whichever backoff parameters are set.
fn render_retry(policy: &RetryPolicy) -> Value {
    let mut entry = Map::new();
    let errors = matchers::effective_matchers(policy.errors.as_deref());
    entry.insert(
        "ErrorEquals".into(),
        Value::Array(errors.into_iter().map(Value::String).collect()),
    );
    if let Some(seconds) = policy.interval_seconds {
        entry.insert("IntervalSeconds".into(), Value::from(seconds));
    }
    if let Some(attempts) = policy.max_attempts {
        entry.insert("MaxAttempts".into(), Value::from(attempts));
    }
    if let Some(rate) = policy.backoff_rate {
        entry.insert("BackoffRate".into(), Value::from(rate));
    }
    if let Some(seconds) = policy.max_delay_seconds {
        entry.insert("MaxDelaySeconds".into(), Value::from(seconds));
    }
    if let Some(jitter) = policy.jitter_strategy {
        entry.insert("JitterStrategy".into(), Value::String(jitter.to_string()));
    }
    Value::Object(entry)
}

fn field_not_supported(state_id: &str, field: &str, dialect: QueryLanguage) -> DefinitionError {
    DefinitionError::FieldNotSupported {
        state_id: state_id.to_string(),
        field: field.to_string(),
        dialect,
    }
}
