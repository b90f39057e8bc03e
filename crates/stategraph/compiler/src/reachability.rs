//! Reachability analysis over declared transitions.
//!
//! Walks stay on one graph level: branch, iteration, and processor bodies
//! are separate graphs and are never descended into. Catch targets only
//! count as edges when the options say so, which lets callers ask "where
//! can execution go" with or without the failure paths.

use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

use crate::definition::{MachineDefinition, StateHandle};

/// Options for reachability walks.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct FindStateOptions {
    /// Follow catch-handler targets as well as ordinary transitions.
    #[serde(default)]
    pub include_error_handlers: bool,
}

impl MachineDefinition {
    /// All states reachable from `start`, in discovery order. The start
    /// state is always included. Safe on cyclic graphs.
    pub fn find_reachable_states(
        &self,
        start: StateHandle,
        options: FindStateOptions,
    ) -> Vec<StateHandle> {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([start]);
        let mut found = Vec::new();

        while let Some(current) = queue.pop_front() {
            if !visited.insert(current) {
                continue;
            }
            found.push(current);
            for target in self.outgoing_targets(current, options) {
                if !visited.contains(&target) {
                    queue.push_back(target);
                }
            }
        }
        found
    }

    /// Reachable states with no outgoing transitions under the same
    /// edge-selection rule.
    pub fn find_reachable_end_states(
        &self,
        start: StateHandle,
        options: FindStateOptions,
    ) -> Vec<StateHandle> {
        self.find_reachable_states(start, options)
            .into_iter()
            .filter(|state| self.outgoing_targets(*state, options).is_empty())
            .collect()
    }

    /// The transition targets a reachability walk follows from one state.
    fn outgoing_targets(&self, state: StateHandle, options: FindStateOptions) -> Vec<StateHandle> {
        let node = self.node(state);
        let mut targets = Vec::new();
        targets.extend(node.next);
        targets.extend(node.default_choice);
        targets.extend(node.choices.iter().map(|choice| choice.next));
        if options.include_error_handlers {
            targets.extend(node.catches.iter().map(|catch| catch.next));
        }
        targets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::StateConfig;
    use crate::transition::{CatchHandler, ChoiceBranch};
    use serde_json::json;

    fn task(machine: &mut MachineDefinition, id: &str) -> StateHandle {
        machine.add_state(id, StateConfig::of_type("Task"))
    }

    fn make_branching_machine() -> (MachineDefinition, [StateHandle; 5]) {
        // Route -> {Fast, Slow}; both -> Done; Fast guarded by Handler.
        let mut machine = MachineDefinition::new();
        let route = machine.add_state("Route", StateConfig::of_type("Choice"));
        let fast = task(&mut machine, "Fast");
        let slow = task(&mut machine, "Slow");
        let done = task(&mut machine, "Done");
        let handler = task(&mut machine, "Handler");

        machine
            .add_choice(
                route,
                ChoiceBranch::new(json!({ "Variable": "$.fast", "BooleanEquals": true }), fast),
            )
            .unwrap();
        machine.set_default_choice(route, slow).unwrap();
        machine.set_next(fast, done).unwrap();
        machine.set_next(slow, done).unwrap();
        machine.add_catch(fast, CatchHandler::new(handler)).unwrap();

        (machine, [route, fast, slow, done, handler])
    }

    #[test]
    fn test_reachable_skips_error_handlers_by_default() {
        let (machine, [route, fast, slow, done, handler]) = make_branching_machine();

        let reachable = machine.find_reachable_states(route, FindStateOptions::default());
        assert_eq!(reachable, vec![route, slow, fast, done]);
        assert!(!reachable.contains(&handler));
    }

    #[test]
    fn test_reachable_with_error_handlers() {
        let (machine, [route, _, _, _, handler]) = make_branching_machine();

        let options = FindStateOptions {
            include_error_handlers: true,
        };
        let reachable = machine.find_reachable_states(route, options);
        assert!(reachable.contains(&handler));
        assert_eq!(reachable.len(), 5);
    }

    #[test]
    fn test_reachability_starts_anywhere() {
        let (machine, [_, fast, _, done, _]) = make_branching_machine();

        let reachable = machine.find_reachable_states(fast, FindStateOptions::default());
        assert_eq!(reachable, vec![fast, done]);
    }

    #[test]
    fn test_end_states() {
        let (machine, [route, _, _, done, handler]) = make_branching_machine();

        let ends = machine.find_reachable_end_states(route, FindStateOptions::default());
        assert_eq!(ends, vec![done]);

        let options = FindStateOptions {
            include_error_handlers: true,
        };
        let ends = machine.find_reachable_end_states(route, options);
        assert_eq!(ends, vec![done, handler]);
    }

    #[test]
    fn test_cycles_terminate() {
        let mut machine = MachineDefinition::new();
        let a = task(&mut machine, "A");
        let b = task(&mut machine, "B");
        machine.set_next(a, b).unwrap();
        machine.set_next(b, a).unwrap();

        let reachable = machine.find_reachable_states(a, FindStateOptions::default());
        assert_eq!(reachable, vec![a, b]);

        let ends = machine.find_reachable_end_states(a, FindStateOptions::default());
        assert!(ends.is_empty());
    }

    #[test]
    fn test_walks_stay_on_one_graph_level() {
        let mut machine = MachineDefinition::new();
        let inner = task(&mut machine, "Inner");
        let sub = machine.add_graph(inner, "Branch body").unwrap();

        let parallel = machine.add_state("Fan", StateConfig::of_type("Parallel"));
        machine.add_branch(parallel, sub).unwrap();
        let done = task(&mut machine, "Done");
        machine.set_next(parallel, done).unwrap();

        let reachable = machine.find_reachable_states(parallel, FindStateOptions::default());
        assert_eq!(reachable, vec![parallel, done]);
        assert!(!reachable.contains(&inner));
    }

    #[test]
    fn test_lone_state_is_its_own_end() {
        let mut machine = MachineDefinition::new();
        let only = task(&mut machine, "Only");

        let reachable = machine.find_reachable_states(only, FindStateOptions::default());
        assert_eq!(reachable, vec![only]);
        let ends = machine.find_reachable_end_states(only, FindStateOptions::default());
        assert_eq!(ends, vec![only]);
    }
}
