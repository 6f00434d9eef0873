//! Context Gate
//!
//! Decides which transitions are legal under the contexts accumulated so far.
//! An edge is eligible when every context required by its end state is
//! active. Contexts only ever grow during a conversation, and eligibility is
//! monotone in the active set: an eligible edge stays eligible.

use sdk::errors::Result;
use std::collections::BTreeSet;

use crate::graph::{GraphModel, TransitionEdge};

/// True iff the contexts required by `edge.end_state` are all active
///
/// # Errors
///
/// Propagates the lookup error if the end state is undefined or duplicated.
pub fn is_eligible(
    graph: &GraphModel,
    edge: &TransitionEdge,
    active: &BTreeSet<String>,
) -> Result<bool> {
    let required = graph.context_require(&edge.end_state)?;
    Ok(required.is_subset(active))
}

/// Required contexts that are not active, in sorted order
pub fn missing_contexts<'a>(
    required: &'a BTreeSet<String>,
    active: &BTreeSet<String>,
) -> Vec<&'a str> {
    required
        .iter()
        .filter(|tag| !active.contains(*tag))
        .map(String::as_str)
        .collect()
}

/// Edges leaving `state` that are eligible under `active`, in definition order
pub fn eligible_edges<'a>(
    graph: &'a GraphModel,
    state: &'a str,
    active: &BTreeSet<String>,
) -> Result<Vec<&'a TransitionEdge>> {
    let mut eligible = Vec::new();
    for edge in graph.edges_from(state) {
        if is_eligible(graph, edge, active)? {
            eligible.push(edge);
        }
    }
    Ok(eligible)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdk::definition::{EdgeRecord, GraphDefinition, NodeRecord, RawRecord};
    use sdk::errors::EngineError;

    fn contexts(tags: &[&str]) -> BTreeSet<String> {
        tags.iter().map(|t| t.to_string()).collect()
    }

    fn graph() -> GraphModel {
        GraphModel::load(GraphDefinition::from_records(vec![
            RawRecord::from(NodeRecord::new("entry")),
            NodeRecord::new("greet").with_context_set(["greeted"]).into(),
            NodeRecord::new("vault")
                .with_context_require(["greeted", "trusted"])
                .into(),
            EdgeRecord::new(["entry"], "greet", ["hello"]).into(),
            EdgeRecord::new(["entry", "greet"], "vault", ["open the vault"]).into(),
            EdgeRecord::new(["entry"], "ghost", ["boo"]).into(),
        ]))
        .unwrap()
    }

    #[test]
    fn test_edge_without_requirements_is_always_eligible() {
        let graph = graph();
        let edge = &graph.edges()[0];
        assert!(is_eligible(&graph, edge, &contexts(&[])).unwrap());
    }

    #[test]
    fn test_requirements_must_all_be_active() {
        let graph = graph();
        let vault = &graph.edges()[1];
        assert!(!is_eligible(&graph, vault, &contexts(&["greeted"])).unwrap());
        assert!(is_eligible(&graph, vault, &contexts(&["greeted", "trusted"])).unwrap());
        assert!(is_eligible(&graph, vault, &contexts(&["greeted", "trusted", "extra"])).unwrap());
    }

    #[test]
    fn test_missing_contexts_sorted() {
        let required = contexts(&["trusted", "greeted", "admin"]);
        let missing = missing_contexts(&required, &contexts(&["greeted"]));
        assert_eq!(missing, vec!["admin", "trusted"]);
    }

    #[test]
    fn test_missing_contexts_outlive_active_set() {
        let required = contexts(&["data", "greeted"]);
        let missing = {
            let active = contexts(&["greeted"]);
            missing_contexts(&required, &active)
        };
        assert_eq!(missing, vec!["data"]);
        assert!(missing_contexts(&required, &required).is_empty());
    }

    #[test]
    fn test_undefined_end_state_propagates() {
        let graph = graph();
        let ghost = &graph.edges()[2];
        assert!(matches!(
            is_eligible(&graph, ghost, &contexts(&[])),
            Err(EngineError::UnknownIntent(_))
        ));
        assert!(eligible_edges(&graph, "entry", &contexts(&[])).is_err());
    }

    #[test]
    fn test_eligible_edges_filters_in_order() {
        let graph = graph();
        let edges = eligible_edges(&graph, "greet", &contexts(&[])).unwrap();
        assert!(edges.is_empty());

        let edges = eligible_edges(&graph, "greet", &contexts(&["greeted", "trusted"])).unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].end_state, "vault");
    }
}
