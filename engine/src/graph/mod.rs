//! Intent Graph
//!
//! Holds the dialogue graph: intent nodes with their optional metadata and
//! transition edges with their example phrasings and precomputed vectors.
//!
//! Loading a [`GraphDefinition`] runs, in order:
//!
//! 1. partition records into nodes and edges
//! 2. expand wildcard `start_states` into every intent known at load time
//! 3. fit the [`FeatureSpace`] over every pattern, edge order then pattern order
//! 4. attach one vector per pattern to each edge
//!
//! After `load` returns the model is immutable and can be shared between
//! conversations behind an `Arc`.

use sdk::definition::{EdgeRecord, GraphDefinition, NodeRecord, RawRecord};
use sdk::errors::{EngineError, Result};
use sdk::types::Variables;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info};

use crate::feature_space::{FeatureSpace, SparseVector, DEFAULT_TOKEN_PATTERN};

static NO_CONTEXTS: BTreeSet<String> = BTreeSet::new();

/// A conversational state
#[derive(Debug, Clone, PartialEq)]
pub struct IntentNode {
    pub intent: String,
    pub context_require: Option<BTreeSet<String>>,
    pub context_set: Option<BTreeSet<String>>,
    pub response: Option<String>,
    pub code_command: Option<String>,
}

impl From<NodeRecord> for IntentNode {
    fn from(record: NodeRecord) -> Self {
        Self {
            intent: record.intent,
            context_require: record.context_require.map(|tags| tags.into_iter().collect()),
            context_set: record.context_set.map(|tags| tags.into_iter().collect()),
            response: record.response,
            code_command: record.code_command,
        }
    }
}

/// A transition between intents
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionEdge {
    pub start_states: Vec<String>,
    pub end_state: String,
    pub patterns: Vec<String>,
    /// One vector per pattern, same order
    pub pattern_vectors: Vec<SparseVector>,
    /// Whether `start_states` came from the wildcard
    pub from_wildcard: bool,
}

impl TransitionEdge {
    /// True if this edge leaves `state`
    pub fn starts_at(&self, state: &str) -> bool {
        self.start_states.iter().any(|s| s == state)
    }

    /// `(vector, pattern)` pairs in pattern order
    pub fn pattern_pairs(&self) -> impl Iterator<Item = (&SparseVector, &str)> {
        self.pattern_vectors
            .iter()
            .zip(self.patterns.iter().map(String::as_str))
    }
}

/// Counts reported by `parley check`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphSummary {
    pub nodes: usize,
    pub edges: usize,
    pub wildcard_edges: usize,
    pub patterns: usize,
    pub vocabulary: usize,
}

/// The loaded intent graph
#[derive(Debug, Clone)]
pub struct GraphModel {
    nodes: Vec<IntentNode>,
    edges: Vec<TransitionEdge>,
    /// intent -> positions in `nodes`; more than one position is a duplicate
    index: HashMap<String, Vec<usize>>,
    feature_space: FeatureSpace,
    variables: Variables,
}

impl GraphModel {
    /// Load a graph definition with the default token pattern
    pub fn load(definition: GraphDefinition) -> Result<Self> {
        Self::load_with_pattern(definition, DEFAULT_TOKEN_PATTERN)
    }

    /// Load a graph definition, tokenising patterns with `token_pattern`
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Config` if an edge has no start states or no
    /// patterns, or if the token pattern is invalid. Duplicate or undefined
    /// intents are not load errors; they surface on lookup or through
    /// [`GraphModel::validate`].
    pub fn load_with_pattern(definition: GraphDefinition, token_pattern: &str) -> Result<Self> {
        let GraphDefinition { records, variables } = definition;

        let mut nodes = Vec::new();
        let mut edge_records: Vec<EdgeRecord> = Vec::new();
        for record in records {
            match record {
                RawRecord::Node(node) => nodes.push(IntentNode::from(node)),
                RawRecord::Edge(edge) => edge_records.push(edge),
            }
        }

        for (position, edge) in edge_records.iter().enumerate() {
            if edge.start_states.is_empty() {
                return Err(EngineError::Config(format!(
                    "Edge #{} to '{}' has no start states",
                    position, edge.end_state
                )));
            }
            if edge.patterns.is_empty() {
                return Err(EngineError::Config(format!(
                    "Edge #{} to '{}' has no patterns",
                    position, edge.end_state
                )));
            }
        }

        // Wildcard expansion sees exactly the nodes present now
        let all_intents: Vec<String> = nodes.iter().map(|n| n.intent.clone()).collect();

        let feature_space = FeatureSpace::fit_with_pattern(
            edge_records
                .iter()
                .flat_map(|edge| edge.patterns.iter().map(String::as_str)),
            token_pattern,
        )?;

        let edges: Vec<TransitionEdge> = edge_records
            .into_iter()
            .map(|edge| {
                let from_wildcard = edge.is_wildcard();
                let start_states = if from_wildcard {
                    all_intents.clone()
                } else {
                    edge.start_states
                };
                let pattern_vectors = edge
                    .patterns
                    .iter()
                    .map(|pattern| feature_space.transform(pattern))
                    .collect();
                TransitionEdge {
                    start_states,
                    end_state: edge.end_state,
                    patterns: edge.patterns,
                    pattern_vectors,
                    from_wildcard,
                }
            })
            .collect();

        let mut index: HashMap<String, Vec<usize>> = HashMap::new();
        for (position, node) in nodes.iter().enumerate() {
            index.entry(node.intent.clone()).or_default().push(position);
        }

        info!(
            "Loaded intent graph: {} nodes, {} edges, {} terms",
            nodes.len(),
            edges.len(),
            feature_space.vocabulary_len()
        );

        Ok(Self {
            nodes,
            edges,
            index,
            feature_space,
            variables,
        })
    }

    /// The unique node for `intent`
    ///
    /// # Errors
    ///
    /// `UnknownIntent` if no node matches, `DuplicateIntent` if several do.
    pub fn node(&self, intent: &str) -> Result<&IntentNode> {
        match self.index.get(intent).map(Vec::as_slice) {
            None | Some([]) => Err(EngineError::UnknownIntent(intent.to_string())),
            Some([position]) => Ok(&self.nodes[*position]),
            Some(positions) => Err(EngineError::DuplicateIntent {
                intent: intent.to_string(),
                count: positions.len(),
            }),
        }
    }

    /// Read one field of the node for `intent`, falling back to `default`
    /// when the node exists but the field is absent
    ///
    /// ```
    /// use parley_engine::graph::GraphModel;
    /// use sdk::definition::{GraphDefinition, NodeRecord};
    ///
    /// let graph = GraphModel::load(GraphDefinition::from_records([
    ///     NodeRecord::new("entry"),
    /// ]))
    /// .unwrap();
    /// let response = graph
    ///     .field_of("entry", |node| node.response.as_deref(), "")
    ///     .unwrap();
    /// assert_eq!(response, "");
    /// assert!(graph.field_of("nowhere", |node| node.response.as_deref(), "").is_err());
    /// ```
    pub fn field_of<'a, T, F>(&'a self, intent: &str, field: F, default: T) -> Result<T>
    where
        F: FnOnce(&'a IntentNode) -> Option<T>,
    {
        let node = self.node(intent)?;
        Ok(field(node).unwrap_or(default))
    }

    /// Contexts required to enter `intent` (empty if unset)
    pub fn context_require(&self, intent: &str) -> Result<&BTreeSet<String>> {
        self.field_of(intent, |n| n.context_require.as_ref(), &NO_CONTEXTS)
    }

    /// Contexts activated by entering `intent` (empty if unset)
    pub fn context_set(&self, intent: &str) -> Result<&BTreeSet<String>> {
        self.field_of(intent, |n| n.context_set.as_ref(), &NO_CONTEXTS)
    }

    /// Response text for `intent` (empty if unset)
    pub fn response(&self, intent: &str) -> Result<&str> {
        self.field_of(intent, |n| n.response.as_deref(), "")
    }

    /// Code command name for `intent`, if any
    pub fn code_command(&self, intent: &str) -> Result<Option<&str>> {
        self.field_of(intent, |n| Some(n.code_command.as_deref()), None)
    }

    /// All edges leaving `state`, in definition order
    pub fn edges_from<'a>(&'a self, state: &'a str) -> impl Iterator<Item = &'a TransitionEdge> {
        self.edges.iter().filter(move |edge| edge.starts_at(state))
    }

    pub fn nodes(&self) -> &[IntentNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[TransitionEdge] {
        &self.edges
    }

    /// Node intents in definition order
    pub fn intents(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.intent.as_str())
    }

    pub fn feature_space(&self) -> &FeatureSpace {
        &self.feature_space
    }

    /// Variable store the definition starts conversations with
    pub fn initial_variables(&self) -> &Variables {
        &self.variables
    }

    /// Every configuration fault in the graph, given the entry intent
    ///
    /// Reports duplicate intents, the entry intent if it does not resolve,
    /// and every start or end state that does not resolve to exactly one
    /// node. Each faulty intent is reported once.
    pub fn faults(&self, entry: &str) -> Vec<EngineError> {
        let mut faults = Vec::new();
        let mut reported: BTreeSet<&str> = BTreeSet::new();

        for node in &self.nodes {
            if reported.contains(node.intent.as_str()) {
                continue;
            }
            if let Err(e) = self.node(&node.intent) {
                reported.insert(node.intent.as_str());
                faults.push(e);
            }
        }

        let referenced = std::iter::once(entry).chain(self.edges.iter().flat_map(|edge| {
            edge.start_states
                .iter()
                .map(String::as_str)
                .chain(std::iter::once(edge.end_state.as_str()))
        }));

        for intent in referenced {
            if reported.contains(intent) {
                continue;
            }
            if let Err(e) = self.node(intent) {
                debug!("Graph fault on '{}': {}", intent, e);
                reported.insert(intent);
                faults.push(e);
            }
        }

        faults
    }

    /// Fail on the first configuration fault, if any
    pub fn validate(&self, entry: &str) -> Result<()> {
        match self.faults(entry).into_iter().next() {
            Some(fault) => Err(fault),
            None => Ok(()),
        }
    }

    pub fn summary(&self) -> GraphSummary {
        GraphSummary {
            nodes: self.nodes.len(),
            edges: self.edges.len(),
            wildcard_edges: self.edges.iter().filter(|e| e.from_wildcard).count(),
            patterns: self.edges.iter().map(|e| e.patterns.len()).sum(),
            vocabulary: self.feature_space.vocabulary_len(),
        }
    }
}
