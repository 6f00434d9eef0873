//! Graph definition records
//!
//! A graph definition is an ordered list of records. Each record is either a
//! node (it has an `intent` field) or an edge (it has a `start_states` field).
//! Record order matters: it fixes the order of edges, the order in which the
//! wildcard expands, and the order patterns are fed to the feature space.
//!
//! ```toml
//! [variables]
//! name = "stranger"
//!
//! [[record]]
//! intent = "entry"
//!
//! [[record]]
//! intent = "greet"
//! context_set = ["greeted"]
//! response = "Hello!"
//!
//! [[record]]
//! start_states = ["*"]
//! end_state = "greet"
//! patterns = ["hello", "hi there"]
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::errors::{EngineError, Result};
use crate::types::Variables;

/// `start_states` value meaning "every intent known at load time"
pub const WILDCARD: &str = "*";

/// A node record: one conversational state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeRecord {
    pub intent: String,

    /// Contexts that must be active before this node can be entered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_require: Option<Vec<String>>,

    /// Contexts activated when this node is entered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_set: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,

    /// Name of a registered code command run on entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_command: Option<String>,
}

impl NodeRecord {
    /// Create a bare node with no optional fields
    pub fn new(intent: impl Into<String>) -> Self {
        Self {
            intent: intent.into(),
            context_require: None,
            context_set: None,
            response: None,
            code_command: None,
        }
    }

    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.response = Some(response.into());
        self
    }

    pub fn with_context_require<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.context_require = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_context_set<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.context_set = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_code_command(mut self, name: impl Into<String>) -> Self {
        self.code_command = Some(name.into());
        self
    }
}

/// An edge record: a transition with its example phrasings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EdgeRecord {
    pub start_states: Vec<String>,
    pub end_state: String,
    pub patterns: Vec<String>,
}

impl EdgeRecord {
    pub fn new<I, S, P, T>(start_states: I, end_state: impl Into<String>, patterns: P) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        P: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            start_states: start_states.into_iter().map(Into::into).collect(),
            end_state: end_state.into(),
            patterns: patterns.into_iter().map(Into::into).collect(),
        }
    }

    /// Edge leaving every intent
    pub fn from_anywhere<P, T>(end_state: impl Into<String>, patterns: P) -> Self
    where
        P: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self::new([WILDCARD], end_state, patterns)
    }

    /// True when `start_states` is exactly the wildcard sentinel
    pub fn is_wildcard(&self) -> bool {
        self.start_states.len() == 1 && self.start_states[0] == WILDCARD
    }
}

/// One entry of a graph definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawRecord {
    Node(NodeRecord),
    Edge(EdgeRecord),
}

impl From<NodeRecord> for RawRecord {
    fn from(node: NodeRecord) -> Self {
        Self::Node(node)
    }
}

impl From<EdgeRecord> for RawRecord {
    fn from(edge: EdgeRecord) -> Self {
        Self::Edge(edge)
    }
}

/// A complete graph definition as read from disk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDefinition {
    /// Initial variable store handed to the conversation
    #[serde(default)]
    pub variables: Variables,

    #[serde(default, rename = "record", alias = "records")]
    pub records: Vec<RawRecord>,
}

impl GraphDefinition {
    /// Build a definition from records in order
    pub fn from_records<I, R>(records: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<RawRecord>,
    {
        Self {
            records: records.into_iter().map(Into::into).collect(),
            variables: Variables::new(),
        }
    }

    /// Parse a TOML graph definition
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse graph definition: {}", e)))
    }

    /// Parse a JSON graph definition
    pub fn from_json_str(contents: &str) -> Result<Self> {
        serde_json::from_str(contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse graph definition: {}", e)))
    }

    /// Load a graph definition, choosing the format from the file extension
    ///
    /// `.json` files are parsed as JSON, everything else as TOML.
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            EngineError::Config(format!(
                "Failed to read graph definition {}: {}",
                path.display(),
                e
            ))
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&contents),
            _ => Self::from_toml_str(&contents),
        }
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeRecord> {
        self.records.iter().filter_map(|record| match record {
            RawRecord::Node(node) => Some(node),
            RawRecord::Edge(_) => None,
        })
    }

    pub fn edges(&self) -> impl Iterator<Item = &EdgeRecord> {
        self.records.iter().filter_map(|record| match record {
            RawRecord::Edge(edge) => Some(edge),
            RawRecord::Node(_) => None,
        })
    }
}
