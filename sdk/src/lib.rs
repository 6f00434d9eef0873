//! Parley SDK
//!
//! Shared types for the Parley dialogue engine: the graph definition records
//! read from disk, the values handed to code commands, and the error taxonomy.

/// Graph definition records
pub mod definition;

/// Error types and handling
pub mod errors;

/// Variable store and local bindings
pub mod types;

// Re-export commonly used types
pub use definition::{EdgeRecord, GraphDefinition, NodeRecord, RawRecord, WILDCARD};
pub use errors::{EngineError, ParleyErrorExt};
pub use types::{LocalBindings, Variables};
