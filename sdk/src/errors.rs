//! Error types and handling
//!
//! This module provides the error types used throughout the Parley engine.
//! All errors implement the `ParleyErrorExt` trait which provides user-friendly
//! hints and indicates whether errors are recoverable.
//!
//! Rejected user input (a low-confidence match or a missing context) is not an
//! error: the engine reports it as a turn outcome and the conversation goes on.
//! Everything in this enum is a fault in the configuration, the graph, or the
//! host environment.

use thiserror::Error;

/// Trait for Parley error extensions
///
/// This trait provides additional context for errors, including user-friendly
/// hints and recoverability information. All engine errors implement this trait.
pub trait ParleyErrorExt {
    /// Returns a user-friendly hint for the error
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// A broken intent graph cannot safely continue a conversation, so graph
    /// faults are never recoverable.
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// # Error Categories
///
/// - **Configuration**: invalid engine config or unreadable graph definition
/// - **Graph**: undefined or duplicate intents, unknown code commands
/// - **Conversation**: dead-end states with no legal transitions
///
/// # Examples
///
/// ```
/// use sdk::errors::{EngineError, ParleyErrorExt};
///
/// let error = EngineError::DuplicateIntent {
///     intent: "greet".to_string(),
///     count: 2,
/// };
/// println!("Hint: {}", error.user_hint());
/// assert!(!error.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Graph errors
    #[error("Unknown intent: {0}")]
    UnknownIntent(String),

    #[error("Intent '{intent}' is defined {count} times")]
    DuplicateIntent { intent: String, count: usize },

    #[error("Unknown code command: {0}")]
    UnknownCommand(String),

    // Conversation errors
    #[error("No legal transitions from state '{state}'")]
    NoCandidates { state: String },

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// True for every fault that means the intent graph itself is broken.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::UnknownIntent(_)
                | Self::DuplicateIntent { .. }
                | Self::UnknownCommand(_)
        )
    }
}

impl ParleyErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check your config.toml and graph definition for errors",
            Self::UnknownIntent(_) => "Every start and end state must be defined as a node",
            Self::DuplicateIntent { .. } => "Each intent may only be defined once",
            Self::UnknownCommand(_) => "The node names a code command that is not registered",
            Self::NoCandidates { .. } => {
                "The conversation reached a state with no way out. Add an edge leaving it"
            }
            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            Self::Config(_)
            | Self::UnknownIntent(_)
            | Self::DuplicateIntent { .. }
            | Self::UnknownCommand(_)
            | Self::NoCandidates { .. } => false,

            Self::Io(_) => true,
        }
    }
}

/// Result alias used across the engine
pub type Result<T> = std::result::Result<T, EngineError>;
