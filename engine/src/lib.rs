//! Parley Engine Library
//!
//! This library provides the core functionality of the Parley dialogue engine.
//! It is used by both the main binary and integration tests.

/// Configuration management module
pub mod config;

/// TF-IDF feature space and sparse vectors
pub mod feature_space;

/// Intent graph model
pub mod graph;

/// Context eligibility of transitions
pub mod context_gate;

/// Best-match selection over candidate phrasings
pub mod matcher;

/// Conversation state machine
pub mod conversation;

/// Code command handlers
pub mod commands;

/// Unmatched-input sinks
pub mod sink;

/// Turn I/O and speech capture
pub mod console;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
