//! Code Commands
//!
//! A node may name a handler that runs when the conversation enters it. The
//! handler receives the variable store, the raw input that triggered the
//! transition and the caller's local bindings, and returns the new store.
//!
//! Handlers are looked up by name in a [`CommandRegistry`]. Any closure with
//! the right shape is a [`CodeCommand`]:
//!
//! ```
//! use parley_engine::commands::CommandRegistry;
//! use sdk::types::{LocalBindings, Variables};
//!
//! let mut registry = CommandRegistry::with_builtins();
//! registry.register("count_turns", |mut vars: Variables, _input: &str, _locals: &LocalBindings| {
//!     let turns = vars.get("turns").and_then(|v| v.as_u64()).unwrap_or(0);
//!     vars.insert("turns".into(), (turns + 1).into());
//!     vars
//! });
//! assert!(registry.contains("count_turns"));
//! ```

use sdk::errors::{EngineError, Result};
use sdk::types::{LocalBindings, Variables};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use crate::graph::GraphModel;

/// Handler that leaves the store untouched
pub const IDENTITY: &str = "identity";
/// Handler that stores the raw input under [`LAST_INPUT_KEY`]
pub const REMEMBER_INPUT: &str = "remember_input";
/// Handler that copies every local binding into the store
pub const BIND_LOCALS: &str = "bind_locals";

pub const LAST_INPUT_KEY: &str = "last_input";

/// Capability invoked on entering a node
pub trait CodeCommand: Send + Sync {
    fn call(&self, variables: Variables, input: &str, locals: &LocalBindings) -> Variables;
}

impl<F> CodeCommand for F
where
    F: Fn(Variables, &str, &LocalBindings) -> Variables + Send + Sync,
{
    fn call(&self, variables: Variables, input: &str, locals: &LocalBindings) -> Variables {
        self(variables, input, locals)
    }
}

fn identity(variables: Variables, _input: &str, _locals: &LocalBindings) -> Variables {
    variables
}

fn remember_input(mut variables: Variables, input: &str, _locals: &LocalBindings) -> Variables {
    variables.insert(LAST_INPUT_KEY.to_string(), Value::String(input.to_string()));
    variables
}

fn bind_locals(mut variables: Variables, _input: &str, locals: &LocalBindings) -> Variables {
    for (key, value) in locals.iter() {
        variables.insert(key.to_string(), Value::String(value.to_string()));
    }
    variables
}

/// Name-keyed handler table
#[derive(Clone, Default)]
pub struct CommandRegistry {
    commands: BTreeMap<String, Arc<dyn CodeCommand>>,
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.commands.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl CommandRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding `identity`, `remember_input` and `bind_locals`
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(IDENTITY, identity);
        registry.register(REMEMBER_INPUT, remember_input);
        registry.register(BIND_LOCALS, bind_locals);
        registry
    }

    /// Register a handler, replacing any previous one with the same name
    pub fn register<C>(&mut self, name: impl Into<String>, command: C) -> &mut Self
    where
        C: CodeCommand + 'static,
    {
        let name = name.into();
        debug!("Registered code command '{}'", name);
        self.commands.insert(name, Arc::new(command));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }

    /// Look up a handler by name
    ///
    /// # Errors
    ///
    /// `UnknownCommand` if nothing is registered under `name`.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn CodeCommand>> {
        self.commands
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::UnknownCommand(name.to_string()))
    }

    /// The handler for `intent`'s node, or identity when it names none
    ///
    /// # Errors
    ///
    /// Graph lookup errors for `intent`, or `UnknownCommand`.
    pub fn handler_for(&self, graph: &GraphModel, intent: &str) -> Result<Arc<dyn CodeCommand>> {
        match graph.code_command(intent)? {
            Some(name) => {
                debug!("Code command '{}' for '{}'", name, intent);
                self.resolve(name)
            }
            None => Ok(Arc::new(identity)),
        }
    }

    /// Every handler name in `graph` that this registry cannot resolve
    pub fn unresolved(&self, graph: &GraphModel) -> Vec<EngineError> {
        let mut missing: Vec<EngineError> = Vec::new();
        for node in graph.nodes() {
            if let Some(name) = node.code_command.as_deref() {
                let already = missing
                    .iter()
                    .any(|e| matches!(e, EngineError::UnknownCommand(n) if n == name));
                if !self.contains(name) && !already {
                    missing.push(EngineError::UnknownCommand(name.to_string()));
                }
            }
        }
        missing
    }
}
