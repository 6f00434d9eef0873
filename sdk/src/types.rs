//! Values threaded through code commands

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::errors::{EngineError, Result};

/// Caller-managed variable store
///
/// The engine never inspects it; code commands read and rewrite it.
pub type Variables = serde_json::Map<String, serde_json::Value>;

/// Bindings supplied by the caller for the lifetime of a conversation
///
/// Code commands may read these for caller context (for example the user's
/// name or the working directory) but cannot change them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalBindings {
    values: BTreeMap<String, String>,
}

impl LocalBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a binding
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Parse `KEY=VALUE` pairs as given on the command line
    pub fn parse_pairs<I, S>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut bindings = Self::new();
        for pair in pairs {
            let pair = pair.as_ref();
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                EngineError::Config(format!("Invalid binding '{}': expected KEY=VALUE", pair))
            })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(EngineError::Config(format!(
                    "Invalid binding '{}': empty key",
                    pair
                )));
            }
            bindings.insert(key, value);
        }
        Ok(bindings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pairs() {
        let bindings = LocalBindings::parse_pairs(["user=ada", "dir=/tmp=x"]).unwrap();
        assert_eq!(bindings.get("user"), Some("ada"));
        // Only the first '=' splits
        assert_eq!(bindings.get("dir"), Some("/tmp=x"));
        assert_eq!(bindings.len(), 2);
    }

    #[test]
    fn test_parse_pairs_rejects_missing_separator() {
        assert!(LocalBindings::parse_pairs(["user"]).is_err());
        assert!(LocalBindings::parse_pairs(["=value"]).is_err());
    }
}
