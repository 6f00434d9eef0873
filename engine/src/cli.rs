//! CLI interface for Parley
//!
//! This module provides the command-line interface using clap's derive API.
//! It defines all commands and global flags.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parley dialogue engine
///
/// Walks a graph of intents, matching what you type against the example
/// phrasings on the edges leaving the current intent.
#[derive(Parser, Debug)]
#[command(name = "parley")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start an interactive conversation
    Chat {
        /// Graph definition (TOML or JSON)
        #[arg(long, value_name = "PATH")]
        graph: PathBuf,

        /// Local binding passed to code commands (repeatable)
        #[arg(long = "bind", value_name = "KEY=VALUE")]
        bindings: Vec<String>,
    },

    /// Validate a graph definition
    Check {
        /// Graph definition (TOML or JSON)
        #[arg(long, value_name = "PATH")]
        graph: PathBuf,
    },

    /// Score one input against the candidates from a state
    Match {
        /// Graph definition (TOML or JSON)
        #[arg(long, value_name = "PATH")]
        graph: PathBuf,

        /// State to match from (default: the entry intent)
        #[arg(long, value_name = "INTENT")]
        state: Option<String>,

        /// Active context (repeatable)
        #[arg(long = "context", value_name = "TAG")]
        contexts: Vec<String>,

        /// Input to score
        text: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration management actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Validate configuration file
    Validate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from(["parley", "check", "--graph", "bot.toml"]);
        assert!(matches!(cli.command, Command::Check { ref graph } if graph == &PathBuf::from("bot.toml")));
        assert!(!cli.json);
        assert!(cli.log.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from([
            "parley", "--json", "--log", "debug", "check", "--graph", "bot.toml",
        ]);
        assert!(cli.json);
        assert_eq!(cli.log, Some("debug".to_string()));
    }

    #[test]
    fn test_chat_bindings() {
        let cli = Cli::parse_from([
            "parley",
            "chat",
            "--graph",
            "bot.toml",
            "--bind",
            "user=ada",
            "--bind",
            "dir=/tmp",
        ]);
        if let Command::Chat { graph, bindings } = cli.command {
            assert_eq!(graph, PathBuf::from("bot.toml"));
            assert_eq!(bindings, vec!["user=ada", "dir=/tmp"]);
        } else {
            panic!("Expected Chat command");
        }
    }

    #[test]
    fn test_match_command() {
        let cli = Cli::parse_from([
            "parley",
            "match",
            "--graph",
            "bot.toml",
            "--state",
            "greet",
            "--context",
            "greeted",
            "show me all files",
        ]);
        if let Command::Match {
            state,
            contexts,
            text,
            ..
        } = cli.command
        {
            assert_eq!(state.as_deref(), Some("greet"));
            assert_eq!(contexts, vec!["greeted"]);
            assert_eq!(text, "show me all files");
        } else {
            panic!("Expected Match command");
        }
    }

    #[test]
    fn test_config_validate() {
        let cli = Cli::parse_from(["parley", "--config", "/tmp/p.toml", "config", "validate"]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/p.toml")));
        if let Command::Config { action } = cli.command {
            assert!(matches!(action, ConfigAction::Validate));
        } else {
            panic!("Expected Config command");
        }
    }
}
