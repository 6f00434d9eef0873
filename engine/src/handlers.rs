//! Command handlers for CLI operations
//!
//! This module implements the handlers for all CLI commands:
//! - chat: Run an interactive conversation over a graph
//! - check: Validate a graph definition and summarise it
//! - match: Score one input against the candidates from a state
//! - config show / validate: Inspect the engine configuration

use anyhow::{Context, Result};
use sdk::definition::GraphDefinition;
use sdk::errors::ParleyErrorExt;
use sdk::types::LocalBindings;
use serde_json::json;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::commands::CommandRegistry;
use crate::config::Config;
use crate::console::ConsoleIo;
use crate::conversation::ConversationEngine;
use crate::graph::GraphModel;
use crate::matcher::{self, CandidateSet};
use crate::sink::FileSink;

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// Read and load a graph definition with the configured token pattern
pub fn load_graph(path: &Path, config: &Config) -> Result<GraphModel> {
    let definition = GraphDefinition::from_path(path)
        .with_context(|| format!("Failed to read graph {}", path.display()))?;
    let graph = GraphModel::load_with_pattern(definition, &config.matching.token_pattern)
        .with_context(|| format!("Failed to load graph {}", path.display()))?;
    Ok(graph)
}

/// Start an interactive conversation on stdin/stdout
///
/// The graph is validated first so a broken graph fails before the first
/// prompt rather than in the middle of a conversation.
pub fn handle_chat(
    graph_path: &Path,
    bindings: &[String],
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let graph = load_graph(graph_path, config)?;
    let registry = CommandRegistry::with_builtins();

    let mut faults = graph.faults(&config.matching.entry_intent);
    faults.extend(registry.unresolved(&graph));
    if let Some(fault) = faults.into_iter().next() {
        anyhow::bail!(
            "Graph {} is not valid: {}\nHint: {}",
            graph_path.display(),
            fault,
            fault.user_hint()
        );
    }

    let locals = LocalBindings::parse_pairs(bindings)?;
    let sink = FileSink::open(&config.console.unmatched_log).with_context(|| {
        format!(
            "Failed to open unmatched-input log {}",
            config.console.unmatched_log.display()
        )
    })?;

    let mut engine = ConversationEngine::new(Arc::new(graph), config.engine_settings(), sink)?
        .with_commands(registry)
        .with_locals(locals);

    let mut io = ConsoleIo::stdio()
        .with_color(config.console.color)
        .with_hints(config.console.show_hints)
        .with_speech(config.speech_capture());

    info!("Starting conversation on {}", graph_path.display());
    engine.run(&mut io)?;

    if let OutputFormat::Json = format {
        println!("{}", serde_json::to_string_pretty(engine.state())?);
    }

    Ok(())
}

/// Validate a graph definition
///
/// Reports every fault, not only the first. Fails if any were found.
pub fn handle_check(graph_path: &Path, config: &Config, format: OutputFormat) -> Result<()> {
    let graph = load_graph(graph_path, config)?;
    let registry = CommandRegistry::with_builtins();

    let mut faults = graph.faults(&config.matching.entry_intent);
    faults.extend(registry.unresolved(&graph));
    let summary = graph.summary();

    match format {
        OutputFormat::Text => {
            println!("Graph: {}", graph_path.display());
            println!("  {:<16} {}", "Nodes:", summary.nodes);
            println!(
                "  {:<16} {} ({} from anywhere)",
                "Edges:", summary.edges, summary.wildcard_edges
            );
            println!("  {:<16} {}", "Patterns:", summary.patterns);
            println!("  {:<16} {}", "Vocabulary:", summary.vocabulary);
            println!();

            if faults.is_empty() {
                println!("✓ Graph is valid");
            } else {
                println!("⚠ Faults found:");
                println!();
                for (i, fault) in faults.iter().enumerate() {
                    println!("  {}. {}", i + 1, fault);
                    println!("     Hint: {}", fault.user_hint());
                }
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "graph": graph_path.display().to_string(),
                "summary": summary,
                "faults": faults.iter().map(|f| f.to_string()).collect::<Vec<_>>(),
                "valid": faults.is_empty()
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    if faults.is_empty() {
        Ok(())
    } else {
        Err(anyhow::anyhow!("{} fault(s) in {}", faults.len(), graph_path.display()))
    }
}

/// Score `text` against every candidate leaving `state`
pub fn handle_match(
    graph_path: &Path,
    state: Option<&str>,
    contexts: &[String],
    text: &str,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let graph = load_graph(graph_path, config)?;
    let state = state.unwrap_or(&config.matching.entry_intent);
    let active: BTreeSet<String> = contexts.iter().cloned().collect();
    let threshold = config.matching.confidence_threshold;

    if let Err(e) = graph.node(state) {
        anyhow::bail!("{}\nHint: {}", e, e.user_hint());
    }
    let candidates = CandidateSet::collect(&graph, state, &active)?;
    let ranked = matcher::rank(graph.feature_space(), &candidates, text);
    let best = matcher::best_match(graph.feature_space(), &candidates, text)?;
    let accepted = best.score >= threshold;

    match format {
        OutputFormat::Text => {
            println!("From '{}' with contexts {:?}:", state, active);
            println!();
            for scored in &ranked {
                let marker = if scored == &best { "→" } else { " " };
                println!(
                    "  {} {:.3}  {:<32} -> {}",
                    marker, scored.score, scored.pattern, scored.end_state
                );
            }
            println!();
            if accepted {
                println!("✓ Would move to '{}'", best.end_state);
            } else {
                println!("⚠ Not understood (best {:.3} < {:.3})", best.score, threshold);
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "state": state,
                "contexts": active,
                "input": text,
                "threshold": threshold,
                "candidates": ranked,
                "best": best,
                "accepted": accepted
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Show the effective configuration
pub fn handle_config_show(config: &Config, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            let toml_string =
                toml::to_string_pretty(config).context("Failed to serialize config")?;
            println!("{}", toml_string);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(config)?);
        }
    }
    Ok(())
}

/// Validate a configuration file without using it
pub fn handle_config_validate(path: &Path, format: OutputFormat) -> Result<()> {
    let result = Config::load_from_path(path);

    match format {
        OutputFormat::Text => match &result {
            Ok(_) => println!("✓ {} is valid", path.display()),
            Err(e) => {
                println!("⚠ {}", e);
                println!("  Hint: {}", e.user_hint());
            }
        },
        OutputFormat::Json => {
            let output = json!({
                "path": path.display().to_string(),
                "valid": result.is_ok(),
                "error": result.as_ref().err().map(|e| e.to_string())
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    result.map(|_| ()).context("Configuration is not valid")
}
