//! Conversation Engine
//!
//! Drives one conversation over a shared [`GraphModel`]. Each turn:
//!
//! 1. collect candidates from the edges leaving the current state that pass
//!    the context gate
//! 2. stop on a termination input
//! 3. pick the best-matching candidate
//! 4. reject it if its score is under the confidence threshold, logging the
//!    input to the unmatched sink
//! 5. reject it if its end state needs contexts that are not active
//! 6. otherwise run the end state's code command, move there, activate its
//!    contexts and report its response
//!
//! Rejections are outcomes, not errors. Graph faults and dead-end states are
//! errors and end the conversation.

use sdk::errors::Result;
use sdk::types::{LocalBindings, Variables};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::commands::CommandRegistry;
use crate::console::TurnIo;
use crate::context_gate;
use crate::graph::GraphModel;
use crate::matcher::{self, CandidateSet, Match};
use crate::sink::{MemorySink, UnmatchedSink};

/// Minimum score a match needs to be acted on
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.6;
/// Intent every conversation starts in
pub const DEFAULT_ENTRY_INTENT: &str = "entry";
/// Inputs that end a conversation
pub const DEFAULT_TERMINATION_INPUTS: [&str; 2] = ["end", "exit"];

/// Tunables for a conversation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineSettings {
    pub confidence_threshold: f64,
    pub entry_intent: String,
    pub termination_inputs: Vec<String>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            entry_intent: DEFAULT_ENTRY_INTENT.to_string(),
            termination_inputs: DEFAULT_TERMINATION_INPUTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl EngineSettings {
    /// True if `input` is exactly one of the termination inputs
    pub fn is_termination(&self, input: &str) -> bool {
        self.termination_inputs.iter().any(|t| t == input)
    }
}

/// Where a conversation currently stands
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationState {
    pub current_state: String,
    /// Only ever grows
    pub active_contexts: BTreeSet<String>,
    pub variables: Variables,
}

/// What a turn did
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TurnOutcome {
    /// The input matched and the conversation moved
    Transitioned {
        from: String,
        to: String,
        score: f64,
        pattern: String,
        response: String,
    },
    /// Best score was under the threshold
    NotUnderstood { score: f64, closest: String },
    /// The matched intent needs contexts that are not active yet
    MissingContext { intent: String, missing: Vec<String> },
    /// A termination input was given
    Ended,
}

/// Snapshot shown to the user before each prompt
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnStatus<'a> {
    pub state: &'a str,
    pub contexts: &'a BTreeSet<String>,
    pub actions: Vec<String>,
}

/// One conversation over a shared intent graph
pub struct ConversationEngine<S: UnmatchedSink = MemorySink> {
    graph: Arc<GraphModel>,
    state: ConversationState,
    settings: EngineSettings,
    commands: CommandRegistry,
    locals: LocalBindings,
    sink: S,
    ended: bool,
}

impl<S: UnmatchedSink> std::fmt::Debug for ConversationEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationEngine")
            .field("state", &self.state)
            .field("settings", &self.settings)
            .field("commands", &self.commands)
            .field("ended", &self.ended)
            .finish()
    }
}

impl<S: UnmatchedSink> ConversationEngine<S> {
    /// Start a conversation in the configured entry intent
    ///
    /// The variable store starts as the graph's `[variables]` table. Code
    /// commands default to the builtins.
    ///
    /// # Errors
    ///
    /// Fails if the entry intent does not resolve to exactly one node.
    pub fn new(graph: Arc<GraphModel>, settings: EngineSettings, sink: S) -> Result<Self> {
        graph.node(&settings.entry_intent)?;
        let state = ConversationState {
            current_state: settings.entry_intent.clone(),
            active_contexts: BTreeSet::new(),
            variables: graph.initial_variables().clone(),
        };

        debug!(
            "Conversation started in '{}' (threshold {})",
            state.current_state, settings.confidence_threshold
        );

        Ok(Self {
            graph,
            state,
            settings,
            commands: CommandRegistry::with_builtins(),
            locals: LocalBindings::new(),
            sink,
            ended: false,
        })
    }

    pub fn with_commands(mut self, commands: CommandRegistry) -> Self {
        self.commands = commands;
        self
    }

    pub fn with_locals(mut self, locals: LocalBindings) -> Self {
        self.locals = locals;
        self
    }

    /// Replace the starting variable store
    pub fn with_variables(mut self, variables: Variables) -> Self {
        self.state.variables = variables;
        self
    }

    /// Process one input
    ///
    /// # Errors
    ///
    /// Graph faults met while collecting candidates or applying the winner,
    /// and `NoCandidates` when a non-terminating input arrives in a state
    /// with no eligible edges.
    pub fn step(&mut self, input: &str) -> Result<TurnOutcome> {
        let graph = Arc::clone(&self.graph);
        let current = self.state.current_state.clone();
        let candidates = CandidateSet::collect(&graph, &current, &self.state.active_contexts)?;

        if self.settings.is_termination(input) {
            debug!("Termination input in '{}'", current);
            self.ended = true;
            return Ok(TurnOutcome::Ended);
        }

        let best = matcher::best_match(graph.feature_space(), &candidates, input)?;
        self.resolve(input, best)
    }

    /// Apply or reject a scored match for `input`
    ///
    /// This is the tail of [`ConversationEngine::step`] after matching.
    pub fn resolve(&mut self, input: &str, best: Match<'_>) -> Result<TurnOutcome> {
        let graph = Arc::clone(&self.graph);

        if best.score < self.settings.confidence_threshold {
            info!(
                "Not understood in '{}': best '{}' scored {:.3}",
                self.state.current_state, best.pattern, best.score
            );
            if let Err(e) = self.sink.record(input) {
                warn!("Failed to record unmatched input: {}", e);
            }
            return Ok(TurnOutcome::NotUnderstood {
                score: best.score,
                closest: best.pattern.to_string(),
            });
        }

        let required = graph.context_require(best.end_state)?;
        let missing = context_gate::missing_contexts(required, &self.state.active_contexts);
        if !missing.is_empty() {
            info!(
                "Missing contexts for '{}': {}",
                best.end_state,
                missing.join(", ")
            );
            return Ok(TurnOutcome::MissingContext {
                intent: best.end_state.to_string(),
                missing: missing.into_iter().map(str::to_string).collect(),
            });
        }

        // Resolve everything that can fail before touching the state
        let unlocked = graph.context_set(best.end_state)?;
        let response = graph.response(best.end_state)?.to_string();
        let handler = self.commands.handler_for(&graph, best.end_state)?;
        let variables = std::mem::take(&mut self.state.variables);
        self.state.variables = handler.call(variables, input, &self.locals);

        let from = std::mem::replace(&mut self.state.current_state, best.end_state.to_string());
        self.state
            .active_contexts
            .extend(unlocked.iter().cloned());

        debug!(
            "Transition '{}' -> '{}' via '{}' ({:.3})",
            from, best.end_state, best.pattern, best.score
        );

        Ok(TurnOutcome::Transitioned {
            from,
            to: best.end_state.to_string(),
            score: best.score,
            pattern: best.pattern.to_string(),
            response,
        })
    }

    /// First pattern of every eligible edge leaving the current state
    pub fn possible_actions(&self) -> Result<Vec<String>> {
        let edges = context_gate::eligible_edges(
            &self.graph,
            &self.state.current_state,
            &self.state.active_contexts,
        )?;
        Ok(edges
            .into_iter()
            .filter_map(|edge| edge.patterns.first().cloned())
            .collect())
    }

    pub fn status(&self) -> Result<TurnStatus<'_>> {
        Ok(TurnStatus {
            state: &self.state.current_state,
            contexts: &self.state.active_contexts,
            actions: self.possible_actions()?,
        })
    }

    /// Run turns until a termination input or end of input
    ///
    /// The unmatched sink is flushed before returning, also on error.
    pub fn run<I: TurnIo>(&mut self, io: &mut I) -> Result<()> {
        let result = self.run_turns(io);
        if let Err(e) = self.sink.flush() {
            warn!("Failed to flush unmatched inputs: {}", e);
        }
        result
    }

    fn run_turns<I: TurnIo>(&mut self, io: &mut I) -> Result<()> {
        while !self.ended {
            io.show_status(&self.status()?)?;

            let input = match io.read_input()? {
                Some(input) => input,
                None => {
                    debug!("End of input");
                    self.ended = true;
                    break;
                }
            };

            let outcome = self.step(&input)?;
            if outcome != TurnOutcome::Ended {
                io.show_outcome(&outcome)?;
            }
        }
        io.farewell()
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn current_state(&self) -> &str {
        &self.state.current_state
    }

    pub fn active_contexts(&self) -> &BTreeSet<String> {
        &self.state.active_contexts
    }

    pub fn variables(&self) -> &Variables {
        &self.state.variables
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn graph(&self) -> &Arc<GraphModel> {
        &self.graph
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Finish the conversation and hand back the sink
    pub fn into_sink(self) -> S {
        self.sink
    }
}
