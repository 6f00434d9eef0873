//! Turn I/O
//!
//! The conversation loop talks to the user through [`TurnIo`]. The console
//! implementation reads one line per turn and prints status text in blue,
//! responses in the terminal's default color. Typing an empty line with
//! speech capture enabled records one utterance through an external command.

use sdk::errors::Result;
use std::collections::{BTreeSet, VecDeque};
use std::io::{BufRead, Write};
use std::process::Command;
use tracing::{debug, warn};

use crate::conversation::{TurnOutcome, TurnStatus};

const SUBTLE: &str = "\x1b[34m";
const RESET: &str = "\x1b[0m";
const SEPARATOR: &str = "-----------------------------------";

/// User-facing side of a conversation
pub trait TurnIo {
    /// Show where the conversation stands before prompting
    fn show_status(&mut self, status: &TurnStatus<'_>) -> Result<()>;

    /// Read the next input; `None` at end of input
    fn read_input(&mut self) -> Result<Option<String>>;

    /// Report what a turn did
    fn show_outcome(&mut self, outcome: &TurnOutcome) -> Result<()>;

    /// Called once when the conversation ends
    fn farewell(&mut self) -> Result<()>;
}

/// User-facing line for an outcome, if it has one
pub fn outcome_message(outcome: &TurnOutcome) -> Option<String> {
    match outcome {
        TurnOutcome::Transitioned { response, .. } => Some(response.clone()),
        TurnOutcome::NotUnderstood { .. } => Some("Sorry, didn't understand you!".to_string()),
        TurnOutcome::MissingContext { missing, .. } => Some(format!(
            "Sorry, you lack context {{{}}} to do this",
            missing.join(", ")
        )),
        TurnOutcome::Ended => None,
    }
}

fn format_contexts(contexts: &BTreeSet<String>) -> String {
    let tags: Vec<&str> = contexts.iter().map(String::as_str).collect();
    format!("{{{}}}", tags.join(", "))
}

/// Best-effort capture of one spoken utterance
///
/// Runs an external recogniser and takes its trimmed stdout as the input.
/// Failures never reach the conversation: they are logged and the turn goes
/// on with empty input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechCapture {
    program: String,
    args: Vec<String>,
}

impl SpeechCapture {
    /// Build from `[program, args...]`; `None` if the command is empty
    pub fn from_command(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        if program.trim().is_empty() {
            return None;
        }
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Run the recogniser; empty string on any failure
    pub fn capture(&self) -> String {
        debug!("Capturing speech with '{}'", self.program);
        match Command::new(&self.program).args(&self.args).output() {
            Ok(output) if output.status.success() => {
                String::from_utf8_lossy(&output.stdout).trim().to_string()
            }
            Ok(output) => {
                warn!(
                    "Speech capture exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                );
                String::new()
            }
            Err(e) => {
                warn!("Speech capture unavailable ({}): {}", self.program, e);
                String::new()
            }
        }
    }
}

/// Line-based console over any reader and writer
pub struct ConsoleIo<R, W> {
    reader: R,
    writer: W,
    color: bool,
    show_hints: bool,
    speech: Option<SpeechCapture>,
}

impl ConsoleIo<std::io::StdinLock<'static>, std::io::Stdout> {
    /// Console on the process's stdin and stdout
    pub fn stdio() -> Self {
        Self::new(std::io::stdin().lock(), std::io::stdout())
    }
}

impl<R: BufRead, W: Write> ConsoleIo<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            color: true,
            show_hints: true,
            speech: None,
        }
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Whether to list "Things to do" before each prompt
    pub fn with_hints(mut self, show_hints: bool) -> Self {
        self.show_hints = show_hints;
        self
    }

    pub fn with_speech(mut self, speech: Option<SpeechCapture>) -> Self {
        self.speech = speech;
        self
    }

    pub fn into_writer(self) -> W {
        self.writer
    }

    fn subtle(&mut self, text: &str) -> Result<()> {
        if self.color {
            writeln!(self.writer, "{}{}{}", SUBTLE, text, RESET)?;
        } else {
            writeln!(self.writer, "{}", text)?;
        }
        Ok(())
    }
}

impl<R: BufRead, W: Write> TurnIo for ConsoleIo<R, W> {
    fn show_status(&mut self, status: &TurnStatus<'_>) -> Result<()> {
        self.subtle(SEPARATOR)?;
        self.subtle(&format!("current State {}", status.state))?;
        self.subtle(&format!(
            "current Contexts {}",
            format_contexts(status.contexts)
        ))?;
        if self.show_hints {
            self.subtle(&format!("Things to do: {}", status.actions.join(", ")))?;
        }
        Ok(())
    }

    fn read_input(&mut self) -> Result<Option<String>> {
        write!(self.writer, "> ")?;
        self.writer.flush()?;

        let mut line = Vec::new();
        if self.reader.read_until(b'\n', &mut line)? == 0 {
            writeln!(self.writer)?;
            return Ok(None);
        }
        // Invalid UTF-8 is replaced, not fatal
        let input = String::from_utf8_lossy(&line)
            .trim_end_matches(&['\r', '\n'][..])
            .to_string();

        if input.is_empty() {
            if let Some(speech) = self.speech.clone() {
                self.subtle("Say something!")?;
                let heard = speech.capture();
                writeln!(self.writer, "{}", heard)?;
                return Ok(Some(heard));
            }
        }

        Ok(Some(input))
    }

    fn show_outcome(&mut self, outcome: &TurnOutcome) -> Result<()> {
        if let Some(message) = outcome_message(outcome) {
            writeln!(self.writer, "{}", message)?;
        }
        Ok(())
    }

    fn farewell(&mut self) -> Result<()> {
        writeln!(self.writer, "bye")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Status as a [`ScriptedIo`] saw it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedStatus {
    pub state: String,
    pub contexts: Vec<String>,
    pub actions: Vec<String>,
}

/// Canned inputs with everything shown recorded, for driving `run` in tests
#[derive(Debug, Clone, Default)]
pub struct ScriptedIo {
    inputs: VecDeque<String>,
    statuses: Vec<RecordedStatus>,
    outcomes: Vec<TurnOutcome>,
    farewell: bool,
}

impl ScriptedIo {
    pub fn new<I, S>(inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inputs: inputs.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Inputs not yet consumed
    pub fn remaining(&self) -> usize {
        self.inputs.len()
    }

    pub fn statuses(&self) -> &[RecordedStatus] {
        &self.statuses
    }

    pub fn outcomes(&self) -> &[TurnOutcome] {
        &self.outcomes
    }

    pub fn said_farewell(&self) -> bool {
        self.farewell
    }
}

impl TurnIo for ScriptedIo {
    fn show_status(&mut self, status: &TurnStatus<'_>) -> Result<()> {
        self.statuses.push(RecordedStatus {
            state: status.state.to_string(),
            contexts: status.contexts.iter().cloned().collect(),
            actions: status.actions.clone(),
        });
        Ok(())
    }

    fn read_input(&mut self) -> Result<Option<String>> {
        Ok(self.inputs.pop_front())
    }

    fn show_outcome(&mut self, outcome: &TurnOutcome) -> Result<()> {
        self.outcomes.push(outcome.clone());
        Ok(())
    }

    fn farewell(&mut self) -> Result<()> {
        self.farewell = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn console(input: &str) -> ConsoleIo<Cursor<Vec<u8>>, Vec<u8>> {
        ConsoleIo::new(Cursor::new(input.as_bytes().to_vec()), Vec::new()).with_color(false)
    }

    fn written(io: ConsoleIo<Cursor<Vec<u8>>, Vec<u8>>) -> String {
        String::from_utf8(io.into_writer()).unwrap()
    }

    #[test]
    fn test_status_block() {
        let mut io = console("");
        let contexts: BTreeSet<String> = ["greeted".to_string()].into_iter().collect();
        io.show_status(&TurnStatus {
            state: "greet",
            contexts: &contexts,
            actions: vec!["let us talk".to_string(), "bye now".to_string()],
        })
        .unwrap();

        assert_eq!(
            written(io),
            format!(
                "{}\ncurrent State greet\ncurrent Contexts {{greeted}}\nThings to do: let us talk, bye now\n",
                SEPARATOR
            )
        );
    }

    #[test]
    fn test_hints_can_be_hidden() {
        let mut io = console("").with_hints(false);
        io.show_status(&TurnStatus {
            state: "entry",
            contexts: &BTreeSet::new(),
            actions: vec!["hello".to_string()],
        })
        .unwrap();
        let out = written(io);
        assert!(out.contains("current Contexts {}"));
        assert!(!out.contains("Things to do"));
    }

    #[test]
    fn test_color_wraps_status_lines() {
        let mut io = ConsoleIo::new(Cursor::new(Vec::new()), Vec::new());
        io.subtle("hint").unwrap();
        assert_eq!(written(io), "\x1b[34mhint\x1b[0m\n");
    }

    #[test]
    fn test_read_input_strips_line_endings() {
        let mut io = console("hello\r\nsecond\n");
        assert_eq!(io.read_input().unwrap().as_deref(), Some("hello"));
        assert_eq!(io.read_input().unwrap().as_deref(), Some("second"));
        assert_eq!(io.read_input().unwrap(), None);
    }

    #[test]
    fn test_invalid_utf8_line_is_still_input() {
        let mut io = ConsoleIo::new(Cursor::new(b"caf\xe9\nexit\n".to_vec()), Vec::new());
        assert_eq!(io.read_input().unwrap(), Some("caf\u{FFFD}".to_string()));
        assert_eq!(io.read_input().unwrap(), Some("exit".to_string()));
        assert_eq!(io.read_input().unwrap(), None);
    }

    #[test]
    fn test_empty_line_without_speech_is_empty_input() {
        let mut io = console("\n");
        assert_eq!(io.read_input().unwrap().as_deref(), Some(""));
    }

    #[test]
    fn test_failed_speech_capture_degrades_to_empty_input() {
        let speech = SpeechCapture::from_command(&["parley-no-such-recogniser".to_string()]);
        let mut io = console("\n").with_speech(speech);
        assert_eq!(io.read_input().unwrap().as_deref(), Some(""));
        assert!(written(io).contains("Say something!"));
    }

    #[cfg(unix)]
    #[test]
    fn test_speech_capture_uses_trimmed_stdout() {
        let speech = SpeechCapture::from_command(&[
            "echo".to_string(),
            "  show me all files ".to_string(),
        ])
        .unwrap();
        assert_eq!(speech.capture(), "show me all files");
    }

    #[test]
    fn test_empty_speech_command() {
        assert!(SpeechCapture::from_command(&[]).is_none());
        assert!(SpeechCapture::from_command(&[" ".to_string()]).is_none());
    }

    #[test]
    fn test_outcome_messages() {
        let mut io = console("");
        io.show_outcome(&TurnOutcome::NotUnderstood {
            score: 0.1,
            closest: "hello".to_string(),
        })
        .unwrap();
        io.show_outcome(&TurnOutcome::MissingContext {
            intent: "vault".to_string(),
            missing: vec!["greeted".to_string(), "trusted".to_string()],
        })
        .unwrap();
        io.show_outcome(&TurnOutcome::Transitioned {
            from: "entry".to_string(),
            to: "greet".to_string(),
            score: 1.0,
            pattern: "hello".to_string(),
            response: "Hello!".to_string(),
        })
        .unwrap();
        io.show_outcome(&TurnOutcome::Ended).unwrap();
        io.farewell().unwrap();

        assert_eq!(
            written(io),
            "Sorry, didn't understand you!\n\
             Sorry, you lack context {greeted, trusted} to do this\n\
             Hello!\n\
             bye\n"
        );
    }
}
