//! Operator confirmation.
//!
//! Every stage transition waits on a [`Confirm`] implementation. The CLI uses
//! [`TerminalPrompt`]; tests drive the sequence with [`ScriptedPrompt`].

use std::collections::VecDeque;
use std::fmt;
use std::io::{self, BufRead, StdinLock, Write};

use console::{Term, style};
use serde::Serialize;
use tracing::{debug, trace, warn};

/// The gate a prompt belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Checkpoint {
    /// Before copying the device into the backup root.
    Backup,
    /// Before wiping the account table on the device.
    Truncate,
    /// Operator disconnects the device and signs in with the new account.
    Disconnect,
    /// Operator has reconnected the device.
    Reconnect,
    /// Mount point still missing after reconnecting; try again?
    RetryMount,
    /// Before building the merged database.
    Merge,
    /// Before overwriting the device database with the merged one.
    Install,
}

impl Checkpoint {
    /// Stable name used in logs and errors.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Backup => "backup",
            Self::Truncate => "truncate",
            Self::Disconnect => "disconnect",
            Self::Reconnect => "reconnect",
            Self::RetryMount => "retry_mount",
            Self::Merge => "merge",
            Self::Install => "install",
        }
    }

    /// Answer used when the operator just presses Enter.
    ///
    /// Steps that destroy device data default to "no".
    pub const fn default_answer(self) -> bool {
        !matches!(self, Self::Truncate | Self::Install | Self::RetryMount)
    }

    /// Gates that wait on something physical and cannot be pre-answered.
    pub const fn requires_operator(self) -> bool {
        matches!(self, Self::Reconnect | Self::RetryMount)
    }
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A question put to the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prompt {
    pub checkpoint: Checkpoint,
    pub message: String,
}

impl Prompt {
    pub fn new(checkpoint: Checkpoint, message: impl Into<String>) -> Self {
        Self {
            checkpoint,
            message: message.into(),
        }
    }
}

/// Injected confirmation capability.
pub trait Confirm {
    /// Returns true to proceed past the gate.
    fn confirm(&mut self, prompt: &Prompt) -> bool;
}

/// Interprets a typed answer; `None` for anything unrecognised.
pub fn parse_answer(line: &str, default: bool) -> Option<bool> {
    match line.trim().to_ascii_lowercase().as_str() {
        "" => Some(default),
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

/// Reads answers line by line, printing questions to stderr.
///
/// End of input counts as "no", and so does a failure to read the answer or
/// to write the question.
pub struct TerminalPrompt<R = StdinLock<'static>, W = Term> {
    input: R,
    out: W,
}

impl TerminalPrompt {
    /// Prompt on stderr, answers from stdin.
    pub fn stdio() -> Self {
        Self::with_input(io::stdin().lock())
    }
}

impl<R: BufRead> TerminalPrompt<R> {
    pub fn with_input(input: R) -> Self {
        Self::new(input, Term::stderr())
    }
}

impl<R: BufRead, W: Write> TerminalPrompt<R, W> {
    pub const fn new(input: R, out: W) -> Self {
        Self { input, out }
    }

    fn ask(&mut self, prompt: &Prompt) -> io::Result<Option<bool>> {
        let hint = if prompt.checkpoint.default_answer() {
            "[Y/n]"
        } else {
            "[y/N]"
        };
        writeln!(
            self.out,
            "{} {} {}",
            style("?").cyan().bold().for_stderr(),
            prompt.message,
            style(hint).dim().for_stderr()
        )?;
        self.out.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            debug!(checkpoint = %prompt.checkpoint, "End of input, declining");
            return Ok(Some(false));
        }
        Ok(parse_answer(&line, prompt.checkpoint.default_answer()))
    }
}

impl<R: BufRead, W: Write> Confirm for TerminalPrompt<R, W> {
    fn confirm(&mut self, prompt: &Prompt) -> bool {
        loop {
            match self.ask(prompt) {
                Ok(Some(answer)) => return answer,
                Ok(None) => {
                    if let Err(e) = writeln!(self.out, "Please answer y or n.") {
                        warn!(error = %e, "Failed to write prompt, declining");
                        return false;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Prompt I/O failed, declining");
                    return false;
                }
            }
        }
    }
}

/// Answers yes on the operator's behalf, except where something physical
/// has to happen first.
pub struct AssumeYes<P> {
    inner: P,
}

impl<P: Confirm> AssumeYes<P> {
    pub const fn new(inner: P) -> Self {
        Self { inner }
    }
}

impl<P: Confirm> Confirm for AssumeYes<P> {
    fn confirm(&mut self, prompt: &Prompt) -> bool {
        if prompt.checkpoint.requires_operator() {
            return self.inner.confirm(prompt);
        }
        debug!(checkpoint = %prompt.checkpoint, "Auto-confirmed");
        true
    }
}

type Hook = Box<dyn FnMut()>;

/// Pre-recorded answers for driving the sequence in tests.
///
/// Answers are consumed in order; once they run out every prompt is
/// declined. Hooks registered with [`ScriptedPrompt::on`] run just before
/// their checkpoint is answered, which is where a test simulates the
/// operator signing in on the device.
#[derive(Default)]
pub struct ScriptedPrompt {
    answers: VecDeque<bool>,
    hooks: Vec<(Checkpoint, Hook)>,
    asked: Vec<Prompt>,
}

impl ScriptedPrompt {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer the next `n` prompts with yes.
    #[must_use]
    pub fn yes(mut self, n: usize) -> Self {
        self.answers.extend(std::iter::repeat_n(true, n));
        self
    }

    /// Queue a single answer.
    #[must_use]
    pub fn answer(mut self, answer: bool) -> Self {
        self.answers.push_back(answer);
        self
    }

    /// Run `hook` each time `checkpoint` is reached.
    #[must_use]
    pub fn on(mut self, checkpoint: Checkpoint, hook: impl FnMut() + 'static) -> Self {
        self.hooks.push((checkpoint, Box::new(hook)));
        self
    }

    /// Prompts seen so far.
    pub fn asked(&self) -> &[Prompt] {
        &self.asked
    }

    /// Checkpoints seen so far.
    pub fn checkpoints(&self) -> Vec<Checkpoint> {
        self.asked.iter().map(|p| p.checkpoint).collect()
    }
}

impl Confirm for ScriptedPrompt {
    fn confirm(&mut self, prompt: &Prompt) -> bool {
        for (checkpoint, hook) in &mut self.hooks {
            if *checkpoint == prompt.checkpoint {
                hook();
            }
        }
        self.asked.push(prompt.clone());
        let answer = self.answers.pop_front().unwrap_or(false);
        trace!(checkpoint = %prompt.checkpoint, answer, "Scripted answer");
        answer
    }
}
