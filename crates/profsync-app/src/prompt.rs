//! Interactive prompts and confirmation gates.
//!
//! # Design
//! - The sequencer only sees [`Confirmer`]; how answers are obtained is the
//!   caller's choice (terminal, `--yes`, or scripted in tests).
//! - Empty answers take the gate's default: the profile copy defaults to yes,
//!   the optional stages to no.
//! - Reading and writing go through generic `BufRead`/`Write` handles so the
//!   prompt logic is testable without a terminal.

use std::io::{self, BufRead, Write};
use std::sync::{Mutex, PoisonError};

use tracing::warn;

use crate::error::{AppError, AppResult};

/// Confirmable points of the migration sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gate {
    /// Start the profile copy (root, AppData, post-processing).
    Profile,
    /// Copy the program files allowlist.
    ProgramFiles,
    /// Export the configured registry keys.
    RegistryExport,
}

impl Gate {
    /// Question shown to the operator.
    #[must_use]
    pub const fn question(self) -> &'static str {
        match self {
            Self::Profile => "Proceed with sync? (y/n)",
            Self::ProgramFiles => "Copy Program Files directories? (y/n)",
            Self::RegistryExport => "Export local registry entries? (y/n)",
        }
    }

    /// Answer assumed when the operator just presses enter.
    #[must_use]
    pub const fn default_answer(self) -> bool {
        matches!(self, Self::Profile)
    }

    /// Stable label for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Profile => "profile",
            Self::ProgramFiles => "program_files",
            Self::RegistryExport => "registry_export",
        }
    }
}

/// Decides whether a gated stage runs.
pub trait Confirmer: Send + Sync {
    /// Whether the stage behind `gate` may run.
    fn confirm(&self, gate: Gate) -> bool;

    /// Hold the process until the operator has reviewed the output.
    fn pause(&self) {}
}

/// Confirmer reading answers from the terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdinConfirmer;

impl Confirmer for StdinConfirmer {
    fn confirm(&self, gate: Gate) -> bool {
        let default = if gate.default_answer() { "y" } else { "n" };
        match prompt_line(gate.question(), Some(default)) {
            Ok(answer) => is_yes(&answer),
            Err(err) => {
                warn!(gate = gate.as_str(), error = %err, detail = ?err, "could not read answer; using default");
                gate.default_answer()
            }
        }
    }

    fn pause(&self) {
        if let Err(err) = prompt_line("Please review output (press enter to exit)", None) {
            warn!(error = %err, detail = ?err, "could not wait for review");
        }
    }
}

/// Confirmer that approves every gate (`--yes`).
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoConfirmer;

impl Confirmer for AutoConfirmer {
    fn confirm(&self, _gate: Gate) -> bool {
        true
    }
}

/// Confirmer with scripted answers that records which gates were asked.
#[derive(Debug, Default)]
pub struct FixedConfirmer {
    answers: Vec<(Gate, bool)>,
    asked: Mutex<Vec<Gate>>,
}

impl FixedConfirmer {
    /// Confirmer answering every gate with its default.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Confirmer answering `answer` to every gate.
    #[must_use]
    pub fn always(answer: bool) -> Self {
        Self::new()
            .answer(Gate::Profile, answer)
            .answer(Gate::ProgramFiles, answer)
            .answer(Gate::RegistryExport, answer)
    }

    /// Answer `gate` with `answer`.
    #[must_use]
    pub fn answer(mut self, gate: Gate, answer: bool) -> Self {
        self.answers.retain(|(existing, _)| *existing != gate);
        self.answers.push((gate, answer));
        self
    }

    /// Gates asked so far, in order.
    #[must_use]
    pub fn asked(&self) -> Vec<Gate> {
        self.asked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Confirmer for FixedConfirmer {
    fn confirm(&self, gate: Gate) -> bool {
        self.asked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(gate);
        self.answers
            .iter()
            .find(|(known, _)| *known == gate)
            .map_or_else(|| gate.default_answer(), |(_, answer)| *answer)
    }
}

/// Whether `answer` is affirmative (`y` or `yes`, any case).
#[must_use]
pub fn is_yes(answer: &str) -> bool {
    let answer = answer.trim();
    answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes")
}

/// Ask `question` on the terminal; an empty answer yields `default`.
///
/// # Errors
///
/// Returns [`AppError::Io`] when the terminal cannot be read or written.
pub fn prompt_line(question: &str, default: Option<&str>) -> AppResult<String> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    read_answer(&mut stdin.lock(), &mut stdout, question, default)
}

/// Ask `question` and fail when neither an answer nor a default is available.
///
/// # Errors
///
/// Returns [`AppError::MissingInput`] for an empty answer without default and
/// [`AppError::Io`] when the terminal cannot be used.
pub fn prompt_required(
    field: &'static str,
    question: &str,
    default: Option<&str>,
) -> AppResult<String> {
    let answer = prompt_line(question, default)?;
    if answer.is_empty() {
        return Err(AppError::MissingInput { field });
    }
    Ok(answer)
}

pub(crate) fn read_answer<R, W>(
    input: &mut R,
    output: &mut W,
    question: &str,
    default: Option<&str>,
) -> AppResult<String>
where
    R: BufRead,
    W: Write,
{
    let prompt = match default {
        Some(default) => format!("{question} [{default}]: "),
        None => format!("{question}: "),
    };
    output
        .write_all(prompt.as_bytes())
        .and_then(|()| output.flush())
        .map_err(|source| AppError::io("prompt.write", None, source))?;

    let mut line = String::new();
    input
        .read_line(&mut line)
        .map_err(|source| AppError::io("prompt.read", None, source))?;
    let answer = line.trim();
    if answer.is_empty() {
        Ok(default.unwrap_or_default().to_string())
    } else {
        Ok(answer.to_string())
    }
}
