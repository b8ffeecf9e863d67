// Dispatch error types and handling

use crate::caption::CaptionKey;
use crate::command::RemainingTime;
use thiserror::Error;

/// Result type for registration and dispatch operations
pub type DispatchResult<T> = Result<T, DispatchError>;

/// A pair of syntaxes the ambiguity checker could not tell apart
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxConflict {
    pub first_index: usize,
    pub second_index: usize,
    pub first_usage: String,
    pub second_usage: String,
}

impl std::fmt::Display for SyntaxConflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "#{} '{}' <-> #{} '{}'",
            self.first_index, self.first_usage, self.second_index, self.second_usage
        )
    }
}

/// Errors surfaced by the command manager
#[derive(Error, Debug)]
pub enum DispatchError {
    /// No registered syntax accepts the token stream
    #[error("No matching syntax for '{command}' with input '{input}'")]
    NoMatchingSyntax { command: String, input: String },

    /// Registration rejected because two syntaxes cannot be told apart
    #[error("Ambiguous syntaxes in command '{command}': {}", format_conflicts(.conflicts))]
    AmbiguousRegistration {
        command: String,
        conflicts: Vec<SyntaxConflict>,
    },

    /// A syntax was assembled in violation of the argument layout rules
    #[error("Invalid syntax: {0}")]
    InvalidSyntax(String),

    /// The matched syntax needs a sender capability nobody can provide
    #[error("Sender cannot satisfy capability '{0}'")]
    UnsupportedSenderCapability(String),

    /// A requirement rejected the sender
    #[error("Requirement not met: {0}")]
    RequirementNotMet(CaptionKey),

    /// The sender is still inside the command's cooldown window
    #[error("Command on cooldown, {0} remaining")]
    OnCooldown(RemainingTime),

    /// A command with the same name is already registered
    #[error("Command '{0}' is already registered")]
    DuplicateCommand(String),

    /// No command registered under the given name or alias
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// The bound handler returned an error
    #[error("Handler failed: {0}")]
    Handler(#[source] anyhow::Error),

    /// The bound handler panicked
    #[error("Handler panicked: {0}")]
    HandlerPanicked(String),

    /// The worker dropped a queued dispatch before its handler ran
    #[error("Dispatch abandoned before the handler ran")]
    Abandoned,

    /// Configuration parsing and validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File system I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DispatchError {
    /// Create an invalid syntax error with context
    pub fn invalid_syntax(msg: impl Into<String>) -> Self {
        DispatchError::InvalidSyntax(msg.into())
    }

    /// Create a config error with context
    pub fn config(msg: impl Into<String>) -> Self {
        DispatchError::Config(msg.into())
    }

    /// Create an unknown command error
    pub fn unknown_command(name: impl Into<String>) -> Self {
        DispatchError::UnknownCommand(name.into())
    }
}

fn format_conflicts(conflicts: &[SyntaxConflict]) -> String {
    conflicts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
