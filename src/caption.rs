// Caption keys and the caption sink contract
//
// The engine never renders user-facing text; it hands a key plus arguments to
// the host's sink whenever a dispatch is aborted.

use crate::command::RemainingTime;
use crate::context::DelegateContext;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a user-facing message
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CaptionKey {
    /// No command or no syntax accepted the input
    UnknownCommand,
    /// The sender lacks the command's or syntax's permission
    NoPermission,
    /// The sender is inside the cooldown window
    CommandOnCooldown,
    /// Host-defined requirement message
    Custom(String),
}

impl CaptionKey {
    pub fn custom(key: impl Into<String>) -> Self {
        CaptionKey::Custom(key.into())
    }
}

impl fmt::Display for CaptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptionKey::UnknownCommand => f.write_str("unknown-command"),
            CaptionKey::NoPermission => f.write_str("no-permission"),
            CaptionKey::CommandOnCooldown => f.write_str("command-on-cooldown"),
            CaptionKey::Custom(key) => f.write_str(key),
        }
    }
}

/// A caption key with its positional arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caption {
    pub key: CaptionKey,
    pub args: Vec<String>,
    /// Set only on cooldown captions
    pub remaining: Option<RemainingTime>,
}

impl Caption {
    pub fn new(key: CaptionKey) -> Self {
        Self {
            key,
            args: Vec::new(),
            remaining: None,
        }
    }

    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Cooldown caption carrying the formatted remaining time and its milliseconds
    pub fn cooldown(remaining: RemainingTime) -> Self {
        Self {
            key: CaptionKey::CommandOnCooldown,
            args: vec![remaining.to_string(), remaining.total_millis().to_string()],
            remaining: Some(remaining),
        }
    }
}

/// Receives every caption the engine emits
pub trait CaptionSink<S>: Send + Sync {
    fn emit(&self, sender: &S, context: &DelegateContext, caption: &Caption);
}

/// Sink that only logs, used when the host installs none
pub struct LoggingCaptionSink;

impl<S> CaptionSink<S> for LoggingCaptionSink {
    fn emit(&self, _sender: &S, context: &DelegateContext, caption: &Caption) {
        log::warn!(
            "caption {} {:?} for '{}'",
            caption.key,
            caption.args,
            context.raw_format()
        );
    }
}
