// Command syntaxes: ordered argument templates bound to a handler

mod ambiguity;
mod flags;

pub use ambiguity::AmbiguityChecker;
pub use flags::{Flag, FlagExtractor, FlagMap, FlagSet, FlagValue};

use crate::arguments::{Argument, ArgumentParseError, Value};
use crate::context::CommandContext;
use crate::error::{DispatchError, DispatchResult};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// User code bound to a syntax or to a command's zero-argument path
pub type Handler<S> = Arc<dyn Fn(&S, &CommandContext) -> anyhow::Result<()> + Send + Sync>;

/// Why a token stream does not fit a syntax
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatchError {
    #[error(transparent)]
    Argument(#[from] ArgumentParseError),

    #[error("Missing required argument '{0}'")]
    MissingArgument(String),

    #[error("Expected at most {expected} arguments, found {found}")]
    TooManyArguments { expected: usize, found: usize },
}

/// Descriptive data attached to a syntax
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyntaxInfo {
    pub description: Option<String>,
    pub permission: Option<String>,
}

/// An immutable argument template with its handler
pub struct Syntax<S> {
    label: String,
    arguments: Vec<Argument>,
    flags: FlagSet,
    capability: Option<String>,
    info: SyntaxInfo,
    handler: Handler<S>,
}

impl<S> Syntax<S> {
    pub fn builder(label: impl Into<String>) -> SyntaxBuilder<S> {
        SyntaxBuilder::new(label)
    }

    /// Name of the owning command
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }

    pub fn argument(&self, index: usize) -> Option<&Argument> {
        self.arguments.get(index)
    }

    pub fn flags(&self) -> &FlagSet {
        &self.flags
    }

    /// Sender capability the handler needs, if any
    pub fn capability(&self) -> Option<&str> {
        self.capability.as_deref()
    }

    pub fn info(&self) -> &SyntaxInfo {
        &self.info
    }

    pub fn handler(&self) -> &Handler<S> {
        &self.handler
    }

    /// Full argument count
    pub fn length(&self) -> usize {
        self.arguments.len()
    }

    /// Number of positions that must be filled, flags and optional arguments excluded
    pub fn required_length(&self) -> usize {
        self.arguments.iter().filter(|a| !a.is_optional()).count()
    }

    /// Whether `count` positional tokens can possibly fit
    pub fn accepts_length(&self, count: usize) -> bool {
        count >= self.required_length() && count <= self.length()
    }

    /// Walk the positional tokens against the arguments, binding every value
    ///
    /// Absent optional arguments resolve to their default, or to
    /// `Value::Absent` when they have none.
    pub fn resolve(&self, tokens: &[String]) -> Result<HashMap<String, Value>, MatchError> {
        if tokens.len() > self.length() {
            return Err(MatchError::TooManyArguments {
                expected: self.length(),
                found: tokens.len(),
            });
        }

        let mut values = HashMap::with_capacity(self.arguments.len());
        let mut cursor = 0;

        for argument in &self.arguments {
            match tokens.get(cursor) {
                Some(token) => {
                    let value = argument.parse(token)?;
                    values.insert(argument.id().to_string(), value);
                    cursor += 1;
                }
                None if argument.is_optional() => {
                    let value = argument.default().cloned().unwrap_or(Value::Absent);
                    values.insert(argument.id().to_string(), value);
                }
                None => return Err(MatchError::MissingArgument(argument.id().to_string())),
            }
        }

        Ok(values)
    }

    /// Structural and semantic match against positional tokens
    pub fn matches(&self, tokens: &[String]) -> bool {
        self.accepts_length(tokens.len()) && self.resolve(tokens).is_ok()
    }

    /// `label literal <required> [optional]`
    pub fn usage(&self) -> String {
        let mut usage = self.label.clone();
        for argument in &self.arguments {
            usage.push(' ');
            usage.push_str(&argument.usage());
        }
        for flag in self.flags.iter() {
            usage.push_str(&format!(" [--{}]", flag.name()));
        }
        usage
    }

    /// Structural identity: same arguments and flags, handler ignored
    pub fn same_structure(&self, other: &Syntax<S>) -> bool {
        self.arguments.len() == other.arguments.len()
            && self
                .arguments
                .iter()
                .zip(&other.arguments)
                .all(|(a, b)| a.same_shape(b))
            && self.flags == other.flags
    }
}

impl<S> fmt::Debug for Syntax<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Syntax")
            .field("usage", &self.usage())
            .field("capability", &self.capability)
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

/// Assembles a syntax and checks its argument layout
pub struct SyntaxBuilder<S> {
    label: String,
    arguments: Vec<Argument>,
    flags: FlagSet,
    capability: Option<String>,
    info: SyntaxInfo,
    handler: Option<Handler<S>>,
}

impl<S> SyntaxBuilder<S> {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            arguments: Vec::new(),
            flags: FlagSet::new(),
            capability: None,
            info: SyntaxInfo::default(),
            handler: None,
        }
    }

    pub fn argument(mut self, argument: Argument) -> Self {
        self.arguments.push(argument);
        self
    }

    pub fn flag(mut self, flag: Flag) -> Self {
        self.flags.add(flag);
        self
    }

    pub fn capability(mut self, capability: impl Into<String>) -> Self {
        self.capability = Some(capability.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.info.description = Some(description.into());
        self
    }

    pub fn permission(mut self, permission: impl Into<String>) -> Self {
        self.info.permission = Some(permission.into());
        self
    }

    pub fn execute<F>(mut self, handler: F) -> Self
    where
        F: Fn(&S, &CommandContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Build the syntax, rejecting layouts matching cannot honour
    pub fn build(self) -> DispatchResult<Syntax<S>> {
        let handler = self.handler.ok_or_else(|| {
            DispatchError::invalid_syntax(format!("syntax of '{}' has no handler", self.label))
        })?;

        let mut seen = HashSet::new();
        let mut optional_from: Option<&str> = None;

        for argument in &self.arguments {
            if !seen.insert(argument.id().to_ascii_lowercase()) {
                return Err(DispatchError::invalid_syntax(format!(
                    "duplicate argument id '{}' in '{}'",
                    argument.id(),
                    self.label
                )));
            }

            if argument.is_literal() && argument.default().is_some() {
                return Err(DispatchError::invalid_syntax(format!(
                    "literal '{}' cannot carry a default",
                    argument.id()
                )));
            }

            match optional_from {
                Some(optional) if !argument.is_optional() => {
                    return Err(DispatchError::invalid_syntax(format!(
                        "required argument '{}' follows optional argument '{}'",
                        argument.id(),
                        optional
                    )));
                }
                None if argument.is_optional() => optional_from = Some(argument.id()),
                _ => {}
            }
        }

        Ok(Syntax {
            label: self.label,
            arguments: self.arguments,
            flags: self.flags,
            capability: self.capability,
            info: self.info,
            handler,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    fn give() -> Syntax<()> {
        Syntax::builder("inv")
            .argument(Argument::literal("give"))
            .argument(Argument::word("player"))
            .argument(Argument::integer("amount").default_value(1))
            .execute(|_, _| Ok(()))
            .build()
            .unwrap()
    }

    #[test]
    fn test_lengths() {
        let syntax = give();
        assert_eq!(syntax.length(), 3);
        assert_eq!(syntax.required_length(), 2);
        assert!(syntax.accepts_length(2));
        assert!(!syntax.accepts_length(1));
        assert!(!syntax.accepts_length(4));
    }

    #[test]
    fn test_resolve_binds_every_argument() {
        let values = give().resolve(&tokens(&["GIVE", "Bob", "5"])).unwrap();
        assert_eq!(values.len(), 3);
        assert_eq!(values["give"], Value::Text("give".into()));
        assert_eq!(values["player"], Value::Text("Bob".into()));
        assert_eq!(values["amount"], Value::Integer(5));
    }

    #[test]
    fn test_absent_optional_takes_default() {
        let values = give().resolve(&tokens(&["give", "Bob"])).unwrap();
        assert_eq!(values["amount"], Value::Integer(1));
    }

    #[test]
    fn test_absent_optional_without_default_is_bound() {
        let syntax: Syntax<()> = Syntax::builder("warp")
            .argument(Argument::literal("go"))
            .argument(Argument::word("name").optional())
            .execute(|_, _| Ok(()))
            .build()
            .unwrap();
        let values = syntax.resolve(&tokens(&["go"])).unwrap();
        assert_eq!(values.len(), 2);
        assert!(values["name"].is_absent());
    }

    #[test]
    fn test_mismatches() {
        let syntax = give();
        assert!(!syntax.matches(&tokens(&["take", "Bob"])));
        assert!(!syntax.matches(&tokens(&["give", "Bob", "many"])));
        assert!(!syntax.matches(&tokens(&["give"])));
        assert!(!syntax.matches(&tokens(&["give", "Bob", "1", "extra"])));
        assert!(matches!(
            syntax.resolve(&tokens(&["give"])),
            Err(MatchError::MissingArgument(ref id)) if id == "player"
        ));
    }

    #[test]
    fn test_usage() {
        let syntax: Syntax<()> = Syntax::builder("inv")
            .argument(Argument::literal("give"))
            .argument(Argument::word("player"))
            .argument(Argument::integer("amount").optional())
            .flag(Flag::switch("silent"))
            .execute(|_, _| Ok(()))
            .build()
            .unwrap();
        assert_eq!(syntax.usage(), "inv give <player> [amount] [--silent]");
    }

    #[test]
    fn test_interior_optional_rejected() {
        let result: DispatchResult<Syntax<()>> = Syntax::builder("tp")
            .argument(Argument::word("target").optional())
            .argument(Argument::word("destination"))
            .execute(|_, _| Ok(()))
            .build();
        assert!(matches!(result, Err(DispatchError::InvalidSyntax(_))));
    }

    #[test]
    fn test_literal_default_rejected() {
        let result: DispatchResult<Syntax<()>> = Syntax::builder("x")
            .argument(Argument::literal("all").default_value("all"))
            .execute(|_, _| Ok(()))
            .build();
        assert!(matches!(result, Err(DispatchError::InvalidSyntax(_))));
    }

    #[test]
    fn test_missing_handler_rejected() {
        let result: DispatchResult<Syntax<()>> =
            Syntax::builder("x").argument(Argument::word("a")).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let result: DispatchResult<Syntax<()>> = Syntax::builder("x")
            .argument(Argument::word("a"))
            .argument(Argument::integer("A"))
            .execute(|_, _| Ok(()))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_structural_identity() {
        assert!(give().same_structure(&give()));
        let other: Syntax<()> = Syntax::builder("inv")
            .argument(Argument::literal("take"))
            .argument(Argument::word("player"))
            .argument(Argument::integer("amount").default_value(1))
            .execute(|_, _| Ok(()))
            .build()
            .unwrap();
        assert!(!give().same_structure(&other));
    }
}
