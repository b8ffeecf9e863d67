// Commands: a named, immutable set of alternative syntaxes

mod cooldown;
mod requirement;

pub use cooldown::{Clock, Cooldown, CooldownTracker, ManualClock, RemainingTime, SystemClock, Timestamp};
pub use requirement::{Requirement, RequirementCheck, RequirementFn};

use crate::context::CommandContext;
use crate::syntax::{FlagSet, Handler, Syntax};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Description, permission and aliases of a command
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandInfo {
    pub description: Option<String>,
    pub permission: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// A registered command
pub struct Command<S> {
    name: String,
    info: CommandInfo,
    cooldown: Cooldown,
    requirements: Vec<Requirement<S>>,
    default_handler: Option<Handler<S>>,
    syntaxes: Vec<Arc<Syntax<S>>>,
}

impl<S> Command<S> {
    pub fn builder(name: impl Into<String>) -> CommandBuilder<S> {
        CommandBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn info(&self) -> &CommandInfo {
        &self.info
    }

    pub fn aliases(&self) -> &[String] {
        &self.info.aliases
    }

    pub fn cooldown(&self) -> &Cooldown {
        &self.cooldown
    }

    pub fn has_cooldown(&self) -> bool {
        !self.cooldown.is_empty()
    }

    /// Requirements in evaluation order
    pub fn requirements(&self) -> &[Requirement<S>] {
        &self.requirements
    }

    /// Handler for an invocation with no tokens after the name
    pub fn default_handler(&self) -> Option<&Handler<S>> {
        self.default_handler.as_ref()
    }

    /// Syntaxes in registration order, which is also selection order
    pub fn syntaxes(&self) -> &[Arc<Syntax<S>>] {
        &self.syntaxes
    }

    /// Whether `label` is the name or one of the aliases
    pub fn answers_to(&self, label: &str) -> bool {
        self.name.eq_ignore_ascii_case(label)
            || self.info.aliases.iter().any(|alias| alias.eq_ignore_ascii_case(label))
    }

    /// Flags recognized for this command: every syntax's flags plus `global`
    pub fn flag_set(&self, global: &FlagSet) -> FlagSet {
        let mut flags = global.clone();
        for syntax in &self.syntaxes {
            flags.extend(syntax.flags().iter().cloned());
        }
        flags
    }

    pub(crate) fn with_syntax(mut self, syntax: Syntax<S>) -> Self {
        self.syntaxes.push(Arc::new(syntax));
        self
    }
}

impl<S> fmt::Debug for Command<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("info", &self.info)
            .field("cooldown", &self.cooldown)
            .field("requirements", &self.requirements)
            .field("syntaxes", &self.syntaxes)
            .finish_non_exhaustive()
    }
}

/// Builder for `Command`
pub struct CommandBuilder<S> {
    name: String,
    info: CommandInfo,
    cooldown: Cooldown,
    requirements: Vec<Requirement<S>>,
    default_handler: Option<Handler<S>>,
    syntaxes: Vec<Syntax<S>>,
}

impl<S> CommandBuilder<S> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            info: CommandInfo::default(),
            cooldown: Cooldown::EMPTY,
            requirements: Vec::new(),
            default_handler: None,
            syntaxes: Vec::new(),
        }
    }

    pub fn info(mut self, info: CommandInfo) -> Self {
        self.info = info;
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

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.info.aliases.push(alias.into());
        self
    }

    pub fn cooldown(mut self, cooldown: Cooldown) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn requirement(mut self, requirement: Requirement<S>) -> Self {
        self.requirements.push(requirement);
        self
    }

    pub fn syntax(mut self, syntax: Syntax<S>) -> Self {
        self.syntaxes.push(syntax);
        self
    }

    pub fn default_executor<F>(mut self, handler: F) -> Self
    where
        F: Fn(&S, &CommandContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.default_handler = Some(Arc::new(handler));
        self
    }

    /// The command permission, when set, becomes the first requirement
    pub fn build(self) -> Command<S> {
        let mut requirements = Vec::with_capacity(self.requirements.len() + 1);
        if let Some(permission) = &self.info.permission {
            requirements.push(Requirement::permission(permission.clone()));
        }
        requirements.extend(self.requirements);

        Command {
            name: self.name,
            info: self.info,
            cooldown: self.cooldown,
            requirements,
            default_handler: self.default_handler,
            syntaxes: self.syntaxes.into_iter().map(Arc::new).collect(),
        }
    }
}
