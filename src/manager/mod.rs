// Command manager: registry, dispatch and completion
//
// The manager owns every piece of shared state (registry, cooldown map,
// global flags, provider registry). Matching and gating run on the calling
// thread; only the handler itself crosses the coordinator boundary.

mod coordinator;
mod gating;
mod help;
mod suggestion;

pub use coordinator::{
    CompletionCallback, CompletionHandle, CoordinatorType, ExceptionHandler, ExecutionCoordinator,
    ExecutionOutcome, ExecutionReport, LoggingExceptionHandler, WorkerRuntime,
};
pub use help::HelpProvider;
pub use suggestion::SuggestionEngine;

use crate::arguments::{ArgumentTypeRegistry, Value};
use crate::caption::{Caption, CaptionKey, CaptionSink, LoggingCaptionSink};
use crate::command::{Clock, Command, CooldownTracker, SystemClock};
use crate::config::ManagerConfig;
use crate::context::{CommandContext, DelegateContext};
use crate::error::{DispatchError, DispatchResult, SyntaxConflict};
use crate::sender::{SenderProviderRegistry, SenderWrapper, adapt_sender};
use crate::syntax::{AmbiguityChecker, Flag, FlagExtractor, FlagSet, Handler, Syntax};
use coordinator::{CompletionHooks, Dispatch};
use gating::Gate;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// Registry and dispatcher for commands of sender type `S`
pub struct CommandManager<S> {
    config: ManagerConfig,
    wrapper: Arc<dyn SenderWrapper<S>>,
    captions: Arc<dyn CaptionSink<S>>,
    hooks: Arc<CompletionHooks<S>>,
    coordinator: ExecutionCoordinator,
    commands: RwLock<HashMap<String, Arc<Command<S>>>>,
    cooldowns: CooldownTracker,
    types: ArgumentTypeRegistry,
    global_flags: RwLock<FlagSet>,
    providers: SenderProviderRegistry<S>,
    help: RwLock<Option<Arc<dyn HelpProvider<S>>>>,
}

impl<S> CommandManager<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn builder<W>(wrapper: W) -> CommandManagerBuilder<S>
    where
        W: SenderWrapper<S> + 'static,
    {
        CommandManagerBuilder::new(wrapper)
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn coordinator_type(&self) -> CoordinatorType {
        self.coordinator.kind()
    }

    /// Register a command after checking its syntaxes for ambiguity
    ///
    /// Rejection is atomic: on any conflict nothing becomes visible to
    /// dispatch and every conflicting pair is reported.
    pub fn register_command(&self, command: Command<S>) -> DispatchResult<()> {
        let command = match self.help_provider() {
            Some(provider) => {
                let syntax = help::help_syntax(&command, provider, &self.config.help_page_argument)?;
                command.with_syntax(syntax)
            }
            None => command,
        };

        let conflicts = self.find_ambiguity(&command);
        if !conflicts.is_empty() {
            let error = DispatchError::AmbiguousRegistration {
                command: command.name().to_string(),
                conflicts,
            };
            log::warn!("Rejected registration: {}", error);
            return Err(error);
        }

        let key = command.name().to_ascii_lowercase();
        let mut commands = write(&self.commands);
        if commands.contains_key(&key) {
            return Err(DispatchError::DuplicateCommand(command.name().to_string()));
        }

        log::info!(
            "Registered command '{}' with {} syntax(es)",
            command.name(),
            command.syntaxes().len()
        );
        commands.insert(key, Arc::new(command));
        Ok(())
    }

    /// Remove a command by its name; aliases are not accepted here
    pub fn unregister_command(&self, name: &str) -> Option<Arc<Command<S>>> {
        let removed = write(&self.commands).remove(&name.to_ascii_lowercase());
        if removed.is_some() {
            log::info!("Unregistered command '{}'", name);
        }
        removed
    }

    /// Look a command up by name, then by alias
    pub fn get_command(&self, label: &str) -> Option<Arc<Command<S>>> {
        let commands = read(&self.commands);
        if let Some(command) = commands.get(&label.to_ascii_lowercase()) {
            return Some(Arc::clone(command));
        }

        commands
            .values()
            .find(|command| command.answers_to(label))
            .cloned()
    }

    /// Registered commands sorted by name
    pub fn commands(&self) -> Vec<Arc<Command<S>>> {
        let mut commands: Vec<Arc<Command<S>>> = read(&self.commands).values().cloned().collect();
        commands.sort_by(|a, b| a.name().cmp(b.name()));
        commands
    }

    pub fn find_ambiguity(&self, command: &Command<S>) -> Vec<SyntaxConflict> {
        AmbiguityChecker::of(command.syntaxes()).find_ambiguity()
    }

    /// First syntax, in registration order, accepting the positional tokens
    pub fn find_syntax(
        &self,
        command: &Command<S>,
        tokens: &[String],
    ) -> Option<(Arc<Syntax<S>>, HashMap<String, Value>)> {
        for syntax in command.syntaxes() {
            if !syntax.accepts_length(tokens.len()) {
                continue;
            }

            match syntax.resolve(tokens) {
                Ok(values) => {
                    log::debug!("'{}' matched {:?}", syntax.usage(), tokens);
                    return Some((Arc::clone(syntax), values));
                }
                Err(e) => log::debug!("'{}' skipped: {}", syntax.usage(), e),
            }
        }
        None
    }

    /// Split a line on whitespace and dispatch it
    pub fn execute_line(&self, sender: &S, line: &str) -> DispatchResult<CompletionHandle> {
        let mut tokens = line.split_whitespace().map(str::to_string);
        let label = tokens.next().unwrap_or_default();
        self.execute(sender, &label, tokens.collect())
    }

    /// Dispatch `args` to the command registered under `label`
    pub fn execute(&self, sender: &S, label: &str, args: Vec<String>) -> DispatchResult<CompletionHandle> {
        match self.get_command(label) {
            Some(command) => self.execute_command(&command, sender, label, args),
            None => {
                let flags = FlagSet::new();
                let extractor = self.extractor(&flags);
                let context = DelegateContext::new(label, args, &extractor);
                log::debug!("Unknown command '{}'", context.raw_format());
                self.captions
                    .emit(sender, &context, &Caption::new(CaptionKey::UnknownCommand).with_arg(label));
                Err(DispatchError::unknown_command(label))
            }
        }
    }

    /// Dispatch to a known command
    ///
    /// With no positional tokens and a default handler, gating runs first and
    /// the default handler is submitted. Otherwise the first matching syntax
    /// is selected, the sender adapted to its capability, and gating runs
    /// before submission.
    pub fn execute_command(
        &self,
        command: &Command<S>,
        sender: &S,
        label: &str,
        args: Vec<String>,
    ) -> DispatchResult<CompletionHandle> {
        let flags = command.flag_set(&self.global_flags());
        let extractor = self.extractor(&flags);
        let delegate = DelegateContext::new(label, args, &extractor);
        let gate = self.gate();

        if delegate.positional().is_empty() {
            if let Some(handler) = command.default_handler() {
                gate.check(command, None, sender, &delegate)?;
                return Ok(self.submit(sender.clone(), Arc::clone(handler), CommandContext::bare(delegate)));
            }
        }

        let Some((syntax, values)) = self.find_syntax(command, delegate.positional()) else {
            self.captions.emit(
                sender,
                &delegate,
                &Caption::new(CaptionKey::UnknownCommand).with_arg(delegate.raw_format()),
            );
            return Err(DispatchError::NoMatchingSyntax {
                command: command.name().to_string(),
                input: delegate.positional().join(" "),
            });
        };

        let adapted = match adapt_sender(self.wrapper.as_ref(), &self.providers, sender, syntax.capability()) {
            Ok(adapted) => adapted,
            Err(error) => {
                let context = CommandContext::new(delegate, syntax.usage(), values);
                self.hooks.exceptions.handle(sender, &context, &error);
                return Err(error);
            }
        };

        gate.check(command, Some(syntax.as_ref()), sender, &delegate)?;
        let context = CommandContext::new(delegate, syntax.usage(), values);
        Ok(self.submit(adapted, Arc::clone(syntax.handler()), context))
    }

    /// Completion candidates for `args`, the last of which is being typed
    pub fn suggest(&self, sender: &S, label: &str, args: &[String]) -> Vec<String> {
        let Some(command) = self.get_command(label) else {
            return Vec::new();
        };

        let flags = command.flag_set(&self.global_flags());
        let delegate = DelegateContext::new(label, args.to_vec(), &self.extractor(&flags));
        let allowed = command
            .requirements()
            .iter()
            .all(|requirement| requirement.accepts(self.wrapper.as_ref(), sender, &delegate));
        if !allowed {
            return Vec::new();
        }

        SuggestionEngine::new(
            self.wrapper.as_ref(),
            &self.providers,
            &flags,
            &self.config.flag_prefix,
            &self.config.short_flag_prefix,
        )
        .suggest(&command, sender, args)
    }

    /// Recognize `flag` for every command
    pub fn register_flag(&self, flag: Flag) {
        write(&self.global_flags).add(flag);
    }

    pub fn global_flags(&self) -> FlagSet {
        read(&self.global_flags).clone()
    }

    pub fn type_registry(&self) -> &ArgumentTypeRegistry {
        &self.types
    }

    pub fn sender_providers(&self) -> &SenderProviderRegistry<S> {
        &self.providers
    }

    /// Install the help hook for commands registered from now on
    pub fn set_help_provider<H>(&self, provider: H)
    where
        H: HelpProvider<S> + 'static,
    {
        *write(&self.help) = Some(Arc::new(provider));
    }

    pub fn help_provider(&self) -> Option<Arc<dyn HelpProvider<S>>> {
        read(&self.help).clone()
    }

    pub fn cooldowns(&self) -> &CooldownTracker {
        &self.cooldowns
    }

    fn extractor<'a>(&'a self, flags: &'a FlagSet) -> FlagExtractor<'a> {
        FlagExtractor::new(flags, &self.config.flag_prefix, &self.config.short_flag_prefix)
    }

    fn gate(&self) -> Gate<'_, S> {
        Gate {
            wrapper: self.wrapper.as_ref(),
            captions: self.captions.as_ref(),
            cooldowns: &self.cooldowns,
        }
    }

    fn submit(&self, sender: S, handler: Handler<S>, context: CommandContext) -> CompletionHandle {
        let sender_name = self.wrapper.sender_name(&sender);
        let dispatch = Dispatch {
            id: Uuid::new_v4(),
            sender,
            sender_name,
            handler,
            context,
        };
        log::debug!("Submitting {} '{}'", dispatch.id, dispatch.context.raw_format());
        self.coordinator.submit(dispatch, &self.hooks)
    }
}

/// Builder for `CommandManager`; only the sender wrapper is mandatory
pub struct CommandManagerBuilder<S> {
    wrapper: Arc<dyn SenderWrapper<S>>,
    config: Option<ManagerConfig>,
    clock: Option<Arc<dyn Clock>>,
    captions: Option<Arc<dyn CaptionSink<S>>>,
    exceptions: Option<Arc<dyn ExceptionHandler<S>>>,
    on_complete: Option<CompletionCallback>,
    help: Option<Arc<dyn HelpProvider<S>>>,
}

impl<S> CommandManagerBuilder<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new<W>(wrapper: W) -> Self
    where
        W: SenderWrapper<S> + 'static,
    {
        Self {
            wrapper: Arc::new(wrapper),
            config: None,
            clock: None,
            captions: None,
            exceptions: None,
            on_complete: None,
            help: None,
        }
    }

    pub fn config(mut self, config: ManagerConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn coordinator(mut self, kind: CoordinatorType) -> Self {
        self.config.get_or_insert_with(ManagerConfig::default).coordinator = kind;
        self
    }

    /// Clock driving cooldown windows
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn caption_sink<C>(mut self, sink: C) -> Self
    where
        C: CaptionSink<S> + 'static,
    {
        self.captions = Some(Arc::new(sink));
        self
    }

    pub fn exception_handler<E>(mut self, handler: E) -> Self
    where
        E: ExceptionHandler<S> + 'static,
    {
        self.exceptions = Some(Arc::new(handler));
        self
    }

    pub fn on_complete<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ExecutionReport) + Send + Sync + 'static,
    {
        self.on_complete = Some(Arc::new(callback));
        self
    }

    pub fn help_provider<H>(mut self, provider: H) -> Self
    where
        H: HelpProvider<S> + 'static,
    {
        self.help = Some(Arc::new(provider));
        self
    }

    pub fn build(self) -> DispatchResult<CommandManager<S>> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let coordinator = ExecutionCoordinator::from_type(config.coordinator)?;
        let hooks = CompletionHooks {
            exceptions: self.exceptions.unwrap_or_else(|| Arc::new(LoggingExceptionHandler)),
            on_complete: self.on_complete,
            log_executions: config.log_executions,
        };

        log::info!("Command manager ready with {:?} coordinator", config.coordinator);

        Ok(CommandManager {
            wrapper: self.wrapper,
            captions: self.captions.unwrap_or_else(|| Arc::new(LoggingCaptionSink)),
            hooks: Arc::new(hooks),
            coordinator,
            commands: RwLock::new(HashMap::new()),
            cooldowns: CooldownTracker::new(self.clock.unwrap_or_else(|| Arc::new(SystemClock))),
            types: ArgumentTypeRegistry::new(),
            global_flags: RwLock::new(FlagSet::new()),
            providers: SenderProviderRegistry::new(),
            help: RwLock::new(self.help),
            config,
        })
    }
}
