pub mod arguments;
pub mod caption;
pub mod command;
pub mod config;
pub mod context;
pub mod error;
pub mod manager;
pub mod sender;
pub mod syntax;

pub use arguments::{Argument, ArgumentKind, ArgumentParseError, ArgumentTypeRegistry, FromValue, Value};
pub use caption::{Caption, CaptionKey, CaptionSink, LoggingCaptionSink};
pub use command::{
    Clock, Command, CommandBuilder, CommandInfo, Cooldown, CooldownTracker, ManualClock, RemainingTime,
    Requirement, SystemClock,
};
pub use config::ManagerConfig;
pub use context::{CommandContext, DelegateContext};
pub use error::{DispatchError, DispatchResult, SyntaxConflict};
pub use manager::{
    CommandManager, CommandManagerBuilder, CompletionHandle, CoordinatorType, ExceptionHandler,
    ExecutionOutcome, ExecutionReport, HelpProvider,
};
pub use sender::{SenderProviderRegistry, SenderWrapper};
pub use syntax::{Flag, FlagSet, Syntax, SyntaxBuilder};
