// Help hook: an appended `help [page]` syntax delegating to the host

use crate::arguments::Argument;
use crate::command::Command;
use crate::error::DispatchResult;
use crate::syntax::Syntax;
use std::sync::Arc;

/// Renders help pages; pagination and text are entirely up to the host
pub trait HelpProvider<S>: Send + Sync {
    fn display_help(&self, sender: &S, label: &str, page: i64, usages: &[String]) -> anyhow::Result<()>;
}

/// `<label> help [page]`, page at least 1 and defaulting to 1
pub(crate) fn help_syntax<S: 'static>(
    command: &Command<S>,
    provider: Arc<dyn HelpProvider<S>>,
    page_argument: &str,
) -> DispatchResult<Syntax<S>> {
    let label = command.name().to_string();
    let usages: Vec<String> = command.syntaxes().iter().map(|syntax| syntax.usage()).collect();
    let page_id = page_argument.to_string();

    Syntax::builder(command.name())
        .argument(Argument::literal("help"))
        .argument(Argument::integer(page_argument).min(1.0).default_value(1))
        .description(format!("Show help for '{}'", label))
        .execute(move |sender, context| {
            let page = context.argument::<i64>(&page_id).unwrap_or(1);
            provider.display_help(sender, &label, page, &usages)
        })
        .build()
}
