// Tab-completion over a command's syntaxes

use crate::command::Command;
use crate::sender::{SenderProviderRegistry, SenderWrapper, can_satisfy};
use crate::syntax::{FlagExtractor, FlagSet, Syntax};

/// Completion candidates for partially typed input
///
/// The last token is the one being typed; everything before it is complete.
/// Candidates from every eligible syntax are concatenated without ranking or
/// deduplication.
pub struct SuggestionEngine<'a, S> {
    wrapper: &'a dyn SenderWrapper<S>,
    providers: &'a SenderProviderRegistry<S>,
    flags: &'a FlagSet,
    extractor: FlagExtractor<'a>,
}

impl<'a, S> SuggestionEngine<'a, S> {
    pub fn new(
        wrapper: &'a dyn SenderWrapper<S>,
        providers: &'a SenderProviderRegistry<S>,
        flags: &'a FlagSet,
        long_prefix: &'a str,
        short_prefix: &'a str,
    ) -> Self {
        Self {
            wrapper,
            providers,
            flags,
            extractor: FlagExtractor::new(flags, long_prefix, short_prefix),
        }
    }

    pub fn suggest(&self, command: &Command<S>, sender: &S, tokens: &[String]) -> Vec<String> {
        let (completed, partial) = match tokens.split_last() {
            Some((partial, completed)) => (completed, partial.as_str()),
            None => (tokens, ""),
        };

        // The partial token is the value of a valued flag
        if completed.last().is_some_and(|token| self.extractor.expects_value(token)) {
            return Vec::new();
        }

        let (positional, used) = self.extractor.extract(completed);

        if self.looks_like_flag(partial) {
            return self
                .flags
                .iter()
                .filter(|flag| !used.has(flag.name()))
                .map(|flag| format!("{}{}", self.long_prefix(), flag.name()))
                .filter(|candidate| starts_with_ignore_case(candidate, partial))
                .collect();
        }

        let mut suggestions = Vec::new();
        for syntax in command.syntaxes() {
            if !self.eligible(syntax, sender, &positional) {
                continue;
            }

            if let Some(argument) = syntax.argument(positional.len()) {
                suggestions.extend(
                    argument
                        .suggestions()
                        .into_iter()
                        .filter(|candidate| starts_with_ignore_case(candidate, partial)),
                );
            }
        }

        log::debug!("{} suggestion(s) for {:?}", suggestions.len(), tokens);
        suggestions
    }

    /// Room for one more token, sender allowed, completed tokens accepted
    fn eligible(&self, syntax: &Syntax<S>, sender: &S, positional: &[String]) -> bool {
        if positional.len() >= syntax.length() {
            return false;
        }

        if !can_satisfy(self.wrapper, self.providers, sender, syntax.capability()) {
            return false;
        }

        if let Some(permission) = syntax.info().permission.as_deref() {
            if !self.wrapper.has_permission(sender, permission) {
                return false;
            }
        }

        positional
            .iter()
            .zip(syntax.arguments())
            .all(|(token, argument)| argument.parse(token).is_ok())
    }

    fn long_prefix(&self) -> &str {
        self.extractor.long_prefix()
    }

    fn looks_like_flag(&self, partial: &str) -> bool {
        !self.flags.is_empty() && partial.starts_with(self.long_prefix())
    }
}

fn starts_with_ignore_case(candidate: &str, prefix: &str) -> bool {
    candidate.len() >= prefix.len()
        && candidate
            .chars()
            .zip(prefix.chars())
            .all(|(a, b)| a.eq_ignore_ascii_case(&b))
}
