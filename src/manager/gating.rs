// Pre-dispatch gating: requirements, syntax permission, cooldown

use crate::caption::{Caption, CaptionKey, CaptionSink};
use crate::command::{Command, CooldownTracker};
use crate::context::DelegateContext;
use crate::error::{DispatchError, DispatchResult};
use crate::sender::SenderWrapper;
use crate::syntax::Syntax;

/// Everything a gate needs to reject a dispatch and say why
pub(crate) struct Gate<'a, S> {
    pub wrapper: &'a dyn SenderWrapper<S>,
    pub captions: &'a dyn CaptionSink<S>,
    pub cooldowns: &'a CooldownTracker,
}

impl<S> Gate<'_, S> {
    /// Run every check in order, emitting the caption of the first failure
    ///
    /// The cooldown timestamp is only touched once everything else passed.
    pub fn check(
        &self,
        command: &Command<S>,
        syntax: Option<&Syntax<S>>,
        sender: &S,
        context: &DelegateContext,
    ) -> DispatchResult<()> {
        for requirement in command.requirements() {
            if !requirement.accepts(self.wrapper, sender, context) {
                return Err(self.reject(
                    sender,
                    context,
                    Caption::new(requirement.caption().clone()),
                    DispatchError::RequirementNotMet(requirement.caption().clone()),
                ));
            }
        }

        if let Some(permission) = syntax.and_then(|syntax| syntax.info().permission.as_deref()) {
            if !self.wrapper.has_permission(sender, permission) {
                return Err(self.reject(
                    sender,
                    context,
                    Caption::new(CaptionKey::NoPermission).with_arg(permission),
                    DispatchError::RequirementNotMet(CaptionKey::NoPermission),
                ));
            }
        }

        let sender_name = self.wrapper.sender_name(sender);
        if let Err(remaining) = self.cooldowns.check(command.name(), &sender_name, command.cooldown()) {
            return Err(self.reject(
                sender,
                context,
                Caption::cooldown(remaining),
                DispatchError::OnCooldown(remaining),
            ));
        }

        Ok(())
    }

    fn reject(&self, sender: &S, context: &DelegateContext, caption: Caption, error: DispatchError) -> DispatchError {
        log::warn!("'{}' rejected: {}", context.raw_format(), error);
        self.captions.emit(sender, context, &caption);
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Cooldown, ManualClock, Requirement};
    use crate::syntax::{FlagExtractor, FlagSet};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    struct Wrapper;

    impl SenderWrapper<String> for Wrapper {
        fn sender_name(&self, sender: &String) -> String {
            sender.clone()
        }

        fn has_permission(&self, sender: &String, _permission: &str) -> bool {
            sender == "admin"
        }

        fn has_capability(&self, _sender: &String, _capability: &str) -> bool {
            true
        }
    }

    #[derive(Default)]
    struct Captions(Mutex<Vec<Caption>>);

    impl CaptionSink<String> for Captions {
        fn emit(&self, _sender: &String, _context: &DelegateContext, caption: &Caption) {
            self.0.lock().unwrap().push(caption.clone());
        }
    }

    fn context() -> DelegateContext {
        let flags = FlagSet::new();
        DelegateContext::new("heal", Vec::new(), &FlagExtractor::new(&flags, "--", "-"))
    }

    #[test]
    fn test_requirement_failure_skips_cooldown() {
        let captions = Captions::default();
        let cooldowns = CooldownTracker::new(Arc::new(ManualClock::default()));
        let gate = Gate {
            wrapper: &Wrapper,
            captions: &captions,
            cooldowns: &cooldowns,
        };
        let command: Command<String> = Command::builder("heal")
            .permission("server.heal")
            .cooldown(Cooldown::from_secs(30))
            .build();

        let err = gate.check(&command, None, &"guest".to_string(), &context()).unwrap_err();
        assert!(matches!(err, DispatchError::RequirementNotMet(CaptionKey::NoPermission)));
        assert!(cooldowns.is_empty());
        assert_eq!(captions.0.lock().unwrap()[0].key, CaptionKey::NoPermission);
    }

    #[test]
    fn test_requirements_short_circuit_in_order() {
        let captions = Captions::default();
        let cooldowns = CooldownTracker::new(Arc::new(ManualClock::default()));
        let gate = Gate {
            wrapper: &Wrapper,
            captions: &captions,
            cooldowns: &cooldowns,
        };
        let command: Command<String> = Command::builder("heal")
            .requirement(Requirement::new(|_, _| false, CaptionKey::custom("first")))
            .requirement(Requirement::new(|_, _| false, CaptionKey::custom("second")))
            .build();

        assert!(gate.check(&command, None, &"admin".to_string(), &context()).is_err());
        let emitted = captions.0.lock().unwrap();
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].key, CaptionKey::custom("first"));
    }

    #[test]
    fn test_cooldown_caption_carries_remaining() {
        let captions = Captions::default();
        let clock = Arc::new(ManualClock::default());
        let cooldowns = CooldownTracker::new(clock.clone());
        let gate = Gate {
            wrapper: &Wrapper,
            captions: &captions,
            cooldowns: &cooldowns,
        };
        let command: Command<String> = Command::builder("heal").cooldown(Cooldown::from_secs(30)).build();
        let sender = "admin".to_string();

        assert!(gate.check(&command, None, &sender, &context()).is_ok());
        clock.advance(Duration::from_secs(10));
        let err = gate.check(&command, None, &sender, &context()).unwrap_err();

        assert!(matches!(err, DispatchError::OnCooldown(remaining) if remaining.total() == Duration::from_secs(20)));
        let emitted = captions.0.lock().unwrap();
        assert_eq!(emitted[0].key, CaptionKey::CommandOnCooldown);
        assert_eq!(emitted[0].args[0], "20s");
    }
}
