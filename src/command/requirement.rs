// Pre-dispatch gating predicates

use crate::caption::CaptionKey;
use crate::context::DelegateContext;
use crate::sender::SenderWrapper;
use std::fmt;
use std::sync::Arc;

/// Predicate over the sender and the raw invocation
pub type RequirementFn<S> = Arc<dyn Fn(&S, &DelegateContext) -> bool + Send + Sync>;

/// What a requirement checks
pub enum RequirementCheck<S> {
    /// The sender must hold a permission node
    Permission(String),
    /// Host-defined predicate
    Predicate(RequirementFn<S>),
}

/// A gating predicate plus the caption emitted when it fails
pub struct Requirement<S> {
    check: RequirementCheck<S>,
    caption: CaptionKey,
}

impl<S> Requirement<S> {
    pub fn new<F>(predicate: F, caption: CaptionKey) -> Self
    where
        F: Fn(&S, &DelegateContext) -> bool + Send + Sync + 'static,
    {
        Self {
            check: RequirementCheck::Predicate(Arc::new(predicate)),
            caption,
        }
    }

    pub fn permission(node: impl Into<String>) -> Self {
        Self {
            check: RequirementCheck::Permission(node.into()),
            caption: CaptionKey::NoPermission,
        }
    }

    pub fn check(&self) -> &RequirementCheck<S> {
        &self.check
    }

    /// Caption emitted when the requirement fails
    pub fn caption(&self) -> &CaptionKey {
        &self.caption
    }

    /// Side-effect free evaluation
    pub fn accepts(&self, wrapper: &dyn SenderWrapper<S>, sender: &S, context: &DelegateContext) -> bool {
        match &self.check {
            RequirementCheck::Permission(node) => wrapper.has_permission(sender, node),
            RequirementCheck::Predicate(predicate) => predicate(sender, context),
        }
    }
}

impl<S> fmt::Debug for Requirement<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let check = match &self.check {
            RequirementCheck::Permission(node) => format!("permission({})", node),
            RequirementCheck::Predicate(_) => "predicate".to_string(),
        };
        f.debug_struct("Requirement")
            .field("check", &check)
            .field("caption", &self.caption)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{FlagExtractor, FlagSet};

    struct Wrapper;

    impl SenderWrapper<String> for Wrapper {
        fn sender_name(&self, sender: &String) -> String {
            sender.clone()
        }

        fn has_permission(&self, sender: &String, permission: &str) -> bool {
            sender == "admin" && permission.starts_with("server.")
        }

        fn has_capability(&self, _sender: &String, _capability: &str) -> bool {
            false
        }
    }

    fn context(raw: &[&str]) -> DelegateContext {
        let flags = FlagSet::new();
        let extractor = FlagExtractor::new(&flags, "--", "-");
        DelegateContext::new("heal", raw.iter().map(|s| s.to_string()).collect(), &extractor)
    }

    #[test]
    fn test_permission_requirement() {
        let requirement = Requirement::permission("server.heal");
        assert!(requirement.accepts(&Wrapper, &"admin".to_string(), &context(&[])));
        assert!(!requirement.accepts(&Wrapper, &"guest".to_string(), &context(&[])));
    }

    #[test]
    fn test_predicate_sees_context() {
        let requirement: Requirement<String> = Requirement::new(
            |_, context| context.positional().len() < 2,
            CaptionKey::custom("too-many-targets"),
        );
        assert!(requirement.accepts(&Wrapper, &"guest".to_string(), &context(&["Bob"])));
        assert!(!requirement.accepts(&Wrapper, &"guest".to_string(), &context(&["Bob", "Alice"])));
        assert_eq!(requirement.caption(), &CaptionKey::custom("too-many-targets"));
    }
}
