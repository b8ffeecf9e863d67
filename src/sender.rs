// Sender capability surface
//
// How a sender is obtained from a host is out of scope; the engine only asks
// the host's wrapper about names, permissions and capabilities, and asks the
// provider registry to adapt a sender when a syntax needs a capability the
// raw sender lacks.

use crate::error::{DispatchError, DispatchResult};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Host-side view of a sender
pub trait SenderWrapper<S>: Send + Sync {
    /// Stable identity used for cooldowns and logging
    fn sender_name(&self, sender: &S) -> String;

    fn has_permission(&self, sender: &S, permission: &str) -> bool;

    /// Whether the sender satisfies `capability` as-is
    fn has_capability(&self, sender: &S, capability: &str) -> bool;
}

/// Converts a sender into one satisfying a capability
pub type SenderProvider<S> = Arc<dyn Fn(&S) -> Option<S> + Send + Sync>;

/// Adapters keyed by capability name
pub struct SenderProviderRegistry<S> {
    providers: RwLock<HashMap<String, SenderProvider<S>>>,
}

impl<S> SenderProviderRegistry<S> {
    pub fn new() -> Self {
        Self {
            providers: RwLock::new(HashMap::new()),
        }
    }

    pub fn register<F>(&self, capability: impl Into<String>, provider: F)
    where
        F: Fn(&S) -> Option<S> + Send + Sync + 'static,
    {
        if let Ok(mut providers) = self.providers.write() {
            providers.insert(capability.into(), Arc::new(provider));
        }
    }

    pub fn unregister(&self, capability: &str) -> bool {
        self.providers
            .write()
            .map(|mut providers| providers.remove(capability).is_some())
            .unwrap_or(false)
    }

    /// Adapt `sender` using the provider registered for `capability`
    pub fn provide(&self, sender: &S, capability: &str) -> Option<S> {
        let provider = {
            let providers = self.providers.read().ok()?;
            providers.get(capability).cloned()?
        };
        provider(sender)
    }
}

impl<S> Default for SenderProviderRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve the sender a handler will receive for a syntax requiring `capability`
pub fn adapt_sender<S: Clone>(
    wrapper: &dyn SenderWrapper<S>,
    providers: &SenderProviderRegistry<S>,
    sender: &S,
    capability: Option<&str>,
) -> DispatchResult<S> {
    let Some(capability) = capability else {
        return Ok(sender.clone());
    };

    if wrapper.has_capability(sender, capability) {
        return Ok(sender.clone());
    }

    providers
        .provide(sender, capability)
        .ok_or_else(|| DispatchError::UnsupportedSenderCapability(capability.to_string()))
}

/// Whether `sender` can reach `capability` directly or through a provider
pub fn can_satisfy<S>(
    wrapper: &dyn SenderWrapper<S>,
    providers: &SenderProviderRegistry<S>,
    sender: &S,
    capability: Option<&str>,
) -> bool {
    match capability {
        None => true,
        Some(capability) => {
            wrapper.has_capability(sender, capability)
                || providers.provide(sender, capability).is_some()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum TestSender {
        Console,
        Player(String),
        Remote(String),
    }

    struct Wrapper;

    impl SenderWrapper<TestSender> for Wrapper {
        fn sender_name(&self, sender: &TestSender) -> String {
            match sender {
                TestSender::Console => "console".to_string(),
                TestSender::Player(name) | TestSender::Remote(name) => name.clone(),
            }
        }

        fn has_permission(&self, _sender: &TestSender, _permission: &str) -> bool {
            true
        }

        fn has_capability(&self, sender: &TestSender, capability: &str) -> bool {
            capability == "player" && matches!(sender, TestSender::Player(_))
        }
    }

    #[test]
    fn test_no_capability_keeps_sender() {
        let providers = SenderProviderRegistry::new();
        let adapted = adapt_sender(&Wrapper, &providers, &TestSender::Console, None).unwrap();
        assert_eq!(adapted, TestSender::Console);
    }

    #[test]
    fn test_provider_adapts_sender() {
        let providers = SenderProviderRegistry::new();
        providers.register("player", |sender: &TestSender| match sender {
            TestSender::Remote(name) => Some(TestSender::Player(name.clone())),
            _ => None,
        });

        let remote = TestSender::Remote("Bob".into());
        let adapted = adapt_sender(&Wrapper, &providers, &remote, Some("player")).unwrap();
        assert_eq!(adapted, TestSender::Player("Bob".into()));
        assert!(can_satisfy(&Wrapper, &providers, &remote, Some("player")));
    }

    #[test]
    fn test_missing_provider_is_unsupported() {
        let providers = SenderProviderRegistry::new();
        let err = adapt_sender(&Wrapper, &providers, &TestSender::Console, Some("player")).unwrap_err();
        assert!(matches!(err, DispatchError::UnsupportedSenderCapability(ref c) if c == "player"));
        assert!(!can_satisfy(&Wrapper, &providers, &TestSender::Console, Some("player")));
    }
}
