// Named argument factories

use crate::arguments::{Argument, ArgumentKind, Value};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Builds an argument for a given id
pub type ArgumentFactory = Arc<dyn Fn(&str) -> Argument + Send + Sync>;

/// Registry of argument types addressable by name
///
/// Ships with `word`, `integer`, `decimal` and `boolean`; hosts register
/// their own kinds next to them.
pub struct ArgumentTypeRegistry {
    factories: RwLock<HashMap<String, ArgumentFactory>>,
}

impl ArgumentTypeRegistry {
    /// Create a registry holding the built-in types
    pub fn new() -> Self {
        let registry = Self {
            factories: RwLock::new(HashMap::new()),
        };
        registry.register("word", |id: &str| Argument::word(id));
        registry.register("integer", |id: &str| Argument::integer(id));
        registry.register("decimal", |id: &str| Argument::decimal(id));
        registry.register("boolean", |id: &str| {
            Argument::custom(id, "boolean", |token| match token.to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" => Ok(Value::Boolean(true)),
                "false" | "no" | "off" => Ok(Value::Boolean(false)),
                _ => Err("expected true or false".to_string()),
            })
            .suggest(["true", "false"])
        });
        registry
    }

    /// Register or replace a named type
    pub fn register<F>(&self, name: impl Into<String>, factory: F)
    where
        F: Fn(&str) -> Argument + Send + Sync + 'static,
    {
        if let Ok(mut factories) = self.factories.write() {
            factories.insert(name.into().to_ascii_lowercase(), Arc::new(factory));
        }
    }

    /// Instantiate an argument of the named type
    pub fn create(&self, type_name: &str, id: &str) -> Option<Argument> {
        let factories = self.factories.read().ok()?;
        factories
            .get(&type_name.to_ascii_lowercase())
            .map(|factory| factory(id))
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.factories
            .read()
            .map(|factories| factories.contains_key(&type_name.to_ascii_lowercase()))
            .unwrap_or(false)
    }

    /// Registered type names, sorted
    pub fn type_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .factories
            .read()
            .map(|factories| factories.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    /// Kind a named type produces, if registered
    pub fn kind_of(&self, type_name: &str) -> Option<ArgumentKind> {
        self.create(type_name, type_name)
            .map(|argument| argument.kind().clone())
    }
}

impl Default for ArgumentTypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_types() {
        let registry = ArgumentTypeRegistry::new();
        assert_eq!(registry.type_names(), vec!["boolean", "decimal", "integer", "word"]);
        assert_eq!(registry.kind_of("Integer"), Some(ArgumentKind::Integer));

        let amount = registry.create("integer", "amount").unwrap();
        assert_eq!(amount.id(), "amount");
        assert_eq!(amount.parse("5").unwrap(), Value::Integer(5));
    }

    #[test]
    fn test_boolean_type() {
        let registry = ArgumentTypeRegistry::new();
        let silent = registry.create("boolean", "silent").unwrap();
        assert_eq!(silent.parse("YES").unwrap(), Value::Boolean(true));
        assert!(silent.parse("maybe").is_err());
        assert_eq!(silent.suggestions(), vec!["true", "false"]);
    }

    #[test]
    fn test_register_custom_type() {
        let registry = ArgumentTypeRegistry::new();
        registry.register("gamemode", |id: &str| {
            Argument::enumeration(id, ["survival", "creative"])
        });

        assert!(registry.contains("GameMode"));
        let mode = registry.create("gamemode", "mode").unwrap();
        assert_eq!(mode.kind(), &ArgumentKind::Enum);
        assert!(registry.create("missing", "x").is_none());
    }
}
