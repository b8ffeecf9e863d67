// Per-invocation contexts
//
// A `DelegateContext` holds what the caller typed, split into positional
// tokens and flags. A `CommandContext` adds the values bound by the selected
// syntax. Both live for one dispatch only.

use crate::arguments::{FromValue, Value};
use crate::command::Timestamp;
use crate::syntax::{FlagExtractor, FlagMap};
use std::collections::HashMap;

/// Raw input of one invocation, flags already extracted
#[derive(Debug, Clone)]
pub struct DelegateContext {
    label: String,
    raw: Vec<String>,
    positional: Vec<String>,
    flags: FlagMap,
    created_at: Timestamp,
}

impl DelegateContext {
    pub fn new(label: impl Into<String>, raw: Vec<String>, extractor: &FlagExtractor<'_>) -> Self {
        let (positional, flags) = extractor.extract(&raw);
        Self {
            label: label.into(),
            raw,
            positional,
            flags,
            created_at: chrono::Utc::now(),
        }
    }

    /// Command name the invocation was addressed to
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn raw_arguments(&self) -> &[String] {
        &self.raw
    }

    /// Tokens left once flags are removed
    pub fn positional(&self) -> &[String] {
        &self.positional
    }

    pub fn flags(&self) -> &FlagMap {
        &self.flags
    }

    pub fn has_flag(&self, name: &str) -> bool {
        self.flags.has(name)
    }

    pub fn flag_value(&self, name: &str) -> Option<&str> {
        self.flags.value(name)
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// The invocation as typed, e.g. `give Bob 5`
    pub fn raw_format(&self) -> String {
        if self.raw.is_empty() {
            self.label.clone()
        } else {
            format!("{} {}", self.label, self.raw.join(" "))
        }
    }
}

/// Invocation context after a syntax bound its arguments
#[derive(Debug, Clone)]
pub struct CommandContext {
    delegate: DelegateContext,
    usage: String,
    values: HashMap<String, Value>,
}

impl CommandContext {
    pub fn new(delegate: DelegateContext, usage: impl Into<String>, values: HashMap<String, Value>) -> Self {
        Self {
            delegate,
            usage: usage.into(),
            values,
        }
    }

    /// Context for the zero-argument path, nothing bound
    pub fn bare(delegate: DelegateContext) -> Self {
        let usage = delegate.label().to_string();
        Self::new(delegate, usage, HashMap::new())
    }

    pub fn delegate(&self) -> &DelegateContext {
        &self.delegate
    }

    /// Usage string of the syntax that produced this context
    pub fn usage(&self) -> &str {
        &self.usage
    }

    pub fn get(&self, id: &str) -> Option<&Value> {
        self.values.get(id)
    }

    /// Typed access to a bound argument
    pub fn argument<T: FromValue>(&self, id: &str) -> Option<T> {
        self.values.get(id).and_then(T::from_value)
    }

    pub fn values(&self) -> &HashMap<String, Value> {
        &self.values
    }

    pub fn has_flag(&self, name: &str) -> bool {
        self.delegate.has_flag(name)
    }

    pub fn flag_value(&self, name: &str) -> Option<&str> {
        self.delegate.flag_value(name)
    }

    pub fn raw_format(&self) -> String {
        self.delegate.raw_format()
    }

    /// Bound values as a JSON object
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.values).unwrap_or(serde_json::Value::Null)
    }
}
