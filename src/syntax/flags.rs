// Out-of-band flag declaration and extraction

use std::collections::HashMap;

/// A declared flag, addressed by `--name` or a short `-alias`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Flag {
    name: String,
    aliases: Vec<String>,
    takes_value: bool,
}

impl Flag {
    /// A valueless flag whose presence is the value
    pub fn switch(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            takes_value: false,
        }
    }

    /// A flag consuming the following token (or `=value`)
    pub fn valued(name: impl Into<String>) -> Self {
        Self {
            takes_value: true,
            ..Self::switch(name)
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn takes_value(&self) -> bool {
        self.takes_value
    }

    fn answers_to(&self, key: &str) -> bool {
        self.name.eq_ignore_ascii_case(key) || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(key))
    }
}

/// Value recorded for an extracted flag
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagValue {
    Present,
    Value(String),
}

/// Extracted flags keyed by canonical flag name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagMap {
    entries: HashMap<String, FlagValue>,
}

impl FlagMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: FlagValue) {
        self.entries.insert(name.into(), value);
    }

    pub fn has(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&FlagValue> {
        self.entries.get(name)
    }

    /// The value token of a valued flag
    pub fn value(&self, name: &str) -> Option<&str> {
        match self.entries.get(name) {
            Some(FlagValue::Value(value)) => Some(value),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FlagValue)> {
        self.entries.iter()
    }
}

/// The set of flags recognized for one command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagSet {
    flags: Vec<Flag>,
}

impl FlagSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn of<I: IntoIterator<Item = Flag>>(flags: I) -> Self {
        let mut set = Self::new();
        set.extend(flags);
        set
    }

    /// Add a flag unless one with the same name is already present
    pub fn add(&mut self, flag: Flag) {
        if !self.flags.iter().any(|f| f.name.eq_ignore_ascii_case(&flag.name)) {
            self.flags.push(flag);
        }
    }

    pub fn extend<I: IntoIterator<Item = Flag>>(&mut self, flags: I) {
        for flag in flags {
            self.add(flag);
        }
    }

    pub fn find(&self, key: &str) -> Option<&Flag> {
        self.flags.iter().find(|flag| flag.answers_to(key))
    }

    pub fn names(&self) -> Vec<&str> {
        self.flags.iter().map(|flag| flag.name.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Flag> {
        self.flags.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}

/// Splits flag tokens out of a raw token stream in one left-to-right pass
pub struct FlagExtractor<'a> {
    flags: &'a FlagSet,
    long_prefix: &'a str,
    short_prefix: &'a str,
}

impl<'a> FlagExtractor<'a> {
    pub fn new(flags: &'a FlagSet, long_prefix: &'a str, short_prefix: &'a str) -> Self {
        Self {
            flags,
            long_prefix,
            short_prefix,
        }
    }

    pub fn long_prefix(&self) -> &'a str {
        self.long_prefix
    }

    /// Resolve a token to its declared flag and inline `=value`, if any
    fn recognize(&self, token: &str) -> Option<(&'a Flag, Option<String>)> {
        let body = token
            .strip_prefix(self.long_prefix)
            .or_else(|| token.strip_prefix(self.short_prefix))?;
        if body.is_empty() {
            return None;
        }

        let (key, inline) = match body.split_once('=') {
            Some((key, value)) => (key, Some(value.to_string())),
            None => (body, None),
        };
        self.flags.find(key).map(|flag| (flag, inline))
    }

    /// Whether the token names a declared flag
    pub fn is_flag_token(&self, token: &str) -> bool {
        self.recognize(token).is_some()
    }

    /// Whether the token is a valued flag still waiting for its value token
    pub fn expects_value(&self, token: &str) -> bool {
        matches!(self.recognize(token), Some((flag, None)) if flag.takes_value)
    }

    /// Returns the positional tokens (relative order kept) and the flag map
    pub fn extract(&self, tokens: &[String]) -> (Vec<String>, FlagMap) {
        let mut positional = Vec::with_capacity(tokens.len());
        let mut flags = FlagMap::new();
        let mut index = 0;

        while index < tokens.len() {
            let token = &tokens[index];
            index += 1;

            let Some((flag, inline)) = self.recognize(token) else {
                positional.push(token.clone());
                continue;
            };

            let value = match inline {
                Some(value) => FlagValue::Value(value),
                None if flag.takes_value => match tokens.get(index) {
                    Some(next) if !self.is_flag_token(next) => {
                        index += 1;
                        FlagValue::Value(next.clone())
                    }
                    _ => FlagValue::Present,
                },
                None => FlagValue::Present,
            };
            flags.insert(flag.name.clone(), value);
        }

        log::debug!("extracted flags {:?} from {:?}", flags, tokens);
        (positional, flags)
    }
}
