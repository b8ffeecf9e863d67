// Typed argument parsing and suggestion sources
//
// Every token slot of a syntax is an `Argument`: a single record carrying a
// parse function and a suggestion producer, tagged with a closed `ArgumentKind`.

mod registry;
mod value;

pub use registry::{ArgumentFactory, ArgumentTypeRegistry};
pub use value::{FromValue, Value};

use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Parses one raw token into a value, or explains why it cannot
pub type ParseFn = Arc<dyn Fn(&str) -> Result<Value, String> + Send + Sync>;

/// Produces completion candidates on demand
pub type SuggestionFn = Arc<dyn Fn() -> Vec<String> + Send + Sync>;

/// Semantic kind of an argument
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArgumentKind {
    Literal,
    Word,
    Integer,
    Decimal,
    Enum,
    Custom(String),
}

impl ArgumentKind {
    /// Literals are the only closed kind, every other kind accepts open input
    pub fn is_open(&self) -> bool {
        !matches!(self, ArgumentKind::Literal)
    }
}

impl fmt::Display for ArgumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgumentKind::Literal => f.write_str("literal"),
            ArgumentKind::Word => f.write_str("word"),
            ArgumentKind::Integer => f.write_str("integer"),
            ArgumentKind::Decimal => f.write_str("decimal"),
            ArgumentKind::Enum => f.write_str("enum"),
            ArgumentKind::Custom(name) => f.write_str(name),
        }
    }
}

/// A token could not be converted by an argument
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Invalid {expected} '{token}' for argument '{argument}': {reason}")]
pub struct ArgumentParseError {
    pub argument: String,
    pub token: String,
    pub expected: ArgumentKind,
    pub reason: String,
}

/// One token slot of a syntax
#[derive(Clone)]
pub struct Argument {
    id: String,
    kind: ArgumentKind,
    optional: bool,
    default: Option<Value>,
    min: Option<f64>,
    max: Option<f64>,
    parser: ParseFn,
    suggestions: SuggestionFn,
}

impl Argument {
    fn with_parser(id: impl Into<String>, kind: ArgumentKind, parser: ParseFn) -> Self {
        Self {
            id: id.into(),
            kind,
            optional: false,
            default: None,
            min: None,
            max: None,
            parser,
            suggestions: Arc::new(Vec::<String>::new),
        }
    }

    /// A fixed keyword, matched case-insensitively
    pub fn literal(text: impl Into<String>) -> Self {
        let text = text.into();
        let expected = text.clone();
        let suggestion = text.clone();
        let mut argument = Self::with_parser(
            text,
            ArgumentKind::Literal,
            Arc::new(move |token: &str| {
                if token.eq_ignore_ascii_case(&expected) {
                    Ok(Value::Text(expected.clone()))
                } else {
                    Err(format!("expected '{}'", expected))
                }
            }),
        );
        argument.suggestions = Arc::new(move || vec![suggestion.clone()]);
        argument
    }

    /// Any single token
    pub fn word(id: impl Into<String>) -> Self {
        Self::with_parser(
            id,
            ArgumentKind::Word,
            Arc::new(|token: &str| Ok(Value::Text(token.to_string()))),
        )
    }

    /// A signed 64-bit integer
    pub fn integer(id: impl Into<String>) -> Self {
        Self::with_parser(
            id,
            ArgumentKind::Integer,
            Arc::new(|token: &str| {
                token
                    .parse::<i64>()
                    .map(Value::Integer)
                    .map_err(|e| e.to_string())
            }),
        )
    }

    /// A finite floating point number
    pub fn decimal(id: impl Into<String>) -> Self {
        Self::with_parser(
            id,
            ArgumentKind::Decimal,
            Arc::new(|token: &str| match token.parse::<f64>() {
                Ok(value) if value.is_finite() => Ok(Value::Decimal(value)),
                Ok(_) => Err("value must be finite".to_string()),
                Err(e) => Err(e.to_string()),
            }),
        )
    }

    /// One value out of a bounded set, matched case-insensitively
    pub fn enumeration<I, T>(id: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let values: Arc<Vec<String>> = Arc::new(values.into_iter().map(Into::into).collect());
        let accepted = Arc::clone(&values);
        let mut argument = Self::with_parser(
            id,
            ArgumentKind::Enum,
            Arc::new(move |token: &str| {
                accepted
                    .iter()
                    .find(|value| value.eq_ignore_ascii_case(token))
                    .map(|value| Value::Text(value.clone()))
                    .ok_or_else(|| format!("must be one of: {}", accepted.join(", ")))
            }),
        );
        argument.suggestions = Arc::new(move || values.as_ref().clone());
        argument
    }

    /// Extension point for kinds the engine does not ship
    pub fn custom<F>(id: impl Into<String>, kind_name: impl Into<String>, parser: F) -> Self
    where
        F: Fn(&str) -> Result<Value, String> + Send + Sync + 'static,
    {
        Self::with_parser(id, ArgumentKind::Custom(kind_name.into()), Arc::new(parser))
    }

    /// Mark the argument optional without a default
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Mark the argument optional, resolving to `value` when absent
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.optional = true;
        self.default = Some(value.into());
        self
    }

    /// Lower bound for numeric kinds
    pub fn min(mut self, bound: f64) -> Self {
        self.min = Some(bound);
        self
    }

    /// Upper bound for numeric kinds
    pub fn max(mut self, bound: f64) -> Self {
        self.max = Some(bound);
        self
    }

    /// Fixed completion candidates
    pub fn suggest<I, T>(self, candidates: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let candidates: Vec<String> = candidates.into_iter().map(Into::into).collect();
        self.suggest_with(move || candidates.clone())
    }

    /// Completion candidates computed on every request
    pub fn suggest_with<F>(mut self, supplier: F) -> Self
    where
        F: Fn() -> Vec<String> + Send + Sync + 'static,
    {
        self.suggestions = Arc::new(supplier);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> &ArgumentKind {
        &self.kind
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn is_literal(&self) -> bool {
        self.kind == ArgumentKind::Literal
    }

    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Exact keyword check used by matching and ambiguity analysis
    pub fn matches_literal(&self, token: &str) -> bool {
        self.is_literal() && self.id.eq_ignore_ascii_case(token)
    }

    /// Convert a raw token, enforcing declared numeric bounds
    pub fn parse(&self, token: &str) -> Result<Value, ArgumentParseError> {
        let value = (self.parser)(token).map_err(|reason| self.parse_error(token, reason))?;

        if let Some(number) = value.as_decimal() {
            if let Some(min) = self.min {
                if number < min {
                    return Err(self.parse_error(
                        token,
                        format!("value {} is below minimum {}", number, min),
                    ));
                }
            }
            if let Some(max) = self.max {
                if number > max {
                    return Err(self.parse_error(
                        token,
                        format!("value {} is above maximum {}", number, max),
                    ));
                }
            }
        }

        Ok(value)
    }

    /// Completion candidates, recomputed on every call
    pub fn suggestions(&self) -> Vec<String> {
        (self.suggestions)()
    }

    /// `literal`, `<required>` or `[optional]`
    pub fn usage(&self) -> String {
        if self.is_literal() {
            self.id.clone()
        } else if self.optional {
            format!("[{}]", self.id)
        } else {
            format!("<{}>", self.id)
        }
    }

    /// Structural identity, ignoring closures
    pub(crate) fn same_shape(&self, other: &Argument) -> bool {
        self.id == other.id && self.kind == other.kind && self.optional == other.optional
    }

    fn parse_error(&self, token: &str, reason: String) -> ArgumentParseError {
        ArgumentParseError {
            argument: self.id.clone(),
            token: token.to_string(),
            expected: self.kind.clone(),
            reason,
        }
    }
}

impl fmt::Debug for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Argument")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("optional", &self.optional)
            .field("default", &self.default)
            .field("min", &self.min)
            .field("max", &self.max)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_is_case_insensitive() {
        let give = Argument::literal("give");
        assert!(give.matches_literal("GIVE"));
        assert_eq!(give.parse("Give").unwrap(), Value::Text("give".into()));
        assert!(give.parse("take").is_err());
        assert_eq!(give.suggestions(), vec!["give".to_string()]);
    }

    #[test]
    fn test_integer_rejects_text() {
        let err = Argument::integer("amount").parse("ten").unwrap_err();
        assert_eq!(err.token, "ten");
        assert_eq!(err.expected, ArgumentKind::Integer);
        assert_eq!(err.argument, "amount");
    }

    #[test]
    fn test_integer_bounds() {
        let page = Argument::integer("page").min(1.0).max(10.0);
        assert_eq!(page.parse("1").unwrap(), Value::Integer(1));
        assert!(page.parse("0").is_err());
        assert!(page.parse("11").is_err());
    }

    #[test]
    fn test_decimal_rejects_non_finite() {
        let ratio = Argument::decimal("ratio");
        assert_eq!(ratio.parse("0.5").unwrap(), Value::Decimal(0.5));
        assert!(ratio.parse("NaN").is_err());
        assert!(ratio.parse("inf").is_err());
    }

    #[test]
    fn test_enumeration_canonicalizes_and_suggests() {
        let mode = Argument::enumeration("mode", ["survival", "creative"]);
        assert_eq!(mode.parse("CREATIVE").unwrap(), Value::Text("creative".into()));
        assert!(mode.parse("adventure").is_err());
        assert_eq!(mode.suggestions(), vec!["survival", "creative"]);
    }

    #[test]
    fn test_open_kinds_have_no_candidates_by_default() {
        assert!(Argument::word("player").suggestions().is_empty());
        assert!(Argument::integer("amount").suggestions().is_empty());
    }

    #[test]
    fn test_suggest_with_is_lazy() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let player = Argument::word("player").suggest_with(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            vec!["Bob".to_string()]
        });

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(player.suggestions(), vec!["Bob"]);
        assert_eq!(player.suggestions(), vec!["Bob"]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_default_value_implies_optional() {
        let page = Argument::integer("page").default_value(1);
        assert!(page.is_optional());
        assert_eq!(page.default(), Some(&Value::Integer(1)));
        assert_eq!(page.usage(), "[page]");
    }

    #[test]
    fn test_custom_kind() {
        let hex = Argument::custom("color", "hex", |token| {
            i64::from_str_radix(token.trim_start_matches('#'), 16)
                .map(Value::Integer)
                .map_err(|e| e.to_string())
        });
        assert_eq!(hex.kind(), &ArgumentKind::Custom("hex".into()));
        assert_eq!(hex.parse("#ff").unwrap(), Value::Integer(255));
        assert!(hex.kind().is_open());
    }
}
