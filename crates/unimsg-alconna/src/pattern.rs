//! Value patterns for arguments.
//!
//! A [`Pattern`] either accepts a [`Token`] and converts it to an
//! [`ArgValue`], or rejects it. Patterns never consume input themselves; the
//! analyser decides what happens to a rejected token.

use std::fmt;
use std::sync::Arc;

use regex::Regex;
use unimsg_core::SegmentKind;

use crate::argv::Token;
use crate::error::{GrammarError, GrammarResult};
use crate::value::ArgValue;

/// A user-supplied validator.
pub type Validator = Arc<dyn Fn(&Token) -> Option<ArgValue> + Send + Sync + 'static>;

/// What an argument accepts.
#[derive(Clone)]
pub enum Pattern {
    /// Any token, text as [`ArgValue::Str`], segments as [`ArgValue::Segment`].
    Any,
    /// Any token, converted to its text form.
    AnyString,
    Str,
    Int,
    Float,
    Bool,
    /// One of the given words.
    Literal(Vec<String>),
    /// Text fully matching an expression.
    Regex { source: String, regex: Regex },
    /// A segment of the given kind.
    Segment(SegmentKind),
    /// The first alternative that accepts.
    Union(Vec<Pattern>),
    Custom { name: String, validate: Validator },
}

impl Pattern {
    /// Creates a choice between literal words.
    pub fn literal<I, S>(choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Pattern::Literal(choices.into_iter().map(Into::into).collect())
    }

    /// Creates a pattern requiring a full match of `source`.
    pub fn regex(source: &str) -> GrammarResult<Self> {
        let regex = Regex::new(&format!("^(?:{source})$"))
            .map_err(|err| GrammarError::regex(source, err))?;
        Ok(Pattern::Regex {
            source: source.to_string(),
            regex,
        })
    }

    pub fn union(patterns: impl IntoIterator<Item = Pattern>) -> Self {
        Pattern::Union(patterns.into_iter().collect())
    }

    pub fn custom<F>(name: impl Into<String>, validate: F) -> Self
    where
        F: Fn(&Token) -> Option<ArgValue> + Send + Sync + 'static,
    {
        Pattern::Custom {
            name: name.into(),
            validate: Arc::new(validate),
        }
    }

    /// Looks up a built-in pattern by the name used in declarations.
    pub fn from_name(name: &str) -> Option<Self> {
        let pattern = match name {
            "str" => Pattern::Str,
            "int" => Pattern::Int,
            "float" => Pattern::Float,
            "bool" => Pattern::Bool,
            "any" => Pattern::Any,
            "anystr" => Pattern::AnyString,
            other => Pattern::Segment(SegmentKind::from_name(other)?),
        };
        Some(pattern)
    }

    /// Validates and converts `token`.
    pub fn validate(&self, token: &Token) -> Option<ArgValue> {
        match (self, token) {
            (Pattern::Any, Token::Text(text)) => Some(ArgValue::Str(text.clone())),
            (Pattern::Any, Token::Seg(seg)) => Some(ArgValue::Segment(seg.clone())),
            (Pattern::AnyString, token) => Some(ArgValue::Str(token.to_string())),
            (Pattern::Str, Token::Text(text)) => Some(ArgValue::Str(text.clone())),
            (Pattern::Int, Token::Text(text)) => text.parse().ok().map(ArgValue::Int),
            (Pattern::Float, Token::Text(text)) => text.parse().ok().map(ArgValue::Float),
            (Pattern::Bool, Token::Text(text)) => match text.to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" => Some(ArgValue::Bool(true)),
                "false" | "no" | "off" => Some(ArgValue::Bool(false)),
                _ => None,
            },
            (Pattern::Literal(choices), Token::Text(text)) => choices
                .iter()
                .any(|choice| choice == text)
                .then(|| ArgValue::Str(text.clone())),
            (Pattern::Regex { regex, .. }, Token::Text(text)) => regex
                .is_match(text)
                .then(|| ArgValue::Str(text.clone())),
            (Pattern::Segment(SegmentKind::Text), Token::Text(text)) => {
                Some(ArgValue::Segment(unimsg_core::Segment::text(text.clone())))
            }
            (Pattern::Segment(kind), Token::Seg(seg)) => {
                seg.is(kind).then(|| ArgValue::Segment(seg.clone()))
            }
            (Pattern::Union(patterns), token) => {
                patterns.iter().find_map(|pattern| pattern.validate(token))
            }
            (Pattern::Custom { validate, .. }, token) => validate(token),
            _ => None,
        }
    }

    /// Words this pattern can only be satisfied by, used as completion
    /// candidates.
    pub fn candidates(&self) -> Vec<String> {
        match self {
            Pattern::Literal(choices) => choices.clone(),
            Pattern::Bool => vec!["true".into(), "false".into()],
            Pattern::Union(patterns) => patterns.iter().flat_map(Pattern::candidates).collect(),
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Any => f.write_str("any"),
            Pattern::AnyString => f.write_str("anystr"),
            Pattern::Str => f.write_str("str"),
            Pattern::Int => f.write_str("int"),
            Pattern::Float => f.write_str("float"),
            Pattern::Bool => f.write_str("bool"),
            Pattern::Literal(choices) => {
                let quoted: Vec<_> = choices.iter().map(|c| format!("'{c}'")).collect();
                f.write_str(&quoted.join("|"))
            }
            Pattern::Regex { source, .. } => write!(f, "/{source}/"),
            Pattern::Segment(kind) => write!(f, "{kind}"),
            Pattern::Union(patterns) => {
                let parts: Vec<_> = patterns.iter().map(ToString::to_string).collect();
                f.write_str(&parts.join("|"))
            }
            Pattern::Custom { name, .. } => f.write_str(name),
        }
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pattern({self})")
    }
}
