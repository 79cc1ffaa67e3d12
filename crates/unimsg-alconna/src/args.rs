use std::fmt;
use std::sync::Arc;

use crate::pattern::Pattern;
use crate::value::ArgValue;

/// How many tokens an argument takes and in what shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArgKind {
    /// Exactly one token.
    #[default]
    Single,
    /// Between `min` and `max` consecutive tokens.
    MultiVar { min: usize, max: Option<usize> },
    /// One `name=value` token whose key is the argument name.
    KeyWordVar,
    /// Every `key=value` token, collected into a map.
    MultiKeyWordVar,
    /// The rest of the input verbatim.
    AllParam,
}

/// Value used when an optional argument is absent.
#[derive(Clone)]
pub enum ArgDefault {
    Value(ArgValue),
    Factory(Arc<dyn Fn() -> ArgValue + Send + Sync + 'static>),
}

impl ArgDefault {
    pub fn resolve(&self) -> ArgValue {
        match self {
            ArgDefault::Value(value) => value.clone(),
            ArgDefault::Factory(factory) => factory(),
        }
    }
}

impl fmt::Debug for ArgDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgDefault::Value(value) => f.debug_tuple("Value").field(value).finish(),
            ArgDefault::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

/// A positional argument slot.
#[derive(Debug, Clone)]
pub struct Arg {
    pub name: String,
    pub pattern: Pattern,
    pub default: Option<ArgDefault>,
    pub optional: bool,
    pub kind: ArgKind,
    pub help_text: Option<String>,
}

impl Arg {
    pub fn new(name: impl Into<String>, pattern: Pattern) -> Self {
        Self {
            name: name.into(),
            pattern,
            default: None,
            optional: false,
            kind: ArgKind::Single,
            help_text: None,
        }
    }

    /// Sets a default value; the argument becomes optional.
    pub fn default(mut self, value: impl Into<ArgValue>) -> Self {
        self.default = Some(ArgDefault::Value(value.into()));
        self.optional = true;
        self
    }

    /// Sets a default computed on each use; the argument becomes optional.
    pub fn default_with<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> ArgValue + Send + Sync + 'static,
    {
        self.default = Some(ArgDefault::Factory(Arc::new(factory)));
        self.optional = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Takes `min..=max` tokens (unbounded when `max` is `None`).
    pub fn multi(mut self, min: usize, max: Option<usize>) -> Self {
        self.kind = ArgKind::MultiVar { min, max };
        self
    }

    pub fn keyword(mut self) -> Self {
        self.kind = ArgKind::KeyWordVar;
        self
    }

    pub fn multi_keyword(mut self) -> Self {
        self.kind = ArgKind::MultiKeyWordVar;
        self
    }

    pub fn all_param(mut self) -> Self {
        self.kind = ArgKind::AllParam;
        self
    }

    pub fn help(mut self, text: impl Into<String>) -> Self {
        self.help_text = Some(text.into());
        self
    }

    /// Returns `true` if a parse without this argument is incomplete.
    pub fn is_required(&self) -> bool {
        if self.optional {
            return false;
        }
        match self.kind {
            ArgKind::MultiVar { min, .. } => min > 0,
            ArgKind::MultiKeyWordVar | ArgKind::AllParam => false,
            ArgKind::Single | ArgKind::KeyWordVar => true,
        }
    }

    pub fn default_value(&self) -> Option<ArgValue> {
        self.default.as_ref().map(ArgDefault::resolve)
    }

    /// Values offered during completion.
    pub fn candidates(&self) -> Vec<String> {
        let mut candidates = self.pattern.candidates();
        if let Some(default) = self.default_value() {
            let default = default.to_string();
            candidates.retain(|c| *c != default);
            candidates.insert(0, default);
        }
        candidates
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (open, close) = if self.is_required() { ("<", ">") } else { ("[", "]") };
        let marker = match self.kind {
            ArgKind::Single => "",
            ArgKind::MultiVar { .. } => "*",
            ArgKind::KeyWordVar => "",
            ArgKind::MultiKeyWordVar => "**",
            ArgKind::AllParam => "...",
        };
        let sep = if self.kind == ArgKind::KeyWordVar { "=" } else { ":" };
        write!(f, "{open}{marker}{}{sep}{}", self.name, self.pattern)?;
        if let Some(ArgDefault::Value(value)) = &self.default {
            write!(f, " = {value}")?;
        }
        f.write_str(close)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required() {
        assert!(Arg::new("a", Pattern::Str).is_required());
        assert!(!Arg::new("a", Pattern::Str).default("x").is_required());
        assert!(!Arg::new("a", Pattern::Str).multi(0, None).is_required());
        assert!(Arg::new("a", Pattern::Str).multi(1, None).is_required());
        assert!(!Arg::new("a", Pattern::Str).all_param().is_required());
    }

    #[test]
    fn test_display() {
        assert_eq!(Arg::new("name", Pattern::Str).to_string(), "<name:str>");
        assert_eq!(Arg::new("age", Pattern::Int).default(18).to_string(), "[age:int = 18]");
        assert_eq!(Arg::new("tags", Pattern::Str).multi(1, None).to_string(), "<*tags:str>");
        assert_eq!(Arg::new("lang", Pattern::Str).keyword().to_string(), "<lang=str>");
    }

    #[test]
    fn test_candidates_put_default_first() {
        let arg = Arg::new("mode", Pattern::literal(["fast", "slow"])).default("slow");
        assert_eq!(arg.candidates(), vec!["slow", "fast"]);
        let counter = std::sync::atomic::AtomicI64::new(0);
        let counter = Arc::new(counter);
        let c = Arc::clone(&counter);
        let arg = Arg::new("n", Pattern::Int).default_with(move || {
            ArgValue::Int(c.fetch_add(1, std::sync::atomic::Ordering::SeqCst))
        });
        assert_eq!(arg.default_value(), Some(ArgValue::Int(0)));
        assert_eq!(arg.default_value(), Some(ArgValue::Int(1)));
        assert_eq!(counter.load(std::sync::atomic::Ordering::SeqCst), 2);
    }
}
