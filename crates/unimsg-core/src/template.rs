//! Restricted string templates producing [`UniMessage`]s.
//!
//! Supported placeholders:
//!
//! - `{}`: the next positional binding
//! - `{0}`: positional binding by index
//! - `{name}`: named binding
//! - `{:Ctor(arg, ...)}`: builds a value with a registered constructor;
//!   bare arguments resolve to bindings when one exists and are taken
//!   literally otherwise, quoted arguments are always literal
//! - `{{` and `}}`: literal braces
//!
//! A binding may itself hold a [`Template`]; it is expanded with the same
//! bindings, at most [`MAX_DEPTH`] levels deep, and a binding that expands
//! back into itself is reported as [`TemplateError::Cycle`].
//!
//! # Example
//!
//! ```rust
//! use unimsg_core::{Bindings, Segment, UniMessage};
//!
//! let msg = UniMessage::template("hi {:At(user, uid)}, you have {} points")
//!     .format(&Bindings::new().arg(42).named("uid", "10001"))
//!     .unwrap();
//!
//! assert_eq!(msg[1], Segment::at("10001"));
//! assert_eq!(msg.extract_plain_text(), "hi , you have 42 points");
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::error::{TemplateError, TemplateResult};
use crate::message::UniMessage;
use crate::segment::{At, AtFlag, Emoji, Segment, Text};

/// Maximum nesting of templates inside template bindings.
pub const MAX_DEPTH: usize = 2;

/// A value bound into a template.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateValue {
    Text(String),
    Segment(Segment),
    Message(UniMessage),
    Template(Template),
}

impl TemplateValue {
    /// String form used when a value is passed to a constructor.
    pub fn as_string(&self) -> String {
        match self {
            TemplateValue::Text(text) => text.clone(),
            TemplateValue::Segment(seg) => seg.to_string(),
            TemplateValue::Message(msg) => msg.to_string(),
            TemplateValue::Template(template) => template.source.clone(),
        }
    }
}

macro_rules! template_value_from_display {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for TemplateValue {
                fn from(value: $ty) -> Self {
                    TemplateValue::Text(value.to_string())
                }
            }
        )*
    };
}

template_value_from_display!(&str, String, i32, i64, u32, u64, usize, f64, bool);

impl From<Segment> for TemplateValue {
    fn from(value: Segment) -> Self {
        TemplateValue::Segment(value)
    }
}

impl From<UniMessage> for TemplateValue {
    fn from(value: UniMessage) -> Self {
        TemplateValue::Message(value)
    }
}

impl From<Template> for TemplateValue {
    fn from(value: Template) -> Self {
        TemplateValue::Template(value)
    }
}

/// Positional and named values for [`Template::format`].
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    positional: Vec<TemplateValue>,
    named: HashMap<String, TemplateValue>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the next positional value.
    pub fn arg(mut self, value: impl Into<TemplateValue>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Adds a named value.
    pub fn named(mut self, name: impl Into<String>, value: impl Into<TemplateValue>) -> Self {
        self.named.insert(name.into(), value.into());
        self
    }

    fn lookup(&self, key: &Key) -> Option<&TemplateValue> {
        match key {
            Key::Index(i) => self.positional.get(*i),
            Key::Name(name) => self.named.get(name),
        }
    }
}

/// Builds a value from constructor arguments.
pub type Factory =
    Arc<dyn Fn(&[TemplateValue]) -> Result<TemplateValue, String> + Send + Sync + 'static>;

/// A parsed-on-demand template with its constructor table.
#[derive(Clone)]
pub struct Template {
    source: String,
    factories: HashMap<String, Factory>,
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl PartialEq for Template {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl UniMessage {
    /// Starts a template with the built-in constructors.
    pub fn template(source: impl Into<String>) -> Template {
        Template::new(source)
    }
}

impl Template {
    /// Creates a template with the built-in constructors: `At`, `AtAll`,
    /// `Emoji`, `Image`, `Reply` and `Text`.
    pub fn new(source: impl Into<String>) -> Self {
        let mut template = Self {
            source: source.into(),
            factories: HashMap::new(),
        };
        template.register_builtin();
        template
    }

    /// The template source.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Registers (or replaces) a constructor.
    pub fn factory<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&[TemplateValue]) -> Result<TemplateValue, String> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
        self
    }

    fn register_builtin(&mut self) {
        fn seg(seg: impl Into<Segment>) -> Result<TemplateValue, String> {
            Ok(TemplateValue::Segment(seg.into()))
        }
        fn arg(args: &[TemplateValue], index: usize) -> Result<String, String> {
            args.get(index)
                .map(TemplateValue::as_string)
                .ok_or_else(|| format!("missing argument {index}"))
        }

        let builtin: [(&str, Factory); 6] = [
            (
                "At",
                Arc::new(|args: &[TemplateValue]| match args.len() {
                    1 => seg(At::user(arg(args, 0)?)),
                    2 => {
                        let flag = match arg(args, 0)?.as_str() {
                            "user" => AtFlag::User,
                            "role" => AtFlag::Role,
                            "channel" => AtFlag::Channel,
                            other => return Err(format!("unknown mention flag '{other}'")),
                        };
                        seg(At::new(flag, arg(args, 1)?))
                    }
                    n => Err(format!("expected 1 or 2 arguments, got {n}")),
                }),
            ),
            ("AtAll", Arc::new(|_: &[TemplateValue]| seg(Segment::at_all()))),
            (
                "Emoji",
                Arc::new(|args: &[TemplateValue]| match args.len() {
                    1 => seg(Emoji::new(arg(args, 0)?)),
                    _ => seg(Emoji::named(arg(args, 0)?, arg(args, 1)?)),
                }),
            ),
            ("Image", Arc::new(|args: &[TemplateValue]| seg(Segment::image_url(arg(args, 0)?)))),
            ("Reply", Arc::new(|args: &[TemplateValue]| seg(Segment::reply(arg(args, 0)?)))),
            (
                "Text",
                Arc::new(|args: &[TemplateValue]| {
                    let mut text = Text::new(arg(args, 0)?);
                    let len = text.len();
                    for style in &args[1..] {
                        text = text.mark(0, len, [style.as_string()]);
                    }
                    seg(text)
                }),
            ),
        ];
        for (name, factory) in builtin {
            self.factories.insert(name.to_string(), factory);
        }
    }

    /// Substitutes `bindings` and builds the message.
    pub fn format(&self, bindings: &Bindings) -> TemplateResult<UniMessage> {
        self.expand(bindings, 0, &mut HashSet::new())
    }

    fn expand(
        &self,
        bindings: &Bindings,
        depth: usize,
        visiting: &mut HashSet<String>,
    ) -> TemplateResult<UniMessage> {
        if depth > MAX_DEPTH {
            return Err(TemplateError::RecursionLimit(MAX_DEPTH));
        }
        let mut out = UniMessage::new();
        let mut auto_index = 0;
        for piece in parse(&self.source)? {
            match piece {
                Piece::Literal(text) => out.push(Text::new(text)),
                Piece::Placeholder(key) => {
                    let key = key.unwrap_or_else(|| {
                        auto_index += 1;
                        Key::Index(auto_index - 1)
                    });
                    let value = bindings
                        .lookup(&key)
                        .ok_or_else(|| TemplateError::MissingBinding(key.to_string()))?;
                    self.emit(value, Some(&key), bindings, depth, visiting, &mut out)?;
                }
                Piece::Call { name, args } => {
                    let factory = self
                        .factories
                        .get(&name)
                        .ok_or_else(|| TemplateError::UnknownFactory(name.clone()))?;
                    let values: Vec<TemplateValue> = args
                        .into_iter()
                        .map(|arg| match arg {
                            CallArg::Literal(text) => TemplateValue::Text(text),
                            CallArg::Bare(word) => {
                                let key = Key::parse(&word);
                                bindings
                                    .lookup(&key)
                                    .cloned()
                                    .unwrap_or(TemplateValue::Text(word))
                            }
                        })
                        .collect();
                    let value = factory(&values)
                        .map_err(|reason| TemplateError::FactoryFailed { name, reason })?;
                    self.emit(&value, None, bindings, depth, visiting, &mut out)?;
                }
            }
        }
        Ok(out)
    }

    fn emit(
        &self,
        value: &TemplateValue,
        key: Option<&Key>,
        bindings: &Bindings,
        depth: usize,
        visiting: &mut HashSet<String>,
        out: &mut UniMessage,
    ) -> TemplateResult<()> {
        match value {
            TemplateValue::Text(text) => out.push(Text::new(text.clone())),
            TemplateValue::Segment(seg) => out.push(seg.clone()),
            TemplateValue::Message(msg) => out.extend(msg.iter().cloned()),
            TemplateValue::Template(nested) => {
                let marker = key.map(ToString::to_string);
                if let Some(marker) = &marker {
                    if !visiting.insert(marker.clone()) {
                        return Err(TemplateError::Cycle(marker.clone()));
                    }
                }
                let expanded = nested.expand(bindings, depth + 1, visiting);
                if let Some(marker) = &marker {
                    visiting.remove(marker);
                }
                out.extend(expanded?);
            }
        }
        Ok(())
    }
}

// ============================================================================
// Parsing
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Key {
    Index(usize),
    Name(String),
}

impl Key {
    fn parse(raw: &str) -> Self {
        raw.parse()
            .map(Key::Index)
            .unwrap_or_else(|_| Key::Name(raw.to_string()))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Index(i) => write!(f, "{i}"),
            Key::Name(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum CallArg {
    Literal(String),
    Bare(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Piece {
    Literal(String),
    /// `None` for an automatically numbered `{}`.
    Placeholder(Option<Key>),
    Call { name: String, args: Vec<CallArg> },
}

fn parse(source: &str) -> TemplateResult<Vec<Piece>> {
    let mut pieces = Vec::new();
    let mut literal = String::new();
    let mut chars = source.char_indices().peekable();

    while let Some((offset, ch)) = chars.next() {
        match ch {
            '{' if chars.peek().map(|&(_, c)| c) == Some('{') => {
                chars.next();
                literal.push('{');
            }
            '}' if chars.peek().map(|&(_, c)| c) == Some('}') => {
                chars.next();
                literal.push('}');
            }
            '}' => {
                return Err(TemplateError::Syntax {
                    offset,
                    reason: "unmatched '}'".into(),
                });
            }
            '{' => {
                let mut body = String::new();
                let mut closed = false;
                let mut quote: Option<char> = None;
                for (_, c) in chars.by_ref() {
                    match (c, quote) {
                        ('}', None) => {
                            closed = true;
                            break;
                        }
                        ('"' | '\'', None) => quote = Some(c),
                        (q, Some(open)) if q == open => quote = None,
                        _ => {}
                    }
                    body.push(c);
                }
                if !closed {
                    return Err(TemplateError::Syntax {
                        offset,
                        reason: "unclosed '{'".into(),
                    });
                }
                if !literal.is_empty() {
                    pieces.push(Piece::Literal(std::mem::take(&mut literal)));
                }
                pieces.push(parse_placeholder(body.trim(), offset)?);
            }
            _ => literal.push(ch),
        }
    }
    if !literal.is_empty() {
        pieces.push(Piece::Literal(literal));
    }
    Ok(pieces)
}

fn parse_placeholder(body: &str, offset: usize) -> TemplateResult<Piece> {
    let Some(call) = body.strip_prefix(':') else {
        return Ok(Piece::Placeholder(
            (!body.is_empty()).then(|| Key::parse(body)),
        ));
    };
    let syntax = |reason: &str| TemplateError::Syntax {
        offset,
        reason: reason.to_string(),
    };
    let open = call.find('(').ok_or_else(|| syntax("expected '(' after constructor"))?;
    let inner = call[open + 1..]
        .strip_suffix(')')
        .ok_or_else(|| syntax("expected ')' closing constructor"))?;
    let name = call[..open].trim();
    if name.is_empty() {
        return Err(syntax("empty constructor name"));
    }

    let mut args = Vec::new();
    for raw in split_args(inner) {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        let quoted = raw.len() >= 2
            && ((raw.starts_with('"') && raw.ends_with('"'))
                || (raw.starts_with('\'') && raw.ends_with('\'')));
        args.push(if quoted {
            CallArg::Literal(raw[1..raw.len() - 1].to_string())
        } else {
            CallArg::Bare(raw.to_string())
        });
    }
    Ok(Piece::Call {
        name: name.to_string(),
        args,
    })
}

/// Splits on commas outside quotes.
fn split_args(inner: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in inner.char_indices() {
        match (c, quote) {
            ('"' | '\'', None) => quote = Some(c),
            (q, Some(open)) if q == open => quote = None,
            (',', None) => {
                parts.push(&inner[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&inner[start..]);
    parts
}
