//! Compact declaration strings.
//!
//! ```text
//! /cmd <name:str> [age:int=18] <*tags:str> [mode:'fast'|'slow'] [--force]
//! ```
//!
//! - the first word is the command name
//! - `<...>` is a required argument, `[...]` an optional one
//! - `*name` takes several tokens, `**name` collects `key=value` tokens and
//!   `...name` takes the rest of the input
//! - a pattern is a `|`-separated union of pattern names (`int`, `at`, ...),
//!   quoted literals and `/regex/`; it defaults to `str`
//! - `=value` sets a default, validated against the pattern
//! - a word starting with `-` declares a flag option

use crate::alconna::{Alconna, AlconnaBuilder};
use crate::args::Arg;
use crate::argv::Token;
use crate::component::{Action, Opt};
use crate::error::{GrammarError, GrammarResult};
use crate::pattern::Pattern;

impl Alconna {
    /// Starts a builder from a declaration string.
    ///
    /// Further parts, such as prefixes and meta, can be added before
    /// [`build`](AlconnaBuilder::build).
    pub fn declare(source: &str) -> GrammarResult<AlconnaBuilder> {
        let mut items = Items::new(source);
        let Some((_, name)) = items.next_item()? else {
            return Err(GrammarError::EmptyCommand);
        };
        let mut builder = Alconna::builder(name.text);

        while let Some((offset, item)) = items.next_item()? {
            let error = |reason: String| GrammarError::Declaration { offset, reason };
            match item.bracket {
                None if item.text.starts_with('-') => {
                    builder = builder.option(Opt::new(item.text).action(Action::StoreTrue));
                }
                None => return Err(error(format!("unexpected word '{}'", item.text))),
                Some(_) if item.text.starts_with('-') => {
                    builder = builder.option(Opt::new(item.text).action(Action::StoreTrue));
                }
                Some(required) => {
                    builder = builder.arg(parse_arg(&item.text, required).map_err(|err| match err {
                        GrammarError::Declaration { reason, .. } => error(reason),
                        other => other,
                    })?);
                }
            }
        }
        Ok(builder)
    }
}

struct Item {
    text: String,
    /// `Some(true)` for `<...>`, `Some(false)` for `[...]`.
    bracket: Option<bool>,
}

struct Items<'s> {
    source: &'s str,
    pos: usize,
}

impl<'s> Items<'s> {
    fn new(source: &'s str) -> Self {
        Self { source, pos: 0 }
    }

    fn next_item(&mut self) -> GrammarResult<Option<(usize, Item)>> {
        let rest = &self.source[self.pos..];
        let trimmed = rest.trim_start();
        self.pos += rest.len() - trimmed.len();
        let start = self.pos;

        let close = match trimmed.chars().next() {
            None => return Ok(None),
            Some('<') => Some('>'),
            Some('[') => Some(']'),
            Some(_) => None,
        };

        let Some(close) = close else {
            let end = trimmed.find(char::is_whitespace).unwrap_or(trimmed.len());
            self.pos += end;
            let item = Item {
                text: trimmed[..end].to_string(),
                bracket: None,
            };
            return Ok(Some((start, item)));
        };

        let mut quote = None;
        for (index, ch) in trimmed.char_indices().skip(1) {
            match (quote, ch) {
                (Some(q), c) if c == q => quote = None,
                (Some(_), _) => {}
                (None, '\'' | '"' | '/') => quote = Some(ch),
                (None, c) if c == close => {
                    self.pos += index + ch.len_utf8();
                    let item = Item {
                        text: trimmed[1..index].trim().to_string(),
                        bracket: Some(close == '>'),
                    };
                    return Ok(Some((start, item)));
                }
                _ => {}
            }
        }
        Err(GrammarError::Declaration {
            offset: start,
            reason: format!("unclosed '{}'", &trimmed[..1]),
        })
    }
}

fn declaration_error(reason: impl Into<String>) -> GrammarError {
    GrammarError::Declaration {
        offset: 0,
        reason: reason.into(),
    }
}

fn parse_arg(body: &str, required: bool) -> GrammarResult<Arg> {
    let (body, default) = match split_unquoted(body, '=') {
        Some((head, default)) => (head.trim(), Some(unquote(default.trim()))),
        None => (body, None),
    };
    let (head, pattern) = match split_unquoted(body, ':') {
        Some((head, pattern)) => (head.trim(), Some(pattern.trim())),
        None => (body.trim(), None),
    };

    let (marker, name) = if let Some(name) = head.strip_prefix("...") {
        ("...", name)
    } else if let Some(name) = head.strip_prefix("**") {
        ("**", name)
    } else if let Some(name) = head.strip_prefix('*') {
        ("*", name)
    } else {
        ("", head)
    };
    if name.is_empty() {
        return Err(declaration_error("argument name is empty"));
    }

    let pattern = match pattern {
        Some(source) => parse_pattern(source)?,
        None if marker == "..." => Pattern::Any,
        None => Pattern::Str,
    };
    let mut arg = Arg::new(name, pattern);
    arg = match marker {
        "..." => arg.all_param(),
        "**" => arg.multi_keyword(),
        "*" => arg.multi(usize::from(required), None),
        _ => arg,
    };
    if !required {
        arg = arg.optional();
    }
    if let Some(default) = default {
        let value = arg
            .pattern
            .validate(&Token::text(default.as_str()))
            .ok_or_else(|| {
                declaration_error(format!("default '{default}' does not match {}", arg.pattern))
            })?;
        arg = arg.default(value);
    }
    Ok(arg)
}

fn parse_pattern(source: &str) -> GrammarResult<Pattern> {
    let mut literals = Vec::new();
    let mut others = Vec::new();
    for part in split_all_unquoted(source, '|') {
        let part = part.trim();
        if is_quoted(part) {
            literals.push(unquote(part));
        } else if let Some(regex) = part.strip_prefix('/').and_then(|p| p.strip_suffix('/')) {
            others.push(Pattern::regex(regex)?);
        } else {
            others.push(
                Pattern::from_name(part).ok_or_else(|| GrammarError::UnknownPattern(part.into()))?,
            );
        }
    }

    if !literals.is_empty() {
        others.insert(0, Pattern::Literal(literals));
    }
    match others.len() {
        0 => Err(declaration_error("pattern is empty")),
        1 => Ok(others.remove(0)),
        _ => Ok(Pattern::Union(others)),
    }
}

fn is_quoted(text: &str) -> bool {
    text.len() >= 2
        && ((text.starts_with('\'') && text.ends_with('\''))
            || (text.starts_with('"') && text.ends_with('"')))
}

fn unquote(text: &str) -> String {
    if is_quoted(text) {
        text[1..text.len() - 1].to_string()
    } else {
        text.to_string()
    }
}

/// Splits at the first `sep` outside quotes and regex slashes.
fn split_unquoted(text: &str, sep: char) -> Option<(&str, &str)> {
    let index = unquoted_positions(text, sep).next()?;
    Some((&text[..index], &text[index + sep.len_utf8()..]))
}

fn split_all_unquoted(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    for index in unquoted_positions(text, sep) {
        parts.push(&text[start..index]);
        start = index + sep.len_utf8();
    }
    parts.push(&text[start..]);
    parts
}

fn unquoted_positions(text: &str, sep: char) -> impl Iterator<Item = usize> + '_ {
    let mut quote = None;
    text.char_indices().filter_map(move |(index, ch)| {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"' | '/') => quote = Some(ch),
            (None, c) if c == sep => return Some(index),
            _ => {}
        }
        None
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::ArgKind;
    use crate::value::ArgValue;
    use unimsg_core::UniMessage;

    #[test]
    fn test_declare_and_parse() {
        let alc = Alconna::declare("/cmd <name:str> [age:int = 18] <*tags:str>")
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(alc.name(), "/cmd");
        assert_eq!(alc.args().len(), 3);
        assert_eq!(alc.args()[2].kind, ArgKind::MultiVar { min: 1, max: None });

        let result = alc.parse(&UniMessage::new().text("/cmd alice x y"));
        assert!(result.matched, "{:?}", result.error_info);
        assert_eq!(result.query("age"), Some(&ArgValue::Int(18)));
        assert_eq!(
            result.query("tags"),
            Some(&ArgValue::List(vec!["x".into(), "y".into()]))
        );
    }

    #[test]
    fn test_union_literals_and_flags() {
        let alc = Alconna::declare("go [mode:'fast'|\"slow\" = slow] <target:int|at> --dry")
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(alc.args()[0].pattern.to_string(), "'fast'|'slow'");
        assert_eq!(alc.args()[1].pattern.to_string(), "int|at");
        assert_eq!(alc.options()[0].name, "--dry");
        assert_eq!(alc.args()[0].default_value(), Some(ArgValue::from("slow")));
    }

    #[test]
    fn test_rest_and_regex() {
        let alc = Alconna::declare("say [code:/[a-z]{2}/] <...words>")
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(alc.args()[1].kind, ArgKind::AllParam);
        assert_eq!(alc.args()[0].pattern.to_string(), "/[a-z]{2}/");
    }

    #[test]
    fn test_declaration_errors() {
        assert!(matches!(
            Alconna::declare("cmd <name:str"),
            Err(GrammarError::Declaration { offset: 4, .. })
        ));
        assert!(matches!(
            Alconna::declare("cmd <n:nope>"),
            Err(GrammarError::UnknownPattern(name)) if name == "nope"
        ));
        assert!(matches!(
            Alconna::declare("cmd [n:int=abc]"),
            Err(GrammarError::Declaration { offset: 4, .. })
        ));
        assert!(matches!(
            Alconna::declare("cmd stray"),
            Err(GrammarError::Declaration { .. })
        ));
        assert!(matches!(Alconna::declare("   "), Err(GrammarError::EmptyCommand)));
    }
}
