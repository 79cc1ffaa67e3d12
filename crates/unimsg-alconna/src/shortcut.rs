//! Alternate input surfaces that expand onto a command's canonical grammar.
//!
//! Expansion is a pre-pass over the tokens: when the first token matches a
//! trigger, it is replaced by the command header and the shortcut's argument
//! templates, and the remaining input is appended. Templates may refer to:
//!
//! - `{0}`, `{1}`, ...: regex capture groups, in order
//! - `{name}`: named regex capture groups
//! - `{%0}`, `{%1}`, ...: the tokens following the trigger; a template that
//!   is exactly `{%N}` passes a segment token through unchanged, and tokens
//!   used this way are not appended again

use std::collections::HashSet;

use regex::{Captures, Regex};

use crate::argv::{Token, shell_split};
use crate::error::{GrammarError, GrammarResult};

#[derive(Debug, Clone)]
enum Trigger {
    Literal(String),
    Regex(Regex),
}

/// One shortcut.
#[derive(Debug, Clone)]
pub struct Shortcut {
    key: String,
    trigger: Trigger,
    /// Header to expand to; the command's own header when `None`.
    pub command: Option<String>,
    /// Argument templates inserted after the header.
    pub args: Vec<String>,
    /// A literal trigger may be glued to its first argument (`sign3` for `sign 3`).
    pub fuzzy: bool,
    /// The trigger may carry one of the command's text prefixes.
    pub prefix: bool,
}

impl Shortcut {
    /// A shortcut triggered by an exact word.
    pub fn literal(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            trigger: Trigger::Literal(key.clone()),
            key,
            command: None,
            args: Vec::new(),
            fuzzy: false,
            prefix: false,
        }
    }

    /// A shortcut triggered by a word fully matching `source`.
    pub fn regex(source: &str) -> GrammarResult<Self> {
        let regex = Regex::new(&format!("^(?:{source})$"))
            .map_err(|err| GrammarError::regex(source, err))?;
        Ok(Self {
            key: source.to_string(),
            trigger: Trigger::Regex(regex),
            command: None,
            args: Vec::new(),
            fuzzy: false,
            prefix: false,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn fuzzy(mut self, fuzzy: bool) -> Self {
        self.fuzzy = fuzzy;
        self
    }

    pub fn prefix(mut self, prefix: bool) -> Self {
        self.prefix = prefix;
        self
    }

    /// Expands `tokens` if the first token triggers this shortcut.
    pub(crate) fn expand(
        &self,
        tokens: &[Token],
        header: &str,
        prefixes: &[&str],
        separators: &[char],
    ) -> Option<Vec<Token>> {
        let first = tokens.first()?.as_text()?;
        let mut candidates = vec![first];
        if self.prefix {
            candidates.extend(prefixes.iter().filter_map(|p| first.strip_prefix(p)));
        }

        let (captures, rest) = candidates
            .into_iter()
            .find_map(|word| self.trigger_on(word, &tokens[1..]))?;

        let mut out: Vec<Token> = shell_split(self.command.as_deref().unwrap_or(header), separators)
            .into_iter()
            .map(Token::Text)
            .collect();
        let mut used = HashSet::new();
        for template in &self.args {
            if let Some(index) = whole_rest_ref(template)
                && let Some(token) = rest.get(index)
            {
                used.insert(index);
                out.push(token.clone());
                continue;
            }
            let text = substitute(template, captures.as_ref(), &rest, &mut used);
            if !text.is_empty() {
                out.push(Token::Text(text));
            }
        }
        out.extend(
            rest.into_iter()
                .enumerate()
                .filter(|(i, _)| !used.contains(i))
                .map(|(_, token)| token),
        );
        Some(out)
    }

    fn trigger_on<'t>(
        &self,
        word: &'t str,
        tail: &[Token],
    ) -> Option<(Option<Captures<'t>>, Vec<Token>)> {
        match &self.trigger {
            Trigger::Literal(key) if word == key => Some((None, tail.to_vec())),
            Trigger::Literal(key) if self.fuzzy && word.starts_with(key.as_str()) => {
                let mut rest = vec![Token::text(&word[key.len()..])];
                rest.extend_from_slice(tail);
                Some((None, rest))
            }
            Trigger::Literal(_) => None,
            Trigger::Regex(regex) => regex.captures(word).map(|c| (Some(c), tail.to_vec())),
        }
    }
}

/// `Some(n)` if the template is exactly `{%n}`.
fn whole_rest_ref(template: &str) -> Option<usize> {
    template.strip_prefix("{%")?.strip_suffix('}')?.parse().ok()
}

fn substitute(
    template: &str,
    captures: Option<&Captures<'_>>,
    rest: &[Token],
    used: &mut HashSet<usize>,
) -> String {
    let mut out = String::new();
    let mut remaining = template;
    while let Some(open) = remaining.find('{') {
        out.push_str(&remaining[..open]);
        let after = &remaining[open + 1..];
        let Some(close) = after.find('}') else {
            out.push_str(&remaining[open..]);
            return out;
        };
        let key = &after[..close];
        if let Some(index) = key.strip_prefix('%').and_then(|i| i.parse::<usize>().ok()) {
            if let Some(token) = rest.get(index) {
                used.insert(index);
                out.push_str(&token.to_string());
            }
        } else if let Some(captures) = captures {
            let group = match key.parse::<usize>() {
                Ok(index) => captures.get(index + 1),
                Err(_) => captures.name(key),
            };
            if let Some(group) = group {
                out.push_str(group.as_str());
            }
        }
        remaining = &after[close + 1..];
    }
    out.push_str(remaining);
    out
}

/// Ordered shortcut set of one command.
#[derive(Debug, Clone, Default)]
pub struct ShortcutTable {
    shortcuts: Vec<Shortcut>,
}

impl ShortcutTable {
    /// Adds a shortcut, replacing one with the same key.
    pub fn add(&mut self, shortcut: Shortcut) {
        match self.shortcuts.iter_mut().find(|s| s.key == shortcut.key) {
            Some(slot) => *slot = shortcut,
            None => self.shortcuts.push(shortcut),
        }
    }

    /// Removes the shortcut with `key`; returns whether one existed.
    pub fn remove(&mut self, key: &str) -> bool {
        let before = self.shortcuts.len();
        self.shortcuts.retain(|s| s.key != key);
        self.shortcuts.len() != before
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.shortcuts.iter().map(Shortcut::key)
    }

    pub fn is_empty(&self) -> bool {
        self.shortcuts.is_empty()
    }

    /// Expands with the first matching shortcut, in insertion order.
    pub(crate) fn expand(
        &self,
        tokens: &[Token],
        header: &str,
        prefixes: &[&str],
        separators: &[char],
    ) -> Option<Vec<Token>> {
        self.shortcuts
            .iter()
            .find_map(|s| s.expand(tokens, header, prefixes, separators))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use unimsg_core::Segment;

    const SEP: &[char] = &[' '];

    fn texts(tokens: &[Token]) -> Vec<String> {
        tokens.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_literal_appends_rest() {
        let shortcut = Shortcut::literal("今日天气").args(["--city", "Beijing"]);
        let tokens = vec![Token::text("今日天气"), Token::text("extra")];
        let out = shortcut.expand(&tokens, "/weather", &[], SEP).unwrap();
        assert_eq!(texts(&out), vec!["/weather", "--city", "Beijing", "extra"]);
        assert!(shortcut.expand(&[Token::text("天气")], "/weather", &[], SEP).is_none());
    }

    #[test]
    fn test_regex_groups() {
        let shortcut = Shortcut::regex(r"roll(\d+)d(?<faces>\d+)")
            .unwrap()
            .args(["{0}", "--faces", "{faces}"]);
        let out = shortcut
            .expand(&[Token::text("roll3d6")], "dice", &[], SEP)
            .unwrap();
        assert_eq!(texts(&out), vec!["dice", "3", "--faces", "6"]);
    }

    #[test]
    fn test_rest_reference_passes_segments_through() {
        let shortcut = Shortcut::literal("kick").command("/admin kick").args(["{%0}"]);
        let tokens = vec![Token::text("kick"), Token::Seg(Segment::at("9")), Token::text("bye")];
        let out = shortcut.expand(&tokens, "/admin", &[], SEP).unwrap();
        assert_eq!(out.len(), 4);
        assert_eq!(out[2], Token::Seg(Segment::at("9")));
        assert_eq!(out[3], Token::text("bye"));
    }

    #[test]
    fn test_fuzzy_and_prefix() {
        let shortcut = Shortcut::literal("sign").fuzzy(true).prefix(true);
        let out = shortcut
            .expand(&[Token::text("/sign3")], "checkin", &["/"], SEP)
            .unwrap();
        assert_eq!(texts(&out), vec!["checkin", "3"]);
    }

    #[test]
    fn test_table_replace_and_remove() {
        let mut table = ShortcutTable::default();
        table.add(Shortcut::literal("a").args(["1"]));
        table.add(Shortcut::literal("a").args(["2"]));
        assert_eq!(table.keys().count(), 1);
        let out = table.expand(&[Token::text("a")], "cmd", &[], SEP).unwrap();
        assert_eq!(texts(&out), vec!["cmd", "2"]);
        assert!(table.remove("a"));
        assert!(!table.remove("a"));
        assert!(table.is_empty());
    }
}
