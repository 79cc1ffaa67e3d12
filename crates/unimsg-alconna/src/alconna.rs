//! The command grammar.
//!
//! An [`Alconna`] is built once through [`AlconnaBuilder`], validated, and
//! then shared read-only between parses. The only state that changes after
//! construction is the shortcut table, which users may edit at runtime
//! through the built-in `--shortcut` option.

use std::collections::{BTreeMap, HashSet};

use parking_lot::RwLock;
use regex::Regex;
use tracing::debug;
use unimsg_core::{SegmentKind, UniMessage};

use crate::analyser::Analyser;
use crate::args::{Arg, ArgKind};
use crate::argv::{Argv, Token};
use crate::arparma::Arparma;
use crate::component::{Opt, Subcommand};
use crate::error::{GrammarError, GrammarResult};
use crate::namespace::{CommandMeta, Namespace};
use crate::shortcut::{Shortcut, ShortcutTable};
use crate::value::ArgValue;

/// Separators used when none are configured.
pub const DEFAULT_SEPARATORS: &[char] = &[' ', '\t', '\n', '\r'];

/// Something that must precede the command name.
#[derive(Debug, Clone, PartialEq)]
pub enum Prefix {
    /// Text glued to the command word, such as `/` or `!`.
    Text(String),
    /// A whole segment before the command word, such as a mention of the bot.
    Segment(SegmentKind),
}

impl From<&str> for Prefix {
    fn from(text: &str) -> Self {
        Prefix::Text(text.to_string())
    }
}

impl From<SegmentKind> for Prefix {
    fn from(kind: SegmentKind) -> Self {
        Prefix::Segment(kind)
    }
}

/// The command word.
#[derive(Debug, Clone)]
pub enum CommandHeader {
    Literal(String),
    /// A full-match expression; named groups are exposed as [`Arparma::header`].
    Regex { source: String, regex: Regex },
}

impl CommandHeader {
    pub fn source(&self) -> &str {
        match self {
            CommandHeader::Literal(name) => name,
            CommandHeader::Regex { source, .. } => source,
        }
    }

    fn captures(&self, word: &str) -> Option<BTreeMap<String, String>> {
        match self {
            CommandHeader::Literal(name) => (word == name).then(BTreeMap::new),
            CommandHeader::Regex { regex, .. } => {
                let captures = regex.captures(word)?;
                Some(
                    regex
                        .capture_names()
                        .flatten()
                        .filter_map(|name| {
                            captures
                                .name(name)
                                .map(|m| (name.to_string(), m.as_str().to_string()))
                        })
                        .collect(),
                )
            }
        }
    }
}

/// A successful header match.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderMatch {
    /// The matched prefix, as text or segment.
    pub prefix: Option<ArgValue>,
    /// Named captures of a regex header.
    pub captures: BTreeMap<String, String>,
    /// Number of tokens the header occupied.
    pub consumed: usize,
}

/// A validated command grammar.
#[derive(Debug)]
pub struct Alconna {
    pub(crate) prefixes: Vec<Prefix>,
    pub(crate) command: CommandHeader,
    pub(crate) args: Vec<Arg>,
    pub(crate) options: Vec<Opt>,
    pub(crate) subcommands: Vec<Subcommand>,
    pub(crate) separators: Vec<char>,
    pub(crate) namespace: Namespace,
    pub(crate) meta: CommandMeta,
    pub(crate) exclusive: Vec<Vec<String>>,
    pub(crate) shortcuts: RwLock<ShortcutTable>,
}

impl Alconna {
    /// Starts a grammar whose command word is `name`.
    pub fn builder(name: impl Into<String>) -> AlconnaBuilder {
        AlconnaBuilder::new(HeaderSource::Literal(name.into()))
    }

    /// Starts a grammar whose command word must fully match `pattern`.
    pub fn builder_regex(pattern: impl Into<String>) -> AlconnaBuilder {
        AlconnaBuilder::new(HeaderSource::Regex(pattern.into()))
    }

    /// The command word, or the header expression.
    pub fn name(&self) -> &str {
        self.command.source()
    }

    /// `namespace::name`, unique within a registry.
    pub fn path(&self) -> String {
        format!("{}::{}", self.namespace.name, self.name())
    }

    pub fn prefixes(&self) -> &[Prefix] {
        &self.prefixes
    }

    pub fn args(&self) -> &[Arg] {
        &self.args
    }

    pub fn options(&self) -> &[Opt] {
        &self.options
    }

    pub fn subcommands(&self) -> &[Subcommand] {
        &self.subcommands
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn meta(&self) -> &CommandMeta {
        &self.meta
    }

    pub fn separators(&self) -> &[char] {
        &self.separators
    }

    pub fn exclusive_groups(&self) -> &[Vec<String>] {
        &self.exclusive
    }

    /// The header a user would type: the first text prefix and the command word.
    pub fn canonical_header(&self) -> String {
        let prefix = self.text_prefixes().next().unwrap_or_default();
        format!("{prefix}{}", self.name())
    }

    pub(crate) fn text_prefixes(&self) -> impl Iterator<Item = &str> {
        self.prefixes.iter().filter_map(|p| match p {
            Prefix::Text(text) => Some(text.as_str()),
            Prefix::Segment(_) => None,
        })
    }

    /// Header spellings that near-miss suggestions are drawn from.
    pub(crate) fn header_candidates(&self) -> Vec<String> {
        let name = self.name();
        let texts: Vec<String> = self.text_prefixes().map(|p| format!("{p}{name}")).collect();
        if texts.is_empty() || self.prefixes.iter().any(|p| matches!(p, Prefix::Segment(_))) {
            let mut all = texts;
            all.push(name.to_string());
            all
        } else {
            texts
        }
    }

    /// Matches the prefix and command word at the start of `tokens`.
    ///
    /// This is the cheap check deciding whether input is addressed to this
    /// command at all; nothing beyond the header is examined.
    pub fn match_header(&self, tokens: &[Token]) -> Option<HeaderMatch> {
        if self.prefixes.is_empty() {
            let word = tokens.first()?.as_text()?;
            return Some(HeaderMatch {
                prefix: None,
                captures: self.command.captures(word)?,
                consumed: 1,
            });
        }

        self.prefixes.iter().find_map(|prefix| match prefix {
            Prefix::Text(text) => {
                let word = tokens.first()?.as_text()?.strip_prefix(text.as_str())?;
                Some(HeaderMatch {
                    prefix: Some(ArgValue::Str(text.clone())),
                    captures: self.command.captures(word)?,
                    consumed: 1,
                })
            }
            Prefix::Segment(kind) => {
                let seg = tokens.first()?.as_segment().filter(|seg| seg.is(kind))?;
                let word = tokens.get(1)?.as_text()?;
                Some(HeaderMatch {
                    prefix: Some(ArgValue::Segment(seg.clone())),
                    captures: self.command.captures(word)?,
                    consumed: 2,
                })
            }
        })
    }

    /// Returns `true` if the header matches, directly or after shortcut
    /// expansion.
    pub fn accepts(&self, tokens: &[Token]) -> bool {
        self.match_header(tokens).is_some()
            || self
                .expand_shortcut(tokens)
                .is_some_and(|expanded| self.match_header(&expanded).is_some())
    }

    /// Tokenises `message` with this grammar's separators.
    pub fn tokenize(&self, message: &UniMessage) -> Argv {
        Argv::from_message(message, &self.separators)
    }

    /// Parses a message.
    pub fn parse(&self, message: &UniMessage) -> Arparma {
        self.parse_argv(self.tokenize(message))
    }

    /// Parses already tokenised input.
    pub fn parse_argv(&self, argv: Argv) -> Arparma {
        let result = Analyser::new(self, argv.into_tokens()).run();
        debug!(
            command = %self.path(),
            matched = result.matched,
            error = ?result.error_kind(),
            "parsed input"
        );
        result
    }

    /// Adds or replaces a shortcut.
    pub fn shortcut(&self, shortcut: Shortcut) {
        debug!(command = %self.path(), key = shortcut.key(), "shortcut added");
        self.shortcuts.write().add(shortcut);
    }

    /// Removes a shortcut; returns whether it existed.
    pub fn remove_shortcut(&self, key: &str) -> bool {
        self.shortcuts.write().remove(key)
    }

    pub fn shortcut_keys(&self) -> Vec<String> {
        self.shortcuts.read().keys().map(str::to_string).collect()
    }

    pub(crate) fn expand_shortcut(&self, tokens: &[Token]) -> Option<Vec<Token>> {
        let table = self.shortcuts.read();
        if table.is_empty() {
            return None;
        }
        let prefixes: Vec<&str> = self.text_prefixes().collect();
        table.expand(tokens, &self.canonical_header(), &prefixes, &self.separators)
    }
}

// =============================================================================
// Builder
// =============================================================================

#[derive(Debug, Clone)]
enum HeaderSource {
    Literal(String),
    Regex(String),
}

/// Collects the parts of a grammar; [`build`](Self::build) validates them.
#[derive(Debug)]
pub struct AlconnaBuilder {
    header: HeaderSource,
    prefixes: Vec<Prefix>,
    args: Vec<Arg>,
    options: Vec<Opt>,
    subcommands: Vec<Subcommand>,
    separators: Vec<char>,
    namespace: Namespace,
    meta: CommandMeta,
    exclusive: Vec<Vec<String>>,
    shortcuts: Vec<Shortcut>,
}

impl AlconnaBuilder {
    fn new(header: HeaderSource) -> Self {
        Self {
            header,
            prefixes: Vec::new(),
            args: Vec::new(),
            options: Vec::new(),
            subcommands: Vec::new(),
            separators: DEFAULT_SEPARATORS.to_vec(),
            namespace: Namespace::default(),
            meta: CommandMeta::default(),
            exclusive: Vec::new(),
            shortcuts: Vec::new(),
        }
    }

    pub fn prefix(mut self, prefix: impl Into<Prefix>) -> Self {
        self.prefixes.push(prefix.into());
        self
    }

    pub fn arg(mut self, arg: Arg) -> Self {
        self.args.push(arg);
        self
    }

    pub fn args(mut self, args: impl IntoIterator<Item = Arg>) -> Self {
        self.args.extend(args);
        self
    }

    pub fn option(mut self, option: Opt) -> Self {
        self.options.push(option);
        self
    }

    pub fn subcommand(mut self, subcommand: Subcommand) -> Self {
        self.subcommands.push(subcommand);
        self
    }

    pub fn separators(mut self, separators: impl IntoIterator<Item = char>) -> Self {
        self.separators = separators.into_iter().collect();
        self
    }

    pub fn namespace(mut self, namespace: Namespace) -> Self {
        self.namespace = namespace;
        self
    }

    pub fn meta(mut self, meta: CommandMeta) -> Self {
        self.meta = meta;
        self
    }

    /// Declares options or subcommands that may not be given together.
    pub fn exclusive<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclusive.push(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn shortcut(mut self, shortcut: Shortcut) -> Self {
        self.shortcuts.push(shortcut);
        self
    }

    /// Validates the grammar.
    pub fn build(self) -> GrammarResult<Alconna> {
        let command = match self.header {
            HeaderSource::Literal(name) if name.is_empty() => {
                return Err(GrammarError::EmptyCommand);
            }
            HeaderSource::Literal(name) => CommandHeader::Literal(name),
            HeaderSource::Regex(source) if source.is_empty() => {
                return Err(GrammarError::EmptyCommand);
            }
            HeaderSource::Regex(source) => {
                let regex = Regex::new(&format!("^(?:{source})$"))
                    .map_err(|err| GrammarError::regex(&source, err))?;
                CommandHeader::Regex { source, regex }
            }
        };

        let scope = format!("{}::{}", self.namespace.name, command.source());
        let builtins: HashSet<&str> = self.namespace.builtin_names().collect();
        validate_scope(
            &scope,
            &self.args,
            &self.options,
            &self.subcommands,
            &builtins,
            &self.namespace.name,
        )?;
        validate_exclusive(&self.exclusive, &self.options, &self.subcommands)?;

        let mut shortcuts = ShortcutTable::default();
        for shortcut in self.shortcuts {
            shortcuts.add(shortcut);
        }

        Ok(Alconna {
            prefixes: self.prefixes,
            command,
            args: self.args,
            options: self.options,
            subcommands: self.subcommands,
            separators: self.separators,
            namespace: self.namespace,
            meta: self.meta,
            exclusive: self.exclusive,
            shortcuts: RwLock::new(shortcuts),
        })
    }
}

fn validate_scope(
    scope: &str,
    args: &[Arg],
    options: &[Opt],
    subcommands: &[Subcommand],
    builtins: &HashSet<&str>,
    namespace: &str,
) -> GrammarResult<()> {
    validate_args(scope, args)?;

    let mut seen = HashSet::new();
    let names = options
        .iter()
        .flat_map(Opt::names)
        .chain(subcommands.iter().flat_map(Subcommand::names));
    for name in names {
        if builtins.contains(name) {
            return Err(GrammarError::NamespaceCollision {
                namespace: namespace.to_string(),
                name: name.to_string(),
            });
        }
        if !seen.insert(name) {
            return Err(GrammarError::DuplicateName {
                scope: scope.to_string(),
                name: name.to_string(),
            });
        }
    }

    for option in options {
        validate_args(&format!("{scope}.{}", option.dest()), &option.args)?;
    }
    for sub in subcommands {
        validate_scope(
            &format!("{scope}.{}", sub.dest()),
            &sub.args,
            &sub.options,
            &sub.subcommands,
            builtins,
            namespace,
        )?;
    }
    Ok(())
}

fn validate_args(scope: &str, args: &[Arg]) -> GrammarResult<()> {
    let mut seen = HashSet::new();
    for (index, arg) in args.iter().enumerate() {
        let invalid = |reason: &str| GrammarError::InvalidArg {
            name: format!("{scope}.{}", arg.name),
            reason: reason.to_string(),
        };
        if arg.name.is_empty() {
            return Err(invalid("name must not be empty"));
        }
        if !seen.insert(arg.name.as_str()) {
            return Err(GrammarError::DuplicateName {
                scope: scope.to_string(),
                name: arg.name.clone(),
            });
        }
        match arg.kind {
            ArgKind::AllParam if index + 1 != args.len() => {
                return Err(invalid("must be the last argument"));
            }
            ArgKind::MultiVar { min, max: Some(max) } if min > max || max == 0 => {
                return Err(invalid("token bounds are empty"));
            }
            _ => {}
        }
    }
    Ok(())
}

fn validate_exclusive(
    groups: &[Vec<String>],
    options: &[Opt],
    subcommands: &[Subcommand],
) -> GrammarResult<()> {
    for group in groups {
        if group.len() < 2 {
            return Err(GrammarError::ExclusiveGroup(format!(
                "group {group:?} needs at least two members"
            )));
        }
        for name in group {
            let known = options.iter().any(|o| o.name == *name || o.dest() == name)
                || subcommands.iter().any(|s| s.name == *name || s.dest() == name);
            if !known {
                return Err(GrammarError::ExclusiveGroup(format!(
                    "'{name}' is not an option or subcommand"
                )));
            }
        }
    }
    Ok(())
}
