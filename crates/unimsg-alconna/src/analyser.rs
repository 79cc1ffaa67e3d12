//! The matching engine.
//!
//! One [`Analyser`] runs one parse:
//!
//! 1. shortcut expansion of the leading token
//! 2. header match, the only step run for input not addressed to the command
//! 3. built-in options (help, shortcut management, completion)
//! 4. a walk over the scopes: at each token an exact option name is tried
//!    first, then a subcommand name, then the next positional argument
//!
//! A subcommand scope hands control back to its parent on the first token
//! it cannot place. Options are recognised anywhere in their scope.

use std::collections::BTreeMap;

use tracing::trace;

use crate::alconna::Alconna;
use crate::args::{Arg, ArgKind};
use crate::argv::Token;
use crate::arparma::{Arparma, OptionResult, PendingSlot, SubcommandResult};
use crate::completion::prompt_text;
use crate::component::{Action, Opt, Subcommand};
use crate::error::{ErrorInfo, ErrorKind, SpecialOption};
use crate::fuzzy;
use crate::shortcut::Shortcut;
use crate::value::ArgValue;

/// Why the walk stopped early.
struct Failure {
    info: ErrorInfo,
    pending: Option<PendingSlot>,
}

impl Failure {
    fn missing(scope: &str, arg: &Arg, position: usize) -> Self {
        Self {
            info: ErrorInfo::new(ErrorKind::ArgumentMissing)
                .target(join(scope, &arg.name))
                .expected(arg.pattern.to_string()),
            pending: Some(PendingSlot {
                scope: scope.to_string(),
                arg: arg.name.clone(),
                expected: arg.pattern.to_string(),
                candidates: arg.candidates(),
                position,
            }),
        }
    }
}

type Step<T> = Result<T, Failure>;

/// Option and subcommand tables of one scope.
#[derive(Clone, Copy)]
struct Frame<'g> {
    options: &'g [Opt],
    subcommands: &'g [Subcommand],
}

impl Frame<'_> {
    fn claims(&self, word: &str) -> bool {
        find_option(self.options, word).is_some()
            || self.subcommands.iter().any(|s| s.is_named(word))
    }
}

pub(crate) struct Analyser<'g> {
    grammar: &'g Alconna,
    tokens: Vec<Token>,
    pos: usize,
    extra: Vec<Token>,
    frames: Vec<Frame<'g>>,
}

impl<'g> Analyser<'g> {
    pub(crate) fn new(grammar: &'g Alconna, tokens: Vec<Token>) -> Self {
        Self {
            grammar,
            tokens,
            pos: 0,
            extra: Vec::new(),
            frames: Vec::new(),
        }
    }

    pub(crate) fn run(mut self) -> Arparma {
        let grammar = self.grammar;
        if let Some(expanded) = grammar.expand_shortcut(&self.tokens) {
            trace!(command = %grammar.path(), "shortcut expanded");
            self.tokens = expanded;
        }

        let Some(header) = grammar.match_header(&self.tokens) else {
            return self.header_unmatched();
        };
        self.pos = header.consumed;

        let namespace = grammar.namespace();
        let body = &self.tokens[self.pos..];
        if body.iter().any(|t| word_in(t, &namespace.help)) {
            let mut result = self.special(SpecialOption::Help);
            result.output = Some(grammar.help_text());
            return self.with_header(result, header.captures, header.prefix);
        }
        if body.first().is_some_and(|t| word_in(t, &namespace.shortcut)) {
            let output = self.manage_shortcuts(&body[1..]);
            let mut result = self.special(SpecialOption::Shortcut);
            result.output = Some(output);
            return self.with_header(result, header.captures, header.prefix);
        }
        let completion = match body.iter().position(|t| word_in(t, &namespace.completion)) {
            Some(index) => {
                self.tokens.remove(self.pos + index);
                true
            }
            None => false,
        };

        let outcome = self.walk_scope(
            "",
            &grammar.args,
            &grammar.options,
            &grammar.subcommands,
            &grammar.exclusive,
        );

        let mut result = Arparma::new(grammar.path(), std::mem::take(&mut self.tokens));
        result.extra_args = std::mem::take(&mut self.extra);
        match outcome {
            Ok(root) => {
                result.main_args = root.args.clone();
                collect_args(&root, &mut result.all_matched_args);
                result.options = root.options;
                result.subcommands = root.subcommands;
                result.matched = !completion;
            }
            Err(failure) => {
                trace!(command = %grammar.path(), error = %failure.info, "parse failed");
                result.output = Some(failure.info.render());
                result.error_info = Some(failure.info);
                result.pending = failure.pending;
            }
        }
        if completion {
            result.matched = false;
            result.output = Some(prompt_text(result.pending.as_ref(), 0));
            result.error_info = Some(ErrorInfo::new(ErrorKind::SpecialOptionTriggered(
                SpecialOption::Completion,
            )));
        }
        self.with_header(result, header.captures, header.prefix)
    }

    fn header_unmatched(self) -> Arparma {
        let grammar = self.grammar;
        let meta = grammar.meta();
        let suggestion = if meta.fuzzy_match {
            let candidates = grammar.header_candidates();
            self.tokens
                .iter()
                .take(2)
                .filter_map(Token::as_text)
                .find_map(|word| {
                    fuzzy::suggest(
                        word,
                        candidates.iter().map(String::as_str),
                        meta.fuzzy_threshold,
                    )
                })
                .map(str::to_string)
        } else {
            None
        };
        let mut result = Arparma::new(grammar.path(), self.tokens);
        result.error_info = Some(ErrorInfo::new(ErrorKind::HeaderUnmatched).suggestion(suggestion));
        result
    }

    fn special(&self, option: SpecialOption) -> Arparma {
        trace!(command = %self.grammar.path(), %option, "special option triggered");
        let mut result = Arparma::new(self.grammar.path(), self.tokens.clone());
        result.error_info = Some(ErrorInfo::new(ErrorKind::SpecialOptionTriggered(option)));
        result
    }

    fn with_header(
        &self,
        mut result: Arparma,
        captures: BTreeMap<String, String>,
        prefix: Option<ArgValue>,
    ) -> Arparma {
        result.header_matched = true;
        result.header = captures;
        result.prefix = prefix;
        result
    }

    fn manage_shortcuts(&self, args: &[Token]) -> String {
        let grammar = self.grammar;
        let words: Vec<String> = args.iter().map(ToString::to_string).collect();
        match words.as_slice() {
            [] => list_shortcuts(grammar),
            [action] if action == "list" => list_shortcuts(grammar),
            [action, key] if action == "delete" => {
                if grammar.remove_shortcut(key) {
                    format!("shortcut '{key}' deleted")
                } else {
                    format!("shortcut '{key}' not found")
                }
            }
            [key, expansion @ ..] => {
                grammar.shortcut(Shortcut::literal(key.clone()).args(expansion.iter().cloned()));
                format!("shortcut '{key}' added")
            }
        }
    }

    // =========================================================================
    // Scope walk
    // =========================================================================

    fn walk_scope(
        &mut self,
        scope: &str,
        args: &'g [Arg],
        options: &'g [Opt],
        subcommands: &'g [Subcommand],
        exclusive: &'g [Vec<String>],
    ) -> Step<SubcommandResult> {
        self.frames.push(Frame {
            options,
            subcommands,
        });
        let out = self.walk_frame(scope, args, options, subcommands, exclusive);
        self.frames.pop();
        out
    }

    fn walk_frame(
        &mut self,
        scope: &str,
        args: &'g [Arg],
        options: &'g [Opt],
        subcommands: &'g [Subcommand],
        exclusive: &'g [Vec<String>],
    ) -> Step<SubcommandResult> {
        let mut out = SubcommandResult::default();
        let mut next_arg = 0;

        while let Some(token) = self.tokens.get(self.pos).cloned() {
            if let Some(word) = token.as_text() {
                if let Some((option, inline)) = find_option(options, word) {
                    self.pos += 1;
                    if let Some(inline) = inline {
                        self.tokens.insert(self.pos, Token::Text(inline));
                    }
                    self.apply_option(scope, option, &mut out.options)?;
                    continue;
                }
                if let Some(sub) = subcommands.iter().find(|s| s.is_named(word)) {
                    self.pos += 1;
                    let path = join(scope, sub.dest());
                    let sub_out =
                        self.walk_scope(&path, &sub.args, &sub.options, &sub.subcommands, &[])?;
                    out.subcommands.insert(sub.dest().to_string(), sub_out);
                    continue;
                }
                let outer = &self.frames[..self.frames.len() - 1];
                if outer.iter().any(|frame| frame.claims(word)) {
                    break;
                }
            }

            if let Some(arg) = args.get(next_arg) {
                if self.match_arg(scope, arg, &mut out.args)? {
                    next_arg += 1;
                }
                continue;
            }
            if self.frames.len() > 1 {
                break;
            }
            self.reject_leftover(token, options, subcommands)?;
        }

        for arg in &args[next_arg..] {
            self.fill_absent(scope, arg, &mut out.args)?;
        }

        for group in exclusive {
            let given: Vec<&str> = group
                .iter()
                .map(|name| name.trim_start_matches('-'))
                .filter(|dest| {
                    out.options.contains_key(*dest) || out.subcommands.contains_key(*dest)
                })
                .collect();
            if given.len() > 1 {
                return Err(Failure {
                    info: ErrorInfo::new(ErrorKind::OptionConflict).target(given.join(", ")),
                    pending: None,
                });
            }
        }

        for option in options {
            if let Some(default) = &option.default
                && !out.options.contains_key(option.dest())
            {
                let args = option
                    .args
                    .iter()
                    .filter_map(|arg| Some((arg.name.clone(), arg.default_value()?)))
                    .collect();
                out.options.insert(
                    option.dest().to_string(),
                    OptionResult {
                        value: default.clone(),
                        args,
                    },
                );
            }
        }
        Ok(out)
    }

    fn apply_option(
        &mut self,
        scope: &str,
        option: &'g Opt,
        results: &mut BTreeMap<String, OptionResult>,
    ) -> Step<()> {
        let path = join(scope, option.dest());
        let mut args = BTreeMap::new();
        let mut next = 0;
        while let Some(arg) = option.args.get(next) {
            if self.match_arg(&path, arg, &mut args)? {
                next += 1;
            }
        }

        let entry = results.entry(option.dest().to_string()).or_default();
        entry.value = match option.action {
            Action::Store => ArgValue::Null,
            Action::StoreTrue => ArgValue::Bool(true),
            Action::StoreFalse => ArgValue::Bool(false),
            Action::Count => ArgValue::Int(entry.value.as_int().unwrap_or(0) + 1),
            Action::Append => {
                let item = match args.len() {
                    0 => ArgValue::Null,
                    1 => args.values().next().cloned().unwrap_or_default(),
                    _ => ArgValue::Map(args.clone()),
                };
                let mut list = match std::mem::take(&mut entry.value) {
                    ArgValue::List(list) => list,
                    _ => Vec::new(),
                };
                list.push(item);
                ArgValue::List(list)
            }
        };
        entry.args = args;
        trace!(option = %path, value = %entry.value, "option matched");
        Ok(())
    }

    /// Matches one argument at the cursor. Returns `false` when the argument
    /// should be tried again on the next token.
    fn match_arg(
        &mut self,
        scope: &str,
        arg: &Arg,
        out: &mut BTreeMap<String, ArgValue>,
    ) -> Step<bool> {
        let Some(token) = self.peek() else {
            self.fill_absent(scope, arg, out)?;
            return Ok(true);
        };
        if arg.kind != ArgKind::AllParam && self.is_boundary(&token) {
            self.fill_absent(scope, arg, out)?;
            return Ok(true);
        }

        match arg.kind {
            ArgKind::Single => match arg.pattern.validate(&token) {
                Some(value) => {
                    self.pos += 1;
                    out.insert(arg.name.clone(), value);
                    Ok(true)
                }
                None => self.reject(scope, arg, token, out),
            },
            ArgKind::KeyWordVar => {
                let value = split_keyword(&token)
                    .filter(|(key, _)| *key == arg.name)
                    .and_then(|(_, value)| arg.pattern.validate(&Token::text(value)));
                match value {
                    Some(value) => {
                        self.pos += 1;
                        out.insert(arg.name.clone(), value);
                        Ok(true)
                    }
                    None => self.reject(scope, arg, token, out),
                }
            }
            ArgKind::MultiVar { min, max } => {
                let mut values = Vec::new();
                while max.is_none_or(|max| values.len() < max) {
                    let Some(token) = self.peek().filter(|t| !self.is_boundary(t)) else {
                        break;
                    };
                    if let Some(value) = arg.pattern.validate(&token) {
                        values.push(value);
                        self.pos += 1;
                        continue;
                    }
                    if values.len() >= min || (values.is_empty() && arg.optional) {
                        break;
                    }
                    if self.grammar.meta().strict {
                        return Err(self.unmatched(scope, arg, &token));
                    }
                    self.extra.push(token);
                    self.pos += 1;
                }
                if values.len() >= min {
                    out.insert(arg.name.clone(), ArgValue::List(values));
                } else if values.is_empty() && !arg.is_required() {
                    self.fill_absent(scope, arg, out)?;
                } else {
                    return Err(Failure::missing(scope, arg, self.pos));
                }
                Ok(true)
            }
            ArgKind::MultiKeyWordVar => {
                let mut map = BTreeMap::new();
                while let Some(token) = self.peek().filter(|t| !self.is_boundary(t)) {
                    let Some((key, value)) = split_keyword(&token)
                        .and_then(|(k, v)| Some((k, arg.pattern.validate(&Token::text(v))?)))
                    else {
                        break;
                    };
                    map.insert(key.to_string(), value);
                    self.pos += 1;
                }
                out.insert(arg.name.clone(), ArgValue::Map(map));
                Ok(true)
            }
            ArgKind::AllParam => {
                let rest = self.tokens[self.pos..]
                    .iter()
                    .map(|token| match token {
                        Token::Text(text) => ArgValue::Str(text.clone()),
                        Token::Seg(seg) => ArgValue::Segment(seg.clone()),
                    })
                    .collect();
                self.pos = self.tokens.len();
                out.insert(arg.name.clone(), ArgValue::List(rest));
                Ok(true)
            }
        }
    }

    /// A token failed `arg`'s pattern.
    fn reject(
        &mut self,
        scope: &str,
        arg: &Arg,
        token: Token,
        out: &mut BTreeMap<String, ArgValue>,
    ) -> Step<bool> {
        if !arg.is_required() {
            self.fill_absent(scope, arg, out)?;
            return Ok(true);
        }
        if self.grammar.meta().strict {
            return Err(self.unmatched(scope, arg, &token));
        }
        trace!(arg = %join(scope, &arg.name), %token, "token skipped");
        self.extra.push(token);
        self.pos += 1;
        Ok(false)
    }

    fn unmatched(&self, scope: &str, arg: &Arg, token: &Token) -> Failure {
        let meta = self.grammar.meta();
        let suggestion = match token.as_text() {
            Some(word) if meta.fuzzy_match => {
                let candidates = arg.pattern.candidates();
                fuzzy::suggest(
                    word,
                    candidates.iter().map(String::as_str),
                    meta.fuzzy_threshold,
                )
                .map(str::to_string)
            }
            _ => None,
        };
        Failure {
            info: ErrorInfo::new(ErrorKind::ParamsUnmatched)
                .target(join(scope, &arg.name))
                .token(token.to_string())
                .expected(arg.pattern.to_string())
                .suggestion(suggestion),
            pending: None,
        }
    }

    fn fill_absent(
        &self,
        scope: &str,
        arg: &Arg,
        out: &mut BTreeMap<String, ArgValue>,
    ) -> Step<()> {
        if let Some(default) = arg.default_value() {
            out.insert(arg.name.clone(), default);
            return Ok(());
        }
        if arg.is_required() {
            return Err(Failure::missing(scope, arg, self.pos));
        }
        let empty = match arg.kind {
            ArgKind::MultiVar { .. } | ArgKind::AllParam => ArgValue::List(Vec::new()),
            ArgKind::MultiKeyWordVar => ArgValue::Map(BTreeMap::new()),
            ArgKind::Single | ArgKind::KeyWordVar => return Ok(()),
        };
        out.insert(arg.name.clone(), empty);
        Ok(())
    }

    /// A root token no slot accepts.
    fn reject_leftover(
        &mut self,
        token: Token,
        options: &[Opt],
        subcommands: &[Subcommand],
    ) -> Step<()> {
        let meta = self.grammar.meta();
        if !meta.strict {
            self.extra.push(token);
            self.pos += 1;
            return Ok(());
        }
        let suggestion = match token.as_text() {
            Some(word) if meta.fuzzy_match => fuzzy::suggest(
                word,
                options
                    .iter()
                    .flat_map(Opt::names)
                    .chain(subcommands.iter().flat_map(Subcommand::names)),
                meta.fuzzy_threshold,
            )
            .map(str::to_string),
            _ => None,
        };
        Err(Failure {
            info: ErrorInfo::new(ErrorKind::ParamsUnmatched)
                .token(token.to_string())
                .suggestion(suggestion),
            pending: None,
        })
    }

    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).cloned()
    }

    /// Whether `token` names an option or subcommand of any open scope.
    fn is_boundary(&self, token: &Token) -> bool {
        token
            .as_text()
            .is_some_and(|word| self.frames.iter().any(|frame| frame.claims(word)))
    }
}

/// Finds the option named by `word`, also accepting `--name=value` for
/// options that take arguments.
fn find_option<'o>(options: &'o [Opt], word: &str) -> Option<(&'o Opt, Option<String>)> {
    if let Some(option) = options.iter().find(|o| o.is_named(word)) {
        return Some((option, None));
    }
    let (name, value) = word.split_once('=')?;
    let option = options
        .iter()
        .find(|o| o.is_named(name) && !o.args.is_empty())?;
    Some((option, Some(value.to_string())))
}

fn split_keyword(token: &Token) -> Option<(&str, &str)> {
    token
        .as_text()?
        .split_once('=')
        .filter(|(key, _)| !key.is_empty())
}

fn word_in(token: &Token, names: &[String]) -> bool {
    token
        .as_text()
        .is_some_and(|word| names.iter().any(|name| name == word))
}

fn join(scope: &str, name: &str) -> String {
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{scope}.{name}")
    }
}

fn collect_args(scope: &SubcommandResult, all: &mut BTreeMap<String, ArgValue>) {
    for (name, value) in &scope.args {
        all.entry(name.clone()).or_insert_with(|| value.clone());
    }
    for option in scope.options.values() {
        for (name, value) in &option.args {
            all.entry(name.clone()).or_insert_with(|| value.clone());
        }
    }
    for sub in scope.subcommands.values() {
        collect_args(sub, all);
    }
}

fn list_shortcuts(grammar: &Alconna) -> String {
    let keys = grammar.shortcut_keys();
    if keys.is_empty() {
        "no shortcuts".to_string()
    } else {
        format!("shortcuts: {}", keys.join(", "))
    }
}
