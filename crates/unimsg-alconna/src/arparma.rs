//! Parse results.

use std::collections::BTreeMap;

use crate::argv::Token;
use crate::error::{ErrorInfo, ErrorKind};
use crate::value::ArgValue;

/// What an option recorded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionResult {
    /// Set by the option's action: `Null` for store, a bool, a count or a list.
    pub value: ArgValue,
    /// Arguments of the last occurrence.
    pub args: BTreeMap<String, ArgValue>,
}

/// What a subcommand recorded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubcommandResult {
    pub args: BTreeMap<String, ArgValue>,
    pub options: BTreeMap<String, OptionResult>,
    pub subcommands: BTreeMap<String, SubcommandResult>,
}

/// The next required argument that had no token.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSlot {
    /// Dotted path of the scope owning the argument, empty for the root.
    pub scope: String,
    pub arg: String,
    /// Rendered pattern.
    pub expected: String,
    /// Values offered during completion, default first.
    pub candidates: Vec<String>,
    /// Token index the parse stopped at; completion input is inserted here.
    pub position: usize,
}

impl PendingSlot {
    /// `scope.arg`, or just `arg` at the root.
    pub fn path(&self) -> String {
        if self.scope.is_empty() {
            self.arg.clone()
        } else {
            format!("{}.{}", self.scope, self.arg)
        }
    }
}

/// Outcome of matching input against a grammar.
///
/// A parse never fails with a Rust error; mismatches are described by
/// [`error_info`](Self::error_info).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Arparma {
    /// Path of the grammar that produced this result.
    pub source: String,
    pub matched: bool,
    pub header_matched: bool,
    /// Named captures of a regex header.
    pub header: BTreeMap<String, String>,
    pub prefix: Option<ArgValue>,
    /// Arguments of the root scope.
    pub main_args: BTreeMap<String, ArgValue>,
    /// Every argument of every scope, root first; an inner name never
    /// shadows an outer one.
    pub all_matched_args: BTreeMap<String, ArgValue>,
    pub options: BTreeMap<String, OptionResult>,
    pub subcommands: BTreeMap<String, SubcommandResult>,
    /// Tokens skipped by a non-strict parse.
    pub extra_args: Vec<Token>,
    pub error_info: Option<ErrorInfo>,
    /// Text meant for the user: help, shortcut listings or a rendered failure.
    pub output: Option<String>,
    /// Set when a required argument is missing.
    pub pending: Option<PendingSlot>,
    /// The input after shortcut expansion, used to resume a parse.
    pub tokens: Vec<Token>,
}

impl Arparma {
    pub(crate) fn new(source: String, tokens: Vec<Token>) -> Self {
        Self {
            source,
            tokens,
            ..Self::default()
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error_info.as_ref().map(|info| info.kind)
    }

    /// Looks a value up by dotted path.
    ///
    /// - `name`: a root argument, or the value of the option `name`
    /// - `opt.arg`: an option argument; `opt.value` is the option's value
    /// - `sub.arg`, `sub.opt`, `sub.opt.arg`, `sub.sub2.arg`: the same inside
    ///   subcommands
    pub fn query(&self, path: &str) -> Option<&ArgValue> {
        let parts: Vec<&str> = path.split('.').collect();
        if let [name] = parts.as_slice()
            && let Some(value) = self.main_args.get(*name)
        {
            return Some(value);
        }
        query_scope(&parts, &self.main_args, &self.options, &self.subcommands)
    }

    /// Returns `true` if `path` names a recorded argument, option or subcommand.
    pub fn find(&self, path: &str) -> bool {
        if self.query(path).is_some() {
            return true;
        }
        let mut subcommands = &self.subcommands;
        let mut found = false;
        for part in path.split('.') {
            match subcommands.get(part) {
                Some(sub) => {
                    subcommands = &sub.subcommands;
                    found = true;
                }
                None => return false,
            }
        }
        found
    }

    /// Shorthand for `all_matched_args.get(name)`.
    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.all_matched_args.get(name)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

fn query_scope<'a>(
    parts: &[&str],
    args: &'a BTreeMap<String, ArgValue>,
    options: &'a BTreeMap<String, OptionResult>,
    subcommands: &'a BTreeMap<String, SubcommandResult>,
) -> Option<&'a ArgValue> {
    let (head, rest) = parts.split_first()?;
    if rest.is_empty() {
        return args.get(*head).or_else(|| options.get(*head).map(|o| &o.value));
    }
    if let Some(option) = options.get(*head) {
        return match rest {
            ["value"] => Some(&option.value),
            [arg] => option.args.get(*arg),
            _ => None,
        };
    }
    let sub = subcommands.get(*head)?;
    query_scope(rest, &sub.args, &sub.options, &sub.subcommands)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Arparma {
        let mut result = Arparma {
            matched: true,
            ..Arparma::default()
        };
        result.main_args.insert("name".into(), ArgValue::from("alice"));
        result.options.insert(
            "count".into(),
            OptionResult {
                value: ArgValue::Int(2),
                args: BTreeMap::from([("step".into(), ArgValue::Int(5))]),
            },
        );
        let mut sub = SubcommandResult::default();
        sub.args.insert("id".into(), ArgValue::Int(7));
        sub.options.insert("force".into(), OptionResult::default());
        result.subcommands.insert("remove".into(), sub);
        result
    }

    #[test]
    fn test_query_paths() {
        let result = sample();
        assert_eq!(result.query("name"), Some(&ArgValue::from("alice")));
        assert_eq!(result.query("count"), Some(&ArgValue::Int(2)));
        assert_eq!(result.query("count.value"), Some(&ArgValue::Int(2)));
        assert_eq!(result.query("count.step"), Some(&ArgValue::Int(5)));
        assert_eq!(result.query("remove.id"), Some(&ArgValue::Int(7)));
        assert_eq!(result.query("remove.force"), Some(&ArgValue::Null));
        assert_eq!(result.query("missing"), None);
    }

    #[test]
    fn test_find() {
        let result = sample();
        assert!(result.find("remove"));
        assert!(result.find("remove.force"));
        assert!(!result.find("add"));
    }
}
