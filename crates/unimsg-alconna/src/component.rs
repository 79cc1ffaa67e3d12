use crate::args::Arg;
use crate::value::ArgValue;

/// How repeated or bare occurrences of an option are recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Action {
    /// Records the option's arguments; the value is `Null`.
    #[default]
    Store,
    StoreTrue,
    StoreFalse,
    /// Counts occurrences.
    Count,
    /// Collects the arguments of every occurrence into a list.
    Append,
}

/// A named option, matched anywhere in its scope.
#[derive(Debug, Clone)]
pub struct Opt {
    pub name: String,
    pub aliases: Vec<String>,
    pub args: Vec<Arg>,
    pub action: Action,
    /// Recorded when the option is absent.
    pub default: Option<ArgValue>,
    pub help_text: Option<String>,
}

impl Opt {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            args: Vec::new(),
            action: Action::Store,
            default: None,
            help_text: None,
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn arg(mut self, arg: Arg) -> Self {
        self.args.push(arg);
        self
    }

    pub fn action(mut self, action: Action) -> Self {
        self.action = action;
        self
    }

    pub fn default(mut self, value: impl Into<ArgValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn help(mut self, text: impl Into<String>) -> Self {
        self.help_text = Some(text.into());
        self
    }

    /// Key under which results are stored: the name without leading dashes.
    pub fn dest(&self) -> &str {
        self.name.trim_start_matches('-')
    }

    /// The name followed by the aliases.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    /// Exact, case-sensitive name or alias comparison.
    pub fn is_named(&self, token: &str) -> bool {
        self.names().any(|name| name == token)
    }
}

/// A nested command with its own arguments, options and subcommands.
#[derive(Debug, Clone)]
pub struct Subcommand {
    pub name: String,
    pub aliases: Vec<String>,
    pub args: Vec<Arg>,
    pub options: Vec<Opt>,
    pub subcommands: Vec<Subcommand>,
    pub help_text: Option<String>,
}

impl Subcommand {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            args: Vec::new(),
            options: Vec::new(),
            subcommands: Vec::new(),
            help_text: None,
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn arg(mut self, arg: Arg) -> Self {
        self.args.push(arg);
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

    pub fn help(mut self, text: impl Into<String>) -> Self {
        self.help_text = Some(text.into());
        self
    }

    pub fn dest(&self) -> &str {
        self.name.trim_start_matches('-')
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    pub fn is_named(&self, token: &str) -> bool {
        self.names().any(|name| name == token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dest_and_names() {
        let opt = Opt::new("--verbose").alias("-v");
        assert_eq!(opt.dest(), "verbose");
        assert!(opt.is_named("-v"));
        assert!(!opt.is_named("-V"));
        assert_eq!(opt.names().collect::<Vec<_>>(), vec!["--verbose", "-v"]);
    }
}
