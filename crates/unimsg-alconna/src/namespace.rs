use crate::config::CommandConfig;

/// Built-in option names shared by a family of commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    pub name: String,
    /// Shows the help text.
    pub help: Vec<String>,
    /// Lists, adds or deletes shortcuts.
    pub shortcut: Vec<String>,
    /// Starts interactive completion.
    pub completion: Vec<String>,
}

impl Default for Namespace {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            help: vec!["--help".into(), "-h".into()],
            shortcut: vec!["--shortcut".into()],
            completion: vec!["--comp".into(), "-cp".into()],
        }
    }
}

impl Namespace {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn help_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.help = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn shortcut_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.shortcut = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn completion_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.completion = names.into_iter().map(Into::into).collect();
        self
    }

    /// Every built-in name.
    pub fn builtin_names(&self) -> impl Iterator<Item = &str> {
        self.help
            .iter()
            .chain(&self.shortcut)
            .chain(&self.completion)
            .map(String::as_str)
    }
}

/// Descriptive and behavioural settings of one command.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandMeta {
    pub description: Option<String>,
    pub usage: Option<String>,
    pub examples: Vec<String>,
    pub fuzzy_match: bool,
    pub fuzzy_threshold: f64,
    pub strict: bool,
    pub auto_send_output: bool,
    /// Leave the command out of listings.
    pub hide: bool,
}

impl Default for CommandMeta {
    fn default() -> Self {
        Self::from_config(&CommandConfig::default())
    }
}

impl CommandMeta {
    /// Meta carrying the behavioural defaults of `config`.
    pub fn from_config(config: &CommandConfig) -> Self {
        Self {
            description: None,
            usage: None,
            examples: Vec::new(),
            fuzzy_match: config.fuzzy_match,
            fuzzy_threshold: config.fuzzy_threshold,
            strict: config.strict,
            auto_send_output: config.auto_send_output,
            hide: false,
        }
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    pub fn usage(mut self, text: impl Into<String>) -> Self {
        self.usage = Some(text.into());
        self
    }

    pub fn example(mut self, text: impl Into<String>) -> Self {
        self.examples.push(text.into());
        self
    }

    pub fn fuzzy_match(mut self, enabled: bool) -> Self {
        self.fuzzy_match = enabled;
        self
    }

    pub fn fuzzy_threshold(mut self, threshold: f64) -> Self {
        self.fuzzy_threshold = threshold;
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn auto_send_output(mut self, enabled: bool) -> Self {
        self.auto_send_output = enabled;
        self
    }

    pub fn hide(mut self) -> Self {
        self.hide = true;
        self
    }
}
