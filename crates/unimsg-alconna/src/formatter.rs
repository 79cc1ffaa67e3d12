//! Help and usage text.

use std::fmt::Write;

use crate::alconna::Alconna;
use crate::args::Arg;
use crate::component::{Opt, Subcommand};

impl Alconna {
    /// One-line usage: the configured usage, or the header followed by the
    /// root arguments.
    pub fn usage(&self) -> String {
        if let Some(usage) = &self.meta.usage {
            return usage.clone();
        }
        let mut out = self.canonical_header();
        push_args(&mut out, &self.args);
        out
    }

    /// Full help text with option, subcommand and example sections.
    pub fn help_text(&self) -> String {
        let mut out = self.usage();
        if let Some(description) = &self.meta.description {
            out.push('\n');
            out.push_str(description);
        }

        if !self.options.is_empty() {
            out.push_str("\n\nOptions:");
            for option in &self.options {
                write_option(&mut out, option, 1);
            }
        }
        if !self.subcommands.is_empty() {
            out.push_str("\n\nSubcommands:");
            for sub in &self.subcommands {
                write_subcommand(&mut out, sub, 1);
            }
        }
        if !self.meta.examples.is_empty() {
            out.push_str("\n\nExamples:");
            for example in &self.meta.examples {
                let _ = write!(out, "\n  {example}");
            }
        }
        out
    }
}

fn push_args(out: &mut String, args: &[Arg]) {
    for arg in args {
        let _ = write!(out, " {arg}");
    }
}

fn write_option(out: &mut String, option: &Opt, depth: usize) {
    let mut line = option.names().collect::<Vec<_>>().join(", ");
    push_args(&mut line, &option.args);
    let _ = write!(out, "\n{}{line}", "  ".repeat(depth));
    if let Some(help) = &option.help_text {
        let _ = write!(out, "  {help}");
    }
}

fn write_subcommand(out: &mut String, sub: &Subcommand, depth: usize) {
    let mut line = sub.names().collect::<Vec<_>>().join(", ");
    push_args(&mut line, &sub.args);
    let _ = write!(out, "\n{}{line}", "  ".repeat(depth));
    if let Some(help) = &sub.help_text {
        let _ = write!(out, "  {help}");
    }
    for option in &sub.options {
        write_option(out, option, depth + 1);
    }
    for nested in &sub.subcommands {
        write_subcommand(out, nested, depth + 1);
    }
}
