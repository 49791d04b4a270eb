//! The command tree as plain data.
//!
//! Groups and leaves are [`CommandNode`]s. A node is turned into a
//! `clap::Command` for parsing only; clap never validates values, required
//! flags or positionals. Those checks belong to the dispatcher so every
//! failure goes through the same error taxonomy.

use super::invocation::Invocation;
use crate::args::ArgSchema;
use crate::error::Result;
use crate::examples::{self, Example};
use clap::{Arg, ArgAction, Command};

pub type RunFn = fn(&mut Invocation) -> Result<()>;

/// Id of the catch-all positional every leaf carries.
pub const ARGS_ID: &str = "args";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagKind {
    /// Takes a value. Repeating the flag appends, joined with `,`.
    Value,
    /// `--flag`, `--flag=true` or `--flag=false`.
    Bool,
}

#[derive(Debug, Clone, Copy)]
pub struct FlagSpec {
    pub name: &'static str,
    pub short: Option<char>,
    pub help: &'static str,
    pub kind: FlagKind,
    pub required: bool,
}

impl FlagSpec {
    pub const fn value(name: &'static str, help: &'static str) -> Self {
        Self {
            name,
            short: None,
            help,
            kind: FlagKind::Value,
            required: false,
        }
    }

    pub const fn bool(name: &'static str, help: &'static str) -> Self {
        Self {
            name,
            short: None,
            help,
            kind: FlagKind::Bool,
            required: false,
        }
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub const fn short(mut self, short: char) -> Self {
        self.short = Some(short);
        self
    }

    pub fn to_arg(&self) -> Arg {
        let mut arg = Arg::new(self.name).long(self.name).help(self.help);
        if let Some(short) = self.short {
            arg = arg.short(short);
        }
        match self.kind {
            FlagKind::Value => arg.action(ArgAction::Append).num_args(1),
            FlagKind::Bool => arg
                .num_args(0..=1)
                .require_equals(true)
                .default_missing_value("true"),
        }
    }
}

pub struct CommandNode {
    /// Name followed by argument placeholders, e.g. `describe INSTANCE_ID`.
    pub usage: &'static str,
    pub short: &'static str,
    pub long: &'static str,
    pub examples: Vec<Example>,
    pub args: ArgSchema,
    pub flags: Vec<FlagSpec>,
    pub children: Vec<CommandNode>,
    pub run: Option<RunFn>,
}

impl CommandNode {
    pub fn group(usage: &'static str, short: &'static str, long: &'static str) -> Self {
        Self {
            usage,
            short,
            long,
            examples: Vec::new(),
            args: ArgSchema::NoArgs,
            flags: Vec::new(),
            children: Vec::new(),
            run: None,
        }
    }

    pub fn leaf(usage: &'static str, short: &'static str, long: &'static str, run: RunFn) -> Self {
        Self {
            run: Some(run),
            ..Self::group(usage, short, long)
        }
    }

    pub fn with_examples(mut self, examples: Vec<Example>) -> Self {
        self.examples = examples;
        self
    }

    pub fn with_args(mut self, args: ArgSchema) -> Self {
        self.args = args;
        self
    }

    pub fn with_flags(mut self, flags: Vec<FlagSpec>) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_children(mut self, children: Vec<CommandNode>) -> Self {
        self.children = children;
        self
    }

    pub fn name(&self) -> &'static str {
        self.usage.split_whitespace().next().unwrap_or(self.usage)
    }

    /// Placeholders following the name in `usage`.
    fn placeholders(&self) -> Vec<&'static str> {
        self.usage.split_whitespace().skip(1).collect()
    }

    pub fn child(&self, name: &str) -> Option<&CommandNode> {
        self.children.iter().find(|c| c.name() == name)
    }

    pub fn is_leaf(&self) -> bool {
        self.run.is_some()
    }

    pub fn required_flags(&self) -> impl Iterator<Item = &FlagSpec> {
        self.flags.iter().filter(|f| f.required)
    }

    pub fn to_clap(&self) -> Command {
        let mut cmd = Command::new(self.name()).about(self.short);
        if !self.long.is_empty() {
            cmd = cmd.long_about(self.long);
        }
        if !self.examples.is_empty() {
            cmd = cmd.after_help(format!("Examples:\n{}", examples::build(&self.examples)));
        }
        for flag in &self.flags {
            cmd = cmd.arg(flag.to_arg());
        }
        if self.is_leaf() {
            let placeholders = self.placeholders();
            let mut positional = Arg::new(ARGS_ID)
                .action(ArgAction::Append)
                .num_args(0..);
            if placeholders.is_empty() {
                positional = positional.hide(true);
            } else {
                positional = positional.value_name(placeholders.join(" "));
            }
            cmd = cmd.arg(positional);
        } else {
            cmd = cmd.allow_external_subcommands(true);
        }
        for child in &self.children {
            cmd = cmd.subcommand(child.to_clap());
        }
        cmd
    }
}
