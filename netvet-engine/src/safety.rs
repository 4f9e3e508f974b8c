//! Deny list of mutating or administrative commands.
//!
//! The built-in patterns are always active. Configuration may only add
//! patterns on top of them.

use netvet_common::Command;
use regex::Regex;

/// Patterns blocked regardless of configuration.
pub const DEFAULT_BLOCKED_PATTERNS: [&str; 3] = [r"^reload.*", r"^conf.*", r"^wr.*"];

/// A command matched a blocked pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockedCommand {
    pub command: String,
    pub pattern: String,
}

/// Compiled deny list.
#[derive(Debug, Clone)]
pub struct BlockList {
    patterns: Vec<Regex>,
}

impl BlockList {
    /// Built-in patterns plus `extra`.
    pub fn new<S: AsRef<str>>(extra: &[S]) -> Result<Self, regex::Error> {
        let patterns = DEFAULT_BLOCKED_PATTERNS
            .iter()
            .copied()
            .chain(extra.iter().map(AsRef::as_ref))
            .map(Regex::new)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Only the built-in patterns.
    pub fn builtin() -> Result<Self, regex::Error> {
        Self::new::<&str>(&[])
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(Regex::as_str)
    }

    /// The first pattern matching `command`, if any.
    pub fn matching_pattern(&self, command: &str) -> Option<&str> {
        self.patterns
            .iter()
            .find(|re| re.is_match(command))
            .map(Regex::as_str)
    }

    /// The first blocked command in declaration order.
    pub fn check(&self, commands: &[Command]) -> Option<BlockedCommand> {
        commands.iter().find_map(|cmd| {
            self.matching_pattern(cmd.command())
                .map(|pattern| BlockedCommand {
                    command: cmd.command().to_string(),
                    pattern: pattern.to_string(),
                })
        })
    }
}
