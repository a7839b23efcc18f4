use lazy_static::lazy_static;
use std::collections::HashSet;

use crate::common::ShellError;

lazy_static! {
    static ref RESERVED: HashSet<&'static str> = [
        "chprompt", "showpid", "pwd", "cd", "jobs", "fg", "quit", "kill", "alias", "unalias",
        "unsetenv", "whoami", "du", "watchproc",
    ]
    .iter()
    .copied()
    .collect();
}

/// Aliases in definition order.
#[derive(Debug, Default)]
pub struct AliasTable {
    entries: Vec<(String, String)>,
}

impl AliasTable {
    pub fn new() -> Self {
        AliasTable { entries: Vec::new() }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, cmd)| cmd.as_str())
    }

    /// Accepts `name='command'`.
    pub fn define(&mut self, definition: &str) -> Result<(), ShellError> {
        let (name, command) = split_definition(definition).ok_or(ShellError::InvalidAliasFormat)?;
        if RESERVED.contains(name) || self.get(name).is_some() {
            return Err(ShellError::AliasTaken(name.to_owned()));
        }
        self.entries.push((name.to_owned(), command.to_owned()));
        Ok(())
    }

    /// Removes names in order, stopping at the first unknown one.
    pub fn remove(&mut self, names: &[String]) -> Result<(), ShellError> {
        if names.is_empty() {
            return Err(ShellError::NotEnoughArguments("unalias"));
        }
        for name in names {
            let pos = self
                .entries
                .iter()
                .position(|(n, _)| n == name)
                .ok_or_else(|| ShellError::NoSuchAlias(name.clone()))?;
            self.entries.remove(pos);
        }
        Ok(())
    }

    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|(name, cmd)| format!("{}='{}'\n", name, cmd))
            .collect()
    }

    /// Replaces the first word of `line` when it names an alias.
    pub fn expand(&self, line: &str) -> String {
        let trimmed = line.trim_start();
        let end = trimmed
            .find(char::is_whitespace)
            .unwrap_or(trimmed.len());
        match self.get(&trimmed[..end]) {
            Some(cmd) => format!("{}{}", cmd, &trimmed[end..]),
            None => line.to_owned(),
        }
    }
}

fn split_definition(definition: &str) -> Option<(&str, &str)> {
    let (name, quoted) = definition.split_once('=')?;
    let valid_name = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid_name {
        return None;
    }
    let command = quoted.strip_prefix('\'')?.strip_suffix('\'')?;
    if command.contains('\'') {
        return None;
    }
    Some((name, command))
}
