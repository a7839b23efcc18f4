use std::env;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_PROMPT: &str = "smash";
pub const COMMAND_MAX_ARGS: usize = 20;
pub const WATCH_INTERVAL: Duration = Duration::from_secs(1);

/// Knobs the shell reads once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Prompt text restored by a bare `chprompt`.
    pub prompt: String,
    /// Interpreter handed `-c <line>` for wildcard and branch commands.
    pub system_shell: String,
    pub max_args: usize,
    /// How long `watchproc` samples CPU time before reporting.
    pub watch_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        let system_shell = if Path::new("/bin/bash").exists() {
            "/bin/bash"
        } else {
            "/bin/sh"
        };
        Config {
            prompt: DEFAULT_PROMPT.to_owned(),
            system_shell: system_shell.to_owned(),
            max_args: COMMAND_MAX_ARGS,
            watch_interval: WATCH_INTERVAL,
        }
    }
}

impl Config {
    /// Defaults overridden by `SMASH_PROMPT`, `SMASH_SHELL` and `SMASH_WATCH_MS`.
    pub fn from_env() -> Self {
        Config::default().with_overrides(|key| env::var(key).ok())
    }

    fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(prompt) = lookup("SMASH_PROMPT").filter(|p| !p.trim().is_empty()) {
            self.prompt = prompt.trim().to_owned();
        }
        if let Some(shell) = lookup("SMASH_SHELL").filter(|s| !s.trim().is_empty()) {
            self.system_shell = shell.trim().to_owned();
        }
        if let Some(ms) = lookup("SMASH_WATCH_MS").and_then(|ms| ms.trim().parse().ok()) {
            self.watch_interval = Duration::from_millis(ms);
        }
        self
    }
}
