use nix::sys::signal::Signal;

use crate::common::ShellError;
use crate::config::Config;
use crate::jobs::JobId;

const WHITESPACE: &[char] = &[' ', '\n', '\r', '\t', '\x0c', '\x0b'];

pub fn trim(s: &str) -> &str {
    s.trim_matches(WHITESPACE)
}

pub fn is_background(line: &str) -> bool {
    line.trim_end_matches(WHITESPACE).ends_with('&')
}

/// Drops a trailing `&` and the whitespace around it.
pub fn strip_background(line: &str) -> &str {
    let line = line.trim_end_matches(WHITESPACE);
    match line.strip_suffix('&') {
        Some(rest) => rest.trim_end_matches(WHITESPACE),
        None => line,
    }
}

/// One command line as typed, split into whitespace-delimited words.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandLine {
    raw: String,
    text: String,
    args: Vec<String>,
    background: bool,
}

impl CommandLine {
    pub fn parse(line: &str, max_args: usize) -> Self {
        let background = is_background(line);
        let raw = strip_background(line).to_owned();
        let text = trim(&raw).to_owned();
        let args = text
            .split(WHITESPACE)
            .filter(|word| !word.is_empty())
            .take(max_args)
            .map(str::to_owned)
            .collect();
        CommandLine {
            raw,
            text,
            args,
            background,
        }
    }

    /// The line as typed, minus any background marker.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Trimmed line used for execution.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn name(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }

    pub fn is_background(&self) -> bool {
        self.background
    }

    /// Wildcards are left to the system shell.
    pub fn has_wildcards(&self) -> bool {
        self.text.contains(|c: char| c == '*' || c == '?')
    }
}

/// Where a line entered the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Prompt,
    /// A pipeline side or the command half of a redirection.
    Branch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipeKind {
    Stdout,
    Stderr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Empty,
    ChPrompt { prompt: Option<String> },
    ShowPid,
    Pwd,
    Cd { target: Option<String> },
    Jobs,
    Fg { target: Option<JobId> },
    Kill { signal: Signal, job: JobId },
    Quit { kill: bool },
    Alias { definition: Option<String> },
    Unalias { names: Vec<String> },
    UnsetEnv { names: Vec<String> },
    WhoAmI,
    DiskUsage { path: Option<String> },
    WatchProc { pid: i32 },
    Pipe { left: String, right: String, kind: PipeKind },
    Redirect { command: String, target: String, append: bool },
    External { line: CommandLine, complex: bool },
}

impl Command {
    pub fn parse(line: &str, origin: Origin, config: &Config) -> Result<Command, ShellError> {
        let cmdline = CommandLine::parse(line, config.max_args);
        let name = match cmdline.name() {
            Some(name) => name.to_owned(),
            None => return Ok(Command::Empty),
        };
        let rest = cmdline.args()[1..].to_vec();

        // alias bodies may legitimately hold '|' or '>'
        match name.as_str() {
            "alias" => return Ok(Command::Alias { definition: alias_definition(cmdline.text()) }),
            "unalias" => return Ok(Command::Unalias { names: rest }),
            _ => {}
        }
        if cmdline.text().contains('|') {
            return parse_pipe(cmdline.text());
        }
        if cmdline.text().contains('>') {
            return parse_redirect(cmdline.text());
        }

        let cmd = match name.as_str() {
            "chprompt" => Command::ChPrompt { prompt: rest.first().cloned() },
            "showpid" => Command::ShowPid,
            "pwd" => Command::Pwd,
            "cd" => match rest.as_slice() {
                [] => Command::Cd { target: None },
                [target] => Command::Cd { target: Some(target.clone()) },
                _ => return Err(ShellError::TooManyArguments("cd")),
            },
            "jobs" => Command::Jobs,
            "fg" => match rest.as_slice() {
                [] => Command::Fg { target: None },
                [id] => Command::Fg {
                    target: Some(parse_job_id(id).ok_or(ShellError::InvalidArguments("fg"))?),
                },
                _ => return Err(ShellError::InvalidArguments("fg")),
            },
            "kill" => parse_kill(&rest)?,
            "quit" => Command::Quit {
                kill: rest.first().map(String::as_str) == Some("kill"),
            },
            "unsetenv" => Command::UnsetEnv { names: rest },
            "whoami" => Command::WhoAmI,
            "du" => match rest.as_slice() {
                [] => Command::DiskUsage { path: None },
                [path] => Command::DiskUsage { path: Some(path.clone()) },
                _ => return Err(ShellError::TooManyArguments("du")),
            },
            "watchproc" => match rest.as_slice() {
                [pid] => Command::WatchProc {
                    pid: pid
                        .parse::<i32>()
                        .ok()
                        .filter(|pid| *pid > 0)
                        .ok_or(ShellError::InvalidArguments("watchproc"))?,
                },
                _ => return Err(ShellError::InvalidArguments("watchproc")),
            },
            _ => {
                let complex = origin == Origin::Branch || cmdline.has_wildcards();
                Command::External { line: cmdline, complex }
            }
        };
        Ok(cmd)
    }
}

fn parse_job_id(word: &str) -> Option<JobId> {
    word.parse::<JobId>().ok().filter(|id| *id > 0)
}

fn parse_kill(rest: &[String]) -> Result<Command, ShellError> {
    let (signum, id) = match rest {
        [signum, id] => (signum, id),
        _ => return Err(ShellError::InvalidArguments("kill")),
    };
    let signum = signum
        .strip_prefix('-')
        .and_then(|n| n.parse::<i32>().ok())
        .ok_or(ShellError::InvalidArguments("kill"))?;
    let job = parse_job_id(id).ok_or(ShellError::InvalidArguments("kill"))?;
    let signal = Signal::try_from(signum).map_err(|_| ShellError::InvalidSignal)?;
    Ok(Command::Kill { signal, job })
}

fn parse_pipe(text: &str) -> Result<Command, ShellError> {
    let (at, len, kind) = match text.find("|&") {
        Some(at) => (at, 2, PipeKind::Stderr),
        None => match text.find('|') {
            Some(at) => (at, 1, PipeKind::Stdout),
            None => return Err(ShellError::InvalidFormat("pipe")),
        },
    };
    let left = trim(&text[..at]);
    let right = trim(&text[at + len..]);
    if left.is_empty() || right.is_empty() {
        return Err(ShellError::InvalidFormat("pipe"));
    }
    Ok(Command::Pipe {
        left: left.to_owned(),
        right: right.to_owned(),
        kind,
    })
}

fn parse_redirect(text: &str) -> Result<Command, ShellError> {
    let (at, len, append) = match text.find(">>") {
        Some(at) => (at, 2, true),
        None => match text.find('>') {
            Some(at) => (at, 1, false),
            None => return Err(ShellError::InvalidFormat("redirection")),
        },
    };
    let command = trim(&text[..at]);
    let target = trim(&text[at + len..]);
    if command.is_empty() || target.is_empty() {
        return Err(ShellError::InvalidFormat("redirection"));
    }
    Ok(Command::Redirect {
        command: command.to_owned(),
        target: target.to_owned(),
        append,
    })
}

fn alias_definition(text: &str) -> Option<String> {
    let body = trim(&text["alias".len()..]);
    if body.is_empty() {
        None
    } else {
        Some(body.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(line: &str) -> Result<Command, ShellError> {
        Command::parse(line, Origin::Prompt, &Config::default())
    }

    #[test]
    fn background_marker_is_detected_and_stripped() {
        let line = CommandLine::parse("  sleep 10 &  ", 20);
        assert!(line.is_background());
        assert_eq!(line.raw(), "  sleep 10");
        assert_eq!(line.text(), "sleep 10");
        assert_eq!(line.args(), ["sleep", "10"]);

        let glued = CommandLine::parse("sleep 10&", 20);
        assert!(glued.is_background());
        assert_eq!(glued.args(), ["sleep", "10"]);

        assert!(!CommandLine::parse("echo a & b", 20).is_background());
    }

    #[test]
    fn tokens_are_capped() {
        let line = CommandLine::parse("echo 1 2 3 4 5", 3);
        assert_eq!(line.args(), ["echo", "1", "2"]);
        assert_eq!(line.text(), "echo 1 2 3 4 5");
    }

    #[test]
    fn blank_lines_parse_to_empty() {
        assert_eq!(parse("   \t").unwrap(), Command::Empty);
        assert_eq!(parse("&").unwrap(), Command::Empty);
    }

    #[test]
    fn fg_argument_shapes() {
        assert_eq!(parse("fg").unwrap(), Command::Fg { target: None });
        assert_eq!(parse("fg 3").unwrap(), Command::Fg { target: Some(3) });
        assert_eq!(parse("fg x"), Err(ShellError::InvalidArguments("fg")));
        assert_eq!(parse("fg 0"), Err(ShellError::InvalidArguments("fg")));
        assert_eq!(parse("fg 1 2"), Err(ShellError::InvalidArguments("fg")));
    }

    #[test]
    fn kill_argument_shapes() {
        assert_eq!(
            parse("kill -9 2").unwrap(),
            Command::Kill { signal: Signal::SIGKILL, job: 2 }
        );
        assert_eq!(parse("kill 9 2"), Err(ShellError::InvalidArguments("kill")));
        assert_eq!(parse("kill -x 2"), Err(ShellError::InvalidArguments("kill")));
        assert_eq!(parse("kill -9 y"), Err(ShellError::InvalidArguments("kill")));
        assert_eq!(parse("kill -9"), Err(ShellError::InvalidArguments("kill")));
        assert_eq!(parse("kill -99 1"), Err(ShellError::InvalidSignal));
        assert_eq!(parse("kill -0 1"), Err(ShellError::InvalidSignal));
    }

    #[test]
    fn quit_only_kills_on_literal_kill() {
        assert_eq!(parse("quit").unwrap(), Command::Quit { kill: false });
        assert_eq!(parse("quit kill").unwrap(), Command::Quit { kill: true });
        assert_eq!(parse("quit now").unwrap(), Command::Quit { kill: false });
    }

    #[test]
    fn pipes_prefer_stderr_operator() {
        assert_eq!(
            parse("ls -l |& grep x").unwrap(),
            Command::Pipe {
                left: "ls -l".to_owned(),
                right: "grep x".to_owned(),
                kind: PipeKind::Stderr
            }
        );
        assert_eq!(
            parse("cat f | wc -l &").unwrap(),
            Command::Pipe {
                left: "cat f".to_owned(),
                right: "wc -l".to_owned(),
                kind: PipeKind::Stdout
            }
        );
        assert_eq!(parse("| wc"), Err(ShellError::InvalidFormat("pipe")));
        assert_eq!(parse("ls |"), Err(ShellError::InvalidFormat("pipe")));
    }

    #[test]
    fn redirection_prefers_append_operator() {
        assert_eq!(
            parse("echo hi >> out.txt").unwrap(),
            Command::Redirect {
                command: "echo hi".to_owned(),
                target: "out.txt".to_owned(),
                append: true
            }
        );
        assert_eq!(
            parse("echo hi>out.txt").unwrap(),
            Command::Redirect {
                command: "echo hi".to_owned(),
                target: "out.txt".to_owned(),
                append: false
            }
        );
        assert_eq!(parse("echo hi >"), Err(ShellError::InvalidFormat("redirection")));
        assert_eq!(parse("> out.txt"), Err(ShellError::InvalidFormat("redirection")));
    }

    #[test]
    fn pipes_bind_looser_than_redirection() {
        assert_eq!(
            parse("echo a > f | cat").unwrap(),
            Command::Pipe {
                left: "echo a > f".to_owned(),
                right: "cat".to_owned(),
                kind: PipeKind::Stdout
            }
        );
    }

    #[test]
    fn alias_bodies_are_not_split() {
        assert_eq!(
            parse("alias lc='ls | wc -l'").unwrap(),
            Command::Alias { definition: Some("lc='ls | wc -l'".to_owned()) }
        );
        assert_eq!(parse("alias").unwrap(), Command::Alias { definition: None });
    }

    #[test]
    fn externals_go_complex_on_wildcards_or_branches() {
        match parse("ls *.rs").unwrap() {
            Command::External { complex, .. } => assert!(complex),
            other => panic!("unexpected {:?}", other),
        }
        match parse("sleep 1 &").unwrap() {
            Command::External { line, complex } => {
                assert!(!complex);
                assert!(line.is_background());
                assert_eq!(line.args(), ["sleep", "1"]);
            }
            other => panic!("unexpected {:?}", other),
        }
        match Command::parse("echo hi", Origin::Branch, &Config::default()).unwrap() {
            Command::External { complex, .. } => assert!(complex),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn usage_builtin_shapes() {
        assert_eq!(parse("whoami").unwrap(), Command::WhoAmI);
        assert_eq!(parse("du").unwrap(), Command::DiskUsage { path: None });
        assert_eq!(
            parse("du /tmp").unwrap(),
            Command::DiskUsage { path: Some("/tmp".to_owned()) }
        );
        assert_eq!(parse("du a b"), Err(ShellError::TooManyArguments("du")));
        assert_eq!(parse("watchproc 42").unwrap(), Command::WatchProc { pid: 42 });
        assert_eq!(parse("watchproc"), Err(ShellError::InvalidArguments("watchproc")));
        assert_eq!(parse("watchproc abc"), Err(ShellError::InvalidArguments("watchproc")));
        assert_eq!(parse("watchproc -3"), Err(ShellError::InvalidArguments("watchproc")));
        assert_eq!(parse("watchproc 1 2"), Err(ShellError::InvalidArguments("watchproc")));
    }

    #[test]
    fn cd_rejects_extra_arguments() {
        assert_eq!(parse("cd a b"), Err(ShellError::TooManyArguments("cd")));
        assert_eq!(parse("cd").unwrap(), Command::Cd { target: None });
    }
}
