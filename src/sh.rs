use log::{debug, warn};
use nix::sys::signal::{self, Signal};
use nix::sys::wait::{WaitPidFlag, WaitStatus};
use nix::unistd;
use std::env;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

use crate::alias::AliasTable;
use crate::command::{Command, Origin};
use crate::common::{ok, CliResult, ShellError};
use crate::config::Config;
use crate::exec::{self, wait_for};
use crate::jobs::{JobId, JobsList};
use crate::signal::{ForegroundSlot, FOREGROUND};
use crate::usage;

/// Everything one shell instance owns: its jobs, aliases and prompt.
#[derive(Debug)]
pub struct Shell {
    config: Config,
    prompt: String,
    last_dir: Option<PathBuf>,
    jobs: JobsList,
    aliases: AliasTable,
    pub(crate) foreground: &'static ForegroundSlot,
}

impl Shell {
    /// A shell whose foreground child is visible to the SIGINT router.
    pub fn new(config: Config) -> Shell {
        Shell::with_foreground(config, &FOREGROUND)
    }

    pub fn with_foreground(config: Config, foreground: &'static ForegroundSlot) -> Shell {
        Shell {
            prompt: config.prompt.clone(),
            config,
            last_dir: None,
            jobs: JobsList::new(),
            aliases: AliasTable::new(),
            foreground,
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[cfg(test)]
    pub fn jobs(&mut self) -> &mut JobsList {
        &mut self.jobs
    }

    /// Top-level entry: runs `line` and prints its outcome. Pipelines and
    /// redirections re-enter here with their sub-lines.
    pub fn execute_line(&mut self, line: &str, origin: Origin) {
        let res = match self.run(line, origin) {
            Ok(out) => {
                let mut stdout = io::stdout();
                stdout.write_all(out.as_bytes()).and_then(|_| stdout.flush())
            }
            Err(e) => writeln!(io::stderr(), "{}", e),
        };
        if let Err(e) = res {
            warn!("could not write command output: {}", e);
        }
    }

    pub fn run(&mut self, line: &str, origin: Origin) -> CliResult {
        let line = self.aliases.expand(line);
        let cmd = Command::parse(&line, origin, &self.config)?;
        debug!("dispatching {:?}", cmd);
        self.execute(cmd)
    }

    fn execute(&mut self, cmd: Command) -> CliResult {
        match cmd {
            Command::Empty => ok(""),
            Command::ChPrompt { prompt } => {
                self.prompt = prompt.unwrap_or_else(|| self.config.prompt.clone());
                ok("")
            }
            Command::ShowPid => ok(format!("smash pid is {}\n", unistd::getpid())),
            Command::Pwd => {
                let cwd = unistd::getcwd().map_err(ShellError::sys("getcwd"))?;
                ok(format!("{}\n", cwd.display()))
            }
            Command::Cd { target } => self.cd(target),
            Command::Jobs => ok(self.jobs.render()),
            Command::Fg { target } => self.fg(target),
            Command::Kill { signal, job } => self.kill(signal, job),
            Command::Quit { kill } => self.quit(kill),
            Command::Alias { definition: None } => ok(self.aliases.render()),
            Command::Alias {
                definition: Some(definition),
            } => self.aliases.define(&definition).map(|_| String::new()),
            Command::Unalias { names } => self.aliases.remove(&names).map(|_| String::new()),
            Command::UnsetEnv { names } => unset_env(&names),
            Command::WhoAmI => usage::whoami(),
            Command::DiskUsage { path } => usage::disk_usage(path.as_deref()),
            Command::WatchProc { pid } => usage::watch_proc(pid, self.config.watch_interval),
            Command::Pipe { left, right, kind } => self.run_pipe(&left, &right, kind),
            Command::Redirect {
                command,
                target,
                append,
            } => self.run_redirect(&command, &target, append),
            Command::External { line, complex } => exec::run_external(
                &line,
                complex,
                &self.config.system_shell,
                &mut self.jobs,
                self.foreground,
            ),
        }
    }

    fn cd(&mut self, target: Option<String>) -> CliResult {
        let target = match target {
            Some(target) => target,
            None => return ok(""),
        };
        let current = unistd::getcwd().map_err(ShellError::sys("getcwd"))?;
        let dest = if target == "-" {
            self.last_dir.clone().ok_or(ShellError::OldPwdNotSet)?
        } else {
            PathBuf::from(target)
        };
        unistd::chdir(&dest).map_err(ShellError::sys("chdir"))?;
        self.last_dir = Some(current);
        ok("")
    }

    fn fg(&mut self, target: Option<JobId>) -> CliResult {
        let id = match target {
            Some(id) => id,
            None => self
                .jobs
                .largest_id()
                .ok_or(ShellError::JobsListEmpty("fg"))?,
        };
        self.jobs.remove_finished();
        let job = self
            .jobs
            .get(id)
            .ok_or(ShellError::NoSuchJob { cmd: "fg", id })?;
        let pid = job.pid();
        if job.is_stopped() {
            debug!("job [{}] is stopped; waiting without resuming it", id);
        }
        {
            let mut stdout = io::stdout();
            let _ = writeln!(stdout, "{} {}", job.cmdline(), pid).and_then(|_| stdout.flush());
        }

        let status = {
            let _guard = self.foreground.occupy(pid);
            wait_for(pid, Some(WaitPidFlag::WUNTRACED))
        };
        match status {
            Ok(WaitStatus::Stopped(..)) => {
                debug!("job [{}] stopped in foreground", id);
                if let Some(job) = self.jobs.get_mut(id) {
                    job.set_stopped(true);
                }
            }
            Ok(WaitStatus::Exited(..)) | Ok(WaitStatus::Signaled(..)) => {
                self.jobs.remove(id);
            }
            Ok(other) => debug!("job [{}] reported {:?}", id, other),
            Err(e) => {
                self.jobs.remove_finished();
                return Err(ShellError::sys("waitpid")(e));
            }
        }
        ok("")
    }

    fn kill(&mut self, signal: Signal, id: JobId) -> CliResult {
        self.jobs.remove_finished();
        let pid = self
            .jobs
            .get(id)
            .ok_or(ShellError::NoSuchJob { cmd: "kill", id })?
            .pid();
        signal::kill(pid, signal).map_err(ShellError::sys("kill"))?;
        ok(format!("signal number {} was sent to pid {}\n", signal as i32, pid))
    }

    fn quit(&mut self, kill: bool) -> ! {
        if kill {
            let mut out = io::stdout();
            if let Err(e) = self.jobs.kill_all(&mut out) {
                warn!("could not report jobs on quit: {}", e);
            }
        }
        process::exit(0)
    }
}

fn unset_env(names: &[String]) -> CliResult {
    if names.is_empty() {
        return Err(ShellError::NotEnoughArguments("unsetenv"));
    }
    for name in names {
        if env::var_os(name).is_none() {
            return Err(ShellError::NoSuchVariable(name.clone()));
        }
        env::remove_var(name);
    }
    ok("")
}
