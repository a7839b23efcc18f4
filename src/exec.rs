use log::{debug, trace};
use nix::errno::Errno;
use nix::sys::wait::{self, WaitPidFlag, WaitStatus};
use nix::unistd::{self, ForkResult, Pid};
use std::ffi::CString;
use std::io::{self, Write};
use std::process;

use crate::command::CommandLine;
use crate::common::{ok, CliResult, ShellError};
use crate::jobs::JobsList;
use crate::signal::ForegroundSlot;

/// Blocks on `pid`, retrying when a handled signal interrupts the wait.
pub fn wait_for(pid: Pid, flags: Option<WaitPidFlag>) -> nix::Result<WaitStatus> {
    loop {
        match wait::waitpid(pid, flags) {
            Err(Errno::EINTR) => continue,
            res => return res,
        }
    }
}

/// Forks with stdout drained first so the child never replays buffered text.
pub fn fork() -> Result<ForkResult, ShellError> {
    let _ = io::stdout().flush();
    let _ = io::stderr().flush();
    unsafe { unistd::fork() }.map_err(ShellError::sys("fork"))
}

/// Moves the calling child out of the shell's process group.
pub fn detach_process_group() {
    if let Err(e) = unistd::setpgid(Pid::from_raw(0), Pid::from_raw(0)) {
        eprintln!("{}", ShellError::sys("setpgid")(e));
    }
}

/// The argv a child will exec, built before forking.
#[derive(Debug, PartialEq)]
pub struct Argv(Vec<CString>);

impl Argv {
    /// Direct exec of the tokenized words.
    pub fn simple(line: &CommandLine) -> Result<Argv, ShellError> {
        Argv::from_words(line.args().iter().map(String::as_str))
    }

    /// `<shell> -c <line>`, leaving globbing to the system interpreter.
    pub fn complex(shell: &str, line: &str) -> Result<Argv, ShellError> {
        Argv::from_words([shell, "-c", line].iter().copied())
    }

    fn from_words<'a, I>(words: I) -> Result<Argv, ShellError>
    where
        I: Iterator<Item = &'a str>,
    {
        words
            .map(|word| CString::new(word).map_err(|_| ShellError::sys("execvp")(Errno::EINVAL)))
            .collect::<Result<Vec<_>, _>>()
            .map(Argv)
    }

    /// Replaces the process image; only returns by exiting the child.
    pub fn exec(&self) -> ! {
        if let Some(program) = self.0.first() {
            if let Err(e) = unistd::execvp(program, &self.0) {
                eprintln!("{}", ShellError::sys("execvp")(e));
            }
        }
        process::exit(1)
    }
}

/// Runs one external program, in the foreground or as a tracked job.
pub fn run_external(
    line: &CommandLine,
    complex: bool,
    system_shell: &str,
    jobs: &mut JobsList,
    foreground: &ForegroundSlot,
) -> CliResult {
    let argv = if complex {
        Argv::complex(system_shell, line.text())?
    } else {
        Argv::simple(line)?
    };

    match fork()? {
        ForkResult::Child => {
            detach_process_group();
            argv.exec()
        }
        ForkResult::Parent { child } => {
            trace!("forked {} for {:?}", child, line.text());
            if line.is_background() {
                jobs.add(line.raw(), child);
                return ok("");
            }
            let _guard = foreground.occupy(child);
            let status = wait_for(child, None).map_err(ShellError::sys("waitpid"))?;
            debug!("foreground child {} finished: {:?}", child, status);
            ok("")
        }
    }
}
