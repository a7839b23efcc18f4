use log::{debug, trace};
use nix::fcntl::{self, OFlag};
use nix::sys::stat::Mode;
use nix::unistd;
use std::io::{self, Write};
use std::os::unix::io::RawFd;

use crate::command::Origin;
use crate::common::{ok, CliResult, ShellError};
use crate::sh::Shell;

const STDOUT: RawFd = libc::STDOUT_FILENO;

impl Shell {
    /// Runs `command` with the shell's own stdout pointed at `target`.
    pub fn run_redirect(&mut self, command: &str, target: &str, append: bool) -> CliResult {
        let backup = unistd::dup(STDOUT).map_err(ShellError::sys("dup"))?;
        trace!("saved stdout as fd {}", backup);

        if let Err(e) = point_stdout_at(target, append) {
            restore_stdout(backup);
            return Err(e);
        }

        let _ = io::stdout().flush();
        self.execute_line(command, Origin::Branch);
        let _ = io::stdout().flush();

        restore_stdout(backup);
        ok("")
    }
}

fn point_stdout_at(target: &str, append: bool) -> Result<(), ShellError> {
    let mode = if append { OFlag::O_APPEND } else { OFlag::O_TRUNC };
    let flags = OFlag::O_WRONLY | OFlag::O_CREAT | mode;
    let perms = Mode::from_bits_truncate(0o666);

    let fd = fcntl::open(target, flags, perms).map_err(ShellError::sys("open"))?;
    debug!("redirecting stdout to {} (fd {})", target, fd);
    let _ = io::stdout().flush();
    let res = unistd::dup2(fd, STDOUT).map_err(ShellError::sys("dup2"));
    if let Err(e) = unistd::close(fd) {
        report(ShellError::sys("close")(e));
    }
    res.map(|_| ())
}

/// Puts the saved descriptor back on stdout; every failure is reported and
/// the remaining steps still run.
fn restore_stdout(backup: RawFd) {
    if let Err(e) = unistd::dup2(backup, STDOUT) {
        report(ShellError::sys("dup2")(e));
    }
    if let Err(e) = unistd::close(backup) {
        report(ShellError::sys("close")(e));
    }
    trace!("restored stdout from fd {}", backup);
}

fn report(e: ShellError) {
    let _ = writeln!(io::stderr(), "{}", e);
}
