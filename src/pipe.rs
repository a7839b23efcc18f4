use log::{debug, warn};
use nix::sys::signal::{self, Signal};
use nix::sys::wait::WaitStatus;
use nix::unistd::{self, ForkResult, Pid};
use std::os::unix::io::{AsRawFd, OwnedFd, RawFd};
use std::process;

use crate::command::{Origin, PipeKind};
use crate::common::{ok, CliResult, ShellError};
use crate::exec::{detach_process_group, fork, wait_for};
use crate::sh::Shell;

impl Shell {
    /// `left | right` or `left |& right`, always awaited in the foreground.
    pub fn run_pipe(&mut self, left: &str, right: &str, kind: PipeKind) -> CliResult {
        let (read_end, write_end) = unistd::pipe().map_err(ShellError::sys("pipe"))?;
        let out_fd = match kind {
            PipeKind::Stdout => libc::STDOUT_FILENO,
            PipeKind::Stderr => libc::STDERR_FILENO,
        };

        let writer = match fork()? {
            ForkResult::Child => {
                let fd = write_end.as_raw_fd();
                self.run_pipe_side(left, fd, out_fd, (read_end, write_end))
            }
            ForkResult::Parent { child } => child,
        };

        let reader = match fork() {
            Ok(ForkResult::Child) => {
                let fd = read_end.as_raw_fd();
                self.run_pipe_side(right, fd, libc::STDIN_FILENO, (read_end, write_end))
            }
            Ok(ForkResult::Parent { child }) => child,
            Err(e) => {
                drop(read_end);
                drop(write_end);
                let _ = abandon(writer);
                return Err(e);
            }
        };
        debug!("pipeline {} -> {}", writer, reader);

        // the shell neither reads nor writes; the reader needs EOF once the writer exits
        drop(read_end);
        drop(write_end);

        // ctrl-C reaches the writer, which forwards it to its own foreground child
        let (first, second) = {
            let _guard = self.foreground.occupy(writer);
            (wait_for(writer, None), wait_for(reader, None))
        };
        first.and(second).map_err(ShellError::sys("waitpid"))?;
        ok("")
    }

    fn run_pipe_side(
        &mut self,
        line: &str,
        end: RawFd,
        target: RawFd,
        pipe: (OwnedFd, OwnedFd),
    ) -> ! {
        detach_process_group();
        if let Err(e) = unistd::dup2(end, target) {
            eprintln!("{}", ShellError::sys("dup2")(e));
            process::exit(1);
        }
        // both ends close here; only the duplicated descriptor stays open
        drop(pipe);
        self.execute_line(line, Origin::Branch);
        process::exit(0)
    }
}

/// Interrupts and reaps a writer whose reader never started.
fn abandon(writer: Pid) -> nix::Result<WaitStatus> {
    warn!("second pipeline fork failed, interrupting {}", writer);
    if let Err(e) = signal::kill(writer, Signal::SIGINT) {
        eprintln!("{}", ShellError::sys("kill")(e));
    }
    let status = wait_for(writer, None);
    if let Err(e) = status {
        eprintln!("{}", ShellError::sys("waitpid")(e));
    }
    status
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sh::tests::TEST_LOCK;
    use pretty_assertions::assert_eq;
    use std::path::Path;

    #[test]
    fn abandoned_writer_is_interrupted_and_reaped() {
        let _lock = TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let child = process::Command::new("sleep").arg("30").spawn().unwrap();
        let pid = Pid::from_raw(child.id() as i32);

        assert_eq!(abandon(pid), Ok(WaitStatus::Signaled(pid, Signal::SIGINT, false)));
        assert!(!Path::new(&format!("/proc/{}", pid)).exists());
    }
}
