use log::{debug, warn};
use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::sys::wait::{self, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use std::io::{self, Write};

use crate::common::ShellError;

pub type JobId = u32;

#[derive(Debug, Clone, PartialEq)]
pub struct JobEntry {
    id: JobId,
    pid: Pid,
    cmdline: String,
    stopped: bool,
}

impl JobEntry {
    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn cmdline(&self) -> &str {
        &self.cmdline
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn set_stopped(&mut self, stopped: bool) {
        self.stopped = stopped;
    }
}

/// Background jobs in the order they were launched.
#[derive(Debug, Default)]
pub struct JobsList {
    jobs: Vec<JobEntry>,
}

impl JobsList {
    pub fn new() -> Self {
        JobsList { jobs: Vec::new() }
    }

    /// Registers `pid` under the next free id, one above the largest live id.
    pub fn add(&mut self, cmdline: &str, pid: Pid) -> JobId {
        self.remove_finished();
        // a pid only comes back from the kernel once its previous owner was reaped
        if let Some(pos) = self.jobs.iter().position(|job| job.pid == pid) {
            let stale = self.jobs.remove(pos);
            warn!("dropping stale job [{}] for reused pid {}", stale.id, pid);
        }
        let id = self.jobs.iter().map(|job| job.id).max().unwrap_or(0) + 1;
        self.jobs.push(JobEntry {
            id,
            pid,
            cmdline: cmdline.to_owned(),
            stopped: false,
        });
        debug!("added job [{}] {} {}", id, pid, cmdline);
        id
    }

    /// Reaps every job whose process has already terminated.
    pub fn remove_finished(&mut self) {
        self.jobs.retain(|job| match wait::waitpid(job.pid, Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::Exited(..)) | Ok(WaitStatus::Signaled(..)) => {
                debug!("reaped job [{}] ({})", job.id, job.pid);
                false
            }
            Err(Errno::ECHILD) => {
                debug!("job [{}] ({}) is no longer our child", job.id, job.pid);
                false
            }
            Ok(_) => true,
            Err(e) => {
                warn!("waitpid({}) failed: {}", job.pid, e.desc());
                true
            }
        });
    }

    pub fn get(&self, id: JobId) -> Option<&JobEntry> {
        self.jobs.iter().find(|job| job.id == id)
    }

    pub fn get_mut(&mut self, id: JobId) -> Option<&mut JobEntry> {
        self.jobs.iter_mut().find(|job| job.id == id)
    }

    pub fn remove(&mut self, id: JobId) -> Option<JobEntry> {
        let pos = self.jobs.iter().position(|job| job.id == id)?;
        Some(self.jobs.remove(pos))
    }

    /// Live jobs in launch order.
    pub fn list(&mut self) -> &[JobEntry] {
        self.remove_finished();
        &self.jobs
    }

    pub fn largest_id(&mut self) -> Option<JobId> {
        self.remove_finished();
        self.jobs.iter().map(|job| job.id).max()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn clear(&mut self) {
        self.jobs.clear();
    }

    /// Announces and SIGKILLs every live job, then empties the table.
    pub fn kill_all<W: Write>(&mut self, out: &mut W) -> io::Result<usize> {
        self.remove_finished();
        writeln!(out, "smash: sending SIGKILL signal to {} jobs:", self.jobs.len())?;
        for job in self.jobs.iter() {
            writeln!(out, "{}: {}", job.pid, job.cmdline)?;
        }
        out.flush()?;
        for job in self.jobs.iter() {
            if let Err(e) = sigkill(job.pid) {
                eprintln!("{}", e);
            }
        }
        let killed = self.jobs.len();
        self.clear();
        Ok(killed)
    }

    /// `[id] cmdline` per line, as printed by `jobs`.
    pub fn render(&mut self) -> String {
        self.list()
            .iter()
            .map(|job| format!("[{}] {}\n", job.id, job.cmdline))
            .collect()
    }
}

fn sigkill(pid: Pid) -> Result<(), ShellError> {
    signal::kill(pid, Signal::SIGKILL).map_err(ShellError::sys("kill"))
}
