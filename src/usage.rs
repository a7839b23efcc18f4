use log::{debug, trace};
use nix::errno::Errno;
use nix::unistd::{self, User};
use std::fs;
use std::io;
use std::os::unix::fs::MetadataExt;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};
use walkdir::WalkDir;

use crate::common::{ok, CliResult, ShellError};

fn io_errno(e: io::Error) -> Errno {
    Errno::from_raw(e.raw_os_error().unwrap_or(libc::EIO))
}

/// `<user> <home>` for the real uid.
pub fn whoami() -> CliResult {
    let user = User::from_uid(unistd::getuid())
        .map_err(ShellError::sys("getpwuid"))?
        .ok_or(ShellError::Sys {
            call: "getpwuid",
            errno: Errno::ENOENT,
        })?;
    ok(format!("{} {}\n", user.name, user.dir.display()))
}

/// Allocated size of everything under `path` (default: cwd), in KB.
pub fn disk_usage(path: Option<&str>) -> CliResult {
    let root = path.unwrap_or(".");
    if !Path::new(root).is_dir() {
        return Err(ShellError::NoSuchDirectory(root.to_owned()));
    }
    let bytes: u64 = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.metadata().ok())
        .map(|meta| meta.blocks() * 512)
        .sum();
    debug!("du {}: {} bytes allocated", root, bytes);
    ok(format!("Total disk usage: {} KB\n", (bytes + 1023) / 1024))
}

/// Samples CPU time of `pid` over `interval` and reports it with resident memory.
pub fn watch_proc(pid: i32, interval: Duration) -> CliResult {
    let start = Instant::now();
    let before = cpu_ticks(pid)?;
    thread::sleep(interval);
    let after = cpu_ticks(pid)?;
    let elapsed = start.elapsed().as_secs_f64();

    let hz = match unsafe { libc::sysconf(libc::_SC_CLK_TCK) } {
        hz if hz > 0 => hz as f64,
        _ => 100.0,
    };
    let cpu = if elapsed > 0.0 {
        100.0 * after.saturating_sub(before) as f64 / hz / elapsed
    } else {
        0.0
    };
    let memory = resident_kb(&read_proc(pid, "status")?) as f64 / 1024.0;
    trace!("watchproc {}: {} -> {} ticks over {:.3}s", pid, before, after, elapsed);

    ok(format!(
        "PID: {} | CPU Usage: {:.1}% | Memory Usage: {:.1} MB\n",
        pid, cpu, memory
    ))
}

fn read_proc(pid: i32, file: &str) -> Result<String, ShellError> {
    fs::read_to_string(format!("/proc/{}/{}", pid, file)).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => ShellError::NoSuchProcess(pid),
        _ => ShellError::sys("open")(io_errno(e)),
    })
}

fn cpu_ticks(pid: i32) -> Result<u64, ShellError> {
    let stat = read_proc(pid, "stat")?;
    process_ticks(&stat).ok_or(ShellError::Sys {
        call: "read",
        errno: Errno::EINVAL,
    })
}

/// utime + stime out of a `/proc/<pid>/stat` line.
fn process_ticks(stat: &str) -> Option<u64> {
    // comm may hold spaces and parens; the fields after it do not
    let fields: Vec<&str> = stat[stat.rfind(')')? + 1..].split_whitespace().collect();
    let utime: u64 = fields.get(11)?.parse().ok()?;
    let stime: u64 = fields.get(12)?.parse().ok()?;
    Some(utime + stime)
}

/// `VmRSS` in KB; zombies and kernel threads have none.
fn resident_kb(status: &str) -> u64 {
    status
        .lines()
        .find_map(|line| line.strip_prefix("VmRSS:"))
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|kb| kb.parse().ok())
        .unwrap_or(0)
}
