use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
use nix::unistd::Pid;
use std::sync::atomic::{AtomicI32, Ordering};

/// Pid of the child the shell is currently blocked on, 0 when idle.
///
/// Written by the main thread around each blocking wait and read (then
/// cleared) by the SIGINT handler, so it has to stay lock-free.
#[derive(Debug)]
pub struct ForegroundSlot(AtomicI32);

impl ForegroundSlot {
    pub const fn new() -> Self {
        ForegroundSlot(AtomicI32::new(0))
    }

    pub fn set(&self, pid: Pid) {
        self.0.store(pid.as_raw(), Ordering::SeqCst);
    }

    pub fn clear(&self) {
        self.0.store(0, Ordering::SeqCst);
    }

    pub fn get(&self) -> Option<Pid> {
        match self.0.load(Ordering::SeqCst) {
            0 => None,
            pid => Some(Pid::from_raw(pid)),
        }
    }

    pub fn take(&self) -> Option<Pid> {
        match self.0.swap(0, Ordering::SeqCst) {
            0 => None,
            pid => Some(Pid::from_raw(pid)),
        }
    }

    /// Occupies the slot until the returned guard is dropped.
    pub fn occupy(&self, pid: Pid) -> ForegroundGuard<'_> {
        self.set(pid);
        ForegroundGuard { slot: self }
    }
}

impl Default for ForegroundSlot {
    fn default() -> Self {
        ForegroundSlot::new()
    }
}

pub struct ForegroundGuard<'a> {
    slot: &'a ForegroundSlot,
}

impl Drop for ForegroundGuard<'_> {
    fn drop(&mut self) {
        self.slot.clear();
    }
}

pub static FOREGROUND: ForegroundSlot = ForegroundSlot::new();

pub fn install_handlers() -> nix::Result<()> {
    let action = SigAction::new(
        SigHandler::Handler(handle_sigint),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    unsafe { signal::sigaction(Signal::SIGINT, &action) }?;
    Ok(())
}

// Runs in signal context: no allocation, no locks, raw write(2) only.
pub extern "C" fn handle_sigint(_signal: libc::c_int) {
    write_raw(b"smash: got ctrl-C\n");
    if let Some(pid) = FOREGROUND.take() {
        match signal::kill(pid, Signal::SIGINT) {
            Ok(()) => {
                let mut buf = [0u8; 12];
                write_raw(b"smash: process ");
                write_raw(format_pid(pid.as_raw(), &mut buf));
                write_raw(b" was killed\n");
            }
            Err(_) => write_raw(b"smash error: kill failed\n"),
        }
    }
}

fn write_raw(bytes: &[u8]) {
    unsafe {
        libc::write(
            libc::STDOUT_FILENO,
            bytes.as_ptr() as *const libc::c_void,
            bytes.len(),
        );
    }
}

fn format_pid(mut pid: i32, buf: &mut [u8; 12]) -> &[u8] {
    let mut start = buf.len();
    if pid <= 0 {
        pid = 0;
    }
    loop {
        start -= 1;
        buf[start] = b'0' + (pid % 10) as u8;
        pid /= 10;
        if pid == 0 {
            break;
        }
    }
    &buf[start..]
}
