//! OS-specific socket and process operations.
//!
//! The coordinator's state machine only talks to [`Platform`]. The Unix
//! implementation passes the listener to the successor as a plain inherited
//! descriptor: it is duplicated with `F_DUPFD_CLOEXEC` (so no other child can
//! pick it up), and `FD_CLOEXEC` is cleared in the forked child just before
//! `exec`.
//!
//! The successor is started from `argv[0]`, resolved against `PATH` when it
//! has no slash, so a binary replaced on disk before the restart is the one
//! that runs. `/proc/self/exe` is only the fallback: once the old file is
//! unlinked it points at `"<path> (deleted)"`.

use std::ffi::OsStr;
use std::io;
use std::net::TcpListener;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::PermissionsExt;
use std::os::unix::io::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info, warn};

use crate::handoff::{HandoffToken, ListenAddr};

/// The operations the restart coordinator needs from the OS.
pub trait Platform: Send + Sync + 'static {
    /// Bind a fresh listener (cold start).
    fn bind(&self, addr: &ListenAddr) -> io::Result<TcpListener>;

    /// Rebuild a listener from an inherited descriptor. Must not bind.
    fn adopt(&self, token: &HandoffToken) -> io::Result<TcpListener>;

    /// Ask the previous generation to stop.
    fn terminate_parent(&self, pid: u32) -> io::Result<()>;

    /// Start a new instance of this program that inherits a duplicate of
    /// `listener`. Returns the child's pid.
    fn spawn_successor(&self, listener: &TcpListener, addr: &ListenAddr) -> io::Result<u32>;
}

/// Signal sent by an adopting child to its parent.
pub const PARENT_TERMINATION_SIGNAL: libc::c_int = libc::SIGQUIT;

/// Lowest descriptor number handed to a successor; keeps stdio untouched.
const MIN_INHERITED_FD: RawFd = 3;

/// [`Platform`] backed by `libc` and `std::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnixPlatform;

impl Platform for UnixPlatform {
    fn bind(&self, addr: &ListenAddr) -> io::Result<TcpListener> {
        let socket_addr = addr.resolve()?;
        let listener = TcpListener::bind(socket_addr)?;
        info!(addr = %addr, local = ?listener.local_addr().ok(), "Bound listener");
        Ok(listener)
    }

    fn adopt(&self, token: &HandoffToken) -> io::Result<TcpListener> {
        if !validate_fd(token.fd) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("inherited fd {} is not a socket", token.fd),
            ));
        }

        // SAFETY: fstat confirmed the descriptor is an open socket, and the
        // handoff token hands ownership of it to this process alone.
        let listener = unsafe { TcpListener::from_raw_fd(token.fd) };

        // The next successor gets its own duplicate; keep this one private.
        set_cloexec(token.fd, true)?;

        info!(
            fd = token.fd,
            addr = %token.addr,
            local = ?listener.local_addr().ok(),
            "Adopted inherited listener"
        );
        Ok(listener)
    }

    fn terminate_parent(&self, pid: u32) -> io::Result<()> {
        let pid = libc::pid_t::try_from(pid)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, format!("bad pid {pid}")))?;

        // SAFETY: kill has no memory-safety preconditions.
        let result = unsafe { libc::kill(pid, PARENT_TERMINATION_SIGNAL) };
        if result != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn spawn_successor(&self, listener: &TcpListener, addr: &ListenAddr) -> io::Result<u32> {
        let exe = successor_executable()?;

        // SAFETY: F_DUPFD_CLOEXEC on a live descriptor; the result is checked
        // and immediately owned.
        let raw =
            unsafe { libc::fcntl(listener.as_raw_fd(), libc::F_DUPFD_CLOEXEC, MIN_INHERITED_FD) };
        if raw < 0 {
            return Err(io::Error::last_os_error());
        }
        // Closed when this function returns; the child keeps its own copy.
        let duplicate = unsafe { OwnedFd::from_raw_fd(raw) };

        let token = HandoffToken {
            fd: raw,
            parent_pid: std::process::id(),
            addr: addr.clone(),
        };

        let mut command = Command::new(&exe);
        command.args(std::env::args_os().skip(1));
        for (name, value) in token.env_vars() {
            command.env(name, value);
        }

        // SAFETY: the hook only calls fcntl, which is async-signal-safe.
        unsafe {
            command.pre_exec(move || set_cloexec(raw, false));
        }

        debug!(exe = %exe.display(), fd = raw, "Spawning successor");
        let child = command.spawn()?;
        drop(duplicate);

        info!(pid = child.id(), fd = raw, exe = %exe.display(), "Spawned successor process");
        Ok(child.id())
    }
}

/// Path of the program to start as successor.
fn successor_executable() -> io::Result<PathBuf> {
    let argv0 = std::env::args_os().next();
    let path_var = std::env::var_os("PATH");
    match resolve_executable(argv0.as_deref(), path_var.as_deref()) {
        Some(exe) => Ok(exe),
        None => {
            warn!(argv0 = ?argv0, "Can't resolve argv[0], falling back to current_exe");
            std::env::current_exe()
        }
    }
}

/// Resolve `argv0` like a shell would: as a path if it contains a slash,
/// otherwise by searching `path_var`. `None` if nothing executable is found.
fn resolve_executable(argv0: Option<&OsStr>, path_var: Option<&OsStr>) -> Option<PathBuf> {
    let argv0 = argv0.filter(|a| !a.is_empty())?;

    if argv0.as_bytes().contains(&b'/') {
        let candidate = PathBuf::from(argv0);
        return is_executable(&candidate).then_some(candidate);
    }

    std::env::split_paths(path_var?).find_map(|dir| {
        let dir = if dir.as_os_str().is_empty() {
            PathBuf::from(".")
        } else {
            dir
        };
        let candidate = dir.join(argv0);
        is_executable(&candidate).then_some(candidate)
    })
}

fn is_executable(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

/// Validate that a file descriptor is a valid socket using fstat.
pub fn validate_fd(fd: RawFd) -> bool {
    let mut stat: libc::stat = unsafe { std::mem::zeroed() };
    let result = unsafe { libc::fstat(fd, &mut stat) };
    if result != 0 {
        return false;
    }
    (stat.st_mode & libc::S_IFMT) == libc::S_IFSOCK
}

/// Set or clear `FD_CLOEXEC` on `fd`.
fn set_cloexec(fd: RawFd, on: bool) -> io::Result<()> {
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFD) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }
    let flags = if on {
        flags | libc::FD_CLOEXEC
    } else {
        flags & !libc::FD_CLOEXEC
    };
    if unsafe { libc::fcntl(fd, libc::F_SETFD, flags) } < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}
