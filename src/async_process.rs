//! Spawns the browser with `--remote-debugging-pipe` wired to fd 3 (child
//! reads our commands) / fd 4 (child writes replies and events), per §4.1.
//!
//! Pipe-mode CDP transport is a unix-only affair: Chrome only honors the
//! fd-3/fd-4 contract on unix process models, so [`spawn`] is gated behind
//! `cfg(unix)` with a [`LaunchError::UnsupportedPlatform`] fallback
//! everywhere else.

use std::process::Stdio;

use tokio::process::Child;

use crate::config::BrowserConfig;
use crate::conn::Connection;
use crate::error::LaunchError;
use crate::utils::canonicalize_except_snap;

#[cfg(unix)]
pub fn spawn(config: &BrowserConfig) -> Result<(Child, Connection), LaunchError> {
    use std::os::fd::{AsRawFd, FromRawFd, IntoRawFd, RawFd};
    use std::os::unix::process::CommandExt;

    let executable = resolve_executable(config)?;

    // browser_read is dup'd onto the child's fd 3: the child reads our
    // commands from it. our_write is our end: we write commands into it.
    let (browser_read, our_write) = os_pipe::pipe().map_err(LaunchError::PipeSetup)?;
    // browser_write is dup'd onto the child's fd 4: the child writes
    // replies/events into it. our_read is our end.
    let (our_read, browser_write) = os_pipe::pipe().map_err(LaunchError::PipeSetup)?;

    let child_fd3: RawFd = browser_read.as_raw_fd();
    let child_fd4: RawFd = browser_write.as_raw_fd();

    let mut command = tokio::process::Command::new(&executable);
    command
        .arg("--remote-debugging-pipe")
        .args(launch_args(config))
        .args(&config.args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(false);

    // SAFETY: the closure only calls dup2 and libc functions that are
    // async-signal-safe, as required between fork and exec.
    unsafe {
        command.pre_exec(move || {
            if libc::dup2(child_fd3, 3) < 0 {
                return Err(std::io::Error::last_os_error());
            }
            if libc::dup2(child_fd4, 4) < 0 {
                return Err(std::io::Error::last_os_error());
            }
            Ok(())
        });
    }

    let child = command.spawn().map_err(LaunchError::Spawn)?;

    // The child has its own dup'd copies on fd 3/4 now; our copies of its
    // ends are no longer needed.
    drop(browser_read);
    drop(browser_write);

    let our_write_fd = our_write.into_raw_fd();
    let our_read_fd = our_read.into_raw_fd();
    set_nonblocking(our_write_fd).map_err(LaunchError::PipeSetup)?;
    set_nonblocking(our_read_fd).map_err(LaunchError::PipeSetup)?;

    // SAFETY: each fd is uniquely owned here and was just put into
    // non-blocking mode, matching what `tokio::net::unix::pipe` requires.
    let writer_file = unsafe { std::fs::File::from_raw_fd(our_write_fd) };
    let reader_file = unsafe { std::fs::File::from_raw_fd(our_read_fd) };

    let sender = tokio::net::unix::pipe::Sender::from_file(writer_file).map_err(LaunchError::PipeSetup)?;
    let receiver = tokio::net::unix::pipe::Receiver::from_file(reader_file).map_err(LaunchError::PipeSetup)?;

    Ok((child, Connection::new(receiver, sender)))
}

#[cfg(not(unix))]
pub fn spawn(_config: &BrowserConfig) -> Result<(Child, Connection), LaunchError> {
    Err(LaunchError::UnsupportedPlatform)
}

#[cfg(unix)]
fn set_nonblocking(fd: std::os::fd::RawFd) -> std::io::Result<()> {
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(std::io::Error::last_os_error());
    }
    let result = unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) };
    if result < 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

fn resolve_executable(config: &BrowserConfig) -> Result<std::path::PathBuf, LaunchError> {
    let raw = config.executable().ok_or(LaunchError::ExecutableNotFound)?;
    let resolved = canonicalize_except_snap(raw);
    if !resolved.exists() {
        return Err(LaunchError::ExecutableDoesNotExist(resolved));
    }
    Ok(resolved)
}

fn launch_args(config: &BrowserConfig) -> Vec<&'static str> {
    let mut args = Vec::new();
    if config.headless() {
        args.push("--headless=new");
    }
    if !config.sandbox() {
        args.push("--no-sandbox");
    }
    args
}
