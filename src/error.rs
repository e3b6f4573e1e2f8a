//! Errors raised by the parts of the supervisor that sit outside the
//! request/reply path (launch, shutdown). Request-level failures use
//! `chrobot_types::RequestError` instead, since that type is also the one
//! generated command functions see.

use std::io;
use std::path::PathBuf;

/// Failure to start the browser process or bring its pipe transport up.
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("no usable browser binary found; set BrowserConfig::executable or CHROBOT_BROWSER_PATH")]
    ExecutableNotFound,
    #[error("browser binary `{0}` does not exist")]
    ExecutableDoesNotExist(PathBuf),
    #[error("failed to create the pipe transport: {0}")]
    PipeSetup(#[source] io::Error),
    #[error("failed to spawn the browser process: {0}")]
    Spawn(#[source] io::Error),
    #[error("pipe-mode CDP transport is only supported on unix targets")]
    UnsupportedPlatform,
    #[error("the browser process exited before completing its handshake")]
    EarlyExit,
    #[error("timed out waiting for the browser to become ready")]
    Timeout,
}

/// Failure during the graceful-shutdown state machine.
#[derive(Debug, thiserror::Error)]
pub enum ShutdownError {
    #[error("shutdown was already requested")]
    AlreadyRequested,
    #[error("the supervisor task is no longer running")]
    AgentDown,
    #[error("timed out waiting for the browser process to exit; it was force-killed")]
    Timeout,
    #[error("failed to kill the browser process: {0}")]
    Kill(#[source] io::Error),
    #[error("browser process exited abnormally: {0}")]
    AbnormalExit(String),
}
