//! The public handle: `Browser` is cheap to clone, every clone talks to the
//! same [`crate::supervisor::EventLoop`] task over an unbounded channel.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use futures::channel::oneshot;
use futures::StreamExt;
use serde_json::Value;

use chrobot_types::{BoxFuture, MethodId, RequestError, Transport};

use crate::cmd::Command;
use crate::commandfuture::CommandFuture;
use crate::config::BrowserConfig;
use crate::error::{LaunchError, ShutdownError};
use crate::log_level::{LogGate, LogLevel};
use crate::supervisor::EventLoop;

/// How long a single `call` waits for its reply before giving up with
/// [`RequestError::AgentTimeout`]. Not configurable per call: a command
/// that legitimately takes longer (a slow navigation, say) should be
/// raced against its own timeout by the caller instead.
const CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// A handle to a running, supervised browser process.
///
/// Implements [`Transport`], so it can be passed directly to any generated
/// command function in `chrobot_protocol`.
#[derive(Debug, Clone)]
pub struct Browser {
    commands: UnboundedSender<Command>,
    log_gate: Arc<LogGate>,
}

impl Browser {
    /// Launch a new browser process per `config`. The returned future drives
    /// the supervisor's event loop and must be spawned (or otherwise
    /// polled) for the handle to make progress; it resolves once the
    /// browser process has exited.
    pub async fn launch(config: BrowserConfig) -> Result<(Browser, impl Future<Output = ()>), LaunchError> {
        let launch_timeout = config.launch_timeout();

        let spawn_result = tokio::time::timeout(launch_timeout, tokio::task::spawn_blocking({
            let config = config.clone();
            move || crate::async_process::spawn(&config)
        }))
        .await
        .map_err(|_| LaunchError::Timeout)?;

        let (child, conn) = spawn_result.map_err(|_| {
            LaunchError::Spawn(std::io::Error::new(std::io::ErrorKind::Other, "spawn task panicked"))
        })??;

        let (tx, rx) = mpsc::unbounded();
        let log_gate = Arc::new(LogGate::new(config.log_level()));
        let shutdown_deadline = launch_timeout * 2;
        let event_loop = EventLoop::new(child, conn, rx, Arc::clone(&log_gate), shutdown_deadline);

        let browser = Browser {
            commands: tx,
            log_gate,
        };

        Ok((browser, event_loop.run()))
    }

    /// Issue `method` with an optional target session and await its reply,
    /// bounded by `timeout`.
    pub async fn call(
        &self,
        method: impl Into<MethodId>,
        params: Option<Value>,
        session: Option<String>,
        timeout: Duration,
    ) -> Result<Value, RequestError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .unbounded_send(Command::Call { method: method.into(), params, session, timeout, reply })
            .map_err(|_| RequestError::AgentDown)?;
        CommandFuture::new(rx, timeout).await
    }

    /// Issue `method` without waiting for (or caring about) its reply.
    pub fn send(&self, method: impl Into<MethodId>, params: Option<Value>) {
        let (reply, _rx) = oneshot::channel();
        let _ = self.commands.unbounded_send(Command::Call {
            method: method.into(),
            params,
            session: None,
            timeout: CALL_TIMEOUT,
            reply,
        });
    }

    /// Subscribe to every future occurrence of `method`. The returned
    /// stream yields the raw event payload; decode it with
    /// `serde_json::from_value` into a generated event type if you want one.
    pub async fn add_listener(&self, method: impl Into<String>) -> Result<UnboundedReceiver<Value>, RequestError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .unbounded_send(Command::AddListener { method: method.into(), reply })
            .map_err(|_| RequestError::AgentDown)?;
        rx.await.map_err(|_| RequestError::AgentDown)
    }

    /// Drop every listener registered for `method`.
    pub fn remove_listener(&self, method: impl Into<String>) {
        let _ = self.commands.unbounded_send(Command::RemoveListener { method: method.into() });
    }

    /// Wait for exactly one occurrence of `method`, then stop listening.
    pub async fn listen_once(&self, method: impl Into<String>) -> Result<Value, RequestError> {
        let mut rx = self.add_listener(method).await?;
        rx.next().await.ok_or(RequestError::AgentDown)
    }

    /// `Browser.getVersion`. Hand-written rather than generated: this crate
    /// can't depend on its own generated bindings without the dependency
    /// cycle §2.1 rules out.
    pub async fn get_version(&self) -> Result<Version, RequestError> {
        let value = self.call("Browser.getVersion", None, None, CALL_TIMEOUT).await?;
        serde_json::from_value(value).map_err(|_| RequestError::NotFound)
    }

    /// Request a graceful shutdown: Running -> ShutdownRequested ->
    /// Stopped. Resolves once the browser process has actually exited;
    /// `Ok(())` only if it exited cleanly before the shutdown deadline.
    pub async fn quit(&self) -> Result<(), ShutdownError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .unbounded_send(Command::Shutdown { reply })
            .map_err(|_| ShutdownError::AgentDown)?;
        match rx.await {
            Ok(result) => result,
            Err(_) => Err(ShutdownError::AgentDown),
        }
    }

    /// Gate this handle's own `tracing` emission at `level`. Does not
    /// install or alter any subscriber; callers who want to see anything
    /// still have to set one up themselves. Takes effect on the next event
    /// the running loop processes.
    pub fn set_log_level(&self, level: LogLevel) {
        self.log_gate.set(level);
    }
}

impl Transport for Browser {
    fn call(
        &self,
        method: MethodId,
        params: Option<Value>,
        session: Option<String>,
        timeout: Duration,
    ) -> BoxFuture<'_, Result<Value, RequestError>> {
        Box::pin(Browser::call(self, method, params, session, timeout))
    }
}

/// `Browser.getVersion`'s response. See [`Browser::get_version`] for why
/// this isn't generated.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    pub protocol_version: String,
    pub product: String,
    pub revision: String,
    pub user_agent: String,
    pub js_version: String,
}
