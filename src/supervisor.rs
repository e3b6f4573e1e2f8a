//! The event loop: a single task owning the pipe connection, the
//! pending-request map and the listener table (§4.1). Every `Browser`
//! handle clone only ever reaches this state through the `Command`
//! channel — there is no shared, lockable state anywhere in this crate.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::channel::{mpsc, oneshot};
use futures::StreamExt;
use serde_json::Value;
use tokio::process::Child;
use tokio::time::Instant;

use chrobot_types::RequestError;

use crate::cmd::Command;
use crate::conn::Connection;
use crate::error::ShutdownError;
use crate::listeners::EventListeners;
use crate::log_level::{LogGate, LogLevel};

/// Running -> ShutdownRequested -> Stopped, per §4.1. Once
/// `ShutdownRequested`, no new call will ever be answered: a wedged
/// browser cannot keep the loop running forever once the caller has asked
/// it to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Running,
    ShutdownRequested,
    Stopped,
}

pub struct EventLoop {
    child: Child,
    conn: Connection,
    commands: mpsc::UnboundedReceiver<Command>,
    pending: HashMap<u64, oneshot::Sender<Result<Value, RequestError>>>,
    listeners: EventListeners,
    state: State,
    next_id: u64,
    shutdown_reply: Option<oneshot::Sender<Result<(), ShutdownError>>>,
    shutdown_deadline: Duration,
    shutdown_at: Option<Instant>,
    force_killed: bool,
    log_gate: Arc<LogGate>,
}

impl EventLoop {
    pub(crate) fn new(
        child: Child,
        conn: Connection,
        commands: mpsc::UnboundedReceiver<Command>,
        log_gate: Arc<LogGate>,
        shutdown_deadline: Duration,
    ) -> Self {
        EventLoop {
            child,
            conn,
            commands,
            pending: HashMap::new(),
            listeners: EventListeners::new(),
            state: State::Running,
            next_id: 0,
            shutdown_reply: None,
            shutdown_deadline,
            shutdown_at: None,
            force_killed: false,
            log_gate,
        }
    }

    fn level(&self) -> LogLevel {
        self.log_gate.get()
    }

    /// Drive the loop until the browser process has exited.
    pub async fn run(mut self) {
        while self.state != State::Stopped {
            let deadline = self.shutdown_at;
            tokio::select! {
                cmd = self.commands.next() => {
                    match cmd {
                        Some(cmd) => self.handle_command(cmd).await,
                        None => self.begin_forceful_shutdown(),
                    }
                }
                incoming = self.conn.recv() => {
                    match incoming {
                        Ok(Some(value)) => {
                            if self.level() >= LogLevel::Debug {
                                tracing::trace!(frame = %value, "received frame");
                            }
                            self.dispatch_incoming(value);
                        }
                        Ok(None) => self.finish_shutdown().await,
                        Err(e) => {
                            if self.level() >= LogLevel::Warnings {
                                tracing::warn!(error = %e, "pipe read failed; treating it as browser exit");
                            }
                            self.finish_shutdown().await;
                        }
                    }
                }
                _ = shutdown_deadline_elapsed(deadline) => {
                    self.force_kill_on_deadline().await;
                }
            }
        }
    }

    async fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Call { method, params, session, timeout: _, reply } => {
                if self.state != State::Running {
                    let _ = reply.send(Err(RequestError::AgentDown));
                    return;
                }

                let id = self.next_id;
                self.next_id += 1;

                let mut envelope = serde_json::Map::new();
                envelope.insert("id".to_string(), Value::from(id));
                envelope.insert("method".to_string(), Value::from(method.into_owned()));
                if let Some(params) = params {
                    envelope.insert("params".to_string(), params);
                }
                if let Some(session) = session {
                    envelope.insert("sessionId".to_string(), Value::from(session));
                }

                if self.level() >= LogLevel::Debug {
                    tracing::trace!(id, frame = %envelope.get("method").cloned().unwrap_or_default(), "sending frame");
                }
                if let Err(e) = self.conn.send(&Value::Object(envelope)).await {
                    let _ = reply.send(Err(RequestError::PortError(e.to_string())));
                    return;
                }
                self.pending.insert(id, reply);
            }
            Command::AddListener { method, reply } => {
                if self.level() >= LogLevel::Debug {
                    tracing::debug!(method = %method, "listener registered");
                }
                let rx = self.listeners.add(method);
                let _ = reply.send(rx);
            }
            Command::RemoveListener { method } => {
                if self.level() >= LogLevel::Debug {
                    tracing::debug!(method = %method, "listener removed");
                }
                self.listeners.remove(&method);
            }
            Command::Shutdown { reply } => {
                self.begin_graceful_shutdown(reply).await;
            }
        }
    }

    /// `quit`: ask the browser to close itself, arm the force-kill deadline,
    /// and let the normal pipe-EOF path drive `finish_shutdown`. A second
    /// concurrent `quit` while one is already in flight is rejected instead
    /// of silently replacing the first caller's reply slot.
    async fn begin_graceful_shutdown(&mut self, reply: oneshot::Sender<Result<(), ShutdownError>>) {
        if self.state != State::Running {
            let _ = reply.send(Err(ShutdownError::AlreadyRequested));
            return;
        }

        if self.level() >= LogLevel::Info {
            tracing::info!("shutdown requested; sending Browser.close");
        }
        self.state = State::ShutdownRequested;
        self.shutdown_reply = Some(reply);
        self.shutdown_at = Some(Instant::now() + self.shutdown_deadline);

        let id = self.next_id;
        self.next_id += 1;
        let envelope = serde_json::json!({"id": id, "method": "Browser.close"});
        if let Err(e) = self.conn.send(&envelope).await {
            if self.level() >= LogLevel::Warnings {
                tracing::warn!(error = %e, "failed to send Browser.close; force-killing");
            }
            let _ = self.child.start_kill();
            self.force_killed = true;
            self.shutdown_at = None;
        }

        for (_, tx) in self.pending.drain() {
            let _ = tx.send(Err(RequestError::AgentDown));
        }
    }

    /// All `Browser` handles were dropped with nobody waiting on a reply:
    /// kill immediately, there is no caller left to negotiate a graceful
    /// close with.
    fn begin_forceful_shutdown(&mut self) {
        if self.state == State::Running {
            if self.level() >= LogLevel::Info {
                tracing::info!("all handles dropped; killing browser process");
            }
            self.state = State::ShutdownRequested;
            let _ = self.child.start_kill();
        }
        for (_, tx) in self.pending.drain() {
            let _ = tx.send(Err(RequestError::AgentDown));
        }
    }

    async fn force_kill_on_deadline(&mut self) {
        if self.level() >= LogLevel::Warnings {
            tracing::warn!("shutdown deadline elapsed; force-killing browser process");
        }
        self.shutdown_at = None;
        if let Err(e) = self.child.start_kill() {
            if let Some(reply) = self.shutdown_reply.take() {
                let _ = reply.send(Err(ShutdownError::Kill(e)));
            }
            return;
        }
        self.force_killed = true;
    }

    async fn finish_shutdown(&mut self) {
        let was_requested = self.state == State::ShutdownRequested;
        if self.state == State::Running {
            if self.level() >= LogLevel::Warnings {
                tracing::warn!("browser process exited unexpectedly while running");
            }
            let _ = self.child.start_kill();
        }
        for (_, tx) in self.pending.drain() {
            let _ = tx.send(Err(RequestError::AgentDown));
        }

        let status = self.child.wait().await;
        self.state = State::Stopped;
        self.shutdown_at = None;

        if self.level() >= LogLevel::Info {
            tracing::info!("browser process exited; event loop stopping");
        }

        let Some(reply) = self.shutdown_reply.take() else {
            return;
        };
        let result = if self.force_killed {
            Err(ShutdownError::Timeout)
        } else if !was_requested {
            Err(ShutdownError::AbnormalExit(
                status.map(|s| s.to_string()).unwrap_or_else(|e| e.to_string()),
            ))
        } else {
            match status {
                Ok(s) if s.success() => Ok(()),
                Ok(s) => Err(ShutdownError::AbnormalExit(s.to_string())),
                Err(e) => Err(ShutdownError::Kill(e)),
            }
        };
        let _ = reply.send(result);
    }

    /// Classify an incoming frame: an `id` field means it's a reply to a
    /// pending call; otherwise it's an event fanned out by `method` name.
    fn dispatch_incoming(&mut self, value: Value) {
        let Some(obj) = value.as_object() else {
            if self.level() >= LogLevel::Warnings {
                tracing::warn!("incoming frame was not a JSON object; dropping");
            }
            return;
        };

        if let Some(id) = obj.get("id").and_then(Value::as_u64) {
            let Some(tx) = self.pending.remove(&id) else {
                if self.level() >= LogLevel::Warnings {
                    tracing::warn!(id, "reply with no matching pending request; dropping");
                }
                return;
            };
            if let Some(error) = obj.get("error") {
                let code = error.get("code").and_then(Value::as_i64).unwrap_or(0);
                let message = error
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("No message")
                    .to_string();
                let data = error
                    .get("data")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| "No data".to_string());
                let _ = tx.send(Err(RequestError::Browser(chrobot_types::BrowserError { code, message, data })));
            } else {
                let result = obj.get("result").cloned().unwrap_or(Value::Null);
                let _ = tx.send(Ok(result));
            }
            return;
        }

        if let Some(method) = obj.get("method").and_then(Value::as_str) {
            let params = obj.get("params").cloned().unwrap_or(Value::Null);
            self.listeners.dispatch(method, params);
        }
    }
}

/// Resolves once `at` elapses; never resolves if `at` is `None`, so this
/// branch only ever fires while a shutdown deadline is actually armed.
async fn shutdown_deadline_elapsed(at: Option<Instant>) {
    match at {
        Some(instant) => tokio::time::sleep_until(instant).await,
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conn::Connection;

    /// A throwaway `EventLoop` good for exercising `dispatch_incoming` and
    /// the pending-request map in isolation, without a real browser on the
    /// other end of the pipe. `/bin/true` stands in for the child process;
    /// its own exit status is never inspected by these tests.
    fn test_event_loop() -> EventLoop {
        let child = tokio::process::Command::new("true")
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()
            .expect("/bin/true must be spawnable in the test environment");

        use std::os::fd::{FromRawFd, IntoRawFd};

        let (_their_write, our_read) = os_pipe::pipe().unwrap();
        let (our_write, _their_read) = os_pipe::pipe().unwrap();
        let read_fd = our_read.into_raw_fd();
        let write_fd = our_write.into_raw_fd();
        set_test_nonblocking(read_fd);
        set_test_nonblocking(write_fd);
        let reader = tokio::net::unix::pipe::Receiver::from_file(unsafe { std::fs::File::from_raw_fd(read_fd) }).unwrap();
        let sender = tokio::net::unix::pipe::Sender::from_file(unsafe { std::fs::File::from_raw_fd(write_fd) }).unwrap();
        let conn = Connection::new(reader, sender);

        let (_tx, rx) = mpsc::unbounded();
        EventLoop::new(child, conn, rx, Arc::new(LogGate::new(LogLevel::Silent)), Duration::from_secs(5))
    }

    fn set_test_nonblocking(fd: std::os::fd::RawFd) {
        unsafe {
            let flags = libc::fcntl(fd, libc::F_GETFL);
            libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK);
        }
    }

    #[tokio::test]
    async fn dispatch_routes_reply_to_its_pending_sender() {
        let mut event_loop = test_event_loop();
        let (tx, rx) = oneshot::channel();
        event_loop.pending.insert(7, tx);

        event_loop.dispatch_incoming(serde_json::json!({"id": 7, "result": {"ok": true}}));

        assert_eq!(rx.await.unwrap(), Ok(serde_json::json!({"ok": true})));
        assert!(event_loop.pending.is_empty());
    }

    #[tokio::test]
    async fn dispatch_routes_browser_error_to_its_pending_sender() {
        let mut event_loop = test_event_loop();
        let (tx, rx) = oneshot::channel();
        event_loop.pending.insert(1, tx);

        event_loop.dispatch_incoming(
            serde_json::json!({"id": 1, "error": {"code": -32000, "message": "boom", "data": "x"}}),
        );

        match rx.await.unwrap() {
            Err(RequestError::Browser(e)) => assert_eq!(e.code, -32000),
            other => panic!("expected Browser error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn dispatch_defaults_missing_browser_error_fields() {
        let mut event_loop = test_event_loop();
        let (tx, rx) = oneshot::channel();
        event_loop.pending.insert(1, tx);

        event_loop.dispatch_incoming(
            serde_json::json!({"id": 1, "error": {"code": -32601, "message": "'DOM.unknownMethod' wasn't found"}}),
        );

        match rx.await.unwrap() {
            Err(RequestError::Browser(e)) => {
                assert_eq!(e.code, -32601);
                assert_eq!(e.message, "'DOM.unknownMethod' wasn't found");
                assert_eq!(e.data, "No data");
            }
            other => panic!("expected Browser error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn dispatch_defaults_an_entirely_empty_error_object() {
        let mut event_loop = test_event_loop();
        let (tx, rx) = oneshot::channel();
        event_loop.pending.insert(1, tx);

        event_loop.dispatch_incoming(serde_json::json!({"id": 1, "error": {}}));

        match rx.await.unwrap() {
            Err(RequestError::Browser(e)) => {
                assert_eq!(e.code, 0);
                assert_eq!(e.message, "No message");
                assert_eq!(e.data, "No data");
            }
            other => panic!("expected Browser error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn graceful_shutdown_transitions_state_and_arms_deadline() {
        let mut event_loop = test_event_loop();
        let (reply, rx) = oneshot::channel();

        // The harness's write pipe has no live reader, so the `Browser.close`
        // send fails immediately; this exercises the fall back to an
        // immediate force-kill rather than the happy-path deadline arm, but
        // either way the state transition out of `Running` must happen.
        event_loop.begin_graceful_shutdown(reply).await;

        assert_eq!(event_loop.state, State::ShutdownRequested);
        drop(rx);
    }

    #[tokio::test]
    async fn second_concurrent_quit_is_rejected() {
        let mut event_loop = test_event_loop();
        let (first_reply, _first_rx) = oneshot::channel();
        event_loop.begin_graceful_shutdown(first_reply).await;

        let (second_reply, second_rx) = oneshot::channel();
        event_loop.begin_graceful_shutdown(second_reply).await;

        assert!(matches!(second_rx.await.unwrap(), Err(ShutdownError::AlreadyRequested)));
    }

    #[tokio::test]
    async fn reply_to_unknown_id_is_dropped_without_panicking() {
        let mut event_loop = test_event_loop();
        event_loop.dispatch_incoming(serde_json::json!({"id": 99, "result": {}}));
        assert!(event_loop.pending.is_empty());
    }

    #[tokio::test]
    async fn frame_with_method_and_no_id_fans_out_as_an_event() {
        let mut event_loop = test_event_loop();
        let mut rx = event_loop.listeners.add("Page.loadEventFired");

        event_loop.dispatch_incoming(serde_json::json!({"method": "Page.loadEventFired", "params": {"t": 1}}));

        assert_eq!(rx.next().await, Some(serde_json::json!({"t": 1})));
    }

    #[tokio::test]
    async fn replies_can_arrive_out_of_request_order() {
        let mut event_loop = test_event_loop();
        let (tx_a, rx_a) = oneshot::channel();
        let (tx_b, rx_b) = oneshot::channel();
        event_loop.pending.insert(1, tx_a);
        event_loop.pending.insert(2, tx_b);

        event_loop.dispatch_incoming(serde_json::json!({"id": 2, "result": "second"}));
        event_loop.dispatch_incoming(serde_json::json!({"id": 1, "result": "first"}));

        assert_eq!(rx_b.await.unwrap(), Ok(serde_json::json!("second")));
        assert_eq!(rx_a.await.unwrap(), Ok(serde_json::json!("first")));
    }
}
