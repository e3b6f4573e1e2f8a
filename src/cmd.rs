//! Messages the `Browser` handle sends to the supervisor task. The task
//! owns the pipe connection, the pending-request map and the listener
//! table; every handle clone only ever talks to it through this channel.

use futures::channel::mpsc::UnboundedReceiver;
use futures::channel::oneshot;
use serde_json::Value;

use chrobot_types::{MethodId, RequestError};

use crate::error::ShutdownError;

#[derive(Debug)]
pub enum Command {
    Call {
        method: MethodId,
        params: Option<Value>,
        session: Option<String>,
        timeout: std::time::Duration,
        reply: oneshot::Sender<Result<Value, RequestError>>,
    },
    AddListener {
        method: String,
        reply: oneshot::Sender<UnboundedReceiver<Value>>,
    },
    RemoveListener {
        method: String,
    },
    Shutdown {
        reply: oneshot::Sender<Result<(), ShutdownError>>,
    },
}
