//! The future returned by `Browser::call`: races the supervisor's reply
//! against a per-call timeout so a wedged browser can never hang a caller
//! forever.

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::channel::oneshot;
use futures::Future;
use futures_timer::Delay;
use pin_project_lite::pin_project;

use chrobot_types::RequestError;

pin_project! {
    /// Resolves with the decoded reply, [`RequestError::AgentTimeout`] if the
    /// timeout elapses first, or [`RequestError::AgentDown`] if the
    /// supervisor task dropped the reply channel without answering.
    pub struct CommandFuture<T> {
        #[pin]
        reply: oneshot::Receiver<Result<T, RequestError>>,
        #[pin]
        timeout: Delay,
    }
}

impl<T> CommandFuture<T> {
    pub fn new(reply: oneshot::Receiver<Result<T, RequestError>>, timeout: Duration) -> Self {
        CommandFuture {
            reply,
            timeout: Delay::new(timeout),
        }
    }
}

impl<T> Future for CommandFuture<T> {
    type Output = Result<T, RequestError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();

        if let Poll::Ready(result) = this.reply.poll(cx) {
            return Poll::Ready(result.unwrap_or(Err(RequestError::AgentDown)));
        }

        match this.timeout.poll(cx) {
            Poll::Ready(()) => Poll::Ready(Err(RequestError::AgentTimeout)),
            Poll::Pending => Poll::Pending,
        }
    }
}
