//! Wire contract shared between the `chrobot` supervisor and its generated
//! CDP bindings (`chrobot_protocol`).
//!
//! Neither of those two crates depends on the other. Generated command
//! functions are written against [`Transport`] and return [`ProtocolError`];
//! the supervisor implements [`Transport`] for its own handle type and
//! produces [`RequestError`] from its own internals. This crate is the only
//! thing both sides share, mirroring the role `chromiumoxide_types` plays
//! between `chromiumoxide` and `chromiumoxide_cdp`.

#![warn(missing_debug_implementations, rust_2018_idioms)]

use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde_json::{Map, Value};

/// The wire identifier of a CDP method, e.g. `"Browser.getVersion"`.
pub type MethodId = Cow<'static, str>;

/// A boxed, `Send` future, used for the [`Transport::call`] return type.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The timeout generated command functions race their call against when
/// the caller has no occasion to pick one of their own.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Types that carry a CDP method identifier.
///
/// Mirrors `chromiumoxide_types::Method`: every generated command and event
/// type implements this so the supervisor and the generator can agree on how
/// a qualified method name like `DOM.removeNode` splits into its domain and
/// method parts.
pub trait Method {
    /// The whole string identifier for this method, e.g. `"DOM.removeNode"`.
    fn identifier(&self) -> MethodId;

    /// The domain this method belongs to, e.g. `"DOM"`.
    fn domain_name(&self) -> MethodId {
        self.split().0
    }

    /// The method name inside its domain, e.g. `"removeNode"`.
    fn method_name(&self) -> MethodId {
        self.split().1
    }

    /// `(domain_name, method_name)`.
    fn split(&self) -> (MethodId, MethodId) {
        match self.identifier() {
            Cow::Borrowed(id) => {
                let mut iter = id.splitn(2, '.');
                (
                    iter.next().unwrap_or_default().into(),
                    iter.next().unwrap_or_default().into(),
                )
            }
            Cow::Owned(id) => {
                let mut iter = id.splitn(2, '.');
                (
                    Cow::Owned(iter.next().unwrap_or_default().to_string()),
                    Cow::Owned(iter.next().unwrap_or_default().to_string()),
                )
            }
        }
    }
}

/// The callback a generated command function speaks to.
///
/// The supervisor implements this trait for its public handle. A command
/// function never talks to the supervisor directly; it only ever sees this
/// trait object, which is the entire surface §6 of the specification grants
/// it.
pub trait Transport: fmt::Debug + Send + Sync {
    /// Issue `method` with an optional parameter tree against an optional
    /// target session, and await the decoded JSON result or a
    /// [`RequestError`]. `timeout` bounds how long this call waits for its
    /// reply before failing with [`RequestError::AgentTimeout`].
    fn call(
        &self,
        method: MethodId,
        params: Option<Value>,
        session: Option<String>,
        timeout: Duration,
    ) -> BoxFuture<'_, Result<Value, RequestError>>;
}

/// A browser-reported JSON-RPC style error, `{code, message, data}`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BrowserError {
    pub code: i64,
    pub message: String,
    pub data: String,
}

impl fmt::Display for BrowserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "browser error {}: {} ({})", self.code, self.message, self.data)
    }
}

impl std::error::Error for BrowserError {}

/// A JS runtime exception surfaced by `Runtime.evaluate`/`Runtime.callFunctionOn`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct JsException {
    pub text: String,
    pub line: i64,
    pub column: i64,
}

impl fmt::Display for JsException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (line {}, column {})", self.text, self.line, self.column)
    }
}

impl std::error::Error for JsException {}

/// The homogeneous error a `call` (and, by extension, any generated command
/// function) can fail with. Every caller-facing request error in the system
/// collapses into one of these variants; see §7 of the specification.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// The write side of the transport failed (the pipe was closed, the
    /// message could not be serialized, ...).
    #[error("transport failed to deliver the request: {0}")]
    PortError(String),
    /// The caller-side timeout elapsed before a reply arrived.
    #[error("request timed out waiting for a reply")]
    AgentTimeout,
    /// The supervisor is no longer running; no further requests will ever
    /// be answered.
    #[error("the supervisor is no longer running")]
    AgentDown,
    /// The browser replied with a JSON-RPC style error.
    #[error(transparent)]
    Browser(#[from] BrowserError),
    /// A higher-level lookup found nothing matching.
    #[error("requested value not found")]
    NotFound,
    /// A script threw during evaluation.
    #[error(transparent)]
    Javascript(#[from] JsException),
}

/// The error a generated command function returns: either the transport
/// failed outright, or it succeeded but the reply didn't decode into the
/// expected response type.
///
/// Decoder failures are deliberately folded into one sentinel variant so
/// that every generated function has the same, uniform error type — callers
/// never need to match on a type specific to the command they called.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error(transparent)]
    Transport(#[from] RequestError),
    #[error("failed to decode response: {0}")]
    Decode(String),
}

/// Insert `value` into `map` under `key` only if it is `Some`.
///
/// Generated encoders use this for optional object properties so that an
/// absent optional field is omitted from the wire payload rather than sent
/// as `null`.
pub fn insert_if_some(map: &mut Map<String, Value>, key: &str, value: Option<Value>) {
    if let Some(value) = value {
        map.insert(key.to_string(), value);
    }
}

/// Encode a CDP `any`-typed field.
///
/// `any` values are not round-tripped through the typed bindings: this is a
/// conscious loss of fidelity documented in §9 of the specification, not an
/// omission. Callers who need the raw payload bypass the generated command
/// and speak to the transport directly.
pub fn encode_any(_value: &Value) -> Value {
    tracing::warn!("encoding an `any`-typed field as null; dynamic values do not round-trip through typed bindings");
    Value::Null
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Dummy(MethodId);
    impl Method for Dummy {
        fn identifier(&self) -> MethodId {
            self.0.clone()
        }
    }

    #[test]
    fn splits_domain_and_method() {
        let d = Dummy("DOM.removeNode".into());
        assert_eq!(d.domain_name(), "DOM");
        assert_eq!(d.method_name(), "removeNode");
        assert_eq!(d.split(), ("DOM".into(), "removeNode".into()));
    }

    #[test]
    fn insert_if_some_omits_none() {
        let mut map = Map::new();
        insert_if_some(&mut map, "a", Some(Value::from(1)));
        insert_if_some(&mut map, "b", None);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("a"), Some(&Value::from(1)));
    }

    #[test]
    fn browser_error_display() {
        let err = BrowserError {
            code: -32601,
            message: "'DOM.unknownMethod' wasn't found".into(),
            data: "No data".into(),
        };
        assert!(err.to_string().contains("-32601"));
    }
}
