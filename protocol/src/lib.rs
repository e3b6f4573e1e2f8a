//! Typed Rust bindings for the Chrome DevTools Protocol, generated at build
//! time from the bundled `browser_protocol.json` / `js_protocol.json` by
//! `chrobot_codegen` (see `build.rs`).
//!
//! Every domain lives in its own module (`dom`, `page`, `network`, ...).
//! Command functions take a `&dyn chrobot_types::Transport` and the
//! command's parameters as plain arguments; the supervisor's `Browser`
//! handle implements `Transport`, so generated commands are called as
//! `chrobot_protocol::page::navigate(&browser, url, None).await?`.
//!
//! Set `CHROBOT_ALLOW_EXPERIMENTAL=1` / `CHROBOT_ALLOW_DEPRECATED=1` when
//! building to widen the generated surface past the stable default.

#![allow(missing_docs, clippy::all)]

include!(concat!(env!("OUT_DIR"), "/modules.rs"));
include!(concat!(env!("OUT_DIR"), "/version.rs"));

/// The `{major, minor}` CDP protocol version declared by the bundled schema.
pub fn version() -> (usize, usize) {
    PROTOCOL_VERSION
}
