//! A typed client for the Chrome DevTools Protocol: a supervisor that
//! launches and owns a headless browser process over its pipe-mode CDP
//! transport, plus the generated bindings it drives (`chrobot_protocol`).
//!
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use chrobot::{Browser, BrowserConfig};
//!
//! let config = BrowserConfig::builder()
//!     .executable("/usr/bin/chromium")
//!     .build();
//! let (browser, handle) = Browser::launch(config).await?;
//! tokio::spawn(handle);
//!
//! let version = browser.get_version().await?;
//! println!("{}", version.product);
//!
//! browser.quit().await?;
//! # Ok(())
//! # }
//! ```
//!
//! This crate only implements the supervisor half of the system: launching
//! the process, multiplexing requests and replies over the pipe, fanning
//! events out to listeners, and a graceful shutdown state machine. It has
//! no opinion on page navigation, screenshots, or locating a browser binary
//! on disk — those are built on top of the [`Browser`] handle and
//! [`chrobot_types::Transport`], not inside it.

#![warn(missing_debug_implementations, rust_2018_idioms)]

mod async_process;
mod browser;
mod cmd;
mod commandfuture;
mod config;
mod conn;
mod error;
mod listeners;
mod log_level;
mod supervisor;
mod utils;

pub use browser::{Browser, Version};
pub use config::{BrowserConfig, BrowserConfigBuilder};
pub use error::{LaunchError, ShutdownError};
pub use log_level::LogLevel;

pub use chrobot_types::{BrowserError, JsException, Method, MethodId, ProtocolError, RequestError, Transport};
