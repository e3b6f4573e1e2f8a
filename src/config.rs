//! Launch configuration: a chainable builder plus a `CHROBOT_*` environment
//! overlay, merged explicit > env > default (§6/§10).

use std::path::PathBuf;
use std::time::Duration;

use crate::log_level::LogLevel;

const ENV_EXECUTABLE: &str = "CHROBOT_BROWSER_PATH";
const ENV_ARGS: &str = "CHROBOT_BROWSER_ARGS";
const ENV_TIMEOUT_MS: &str = "CHROBOT_BROWSER_TIMEOUT";
const ENV_LOG_LEVEL: &str = "CHROBOT_LOG_LEVEL";

/// How to start the browser process and wire up its pipe transport.
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    pub(crate) executable: Option<PathBuf>,
    pub(crate) headless: bool,
    pub(crate) sandbox: bool,
    pub(crate) args: Vec<String>,
    pub(crate) launch_timeout: Duration,
    pub(crate) log_level: LogLevel,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        BrowserConfig {
            executable: None,
            headless: true,
            sandbox: true,
            args: Vec::new(),
            launch_timeout: Duration::from_millis(10_000),
            log_level: LogLevel::Silent,
        }
    }
}

impl BrowserConfig {
    pub fn builder() -> BrowserConfigBuilder {
        BrowserConfigBuilder::default()
    }

    /// Build a config from defaults overlaid with `CHROBOT_*` environment
    /// variables. Values set on the returned builder afterwards still win
    /// (explicit > env > default).
    pub fn from_env() -> BrowserConfigBuilder {
        let mut builder = BrowserConfigBuilder::default();

        if let Ok(path) = std::env::var(ENV_EXECUTABLE) {
            builder = builder.executable(path);
        }
        if let Ok(value) = std::env::var(ENV_ARGS) {
            builder.config.args = value.lines().map(str::to_string).filter(|l| !l.is_empty()).collect();
        }
        if let Ok(value) = std::env::var(ENV_TIMEOUT_MS) {
            if let Ok(ms) = value.parse::<u64>() {
                builder.config.launch_timeout = Duration::from_millis(ms);
            }
        }
        if let Ok(value) = std::env::var(ENV_LOG_LEVEL) {
            if let Some(level) = parse_log_level(&value) {
                builder.config.log_level = level;
            }
        }

        builder
    }

    pub fn executable(&self) -> Option<&std::path::Path> {
        self.executable.as_deref()
    }

    pub fn headless(&self) -> bool {
        self.headless
    }

    pub fn sandbox(&self) -> bool {
        self.sandbox
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn launch_timeout(&self) -> Duration {
        self.launch_timeout
    }

    pub fn log_level(&self) -> LogLevel {
        self.log_level
    }
}

/// Chainable builder for [`BrowserConfig`].
#[derive(Debug, Clone, Default)]
pub struct BrowserConfigBuilder {
    config: BrowserConfig,
}

impl BrowserConfigBuilder {
    pub fn executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.executable = Some(path.into());
        self
    }

    pub fn headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }

    pub fn sandbox(mut self, sandbox: bool) -> Self {
        self.config.sandbox = sandbox;
        self
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.config.args.push(arg.into());
        self
    }

    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.config.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn launch_timeout(mut self, timeout: Duration) -> Self {
        self.config.launch_timeout = timeout;
        self
    }

    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.config.log_level = level;
        self
    }

    pub fn build(self) -> BrowserConfig {
        self.config
    }
}

fn parse_log_level(value: &str) -> Option<LogLevel> {
    match value {
        "silent" => Some(LogLevel::Silent),
        "warnings" => Some(LogLevel::Warnings),
        "info" => Some(LogLevel::Info),
        "debug" => Some(LogLevel::Debug),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let config = BrowserConfig::builder()
            .executable("/usr/bin/chromium")
            .headless(false)
            .arg("--disable-gpu")
            .build();
        assert_eq!(config.executable(), Some(std::path::Path::new("/usr/bin/chromium")));
        assert!(!config.headless());
        assert_eq!(config.args(), &["--disable-gpu".to_string()]);
    }

    #[test]
    fn defaults_are_headless_and_sandboxed() {
        let config = BrowserConfig::builder().build();
        assert!(config.headless());
        assert!(config.sandbox());
        assert_eq!(config.launch_timeout(), Duration::from_millis(10_000));
        assert_eq!(config.log_level(), LogLevel::Silent);
    }

    #[test]
    fn builder_sets_log_level() {
        let config = BrowserConfig::builder().log_level(LogLevel::Debug).build();
        assert_eq!(config.log_level(), LogLevel::Debug);
    }

    #[test]
    fn parse_log_level_rejects_unknown_values() {
        assert_eq!(parse_log_level("debug"), Some(LogLevel::Debug));
        assert_eq!(parse_log_level("chatty"), None);
    }
}
