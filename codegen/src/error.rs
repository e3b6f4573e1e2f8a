use std::fmt;

/// Errors raised while parsing, patching or emitting the CDP schema.
///
/// See §7 of the specification: these are fatal — codegen either produces a
/// complete, internally consistent set of modules or it fails outright.
#[derive(Debug, thiserror::Error)]
pub enum CodegenError {
    #[error("malformed schema: {0}")]
    Malformed(String),
    #[error("unresolved reference `{reference}` from domain `{domain}`")]
    UnresolvedRef { domain: String, reference: String },
    #[error(
        "schema version mismatch: browser_protocol is {browser:?}, js_protocol is {js:?}"
    )]
    VersionMismatch { browser: (usize, usize), js: (usize, usize) },
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl CodegenError {
    pub fn malformed(msg: impl fmt::Display) -> Self {
        CodegenError::Malformed(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CodegenError>;
