//! Parses the two upstream CDP schema documents, patches the handful of
//! cyclic/unstable references they contain, filters by stability, and
//! emits one Rust source file per domain.
//!
//! This crate has no knowledge of how its output is consumed — it hands
//! back [`GeneratedCrate`], a set of in-memory Rust source strings, and
//! leaves writing them under `OUT_DIR` and `include!`-ing them to the
//! caller's `build.rs` (`chrobot_protocol`, normally).

#![warn(missing_debug_implementations, rust_2018_idioms)]

mod error;
mod generator;
mod naming;
mod patch;
mod schema;
mod stability;

pub use error::CodegenError;
pub use generator::GeneratedModule;
pub use patch::PatchApplied;
pub use schema::{Protocol, Version};
pub use stability::StabilityOptions;

use error::Result;

/// Which items to generate: both flags default to `false`, matching a
/// stable-only build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerateOptions {
    pub allow_experimental: bool,
    pub allow_deprecated: bool,
}

/// The finished output of a generation run: the merged protocol version and
/// one module per surviving domain.
#[derive(Debug, Clone)]
pub struct GeneratedCrate {
    pub version: (usize, usize),
    pub modules: Vec<GeneratedModule>,
}

/// Parse, patch, filter and emit. `browser_json`/`js_json` are the raw
/// contents of `browser_protocol.json` and `js_protocol.json`.
pub fn generate(browser_json: &str, js_json: &str, opts: GenerateOptions) -> Result<GeneratedCrate> {
    let mut protocol = schema::merge(browser_json, js_json)?;

    patch::apply_patches(&mut protocol);

    stability::filter_stability(
        &mut protocol,
        StabilityOptions {
            allow_experimental: opts.allow_experimental,
            allow_deprecated: opts.allow_deprecated,
        },
    );

    let modules = generator::generate(&protocol)?;

    Ok(GeneratedCrate {
        version: (protocol.version.major, protocol.version.minor),
        modules,
    })
}

/// Parse, patch and filter without emitting code. Exposed for callers (and
/// tests) that want to inspect the schema tree a generation run would act
/// on without paying for pretty-printing.
pub fn prepare(browser_json: &str, js_json: &str, opts: GenerateOptions) -> Result<Protocol> {
    let mut protocol = schema::merge(browser_json, js_json)?;
    patch::apply_patches(&mut protocol);
    stability::filter_stability(
        &mut protocol,
        StabilityOptions {
            allow_experimental: opts.allow_experimental,
            allow_deprecated: opts.allow_deprecated,
        },
    );
    Ok(protocol)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BROWSER: &str = r#"{"version":{"major":"1","minor":"3"},"domains":[
        {"domain":"DOM","commands":[
            {"name":"removeNode","parameters":[{"name":"nodeId","type":"integer"}]}
        ],"types":[
            {"id":"NodeId","type":"integer"}
        ]}
    ]}"#;
    const JS: &str = r#"{"version":{"major":"1","minor":"3"},"domains":[
        {"domain":"Runtime","events":[
            {"name":"executionContextCreated","parameters":[{"name":"id","type":"integer"}]}
        ]}
    ]}"#;

    #[test]
    fn generates_one_module_per_domain() {
        let generated = generate(BROWSER, JS, GenerateOptions::default()).unwrap();
        assert_eq!(generated.version, (1, 3));
        assert_eq!(generated.modules.len(), 2);
        let dom = generated.modules.iter().find(|m| m.domain == "DOM").unwrap();
        assert!(dom.source.contains("pub async fn remove_node"));
        assert!(dom.source.contains("pub type NodeId"));
    }

    #[test]
    fn emits_event_struct_for_runtime() {
        let generated = generate(BROWSER, JS, GenerateOptions::default()).unwrap();
        let runtime = generated.modules.iter().find(|m| m.domain == "Runtime").unwrap();
        assert!(runtime.source.contains("ExecutionContextCreatedEvent"));
        assert!(runtime.source.contains("impl chrobot_types :: Method") || runtime.source.contains("impl chrobot_types::Method"));
    }

    #[test]
    fn prepare_exposes_patched_protocol_without_rendering() {
        let protocol = prepare(BROWSER, JS, GenerateOptions::default()).unwrap();
        assert_eq!(protocol.domains.len(), 2);
    }
}
