//! Drives `chrobot_codegen` against the schema documents bundled under
//! `schema/` and writes the resulting modules to `OUT_DIR`.
//!
//! `CHROBOT_ALLOW_EXPERIMENTAL` / `CHROBOT_ALLOW_DEPRECATED` (either `"1"`)
//! widen the generated surface past the stable default; see the crate-level
//! docs in `src/lib.rs`.

use std::env;
use std::fs;
use std::path::PathBuf;

const BROWSER_PROTOCOL: &str = include_str!("schema/browser_protocol.json");
const JS_PROTOCOL: &str = include_str!("schema/js_protocol.json");

fn main() {
    println!("cargo:rerun-if-changed=schema/browser_protocol.json");
    println!("cargo:rerun-if-changed=schema/js_protocol.json");
    println!("cargo:rerun-if-env-changed=CHROBOT_ALLOW_EXPERIMENTAL");
    println!("cargo:rerun-if-env-changed=CHROBOT_ALLOW_DEPRECATED");

    let opts = chrobot_codegen::GenerateOptions {
        allow_experimental: env_flag("CHROBOT_ALLOW_EXPERIMENTAL"),
        allow_deprecated: env_flag("CHROBOT_ALLOW_DEPRECATED"),
    };

    let generated = chrobot_codegen::generate(BROWSER_PROTOCOL, JS_PROTOCOL, opts)
        .expect("bundled CDP schema failed to generate");

    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));

    let mut mod_decls = String::new();
    for module in &generated.modules {
        let dest = out_dir.join(&module.file_name);
        fs::write(&dest, &module.source)
            .unwrap_or_else(|e| panic!("failed to write {}: {e}", dest.display()));

        let mod_ident = module
            .file_name
            .strip_suffix(".rs")
            .expect("generated file names always end in .rs");
        mod_decls.push_str(&format!(
            "pub mod {mod_ident} {{ include!(concat!(env!(\"OUT_DIR\"), \"/{file}\")); }}\n",
            file = module.file_name,
        ));
    }
    fs::write(out_dir.join("modules.rs"), mod_decls).expect("failed to write module manifest");

    fs::write(
        out_dir.join("version.rs"),
        format!(
            "pub(crate) const PROTOCOL_VERSION: (usize, usize) = ({}, {});\n",
            generated.version.0, generated.version.1
        ),
    )
    .expect("failed to write version file");
}

fn env_flag(name: &str) -> bool {
    env::var(name).map(|v| v == "1").unwrap_or(false)
}
