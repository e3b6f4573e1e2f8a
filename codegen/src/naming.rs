//! Identifier construction for generated code: domain/type/field/command
//! names to Rust-idiomatic case, reserved-word escaping, and same-domain ref
//! unqualification.

use heck::{ToPascalCase, ToSnakeCase};

/// Rust 2018+ keywords that show up as CDP identifiers (`type`, `move`, ...).
/// An identifier on this list gets a trailing underscore rather than a
/// rename, so the generated name still reads like the schema name.
const RESERVED: &[&str] = &[
    "as", "break", "const", "continue", "crate", "dyn", "else", "enum", "extern", "false", "fn",
    "for", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub", "ref",
    "return", "self", "Self", "static", "struct", "super", "trait", "true", "type", "unsafe",
    "use", "where", "while", "async", "await", "dyn", "try", "union",
];

fn escape_reserved(s: String) -> String {
    if RESERVED.contains(&s.as_str()) {
        format!("{s}_")
    } else {
        s
    }
}

/// The module a domain's generated code lives in, e.g. `"DOM"` -> `dom`.
pub fn module_name(domain: &str) -> String {
    escape_reserved(domain.to_snake_case())
}

/// The Rust type name for a schema type id, e.g. `"NodeId"` -> `NodeId`,
/// `"backendNodeId"` -> `BackendNodeId`.
pub fn type_name(id: &str) -> String {
    id.to_pascal_case()
}

/// The Rust field name for a schema property name, e.g. `"nodeId"` ->
/// `node_id`. Reserved words get a trailing underscore: `"type"` -> `type_`.
pub fn field_name(name: &str) -> String {
    escape_reserved(name.to_snake_case())
}

/// The Rust function name for a schema command name, e.g. `"removeNode"` ->
/// `remove_node`.
pub fn function_name(command_name: &str) -> String {
    escape_reserved(command_name.to_snake_case())
}

/// The auxiliary type name synthesized for an inline enum found in a
/// property, e.g. root type `Cookie`, property `sameSite` ->
/// `CookieSameSite`.
pub fn inline_enum_name(root_type_name: &str, property_name: &str) -> String {
    format!("{}{}", root_type_name, type_name(property_name))
}

/// Split a schema reference into `(domain, type_name)`. An unqualified
/// reference (already same-domain, or the patch pass stripped its
/// qualifier) returns `current_domain` as the domain.
pub fn split_ref<'a>(reference: &'a str, current_domain: &'a str) -> (&'a str, &'a str) {
    match reference.split_once('.') {
        Some((domain, name)) => (domain, name),
        None => (current_domain, reference),
    }
}

/// The Rust path a reference resolves to from within `current_domain`:
/// unqualified if it targets the current domain, `other_domain::TypeName`
/// otherwise.
pub fn ref_path(reference: &str, current_domain: &str) -> String {
    let (domain, name) = split_ref(reference, current_domain);
    if domain == current_domain {
        type_name(name)
    } else {
        format!("{}::{}", module_name(domain), type_name(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_type_keyword() {
        assert_eq!(field_name("type"), "type_");
        assert_eq!(function_name("type"), "type_");
    }

    #[test]
    fn converts_case() {
        assert_eq!(module_name("DOM"), "dom");
        assert_eq!(type_name("backendNodeId"), "BackendNodeId");
        assert_eq!(field_name("nodeId"), "node_id");
        assert_eq!(function_name("removeNode"), "remove_node");
    }

    #[test]
    fn inline_enum_is_root_plus_property() {
        assert_eq!(inline_enum_name("Cookie", "sameSite"), "CookieSameSite");
    }

    #[test]
    fn ref_path_unqualifies_same_domain() {
        assert_eq!(ref_path("NodeId", "DOM"), "NodeId");
        assert_eq!(ref_path("DOM.NodeId", "DOM"), "NodeId");
    }

    #[test]
    fn ref_path_qualifies_cross_domain() {
        assert_eq!(ref_path("Page.FrameId", "DOM"), "page::FrameId");
    }
}
