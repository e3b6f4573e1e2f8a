//! The parsed CDP schema tree (§3 of the specification) and the JSON parser
//! that builds it.
//!
//! The upstream `browser_protocol.json` / `js_protocol.json` documents are
//! not parsed with `#[derive(Deserialize)]`: the `type` tag decides whether a
//! node also carries `enum`, `items`, `properties` or `$ref`, which is
//! easier to express as a small hand-written reader over `serde_json::Value`
//! than to coax out of serde's derive machinery. This mirrors the way the
//! teacher's PDL parser is a hand-written recursive-descent reader rather
//! than a derived one — only the input here is JSON, not PDL text.

use crate::error::{CodegenError, Result};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Version {
    pub major: usize,
    pub minor: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Protocol {
    pub version: Version,
    pub domains: Vec<Domain>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Domain {
    pub name: String,
    pub description: Option<String>,
    pub experimental: bool,
    pub deprecated: bool,
    pub dependencies: Vec<String>,
    pub types: Vec<TypeDef>,
    pub commands: Vec<Command>,
    pub events: Vec<Event>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDef {
    pub id: String,
    pub description: Option<String>,
    pub experimental: bool,
    pub deprecated: bool,
    pub inner: Type,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDef {
    pub name: String,
    pub description: Option<String>,
    pub experimental: bool,
    pub deprecated: bool,
    pub optional: bool,
    pub inner: Type,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub name: String,
    pub description: Option<String>,
    pub experimental: bool,
    pub deprecated: bool,
    pub parameters: Vec<PropertyDef>,
    pub returns: Vec<PropertyDef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub name: String,
    pub description: Option<String>,
    pub experimental: bool,
    pub deprecated: bool,
    pub parameters: Vec<PropertyDef>,
}

/// A CDP type, tagged per §3: `Primitive(name) | Enum(values) | Object(props?)
/// | Array(item) | Ref(target)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Primitive(String),
    Enum(Vec<String>),
    Object(Option<Vec<PropertyDef>>),
    Array(Box<ArrayItem>),
    Ref(String),
}

/// The element type of an `Array`: either a primitive scalar or a reference,
/// never another array or an inline object (the upstream schema never nests
/// arrays-of-arrays or arrays-of-inline-objects).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArrayItem {
    Primitive(String),
    Ref(String),
}

impl Type {
    pub fn is_any(&self) -> bool {
        matches!(self, Type::Primitive(p) if p == "any")
    }
}

/// Parse and merge `browser_protocol.json` and `js_protocol.json` into one
/// [`Protocol`]. The merge is rejected if the two documents declare
/// different `{major, minor}` versions.
pub fn merge(browser_json: &str, js_json: &str) -> Result<Protocol> {
    let browser = parse_document(browser_json)?;
    let js = parse_document(js_json)?;

    if browser.version != js.version {
        return Err(CodegenError::VersionMismatch {
            browser: (browser.version.major, browser.version.minor),
            js: (js.version.major, js.version.minor),
        });
    }

    let mut domains = browser.domains;
    domains.extend(js.domains);

    Ok(Protocol {
        version: browser.version,
        domains,
    })
}

fn parse_document(json: &str) -> Result<Protocol> {
    let value: Value = serde_json::from_str(json)?;
    let obj = value
        .as_object()
        .ok_or_else(|| CodegenError::malformed("top-level schema document must be an object"))?;

    let version = parse_version(obj.get("version"))?;

    let domains = obj
        .get("domains")
        .and_then(Value::as_array)
        .ok_or_else(|| CodegenError::malformed("schema document missing `domains` array"))?
        .iter()
        .map(parse_domain)
        .collect::<Result<Vec<_>>>()?;

    Ok(Protocol { version, domains })
}

fn parse_version(value: Option<&Value>) -> Result<Version> {
    let obj = value
        .and_then(Value::as_object)
        .ok_or_else(|| CodegenError::malformed("schema document missing `version` object"))?;
    Ok(Version {
        major: parse_version_component(obj.get("major"))?,
        minor: parse_version_component(obj.get("minor"))?,
    })
}

fn parse_version_component(value: Option<&Value>) -> Result<usize> {
    match value {
        Some(Value::String(s)) => s
            .parse()
            .map_err(|_| CodegenError::malformed(format!("non-numeric version component `{s}`"))),
        Some(Value::Number(n)) => n
            .as_u64()
            .map(|n| n as usize)
            .ok_or_else(|| CodegenError::malformed("version component is not a non-negative integer")),
        _ => Err(CodegenError::malformed("missing version component")),
    }
}

fn parse_domain(value: &Value) -> Result<Domain> {
    let obj = value
        .as_object()
        .ok_or_else(|| CodegenError::malformed("domain must be an object"))?;

    let name = str_field(obj, "domain")?.to_string();

    let types = obj
        .get("types")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().map(parse_type_def).collect::<Result<Vec<_>>>())
        .transpose()?
        .unwrap_or_default();

    let commands = obj
        .get("commands")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().map(parse_command).collect::<Result<Vec<_>>>())
        .transpose()?
        .unwrap_or_default();

    let events = obj
        .get("events")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().map(parse_event).collect::<Result<Vec<_>>>())
        .transpose()?
        .unwrap_or_default();

    let dependencies = obj
        .get("dependencies")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(Domain {
        name,
        description: opt_str_field(obj, "description"),
        experimental: bool_field(obj, "experimental"),
        deprecated: bool_field(obj, "deprecated"),
        dependencies,
        types,
        commands,
        events,
    })
}

fn parse_type_def(value: &Value) -> Result<TypeDef> {
    let obj = value
        .as_object()
        .ok_or_else(|| CodegenError::malformed("type definition must be an object"))?;
    let id = str_field(obj, "id")?.to_string();
    let inner = parse_type(obj).map_err(|e| {
        CodegenError::malformed(format!("type `{id}`: {e}"))
    })?;
    Ok(TypeDef {
        id,
        description: opt_str_field(obj, "description"),
        experimental: bool_field(obj, "experimental"),
        deprecated: bool_field(obj, "deprecated"),
        inner,
    })
}

fn parse_property(value: &Value) -> Result<PropertyDef> {
    let obj = value
        .as_object()
        .ok_or_else(|| CodegenError::malformed("property must be an object"))?;
    let name = str_field(obj, "name")?.to_string();
    let inner = parse_type(obj).map_err(|e| {
        CodegenError::malformed(format!("property `{name}`: {e}"))
    })?;
    Ok(PropertyDef {
        name,
        description: opt_str_field(obj, "description"),
        experimental: bool_field(obj, "experimental"),
        deprecated: bool_field(obj, "deprecated"),
        optional: bool_field(obj, "optional"),
        inner,
    })
}

fn parse_command(value: &Value) -> Result<Command> {
    let obj = value
        .as_object()
        .ok_or_else(|| CodegenError::malformed("command must be an object"))?;
    Ok(Command {
        name: str_field(obj, "name")?.to_string(),
        description: opt_str_field(obj, "description"),
        experimental: bool_field(obj, "experimental"),
        deprecated: bool_field(obj, "deprecated"),
        parameters: parse_property_list(obj.get("parameters"))?,
        returns: parse_property_list(obj.get("returns"))?,
    })
}

fn parse_event(value: &Value) -> Result<Event> {
    let obj = value
        .as_object()
        .ok_or_else(|| CodegenError::malformed("event must be an object"))?;
    Ok(Event {
        name: str_field(obj, "name")?.to_string(),
        description: opt_str_field(obj, "description"),
        experimental: bool_field(obj, "experimental"),
        deprecated: bool_field(obj, "deprecated"),
        parameters: parse_property_list(obj.get("parameters"))?,
    })
}

fn parse_property_list(value: Option<&Value>) -> Result<Vec<PropertyDef>> {
    match value {
        None => Ok(Vec::new()),
        Some(Value::Array(arr)) => arr.iter().map(parse_property).collect(),
        Some(_) => Err(CodegenError::malformed("expected an array of properties")),
    }
}

/// Parse the `Type` a type-def/property/array-item node describes: a `$ref`
/// takes priority over any `type` tag (the upstream schema never sets both).
fn parse_type(obj: &serde_json::Map<String, Value>) -> Result<Type> {
    if let Some(reference) = obj.get("$ref").and_then(Value::as_str) {
        return Ok(Type::Ref(reference.to_string()));
    }

    let ty = str_field(obj, "type")?;

    match ty {
        "array" => {
            let items = obj
                .get("items")
                .and_then(Value::as_object)
                .ok_or_else(|| CodegenError::malformed("array type missing `items`"))?;
            let item = if let Some(reference) = items.get("$ref").and_then(Value::as_str) {
                ArrayItem::Ref(reference.to_string())
            } else {
                ArrayItem::Primitive(str_field(items, "type")?.to_string())
            };
            Ok(Type::Array(Box::new(item)))
        }
        "string" if obj.contains_key("enum") => {
            let values = obj
                .get("enum")
                .and_then(Value::as_array)
                .ok_or_else(|| CodegenError::malformed("`enum` must be an array"))?
                .iter()
                .map(|v| {
                    v.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| CodegenError::malformed("enum variant must be a string"))
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(Type::Enum(values))
        }
        "object" => {
            let props = obj
                .get("properties")
                .and_then(Value::as_array)
                .map(|arr| arr.iter().map(parse_property).collect::<Result<Vec<_>>>())
                .transpose()?;
            Ok(Type::Object(props))
        }
        other => Ok(Type::Primitive(other.to_string())),
    }
}

fn str_field<'a>(obj: &'a serde_json::Map<String, Value>, key: &str) -> Result<&'a str> {
    obj.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| CodegenError::malformed(format!("missing or non-string field `{key}`")))
}

fn opt_str_field(obj: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}

fn bool_field(obj: &serde_json::Map<String, Value>, key: &str) -> bool {
    obj.get(key).and_then(Value::as_bool).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(domains: &str) -> String {
        format!(r#"{{"version":{{"major":"1","minor":"3"}},"domains":[{domains}]}}"#)
    }

    #[test]
    fn parses_primitive_type_def() {
        let json = doc(r#"{"domain":"DOM","types":[{"id":"NodeId","type":"integer"}]}"#);
        let p = parse_document(&json).unwrap();
        assert_eq!(p.version, Version { major: 1, minor: 3 });
        assert_eq!(p.domains[0].types[0].inner, Type::Primitive("integer".into()));
    }

    #[test]
    fn parses_enum_type_def() {
        let json = doc(
            r#"{"domain":"Page","types":[{"id":"TransitionType","type":"string","enum":["link","typed"]}]}"#,
        );
        let p = parse_document(&json).unwrap();
        assert_eq!(
            p.domains[0].types[0].inner,
            Type::Enum(vec!["link".into(), "typed".into()])
        );
    }

    #[test]
    fn parses_object_with_ref_and_optional_property() {
        let json = doc(
            r#"{"domain":"DOM","types":[{"id":"Node","type":"object","properties":[
                {"name":"nodeId","$ref":"NodeId"},
                {"name":"parentId","$ref":"NodeId","optional":true}
            ]}]}"#,
        );
        let p = parse_document(&json).unwrap();
        match &p.domains[0].types[0].inner {
            Type::Object(Some(props)) => {
                assert_eq!(props.len(), 2);
                assert!(!props[0].optional);
                assert!(props[1].optional);
                assert_eq!(props[1].inner, Type::Ref("NodeId".into()));
            }
            other => panic!("expected Object(Some(..)), got {other:?}"),
        }
    }

    #[test]
    fn parses_array_of_ref() {
        let json = doc(
            r#"{"domain":"DOM","types":[{"id":"NodeList","type":"array","items":{"$ref":"NodeId"}}]}"#,
        );
        let p = parse_document(&json).unwrap();
        assert_eq!(
            p.domains[0].types[0].inner,
            Type::Array(Box::new(ArrayItem::Ref("NodeId".into())))
        );
    }

    #[test]
    fn merge_rejects_version_mismatch() {
        let a = doc(r#"{"domain":"A"}"#);
        let b = format!(r#"{{"version":{{"major":"1","minor":"2"}},"domains":[{{"domain":"B"}}]}}"#);
        let err = merge(&a, &b).unwrap_err();
        assert!(matches!(err, CodegenError::VersionMismatch { .. }));
    }

    #[test]
    fn merge_concatenates_domains() {
        let a = doc(r#"{"domain":"A"}"#);
        let b = doc(r#"{"domain":"B"}"#);
        let merged = merge(&a, &b).unwrap();
        assert_eq!(merged.domains.len(), 2);
        assert_eq!(merged.domains[0].name, "A");
        assert_eq!(merged.domains[1].name, "B");
    }
}
