//! The patch pass (§4.2): deterministic rewrites applied to the merged
//! schema tree before stability filtering, each with a one-line rationale
//! that is recorded on [`PatchApplied`] so the caller can log why a rewrite
//! fired.

use crate::schema::{ArrayItem, Domain, Protocol, Type};

/// A single patch firing, recorded for logging/introspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchApplied {
    pub rule: &'static str,
    pub rationale: &'static str,
    pub domain: String,
    pub detail: String,
}

/// Apply every patch in the table to `protocol` in place, returning the list
/// of patches that actually fired (an upstream schema that has already fixed
/// the underlying cycle fires none of the corresponding ref-rewrite rules).
pub fn apply_patches(protocol: &mut Protocol) -> Vec<PatchApplied> {
    let mut applied = Vec::new();

    apply_domain_patches(&mut protocol.domains, &mut applied);
    apply_ref_patches(&mut protocol.domains, &mut applied);
    apply_same_domain_unqualify(&mut protocol.domains, &mut applied);

    applied
}

fn apply_domain_patches(domains: &mut [Domain], applied: &mut Vec<PatchApplied>) {
    for domain in domains.iter_mut() {
        if domain.name == "Tracing" && !domain.experimental {
            domain.experimental = true;
            applied.push(PatchApplied {
                rule: "tracing-experimental",
                rationale: "not part of stable 1.3",
                domain: domain.name.clone(),
                detail: "marked domain Tracing experimental".into(),
            });
        }

        if domain.name == "IO" && !domain.dependencies.iter().any(|d| d == "Runtime") {
            domain.dependencies.push("Runtime".to_string());
            applied.push(PatchApplied {
                rule: "io-depends-on-runtime",
                rationale: "uses Runtime.RemoteObjectId",
                domain: domain.name.clone(),
                detail: "added dependency Runtime to domain IO".into(),
            });
        }
    }
}

/// Rewrite specific cross-domain `Ref`s to primitives, per the patch table.
/// Recurses into object properties, command parameters/returns, event
/// parameters, and array items.
fn apply_ref_patches(domains: &mut [Domain], applied: &mut Vec<PatchApplied>) {
    for domain in domains.iter_mut() {
        let domain_name = domain.name.clone();
        for type_def in &mut domain.types {
            patch_type(&mut type_def.inner, &domain_name, applied);
        }
        for command in &mut domain.commands {
            for param in &mut command.parameters {
                patch_type(&mut param.inner, &domain_name, applied);
            }
            for ret in &mut command.returns {
                patch_type(&mut ret.inner, &domain_name, applied);
            }
        }
        for event in &mut domain.events {
            for param in &mut event.parameters {
                patch_type(&mut param.inner, &domain_name, applied);
            }
        }
    }
}

fn patch_type(ty: &mut Type, domain_name: &str, applied: &mut Vec<PatchApplied>) {
    match ty {
        Type::Ref(target) => {
            if let Some((primitive, rule, rationale)) = specific_ref_patch(target, domain_name) {
                applied.push(PatchApplied {
                    rule,
                    rationale,
                    domain: domain_name.to_string(),
                    detail: format!("Ref({target}) -> Primitive({primitive})"),
                });
                *ty = Type::Primitive(primitive.to_string());
            }
        }
        Type::Array(item) => patch_array_item(item, domain_name, applied),
        Type::Object(Some(props)) => {
            for prop in props {
                patch_type(&mut prop.inner, domain_name, applied);
            }
        }
        Type::Object(None) | Type::Primitive(_) | Type::Enum(_) => {}
    }
}

fn patch_array_item(item: &mut ArrayItem, domain_name: &str, applied: &mut Vec<PatchApplied>) {
    if let ArrayItem::Ref(target) = item {
        if let Some((primitive, rule, rationale)) = specific_ref_patch(target, domain_name) {
            let extra_rule = if domain_name == "Target" && target == "Browser.BrowserContextID" {
                "target-browser-context-id-array"
            } else {
                rule
            };
            applied.push(PatchApplied {
                rule: extra_rule,
                rationale,
                domain: domain_name.to_string(),
                detail: format!("Array(Ref({target})) -> Array(Primitive({primitive}))"),
            });
            *item = ArrayItem::Primitive(primitive.to_string());
        }
    }
}

fn specific_ref_patch(target: &str, domain_name: &str) -> Option<(&'static str, &'static str, &'static str)> {
    if (domain_name == "DOM" || domain_name == "Accessibility") && target == "Page.FrameId" {
        return Some((
            "string",
            "frame-id-to-string",
            "would introduce a back-edge to Page",
        ));
    }
    if (domain_name == "Security" || domain_name == "Accessibility") && target == "Network.TimeSinceEpoch" {
        return Some((
            "number",
            "time-since-epoch-to-number",
            "would introduce a back-edge to Network",
        ));
    }
    if target == "Browser.BrowserContextID" || target == "BrowserContextID" {
        return Some((
            "string",
            "browser-context-id-to-string",
            "referenced type is experimental while the reference is stable",
        ));
    }
    None
}

/// Drop the `ThisDomain.` qualifier from any ref that targets the domain it
/// already lives in. Runs after the primitive-rewrite pass so it only ever
/// sees refs that survived it.
fn apply_same_domain_unqualify(domains: &mut [Domain], applied: &mut Vec<PatchApplied>) {
    for domain in domains.iter_mut() {
        let domain_name = domain.name.clone();
        for type_def in &mut domain.types {
            unqualify_type(&mut type_def.inner, &domain_name, applied);
        }
        for command in &mut domain.commands {
            for param in &mut command.parameters {
                unqualify_type(&mut param.inner, &domain_name, applied);
            }
            for ret in &mut command.returns {
                unqualify_type(&mut ret.inner, &domain_name, applied);
            }
        }
        for event in &mut domain.events {
            for param in &mut event.parameters {
                unqualify_type(&mut param.inner, &domain_name, applied);
            }
        }
    }
}

fn unqualify_type(ty: &mut Type, domain_name: &str, applied: &mut Vec<PatchApplied>) {
    match ty {
        Type::Ref(target) => unqualify_ref(target, domain_name, applied),
        Type::Array(item) => {
            if let ArrayItem::Ref(target) = item.as_mut() {
                unqualify_ref(target, domain_name, applied);
            }
        }
        Type::Object(Some(props)) => {
            for prop in props {
                unqualify_type(&mut prop.inner, domain_name, applied);
            }
        }
        Type::Object(None) | Type::Primitive(_) | Type::Enum(_) => {}
    }
}

fn unqualify_ref(target: &mut String, domain_name: &str, applied: &mut Vec<PatchApplied>) {
    let prefix = format!("{domain_name}.");
    if let Some(rest) = target.strip_prefix(prefix.as_str()) {
        let rest = rest.to_string();
        applied.push(PatchApplied {
            rule: "same-domain-unqualify",
            rationale: "remove unnecessary qualifier",
            domain: domain_name.to_string(),
            detail: format!("Ref({target}) -> Ref({rest})"),
        });
        *target = rest;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::merge;

    #[test]
    fn rewrites_frame_id_ref_in_dom_and_accessibility() {
        let browser = r#"{"version":{"major":"1","minor":"3"},"domains":[
            {"domain":"Page","types":[{"id":"FrameId","type":"string"}]},
            {"domain":"DOM","dependencies":["Page"],"types":[
                {"id":"BackendNode","type":"object","properties":[{"name":"frame","$ref":"Page.FrameId","optional":true}]}
            ]},
            {"domain":"Accessibility","dependencies":["Page"],"types":[
                {"id":"AXNode","type":"object","properties":[{"name":"frame","$ref":"Page.FrameId","optional":true}]}
            ]}
        ]}"#;
        let js = r#"{"version":{"major":"1","minor":"3"},"domains":[]}"#;
        let mut protocol = merge(browser, js).unwrap();
        let applied = apply_patches(&mut protocol);

        assert!(applied.iter().any(|p| p.rule == "frame-id-to-string" && p.domain == "DOM"));
        assert!(applied.iter().any(|p| p.rule == "frame-id-to-string" && p.domain == "Accessibility"));

        let dom = protocol.domains.iter().find(|d| d.name == "DOM").unwrap();
        if let Type::Object(Some(props)) = &dom.types[0].inner {
            assert_eq!(props[0].inner, Type::Primitive("string".into()));
        } else {
            panic!("expected object");
        }
    }

    #[test]
    fn tracing_is_marked_experimental() {
        let browser = r#"{"version":{"major":"1","minor":"3"},"domains":[{"domain":"Tracing"}]}"#;
        let js = r#"{"version":{"major":"1","minor":"3"},"domains":[]}"#;
        let mut protocol = merge(browser, js).unwrap();
        apply_patches(&mut protocol);
        assert!(protocol.domains[0].experimental);
    }

    #[test]
    fn io_gains_runtime_dependency() {
        let browser = r#"{"version":{"major":"1","minor":"3"},"domains":[{"domain":"IO"}]}"#;
        let js = r#"{"version":{"major":"1","minor":"3"},"domains":[]}"#;
        let mut protocol = merge(browser, js).unwrap();
        apply_patches(&mut protocol);
        assert_eq!(protocol.domains[0].dependencies, vec!["Runtime".to_string()]);
    }

    #[test]
    fn same_domain_ref_is_unqualified() {
        let browser = r#"{"version":{"major":"1","minor":"3"},"domains":[
            {"domain":"DOM","types":[
                {"id":"NodeId","type":"integer"},
                {"id":"Node","type":"object","properties":[{"name":"nodeId","$ref":"DOM.NodeId"}]}
            ]}
        ]}"#;
        let js = r#"{"version":{"major":"1","minor":"3"},"domains":[]}"#;
        let mut protocol = merge(browser, js).unwrap();
        let applied = apply_patches(&mut protocol);
        assert!(applied.iter().any(|p| p.rule == "same-domain-unqualify"));
        if let Type::Object(Some(props)) = &protocol.domains[0].types[1].inner {
            assert_eq!(props[0].inner, Type::Ref("NodeId".into()));
        } else {
            panic!("expected object");
        }
    }

    #[test]
    fn browser_context_id_is_rewritten_anywhere() {
        let browser = r#"{"version":{"major":"1","minor":"3"},"domains":[
            {"domain":"Target","types":[
                {"id":"TargetInfo","type":"object","properties":[
                    {"name":"contexts","type":"array","items":{"$ref":"Browser.BrowserContextID"}}
                ]}
            ]}
        ]}"#;
        let js = r#"{"version":{"major":"1","minor":"3"},"domains":[]}"#;
        let mut protocol = merge(browser, js).unwrap();
        let applied = apply_patches(&mut protocol);
        assert!(applied.iter().any(|p| p.rule == "target-browser-context-id-array"));
        if let Type::Object(Some(props)) = &protocol.domains[0].types[0].inner {
            assert_eq!(props[0].inner, Type::Array(Box::new(ArrayItem::Primitive("string".into()))));
        } else {
            panic!("expected object");
        }
    }
}
