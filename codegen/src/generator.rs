//! The emitter (§4.2 "Output"): turns a patched, filtered [`Protocol`] into
//! one Rust source file per domain.
//!
//! Each [`TypeDef`] becomes a struct, enum or type alias. Each [`Command`]
//! becomes a free `async fn` taking a `&dyn Transport` and one named
//! parameter per schema parameter, building its request payload by hand
//! (command parameters are not themselves a derived struct — nothing in the
//! schema names a type for "the parameters of `Page.navigate`"). Each
//! [`Event`] becomes a plain decodable struct implementing `Method`, for
//! callers to parse out of the generic payload a listener receives.

use std::collections::BTreeSet;

use proc_macro2::TokenStream;
use quote::{format_ident, quote};

use crate::error::{CodegenError, Result};
use crate::naming::{self, field_name, function_name, module_name, type_name};
use crate::schema::{ArrayItem, Command, Domain, Event, Protocol, PropertyDef, Type};

/// One generated `.rs` file, ready to be written under `OUT_DIR`.
#[derive(Debug, Clone)]
pub struct GeneratedModule {
    pub domain: String,
    pub file_name: String,
    pub source: String,
}

/// Generate one module per domain in `protocol`.
pub fn generate(protocol: &Protocol) -> Result<Vec<GeneratedModule>> {
    protocol
        .domains
        .iter()
        .map(|domain| generate_domain(domain))
        .collect()
}

fn generate_domain(domain: &Domain) -> Result<GeneratedModule> {
    let mod_name = module_name(&domain.name);
    let doc_link = format!(
        "https://chromedevtools.github.io/devtools-protocol/tot/{}/",
        domain.name
    );
    let doc_header = format!(" {} domain.", domain.name);

    let foreign = collect_foreign_domains(domain);
    let uses_transport = !domain.commands.is_empty();
    let uses_value = domain_uses_value(domain);
    let uses_map = uses_transport;
    let uses_hashmap = domain_uses_object_without_props(domain);
    let uses_insert_if_some = domain
        .commands
        .iter()
        .any(|c| c.parameters.iter().any(|p| p.optional));
    let uses_encode_any = domain
        .commands
        .iter()
        .any(|c| c.parameters.iter().any(|p| p.inner.is_any()));
    let uses_serde = domain
        .types
        .iter()
        .any(|t| matches!(t.inner, Type::Object(Some(_)) | Type::Enum(_)))
        || domain.commands.iter().any(|c| !c.returns.is_empty())
        || !domain.events.is_empty();

    let mut imports = Vec::new();
    if uses_serde {
        imports.push(quote! { use serde::{Deserialize, Serialize}; });
    }
    if uses_map || uses_value {
        let map_tok = uses_map.then(|| quote! { Map });
        let value_tok = uses_value.then(|| quote! { Value });
        match (map_tok, value_tok) {
            (Some(_), Some(_)) => imports.push(quote! { use serde_json::{Map, Value}; }),
            (Some(_), None) => imports.push(quote! { use serde_json::Map; }),
            (None, Some(_)) => imports.push(quote! { use serde_json::Value; }),
            (None, None) => {}
        }
    }
    if uses_hashmap {
        imports.push(quote! { use std::collections::HashMap; });
    }
    if uses_transport {
        let mut names = vec![
            quote! { DEFAULT_CALL_TIMEOUT },
            quote! { MethodId },
            quote! { ProtocolError },
            quote! { Transport },
        ];
        if uses_insert_if_some {
            names.push(quote! { insert_if_some });
        }
        if uses_encode_any {
            names.push(quote! { encode_any });
        }
        imports.push(quote! { use chrobot_types::{#(#names),*}; });
    } else if !domain.events.is_empty() {
        imports.push(quote! { use chrobot_types::MethodId; });
    }
    for other in &foreign {
        let ident = format_ident!("{}", module_name(other));
        imports.push(quote! { use crate::#ident; });
    }

    let mut items = Vec::new();
    for type_def in &domain.types {
        items.push(emit_type_def(type_def, &domain.name)?);
    }
    for command in &domain.commands {
        items.push(emit_command(&domain.name, command)?);
    }
    for event in &domain.events {
        items.push(emit_event(&domain.name, event)?);
    }

    let tokens = quote! {
        #![doc = #doc_header]
        #![doc = ""]
        #![doc = #doc_link]

        #(#imports)*

        #(#items)*
    };

    Ok(GeneratedModule {
        domain: domain.name.clone(),
        file_name: format!("{mod_name}.rs"),
        source: pretty_print(tokens)?,
    })
}

fn pretty_print(tokens: TokenStream) -> Result<String> {
    let file = syn::parse2::<syn::File>(tokens)
        .map_err(|e| CodegenError::malformed(format!("generated code failed to parse: {e}")))?;
    Ok(prettyplease::unparse(&file))
}

fn collect_foreign_domains(domain: &Domain) -> BTreeSet<String> {
    let mut found = BTreeSet::new();
    for type_def in &domain.types {
        collect_type_refs(&type_def.inner, &domain.name, &mut found);
    }
    for command in &domain.commands {
        for p in command.parameters.iter().chain(&command.returns) {
            collect_type_refs(&p.inner, &domain.name, &mut found);
        }
    }
    for event in &domain.events {
        for p in &event.parameters {
            collect_type_refs(&p.inner, &domain.name, &mut found);
        }
    }
    found
}

fn collect_type_refs(ty: &Type, domain: &str, found: &mut BTreeSet<String>) {
    match ty {
        Type::Ref(r) => {
            let (d, _) = naming::split_ref(r, domain);
            if d != domain {
                found.insert(d.to_string());
            }
        }
        Type::Array(item) => {
            if let ArrayItem::Ref(r) = item.as_ref() {
                let (d, _) = naming::split_ref(r, domain);
                if d != domain {
                    found.insert(d.to_string());
                }
            }
        }
        Type::Object(Some(props)) => {
            for p in props {
                collect_type_refs(&p.inner, domain, found);
            }
        }
        Type::Object(None) | Type::Primitive(_) | Type::Enum(_) => {}
    }
}

fn domain_uses_value(domain: &Domain) -> bool {
    if !domain.commands.is_empty() {
        return true;
    }
    domain.types.iter().any(|t| type_uses_value(&t.inner))
        || domain
            .events
            .iter()
            .any(|e| e.parameters.iter().any(|p| type_uses_value(&p.inner)))
}

fn type_uses_value(ty: &Type) -> bool {
    match ty {
        Type::Primitive(p) => p == "any",
        Type::Object(None) => true,
        Type::Object(Some(props)) => props.iter().any(|p| type_uses_value(&p.inner)),
        Type::Array(item) => matches!(item.as_ref(), ArrayItem::Primitive(p) if p == "any"),
        Type::Enum(_) | Type::Ref(_) => false,
    }
}

fn domain_uses_object_without_props(domain: &Domain) -> bool {
    domain.types.iter().any(|t| type_uses_map(&t.inner))
        || domain
            .commands
            .iter()
            .any(|c| c.parameters.iter().chain(&c.returns).any(|p| type_uses_map(&p.inner)))
        || domain
            .events
            .iter()
            .any(|e| e.parameters.iter().any(|p| type_uses_map(&p.inner)))
}

fn type_uses_map(ty: &Type) -> bool {
    match ty {
        Type::Object(None) => true,
        Type::Object(Some(props)) => props.iter().any(|p| type_uses_map(&p.inner)),
        Type::Primitive(_) | Type::Array(_) | Type::Enum(_) | Type::Ref(_) => false,
    }
}

fn primitive_type(name: &str) -> TokenStream {
    match name {
        "string" => quote! { String },
        "integer" => quote! { i64 },
        "number" => quote! { f64 },
        "boolean" => quote! { bool },
        "any" => quote! { Value },
        "object" => quote! { HashMap<String, String> },
        _ => quote! { Value },
    }
}

fn ref_type(reference: &str, domain: &str) -> TokenStream {
    let path = naming::ref_path(reference, domain);
    syn::parse_str::<syn::Type>(&path)
        .map(|t| quote! { #t })
        .unwrap_or_else(|_| quote! { Value })
}

fn array_item_type(item: &ArrayItem, domain: &str) -> TokenStream {
    match item {
        ArrayItem::Primitive(p) => primitive_type(p),
        ArrayItem::Ref(r) => ref_type(r, domain),
    }
}

/// The Rust type of a schema `Type`, as it appears as a struct field (inline
/// enums/objects are not expected here — callers hoist those before calling
/// this, see [`emit_properties_struct`]).
fn scalar_type(ty: &Type, domain: &str) -> TokenStream {
    match ty {
        Type::Primitive(p) => primitive_type(p),
        Type::Ref(r) => ref_type(r, domain),
        Type::Array(item) => {
            let inner = array_item_type(item, domain);
            quote! { Vec<#inner> }
        }
        Type::Object(None) => quote! { HashMap<String, String> },
        Type::Object(Some(_)) | Type::Enum(_) => quote! { Value },
    }
}

fn emit_type_def(type_def: &crate::schema::TypeDef, domain: &str) -> Result<TokenStream> {
    let name = type_name(&type_def.id);
    let doc = type_def.description.as_deref().unwrap_or_default();
    let ident = format_ident!("{}", name);

    match &type_def.inner {
        Type::Enum(values) => Ok(emit_enum(&ident, doc, values)),
        Type::Object(Some(props)) => Ok(emit_properties_struct(&ident, doc, props, domain)),
        Type::Object(None) => Ok(quote! {
            #[doc = #doc]
            pub type #ident = HashMap<String, String>;
        }),
        Type::Array(item) => {
            let inner = array_item_type(item, domain);
            Ok(quote! {
                #[doc = #doc]
                pub type #ident = Vec<#inner>;
            })
        }
        Type::Primitive(p) => {
            let inner = primitive_type(p);
            Ok(quote! {
                #[doc = #doc]
                pub type #ident = #inner;
            })
        }
        Type::Ref(r) => {
            let inner = ref_type(r, domain);
            Ok(quote! {
                #[doc = #doc]
                pub type #ident = #inner;
            })
        }
    }
}

fn emit_enum(ident: &syn::Ident, doc: &str, values: &[String]) -> TokenStream {
    let variants = values.iter().map(|v| {
        let variant_ident = format_ident!("{}", type_name(v));
        quote! {
            #[serde(rename = #v)]
            #variant_ident
        }
    });
    quote! {
        #[doc = #doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum #ident {
            #(#variants),*
        }
    }
}

/// Emit a struct for `props`, hoisting any inline enum property into its own
/// auxiliary type named `{root_name}{PropertyName}` ahead of the struct.
fn emit_properties_struct(
    ident: &syn::Ident,
    doc: &str,
    props: &[PropertyDef],
    domain: &str,
) -> TokenStream {
    let root_name = ident.to_string();
    let mut aux_items = Vec::new();
    let mut fields = Vec::new();

    for prop in props {
        let field_ident = format_ident!("{}", field_name(&prop.name));
        let field_doc = prop.description.as_deref().unwrap_or_default();
        let rename = &prop.name;

        let base_type = match &prop.inner {
            Type::Enum(values) => {
                let aux_name = naming::inline_enum_name(&root_name, &prop.name);
                let aux_ident = format_ident!("{}", aux_name);
                aux_items.push(emit_enum(&aux_ident, "", values));
                quote! { #aux_ident }
            }
            other => scalar_type(other, domain),
        };

        let field_type = if prop.optional {
            quote! { Option<#base_type> }
        } else {
            base_type
        };

        if prop.optional {
            fields.push(quote! {
                #[doc = #field_doc]
                #[serde(rename = #rename, default, skip_serializing_if = "Option::is_none")]
                pub #field_ident: #field_type
            });
        } else {
            fields.push(quote! {
                #[doc = #field_doc]
                #[serde(rename = #rename)]
                pub #field_ident: #field_type
            });
        }
    }

    quote! {
        #(#aux_items)*

        #[doc = #doc]
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        pub struct #ident {
            #(#fields),*
        }
    }
}

fn emit_command(domain_name: &str, command: &Command) -> Result<TokenStream> {
    let fn_ident = format_ident!("{}", function_name(&command.name));
    let doc = command.description.as_deref().unwrap_or_default();
    let method_id = format!("{}.{}", domain_name, command.name);

    let mut sig_params = vec![quote! { transport: &dyn Transport }];
    let mut required_inserts = Vec::new();
    let mut optional_inserts = Vec::new();

    for param in &command.parameters {
        let arg_ident = format_ident!("{}", field_name(&param.name));
        let wire_name = &param.name;
        let base_type = scalar_type(&param.inner, domain_name);

        if param.optional {
            sig_params.push(quote! { #arg_ident: Option<#base_type> });
            if param.inner.is_any() {
                optional_inserts.push(quote! {
                    insert_if_some(&mut params, #wire_name, #arg_ident.as_ref().map(encode_any));
                });
            } else {
                optional_inserts.push(quote! {
                    insert_if_some(
                        &mut params,
                        #wire_name,
                        #arg_ident.map(|v| serde_json::to_value(&v).expect("generated command parameter types always serialize")),
                    );
                });
            }
        } else {
            sig_params.push(quote! { #arg_ident: #base_type });
            if param.inner.is_any() {
                required_inserts.push(quote! {
                    params.insert(#wire_name.to_string(), encode_any(&#arg_ident));
                });
            } else {
                required_inserts.push(quote! {
                    params.insert(
                        #wire_name.to_string(),
                        serde_json::to_value(&#arg_ident).expect("generated command parameter types always serialize"),
                    );
                });
            }
        }
    }

    let has_params = !command.parameters.is_empty();
    let params_expr = if has_params {
        quote! {
            let mut params = Map::new();
            #(#required_inserts)*
            #(#optional_inserts)*
            Some(Value::Object(params))
        }
    } else {
        quote! { None }
    };

    let (return_type, decode, response_struct_item) = if command.returns.is_empty() {
        (quote! { () }, quote! { Ok(()) }, quote! {})
    } else {
        let response_ident = format_ident!("{}Response", type_name(&command.name));
        let response_struct = emit_properties_struct(&response_ident, "", &command.returns, domain_name);
        (
            quote! { #response_ident },
            quote! {
                let response: #response_ident = serde_json::from_value(value)
                    .map_err(|e| ProtocolError::Decode(e.to_string()))?;
                Ok(response)
            },
            response_struct,
        )
    };

    let value_binding = if command.returns.is_empty() {
        quote! { _value }
    } else {
        quote! { value }
    };

    // The response struct is a module-level sibling item, not part of the
    // function body: the fn signature's return type names it, and a type
    // defined inside a block isn't visible to its own enclosing signature.
    Ok(quote! {
        #response_struct_item

        #[doc = #doc]
        pub async fn #fn_ident(#(#sig_params),*) -> Result<#return_type, ProtocolError> {
            let params = { #params_expr };
            let #value_binding = transport
                .call(MethodId::from(#method_id), params, None, DEFAULT_CALL_TIMEOUT)
                .await?;
            #decode
        }
    })
}

fn emit_event(domain_name: &str, event: &Event) -> Result<TokenStream> {
    let ident = format_ident!("{}Event", type_name(&event.name));
    let doc = event.description.as_deref().unwrap_or_default();
    let method_id = format!("{}.{}", domain_name, event.name);
    let struct_def = emit_properties_struct(&ident, doc, &event.parameters, domain_name);

    Ok(quote! {
        #struct_def

        impl chrobot_types::Method for #ident {
            fn identifier(&self) -> MethodId {
                MethodId::from(#method_id)
            }
        }
    })
}
