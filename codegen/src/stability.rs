//! The stability filter (§4.2): drops anything the caller's
//! `(allow_experimental, allow_deprecated)` pair excludes.
//!
//! Filtering cascades: a domain that's dropped takes its types, commands and
//! events with it; an object type that's dropped takes its properties. A
//! domain, command or type that survives but had some of its members
//! filtered out keeps an empty `Vec` rather than disappearing itself — a
//! domain with zero surviving commands is still a domain worth generating a
//! (possibly type-only) module for.

use crate::schema::{Domain, Event, Command, Protocol, PropertyDef, Type, TypeDef};

/// Which items the caller wants generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StabilityOptions {
    pub allow_experimental: bool,
    pub allow_deprecated: bool,
}

impl StabilityOptions {
    fn keeps(&self, experimental: bool, deprecated: bool) -> bool {
        (!experimental || self.allow_experimental) && (!deprecated || self.allow_deprecated)
    }
}

/// Apply the filter to `protocol` in place.
pub fn filter_stability(protocol: &mut Protocol, opts: StabilityOptions) {
    protocol
        .domains
        .retain(|d| opts.keeps(d.experimental, d.deprecated));

    for domain in &mut protocol.domains {
        filter_domain(domain, opts);
    }
}

fn filter_domain(domain: &mut Domain, opts: StabilityOptions) {
    domain
        .types
        .retain(|t| opts.keeps(t.experimental, t.deprecated));
    domain
        .commands
        .retain(|c| opts.keeps(c.experimental, c.deprecated));
    domain
        .events
        .retain(|e| opts.keeps(e.experimental, e.deprecated));

    for type_def in &mut domain.types {
        filter_type_def(type_def, opts);
    }
    for command in &mut domain.commands {
        filter_command(command, opts);
    }
    for event in &mut domain.events {
        filter_event(event, opts);
    }
}

fn filter_type_def(type_def: &mut TypeDef, opts: StabilityOptions) {
    filter_type(&mut type_def.inner, opts);
}

fn filter_command(command: &mut Command, opts: StabilityOptions) {
    filter_properties(&mut command.parameters, opts);
    filter_properties(&mut command.returns, opts);
}

fn filter_event(event: &mut Event, opts: StabilityOptions) {
    filter_properties(&mut event.parameters, opts);
}

fn filter_properties(props: &mut Vec<PropertyDef>, opts: StabilityOptions) {
    props.retain(|p| opts.keeps(p.experimental, p.deprecated));
    for prop in props.iter_mut() {
        filter_type(&mut prop.inner, opts);
    }
}

fn filter_type(ty: &mut Type, opts: StabilityOptions) {
    if let Type::Object(Some(props)) = ty {
        filter_properties(props, opts);
    }
}
