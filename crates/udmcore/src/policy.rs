//! # Policy Overlays
//!
//! A policy object edited on behalf of another object (the *referring*
//! object) runs in result mode:
//!
//! - Reads return the value in effect at the referring object, as computed
//!   by the directory, unless the overlay holds its own value. Fixed policy
//!   values always win.
//! - Writes of a value pinned by another policy fail with
//!   [`UdmError::PolicyFixedAttribute`]. Writes that change nothing mark
//!   nothing.
//! - Creating the overlay picks a free name by appending `_uvN` to the
//!   referring object's name, giving up after
//!   `policy_create_max_retries` attempts.

use crate::directory::PolicyValue;
use crate::error::{Result, UdmError};
use crate::object::DirectoryObject;
use crate::syntax::Syntax;
use crate::value::Value;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use tracing::{debug, warn};

static UNIQUE_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.*)_uv(\d+)$").expect("valid unique suffix pattern"));

#[derive(Debug, Clone, Default)]
pub struct PolicyState {
    pub result_mode: bool,
    /// DN of the policy this overlay was copied from.
    pub cloned: Option<String>,
    /// A property was changed since the overlay was attached.
    pub changes: bool,
    pub referring_dn: Option<String>,
    pub referring_position: Option<String>,
    values: Option<BTreeMap<String, Value>>,
    origins: BTreeMap<String, PolicyValue>,
}

pub(crate) fn in_result_mode(object: &DirectoryObject) -> bool {
    object.policy_state().map(|s| s.result_mode).unwrap_or(false)
}

pub(crate) fn has_changes(object: &DirectoryObject) -> bool {
    object.policy_state().map(|s| s.changes).unwrap_or(false)
}

/// Put a new policy object in result mode for `referring`.
pub(crate) fn attach(policy: &mut DirectoryObject, referring: &DirectoryObject) {
    if let Some(state) = policy.policy_state_mut() {
        state.result_mode = true;
        state.changes = false;
        state.values = None;
        state.referring_dn = referring.dn().map(str::to_string);
        state.referring_position = Some(referring.position().to_string());
    }
    copy_identifier(policy, referring);
}

/// Turn a loaded policy into an unsaved copy for `referring`.
pub(crate) fn clone_for(policy: &mut DirectoryObject, referring: &DirectoryObject) {
    let source = policy.dn.take();
    policy.exists = false;
    policy.old_info.clear();
    policy.old_attrs = Default::default();
    attach(policy, referring);
    if let Some(state) = policy.policy_state_mut() {
        state.cloned = source;
    }
}

/// Name the policy after the referring object.
pub(crate) fn copy_identifier(policy: &mut DirectoryObject, referring: &DirectoryObject) {
    let Some(source) = referring.object_type().identifying_properties().next() else {
        return;
    };
    let value = referring.info(source.name);
    if value.is_empty() {
        return;
    }
    let targets: Vec<&'static str> = policy
        .object_type()
        .identifying_properties()
        .map(|p| p.name)
        .collect();
    for target in targets {
        policy.info.insert(target.to_string(), value.clone());
    }
}

/// Compute and cache the values in effect at the referring object.
pub(crate) fn policy_result(policy: &mut DirectoryObject, faked: &[String]) -> Result<()> {
    let Some(state) = policy.policy_state() else {
        return Ok(());
    };
    if !state.result_mode || (state.values.is_some() && faked.is_empty()) {
        return Ok(());
    }
    let target = state
        .referring_dn
        .clone()
        .or_else(|| state.referring_position.clone())
        .unwrap_or_else(|| policy.ctx.directory.base());
    let Some(object_class) = policy.object_type().policy_object_class() else {
        return Ok(());
    };

    let effective = policy.ctx.directory.get_policies(&target, faked)?;
    let mut values = BTreeMap::new();
    let mut origins = BTreeMap::new();
    for (class, attributes) in effective {
        if !class.eq_ignore_ascii_case(object_class) {
            continue;
        }
        for (attribute, origin) in attributes {
            let Some(property) = policy.object_type().mapping.property_name(&attribute) else {
                continue;
            };
            let multivalue = policy
                .object_type()
                .property(property)
                .map(|p| p.multivalue)
                .unwrap_or(false);
            let value = policy
                .object_type()
                .mapping
                .unmap_value(property, &origin.value, multivalue);
            values.insert(property.to_string(), value);
            origins.insert(property.to_string(), origin);
        }
    }
    debug!(target = %target, values = values.len(), "resolved policy values");
    if let Some(state) = policy.policy_state_mut() {
        state.values = Some(values);
        state.origins = origins;
    }
    Ok(())
}

/// Value to return for `name` in result mode, if the policy decides it.
pub(crate) fn overlay_value(policy: &mut DirectoryObject, name: &str) -> Result<Option<Value>> {
    if !in_result_mode(policy) {
        return Ok(None);
    }
    policy_result(policy, &[])?;
    let Some(state) = policy.policy_state() else {
        return Ok(None);
    };
    let Some(value) = state.values.as_ref().and_then(|v| v.get(name)) else {
        return Ok(None);
    };
    let fixed = state.origins.get(name).map(|o| o.fixed).unwrap_or(false);
    let own = policy.info.contains_key(name) || policy.old_info.contains_key(name);
    if !own || fixed {
        return Ok(Some(value.clone()));
    }
    Ok(None)
}

pub(crate) fn set_value(policy: &mut DirectoryObject, name: &str, value: Value) -> Result<()> {
    if !in_result_mode(policy) {
        return policy.set_value(name, value);
    }
    policy_result(policy, &[])?;
    let descriptor = policy.descriptor(name)?;
    let parsed = descriptor
        .parse(&value)
        .map_err(|message| UdmError::syntax(name, message))?;

    let (effective, origin, cloned) = match policy.policy_state() {
        Some(state) => (
            state.values.as_ref().and_then(|v| v.get(name)).cloned(),
            state.origins.get(name).cloned(),
            state.cloned.clone(),
        ),
        None => (None, None, None),
    };

    if let Some(effective) = effective {
        let from_clone = match (&origin, &cloned) {
            (Some(origin), Some(cloned)) => crate::dn::compare(&origin.policy, cloned),
            _ => false,
        };
        let differs_from_own = policy
            .info
            .get(name)
            .map(|own| *own != parsed)
            .unwrap_or(false);
        if effective != parsed || from_clone || differs_from_own {
            let fixed = origin.map(|o| o.fixed).unwrap_or(false);
            if fixed && !from_clone {
                return Err(UdmError::PolicyFixedAttribute(name.to_string()));
            }
            policy.set_value(name, value)?;
            mark_changed(policy, name);
        }
        return Ok(());
    }

    // a boolean set to its default on a brand-new overlay is no change
    if policy.old_info.is_empty()
        && matches!(descriptor.syntax, Syntax::Boolean)
        && descriptor.default.resolve(policy, descriptor.multivalue) == parsed
    {
        return Ok(());
    }
    policy.set_value(name, value)?;
    mark_changed(policy, name);
    Ok(())
}

fn mark_changed(policy: &mut DirectoryObject, name: &str) {
    if policy.has_changed(name) {
        if let Some(state) = policy.policy_state_mut() {
            state.changes = true;
        }
    }
}

/// `name` -> `name_uv1`, `name_uv1` -> `name_uv2`.
pub fn next_unique_name(name: &str) -> String {
    match UNIQUE_SUFFIX.captures(name) {
        Some(captures) => {
            let stem = captures.get(1).map(|m| m.as_str()).unwrap_or(name);
            let n: u64 = captures
                .get(2)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(0);
            format!("{}_uv{}", stem, n + 1)
        }
        None => format!("{}_uv1", name),
    }
}

fn make_unique(policy: &mut DirectoryObject) {
    let names: Vec<&'static str> = policy
        .object_type()
        .identifying_properties()
        .map(|p| p.name)
        .collect();
    for name in names {
        if let Some(current) = policy.info(name).as_text().map(str::to_string) {
            policy
                .info
                .insert(name.to_string(), Value::text(next_unique_name(&current)));
        }
    }
}

/// Create a result-mode overlay under the first free name.
pub(crate) fn create_unique(policy: &mut DirectoryObject) -> Result<String> {
    let attempts = policy.ctx.config.policy_create_max_retries;
    for attempt in 1..=attempts {
        match policy.create_once() {
            Err(e) if e.is_already_exists() => {
                debug!(attempt, error = %e, "policy name taken, retrying");
                make_unique(policy);
            }
            Ok(dn) => {
                if let Some(state) = policy.policy_state_mut() {
                    state.changes = false;
                    state.cloned = None;
                    state.values = None;
                }
                return Ok(dn);
            }
            Err(e) => return Err(e),
        }
    }
    let name = policy
        .object_type()
        .identifying_properties()
        .next()
        .map(|p| policy.info(p.name).as_text().unwrap_or_default().to_string())
        .unwrap_or_default();
    warn!(name = %name, attempts, "no free policy name found");
    Err(UdmError::PolicyRetriesExhausted { name, attempts })
}

pub(crate) fn fixed_attributes(policy: &mut DirectoryObject) -> Result<BTreeMap<String, bool>> {
    policy_result(policy, &[])?;
    Ok(policy
        .policy_state()
        .map(|s| {
            s.origins
                .iter()
                .map(|(k, o)| (k.clone(), o.fixed))
                .collect()
        })
        .unwrap_or_default())
}

pub(crate) fn empty_attributes(policy: &mut DirectoryObject) -> Result<BTreeMap<String, bool>> {
    policy_result(policy, &[])?;
    Ok(policy
        .policy_state()
        .map(|s| {
            s.origins
                .iter()
                .map(|(k, o)| (k.clone(), o.value.is_empty()))
                .collect()
        })
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_unique_name() {
        assert_eq!(next_unique_name("pc1"), "pc1_uv1");
        assert_eq!(next_unique_name("pc1_uv1"), "pc1_uv2");
        assert_eq!(next_unique_name("pc1_uv9"), "pc1_uv10");
        assert_eq!(next_unique_name("a_uvx"), "a_uvx_uv1");
    }
}
