//! # Attribute Mapping
//!
//! Converts between property values and directory attributes.
//!
//! Each registration ties a property to one attribute, optionally with a
//! forward transform (value -> raw strings) and a reverse transform (raw
//! strings -> value). Without transforms, multi-valued properties map
//! element by element and single-valued ones become a one-element list;
//! reading back takes the first raw value.
//!
//! [`Mapping::map_diff`] turns a property diff into modlist triples. The
//! same forward transform is used for both sides, so two values that
//! render to the same raw strings never produce a change.

use crate::directory::{Attributes, Modification};
use crate::property::{self, PropertyDescriptor};
use crate::value::Value;
use std::collections::BTreeMap;

pub type MapFn = fn(&Value) -> Vec<String>;
pub type UnmapFn = fn(&[String]) -> Value;

/// One `(property, old, new)` entry of an object diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyChange {
    pub property: String,
    pub old: Value,
    pub new: Value,
}

#[derive(Clone, Copy)]
struct AttributeMap {
    property: &'static str,
    attribute: &'static str,
    map: Option<MapFn>,
    unmap: Option<UnmapFn>,
}

#[derive(Clone, Default)]
pub struct Mapping {
    entries: Vec<AttributeMap>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `property` <-> `attribute`. A later registration for the
    /// same property replaces the earlier one.
    pub fn register(
        &mut self,
        property: &'static str,
        attribute: &'static str,
        map: Option<MapFn>,
        unmap: Option<UnmapFn>,
    ) {
        self.unregister(property);
        self.entries.push(AttributeMap {
            property,
            attribute,
            map,
            unmap,
        });
    }

    pub fn with(
        mut self,
        property: &'static str,
        attribute: &'static str,
        map: Option<MapFn>,
        unmap: Option<UnmapFn>,
    ) -> Self {
        self.register(property, attribute, map, unmap);
        self
    }

    pub fn unregister(&mut self, property: &str) {
        self.entries.retain(|e| e.property != property);
    }

    fn entry(&self, property: &str) -> Option<&AttributeMap> {
        self.entries.iter().find(|e| e.property == property)
    }

    /// Attribute a property is stored in.
    pub fn attribute_name(&self, property: &str) -> Option<&'static str> {
        self.entry(property).map(|e| e.attribute)
    }

    /// Property backed by `attribute`, compared case-insensitively.
    pub fn property_name(&self, attribute: &str) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|e| e.attribute.eq_ignore_ascii_case(attribute))
            .map(|e| e.property)
    }

    pub fn properties(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|e| e.property)
    }

    /// Raw strings for a property value.
    pub fn map_value(&self, property: &str, value: &Value) -> Vec<String> {
        match self.entry(property).and_then(|e| e.map) {
            Some(map) => map(value),
            None => value.as_list(),
        }
    }

    /// Property value for raw strings.
    pub fn unmap_value(&self, property: &str, raw: &[String], multivalue: bool) -> Value {
        match self.entry(property).and_then(|e| e.unmap) {
            Some(unmap) => unmap(raw),
            None if multivalue => Value::List(raw.to_vec()),
            None => raw.first().cloned().map(Value::Text).unwrap_or_default(),
        }
    }

    /// Property values for every mapped attribute present in `attrs`.
    pub fn map_dict(
        &self,
        attrs: &Attributes,
        properties: &[PropertyDescriptor],
    ) -> BTreeMap<String, Value> {
        let mut values = BTreeMap::new();
        for entry in &self.entries {
            let Some(raw) = attrs.get(entry.attribute) else {
                continue;
            };
            let multivalue = property::find(properties, entry.property)
                .map(|p| p.multivalue)
                .unwrap_or(false);
            values.insert(
                entry.property.to_string(),
                self.unmap_value(entry.property, raw, multivalue),
            );
        }
        values
    }

    /// Modlist triples for a property diff. Unmapped properties and
    /// changes that render identically are skipped.
    pub fn map_diff(&self, changes: &[PropertyChange]) -> Vec<Modification> {
        let mut modlist = Vec::new();
        for change in changes {
            let Some(attribute) = self.attribute_name(&change.property) else {
                continue;
            };
            let old = self.map_value(&change.property, &change.old);
            let new = self.map_value(&change.property, &change.new);
            if old != new {
                modlist.push(Modification::new(attribute, old, new));
            }
        }
        modlist
    }

    /// True when both values render to the same raw strings.
    pub fn map_cmp(&self, property: &str, old: &Value, new: &Value) -> bool {
        if self.entry(property).is_none() {
            return old == new;
        }
        self.map_value(property, old) == self.map_value(property, new)
    }
}

/// `"1"`/`"0"` stored as `TRUE`/`FALSE`.
pub fn boolean_to_ldap(value: &Value) -> Vec<String> {
    match value.as_text() {
        Some("1") => vec!["TRUE".to_string()],
        Some("0") => vec!["FALSE".to_string()],
        _ => Vec::new(),
    }
}

pub fn boolean_from_ldap(raw: &[String]) -> Value {
    match raw.first().map(|s| s.to_uppercase()) {
        Some(s) if s == "TRUE" || s == "1" => Value::text("1"),
        Some(_) => Value::text("0"),
        None => Value::None,
    }
}

/// Integers are stored without leading zeros or whitespace.
pub fn integer_to_ldap(value: &Value) -> Vec<String> {
    value
        .as_list()
        .into_iter()
        .map(|v| v.trim().parse::<i64>().map(|n| n.to_string()).unwrap_or(v))
        .collect()
}
