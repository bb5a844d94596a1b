//! # Object Types
//!
//! An [`ObjectType`] is the declarative description of one kind of
//! directory object: its properties, how they map to attributes, its
//! options, where it may live and which operations it supports. The
//! lifecycle in [`crate::object`] is generic; everything type-specific is
//! either data on the descriptor or one of the [`ObjectKind`]
//! specializations.
//!
//! The [`ModuleRegistry`] holds every known type and recognizes the type of
//! an existing entry.

use crate::directory::{Attributes, Modification};
use crate::error::{Result, UdmError};
use crate::hooks::ExtendedAttribute;
use crate::layout::Tab;
use crate::mapping::Mapping;
use crate::object::DirectoryObject;
use crate::options::ObjectOption;
use crate::property::{self, PropertyDescriptor};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// Recognizes entries of a type from their DN and attributes.
pub type IdentifyFn = fn(&str, &Attributes) -> bool;

/// Type-specific attributes for the add list of a new entry.
pub type AddlistFn = fn(&DirectoryObject) -> Result<Vec<Modification>>;

/// Rewrites the generic modlist of an existing entry.
pub type ModlistFn = fn(&DirectoryObject, Vec<Modification>) -> Result<Vec<Modification>>;

/// Derives property values the mapping cannot express from a freshly read
/// entry.
pub type LoadFn = fn(&mut DirectoryObject);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operations {
    pub add: bool,
    pub edit: bool,
    pub remove: bool,
    pub search: bool,
    pub moves: bool,
    pub subtree_move: bool,
}

impl Operations {
    pub const ALL: Operations = Operations {
        add: true,
        edit: true,
        remove: true,
        search: true,
        moves: true,
        subtree_move: true,
    };

    /// Everything but moving.
    pub const FIXED: Operations = Operations {
        add: true,
        edit: true,
        remove: true,
        search: true,
        moves: false,
        subtree_move: false,
    };

    pub const fn without_subtree_move(mut self) -> Self {
        self.subtree_move = false;
        self
    }
}

/// Which lifecycle specialization objects of a type get.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Generic,
    Computer,
    Policy {
        /// Object class carrying the policy's attributes.
        object_class: &'static str,
    },
}

pub struct ObjectType {
    pub name: &'static str,
    pub short_description: &'static str,
    pub properties: Vec<PropertyDescriptor>,
    pub mapping: Mapping,
    pub options: &'static [ObjectOption],
    pub layout: &'static [Tab],
    /// Types an object of this type must live below; empty means anywhere.
    pub superordinates: &'static [&'static str],
    /// May contain other objects.
    pub childs: bool,
    pub operations: Operations,
    pub kind: ObjectKind,
    /// Object classes every entry of this type carries.
    pub object_classes: &'static [&'static str],
    pub addlist: Option<AddlistFn>,
    pub modlist: Option<ModlistFn>,
    pub post_load: Option<LoadFn>,
    pub identify: IdentifyFn,
    /// Containers (relative to the base) new objects go to by default.
    pub default_containers: &'static [&'static str],
    pub extended: Vec<ExtendedAttribute>,
}

impl fmt::Debug for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectType")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("properties", &self.properties.len())
            .field("extended", &self.extended)
            .finish()
    }
}

impl ObjectType {
    pub fn new(
        name: &'static str,
        short_description: &'static str,
        properties: &[PropertyDescriptor],
        mapping: Mapping,
        identify: IdentifyFn,
    ) -> Self {
        Self {
            name,
            short_description,
            properties: properties.to_vec(),
            mapping,
            options: &[],
            layout: &[],
            superordinates: &[],
            childs: false,
            operations: Operations::ALL,
            kind: ObjectKind::Generic,
            object_classes: &[],
            addlist: None,
            modlist: None,
            post_load: None,
            identify,
            default_containers: &[],
            extended: Vec::new(),
        }
    }

    pub fn options(mut self, options: &'static [ObjectOption]) -> Self {
        self.options = options;
        self
    }

    pub fn layout(mut self, layout: &'static [Tab]) -> Self {
        self.layout = layout;
        self
    }

    pub fn superordinates(mut self, types: &'static [&'static str]) -> Self {
        self.superordinates = types;
        self
    }

    pub fn childs(mut self) -> Self {
        self.childs = true;
        self
    }

    pub fn operations(mut self, operations: Operations) -> Self {
        self.operations = operations;
        self
    }

    pub fn kind(mut self, kind: ObjectKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn object_classes(mut self, classes: &'static [&'static str]) -> Self {
        self.object_classes = classes;
        self
    }

    pub fn addlist(mut self, addlist: AddlistFn) -> Self {
        self.addlist = Some(addlist);
        self
    }

    pub fn modlist(mut self, modlist: ModlistFn) -> Self {
        self.modlist = Some(modlist);
        self
    }

    pub fn post_load(mut self, post_load: LoadFn) -> Self {
        self.post_load = Some(post_load);
        self
    }

    pub fn default_containers(mut self, containers: &'static [&'static str]) -> Self {
        self.default_containers = containers;
        self
    }

    /// Register an extended attribute: its property joins the type and is
    /// mapped to the extension's attribute.
    pub fn extend(mut self, extension: ExtendedAttribute) -> Self {
        self.properties.retain(|p| p.name != extension.property.name);
        self.properties.push(extension.property);
        self.mapping
            .register(extension.property.name, extension.attribute, None, None);
        self.extended.push(extension);
        self
    }

    pub fn property(&self, name: &str) -> Result<&PropertyDescriptor> {
        property::find(&self.properties, name)
            .ok_or_else(|| UdmError::NoSuchProperty(format!("{}: {}", self.name, name)))
    }

    pub fn identifying_properties(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.properties.iter().filter(|p| p.identifies)
    }

    pub fn is_policy(&self) -> bool {
        matches!(self.kind, ObjectKind::Policy { .. })
    }

    pub fn policy_object_class(&self) -> Option<&'static str> {
        match self.kind {
            ObjectKind::Policy { object_class } => Some(object_class),
            _ => None,
        }
    }
}

/// Every known object type, by name.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    types: BTreeMap<&'static str, Rc<ObjectType>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in type.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for object_type in crate::handlers::all() {
            registry.register(object_type);
        }
        registry
    }

    pub fn register(&mut self, object_type: ObjectType) {
        self.types.insert(object_type.name, Rc::new(object_type));
    }

    pub fn get(&self, name: &str) -> Result<Rc<ObjectType>> {
        self.types
            .get(name)
            .cloned()
            .ok_or_else(|| UdmError::UnsupportedOperation(format!("unknown object type {}", name)))
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.types.keys().copied()
    }

    /// Type of an existing entry. `univentionObjectType` wins; otherwise
    /// the first type whose identify function accepts the entry.
    pub fn identify(&self, dn: &str, attrs: &Attributes) -> Option<Rc<ObjectType>> {
        for declared in attrs.values("univentionObjectType") {
            if let Some(object_type) = self.types.get(declared.as_str()) {
                return Some(object_type.clone());
            }
        }
        self.types
            .values()
            .find(|t| (t.identify)(dn, attrs))
            .cloned()
    }

    /// Policy type whose attributes live in `object_class`.
    pub fn policy_type_for_object_class(&self, object_class: &str) -> Option<Rc<ObjectType>> {
        self.types
            .values()
            .find(|t| {
                t.policy_object_class()
                    .map(|oc| oc.eq_ignore_ascii_case(object_class))
                    .unwrap_or(false)
            })
            .cloned()
    }
}

/// True if `attrs` carries every class in `classes`.
pub fn has_object_classes(attrs: &Attributes, classes: &[&str]) -> bool {
    classes.iter().all(|oc| attrs.has_value("objectClass", oc))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &[&str])]) -> Attributes {
        pairs
            .iter()
            .map(|(k, v)| (*k, v.iter().map(|s| s.to_string()).collect::<Vec<_>>()))
            .collect()
    }

    #[test]
    fn test_identify_prefers_declared_type() {
        let registry = ModuleRegistry::builtin();
        let declared = attrs(&[
            ("objectClass", &["top", "organizationalRole"]),
            ("univentionObjectType", &["container/ou"]),
        ]);
        let found = registry.identify("cn=x,dc=example,dc=com", &declared).unwrap();
        assert_eq!(found.name, "container/ou");

        let plain = attrs(&[("objectClass", &["top", "organizationalUnit"]), ("ou", &["x"])]);
        let found = registry.identify("ou=x,dc=example,dc=com", &plain).unwrap();
        assert_eq!(found.name, "container/ou");

        let unknown = attrs(&[("objectClass", &["top", "device"])]);
        assert!(registry.identify("cn=x,dc=example,dc=com", &unknown).is_none());
    }

    #[test]
    fn test_policy_lookup_by_object_class() {
        let registry = ModuleRegistry::builtin();
        let found = registry
            .policy_type_for_object_class("univentionpolicypwhistory")
            .unwrap();
        assert_eq!(found.name, "policies/pwhistory");
        assert!(registry.get("nope/nope").is_err());
    }

    #[test]
    fn test_every_builtin_type_has_an_identifying_property() {
        let registry = ModuleRegistry::builtin();
        for name in registry.names() {
            let object_type = registry.get(name).unwrap();
            assert!(
                object_type.identifying_properties().count() > 0,
                "{} has no identifying property",
                name
            );
        }
    }
}
