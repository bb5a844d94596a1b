//! # Directory Client
//!
//! The engine never talks LDAP itself. Everything it needs from the
//! directory goes through the [`DirectoryClient`] trait: reads, searches,
//! add/modify/delete/rename, the schema and effective policies.
//!
//! ## Data Types
//!
//! - [`Attributes`]: the attribute set of one entry. Attribute names are
//!   case-insensitive, values are ordered multi-valued strings.
//! - [`Modification`]: one `(attribute, old, new)` triple of a modlist. An
//!   empty `old` means "add these values", an empty `new` means "delete these
//!   values", both non-empty means "replace with `new`".
//! - [`Filter`]: typed search filter, rendered to RFC 4515 text for logging.
//! - [`Schema`]: object class definitions (kind, MUST, MAY, superclasses).
//! - [`PolicyMap`]: effective policy attributes at a DN.
//!
//! ## Implementations
//!
//! - [`MemDirectory`]: in-memory directory with fault injection. Used by the
//!   test suite and by embedders that want to dry-run changes.
//!
//! Network transports are external; they implement the same trait.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

pub mod filter;
pub mod mem;
pub mod schema;

pub use filter::Filter;
pub use mem::{MemDirectory, Operation};
pub use schema::{ObjectClassDef, ObjectClassKind, Schema};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("No such object: {0}")]
    NoSuchObject(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Operation not allowed on non-leaf: {0}")]
    NotAllowedOnNonLeaf(String),

    #[error("Object class violation: {0}")]
    ObjectClassViolation(String),

    #[error("Directory unavailable: {0}")]
    Unavailable(String),
}

pub type DirResult<T> = std::result::Result<T, DirectoryError>;

/// Search scope relative to the search base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Base,
    One,
    Sub,
}

/// Attribute set of an entry.
///
/// Lookups ignore the case of attribute names; the spelling used on first
/// insert is kept for iteration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    entries: BTreeMap<String, (String, Vec<String>)>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.entries
            .get(&name.to_lowercase())
            .map(|(_, values)| values.as_slice())
    }

    /// Values of `name`, or an empty list.
    pub fn values(&self, name: &str) -> Vec<String> {
        self.get(name).map(|v| v.to_vec()).unwrap_or_default()
    }

    pub fn first(&self, name: &str) -> Option<&str> {
        self.get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_lowercase())
    }

    /// True if `name` holds `value`, compared case-insensitively.
    pub fn has_value(&self, name: &str, value: &str) -> bool {
        self.get(name)
            .map(|values| values.iter().any(|v| v.eq_ignore_ascii_case(value)))
            .unwrap_or(false)
    }

    /// Replace the values of `name`. An empty list removes the attribute.
    pub fn set(&mut self, name: &str, values: Vec<String>) {
        let key = name.to_lowercase();
        if values.is_empty() {
            self.entries.remove(&key);
            return;
        }
        match self.entries.get_mut(&key) {
            Some((_, existing)) => *existing = values,
            None => {
                self.entries.insert(key, (name.to_string(), values));
            }
        }
    }

    /// Append values not yet present.
    pub fn add_values(&mut self, name: &str, values: &[String]) {
        let mut current = self.values(name);
        for value in values {
            if !current.contains(value) {
                current.push(value.clone());
            }
        }
        self.set(name, current);
    }

    /// Drop the given values; removes the attribute when nothing is left.
    pub fn remove_values(&mut self, name: &str, values: &[String]) {
        let current: Vec<String> = self
            .values(name)
            .into_iter()
            .filter(|v| !values.contains(v))
            .collect();
        self.set(name, current);
    }

    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        self.entries
            .remove(&name.to_lowercase())
            .map(|(_, values)| values)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .values()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.values().map(|(name, _)| name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Apply a modlist with LDAP modify semantics.
    pub fn apply(&mut self, modlist: &[Modification]) {
        for m in modlist {
            match (m.old.is_empty(), m.new.is_empty()) {
                (_, false) if !m.old.is_empty() => self.set(&m.attr, m.new.clone()),
                (true, false) => self.add_values(&m.attr, &m.new),
                (false, true) => self.remove_values(&m.attr, &m.old),
                _ => {}
            }
        }
    }

    /// Collapse an add list into an attribute set, merging repeated names.
    pub fn from_addlist(addlist: &[Modification]) -> Self {
        let mut attrs = Attributes::new();
        for m in addlist {
            attrs.add_values(&m.attr, &m.new);
        }
        attrs
    }
}

impl<S: Into<String>> FromIterator<(S, Vec<String>)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (S, Vec<String>)>>(iter: I) -> Self {
        let mut attrs = Attributes::new();
        for (name, values) in iter {
            let name = name.into();
            attrs.add_values(&name, &values);
        }
        attrs
    }
}

/// One `(attribute, old values, new values)` triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modification {
    pub attr: String,
    pub old: Vec<String>,
    pub new: Vec<String>,
}

impl Modification {
    pub fn new(attr: impl Into<String>, old: Vec<String>, new: Vec<String>) -> Self {
        Self {
            attr: attr.into(),
            old,
            new,
        }
    }

    /// Entry for an add list: only the new values matter.
    pub fn add(attr: impl Into<String>, values: Vec<String>) -> Self {
        Self::new(attr, Vec::new(), values)
    }

    pub fn is_add(&self) -> bool {
        self.old.is_empty() && !self.new.is_empty()
    }

    pub fn is_delete(&self) -> bool {
        !self.old.is_empty() && self.new.is_empty()
    }

    pub fn is_replace(&self) -> bool {
        !self.old.is_empty() && !self.new.is_empty()
    }

    pub fn targets(&self, attr: &str) -> bool {
        self.attr.eq_ignore_ascii_case(attr)
    }
}

/// A value contributed by a policy, with its origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyValue {
    pub value: Vec<String>,
    pub fixed: bool,
    /// DN of the policy object that supplied the value.
    pub policy: String,
}

/// Policy object class -> attribute name -> value.
pub type PolicyMap = BTreeMap<String, BTreeMap<String, PolicyValue>>;

/// Everything the engine needs from a directory server.
///
/// Methods take `&self`; implementations use interior mutability where
/// needed. Objects share one client through an `Rc`.
pub trait DirectoryClient {
    /// Root DN of the directory.
    fn base(&self) -> String;

    fn get(&self, dn: &str) -> DirResult<Option<Attributes>>;

    fn search(
        &self,
        base: &str,
        scope: Scope,
        filter: &Filter,
        attrs: &[&str],
    ) -> DirResult<Vec<(String, Attributes)>>;

    fn add(&self, dn: &str, attrs: &Attributes) -> DirResult<()>;

    fn modify(&self, dn: &str, modlist: &[Modification]) -> DirResult<()>;

    fn delete(&self, dn: &str) -> DirResult<()>;

    /// Rename `old_dn` to `new_dn`, possibly below a different parent.
    fn rename(&self, old_dn: &str, new_dn: &str) -> DirResult<()>;

    fn schema(&self) -> DirResult<Schema>;

    /// Effective policy values at `dn`. When `faked` is non-empty those
    /// references stand in for the entry's own ones.
    fn get_policies(&self, dn: &str, faked: &[String]) -> DirResult<PolicyMap>;

    /// Like [`get`](Self::get) but a missing entry is an error.
    fn get_required(&self, dn: &str) -> DirResult<Attributes> {
        self.get(dn)?
            .ok_or_else(|| DirectoryError::NoSuchObject(dn.to_string()))
    }

    fn search_dn(&self, base: &str, scope: Scope, filter: &Filter) -> DirResult<Vec<String>> {
        Ok(self
            .search(base, scope, filter, &["dn"])?
            .into_iter()
            .map(|(dn, _)| dn)
            .collect())
    }

    /// DNs of the immediate children of `dn`.
    fn children(&self, dn: &str) -> DirResult<Vec<String>> {
        self.search_dn(dn, Scope::One, &Filter::present("objectClass"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_attribute_names_are_case_insensitive() {
        let mut attrs = Attributes::new();
        attrs.set("objectClass", strings(&["top"]));
        assert_eq!(attrs.get("objectclass").unwrap(), &["top".to_string()]);
        attrs.add_values("OBJECTCLASS", &strings(&["person", "top"]));
        assert_eq!(attrs.values("objectClass"), strings(&["top", "person"]));
        assert_eq!(attrs.names(), vec!["objectClass".to_string()]);
    }

    #[test]
    fn test_apply_uses_modify_semantics() {
        let mut attrs: Attributes = vec![("mail", strings(&["a", "b"]))].into_iter().collect();
        attrs.apply(&[
            Modification::new("mail", vec![], strings(&["c"])),
            Modification::new("mail", strings(&["a"]), vec![]),
            Modification::new("cn", vec![], strings(&["x"])),
            Modification::new("cn", strings(&["x"]), strings(&["y"])),
        ]);
        assert_eq!(attrs.values("mail"), strings(&["b", "c"]));
        assert_eq!(attrs.values("cn"), strings(&["y"]));
    }

    #[test]
    fn test_from_addlist_merges_repeated_names() {
        let attrs = Attributes::from_addlist(&[
            Modification::add("objectClass", strings(&["top", "person"])),
            Modification::add("cn", strings(&["pc1"])),
            Modification::add("objectClass", strings(&["univentionHost"])),
        ]);
        assert_eq!(
            attrs.values("objectClass"),
            strings(&["top", "person", "univentionHost"])
        );
    }
}
