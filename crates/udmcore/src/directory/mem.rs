use super::{
    Attributes, DirResult, DirectoryClient, DirectoryError, Filter, Modification, PolicyMap,
    PolicyValue, Schema, Scope,
};
use crate::dn;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// Attributes of a policy entry that describe the policy itself rather than
/// values handed down to referring objects.
const POLICY_META_ATTRIBUTES: &[&str] = &[
    "objectclass",
    "cn",
    "univentionobjecttype",
    "univentionobjectflag",
    "univentionpolicyobject",
    "univentionfixedattributes",
    "univentionemptyattributes",
    "univentionrequiredobjectclasses",
    "univentionprohibitedobjectclasses",
    "ldapfilter",
    "description",
];

/// Operations that can be made to fail on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Add,
    Modify,
    Delete,
    Rename,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Entry {
    dn: String,
    attrs: Attributes,
    /// Operational attributes are only returned when asked for by name.
    operational: Attributes,
}

#[derive(Debug)]
struct Fault {
    op: Operation,
    dn: String,
}

/// In-memory directory.
///
/// Uses `RefCell` for interior mutability since the engine is
/// single-threaded; every [`DirectoryClient`] method takes `&self`.
///
/// Behaves like a strict LDAP server where the engine depends on it:
/// adding needs an existing parent, deleting and renaming need a leaf,
/// renaming onto an existing DN (also one differing only in case) fails.
/// Schema rules are not enforced.
pub struct MemDirectory {
    base: String,
    entries: RefCell<BTreeMap<String, Entry>>,
    schema: RefCell<Schema>,
    faults: RefCell<Vec<Fault>>,
}

impl MemDirectory {
    /// Empty directory containing only the base entry.
    pub fn new(base: &str) -> Self {
        let directory = Self {
            base: base.to_string(),
            entries: RefCell::new(BTreeMap::new()),
            schema: RefCell::new(Schema::core()),
            faults: RefCell::new(Vec::new()),
        };
        let (attr, value) = dn::split_rdn(&dn::rdn(base));
        let root: Attributes = vec![
            ("objectClass", vec!["top".to_string(), "domain".to_string()]),
            (attr.as_str(), vec![value]),
        ]
        .into_iter()
        .collect();
        directory.insert_entry(base, root);
        directory
    }

    fn insert_entry(&self, dn: &str, attrs: Attributes) {
        let mut operational = Attributes::new();
        operational.set("entryUUID", vec![Uuid::new_v4().to_string()]);
        operational.set(
            "createTimestamp",
            vec![Utc::now().format("%Y%m%d%H%M%SZ").to_string()],
        );
        self.entries.borrow_mut().insert(
            dn::normalize(dn),
            Entry {
                dn: dn.to_string(),
                attrs,
                operational,
            },
        );
    }

    /// Store an entry without any checks. Test fixtures use this to build
    /// directory trees quickly.
    pub fn seed(&self, dn: &str, attrs: Attributes) {
        self.insert_entry(dn, attrs);
    }

    pub fn schema_mut(&self) -> std::cell::RefMut<'_, Schema> {
        self.schema.borrow_mut()
    }

    /// Make the next `op` on `dn` fail with [`DirectoryError::Unavailable`].
    pub fn fail_next(&self, op: Operation, dn: &str) {
        self.faults.borrow_mut().push(Fault {
            op,
            dn: dn::normalize(dn),
        });
    }

    fn check_fault(&self, op: Operation, target: &str) -> DirResult<()> {
        let target = dn::normalize(target);
        let mut faults = self.faults.borrow_mut();
        if let Some(pos) = faults.iter().position(|f| f.op == op && f.dn == target) {
            faults.remove(pos);
            return Err(DirectoryError::Unavailable(format!(
                "simulated {:?} failure on {}",
                op, target
            )));
        }
        Ok(())
    }

    pub fn exists(&self, dn: &str) -> bool {
        self.entries.borrow().contains_key(&dn::normalize(dn))
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// DNs of every entry, in normalized order.
    pub fn dns(&self) -> Vec<String> {
        self.entries.borrow().values().map(|e| e.dn.clone()).collect()
    }

    fn has_children(&self, key: &str) -> bool {
        self.entries
            .borrow()
            .keys()
            .any(|k| dn::parent(k).as_deref() == Some(key))
    }

    /// Dump every entry as JSON.
    pub fn export_json(&self) -> serde_json::Result<String> {
        let entries: Vec<Entry> = self.entries.borrow().values().cloned().collect();
        serde_json::to_string_pretty(&entries)
    }

    /// Load entries previously produced by [`export_json`](Self::export_json).
    pub fn import_json(&self, json: &str) -> serde_json::Result<usize> {
        let entries: Vec<Entry> = serde_json::from_str(json)?;
        let count = entries.len();
        let mut store = self.entries.borrow_mut();
        for entry in entries {
            store.insert(dn::normalize(&entry.dn), entry);
        }
        Ok(count)
    }

    fn policy_type(attrs: &Attributes) -> Option<String> {
        attrs.values("objectClass").into_iter().find(|oc| {
            let lower = oc.to_lowercase();
            lower.starts_with("univentionpolicy")
                && lower != "univentionpolicy"
                && lower != "univentionpolicyreference"
        })
    }

    fn apply_policy(&self, result: &mut PolicyMap, policy_dn: &str) {
        let Some(policy) = self.get(policy_dn).ok().flatten() else {
            return;
        };
        let Some(policy_type) = Self::policy_type(&policy) else {
            return;
        };
        let fixed: BTreeSet<String> = policy
            .values("univentionFixedAttributes")
            .iter()
            .map(|a| a.to_lowercase())
            .collect();
        let empty = policy.values("univentionEmptyAttributes");
        let slot = result.entry(policy_type).or_default();

        let mut values: Vec<(String, Vec<String>)> = policy
            .iter()
            .filter(|(name, _)| !POLICY_META_ATTRIBUTES.contains(&name.to_lowercase().as_str()))
            .map(|(name, values)| (name.to_string(), values.to_vec()))
            .collect();
        values.extend(empty.into_iter().map(|name| (name, Vec::new())));

        for (name, value) in values {
            if slot.get(&name).map(|v| v.fixed).unwrap_or(false) {
                continue;
            }
            let is_fixed = fixed.contains(&name.to_lowercase());
            slot.insert(
                name,
                PolicyValue {
                    value,
                    fixed: is_fixed,
                    policy: policy_dn.to_string(),
                },
            );
        }
    }
}

impl DirectoryClient for MemDirectory {
    fn base(&self) -> String {
        self.base.clone()
    }

    fn get(&self, target: &str) -> DirResult<Option<Attributes>> {
        Ok(self
            .entries
            .borrow()
            .get(&dn::normalize(target))
            .map(|e| e.attrs.clone()))
    }

    fn search(
        &self,
        base: &str,
        scope: Scope,
        filter: &Filter,
        attrs: &[&str],
    ) -> DirResult<Vec<(String, Attributes)>> {
        let base_key = dn::normalize(base);
        let depth = dn::explode(base).len();
        let entries = self.entries.borrow();
        let mut found = Vec::new();
        for (key, entry) in entries.iter() {
            let in_scope = match scope {
                Scope::Base => *key == base_key,
                Scope::One => dn::parent(key).as_deref() == Some(base_key.as_str()),
                Scope::Sub => dn::is_in_subtree(key, &base_key),
            };
            if !in_scope || !filter.matches(&entry.attrs) {
                continue;
            }
            let mut result = entry.attrs.clone();
            for name in attrs {
                if let Some(values) = entry.operational.get(name) {
                    result.set(name, values.to_vec());
                }
            }
            found.push((entry.dn.clone(), result));
        }
        // parents before children
        found.sort_by_key(|(dn, _)| dn::explode(dn).len().saturating_sub(depth));
        Ok(found)
    }

    fn add(&self, target: &str, attrs: &Attributes) -> DirResult<()> {
        self.check_fault(Operation::Add, target)?;
        let key = dn::normalize(target);
        if self.entries.borrow().contains_key(&key) {
            return Err(DirectoryError::AlreadyExists(target.to_string()));
        }
        if attrs.get("objectClass").is_none() {
            return Err(DirectoryError::ObjectClassViolation(format!(
                "{} has no objectClass",
                target
            )));
        }
        if let Some(parent) = dn::parent(target) {
            if !dn::compare(target, &self.base) && !self.exists(&parent) {
                return Err(DirectoryError::NoSuchObject(parent));
            }
        }
        self.insert_entry(target, attrs.clone());
        Ok(())
    }

    fn modify(&self, target: &str, modlist: &[Modification]) -> DirResult<()> {
        self.check_fault(Operation::Modify, target)?;
        let mut entries = self.entries.borrow_mut();
        let entry = entries
            .get_mut(&dn::normalize(target))
            .ok_or_else(|| DirectoryError::NoSuchObject(target.to_string()))?;
        entry.attrs.apply(modlist);
        Ok(())
    }

    fn delete(&self, target: &str) -> DirResult<()> {
        self.check_fault(Operation::Delete, target)?;
        let key = dn::normalize(target);
        if !self.entries.borrow().contains_key(&key) {
            return Err(DirectoryError::NoSuchObject(target.to_string()));
        }
        if self.has_children(&key) {
            return Err(DirectoryError::NotAllowedOnNonLeaf(target.to_string()));
        }
        self.entries.borrow_mut().remove(&key);
        Ok(())
    }

    fn rename(&self, old_dn: &str, new_dn: &str) -> DirResult<()> {
        self.check_fault(Operation::Rename, old_dn)?;
        let old_key = dn::normalize(old_dn);
        let new_key = dn::normalize(new_dn);
        if !self.entries.borrow().contains_key(&old_key) {
            return Err(DirectoryError::NoSuchObject(old_dn.to_string()));
        }
        if self.entries.borrow().contains_key(&new_key) {
            return Err(DirectoryError::AlreadyExists(new_dn.to_string()));
        }
        if self.has_children(&old_key) {
            return Err(DirectoryError::NotAllowedOnNonLeaf(old_dn.to_string()));
        }
        if let Some(parent) = dn::parent(new_dn) {
            if !self.exists(&parent) {
                return Err(DirectoryError::NoSuchObject(parent));
            }
        }

        let mut entries = self.entries.borrow_mut();
        let Some(mut entry) = entries.remove(&old_key) else {
            return Err(DirectoryError::NoSuchObject(old_dn.to_string()));
        };
        let (old_attr, old_value) = dn::split_rdn(&dn::rdn(old_dn));
        let (new_attr, new_value) = dn::split_rdn(&dn::rdn(new_dn));
        entry.attrs.remove_values(&old_attr, &[old_value]);
        entry.attrs.add_values(&new_attr, &[new_value]);
        entry.dn = new_dn.to_string();
        entries.insert(new_key, entry);
        Ok(())
    }

    fn schema(&self) -> DirResult<Schema> {
        Ok(self.schema.borrow().clone())
    }

    fn get_policies(&self, target: &str, faked: &[String]) -> DirResult<PolicyMap> {
        let mut chain: Vec<String> = Vec::new();
        let mut current = Some(target.to_string());
        while let Some(node) = current {
            if !dn::is_in_subtree(&node, &self.base) {
                break;
            }
            current = dn::parent(&node);
            chain.push(node);
        }
        chain.reverse();

        let mut result = PolicyMap::new();
        for node in &chain {
            let references = if dn::compare(node, target) && !faked.is_empty() {
                faked.to_vec()
            } else {
                self.get(node)?
                    .map(|attrs| attrs.values("univentionPolicyReference"))
                    .unwrap_or_default()
            };
            for reference in references {
                self.apply_policy(&mut result, &reference);
            }
        }
        Ok(result)
    }
}
