//! Merged-attribute view.
//!
//! Answers "what would this entry hold if the pending modlist were
//! applied", without touching the directory. Object-class reconciliation
//! uses it to validate a transition before sending it.

use crate::directory::{Attributes, Modification};
use std::collections::BTreeMap;

pub struct MergedAttributes<'a> {
    base: &'a Attributes,
    modlist: &'a [Modification],
}

impl<'a> MergedAttributes<'a> {
    pub fn new(base: &'a Attributes, modlist: &'a [Modification]) -> Self {
        Self { base, modlist }
    }

    /// Value of `attr` after every triple targeting it has been applied.
    pub fn get(&self, attr: &str) -> Vec<String> {
        let mut values = self.base.values(attr);
        for m in self.modlist.iter().filter(|m| m.targets(attr)) {
            match (m.old.is_empty(), m.new.is_empty()) {
                (true, false) => {
                    for v in &m.new {
                        if !values.iter().any(|e| e.eq_ignore_ascii_case(v)) {
                            values.push(v.clone());
                        }
                    }
                }
                (false, true) => {
                    values.retain(|e| !m.old.iter().any(|o| o.eq_ignore_ascii_case(e)));
                }
                (false, false) => values = m.new.clone(),
                (true, true) => {}
            }
        }
        values
    }

    /// Every attribute that is non-empty after the modlist, keyed by the
    /// lowercased name.
    pub fn non_empty(&self) -> BTreeMap<String, Vec<String>> {
        let mut names: Vec<String> = self.base.names();
        names.extend(self.modlist.iter().map(|m| m.attr.clone()));

        let mut result = BTreeMap::new();
        for name in names {
            let key = name.to_lowercase();
            if result.contains_key(&key) {
                continue;
            }
            let values = self.get(&name);
            if !values.is_empty() {
                result.insert(key, values);
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn base() -> Attributes {
        vec![
            ("objectClass", strings(&["top", "person", "posixAccount"])),
            ("uidNumber", strings(&["1000"])),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_union_subtract_replace() {
        let attrs = base();
        let modlist = vec![
            Modification::new("objectClass", vec![], strings(&["shadowAccount", "Person"])),
            Modification::new("objectclass", strings(&["POSIXACCOUNT"]), vec![]),
            Modification::new("uidNumber", strings(&["1000"]), strings(&["1001"])),
        ];
        let merged = MergedAttributes::new(&attrs, &modlist);
        assert_eq!(merged.get("objectClass"), strings(&["top", "person", "shadowAccount"]));
        assert_eq!(merged.get("uidNumber"), strings(&["1001"]));
        assert!(merged.get("missing").is_empty());
    }

    #[test]
    fn test_non_empty_drops_deleted_attributes() {
        let attrs = base();
        let modlist = vec![
            Modification::new("uidNumber", strings(&["1000"]), vec![]),
            Modification::new("description", vec![], strings(&["x"])),
        ];
        let merged = MergedAttributes::new(&attrs, &modlist).non_empty();
        assert!(!merged.contains_key("uidnumber"));
        assert_eq!(merged["description"], strings(&["x"]));
        assert!(merged.contains_key("objectclass"));
    }
}
