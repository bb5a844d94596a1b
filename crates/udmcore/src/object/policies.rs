//! Policy references of an object and the overlays used to edit them.

use super::DirectoryObject;
use crate::error::{Result, UdmError};
use crate::policy;
use tracing::debug;

impl DirectoryObject {
    /// DNs of the policies this object references.
    pub fn policies(&self) -> &[String] {
        &self.policies
    }

    pub fn set_policies(&mut self, references: Vec<String>) {
        self.policies = references;
    }

    pub fn add_policy_reference(&mut self, policy_dn: &str) {
        if !self.policies.iter().any(|p| crate::dn::compare(p, policy_dn)) {
            self.policies.push(policy_dn.to_string());
        }
    }

    pub fn remove_policy_reference(&mut self, policy_dn: &str) {
        self.policies.retain(|p| !crate::dn::compare(p, policy_dn));
    }

    /// Policy overlay of type `policy_type` for this object.
    ///
    /// If the object references a policy of that type, the overlay is a
    /// copy of it; otherwise a fresh policy named after this object. Either
    /// way it shows the values in effect here, and is written as a new
    /// policy when changed.
    pub fn load_policy_object(&mut self, policy_type: &str) -> Result<&mut DirectoryObject> {
        if !self.policy_objects.contains_key(policy_type) {
            let overlay = self.build_policy_overlay(policy_type)?;
            self.policy_objects.insert(policy_type.to_string(), overlay);
        }
        self.policy_objects
            .get_mut(policy_type)
            .ok_or_else(|| UdmError::NotFound(policy_type.to_string()))
    }

    fn build_policy_overlay(&self, policy_type: &str) -> Result<DirectoryObject> {
        let object_type = self.ctx.object_type(policy_type)?;
        if !object_type.is_policy() {
            return Err(UdmError::InvalidOperation(format!(
                "{} is not a policy type",
                policy_type
            )));
        }
        for reference in &self.policies {
            let Some(found) = self.ctx.identify(reference)? else {
                continue;
            };
            if found.name == policy_type {
                debug!(policy = %reference, "cloning referenced policy");
                let mut overlay = DirectoryObject::load(self.ctx.clone(), object_type, reference)?;
                policy::clone_for(&mut overlay, self);
                return Ok(overlay);
            }
        }
        let position = self.policy_position(&object_type.default_containers);
        let mut overlay = DirectoryObject::new(self.ctx.clone(), object_type, &position)?;
        policy::attach(&mut overlay, self);
        Ok(overlay)
    }

    fn policy_position(&self, containers: &[&str]) -> String {
        let base = self.ctx.directory.base();
        for container in containers {
            let candidate = format!("{},{}", container, base);
            if matches!(self.ctx.directory.get(&candidate), Ok(Some(_))) {
                return candidate;
            }
        }
        base
    }

    /// Write every changed policy overlay as a policy of its own and point
    /// this object at it instead of the policy it replaced.
    pub fn update_policies(&mut self) -> Result<()> {
        let types: Vec<String> = self.policy_objects.keys().cloned().collect();
        for policy_type in types {
            let Some(mut overlay) = self.policy_objects.remove(&policy_type) else {
                continue;
            };
            if !policy::has_changes(&overlay) {
                self.policy_objects.insert(policy_type, overlay);
                continue;
            }
            let created = overlay.create();
            self.messages.append(&mut overlay.messages);
            match created {
                // the next load clones the policy just written
                Ok(policy_dn) => self.replace_policy_reference(&policy_type, &policy_dn)?,
                Err(e) => {
                    self.policy_objects.insert(policy_type, overlay);
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    fn replace_policy_reference(&mut self, policy_type: &str, policy_dn: &str) -> Result<()> {
        let mut kept = Vec::new();
        for reference in std::mem::take(&mut self.policies) {
            let same_type = self
                .ctx
                .identify(&reference)?
                .map(|t| t.name == policy_type)
                .unwrap_or(false);
            if !same_type {
                kept.push(reference);
            }
        }
        kept.push(policy_dn.to_string());
        self.policies = kept;
        Ok(())
    }

    /// Resolve the policy values in effect for this policy overlay.
    /// `faked` replaces the referring object's own references.
    pub fn policy_result(&mut self, faked: &[String]) -> Result<()> {
        policy::policy_result(self, faked)
    }

    /// Policy values per property of this overlay and whether each is fixed.
    pub fn fixed_attributes(&mut self) -> Result<std::collections::BTreeMap<String, bool>> {
        policy::fixed_attributes(self)
    }

    /// Policy values per property of this overlay and whether each is blank.
    pub fn empty_attributes(&mut self) -> Result<std::collections::BTreeMap<String, bool>> {
        policy::empty_attributes(self)
    }
}
