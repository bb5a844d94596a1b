//! Create and modify.

use super::DirectoryObject;
use crate::computer;
use crate::directory::{Attributes, Modification};
use crate::error::{Result, UdmError};
use crate::module::ObjectKind;
use crate::options::{self, Transition, TransitionInput};
use crate::policy;
use crate::value::Value;
use std::collections::BTreeSet;
use tracing::{debug, error, info};

const POLICY_REFERENCE_CLASS: &str = "univentionPolicyReference";

impl DirectoryObject {
    /// Create the entry. Returns its DN.
    ///
    /// Any failure before the entry is written releases every resource
    /// requested so far. A failure after the write removes the entry again.
    pub fn create(&mut self) -> Result<String> {
        if self.exists {
            return Err(UdmError::AlreadyExists(self.require_dn()?));
        }
        if !self.object_type.operations.add {
            return Err(UdmError::UnsupportedOperation(format!(
                "{} objects cannot be created",
                self.object_type.name
            )));
        }
        if policy::in_result_mode(self) {
            return policy::create_unique(self);
        }
        self.create_once()
    }

    pub(crate) fn create_once(&mut self) -> Result<String> {
        if !policy::in_result_mode(self) {
            self.apply_defaults();
        }
        self.ready()?;
        let dn = self.compute_dn()?;
        self.dn = Some(dn.clone());

        if let Err(e) = self.write_new_entry(&dn) {
            self.cancel();
            self.dn = None;
            return Err(e);
        }
        self.exists = true;

        if let Err(e) = self.after_create() {
            error!(dn = %dn, error = %e, "post-create step failed, undoing create");
            self.cancel();
            self.cleanup();
            if let Err(undo) = self.remove(false) {
                self.warn(format!("could not remove {} after failed create: {}", dn, undo));
            }
            self.exists = false;
            self.dn = None;
            return Err(e);
        }

        self.confirm_allocations();
        self.save();
        info!(dn = %dn, object_type = self.object_type.name, "created object");
        Ok(dn)
    }

    /// New entries are written with the defaults of every visible property
    /// that was not cleared.
    fn apply_defaults(&mut self) {
        let object_type = self.object_type.clone();
        for descriptor in &object_type.properties {
            if descriptor.is_visible(&self.options) {
                self.value_or_default(descriptor);
            }
        }
    }

    fn write_new_entry(&mut self, dn: &str) -> Result<()> {
        if self.object_type.kind == ObjectKind::Computer {
            computer::pre_write(self)?;
        }
        for hook in self.active_hooks() {
            hook.pre_create(self)?;
        }
        self.update_policies()?;
        self.check_syntax()?;

        let mut addlist = self.base_addlist()?;
        addlist.extend(self.build_modlist()?);
        for hook in self.active_hooks() {
            addlist = hook.addlist(self, addlist)?;
        }

        let attrs = Attributes::from_addlist(&addlist);
        debug!(dn, attributes = attrs.len(), "adding entry");
        self.ctx.directory.add(dn, &attrs)?;
        self.old_attrs = attrs;
        Ok(())
    }

    fn after_create(&mut self) -> Result<()> {
        if self.object_type.kind == ObjectKind::Computer {
            computer::post_write(self)?;
        }
        for hook in self.active_hooks() {
            hook.post_create(self)?;
        }
        Ok(())
    }

    /// Write pending changes. Returns the (possibly new) DN.
    ///
    /// A changed identifying property renames the entry first. With
    /// `cascade_children` a container with children is moved as a subtree;
    /// without it such a rename fails.
    pub fn modify(&mut self, cascade_children: bool) -> Result<String> {
        if !self.exists {
            return Err(UdmError::NotFound(
                self.dn.clone().unwrap_or_else(|| self.position.clone()),
            ));
        }
        if !self.object_type.operations.edit {
            return Err(UdmError::UnsupportedOperation(format!(
                "{} objects cannot be modified",
                self.object_type.name
            )));
        }
        let dn = self.require_dn()?;
        self.ready()?;

        let target = self.compute_dn()?;
        self.renamed_from = None;
        if target != dn {
            self.rename_to(&target, cascade_children)?;
            self.renamed_from = Some(dn.clone());
        }

        if let Err(e) = self.write_changes() {
            self.cancel();
            if self.renamed_from.take().is_some() {
                if let Err(undo) = self.rename_to(&dn, cascade_children) {
                    self.warn(format!("could not rename {} back: {}", target, undo));
                }
            }
            return Err(e);
        }
        let outcome = self.after_modify();
        self.renamed_from = None;
        if let Err(e) = outcome {
            error!(dn = %target, error = %e, "entry modified but a dependent write failed");
            self.save_written();
            return Err(e);
        }
        self.save();
        let current = self.require_dn()?;
        info!(dn = %current, object_type = self.object_type.name, "modified object");
        Ok(current)
    }

    fn write_changes(&mut self) -> Result<()> {
        let dn = self.require_dn()?;
        if self.object_type.kind == ObjectKind::Computer {
            computer::pre_write(self)?;
        }
        for hook in self.active_hooks() {
            hook.pre_modify(self)?;
        }
        self.update_policies()?;
        self.check_syntax()?;

        let mut modlist = self.build_modlist()?;
        for hook in self.active_hooks() {
            modlist = hook.modlist(self, modlist)?;
        }
        let modlist = self.reconcile_object_classes(modlist)?;
        if !modlist.is_empty() {
            debug!(dn = %dn, changes = modlist.len(), "modifying entry");
            self.ctx.directory.modify(&dn, &modlist)?;
            self.old_attrs.apply(&modlist);
        }
        self.confirm_allocations();
        Ok(())
    }

    fn after_modify(&mut self) -> Result<()> {
        if self.object_type.kind == ObjectKind::Computer {
            computer::post_write(self)?;
        }
        for hook in self.active_hooks() {
            hook.post_modify(self)?;
        }
        Ok(())
    }

    /// Snapshot after the entry was written but a dependent write failed.
    /// Values kept outside the entry stay pending so a retry writes them
    /// again.
    fn save_written(&mut self) {
        let pending: &[&str] = match self.object_type.kind {
            ObjectKind::Computer => computer::DEPENDENT_PROPERTIES,
            _ => &[],
        };
        let kept: Vec<(String, Option<Value>)> = pending
            .iter()
            .map(|name| (name.to_string(), self.old_info.get(*name).cloned()))
            .collect();
        self.save();
        for (name, value) in kept {
            match value {
                Some(value) => self.old_info.insert(name, value),
                None => self.old_info.remove(&name),
            };
        }
    }

    /// Attributes every new entry of this type starts with.
    fn base_addlist(&mut self) -> Result<Vec<Modification>> {
        let mut extra: Vec<String> = self
            .object_type
            .object_classes
            .iter()
            .map(|c| c.to_string())
            .collect();
        extra.push("univentionObject".to_string());
        for extension in &self.object_type.extended {
            if extension.is_set(self) {
                extra.push(extension.object_class.to_string());
            }
        }
        let classes =
            options::object_classes_for_options(self.object_type.options, &self.options, extra);

        let mut addlist = vec![
            Modification::add("objectClass", classes),
            Modification::add("univentionObjectType", vec![self.object_type.name.to_string()]),
        ];
        if let Some(addlist_fn) = self.object_type.addlist {
            addlist.extend(addlist_fn(self)?);
        }
        Ok(addlist)
    }

    fn build_modlist(&mut self) -> Result<Vec<Modification>> {
        match self.object_type.kind {
            ObjectKind::Computer => computer::modlist(self),
            _ => {
                let modlist = self.base_modlist();
                match self.object_type.modlist {
                    Some(modlist_fn) if self.exists => modlist_fn(self, modlist),
                    _ => Ok(modlist),
                }
            }
        }
    }

    /// Mapped property diff plus the policy reference change.
    pub fn base_modlist(&self) -> Vec<Modification> {
        let mut modlist = self.object_type.mapping.map_diff(&self.diff());

        let old: BTreeSet<String> = self.old_policies.iter().map(|p| p.to_lowercase()).collect();
        let new: BTreeSet<String> = self.policies.iter().map(|p| p.to_lowercase()).collect();
        if old != new {
            if !self.policies.is_empty()
                && !self.old_attrs.has_value("objectClass", POLICY_REFERENCE_CLASS)
            {
                modlist.push(Modification::add(
                    "objectClass",
                    vec![POLICY_REFERENCE_CLASS.to_string()],
                ));
            }
            modlist.push(Modification::new(
                "univentionPolicyReference",
                self.old_policies.clone(),
                self.policies.clone(),
            ));
        }
        modlist
    }

    fn check_syntax(&self) -> Result<()> {
        for (name, value) in &self.info {
            if value.is_empty() || !self.has_changed(name) {
                continue;
            }
            let descriptor = self.descriptor(name)?;
            descriptor
                .syntax
                .check(self.ctx.directory.as_ref(), value)
                .map_err(|message| UdmError::syntax(name.as_str(), message))?;
        }
        Ok(())
    }

    /// Bring the object classes in line with the options and extended
    /// attributes. A transition that would leave the entry invalid is
    /// skipped with a warning.
    fn reconcile_object_classes(
        &mut self,
        mut modlist: Vec<Modification>,
    ) -> Result<Vec<Modification>> {
        let mut required = BTreeSet::new();
        let mut unneeded = BTreeSet::new();
        for extension in &self.object_type.extended {
            if extension.is_set(self) {
                required.insert(extension.object_class.to_lowercase());
                continue;
            }
            if extension.delete_object_class {
                unneeded.insert(extension.object_class.to_lowercase());
            }
            // An unset extended attribute is removed completely.
            let attr = extension.attribute;
            if self.old_attrs.contains(attr) {
                modlist.retain(|m| !m.targets(attr));
                modlist.push(Modification::new(attr, self.old_attrs.values(attr), vec![]));
            }
        }

        let schema = self.ctx.directory.schema()?;
        let input = TransitionInput {
            schema: &schema,
            options: self.object_type.options,
            enabled: &self.options,
            previously_enabled: &self.old_options,
            old_attributes: &self.old_attrs,
            required_extra: required,
            unneeded_extra: unneeded,
        };
        match options::reconcile_object_class_transition(&input, modlist) {
            Transition::Suppressed { modlist, reason } => {
                self.warn(format!("object classes left unchanged: {}", reason));
                Ok(modlist)
            }
            transition => Ok(transition.into_modlist()),
        }
    }

    /// Release every resource requested since the last successful write.
    pub fn cancel(&mut self) {
        for (kind, value) in self.ledger.take() {
            if let Err(e) = self.ctx.allocator.release(kind, &value) {
                self.warn(format!("could not release {} {}: {}", kind, value, e));
            }
        }
    }

    fn confirm_allocations(&mut self) {
        for (kind, value) in self.ledger.take() {
            if let Err(e) = self.ctx.allocator.confirm(kind, &value) {
                self.warn(format!("could not confirm {} {}: {}", kind, value, e));
            }
        }
    }
}
