//! Move, rename and remove.

use super::DirectoryObject;
use crate::directory::{Attributes, Filter, Modification, Scope};
use crate::dn;
use crate::error::{Result, UdmError};
use crate::computer;
use crate::groups;
use crate::module::ObjectKind;
use chrono::Utc;
use tracing::{debug, info};

impl DirectoryObject {
    /// Move the entry to `new_dn`. Containers are moved with everything
    /// below them; on failure the tree is restored.
    pub fn move_to(&mut self, new_dn: &str) -> Result<String> {
        if !self.exists {
            return Err(UdmError::NotFound(
                self.dn.clone().unwrap_or_else(|| self.position.clone()),
            ));
        }
        let old_dn = self.require_dn()?;
        if !self.object_type.operations.moves {
            return Err(UdmError::UnsupportedOperation(format!(
                "{} objects cannot be moved",
                self.object_type.name
            )));
        }
        if self.ctx.config.ad_member_mode && self.is_synced() {
            return Err(UdmError::InvalidOperation(format!(
                "{} is synchronized and cannot be moved",
                old_dn
            )));
        }
        if old_dn == new_dn {
            return Err(UdmError::InvalidOperation(format!(
                "{} is already at that position",
                old_dn
            )));
        }
        let case_only = dn::compare(&old_dn, new_dn);
        if !case_only && dn::is_in_subtree(new_dn, &old_dn) {
            return Err(UdmError::InvalidOperation(format!(
                "cannot move {} into its own subtree",
                old_dn
            )));
        }
        self.check_destination(new_dn)?;
        for hook in self.active_hooks() {
            hook.pre_move(self, new_dn)?;
        }

        if case_only {
            self.move_via_temporary_container(new_dn)?;
        } else {
            self.relocate(new_dn, true)?;
        }
        self.adopt_rdn(new_dn);
        for hook in self.active_hooks() {
            hook.post_move(self, &old_dn)?;
        }
        info!(from = %old_dn, to = %new_dn, "moved object");
        Ok(new_dn.to_string())
    }

    /// Identifying properties take the value of the new RDN, in the
    /// current values and the snapshot alike.
    fn adopt_rdn(&mut self, new_dn: &str) {
        let raw = [dn::rdn_value(new_dn)];
        let object_type = self.object_type.clone();
        for descriptor in object_type.identifying_properties() {
            let value = object_type
                .mapping
                .unmap_value(descriptor.name, &raw, descriptor.multivalue);
            self.info.insert(descriptor.name.to_string(), value.clone());
            self.old_info.insert(descriptor.name.to_string(), value);
        }
    }

    fn check_destination(&self, new_dn: &str) -> Result<()> {
        let parent = dn::parent(new_dn)
            .ok_or_else(|| UdmError::InvalidOperation(format!("{} has no parent", new_dn)))?;
        if self.ctx.directory.get(&parent)?.is_none() {
            return Err(UdmError::NotFound(parent));
        }
        if dn::compare(&parent, &self.ctx.directory.base()) {
            return Ok(());
        }
        match self.ctx.identify(&parent)? {
            Some(object_type) if object_type.childs => Ok(()),
            _ => Err(UdmError::InvalidOperation(format!(
                "{} cannot contain other objects",
                parent
            ))),
        }
    }

    /// Rename for a changed identifying property.
    pub(crate) fn rename_to(&mut self, new_dn: &str, cascade_children: bool) -> Result<()> {
        let old_dn = self.require_dn()?;
        if dn::compare(&old_dn, new_dn) {
            let parent = dn::parent(&old_dn).unwrap_or_default();
            let (attr, _) = dn::split_rdn(&dn::rdn(&old_dn));
            let temporary = dn::compose(&attr, &self.temporary_name(), &parent);
            self.relocate(&temporary, cascade_children)?;
            return self.relocate(new_dn, cascade_children);
        }
        self.relocate(new_dn, cascade_children)
    }

    fn temporary_name(&self) -> String {
        format!(
            "{}{}",
            self.ctx.config.temporary_move_container_prefix,
            Utc::now().format("%Y%m%d%H%M%S%f")
        )
    }

    /// Case-only moves go through a temporary container, since the
    /// directory treats both DNs as the same entry.
    fn move_via_temporary_container(&mut self, new_dn: &str) -> Result<()> {
        let old_dn = self.require_dn()?;
        let parent = dn::parent(&old_dn).unwrap_or_else(|| self.ctx.directory.base());
        let name = self.temporary_name();
        let container = dn::compose("ou", &name, &parent);
        let attrs: Attributes = vec![
            (
                "objectClass",
                vec!["top".to_string(), "organizationalUnit".to_string()],
            ),
            ("ou", vec![name]),
        ]
        .into_iter()
        .collect();
        self.ctx.directory.add(&container, &attrs)?;
        debug!(container = %container, "created temporary move container");

        let parked = format!("{},{}", dn::rdn(new_dn), container);
        let result = self
            .relocate(&parked, true)
            .and_then(|_| self.relocate(new_dn, true));
        if result.is_err() && self.dn.as_deref() == Some(parked.as_str()) {
            if let Err(undo) = self.relocate(&old_dn, true) {
                self.warn(format!("could not move {} back: {}", parked, undo));
            }
        }
        if let Err(e) = self.ctx.directory.delete(&container) {
            self.warn(format!("could not remove temporary container {}: {}", container, e));
        }
        result
    }

    /// Rename or subtree-move to `new_dn` and fix references to the old DN.
    fn relocate(&mut self, new_dn: &str, cascade_children: bool) -> Result<()> {
        let old_dn = self.require_dn()?;
        let children = self.ctx.directory.children(&old_dn)?;
        if children.is_empty() {
            return self.rename_leaf(&old_dn, new_dn);
        }
        if !cascade_children || !self.object_type.operations.subtree_move {
            return Err(UdmError::InvalidOperation(format!(
                "{} has children and cannot be moved as a subtree",
                old_dn
            )));
        }
        self.move_subtree(&old_dn, new_dn, children)
    }

    fn rename_leaf(&mut self, old_dn: &str, new_dn: &str) -> Result<()> {
        self.ctx.directory.rename(old_dn, new_dn)?;
        self.set_location(new_dn);
        if let Err(e) = self.update_references(old_dn) {
            if let Err(undo) = self.ctx.directory.rename(new_dn, old_dn) {
                self.warn(format!("could not rename {} back: {}", new_dn, undo));
            } else {
                self.set_location(old_dn);
            }
            return Err(e);
        }
        Ok(())
    }

    fn set_location(&mut self, dn: &str) {
        self.dn = Some(dn.to_string());
        self.position = dn::parent(dn).unwrap_or_default();
    }

    /// Group memberships and secretary links follow the entry.
    fn update_references(&self, old_dn: &str) -> Result<()> {
        let new_dn = self.require_dn()?;
        let directory = self.ctx.directory.as_ref();
        groups::rename_member(directory, old_dn, &new_dn, None)?;
        let base = directory.base();
        for (entry, _) in directory.search(&base, Scope::Sub, &Filter::eq("secretary", old_dn), &[])? {
            directory.modify(
                &entry,
                &[
                    Modification::new("secretary", vec![old_dn.to_string()], vec![]),
                    Modification::add("secretary", vec![new_dn.clone()]),
                ],
            )?;
        }
        Ok(())
    }

    fn move_subtree(&mut self, old_dn: &str, new_dn: &str, children: Vec<String>) -> Result<()> {
        let depth = dn::explode(old_dn).len();
        if depth > self.ctx.config.max_move_depth {
            return Err(UdmError::InvalidOperation(format!(
                "{} is nested too deeply to move",
                old_dn
            )));
        }

        let position = dn::parent(new_dn).unwrap_or_default();
        let mut copy = DirectoryObject::new(self.ctx.clone(), self.object_type.clone(), &position)?;
        copy.options = self.options.clone();
        copy.policies = self.policies.clone();
        copy.info = self.info.clone();
        for descriptor in self.object_type.identifying_properties() {
            let value = self.object_type.mapping.unmap_value(
                descriptor.name,
                &[dn::rdn_value(new_dn)],
                descriptor.multivalue,
            );
            copy.info.insert(descriptor.name.to_string(), value);
        }
        copy.create()?;
        debug!(from = %old_dn, to = %new_dn, children = children.len(), "moving subtree");

        let mut moved: Vec<(String, String)> = Vec::new();
        for child in children {
            let Some(target) = dn::rebase(&child, old_dn, new_dn) else {
                continue;
            };
            if let Err(e) = self.move_child(&child, &target) {
                self.roll_back_subtree(moved, &mut copy);
                return Err(e);
            }
            moved.push((child, target));
        }

        if let Err(e) = self.ctx.directory.delete(old_dn) {
            self.roll_back_subtree(moved, &mut copy);
            return Err(e.into());
        }
        self.set_location(new_dn);
        self.old_attrs = copy.old_attrs.clone();
        self.update_references(old_dn)
    }

    fn move_child(&self, child: &str, target: &str) -> Result<()> {
        match self.ctx.identify(child)? {
            Some(_) => {
                let mut object = self.ctx.open(child)?;
                object.move_to(target)?;
            }
            None => {
                self.ctx.directory.rename(child, target)?;
            }
        }
        Ok(())
    }

    fn roll_back_subtree(&mut self, moved: Vec<(String, String)>, copy: &mut DirectoryObject) {
        for (original, target) in moved.into_iter().rev() {
            if let Err(e) = self.move_child(&target, &original) {
                self.warn(format!("could not move {} back to {}: {}", target, original, e));
            }
        }
        if let Err(e) = copy.remove(false) {
            self.warn(format!("could not remove partial copy: {}", e));
        }
        self.messages.append(&mut copy.messages);
    }

    /// Delete the entry. With `cascade_children` everything below it is
    /// removed first; a child that cannot be removed is reported as a
    /// warning and the delete of the entry itself decides the outcome.
    pub fn remove(&mut self, cascade_children: bool) -> Result<()> {
        if !self.exists {
            return Err(UdmError::NotFound(
                self.dn.clone().unwrap_or_else(|| self.position.clone()),
            ));
        }
        if !self.object_type.operations.remove {
            return Err(UdmError::UnsupportedOperation(format!(
                "{} objects cannot be removed",
                self.object_type.name
            )));
        }
        if self.ctx.config.ad_member_mode && self.is_synced() {
            return Err(UdmError::InvalidOperation(format!(
                "{} is synchronized and cannot be removed",
                self.require_dn()?
            )));
        }
        let dn = self.require_dn()?;

        for hook in self.active_hooks() {
            hook.pre_remove(self)?;
        }
        if cascade_children {
            self.remove_children(&dn, 0)?;
        }
        self.ctx.directory.delete(&dn)?;
        self.exists = false;

        if self.object_type.kind == ObjectKind::Computer {
            computer::post_remove(self)?;
        }
        for hook in self.active_hooks() {
            hook.post_remove(self)?;
        }
        self.old_info.clear();
        self.old_attrs = Attributes::new();
        info!(dn = %dn, object_type = self.object_type.name, "removed object");
        Ok(())
    }

    fn remove_children(&mut self, dn: &str, depth: usize) -> Result<()> {
        if depth > self.ctx.config.max_move_depth {
            return Err(UdmError::InvalidOperation(format!("{} is nested too deeply", dn)));
        }
        for child in self.ctx.directory.children(dn)? {
            let result = match self.ctx.identify(&child)? {
                Some(_) => self.ctx.open(&child).and_then(|mut object| {
                    let outcome = object.remove(true);
                    self.messages.append(&mut object.messages);
                    outcome
                }),
                None => self
                    .remove_children(&child, depth + 1)
                    .and_then(|_| Ok(self.ctx.directory.delete(&child)?)),
            };
            if let Err(e) = result {
                self.warn(format!("could not remove {}: {}", child, e));
            }
        }
        Ok(())
    }

    /// Remove DNS and DHCP records that belong to this object. Failures
    /// are reported as warnings.
    pub fn cleanup(&mut self) {
        if self.object_type.kind == ObjectKind::Computer {
            computer::cleanup(self);
        }
    }
}
