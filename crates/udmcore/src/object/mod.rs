//! # Directory Objects
//!
//! A [`DirectoryObject`] is one typed entry: its property values, the
//! snapshot they are compared against, its options and policy references.
//!
//! ## Lifecycle
//!
//! ```text
//! new ──set──▶ create ──▶ (exists) ──set──▶ modify
//!                              │
//! load ──open──────────────────┤──▶ move_to
//!                              └──▶ remove ──▶ (gone)
//! ```
//!
//! `load` reads the entry and maps its attributes to properties. `open`
//! computes derived values (a computer's DNS and DHCP entries) and takes the
//! snapshot that later diffs are computed against. Every successful write
//! takes a new snapshot.
//!
//! ## Values
//!
//! - [`get`](DirectoryObject::get) returns the stored value, or the
//!   property's default unless the property was explicitly cleared.
//! - [`set`](DirectoryObject::set) validates visibility, editability and
//!   syntax, then stores the parsed value. Clearing a single-valued property
//!   removes it.
//! - [`diff`](DirectoryObject::diff) lists `(property, old, new)` for every
//!   changed property, in declaration order.
//!
//! ## Type-specific Behaviour
//!
//! Computers and policies extend the generic lifecycle. Their state lives
//! in [`Specialization`]; their hooks are in [`crate::computer`] and
//! [`crate::policy`].

use crate::allocator::AllocationLedger;
use crate::computer::{self, ComputerState};
use crate::context::Context;
use crate::directory::Attributes;
use crate::dn;
use crate::error::{Result, UdmError};
use crate::hooks::ExtensionHook;
use crate::mapping::PropertyChange;
use crate::messages::ObjectMessage;
use crate::module::{ObjectKind, ObjectType};
use crate::options;
use crate::policy::{self, PolicyState};
use crate::property::PropertyDescriptor;
use crate::value::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;
use tracing::warn;

mod policies;
mod relocate;
mod write;

/// Per-object state of the type-specific lifecycle extensions.
#[derive(Debug, Clone)]
pub enum Specialization {
    Generic,
    Computer(ComputerState),
    Policy(PolicyState),
}

impl Specialization {
    fn for_kind(kind: ObjectKind) -> Self {
        match kind {
            ObjectKind::Generic => Specialization::Generic,
            ObjectKind::Computer => Specialization::Computer(ComputerState::default()),
            ObjectKind::Policy { .. } => Specialization::Policy(PolicyState::default()),
        }
    }
}

pub struct DirectoryObject {
    pub(crate) ctx: Context,
    pub(crate) object_type: Rc<ObjectType>,
    pub(crate) dn: Option<String>,
    pub(crate) position: String,
    pub(crate) superordinate: Option<String>,
    pub(crate) info: BTreeMap<String, Value>,
    pub(crate) old_info: BTreeMap<String, Value>,
    pub(crate) old_attrs: Attributes,
    pub(crate) options: BTreeSet<String>,
    pub(crate) old_options: BTreeSet<String>,
    pub(crate) policies: Vec<String>,
    pub(crate) old_policies: Vec<String>,
    pub(crate) policy_objects: BTreeMap<String, DirectoryObject>,
    pub(crate) no_default: BTreeSet<String>,
    pub(crate) exists: bool,
    pub(crate) opened: bool,
    /// DN before the rename done by the running modify.
    pub(crate) renamed_from: Option<String>,
    pub(crate) ledger: AllocationLedger,
    pub(crate) messages: Vec<ObjectMessage>,
    pub(crate) special: Specialization,
}

impl fmt::Debug for DirectoryObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryObject")
            .field("type", &self.object_type.name)
            .field("dn", &self.dn)
            .field("position", &self.position)
            .field("exists", &self.exists)
            .field("options", &self.options)
            .field("info", &self.info)
            .finish()
    }
}

impl DirectoryObject {
    /// A new object to be created below `position`. Default options are
    /// enabled.
    pub fn new(ctx: Context, object_type: Rc<ObjectType>, position: &str) -> Result<Self> {
        let position = if position.is_empty() {
            ctx.directory.base()
        } else {
            position.to_string()
        };
        Ok(Self {
            options: options::default_options(object_type.options),
            special: Specialization::for_kind(object_type.kind),
            ctx,
            object_type,
            dn: None,
            position,
            superordinate: None,
            info: BTreeMap::new(),
            old_info: BTreeMap::new(),
            old_attrs: Attributes::new(),
            old_options: BTreeSet::new(),
            policies: Vec::new(),
            old_policies: Vec::new(),
            policy_objects: BTreeMap::new(),
            no_default: BTreeSet::new(),
            exists: false,
            opened: false,
            renamed_from: None,
            ledger: AllocationLedger::default(),
            messages: Vec::new(),
        })
    }

    /// Read the entry at `dn` and map its attributes to properties.
    pub fn load(ctx: Context, object_type: Rc<ObjectType>, dn: &str) -> Result<Self> {
        let attrs = ctx
            .directory
            .get(dn)?
            .ok_or_else(|| UdmError::NotFound(dn.to_string()))?;
        let position = dn::parent(dn).unwrap_or_default();
        let mut object = Self::new(ctx, object_type, &position)?;
        object.dn = Some(dn.to_string());
        object.exists = true;
        object.info = object
            .object_type
            .mapping
            .map_dict(&attrs, &object.object_type.properties);
        object.options = options::options_for_object_classes(
            object.object_type.options,
            &attrs.values("objectClass"),
        );
        object.policies = attrs.values("univentionPolicyReference");
        object.old_attrs = attrs;
        if let Some(post_load) = object.object_type.post_load {
            post_load(&mut object);
        }
        if object.object_type.kind == ObjectKind::Computer {
            computer::post_load(&mut object)?;
        }
        if !object.object_type.superordinates.is_empty() {
            object.superordinate = object.find_superordinate()?;
        }
        object.save();
        Ok(object)
    }

    /// Compute derived values and take the snapshot diffs are based on.
    pub fn open(&mut self) -> Result<()> {
        if self.opened {
            return Ok(());
        }
        self.opened = true;
        if self.exists && self.object_type.kind == ObjectKind::Computer {
            computer::open(self)?;
        }
        for hook in self.active_hooks() {
            hook.open(self)?;
        }
        self.save();
        Ok(())
    }

    /// Snapshot current values as the prior state.
    pub fn save(&mut self) {
        self.old_info = self.info.clone();
        self.old_options = self.options.clone();
        self.old_policies = self.policies.clone();
    }

    pub fn dn(&self) -> Option<&str> {
        self.dn.as_deref()
    }

    pub fn position(&self) -> &str {
        &self.position
    }

    pub fn set_position(&mut self, position: &str) {
        self.position = position.to_string();
    }

    pub fn superordinate(&self) -> Option<&str> {
        self.superordinate.as_deref()
    }

    pub fn set_superordinate(&mut self, dn: &str) {
        self.superordinate = Some(dn.to_string());
    }

    pub fn exists(&self) -> bool {
        self.exists
    }

    pub fn object_type(&self) -> &ObjectType {
        &self.object_type
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn ledger(&self) -> &AllocationLedger {
        &self.ledger
    }

    pub fn specialization(&self) -> &Specialization {
        &self.special
    }

    /// Attributes as last read or written.
    pub fn attributes(&self) -> &Attributes {
        &self.old_attrs
    }

    /// Drain collected warnings and notices.
    pub fn take_messages(&mut self) -> Vec<ObjectMessage> {
        std::mem::take(&mut self.messages)
    }

    pub(crate) fn warn(&mut self, content: String) {
        warn!(dn = ?self.dn, "{}", content);
        self.messages.push(ObjectMessage::warning(content));
    }

    pub(crate) fn descriptor(&self, name: &str) -> Result<PropertyDescriptor> {
        self.object_type.property(name).copied()
    }

    pub(crate) fn active_hooks(&self) -> Vec<Rc<dyn ExtensionHook>> {
        self.object_type
            .extended
            .iter()
            .filter_map(|e| e.hook.clone())
            .filter(|h| h.applies_to(self))
            .collect()
    }

    pub(crate) fn require_dn(&self) -> Result<String> {
        self.dn
            .clone()
            .ok_or_else(|| UdmError::NotFound(format!("{} object below {}", self.object_type.name, self.position)))
    }

    // --- options ---------------------------------------------------------

    pub fn options(&self) -> &BTreeSet<String> {
        &self.options
    }

    pub fn has_option(&self, name: &str) -> bool {
        self.options.contains(name)
    }

    pub fn option_toggled(&self, name: &str) -> bool {
        self.options.contains(name) != self.old_options.contains(name)
    }

    /// Switch an option on or off.
    pub fn set_option(&mut self, name: &str, enabled: bool) -> Result<()> {
        let option = self
            .object_type
            .options
            .iter()
            .find(|o| o.name == name)
            .ok_or_else(|| UdmError::InvalidOperation(format!("unknown option {}", name)))?;
        if option.disabled {
            return Err(UdmError::InvalidOperation(format!("option {} is not available", name)));
        }
        if self.exists && !option.editable && self.options.contains(name) != enabled {
            return Err(UdmError::NotEditable(format!("option {}", name)));
        }
        if enabled {
            self.options.insert(name.to_string());
        } else {
            self.options.remove(name);
        }
        Ok(())
    }

    // --- values ----------------------------------------------------------

    /// Stored value without defaults or policy values.
    pub fn info(&self, name: &str) -> Value {
        self.info.get(name).cloned().unwrap_or_default()
    }

    /// Value as it was at the last snapshot.
    pub fn old_info(&self, name: &str) -> Value {
        self.old_info.get(name).cloned().unwrap_or_default()
    }

    pub fn get(&mut self, name: &str) -> Result<Value> {
        let descriptor = self.descriptor(name)?;
        if let Some(value) = policy::overlay_value(self, name)? {
            return Ok(value);
        }
        Ok(self.value_or_default(&descriptor))
    }

    pub(crate) fn value_or_default(&mut self, descriptor: &PropertyDescriptor) -> Value {
        if let Some(value) = self.info.get(descriptor.name) {
            return value.clone();
        }
        if self.no_default.contains(descriptor.name) {
            return Value::empty(descriptor.multivalue);
        }
        let default = descriptor.default.resolve(self, descriptor.multivalue);
        if descriptor.editable && !default.is_empty() {
            self.info
                .insert(descriptor.name.to_string(), default.clone());
        }
        default
    }

    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        if self.object_type.is_policy() {
            return policy::set_value(self, name, value);
        }
        self.set_value(name, value)
    }

    pub(crate) fn set_value(&mut self, name: &str, value: Value) -> Result<()> {
        let descriptor = self.descriptor(name)?;
        if !descriptor.is_visible(&self.options) {
            return Err(UdmError::NotEditable(format!(
                "{} (no enabled option provides it)",
                name
            )));
        }
        if !descriptor.editable {
            return Err(UdmError::NotEditable(name.to_string()));
        }
        if descriptor.readonly_when_synced && self.ctx.config.ad_member_mode && self.is_synced() {
            return Err(UdmError::NotEditable(format!("{} (synchronized object)", name)));
        }
        let parsed = descriptor
            .parse(&value)
            .map_err(|message| UdmError::syntax(name, message))?;
        if descriptor.required && parsed.is_empty() {
            return Err(UdmError::RequiredValue(name.to_string()));
        }
        if !descriptor.may_change && self.exists {
            let old = self.old_info(name);
            if !old.is_empty() && old != parsed {
                return Err(UdmError::NotEditable(name.to_string()));
            }
        }
        if let Some(current) = self.info.get(name).cloned() {
            if current == parsed {
                return Ok(());
            }
            if current == descriptor.default.resolve(self, descriptor.multivalue) {
                self.no_default.insert(name.to_string());
            }
        }
        if parsed.is_empty() {
            self.info.remove(name);
            self.no_default.insert(name.to_string());
        } else {
            self.info.insert(name.to_string(), parsed);
        }
        Ok(())
    }

    /// Synchronized from another directory (AD member mode).
    pub fn is_synced(&self) -> bool {
        self.old_attrs.has_value("univentionObjectFlag", "synced")
    }

    /// Changed properties as `(property, old, new)`, in declaration order.
    /// Properties hidden by the current options are reported as cleared.
    pub fn diff(&self) -> Vec<PropertyChange> {
        let mut changes = Vec::new();
        for descriptor in &self.object_type.properties {
            let old = self.old_info(descriptor.name);
            let new = self.info(descriptor.name);
            if !descriptor.is_visible(&self.options) {
                if !old.is_empty() {
                    changes.push(PropertyChange {
                        property: descriptor.name.to_string(),
                        old,
                        new: Value::empty(descriptor.multivalue),
                    });
                }
                continue;
            }
            if old.is_empty() && new.is_empty() {
                continue;
            }
            if old != new {
                changes.push(PropertyChange {
                    property: descriptor.name.to_string(),
                    old,
                    new,
                });
            }
        }
        changes
    }

    /// True if `name` differs from the snapshot in its mapped form.
    pub fn has_changed(&self, name: &str) -> bool {
        let old = self.old_info(name);
        let new = self.info(name);
        if old.is_empty() && new.is_empty() {
            return false;
        }
        !self.object_type.mapping.map_cmp(name, &old, &new)
    }

    pub fn has_changed_any(&self, names: &[&str]) -> bool {
        names.iter().any(|n| self.has_changed(n))
    }

    /// Check that every required visible property has a value and that the
    /// superordinate is acceptable.
    pub fn ready(&mut self) -> Result<()> {
        let object_type = self.object_type.clone();
        let mut missing = Vec::new();
        for descriptor in &object_type.properties {
            if !descriptor.required || !descriptor.is_visible(&self.options) {
                continue;
            }
            if self.get(descriptor.name)?.is_empty() {
                missing.push(descriptor.name.to_string());
            }
        }
        if !missing.is_empty() {
            return Err(UdmError::InsufficientInformation(missing));
        }
        self.check_superordinate()
    }

    fn find_superordinate(&self) -> Result<Option<String>> {
        let mut current = Some(self.position.clone());
        while let Some(candidate) = current {
            if !dn::is_in_subtree(&candidate, &self.ctx.directory.base()) {
                break;
            }
            if let Some(found) = self.ctx.identify(&candidate)? {
                if self.object_type.superordinates.contains(&found.name) {
                    return Ok(Some(candidate));
                }
            }
            current = dn::parent(&candidate);
        }
        Ok(None)
    }

    fn check_superordinate(&mut self) -> Result<()> {
        if self.object_type.superordinates.is_empty() {
            return Ok(());
        }
        let superordinate = match self.superordinate.clone() {
            Some(s) => s,
            None => self.find_superordinate()?.ok_or_else(|| {
                UdmError::InvalidSuperordinate(format!(
                    "{} objects need one of {}",
                    self.object_type.name,
                    self.object_type.superordinates.join(", ")
                ))
            })?,
        };
        let found = self.ctx.identify(&superordinate)?.ok_or_else(|| {
            UdmError::InvalidSuperordinate(format!("{} is not a known object", superordinate))
        })?;
        if !self.object_type.superordinates.contains(&found.name) {
            return Err(UdmError::InvalidSuperordinate(format!(
                "{} is a {}, expected one of {}",
                superordinate,
                found.name,
                self.object_type.superordinates.join(", ")
            )));
        }
        let location = self.dn.clone().unwrap_or_else(|| self.position.clone());
        if !dn::is_in_subtree(&location, &superordinate) {
            return Err(UdmError::InvalidSuperordinate(format!(
                "{} must be underneath {}",
                location, superordinate
            )));
        }
        self.superordinate = Some(superordinate);
        Ok(())
    }

    /// DN from the identifying properties and the position.
    pub fn compute_dn(&self) -> Result<String> {
        let mut rdns = Vec::new();
        let mut missing = Vec::new();
        for descriptor in self.object_type.identifying_properties() {
            let Some(attribute) = self.object_type.mapping.attribute_name(descriptor.name) else {
                missing.push(descriptor.name.to_string());
                continue;
            };
            let raw = self
                .object_type
                .mapping
                .map_value(descriptor.name, &self.info(descriptor.name));
            match raw.into_iter().find(|v| !v.is_empty()) {
                Some(value) => rdns.push(format!("{}={}", attribute, dn::escape_value(&value))),
                None => missing.push(descriptor.name.to_string()),
            }
        }
        if !missing.is_empty() || rdns.is_empty() {
            return Err(UdmError::InsufficientInformation(missing));
        }
        Ok(format!("{},{}", rdns.join("+"), self.position))
    }

    pub(crate) fn policy_state(&self) -> Option<&PolicyState> {
        match &self.special {
            Specialization::Policy(state) => Some(state),
            _ => None,
        }
    }

    pub(crate) fn policy_state_mut(&mut self) -> Option<&mut PolicyState> {
        match &mut self.special {
            Specialization::Policy(state) => Some(state),
            _ => None,
        }
    }

    pub(crate) fn computer_state_mut(&mut self) -> Option<&mut ComputerState> {
        match &mut self.special {
            Specialization::Computer(state) => Some(state),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestEnv;

    #[test]
    fn test_new_object_starts_with_default_options() {
        let env = TestEnv::new();
        let computer = env.new_computer("pc1");
        assert!(computer.has_option("posix"));
        assert!(computer.has_option("samba"));
        assert!(!computer.exists());
        assert!(computer.dn().is_none());
    }

    #[test]
    fn test_set_parses_and_get_returns_stored_value() {
        let env = TestEnv::new();
        let mut ou = env.ctx.new_object("container/ou", &env.base).unwrap();
        ou.set("name", "Clients").unwrap();
        assert_eq!(ou.get("name").unwrap(), Value::text("Clients"));
        assert!(matches!(ou.get("nope"), Err(UdmError::NoSuchProperty(_))));
        assert!(matches!(ou.set("nope", "x"), Err(UdmError::NoSuchProperty(_))));
    }

    #[test]
    fn test_clearing_suppresses_default() {
        let env = TestEnv::new();
        let mut computer = env.new_computer("pc1");
        assert_eq!(computer.get("shell").unwrap(), Value::text("/bin/false"));
        computer.set("shell", Value::None).unwrap();
        assert!(computer.get("shell").unwrap().is_empty());
    }

    #[test]
    fn test_multivalue_set_skips_empty_elements() {
        let env = TestEnv::new();
        let mut computer = env.new_computer("pc1");
        computer
            .set("mac", Value::list(["", "AA-BB-CC-DD-EE-FF", " "]))
            .unwrap();
        assert_eq!(computer.info("mac"), Value::list(["aa:bb:cc:dd:ee:ff"]));
    }

    #[test]
    fn test_hidden_property_is_not_editable() {
        let env = TestEnv::new();
        let mut computer = env.new_computer("pc1");
        computer.set_option("posix", false).unwrap();
        assert!(matches!(
            computer.set("shell", "/bin/sh"),
            Err(UdmError::NotEditable(_))
        ));
    }

    #[test]
    fn test_syntax_error_names_property() {
        let env = TestEnv::new();
        let mut computer = env.new_computer("pc1");
        match computer.set("ip", Value::list(["300.1.1.1"])) {
            Err(UdmError::Syntax { property, .. }) => assert_eq!(property, "ip"),
            other => panic!("expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn test_diff_is_empty_after_snapshot() {
        let env = TestEnv::new();
        let mut computer = env.new_computer("pc1");
        computer.set("description", "lab").unwrap();
        assert!(computer.diff().iter().any(|c| c.property == "description"));
        computer.save();
        assert!(computer.diff().is_empty());
        assert!(!computer.has_changed("description"));
    }

    #[test]
    fn test_compute_dn_escapes_value() {
        let env = TestEnv::new();
        let mut ou = env.ctx.new_object("container/ou", &env.base).unwrap();
        ou.set("name", "a,b").unwrap();
        assert_eq!(ou.compute_dn().unwrap(), format!("ou=a\\,b,{}", env.base));
    }
}
