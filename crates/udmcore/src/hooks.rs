//! Extension hooks and extended attributes.
//!
//! An [`ExtendedAttribute`] adds a property to an object type at runtime,
//! stored in an attribute of an auxiliary object class. It may carry an
//! [`ExtensionHook`] that takes part in the object's lifecycle.
//!
//! Hooks come in two flavours. The list hooks ([`addlist`](ExtensionHook::addlist),
//! [`modlist`](ExtensionHook::modlist)) receive the in-progress list and
//! return the one to use. Every other hook observes; `open` and the `pre_*`
//! hooks may still adjust property values through the object they get.

use crate::directory::Modification;
use crate::error::Result;
use crate::object::DirectoryObject;
use crate::property::PropertyDescriptor;
use std::fmt;
use std::rc::Rc;

pub trait ExtensionHook {
    fn name(&self) -> &str;

    /// Hooks only run for objects they apply to.
    fn applies_to(&self, _object: &DirectoryObject) -> bool {
        true
    }

    fn open(&self, _object: &mut DirectoryObject) -> Result<()> {
        Ok(())
    }

    fn pre_create(&self, _object: &mut DirectoryObject) -> Result<()> {
        Ok(())
    }

    fn addlist(
        &self,
        _object: &DirectoryObject,
        addlist: Vec<Modification>,
    ) -> Result<Vec<Modification>> {
        Ok(addlist)
    }

    fn post_create(&self, _object: &DirectoryObject) -> Result<()> {
        Ok(())
    }

    fn pre_modify(&self, _object: &mut DirectoryObject) -> Result<()> {
        Ok(())
    }

    fn modlist(
        &self,
        _object: &DirectoryObject,
        modlist: Vec<Modification>,
    ) -> Result<Vec<Modification>> {
        Ok(modlist)
    }

    fn post_modify(&self, _object: &DirectoryObject) -> Result<()> {
        Ok(())
    }

    fn pre_remove(&self, _object: &mut DirectoryObject) -> Result<()> {
        Ok(())
    }

    fn post_remove(&self, _object: &DirectoryObject) -> Result<()> {
        Ok(())
    }

    fn pre_move(&self, _object: &mut DirectoryObject, _new_dn: &str) -> Result<()> {
        Ok(())
    }

    /// Runs once the object carries its new DN.
    fn post_move(&self, _object: &DirectoryObject, _old_dn: &str) -> Result<()> {
        Ok(())
    }
}

/// A property registered on an object type at runtime.
#[derive(Clone)]
pub struct ExtendedAttribute {
    pub property: PropertyDescriptor,
    pub object_class: &'static str,
    pub attribute: &'static str,
    /// Drop `object_class` from entries once the property is emptied.
    pub delete_object_class: bool,
    pub hook: Option<Rc<dyn ExtensionHook>>,
}

impl ExtendedAttribute {
    pub fn new(
        property: PropertyDescriptor,
        object_class: &'static str,
        attribute: &'static str,
    ) -> Self {
        Self {
            property,
            object_class,
            attribute,
            delete_object_class: false,
            hook: None,
        }
    }

    pub fn delete_object_class(mut self) -> Self {
        self.delete_object_class = true;
        self
    }

    pub fn with_hook(mut self, hook: Rc<dyn ExtensionHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Boolean extended attributes count as unset when `"0"`.
    pub fn is_set(&self, object: &DirectoryObject) -> bool {
        let value = object.info(self.property.name);
        match self.property.syntax {
            crate::syntax::Syntax::Boolean => value.is_true(),
            _ => !value.is_empty(),
        }
    }
}

impl fmt::Debug for ExtendedAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtendedAttribute")
            .field("property", &self.property.name)
            .field("object_class", &self.object_class)
            .field("attribute", &self.attribute)
            .field("delete_object_class", &self.delete_object_class)
            .field("hook", &self.hook.as_ref().map(|h| h.name().to_string()))
            .finish()
    }
}
