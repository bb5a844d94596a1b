use crate::allocator::Allocator;
use crate::config::EngineConfig;
use crate::directory::DirectoryClient;
use crate::error::{Result, UdmError};
use crate::module::{ModuleRegistry, ObjectType};
use crate::object::DirectoryObject;
use std::rc::Rc;

/// Collaborators shared by every object of one session.
///
/// Cloning is cheap; all parts are reference counted.
#[derive(Clone)]
pub struct Context {
    pub directory: Rc<dyn DirectoryClient>,
    pub allocator: Rc<dyn Allocator>,
    pub modules: Rc<ModuleRegistry>,
    pub config: Rc<EngineConfig>,
}

impl Context {
    pub fn new(
        directory: Rc<dyn DirectoryClient>,
        allocator: Rc<dyn Allocator>,
        config: EngineConfig,
    ) -> Self {
        Self {
            directory,
            allocator,
            modules: Rc::new(ModuleRegistry::builtin()),
            config: Rc::new(config),
        }
    }

    pub fn with_modules(mut self, modules: ModuleRegistry) -> Self {
        self.modules = Rc::new(modules);
        self
    }

    pub fn object_type(&self, name: &str) -> Result<Rc<ObjectType>> {
        self.modules.get(name)
    }

    /// Type of the entry at `dn`, if it exists and is recognized.
    pub fn identify(&self, dn: &str) -> Result<Option<Rc<ObjectType>>> {
        Ok(self
            .directory
            .get(dn)?
            .and_then(|attrs| self.modules.identify(dn, &attrs)))
    }

    /// A new, unsaved object of type `name` to be created below `position`.
    pub fn new_object(&self, name: &str, position: &str) -> Result<DirectoryObject> {
        DirectoryObject::new(self.clone(), self.object_type(name)?, position)
    }

    /// Load and open the entry at `dn`, recognizing its type.
    pub fn open(&self, dn: &str) -> Result<DirectoryObject> {
        let object_type = self
            .identify(dn)?
            .ok_or_else(|| UdmError::NotFound(format!("no recognized object at {}", dn)))?;
        let mut object = DirectoryObject::load(self.clone(), object_type, dn)?;
        object.open()?;
        Ok(object)
    }

    /// Load and open the entry at `dn` as type `name`.
    pub fn open_as(&self, name: &str, dn: &str) -> Result<DirectoryObject> {
        let mut object = DirectoryObject::load(self.clone(), self.object_type(name)?, dn)?;
        object.open()?;
        Ok(object)
    }
}
