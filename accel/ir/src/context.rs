use crate::{Component, ComponentIdx, LibrarySignatures};
use accel_idx::IndexedMap;
use accel_utils::{AccelResult, Error, GetName, Id};

/// The complete design: a registry of component definitions, the primitive
/// library they instantiate, and the name of the entrypoint.
#[derive(Debug, Clone)]
pub struct Context {
    /// The components for this program.
    pub components: IndexedMap<ComponentIdx, Component>,
    /// Library definitions imported by the program.
    pub lib: LibrarySignatures,
    /// Entrypoint for the program.
    pub entrypoint: Id,
}

impl Context {
    /// A context with the standard primitive library and no components.
    pub fn new<S: Into<Id>>(entrypoint: S) -> Self {
        Self {
            components: IndexedMap::new(),
            lib: LibrarySignatures::default(),
            entrypoint: entrypoint.into(),
        }
    }

    /// Register a component definition. Names must be unique.
    pub fn add_component(&mut self, comp: Component) -> AccelResult<ComponentIdx> {
        if self.find_component(comp.name).is_some() {
            return Err(Error::already_bound(comp.name, "component"));
        }
        log::debug!("registered component `{}'", comp.name);
        Ok(self.components.push(comp))
    }

    pub fn find_component<S: Into<Id>>(&self, name: S) -> Option<ComponentIdx> {
        let name = name.into();
        self.components.find_key(|c| c.name() == name)
    }

    /// Look up a component definition by name.
    pub fn get_component<S: Into<Id>>(&self, name: S) -> AccelResult<&Component> {
        let name = name.into();
        self.find_component(name)
            .map(|idx| &self.components[idx])
            .ok_or_else(|| Error::undefined(name, "component"))
    }

    /// The entrypoint component.
    pub fn entrypoint(&self) -> AccelResult<&Component> {
        self.get_component(self.entrypoint)
    }
}
