//! Object classes: action tables, named callbacks and capabilities.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::action::{ActMap, ActionDef};
use super::context::Context;
use crate::error::{SimError, SimResult};
use crate::interaction::Capabilities;

/// Callback run when a class is spawned, if defined.
pub const INITIALIZE: &str = "Initialize";

/// Named class callback. Runs with the object as context host.
pub type ClassCallback = Arc<dyn Fn(&mut Context) -> SimResult<()> + Send + Sync>;

/// Shared definition of one kind of object.
#[derive(Clone, Default)]
pub struct ObjectClass {
  pub name: String,
  pub act_map: ActMap,
  pub capabilities: Capabilities,
  callbacks: HashMap<String, ClassCallback>,
}

impl ObjectClass {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      ..Default::default()
    }
  }

  pub fn with_action(mut self, action: ActionDef) -> Self {
    self.act_map.actions.push(action);
    self
  }

  pub fn with_act_map(mut self, act_map: ActMap) -> Self {
    self.act_map = act_map;
    self
  }

  pub fn with_callback(
    mut self,
    name: impl Into<String>,
    callback: impl Fn(&mut Context) -> SimResult<()> + Send + Sync + 'static,
  ) -> Self {
    self.callbacks.insert(name.into(), Arc::new(callback));
    self
  }

  pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
    self.capabilities = capabilities;
    self
  }

  pub fn callback(&self, name: &str) -> Option<&ClassCallback> {
    self.callbacks.get(name)
  }
}

impl fmt::Debug for ObjectClass {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut callbacks: Vec<_> = self.callbacks.keys().collect();
    callbacks.sort();
    f.debug_struct("ObjectClass")
      .field("name", &self.name)
      .field("act_map", &self.act_map)
      .field("capabilities", &self.capabilities)
      .field("callbacks", &callbacks)
      .finish()
  }
}

/// Registered classes by name.
#[derive(Clone, Debug, Default)]
pub struct ClassRegistry {
  classes: HashMap<String, Arc<ObjectClass>>,
}

impl ClassRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Registers a class after validating its action table. A class of the
  /// same name is replaced.
  pub fn register(&mut self, class: ObjectClass) -> SimResult<()> {
    class.act_map.validate(&class.name)?;
    self.classes.insert(class.name.clone(), Arc::new(class));
    Ok(())
  }

  pub fn get(&self, name: &str) -> SimResult<Arc<ObjectClass>> {
    self
      .classes
      .get(name)
      .cloned()
      .ok_or_else(|| SimError::UnknownClass {
        name: name.to_string(),
      })
  }

  pub fn contains(&self, name: &str) -> bool {
    self.classes.contains_key(name)
  }

  pub fn len(&self) -> usize {
    self.classes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.classes.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn register_validates_act_map() {
    let mut classes = ClassRegistry::new();
    let bad = ObjectClass::new("Bird").with_action(ActionDef::new("Fly", 2, 1).next("Land"));
    assert!(matches!(
      classes.register(bad),
      Err(SimError::InvalidActionState { .. })
    ));
    assert!(!classes.contains("Bird"));
  }

  #[test]
  fn unknown_class_lookup_fails() {
    assert!(matches!(
      ClassRegistry::new().get("Ghost"),
      Err(SimError::UnknownClass { .. })
    ));
  }
}
