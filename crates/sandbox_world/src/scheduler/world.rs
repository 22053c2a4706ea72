//! Simulation state shared by all callbacks.

use super::class::ClassRegistry;
use super::object::{ObjectId, ObjectState, ObjectTable};
use crate::error::SimResult;
use crate::landscape::Landscape;

/// Everything callbacks may read or change directly.
#[derive(Default)]
pub struct World {
  pub objects: ObjectTable,
  pub classes: ClassRegistry,
  pub landscape: Option<Landscape>,
  /// Number of completed ticks.
  pub tick: u64,
}

impl World {
  pub fn new(classes: ClassRegistry) -> Self {
    Self {
      classes,
      ..Default::default()
    }
  }

  pub fn with_landscape(mut self, landscape: Landscape) -> Self {
    self.landscape = Some(landscape);
    self
  }

  /// Inserts an object of a registered class without running any callback.
  pub(crate) fn insert(&mut self, state: ObjectState) -> SimResult<ObjectId> {
    self.classes.get(&state.class)?;
    Ok(self.objects.spawn(state))
  }

  /// Live contents of a container, in insertion order.
  pub fn contents(&self, container: ObjectId) -> Vec<ObjectId> {
    self
      .objects
      .try_get(container)
      .map(|c| {
        c.contents
          .iter()
          .copied()
          .filter(|id| self.objects.is_alive(*id))
          .collect()
      })
      .unwrap_or_default()
  }
}
