//! The running simulation as a Bevy resource.

use bevy::prelude::Resource;

use crate::error::SimResult;
use crate::interaction::InteractionRequest;
use crate::landscape::Landscape;
use crate::scheduler::{ClassRegistry, EffectHandler, EffectId, ObjectId, ObjectState, Scheduler, World};

/// Objects, classes, landscape and the scheduler driving them.
#[derive(Resource, Default)]
pub struct Simulation {
  world: World,
  scheduler: Scheduler,
}

impl Simulation {
  pub fn new(classes: ClassRegistry) -> Self {
    Self {
      world: World::new(classes),
      scheduler: Scheduler::new(),
    }
  }

  pub fn world(&self) -> &World {
    &self.world
  }

  /// Direct world access for setup code. Running objects should change
  /// through [`Simulation::apply`].
  pub fn world_mut(&mut self) -> &mut World {
    &mut self.world
  }

  pub fn scheduler(&self) -> &Scheduler {
    &self.scheduler
  }

  pub fn landscape(&self) -> Option<&Landscape> {
    self.world.landscape.as_ref()
  }

  pub fn set_landscape(&mut self, landscape: Landscape) {
    self.world.landscape = Some(landscape);
  }

  /// Completed ticks.
  pub fn tick_count(&self) -> u64 {
    self.world.tick
  }

  pub fn tick(&mut self) {
    self.scheduler.tick(&mut self.world);
  }

  pub fn spawn(&mut self, state: ObjectState) -> SimResult<ObjectId> {
    self.scheduler.spawn(&mut self.world, state)
  }

  /// Applies interaction decisions in order.
  pub fn apply(&mut self, requests: impl IntoIterator<Item = InteractionRequest>) {
    self
      .scheduler
      .apply(&mut self.world, requests.into_iter().map(Into::into));
  }

  pub fn add_effect(
    &mut self,
    name: &str,
    host: Option<ObjectId>,
    priority: i32,
    interval: u32,
    handler: impl EffectHandler,
  ) -> SimResult<Option<EffectId>> {
    self
      .scheduler
      .add_effect(&mut self.world, name, host, priority, interval, Box::new(handler))
  }

  pub fn remove_effect(&mut self, id: EffectId) {
    self.scheduler.remove_effect(&mut self.world, id);
  }

  pub fn set_action(&mut self, object: ObjectId, action: &str) -> SimResult<()> {
    self.scheduler.set_action(&mut self.world, object, action)
  }

  pub fn remove_object(&mut self, object: ObjectId) -> bool {
    self.scheduler.remove_object(&mut self.world, object)
  }

  /// Drops every object and effect and restarts the tick count. Classes and
  /// landscape are kept.
  pub fn clear_objects(&mut self) {
    self.scheduler.clear();
    self.world.objects.clear();
    self.world.tick = 0;
  }
}
