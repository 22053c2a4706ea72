//! Callback context and the deferred request queue.

use std::collections::VecDeque;

use super::effect::{EffectHandler, EffectId, EffectTable};
use super::object::{ObjectId, ObjectState};
use super::world::World;
use crate::error::SimResult;
use crate::interaction::InteractionRequest;
use crate::registry::Material;

/// Deferred change, applied by the scheduler after the current callback.
pub enum Request {
  SetAction {
    object: ObjectId,
    action: String,
  },
  RemoveObject(ObjectId),
  RemoveEffect(EffectId),
  RemoveNamedEffect {
    host: Option<ObjectId>,
    name: String,
  },
  AddEffect {
    name: String,
    host: Option<ObjectId>,
    priority: i32,
    interval: u32,
    handler: Box<dyn EffectHandler>,
  },
  /// Runs a named class callback on `object`.
  Call {
    object: ObjectId,
    callback: String,
  },
  Interaction(InteractionRequest),
}

impl std::fmt::Debug for Request {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::SetAction { object, action } => write!(f, "SetAction({}, {:?})", object, action),
      Self::RemoveObject(object) => write!(f, "RemoveObject({})", object),
      Self::RemoveEffect(id) => write!(f, "RemoveEffect({})", id),
      Self::RemoveNamedEffect { host, name } => {
        write!(f, "RemoveNamedEffect({:?}, {:?})", host, name)
      }
      Self::AddEffect { name, host, .. } => write!(f, "AddEffect({:?}, {:?})", name, host),
      Self::Call { object, callback } => write!(f, "Call({}, {:?})", object, callback),
      Self::Interaction(request) => write!(f, "Interaction({:?})", request),
    }
  }
}

impl From<InteractionRequest> for Request {
  fn from(request: InteractionRequest) -> Self {
    Self::Interaction(request)
  }
}

/// What a callback sees: the world, the effect table (read-only) and a queue
/// for structural changes.
pub struct Context<'a> {
  pub world: &'a mut World,
  effects: &'a EffectTable,
  queue: &'a mut VecDeque<Request>,
  host: Option<ObjectId>,
  effect: Option<EffectId>,
}

impl<'a> Context<'a> {
  pub(crate) fn new(
    world: &'a mut World,
    effects: &'a EffectTable,
    queue: &'a mut VecDeque<Request>,
    host: Option<ObjectId>,
    effect: Option<EffectId>,
  ) -> Self {
    Self {
      world,
      effects,
      queue,
      host,
      effect,
    }
  }

  /// Object the running callback belongs to, `None` for global effects.
  pub fn host(&self) -> Option<ObjectId> {
    self.host
  }

  /// Effect whose callback is running.
  pub fn effect(&self) -> Option<EffectId> {
    self.effect
  }

  pub fn tick(&self) -> u64 {
    self.world.tick
  }

  pub fn effects(&self) -> &EffectTable {
    self.effects
  }

  pub fn object(&self, id: ObjectId) -> SimResult<&ObjectState> {
    self.world.objects.get(id)
  }

  pub fn object_mut(&mut self, id: ObjectId) -> SimResult<&mut ObjectState> {
    self.world.objects.get_mut(id)
  }

  /// Host state. Global callbacks have no host and get `None`.
  pub fn host_state(&self) -> Option<&ObjectState> {
    self.host.and_then(|id| self.world.objects.try_get(id))
  }

  pub fn host_state_mut(&mut self) -> Option<&mut ObjectState> {
    let id = self.host?;
    self.world.objects.get_mut(id).ok()
  }

  /// Terrain material under an object.
  pub fn material_under(&self, id: ObjectId) -> Option<&Material> {
    let state = self.world.objects.try_get(id)?;
    self.world.landscape.as_ref()?.material_at(state.x, state.y)
  }

  pub fn request(&mut self, request: impl Into<Request>) {
    self.queue.push_back(request.into());
  }

  pub fn set_action(&mut self, object: ObjectId, action: impl Into<String>) {
    self.request(Request::SetAction {
      object,
      action: action.into(),
    });
  }

  pub fn remove_object(&mut self, object: ObjectId) {
    self.request(Request::RemoveObject(object));
  }

  pub fn remove_effect(&mut self, id: EffectId) {
    self.request(Request::RemoveEffect(id));
  }

  pub fn remove_named_effect(&mut self, host: Option<ObjectId>, name: impl Into<String>) {
    self.request(Request::RemoveNamedEffect {
      host,
      name: name.into(),
    });
  }

  pub fn add_effect(
    &mut self,
    name: impl Into<String>,
    host: Option<ObjectId>,
    priority: i32,
    interval: u32,
    handler: impl EffectHandler,
  ) {
    self.request(Request::AddEffect {
      name: name.into(),
      host,
      priority,
      interval,
      handler: Box::new(handler),
    });
  }

  pub fn call(&mut self, object: ObjectId, callback: impl Into<String>) {
    self.request(Request::Call {
      object,
      callback: callback.into(),
    });
  }
}
