//! Object interaction layer.
//!
//! Interaction rules are pure decisions: they read the world and return
//! [`InteractionRequest`]s. Requests only take effect when applied through
//! the scheduler, so every state change goes through one path.

pub mod catalog;
pub mod contact;
pub mod inventory;
pub mod power;

use std::fmt;
use std::sync::Arc;

use bevy::log::debug;

pub use contact::{ContactResponse, contact_response, resolve_contact};
pub use inventory::{CollectDecision, InventoryRules, NO_COLLECTION, RejectReason, check_collect};
pub use power::PowerGenerator;

use crate::error::SimResult;
use crate::scheduler::builtin::{FIRE, FIRE_PRIORITY, Fire};
use crate::scheduler::{Context, ObjectFlags, ObjectId, ObjectState};

/// Objects that react to being hit by terrain or other objects.
pub trait Hittable: Send + Sync {
  fn hit(&self, ctx: &mut Context, object: ObjectId, speed: i32) -> SimResult<()>;
}

/// Objects a generator can burn.
pub trait FuelSource: Send + Sync {
  /// Fuel units this object yields. `partial` asks for what a partially
  /// built object is worth.
  fn fuel_amount(&self, state: &ObjectState, partial: bool) -> u32;
}

/// Objects that can be picked up.
pub trait Collectible: Send + Sync {
  /// Heavy items are carried one at a time.
  fn carry_heavy(&self) -> bool {
    false
  }
}

/// Veto of a collector class over items it would pick up.
pub trait CollectPolicy: Send + Sync {
  fn reject_collect(&self, collector: &ObjectState, item_class: &str) -> bool;
}

/// What a class can do, declared on the class and dispatched directly.
#[derive(Clone, Default)]
pub struct Capabilities {
  pub hittable: Option<Arc<dyn Hittable>>,
  pub fuel: Option<Arc<dyn FuelSource>>,
  pub collectible: Option<Arc<dyn Collectible>>,
  pub collect_policy: Option<Arc<dyn CollectPolicy>>,
}

impl Capabilities {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn hittable(mut self, hittable: impl Hittable + 'static) -> Self {
    self.hittable = Some(Arc::new(hittable));
    self
  }

  pub fn fuel(mut self, fuel: impl FuelSource + 'static) -> Self {
    self.fuel = Some(Arc::new(fuel));
    self
  }

  pub fn collectible(mut self, collectible: impl Collectible + 'static) -> Self {
    self.collectible = Some(Arc::new(collectible));
    self
  }

  pub fn collect_policy(mut self, policy: impl CollectPolicy + 'static) -> Self {
    self.collect_policy = Some(Arc::new(policy));
    self
  }
}

impl fmt::Debug for Capabilities {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Capabilities")
      .field("hittable", &self.hittable.is_some())
      .field("fuel", &self.fuel.is_some())
      .field("collectible", &self.collectible.is_some())
      .field("collect_policy", &self.collect_policy.is_some())
      .finish()
  }
}

/// Fuel worth a fixed amount when complete, or completion divided by
/// `partial_divisor` when partial.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConFuel {
  pub full: u32,
  pub partial_divisor: u32,
}

impl ConFuel {
  pub const COAL: Self = Self {
    full: 100,
    partial_divisor: 1,
  };
  pub const WOOD: Self = Self {
    full: 50,
    partial_divisor: 2,
  };
}

impl FuelSource for ConFuel {
  fn fuel_amount(&self, state: &ObjectState, partial: bool) -> u32 {
    if partial {
      state.con / self.partial_divisor.max(1)
    } else {
      self.full
    }
  }
}

/// A plain collectible item.
#[derive(Clone, Copy, Debug, Default)]
pub struct Item {
  pub heavy: bool,
}

impl Collectible for Item {
  fn carry_heavy(&self) -> bool {
    self.heavy
  }
}

/// A state change decided by an interaction rule.
#[derive(Clone, Debug, PartialEq)]
pub enum InteractionRequest {
  SetAction { object: ObjectId, action: String },
  RemoveObject(ObjectId),
  AddPower { object: ObjectId, amount: i32 },
  AddFuel { object: ObjectId, amount: i32 },
  /// Moves a contained item out next to its container.
  Eject {
    item: ObjectId,
    dx: i32,
    dy: i32,
    xdir: i32,
    ydir: i32,
  },
  Enter { item: ObjectId, container: ObjectId },
  Hit { object: ObjectId, speed: i32 },
  Incinerate { object: ObjectId, strength: u32 },
  Extinguish { object: ObjectId },
}

impl InteractionRequest {
  /// Object the request is about.
  pub fn subject(&self) -> ObjectId {
    match self {
      Self::SetAction { object, .. }
      | Self::RemoveObject(object)
      | Self::AddPower { object, .. }
      | Self::AddFuel { object, .. }
      | Self::Hit { object, .. }
      | Self::Incinerate { object, .. }
      | Self::Extinguish { object } => *object,
      Self::Eject { item, .. } | Self::Enter { item, .. } => *item,
    }
  }
}

fn add_clamped(value: u32, amount: i32) -> u32 {
  (value as i64 + amount as i64).clamp(0, u32::MAX as i64) as u32
}

/// Applies one request. Structural changes are re-queued on the context.
pub(crate) fn apply(ctx: &mut Context, request: InteractionRequest) -> SimResult<()> {
  match request {
    InteractionRequest::SetAction { object, action } => ctx.set_action(object, action),
    InteractionRequest::RemoveObject(object) => ctx.remove_object(object),
    InteractionRequest::AddPower { object, amount } => {
      let state = ctx.object_mut(object)?;
      state.power = add_clamped(state.power, amount);
    }
    InteractionRequest::AddFuel { object, amount } => {
      let state = ctx.object_mut(object)?;
      state.fuel = add_clamped(state.fuel, amount);
    }
    InteractionRequest::Eject {
      item,
      dx,
      dy,
      xdir,
      ydir,
    } => {
      let Some(container) = ctx.object(item)?.container else {
        debug!("Eject of {} ignored: not contained", item);
        return Ok(());
      };
      let (cx, cy) = match ctx.world.objects.get_mut(container) {
        Ok(c) => {
          c.contents.retain(|other| *other != item);
          (c.x, c.y)
        }
        Err(_) => (0, 0),
      };
      let state = ctx.object_mut(item)?;
      state.container = None;
      state.x = cx + dx;
      state.y = cy + dy;
      state.xdir = xdir;
      state.ydir = ydir;
    }
    InteractionRequest::Enter { item, container } => {
      if item == container {
        return Ok(());
      }
      let (cx, cy) = {
        let c = ctx.object(container)?;
        (c.x, c.y)
      };
      let previous = ctx.object(item)?.container;
      if let Some(previous) = previous {
        if let Ok(p) = ctx.world.objects.get_mut(previous) {
          p.contents.retain(|other| *other != item);
        }
      }
      let state = ctx.object_mut(item)?;
      state.container = Some(container);
      state.x = cx;
      state.y = cy;
      state.xdir = 0;
      state.ydir = 0;
      let c = ctx.object_mut(container)?;
      if !c.contents.contains(&item) {
        c.contents.push(item);
      }
    }
    InteractionRequest::Hit { object, speed } => {
      let class = ctx.world.classes.get(&ctx.object(object)?.class)?;
      if let Some(hittable) = class.capabilities.hittable.clone() {
        hittable.hit(ctx, object, speed)?;
      }
    }
    InteractionRequest::Incinerate { object, strength } => {
      if ctx.object(object)?.flags.contains(ObjectFlags::FIREPROOF) {
        return Ok(());
      }
      ctx.add_effect(FIRE, Some(object), FIRE_PRIORITY, 1, Fire::new(strength));
    }
    InteractionRequest::Extinguish { object } => {
      ctx.remove_named_effect(Some(object), FIRE);
    }
  }
  Ok(())
}
