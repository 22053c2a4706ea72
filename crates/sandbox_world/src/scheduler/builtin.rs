//! Effects every world knows: deferred calls, fading and fire.

use std::any::Any;

use bevy::log::{debug, warn};

use super::context::Context;
use super::effect::{Admission, EffectControl, EffectHandler, EffectId, StopReason};
use super::object::{ObjectFlags, ObjectId};
use super::world::World;
use super::Scheduler;
use crate::error::SimResult;

pub const SCHEDULE_CALL: &str = "ScheduleCall";
pub const FADE_OUT: &str = "FadeOut";
pub const FIRE: &str = "Fire";

/// Fire runs late so other effects see the burning state of this tick.
pub const FIRE_PRIORITY: i32 = 100;
const FIRE_DECAY_TICKS: u64 = 4;
const FIRE_EXTINGUISH_CHECK_TICKS: u64 = 24;
const MAX_FIRE_STRENGTH: u32 = 100;

/// Runs a class callback on the host every `interval` ticks.
#[derive(Clone, Debug)]
pub struct ScheduleCall {
  pub callback: String,
  /// Remaining calls; `None` repeats forever.
  pub repeats: Option<u32>,
}

impl EffectHandler for ScheduleCall {
  fn timer(&mut self, ctx: &mut Context, _time: u64) -> SimResult<EffectControl> {
    let Some(host) = ctx.host() else {
      warn!("ScheduleCall {:?} has no host", self.callback);
      return Ok(EffectControl::Remove);
    };
    ctx.call(host, self.callback.clone());
    match &mut self.repeats {
      Some(n) => {
        *n = n.saturating_sub(1);
        Ok(if *n == 0 {
          EffectControl::Remove
        } else {
          EffectControl::Continue
        })
      }
      None => Ok(EffectControl::Continue),
    }
  }

  fn as_any(&self) -> &dyn Any {
    self
  }

  fn into_any(self: Box<Self>) -> Box<dyn Any> {
    self
  }
}

/// Lowers the host's alpha each timer call and removes it once invisible.
#[derive(Clone, Debug)]
pub struct FadeOut {
  pub step: u8,
}

impl EffectHandler for FadeOut {
  fn timer(&mut self, ctx: &mut Context, _time: u64) -> SimResult<EffectControl> {
    let step = self.step.max(1);
    let Some(state) = ctx.host_state_mut() else {
      return Ok(EffectControl::Remove);
    };
    let alpha = state.alpha();
    if alpha <= step {
      state.set_alpha(0);
      if let Some(host) = ctx.host() {
        ctx.remove_object(host);
      }
      return Ok(EffectControl::Remove);
    }
    state.set_alpha(alpha - step);
    Ok(EffectControl::Continue)
  }

  fn as_any(&self) -> &dyn Any {
    self
  }

  fn into_any(self: Box<Self>) -> Box<dyn Any> {
    self
  }
}

/// Burning. Strength decays over time unless the host is flagged
/// [`ObjectFlags::NO_BURN_DECAY`]; extinguishing terrain under the host puts
/// it out. A second fire on the same host merges into the first.
#[derive(Clone, Debug)]
pub struct Fire {
  pub strength: u32,
}

impl Fire {
  pub fn new(strength: u32) -> Self {
    Self {
      strength: strength.clamp(1, MAX_FIRE_STRENGTH),
    }
  }
}

impl EffectHandler for Fire {
  fn start(&mut self, ctx: &mut Context) -> SimResult<EffectControl> {
    let Some(state) = ctx.host_state_mut() else {
      return Ok(EffectControl::Remove);
    };
    if state.flags.contains(ObjectFlags::FIREPROOF) {
      return Ok(EffectControl::Remove);
    }
    state.flags.insert(ObjectFlags::ON_FIRE);
    Ok(EffectControl::Continue)
  }

  fn timer(&mut self, ctx: &mut Context, time: u64) -> SimResult<EffectControl> {
    let Some(host) = ctx.host() else {
      return Ok(EffectControl::Remove);
    };
    if time % FIRE_EXTINGUISH_CHECK_TICKS == 0
      && ctx.material_under(host).is_some_and(|m| m.extinguisher)
    {
      debug!("Fire on {} extinguished by terrain", host);
      return Ok(EffectControl::Remove);
    }
    if time % FIRE_DECAY_TICKS == 0 {
      let no_decay = ctx
        .host_state()
        .is_some_and(|s| s.flags.contains(ObjectFlags::NO_BURN_DECAY));
      if no_decay {
        self.strength = (self.strength + 1).min(MAX_FIRE_STRENGTH);
      } else {
        self.strength = self.strength.saturating_sub(1);
        if self.strength == 0 {
          return Ok(EffectControl::Remove);
        }
      }
    }
    Ok(EffectControl::Continue)
  }

  fn stop(&mut self, ctx: &mut Context, _reason: StopReason) -> SimResult<()> {
    if let Some(state) = ctx.host_state_mut() {
      state.flags.remove(ObjectFlags::ON_FIRE);
    }
    Ok(())
  }

  fn admit(&mut self, _ctx: &mut Context, incoming: &str) -> Admission {
    if incoming == FIRE {
      Admission::Merge
    } else {
      Admission::Accept
    }
  }

  fn merge(&mut self, _ctx: &mut Context, incoming: Box<dyn EffectHandler>) -> SimResult<()> {
    if let Ok(other) = incoming.into_any().downcast::<Fire>() {
      self.strength = (self.strength + other.strength).min(MAX_FIRE_STRENGTH);
    }
    Ok(())
  }

  fn as_any(&self) -> &dyn Any {
    self
  }

  fn into_any(self: Box<Self>) -> Box<dyn Any> {
    self
  }
}

impl Scheduler {
  /// Calls `callback` on `object` every `interval` ticks, `repeats` times or
  /// forever.
  pub fn schedule_call(
    &mut self,
    world: &mut World,
    object: ObjectId,
    callback: &str,
    interval: u32,
    repeats: Option<u32>,
  ) -> SimResult<Option<EffectId>> {
    self.add_effect(
      world,
      SCHEDULE_CALL,
      Some(object),
      1,
      interval.max(1),
      Box::new(ScheduleCall {
        callback: callback.to_string(),
        repeats,
      }),
    )
  }

  /// Cancels every scheduled call of `callback` on `object`. Returns how
  /// many were cancelled.
  pub fn clear_schedule_call(&mut self, world: &mut World, object: ObjectId, callback: &str) -> usize {
    let ids: Vec<_> = self
      .effects()
      .on_host(Some(object))
      .into_iter()
      .filter(|id| {
        self
          .effects()
          .handler::<ScheduleCall>(*id)
          .is_some_and(|h| h.callback == callback)
      })
      .collect();
    let mut cancelled = 0;
    for id in ids {
      if self.effects().get(id).is_some_and(|e| e.is_live()) {
        self.remove_effect(world, id);
        cancelled += 1;
      }
    }
    cancelled
  }

  /// Sets `object` on fire, or feeds an existing fire.
  pub fn incinerate(&mut self, world: &mut World, object: ObjectId, strength: u32) -> SimResult<Option<EffectId>> {
    self.add_effect(world, FIRE, Some(object), FIRE_PRIORITY, 1, Box::new(Fire::new(strength)))
  }

  pub fn extinguish(&mut self, world: &mut World, object: ObjectId) -> bool {
    self.remove_named(world, Some(object), FIRE)
  }
}
