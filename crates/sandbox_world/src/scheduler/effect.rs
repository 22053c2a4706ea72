//! Effects: named, prioritized, interval-timed behaviors.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;

use super::context::Context;
use super::object::ObjectId;
use crate::error::SimResult;

/// Handle of a registered effect. Ids are never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EffectId(pub(crate) u64);

impl fmt::Display for EffectId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "fx{}", self.0)
  }
}

/// Return value of [`EffectHandler::timer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EffectControl {
  Continue,
  Remove,
}

/// Answer of an existing effect to a new effect on the same host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
  Accept,
  /// The new effect is dropped.
  Reject,
  /// The new effect is folded into this one through [`EffectHandler::merge`].
  Merge,
}

/// Why an effect stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
  /// Removed by a call or request.
  Removed,
  /// Its timer returned [`EffectControl::Remove`].
  Finished,
  /// The host object was removed.
  HostRemoved,
}

/// Behavior attached to an effect.
///
/// Handlers run with a [`Context`] scoped to the effect's host. Changes to
/// other objects, actions and effects are queued as requests and applied
/// right after the callback returns.
pub trait EffectHandler: Send + Sync + 'static {
  /// Runs once when the effect is added. Returning
  /// [`EffectControl::Remove`] cancels the effect.
  fn start(&mut self, _ctx: &mut Context) -> SimResult<EffectControl> {
    Ok(EffectControl::Continue)
  }

  /// Runs every `interval` ticks. `time` counts ticks since the start.
  fn timer(&mut self, ctx: &mut Context, time: u64) -> SimResult<EffectControl>;

  fn stop(&mut self, _ctx: &mut Context, _reason: StopReason) -> SimResult<()> {
    Ok(())
  }

  /// Asked for every new effect on the same host.
  fn admit(&mut self, _ctx: &mut Context, _incoming: &str) -> Admission {
    Admission::Accept
  }

  /// Absorbs an effect this handler answered [`Admission::Merge`] for.
  fn merge(&mut self, _ctx: &mut Context, _incoming: Box<dyn EffectHandler>) -> SimResult<()> {
    Ok(())
  }

  fn as_any(&self) -> &dyn Any;

  fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

/// A registered effect.
pub struct Effect {
  pub name: String,
  pub host: Option<ObjectId>,
  pub priority: i32,
  /// Ticks between timer calls; 0 disables the timer.
  pub interval: u32,
  pub(crate) counter: u32,
  pub(crate) seq: u64,
  pub(crate) started_at: u64,
  /// Cleared for effects added during a tick until that tick ends.
  pub(crate) armed: bool,
  pub(crate) stopping: Option<StopReason>,
  /// Taken out while one of its callbacks runs.
  pub(crate) handler: Option<Box<dyn EffectHandler>>,
}

impl Effect {
  pub fn is_live(&self) -> bool {
    self.stopping.is_none()
  }

  pub fn started_at(&self) -> u64 {
    self.started_at
  }
}

impl fmt::Debug for Effect {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Effect")
      .field("name", &self.name)
      .field("host", &self.host)
      .field("priority", &self.priority)
      .field("interval", &self.interval)
      .field("counter", &self.counter)
      .field("stopping", &self.stopping)
      .finish()
  }
}

/// All effects, with per-host execution order.
#[derive(Default)]
pub struct EffectTable {
  effects: BTreeMap<EffectId, Effect>,
  /// Ascending priority, ties by insertion sequence.
  order: BTreeMap<Option<ObjectId>, Vec<EffectId>>,
  /// Flagged for removal, in flag order.
  doomed: Vec<EffectId>,
  next_id: u64,
  next_seq: u64,
}

impl EffectTable {
  pub(crate) fn insert(&mut self, mut effect: Effect) -> EffectId {
    let id = EffectId(self.next_id);
    self.next_id += 1;
    effect.seq = self.next_seq;
    self.next_seq += 1;

    let key = (effect.priority, effect.seq);
    let list = self.order.entry(effect.host).or_default();
    let effects = &self.effects;
    let at = list.partition_point(|other| {
      effects
        .get(other)
        .is_some_and(|e| (e.priority, e.seq) <= key)
    });
    list.insert(at, id);
    self.effects.insert(id, effect);
    id
  }

  pub fn get(&self, id: EffectId) -> Option<&Effect> {
    self.effects.get(&id)
  }

  pub(crate) fn get_mut(&mut self, id: EffectId) -> Option<&mut Effect> {
    self.effects.get_mut(&id)
  }

  /// Effects of `host` in execution order, stopping ones included.
  pub fn on_host(&self, host: Option<ObjectId>) -> Vec<EffectId> {
    self.order.get(&host).cloned().unwrap_or_default()
  }

  /// Hosts with at least one effect.
  pub(crate) fn hosts(&self) -> Vec<Option<ObjectId>> {
    self.order.keys().copied().collect()
  }

  /// First live effect named `name` on `host`.
  pub fn find(&self, host: Option<ObjectId>, name: &str) -> Option<EffectId> {
    self
      .order
      .get(&host)?
      .iter()
      .copied()
      .find(|id| self.effects.get(id).is_some_and(|e| e.is_live() && e.name == name))
  }

  /// Number of live effects named `name` on `host`.
  pub fn count(&self, host: Option<ObjectId>, name: &str) -> usize {
    self.order.get(&host).map_or(0, |ids| {
      ids
        .iter()
        .filter(|id| self.effects.get(id).is_some_and(|e| e.is_live() && e.name == name))
        .count()
    })
  }

  /// Typed view of an effect's handler.
  pub fn handler<T: EffectHandler>(&self, id: EffectId) -> Option<&T> {
    self
      .effects
      .get(&id)?
      .handler
      .as_deref()?
      .as_any()
      .downcast_ref::<T>()
  }

  /// Flags an effect for removal. Returns false if it is gone or already
  /// flagged.
  pub(crate) fn flag(&mut self, id: EffectId, reason: StopReason) -> bool {
    match self.effects.get_mut(&id) {
      Some(effect) if effect.stopping.is_none() => {
        effect.stopping = Some(reason);
        self.doomed.push(id);
        true
      }
      _ => false,
    }
  }

  pub(crate) fn take_doomed(&mut self) -> Vec<EffectId> {
    std::mem::take(&mut self.doomed)
  }

  pub(crate) fn remove(&mut self, id: EffectId) -> Option<Effect> {
    let effect = self.effects.remove(&id)?;
    if let Some(list) = self.order.get_mut(&effect.host) {
      list.retain(|other| *other != id);
      if list.is_empty() {
        self.order.remove(&effect.host);
      }
    }
    Some(effect)
  }

  pub(crate) fn arm_all(&mut self) {
    for effect in self.effects.values_mut() {
      effect.armed = true;
    }
  }

  pub fn len(&self) -> usize {
    self.effects.len()
  }

  pub fn is_empty(&self) -> bool {
    self.effects.is_empty()
  }

  pub(crate) fn clear(&mut self) {
    self.effects.clear();
    self.order.clear();
    self.doomed.clear();
  }
}
