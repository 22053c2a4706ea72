//! Object table with generational handles.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::fmt;

use bitflags::bitflags;

use super::action::ActionState;
use crate::error::{SimError, SimResult};

/// Handle to an object in an [`ObjectTable`].
///
/// A handle outlives its object: once the object is removed, every lookup
/// through the handle fails with [`SimError::EffectHostGone`], even after the
/// slot is reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId {
  index: u32,
  generation: u32,
}

impl ObjectId {
  pub fn index(self) -> u32 {
    self.index
  }

  pub fn generation(self) -> u32 {
    self.generation
  }
}

impl fmt::Display for ObjectId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "#{}v{}", self.index, self.generation)
  }
}

bitflags! {
  /// Per-object state flags.
  #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
  pub struct ObjectFlags: u8 {
    /// Object is alive (creatures).
    const ALIVE = 1 << 0;
    /// Object is currently burning.
    const ON_FIRE = 1 << 1;
    /// Fire on this object never burns down on its own.
    const NO_BURN_DECAY = 1 << 2;
    /// Object cannot be set on fire.
    const FIREPROOF = 1 << 3;
  }
}

/// Fully opaque white, the neutral color modulation.
pub const OPAQUE_WHITE: u32 = 0xFFFF_FFFF;

/// Mutable state of one simulation object.
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectState {
  /// Name of the object's class in the class registry.
  pub class: String,
  pub x: i32,
  pub y: i32,
  pub xdir: i32,
  pub ydir: i32,
  /// Owning player, `None` for neutral objects.
  pub owner: Option<u32>,
  pub container: Option<ObjectId>,
  pub contents: Vec<ObjectId>,
  /// Completion in percent.
  pub con: u32,
  /// `0xAARRGGBB` color modulation.
  pub clr_modulation: u32,
  pub power: u32,
  pub fuel: u32,
  pub flags: ObjectFlags,
  /// Free-form counters for class callbacks.
  pub counters: HashMap<String, i64>,
  pub(crate) action: Option<ActionState>,
  /// Bumped on every action change; lets the scheduler notice that an end
  /// call switched the action itself.
  pub(crate) action_epoch: u64,
}

impl ObjectState {
  pub fn new(class: impl Into<String>) -> Self {
    Self {
      class: class.into(),
      x: 0,
      y: 0,
      xdir: 0,
      ydir: 0,
      owner: None,
      container: None,
      contents: Vec::new(),
      con: 100,
      clr_modulation: OPAQUE_WHITE,
      power: 0,
      fuel: 0,
      flags: ObjectFlags::empty(),
      counters: HashMap::new(),
      action: None,
      action_epoch: 0,
    }
  }

  pub fn at(mut self, x: i32, y: i32) -> Self {
    self.x = x;
    self.y = y;
    self
  }

  pub fn owned_by(mut self, owner: u32) -> Self {
    self.owner = Some(owner);
    self
  }

  pub fn with_con(mut self, con: u32) -> Self {
    self.con = con;
    self
  }

  /// Name of the current action, `None` when idle.
  pub fn action(&self) -> Option<&str> {
    self.action.as_ref().map(|a| a.name.as_str())
  }

  pub fn action_phase(&self) -> u32 {
    self.action.as_ref().map_or(0, |a| a.phase)
  }

  pub fn is_idle(&self) -> bool {
    self.action.is_none()
  }

  pub fn alpha(&self) -> u8 {
    (self.clr_modulation >> 24) as u8
  }

  pub fn set_alpha(&mut self, alpha: u8) {
    self.clr_modulation = (self.clr_modulation & 0x00FF_FFFF) | ((alpha as u32) << 24);
  }

  pub fn counter(&self, name: &str) -> i64 {
    self.counters.get(name).copied().unwrap_or(0)
  }

  pub fn bump_counter(&mut self, name: &str, by: i64) -> i64 {
    let value = self.counters.entry(name.to_string()).or_insert(0);
    *value += by;
    *value
  }
}

struct Slot {
  generation: u32,
  state: Option<ObjectState>,
}

/// Storage for live objects, iterated in slot order.
#[derive(Default)]
pub struct ObjectTable {
  slots: Vec<Slot>,
  /// Min-heap of vacant slot indices.
  free: BinaryHeap<Reverse<u32>>,
  live: usize,
}

impl ObjectTable {
  pub fn new() -> Self {
    Self::default()
  }

  /// Inserts an object and returns its handle. Freed slots are reused,
  /// lowest index first, with a bumped generation.
  pub fn spawn(&mut self, state: ObjectState) -> ObjectId {
    self.live += 1;
    if let Some(Reverse(index)) = self.free.pop() {
      let slot = &mut self.slots[index as usize];
      slot.state = Some(state);
      return ObjectId {
        index,
        generation: slot.generation,
      };
    }
    let index = self.slots.len() as u32;
    self.slots.push(Slot {
      generation: 0,
      state: Some(state),
    });
    ObjectId {
      index,
      generation: 0,
    }
  }

  /// Removes an object. Removing a stale handle returns `None`.
  pub fn remove(&mut self, id: ObjectId) -> Option<ObjectState> {
    let slot = self.slots.get_mut(id.index as usize)?;
    if slot.generation != id.generation {
      return None;
    }
    let state = slot.state.take()?;
    slot.generation = slot.generation.wrapping_add(1);
    self.live -= 1;
    self.free.push(Reverse(id.index));
    Some(state)
  }

  pub fn is_alive(&self, id: ObjectId) -> bool {
    self.try_get(id).is_some()
  }

  pub fn try_get(&self, id: ObjectId) -> Option<&ObjectState> {
    self
      .slots
      .get(id.index as usize)
      .filter(|s| s.generation == id.generation)
      .and_then(|s| s.state.as_ref())
  }

  pub fn get(&self, id: ObjectId) -> SimResult<&ObjectState> {
    self
      .try_get(id)
      .ok_or(SimError::EffectHostGone { object: id })
  }

  pub fn get_mut(&mut self, id: ObjectId) -> SimResult<&mut ObjectState> {
    self
      .slots
      .get_mut(id.index as usize)
      .filter(|s| s.generation == id.generation)
      .and_then(|s| s.state.as_mut())
      .ok_or(SimError::EffectHostGone { object: id })
  }

  /// Handles of live objects in slot order.
  pub fn ids(&self) -> Vec<ObjectId> {
    self.iter().map(|(id, _)| id).collect()
  }

  pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &ObjectState)> {
    self.slots.iter().enumerate().filter_map(|(i, s)| {
      s.state.as_ref().map(|state| {
        (
          ObjectId {
            index: i as u32,
            generation: s.generation,
          },
          state,
        )
      })
    })
  }

  pub fn len(&self) -> usize {
    self.live
  }

  pub fn is_empty(&self) -> bool {
    self.live == 0
  }

  /// Removes every object. Slots are kept so that handles from before the
  /// clear stay dead once their index is reused.
  pub fn clear(&mut self) {
    self.free.clear();
    for (index, slot) in self.slots.iter_mut().enumerate() {
      if slot.state.take().is_some() {
        slot.generation = slot.generation.wrapping_add(1);
      }
      self.free.push(Reverse(index as u32));
    }
    self.live = 0;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn stale_handles_report_host_gone() {
    let mut table = ObjectTable::new();
    let a = table.spawn(ObjectState::new("Rock"));
    assert!(table.remove(a).is_some());
    assert!(table.remove(a).is_none());
    assert!(matches!(
      table.get(a),
      Err(SimError::EffectHostGone { object }) if object == a
    ));

    // Slot reuse does not revive the old handle.
    let b = table.spawn(ObjectState::new("Wood"));
    assert_eq!(b.index(), a.index());
    assert_ne!(a, b);
    assert!(!table.is_alive(a));
    assert_eq!(table.get(b).unwrap().class, "Wood");
  }

  #[test]
  fn iterates_in_slot_order() {
    let mut table = ObjectTable::new();
    let ids: Vec<_> = (0..4)
      .map(|i| table.spawn(ObjectState::new(format!("C{}", i))))
      .collect();
    table.remove(ids[1]);
    let c = table.spawn(ObjectState::new("C9"));
    assert_eq!(c.index(), 1);
    let classes: Vec<_> = table.iter().map(|(_, s)| s.class.clone()).collect();
    assert_eq!(classes, ["C0", "C9", "C2", "C3"]);
    assert_eq!(table.len(), 4);
  }

  #[test]
  fn lowest_free_slot_is_reused_first() {
    let mut table = ObjectTable::new();
    let ids: Vec<_> = (0..6).map(|_| table.spawn(ObjectState::new("Rock"))).collect();
    for i in [4, 1, 3] {
      table.remove(ids[i]);
    }
    let reused: Vec<_> = (0..4)
      .map(|_| table.spawn(ObjectState::new("Wood")).index())
      .collect();
    assert_eq!(reused, [1, 3, 4, 6]);
  }

  #[test]
  fn handles_stay_dead_across_clear() {
    let mut table = ObjectTable::new();
    let a = table.spawn(ObjectState::new("Rock"));
    let b = table.spawn(ObjectState::new("Coal"));
    table.remove(b);
    table.clear();
    assert!(table.is_empty());
    assert!(!table.is_alive(a));

    let c = table.spawn(ObjectState::new("Wood"));
    let d = table.spawn(ObjectState::new("Wood"));
    assert_eq!((c.index(), d.index()), (0, 1));
    assert!(matches!(
      table.get(a),
      Err(SimError::EffectHostGone { object }) if object == a
    ));
    assert!(table.get(b).is_err());
    assert_eq!(table.len(), 2);
    assert_eq!(table.iter().count(), 2);
  }

  #[test]
  fn alpha_lives_in_the_top_byte() {
    let mut state = ObjectState::new("Rock");
    assert_eq!(state.alpha(), 255);
    state.set_alpha(10);
    assert_eq!(state.clr_modulation, 0x0AFF_FFFF);
  }
}
