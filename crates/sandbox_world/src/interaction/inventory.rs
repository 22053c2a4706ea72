//! Collection rules for objects that carry other objects.

use std::any::Any;

use serde::{Deserialize, Serialize};

use super::{CollectPolicy, InteractionRequest};
use crate::error::SimResult;
use crate::scheduler::{Context, EffectControl, EffectHandler, EffectTable, ObjectId, ObjectState, World};

/// Name of the marker effect that makes its host uncollectable.
pub const NO_COLLECTION: &str = "NoCollection";

/// Marker effect without a timer; add it with interval 0.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoCollection;

impl EffectHandler for NoCollection {
  fn timer(&mut self, _ctx: &mut Context, _time: u64) -> SimResult<EffectControl> {
    Ok(EffectControl::Continue)
  }

  fn as_any(&self) -> &dyn Any {
    self
  }

  fn into_any(self: Box<Self>) -> Box<dyn Any> {
    self
  }
}

/// Item classes a collector refuses, by collector owner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassRejection {
  /// Owner this applies to. `None` applies to every owner without an
  /// explicit entry of its own.
  #[serde(default)]
  pub owner: Option<u32>,
  pub classes: Vec<String>,
}

fn default_max_contents() -> usize {
  7
}

fn default_true() -> bool {
  true
}

/// Inventory limits and per-owner class rejections.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRules {
  #[serde(default = "default_max_contents")]
  pub max_contents: usize,
  #[serde(default)]
  pub rejections: Vec<ClassRejection>,
  /// Items lying around can only be picked up by a forced collection.
  #[serde(default = "default_true")]
  pub loose_items_need_force: bool,
}

impl Default for InventoryRules {
  fn default() -> Self {
    Self {
      max_contents: default_max_contents(),
      rejections: vec![
        ClassRejection {
          owner: Some(0),
          classes: vec!["Arrow".into(), "Bow".into(), "Javelin".into()],
        },
        ClassRejection {
          owner: None,
          classes: vec!["Sword".into(), "Shield".into()],
        },
      ],
      loose_items_need_force: true,
    }
  }
}

impl CollectPolicy for InventoryRules {
  fn reject_collect(&self, collector: &ObjectState, item_class: &str) -> bool {
    let explicit = self
      .rejections
      .iter()
      .any(|r| r.owner.is_some() && r.owner == collector.owner);
    self
      .rejections
      .iter()
      .filter(|r| match r.owner {
        Some(owner) => collector.owner == Some(owner),
        None => !explicit,
      })
      .any(|r| r.classes.iter().any(|c| c == item_class))
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RejectReason {
  NotCollectible,
  AlreadyContained,
  NoCollection,
  ClassRejected,
  Full,
  AlreadyCarryingHeavy,
  LooseItemNeedsForce,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CollectDecision {
  Accept,
  Reject(RejectReason),
}

impl CollectDecision {
  pub fn is_accept(self) -> bool {
    self == Self::Accept
  }

  /// Requests carrying out the decision: the item enters the collector.
  pub fn requests(self, collector: ObjectId, item: ObjectId) -> Vec<InteractionRequest> {
    match self {
      Self::Accept => vec![InteractionRequest::Enter {
        item,
        container: collector,
      }],
      Self::Reject(_) => Vec::new(),
    }
  }
}

/// Decides whether `collector` may pick up `item`.
///
/// The collector's class policy is asked after the item-side checks; the
/// capacity and force rules come from `rules`.
pub fn check_collect(
  rules: &InventoryRules,
  world: &World,
  effects: &EffectTable,
  collector: ObjectId,
  item: ObjectId,
  forced: bool,
) -> SimResult<CollectDecision> {
  use CollectDecision::Reject;

  let collector_state = world.objects.get(collector)?;
  let item_state = world.objects.get(item)?;
  if item == collector || item_state.container == Some(collector) {
    return Ok(Reject(RejectReason::AlreadyContained));
  }

  let item_class = world.classes.get(&item_state.class)?;
  let Some(collectible) = &item_class.capabilities.collectible else {
    return Ok(Reject(RejectReason::NotCollectible));
  };
  if effects.find(Some(item), NO_COLLECTION).is_some() {
    return Ok(Reject(RejectReason::NoCollection));
  }

  let collector_class = world.classes.get(&collector_state.class)?;
  if let Some(policy) = &collector_class.capabilities.collect_policy {
    if policy.reject_collect(collector_state, &item_state.class) {
      return Ok(Reject(RejectReason::ClassRejected));
    }
  }

  let contents = world.contents(collector);
  if contents.len() >= rules.max_contents {
    return Ok(Reject(RejectReason::Full));
  }
  if collectible.carry_heavy() {
    let carrying_heavy = contents.iter().any(|id| {
      world
        .objects
        .try_get(*id)
        .and_then(|s| world.classes.get(&s.class).ok())
        .and_then(|c| c.capabilities.collectible.clone())
        .is_some_and(|c| c.carry_heavy())
    });
    if carrying_heavy {
      return Ok(Reject(RejectReason::AlreadyCarryingHeavy));
    }
  }
  if rules.loose_items_need_force && !forced && item_state.container.is_none() {
    return Ok(Reject(RejectReason::LooseItemNeedsForce));
  }
  Ok(CollectDecision::Accept)
}
