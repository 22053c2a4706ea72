//! Object-terrain contact rules.

use super::InteractionRequest;
use crate::coords::TexIndex;
use crate::error::SimResult;
use crate::registry::{Incineration, Material};
use crate::scheduler::{ObjectFlags, ObjectId, World};

/// How an object reacts to touching a material.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContactResponse {
  /// Nothing happens.
  Pass,
  /// The object is stopped and hit.
  Hit,
  /// The object catches fire.
  Incinerate { strength: u32 },
  /// A burning object is put out.
  Extinguish,
}

/// Derives the contact response from material data alone.
///
/// Incendiary materials win over everything else, then extinguishers, then
/// solidity.
pub fn contact_response(material: &Material) -> ContactResponse {
  if let Incineration::Incendiary { strength } = material.incineration {
    return ContactResponse::Incinerate {
      strength: strength as u32,
    };
  }
  if material.extinguisher {
    return ContactResponse::Extinguish;
  }
  if material.solidity.is_solid() {
    ContactResponse::Hit
  } else {
    ContactResponse::Pass
  }
}

/// Requests caused by `object` touching terrain texture `tex` at `speed`.
///
/// A world without a landscape has no terrain to touch and yields nothing.
pub fn resolve_contact(
  world: &World,
  object: ObjectId,
  tex: TexIndex,
  speed: i32,
) -> SimResult<Vec<InteractionRequest>> {
  let state = world.objects.get(object)?;
  let Some(landscape) = world.landscape.as_ref() else {
    return Ok(Vec::new());
  };
  let material = landscape.textures().lookup(tex)?;

  let requests = match contact_response(material) {
    ContactResponse::Pass => Vec::new(),
    ContactResponse::Hit => {
      let class = world.classes.get(&state.class)?;
      if class.capabilities.hittable.is_some() {
        vec![InteractionRequest::Hit { object, speed }]
      } else {
        Vec::new()
      }
    }
    ContactResponse::Incinerate { strength } => {
      if state.flags.contains(ObjectFlags::FIREPROOF) {
        Vec::new()
      } else {
        vec![InteractionRequest::Incinerate { object, strength }]
      }
    }
    ContactResponse::Extinguish => {
      if state.flags.contains(ObjectFlags::ON_FIRE) {
        vec![InteractionRequest::Extinguish { object }]
      } else {
        Vec::new()
      }
    }
  };
  Ok(requests)
}
