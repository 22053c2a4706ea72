//! Texture index validation of loaded maps.

use bevy::log::warn;
use rayon::prelude::*;

use crate::coords::{MAX_TEX_INDEX, MapPixel};
use crate::map::buffer::MapBuffer;
use crate::registry::TextureMap;

/// Outcome of [`validate_texture_indices`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationReport {
  /// Pixels replaced with sky.
  pub substitutions: usize,
  /// Distinct unregistered texture indices found, ascending.
  pub invalid_indices: Vec<u8>,
}

impl ValidationReport {
  pub fn is_clean(&self) -> bool {
    self.substitutions == 0
  }
}

/// Replaces every pixel whose texture index is not registered with sky.
///
/// Rows are checked in parallel; the report does not depend on the order in
/// which rows finish. Running it again on the result reports nothing.
pub fn validate_texture_indices(buffer: &mut MapBuffer, textures: &TextureMap) -> ValidationReport {
  let registered = textures.registered_mask();
  let width = buffer.width() as usize;

  let (substitutions, bad) = buffer
    .par_rows_mut()
    .map(|row| {
      let mut count = 0usize;
      let mut bad = 0u128;
      for byte in &mut row[..width] {
        let tex = MapPixel(*byte).tex().0;
        if !registered[tex as usize] {
          bad |= 1u128 << tex;
          *byte = MapPixel::SKY.0;
          count += 1;
        }
      }
      (count, bad)
    })
    .reduce(|| (0, 0), |a, b| (a.0 + b.0, a.1 | b.1));

  let invalid_indices: Vec<u8> = (0..=MAX_TEX_INDEX)
    .filter(|&i| bad & (1u128 << i) != 0)
    .collect();

  if substitutions > 0 {
    warn!(
      "Replaced {} map pixels with unregistered texture indices {:?} by sky",
      substitutions, invalid_indices
    );
  }

  ValidationReport {
    substitutions,
    invalid_indices,
  }
}
