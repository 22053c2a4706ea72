//! Rolling terrain surface and liquid level.
//!
//! All arithmetic is integer so that every platform produces the same
//! surface for the same seed.

use crate::coords::MapPixel;
use crate::hash::MapRng;
use crate::map::buffer::MapBuffer;
use crate::map::descriptor::SurfaceSpec;

/// Fixed-point scale of [`isin`] results and curve offsets.
pub const ONE: i64 = 1024;

/// Players beyond this count no longer stretch the surface period.
pub const MAX_PLAYER_EXTEND: u32 = 4;

/// `sin(millideg / 1000 degrees) * 1024`, Bhaskara I approximation.
pub fn isin(millideg: i64) -> i64 {
  let d = millideg.rem_euclid(360_000);
  let (d, sign) = if d >= 180_000 {
    (d - 180_000, -1)
  } else {
    (d, 1)
  };
  let p = d * (180_000 - d);
  sign * (4 * p * ONE) / (40_500_000_000 - p)
}

/// Surface row for every column.
pub fn surface_profile(
  spec: &SurfaceSpec,
  width: u32,
  height: u32,
  players: u32,
  rng: &mut MapRng,
) -> Vec<i32> {
  let w = width as i64;
  let level0 = height as i64 / 2;
  let maxrange = (width.min(height) as i64 / 2) * 3 / 4;

  let mut period = spec.period as i64;
  if spec.player_extend {
    period *= players.clamp(1, MAX_PLAYER_EXTEND) as i64;
  }
  let natural = spec.natural.min(100) as i64;
  let natural_bound = ONE * natural / 100;

  let mut velocity = 0i64;
  let mut offset = 0i64;
  let mut rows = Vec::with_capacity(width as usize);

  for cx in 0..w {
    if natural > 0 {
      velocity += rng.range(-32, 32) as i64 * natural / 100;
      velocity = velocity.clamp(-24, 24);
      offset += velocity;
      if offset.abs() > natural_bound {
        offset = offset.clamp(-natural_bound, natural_bound);
        velocity = -velocity / 2;
      }
    }

    let angle = spec.phase as i64 * 1000 + cx * 360_000 * period / 100 / w.max(1);
    let curve = isin(angle) * spec.amplitude.min(100) as i64 / 100;
    let dy = (maxrange * (curve + offset) / ONE).clamp(-maxrange, maxrange);
    rows.push((level0 + dy) as i32);
  }
  rows
}

/// Fills every column from its surface row down with `ground`.
pub fn paint_surface(buffer: &mut MapBuffer, profile: &[i32], ground: MapPixel) {
  let height = buffer.height() as i32;
  for (cx, &top) in profile.iter().enumerate() {
    let top = top.clamp(0, height);
    buffer.fill_rect(cx as i32, top, 1, (height - top) as u32, ground);
  }
}

/// Floods background pixels below the liquid surface.
pub fn paint_liquid(buffer: &mut MapBuffer, level_pct: u32, background: MapPixel, liquid: MapPixel) {
  let height = buffer.height();
  let top = height * (100 - level_pct.min(100)) / 100;
  let previous = buffer.mask();
  buffer.set_mask(Some(background));
  buffer.fill_rect(0, top as i32, buffer.width(), height - top, liquid);
  buffer.set_mask(previous);
}
