//! Indexed landscape pixel grid.
//!
//! # Coordinate System
//!
//! Map coordinates follow the landscape convention:
//! - **X+** is to the right
//! - **Y+** is downward (row 0 is the top, sky side)
//! - **(0, 0)** is the top-left corner
//!
//! Rows are stored top to bottom with a row stride that may exceed the map
//! width (persisted maps use 4-byte aligned rows).

use std::collections::BTreeSet;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::coords::MapPixel;
use crate::error::{SimError, SimResult};
use crate::hash::MapRng;

/// What [`MapBuffer::set_pixel`] does with coordinates outside the map.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundsPolicy {
  /// Ignore the write.
  #[default]
  Clip,
  /// Fail with [`SimError::OutOfBounds`].
  Strict,
}

const CARDINAL: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

/// A width x height grid of [`MapPixel`]s.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MapBuffer {
  data: Box<[u8]>,
  width: u32,
  height: u32,
  stride: u32,
  policy: BoundsPolicy,
  /// When set, writes only land on pixels with this texture index (the IFT
  /// flag is not compared).
  mask: Option<MapPixel>,
}

impl MapBuffer {
  /// Creates a sky-filled buffer with a tight row stride.
  pub fn new(width: u32, height: u32) -> Self {
    Self::with_stride(width, height, width)
  }

  /// Creates a sky-filled buffer whose rows are `stride` bytes apart.
  ///
  /// `stride` is raised to `width` if smaller.
  pub fn with_stride(width: u32, height: u32, stride: u32) -> Self {
    let stride = stride.max(width);
    let len = stride as usize * height as usize;
    Self {
      data: vec![MapPixel::SKY.0; len].into_boxed_slice(),
      width,
      height,
      stride,
      policy: BoundsPolicy::default(),
      mask: None,
    }
  }

  /// Wraps raw row-major bytes. Returns `None` if the length does not match.
  pub fn from_raw(width: u32, height: u32, stride: u32, bytes: Vec<u8>) -> Option<Self> {
    if stride < width || bytes.len() != stride as usize * height as usize {
      return None;
    }
    Some(Self {
      data: bytes.into_boxed_slice(),
      width,
      height,
      stride,
      policy: BoundsPolicy::default(),
      mask: None,
    })
  }

  pub fn with_policy(mut self, policy: BoundsPolicy) -> Self {
    self.policy = policy;
    self
  }

  #[inline]
  pub fn width(&self) -> u32 {
    self.width
  }

  #[inline]
  pub fn height(&self) -> u32 {
    self.height
  }

  /// Bytes between the starts of consecutive rows.
  #[inline]
  pub fn stride(&self) -> u32 {
    self.stride
  }

  pub fn policy(&self) -> BoundsPolicy {
    self.policy
  }

  pub fn set_policy(&mut self, policy: BoundsPolicy) {
    self.policy = policy;
  }

  pub fn mask(&self) -> Option<MapPixel> {
    self.mask
  }

  /// Restricts writes to pixels of `mask`'s texture (`None` lifts the
  /// restriction).
  pub fn set_mask(&mut self, mask: Option<MapPixel>) {
    self.mask = mask;
  }

  #[inline]
  fn index_of(&self, x: i32, y: i32) -> Option<usize> {
    if x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height {
      Some(y as usize * self.stride as usize + x as usize)
    } else {
      None
    }
  }

  #[inline]
  pub fn contains(&self, x: i32, y: i32) -> bool {
    self.index_of(x, y).is_some()
  }

  /// Returns the pixel at (x, y), or sky outside the map.
  #[inline]
  pub fn get_pixel(&self, x: i32, y: i32) -> MapPixel {
    self
      .index_of(x, y)
      .map_or(MapPixel::SKY, |i| MapPixel(self.data[i]))
  }

  /// Returns true if a write at (x, y) would land.
  #[inline]
  fn accepts(&self, x: i32, y: i32) -> bool {
    match self.index_of(x, y) {
      Some(i) => self.mask.is_none_or(|m| MapPixel(self.data[i]).tex() == m.tex()),
      None => false,
    }
  }

  /// Writes one pixel if it is inside the map and passes the mask.
  #[inline]
  fn put(&mut self, x: i32, y: i32, pixel: MapPixel) -> bool {
    if !self.accepts(x, y) {
      return false;
    }
    if let Some(i) = self.index_of(x, y) {
      self.data[i] = pixel.0;
    }
    true
  }

  /// Sets one pixel. Returns whether the pixel was written.
  ///
  /// Outside the map the write is dropped under [`BoundsPolicy::Clip`] and
  /// fails under [`BoundsPolicy::Strict`]. A masked-out pixel is not an
  /// error.
  pub fn set_pixel(&mut self, x: i32, y: i32, pixel: MapPixel) -> SimResult<bool> {
    if !self.contains(x, y) {
      return match self.policy {
        BoundsPolicy::Clip => Ok(false),
        BoundsPolicy::Strict => Err(SimError::OutOfBounds {
          x,
          y,
          width: self.width,
          height: self.height,
        }),
      };
    }
    Ok(self.put(x, y, pixel))
  }

  /// Fills every pixel within Euclidean distance `radius` of (x, y).
  ///
  /// Area fills always clip at the map edge. Returns the number of pixels
  /// written.
  pub fn set_spot(&mut self, x: i32, y: i32, radius: u32, pixel: MapPixel) -> u32 {
    let (cx, cy, r) = (i64::from(x), i64::from(y), i64::from(radius));
    // Squares of offsets up to u32::MAX need more than 64 bits.
    let r2 = i128::from(r) * i128::from(r);
    let (x0, x1) = clip_span(cx - r, cx + r, self.width);
    let (y0, y1) = clip_span(cy - r, cy + r, self.height);
    let mut written = 0;
    for py in y0..y1 {
      let dy2 = i128::from(py - cy).pow(2);
      for px in x0..x1 {
        if dy2 + i128::from(px - cx).pow(2) <= r2 && self.put(px as i32, py as i32, pixel) {
          written += 1;
        }
      }
    }
    written
  }

  /// Draws an organic vein of `size` random-walk steps starting at (x, y).
  ///
  /// Each step moves up to two pixels sideways and one vertically and stamps
  /// a two-row segment 3-5 pixels wide, so consecutive stamps always touch.
  /// After clipping and masking, pixels with no 4-neighbour in the stroke are
  /// dropped. The stroke never extends further than `2 * size + 6` pixels
  /// horizontally or `size + 2` vertically from the start point. Returns the
  /// number of pixels written.
  pub fn draw_layer(
    &mut self,
    x: i32,
    y: i32,
    size: u32,
    pixel: MapPixel,
    rng: &mut MapRng,
  ) -> u32 {
    let mut stroke = BTreeSet::new();
    let (mut cx, mut cy) = (x, y);
    for step in 0..size.max(1) {
      if step > 0 {
        cx += rng.range(-2, 2);
        cy += rng.range(-1, 1);
      }
      let start = rng.below(3);
      for dx in start..5 {
        stroke.insert((cx + dx, cy));
        stroke.insert((cx + dx + 1, cy + 1));
      }
    }

    let accepted: BTreeSet<(i32, i32)> = stroke
      .into_iter()
      .filter(|&(px, py)| self.accepts(px, py))
      .collect();

    let mut written = 0;
    for &(px, py) in &accepted {
      let connected = CARDINAL
        .iter()
        .any(|&(dx, dy)| accepted.contains(&(px + dx, py + dy)));
      if connected && self.put(px, py, pixel) {
        written += 1;
      }
    }
    written
  }

  /// Fills an axis-aligned rectangle (clipped, masked).
  pub fn fill_rect(&mut self, x: i32, y: i32, width: u32, height: u32, pixel: MapPixel) -> u32 {
    let (x, y) = (i64::from(x), i64::from(y));
    let (x0, x1) = clip_span(x, x + i64::from(width) - 1, self.width);
    let (y0, y1) = clip_span(y, y + i64::from(height) - 1, self.height);
    let mut written = 0;
    for py in y0..y1 {
      for px in x0..x1 {
        if self.put(px as i32, py as i32, pixel) {
          written += 1;
        }
      }
    }
    written
  }

  /// Fills the whole map, padding included, ignoring the mask.
  pub fn fill(&mut self, pixel: MapPixel) {
    self.data.fill(pixel.0);
  }

  /// Resets to sky and lifts the mask.
  pub fn reset(&mut self) {
    self.fill(MapPixel::SKY);
    self.mask = None;
  }

  /// Copies the visible pixels of `src` to the top-left corner, ignoring the
  /// mask. Parts of `src` outside this buffer are dropped.
  pub fn paste(&mut self, src: &MapBuffer) {
    let width = self.width.min(src.width) as usize;
    for y in 0..self.height.min(src.height) {
      let start = y as usize * self.stride as usize;
      self.data[start..start + width].copy_from_slice(&src.row(y)[..width]);
    }
  }

  /// Copies every non-sky pixel of a same-sized `src` over this buffer.
  pub fn overlay(&mut self, src: &MapBuffer) {
    for y in 0..self.height.min(src.height) {
      let start = y as usize * self.stride as usize;
      for (x, &b) in src.row(y).iter().enumerate().take(self.width as usize) {
        if !MapPixel(b).is_sky() {
          self.data[start + x] = b;
        }
      }
    }
  }

  /// Visible pixels of row `y` (stride padding excluded).
  pub fn row(&self, y: u32) -> &[u8] {
    let start = y as usize * self.stride as usize;
    &self.data[start..start + self.width as usize]
  }

  /// Iterates visible rows top to bottom.
  pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
    (0..self.height).map(move |y| self.row(y))
  }

  /// Full rows including padding, processed in parallel.
  pub(crate) fn par_rows_mut(&mut self) -> rayon::slice::ChunksExactMut<'_, u8> {
    let stride = self.stride.max(1) as usize;
    self.data.par_chunks_exact_mut(stride)
  }

  /// Raw bytes, padding included.
  pub fn as_bytes(&self) -> &[u8] {
    &self.data
  }

  /// Iterates `(x, y, pixel)` over visible pixels.
  pub fn pixels(&self) -> impl Iterator<Item = (u32, u32, MapPixel)> + '_ {
    (0..self.height).flat_map(move |y| {
      self
        .row(y)
        .iter()
        .enumerate()
        .map(move |(x, &b)| (x as u32, y, MapPixel(b)))
    })
  }

  /// Counts visible pixels equal to `pixel`.
  pub fn count(&self, pixel: MapPixel) -> usize {
    self.rows().flatten().filter(|&&b| b == pixel.0).count()
  }

  /// Returns true if every visible pixel of `self` and `other` match.
  pub fn same_pixels(&self, other: &MapBuffer) -> bool {
    self.width == other.width
      && self.height == other.height
      && self.rows().zip(other.rows()).all(|(a, b)| a == b)
  }
}

/// Intersects the inclusive span `lo..=hi` with `0..len`, half-open.
#[inline]
fn clip_span(lo: i64, hi: i64, len: u32) -> (i64, i64) {
  let lo = lo.max(0);
  let hi = (hi + 1).min(i64::from(len));
  (lo, hi.max(lo))
}
