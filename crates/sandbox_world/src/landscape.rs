//! The generated map as the running simulation sees it.

use crate::coords::MapPixel;
use crate::map::MapBuffer;
use crate::registry::{Material, TextureMap};

/// Landscape pixels per map pixel.
pub const DEFAULT_MAP_ZOOM: u32 = 8;

/// Read-only landscape: the map buffer plus the registry that resolves it.
///
/// Object coordinates are landscape pixels; each map pixel covers a
/// `zoom x zoom` square of them.
#[derive(Clone, Debug)]
pub struct Landscape {
  map: MapBuffer,
  textures: TextureMap,
  zoom: u32,
}

impl Landscape {
  pub fn new(map: MapBuffer, textures: TextureMap) -> Self {
    Self {
      map,
      textures,
      zoom: DEFAULT_MAP_ZOOM,
    }
  }

  pub fn with_zoom(mut self, zoom: u32) -> Self {
    self.zoom = zoom.max(1);
    self
  }

  pub fn map(&self) -> &MapBuffer {
    &self.map
  }

  pub fn textures(&self) -> &TextureMap {
    &self.textures
  }

  pub fn zoom(&self) -> u32 {
    self.zoom
  }

  /// Landscape size in landscape pixels.
  pub fn size(&self) -> (u32, u32) {
    (self.map.width() * self.zoom, self.map.height() * self.zoom)
  }

  /// Map pixel covering landscape position (x, y); sky outside.
  pub fn pixel_at(&self, x: i32, y: i32) -> MapPixel {
    let zoom = self.zoom as i32;
    self.map.get_pixel(x.div_euclid(zoom), y.div_euclid(zoom))
  }

  /// Material at landscape position (x, y).
  pub fn material_at(&self, x: i32, y: i32) -> Option<&Material> {
    self.textures.material_of(self.pixel_at(x, y)).ok()
  }
}
