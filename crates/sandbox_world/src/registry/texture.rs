//! Texture map: `Material-Texture` names to packed map pixel indices.

use std::collections::HashMap;

use bevy::prelude::Resource;
use serde::{Deserialize, Serialize};

use super::material::{Material, Materials};
use crate::coords::{MAX_TEX_INDEX, MapPixel, MaterialId, TexIndex};
use crate::error::{SimError, SimResult};

/// Texture used when a name carries no `-Texture` suffix.
pub const DEFAULT_TEXTURE: &str = "Smooth";

/// One registered texture-map entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextureEntry {
  pub material: MaterialId,
  pub material_name: String,
  pub texture: String,
}

impl TextureEntry {
  /// Canonical `Material-Texture` key.
  pub fn key(&self) -> String {
    format!("{}-{}", self.material_name, self.texture)
  }
}

/// Ordered list of texture-map names, registered front to back.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TextureMapConfig {
  #[serde(default)]
  pub entries: Vec<String>,
}

/// Registry of texture indices usable in a [`MapBuffer`](crate::MapBuffer).
///
/// Index 0 is reserved for sky. Registration is deterministic (next free
/// index in call order) and idempotent for repeated names.
#[derive(Resource, Clone, Debug)]
pub struct TextureMap {
  materials: Materials,
  entries: Vec<Option<TextureEntry>>,
  by_key: HashMap<String, TexIndex>,
  /// First registered index per material, for texture-less lookups.
  by_material: HashMap<MaterialId, TexIndex>,
}

/// Splits `"Earth-Rough"` into `("Earth", "Rough")`; bare names get the
/// default texture.
pub fn split_name(name: &str) -> (&str, &str) {
  match name.split_once('-') {
    Some((material, texture)) if !texture.is_empty() => (material, texture),
    Some((material, _)) => (material, DEFAULT_TEXTURE),
    None => (name, DEFAULT_TEXTURE),
  }
}

impl TextureMap {
  /// Creates a texture map with only the sky entry registered.
  pub fn new(materials: Materials) -> Self {
    let mut entries = vec![None; MAX_TEX_INDEX as usize + 1];
    let sky = TextureEntry {
      material: MaterialId::SKY,
      material_name: materials
        .get(MaterialId::SKY)
        .map(|m| m.name.clone())
        .unwrap_or_else(|| "Sky".to_string()),
      texture: DEFAULT_TEXTURE.to_string(),
    };
    let mut by_key = HashMap::new();
    by_key.insert(sky.key(), TexIndex::SKY);
    entries[0] = Some(sky);

    let mut by_material = HashMap::new();
    by_material.insert(MaterialId::SKY, TexIndex::SKY);

    Self {
      materials,
      entries,
      by_key,
      by_material,
    }
  }

  /// Creates a texture map and registers every configured entry in order.
  pub fn from_config(materials: Materials, config: &TextureMapConfig) -> SimResult<Self> {
    let mut map = Self::new(materials);
    for name in &config.entries {
      map.register(name)?;
    }
    Ok(map)
  }

  /// Registers `name` (`"Material"` or `"Material-Texture"`) and returns its
  /// index. Re-registering an existing name returns the same index.
  pub fn register(&mut self, name: &str) -> SimResult<TexIndex> {
    let (material_name, texture) = split_name(name);
    let key = format!("{}-{}", material_name, texture);
    if let Some(&index) = self.by_key.get(&key) {
      return Ok(index);
    }

    let material = self
      .materials
      .id_of(material_name)
      .ok_or_else(|| SimError::unknown_material(material_name))?;

    let slot = self
      .entries
      .iter()
      .position(Option::is_none)
      .ok_or_else(|| SimError::unknown_material(format!("{} (texture map full)", key)))?;
    let index = TexIndex(slot as u8);

    self.entries[slot] = Some(TextureEntry {
      material,
      material_name: material_name.to_string(),
      texture: texture.to_string(),
    });
    self.by_key.insert(key, index);
    self.by_material.entry(material).or_insert(index);
    Ok(index)
  }

  /// Resolves a name without registering it.
  ///
  /// A bare material name first matches its default-texture entry, then any
  /// entry of that material.
  pub fn index_of(&self, name: &str) -> SimResult<TexIndex> {
    let (material_name, texture) = split_name(name);
    if let Some(&index) = self.by_key.get(&format!("{}-{}", material_name, texture)) {
      return Ok(index);
    }
    if !name.contains('-') {
      if let Some(index) = self
        .materials
        .id_of(material_name)
        .and_then(|id| self.by_material.get(&id))
      {
        return Ok(*index);
      }
    }
    Err(SimError::unknown_material(name))
  }

  /// Returns the entry for an index, if registered.
  pub fn entry(&self, index: TexIndex) -> Option<&TextureEntry> {
    self.entries.get(index.0 as usize).and_then(Option::as_ref)
  }

  /// Material properties for a texture index.
  pub fn lookup(&self, index: TexIndex) -> SimResult<&Material> {
    self
      .entry(index)
      .and_then(|e| self.materials.get(e.material))
      .ok_or(SimError::UnknownTexIndex { index: index.0 })
  }

  /// Material properties for a map pixel (IFT bit ignored).
  pub fn material_of(&self, pixel: MapPixel) -> SimResult<&Material> {
    self.lookup(pixel.tex())
  }

  #[inline]
  pub fn is_registered(&self, index: TexIndex) -> bool {
    self.entry(index).is_some()
  }

  /// Bitmap of registered indices, for hot per-pixel checks.
  pub fn registered_mask(&self) -> [bool; MAX_TEX_INDEX as usize + 1] {
    let mut mask = [false; MAX_TEX_INDEX as usize + 1];
    for (slot, entry) in self.entries.iter().enumerate() {
      mask[slot] = entry.is_some();
    }
    mask
  }

  pub fn materials(&self) -> &Materials {
    &self.materials
  }

  /// Registered entries in index order.
  pub fn iter(&self) -> impl Iterator<Item = (TexIndex, &TextureEntry)> {
    self
      .entries
      .iter()
      .enumerate()
      .filter_map(|(i, e)| e.as_ref().map(|e| (TexIndex(i as u8), e)))
  }

  /// Returns the number of registered entries, sky included.
  #[must_use]
  pub fn len(&self) -> usize {
    self.by_key.len()
  }

  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.by_key.is_empty()
  }
}

impl Default for TextureMap {
  fn default() -> Self {
    Self::new(Materials::default())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn register_is_idempotent_and_sequential() {
    let mut textures = TextureMap::default();
    let earth = textures.register("Earth").unwrap();
    let ore = textures.register("Ore").unwrap();
    assert_eq!(earth, TexIndex(1));
    assert_eq!(ore, TexIndex(2));
    assert_eq!(textures.register("Earth-Smooth").unwrap(), earth);
    assert_eq!(textures.register("Earth").unwrap(), earth);
    assert_eq!(textures.len(), 3);
  }

  #[test]
  fn textures_of_one_material_get_distinct_indices() {
    let mut textures = TextureMap::default();
    let smooth = textures.register("Earth-Smooth").unwrap();
    let rough = textures.register("Earth-Rough").unwrap();
    assert_ne!(smooth, rough);
    assert_eq!(textures.index_of("Earth").unwrap(), smooth);
    assert_eq!(textures.index_of("Earth-Rough").unwrap(), rough);
  }

  #[test]
  fn bare_name_falls_back_to_any_texture() {
    let mut textures = TextureMap::default();
    let rough = textures.register("Ore-Rough").unwrap();
    assert_eq!(textures.index_of("Ore").unwrap(), rough);
  }

  #[test]
  fn unknown_names_and_indices_fail() {
    let mut textures = TextureMap::default();
    assert!(matches!(
      textures.register("Cheese"),
      Err(SimError::UnknownMaterial { .. })
    ));
    assert!(matches!(
      textures.index_of("Earth"),
      Err(SimError::UnknownMaterial { .. })
    ));
    assert!(matches!(
      textures.lookup(TexIndex(40)),
      Err(SimError::UnknownTexIndex { index: 40 })
    ));
  }

  #[test]
  fn lookup_returns_material_properties() {
    let mut textures = TextureMap::default();
    let coal = textures.register("Coal-Rough").unwrap();
    let material = textures.lookup(coal).unwrap();
    assert_eq!(material.name, "Coal");
    assert!(material.is_fuel());
    assert_eq!(textures.lookup(TexIndex::SKY).unwrap().name, "Sky");
  }

  #[test]
  fn table_fills_up() {
    let mut textures = TextureMap::default();
    for i in 0..MAX_TEX_INDEX {
      textures.register(&format!("Earth-T{}", i)).unwrap();
    }
    assert!(textures.register("Earth-Overflow").is_err());
  }
}
