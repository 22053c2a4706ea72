//! Material definitions and registry.

use std::collections::HashMap;

use bevy::log::warn;
use serde::{Deserialize, Serialize};

use crate::coords::MaterialId;

/// Solidity class decides how objects and liquids interact with a material.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Solidity {
  /// Empty space; objects pass through.
  Sky,
  /// Flows; objects float or sink.
  Liquid,
  /// Loose solid (sand, ash); falls and piles.
  Powder,
  /// Static terrain.
  Solid,
}

impl Solidity {
  /// Returns true if contact with this material stops a moving object.
  pub fn is_solid(self) -> bool {
    matches!(self, Self::Powder | Self::Solid)
  }
}

/// What happens to objects touching, or pixels made of, a material when fire
/// is involved.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Incineration {
  /// Not flammable.
  #[default]
  None,
  /// Flammable; `chance` percent per fire check.
  Burns { chance: u8 },
  /// Sets touching objects on fire (lava).
  Incendiary { strength: u8 },
}

/// Material properties.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Material {
  pub name: String,
  pub solidity: Solidity,
  /// Density for liquid displacement (higher sinks into lower-density liquids).
  #[serde(default)]
  pub density: u8,
  /// Energy released when burned in a generator (0 = not a fuel).
  #[serde(default)]
  pub fuel_value: u32,
  #[serde(default)]
  pub incineration: Incineration,
  /// Puts out burning objects submerged in it.
  #[serde(default)]
  pub extinguisher: bool,
}

impl Material {
  fn new(name: &str, solidity: Solidity, density: u8) -> Self {
    Self {
      name: name.to_string(),
      solidity,
      density,
      fuel_value: 0,
      incineration: Incineration::None,
      extinguisher: false,
    }
  }

  /// The background material every registry starts with.
  pub fn sky() -> Self {
    Self::new("Sky", Solidity::Sky, 0)
  }

  /// Returns true if the material can be burned for power.
  pub fn is_fuel(&self) -> bool {
    self.fuel_value > 0
  }
}

/// Serializable material table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaterialsConfig {
  pub materials: Vec<Material>,
}

impl MaterialsConfig {
  /// The built-in material set.
  pub fn builtin() -> Self {
    let mut coal = Material::new("Coal", Solidity::Solid, 150);
    coal.fuel_value = 100;
    coal.incineration = Incineration::Burns { chance: 5 };

    let mut water = Material::new("Water", Solidity::Liquid, 100);
    water.extinguisher = true;

    let mut lava = Material::new("Lava", Solidity::Liquid, 120);
    lava.incineration = Incineration::Incendiary { strength: 5 };

    Self {
      materials: vec![
        Material::sky(),
        Material::new("Earth", Solidity::Solid, 140),
        Material::new("Rock", Solidity::Solid, 200),
        Material::new("Granite", Solidity::Solid, 220),
        Material::new("Ore", Solidity::Solid, 210),
        Material::new("Gold", Solidity::Solid, 230),
        coal,
        Material::new("Sand", Solidity::Powder, 160),
        water,
        lava,
        Material::new("Tunnel", Solidity::Sky, 0),
      ],
    }
  }
}

impl Default for MaterialsConfig {
  fn default() -> Self {
    Self::builtin()
  }
}

/// Material table indexed by [`MaterialId`]. Sky is always id 0.
#[derive(Clone, Debug)]
pub struct Materials {
  entries: Vec<Material>,
  by_name: HashMap<String, MaterialId>,
}

impl Materials {
  pub fn new() -> Self {
    Self::from(MaterialsConfig::builtin())
  }

  /// Looks up a material by id.
  pub fn get(&self, id: MaterialId) -> Option<&Material> {
    self.entries.get(id.0 as usize)
  }

  /// Looks up a material id by its name.
  pub fn id_of(&self, name: &str) -> Option<MaterialId> {
    self.by_name.get(name).copied()
  }

  pub fn iter(&self) -> impl Iterator<Item = (MaterialId, &Material)> {
    self
      .entries
      .iter()
      .enumerate()
      .map(|(i, m)| (MaterialId(i as u8), m))
  }

  /// Returns the number of registered materials.
  #[must_use]
  pub fn len(&self) -> usize {
    self.entries.len()
  }

  /// Returns true if no materials are registered.
  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  fn push(&mut self, material: Material) {
    if self.by_name.contains_key(&material.name) {
      warn!("Duplicate material {:?} ignored", material.name);
      return;
    }
    if self.entries.len() > u8::MAX as usize {
      warn!("Material table full, {:?} ignored", material.name);
      return;
    }
    let id = MaterialId(self.entries.len() as u8);
    self.by_name.insert(material.name.clone(), id);
    self.entries.push(material);
  }
}

impl Default for Materials {
  fn default() -> Self {
    Self::new()
  }
}

impl From<MaterialsConfig> for Materials {
  fn from(config: MaterialsConfig) -> Self {
    let mut materials = Self {
      entries: Vec::with_capacity(config.materials.len() + 1),
      by_name: HashMap::new(),
    };

    let has_sky_first = config
      .materials
      .first()
      .is_some_and(|m| m.solidity == Solidity::Sky && m.name == "Sky");
    if !has_sky_first {
      materials.push(Material::sky());
    }
    for material in config.materials {
      materials.push(material);
    }
    materials
  }
}
