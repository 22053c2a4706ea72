//! Session configuration loaded from TOML.

use std::path::{Path, PathBuf};

use bevy::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::error::SimResult;
use crate::interaction::{InventoryRules, PowerGenerator, catalog};
use crate::landscape::DEFAULT_MAP_ZOOM;
use crate::map::{
  BoundsPolicy, CreateOptions, LandscapeDescriptor, LayerRule, MapCreator, RuleShape, SurfaceSpec,
};
use crate::persistence::MAP_ENTRY;
use crate::registry::{Materials, MaterialsConfig, TextureMap, TextureMapConfig};
use crate::scheduler::ClassRegistry;

/// Map archive to load from, and optionally to save freshly created maps to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveConfig {
  pub path: PathBuf,
  #[serde(default = "default_entry")]
  pub entry: String,
  /// Write the map into the archive when it had to be created.
  #[serde(default)]
  pub save_created: bool,
}

fn default_entry() -> String {
  MAP_ENTRY.to_string()
}

/// Everything needed to bootstrap a session.
#[derive(Resource, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
  pub seed: u64,
  pub players: u32,
  /// Generate background, midground and foreground planes.
  pub layered: bool,
  /// Simulation ticks per second.
  pub tick_hz: f64,
  pub bounds: BoundsPolicy,
  /// Landscape pixels per map pixel.
  pub zoom: u32,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub archive: Option<ArchiveConfig>,
  /// Replaces the built-in material set.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub materials: Option<MaterialsConfig>,
  pub textures: TextureMapConfig,
  pub landscape: LandscapeDescriptor,
  pub inventory: InventoryRules,
  pub generator: PowerGenerator,
}

impl Default for SessionConfig {
  fn default() -> Self {
    Self {
      seed: 0,
      players: 1,
      layered: false,
      tick_hz: 36.0,
      bounds: BoundsPolicy::Clip,
      zoom: DEFAULT_MAP_ZOOM,
      archive: None,
      materials: None,
      textures: default_textures(),
      landscape: default_landscape(),
      inventory: InventoryRules::default(),
      generator: PowerGenerator::default(),
    }
  }
}

fn default_textures() -> TextureMapConfig {
  TextureMapConfig {
    entries: [
      "Earth-Smooth",
      "Earth-Rough",
      "Rock-Smooth",
      "Granite-Smooth",
      "Ore-Rough",
      "Gold-Smooth",
      "Coal-Smooth",
      "Sand-Smooth",
      "Water-Smooth",
      "Lava-Smooth",
      "Tunnel-Smooth",
    ]
    .into_iter()
    .map(String::from)
    .collect(),
  }
}

/// Rolling earth with a water table, rock strata and ore veins.
fn default_landscape() -> LandscapeDescriptor {
  LandscapeDescriptor::new(200, 120)
    .with_surface(SurfaceSpec {
      material: "Earth-Smooth".into(),
      ift: true,
      amplitude: 20,
      phase: 50,
      period: 15,
      natural: 10,
      player_extend: true,
      liquid: Some("Water".into()),
      liquid_level: 20,
    })
    .with_rule(
      LayerRule::new(
        "Rock-Smooth",
        RuleShape::Band {
          top_pct: 85,
          bottom_pct: 100,
        },
      )
      .only_over("Earth")
      .ift(true),
    )
    .with_rule(
      LayerRule::new(
        "Ore-Rough",
        RuleShape::Veins {
          count: 8,
          max_size: 15,
        },
      )
      .only_over("Earth")
      .ift(true),
    )
    .with_rule(
      LayerRule::new(
        "Coal",
        RuleShape::Veins {
          count: 6,
          max_size: 10,
        },
      )
      .only_over("Earth")
      .ift(true),
    )
    .with_rule(
      LayerRule::new(
        "Tunnel",
        RuleShape::Zones {
          per_player: 1,
          radius: 6,
          exclusive: Some(4),
          top_pct: 60,
          bottom_pct: 80,
        },
      )
      .only_over("Earth"),
    )
}

impl SessionConfig {
  pub fn from_toml_str(src: &str) -> SimResult<Self> {
    Ok(toml::from_str(src)?)
  }

  pub fn load(path: &Path) -> SimResult<Self> {
    Self::from_toml_str(&std::fs::read_to_string(path)?)
  }

  pub fn to_toml_string(&self) -> SimResult<String> {
    Ok(toml::to_string_pretty(self)?)
  }

  pub fn materials(&self) -> Materials {
    self.materials.clone().unwrap_or_default().into()
  }

  /// Texture map with every configured entry registered in order.
  pub fn texture_map(&self) -> SimResult<TextureMap> {
    TextureMap::from_config(self.materials(), &self.textures)
  }

  /// The stock classes, configured by the inventory and generator sections.
  pub fn classes(&self) -> SimResult<ClassRegistry> {
    catalog::classes(&self.inventory, &self.generator)
  }

  pub fn creator(&self) -> MapCreator {
    MapCreator::new(self.seed).with_policy(self.bounds)
  }

  pub fn create_options(&self) -> CreateOptions {
    CreateOptions {
      player_count: self.players,
      layered: self.layered,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_landscape_resolves() {
    let config = SessionConfig::default();
    let textures = config.texture_map().unwrap();
    let map = config
      .creator()
      .create(&config.landscape, &textures, config.create_options())
      .unwrap()
      .into_flat();
    assert_eq!((map.width(), map.height()), (200, 120));
  }

  #[test]
  fn partial_toml_keeps_defaults() {
    let config = SessionConfig::from_toml_str(
      r#"
        seed = 7
        players = 3
        bounds = "strict"

        [archive]
        path = "maps/test.sbx"
      "#,
    )
    .unwrap();
    assert_eq!(config.seed, 7);
    assert_eq!(config.bounds, BoundsPolicy::Strict);
    assert_eq!(config.archive.unwrap().entry, MAP_ENTRY);
    assert_eq!(config.generator, PowerGenerator::default());
    assert_eq!(config.landscape.width, 200);
  }

  #[test]
  fn bad_toml_is_a_config_error() {
    assert!(matches!(
      SessionConfig::from_toml_str("seed = \"many\""),
      Err(crate::error::SimError::InvalidConfig { .. })
    ));
  }
}
