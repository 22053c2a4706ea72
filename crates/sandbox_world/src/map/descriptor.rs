//! Declarative landscape descriptor consumed by the map creator.

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// Descriptor format version understood by this crate.
pub const DESCRIPTOR_VERSION: u32 = 1;

/// Largest accepted map edge in pixels. Also bounds radii, vein sizes and
/// rectangle edges in rules.
pub const MAX_MAP_DIMENSION: u32 = 16384;

/// Largest accepted spot, vein or per-player zone count of a single rule.
pub const MAX_RULE_COUNT: u32 = 65536;

fn default_version() -> u32 {
  DESCRIPTOR_VERSION
}

fn default_background() -> String {
  "Sky".to_string()
}

fn default_true() -> bool {
  true
}

fn default_bottom() -> u32 {
  100
}

fn default_vein_size() -> u32 {
  15
}

/// Complete landscape description: dimensions, optional surface curve and an
/// ordered list of painting rules. Later rules overwrite earlier ones.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LandscapeDescriptor {
  #[serde(default = "default_version")]
  pub version: u32,
  pub width: u32,
  pub height: u32,
  /// Material the map is reset to. Must resolve to the sky entry or any
  /// registered texture.
  #[serde(default = "default_background")]
  pub background: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub surface: Option<SurfaceSpec>,
  #[serde(default)]
  pub rules: Vec<LayerRule>,
}

/// Rolling terrain surface with optional liquid level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SurfaceSpec {
  /// Ground material (`"Earth"` or `"Earth-Smooth"`).
  pub material: String,
  /// Mark ground pixels as interior (tunnel background when dug).
  #[serde(default = "default_true")]
  pub ift: bool,
  /// Curve amplitude in percent of the available range.
  #[serde(default)]
  pub amplitude: u32,
  /// Curve phase in degrees.
  #[serde(default)]
  pub phase: i32,
  /// Curve period in percent (100 = one full wave across the map).
  #[serde(default)]
  pub period: u32,
  /// Strength of the random-walk roughness in percent.
  #[serde(default)]
  pub natural: u32,
  /// Stretch the period with the player count (at most 4x).
  #[serde(default)]
  pub player_extend: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub liquid: Option<String>,
  /// Liquid surface in percent of the map height, measured from the bottom.
  #[serde(default)]
  pub liquid_level: u32,
}

/// Which sub-layer a rule paints into in layered mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plane {
  Background,
  Midground,
  #[default]
  Foreground,
}

impl Plane {
  pub const ALL: [Plane; 3] = [Plane::Background, Plane::Midground, Plane::Foreground];

  pub fn index(self) -> usize {
    match self {
      Plane::Background => 0,
      Plane::Midground => 1,
      Plane::Foreground => 2,
    }
  }
}

/// Axis-aligned rectangle in map pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RectSpec {
  pub x: i32,
  pub y: i32,
  pub width: u32,
  pub height: u32,
}

/// One painting rule.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerRule {
  /// Texture-map name of the painted material.
  pub material: String,
  /// Only paint over pixels of this material (exclusive over-paint).
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub only_over: Option<String>,
  /// Set the interior flag on painted pixels.
  #[serde(default)]
  pub ift: bool,
  #[serde(default)]
  pub plane: Plane,
  #[serde(flatten)]
  pub shape: RuleShape,
}

/// Placement of a rule's material.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RuleShape {
  /// Whole map, or a rectangle of it.
  Fill {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rect: Option<RectSpec>,
  },
  /// Horizontal stratum between two heights given in percent from the top.
  Band { top_pct: u32, bottom_pct: u32 },
  /// One disc at a fixed position.
  Spot { x: i32, y: i32, radius: u32 },
  /// Random discs within a vertical range.
  Spots {
    count: u32,
    radius_min: u32,
    radius_max: u32,
    #[serde(default)]
    top_pct: u32,
    #[serde(default = "default_bottom")]
    bottom_pct: u32,
  },
  /// Random organic veins below the first `only_over` pixel of a column.
  /// `count` is per 15000 map pixels.
  Veins {
    count: u32,
    #[serde(default = "default_vein_size")]
    max_size: u32,
  },
  /// Per-player exclusive zones (starting caves), `per_player` each, at
  /// most `exclusive` in total.
  Zones {
    per_player: u32,
    radius: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exclusive: Option<u32>,
    #[serde(default)]
    top_pct: u32,
    #[serde(default = "default_bottom")]
    bottom_pct: u32,
  },
}

fn check_range(top: u32, bottom: u32, what: &str) -> SimResult<()> {
  if top > 100 || bottom > 100 || top > bottom {
    return Err(SimError::invalid_descriptor(format!(
      "{} range {}..{} percent is invalid",
      what, top, bottom
    )));
  }
  Ok(())
}

fn check_extent(value: u32, what: &str) -> SimResult<()> {
  if value > MAX_MAP_DIMENSION {
    return Err(SimError::invalid_descriptor(format!(
      "{} {} exceeds {} pixels",
      what, value, MAX_MAP_DIMENSION
    )));
  }
  Ok(())
}

fn check_count(value: u32, what: &str) -> SimResult<()> {
  if value > MAX_RULE_COUNT {
    return Err(SimError::invalid_descriptor(format!(
      "{} {} exceeds {}",
      what, value, MAX_RULE_COUNT
    )));
  }
  Ok(())
}

impl LandscapeDescriptor {
  /// Creates an empty descriptor of the given size.
  pub fn new(width: u32, height: u32) -> Self {
    Self {
      version: DESCRIPTOR_VERSION,
      width,
      height,
      background: default_background(),
      surface: None,
      rules: Vec::new(),
    }
  }

  pub fn with_surface(mut self, surface: SurfaceSpec) -> Self {
    self.surface = Some(surface);
    self
  }

  pub fn with_rule(mut self, rule: LayerRule) -> Self {
    self.rules.push(rule);
    self
  }

  /// Checks structural constraints that do not depend on the registry.
  pub fn validate(&self) -> SimResult<()> {
    if self.version == 0 || self.version > DESCRIPTOR_VERSION {
      return Err(SimError::invalid_descriptor(format!(
        "unsupported version {}",
        self.version
      )));
    }
    if self.width == 0 || self.height == 0 {
      return Err(SimError::invalid_descriptor(format!(
        "zero-size map {}x{}",
        self.width, self.height
      )));
    }
    if self.width > MAX_MAP_DIMENSION || self.height > MAX_MAP_DIMENSION {
      return Err(SimError::invalid_descriptor(format!(
        "map {}x{} exceeds {} pixels per edge",
        self.width, self.height, MAX_MAP_DIMENSION
      )));
    }
    if let Some(surface) = &self.surface {
      if surface.liquid_level > 100 {
        return Err(SimError::invalid_descriptor("liquid level above 100 percent"));
      }
    }
    for rule in &self.rules {
      match rule.shape {
        RuleShape::Fill { rect: None } => {}
        RuleShape::Fill { rect: Some(rect) } => {
          check_extent(rect.width, "fill width")?;
          check_extent(rect.height, "fill height")?;
        }
        RuleShape::Band {
          top_pct,
          bottom_pct,
        } => check_range(top_pct, bottom_pct, "band")?,
        RuleShape::Spot { radius, .. } => check_extent(radius, "spot radius")?,
        RuleShape::Spots {
          count,
          radius_min,
          radius_max,
          top_pct,
          bottom_pct,
        } => {
          check_range(top_pct, bottom_pct, "spots")?;
          check_count(count, "spot count")?;
          check_extent(radius_max, "spot radius")?;
          if radius_min > radius_max {
            return Err(SimError::invalid_descriptor(format!(
              "spot radius range {}..{} is inverted",
              radius_min, radius_max
            )));
          }
        }
        RuleShape::Veins { count, max_size } => {
          check_count(count, "vein count")?;
          check_extent(max_size, "vein size")?;
        }
        RuleShape::Zones {
          per_player,
          radius,
          top_pct,
          bottom_pct,
          ..
        } => {
          check_range(top_pct, bottom_pct, "zones")?;
          check_count(per_player, "zones per player")?;
          check_extent(radius, "zone radius")?;
        }
      }
    }
    Ok(())
  }
}

impl LayerRule {
  /// Creates a foreground rule without mask or interior flag.
  pub fn new(material: impl Into<String>, shape: RuleShape) -> Self {
    Self {
      material: material.into(),
      only_over: None,
      ift: false,
      plane: Plane::Foreground,
      shape,
    }
  }

  pub fn only_over(mut self, material: impl Into<String>) -> Self {
    self.only_over = Some(material.into());
    self
  }

  pub fn ift(mut self, ift: bool) -> Self {
    self.ift = ift;
    self
  }

  pub fn on(mut self, plane: Plane) -> Self {
    self.plane = plane;
    self
  }
}
