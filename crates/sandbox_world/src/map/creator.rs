//! Procedural map creation and archive loading.
//!
//! [`MapCreator::create`] paints a [`LandscapeDescriptor`] into a fresh
//! buffer: reset to the background, optional surface curve and liquid level,
//! then every rule in descriptor order. All material names are resolved
//! before the first pixel is written, so a bad descriptor never yields a
//! partially painted map.

use bevy::log::{debug, info};

use crate::coords::{MapPixel, TexIndex};
use crate::error::{SimError, SimResult};
use crate::hash::MapRng;
use crate::map::buffer::{BoundsPolicy, MapBuffer};
use crate::map::descriptor::{LandscapeDescriptor, LayerRule, Plane, RuleShape};
use crate::map::surface::{paint_liquid, paint_surface, surface_profile};
use crate::map::validate::{ValidationReport, validate_texture_indices};
use crate::persistence::{MapArchive, decode_map, encode_map};
use crate::registry::TextureMap;

/// Map pixels per vein at `count = 1`.
pub const VEIN_AREA: u64 = 15_000;

/// Stream of the surface curve; rule `i` draws from stream `i + 1`.
const SURFACE_STREAM: u64 = 0;

/// Per-call generation options.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CreateOptions {
  pub player_count: u32,
  /// Produce separate background/midground/foreground planes.
  pub layered: bool,
}

impl Default for CreateOptions {
  fn default() -> Self {
    Self {
      player_count: 1,
      layered: false,
    }
  }
}

/// Background, midground and foreground planes of a layered map.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MapLayers {
  planes: [MapBuffer; 3],
}

impl MapLayers {
  fn new(width: u32, height: u32, background: MapPixel) -> Self {
    let plane = || {
      let mut buffer = MapBuffer::new(width, height);
      buffer.fill(background);
      buffer
    };
    Self {
      planes: [plane(), plane(), plane()],
    }
  }

  pub fn plane(&self, plane: Plane) -> &MapBuffer {
    &self.planes[plane.index()]
  }

  fn plane_mut(&mut self, plane: Plane) -> &mut MapBuffer {
    &mut self.planes[plane.index()]
  }

  /// Composites front to back: the frontmost non-sky pixel wins.
  pub fn flatten(&self) -> MapBuffer {
    let mut out = self.planes[0].clone();
    out.overlay(&self.planes[1]);
    out.overlay(&self.planes[2]);
    out
  }
}

/// Result of [`MapCreator::create`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GeneratedMap {
  Flat(MapBuffer),
  Layered(MapLayers),
}

impl GeneratedMap {
  /// Single buffer view; layered maps are composited.
  pub fn into_flat(self) -> MapBuffer {
    match self {
      Self::Flat(buffer) => buffer,
      Self::Layered(layers) => layers.flatten(),
    }
  }

  pub fn width(&self) -> u32 {
    match self {
      Self::Flat(buffer) => buffer.width(),
      Self::Layered(layers) => layers.planes[0].width(),
    }
  }

  pub fn height(&self) -> u32 {
    match self {
      Self::Flat(buffer) => buffer.height(),
      Self::Layered(layers) => layers.planes[0].height(),
    }
  }
}

/// A map read back from an archive.
#[derive(Clone, Debug)]
pub struct LoadedMap {
  pub buffer: MapBuffer,
  /// Row stride of `buffer` in pixels.
  pub buffer_width: u32,
  pub map_width: u32,
  pub map_height: u32,
  /// Pixels replaced with sky during validation.
  pub substitutions: usize,
}

/// Rule with every name resolved to a pixel value.
struct ResolvedRule<'a> {
  rule: &'a LayerRule,
  pixel: MapPixel,
  mask: Option<MapPixel>,
}

struct ResolvedSurface {
  ground: MapPixel,
  liquid: Option<MapPixel>,
}

/// Seeded landscape generator and loader.
#[derive(Clone, Debug)]
pub struct MapCreator {
  seed: u64,
  policy: BoundsPolicy,
}

fn resolve(textures: &TextureMap, name: &str) -> SimResult<TexIndex> {
  textures.index_of(name)
}

impl MapCreator {
  pub fn new(seed: u64) -> Self {
    Self {
      seed,
      policy: BoundsPolicy::Clip,
    }
  }

  /// Bounds policy of the buffers this creator hands out.
  pub fn with_policy(mut self, policy: BoundsPolicy) -> Self {
    self.policy = policy;
    self
  }

  pub fn seed(&self) -> u64 {
    self.seed
  }

  /// Generates a map from `descriptor`.
  ///
  /// Identical descriptor, seed and player count produce byte-identical
  /// output.
  pub fn create(
    &self,
    descriptor: &LandscapeDescriptor,
    textures: &TextureMap,
    options: CreateOptions,
  ) -> SimResult<GeneratedMap> {
    descriptor.validate()?;

    let background = MapPixel::from(resolve(textures, &descriptor.background)?);
    let surface = match &descriptor.surface {
      Some(spec) => Some(ResolvedSurface {
        ground: MapPixel::new(resolve(textures, &spec.material)?, spec.ift),
        liquid: match &spec.liquid {
          Some(name) => Some(MapPixel::from(resolve(textures, name)?)),
          None => None,
        },
      }),
      None => None,
    };
    let rules = descriptor
      .rules
      .iter()
      .map(|rule| {
        let pixel = MapPixel::new(resolve(textures, &rule.material)?, rule.ift);
        let mask = match &rule.only_over {
          Some(name) => Some(MapPixel::from(resolve(textures, name)?)),
          None => None,
        };
        Ok(ResolvedRule { rule, pixel, mask })
      })
      .collect::<SimResult<Vec<_>>>()?;

    let (width, height) = (descriptor.width, descriptor.height);
    let players = options.player_count.max(1);
    let base = MapRng::new(self.seed);

    let mut layers = MapLayers::new(width, height, background);
    if let (Some(spec), Some(resolved)) = (&descriptor.surface, &surface) {
      let foreground = layers.plane_mut(Plane::Foreground);
      let mut rng = base.fork(SURFACE_STREAM);
      let profile = surface_profile(spec, width, height, players, &mut rng);
      paint_surface(foreground, &profile, resolved.ground);
      if let Some(liquid) = resolved.liquid {
        paint_liquid(foreground, spec.liquid_level, background, liquid);
      }
    }

    for (i, resolved) in rules.iter().enumerate() {
      let mut rng = base.fork(i as u64 + 1);
      let plane = if options.layered {
        resolved.rule.plane
      } else {
        Plane::Foreground
      };
      let written = paint_rule(layers.plane_mut(plane), resolved, &mut rng, players);
      debug!(
        "Rule {} ({}) painted {} pixels",
        i, resolved.rule.material, written
      );
    }

    for plane in &mut layers.planes {
      plane.set_policy(self.policy);
    }

    info!(
      "Created {}x{} map (seed {}, {} players, {} rules{})",
      width,
      height,
      self.seed,
      players,
      rules.len(),
      if options.layered { ", layered" } else { "" }
    );

    if options.layered {
      Ok(GeneratedMap::Layered(layers))
    } else {
      let [_, _, foreground] = layers.planes;
      Ok(GeneratedMap::Flat(foreground))
    }
  }

  /// Generates a flat map and replaces `target` with it only on success.
  pub fn create_into(
    &self,
    target: &mut MapBuffer,
    descriptor: &LandscapeDescriptor,
    textures: &TextureMap,
    player_count: u32,
  ) -> SimResult<()> {
    let options = CreateOptions {
      player_count,
      layered: false,
    };
    let policy = target.policy();
    let mut map = self.create(descriptor, textures, options)?.into_flat();
    map.set_policy(policy);
    *target = map;
    Ok(())
  }

  /// Reads map entry `entry` and validates it against `textures`.
  pub fn load(
    &self,
    archive: &MapArchive,
    entry: &str,
    textures: &TextureMap,
  ) -> SimResult<LoadedMap> {
    let mut buffer = decode_map(entry, archive.entry(entry)?)?.with_policy(self.policy);
    let report = validate_texture_indices(&mut buffer, textures);
    info!(
      "Loaded {}x{} map from entry {:?}",
      buffer.width(),
      buffer.height(),
      entry
    );
    Ok(LoadedMap {
      buffer_width: buffer.stride(),
      map_width: buffer.width(),
      map_height: buffer.height(),
      substitutions: report.substitutions,
      buffer,
    })
  }

  /// Loads into a caller-provided buffer. The stored map must fit; it is
  /// pasted at the top-left corner over a background reset.
  pub fn load_into(
    &self,
    target: &mut MapBuffer,
    archive: &MapArchive,
    entry: &str,
    textures: &TextureMap,
  ) -> SimResult<ValidationReport> {
    let mut map = decode_map(entry, archive.entry(entry)?)?;
    if map.width() > target.width() || map.height() > target.height() {
      return Err(SimError::corrupt(
        entry,
        format!(
          "stored map {}x{} exceeds buffer {}x{}",
          map.width(),
          map.height(),
          target.width(),
          target.height()
        ),
      ));
    }
    let report = validate_texture_indices(&mut map, textures);
    target.reset();
    target.paste(&map);
    Ok(report)
  }

  /// Stores `buffer` as map entry `entry`.
  pub fn save(&self, archive: &mut MapArchive, entry: &str, buffer: &MapBuffer) -> SimResult<()> {
    archive.set_seed(self.seed);
    archive.insert(entry, encode_map(buffer))
  }
}

fn pct_row(height: u32, pct: u32) -> i32 {
  (height as u64 * pct.min(100) as u64 / 100) as i32
}

/// Paints one rule. Returns the number of pixels written.
fn paint_rule(buffer: &mut MapBuffer, resolved: &ResolvedRule, rng: &mut MapRng, players: u32) -> u32 {
  let (width, height) = (buffer.width(), buffer.height());
  let pixel = resolved.pixel;
  buffer.set_mask(resolved.mask);

  let written = match resolved.rule.shape {
    RuleShape::Fill { rect } => match rect {
      Some(r) => buffer.fill_rect(r.x, r.y, r.width, r.height, pixel),
      None => buffer.fill_rect(0, 0, width, height, pixel),
    },
    RuleShape::Band {
      top_pct,
      bottom_pct,
    } => {
      let top = pct_row(height, top_pct);
      let bottom = pct_row(height, bottom_pct);
      buffer.fill_rect(0, top, width, (bottom - top).max(0) as u32, pixel)
    }
    RuleShape::Spot { x, y, radius } => buffer.set_spot(x, y, radius, pixel),
    RuleShape::Spots {
      count,
      radius_min,
      radius_max,
      top_pct,
      bottom_pct,
    } => {
      let top = pct_row(height, top_pct);
      let span = (pct_row(height, bottom_pct) - top).max(1);
      let mut written = 0;
      for _ in 0..count {
        let x = rng.below(width as i32);
        let y = top + rng.below(span);
        let radius = rng.range(radius_min as i32, radius_max as i32);
        written += buffer.set_spot(x, y, radius as u32, pixel);
      }
      written
    }
    RuleShape::Veins { count, max_size } => {
      let total = count as u64 * width as u64 * height as u64 / VEIN_AREA;
      let mut written = 0;
      for _ in 0..total {
        let x = rng.below(width as i32);
        let below = rng.below(i32::MAX);
        let size = rng.below(max_size as i32).max(1) as u32;
        // Veins start a few pixels under the first base pixel of the column.
        let top = match resolved.mask {
          Some(base) => match (0..height as i32).find(|&y| buffer.get_pixel(x, y).tex() == base.tex()) {
            Some(y) => y,
            None => continue,
          },
          None => 0,
        };
        let room = height as i32 - top - 10;
        let y = top + 5 + if room > 0 { below % room } else { 0 };
        written += buffer.draw_layer(x, y, size, pixel, rng);
      }
      written
    }
    RuleShape::Zones {
      per_player,
      radius,
      exclusive,
      top_pct,
      bottom_pct,
    } => {
      let wanted = per_player.saturating_mul(players);
      // At most one zone per column.
      let zones = exclusive.map_or(wanted, |cap| wanted.min(cap)).min(width);
      let top = pct_row(height, top_pct);
      let span = (pct_row(height, bottom_pct) - top).max(1);
      let mut written = 0;
      for i in 0..zones {
        let slot = width as i64 * (2 * i as i64 + 1) / (2 * zones as i64);
        let jitter = (width as i64 / (4 * zones as i64)) as i32;
        let x = slot as i32 + rng.range(-jitter, jitter);
        let y = top + rng.below(span);
        written += buffer.set_spot(x, y, radius, pixel);
      }
      written
    }
  };

  buffer.set_mask(None);
  written
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::map::descriptor::{MAX_RULE_COUNT, RectSpec, SurfaceSpec};

  fn textures() -> TextureMap {
    let mut textures = TextureMap::default();
    for name in ["Earth", "Ore", "Rock", "Water", "Gold"] {
      textures.register(name).unwrap();
    }
    textures
  }

  fn px(textures: &TextureMap, name: &str) -> MapPixel {
    MapPixel::from(textures.index_of(name).unwrap())
  }

  fn surface() -> SurfaceSpec {
    SurfaceSpec {
      material: "Earth".into(),
      ift: true,
      amplitude: 30,
      phase: 20,
      period: 200,
      natural: 20,
      player_extend: true,
      liquid: Some("Water".into()),
      liquid_level: 40,
    }
  }

  #[test]
  fn spot_over_base_layer() {
    let textures = textures();
    let descriptor = LandscapeDescriptor::new(20, 20)
      .with_rule(LayerRule::new(
        "Earth",
        RuleShape::Band {
          top_pct: 50,
          bottom_pct: 100,
        },
      ))
      .with_rule(LayerRule::new(
        "Ore",
        RuleShape::Spot {
          x: 10,
          y: 10,
          radius: 3,
        },
      ));
    let map = MapCreator::new(1)
      .create(&descriptor, &textures, CreateOptions::default())
      .unwrap()
      .into_flat();

    for (x, y, p) in map.pixels() {
      let (dx, dy) = (x as i32 - 10, y as i32 - 10);
      let expected = if dx * dx + dy * dy <= 9 {
        px(&textures, "Ore")
      } else if y >= 10 {
        px(&textures, "Earth")
      } else {
        MapPixel::SKY
      };
      assert_eq!(p, expected, "pixel ({}, {})", x, y);
    }
  }

  #[test]
  fn unknown_material_aborts_before_painting() {
    let textures = textures();
    let descriptor = LandscapeDescriptor::new(8, 8)
      .with_rule(LayerRule::new("Earth", RuleShape::Fill { rect: None }))
      .with_rule(LayerRule::new("Cheese", RuleShape::Fill { rect: None }));

    let mut target = MapBuffer::new(8, 8);
    target.fill(px(&textures, "Rock"));
    let before = target.clone();
    let err = MapCreator::new(3)
      .create_into(&mut target, &descriptor, &textures, 1)
      .unwrap_err();
    assert!(matches!(err, SimError::UnknownMaterial { .. }));
    assert_eq!(target, before);
  }

  #[test]
  fn zero_size_is_rejected() {
    let err = MapCreator::new(0)
      .create(
        &LandscapeDescriptor::new(0, 4),
        &textures(),
        CreateOptions::default(),
      )
      .unwrap_err();
    assert!(matches!(err, SimError::InvalidDescriptor { .. }));
  }

  #[test]
  fn only_over_masks_the_rule() {
    let textures = textures();
    let descriptor = LandscapeDescriptor::new(10, 10)
      .with_rule(LayerRule::new(
        "Earth",
        RuleShape::Fill {
          rect: Some(RectSpec {
            x: 0,
            y: 0,
            width: 5,
            height: 10,
          }),
        },
      ))
      .with_rule(LayerRule::new("Ore", RuleShape::Fill { rect: None }).only_over("Earth"));
    let map = MapCreator::new(0)
      .create(&descriptor, &textures, CreateOptions::default())
      .unwrap()
      .into_flat();
    assert_eq!(map.count(px(&textures, "Ore")), 50);
    assert_eq!(map.count(MapPixel::SKY), 50);
  }

  #[test]
  fn zones_are_capped_by_exclusive() {
    let textures = textures();
    let zones = |players, exclusive| {
      let descriptor = LandscapeDescriptor::new(200, 40).with_rule(LayerRule::new(
        "Gold",
        RuleShape::Zones {
          per_player: 1,
          radius: 2,
          exclusive,
          top_pct: 50,
          bottom_pct: 50,
        },
      ));
      let options = CreateOptions {
        player_count: players,
        layered: false,
      };
      let map = MapCreator::new(8)
        .create(&descriptor, &textures, options)
        .unwrap()
        .into_flat();
      // Each radius 2 disc has 13 pixels and zones never overlap here.
      map.count(px(&textures, "Gold")) / 13
    };
    assert_eq!(zones(3, None), 3);
    assert_eq!(zones(6, Some(2)), 2);
  }

  #[test]
  fn zone_count_is_bounded_by_map_width() {
    let textures = textures();
    let descriptor = LandscapeDescriptor::new(64, 64).with_rule(LayerRule::new(
      "Gold",
      RuleShape::Zones {
        per_player: MAX_RULE_COUNT,
        radius: 1,
        exclusive: None,
        top_pct: 50,
        bottom_pct: 60,
      },
    ));
    let options = CreateOptions {
      player_count: u32::MAX,
      layered: false,
    };
    let map = MapCreator::new(8)
      .create(&descriptor, &textures, options)
      .unwrap()
      .into_flat();
    assert!(map.count(px(&textures, "Gold")) > 0);
  }

  #[test]
  fn oversized_spot_is_an_error() {
    let descriptor = LandscapeDescriptor::new(64, 64).with_rule(LayerRule::new(
      "Ore",
      RuleShape::Spot {
        x: 32,
        y: 32,
        radius: 50_000,
      },
    ));
    let err = MapCreator::new(1)
      .create(&descriptor, &textures(), CreateOptions::default())
      .unwrap_err();
    assert!(matches!(err, SimError::InvalidDescriptor { .. }));
  }

  #[test]
  fn surface_and_liquid_fill_the_lower_map() {
    let textures = textures();
    let descriptor = LandscapeDescriptor::new(120, 60).with_surface(surface());
    let map = MapCreator::new(5)
      .create(&descriptor, &textures, CreateOptions::default())
      .unwrap()
      .into_flat();
    let earth = MapPixel::new(textures.index_of("Earth").unwrap(), true);
    // Bottom row is always below the surface.
    assert!(map.row(59).iter().all(|&b| b == earth.0));
    // Top row is always sky.
    assert!(map.row(0).iter().all(|&b| b == 0));
    // Water only appears below the liquid line.
    for (_, y, p) in map.pixels() {
      if p == px(&textures, "Water") {
        assert!(y >= 36);
      }
    }
  }

  #[test]
  fn same_seed_same_map() {
    let textures = textures();
    let descriptor = LandscapeDescriptor::new(150, 100)
      .with_surface(surface())
      .with_rule(
        LayerRule::new(
          "Ore",
          RuleShape::Veins {
            count: 30,
            max_size: 12,
          },
        )
        .only_over("Earth"),
      );
    let a = MapCreator::new(77)
      .create(&descriptor, &textures, CreateOptions::default())
      .unwrap();
    let b = MapCreator::new(77)
      .create(&descriptor, &textures, CreateOptions::default())
      .unwrap();
    assert_eq!(a, b);
    let c = MapCreator::new(78)
      .create(&descriptor, &textures, CreateOptions::default())
      .unwrap();
    assert_ne!(a, c);
  }

  #[test]
  fn layered_mode_separates_planes() {
    let textures = textures();
    let descriptor = LandscapeDescriptor::new(10, 10)
      .with_rule(LayerRule::new("Rock", RuleShape::Fill { rect: None }).on(Plane::Background))
      .with_rule(LayerRule::new(
        "Ore",
        RuleShape::Spot {
          x: 5,
          y: 5,
          radius: 1,
        },
      ));
    let options = CreateOptions {
      player_count: 1,
      layered: true,
    };
    let GeneratedMap::Layered(layers) = MapCreator::new(0)
      .create(&descriptor, &textures, options)
      .unwrap()
    else {
      panic!("expected layered map");
    };
    assert_eq!(layers.plane(Plane::Background).count(px(&textures, "Rock")), 100);
    assert_eq!(layers.plane(Plane::Foreground).count(px(&textures, "Ore")), 5);
    let flat = layers.flatten();
    assert_eq!(flat.count(px(&textures, "Ore")), 5);
    assert_eq!(flat.count(px(&textures, "Rock")), 95);
  }

  #[test]
  fn load_into_rejects_oversize_maps() {
    let textures = textures();
    let creator = MapCreator::new(0);
    let mut archive = MapArchive::new(0);
    creator
      .save(&mut archive, "Map", &MapBuffer::new(16, 16))
      .unwrap();
    let mut small = MapBuffer::new(8, 8);
    let err = creator
      .load_into(&mut small, &archive, "Map", &textures)
      .unwrap_err();
    assert!(matches!(err, SimError::CorruptMapData { .. }));
  }

  #[test]
  fn missing_entry_is_corrupt() {
    let err = MapCreator::new(0)
      .load(&MapArchive::new(0), "Map", &textures())
      .unwrap_err();
    assert!(matches!(err, SimError::CorruptMapData { .. }));
  }
}
