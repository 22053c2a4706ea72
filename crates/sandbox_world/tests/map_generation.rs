//! Map generation properties over randomized descriptors and seeds.

use rand::prelude::*;
use sandbox_world::{
  BoundsPolicy, CreateOptions, LandscapeDescriptor, LayerRule, MapBuffer, MapCreator, MapPixel,
  Plane, RuleShape, SessionConfig, SimError, SurfaceSpec, TextureMap, validate_texture_indices,
};

const MATERIALS: [&str; 6] = ["Earth-Smooth", "Rock-Smooth", "Ore-Rough", "Gold", "Water", "Tunnel"];

fn textures() -> TextureMap {
  SessionConfig::default()
    .texture_map()
    .expect("default textures resolve")
}

fn random_rule(rng: &mut StdRng, width: u32, height: u32) -> LayerRule {
  let material = *MATERIALS.choose(rng).unwrap();
  let top = rng.gen_range(0..=90);
  let bottom = rng.gen_range(top..=100);
  let shape = match rng.gen_range(0..6) {
    0 => RuleShape::Fill { rect: None },
    1 => RuleShape::Band {
      top_pct: top,
      bottom_pct: bottom,
    },
    2 => RuleShape::Spot {
      x: rng.gen_range(-5..width as i32 + 5),
      y: rng.gen_range(-5..height as i32 + 5),
      radius: rng.gen_range(0..10),
    },
    3 => {
      let radius_min = rng.gen_range(0..4);
      RuleShape::Spots {
        count: rng.gen_range(0..12),
        radius_min,
        radius_max: radius_min + rng.gen_range(0..4),
        top_pct: top,
        bottom_pct: bottom,
      }
    }
    4 => RuleShape::Veins {
      count: rng.gen_range(0..10),
      max_size: rng.gen_range(1..20),
    },
    _ => RuleShape::Zones {
      per_player: rng.gen_range(0..3),
      radius: rng.gen_range(1..8),
      exclusive: if rng.gen_bool(0.5) {
        Some(rng.gen_range(0..4))
      } else {
        None
      },
      top_pct: top,
      bottom_pct: bottom,
    },
  };
  let mut rule = LayerRule::new(material, shape).ift(rng.gen_bool(0.3));
  if rng.gen_bool(0.3) {
    rule = rule.only_over("Earth");
  }
  if rng.gen_bool(0.3) {
    rule = rule.on(Plane::Background);
  }
  rule
}

fn random_descriptor(rng: &mut StdRng) -> LandscapeDescriptor {
  let width = rng.gen_range(1..160);
  let height = rng.gen_range(1..120);
  let mut descriptor = LandscapeDescriptor::new(width, height);
  if rng.gen_bool(0.7) {
    descriptor = descriptor.with_surface(SurfaceSpec {
      material: "Earth-Smooth".into(),
      ift: true,
      amplitude: rng.gen_range(0..=100),
      phase: rng.gen_range(-360..=360),
      period: rng.gen_range(0..=100),
      natural: rng.gen_range(0..=100),
      player_extend: rng.gen_bool(0.5),
      liquid: rng.gen_bool(0.5).then(|| "Water".to_string()),
      liquid_level: rng.gen_range(0..=100),
    });
  }
  for _ in 0..rng.gen_range(0..8) {
    let rule = random_rule(rng, width, height);
    descriptor = descriptor.with_rule(rule);
  }
  descriptor
}

#[test]
fn random_descriptors_only_produce_registered_pixels() {
  let textures = textures();
  let mut rng = StdRng::seed_from_u64(0x5eed);

  for _ in 0..64 {
    let descriptor = random_descriptor(&mut rng);
    let seed = rng.r#gen::<u64>();
    let options = CreateOptions {
      player_count: rng.gen_range(1..6),
      layered: rng.gen_bool(0.3),
    };
    let map = MapCreator::new(seed)
      .create(&descriptor, &textures, options)
      .unwrap_or_else(|e| panic!("{:?} failed: {}", descriptor, e))
      .into_flat();

    assert_eq!((map.width(), map.height()), (descriptor.width, descriptor.height));
    for (x, y, pixel) in map.pixels() {
      assert!(
        textures.is_registered(pixel.tex()),
        "unregistered {:?} at ({}, {}) for {:?}",
        pixel,
        x,
        y,
        descriptor
      );
    }

    let mut validated = map.clone();
    assert!(validate_texture_indices(&mut validated, &textures).is_clean());
    assert!(validated.same_pixels(&map));
  }
}

#[test]
fn creation_is_deterministic_per_seed() {
  let textures = textures();
  let mut rng = StdRng::seed_from_u64(17);

  for _ in 0..16 {
    let descriptor = random_descriptor(&mut rng);
    let seed = rng.r#gen::<u64>();
    let options = CreateOptions {
      player_count: 3,
      layered: false,
    };
    let a = MapCreator::new(seed)
      .create(&descriptor, &textures, options)
      .unwrap()
      .into_flat();
    let b = MapCreator::new(seed)
      .create(&descriptor, &textures, options)
      .unwrap()
      .into_flat();
    assert_eq!(a.as_bytes(), b.as_bytes());
  }
}

#[test]
fn different_seeds_change_the_default_landscape() {
  let config = SessionConfig::default();
  let textures = config.texture_map().unwrap();
  let create = |seed| {
    MapCreator::new(seed)
      .create(&config.landscape, &textures, CreateOptions::default())
      .unwrap()
      .into_flat()
  };
  assert!(!create(1).same_pixels(&create(2)));
}

#[test]
fn player_count_is_part_of_the_input() {
  let config = SessionConfig::default();
  let textures = config.texture_map().unwrap();
  let create = |player_count| {
    MapCreator::new(5)
      .create(
        &config.landscape,
        &textures,
        CreateOptions {
          player_count,
          layered: false,
        },
      )
      .unwrap()
      .into_flat()
  };
  let tunnel = MapPixel::from(textures.index_of("Tunnel").unwrap());
  assert!(create(4).count(tunnel) > create(1).count(tunnel));
}

#[test]
fn out_of_range_writes_leave_neighbours_alone() {
  let textures = textures();
  let earth = MapPixel::from(textures.index_of("Earth").unwrap());
  let ore = MapPixel::from(textures.index_of("Ore").unwrap());

  let mut map = MapBuffer::with_stride(8, 6, 12);
  map.fill(earth);
  let before = map.clone();
  for (x, y) in [(-1, -1), (8, 6), (8, 0), (-1, 5), (0, 6), (i32::MIN, i32::MAX)] {
    assert_eq!(map.set_pixel(x, y, ore).unwrap(), false);
  }
  assert!(map.same_pixels(&before));
  assert_eq!(map.as_bytes(), before.as_bytes());

  let mut strict = before.clone().with_policy(BoundsPolicy::Strict);
  assert!(matches!(
    strict.set_pixel(8, 6, ore),
    Err(SimError::OutOfBounds {
      x: 8,
      y: 6,
      width: 8,
      height: 6
    })
  ));
  assert!(strict.same_pixels(&before));
}
