//! Benchmarks for map creation, validation and archive encoding.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use sandbox_world::persistence::{decode_map, encode_map};
use sandbox_world::{
  CreateOptions, LandscapeDescriptor, MapCreator, SessionConfig, TextureMap,
  validate_texture_indices,
};

fn setup() -> (LandscapeDescriptor, TextureMap) {
  let config = SessionConfig::default();
  let textures = config.texture_map().expect("default textures resolve");
  (config.landscape, textures)
}

fn sized(descriptor: &LandscapeDescriptor, scale: u32) -> LandscapeDescriptor {
  let mut descriptor = descriptor.clone();
  descriptor.width *= scale;
  descriptor.height *= scale;
  descriptor
}

fn bench_create(c: &mut Criterion) {
  let (base, textures) = setup();
  let mut group = c.benchmark_group("create");
  for scale in [1u32, 2, 4] {
    let descriptor = sized(&base, scale);
    group.throughput(Throughput::Elements(
      descriptor.width as u64 * descriptor.height as u64,
    ));
    for layered in [false, true] {
      let options = CreateOptions {
        player_count: 2,
        layered,
      };
      let label = if layered { "layered" } else { "flat" };
      group.bench_with_input(
        BenchmarkId::new(label, format!("{}x{}", descriptor.width, descriptor.height)),
        &descriptor,
        |b, descriptor| {
          b.iter(|| {
            MapCreator::new(black_box(42))
              .create(descriptor, &textures, options)
              .expect("create")
          })
        },
      );
    }
  }
  group.finish();
}

fn bench_validate(c: &mut Criterion) {
  let (base, textures) = setup();
  let descriptor = sized(&base, 4);
  let map = MapCreator::new(7)
    .create(&descriptor, &textures, CreateOptions::default())
    .expect("create")
    .into_flat();

  c.bench_function("validate_texture_indices", |b| {
    b.iter_batched(
      || map.clone(),
      |mut map| validate_texture_indices(&mut map, &textures),
      criterion::BatchSize::LargeInput,
    )
  });
}

fn bench_codec(c: &mut Criterion) {
  let (base, textures) = setup();
  let map = MapCreator::new(7)
    .create(&sized(&base, 4), &textures, CreateOptions::default())
    .expect("create")
    .into_flat();
  let encoded = encode_map(&map);

  let mut group = c.benchmark_group("map_entry");
  group.bench_function("encode", |b| b.iter(|| encode_map(black_box(&map))));
  group.bench_function("decode", |b| {
    b.iter(|| decode_map("Map", black_box(&encoded)).expect("decode"))
  });
  group.finish();
}

criterion_group!(benches, bench_create, bench_validate, bench_codec);
criterion_main!(benches);
