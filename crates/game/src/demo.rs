//! Demo scene and the end-of-run summary.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use bevy::app::AppExit;
use bevy::ecs::message::MessageWriter;
use bevy::prelude::*;
use sandbox_world::interaction::catalog;
use sandbox_world::{
  InteractionRequest, Landscape, MAP_ENTRY, MapArchive, ObjectState, SandboxSet, SessionConfig,
  SessionControl, SessionState, SimResult, Simulation,
};
use serde::Serialize;

/// What the runner does around the session.
#[derive(Resource, Debug, Clone, Default)]
pub struct DemoRun {
  pub ticks: u64,
  pub spawn_scene: bool,
  pub save_map: Option<PathBuf>,
  pub report: Option<PathBuf>,
}

pub struct DemoPlugin {
  pub run: DemoRun,
}

impl Plugin for DemoPlugin {
  fn build(&self, app: &mut App) {
    app
      .insert_resource(self.run.clone())
      .add_systems(Startup, spawn_scene.after(SandboxSet::Bootstrap))
      .add_systems(Update, exit_on_failure)
      .add_systems(FixedUpdate, finish_run.after(SandboxSet::Tick));
  }
}

/// First solid landscape row in column `x`, in landscape pixels.
fn surface_y(landscape: &Landscape, x: i32) -> i32 {
  let zoom = landscape.zoom() as i32;
  let height = landscape.map().height() as i32;
  (0..height)
    .map(|row| row * zoom)
    .find(|&y| {
      landscape
        .material_at(x, y)
        .is_some_and(|m| m.solidity.is_solid())
    })
    .unwrap_or(height * zoom)
}

fn spawn_scene(run: Res<DemoRun>, simulation: Option<ResMut<Simulation>>) {
  if !run.spawn_scene {
    return;
  }
  let Some(mut simulation) = simulation else {
    return;
  };
  if let Err(e) = populate(&mut simulation) {
    warn!("Demo scene incomplete: {}", e);
  }
}

/// A steam engine fed with coal and a stray rock, a clonk next to it and a
/// log of wood on the ground.
fn populate(simulation: &mut Simulation) -> SimResult<()> {
  let Some(landscape) = simulation.landscape() else {
    return Ok(());
  };
  let x = landscape.size().0 as i32 / 2;
  let ground = surface_y(landscape, x);

  let engine = simulation.spawn(ObjectState::new(catalog::STEAM_ENGINE).at(x, ground - 10))?;
  let clonk = simulation.spawn(ObjectState::new(catalog::CLONK).at(x + 24, ground - 8).owned_by(0))?;
  let coal = simulation.spawn(ObjectState::new(catalog::COAL))?;
  let rock = simulation.spawn(ObjectState::new(catalog::ROCK))?;
  simulation.spawn(ObjectState::new(catalog::WOOD).at(x - 40, ground - 4))?;

  simulation.apply([
    InteractionRequest::Enter {
      item: rock,
      container: engine,
    },
    InteractionRequest::Enter {
      item: coal,
      container: engine,
    },
  ]);
  info!(
    "Demo scene at x={}: engine {}, clonk {}, surface at y={}",
    x, engine, clonk, ground
  );
  Ok(())
}

#[derive(Debug, Serialize)]
struct RunSummary {
  seed: u64,
  ticks: u64,
  map_width: u32,
  map_height: u32,
  objects: usize,
  effects: usize,
  /// Map pixel counts by material name.
  materials: BTreeMap<String, usize>,
  engines: Vec<EngineSummary>,
}

#[derive(Debug, Serialize)]
struct EngineSummary {
  x: i32,
  y: i32,
  power: u32,
  fuel: u32,
  action: String,
}

fn summarize(config: &SessionConfig, simulation: &Simulation) -> RunSummary {
  let mut materials = BTreeMap::new();
  let (mut map_width, mut map_height) = (0, 0);
  if let Some(landscape) = simulation.landscape() {
    map_width = landscape.map().width();
    map_height = landscape.map().height();
    for (_, _, pixel) in landscape.map().pixels() {
      let name = landscape
        .textures()
        .material_of(pixel)
        .map_or_else(|_| "?".to_string(), |m| m.name.clone());
      *materials.entry(name).or_insert(0) += 1;
    }
  }

  let engines = simulation
    .world()
    .objects
    .iter()
    .filter(|(_, state)| state.class == catalog::STEAM_ENGINE)
    .map(|(_, state)| EngineSummary {
      x: state.x,
      y: state.y,
      power: state.power,
      fuel: state.fuel,
      action: state.action().unwrap_or("Idle").to_string(),
    })
    .collect();

  RunSummary {
    seed: config.seed,
    ticks: simulation.tick_count(),
    map_width,
    map_height,
    objects: simulation.world().objects.len(),
    effects: simulation.scheduler().effects().len(),
    materials,
    engines,
  }
}

fn save_map(config: &SessionConfig, simulation: &Simulation, path: &Path) -> SimResult<()> {
  let Some(landscape) = simulation.landscape() else {
    return Ok(());
  };
  let mut archive = MapArchive::open(path).unwrap_or_else(|_| MapArchive::new(config.seed));
  config
    .creator()
    .save(&mut archive, MAP_ENTRY, landscape.map())?;
  archive.save(path)
}

fn write_report(summary: &RunSummary, path: &Path) -> SimResult<()> {
  let text = toml::to_string_pretty(summary)?;
  std::fs::write(path, text)?;
  Ok(())
}

fn finish_run(
  run: Res<DemoRun>,
  config: Res<SessionConfig>,
  simulation: Option<Res<Simulation>>,
  mut exit: MessageWriter<AppExit>,
) {
  let Some(simulation) = simulation else {
    return;
  };
  if simulation.tick_count() < run.ticks {
    return;
  }

  let summary = summarize(&config, &simulation);
  info!(
    "Ran {} ticks on a {}x{} map: {} objects, {} effects",
    summary.ticks, summary.map_width, summary.map_height, summary.objects, summary.effects
  );
  for engine in &summary.engines {
    info!(
      "Steam engine at ({}, {}): power {}, fuel {}, {}",
      engine.x, engine.y, engine.power, engine.fuel, engine.action
    );
  }

  if let Some(path) = &run.save_map {
    match save_map(&config, &simulation, path) {
      Ok(()) => info!("Map saved to {}", path.display()),
      Err(e) => error!("Could not save map to {}: {}", path.display(), e),
    }
  }
  if let Some(path) = &run.report {
    if let Err(e) = write_report(&summary, path) {
      error!("Could not write report {}: {}", path.display(), e);
    }
  }
  exit.write(AppExit::Success);
}

fn exit_on_failure(control: Res<SessionControl>, mut exit: MessageWriter<AppExit>) {
  if control.state() == SessionState::Failed {
    error!(
      "Session failed: {}",
      control.failure().unwrap_or("unknown error")
    );
    exit.write(AppExit::from_code(1));
  }
}
