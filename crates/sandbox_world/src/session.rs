//! Session lifecycle: bootstrap, start, pause and restart.

use bevy::log::{info, warn};
use bevy::prelude::Resource;

use crate::config::SessionConfig;
use crate::error::SimResult;
use crate::landscape::Landscape;
use crate::map::MapBuffer;
use crate::persistence::MapArchive;
use crate::registry::TextureMap;
use crate::simulation::Simulation;

/// Where the session map came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MapSource {
  Archive,
  Created,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
  /// Not bootstrapped yet.
  #[default]
  Loading,
  /// Landscape is ready, simulation not started.
  Ready,
  Running,
  Paused,
  /// Bootstrap failed; nothing will run.
  Failed,
}

/// Controls whether the session simulation is running.
///
/// Commands that do not apply to the current state are ignored and return
/// false.
#[derive(Resource, Debug, Default)]
pub struct SessionControl {
  state: SessionState,
  autostart: bool,
  restart_requested: bool,
  failure: Option<String>,
}

impl SessionControl {
  /// `autostart` starts the simulation as soon as bootstrap succeeds.
  pub fn new(autostart: bool) -> Self {
    Self {
      autostart,
      ..Default::default()
    }
  }

  pub fn state(&self) -> SessionState {
    self.state
  }

  pub fn is_running(&self) -> bool {
    self.state == SessionState::Running
  }

  /// Reason the bootstrap failed.
  pub fn failure(&self) -> Option<&str> {
    self.failure.as_deref()
  }

  pub fn start(&mut self) -> bool {
    self.transition(&[SessionState::Ready, SessionState::Paused], SessionState::Running)
  }

  pub fn pause(&mut self) -> bool {
    self.transition(&[SessionState::Running], SessionState::Paused)
  }

  pub fn resume(&mut self) -> bool {
    self.transition(&[SessionState::Paused], SessionState::Running)
  }

  pub fn toggle(&mut self) -> bool {
    self.pause() || self.resume()
  }

  /// Requests a fresh map from the same seed and an empty object table.
  /// The running state is kept.
  pub fn restart(&mut self) -> bool {
    if matches!(self.state, SessionState::Loading | SessionState::Failed) {
      return false;
    }
    self.restart_requested = true;
    true
  }

  pub(crate) fn take_restart(&mut self) -> bool {
    std::mem::take(&mut self.restart_requested)
  }

  pub(crate) fn ready(&mut self) {
    self.state = if self.autostart {
      SessionState::Running
    } else {
      SessionState::Ready
    };
  }

  pub(crate) fn fail(&mut self, reason: String) {
    self.state = SessionState::Failed;
    self.failure = Some(reason);
  }

  fn transition(&mut self, from: &[SessionState], to: SessionState) -> bool {
    if from.contains(&self.state) {
      self.state = to;
      true
    } else {
      false
    }
  }
}

/// Loads the configured archive map, or creates the map when there is no
/// archive or it cannot be read.
pub fn load_or_create_map(
  config: &SessionConfig,
  textures: &TextureMap,
) -> SimResult<(MapBuffer, MapSource)> {
  let creator = config.creator();

  if let Some(archive) = &config.archive {
    let loaded = MapArchive::open(&archive.path)
      .and_then(|a| creator.load(&a, &archive.entry, textures));
    match loaded {
      Ok(loaded) => {
        if loaded.substitutions > 0 {
          warn!(
            "Map {} had {} unknown pixels replaced with sky",
            archive.path.display(),
            loaded.substitutions
          );
        }
        return Ok((loaded.buffer, MapSource::Archive));
      }
      Err(e) => warn!(
        "Could not load map {:?} from {}: {}; creating it instead",
        archive.entry,
        archive.path.display(),
        e
      ),
    }
  }

  let map = creator
    .create(&config.landscape, textures, config.create_options())?
    .into_flat();

  if let Some(archive) = config.archive.as_ref().filter(|a| a.save_created) {
    let mut stored = MapArchive::open(&archive.path).unwrap_or_else(|_| MapArchive::new(config.seed));
    let saved = creator
      .save(&mut stored, &archive.entry, &map)
      .and_then(|_| stored.save(&archive.path));
    if let Err(e) = saved {
      warn!("Could not save created map to {}: {}", archive.path.display(), e);
    }
  }
  Ok((map, MapSource::Created))
}

/// A session ready to run.
pub struct Bootstrap {
  pub simulation: Simulation,
  pub textures: TextureMap,
  pub source: MapSource,
}

/// Builds the registries, the landscape and an empty simulation.
pub fn bootstrap(config: &SessionConfig) -> SimResult<Bootstrap> {
  let textures = config.texture_map()?;
  let classes = config.classes()?;
  let (map, source) = load_or_create_map(config, &textures)?;
  info!(
    "Session bootstrapped: {}x{} map ({:?}), {} classes",
    map.width(),
    map.height(),
    source,
    classes.len()
  );

  let mut simulation = Simulation::new(classes);
  simulation.set_landscape(Landscape::new(map, textures.clone()).with_zoom(config.zoom));
  Ok(Bootstrap {
    simulation,
    textures,
    source,
  })
}
