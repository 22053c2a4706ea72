//! Bevy plugin wiring the session into an app.

use bevy::prelude::*;

use crate::config::SessionConfig;
use crate::landscape::Landscape;
use crate::session::{SessionControl, bootstrap, load_or_create_map};
use crate::simulation::Simulation;

/// System sets of the sandbox session, in execution order within a frame.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum SandboxSet {
  /// Builds the landscape and simulation (Startup).
  Bootstrap,
  /// Applies session commands such as restart (Update).
  Control,
  /// Advances the simulation (FixedUpdate).
  Tick,
}

/// Generates or loads the landscape at startup and ticks the simulation on
/// the fixed timestep while the session runs.
pub struct SandboxWorldPlugin {
  pub config: SessionConfig,
  /// Start ticking right after bootstrap.
  pub autostart: bool,
}

impl Default for SandboxWorldPlugin {
  fn default() -> Self {
    Self::new(SessionConfig::default())
  }
}

impl SandboxWorldPlugin {
  pub fn new(config: SessionConfig) -> Self {
    Self {
      config,
      autostart: true,
    }
  }

  /// Bootstrap into the ready state and wait for [`SessionControl::start`].
  pub fn paused(mut self) -> Self {
    self.autostart = false;
    self
  }
}

impl Plugin for SandboxWorldPlugin {
  fn build(&self, app: &mut App) {
    app
      .insert_resource(self.config.clone())
      .insert_resource(SessionControl::new(self.autostart))
      .insert_resource(Time::<Fixed>::from_hz(self.config.tick_hz))
      .add_systems(Startup, bootstrap_session.in_set(SandboxSet::Bootstrap))
      .add_systems(Update, handle_restart.in_set(SandboxSet::Control))
      .add_systems(
        FixedUpdate,
        tick_simulation
          .in_set(SandboxSet::Tick)
          .run_if(session_running),
      );
  }
}

fn bootstrap_session(
  mut commands: Commands,
  config: Res<SessionConfig>,
  mut control: ResMut<SessionControl>,
) {
  match bootstrap(&config) {
    Ok(session) => {
      commands.insert_resource(session.textures);
      commands.insert_resource(session.simulation);
      control.ready();
    }
    Err(e) => {
      error!("Session bootstrap failed: {}", e);
      control.fail(e.to_string());
    }
  }
}

fn handle_restart(
  config: Res<SessionConfig>,
  mut control: ResMut<SessionControl>,
  simulation: Option<ResMut<Simulation>>,
) {
  if !control.take_restart() {
    return;
  }
  let Some(mut simulation) = simulation else {
    return;
  };
  let Some(textures) = simulation.landscape().map(|l| l.textures().clone()) else {
    return;
  };
  match load_or_create_map(&config, &textures) {
    Ok((map, source)) => {
      simulation.clear_objects();
      simulation.set_landscape(Landscape::new(map, textures).with_zoom(config.zoom));
      info!("Session restarted ({:?} map)", source);
    }
    Err(e) => warn!("Restart failed, keeping the current session: {}", e),
  }
}

fn session_running(control: Res<SessionControl>, simulation: Option<Res<Simulation>>) -> bool {
  control.is_running() && simulation.is_some()
}

fn tick_simulation(mut simulation: ResMut<Simulation>) {
  simulation.tick();
}
