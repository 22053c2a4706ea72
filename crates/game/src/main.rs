mod cli;
mod demo;

use std::time::Duration;

use bevy::app::ScheduleRunnerPlugin;
use bevy::log::{Level, LogPlugin};
use bevy::prelude::*;
use clap::Parser;
use sandbox_world::SandboxWorldPlugin;

use crate::cli::Cli;
use crate::demo::{DemoPlugin, DemoRun};

fn main() -> AppExit {
  let cli = Cli::parse();

  let config = match cli.session_config() {
    Ok(config) => config,
    Err(e) => {
      eprintln!("sandbox: {}: {}", cli.config.display(), e);
      return AppExit::from_code(2);
    }
  };

  // One frame per simulation tick.
  let frame = Duration::from_secs_f64(1.0 / config.tick_hz.max(1.0));

  let mut app = App::new();
  app
    .add_plugins(MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(frame)))
    .add_plugins(LogPlugin {
      level: Level::INFO,
      filter: "wgpu=error,sandbox_world=info".to_string(),
      ..default()
    })
    .add_plugins(SandboxWorldPlugin::new(config))
    .add_plugins(DemoPlugin {
      run: DemoRun {
        ticks: cli.ticks,
        spawn_scene: !cli.empty,
        save_map: cli.save_map.clone(),
        report: cli.report.clone(),
      },
    });

  app.run()
}
