//! Command line of the headless sandbox runner.

use std::path::PathBuf;

use clap::Parser;
use sandbox_world::{SessionConfig, SimResult};

/// Generates a landscape and runs the sandbox simulation headless.
#[derive(Parser, Debug, Clone)]
#[command(name = "sandbox", version, about)]
pub struct Cli {
  /// Session config; missing files fall back to the built-in defaults.
  #[arg(long, default_value = "assets/config/session.toml")]
  pub config: PathBuf,

  /// Override the map seed.
  #[arg(long)]
  pub seed: Option<u64>,

  /// Override the player count.
  #[arg(long)]
  pub players: Option<u32>,

  /// Simulation ticks to run before exiting.
  #[arg(long, default_value_t = 720)]
  pub ticks: u64,

  /// Generate background, midground and foreground planes.
  #[arg(long)]
  pub layered: bool,

  /// Ignore the configured archive and always create the map.
  #[arg(long)]
  pub no_archive: bool,

  /// Write the final map into this archive.
  #[arg(long)]
  pub save_map: Option<PathBuf>,

  /// Write a TOML run summary to this file.
  #[arg(long)]
  pub report: Option<PathBuf>,

  /// Skip placing the demo objects.
  #[arg(long)]
  pub empty: bool,
}

impl Cli {
  /// Loads the session config and applies the command line overrides.
  pub fn session_config(&self) -> SimResult<SessionConfig> {
    let config = if self.config.exists() {
      SessionConfig::load(&self.config)?
    } else {
      SessionConfig::default()
    };
    Ok(self.apply(config))
  }

  fn apply(&self, mut config: SessionConfig) -> SessionConfig {
    if let Some(seed) = self.seed {
      config.seed = seed;
    }
    if let Some(players) = self.players {
      config.players = players.max(1);
    }
    config.layered |= self.layered;
    if self.no_archive {
      config.archive = None;
    }
    config
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn overrides_win_over_the_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("session.toml");
    std::fs::write(
      &path,
      "seed = 3\nplayers = 2\n[archive]\npath = \"maps/a.sbx\"\n",
    )
    .unwrap();

    let cli = Cli::parse_from([
      "sandbox",
      "--config",
      path.to_str().unwrap(),
      "--seed",
      "42",
      "--players",
      "0",
      "--no-archive",
    ]);
    let config = cli.session_config().unwrap();
    assert_eq!(config.seed, 42);
    assert_eq!(config.players, 1);
    assert!(config.archive.is_none());
    assert_eq!(cli.ticks, 720);
  }

  #[test]
  fn missing_config_uses_defaults() {
    let cli = Cli::parse_from(["sandbox", "--config", "does/not/exist.toml", "--layered"]);
    let config = cli.session_config().unwrap();
    assert!(config.layered);
    assert_eq!(config.landscape, SessionConfig::default().landscape);
  }

  #[test]
  fn broken_config_is_reported() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "players = \"two\"").unwrap();
    let cli = Cli::parse_from(["sandbox", "--config", path.to_str().unwrap()]);
    assert!(cli.session_config().is_err());
  }
}
