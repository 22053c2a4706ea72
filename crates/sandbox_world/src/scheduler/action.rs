//! Per-class action tables.
//!
//! An action runs for `length` phases of `delay` ticks each. At the end of
//! the last phase the end call fires and the object moves on to
//! `next_action`, which may be the action itself.

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// Action name that clears the current action.
pub const IDLE: &str = "Idle";

fn one() -> u32 {
  1
}

/// One named action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDef {
  pub name: String,
  /// Number of phases.
  #[serde(default = "one")]
  pub length: u32,
  /// Ticks per phase; 0 holds the action on its first phase.
  #[serde(default = "one")]
  pub delay: u32,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub next_action: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub start_call: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub phase_call: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub end_call: Option<String>,
}

impl ActionDef {
  pub fn new(name: impl Into<String>, length: u32, delay: u32) -> Self {
    Self {
      name: name.into(),
      length,
      delay,
      next_action: None,
      start_call: None,
      phase_call: None,
      end_call: None,
    }
  }

  pub fn next(mut self, action: impl Into<String>) -> Self {
    self.next_action = Some(action.into());
    self
  }

  /// Loops back into itself at the end of every cycle.
  pub fn looping(self) -> Self {
    let name = self.name.clone();
    self.next(name)
  }

  pub fn on_start(mut self, callback: impl Into<String>) -> Self {
    self.start_call = Some(callback.into());
    self
  }

  pub fn on_phase(mut self, callback: impl Into<String>) -> Self {
    self.phase_call = Some(callback.into());
    self
  }

  pub fn on_end(mut self, callback: impl Into<String>) -> Self {
    self.end_call = Some(callback.into());
    self
  }

  /// Next action after the end call, `None` for idle.
  pub fn successor(&self) -> Option<&str> {
    self.next_action.as_deref().filter(|n| *n != IDLE)
  }
}

/// Action table of one object class.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActMap {
  #[serde(default)]
  pub actions: Vec<ActionDef>,
}

impl ActMap {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with(mut self, action: ActionDef) -> Self {
    self.actions.push(action);
    self
  }

  pub fn get(&self, name: &str) -> Option<&ActionDef> {
    self.actions.iter().find(|a| a.name == name)
  }

  pub fn contains(&self, name: &str) -> bool {
    self.get(name).is_some()
  }

  /// Checks that every action has phases, names are unique and every
  /// `next_action` exists.
  pub fn validate(&self, class: &str) -> SimResult<()> {
    let invalid = |action: &str| SimError::InvalidActionState {
      class: class.to_string(),
      action: action.to_string(),
    };
    for (i, action) in self.actions.iter().enumerate() {
      if action.name.is_empty() || action.name == IDLE || action.length == 0 {
        return Err(invalid(&action.name));
      }
      if self.actions[..i].iter().any(|a| a.name == action.name) {
        return Err(invalid(&action.name));
      }
      if let Some(next) = action.successor() {
        if !self.contains(next) {
          return Err(invalid(next));
        }
      }
    }
    Ok(())
  }
}

/// Running action of one object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionState {
  pub name: String,
  pub phase: u32,
  /// Ticks spent in the current phase.
  pub step: u32,
}

impl ActionState {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      phase: 0,
      step: 0,
    }
  }
}

/// What a single action step produced.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct StepOutcome {
  pub phase_call: Option<String>,
  pub end_call: Option<String>,
  /// The cycle completed; transition unless the end call changed the action.
  pub finished: bool,
}

impl ActionState {
  /// Advances one tick under `def`.
  pub(crate) fn advance(&mut self, def: &ActionDef) -> StepOutcome {
    let mut outcome = StepOutcome::default();
    if def.delay == 0 {
      return outcome;
    }
    self.step += 1;
    if self.step < def.delay {
      return outcome;
    }
    self.step = 0;
    self.phase += 1;
    if self.phase < def.length {
      outcome.phase_call = def.phase_call.clone();
    } else {
      outcome.end_call = def.end_call.clone();
      outcome.finished = true;
    }
    outcome
  }
}
