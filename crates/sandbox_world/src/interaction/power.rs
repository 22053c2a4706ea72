//! Fuel-burning power generation.

use serde::{Deserialize, Serialize};

use super::InteractionRequest;
use crate::error::SimResult;
use crate::scheduler::{IDLE, ObjectId, ObjectState, World};

/// Where ejected contents land, relative to the generator.
const EJECT_OFFSET: (i32, i32) = (-53, 21);
const EJECT_SPEED: (i32, i32) = (-2, -1);

fn default_capacity() -> u32 {
  500
}

fn default_power_per_cycle() -> u32 {
  50
}

fn default_fuel_per_cycle() -> u32 {
  1
}

fn default_check_interval() -> u32 {
  30
}

fn default_work_action() -> String {
  "Work".to_string()
}

/// A generator that burns fuel items from its contents.
///
/// While idle and below capacity it looks at its contents: stored fuel
/// starts a work cycle, otherwise the first fuel item is absorbed, otherwise
/// the first non-fuel item is thrown out. Each finished work cycle adds
/// power and burns fuel; it goes idle when full or out of fuel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerGenerator {
  #[serde(default = "default_capacity")]
  pub capacity: u32,
  #[serde(default = "default_power_per_cycle")]
  pub power_per_cycle: u32,
  #[serde(default = "default_fuel_per_cycle")]
  pub fuel_per_cycle: u32,
  /// Ticks between contents checks.
  #[serde(default = "default_check_interval")]
  pub check_interval: u32,
  #[serde(default = "default_work_action")]
  pub work_action: String,
}

impl Default for PowerGenerator {
  fn default() -> Self {
    Self {
      capacity: default_capacity(),
      power_per_cycle: default_power_per_cycle(),
      fuel_per_cycle: default_fuel_per_cycle(),
      check_interval: default_check_interval(),
      work_action: default_work_action(),
    }
  }
}

impl PowerGenerator {
  fn work(&self, engine: ObjectId) -> InteractionRequest {
    InteractionRequest::SetAction {
      object: engine,
      action: self.work_action.clone(),
    }
  }

  /// Decides what an idle generator does with its contents.
  pub fn contents_check(&self, world: &World, engine: ObjectId) -> SimResult<Vec<InteractionRequest>> {
    let state = world.objects.get(engine)?;
    self.check_state(world, engine, state)
  }

  /// Contents check against a projected generator state.
  fn check_state(
    &self,
    world: &World,
    engine: ObjectId,
    state: &ObjectState,
  ) -> SimResult<Vec<InteractionRequest>> {
    if !state.is_idle() || state.power >= self.capacity {
      return Ok(Vec::new());
    }
    if state.fuel > 0 {
      return Ok(vec![self.work(engine)]);
    }

    let contents = world.contents(engine);
    for item in &contents {
      let item_state = world.objects.get(*item)?;
      let class = world.classes.get(&item_state.class)?;
      if let Some(fuel) = &class.capabilities.fuel {
        let amount = fuel.fuel_amount(item_state, false);
        return Ok(vec![
          InteractionRequest::AddFuel {
            object: engine,
            amount: amount.min(i32::MAX as u32) as i32,
          },
          InteractionRequest::RemoveObject(*item),
          self.work(engine),
        ]);
      }
    }
    if let Some(item) = contents.first() {
      return Ok(vec![InteractionRequest::Eject {
        item: *item,
        dx: EJECT_OFFSET.0,
        dy: EJECT_OFFSET.1,
        xdir: EJECT_SPEED.0,
        ydir: EJECT_SPEED.1,
      }]);
    }
    Ok(Vec::new())
  }

  /// End of a work cycle: add power, burn fuel, and decide whether to keep
  /// working.
  pub fn consume_fuel(&self, world: &World, engine: ObjectId) -> SimResult<Vec<InteractionRequest>> {
    let state = world.objects.get(engine)?;
    let idle = InteractionRequest::SetAction {
      object: engine,
      action: IDLE.to_string(),
    };
    if state.power >= self.capacity {
      return Ok(vec![idle]);
    }

    let burned = state.fuel.min(self.fuel_per_cycle);
    let mut requests = vec![InteractionRequest::AddPower {
      object: engine,
      amount: self.power_per_cycle.min(i32::MAX as u32) as i32,
    }];
    if burned > 0 {
      requests.push(InteractionRequest::AddFuel {
        object: engine,
        amount: -(burned as i32),
      });
    }

    if state.fuel - burned == 0 {
      // Out of fuel: go idle, then check contents against the state the
      // requests above will produce.
      let mut projected = state.clone();
      projected.power = projected.power.saturating_add(self.power_per_cycle);
      projected.fuel = 0;
      projected.action = None;
      requests.push(idle);
      requests.extend(self.check_state(world, engine, &projected)?);
    }
    Ok(requests)
  }
}
