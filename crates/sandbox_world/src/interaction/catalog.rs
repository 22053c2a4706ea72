//! Stock object classes: a collector, some loose items, fuel and a steam
//! engine.

use bevy::log::debug;

use super::{Capabilities, ConFuel, Hittable, InventoryRules, Item, PowerGenerator};
use crate::error::SimResult;
use crate::scheduler::builtin::{SCHEDULE_CALL, ScheduleCall};
use crate::scheduler::{ActionDef, ClassRegistry, Context, INITIALIZE, ObjectClass, ObjectId};

pub const CLONK: &str = "Clonk";
pub const ROCK: &str = "Rock";
pub const COAL: &str = "Coal";
pub const WOOD: &str = "Wood";
pub const STEAM_ENGINE: &str = "SteamEngine";

pub const CONTENTS_CHECK: &str = "ContentsCheck";
pub const CONSUME_FUEL: &str = "ConsumeFuel";

/// Ticks per phase of the engine's work action.
const WORK_DELAY: u32 = 2;
const WORK_LENGTH: u32 = 20;

/// Hits harder than `threshold` add to the `damage` counter.
struct Bruise {
  threshold: i32,
}

impl Hittable for Bruise {
  fn hit(&self, ctx: &mut Context, object: ObjectId, speed: i32) -> SimResult<()> {
    let speed = speed.abs();
    if speed > self.threshold {
      let damage = ctx
        .object_mut(object)?
        .bump_counter("damage", ((speed - self.threshold) / 10 + 1) as i64);
      debug!("{} bruised, damage {}", object, damage);
    }
    Ok(())
  }
}

/// The steam engine class driven by `generator`.
pub fn steam_engine(generator: &PowerGenerator) -> ObjectClass {
  let check = generator.clone();
  let consume = generator.clone();
  let interval = generator.check_interval.max(1);

  ObjectClass::new(STEAM_ENGINE)
    .with_action(
      ActionDef::new(&generator.work_action, WORK_LENGTH, WORK_DELAY)
        .looping()
        .on_end(CONSUME_FUEL),
    )
    .with_callback(INITIALIZE, move |ctx| {
      let host = ctx.host();
      ctx.add_effect(
        SCHEDULE_CALL,
        host,
        1,
        interval,
        ScheduleCall {
          callback: CONTENTS_CHECK.to_string(),
          repeats: None,
        },
      );
      Ok(())
    })
    .with_callback(CONTENTS_CHECK, move |ctx| {
      let Some(engine) = ctx.host() else {
        return Ok(());
      };
      for request in check.contents_check(ctx.world, engine)? {
        ctx.request(request);
      }
      Ok(())
    })
    .with_callback(CONSUME_FUEL, move |ctx| {
      let Some(engine) = ctx.host() else {
        return Ok(());
      };
      for request in consume.consume_fuel(ctx.world, engine)? {
        ctx.request(request);
      }
      Ok(())
    })
}

/// Registry with every stock class.
pub fn classes(rules: &InventoryRules, generator: &PowerGenerator) -> SimResult<ClassRegistry> {
  let mut classes = ClassRegistry::new();
  classes.register(
    ObjectClass::new(CLONK).with_capabilities(
      Capabilities::new()
        .collect_policy(rules.clone())
        .hittable(Bruise { threshold: 30 }),
    ),
  )?;
  classes.register(
    ObjectClass::new(ROCK).with_capabilities(Capabilities::new().collectible(Item::default())),
  )?;
  classes.register(
    ObjectClass::new(COAL).with_capabilities(
      Capabilities::new()
        .collectible(Item::default())
        .fuel(ConFuel::COAL),
    ),
  )?;
  classes.register(
    ObjectClass::new(WOOD).with_capabilities(
      Capabilities::new()
        .collectible(Item { heavy: true })
        .fuel(ConFuel::WOOD),
    ),
  )?;
  classes.register(steam_engine(generator))?;
  Ok(classes)
}
