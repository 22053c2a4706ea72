//! Scheduler behavior through the public simulation API.

use std::any::Any;
use std::sync::{Arc, Mutex};

use sandbox_world::interaction::catalog;
use sandbox_world::interaction::{ConFuel, FuelSource};
use sandbox_world::scheduler::builtin::FIRE;
use sandbox_world::scheduler::{ActionDef, Context, ObjectFlags, SCHEDULE_CALL};
use sandbox_world::{
  ClassRegistry, EffectControl, EffectHandler, InteractionRequest, Landscape, MapBuffer, MapPixel,
  ObjectClass, ObjectState, PowerGenerator, SimResult, Simulation, TextureMap, resolve_contact,
};

type Log = Arc<Mutex<Vec<&'static str>>>;

struct Named {
  name: &'static str,
  log: Log,
}

impl EffectHandler for Named {
  fn timer(&mut self, _ctx: &mut Context, _time: u64) -> SimResult<EffectControl> {
    self.log.lock().unwrap().push(self.name);
    Ok(EffectControl::Continue)
  }

  fn as_any(&self) -> &dyn Any {
    self
  }

  fn into_any(self: Box<Self>) -> Box<dyn Any> {
    self
  }
}

fn pump_classes() -> ClassRegistry {
  let mut classes = ClassRegistry::new();
  classes
    .register(
      ObjectClass::new("Pump")
        .with_action(ActionDef::new("Pump", 20, 1).looping().on_end("Stroke"))
        .with_action(ActionDef::new("Rest", 1, 0))
        .with_callback("Stroke", |ctx| {
          if let Some(state) = ctx.host_state_mut() {
            state.bump_counter("strokes", 1);
          }
          Ok(())
        }),
    )
    .unwrap();
  classes
}

#[test]
fn equal_priorities_keep_insertion_order() {
  let mut sim = Simulation::new(pump_classes());
  let pump = sim.spawn(ObjectState::new("Pump")).unwrap();
  let log = Log::default();
  for (name, priority) in [("A", 1), ("B", 1), ("C", 0)] {
    sim
      .add_effect(name, Some(pump), priority, 1, Named {
        name,
        log: log.clone(),
      })
      .unwrap();
  }

  sim.tick();
  sim.tick();
  assert_eq!(*log.lock().unwrap(), ["C", "A", "B", "C", "A", "B"]);
}

#[test]
fn self_looping_action_ends_every_cycle_until_changed() {
  let mut sim = Simulation::new(pump_classes());
  let pump = sim.spawn(ObjectState::new("Pump")).unwrap();
  sim.set_action(pump, "Pump").unwrap();

  let strokes = |sim: &Simulation| sim.world().objects.get(pump).unwrap().counter("strokes");
  for tick in 1..=200 {
    sim.tick();
    assert_eq!(strokes(&sim), tick / 20, "after tick {}", tick);
  }
  assert_eq!(sim.world().objects.get(pump).unwrap().action(), Some("Pump"));

  sim.set_action(pump, "Rest").unwrap();
  for _ in 0..100 {
    sim.tick();
  }
  assert_eq!(strokes(&sim), 10);
  assert_eq!(sim.world().objects.get(pump).unwrap().action(), Some("Rest"));
}

fn engine_sim() -> (Simulation, PowerGenerator) {
  let generator = PowerGenerator::default();
  let classes = catalog::classes(&Default::default(), &generator).unwrap();
  (Simulation::new(classes), generator)
}

#[test]
fn steam_engine_burns_coal_until_full() {
  let (mut sim, generator) = engine_sim();
  let engine = sim
    .spawn(ObjectState::new(catalog::STEAM_ENGINE).at(100, 50))
    .unwrap();
  let coal = sim.spawn(ObjectState::new(catalog::COAL)).unwrap();
  sim.apply([InteractionRequest::Enter {
    item: coal,
    container: engine,
  }]);
  assert_eq!(sim.world().contents(engine), [coal]);
  assert_eq!(sim.scheduler().effect_count(Some(engine), SCHEDULE_CALL), 1);

  for _ in 0..generator.check_interval {
    sim.tick();
  }
  let state = sim.world().objects.get(engine).unwrap();
  assert_eq!(state.fuel, 100);
  assert_eq!(state.action(), Some("Work"));
  assert!(!sim.world().objects.is_alive(coal));

  for _ in 0..1000 {
    sim.tick();
  }
  let state = sim.world().objects.get(engine).unwrap();
  assert_eq!(state.power, generator.capacity);
  assert_eq!(state.fuel, 90);
  assert!(state.is_idle());
}

#[test]
fn steam_engine_ejects_rocks() {
  let (mut sim, generator) = engine_sim();
  let engine = sim
    .spawn(ObjectState::new(catalog::STEAM_ENGINE).at(100, 50))
    .unwrap();
  let rock = sim.spawn(ObjectState::new(catalog::ROCK)).unwrap();
  sim.apply([InteractionRequest::Enter {
    item: rock,
    container: engine,
  }]);

  for _ in 0..generator.check_interval {
    sim.tick();
  }
  assert!(sim.world().contents(engine).is_empty());
  let rock = sim.world().objects.get(rock).unwrap();
  assert_eq!(rock.container, None);
  assert_eq!((rock.x, rock.y), (47, 71));
  assert!(sim.world().objects.get(engine).unwrap().is_idle());
}

#[test]
fn wood_is_burned_when_decided_outside_a_tick() {
  let (mut sim, generator) = engine_sim();
  let engine = sim.spawn(ObjectState::new(catalog::STEAM_ENGINE)).unwrap();
  let wood = sim.spawn(ObjectState::new(catalog::WOOD).with_con(40)).unwrap();
  sim.apply([InteractionRequest::Enter {
    item: wood,
    container: engine,
  }]);
  let wood_state = sim.world().objects.get(wood).unwrap();
  assert_eq!(ConFuel::WOOD.fuel_amount(wood_state, true), 20);
  assert_eq!(ConFuel::WOOD.fuel_amount(wood_state, false), 50);

  let decided = generator.contents_check(sim.world(), engine).unwrap();
  sim.apply(decided);
  let state = sim.world().objects.get(engine).unwrap();
  assert_eq!(state.fuel, 50);
  assert_eq!(state.action(), Some("Work"));
  assert!(!sim.world().objects.is_alive(wood));
}

#[test]
fn lava_ignites_and_water_extinguishes() {
  let mut textures = TextureMap::default();
  let lava = textures.register("Lava").unwrap();
  let water = textures.register("Water").unwrap();
  let mut map = MapBuffer::new(8, 8);
  map.fill(MapPixel::from(lava));

  let (mut sim, _) = engine_sim();
  sim.set_landscape(Landscape::new(map, textures));
  let clonk = sim.spawn(ObjectState::new(catalog::CLONK)).unwrap();

  let ignite = resolve_contact(sim.world(), clonk, lava, 0).unwrap();
  assert_eq!(
    ignite,
    [InteractionRequest::Incinerate {
      object: clonk,
      strength: 5
    }]
  );
  sim.apply(ignite);
  assert_eq!(sim.scheduler().effect_count(Some(clonk), FIRE), 1);
  assert!(
    sim
      .world()
      .objects
      .get(clonk)
      .unwrap()
      .flags
      .contains(ObjectFlags::ON_FIRE)
  );

  let douse = resolve_contact(sim.world(), clonk, water, 0).unwrap();
  sim.apply(douse);
  assert_eq!(sim.scheduler().effect_count(Some(clonk), FIRE), 0);
  assert!(
    !sim
      .world()
      .objects
      .get(clonk)
      .unwrap()
      .flags
      .contains(ObjectFlags::ON_FIRE)
  );
}
