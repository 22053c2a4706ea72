//! Effect and action scheduler.
//!
//! Each [`Scheduler::tick`] runs global effects first, then every live
//! object in table order: its effects by ascending priority (ties in
//! insertion order), then one step of its current action.
//!
//! Callbacks never mutate scheduler state directly. Structural changes
//! (actions, effects, object removal) are queued as [`Request`]s and applied
//! after the callback returns. Effects are removed flag-and-sweep: the stop
//! callback runs once the queue is drained, and removing an effect that is
//! already gone is a no-op.

pub mod action;
pub mod builtin;
pub mod class;
pub mod context;
pub mod effect;
pub mod object;
pub mod world;

use std::collections::{HashSet, VecDeque};

use bevy::log::{debug, warn};

pub use action::{ActMap, ActionDef, ActionState, IDLE};
pub use builtin::{FADE_OUT, FIRE, FadeOut, Fire, SCHEDULE_CALL, ScheduleCall};
pub use class::{ClassCallback, ClassRegistry, INITIALIZE, ObjectClass};
pub use context::{Context, Request};
pub use effect::{
  Admission, Effect, EffectControl, EffectHandler, EffectId, EffectTable, StopReason,
};
pub use object::{ObjectFlags, ObjectId, ObjectState, ObjectTable};
pub use world::World;

use crate::error::{SimError, SimResult};
use crate::interaction;

/// Requests applied per flush before the rest are dropped as a runaway
/// cascade.
pub const MAX_CASCADE: usize = 4096;

/// Drives effects and actions once per tick.
#[derive(Default)]
pub struct Scheduler {
  effects: EffectTable,
  queue: VecDeque<Request>,
  in_tick: bool,
  flushing: bool,
  /// `(class, callback)` pairs already reported as missing.
  warned: HashSet<(String, String)>,
}

impl Scheduler {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn effects(&self) -> &EffectTable {
    &self.effects
  }

  /// Typed view of an effect's handler.
  pub fn effect_handler<T: EffectHandler>(&self, id: EffectId) -> Option<&T> {
    self.effects.handler(id)
  }

  /// First live effect named `name` on `host`.
  pub fn get_effect(&self, host: Option<ObjectId>, name: &str) -> Option<EffectId> {
    self.effects.find(host, name)
  }

  pub fn effect_count(&self, host: Option<ObjectId>, name: &str) -> usize {
    self.effects.count(host, name)
  }

  /// Drops every effect without stop callbacks.
  pub fn clear(&mut self) {
    self.effects.clear();
    self.queue.clear();
  }

  /// Spawns an object and runs its class's `Initialize` callback if any.
  pub fn spawn(&mut self, world: &mut World, state: ObjectState) -> SimResult<ObjectId> {
    let id = world.insert(state)?;
    let class = world.classes.get(&world.objects.get(id)?.class)?;
    if class.callback(INITIALIZE).is_some() {
      self.invoke(world, id, &class, INITIALIZE);
      self.flush(world);
    }
    Ok(id)
  }

  /// Adds an effect.
  ///
  /// Existing effects of the host are asked in order whether they admit the
  /// newcomer; a rejection drops it and a merge folds it into the existing
  /// effect. Both return `Ok(None)`. Effects added while a tick is running
  /// first fire on the next tick.
  pub fn add_effect(
    &mut self,
    world: &mut World,
    name: &str,
    host: Option<ObjectId>,
    priority: i32,
    interval: u32,
    handler: Box<dyn EffectHandler>,
  ) -> SimResult<Option<EffectId>> {
    let result = self.add_effect_inner(world, name, host, priority, interval, handler);
    self.flush(world);
    result
  }

  fn add_effect_inner(
    &mut self,
    world: &mut World,
    name: &str,
    host: Option<ObjectId>,
    priority: i32,
    interval: u32,
    handler: Box<dyn EffectHandler>,
  ) -> SimResult<Option<EffectId>> {
    if let Some(object) = host {
      world.objects.get(object)?;
    }

    // Admission and merge run in one callback, so the newcomer is only
    // consumed by a handler that actually absorbs it.
    let mut incoming = Some(handler);
    for existing in self.effects.on_host(host) {
      if !self.effects.get(existing).is_some_and(Effect::is_live) {
        continue;
      }
      let verdict = self.run_handler(world, existing, |h, ctx| {
        let admission = h.admit(ctx, name);
        let merged = match (admission, incoming.take()) {
          (Admission::Merge, Some(newcomer)) => Some(h.merge(ctx, newcomer)),
          (_, newcomer) => {
            incoming = newcomer;
            None
          }
        };
        (admission, merged)
      });
      match verdict {
        None => debug!("Effect {} is busy; admitting {:?} without it", existing, name),
        Some((Admission::Accept, _)) => {}
        Some((Admission::Reject, _)) => {
          debug!("Effect {:?} rejected by {}", name, existing);
          return Ok(None);
        }
        Some((Admission::Merge, merged)) => {
          if let Some(Err(e)) = merged {
            warn!("Merging effect {:?} into {} failed: {}", name, existing, e);
          }
          return Ok(None);
        }
      }
    }
    let Some(handler) = incoming else {
      return Ok(None);
    };

    let id = self.effects.insert(Effect {
      name: name.to_string(),
      host,
      priority,
      interval,
      counter: 0,
      seq: 0,
      started_at: world.tick,
      armed: !self.in_tick,
      stopping: None,
      handler: Some(handler),
    });

    match self.run_handler(world, id, |h, ctx| h.start(ctx)) {
      Some(Ok(EffectControl::Continue)) | None => Ok(Some(id)),
      Some(Ok(EffectControl::Remove)) => {
        self.effects.remove(id);
        Ok(None)
      }
      Some(Err(e)) => {
        self.effects.remove(id);
        Err(e)
      }
    }
  }

  /// Removes an effect. Unknown or already removed effects are ignored.
  pub fn remove_effect(&mut self, world: &mut World, id: EffectId) {
    self.effects.flag(id, StopReason::Removed);
    self.flush(world);
  }

  /// Removes the first live effect named `name` on `host`.
  pub fn remove_named(&mut self, world: &mut World, host: Option<ObjectId>, name: &str) -> bool {
    let removed = match self.effects.find(host, name) {
      Some(id) => self.effects.flag(id, StopReason::Removed),
      None => false,
    };
    self.flush(world);
    removed
  }

  /// Switches an object's action; [`IDLE`] clears it.
  pub fn set_action(&mut self, world: &mut World, object: ObjectId, action: &str) -> SimResult<()> {
    let result = self.switch_action(world, object, action);
    self.flush(world);
    result
  }

  /// Runs a named class callback on `object`.
  pub fn call(&mut self, world: &mut World, object: ObjectId, callback: &str) -> SimResult<()> {
    let class = world.classes.get(&world.objects.get(object)?.class)?;
    self.invoke(world, object, &class, callback);
    self.flush(world);
    Ok(())
  }

  /// Removes an object after stopping its effects. Contents stay behind at
  /// the object's position.
  pub fn remove_object(&mut self, world: &mut World, object: ObjectId) -> bool {
    let removed = self.remove_object_now(world, object);
    self.flush(world);
    removed
  }

  /// Applies externally produced requests.
  pub fn apply(&mut self, world: &mut World, requests: impl IntoIterator<Item = Request>) {
    self.queue.extend(requests);
    self.flush(world);
  }

  /// Advances the simulation by one tick.
  pub fn tick(&mut self, world: &mut World) {
    world.tick += 1;
    self.in_tick = true;

    for host in self.effects.hosts() {
      if let Some(object) = host {
        if !world.objects.is_alive(object) {
          for id in self.effects.on_host(host) {
            self.effects.flag(id, StopReason::HostRemoved);
          }
        }
      }
    }
    self.flush(world);

    self.run_effects(world, None);
    for object in world.objects.ids() {
      if !world.objects.is_alive(object) {
        continue;
      }
      self.run_effects(world, Some(object));
      if world.objects.is_alive(object) {
        self.step_action(world, object);
      }
    }

    self.in_tick = false;
    self.effects.arm_all();
    self.flush(world);
  }

  fn run_effects(&mut self, world: &mut World, host: Option<ObjectId>) {
    for id in self.effects.on_host(host) {
      if let Some(object) = host {
        if !world.objects.is_alive(object) {
          break;
        }
      }
      let Some(effect) = self.effects.get_mut(id) else {
        continue;
      };
      if !effect.is_live() || !effect.armed || effect.interval == 0 {
        continue;
      }
      effect.counter += 1;
      if effect.counter < effect.interval {
        continue;
      }
      effect.counter = 0;
      let time = world.tick - effect.started_at;

      match self.run_handler(world, id, |h, ctx| h.timer(ctx, time)) {
        Some(Ok(EffectControl::Remove)) => {
          self.effects.flag(id, StopReason::Finished);
        }
        Some(Err(e)) => {
          let name = self.effects.get(id).map_or("?", |e| e.name.as_str());
          warn!("Effect {:?} ({}) timer failed: {}", name, id, e);
        }
        Some(Ok(EffectControl::Continue)) | None => {}
      }
      self.flush(world);
    }
  }

  fn step_action(&mut self, world: &mut World, object: ObjectId) {
    let Ok(state) = world.objects.get(object) else {
      return;
    };
    let Some(action) = &state.action else {
      return;
    };
    let Ok(class) = world.classes.get(&state.class) else {
      return;
    };
    let epoch = state.action_epoch;
    let Some(def) = class.act_map.get(&action.name) else {
      warn!(
        "Object {} runs undefined action {:?} of class {}; going idle",
        object, action.name, class.name
      );
      if let Ok(state) = world.objects.get_mut(object) {
        state.action = None;
        state.action_epoch += 1;
      }
      return;
    };

    let outcome = match world.objects.get_mut(object) {
      Ok(state) => match state.action.as_mut() {
        Some(action) => action.advance(def),
        None => return,
      },
      Err(_) => return,
    };

    if let Some(call) = &outcome.phase_call {
      self.invoke(world, object, &class, call);
      self.flush(world);
    }
    if !outcome.finished {
      return;
    }
    if let Some(call) = &outcome.end_call {
      self.invoke(world, object, &class, call);
      self.flush(world);
    }

    // The end call may have switched the action itself.
    let unchanged = world
      .objects
      .try_get(object)
      .is_some_and(|s| s.action_epoch == epoch);
    if !unchanged {
      return;
    }
    match def.successor() {
      Some(next) if next == def.name => {
        if let Ok(state) = world.objects.get_mut(object) {
          state.action = Some(ActionState::new(next));
        }
      }
      Some(next) => {
        if let Err(e) = self.switch_action(world, object, next) {
          warn!("Action transition on {} failed: {}", object, e);
        }
        self.flush(world);
      }
      None => {
        if let Ok(state) = world.objects.get_mut(object) {
          state.action = None;
          state.action_epoch += 1;
        }
      }
    }
  }

  fn switch_action(&mut self, world: &mut World, object: ObjectId, action: &str) -> SimResult<()> {
    let class = world.classes.get(&world.objects.get(object)?.class)?;
    if action == IDLE || action.is_empty() {
      let state = world.objects.get_mut(object)?;
      state.action = None;
      state.action_epoch += 1;
      return Ok(());
    }
    let def = class
      .act_map
      .get(action)
      .ok_or_else(|| SimError::InvalidActionState {
        class: class.name.clone(),
        action: action.to_string(),
      })?;

    let state = world.objects.get_mut(object)?;
    state.action = Some(ActionState::new(action));
    state.action_epoch += 1;
    if let Some(call) = &def.start_call {
      self.invoke(world, object, &class, call);
    }
    Ok(())
  }

  /// Runs a class callback, queueing its requests. Missing callbacks are
  /// reported once per class and name.
  fn invoke(&mut self, world: &mut World, object: ObjectId, class: &ObjectClass, name: &str) {
    let Some(callback) = class.callback(name).cloned() else {
      if self.warned.insert((class.name.clone(), name.to_string())) {
        warn!("Class {} has no callback {:?}; ignoring", class.name, name);
      }
      return;
    };
    let mut ctx = Context::new(world, &self.effects, &mut self.queue, Some(object), None);
    if let Err(e) = callback(&mut ctx) {
      warn!("Callback {:?} on {} failed: {}", name, object, e);
    }
  }

  /// Runs `f` on an effect's handler with a context for its host.
  fn run_handler<R>(
    &mut self,
    world: &mut World,
    id: EffectId,
    f: impl FnOnce(&mut Box<dyn EffectHandler>, &mut Context) -> R,
  ) -> Option<R> {
    let effect = self.effects.get_mut(id)?;
    let host = effect.host;
    let mut handler = effect.handler.take()?;
    let result = {
      let mut ctx = Context::new(world, &self.effects, &mut self.queue, host, Some(id));
      f(&mut handler, &mut ctx)
    };
    if let Some(effect) = self.effects.get_mut(id) {
      effect.handler = Some(handler);
    }
    Some(result)
  }

  fn stop_effect(&mut self, world: &mut World, id: EffectId) {
    let Some(mut effect) = self.effects.remove(id) else {
      return;
    };
    let reason = effect.stopping.unwrap_or(StopReason::Removed);
    let Some(mut handler) = effect.handler.take() else {
      return;
    };
    let mut ctx = Context::new(world, &self.effects, &mut self.queue, effect.host, Some(id));
    if let Err(e) = handler.stop(&mut ctx, reason) {
      warn!("Effect {:?} ({}) stop failed: {}", effect.name, id, e);
    }
  }

  fn remove_object_now(&mut self, world: &mut World, object: ObjectId) -> bool {
    if !world.objects.is_alive(object) {
      return false;
    }
    for id in self.effects.on_host(Some(object)) {
      if self.effects.flag(id, StopReason::HostRemoved) {
        self.stop_effect(world, id);
      }
    }
    let Some(state) = world.objects.remove(object) else {
      return false;
    };
    if let Some(container) = state.container {
      if let Ok(c) = world.objects.get_mut(container) {
        c.contents.retain(|item| *item != object);
      }
    }
    for item in state.contents {
      if let Ok(s) = world.objects.get_mut(item) {
        s.container = None;
        s.x = state.x;
        s.y = state.y;
      }
    }
    true
  }

  fn apply_request(&mut self, world: &mut World, request: Request) -> SimResult<()> {
    match request {
      Request::SetAction { object, action } => self.switch_action(world, object, &action),
      Request::RemoveObject(object) => {
        self.remove_object_now(world, object);
        Ok(())
      }
      Request::RemoveEffect(id) => {
        self.effects.flag(id, StopReason::Removed);
        Ok(())
      }
      Request::RemoveNamedEffect { host, name } => {
        if let Some(id) = self.effects.find(host, &name) {
          self.effects.flag(id, StopReason::Removed);
        }
        Ok(())
      }
      Request::AddEffect {
        name,
        host,
        priority,
        interval,
        handler,
      } => self
        .add_effect_inner(world, &name, host, priority, interval, handler)
        .map(|_| ()),
      Request::Call { object, callback } => {
        let class = world.classes.get(&world.objects.get(object)?.class)?;
        self.invoke(world, object, &class, &callback);
        Ok(())
      }
      Request::Interaction(request) => {
        let subject = request.subject();
        let mut ctx = Context::new(world, &self.effects, &mut self.queue, Some(subject), None);
        interaction::apply(&mut ctx, request)
      }
    }
  }

  /// Applies queued requests and sweeps removed effects until both are
  /// exhausted. Nested calls return immediately; the outer loop picks up
  /// their work.
  fn flush(&mut self, world: &mut World) {
    if self.flushing {
      return;
    }
    self.flushing = true;
    let mut applied = 0usize;
    loop {
      if let Some(request) = self.queue.pop_front() {
        applied += 1;
        if applied > MAX_CASCADE {
          warn!(
            "Request cascade exceeded {} requests; dropping {} more",
            MAX_CASCADE,
            self.queue.len() + 1
          );
          self.queue.clear();
          continue;
        }
        match self.apply_request(world, request) {
          Ok(()) => {}
          Err(SimError::EffectHostGone { object }) => {
            debug!("Request for removed object {} ignored", object);
          }
          Err(e) => warn!("Request failed: {}", e),
        }
        continue;
      }
      let doomed = self.effects.take_doomed();
      if doomed.is_empty() {
        break;
      }
      for id in doomed {
        self.stop_effect(world, id);
      }
    }
    self.flushing = false;
  }
}

#[cfg(test)]
mod tests {
  use std::any::Any;
  use std::sync::{Arc, Mutex};

  use super::*;

  type Log = Arc<Mutex<Vec<String>>>;

  /// Records its timer and stop calls.
  struct Recorder {
    label: &'static str,
    log: Log,
    remove_after: Option<u64>,
    spawn_on_timer: bool,
  }

  impl Recorder {
    fn new(label: &'static str, log: &Log) -> Self {
      Self {
        label,
        log: log.clone(),
        remove_after: None,
        spawn_on_timer: false,
      }
    }
  }

  impl EffectHandler for Recorder {
    fn timer(&mut self, ctx: &mut Context, time: u64) -> SimResult<EffectControl> {
      self
        .log
        .lock()
        .unwrap()
        .push(format!("{}@{}", self.label, ctx.tick()));
      if self.spawn_on_timer {
        self.spawn_on_timer = false;
        let host = ctx.host();
        ctx.add_effect("Late", host, 0, 1, Recorder::new("late", &self.log));
      }
      if self.remove_after.is_some_and(|t| time >= t) {
        return Ok(EffectControl::Remove);
      }
      Ok(EffectControl::Continue)
    }

    fn stop(&mut self, _ctx: &mut Context, reason: StopReason) -> SimResult<()> {
      self
        .log
        .lock()
        .unwrap()
        .push(format!("{} stop {:?}", self.label, reason));
      Ok(())
    }

    fn as_any(&self) -> &dyn Any {
      self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
      self
    }
  }

  /// Folds same-named newcomers into itself; optionally re-adds its own
  /// name from its first timer call.
  struct Merger {
    log: Log,
    readd_on_timer: bool,
  }

  impl EffectHandler for Merger {
    fn timer(&mut self, ctx: &mut Context, _time: u64) -> SimResult<EffectControl> {
      if std::mem::take(&mut self.readd_on_timer) {
        let host = ctx.host();
        let log = self.log.clone();
        ctx.add_effect(
          "Glow",
          host,
          0,
          1,
          Merger {
            log,
            readd_on_timer: false,
          },
        );
      }
      Ok(EffectControl::Continue)
    }

    fn admit(&mut self, _ctx: &mut Context, incoming: &str) -> Admission {
      if incoming == "Glow" {
        Admission::Merge
      } else {
        Admission::Accept
      }
    }

    fn merge(&mut self, _ctx: &mut Context, _incoming: Box<dyn EffectHandler>) -> SimResult<()> {
      self.log.lock().unwrap().push("merged".to_string());
      Ok(())
    }

    fn as_any(&self) -> &dyn Any {
      self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
      self
    }
  }

  fn world() -> World {
    let mut classes = ClassRegistry::new();
    classes
      .register(
        ObjectClass::new("Walker")
          .with_action(ActionDef::new("Walk", 3, 1).next("Rest").on_start("Step"))
          .with_action(ActionDef::new("Rest", 2, 1).on_end("Woke"))
          .with_callback("Step", |ctx| {
            if let Some(state) = ctx.host_state_mut() {
              state.bump_counter("steps", 1);
            }
            Ok(())
          })
          .with_callback("Woke", |ctx| {
            if let Some(state) = ctx.host_state_mut() {
              state.bump_counter("woke", 1);
            }
            Ok(())
          }),
      )
      .unwrap();
    World::new(classes)
  }

  fn take(log: &Log) -> Vec<String> {
    std::mem::take(&mut *log.lock().unwrap())
  }

  #[test]
  fn effects_run_by_priority_then_insertion() {
    let mut world = world();
    let mut scheduler = Scheduler::new();
    let log = Log::default();
    let host = scheduler.spawn(&mut world, ObjectState::new("Walker")).unwrap();
    for (label, priority) in [("a", 5), ("b", 5), ("c", 1)] {
      scheduler
        .add_effect(&mut world, label, Some(host), priority, 1, Box::new(Recorder::new(label, &log)))
        .unwrap();
    }
    scheduler
      .add_effect(&mut world, "g", None, 9, 1, Box::new(Recorder::new("g", &log)))
      .unwrap();

    scheduler.tick(&mut world);
    assert_eq!(take(&log), ["g@1", "c@1", "a@1", "b@1"]);
  }

  #[test]
  fn effect_re_added_from_its_own_timer_merges() {
    let mut world = world();
    let mut scheduler = Scheduler::new();
    let log = Log::default();
    let host = scheduler.spawn(&mut world, ObjectState::new("Walker")).unwrap();
    let glow = Merger {
      log: log.clone(),
      readd_on_timer: true,
    };
    scheduler
      .add_effect(&mut world, "Glow", Some(host), 0, 1, Box::new(glow))
      .unwrap();

    scheduler.tick(&mut world);
    assert_eq!(take(&log), ["merged"]);
    assert_eq!(scheduler.effects().len(), 1);
  }

  #[test]
  fn busy_effect_does_not_swallow_newcomers() {
    let mut world = world();
    let mut scheduler = Scheduler::new();
    let log = Log::default();
    let glow = |log: &Log| {
      Box::new(Merger {
        log: log.clone(),
        readd_on_timer: false,
      })
    };
    let first = scheduler
      .add_effect(&mut world, "Glow", None, 0, 1, glow(&log))
      .unwrap()
      .unwrap();

    // As if one of its callbacks were running.
    let running = scheduler.effects.get_mut(first).unwrap().handler.take();
    let second = scheduler
      .add_effect(&mut world, "Glow", None, 0, 1, glow(&log))
      .unwrap();
    assert!(second.is_some());
    assert_eq!(scheduler.effects().len(), 2);
    scheduler.effects.get_mut(first).unwrap().handler = running;

    // With the first one idle again, a third is folded into it.
    let third = scheduler
      .add_effect(&mut world, "Glow", None, 0, 1, glow(&log))
      .unwrap();
    assert!(third.is_none());
    assert_eq!(take(&log), ["merged"]);
    assert_eq!(scheduler.effects().len(), 2);
  }

  #[test]
  fn interval_fires_once_per_period() {
    let mut world = world();
    let mut scheduler = Scheduler::new();
    let log = Log::default();
    scheduler
      .add_effect(&mut world, "slow", None, 0, 3, Box::new(Recorder::new("slow", &log)))
      .unwrap();
    scheduler
      .add_effect(&mut world, "off", None, 0, 0, Box::new(Recorder::new("off", &log)))
      .unwrap();
    for _ in 0..7 {
      scheduler.tick(&mut world);
    }
    assert_eq!(take(&log), ["slow@3", "slow@6"]);
  }

  #[test]
  fn effects_added_during_a_tick_wait_for_the_next() {
    let mut world = world();
    let mut scheduler = Scheduler::new();
    let log = Log::default();
    let mut recorder = Recorder::new("first", &log);
    recorder.spawn_on_timer = true;
    scheduler
      .add_effect(&mut world, "first", None, 0, 1, Box::new(recorder))
      .unwrap();

    scheduler.tick(&mut world);
    assert_eq!(take(&log), ["first@1"]);
    scheduler.tick(&mut world);
    assert_eq!(take(&log), ["first@2", "late@2"]);
  }

  #[test]
  fn removal_is_idempotent_and_stops_once() {
    let mut world = world();
    let mut scheduler = Scheduler::new();
    let log = Log::default();
    let id = scheduler
      .add_effect(&mut world, "x", None, 0, 1, Box::new(Recorder::new("x", &log)))
      .unwrap()
      .unwrap();

    scheduler.remove_effect(&mut world, id);
    scheduler.remove_effect(&mut world, id);
    assert_eq!(take(&log), ["x stop Removed"]);
    assert!(scheduler.effects().is_empty());
    scheduler.tick(&mut world);
    assert!(take(&log).is_empty());
  }

  #[test]
  fn timer_removal_stops_with_finished() {
    let mut world = world();
    let mut scheduler = Scheduler::new();
    let log = Log::default();
    let mut recorder = Recorder::new("t", &log);
    recorder.remove_after = Some(2);
    scheduler
      .add_effect(&mut world, "t", None, 0, 1, Box::new(recorder))
      .unwrap();
    for _ in 0..4 {
      scheduler.tick(&mut world);
    }
    assert_eq!(take(&log), ["t@1", "t@2", "t stop Finished"]);
  }

  #[test]
  fn dead_hosts_never_fire() {
    let mut world = world();
    let mut scheduler = Scheduler::new();
    let log = Log::default();
    let host = scheduler.spawn(&mut world, ObjectState::new("Walker")).unwrap();
    scheduler
      .add_effect(&mut world, "h", Some(host), 0, 1, Box::new(Recorder::new("h", &log)))
      .unwrap();

    assert!(scheduler.remove_object(&mut world, host));
    assert!(!scheduler.remove_object(&mut world, host));
    scheduler.tick(&mut world);
    assert_eq!(take(&log), ["h stop HostRemoved"]);

    assert!(matches!(
      scheduler.add_effect(&mut world, "h", Some(host), 0, 1, Box::new(Recorder::new("h", &log))),
      Err(SimError::EffectHostGone { .. })
    ));
    assert!(scheduler.set_action(&mut world, host, "Walk").is_err());
  }

  #[test]
  fn objects_removed_behind_the_schedulers_back_lose_their_effects() {
    let mut world = world();
    let mut scheduler = Scheduler::new();
    let log = Log::default();
    let host = scheduler.spawn(&mut world, ObjectState::new("Walker")).unwrap();
    scheduler
      .add_effect(&mut world, "h", Some(host), 0, 1, Box::new(Recorder::new("h", &log)))
      .unwrap();

    world.objects.remove(host);
    scheduler.tick(&mut world);
    assert_eq!(take(&log), ["h stop HostRemoved"]);
    assert!(scheduler.effects().is_empty());
  }

  #[test]
  fn actions_chain_to_next_and_go_idle() {
    let mut world = world();
    let mut scheduler = Scheduler::new();
    let walker = scheduler.spawn(&mut world, ObjectState::new("Walker")).unwrap();
    scheduler.set_action(&mut world, walker, "Walk").unwrap();
    assert_eq!(world.objects.get(walker).unwrap().counter("steps"), 1);

    for _ in 0..3 {
      scheduler.tick(&mut world);
    }
    assert_eq!(world.objects.get(walker).unwrap().action(), Some("Rest"));
    for _ in 0..2 {
      scheduler.tick(&mut world);
    }
    let state = world.objects.get(walker).unwrap();
    assert!(state.is_idle());
    assert_eq!(state.counter("woke"), 1);
  }

  #[test]
  fn unknown_actions_are_rejected() {
    let mut world = world();
    let mut scheduler = Scheduler::new();
    let walker = scheduler.spawn(&mut world, ObjectState::new("Walker")).unwrap();
    assert!(matches!(
      scheduler.set_action(&mut world, walker, "Fly"),
      Err(SimError::InvalidActionState { .. })
    ));
    assert!(world.objects.get(walker).unwrap().is_idle());
    scheduler.set_action(&mut world, walker, "Walk").unwrap();
    scheduler.set_action(&mut world, walker, IDLE).unwrap();
    assert!(world.objects.get(walker).unwrap().is_idle());
  }

  #[test]
  fn missing_callbacks_are_ignored() {
    let mut world = world();
    let mut scheduler = Scheduler::new();
    let walker = scheduler.spawn(&mut world, ObjectState::new("Walker")).unwrap();
    scheduler.call(&mut world, walker, "Jump").unwrap();
    scheduler.call(&mut world, walker, "Jump").unwrap();
    assert_eq!(scheduler.warned.len(), 1);
  }

  #[test]
  fn runaway_cascades_are_cut_off() {
    let mut classes = ClassRegistry::new();
    classes
      .register(ObjectClass::new("Echo").with_callback("Ping", |ctx| {
        if let Some(host) = ctx.host() {
          if let Some(state) = ctx.host_state_mut() {
            state.bump_counter("pings", 1);
          }
          ctx.call(host, "Ping");
        }
        Ok(())
      }))
      .unwrap();
    let mut world = World::new(classes);
    let mut scheduler = Scheduler::new();
    let echo = scheduler.spawn(&mut world, ObjectState::new("Echo")).unwrap();

    scheduler.call(&mut world, echo, "Ping").unwrap();
    let pings = world.objects.get(echo).unwrap().counter("pings");
    assert_eq!(pings, MAX_CASCADE as i64 + 1);
  }
}
