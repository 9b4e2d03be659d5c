//! The root coordinator: step sequencing, tick counters, and delegation to
//! the world manager.

use crate::manager::WorldManager;
use crate::scene::SceneGraph;
use crate::world::{KernelError, UpdateContext, World, WorldFactory};
use simhost_common::{GameTime, NodeId};
use std::time::{Duration, SystemTime};

/// Owns the scene graph, the world manager, and the server's clocks.
///
/// One context lives for the whole server process. Each step runs
/// `begin(elapsed)` then `update()` then `advance()`; `step` bundles the
/// three for callers that drive the loop externally.
pub struct ServerContext {
    /// Number of completed steps.
    tick: u64,
    /// Milliseconds of simulated time since server start.
    time_tick: u64,
    /// Wall-clock start, published so clients can synchronise against
    /// `time_tick` regardless of tick rate.
    start_time: SystemTime,
    game_time: GameTime,
    scene: SceneGraph,
    manager: WorldManager,
}

impl ServerContext {
    pub fn new() -> Self {
        Self {
            tick: 0,
            time_tick: 0,
            start_time: SystemTime::now(),
            game_time: GameTime::default(),
            scene: SceneGraph::new(),
            manager: WorldManager::new(),
        }
    }

    /// Start a step: apply any pending world switch, then fix this step's
    /// time values. Counters do not move here; they advance after the
    /// update.
    pub fn begin(&mut self, elapsed: Duration) -> Result<(), KernelError> {
        self.manager.apply_pending(&mut self.scene, self.tick)?;
        self.game_time = GameTime::new(elapsed, Duration::from_millis(self.time_tick));
        Ok(())
    }

    /// Run the active world's update exactly once. Returns whether a world
    /// ran; with nothing active the step is a simulation no-op.
    pub fn update(&mut self) -> Result<bool, KernelError> {
        let Some(node) = self.manager.active() else {
            tracing::trace!(tick = self.tick, "step with no active world");
            return Ok(false);
        };

        let world = match self.scene.get_mut(node) {
            Ok(obj) => obj.as_world_mut().and_then(|slot| slot.take()),
            Err(_) => {
                self.manager.clear_active();
                return Ok(false);
            }
        };
        let Some(mut world) = world else {
            return Ok(false);
        };

        let mut ctx = UpdateContext::new(
            &mut self.scene,
            &mut self.manager,
            node,
            self.game_time,
            self.tick,
        );
        world.update(&mut ctx);

        // The world may have removed its own node during the update; if the
        // slot is gone the world is dropped with it.
        match self.scene.get_mut(node) {
            Ok(obj) => {
                if let Some(slot) = obj.as_world_mut() {
                    slot.restore(world);
                }
            }
            Err(_) => self.manager.clear_active(),
        }
        Ok(true)
    }

    /// Close a step: advance the tick and the simulated-time counter.
    pub fn advance(&mut self) {
        self.tick += 1;
        self.time_tick += self.game_time.elapsed_millis();
    }

    /// Run one full step. Returns whether a world updated.
    pub fn step(&mut self, elapsed: Duration) -> Result<bool, KernelError> {
        self.begin(elapsed)?;
        let updated = self.update()?;
        self.advance();
        Ok(updated)
    }

    /// Construct a world and register it without activating it.
    pub fn create_world(&mut self, factory: &dyn WorldFactory) -> Result<NodeId, KernelError> {
        self.manager.create_world(&mut self.scene, factory, self.tick)
    }

    /// Request a switch to a factory-built world at the next step boundary.
    pub fn switch_world(&mut self, factory: impl WorldFactory + 'static) {
        self.manager.switch_world(factory);
    }

    /// Request a switch adopting an existing world instance.
    pub fn switch_world_instance(&mut self, world: Box<dyn World>) {
        self.manager.switch_world_instance(world);
    }

    /// Unregister every root node, tearing down the active world and all
    /// descendants.
    pub fn shutdown(&mut self) {
        for root in self.scene.roots().to_vec() {
            let _ = self.scene.unregister(root);
        }
        self.manager.clear_active();
        tracing::info!(tick = self.tick, "server context shut down");
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn time_tick(&self) -> u64 {
        self.time_tick
    }

    pub fn start_time(&self) -> SystemTime {
        self.start_time
    }

    pub fn game_time(&self) -> &GameTime {
        &self.game_time
    }

    /// Read access for external observers (rendering, editors, debuggers).
    pub fn hierarchy(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn active_world_node(&self) -> Option<NodeId> {
        self.manager.active()
    }

    pub fn active_world(&self) -> Option<&dyn World> {
        let node = self.manager.active()?;
        self.scene.get(node).ok()?.as_world()?.world()
    }

    /// Strict-mode check for callers that treat a worldless step as an
    /// error rather than a no-op.
    pub fn require_active(&self) -> Result<NodeId, KernelError> {
        self.manager.active().ok_or(KernelError::NoActiveWorld)
    }
}

impl Default for ServerContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Entity;
    use crate::world::BoxError;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    const DT: Duration = Duration::from_millis(10);

    /// World that counts updates and records the tick of each one.
    struct Recorder {
        name: &'static str,
        updates: Rc<RefCell<Vec<u64>>>,
    }

    impl World for Recorder {
        fn name(&self) -> &str {
            self.name
        }

        fn update(&mut self, ctx: &mut UpdateContext<'_>) {
            self.updates.borrow_mut().push(ctx.tick());
        }
    }

    /// Factory for `Recorder` worlds; counts its own invocations.
    struct RecorderFactory {
        name: &'static str,
        updates: Rc<RefCell<Vec<u64>>>,
        built: Rc<Cell<u32>>,
    }

    impl WorldFactory for RecorderFactory {
        fn create(&self, _scene: &mut SceneGraph) -> Result<Box<dyn World>, BoxError> {
            self.built.set(self.built.get() + 1);
            Ok(Box::new(Recorder {
                name: self.name,
                updates: self.updates.clone(),
            }))
        }
    }

    struct FailingFactory;

    impl WorldFactory for FailingFactory {
        fn create(&self, _scene: &mut SceneGraph) -> Result<Box<dyn World>, BoxError> {
            Err("corrupt zone".into())
        }
    }

    fn recorder_factory(name: &'static str) -> (RecorderFactory, Rc<RefCell<Vec<u64>>>) {
        let updates = Rc::new(RefCell::new(Vec::new()));
        let factory = RecorderFactory {
            name,
            updates: updates.clone(),
            built: Rc::new(Cell::new(0)),
        };
        (factory, updates)
    }

    #[test]
    fn worldless_steps_advance_counters() {
        let mut ctx = ServerContext::new();
        for _ in 0..3 {
            assert!(!ctx.step(DT).unwrap());
        }
        assert_eq!(ctx.tick(), 3);
        assert_eq!(ctx.time_tick(), 30);
        assert_eq!(ctx.active_world_node(), None);
        assert!(matches!(
            ctx.require_active(),
            Err(KernelError::NoActiveWorld)
        ));
    }

    #[test]
    fn switch_after_startup_steps() {
        // Start with no world, run 3 steps, switch, run step 4.
        let mut ctx = ServerContext::new();
        for _ in 0..3 {
            ctx.step(DT).unwrap();
        }
        let (factory, updates) = recorder_factory("a");
        ctx.switch_world(factory);
        assert!(ctx.step(DT).unwrap());

        assert_eq!(ctx.tick(), 4);
        assert_eq!(updates.borrow().len(), 1);
        assert_eq!(ctx.active_world().unwrap().name(), "a");
    }

    #[test]
    fn counters_monotonic_across_world_changes() {
        let mut ctx = ServerContext::new();
        let mut last = (0, 0);
        let (factory, _) = recorder_factory("a");
        ctx.switch_world(factory);
        for i in 0..6 {
            if i == 3 {
                let (next, _) = recorder_factory("b");
                ctx.switch_world(next);
            }
            ctx.step(DT).unwrap();
            let now = (ctx.tick(), ctx.time_tick());
            assert!(now.0 > last.0);
            assert!(now.1 > last.1);
            last = now;
        }
    }

    #[test]
    fn double_switch_only_last_target_activates() {
        let mut ctx = ServerContext::new();
        let (a, a_updates) = recorder_factory("a");
        ctx.switch_world(a);
        ctx.step(DT).unwrap();

        let b_built = Rc::new(Cell::new(0));
        ctx.switch_world(RecorderFactory {
            name: "b",
            updates: Rc::new(RefCell::new(Vec::new())),
            built: b_built.clone(),
        });
        let (c, c_updates) = recorder_factory("c");
        ctx.switch_world(c);
        ctx.step(DT).unwrap();

        assert_eq!(ctx.active_world().unwrap().name(), "c");
        assert_eq!(b_built.get(), 0);
        assert_eq!(c_updates.borrow().len(), 1);
        // "a" received exactly its pre-switch update.
        assert_eq!(a_updates.borrow().len(), 1);
    }

    /// World that requests a switch from inside its own update.
    struct Switcher {
        target: Option<RecorderFactory>,
        updates: Rc<RefCell<Vec<u64>>>,
    }

    impl World for Switcher {
        fn name(&self) -> &str {
            "switcher"
        }

        fn update(&mut self, ctx: &mut UpdateContext<'_>) {
            self.updates.borrow_mut().push(ctx.tick());
            if let Some(factory) = self.target.take() {
                ctx.switch_world(factory);
            }
        }
    }

    #[test]
    fn mid_update_switch_applies_next_tick() {
        let mut ctx = ServerContext::new();
        let own = Rc::new(RefCell::new(Vec::new()));
        let next = Rc::new(RefCell::new(Vec::new()));
        ctx.switch_world_instance(Box::new(Switcher {
            target: Some(RecorderFactory {
                name: "next",
                updates: next.clone(),
                built: Rc::new(Cell::new(0)),
            }),
            updates: own.clone(),
        }));

        // Tick 0: switcher runs and queues the switch; still active after.
        ctx.step(DT).unwrap();
        assert_eq!(*own.borrow(), vec![0]);
        assert_eq!(ctx.active_world().unwrap().name(), "switcher");

        // Tick 1: the queued switch applies before the update.
        ctx.step(DT).unwrap();
        assert_eq!(ctx.active_world().unwrap().name(), "next");
        assert_eq!(*next.borrow(), vec![1]);
        assert_eq!(*own.borrow(), vec![0]);
    }

    #[test]
    fn failed_live_switch_keeps_world_running() {
        let mut ctx = ServerContext::new();
        let (a, a_updates) = recorder_factory("a");
        ctx.switch_world(a);
        ctx.step(DT).unwrap();

        ctx.switch_world(FailingFactory);
        let err = ctx.step(DT).unwrap_err();
        assert!(matches!(err, KernelError::Construction(_)));
        assert_eq!(ctx.active_world().unwrap().name(), "a");

        // The discarded request does not haunt later steps.
        ctx.step(DT).unwrap();
        assert_eq!(a_updates.borrow().len(), 2);
    }

    /// Entity probe logging its drop.
    struct Tracked(&'static str, Rc<RefCell<Vec<&'static str>>>);

    impl Entity for Tracked {}

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.1.borrow_mut().push(self.0);
        }
    }

    /// World that spawns one entity-with-component on its first update and
    /// logs its own drop.
    struct Nest {
        log: Rc<RefCell<Vec<&'static str>>>,
        spawned: bool,
    }

    impl World for Nest {
        fn name(&self) -> &str {
            "nest"
        }

        fn update(&mut self, ctx: &mut UpdateContext<'_>) {
            if !self.spawned {
                self.spawned = true;
                let entity = ctx
                    .spawn(Box::new(Tracked("entity", self.log.clone())))
                    .unwrap();
                ctx.spawn_child(entity, Box::new(Tracked("component", self.log.clone())))
                    .unwrap();
            }
        }
    }

    impl Drop for Nest {
        fn drop(&mut self) {
            self.log.borrow_mut().push("world");
        }
    }

    #[test]
    fn switch_teardown_is_recursive_leaves_first() {
        let mut ctx = ServerContext::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        ctx.switch_world_instance(Box::new(Nest {
            log: log.clone(),
            spawned: false,
        }));
        ctx.step(DT).unwrap();
        assert_eq!(ctx.hierarchy().len(), 3);

        let (replacement, _) = recorder_factory("replacement");
        ctx.switch_world(replacement);
        ctx.step(DT).unwrap();

        assert_eq!(*log.borrow(), vec!["component", "entity", "world"]);
        assert_eq!(ctx.hierarchy().len(), 1);
    }

    #[test]
    fn create_world_leaves_active_untouched() {
        let mut ctx = ServerContext::new();
        let (side, side_updates) = recorder_factory("side");
        let node = ctx.create_world(&side).unwrap();
        assert!(ctx.hierarchy().contains(node));
        assert_eq!(ctx.active_world_node(), None);

        ctx.step(DT).unwrap();
        assert!(side_updates.borrow().is_empty());
    }

    #[test]
    fn shutdown_clears_everything() {
        let mut ctx = ServerContext::new();
        let (a, _) = recorder_factory("a");
        ctx.switch_world(a);
        ctx.step(DT).unwrap();
        let (side, _) = recorder_factory("side");
        ctx.create_world(&side).unwrap();

        ctx.shutdown();
        assert!(ctx.hierarchy().is_empty());
        assert_eq!(ctx.active_world_node(), None);
    }

    #[test]
    fn begin_fixes_game_time_before_advance() {
        let mut ctx = ServerContext::new();
        ctx.step(Duration::from_millis(25)).unwrap();
        ctx.begin(Duration::from_millis(40)).unwrap();
        assert_eq!(ctx.game_time().elapsed, Duration::from_millis(40));
        assert_eq!(ctx.game_time().total, Duration::from_millis(25));
        // Counters untouched until advance.
        assert_eq!(ctx.tick(), 1);
        assert_eq!(ctx.time_tick(), 25);
    }
}
