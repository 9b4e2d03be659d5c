//! World lifecycle: which world is active, and how transitions happen.

use crate::scene::{SceneGraph, SceneObject, WorldSlot};
use crate::world::{KernelError, World, WorldFactory};
use simhost_common::NodeId;

enum SwitchTarget {
    /// Lazy: constructed only when the request is applied.
    Factory(Box<dyn WorldFactory>),
    /// Adopted directly at application time.
    Instance(Box<dyn World>),
}

/// Tracks the single active world and the pending switch request.
///
/// Requests are recorded, not applied: application happens exactly once, at
/// the start of the next step, so a switch never interrupts an in-progress
/// update. Queuing a second request before the boundary discards the first,
/// factory uninvoked.
#[derive(Default)]
pub struct WorldManager {
    active: Option<NodeId>,
    pending: Option<SwitchTarget>,
}

impl WorldManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// The active world's root node, if any.
    pub fn active(&self) -> Option<NodeId> {
        self.active
    }

    /// Whether a switch request is waiting for the next step boundary.
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub(crate) fn clear_active(&mut self) {
        self.active = None;
    }

    /// Construct a world and register it as a root node, without touching
    /// the active world. Construction failure registers nothing.
    pub fn create_world(
        &mut self,
        scene: &mut SceneGraph,
        factory: &dyn WorldFactory,
        tick: u64,
    ) -> Result<NodeId, KernelError> {
        let world = factory.create(scene).map_err(KernelError::Construction)?;
        let name = world.name().to_string();
        let node = scene.register(
            SceneObject::World(WorldSlot::new(name.clone(), tick, world)),
            None,
        )?;
        tracing::info!(%name, ?node, "created world");
        Ok(node)
    }

    /// Record a switch request to a factory-built world. Last write wins.
    pub fn switch_world(&mut self, factory: impl WorldFactory + 'static) {
        if self.pending.is_some() {
            tracing::debug!("overwriting pending world switch");
        }
        self.pending = Some(SwitchTarget::Factory(Box::new(factory)));
    }

    /// Record a switch request adopting an existing world instance. The
    /// previously active world is still torn down at application time.
    pub fn switch_world_instance(&mut self, world: Box<dyn World>) {
        if self.pending.is_some() {
            tracing::debug!("overwriting pending world switch");
        }
        self.pending = Some(SwitchTarget::Instance(world));
    }

    /// Apply the pending request, if any. Called at the start of a step.
    ///
    /// The target is constructed before the old world is touched: on
    /// construction failure the previously active world stays active and
    /// the request is discarded, with the error surfaced to the caller.
    pub(crate) fn apply_pending(
        &mut self,
        scene: &mut SceneGraph,
        tick: u64,
    ) -> Result<Option<NodeId>, KernelError> {
        let Some(target) = self.pending.take() else {
            return Ok(None);
        };

        let world = match target {
            SwitchTarget::Factory(factory) => {
                factory.create(scene).map_err(KernelError::Construction)?
            }
            SwitchTarget::Instance(world) => world,
        };

        if let Some(old) = self.active.take() {
            // Post-order removal: the outgoing world's subtree tears down
            // leaves-first when dropped.
            let removed = scene.unregister(old)?;
            tracing::info!(node = ?old, objects = removed.len(), "tore down active world");
        }

        let name = world.name().to_string();
        let node = scene.register(
            SceneObject::World(WorldSlot::new(name.clone(), tick, world)),
            None,
        )?;
        self.active = Some(node);
        tracing::info!(%name, ?node, tick, "world switch applied");
        Ok(Some(node))
    }
}
