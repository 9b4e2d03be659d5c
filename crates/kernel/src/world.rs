//! The world contract and the context handed to a world during its update.

use crate::manager::WorldManager;
use crate::scene::{Entity, SceneGraph, SceneObject};
use simhost_common::{GameTime, NodeId};
use simhost_hierarchy::HierarchyError;

/// Error type world factories may fail with.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors from kernel operations.
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),
    #[error("world construction failed: {0}")]
    Construction(#[source] BoxError),
    #[error("no world is active")]
    NoActiveWorld,
    #[error("no game configuration was supplied")]
    NoConfiguration,
}

/// A self-contained simulation scene.
///
/// A world is updated exactly once per server tick while it is active, and
/// only from the server context's step. It owns its simulation state and
/// creates/destroys entities through the scene graph with itself as parent.
pub trait World {
    /// Identity tag, recorded in the world's hierarchy slot.
    fn name(&self) -> &str;

    /// Advance the world by one step.
    fn update(&mut self, ctx: &mut UpdateContext<'_>);
}

/// Constructs a world on demand.
///
/// Factories are supplied as values and invoked lazily: a queued switch
/// whose request is overwritten before the next step never constructs its
/// world.
pub trait WorldFactory {
    fn create(&self, scene: &mut SceneGraph) -> Result<Box<dyn World>, BoxError>;
}

/// Everything a world may touch while it updates.
///
/// Spawning parents new nodes to the running world (or to one of its
/// descendants, for components). Switch requests made here are deferred and
/// applied at the start of the next step, never mid-update.
pub struct UpdateContext<'a> {
    scene: &'a mut SceneGraph,
    manager: &'a mut WorldManager,
    world_node: NodeId,
    time: GameTime,
    tick: u64,
}

impl<'a> UpdateContext<'a> {
    pub(crate) fn new(
        scene: &'a mut SceneGraph,
        manager: &'a mut WorldManager,
        world_node: NodeId,
        time: GameTime,
        tick: u64,
    ) -> Self {
        Self {
            scene,
            manager,
            world_node,
            time,
            tick,
        }
    }

    /// Timing values for this step.
    pub fn time(&self) -> &GameTime {
        &self.time
    }

    /// The tick this update belongs to.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// The running world's own node in the scene graph.
    pub fn world_node(&self) -> NodeId {
        self.world_node
    }

    /// Read access to the scene graph.
    pub fn scene(&self) -> &SceneGraph {
        self.scene
    }

    /// Spawn an entity owned by the running world.
    pub fn spawn(&mut self, entity: Box<dyn Entity>) -> Result<NodeId, KernelError> {
        Ok(self
            .scene
            .register(SceneObject::Entity(entity), Some(self.world_node))?)
    }

    /// Spawn a child object (a component) under an existing node of this
    /// world's subtree.
    pub fn spawn_child(
        &mut self,
        parent: NodeId,
        entity: Box<dyn Entity>,
    ) -> Result<NodeId, KernelError> {
        Ok(self
            .scene
            .register(SceneObject::Entity(entity), Some(parent))?)
    }

    /// Destroy a node and its subtree. Teardown runs leaves-first.
    pub fn despawn(&mut self, id: NodeId) -> Result<(), KernelError> {
        self.scene.unregister(id)?;
        Ok(())
    }

    /// Direct children of the running world, in spawn order.
    pub fn entities(&self) -> Result<&[NodeId], KernelError> {
        Ok(self.scene.children(self.world_node)?)
    }

    /// Run the update hook of every entity in the world's subtree,
    /// depth-first in spawn order.
    pub fn update_entities(&mut self) {
        let time = self.time;
        let mut stack: Vec<NodeId> = match self.scene.children(self.world_node) {
            Ok(children) => children.iter().rev().copied().collect(),
            Err(_) => return,
        };
        while let Some(id) = stack.pop() {
            if let Ok(children) = self.scene.children(id) {
                stack.extend(children.iter().rev());
            }
            if let Ok(SceneObject::Entity(entity)) = self.scene.get_mut(id) {
                entity.update(&time);
            }
        }
    }

    /// Request a switch to a world built by `factory` at the next step
    /// boundary. Last request before the boundary wins.
    pub fn switch_world(&mut self, factory: impl WorldFactory + 'static) {
        self.manager.switch_world(factory);
    }

    /// Request a switch to an already-constructed world.
    pub fn switch_world_instance(&mut self, world: Box<dyn World>) {
        self.manager.switch_world_instance(world);
    }
}
