//! Scene payloads stored in the hierarchy registry.
//!
//! Every live simulation object is one node in the scene graph: worlds at
//! the root, entities beneath their world, components beneath their entity.
//! Teardown is `Drop`, driven by the post-order removal sequence the
//! registry hands back.

use crate::world::World;
use simhost_common::GameTime;
use simhost_hierarchy::Hierarchy;

/// The ownership tree of all live simulation objects.
pub type SceneGraph = Hierarchy<SceneObject>;

/// A simulation object owned by a world, updated once per tick by the world
/// that spawned it. Components implement the same trait and live one level
/// deeper in the tree.
pub trait Entity: 'static {
    fn update(&mut self, _time: &GameTime) {}
}

/// Root-level record for a registered world.
///
/// The boxed world is taken out of the slot for the duration of its own
/// update call, so the world can mutate the scene graph it lives in. Outside
/// of that window the slot always holds the world.
pub struct WorldSlot {
    name: String,
    created_tick: u64,
    world: Option<Box<dyn World>>,
}

impl WorldSlot {
    pub(crate) fn new(name: String, created_tick: u64, world: Box<dyn World>) -> Self {
        Self {
            name,
            created_tick,
            world: Some(world),
        }
    }

    /// Identity tag of the world.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tick at which the world was created.
    pub fn created_tick(&self) -> u64 {
        self.created_tick
    }

    /// The world, unless it is currently mid-update.
    pub fn world(&self) -> Option<&dyn World> {
        self.world.as_deref()
    }

    pub(crate) fn take(&mut self) -> Option<Box<dyn World>> {
        self.world.take()
    }

    pub(crate) fn restore(&mut self, world: Box<dyn World>) {
        self.world = Some(world);
    }
}

impl std::fmt::Debug for WorldSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorldSlot")
            .field("name", &self.name)
            .field("created_tick", &self.created_tick)
            .finish()
    }
}

/// Payload of one scene-graph node.
pub enum SceneObject {
    World(WorldSlot),
    Entity(Box<dyn Entity>),
}

impl SceneObject {
    pub fn as_world(&self) -> Option<&WorldSlot> {
        match self {
            SceneObject::World(slot) => Some(slot),
            SceneObject::Entity(_) => None,
        }
    }

    pub(crate) fn as_world_mut(&mut self) -> Option<&mut WorldSlot> {
        match self {
            SceneObject::World(slot) => Some(slot),
            SceneObject::Entity(_) => None,
        }
    }

    pub fn is_entity(&self) -> bool {
        matches!(self, SceneObject::Entity(_))
    }
}
