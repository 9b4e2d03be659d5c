//! Simulation kernel: the tick-driven update loop, the world
//! lifecycle/switching state machine, and the server run loop.
//!
//! # Invariants
//! - Within one tick: pending switch application happens-before the active
//!   world's update, which happens-before counter advancement.
//! - At most one world is active at any time. Switch requests are applied
//!   only at the start of a step, never mid-update.
//! - Tick and time counters advance every step, with or without an active
//!   world.

pub mod context;
pub mod manager;
pub mod scene;
pub mod server;
pub mod world;

pub use context::ServerContext;
pub use manager::WorldManager;
pub use scene::{Entity, SceneGraph, SceneObject, WorldSlot};
pub use server::{GameConfiguration, Server, ServerConfig, ServerHandle};
pub use world::{BoxError, KernelError, UpdateContext, World, WorldFactory};
