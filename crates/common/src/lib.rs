//! Shared types for the simhost server core.
//!
//! Everything here is plain data: stable identifiers and step timing values
//! passed between the hierarchy, the kernel, and external observers.

pub mod types;

pub use types::{GameTime, NodeId};
