//! Hierarchy registry: the ownership ledger for all live simulation objects.
//!
//! # Invariants
//! - Every non-root node has exactly one currently-registered parent.
//! - A node's lifetime is bounded by its parent's: unregistering a node
//!   removes its entire subtree, children before parents.
//! - The registry holds no domain logic. It never invokes update or teardown
//!   hooks; teardown is the caller dropping the removed values in the order
//!   this crate hands them back.

pub mod registry;

pub use registry::{Hierarchy, HierarchyError};
