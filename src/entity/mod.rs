//! Entity identity and the two families of referenceable entities:
//! [`component::Component`] (3D rigid bodies, owned by [`crate::assembly_tree::AssemblyTree`])
//! and [`sketch::SketchPrimitive`] (2D sketch geometry, owned by the caller's sketch).

pub mod component;
pub mod sketch;

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A stable identifier for any entity referenced by a constraint.
///
/// Constraints never hold entities by value; they hold a [`std::rc::Weak`]
/// handle plus this id, so that identity survives across moves within a
/// tree and `referenced_entities()` can report stable handles for DOF
/// accounting and manager dedup even after the underlying entity has been
/// dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
