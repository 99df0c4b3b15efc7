//! Scene-graph error types

use crate::object::EntityId;
use thiserror::Error;

/// Errors surfaced by structural and query operations on the scene graph
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneError {
    /// Re-parenting would make a node an ancestor of itself
    #[error("adding {child:?} under {parent:?} would create a cycle")]
    WouldCreateCycle {
        /// The node that was asked to adopt the child
        parent: EntityId,
        /// The node whose subtree already contains `parent`
        child: EntityId,
    },

    /// Operation addressed an entity that has been despawned
    #[error("entity {0:?} is stale or was despawned")]
    StaleEntity(EntityId),
}
