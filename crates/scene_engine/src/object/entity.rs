//! Entity record
//!
//! An entity is a named node in the scene graph: hierarchy links, an always-
//! present transform state, an ordered component list, and lazily-filled
//! bounds caches. All access goes through
//! [`EntityRegistry`](crate::object::EntityRegistry) by id.

use crate::object::component::{BehaviourSlot, Component};
use crate::object::registry::EntityId;
use crate::scene::bounds::BoundsCache;
use crate::scene::transform::TransformState;

/// One node in the scene graph.
pub struct Entity {
    pub(crate) name: String,
    pub(crate) parent: Option<EntityId>,
    pub(crate) children: Vec<EntityId>,
    pub(crate) components: Vec<Component>,
    pub(crate) behaviour: BehaviourSlot,
    pub(crate) transform: TransformState,
    pub(crate) bounds: BoundsCache,
}

impl Entity {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            parent: None,
            children: Vec::new(),
            components: Vec::new(),
            behaviour: BehaviourSlot::default(),
            transform: TransformState::default(),
            bounds: BoundsCache::default(),
        }
    }
}
