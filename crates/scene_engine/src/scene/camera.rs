//! Camera collaborator
//!
//! The core does not own projection math; it consumes a camera as an identity
//! (for per-camera cache keying), a frustum (for culling), and a world
//! position (for distance sorts), nothing more.

use crate::error::SceneError;
use crate::foundation::math::Vec3;
use crate::object::registry::{EntityId, EntityRegistry};
use crate::scene::bounds::Frustum;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CAMERA_ID: AtomicU64 = AtomicU64::new(0);

/// A viewpoint over the scene. Identity is per-instance: two cameras on the
/// same entity still key separate pick caches.
pub struct Camera {
    id: u64,

    /// The entity carrying this camera; its world position anchors distance
    /// sorts
    pub entity: EntityId,

    /// The camera's view volume, maintained by the projection layer
    pub frustum: Frustum,
}

impl Camera {
    /// Create a camera on the given entity with an unbounded frustum
    pub fn new(entity: EntityId) -> Self {
        Self {
            id: NEXT_CAMERA_ID.fetch_add(1, Ordering::Relaxed),
            entity,
            frustum: Frustum::unbounded(),
        }
    }

    /// Create a camera with an explicit frustum
    pub fn with_frustum(entity: EntityId, frustum: Frustum) -> Self {
        Self {
            frustum,
            ..Self::new(entity)
        }
    }

    /// Stable identity of this camera instance
    pub fn id(&self) -> u64 {
        self.id
    }

    /// World-space position of the camera's entity
    pub fn world_position(&self, registry: &EntityRegistry) -> Result<Vec3, SceneError> {
        registry.world_position(self.entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_identities_are_distinct() {
        let mut registry = EntityRegistry::new();
        let e = registry.spawn("camera rig");
        let a = Camera::new(e);
        let b = Camera::new(e);
        assert_ne!(a.id(), b.id());
    }
}
