//! Ray queries over the hierarchy
//!
//! A direct client of the transform utilities and the bounds caches: rays are
//! tested against cached world-space boxes, or carried into an entity's local
//! space through its world-to-local matrix for a local-bounds test.

use crate::error::SceneError;
use crate::foundation::math::{Mat4, Point3, Vec3};
use crate::object::registry::{EntityId, EntityRegistry};

/// A half-line in some coordinate space
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    /// Starting point
    pub origin: Vec3,
    /// Direction (not required to be normalized; hit distances are in units
    /// of this vector's length)
    pub direction: Vec3,
}

impl Ray {
    /// Create a ray from origin and direction
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    /// The point at parameter `t` along the ray
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// The same ray expressed in another coordinate space
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        Self {
            origin: matrix.transform_point(&Point3::from(self.origin)).coords,
            direction: matrix.transform_vector(&self.direction),
        }
    }
}

/// A renderable entity crossed by a ray
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// The entity whose bounds were hit
    pub entity: EntityId,
    /// Distance from the ray origin to the entry point
    pub distance: f32,
}

/// Hit-testing over a scene subtree
pub struct Raycaster;

impl Raycaster {
    /// Cast a world-space ray at every renderable under `root`, nearest hit
    /// first. Invisible branches are skipped.
    pub fn cast(registry: &EntityRegistry, root: EntityId, ray: &Ray) -> Vec<RayHit> {
        let mut hits = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            for &child in registry.children(id).iter().rev() {
                stack.push(child);
            }
            let Some(renderable) = registry.renderable(id) else {
                continue;
            };
            if !renderable.should_render() || !registry.global_visible(id).unwrap_or(false) {
                continue;
            }
            let Ok(bounds) = registry.self_world_bounds(id) else {
                continue;
            };
            if let Some(distance) = bounds.intersect_ray(ray.origin, ray.direction) {
                hits.push(RayHit { entity: id, distance });
            }
        }
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }

    /// Test one entity's local bounds by carrying the world-space ray into
    /// its local space. Finer than the world-AABB test when the entity is
    /// rotated.
    pub fn cast_local(
        registry: &EntityRegistry,
        id: EntityId,
        ray: &Ray,
    ) -> Result<Option<f32>, SceneError> {
        let local_ray = ray.transformed(&registry.world_to_local(id)?);
        let bounds = registry.self_local_bounds(id)?;
        Ok(bounds.intersect_ray(local_ray.origin, local_ray.direction))
    }
}
