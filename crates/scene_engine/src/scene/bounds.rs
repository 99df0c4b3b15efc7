//! Bounding volumes and the per-entity bounds cache
//!
//! `Aabb`/`Plane`/`Frustum` are the spatial-query primitives; `BoundsCache`
//! layers three lazily-memoized boxes on top of every entity:
//! self-local (union of component-reported bounds), self-world (transformed by
//! the world matrix), and world (aggregate over the subtree). Invalidation of
//! the aggregate flows *up* the tree, the one place it does.

use crate::error::SceneError;
use crate::foundation::math::{Mat4, Point3, Vec3, Vec4};
use crate::object::registry::{EntityId, EntityRegistry};
use std::cell::Cell;

/// Axis-Aligned Bounding Box for spatial queries
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
}

impl Aabb {
    /// Create a new AABB from min and max points
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create an AABB centered at a point with given extents
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        Self {
            min: center - extents,
            max: center + extents,
        }
    }

    /// Zero-volume box at the origin. The "no geometry" answer to the bounds
    /// query; consumers always get a valid box.
    pub fn degenerate() -> Self {
        Self {
            min: Vec3::zeros(),
            max: Vec3::zeros(),
        }
    }

    /// Whether this box has zero volume
    pub fn is_degenerate(&self) -> bool {
        self.min == self.max
    }

    /// Get the center of the AABB
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the extents (half-size) of the AABB
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Smallest box containing both inputs
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    /// Check if this AABB contains a point
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// Check if this AABB intersects another AABB
    pub fn intersects(&self, other: &Self) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// The box containing all eight transformed corners of this box
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        let mut min = Vec3::repeat(f32::INFINITY);
        let mut max = Vec3::repeat(f32::NEG_INFINITY);
        for i in 0..8 {
            let corner = Point3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            );
            let transformed = matrix.transform_point(&corner).coords;
            min = min.inf(&transformed);
            max = max.sup(&transformed);
        }
        Self { min, max }
    }

    /// Test ray intersection with this AABB using the slab method.
    /// Returns the distance to the entry point if the ray intersects.
    pub fn intersect_ray(&self, ray_origin: Vec3, ray_dir: Vec3) -> Option<f32> {
        let inv = |d: f32| if d != 0.0 { 1.0 / d } else { f32::INFINITY };
        let inv_dir = Vec3::new(inv(ray_dir.x), inv(ray_dir.y), inv(ray_dir.z));

        let t1 = (self.min.x - ray_origin.x) * inv_dir.x;
        let t2 = (self.max.x - ray_origin.x) * inv_dir.x;
        let t3 = (self.min.y - ray_origin.y) * inv_dir.y;
        let t4 = (self.max.y - ray_origin.y) * inv_dir.y;
        let t5 = (self.min.z - ray_origin.z) * inv_dir.z;
        let t6 = (self.max.z - ray_origin.z) * inv_dir.z;

        let tmin = t1.min(t2).max(t3.min(t4)).max(t5.min(t6));
        let tmax = t1.max(t2).min(t3.max(t4)).min(t5.max(t6));

        if tmax >= tmin && tmax >= 0.0 {
            Some(tmin.max(0.0))
        } else {
            None
        }
    }
}

/// Plane defined by normal and distance from origin
#[derive(Debug, Clone, Copy)]
pub struct Plane {
    /// Normal vector (should be normalized)
    pub normal: Vec3,
    /// Distance from origin along the normal
    pub distance: f32,
}

impl Plane {
    /// Create a new plane from normal and distance
    pub fn new(normal: Vec3, distance: f32) -> Self {
        Self {
            normal: normal.normalize(),
            distance,
        }
    }

    /// Calculate signed distance from plane to point
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.normal.dot(&point) + self.distance
    }
}

/// View volume for visibility culling
#[derive(Debug, Clone)]
pub struct Frustum {
    /// Six planes defining the frustum (left, right, bottom, top, near, far)
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Create a frustum from six planes
    pub fn new(planes: [Plane; 6]) -> Self {
        Self { planes }
    }

    /// A frustum that intersects everything (degenerate planes). Used by
    /// shadow volumes before they are fitted and by cameras without a real
    /// projection.
    pub fn unbounded() -> Self {
        let everything = Plane {
            normal: Vec3::zeros(),
            distance: 0.0,
        };
        Self {
            planes: [everything; 6],
        }
    }

    /// Extract frustum planes from a view-projection matrix using the
    /// Gribb-Hartmann method (row combinations of the matrix).
    pub fn from_view_projection(vp: &Mat4) -> Self {
        let row = |i: usize| Vec4::new(vp[(i, 0)], vp[(i, 1)], vp[(i, 2)], vp[(i, 3)]);
        let (r0, r1, r2, r3) = (row(0), row(1), row(2), row(3));

        let plane = |v: Vec4| {
            let normal = Vec3::new(v.x, v.y, v.z);
            let len = normal.magnitude();
            if len > 1e-6 {
                Plane {
                    normal: normal / len,
                    distance: v.w / len,
                }
            } else {
                Plane {
                    normal: Vec3::zeros(),
                    distance: 0.0,
                }
            }
        };

        Self {
            planes: [
                plane(r3 + r0), // left
                plane(r3 - r0), // right
                plane(r3 + r1), // bottom
                plane(r3 - r1), // top
                plane(r3 + r2), // near
                plane(r3 - r2), // far
            ],
        }
    }

    /// Check if an AABB is inside or intersects the frustum
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        for plane in &self.planes {
            // The corner of the AABB furthest along the plane normal
            let mut p = aabb.min;
            if plane.normal.x >= 0.0 {
                p.x = aabb.max.x;
            }
            if plane.normal.y >= 0.0 {
                p.y = aabb.max.y;
            }
            if plane.normal.z >= 0.0 {
                p.z = aabb.max.z;
            }

            if plane.distance_to_point(p) < 0.0 {
                return false;
            }
        }
        true
    }
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) struct BoundsDirty: u8 {
        const SELF_LOCAL = 1 << 0;
        const SELF_WORLD = 1 << 1;
        const WORLD = 1 << 2;
    }
}

/// Lazily-filled bounding boxes of one entity, one dirty bit per level.
pub struct BoundsCache {
    self_local: Cell<Aabb>,
    self_world: Cell<Aabb>,
    world: Cell<Aabb>,
    dirty: Cell<BoundsDirty>,

    // Instrumentation: aggregate-bounds recomputes, read by tests.
    pub(crate) world_recomputes: Cell<u64>,
}

impl Default for BoundsCache {
    fn default() -> Self {
        Self {
            self_local: Cell::new(Aabb::degenerate()),
            self_world: Cell::new(Aabb::degenerate()),
            world: Cell::new(Aabb::degenerate()),
            dirty: Cell::new(BoundsDirty::all()),
            world_recomputes: Cell::new(0),
        }
    }
}

impl EntityRegistry {
    /// Union of the bounds reported by all renderable components on the
    /// entity, in local space. Degenerate box at the origin when nothing
    /// reports.
    pub fn self_local_bounds(&self, id: EntityId) -> Result<Aabb, SceneError> {
        let entity = self.entity(id).ok_or(SceneError::StaleEntity(id))?;
        let cache = &entity.bounds;
        if cache.dirty.get().contains(BoundsDirty::SELF_LOCAL) {
            let mut collected: Option<Aabb> = None;
            for renderable in self.renderables(id) {
                collected = Some(match collected {
                    Some(aabb) => aabb.union(&renderable.local_bounds),
                    None => renderable.local_bounds,
                });
            }
            cache.self_local.set(collected.unwrap_or_else(Aabb::degenerate));
            cache.dirty.set(cache.dirty.get() - BoundsDirty::SELF_LOCAL);
        }
        Ok(cache.self_local.get())
    }

    /// The entity's own bounds in world space
    pub fn self_world_bounds(&self, id: EntityId) -> Result<Aabb, SceneError> {
        let local = self.self_local_bounds(id)?;
        let world_matrix = self.local_to_world(id)?;
        let entity = self.entity(id).ok_or(SceneError::StaleEntity(id))?;
        let cache = &entity.bounds;
        if cache.dirty.get().contains(BoundsDirty::SELF_WORLD) {
            cache.self_world.set(local.transformed(&world_matrix));
            cache.dirty.set(cache.dirty.get() - BoundsDirty::SELF_WORLD);
        }
        Ok(cache.self_world.get())
    }

    /// Aggregate world-space bounds of the entity and its whole subtree
    pub fn world_bounds(&self, id: EntityId) -> Result<Aabb, SceneError> {
        let own = self.self_world_bounds(id)?;
        let entity = self.entity(id).ok_or(SceneError::StaleEntity(id))?;
        let cache = &entity.bounds;
        if cache.dirty.get().contains(BoundsDirty::WORLD) {
            let mut aggregate = own;
            for &child in &entity.children {
                aggregate = aggregate.union(&self.world_bounds(child)?);
            }
            cache.world.set(aggregate);
            cache.dirty.set(cache.dirty.get() - BoundsDirty::WORLD);
            cache.world_recomputes.set(cache.world_recomputes.get() + 1);
        }
        Ok(cache.world.get())
    }

    /// The "my geometry changed" signal: invalidates the local bounds and
    /// cascades down through self-world, then up through the aggregates.
    pub fn invalidate_local_bounds(&self, id: EntityId) {
        if let Some(entity) = self.entity(id) {
            entity
                .bounds
                .dirty
                .set(entity.bounds.dirty.get() | BoundsDirty::SELF_LOCAL | BoundsDirty::SELF_WORLD);
            self.invalidate_world_bounds(id);
        }
    }

    /// Called by the transform invalidation wave: world matrix moved, so the
    /// world-space layers are stale (local-space bounds are untouched).
    pub(crate) fn invalidate_self_world_bounds(&self, id: EntityId) {
        if let Some(entity) = self.entity(id) {
            entity
                .bounds
                .dirty
                .set(entity.bounds.dirty.get() | BoundsDirty::SELF_WORLD);
            self.invalidate_world_bounds(id);
        }
    }

    /// Upward propagation: a child's world extent affects every ancestor's
    /// aggregate. Terminates at the root, or early at an already-invalid node.
    pub(crate) fn invalidate_world_bounds(&self, id: EntityId) {
        let Some(entity) = self.entity(id) else {
            return;
        };
        let cache = &entity.bounds;
        if cache.dirty.get().contains(BoundsDirty::WORLD) {
            return;
        }
        cache.dirty.set(cache.dirty.get() | BoundsDirty::WORLD);
        if let Some(parent) = entity.parent {
            self.invalidate_world_bounds(parent);
        }
    }
}
