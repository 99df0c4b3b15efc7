//! Per-camera culled and sorted render lists
//!
//! One cache per (scene, camera) pair. All three lists are built from a single
//! frustum-culling pass over the scene subtree and invalidated together,
//! exactly once per render pass, by [`ScenePickCache::clear`].

use crate::object::registry::{EntityId, EntityRegistry};
use crate::scene::camera::Camera;

/// Cached draw lists for one camera.
pub struct ScenePickCache {
    active_models: Option<Vec<EntityId>>,
    blend_items: Option<Vec<EntityId>>,
    opaque_items: Option<Vec<EntityId>>,
    cull: bool,
}

impl ScenePickCache {
    /// Create an empty cache. `cull` disables the frustum test when false
    /// (everything passes).
    pub fn new(cull: bool) -> Self {
        Self {
            active_models: None,
            blend_items: None,
            opaque_items: None,
            cull,
        }
    }

    /// Reset all three lists to unset. The owner calls this once per render
    /// pass, before the frame's queries.
    pub fn clear(&mut self) {
        self.active_models = None;
        self.blend_items = None;
        self.opaque_items = None;
    }

    /// Renderables that survive the visibility and frustum tests.
    ///
    /// One pre-order pass over the subtree with an explicit stack; hierarchy
    /// depth is unbounded, so the walk must not recurse.
    pub fn active_models(
        &mut self,
        registry: &EntityRegistry,
        root: EntityId,
        camera: &Camera,
    ) -> &[EntityId] {
        if self.active_models.is_none() {
            let mut found = Vec::new();
            let mut stack = vec![root];
            while let Some(id) = stack.pop() {
                for &child in registry.children(id).iter().rev() {
                    stack.push(child);
                }
                let Some(renderable) = registry.renderable(id) else {
                    continue;
                };
                if !renderable.should_render() {
                    continue;
                }
                if !registry.global_visible(id).unwrap_or(false) {
                    continue;
                }
                if self.cull {
                    let Ok(bounds) = registry.self_world_bounds(id) else {
                        continue;
                    };
                    if !camera.frustum.intersects_aabb(&bounds) {
                        continue;
                    }
                }
                found.push(id);
            }
            self.active_models = Some(found);
        }
        self.active_models.as_deref().unwrap_or(&[])
    }

    /// Blend-enabled subset, farthest from the camera first (back-to-front
    /// compositing order).
    pub fn blend_items(
        &mut self,
        registry: &EntityRegistry,
        root: EntityId,
        camera: &Camera,
    ) -> &[EntityId] {
        if self.blend_items.is_none() {
            let sorted = self.partition(registry, root, camera, true, |a, b| b.total_cmp(a));
            self.blend_items = Some(sorted);
        }
        self.blend_items.as_deref().unwrap_or(&[])
    }

    /// Opaque subset, nearest first (early depth rejection; not a correctness
    /// requirement).
    pub fn opaque_items(
        &mut self,
        registry: &EntityRegistry,
        root: EntityId,
        camera: &Camera,
    ) -> &[EntityId] {
        if self.opaque_items.is_none() {
            let sorted = self.partition(registry, root, camera, false, f32::total_cmp);
            self.opaque_items = Some(sorted);
        }
        self.opaque_items.as_deref().unwrap_or(&[])
    }

    fn partition(
        &mut self,
        registry: &EntityRegistry,
        root: EntityId,
        camera: &Camera,
        blended: bool,
        order: impl Fn(&f32, &f32) -> std::cmp::Ordering,
    ) -> Vec<EntityId> {
        let eye = camera.world_position(registry).unwrap_or_default();
        let mut keyed: Vec<(EntityId, f32)> = self
            .active_models(registry, root, camera)
            .iter()
            .copied()
            .filter(|&id| {
                registry
                    .renderable(id)
                    .is_some_and(|r| r.material.blend == blended)
            })
            .map(|id| {
                let distance_sq = registry
                    .world_position(id)
                    .map_or(f32::INFINITY, |p| (p - eye).magnitude_squared());
                (id, distance_sq)
            })
            .collect();
        // Stable sort: equal distances keep traversal order
        keyed.sort_by(|a, b| order(&a.1, &b.1));
        keyed.into_iter().map(|(id, _)| id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use crate::object::component::{Component, Material, Renderable};
    use crate::scene::bounds::Aabb;

    fn model(registry: &mut EntityRegistry, root: EntityId, blend: bool, z: f32) -> EntityId {
        let id = registry.spawn("model");
        registry.add_child(root, id).unwrap();
        let material = if blend {
            Material::blended()
        } else {
            Material::opaque()
        };
        registry.add_component(
            id,
            Component::Renderable(Renderable::with_bounds(
                material,
                Aabb::from_center_extents(Vec3::zeros(), Vec3::repeat(0.5)),
            )),
        );
        registry.set_local_position(id, Vec3::new(0.0, 0.0, z));
        id
    }

    #[test]
    fn test_blend_sorted_back_to_front_opaque_front_to_back() {
        let mut registry = EntityRegistry::new();
        let root = registry.spawn("root");
        let eye = registry.spawn("eye");
        registry.add_child(root, eye).unwrap();
        let camera = Camera::new(eye);

        // Distances 1, 5, 3 from the camera at the origin
        let near = model(&mut registry, root, true, 1.0);
        let far = model(&mut registry, root, true, 5.0);
        let mid = model(&mut registry, root, true, 3.0);

        let mut cache = ScenePickCache::new(true);
        assert_eq!(cache.blend_items(&registry, root, &camera), &[far, mid, near]);

        // Same distances, all opaque
        let mut registry = EntityRegistry::new();
        let root = registry.spawn("root");
        let eye = registry.spawn("eye");
        registry.add_child(root, eye).unwrap();
        let camera = Camera::new(eye);
        let near = model(&mut registry, root, false, 1.0);
        let far = model(&mut registry, root, false, 5.0);
        let mid = model(&mut registry, root, false, 3.0);

        let mut cache = ScenePickCache::new(true);
        assert_eq!(cache.opaque_items(&registry, root, &camera), &[near, mid, far]);
    }

    #[test]
    fn test_hidden_and_disabled_models_excluded() {
        let mut registry = EntityRegistry::new();
        let root = registry.spawn("root");
        let eye = registry.spawn("eye");
        registry.add_child(root, eye).unwrap();
        let camera = Camera::new(eye);

        let visible = model(&mut registry, root, false, 1.0);
        let hidden = model(&mut registry, root, false, 2.0);
        let disabled = model(&mut registry, root, false, 3.0);
        registry.set_visible(hidden, false);
        registry.renderable_mut(disabled).unwrap().enabled = false;

        let mut cache = ScenePickCache::new(true);
        let active = cache.active_models(&registry, root, &camera);
        assert_eq!(active, &[visible]);
    }

    #[test]
    fn test_clear_resets_all_lists_together() {
        let mut registry = EntityRegistry::new();
        let root = registry.spawn("root");
        let eye = registry.spawn("eye");
        registry.add_child(root, eye).unwrap();
        let camera = Camera::new(eye);
        model(&mut registry, root, false, 1.0);

        let mut cache = ScenePickCache::new(true);
        assert_eq!(cache.active_models(&registry, root, &camera).len(), 1);

        // Node added after the lists were built is invisible to this frame
        let late = model(&mut registry, root, false, 2.0);
        assert_eq!(cache.active_models(&registry, root, &camera).len(), 1);

        cache.clear();
        let active = cache.active_models(&registry, root, &camera);
        assert_eq!(active.len(), 2);
        assert!(active.contains(&late));
    }

    #[test]
    fn test_preorder_traversal_order_breaks_distance_ties() {
        let mut registry = EntityRegistry::new();
        let root = registry.spawn("root");
        let eye = registry.spawn("eye");
        registry.add_child(root, eye).unwrap();
        let camera = Camera::new(eye);

        // Two models at the same distance: stable sort keeps pre-order
        let first = model(&mut registry, root, false, 2.0);
        let second = model(&mut registry, root, false, 2.0);

        let mut cache = ScenePickCache::new(true);
        assert_eq!(cache.opaque_items(&registry, root, &camera), &[first, second]);
    }
}
