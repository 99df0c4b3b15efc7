//! Scene aggregation
//!
//! A scene roots a subtree of the registry and memoizes flattened per-type
//! component lists over it. Every list is reset at the top of each `update`
//! tick, before behaviours run, so behaviours always observe a freshly
//! invalidated view. Per-camera pick caches live here too, reset once per
//! render pass rather than per tick.

use crate::foundation::math::Vec3;
use crate::object::component::{Component, LightKind, Renderable};
use crate::object::registry::{EntityId, EntityRegistry};
use crate::scene::bounds::Aabb;
use crate::scene::camera::Camera;
use crate::scene::pick_cache::ScenePickCache;
use std::collections::HashMap;

/// Scene configuration
#[derive(Debug, Clone)]
pub struct SceneConfig {
    /// Enable frustum culling in per-camera pick caches
    pub enable_culling: bool,

    /// Local bounds extents assigned to renderables spawned without explicit
    /// bounds
    pub default_extents: Vec3,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            enable_culling: true,
            default_extents: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

/// Dependencies handed to a behaviour's `update`: the owning scene, the
/// registry, and this tick's delta time in seconds.
pub struct UpdateContext<'a> {
    /// The scene driving this tick
    pub scene: &'a mut Scene,
    /// The entity arena
    pub registry: &'a mut EntityRegistry,
    /// Seconds since the previous tick
    pub dt: f32,
}

#[derive(Default)]
struct FrameLists {
    models: Option<Vec<EntityId>>,
    directional_lights: Option<Vec<EntityId>>,
    point_lights: Option<Vec<EntityId>>,
    spot_lights: Option<Vec<EntityId>>,
    sky_boxes: Option<Vec<EntityId>>,
    animations: Option<Vec<EntityId>>,
    behaviours: Option<Vec<EntityId>>,
    active_models: Option<Vec<EntityId>>,
    active_directional_lights: Option<Vec<EntityId>>,
    active_point_lights: Option<Vec<EntityId>>,
    active_spot_lights: Option<Vec<EntityId>>,
    active_sky_boxes: Option<Vec<EntityId>>,
    active_animations: Option<Vec<EntityId>>,
    active_behaviours: Option<Vec<EntityId>>,
}

/// A root entity plus the frame-scoped caches over its subtree.
pub struct Scene {
    root: EntityId,
    config: SceneConfig,
    lists: FrameLists,
    pick_caches: HashMap<u64, ScenePickCache>,
}

impl Scene {
    /// Create a scene, spawning its root entity in the registry
    pub fn new(registry: &mut EntityRegistry, config: SceneConfig) -> Self {
        let root = registry.spawn("scene");
        Self {
            root,
            config,
            lists: FrameLists::default(),
            pick_caches: HashMap::new(),
        }
    }

    /// The scene's root entity
    pub fn root(&self) -> EntityId {
        self.root
    }

    /// Spawn a named entity under the root carrying the given renderable.
    /// Degenerate bounds are widened to the configured default extents so
    /// culling has something to test.
    pub fn spawn_model(
        &mut self,
        registry: &mut EntityRegistry,
        name: &str,
        mut renderable: Renderable,
    ) -> EntityId {
        if renderable.local_bounds.is_degenerate() {
            renderable.local_bounds =
                Aabb::from_center_extents(Vec3::zeros(), self.config.default_extents);
        }
        let id = registry.spawn(name);
        registry.add_component(id, Component::Renderable(renderable));
        if let Err(e) = registry.add_child(self.root, id) {
            log::error!("spawn_model could not attach {name}: {e}");
        }
        id
    }

    /// Advance the scene by one tick.
    ///
    /// Resets every cached list FIRST, then runs the enabled behaviours on
    /// visible branches over a snapshot taken at the start of the tick: a
    /// behaviour removing entities mid-tick affects the next recomputation,
    /// never the current iteration.
    pub fn update(&mut self, registry: &mut EntityRegistry, dt: f32) {
        self.invalidate_lists();

        let snapshot: Vec<EntityId> = self.active_behaviours(registry).to_vec();
        for id in snapshot {
            let Some(mut behaviour) = registry.take_behaviour(id) else {
                continue;
            };
            {
                let mut ctx = UpdateContext {
                    scene: &mut *self,
                    registry: &mut *registry,
                    dt,
                };
                behaviour.update(&mut ctx, id);
            }
            registry.restore_behaviour(id, behaviour);
        }
    }

    /// Reset every memoized list to "recompute on next read"
    fn invalidate_lists(&mut self) {
        self.lists = FrameLists::default();
    }

    fn collect(
        registry: &EntityRegistry,
        root: EntityId,
        mut keep: impl FnMut(&EntityRegistry, EntityId) -> bool,
    ) -> Vec<EntityId> {
        let mut found = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            for &child in registry.children(id).iter().rev() {
                stack.push(child);
            }
            if keep(registry, id) {
                found.push(id);
            }
        }
        found
    }

    fn lights_of_kind(registry: &EntityRegistry, root: EntityId, kind: LightKind) -> Vec<EntityId> {
        Self::collect(registry, root, |reg, id| {
            reg.light(id).is_some_and(|l| l.kind == kind)
        })
    }

    fn active(registry: &EntityRegistry, ids: &[EntityId], enabled: impl Fn(&EntityRegistry, EntityId) -> bool) -> Vec<EntityId> {
        ids.iter()
            .copied()
            .filter(|&id| enabled(registry, id) && registry.global_visible(id).unwrap_or(false))
            .collect()
    }

    /// All renderable-carrying entities in the subtree, memoized for the tick
    pub fn models(&mut self, registry: &EntityRegistry) -> &[EntityId] {
        let root = self.root;
        self.lists.models.get_or_insert_with(|| {
            Self::collect(registry, root, |reg, id| reg.renderable(id).is_some())
        })
    }

    /// Models that are enabled, visible, and on a visible branch
    pub fn active_models(&mut self, registry: &EntityRegistry) -> &[EntityId] {
        if self.lists.active_models.is_none() {
            let all = self.models(registry).to_vec();
            self.lists.active_models = Some(Self::active(registry, &all, |reg, id| {
                reg.renderable(id).is_some_and(Renderable::should_render)
            }));
        }
        self.lists.active_models.as_deref().unwrap_or(&[])
    }

    /// All directional lights in the subtree
    pub fn directional_lights(&mut self, registry: &EntityRegistry) -> &[EntityId] {
        let root = self.root;
        self.lists.directional_lights.get_or_insert_with(|| {
            Self::lights_of_kind(registry, root, LightKind::Directional)
        })
    }

    /// Enabled directional lights on visible branches
    pub fn active_directional_lights(&mut self, registry: &EntityRegistry) -> &[EntityId] {
        if self.lists.active_directional_lights.is_none() {
            let all = self.directional_lights(registry).to_vec();
            self.lists.active_directional_lights = Some(Self::active(registry, &all, |reg, id| {
                reg.light(id).is_some_and(|l| l.enabled)
            }));
        }
        self.lists.active_directional_lights.as_deref().unwrap_or(&[])
    }

    /// All point lights in the subtree
    pub fn point_lights(&mut self, registry: &EntityRegistry) -> &[EntityId] {
        let root = self.root;
        self.lists
            .point_lights
            .get_or_insert_with(|| Self::lights_of_kind(registry, root, LightKind::Point))
    }

    /// Enabled point lights on visible branches
    pub fn active_point_lights(&mut self, registry: &EntityRegistry) -> &[EntityId] {
        if self.lists.active_point_lights.is_none() {
            let all = self.point_lights(registry).to_vec();
            self.lists.active_point_lights = Some(Self::active(registry, &all, |reg, id| {
                reg.light(id).is_some_and(|l| l.enabled)
            }));
        }
        self.lists.active_point_lights.as_deref().unwrap_or(&[])
    }

    /// All spot lights in the subtree
    pub fn spot_lights(&mut self, registry: &EntityRegistry) -> &[EntityId] {
        let root = self.root;
        self.lists
            .spot_lights
            .get_or_insert_with(|| Self::lights_of_kind(registry, root, LightKind::Spot))
    }

    /// Enabled spot lights on visible branches
    pub fn active_spot_lights(&mut self, registry: &EntityRegistry) -> &[EntityId] {
        if self.lists.active_spot_lights.is_none() {
            let all = self.spot_lights(registry).to_vec();
            self.lists.active_spot_lights = Some(Self::active(registry, &all, |reg, id| {
                reg.light(id).is_some_and(|l| l.enabled)
            }));
        }
        self.lists.active_spot_lights.as_deref().unwrap_or(&[])
    }

    /// All skybox-carrying entities in the subtree
    pub fn sky_boxes(&mut self, registry: &EntityRegistry) -> &[EntityId] {
        let root = self.root;
        self.lists.sky_boxes.get_or_insert_with(|| {
            Self::collect(registry, root, |reg, id| {
                reg.components(id)
                    .iter()
                    .any(|c| c.as_sky_box().is_some())
            })
        })
    }

    /// Enabled skyboxes on visible branches
    pub fn active_sky_boxes(&mut self, registry: &EntityRegistry) -> &[EntityId] {
        if self.lists.active_sky_boxes.is_none() {
            let all = self.sky_boxes(registry).to_vec();
            self.lists.active_sky_boxes = Some(Self::active(registry, &all, |reg, id| {
                reg.components(id)
                    .iter()
                    .filter_map(Component::as_sky_box)
                    .any(|s| s.enabled)
            }));
        }
        self.lists.active_sky_boxes.as_deref().unwrap_or(&[])
    }

    /// All animation-carrying entities in the subtree
    pub fn animations(&mut self, registry: &EntityRegistry) -> &[EntityId] {
        let root = self.root;
        self.lists.animations.get_or_insert_with(|| {
            Self::collect(registry, root, |reg, id| {
                reg.components(id)
                    .iter()
                    .any(|c| c.as_animation().is_some())
            })
        })
    }

    /// Animations that are advancing, on visible branches
    pub fn active_animations(&mut self, registry: &EntityRegistry) -> &[EntityId] {
        if self.lists.active_animations.is_none() {
            let all = self.animations(registry).to_vec();
            self.lists.active_animations = Some(Self::active(registry, &all, |reg, id| {
                reg.components(id)
                    .iter()
                    .filter_map(Component::as_animation)
                    .any(|a| a.playing)
            }));
        }
        self.lists.active_animations.as_deref().unwrap_or(&[])
    }

    /// All behaviour-carrying entities in the subtree, in traversal order
    pub fn behaviours(&mut self, registry: &EntityRegistry) -> &[EntityId] {
        let root = self.root;
        self.lists
            .behaviours
            .get_or_insert_with(|| Self::collect(registry, root, EntityRegistry::has_behaviour))
    }

    /// Enabled behaviours on visible branches; this is the set `update` runs
    pub fn active_behaviours(&mut self, registry: &EntityRegistry) -> &[EntityId] {
        if self.lists.active_behaviours.is_none() {
            let all = self.behaviours(registry).to_vec();
            self.lists.active_behaviours = Some(Self::active(
                registry,
                &all,
                EntityRegistry::behaviour_enabled,
            ));
        }
        self.lists.active_behaviours.as_deref().unwrap_or(&[])
    }

    // ------------------------------------------------------------------
    // Per-camera queries
    // ------------------------------------------------------------------

    /// The pick cache for this camera, created on first request
    pub fn pick_cache(&mut self, camera: &Camera) -> &mut ScenePickCache {
        let cull = self.config.enable_culling;
        self.pick_caches
            .entry(camera.id())
            .or_insert_with(|| ScenePickCache::new(cull))
    }

    /// Start a render pass for the camera: clears its pick cache exactly once
    pub fn begin_render(&mut self, camera: &Camera) {
        self.pick_cache(camera).clear();
    }

    /// Ad-hoc frustum query against an arbitrary camera. Not memoized: shadow
    /// cameras are transient and not worth a cache entry.
    pub fn models_by_camera(&mut self, registry: &EntityRegistry, camera: &Camera) -> Vec<EntityId> {
        self.active_models(registry)
            .iter()
            .copied()
            .filter(|&id| {
                registry
                    .self_world_bounds(id)
                    .is_ok_and(|b| camera.frustum.intersects_aabb(&b))
            })
            .collect()
    }

    /// Shadow-caster culling for a directional light: active models that cast
    /// shadows and intersect the light's shadow frustum
    pub fn pick_by_directional_light(
        &mut self,
        registry: &EntityRegistry,
        light_entity: EntityId,
    ) -> Vec<EntityId> {
        let Some(light) = registry.light(light_entity) else {
            log::warn!("pick_by_directional_light: no light on {light_entity:?}");
            return Vec::new();
        };
        if !light.enabled {
            return Vec::new();
        }
        let frustum = light.shadow_frustum.clone();
        self.active_models(registry)
            .iter()
            .copied()
            .filter(|&id| {
                registry.renderable(id).is_some_and(|r| r.cast_shadows)
                    && registry
                        .self_world_bounds(id)
                        .is_ok_and(|b| frustum.intersects_aabb(&b))
            })
            .collect()
    }
}
