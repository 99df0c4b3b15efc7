//! Runtime core of a real-time 3D scene graph.
//!
//! The crate provides an entity-component object model over a generational
//! arena, a transform hierarchy with lazy, dirty-flag-driven matrix
//! recomputation, per-entity bounding-volume caches with upward invalidation,
//! and a scene layer that flattens the hierarchy into per-frame component
//! lists and per-camera culled, blend-sorted draw lists.
//!
//! Everything is single-threaded and pull-based: mutations flip dirty bits
//! and propagate invalidation; derived values recompute at most once per
//! invalidation epoch, at read time.
//!
//! ```
//! use scene_engine::object::{EntityRegistry, Material, Renderable};
//! use scene_engine::scene::{Scene, SceneConfig};
//! use scene_engine::foundation::math::Vec3;
//!
//! let mut registry = EntityRegistry::new();
//! let mut scene = Scene::new(&mut registry, SceneConfig::default());
//!
//! let cube = scene.spawn_model(&mut registry, "cube", Renderable::new(Material::opaque()));
//! registry.set_local_position(cube, Vec3::new(0.0, 1.0, 0.0));
//!
//! scene.update(&mut registry, 0.016);
//! assert_eq!(scene.models(&registry), &[cube]);
//! ```

pub mod error;
pub mod foundation;
pub mod object;
pub mod scene;

pub use error::SceneError;
pub use object::{EntityId, EntityRegistry};
pub use scene::{Camera, Scene, SceneConfig};
