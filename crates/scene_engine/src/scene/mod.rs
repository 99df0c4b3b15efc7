//! Scene layer: transform hierarchy, bounds, aggregation, and per-camera
//! render lists
//!
//! `transform` and `bounds` extend [`EntityRegistry`](crate::object::EntityRegistry)
//! with the lazily-cached derived state; `scene` and `pick_cache` sit above
//! them with frame-scoped caches of their own.

pub mod bounds;
pub mod camera;
pub mod pick_cache;
pub mod raycast;
#[allow(clippy::module_inception)]
pub mod scene;
pub mod transform;

pub use bounds::{Aabb, Frustum, Plane};
pub use camera::Camera;
pub use pick_cache::ScenePickCache;
pub use raycast::{Ray, RayHit, Raycaster};
pub use scene::{Scene, SceneConfig, UpdateContext};
pub use transform::DrawUniforms;
