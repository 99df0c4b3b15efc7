//! Entity-component object model
//!
//! Entities live in an arena keyed by generational ids; components are tagged
//! capability data dispatched by query, not by inheritance.

pub mod component;
pub mod entity;
pub mod registry;

pub use component::{Animation, Behaviour, Component, Light, LightKind, Material, Renderable, SkyBox};
pub use registry::{EntityId, EntityRegistry};
