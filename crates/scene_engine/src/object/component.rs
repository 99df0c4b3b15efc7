//! Component types
//!
//! Components are a tagged union of capability data rather than an inheritance
//! chain: the entity's component list holds plain data, and callers dispatch
//! via capability queries on the registry. Behaviours are the one exception --
//! they carry code, so they live in a dedicated per-entity slot that can be
//! loaned out during the update tick.

use crate::foundation::math::Vec3;
use crate::object::registry::EntityId;
use crate::scene::bounds::{Aabb, Frustum};
use crate::scene::scene::UpdateContext;

/// The material flags the scene-graph core consumes. Shading parameters and
/// texture assets belong to the renderer, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Material {
    /// Whether alpha blending is enabled (forces back-to-front draw order)
    pub blend: bool,

    /// Rendering layer for sorting (higher values render later)
    pub render_layer: u8,
}

impl Material {
    /// Opaque material on the default layer
    pub fn opaque() -> Self {
        Self {
            blend: false,
            render_layer: 0,
        }
    }

    /// Alpha-blended material on the default layer
    pub fn blended() -> Self {
        Self {
            blend: true,
            render_layer: 0,
        }
    }
}

/// Component for entities that can be rendered
#[derive(Debug, Clone)]
pub struct Renderable {
    /// Bounds of the geometry in entity-local space. Answers the "collect my
    /// bounds" query; degenerate until real geometry is attached.
    pub local_bounds: Aabb,

    /// Material flags affecting draw-list partitioning
    pub material: Material,

    /// Whether this object is visible
    pub visible: bool,

    /// Whether this object participates in rendering at all
    pub enabled: bool,

    /// Whether this object casts shadows
    pub cast_shadows: bool,
}

impl Renderable {
    /// Create a renderable with degenerate bounds at the origin
    pub fn new(material: Material) -> Self {
        Self {
            local_bounds: Aabb::degenerate(),
            material,
            visible: true,
            enabled: true,
            cast_shadows: true,
        }
    }

    /// Create a renderable with explicit local bounds
    pub fn with_bounds(material: Material, local_bounds: Aabb) -> Self {
        Self {
            local_bounds,
            ..Self::new(material)
        }
    }

    /// Check if this component should be considered for draw lists
    pub fn should_render(&self) -> bool {
        self.enabled && self.visible
    }
}

/// Types of lights supported by the scene
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightKind {
    /// Directional light (like sunlight) with parallel rays
    Directional,
    /// Point light that radiates in all directions from a position
    Point,
    /// Spot light that creates a cone of light from a position
    Spot,
}

/// Pure data component for lights
#[derive(Debug, Clone)]
pub struct Light {
    /// The type of light
    pub kind: LightKind,
    /// RGB color values for the light (0.0 to 1.0 range)
    pub color: Vec3,
    /// Light intensity multiplier
    pub intensity: f32,
    /// Maximum range for point/spot lights
    pub range: f32,
    /// Inner cone angle for spot lights in radians
    pub inner_cone: f32,
    /// Outer cone angle for spot lights in radians
    pub outer_cone: f32,
    /// Whether the light is currently enabled
    pub enabled: bool,
    /// Whether this light should cast shadows
    pub cast_shadows: bool,
    /// Culling volume used when rendering this light's shadow map.
    /// Unbounded until the shadow pass fits it to the casters.
    pub shadow_frustum: Frustum,
}

impl Light {
    /// Create a directional light
    pub fn directional(color: Vec3, intensity: f32) -> Self {
        Self {
            kind: LightKind::Directional,
            color,
            intensity,
            range: 0.0,
            inner_cone: 0.0,
            outer_cone: 0.0,
            enabled: true,
            cast_shadows: true,
            shadow_frustum: Frustum::unbounded(),
        }
    }

    /// Create a point light
    pub fn point(color: Vec3, intensity: f32, range: f32) -> Self {
        Self {
            kind: LightKind::Point,
            range,
            cast_shadows: false,
            ..Self::directional(color, intensity)
        }
    }

    /// Create a spot light
    pub fn spot(color: Vec3, intensity: f32, range: f32, inner_cone: f32, outer_cone: f32) -> Self {
        Self {
            kind: LightKind::Spot,
            range,
            inner_cone,
            outer_cone,
            ..Self::directional(color, intensity)
        }
    }
}

/// Skybox marker component
#[derive(Debug, Clone)]
pub struct SkyBox {
    /// Whether the skybox is active
    pub enabled: bool,
}

impl SkyBox {
    /// Create an enabled skybox
    pub fn new() -> Self {
        Self { enabled: true }
    }
}

impl Default for SkyBox {
    fn default() -> Self {
        Self::new()
    }
}

/// Animation playback state. Clip evaluation is external; the scene only
/// aggregates which entities animate.
#[derive(Debug, Clone)]
pub struct Animation {
    /// Whether the animation is advancing
    pub playing: bool,
    /// Playback speed multiplier
    pub speed: f32,
}

impl Animation {
    /// Create a playing animation at normal speed
    pub fn new() -> Self {
        Self {
            playing: true,
            speed: 1.0,
        }
    }
}

impl Default for Animation {
    fn default() -> Self {
        Self::new()
    }
}

/// Tagged union of the data components an entity can carry
pub enum Component {
    /// Renderable geometry
    Renderable(Renderable),
    /// Light source
    Light(Light),
    /// Skybox
    SkyBox(SkyBox),
    /// Animation playback state
    Animation(Animation),
}

impl Component {
    /// Downcast to a renderable
    pub fn as_renderable(&self) -> Option<&Renderable> {
        match self {
            Self::Renderable(r) => Some(r),
            _ => None,
        }
    }

    pub(crate) fn as_renderable_mut(&mut self) -> Option<&mut Renderable> {
        match self {
            Self::Renderable(r) => Some(r),
            _ => None,
        }
    }

    /// Downcast to a light
    pub fn as_light(&self) -> Option<&Light> {
        match self {
            Self::Light(l) => Some(l),
            _ => None,
        }
    }

    /// Downcast to a skybox
    pub fn as_sky_box(&self) -> Option<&SkyBox> {
        match self {
            Self::SkyBox(s) => Some(s),
            _ => None,
        }
    }

    /// Downcast to an animation
    pub fn as_animation(&self) -> Option<&Animation> {
        match self {
            Self::Animation(a) => Some(a),
            _ => None,
        }
    }
}

/// Per-tick logic attached to an entity.
///
/// Behaviours run during [`Scene::update`](crate::scene::Scene::update) and may
/// freely mutate the registry and query the scene: the scene iterates over a
/// snapshot, and the behaviour itself is loaned out of the registry while its
/// `update` runs.
pub trait Behaviour {
    /// Advance the behaviour by `ctx.dt` seconds
    fn update(&mut self, ctx: &mut UpdateContext<'_>, entity: EntityId);
}

/// Storage slot for an entity's behaviour. `attached` stays true while the
/// boxed value is loaned out, so scene queries mid-tick still see it.
/// `enabled` gates execution without detaching.
#[derive(Default)]
pub(crate) struct BehaviourSlot {
    pub(crate) attached: bool,
    pub(crate) enabled: bool,
    pub(crate) boxed: Option<Box<dyn Behaviour>>,
}
