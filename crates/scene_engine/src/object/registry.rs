//! Entity registry
//!
//! The arena owning every entity in the scene graph. Entities are addressed by
//! generational [`EntityId`] keys, so a despawned id can never alias a later
//! spawn. The registry is passed by reference to everything that needs it;
//! there is no process-wide instance.

use crate::object::component::{Behaviour, Component, Light, Renderable};
use crate::object::entity::Entity;
use crate::scene::bounds::Aabb;
use slotmap::SlotMap;

slotmap::new_key_type! {
    /// Generational handle to an entity. Copyable, never reused while the
    /// original is alive; stale ids simply miss on lookup.
    pub struct EntityId;
}

/// Arena of all entities, their components, and their hierarchy links.
///
/// The transform-hierarchy and bounds operations live in `scene::transform`
/// and `scene::bounds` as further `impl` blocks on this type; this module owns
/// lifecycle and component plumbing only.
#[derive(Default)]
pub struct EntityRegistry {
    pub(crate) entities: SlotMap<EntityId, Entity>,
}

impl EntityRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new entity with the given name.
    ///
    /// The entity's transform state is attached at construction; every entity
    /// has exactly one.
    pub fn spawn(&mut self, name: &str) -> EntityId {
        self.entities.insert(Entity::new(name))
    }

    /// Destroy an entity, cascading to all of its children.
    ///
    /// Detaches from the parent first so the parent's aggregate bounds stop
    /// covering the removed subtree. Silent no-op on a stale id.
    pub fn despawn(&mut self, id: EntityId) {
        let Some(entity) = self.entities.get(id) else {
            return;
        };
        if let Some(parent) = entity.parent {
            if let Some(parent_entity) = self.entities.get_mut(parent) {
                parent_entity.children.retain(|&c| c != id);
            }
            self.invalidate_world_bounds(parent);
        }
        self.despawn_subtree(id);
    }

    fn despawn_subtree(&mut self, id: EntityId) {
        let Some(entity) = self.entities.remove(id) else {
            return;
        };
        for child in entity.children {
            self.despawn_subtree(child);
        }
    }

    /// Whether the id refers to a live entity
    pub fn contains_id(&self, id: EntityId) -> bool {
        self.entities.contains_key(id)
    }

    /// Number of live entities
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the registry holds no entities
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Iterate over all live entity ids
    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.keys()
    }

    /// Entity name, if the id is live
    pub fn name(&self, id: EntityId) -> Option<&str> {
        self.entities.get(id).map(|e| e.name.as_str())
    }

    /// Rename an entity. No-op on a stale id.
    pub fn set_name(&mut self, id: EntityId, name: &str) {
        if let Some(entity) = self.entities.get_mut(id) {
            entity.name = name.to_owned();
        }
    }

    pub(crate) fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    // ------------------------------------------------------------------
    // Component plumbing
    // ------------------------------------------------------------------

    /// Append a component to the entity's ordered component list.
    ///
    /// Adding a renderable changes the answer to the "collect self bounds"
    /// query, so the entity's local bounds are invalidated.
    pub fn add_component(&mut self, id: EntityId, component: Component) {
        let is_renderable = matches!(component, Component::Renderable(_));
        let Some(entity) = self.entities.get_mut(id) else {
            log::warn!("add_component on stale entity {id:?}");
            return;
        };
        entity.components.push(component);
        if is_renderable {
            self.invalidate_local_bounds(id);
        }
    }

    /// Remove the component at `index`. Out-of-range indices are programmer
    /// error: asserted in debug builds, logged no-op in release.
    pub fn remove_component_at(&mut self, id: EntityId, index: usize) -> Option<Component> {
        let entity = self.entities.get_mut(id)?;
        debug_assert!(
            index < entity.components.len(),
            "component index {index} out of range"
        );
        if index >= entity.components.len() {
            log::error!("component index {index} out of range for {id:?}");
            return None;
        }
        let removed = entity.components.remove(index);
        if matches!(removed, Component::Renderable(_)) {
            self.invalidate_local_bounds(id);
        }
        Some(removed)
    }

    /// The entity's components in attachment order
    pub fn components(&self, id: EntityId) -> &[Component] {
        self.entities.get(id).map_or(&[], |e| &e.components)
    }

    /// First renderable component on the entity, if any
    pub fn renderable(&self, id: EntityId) -> Option<&Renderable> {
        self.entities
            .get(id)?
            .components
            .iter()
            .find_map(Component::as_renderable)
    }

    /// Mutable access to the first renderable component
    pub fn renderable_mut(&mut self, id: EntityId) -> Option<&mut Renderable> {
        self.entities
            .get_mut(id)?
            .components
            .iter_mut()
            .find_map(Component::as_renderable_mut)
    }

    /// All renderable components on the entity, in order
    pub(crate) fn renderables(&self, id: EntityId) -> impl Iterator<Item = &Renderable> {
        self.entities
            .get(id)
            .into_iter()
            .flat_map(|e| e.components.iter().filter_map(Component::as_renderable))
    }

    /// First light component on the entity, if any
    pub fn light(&self, id: EntityId) -> Option<&Light> {
        self.entities
            .get(id)?
            .components
            .iter()
            .find_map(Component::as_light)
    }

    /// Replace the first renderable's local bounds and signal the change.
    ///
    /// This is the "my local bounds changed" entry point used by geometry
    /// rebuilds; it cascades self-local, self-world, then aggregate bounds.
    pub fn set_renderable_bounds(&mut self, id: EntityId, bounds: Aabb) {
        if let Some(renderable) = self.renderable_mut(id) {
            renderable.local_bounds = bounds;
            self.invalidate_local_bounds(id);
        }
    }

    // ------------------------------------------------------------------
    // Behaviour slot
    // ------------------------------------------------------------------

    /// Attach a behaviour, replacing any existing one. Starts enabled.
    pub fn set_behaviour(&mut self, id: EntityId, behaviour: Box<dyn Behaviour>) {
        if let Some(entity) = self.entities.get_mut(id) {
            entity.behaviour.attached = true;
            entity.behaviour.enabled = true;
            entity.behaviour.boxed = Some(behaviour);
        }
    }

    /// Enable or disable the behaviour without detaching it
    pub fn set_behaviour_enabled(&mut self, id: EntityId, enabled: bool) {
        if let Some(entity) = self.entities.get_mut(id) {
            entity.behaviour.enabled = enabled;
        }
    }

    /// Whether a behaviour is attached and enabled
    pub fn behaviour_enabled(&self, id: EntityId) -> bool {
        self.entities
            .get(id)
            .is_some_and(|e| e.behaviour.attached && e.behaviour.enabled)
    }

    /// Detach and return the entity's behaviour
    pub fn remove_behaviour(&mut self, id: EntityId) -> Option<Box<dyn Behaviour>> {
        let entity = self.entities.get_mut(id)?;
        entity.behaviour.attached = false;
        entity.behaviour.boxed.take()
    }

    /// Whether a behaviour is attached (true even while the boxed value is
    /// loaned out to an in-flight `update` call)
    pub fn has_behaviour(&self, id: EntityId) -> bool {
        self.entities.get(id).is_some_and(|e| e.behaviour.attached)
    }

    /// Loan the behaviour out for an update call; the slot stays attached.
    pub(crate) fn take_behaviour(&mut self, id: EntityId) -> Option<Box<dyn Behaviour>> {
        self.entities.get_mut(id)?.behaviour.boxed.take()
    }

    /// Return a loaned behaviour. Dropped if the entity was despawned or the
    /// behaviour was detached mid-update.
    pub(crate) fn restore_behaviour(&mut self, id: EntityId, behaviour: Box<dyn Behaviour>) {
        if let Some(entity) = self.entities.get_mut(id) {
            if entity.behaviour.attached {
                entity.behaviour.boxed = Some(behaviour);
            }
        }
    }
}
