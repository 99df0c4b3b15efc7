//! Transform hierarchy with lazy matrix recomputation
//!
//! Every entity owns local TRS state plus a tree of derived matrices, each
//! guarded by a dirty bit. Writes are cheap: they flip dirty bits and push an
//! idempotent invalidation wave down the subtree. Reads recompute at most once
//! per invalidation epoch and memoize.
//!
//! Invariants maintained here:
//! - `LOCAL` dirty implies the world-derived set is dirty, never the converse.
//! - Invalidating the world set on a node invalidates it on every descendant,
//!   short-circuiting on already-dirty nodes so one edit costs at most one
//!   visit per subtree node.
//! - The hierarchy is acyclic; `add_child` rejects any re-parenting that would
//!   make a node its own ancestor, before mutating anything.

use crate::error::SceneError;
use crate::foundation::math::{euler_degrees_to_quat, quat_to_euler_degrees, Mat4, Trs, Vec3};
use crate::object::registry::{EntityId, EntityRegistry};
use std::cell::Cell;

bitflags::bitflags! {
    /// One bit per cached derived value.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) struct Dirty: u8 {
        /// Local TRS composition
        const LOCAL = 1 << 0;
        /// Rotation-only local matrix
        const ROTATION = 1 << 1;
        /// Local-to-world matrix
        const WORLD = 1 << 2;
        /// World-to-local matrix
        const WORLD_INVERSE = 1 << 3;
        /// Inverse-transpose of local-to-world
        const WORLD_IT = 1 << 4;
        /// Rotation-only world matrix
        const WORLD_ROTATION = 1 << 5;
        /// Effective visibility
        const VISIBLE = 1 << 6;

        /// Everything downstream of the world matrix; set together, as one wave
        const WORLD_ALL = Self::WORLD.bits()
            | Self::WORLD_INVERSE.bits()
            | Self::WORLD_IT.bits()
            | Self::WORLD_ROTATION.bits();
    }
}

/// Local spatial state and the matrix cache tree of one entity.
///
/// Caches are `Cell`-backed so the whole read path works through `&self` on
/// the registry; the per-frame hot path never needs a mutable borrow.
pub struct TransformState {
    pub(crate) position: Vec3,
    pub(crate) euler_degrees: Vec3,
    pub(crate) scale: Vec3,
    pub(crate) visible: bool,

    pub(crate) dirty: Cell<Dirty>,
    local_matrix: Cell<Mat4>,
    rotation_matrix: Cell<Mat4>,
    local_to_world: Cell<Mat4>,
    world_to_local: Cell<Mat4>,
    world_inverse_transpose: Cell<Mat4>,
    world_rotation: Cell<Mat4>,
    global_visible: Cell<bool>,

    /// Bumped every time the world matrix is actually recomputed; render
    /// closures compare this to detect "moved since I last read".
    world_version: Cell<u64>,

    // Instrumentation: clean-to-dirty transitions and actual recomputes.
    pub(crate) invalidation_descents: Cell<u64>,
    pub(crate) world_recomputes: Cell<u64>,
}

impl Default for TransformState {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            euler_degrees: Vec3::zeros(),
            scale: Vec3::new(1.0, 1.0, 1.0),
            visible: true,
            dirty: Cell::new(Dirty::all()),
            local_matrix: Cell::new(Mat4::identity()),
            rotation_matrix: Cell::new(Mat4::identity()),
            local_to_world: Cell::new(Mat4::identity()),
            world_to_local: Cell::new(Mat4::identity()),
            world_inverse_transpose: Cell::new(Mat4::identity()),
            world_rotation: Cell::new(Mat4::identity()),
            global_visible: Cell::new(true),
            world_version: Cell::new(0),
            invalidation_descents: Cell::new(0),
            world_recomputes: Cell::new(0),
        }
    }
}

impl TransformState {
    fn mark(&self, flags: Dirty) {
        self.dirty.set(self.dirty.get() | flags);
    }

    fn clear(&self, flags: Dirty) {
        self.dirty.set(self.dirty.get() - flags);
    }

    fn is_dirty(&self, flags: Dirty) -> bool {
        self.dirty.get().intersects(flags)
    }
}

impl EntityRegistry {
    // ------------------------------------------------------------------
    // Local state
    // ------------------------------------------------------------------

    /// Local position. `None` on a stale id.
    pub fn local_position(&self, id: EntityId) -> Option<Vec3> {
        self.entity(id).map(|e| e.transform.position)
    }

    /// Local Euler angles in degrees (X, Y, Z)
    pub fn local_euler(&self, id: EntityId) -> Option<Vec3> {
        self.entity(id).map(|e| e.transform.euler_degrees)
    }

    /// Local scale factors
    pub fn local_scale(&self, id: EntityId) -> Option<Vec3> {
        self.entity(id).map(|e| e.transform.scale)
    }

    /// Set local position. Always succeeds on a live id; dirties the local
    /// matrix and kicks off the downward world invalidation.
    pub fn set_local_position(&mut self, id: EntityId, position: Vec3) {
        if let Some(entity) = self.entities.get_mut(id) {
            entity.transform.position = position;
            self.invalidate_local(id);
        }
    }

    /// Set local rotation as Euler angles in degrees (X, Y, Z)
    pub fn set_local_euler(&mut self, id: EntityId, euler_degrees: Vec3) {
        if let Some(entity) = self.entities.get_mut(id) {
            entity.transform.euler_degrees = euler_degrees;
            self.invalidate_local(id);
        }
    }

    /// Set local scale
    pub fn set_local_scale(&mut self, id: EntityId, scale: Vec3) {
        if let Some(entity) = self.entities.get_mut(id) {
            entity.transform.scale = scale;
            self.invalidate_local(id);
        }
    }

    fn invalidate_local(&self, id: EntityId) {
        if let Some(entity) = self.entity(id) {
            entity.transform.mark(Dirty::LOCAL | Dirty::ROTATION);
        }
        self.invalidate_world(id);
    }

    // ------------------------------------------------------------------
    // Local matrices
    // ------------------------------------------------------------------

    /// Local TRS matrix (scale, then rotate, then translate), recomputed
    /// lazily from the local fields and memoized.
    pub fn local_matrix(&self, id: EntityId) -> Result<Mat4, SceneError> {
        let entity = self.entity(id).ok_or(SceneError::StaleEntity(id))?;
        let t = &entity.transform;
        if t.is_dirty(Dirty::LOCAL) {
            let trs = Trs {
                position: t.position,
                rotation: euler_degrees_to_quat(t.euler_degrees),
                scale: t.scale,
            };
            t.local_matrix.set(trs.to_matrix());
            t.clear(Dirty::LOCAL);
        }
        Ok(t.local_matrix.get())
    }

    /// Rotation-only local matrix
    pub fn rotation_matrix(&self, id: EntityId) -> Result<Mat4, SceneError> {
        let entity = self.entity(id).ok_or(SceneError::StaleEntity(id))?;
        let t = &entity.transform;
        if t.is_dirty(Dirty::ROTATION) {
            t.rotation_matrix
                .set(euler_degrees_to_quat(t.euler_degrees).to_homogeneous());
            t.clear(Dirty::ROTATION);
        }
        Ok(t.rotation_matrix.get())
    }

    /// Replace the local matrix directly. The matrix is decomposed back into
    /// position, Euler angles, and scale, but the given matrix stays
    /// authoritative: it is cached as-is so a lossy decomposition never leaks
    /// into the world-matrix chain.
    pub fn set_local_matrix(&mut self, id: EntityId, matrix: Mat4) {
        let Some(entity) = self.entities.get_mut(id) else {
            return;
        };
        let trs = Trs::from_matrix(matrix);
        let t = &mut entity.transform;
        t.position = trs.position;
        t.euler_degrees = quat_to_euler_degrees(&trs.rotation);
        t.scale = trs.scale;
        t.local_matrix.set(matrix);
        t.rotation_matrix.set(trs.rotation.to_homogeneous());
        t.clear(Dirty::LOCAL | Dirty::ROTATION);
        self.invalidate_world(id);
    }

    // ------------------------------------------------------------------
    // World matrices
    // ------------------------------------------------------------------

    /// Local-to-world matrix: the local matrix composed through every
    /// ancestor. Lazy and memoized; recomputing bumps the entity's world
    /// version (the "recomputed" notification).
    pub fn local_to_world(&self, id: EntityId) -> Result<Mat4, SceneError> {
        let entity = self.entity(id).ok_or(SceneError::StaleEntity(id))?;
        let t = &entity.transform;
        if t.is_dirty(Dirty::WORLD) {
            let local = self.local_matrix(id)?;
            let world = match entity.parent {
                Some(parent) => self.local_to_world(parent)? * local,
                None => local,
            };
            t.local_to_world.set(world);
            t.clear(Dirty::WORLD);
            t.world_version.set(t.world_version.get() + 1);
            t.world_recomputes.set(t.world_recomputes.get() + 1);
        }
        Ok(t.local_to_world.get())
    }

    /// Replace the world matrix: the parent's world transform is stripped off
    /// and the remainder becomes the new local matrix.
    pub fn set_local_to_world(&mut self, id: EntityId, matrix: Mat4) -> Result<(), SceneError> {
        let parent = self
            .entity(id)
            .ok_or(SceneError::StaleEntity(id))?
            .parent;
        let local = match parent {
            Some(parent) => self.world_to_local(parent)? * matrix,
            None => matrix,
        };
        self.set_local_matrix(id, local);
        Ok(())
    }

    /// World-to-local matrix, derived from the world matrix on demand
    pub fn world_to_local(&self, id: EntityId) -> Result<Mat4, SceneError> {
        let world = self.local_to_world(id)?;
        let entity = self.entity(id).ok_or(SceneError::StaleEntity(id))?;
        let t = &entity.transform;
        if t.is_dirty(Dirty::WORLD_INVERSE) {
            let inverse = world.try_inverse().unwrap_or_else(|| {
                log::warn!("singular world matrix on {id:?}, using identity inverse");
                Mat4::identity()
            });
            t.world_to_local.set(inverse);
            t.clear(Dirty::WORLD_INVERSE);
        }
        Ok(t.world_to_local.get())
    }

    /// Inverse-transpose of the world matrix (normal matrix)
    pub fn world_inverse_transpose(&self, id: EntityId) -> Result<Mat4, SceneError> {
        let inverse = self.world_to_local(id)?;
        let entity = self.entity(id).ok_or(SceneError::StaleEntity(id))?;
        let t = &entity.transform;
        if t.is_dirty(Dirty::WORLD_IT) {
            t.world_inverse_transpose.set(inverse.transpose());
            t.clear(Dirty::WORLD_IT);
        }
        Ok(t.world_inverse_transpose.get())
    }

    /// Rotation-only world matrix, extracted from the world matrix
    pub fn world_rotation(&self, id: EntityId) -> Result<Mat4, SceneError> {
        let world = self.local_to_world(id)?;
        let entity = self.entity(id).ok_or(SceneError::StaleEntity(id))?;
        let t = &entity.transform;
        if t.is_dirty(Dirty::WORLD_ROTATION) {
            t.world_rotation
                .set(Trs::from_matrix(world).rotation.to_homogeneous());
            t.clear(Dirty::WORLD_ROTATION);
        }
        Ok(t.world_rotation.get())
    }

    /// Position of the entity in world space
    pub fn world_position(&self, id: EntityId) -> Result<Vec3, SceneError> {
        let world = self.local_to_world(id)?;
        Ok(Vec3::new(world.m14, world.m24, world.m34))
    }

    /// Monotonic counter bumped on each world-matrix recompute
    pub fn world_version(&self, id: EntityId) -> Option<u64> {
        self.entity(id).map(|e| e.transform.world_version.get())
    }

    /// Downward invalidation wave: marks the whole world-derived set dirty on
    /// this node and every descendant. Returns immediately when the set is
    /// already fully dirty, so repeated edits cost one descent, not many.
    pub(crate) fn invalidate_world(&self, id: EntityId) {
        let Some(entity) = self.entity(id) else {
            return;
        };
        let t = &entity.transform;
        if t.dirty.get().contains(Dirty::WORLD_ALL) {
            return;
        }
        t.mark(Dirty::WORLD_ALL);
        t.invalidation_descents.set(t.invalidation_descents.get() + 1);
        // Geometry moved in world space, so both bounds layers above the
        // local one are stale too.
        self.invalidate_self_world_bounds(id);
        for &child in &entity.children {
            self.invalidate_world(child);
        }
    }

    // ------------------------------------------------------------------
    // Visibility
    // ------------------------------------------------------------------

    /// The entity's own visibility flag
    pub fn visible(&self, id: EntityId) -> Option<bool> {
        self.entity(id).map(|e| e.transform.visible)
    }

    /// Set the entity's own visibility flag, invalidating effective
    /// visibility across the subtree
    pub fn set_visible(&mut self, id: EntityId, visible: bool) {
        if let Some(entity) = self.entities.get_mut(id) {
            if entity.transform.visible != visible {
                entity.transform.visible = visible;
                self.invalidate_visible(id);
            }
        }
    }

    /// Effective visibility: own flag ANDed through every ancestor
    pub fn global_visible(&self, id: EntityId) -> Result<bool, SceneError> {
        let entity = self.entity(id).ok_or(SceneError::StaleEntity(id))?;
        let t = &entity.transform;
        if t.is_dirty(Dirty::VISIBLE) {
            let inherited = match entity.parent {
                Some(parent) => self.global_visible(parent)?,
                None => true,
            };
            t.global_visible.set(t.visible && inherited);
            t.clear(Dirty::VISIBLE);
        }
        Ok(t.global_visible.get())
    }

    /// Same idempotent downward wave as the world invalidation, independently
    /// for effective visibility
    pub(crate) fn invalidate_visible(&self, id: EntityId) {
        let Some(entity) = self.entity(id) else {
            return;
        };
        let t = &entity.transform;
        if t.is_dirty(Dirty::VISIBLE) {
            return;
        }
        t.mark(Dirty::VISIBLE);
        for &child in &entity.children {
            self.invalidate_visible(child);
        }
    }

    // ------------------------------------------------------------------
    // Hierarchy
    // ------------------------------------------------------------------

    /// The entity's parent, if any
    pub fn parent(&self, id: EntityId) -> Option<EntityId> {
        self.entity(id).and_then(|e| e.parent)
    }

    /// The entity's children, in order; last-added iterates last
    pub fn children(&self, id: EntityId) -> &[EntityId] {
        self.entity(id).map_or(&[], |e| &e.children)
    }

    /// Attach `child` under `parent`, at the end of the child order.
    ///
    /// Stale ids are a silent no-op (the defensive "nothing to add" case).
    /// Re-adding a direct child moves it to the end without structural
    /// effects. Fails with [`SceneError::WouldCreateCycle`] before mutating
    /// anything if `child` already contains `parent`.
    pub fn add_child(&mut self, parent: EntityId, child: EntityId) -> Result<(), SceneError> {
        if !self.entities.contains_key(parent) || !self.entities.contains_key(child) {
            return Ok(());
        }

        if self.parent(child) == Some(parent) {
            let entity = &mut self.entities[parent];
            entity.children.retain(|&c| c != child);
            entity.children.push(child);
            return Ok(());
        }

        if self.contains(child, parent) {
            log::error!("add_child rejected: {child:?} already contains {parent:?}");
            return Err(SceneError::WouldCreateCycle { parent, child });
        }

        if let Some(old_parent) = self.parent(child) {
            self.entities[old_parent].children.retain(|&c| c != child);
            self.invalidate_world_bounds(old_parent);
        }

        self.entities[child].parent = Some(parent);
        self.entities[parent].children.push(child);

        // New ancestry: world matrices and visibility of the child subtree
        // changed basis. The downward wave short-circuits when the child is
        // already fully dirty, so the new parent's aggregate bounds must be
        // invalidated directly, not via the child's upward wave.
        self.invalidate_world(child);
        self.invalidate_visible(child);
        self.invalidate_world_bounds(parent);
        Ok(())
    }

    /// Detach `child` from `parent`. Logged no-op when `child` is not a
    /// direct child; silent no-op on stale ids.
    pub fn remove_child(&mut self, parent: EntityId, child: EntityId) {
        if !self.entities.contains_key(parent) || !self.entities.contains_key(child) {
            return;
        }
        if self.parent(child) != Some(parent) {
            log::warn!("remove_child: {child:?} is not a child of {parent:?}");
            return;
        }
        self.detach(parent, child);
    }

    /// Detach the child at `index`. Out-of-range indices are programmer
    /// error: asserted in debug builds, logged no-op in release.
    pub fn remove_child_at(&mut self, parent: EntityId, index: usize) {
        let count = self.children(parent).len();
        debug_assert!(index < count, "child index {index} out of range");
        if index >= count {
            log::error!("remove_child_at: index {index} out of range for {parent:?}");
            return;
        }
        let child = self.children(parent)[index];
        self.detach(parent, child);
    }

    fn detach(&mut self, parent: EntityId, child: EntityId) {
        // Clear the back-reference before anything can observe the child.
        self.entities[child].parent = None;
        self.entities[parent].children.retain(|&c| c != child);
        self.invalidate_world(child);
        self.invalidate_visible(child);
        self.invalidate_world_bounds(parent);
    }

    /// Depth-first search by entity name, starting at `root` (inclusive).
    /// Returns the first match in pre-order.
    pub fn find(&self, root: EntityId, name: &str) -> Option<EntityId> {
        let entity = self.entity(root)?;
        if entity.name == name {
            return Some(root);
        }
        entity
            .children
            .iter()
            .find_map(|&child| self.find(child, name))
    }

    /// True iff `other` is `root` or a transitive descendant of `root`.
    /// Implemented by walking upward from `other` through parent links.
    pub fn contains(&self, root: EntityId, other: EntityId) -> bool {
        let mut current = Some(other);
        while let Some(id) = current {
            if id == root {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Lazily-evaluated per-draw matrix accessors for one entity
    pub fn draw_uniforms(&self, id: EntityId) -> DrawUniforms<'_> {
        DrawUniforms { registry: self, entity: id }
    }
}

/// Deferred matrix accessors handed to the renderer.
///
/// Nothing is computed at construction: the renderer reads the latest cache at
/// submission time, even if the transform was invalidated after this value was
/// created.
pub struct DrawUniforms<'a> {
    registry: &'a EntityRegistry,
    entity: EntityId,
}

impl DrawUniforms<'_> {
    /// Model (local-to-world) matrix
    pub fn model_matrix(&self) -> Result<Mat4, SceneError> {
        self.registry.local_to_world(self.entity)
    }

    /// Normal matrix (inverse-transpose of the model matrix)
    pub fn normal_matrix(&self) -> Result<Mat4, SceneError> {
        self.registry.world_inverse_transpose(self.entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn chain(registry: &mut EntityRegistry, depth: usize) -> Vec<EntityId> {
        let mut ids = vec![registry.spawn("root")];
        for i in 1..depth {
            let id = registry.spawn(&format!("node{i}"));
            registry.add_child(ids[i - 1], id).unwrap();
            ids.push(id);
        }
        ids
    }

    #[test]
    fn test_lazy_world_matrix_reflects_parent_move() {
        let mut registry = EntityRegistry::new();
        let ids = chain(&mut registry, 4);

        // Prime every cache
        for &id in &ids {
            registry.local_to_world(id).unwrap();
        }

        registry.set_local_position(ids[0], Vec3::new(5.0, 0.0, 0.0));

        // Reading a deep descendant reflects the root move with no explicit
        // recompute call in between
        let leaf_pos = registry.world_position(ids[3]).unwrap();
        assert_relative_eq!(leaf_pos, Vec3::new(5.0, 0.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn test_recompute_happens_at_most_once_per_mutation() {
        let mut registry = EntityRegistry::new();
        let ids = chain(&mut registry, 3);

        for &id in &ids {
            registry.local_to_world(id).unwrap();
        }
        let before: Vec<u64> = ids
            .iter()
            .map(|&id| registry.entity(id).unwrap().transform.world_recomputes.get())
            .collect();

        registry.set_local_position(ids[0], Vec3::new(1.0, 2.0, 3.0));

        // Several reads, one recompute per node
        for _ in 0..3 {
            for &id in &ids {
                registry.local_to_world(id).unwrap();
            }
        }
        for (i, &id) in ids.iter().enumerate() {
            let after = registry.entity(id).unwrap().transform.world_recomputes.get();
            assert_eq!(after, before[i] + 1, "node {i} recomputed more than once");
        }
    }

    #[test]
    fn test_invalidation_is_idempotent() {
        let mut registry = EntityRegistry::new();
        let ids = chain(&mut registry, 3);
        for &id in &ids {
            registry.local_to_world(id).unwrap();
        }

        let before: Vec<u64> = ids
            .iter()
            .map(|&id| registry.entity(id).unwrap().transform.invalidation_descents.get())
            .collect();

        // Two invalidations without a read in between: the second wave must
        // short-circuit at the root
        registry.invalidate_world(ids[0]);
        registry.invalidate_world(ids[0]);

        for (i, &id) in ids.iter().enumerate() {
            let after = registry.entity(id).unwrap().transform.invalidation_descents.get();
            assert_eq!(after, before[i] + 1, "node {i} was descended into twice");
        }
    }

    #[test]
    fn test_local_dirty_does_not_require_child_local_recompute() {
        let mut registry = EntityRegistry::new();
        let ids = chain(&mut registry, 2);
        registry.set_local_position(ids[1], Vec3::new(1.0, 0.0, 0.0));
        registry.local_to_world(ids[1]).unwrap();

        // Parent move dirties the child's world set but not its local matrix
        registry.set_local_position(ids[0], Vec3::new(9.0, 0.0, 0.0));
        let child = registry.entity(ids[1]).unwrap();
        assert!(child.transform.is_dirty(Dirty::WORLD));
        assert!(!child.transform.is_dirty(Dirty::LOCAL));
    }

    #[test]
    fn test_cycle_rejected_without_mutation() {
        let mut registry = EntityRegistry::new();
        let a = registry.spawn("a");
        let b = registry.spawn("b");
        registry.add_child(a, b).unwrap();

        let err = registry.add_child(b, a);
        assert_eq!(err, Err(SceneError::WouldCreateCycle { parent: b, child: a }));

        // Both child lists unchanged from their pre-call state
        assert_eq!(registry.children(a), &[b]);
        assert!(registry.children(b).is_empty());
        assert_eq!(registry.parent(a), None);
        assert_eq!(registry.parent(b), Some(a));
    }

    #[test]
    fn test_self_adoption_rejected() {
        let mut registry = EntityRegistry::new();
        let a = registry.spawn("a");
        assert!(registry.add_child(a, a).is_err());
        assert!(registry.children(a).is_empty());
    }

    #[test]
    fn test_readd_moves_child_to_end() {
        let mut registry = EntityRegistry::new();
        let root = registry.spawn("root");
        let a = registry.spawn("a");
        let b = registry.spawn("b");

        registry.add_child(root, a).unwrap();
        registry.add_child(root, b).unwrap();
        registry.add_child(root, a).unwrap();

        assert_eq!(registry.children(root), &[b, a]);
        assert_eq!(registry.parent(a), Some(root));
    }

    #[test]
    fn test_reparent_detaches_from_old_parent() {
        let mut registry = EntityRegistry::new();
        let p1 = registry.spawn("p1");
        let p2 = registry.spawn("p2");
        let child = registry.spawn("child");

        registry.add_child(p1, child).unwrap();
        registry.add_child(p2, child).unwrap();

        assert!(registry.children(p1).is_empty());
        assert_eq!(registry.children(p2), &[child]);
        assert_eq!(registry.parent(child), Some(p2));
    }

    #[test]
    fn test_remove_child_clears_parent_and_world_basis() {
        let mut registry = EntityRegistry::new();
        let root = registry.spawn("root");
        let child = registry.spawn("child");
        registry.add_child(root, child).unwrap();
        registry.set_local_position(root, Vec3::new(3.0, 0.0, 0.0));
        registry.set_local_position(child, Vec3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(
            registry.world_position(child).unwrap(),
            Vec3::new(4.0, 0.0, 0.0),
            epsilon = 1e-5
        );

        registry.remove_child(root, child);

        assert_eq!(registry.parent(child), None);
        assert!(registry.children(root).is_empty());
        // Detached node is its own root again
        assert_relative_eq!(
            registry.world_position(child).unwrap(),
            Vec3::new(1.0, 0.0, 0.0),
            epsilon = 1e-5
        );
    }

    #[test]
    fn test_remove_child_not_present_is_noop() {
        let mut registry = EntityRegistry::new();
        let root = registry.spawn("root");
        let stranger = registry.spawn("stranger");
        registry.remove_child(root, stranger);
        assert_eq!(registry.parent(stranger), None);
    }

    #[test]
    fn test_trs_roundtrip_through_set_local_matrix() {
        let mut registry = EntityRegistry::new();
        let e = registry.spawn("e");
        let source = Trs {
            position: Vec3::new(1.0, 2.0, 3.0),
            rotation: euler_degrees_to_quat(Vec3::new(0.0, 90.0, 0.0)),
            scale: Vec3::new(2.0, 2.0, 2.0),
        };

        registry.set_local_matrix(e, source.to_matrix());

        assert_relative_eq!(
            registry.local_position(e).unwrap(),
            Vec3::new(1.0, 2.0, 3.0),
            epsilon = 1e-4
        );
        assert_relative_eq!(
            registry.local_euler(e).unwrap(),
            Vec3::new(0.0, 90.0, 0.0),
            epsilon = 1e-4
        );
        assert_relative_eq!(
            registry.local_scale(e).unwrap(),
            Vec3::new(2.0, 2.0, 2.0),
            epsilon = 1e-4
        );
        // The supplied matrix is authoritative, no recompute round-trip
        assert_relative_eq!(
            registry.local_matrix(e).unwrap(),
            source.to_matrix(),
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_set_local_to_world_strips_parent_transform() {
        let mut registry = EntityRegistry::new();
        let root = registry.spawn("root");
        let child = registry.spawn("child");
        registry.add_child(root, child).unwrap();
        registry.set_local_position(root, Vec3::new(10.0, 0.0, 0.0));

        let target = Mat4::new_translation(&Vec3::new(12.0, 5.0, 0.0));
        registry.set_local_to_world(child, target).unwrap();

        assert_relative_eq!(
            registry.local_position(child).unwrap(),
            Vec3::new(2.0, 5.0, 0.0),
            epsilon = 1e-4
        );
        assert_relative_eq!(registry.local_to_world(child).unwrap(), target, epsilon = 1e-4);
    }

    #[test]
    fn test_world_to_local_inverts_world() {
        let mut registry = EntityRegistry::new();
        let ids = chain(&mut registry, 2);
        registry.set_local_position(ids[0], Vec3::new(1.0, 2.0, 3.0));
        registry.set_local_euler(ids[1], Vec3::new(0.0, 45.0, 0.0));

        let world = registry.local_to_world(ids[1]).unwrap();
        let inverse = registry.world_to_local(ids[1]).unwrap();
        assert_relative_eq!(world * inverse, Mat4::identity(), epsilon = 1e-5);

        let normal = registry.world_inverse_transpose(ids[1]).unwrap();
        assert_relative_eq!(normal, inverse.transpose(), epsilon = 1e-6);
    }

    #[test]
    fn test_global_visibility_propagates_down() {
        let mut registry = EntityRegistry::new();
        let ids = chain(&mut registry, 3);

        assert!(registry.global_visible(ids[2]).unwrap());

        registry.set_visible(ids[0], false);
        assert!(!registry.global_visible(ids[2]).unwrap());
        assert!(registry.visible(ids[2]).unwrap(), "own flag untouched");

        registry.set_visible(ids[0], true);
        assert!(registry.global_visible(ids[2]).unwrap());
    }

    #[test]
    fn test_contains_both_directions() {
        let mut registry = EntityRegistry::new();
        let ids = chain(&mut registry, 3);

        // Descendant direction
        assert!(registry.contains(ids[0], ids[2]));
        assert!(registry.contains(ids[0], ids[0]));
        // Reversed reading must be false
        assert!(!registry.contains(ids[2], ids[0]));
        assert!(!registry.contains(ids[1], ids[0]));
    }

    #[test]
    fn test_find_depth_first_by_name() {
        let mut registry = EntityRegistry::new();
        let root = registry.spawn("root");
        let a = registry.spawn("branch");
        let b = registry.spawn("leaf");
        let c = registry.spawn("leaf");
        registry.add_child(root, a).unwrap();
        registry.add_child(a, b).unwrap();
        registry.add_child(root, c).unwrap();

        // Pre-order: the leaf under the first branch wins
        assert_eq!(registry.find(root, "leaf"), Some(b));
        assert_eq!(registry.find(root, "missing"), None);
    }

    #[test]
    fn test_draw_uniforms_read_latest_cache() {
        let mut registry = EntityRegistry::new();
        let e = registry.spawn("e");
        let uniforms_entity = e;

        registry.set_local_position(e, Vec3::new(1.0, 0.0, 0.0));
        let v1 = registry.world_version(e);
        registry.local_to_world(e).unwrap();

        // Invalidate after the uniforms would have been scheduled; the read
        // still sees the newest value
        registry.set_local_position(e, Vec3::new(7.0, 0.0, 0.0));
        let uniforms = registry.draw_uniforms(uniforms_entity);
        let model = uniforms.model_matrix().unwrap();
        assert_relative_eq!(model.m14, 7.0, epsilon = 1e-6);
        assert!(registry.world_version(e) > v1);
    }
}
