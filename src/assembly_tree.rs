//! Assembly tree (C6): the hierarchical container for [`Component`]s, plus
//! the exploded-view presentation overlay.

use std::collections::HashMap;
use std::rc::Rc;

use crate::entity::component::{self, Component, ComponentHandle};
use crate::entity::EntityId;
use crate::geometry::Vector3;

/// Owns every live [`Component`] in an assembly: an ordered list of roots
/// plus an id-indexed lookup table. The sole owning root of the hierarchy —
/// constraints and children only ever hold non-owning handles into it.
#[derive(Debug, Default)]
pub struct AssemblyTree {
    roots: Vec<ComponentHandle>,
    index: HashMap<EntityId, ComponentHandle>,
    pub exploded_enabled: bool,
    explosion_factor: f64,
}

impl AssemblyTree {
    pub fn new() -> Self {
        Self {
            roots: Vec::new(),
            index: HashMap::new(),
            exploded_enabled: false,
            explosion_factor: 1.0,
        }
    }

    pub fn explosion_factor(&self) -> f64 {
        self.explosion_factor
    }

    pub fn set_explosion_factor(&mut self, factor: f64) {
        self.explosion_factor = factor.clamp(0.0, 1.0);
    }

    /// Adds a new component under `id`, parented under `parent` or as a root
    /// if `parent` is `None`. Rejects a duplicate id.
    pub fn add(
        &mut self,
        id: EntityId,
        name: impl Into<String>,
        parent: Option<EntityId>,
    ) -> bool {
        if self.index.contains_key(&id) {
            return false;
        }
        let handle = Component::with_id(id, name);
        match parent.and_then(|p| self.index.get(&p).cloned()) {
            Some(parent_handle) => component::add_child(&parent_handle, &handle),
            None => self.roots.push(handle.clone()),
        }
        self.index.insert(id, handle);
        true
    }

    /// Removes a component; its children are reparented to the root (the
    /// tree root list, not any particular other root) rather than orphaned.
    pub fn remove(&mut self, id: EntityId) -> bool {
        let handle = match self.index.remove(&id) {
            Some(h) => h,
            None => return false,
        };

        let parent = handle.borrow().parent().and_then(|p| p.upgrade());
        if let Some(parent) = &parent {
            component::remove_child(parent, &handle);
        } else {
            self.roots.retain(|r| r.borrow().id() != id);
        }

        let children: Vec<ComponentHandle> = handle.borrow().children().to_vec();
        for child in children {
            component::remove_child(&handle, &child);
            self.roots.push(child);
        }

        true
    }

    /// Reparents `id` under `new_parent` (or to root if `None`), rejecting a
    /// move that would create a cycle.
    pub fn move_component(&mut self, id: EntityId, new_parent: Option<EntityId>) -> bool {
        let handle = match self.index.get(&id) {
            Some(h) => h.clone(),
            None => return false,
        };

        if let Some(new_parent_id) = new_parent {
            if new_parent_id == id {
                return false;
            }
            let new_parent_handle = match self.index.get(&new_parent_id) {
                Some(h) => h.clone(),
                None => return false,
            };
            if self.is_descendant(&handle, &new_parent_handle) {
                return false;
            }
            let old_parent = handle.borrow().parent().and_then(|p| p.upgrade());
            if let Some(old_parent) = old_parent {
                component::remove_child(&old_parent, &handle);
            } else {
                self.roots.retain(|r| r.borrow().id() != id);
            }
            component::add_child(&new_parent_handle, &handle);
        } else {
            let old_parent = handle.borrow().parent().and_then(|p| p.upgrade());
            if let Some(old_parent) = old_parent {
                component::remove_child(&old_parent, &handle);
                self.roots.push(handle);
            }
            // already a root: no-op
        }
        true
    }

    /// True if `candidate_ancestor` is `node` or an ancestor of it, i.e.
    /// whether reparenting `node` under `candidate_ancestor` would cycle.
    fn is_descendant(&self, node: &ComponentHandle, candidate_ancestor: &ComponentHandle) -> bool {
        let mut current = candidate_ancestor.clone();
        loop {
            if Rc::ptr_eq(&current, node) {
                return true;
            }
            let parent = current.borrow().parent().and_then(|p| p.upgrade());
            match parent {
                Some(p) => current = p,
                None => return false,
            }
        }
    }

    pub fn find(&self, id: EntityId) -> Option<ComponentHandle> {
        self.index.get(&id).cloned()
    }

    pub fn roots(&self) -> &[ComponentHandle] {
        &self.roots
    }

    pub fn clear(&mut self) {
        self.roots.clear();
        self.index.clear();
    }

    pub fn size(&self) -> usize {
        self.index.len()
    }

    /// Cumulative exploded-view offset for `id`: walking from the component
    /// up to its root, summing `node.explode_offset * explosion_factor *
    /// node.explode_factor` at each step. Never mutates `position`.
    pub fn exploded_position(&self, id: EntityId) -> Vector3 {
        if !self.exploded_enabled || self.explosion_factor == 0.0 {
            return Vector3::zeros();
        }
        let mut offset = Vector3::zeros();
        let mut current = match self.index.get(&id) {
            Some(h) => Some(h.clone()),
            None => None,
        };
        while let Some(node) = current {
            let node_ref = node.borrow();
            offset += node_ref.explode_offset * self.explosion_factor * node_ref.explode_factor;
            current = node_ref.parent().and_then(|p| p.upgrade());
        }
        offset
    }

    /// Clears every component's per-node explode offset/factor and disables
    /// the overlay.
    pub fn reset_exploded_view(&mut self) {
        self.exploded_enabled = false;
        for handle in self.index.values() {
            let mut c = handle.borrow_mut();
            c.explode_offset = Vector3::zeros();
            c.explode_factor = 1.0;
        }
    }
}
