//! 3D rigid-body component (C1 component contract).
//!
//! A `Component` is always reached through a `Rc<RefCell<Component>>` handle
//! so that multiple constraints and the owning [`crate::assembly_tree::AssemblyTree`]
//! can share it; the tree holds strong references (it is the sole owning
//! root), constraints hold weak references that are revalidated on every use.

use crate::geometry::{Matrix4, UnitQuat, Vector3};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use super::EntityId;

pub type ComponentHandle = Rc<RefCell<Component>>;
pub type ComponentRef = Weak<RefCell<Component>>;

/// A rigid body in the assembly: identity, pose, hierarchy, and the
/// exploded-view presentation overlay.
#[derive(Debug)]
pub struct Component {
    id: EntityId,
    pub name: String,
    position: Vector3,
    orientation: UnitQuat,
    parent: Option<ComponentRef>,
    children: Vec<ComponentHandle>,
    pub visible: bool,
    pub explode_offset: Vector3,
    pub explode_factor: f64,
}

impl Component {
    /// Construct a new component with identity pose, at the origin, wrapped
    /// for shared ownership.
    pub fn new(name: impl Into<String>) -> ComponentHandle {
        Self::with_id(EntityId::new(), name)
    }

    /// Construct a new component under a caller-supplied id.
    pub fn with_id(id: EntityId, name: impl Into<String>) -> ComponentHandle {
        Rc::new(RefCell::new(Self {
            id,
            name: name.into(),
            position: Vector3::zeros(),
            orientation: UnitQuat::identity(),
            parent: None,
            children: Vec::new(),
            visible: true,
            explode_offset: Vector3::zeros(),
            explode_factor: 1.0,
        }))
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn position(&self) -> Vector3 {
        self.position
    }

    pub fn set_position(&mut self, position: Vector3) {
        self.position = position;
    }

    /// Orientation is always a unit quaternion; any value stored here has
    /// already been normalized by the caller (`UnitQuat` enforces this by
    /// construction).
    pub fn orientation(&self) -> UnitQuat {
        self.orientation
    }

    pub fn set_orientation(&mut self, orientation: UnitQuat) {
        self.orientation = orientation;
    }

    /// Derived 4x4 transform: rotation block from the orientation, translation
    /// block from the position, last row `(0, 0, 0, 1)`.
    pub fn transform(&self) -> Matrix4 {
        let mut m = self.orientation.to_homogeneous();
        m.fixed_view_mut::<3, 1>(0, 3).copy_from(&self.position);
        m
    }

    /// Extracts position from column 4 and the closest unit quaternion from
    /// the upper-left 3x3 block (via polar decomposition), so a non-orthogonal
    /// input still yields a valid orientation.
    pub fn set_transform(&mut self, m: Matrix4) {
        self.position = m.fixed_view::<3, 1>(0, 3).into_owned();
        let rot = m.fixed_view::<3, 3>(0, 0).into_owned();
        self.orientation = UnitQuat::from_matrix(&rot);
    }

    pub fn parent(&self) -> Option<ComponentRef> {
        self.parent.clone()
    }

    pub fn children(&self) -> &[ComponentHandle] {
        &self.children
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Adds `child` under `parent`, first detaching it from any previous parent.
///
/// Free function (rather than a `Component` method) because reparenting
/// mutates two distinct `RefCell`s; a method taking `&mut self` could not
/// also reach into the child's own borrow.
pub fn add_child(parent: &ComponentHandle, child: &ComponentHandle) {
    remove_from_current_parent(child);
    child.borrow_mut().parent = Some(Rc::downgrade(parent));
    parent.borrow_mut().children.push(child.clone());
}

/// Detaches `child` from `parent`'s children list and clears its parent link.
/// No-op if `child` is not actually a child of `parent`.
pub fn remove_child(parent: &ComponentHandle, child: &ComponentHandle) {
    let child_id = child.borrow().id();
    parent
        .borrow_mut()
        .children
        .retain(|c| c.borrow().id() != child_id);
    let current_parent = child.borrow().parent.clone().and_then(|p| p.upgrade());
    if let Some(current) = current_parent {
        if Rc::ptr_eq(&current, parent) {
            child.borrow_mut().parent = None;
        }
    }
}

fn remove_from_current_parent(child: &ComponentHandle) {
    let previous = child.borrow().parent.clone();
    if let Some(previous) = previous.and_then(|p| p.upgrade()) {
        let child_id = child.borrow().id();
        previous
            .borrow_mut()
            .children
            .retain(|c| c.borrow().id() != child_id);
    }
    child.borrow_mut().parent = None;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::EPSILON;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn transform_roundtrip_preserves_position_and_orientation_up_to_sign() {
        let c = Component::new("part");
        let pos = Vector3::new(1.0, 2.0, 3.0);
        let rot = UnitQuat::from_axis_angle(&Vector3::y_axis(), FRAC_PI_2);
        c.borrow_mut().set_position(pos);
        c.borrow_mut().set_orientation(rot);

        let m = c.borrow().transform();
        c.borrow_mut().set_transform(m);

        assert!((c.borrow().position() - pos).norm() < EPSILON);
        let recovered = c.borrow().orientation();
        let dot = recovered.coords.dot(&rot.coords);
        assert!((dot.abs() - 1.0).abs() < EPSILON);
    }

    #[test]
    fn add_child_detaches_from_previous_parent() {
        let root_a = Component::new("a");
        let root_b = Component::new("b");
        let child = Component::new("child");

        add_child(&root_a, &child);
        assert_eq!(root_a.borrow().children().len(), 1);

        add_child(&root_b, &child);
        assert_eq!(root_a.borrow().children().len(), 0);
        assert_eq!(root_b.borrow().children().len(), 1);
        assert!(Rc::ptr_eq(
            &child.borrow().parent().unwrap().upgrade().unwrap(),
            &root_b
        ));
    }

    #[test]
    fn remove_child_clears_parent_link() {
        let root = Component::new("root");
        let child = Component::new("child");
        add_child(&root, &child);
        remove_child(&root, &child);
        assert!(child.borrow().is_root());
        assert!(root.borrow().is_leaf());
    }

    #[test]
    fn is_root_and_is_leaf() {
        let root = Component::new("root");
        let child = Component::new("child");
        assert!(root.borrow().is_root());
        assert!(root.borrow().is_leaf());
        add_child(&root, &child);
        assert!(!root.borrow().is_leaf());
        assert!(!child.borrow().is_root());
        assert!(child.borrow().is_leaf());
    }
}
