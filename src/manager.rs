//! Manager façade (C8): curates the active constraint set, routes
//! add/remove, and dedups by identity.

use std::collections::HashMap;
use std::rc::Rc;

use crate::auto_detect::AutoDetector;
use crate::constraint::Constraint;

/// Single insertion point for constraints into the active set. Wraps an
/// [`AutoDetector`] and a per-kind visibility filter, but does not itself
/// drive a [`crate::solver::AssemblySolver`] — callers feed `active()` into
/// one.
#[derive(Default)]
pub struct ConstraintManager {
    active: Vec<Rc<dyn Constraint>>,
    visibility: HashMap<&'static str, bool>,
    detector: AutoDetector,
}

impl ConstraintManager {
    pub fn new(auto_detector: AutoDetector) -> Self {
        Self {
            active: Vec::new(),
            visibility: HashMap::new(),
            detector: auto_detector,
        }
    }

    /// Adds a constraint, rejecting a pointer-identical duplicate. Returns
    /// whether the active set changed.
    pub fn add(&mut self, constraint: Rc<dyn Constraint>) -> bool {
        if self.active.iter().any(|c| Rc::ptr_eq(c, &constraint)) {
            return false;
        }
        self.active.push(constraint);
        true
    }

    pub fn remove(&mut self, constraint: &Rc<dyn Constraint>) -> bool {
        let len_before = self.active.len();
        self.active.retain(|c| !Rc::ptr_eq(c, constraint));
        self.active.len() != len_before
    }

    /// Prunes constraints whose `is_valid()` is currently false. Returns
    /// whether anything was removed.
    pub fn refresh(&mut self) -> bool {
        let len_before = self.active.len();
        self.active.retain(|c| c.is_valid());
        self.active.len() != len_before
    }

    pub fn active(&self) -> &[Rc<dyn Constraint>] {
        &self.active
    }

    pub fn is_visible(&self, kind: &'static str) -> bool {
        *self.visibility.get(kind).unwrap_or(&true)
    }

    pub fn set_visible(&mut self, kind: &'static str, visible: bool) {
        self.visibility.insert(kind, visible);
    }

    pub fn auto_enabled(&self) -> bool {
        self.detector.enabled
    }

    pub fn set_auto_enabled(&mut self, enabled: bool) {
        self.detector.enabled = enabled;
    }

    pub fn sensitivity(&self) -> f64 {
        self.detector.sensitivity()
    }

    pub fn set_sensitivity(&mut self, sensitivity: f64) {
        self.detector.set_sensitivity(sensitivity);
    }

    pub fn detector(&self) -> &AutoDetector {
        &self.detector
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::sketch::RadiusConstraint;
    use crate::entity::sketch::{Circle, SketchPrimitive};
    use crate::geometry::Vector2;
    use std::cell::RefCell;

    #[test]
    fn add_rejects_duplicate_by_identity() {
        let circle: Rc<RefCell<dyn SketchPrimitive>> =
            Rc::new(RefCell::new(Circle::new(Vector2::new(0.0, 0.0), 1.0).unwrap()));
        let constraint: Rc<dyn Constraint> =
            Rc::new(RadiusConstraint::new(&circle, 2.0, 1e-6).unwrap());
        let mut manager = ConstraintManager::new(AutoDetector::default());
        assert!(manager.add(constraint.clone()));
        assert!(!manager.add(constraint));
        assert_eq!(manager.active().len(), 1);
    }

    #[test]
    fn refresh_prunes_invalid_constraints() {
        let circle: Rc<RefCell<dyn SketchPrimitive>> =
            Rc::new(RefCell::new(Circle::new(Vector2::new(0.0, 0.0), 1.0).unwrap()));
        let constraint: Rc<dyn Constraint> =
            Rc::new(RadiusConstraint::new(&circle, 2.0, 1e-6).unwrap());
        let mut manager = ConstraintManager::new(AutoDetector::default());
        manager.add(constraint);
        drop(circle);
        assert!(manager.refresh());
        assert!(manager.active().is_empty());
    }

    #[test]
    fn remove_missing_constraint_returns_false() {
        let circle: Rc<RefCell<dyn SketchPrimitive>> =
            Rc::new(RefCell::new(Circle::new(Vector2::new(0.0, 0.0), 1.0).unwrap()));
        let constraint: Rc<dyn Constraint> =
            Rc::new(RadiusConstraint::new(&circle, 2.0, 1e-6).unwrap());
        let mut manager = ConstraintManager::new(AutoDetector::default());
        assert!(!manager.remove(&constraint));
    }
}
