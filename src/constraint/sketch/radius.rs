use std::rc::Rc;

use super::{SketchHandle, SketchRef};
use crate::constraint::Constraint;
use crate::entity::EntityId;
use crate::error::{require_positive, ArgumentError, Result};

/// Forces a circle or arc's radius to a target value, preserving center
/// (and, for arcs, start/end angles).
#[derive(Debug)]
pub struct RadiusConstraint {
    shape: SketchRef,
    target: f64,
    tolerance: f64,
}

impl RadiusConstraint {
    pub fn new(shape: &SketchHandle, target: f64, tolerance: f64) -> Result<Self> {
        require_positive("tolerance", tolerance)?;
        require_positive("target", target)?;
        if shape.borrow().radius().is_none() {
            return Err(ArgumentError::NullReference("shape"));
        }
        Ok(Self {
            shape: Rc::downgrade(shape),
            target,
            tolerance,
        })
    }
}

impl Constraint for RadiusConstraint {
    fn name(&self) -> &'static str {
        "Radius"
    }

    fn referenced_entities(&self) -> Vec<EntityId> {
        self.shape
            .upgrade()
            .map(|e| vec![e.borrow().id()])
            .unwrap_or_default()
    }

    fn error(&self) -> f64 {
        match self.shape.upgrade() {
            None => f64::INFINITY,
            Some(shape) => match shape.borrow().radius() {
                Some(r) => (r - self.target).abs(),
                None => f64::INFINITY,
            },
        }
    }

    fn enforce(&self) -> bool {
        let shape = match self.shape.upgrade() {
            Some(s) => s,
            None => return false,
        };
        let mut s = shape.borrow_mut();
        if s.radius().is_none() {
            return false;
        }
        s.set_radius(self.target);
        true
    }

    fn is_valid(&self) -> bool {
        self.shape
            .upgrade()
            .map(|s| s.borrow().radius().is_some())
            .unwrap_or(false)
    }

    fn constrained_dof(&self) -> u32 {
        1
    }

    fn tolerance(&self) -> f64 {
        self.tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::sketch::Circle;
    use crate::geometry::Vector2;
    use std::cell::RefCell;

    #[test]
    fn enforce_sets_radius_and_preserves_center() {
        let circle: SketchHandle = Rc::new(RefCell::new(Circle::new(Vector2::new(0.0, 0.0), 1.0).unwrap()));
        let c = RadiusConstraint::new(&circle, 2.0, 1e-6).unwrap();
        assert!(c.enforce());
        assert_eq!(circle.borrow().radius().unwrap(), 2.0);
        assert_eq!(circle.borrow().center().unwrap(), Vector2::new(0.0, 0.0));
    }

    #[test]
    fn construction_rejects_nonpositive_target() {
        let circle: SketchHandle = Rc::new(RefCell::new(Circle::new(Vector2::new(0.0, 0.0), 1.0).unwrap()));
        assert!(RadiusConstraint::new(&circle, 0.0, 1e-6).is_err());
    }
}
