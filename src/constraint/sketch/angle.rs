use std::rc::Rc;

use super::{SketchHandle, SketchRef};
use crate::constraint::Constraint;
use crate::entity::EntityId;
use crate::error::{require_finite, require_positive, Result};
use crate::geometry::{normalize_angle_2pi, shortest_signed_delta};

/// Forces the directed angle from line1 to line2 to a target value in
/// `[0, 2*PI)`, rotating line2 around its start point.
#[derive(Debug)]
pub struct AngleConstraint {
    line1: SketchRef,
    line2: SketchRef,
    target: f64,
    tolerance: f64,
}

impl AngleConstraint {
    pub fn new(line1: &SketchHandle, line2: &SketchHandle, target: f64, tolerance: f64) -> Result<Self> {
        require_positive("tolerance", tolerance)?;
        require_finite("target", target)?;
        Ok(Self {
            line1: Rc::downgrade(line1),
            line2: Rc::downgrade(line2),
            target: normalize_angle_2pi(target),
            tolerance,
        })
    }

    fn current_angle(&self) -> Option<f64> {
        let l1 = self.line1.upgrade()?;
        let l2 = self.line2.upgrade()?;
        let d1 = l1.borrow().direction()?;
        let d2 = l2.borrow().direction()?;
        Some(normalize_angle_2pi(d2.y.atan2(d2.x) - d1.y.atan2(d1.x)))
    }
}

impl Constraint for AngleConstraint {
    fn name(&self) -> &'static str {
        "Angle"
    }

    fn referenced_entities(&self) -> Vec<EntityId> {
        [&self.line1, &self.line2]
            .iter()
            .filter_map(|w| w.upgrade())
            .map(|e| e.borrow().id())
            .collect()
    }

    fn error(&self) -> f64 {
        match self.current_angle() {
            None => f64::INFINITY,
            Some(current) => shortest_signed_delta(current, self.target).abs(),
        }
    }

    fn enforce(&self) -> bool {
        if !self.is_valid() {
            return false;
        }
        let current = self.current_angle().unwrap();
        let delta = shortest_signed_delta(current, self.target);
        let l2 = self.line2.upgrade().unwrap();
        let mut l2m = l2.borrow_mut();
        let pivot = l2m.start_point().unwrap();
        l2m.rotate(pivot, delta);
        true
    }

    fn is_valid(&self) -> bool {
        match (self.line1.upgrade(), self.line2.upgrade()) {
            (Some(a), Some(b)) => !a.borrow().is_degenerate() && !b.borrow().is_degenerate(),
            _ => false,
        }
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
    use crate::entity::sketch::Line;
    use crate::geometry::{Vector2, EPSILON};
    use std::cell::RefCell;

    #[test]
    fn enforce_rotates_to_45_degrees() {
        let l1: SketchHandle = Rc::new(RefCell::new(
            Line::new(Vector2::new(0.0, 0.0), Vector2::new(1.0, 0.0)).unwrap(),
        ));
        let l2: SketchHandle = Rc::new(RefCell::new(
            Line::new(Vector2::new(0.0, 0.0), Vector2::new(0.0, 1.0)).unwrap(),
        ));
        let target = std::f64::consts::FRAC_PI_4;
        let c = AngleConstraint::new(&l1, &l2, target, 1e-6).unwrap();
        assert!((c.error() - std::f64::consts::FRAC_PI_4).abs() < 1e-9);

        assert!(c.enforce());
        assert!(c.error() <= 1e-6);
        let end = l2.borrow().end_point().unwrap();
        let expected = Vector2::new(target.cos(), target.sin());
        assert!((end - expected).norm() < EPSILON);
    }
}
