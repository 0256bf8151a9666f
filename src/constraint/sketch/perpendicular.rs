use std::rc::Rc;

use super::{SketchHandle, SketchRef};
use crate::constraint::Constraint;
use crate::entity::EntityId;
use crate::error::{require_positive, Result};
use crate::geometry::{shortest_signed_delta, Vector2};

/// Forces two lines to meet at a right angle, rotating the second around its
/// start point by whichever of the two equivalent corrections is smaller.
#[derive(Debug)]
pub struct PerpendicularConstraint {
    line1: SketchRef,
    line2: SketchRef,
    tolerance: f64,
}

impl PerpendicularConstraint {
    pub fn new(line1: &SketchHandle, line2: &SketchHandle, tolerance: f64) -> Result<Self> {
        require_positive("tolerance", tolerance)?;
        Ok(Self {
            line1: Rc::downgrade(line1),
            line2: Rc::downgrade(line2),
            tolerance,
        })
    }

    fn directions(&self) -> Option<(Vector2, Vector2)> {
        let l1 = self.line1.upgrade()?;
        let l2 = self.line2.upgrade()?;
        let d1 = l1.borrow().direction()?;
        let d2 = l2.borrow().direction()?;
        Some((d1, d2))
    }
}

impl Constraint for PerpendicularConstraint {
    fn name(&self) -> &'static str {
        "Perpendicular"
    }

    fn referenced_entities(&self) -> Vec<EntityId> {
        [&self.line1, &self.line2]
            .iter()
            .filter_map(|w| w.upgrade())
            .map(|e| e.borrow().id())
            .collect()
    }

    fn error(&self) -> f64 {
        match self.directions() {
            None => f64::INFINITY,
            Some((d1, d2)) => {
                let cos = d1.dot(&d2).clamp(-1.0, 1.0);
                let angle = cos.acos().min(std::f64::consts::PI - cos.acos());
                (angle - std::f64::consts::FRAC_PI_2).abs()
            }
        }
    }

    fn enforce(&self) -> bool {
        if !self.is_valid() {
            return false;
        }
        let l1 = self.line1.upgrade().unwrap();
        let l2 = self.line2.upgrade().unwrap();
        let d1 = l1.borrow().direction().unwrap();
        let d2 = l2.borrow().direction().unwrap();

        let a1 = d1.y.atan2(d1.x);
        let a2 = d2.y.atan2(d2.x);
        // two directions 90deg from line1 in either sense; take the closer one
        let target_cw = a1 - std::f64::consts::FRAC_PI_2;
        let target_ccw = a1 + std::f64::consts::FRAC_PI_2;
        let delta_cw = shortest_signed_delta(a2, target_cw);
        let delta_ccw = shortest_signed_delta(a2, target_ccw);
        let delta = if delta_cw.abs() <= delta_ccw.abs() {
            delta_cw
        } else {
            delta_ccw
        };

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
    use std::cell::RefCell;

    fn line(sx: f64, sy: f64, ex: f64, ey: f64) -> SketchHandle {
        Rc::new(RefCell::new(
            Line::new(Vector2::new(sx, sy), Vector2::new(ex, ey)).unwrap(),
        ))
    }

    #[test]
    fn horizontal_and_vertical_are_satisfied() {
        let l1 = line(0.0, 0.0, 1.0, 0.0);
        let l2 = line(0.0, 0.0, 0.0, 1.0);
        let c = PerpendicularConstraint::new(&l1, &l2, 1e-6).unwrap();
        assert!(c.is_satisfied());
        assert!(c.error() < 1e-9);
    }

    #[test]
    fn enforce_prefers_90_over_270() {
        // line2 at 10deg off parallel with line1: nearest perpendicular
        // correction should be a small rotation, not a near-180 one
        let l1 = line(0.0, 0.0, 1.0, 0.0);
        let l2 = line(0.0, 0.0, 10f64.to_radians().cos(), 10f64.to_radians().sin());
        let before = l2.borrow().direction().unwrap();
        let c = PerpendicularConstraint::new(&l1, &l2, 1e-6).unwrap();
        assert!(c.enforce());
        assert!(c.is_satisfied());
        let after = l2.borrow().direction().unwrap();
        // should have rotated close to +80deg (to reach 90deg from line1),
        // not -260deg the long way around
        let rotated = after.y.atan2(after.x) - before.y.atan2(before.x);
        assert!(rotated.abs() < std::f64::consts::PI);
    }
}
