use std::rc::Rc;

use super::{SketchHandle, SketchRef};
use crate::constraint::Constraint;
use crate::entity::EntityId;
use crate::error::{require_positive, Result};
use crate::geometry::{Vector2, EPSILON};

/// Forces the distance between a line's two endpoints to a target value,
/// scaling the end point along the start-to-end direction.
#[derive(Debug)]
pub struct LengthConstraint {
    line: SketchRef,
    target: f64,
    tolerance: f64,
}

impl LengthConstraint {
    pub fn new(line: &SketchHandle, target: f64, tolerance: f64) -> Result<Self> {
        require_positive("tolerance", tolerance)?;
        require_positive("target", target)?;
        Ok(Self {
            line: Rc::downgrade(line),
            target,
            tolerance,
        })
    }

    fn current_length(&self) -> Option<f64> {
        let l = self.line.upgrade()?;
        let l = l.borrow();
        Some((l.end_point()? - l.start_point()?).norm())
    }
}

impl Constraint for LengthConstraint {
    fn name(&self) -> &'static str {
        "Length"
    }

    fn referenced_entities(&self) -> Vec<EntityId> {
        self.line
            .upgrade()
            .map(|e| vec![e.borrow().id()])
            .unwrap_or_default()
    }

    fn error(&self) -> f64 {
        match self.current_length() {
            None => f64::INFINITY,
            Some(current) => (current - self.target).abs(),
        }
    }

    fn enforce(&self) -> bool {
        let line = match self.line.upgrade() {
            Some(l) => l,
            None => return false,
        };
        let mut l = line.borrow_mut();
        let start = match l.start_point() {
            Some(p) => p,
            None => return false,
        };
        let end = match l.end_point() {
            Some(p) => p,
            None => return false,
        };
        let current = end - start;
        let len = current.norm();
        let direction = if len < EPSILON {
            Vector2::new(1.0, 0.0)
        } else {
            current / len
        };
        l.set_end_point(start + direction * self.target);
        true
    }

    fn is_valid(&self) -> bool {
        self.line.upgrade().is_some()
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

    #[test]
    fn enforce_scales_to_target_length() {
        let line: SketchHandle = Rc::new(RefCell::new(
            Line::new(Vector2::new(0.0, 0.0), Vector2::new(1.0, 0.0)).unwrap(),
        ));
        let c = LengthConstraint::new(&line, 5.0, 1e-6).unwrap();
        assert!(c.enforce());
        assert!(c.is_satisfied());
        let end = line.borrow().end_point().unwrap();
        assert!((end - Vector2::new(5.0, 0.0)).norm() < 1e-6);
    }

    #[test]
    fn degenerate_case_extends_along_positive_x() {
        let line: SketchHandle = Rc::new(RefCell::new(
            Line::new(Vector2::new(3.0, 3.0), Vector2::new(4.0, 3.0)).unwrap(),
        ));
        // collapse the line to near-zero length without going through the
        // constructor's degeneracy check, mirroring an external edit
        line.borrow_mut().set_end_point(Vector2::new(3.0, 3.0 + 1e-9));
        let c = LengthConstraint::new(&line, 2.0, 1e-6).unwrap();
        c.enforce();
        let end = line.borrow().end_point().unwrap();
        assert!((end - Vector2::new(5.0, 3.0)).norm() < 1e-4);
    }
}
