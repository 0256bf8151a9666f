use std::rc::Rc;

use super::{SketchHandle, SketchRef};
use crate::constraint::Constraint;
use crate::entity::EntityId;
use crate::error::{require_positive, Result};
use crate::geometry::{shortest_signed_delta, Vector2};

/// Forces two lines' directions parallel, rotating the second around its
/// start point.
///
/// No error cache: a constraint here has no setters of its own, so an
/// external mutation of either line would invalidate a naive cache and the
/// crate's caching is only ever best-effort (see `crate::constraint::sketch`
/// module docs).
#[derive(Debug)]
pub struct ParallelConstraint {
    line1: SketchRef,
    line2: SketchRef,
    tolerance: f64,
}

impl ParallelConstraint {
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

impl Constraint for ParallelConstraint {
    fn name(&self) -> &'static str {
        "Parallel"
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
                let angle = cos.acos();
                angle.min(std::f64::consts::PI - angle)
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

        // smallest signed rotation of d2 onto either d1 or -d1 (lines have no
        // inherent sense, so both orientations count as "parallel")
        let to_pos = shortest_signed_delta(d2.y.atan2(d2.x), d1.y.atan2(d1.x));
        let to_neg = shortest_signed_delta(d2.y.atan2(d2.x), (-d1).y.atan2((-d1).x));
        let delta = if to_pos.abs() <= to_neg.abs() {
            to_pos
        } else {
            to_neg
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

    fn line_len(h: &SketchHandle) -> f64 {
        let b = h.borrow();
        (b.end_point().unwrap() - b.start_point().unwrap()).norm()
    }

    #[test]
    fn perpendicular_lines_report_quarter_pi_error() {
        let l1 = line(0.0, 0.0, 1.0, 0.0);
        let l2 = line(0.0, 0.0, 0.0, 1.0);
        let c = ParallelConstraint::new(&l1, &l2, 1e-6).unwrap();
        assert!((c.error() - std::f64::consts::FRAC_PI_2).abs() < 1e-9);
    }

    #[test]
    fn enforce_makes_lines_parallel_and_preserves_length() {
        let l1 = line(0.0, 0.0, 1.0, 0.0);
        let l2 = line(0.0, 0.0, 0.0, 1.0);
        let before_len = line_len(&l2);
        let c = ParallelConstraint::new(&l1, &l2, 1e-6).unwrap();
        assert!(c.enforce());
        assert!(c.is_satisfied());
        assert!((line_len(&l2) - before_len).abs() < 1e-6);
    }

    #[test]
    fn invalid_when_line_dropped() {
        let l1 = line(0.0, 0.0, 1.0, 0.0);
        let l2 = line(0.0, 0.0, 0.0, 1.0);
        let c = ParallelConstraint::new(&l1, &l2, 1e-6).unwrap();
        drop(l2);
        assert!(!c.is_valid());
        assert_eq!(c.error(), f64::INFINITY);
        assert!(!c.enforce());
    }
}
