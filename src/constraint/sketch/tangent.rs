use std::rc::Rc;

use super::{SketchHandle, SketchRef};
use crate::constraint::Constraint;
use crate::entity::EntityId;
use crate::error::{require_positive, ArgumentError, Result};
use crate::geometry::EPSILON;

#[derive(Debug)]
enum Mode {
    LineCircle { line: SketchRef, circle: SketchRef },
    CircleCircle { circle1: SketchRef, circle2: SketchRef },
}

/// Tangency between a line and a circle, or between two circles (external
/// tangency only).
#[derive(Debug)]
pub struct TangentConstraint {
    mode: Mode,
    tolerance: f64,
}

impl TangentConstraint {
    pub fn line_circle(line: &SketchHandle, circle: &SketchHandle, tolerance: f64) -> Result<Self> {
        require_positive("tolerance", tolerance)?;
        if line.borrow().is_degenerate() {
            return Err(ArgumentError::DegenerateEntity("line"));
        }
        let radius = circle
            .borrow()
            .radius()
            .ok_or(ArgumentError::NullReference("circle"))?;
        if radius <= 0.0 {
            return Err(ArgumentError::NotPositive("radius", radius));
        }
        Ok(Self {
            mode: Mode::LineCircle {
                line: Rc::downgrade(line),
                circle: Rc::downgrade(circle),
            },
            tolerance,
        })
    }

    pub fn circle_circle(
        circle1: &SketchHandle,
        circle2: &SketchHandle,
        tolerance: f64,
    ) -> Result<Self> {
        require_positive("tolerance", tolerance)?;
        let r1 = circle1
            .borrow()
            .radius()
            .ok_or(ArgumentError::NullReference("circle1"))?;
        let r2 = circle2
            .borrow()
            .radius()
            .ok_or(ArgumentError::NullReference("circle2"))?;
        if r1 <= 0.0 {
            return Err(ArgumentError::NotPositive("radius1", r1));
        }
        if r2 <= 0.0 {
            return Err(ArgumentError::NotPositive("radius2", r2));
        }
        let c1 = circle1.borrow().center().unwrap();
        let c2 = circle2.borrow().center().unwrap();
        if (c1 - c2).norm() < EPSILON {
            return Err(ArgumentError::CoincidentCircles);
        }
        Ok(Self {
            mode: Mode::CircleCircle {
                circle1: Rc::downgrade(circle1),
                circle2: Rc::downgrade(circle2),
            },
            tolerance,
        })
    }
}

impl Constraint for TangentConstraint {
    fn name(&self) -> &'static str {
        "Tangent"
    }

    fn referenced_entities(&self) -> Vec<EntityId> {
        match &self.mode {
            Mode::LineCircle { line, circle } => [line, circle]
                .iter()
                .filter_map(|w| w.upgrade())
                .map(|e| e.borrow().id())
                .collect(),
            Mode::CircleCircle { circle1, circle2 } => [circle1, circle2]
                .iter()
                .filter_map(|w| w.upgrade())
                .map(|e| e.borrow().id())
                .collect(),
        }
    }

    fn error(&self) -> f64 {
        if !self.is_valid() {
            return f64::INFINITY;
        }
        match &self.mode {
            Mode::LineCircle { line, circle } => {
                let line = line.upgrade().unwrap();
                let circle = circle.upgrade().unwrap();
                let l = line.borrow();
                let start = l.start_point().unwrap();
                let dir = l.direction().unwrap();
                let center = circle.borrow().center().unwrap();
                let radius = circle.borrow().radius().unwrap();
                let to_center = center - start;
                let proj = to_center - dir * to_center.dot(&dir);
                (proj.norm() - radius).abs()
            }
            Mode::CircleCircle { circle1, circle2 } => {
                let c1 = circle1.upgrade().unwrap();
                let c2 = circle2.upgrade().unwrap();
                let dist = (c1.borrow().center().unwrap() - c2.borrow().center().unwrap()).norm();
                let sum_r = c1.borrow().radius().unwrap() + c2.borrow().radius().unwrap();
                (dist - sum_r).abs()
            }
        }
    }

    fn enforce(&self) -> bool {
        if !self.is_valid() {
            return false;
        }
        match &self.mode {
            Mode::LineCircle { line, circle } => {
                let line = line.upgrade().unwrap();
                let circle = circle.upgrade().unwrap();
                let (start, dir, normal) = {
                    let l = line.borrow();
                    let start = l.start_point().unwrap();
                    let dir = l.direction().unwrap();
                    let normal = crate::geometry::Vector2::new(-dir.y, dir.x);
                    (start, dir, normal)
                };
                let center = circle.borrow().center().unwrap();
                let radius = circle.borrow().radius().unwrap();
                let to_center = center - start;
                let signed_dist = to_center.dot(&normal);
                let offset = signed_dist - radius.copysign(signed_dist);
                let _ = dir;
                line.borrow_mut().translate(normal * offset);
                true
            }
            Mode::CircleCircle { circle1, circle2 } => {
                let c1 = circle1.upgrade().unwrap();
                let c2 = circle2.upgrade().unwrap();
                let center1 = c1.borrow().center().unwrap();
                let center2 = c2.borrow().center().unwrap();
                let r1 = c1.borrow().radius().unwrap();
                let r2 = c2.borrow().radius().unwrap();
                let delta = center2 - center1;
                let dist = delta.norm();
                if dist < EPSILON {
                    return false;
                }
                let dir = delta / dist;
                let target_dist = r1 + r2;
                let offset = target_dist - dist;
                c2.borrow_mut().translate(dir * offset);
                true
            }
        }
    }

    fn is_valid(&self) -> bool {
        match &self.mode {
            Mode::LineCircle { line, circle } => match (line.upgrade(), circle.upgrade()) {
                (Some(l), Some(c)) => {
                    !l.borrow().is_degenerate() && c.borrow().radius().unwrap_or(0.0) > 0.0
                }
                _ => false,
            },
            Mode::CircleCircle { circle1, circle2 } => {
                match (circle1.upgrade(), circle2.upgrade()) {
                    (Some(a), Some(b)) => {
                        let ra = a.borrow().radius().unwrap_or(0.0);
                        let rb = b.borrow().radius().unwrap_or(0.0);
                        let coincident = (a.borrow().center().unwrap()
                            - b.borrow().center().unwrap())
                        .norm()
                            < EPSILON;
                        ra > 0.0 && rb > 0.0 && !coincident
                    }
                    _ => false,
                }
            }
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
    use crate::entity::sketch::{Circle, Line};
    use crate::geometry::Vector2;
    use std::cell::RefCell;

    #[test]
    fn line_circle_enforce_reaches_tangency() {
        let line: SketchHandle = Rc::new(RefCell::new(
            Line::new(Vector2::new(-5.0, 0.5), Vector2::new(5.0, 0.5)).unwrap(),
        ));
        let circle: SketchHandle = Rc::new(RefCell::new(Circle::new(Vector2::new(0.0, 0.0), 1.0).unwrap()));
        let c = TangentConstraint::line_circle(&line, &circle, 1e-6).unwrap();
        assert!(c.enforce());
        assert!(c.is_satisfied());
    }

    #[test]
    fn circle_circle_enforce_reaches_external_tangency() {
        let c1: SketchHandle = Rc::new(RefCell::new(Circle::new(Vector2::new(0.0, 0.0), 1.0).unwrap()));
        let c2: SketchHandle = Rc::new(RefCell::new(Circle::new(Vector2::new(5.0, 0.0), 2.0).unwrap()));
        let c = TangentConstraint::circle_circle(&c1, &c2, 1e-6).unwrap();
        assert!(c.enforce());
        assert!(c.is_satisfied());
    }

    #[test]
    fn coincident_circles_rejected_at_construction() {
        let c1: SketchHandle = Rc::new(RefCell::new(Circle::new(Vector2::new(0.0, 0.0), 1.0).unwrap()));
        let c2: SketchHandle = Rc::new(RefCell::new(Circle::new(Vector2::new(0.0, 0.0), 2.0).unwrap()));
        assert!(TangentConstraint::circle_circle(&c1, &c2, 1e-6).is_err());
    }
}
