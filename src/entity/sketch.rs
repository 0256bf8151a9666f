//! 2D sketch geometry (C1 sketch-entity contract).
//!
//! [`SketchPrimitive`] is object-safe so that a constraint can hold a single
//! `Weak<RefCell<dyn SketchPrimitive>>` regardless of whether it points at a
//! line, an arc, or a circle, the way [`crate::constraint`] is written
//! against one trait rather than an enum match per constraint kind.

use crate::error::{require_finite, require_positive, Result};
use crate::geometry::{Vector2, EPSILON};

use super::EntityId;

/// Common surface every 2D sketch entity exposes to constraints.
///
/// Not every method is meaningful for every implementor (a `Circle` has no
/// endpoints); those return `None` rather than panicking, matching the
/// uniform-failure-semantics approach used for constraint validity elsewhere
/// in the crate.
pub trait SketchPrimitive: std::fmt::Debug {
    fn id(&self) -> EntityId;

    fn start_point(&self) -> Option<Vector2> {
        None
    }
    fn end_point(&self) -> Option<Vector2> {
        None
    }
    fn set_start_point(&mut self, _point: Vector2) {}
    fn set_end_point(&mut self, _point: Vector2) {}

    fn center(&self) -> Option<Vector2> {
        None
    }
    fn set_center(&mut self, _center: Vector2) {}

    fn radius(&self) -> Option<f64> {
        None
    }
    fn set_radius(&mut self, _radius: f64) {}

    fn start_angle(&self) -> Option<f64> {
        None
    }
    fn end_angle(&self) -> Option<f64> {
        None
    }

    /// Unit direction vector, for entities with a well-defined tangent line
    /// (lines) or tangent-at-a-point (arcs, circles need a point to be
    /// meaningful and so do not implement this).
    fn direction(&self) -> Option<Vector2> {
        None
    }

    fn translate(&mut self, delta: Vector2);
    fn rotate(&mut self, pivot: Vector2, angle: f64);
    fn is_degenerate(&self) -> bool;
}

#[derive(Debug, Clone)]
pub struct Line {
    id: EntityId,
    start: Vector2,
    end: Vector2,
}

impl Line {
    pub fn new(start: Vector2, end: Vector2) -> Result<Self> {
        require_finite("start.x", start.x)?;
        require_finite("start.y", start.y)?;
        require_finite("end.x", end.x)?;
        require_finite("end.y", end.y)?;
        if (end - start).norm() < EPSILON {
            return Err(crate::error::ArgumentError::DegenerateEntity("line"));
        }
        Ok(Self {
            id: EntityId::new(),
            start,
            end,
        })
    }

    pub fn length(&self) -> f64 {
        (self.end - self.start).norm()
    }
}

impl SketchPrimitive for Line {
    fn id(&self) -> EntityId {
        self.id
    }

    fn start_point(&self) -> Option<Vector2> {
        Some(self.start)
    }

    fn end_point(&self) -> Option<Vector2> {
        Some(self.end)
    }

    fn set_start_point(&mut self, point: Vector2) {
        self.start = point;
    }

    fn set_end_point(&mut self, point: Vector2) {
        self.end = point;
    }

    fn direction(&self) -> Option<Vector2> {
        let d = self.end - self.start;
        let n = d.norm();
        if n < EPSILON {
            None
        } else {
            Some(d / n)
        }
    }

    fn translate(&mut self, delta: Vector2) {
        self.start += delta;
        self.end += delta;
    }

    fn rotate(&mut self, pivot: Vector2, angle: f64) {
        let rot = nalgebra::Rotation2::new(angle);
        self.start = pivot + rot * (self.start - pivot);
        self.end = pivot + rot * (self.end - pivot);
    }

    fn is_degenerate(&self) -> bool {
        self.length() < EPSILON
    }
}

#[derive(Debug, Clone)]
pub struct Circle {
    id: EntityId,
    center: Vector2,
    radius: f64,
}

impl Circle {
    pub fn new(center: Vector2, radius: f64) -> Result<Self> {
        require_finite("center.x", center.x)?;
        require_finite("center.y", center.y)?;
        require_positive("radius", radius)?;
        Ok(Self {
            id: EntityId::new(),
            center,
            radius,
        })
    }
}

impl SketchPrimitive for Circle {
    fn id(&self) -> EntityId {
        self.id
    }

    fn center(&self) -> Option<Vector2> {
        Some(self.center)
    }

    fn set_center(&mut self, center: Vector2) {
        self.center = center;
    }

    fn radius(&self) -> Option<f64> {
        Some(self.radius)
    }

    fn set_radius(&mut self, radius: f64) {
        if radius.is_finite() && radius >= EPSILON {
            self.radius = radius;
        }
    }

    fn translate(&mut self, delta: Vector2) {
        self.center += delta;
    }

    fn rotate(&mut self, pivot: Vector2, angle: f64) {
        let rot = nalgebra::Rotation2::new(angle);
        self.center = pivot + rot * (self.center - pivot);
    }

    fn is_degenerate(&self) -> bool {
        self.radius < EPSILON
    }
}

#[derive(Debug, Clone)]
pub struct Arc {
    id: EntityId,
    center: Vector2,
    radius: f64,
    start_angle: f64,
    end_angle: f64,
}

impl Arc {
    pub fn new(center: Vector2, radius: f64, start_angle: f64, end_angle: f64) -> Result<Self> {
        require_finite("center.x", center.x)?;
        require_finite("center.y", center.y)?;
        require_positive("radius", radius)?;
        require_finite("start_angle", start_angle)?;
        require_finite("end_angle", end_angle)?;
        Ok(Self {
            id: EntityId::new(),
            center,
            radius,
            start_angle,
            end_angle,
        })
    }

    fn point_at(&self, angle: f64) -> Vector2 {
        self.center + self.radius * Vector2::new(angle.cos(), angle.sin())
    }
}

impl SketchPrimitive for Arc {
    fn id(&self) -> EntityId {
        self.id
    }

    fn start_point(&self) -> Option<Vector2> {
        Some(self.point_at(self.start_angle))
    }

    fn end_point(&self) -> Option<Vector2> {
        Some(self.point_at(self.end_angle))
    }

    fn center(&self) -> Option<Vector2> {
        Some(self.center)
    }

    fn set_center(&mut self, center: Vector2) {
        self.center = center;
    }

    fn radius(&self) -> Option<f64> {
        Some(self.radius)
    }

    fn set_radius(&mut self, radius: f64) {
        if radius.is_finite() && radius >= EPSILON {
            self.radius = radius;
        }
    }

    fn start_angle(&self) -> Option<f64> {
        Some(self.start_angle)
    }

    fn end_angle(&self) -> Option<f64> {
        Some(self.end_angle)
    }

    fn translate(&mut self, delta: Vector2) {
        self.center += delta;
    }

    fn rotate(&mut self, pivot: Vector2, angle: f64) {
        let rot = nalgebra::Rotation2::new(angle);
        self.center = pivot + rot * (self.center - pivot);
        self.start_angle += angle;
        self.end_angle += angle;
    }

    fn is_degenerate(&self) -> bool {
        self.radius < EPSILON || (self.end_angle - self.start_angle).abs() < EPSILON
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_rejects_zero_length() {
        let p = Vector2::new(1.0, 1.0);
        assert!(Line::new(p, p).is_err());
    }

    #[test]
    fn line_direction_is_unit() {
        let line = Line::new(Vector2::new(0.0, 0.0), Vector2::new(3.0, 4.0)).unwrap();
        let dir = line.direction().unwrap();
        assert!((dir.norm() - 1.0).abs() < EPSILON);
        assert!((dir.x - 0.6).abs() < EPSILON);
        assert!((dir.y - 0.8).abs() < EPSILON);
    }

    #[test]
    fn circle_rejects_nonpositive_radius() {
        assert!(Circle::new(Vector2::new(0.0, 0.0), 0.0).is_err());
        assert!(Circle::new(Vector2::new(0.0, 0.0), -1.0).is_err());
    }

    #[test]
    fn arc_endpoints_match_angles() {
        let arc = Arc::new(Vector2::new(0.0, 0.0), 2.0, 0.0, std::f64::consts::FRAC_PI_2).unwrap();
        let start = arc.start_point().unwrap();
        let end = arc.end_point().unwrap();
        assert!((start - Vector2::new(2.0, 0.0)).norm() < EPSILON);
        assert!((end - Vector2::new(0.0, 2.0)).norm() < EPSILON);
    }

    #[test]
    fn translate_moves_line_endpoints() {
        let mut line = Line::new(Vector2::new(0.0, 0.0), Vector2::new(1.0, 0.0)).unwrap();
        line.translate(Vector2::new(2.0, 3.0));
        assert!((line.start_point().unwrap() - Vector2::new(2.0, 3.0)).norm() < EPSILON);
        assert!((line.end_point().unwrap() - Vector2::new(3.0, 3.0)).norm() < EPSILON);
    }
}
