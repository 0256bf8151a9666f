use std::cell::Cell;
use std::rc::Rc;

use crate::constraint::{Constraint, MechanismConstraint};
use crate::entity::component::{ComponentHandle, ComponentRef};
use crate::entity::EntityId;
use crate::error::{require_positive, ArgumentError, Result};
use crate::geometry::Vector3;

pub type PathFn = Box<dyn Fn(f64) -> Vector3>;

const LENGTH_SAMPLES: usize = 100;

/// Constrains a component's local origin to lie on a parametric curve,
/// `t in [0, 1]`.
pub struct PathConstraint {
    component: ComponentRef,
    path_fn: PathFn,
    local_origin: Vector3,
    t: Cell<f64>,
    velocity: Cell<f64>,
    path_length: f64,
    tolerance: f64,
}

impl std::fmt::Debug for PathConstraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathConstraint")
            .field("t", &self.t.get())
            .field("path_length", &self.path_length)
            .finish()
    }
}

impl PathConstraint {
    pub fn new(
        component: &ComponentHandle,
        path_fn: PathFn,
        local_origin: Vector3,
        tolerance: f64,
    ) -> Result<Self> {
        require_positive("tolerance", tolerance)?;
        let path_length = approximate_length(&path_fn);
        Ok(Self {
            component: Rc::downgrade(component),
            path_fn,
            local_origin,
            t: Cell::new(0.0),
            velocity: Cell::new(0.0),
            path_length,
            tolerance,
        })
    }

    /// Path that runs along the straight segment `start -> end`.
    pub fn segment(
        component: &ComponentHandle,
        start: Vector3,
        end: Vector3,
        local_origin: Vector3,
        tolerance: f64,
    ) -> Result<Self> {
        let path_fn: PathFn = Box::new(move |t| start + (end - start) * t);
        Self::new(component, path_fn, local_origin, tolerance)
    }

    /// Path that runs along an ordered polyline, reparameterized by arc
    /// length so `t` advances at a uniform rate along the whole curve.
    pub fn polyline(
        component: &ComponentHandle,
        points: Vec<Vector3>,
        local_origin: Vector3,
        tolerance: f64,
    ) -> Result<Self> {
        if points.len() < 2 {
            return Err(ArgumentError::TooFewElements("points", 2, points.len()));
        }
        let mut cumulative = vec![0.0_f64];
        for window in points.windows(2) {
            let seg_len = (window[1] - window[0]).norm();
            cumulative.push(cumulative.last().unwrap() + seg_len);
        }
        let total = *cumulative.last().unwrap();
        let path_fn: PathFn = Box::new(move |t| {
            if total < crate::geometry::EPSILON {
                return points[0];
            }
            let target = t.clamp(0.0, 1.0) * total;
            let seg_idx = cumulative
                .iter()
                .position(|&c| c >= target)
                .unwrap_or(cumulative.len() - 1)
                .max(1)
                - 1;
            let seg_start_len = cumulative[seg_idx];
            let seg_end_len = cumulative[seg_idx + 1];
            let seg_t = if (seg_end_len - seg_start_len).abs() < crate::geometry::EPSILON {
                0.0
            } else {
                (target - seg_start_len) / (seg_end_len - seg_start_len)
            };
            points[seg_idx] + (points[seg_idx + 1] - points[seg_idx]) * seg_t
        });
        Self::new(component, path_fn, local_origin, tolerance)
    }

    pub fn t(&self) -> f64 {
        self.t.get()
    }

    pub fn set_t(&self, t: f64) {
        self.t.set(t.clamp(0.0, 1.0));
    }

    pub fn path_length(&self) -> f64 {
        self.path_length
    }

    fn world_origin(&self) -> Option<Vector3> {
        let c = self.component.upgrade()?;
        let c = c.borrow();
        Some(c.position() + c.orientation() * self.local_origin)
    }
}

fn approximate_length(path_fn: &PathFn) -> f64 {
    let mut length = 0.0;
    let mut prev = path_fn(0.0);
    for i in 1..=LENGTH_SAMPLES {
        let t = i as f64 / LENGTH_SAMPLES as f64;
        let point = path_fn(t);
        length += (point - prev).norm();
        prev = point;
    }
    length
}

impl Constraint for PathConstraint {
    fn name(&self) -> &'static str {
        "Path"
    }

    fn referenced_entities(&self) -> Vec<EntityId> {
        self.component
            .upgrade()
            .map(|c| vec![c.borrow().id()])
            .unwrap_or_default()
    }

    fn error(&self) -> f64 {
        match self.world_origin() {
            None => f64::INFINITY,
            Some(origin) => (origin - (self.path_fn)(self.t.get())).norm(),
        }
    }

    fn enforce(&self) -> bool {
        let component = match self.component.upgrade() {
            Some(c) => c,
            None => return false,
        };
        let origin = self.world_origin().unwrap();
        let target = (self.path_fn)(self.t.get());
        let delta = target - origin;
        let mut c = component.borrow_mut();
        let new_position = c.position() + delta;
        c.set_position(new_position);
        true
    }

    fn is_valid(&self) -> bool {
        self.component.upgrade().is_some()
    }

    fn allows_motion(&self) -> bool {
        true
    }

    fn constrained_dof(&self) -> u32 {
        2
    }

    fn tolerance(&self) -> f64 {
        self.tolerance
    }
}

impl MechanismConstraint for PathConstraint {
    fn simulate_motion(&self, dt: f64) {
        if !self.is_valid() || self.path_length < crate::geometry::EPSILON {
            return;
        }
        let new_t = self.t.get() + self.velocity.get() * dt / self.path_length;
        self.set_t(new_t);
        self.enforce();
    }

    fn velocity(&self) -> (Vector3, Vector3) {
        let eps = super::DERIVATIVE_EPS;
        let t = self.t.get();
        let forward = (self.path_fn)((t + eps).min(1.0));
        let backward = (self.path_fn)((t - eps).max(0.0));
        let span = (t + eps).min(1.0) - (t - eps).max(0.0);
        let tangent = if span.abs() < crate::geometry::EPSILON {
            Vector3::zeros()
        } else {
            (forward - backward) / span
        };
        (tangent * self.velocity.get(), Vector3::zeros())
    }

    fn set_velocity(&self, linear: Vector3, _angular: Vector3) {
        // project the requested linear speed onto the path's current tangent
        let (tangent_velocity, _) = self.velocity();
        let speed = if tangent_velocity.norm() > crate::geometry::EPSILON {
            linear.dot(&tangent_velocity.normalize())
        } else {
            linear.norm()
        };
        self.velocity.set(speed);
    }

    fn force_and_torque(&self) -> (Vector3, Vector3) {
        (Vector3::zeros(), Vector3::zeros())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::component::Component;

    #[test]
    fn segment_path_tracks_linearly() {
        let component = Component::new("rider");
        let path = PathConstraint::segment(
            &component,
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(10.0, 0.0, 0.0),
            Vector3::zeros(),
            1e-6,
        )
        .unwrap();
        path.set_t(0.5);
        assert!(path.enforce());
        assert!((component.borrow().position() - Vector3::new(5.0, 0.0, 0.0)).norm() < 1e-6);
    }

    #[test]
    fn set_t_clamps_to_unit_interval() {
        let component = Component::new("rider");
        let path = PathConstraint::segment(
            &component,
            Vector3::zeros(),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::zeros(),
            1e-6,
        )
        .unwrap();
        path.set_t(5.0);
        assert_eq!(path.t(), 1.0);
        path.set_t(-5.0);
        assert_eq!(path.t(), 0.0);
    }

    #[test]
    fn polyline_path_length_matches_total_segment_length() {
        let component = Component::new("rider");
        let path = PathConstraint::polyline(
            &component,
            vec![
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(3.0, 0.0, 0.0),
                Vector3::new(3.0, 4.0, 0.0),
            ],
            Vector3::zeros(),
            1e-6,
        )
        .unwrap();
        assert!((path.path_length() - 7.0).abs() < 1e-3);
    }
}
