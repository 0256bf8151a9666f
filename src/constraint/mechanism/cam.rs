use std::cell::Cell;
use std::fmt;

use super::{downgrade, normalize_axis, DERIVATIVE_EPS};
use crate::constraint::{Constraint, MechanismConstraint};
use crate::entity::component::{ComponentHandle, ComponentRef};
use crate::entity::EntityId;
use crate::error::{require_finite, require_positive, ArgumentError, Result};
use crate::geometry::{normalize_angle_2pi, UnitQuat, Vector3};

/// A cam's angle-to-radius profile.
pub enum CamProfile {
    /// Constant radius.
    Circular(f64),
    /// Samples `(angle, radius)`, interpolated linearly; wrap-aware between
    /// the last and first sample.
    PiecewiseLinear(Vec<(f64, f64)>),
    /// Caller-supplied pure function.
    Arbitrary(Box<dyn Fn(f64) -> f64>),
}

impl fmt::Debug for CamProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Circular(r) => write!(f, "CamProfile::Circular({r})"),
            Self::PiecewiseLinear(samples) => {
                write!(f, "CamProfile::PiecewiseLinear({} samples)", samples.len())
            }
            Self::Arbitrary(_) => write!(f, "CamProfile::Arbitrary(..)"),
        }
    }
}

impl CamProfile {
    pub fn circular(radius: f64) -> Result<Self> {
        require_positive("radius", radius)?;
        Ok(Self::Circular(radius))
    }

    pub fn piecewise_linear(mut samples: Vec<(f64, f64)>) -> Result<Self> {
        if samples.len() < 2 {
            return Err(ArgumentError::TooFewElements("samples", 2, samples.len()));
        }
        samples.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
        Ok(Self::PiecewiseLinear(samples))
    }

    pub fn arbitrary(f: impl Fn(f64) -> f64 + 'static) -> Self {
        Self::Arbitrary(Box::new(f))
    }

    pub fn evaluate(&self, angle: f64) -> f64 {
        let angle = normalize_angle_2pi(angle);
        match self {
            Self::Circular(r) => *r,
            Self::Arbitrary(f) => f(angle),
            Self::PiecewiseLinear(samples) => {
                if let Some(pos) = samples.iter().position(|(a, _)| (*a - angle).abs() < 1e-12) {
                    return samples[pos].1;
                }
                let next_idx = samples.iter().position(|(a, _)| *a > angle);
                match next_idx {
                    Some(0) => {
                        // before the first sample: wrap from the last sample
                        let (last_a, last_r) = *samples.last().unwrap();
                        let (first_a, first_r) = samples[0];
                        let span = std::f64::consts::TAU + first_a - last_a;
                        let t = if span.abs() < 1e-12 {
                            0.0
                        } else {
                            (angle + std::f64::consts::TAU - last_a) / span
                        };
                        last_r + (first_r - last_r) * t
                    }
                    Some(i) => {
                        let (a0, r0) = samples[i - 1];
                        let (a1, r1) = samples[i];
                        let t = (angle - a0) / (a1 - a0);
                        r0 + (r1 - r0) * t
                    }
                    None => {
                        // past the last sample: wrap to the first
                        let (last_a, last_r) = *samples.last().unwrap();
                        let (first_a, first_r) = samples[0];
                        let span = std::f64::consts::TAU + first_a - last_a;
                        let t = if span.abs() < 1e-12 {
                            0.0
                        } else {
                            (angle - last_a) / span
                        };
                        last_r + (first_r - last_r) * t
                    }
                }
            }
        }
    }
}

/// Converts a cam's rotation into a follower's translation along a fixed
/// axis via a profile function.
#[derive(Debug)]
pub struct CamConstraint {
    cam: ComponentRef,
    follower: ComponentRef,
    cam_axis: Vector3,
    follower_axis: Vector3,
    profile: CamProfile,
    offset: f64,
    cam_angle: Cell<f64>,
    angular_velocity: Cell<f64>,
    tolerance: f64,
}

impl CamConstraint {
    pub fn new(
        cam: &ComponentHandle,
        follower: &ComponentHandle,
        cam_axis: Vector3,
        follower_axis: Vector3,
        profile: CamProfile,
        offset: f64,
        tolerance: f64,
    ) -> Result<Self> {
        require_positive("tolerance", tolerance)?;
        require_finite("offset", offset)?;
        let cam_axis = normalize_axis(cam_axis).ok_or(ArgumentError::ZeroLengthAxis("cam_axis"))?;
        let follower_axis =
            normalize_axis(follower_axis).ok_or(ArgumentError::ZeroLengthAxis("follower_axis"))?;
        Ok(Self {
            cam: downgrade(cam),
            follower: downgrade(follower),
            cam_axis,
            follower_axis,
            profile,
            offset,
            cam_angle: Cell::new(0.0),
            angular_velocity: Cell::new(0.0),
            tolerance,
        })
    }

    fn target_follower_offset(&self) -> f64 {
        self.profile.evaluate(self.cam_angle.get()) + self.offset
    }

    fn current_follower_offset(&self) -> Option<f64> {
        let f = self.follower.upgrade()?;
        let offset = f.borrow().position().dot(&self.follower_axis);
        Some(offset)
    }

    fn rotate_cam(&self, delta: f64) {
        if let Some(c) = self.cam.upgrade() {
            let mut c = c.borrow_mut();
            let rotation = UnitQuat::from_axis_angle(&nalgebra::Unit::new_unchecked(self.cam_axis), delta);
            let new_orientation = rotation * c.orientation();
            c.set_orientation(new_orientation);
        }
    }
}

impl Constraint for CamConstraint {
    fn name(&self) -> &'static str {
        "Cam"
    }

    fn referenced_entities(&self) -> Vec<EntityId> {
        [&self.cam, &self.follower]
            .iter()
            .filter_map(|w| w.upgrade())
            .map(|c| c.borrow().id())
            .collect()
    }

    fn error(&self) -> f64 {
        match self.current_follower_offset() {
            None => f64::INFINITY,
            Some(current) => (current - self.target_follower_offset()).abs(),
        }
    }

    fn enforce(&self) -> bool {
        if !self.is_valid() {
            return false;
        }
        let follower = self.follower.upgrade().unwrap();
        let current = self.current_follower_offset().unwrap();
        let target = self.target_follower_offset();
        let delta = target - current;
        let mut f = follower.borrow_mut();
        let new_position = f.position() + self.follower_axis * delta;
        f.set_position(new_position);
        true
    }

    fn is_valid(&self) -> bool {
        self.cam.upgrade().is_some() && self.follower.upgrade().is_some()
    }

    fn allows_motion(&self) -> bool {
        true
    }

    fn constrained_dof(&self) -> u32 {
        1
    }

    fn tolerance(&self) -> f64 {
        self.tolerance
    }
}

impl MechanismConstraint for CamConstraint {
    fn simulate_motion(&self, dt: f64) {
        if !self.is_valid() {
            return;
        }
        let delta = self.angular_velocity.get() * dt;
        self.rotate_cam(delta);
        let new_angle = normalize_angle_2pi(self.cam_angle.get() + delta);
        self.cam_angle.set(new_angle);
        self.enforce();
    }

    fn velocity(&self) -> (Vector3, Vector3) {
        let angle = self.cam_angle.get();
        let derivative = (self.profile.evaluate(angle + DERIVATIVE_EPS)
            - self.profile.evaluate(angle - DERIVATIVE_EPS))
            / (2.0 * DERIVATIVE_EPS);
        let linear_speed = derivative * self.angular_velocity.get();
        (
            self.follower_axis * linear_speed,
            self.cam_axis * self.angular_velocity.get(),
        )
    }

    fn set_velocity(&self, _linear: Vector3, angular: Vector3) {
        // only the angular component projected onto the cam axis is stored;
        // a requested linear follower speed is not independently settable
        self.angular_velocity.set(angular.dot(&self.cam_axis));
    }

    fn force_and_torque(&self) -> (Vector3, Vector3) {
        let (linear, angular) = self.velocity();
        (linear, angular)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::component::Component;

    #[test]
    fn circular_profile_keeps_constant_follower_offset() {
        let cam = Component::new("cam");
        let follower = Component::new("follower");
        let c = CamConstraint::new(
            &cam,
            &follower,
            Vector3::new(0.0, 0.0, 1.0),
            Vector3::new(1.0, 0.0, 0.0),
            CamProfile::circular(3.0).unwrap(),
            0.0,
            1e-6,
        )
        .unwrap();
        assert!(c.enforce());
        c.set_velocity(Vector3::zeros(), Vector3::new(0.0, 0.0, 2.0));
        c.simulate_motion(0.5);
        assert!(c.error() < 1e-6);
        assert!((follower.borrow().position().x - 3.0).abs() < 1e-6);
    }

    #[test]
    fn piecewise_linear_wraps_between_last_and_first_sample() {
        let profile = CamProfile::piecewise_linear(vec![
            (0.0, 1.0),
            (std::f64::consts::PI, 2.0),
        ])
        .unwrap();
        let wrapped = profile.evaluate(1.5 * std::f64::consts::PI);
        assert!(wrapped > 1.0 && wrapped < 2.0);
    }
}
