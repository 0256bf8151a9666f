use std::cell::Cell;

use super::{downgrade, normalize_axis};
use crate::constraint::{Constraint, MechanismConstraint};
use crate::entity::component::{ComponentHandle, ComponentRef};
use crate::entity::EntityId;
use crate::error::{require_finite, require_positive, ArgumentError, Result};
use crate::geometry::{UnitQuat, Vector3};

/// Couples the rotation of two components about fixed world axes by a fixed
/// ratio, the way a gear pair couples angular speed.
///
/// Tracks driving/driven angle as its own internal state rather than reading
/// it back off the components' current orientation, so a direct external
/// rotation of either component is not observed until the next `enforce` or
/// `simulate_motion` call.
#[derive(Debug)]
pub struct GearConstraint {
    component1: ComponentRef,
    component2: ComponentRef,
    axis1: Vector3,
    axis2: Vector3,
    ratio: f64,
    efficiency: f64,
    angle1: Cell<f64>,
    angle2: Cell<f64>,
    angular_velocity: Cell<f64>,
    tolerance: f64,
}

impl GearConstraint {
    pub fn new(
        component1: &ComponentHandle,
        component2: &ComponentHandle,
        axis1: Vector3,
        axis2: Vector3,
        ratio: f64,
        efficiency: f64,
        tolerance: f64,
    ) -> Result<Self> {
        require_positive("tolerance", tolerance)?;
        require_finite("ratio", ratio)?;
        if ratio == 0.0 {
            return Err(ArgumentError::MustBeNonzero("ratio"));
        }
        if !(0.0..=1.0).contains(&efficiency) {
            return Err(ArgumentError::OutOfRange("efficiency", "[0, 1]", efficiency));
        }
        let axis1 = normalize_axis(axis1).ok_or(ArgumentError::ZeroLengthAxis("axis1"))?;
        let axis2 = normalize_axis(axis2).ok_or(ArgumentError::ZeroLengthAxis("axis2"))?;
        Ok(Self {
            component1: downgrade(component1),
            component2: downgrade(component2),
            axis1,
            axis2,
            ratio,
            efficiency,
            angle1: Cell::new(0.0),
            angle2: Cell::new(0.0),
            angular_velocity: Cell::new(0.0),
            tolerance,
        })
    }

    fn target_angle2(&self) -> f64 {
        self.ratio * self.angle1.get()
    }

    fn rotate_component(&self, component: &ComponentRef, axis: Vector3, delta: f64) {
        if let Some(c) = component.upgrade() {
            let mut c = c.borrow_mut();
            let rotation = UnitQuat::from_axis_angle(&nalgebra::Unit::new_unchecked(axis), delta);
            let new_orientation = rotation * c.orientation();
            c.set_orientation(new_orientation);
        }
    }
}

impl Constraint for GearConstraint {
    fn name(&self) -> &'static str {
        "Gear"
    }

    fn referenced_entities(&self) -> Vec<EntityId> {
        [&self.component1, &self.component2]
            .iter()
            .filter_map(|w| w.upgrade())
            .map(|c| c.borrow().id())
            .collect()
    }

    fn error(&self) -> f64 {
        if !self.is_valid() {
            return f64::INFINITY;
        }
        (self.angle2.get() - self.target_angle2()).abs()
    }

    fn enforce(&self) -> bool {
        if !self.is_valid() {
            return false;
        }
        let delta = self.target_angle2() - self.angle2.get();
        self.rotate_component(&self.component2, self.axis2, delta);
        self.angle2.set(self.target_angle2());
        true
    }

    fn is_valid(&self) -> bool {
        self.component1.upgrade().is_some() && self.component2.upgrade().is_some()
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

impl MechanismConstraint for GearConstraint {
    fn simulate_motion(&self, dt: f64) {
        if !self.is_valid() {
            return;
        }
        let delta1 = self.angular_velocity.get() * dt;
        self.rotate_component(&self.component1, self.axis1, delta1);
        self.angle1.set(self.angle1.get() + delta1);

        let new_angle2 = self.target_angle2();
        let delta2 = new_angle2 - self.angle2.get();
        self.rotate_component(&self.component2, self.axis2, delta2);
        self.angle2.set(new_angle2);
    }

    fn velocity(&self) -> (Vector3, Vector3) {
        (
            Vector3::zeros(),
            self.axis1 * self.angular_velocity.get(),
        )
    }

    fn set_velocity(&self, _linear: Vector3, angular: Vector3) {
        self.angular_velocity.set(angular.dot(&self.axis1));
    }

    fn force_and_torque(&self) -> (Vector3, Vector3) {
        let torque = self.axis2 * (self.angular_velocity.get() * self.ratio * self.efficiency);
        (Vector3::zeros(), torque)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::component::Component;

    #[test]
    fn two_to_one_gear_simulates_one_second() {
        let c1 = Component::new("driver");
        let c2 = Component::new("driven");
        let gear = GearConstraint::new(
            &c1,
            &c2,
            Vector3::new(0.0, 0.0, 1.0),
            Vector3::new(0.0, 0.0, 1.0),
            2.0,
            1.0,
            1e-6,
        )
        .unwrap();
        gear.set_velocity(Vector3::zeros(), Vector3::new(0.0, 0.0, 1.0));
        gear.simulate_motion(1.0);

        let (axis1, angle1) = c1.borrow().orientation().axis_angle().unwrap();
        assert!((axis1.into_inner() - Vector3::new(0.0, 0.0, 1.0)).norm() < 1e-6);
        assert!((angle1 - 1.0).abs() < 1e-6);

        let (axis2, angle2) = c2.borrow().orientation().axis_angle().unwrap();
        assert!((axis2.into_inner() - Vector3::new(0.0, 0.0, 1.0)).norm() < 1e-6);
        assert!((angle2 - 2.0).abs() < 1e-6);
    }

    #[test]
    fn rejects_zero_ratio() {
        let c1 = Component::new("a");
        let c2 = Component::new("b");
        assert!(GearConstraint::new(
            &c1,
            &c2,
            Vector3::new(0.0, 0.0, 1.0),
            Vector3::new(0.0, 0.0, 1.0),
            0.0,
            1.0,
            1e-6,
        )
        .is_err());
    }
}
