use std::cell::Cell;

use super::{downgrade, normalize_axis};
use crate::constraint::{Constraint, MechanismConstraint};
use crate::entity::component::{ComponentHandle, ComponentRef};
use crate::entity::EntityId;
use crate::error::{require_finite, require_positive, ArgumentError, Result};
use crate::geometry::{UnitQuat, Vector3};

/// Couples a gear's rotation to a rack's translation via `position = angle *
/// gear_radius`.
#[derive(Debug)]
pub struct GearRackConstraint {
    gear: ComponentRef,
    rack: ComponentRef,
    gear_axis: Vector3,
    rack_axis: Vector3,
    gear_radius: f64,
    efficiency: f64,
    angle: Cell<f64>,
    position: Cell<f64>,
    angular_velocity: Cell<f64>,
    linear_velocity: Cell<f64>,
    tolerance: f64,
}

impl GearRackConstraint {
    pub fn new(
        gear: &ComponentHandle,
        rack: &ComponentHandle,
        gear_axis: Vector3,
        rack_axis: Vector3,
        gear_radius: f64,
        efficiency: f64,
        tolerance: f64,
    ) -> Result<Self> {
        require_positive("tolerance", tolerance)?;
        require_positive("gear_radius", gear_radius)?;
        require_finite("efficiency", efficiency)?;
        if !(0.0..=1.0).contains(&efficiency) {
            return Err(ArgumentError::OutOfRange("efficiency", "[0, 1]", efficiency));
        }
        let gear_axis = normalize_axis(gear_axis).ok_or(ArgumentError::ZeroLengthAxis("gear_axis"))?;
        let rack_axis = normalize_axis(rack_axis).ok_or(ArgumentError::ZeroLengthAxis("rack_axis"))?;
        Ok(Self {
            gear: downgrade(gear),
            rack: downgrade(rack),
            gear_axis,
            rack_axis,
            gear_radius,
            efficiency,
            angle: Cell::new(0.0),
            position: Cell::new(0.0),
            angular_velocity: Cell::new(0.0),
            linear_velocity: Cell::new(0.0),
            tolerance,
        })
    }

    fn rotate_gear(&self, delta: f64) {
        if let Some(c) = self.gear.upgrade() {
            let mut c = c.borrow_mut();
            let rotation = UnitQuat::from_axis_angle(&nalgebra::Unit::new_unchecked(self.gear_axis), delta);
            let new_orientation = rotation * c.orientation();
            c.set_orientation(new_orientation);
        }
    }

    fn translate_rack(&self, delta: f64) {
        if let Some(c) = self.rack.upgrade() {
            let mut c = c.borrow_mut();
            let new_position = c.position() + self.rack_axis * delta;
            c.set_position(new_position);
        }
    }
}

impl Constraint for GearRackConstraint {
    fn name(&self) -> &'static str {
        "GearRack"
    }

    fn referenced_entities(&self) -> Vec<EntityId> {
        [&self.gear, &self.rack]
            .iter()
            .filter_map(|w| w.upgrade())
            .map(|c| c.borrow().id())
            .collect()
    }

    fn error(&self) -> f64 {
        if !self.is_valid() {
            return f64::INFINITY;
        }
        (self.position.get() - self.angle.get() * self.gear_radius).abs()
    }

    fn enforce(&self) -> bool {
        if !self.is_valid() {
            return false;
        }
        let target_position = self.angle.get() * self.gear_radius;
        let delta_position = target_position - self.position.get();
        let target_angle = self.position.get() / self.gear_radius;
        let delta_angle = target_angle - self.angle.get();

        if delta_position.abs() <= delta_angle.abs() {
            self.translate_rack(delta_position);
            self.position.set(target_position);
        } else {
            self.rotate_gear(delta_angle);
            self.angle.set(target_angle);
        }
        true
    }

    fn is_valid(&self) -> bool {
        self.gear.upgrade().is_some() && self.rack.upgrade().is_some()
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

impl MechanismConstraint for GearRackConstraint {
    fn simulate_motion(&self, dt: f64) {
        if !self.is_valid() {
            return;
        }
        let delta_angle = self.angular_velocity.get() * dt;
        self.rotate_gear(delta_angle);
        self.angle.set(self.angle.get() + delta_angle);

        let delta_pos = self.linear_velocity.get() * dt;
        self.translate_rack(delta_pos);
        self.position.set(self.position.get() + delta_pos);

        self.enforce();
    }

    fn velocity(&self) -> (Vector3, Vector3) {
        (
            self.rack_axis * self.linear_velocity.get(),
            self.gear_axis * self.angular_velocity.get(),
        )
    }

    fn set_velocity(&self, linear: Vector3, angular: Vector3) {
        let omega = angular.dot(&self.gear_axis);
        self.angular_velocity.set(omega);
        // inconsistency between requested linear and the coupling is
        // resolved by preferring the angular component
        let _requested_linear = linear.dot(&self.rack_axis);
        self.linear_velocity.set(omega * self.gear_radius);
    }

    fn force_and_torque(&self) -> (Vector3, Vector3) {
        let force = self.rack_axis * (self.linear_velocity.get() * self.efficiency);
        (force, Vector3::zeros())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::component::Component;

    #[test]
    fn enforce_is_noop_once_in_sync() {
        let gear = Component::new("gear");
        let rack = Component::new("rack");
        let c = GearRackConstraint::new(
            &gear,
            &rack,
            Vector3::new(0.0, 0.0, 1.0),
            Vector3::new(1.0, 0.0, 0.0),
            2.0,
            1.0,
            1e-6,
        )
        .unwrap();
        assert!(c.is_satisfied());
        assert!(c.enforce());
        assert!(c.is_satisfied());
    }

    #[test]
    fn simulate_keeps_position_and_angle_coupled() {
        let gear = Component::new("gear");
        let rack = Component::new("rack");
        let c = GearRackConstraint::new(
            &gear,
            &rack,
            Vector3::new(0.0, 0.0, 1.0),
            Vector3::new(1.0, 0.0, 0.0),
            2.0,
            1.0,
            1e-6,
        )
        .unwrap();
        c.set_velocity(Vector3::zeros(), Vector3::new(0.0, 0.0, 1.0));
        c.simulate_motion(1.0);
        assert!(c.error() < 1e-6);
    }
}
