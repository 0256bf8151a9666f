//! The constraint abstraction (C2): a uniform interface every concrete
//! relationship in [`crate::constraint::sketch`] and
//! [`crate::constraint::mechanism`] implements.

pub mod mechanism;
pub mod sketch;

use crate::entity::EntityId;

/// Common contract for every geometric or mechanism relationship.
///
/// Implementors hold their referenced entities as non-owning `Weak` handles
/// acquired at construction; `is_valid` reports whether those handles still
/// upgrade and whether current parameters remain in-domain. `enforce` and
/// `error` never fail outright: an invalid constraint reports `error() ==
/// f64::INFINITY` and `enforce()` returns `false`, matching the crate's
/// policy that only construction-time argument errors propagate as `Result`.
pub trait Constraint: std::fmt::Debug {
    /// Short human-readable identifier of the kind, e.g. `"Parallel"`.
    fn name(&self) -> &'static str;

    /// Entities this constraint reads or writes, for DOF accounting and
    /// manager dedup.
    fn referenced_entities(&self) -> Vec<EntityId>;

    /// True iff `|error()| <= tolerance`.
    fn is_satisfied(&self) -> bool {
        self.error() <= self.tolerance()
    }

    /// Non-negative violation magnitude in the constraint's natural units;
    /// `f64::INFINITY` when `is_valid()` is false.
    fn error(&self) -> f64;

    /// Attempt one local correction step. Returns `false` iff the constraint
    /// is invalid; a `true` return does not guarantee satisfaction, only a
    /// non-worsening move.
    fn enforce(&self) -> bool;

    /// Prerequisites hold: referenced entities are live, parameters are
    /// in-domain, no blocking degeneracy.
    fn is_valid(&self) -> bool;

    /// False for rigid sketch constraints; true for mechanism constraints.
    fn allows_motion(&self) -> bool {
        false
    }

    /// DOF removed from referenced components, 0-6. Informational only; the
    /// solver never uses this to gate enforcement.
    fn constrained_dof(&self) -> u32;

    /// Enforcement order: higher enforced first within an iteration. Default
    /// 0; ties broken by insertion order.
    fn priority(&self) -> i32 {
        0
    }

    fn tolerance(&self) -> f64;
}

/// Capability requested only by the simulator, never by [`crate::solver`]:
/// motion-carrying constraints additionally support velocity queries and
/// time-stepped simulation. A constraint is either a plain [`Constraint`] or
/// additionally a `MechanismConstraint`; the base solver only requires the
/// former.
pub trait MechanismConstraint: Constraint {
    /// Advance internal kinematic state by `dt` seconds and write the
    /// resulting pose onto referenced components.
    fn simulate_motion(&self, dt: f64);

    /// Instantaneous velocities in world frame: `(linear, angular)`.
    fn velocity(&self) -> (crate::geometry::Vector3, crate::geometry::Vector3);

    /// Project the requested velocity onto the constraint's allowed motion.
    fn set_velocity(&self, linear: crate::geometry::Vector3, angular: crate::geometry::Vector3);

    /// Reaction force/torque scaled by efficiency: `(force, torque)`.
    fn force_and_torque(&self) -> (crate::geometry::Vector3, crate::geometry::Vector3);
}
