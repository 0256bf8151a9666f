//! Shared math types and tolerances used across the sketch and assembly layers.

use nalgebra as na;

pub type Vector2 = na::Vector2<f64>;
pub type Vector3 = na::Vector3<f64>;
pub type Matrix4 = na::Matrix4<f64>;
pub type UnitQuat = na::UnitQuaternion<f64>;

/// Default absolute tolerance used when a caller does not supply one.
pub const EPSILON: f64 = 1e-6;

pub trait ApproxEq {
    fn approx_eq(&self, other: &Self) -> bool;
}

impl ApproxEq for f64 {
    fn approx_eq(&self, other: &Self) -> bool {
        (self - other).abs() < EPSILON
    }
}

impl ApproxEq for Vector2 {
    fn approx_eq(&self, other: &Self) -> bool {
        (self - other).norm_squared() < EPSILON * EPSILON
    }
}

impl ApproxEq for Vector3 {
    fn approx_eq(&self, other: &Self) -> bool {
        (self - other).norm_squared() < EPSILON * EPSILON
    }
}

/// Normalize an angle into `[0, 2*PI)`.
pub fn normalize_angle_2pi(angle: f64) -> f64 {
    let two_pi = std::f64::consts::TAU;
    let wrapped = angle % two_pi;
    if wrapped < 0.0 {
        wrapped + two_pi
    } else {
        wrapped
    }
}

/// Shortest signed difference `target - current`, normalized into `(-PI, PI]`.
pub fn shortest_signed_delta(current: f64, target: f64) -> f64 {
    let mut delta = target - current;
    let two_pi = std::f64::consts::TAU;
    while delta > std::f64::consts::PI {
        delta -= two_pi;
    }
    while delta <= -std::f64::consts::PI {
        delta += two_pi;
    }
    delta
}
