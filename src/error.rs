//! Argument validation errors for constraint and entity constructors.
//!
//! Per the error-handling design: only construction-time and setter-time
//! argument errors propagate as `Result`. Solver non-convergence and transient
//! constraint invalidity are absorbed and surfaced through return values
//! instead (see [`crate::solver::SolveResult`] and [`crate::constraint::Constraint::is_valid`]).

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ArgumentError {
    #[error("{0} must be a finite number")]
    NotFinite(&'static str),

    #[error("{0} must be positive, got {1}")]
    NotPositive(&'static str, f64),

    #[error("{0} cannot be null or has already been dropped")]
    NullReference(&'static str),

    #[error("{0} cannot be zero-length")]
    ZeroLengthAxis(&'static str),

    #[error("circles are coincident (centers within tolerance)")]
    CoincidentCircles,

    #[error("{0} is degenerate (zero length)")]
    DegenerateEntity(&'static str),

    #[error("{0} must lie in {1}, got {2}")]
    OutOfRange(&'static str, &'static str, f64),

    #[error("{0} requires at least {1} elements, got {2}")]
    TooFewElements(&'static str, usize, usize),

    #[error("{0} must be nonzero")]
    MustBeNonzero(&'static str),
}

pub type Result<T> = std::result::Result<T, ArgumentError>;

pub(crate) fn require_finite(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ArgumentError::NotFinite(name))
    }
}

pub(crate) fn require_positive(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ArgumentError::NotPositive(name, value))
    }
}
