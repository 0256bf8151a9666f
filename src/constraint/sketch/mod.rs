//! Sketch-constraint family (C3): the closed catalogue of 2D geometric
//! relationships between [`crate::entity::sketch::SketchPrimitive`] entities.
//!
//! None of these cache their error: every variant here is parameter-free
//! between construction and `enforce`, so there is nothing a cache would
//! save that a fresh `error()` call does not already compute cheaply, and a
//! cache could otherwise mask an external mutation of a referenced entity.

mod angle;
mod length;
mod parallel;
mod perpendicular;
mod radius;
mod tangent;

pub use angle::AngleConstraint;
pub use length::LengthConstraint;
pub use parallel::ParallelConstraint;
pub use perpendicular::PerpendicularConstraint;
pub use radius::RadiusConstraint;
pub use tangent::TangentConstraint;

use crate::entity::sketch::SketchPrimitive;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

pub(crate) type SketchHandle = Rc<RefCell<dyn SketchPrimitive>>;
pub(crate) type SketchRef = Weak<RefCell<dyn SketchPrimitive>>;
