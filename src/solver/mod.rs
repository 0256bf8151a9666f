//! Assembly constraint solver (C5): the iterative driver over a set of
//! [`crate::constraint::Constraint`] implementations.

use crate::constraint::Constraint;
use crate::entity::EntityId;
use std::collections::HashSet;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Sequential,
    Relaxation,
}

#[derive(Debug, Clone)]
pub struct SolverSettings {
    pub algorithm: Algorithm,
    pub convergence_tolerance: f64,
    pub max_iterations: u32,
    pub damping_factor: f64,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::Sequential,
            convergence_tolerance: 1e-6,
            max_iterations: 100,
            damping_factor: 1.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SolveResult {
    pub success: bool,
    pub iterations: u32,
    pub final_error: f64,
    pub unsatisfied_names: Vec<&'static str>,
}

/// Orchestrates enforcement of a constraint set in priority order, using
/// either the Sequential or Relaxation strategy.
///
/// Constraints are compared by pointer identity (`Rc::ptr_eq`), not value
/// equality, matching the "set semantics over constraints using
/// identity-equality" rule shared with [`crate::manager::ConstraintManager`].
pub struct AssemblySolver {
    constraints: Vec<Rc<dyn Constraint>>,
    settings: SolverSettings,
}

impl AssemblySolver {
    pub fn new(settings: SolverSettings) -> Self {
        Self {
            constraints: Vec::new(),
            settings,
        }
    }

    pub fn settings(&self) -> &SolverSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut SolverSettings {
        &mut self.settings
    }

    /// Adds a constraint, rejecting a pointer-identical duplicate. Returns
    /// whether the set changed.
    pub fn add_constraint(&mut self, constraint: Rc<dyn Constraint>) -> bool {
        if self
            .constraints
            .iter()
            .any(|c| Rc::ptr_eq(c, &constraint))
        {
            return false;
        }
        self.constraints.push(constraint);
        true
    }

    pub fn remove_constraint(&mut self, constraint: &Rc<dyn Constraint>) -> bool {
        let len_before = self.constraints.len();
        self.constraints.retain(|c| !Rc::ptr_eq(c, constraint));
        self.constraints.len() != len_before
    }

    pub fn clear_constraints(&mut self) {
        self.constraints.clear();
    }

    pub fn constraints(&self) -> &[Rc<dyn Constraint>] {
        &self.constraints
    }

    fn total_dof(&self) -> u32 {
        let mut unique: HashSet<EntityId> = HashSet::new();
        for c in &self.constraints {
            unique.extend(c.referenced_entities());
        }
        6 * unique.len() as u32
    }

    fn constrained_dof(&self) -> u32 {
        self.constraints.iter().map(|c| c.constrained_dof()).sum()
    }

    pub fn is_over_constrained(&self) -> bool {
        self.constrained_dof() > self.total_dof()
    }

    pub fn is_under_constrained(&self) -> bool {
        self.constrained_dof() < self.total_dof()
    }

    fn sorted_by_priority(&self) -> Vec<Rc<dyn Constraint>> {
        let mut sorted = self.constraints.clone();
        sorted.sort_by(|a, b| b.priority().cmp(&a.priority()));
        sorted
    }

    fn unsatisfied_names(&self) -> Vec<&'static str> {
        self.constraints
            .iter()
            .filter(|c| !c.is_satisfied())
            .map(|c| c.name())
            .collect()
    }

    /// Runs the configured algorithm to convergence or `max_iterations`,
    /// invoking `progress` once per iteration with `iteration / max_iterations`.
    pub fn solve(&self, progress: Option<&mut dyn FnMut(f64)>) -> SolveResult {
        if self.constraints.is_empty() {
            return SolveResult {
                success: true,
                iterations: 0,
                final_error: 0.0,
                unsatisfied_names: Vec::new(),
            };
        }
        match self.settings.algorithm {
            Algorithm::Sequential => self.solve_sequential(progress),
            Algorithm::Relaxation => self.solve_relaxation(progress),
        }
    }

    fn solve_sequential(&self, mut progress: Option<&mut dyn FnMut(f64)>) -> SolveResult {
        let sorted = self.sorted_by_priority();
        let mut iterations = 0;
        let mut max_error = f64::INFINITY;

        for iteration in 0..self.settings.max_iterations {
            iterations = iteration + 1;
            let mut all_satisfied = true;
            max_error = 0.0;
            for c in &sorted {
                if !c.enforce() {
                    all_satisfied = false;
                }
                max_error = max_error.max(c.error());
            }
            if let Some(cb) = progress.as_deref_mut() {
                cb((iteration + 1) as f64 / self.settings.max_iterations as f64);
            }
            if all_satisfied || max_error < self.settings.convergence_tolerance {
                break;
            }
        }

        let unsatisfied_names = self.unsatisfied_names();
        SolveResult {
            success: unsatisfied_names.is_empty(),
            iterations,
            final_error: max_error,
            unsatisfied_names,
        }
    }

    fn solve_relaxation(&self, mut progress: Option<&mut dyn FnMut(f64)>) -> SolveResult {
        let sorted = self.sorted_by_priority();
        let total_error_sq = || -> f64 { sorted.iter().map(|c| c.error().powi(2)).sum() };

        let mut prev_total = total_error_sq();
        if prev_total < self.settings.convergence_tolerance {
            let unsatisfied_names = self.unsatisfied_names();
            return SolveResult {
                success: unsatisfied_names.is_empty(),
                iterations: 0,
                final_error: prev_total,
                unsatisfied_names,
            };
        }

        let mut iterations = 0;
        let mut total = prev_total;
        for iteration in 0..self.settings.max_iterations {
            iterations = iteration + 1;
            for c in &sorted {
                c.enforce();
            }
            total = total_error_sq();
            if let Some(cb) = progress.as_deref_mut() {
                cb((iteration + 1) as f64 / self.settings.max_iterations as f64);
            }
            if (total - prev_total).abs() < self.settings.convergence_tolerance {
                break;
            }
            prev_total = total;
        }

        let unsatisfied_names = self.unsatisfied_names();
        SolveResult {
            success: unsatisfied_names.is_empty(),
            iterations,
            final_error: total,
            unsatisfied_names,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::sketch::AngleConstraint;
    use crate::entity::sketch::{Line, SketchPrimitive};
    use crate::geometry::Vector2;
    use std::cell::RefCell;

    #[test]
    fn empty_solver_succeeds_immediately() {
        let solver = AssemblySolver::new(SolverSettings::default());
        let result = solver.solve(None);
        assert!(result.success);
        assert_eq!(result.iterations, 0);
        assert_eq!(result.final_error, 0.0);
    }

    #[test]
    fn sequential_converges_on_angle_constraint() {
        let l1: Rc<RefCell<dyn SketchPrimitive>> = Rc::new(RefCell::new(
            Line::new(Vector2::new(0.0, 0.0), Vector2::new(1.0, 0.0)).unwrap(),
        ));
        let l2: Rc<RefCell<dyn SketchPrimitive>> = Rc::new(RefCell::new(
            Line::new(Vector2::new(0.0, 0.0), Vector2::new(0.0, 1.0)).unwrap(),
        ));
        let constraint: Rc<dyn Constraint> = Rc::new(
            AngleConstraint::new(&l1, &l2, std::f64::consts::FRAC_PI_4, 1e-6).unwrap(),
        );

        let mut solver = AssemblySolver::new(SolverSettings::default());
        solver.add_constraint(constraint);
        let result = solver.solve(None);

        assert!(result.success);
        assert!(result.iterations <= 5);
        assert!(result.final_error <= 1e-6);
    }

    #[test]
    fn adding_duplicate_constraint_is_rejected() {
        let l1: Rc<RefCell<dyn SketchPrimitive>> = Rc::new(RefCell::new(
            Line::new(Vector2::new(0.0, 0.0), Vector2::new(1.0, 0.0)).unwrap(),
        ));
        let l2: Rc<RefCell<dyn SketchPrimitive>> = Rc::new(RefCell::new(
            Line::new(Vector2::new(0.0, 0.0), Vector2::new(0.0, 1.0)).unwrap(),
        ));
        let constraint: Rc<dyn Constraint> =
            Rc::new(AngleConstraint::new(&l1, &l2, 0.1, 1e-6).unwrap());

        let mut solver = AssemblySolver::new(SolverSettings::default());
        assert!(solver.add_constraint(constraint.clone()));
        assert!(!solver.add_constraint(constraint));
    }
}
