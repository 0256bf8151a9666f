//! Auto-detector (C7): a heuristic that inspects sketch entities and
//! proposes [`crate::constraint::sketch`] instances.

use std::cell::RefCell;
use std::rc::Rc;

use crate::entity::sketch::SketchPrimitive;
use crate::entity::EntityId;
use crate::geometry::EPSILON;

pub type SketchHandle = Rc<RefCell<dyn SketchPrimitive>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProposalKind {
    Parallel,
    Perpendicular,
    Tangent,
    Concentric,
    EqualLength,
    EqualRadius,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
    pub kind: ProposalKind,
    pub entities: Vec<EntityId>,
}

struct Tolerances {
    parallel_tol: f64,
    perpendicular_tol: f64,
    length_tol: f64,
    coincidence_tol: f64,
    tangent_tol: f64,
    radius_tol: f64,
}

/// Strict and lenient presets for every tolerance, linearly interpolated by
/// `sensitivity`. This mapping is not specified upstream; made explicit here
/// so two implementations driven by the same sensitivity agree.
const STRICT: Tolerances = Tolerances {
    parallel_tol: 0.002,
    perpendicular_tol: 0.002,
    length_tol: 1e-4,
    coincidence_tol: 1e-4,
    tangent_tol: 1e-4,
    radius_tol: 1e-4,
};

const LENIENT: Tolerances = Tolerances {
    parallel_tol: 0.05,
    perpendicular_tol: 0.05,
    length_tol: 0.05,
    coincidence_tol: 0.05,
    tangent_tol: 0.05,
    radius_tol: 0.05,
};

fn interpolate(sensitivity: f64) -> Tolerances {
    // sensitivity in [0.1, 1.0]; 1.0 = strict (high sensitivity catches
    // near-exact relationships only), 0.1 = lenient
    let t = ((sensitivity.clamp(0.1, 1.0) - 0.1) / 0.9).clamp(0.0, 1.0);
    let lerp = |lo: f64, hi: f64| hi + (lo - hi) * t;
    Tolerances {
        parallel_tol: lerp(STRICT.parallel_tol, LENIENT.parallel_tol),
        perpendicular_tol: lerp(STRICT.perpendicular_tol, LENIENT.perpendicular_tol),
        length_tol: lerp(STRICT.length_tol, LENIENT.length_tol),
        coincidence_tol: lerp(STRICT.coincidence_tol, LENIENT.coincidence_tol),
        tangent_tol: lerp(STRICT.tangent_tol, LENIENT.tangent_tol),
        radius_tol: lerp(STRICT.radius_tol, LENIENT.radius_tol),
    }
}

#[derive(Debug, Clone)]
pub struct AutoDetector {
    pub enabled: bool,
    sensitivity: f64,
}

impl Default for AutoDetector {
    fn default() -> Self {
        Self {
            enabled: true,
            sensitivity: 0.5,
        }
    }
}

impl AutoDetector {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            sensitivity: 0.5,
        }
    }

    pub fn sensitivity(&self) -> f64 {
        self.sensitivity
    }

    pub fn set_sensitivity(&mut self, sensitivity: f64) {
        self.sensitivity = sensitivity.clamp(0.1, 1.0);
    }

    /// Pure function over `entities`: `None` entries (dropped/invalid
    /// handles) are skipped, not errored. Returns an empty list when
    /// disabled or given empty input.
    pub fn detect(&self, entities: &[Option<SketchHandle>]) -> Vec<Proposal> {
        if !self.enabled {
            return Vec::new();
        }
        let tol = interpolate(self.sensitivity);
        let live: Vec<&SketchHandle> = entities.iter().filter_map(|e| e.as_ref()).collect();

        let mut proposals = Vec::new();
        for i in 0..live.len() {
            for j in (i + 1)..live.len() {
                self.detect_pair(live[i], live[j], &tol, &mut proposals);
            }
        }
        proposals
    }

    fn detect_pair(
        &self,
        a: &SketchHandle,
        b: &SketchHandle,
        tol: &Tolerances,
        out: &mut Vec<Proposal>,
    ) {
        let ab = a.borrow();
        let bb = b.borrow();
        let ids = vec![ab.id(), bb.id()];

        let a_is_line = ab.direction().is_some();
        let b_is_line = bb.direction().is_some();
        let a_is_circle = ab.center().is_some() && ab.start_angle().is_none();
        let b_is_circle = bb.center().is_some() && bb.start_angle().is_none();

        if a_is_line && b_is_line {
            let da = ab.direction().unwrap();
            let db = bb.direction().unwrap();
            let cos = da.dot(&db).clamp(-1.0, 1.0);
            let angle = cos.acos().min(std::f64::consts::PI - cos.acos());
            if angle < tol.parallel_tol {
                out.push(Proposal {
                    kind: ProposalKind::Parallel,
                    entities: ids.clone(),
                });
            }
            if (angle - std::f64::consts::FRAC_PI_2).abs() < tol.perpendicular_tol {
                out.push(Proposal {
                    kind: ProposalKind::Perpendicular,
                    entities: ids.clone(),
                });
            }
            let len_a = (ab.end_point().unwrap() - ab.start_point().unwrap()).norm();
            let len_b = (bb.end_point().unwrap() - bb.start_point().unwrap()).norm();
            if (len_a - len_b).abs() < tol.length_tol {
                out.push(Proposal {
                    kind: ProposalKind::EqualLength,
                    entities: ids.clone(),
                });
            }
        } else if a_is_circle && b_is_circle {
            let ca = ab.center().unwrap();
            let cb = bb.center().unwrap();
            let ra = ab.radius().unwrap();
            let rb = bb.radius().unwrap();
            let dist = (cb - ca).norm();
            if dist < tol.coincidence_tol {
                out.push(Proposal {
                    kind: ProposalKind::Concentric,
                    entities: ids.clone(),
                });
            }
            if (dist - (ra + rb)).abs() < tol.tangent_tol {
                out.push(Proposal {
                    kind: ProposalKind::Tangent,
                    entities: ids.clone(),
                });
            }
            if (ra - rb).abs() < tol.radius_tol {
                out.push(Proposal {
                    kind: ProposalKind::EqualRadius,
                    entities: ids.clone(),
                });
            }
        } else if (a_is_line && b_is_circle) || (b_is_line && a_is_circle) {
            let (line, circle) = if a_is_line { (&*ab, &*bb) } else { (&*bb, &*ab) };
            let start = line.start_point().unwrap();
            let dir = line.direction().unwrap();
            let center = circle.center().unwrap();
            let radius = circle.radius().unwrap();
            let to_center = center - start;
            let proj = to_center - dir * to_center.dot(&dir);
            if (proj.norm() - radius).abs() < tol.tangent_tol {
                out.push(Proposal {
                    kind: ProposalKind::Tangent,
                    entities: ids,
                });
            }
        }
        let _ = EPSILON;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::sketch::{Circle, Line};
    use crate::geometry::Vector2;

    fn line(sx: f64, sy: f64, ex: f64, ey: f64) -> SketchHandle {
        Rc::new(RefCell::new(
            Line::new(Vector2::new(sx, sy), Vector2::new(ex, ey)).unwrap(),
        ))
    }

    #[test]
    fn detects_near_perpendicular_lines() {
        let l1 = line(0.0, 0.0, 1.0, 0.0);
        let l2 = line(0.0, 0.0, 0.001, 1.0);
        let detector = AutoDetector::new(true);
        let proposals = detector.detect(&[Some(l1), Some(l2)]);
        assert!(proposals.iter().any(|p| p.kind == ProposalKind::Perpendicular));
    }

    #[test]
    fn disabled_detector_returns_empty() {
        let l1 = line(0.0, 0.0, 1.0, 0.0);
        let l2 = line(0.0, 0.0, 0.0, 1.0);
        let detector = AutoDetector::new(false);
        assert!(detector.detect(&[Some(l1), Some(l2)]).is_empty());
    }

    #[test]
    fn null_entries_are_skipped_not_errored() {
        let l1 = line(0.0, 0.0, 1.0, 0.0);
        let detector = AutoDetector::new(true);
        let proposals = detector.detect(&[None, Some(l1), None]);
        assert!(proposals.is_empty());
    }

    #[test]
    fn detection_is_idempotent() {
        let l1 = line(0.0, 0.0, 1.0, 0.0);
        let l2 = line(0.0, 0.0, 0.0, 1.0);
        let detector = AutoDetector::new(true);
        let first = detector.detect(&[Some(l1.clone()), Some(l2.clone())]);
        let second = detector.detect(&[Some(l1), Some(l2)]);
        assert_eq!(first, second);
    }

    #[test]
    fn concentric_circles_detected() {
        let c1 = Rc::new(RefCell::new(Circle::new(Vector2::new(0.0, 0.0), 1.0).unwrap()));
        let c2 = Rc::new(RefCell::new(Circle::new(Vector2::new(0.0, 0.0), 2.0).unwrap()));
        let detector = AutoDetector::new(true);
        let proposals = detector.detect(&[Some(c1), Some(c2)]);
        assert!(proposals.iter().any(|p| p.kind == ProposalKind::Concentric));
    }
}
