use log::{debug, info};

use crate::solution::{Assignment, Solution, SolutionStatus};
use crate::tableau::{Pivot, Tableau};

/// Objective direction. The engine always minimizes internally.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    Minimize,
    Maximize,
}

/// Progress reported while solving
#[derive(Debug, Clone, Copy)]
pub enum SolveEvent<'a> {
    /// The tableau before the first pivot
    Start(&'a Tableau),
    /// The tableau right after a pivot
    Pivot { tableau: &'a Tableau, pivot: Pivot },
}

/// Tableau simplex solver
///
/// Pivot rule: first row with a negative free member, then first positive
/// objective coefficient, minimum positive ratio with first-row ties.
/// There is no anti-cycling rule; set a pivot limit to bound the work.
#[derive(Debug, Clone, Default)]
pub struct Solver {
    /// Maximum pivots before giving up (unlimited when unset)
    max_pivots: Option<usize>,
}

enum PhaseResult {
    Complete,
    Stopped(SolutionStatus),
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_pivots(mut self, max: usize) -> Self {
        self.max_pivots = Some(max);
        self
    }

    /// Solve the tableau in place
    pub fn solve(&self, tableau: &mut Tableau, sense: Sense) -> Solution {
        self.solve_traced(tableau, sense, |_| {})
    }

    /// Solve the tableau in place, reporting the start state and every pivot
    pub fn solve_traced<F>(&self, tableau: &mut Tableau, sense: Sense, mut on_event: F) -> Solution
    where
        F: FnMut(SolveEvent<'_>),
    {
        tableau.relabel();
        on_event(SolveEvent::Start(&*tableau));

        let mut pivots = 0;
        loop {
            if let PhaseResult::Stopped(status) = self.phase1(tableau, &mut pivots, &mut on_event) {
                return self.stop(tableau, sense, status, pivots);
            }
            if let PhaseResult::Stopped(status) = self.phase2(tableau, &mut pivots, &mut on_event) {
                return self.stop(tableau, sense, status, pivots);
            }
            // Degenerate phase 2 pivots can push a zero free member negative
            if tableau.first_infeasible_row().is_none() && tableau.first_positive_in_row(0).is_none() {
                break;
            }
        }

        // A pivoted tableau settling on a zero objective is not accepted
        if pivots > 0 && tableau.objective_value() == 0.0 {
            return self.stop(tableau, sense, SolutionStatus::Degenerate, pivots);
        }

        let solution = self.extract_solution(tableau, sense, pivots);
        info!(
            "optimal after {} pivots, objective {}",
            solution.pivots, solution.objective_value
        );
        solution
    }

    /// Derive the ambivalent tableau and solve it as a minimization
    pub fn solve_dual(&self, tableau: &Tableau) -> (Tableau, Solution) {
        self.solve_dual_traced(tableau, |_| {})
    }

    pub fn solve_dual_traced<F>(&self, tableau: &Tableau, on_event: F) -> (Tableau, Solution)
    where
        F: FnMut(SolveEvent<'_>),
    {
        let mut dual = tableau.dual();
        debug!("solving {}x{} ambivalent tableau", dual.rows(), dual.cols());
        let solution = self.solve_traced(&mut dual, Sense::Minimize, on_event);
        (dual, solution)
    }

    /// Drive every negative free member to non-negative
    fn phase1<F>(&self, tableau: &mut Tableau, pivots: &mut usize, on_event: &mut F) -> PhaseResult
    where
        F: FnMut(SolveEvent<'_>),
    {
        while let Some(row) = tableau.first_infeasible_row() {
            let Some(col) = tableau.first_negative_in_row(row) else {
                debug!("row {row} is negative with no negative coefficient");
                return PhaseResult::Stopped(SolutionStatus::Infeasible);
            };
            let Some(pivot_row) = tableau.ratio_test(col) else {
                debug!("no leaving row for column {col} while repairing row {row}");
                return PhaseResult::Stopped(SolutionStatus::Infeasible);
            };
            if let PhaseResult::Stopped(status) = self.step(tableau, pivot_row, col, pivots, on_event) {
                return PhaseResult::Stopped(status);
            }
        }
        PhaseResult::Complete
    }

    /// Pivot on improving objective columns until none remain
    fn phase2<F>(&self, tableau: &mut Tableau, pivots: &mut usize, on_event: &mut F) -> PhaseResult
    where
        F: FnMut(SolveEvent<'_>),
    {
        while let Some(col) = tableau.first_positive_in_row(0) {
            let Some(pivot_row) = tableau.ratio_test(col) else {
                debug!("column {col} improves the objective without bound");
                return PhaseResult::Stopped(SolutionStatus::Unbounded);
            };
            if let PhaseResult::Stopped(status) = self.step(tableau, pivot_row, col, pivots, on_event) {
                return PhaseResult::Stopped(status);
            }
        }
        PhaseResult::Complete
    }

    fn step<F>(
        &self,
        tableau: &mut Tableau,
        row: usize,
        col: usize,
        pivots: &mut usize,
        on_event: &mut F,
    ) -> PhaseResult
    where
        F: FnMut(SolveEvent<'_>),
    {
        if self.max_pivots.is_some_and(|max| *pivots >= max) {
            debug!("pivot limit of {} reached", *pivots);
            return PhaseResult::Stopped(SolutionStatus::PivotLimit);
        }
        debug!("pivot on row {row}, column {col}");
        let pivot = tableau.pivot(row, col);
        *pivots += 1;
        if pivot.reference_reached {
            debug!("reference solution reached after {} pivots", *pivots);
        }
        on_event(SolveEvent::Pivot {
            tableau: &*tableau,
            pivot,
        });
        PhaseResult::Complete
    }

    fn stop(&self, tableau: &Tableau, sense: Sense, status: SolutionStatus, pivots: usize) -> Solution {
        info!("unacceptable solution ({status:?}) after {pivots} pivots");
        match status {
            SolutionStatus::Infeasible => Solution::infeasible(pivots),
            SolutionStatus::Unbounded => Solution::unbounded(pivots),
            _ => Solution::unacceptable(status, reported_objective(tableau, sense), pivots),
        }
    }

    fn extract_solution(&self, tableau: &Tableau, sense: Sense, pivots: usize) -> Solution {
        let basic = tableau
            .basic_labels()
            .iter()
            .enumerate()
            .map(|(i, &id)| Assignment {
                id,
                value: tableau.get(i + 1, 0),
            })
            .collect();

        Solution {
            status: SolutionStatus::Optimal,
            objective_value: reported_objective(tableau, sense),
            basic,
            free: tableau.free_labels().to_vec(),
            pivots,
        }
    }
}

fn reported_objective(tableau: &Tableau, sense: Sense) -> f64 {
    let value = tableau.objective_value();
    match sense {
        Sense::Maximize if value != 0.0 => -value,
        _ => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Maximize 3x1 + 5x2 s.t. x1 <= 4, 2x2 <= 12, 3x1 + 2x2 <= 18
    // Optimal: x1=2, x2=6, obj=36
    fn textbook() -> Tableau {
        let mut tableau = Tableau::new(4, 3).unwrap();
        tableau.load_str("3 5  1 0  0 2  3 2  4 12 18").unwrap();
        tableau
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-6, "{actual} (expected {expected})");
    }

    #[test]
    fn test_textbook_maximization() {
        let mut tableau = textbook();
        let solution = Solver::new().solve(&mut tableau, Sense::Maximize);

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert_eq!(solution.pivots, 3);
        assert_close(solution.objective_value, 36.0);
        assert_close(solution.value_of(1).unwrap(), 2.0);
        assert_close(solution.value_of(2).unwrap(), 6.0);
        // slack of x1 <= 4
        assert_close(solution.value_of(3).unwrap(), 2.0);
        assert_eq!(solution.free, vec![4, 5]);
        assert_eq!(solution.value_of(4), Some(0.0));
        assert_eq!(solution.value_of(6), None);
    }

    #[test]
    fn test_textbook_dual() {
        let primal = textbook();
        let (dual, solution) = Solver::new().solve_dual(&primal);

        assert_eq!(dual.rows(), 3);
        assert_eq!(dual.cols(), 4);
        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert_eq!(solution.pivots, 3);
        // min 4y1 + 12y2 + 18y3 meets the primal optimum
        assert_close(solution.objective_value, 36.0);
        assert_close(solution.value_of(2).unwrap(), 1.5);
        assert_close(solution.value_of(3).unwrap(), 1.0);
        assert_eq!(solution.value_of(1), Some(0.0));
        // the source tableau is untouched
        assert_eq!(primal.row(0), &[0.0, 3.0, 5.0]);
    }

    #[test]
    fn test_trace_events() {
        let mut tableau = textbook();
        let mut starts = 0;
        let mut pivots = Vec::new();
        Solver::new().solve_traced(&mut tableau, Sense::Maximize, |event| match event {
            SolveEvent::Start(t) => {
                starts += 1;
                assert_eq!(t.free_labels(), &[1, 2]);
            }
            SolveEvent::Pivot { pivot, .. } => pivots.push(pivot),
        });

        assert_eq!(starts, 1);
        let coordinates: Vec<_> = pivots.iter().map(|p| (p.row, p.col)).collect();
        assert_eq!(coordinates, vec![(1, 1), (3, 2), (2, 1)]);
        let references = pivots.iter().filter(|p| p.reference_reached).count();
        assert_eq!(references, 1);
        assert!(pivots[0].reference_reached);
    }

    #[test]
    fn test_dual_trace_reaches_reference_in_phase_one() {
        let mut coordinates = Vec::new();
        let mut reference_at = None;
        Solver::new().solve_dual_traced(&textbook(), |event| {
            if let SolveEvent::Pivot { pivot, .. } = event {
                coordinates.push((pivot.row, pivot.col));
                if pivot.reference_reached {
                    reference_at = Some(coordinates.len());
                }
            }
        });
        assert_eq!(coordinates, vec![(1, 1), (2, 2), (1, 3)]);
        assert_eq!(reference_at, Some(2));
    }

    #[test]
    fn test_already_optimal_minimization() {
        // min -x1 - 2x2 stored as F = 0 - (-x1 - 2x2); x1 + x2 <= 5
        let mut tableau = Tableau::new(2, 3).unwrap();
        tableau.load_str("-1 -2 1 1 5").unwrap();
        let solution = Solver::new().solve(&mut tableau, Sense::Minimize);

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert_eq!(solution.pivots, 0);
        assert_eq!(solution.objective_value, 0.0);
        assert_eq!(solution.basic, vec![Assignment { id: 3, value: 5.0 }]);
        assert_eq!(solution.free, vec![1, 2]);
    }

    #[test]
    fn test_already_optimal_maximization_skips_both_phases() {
        let mut tableau = Tableau::new(3, 3).unwrap();
        tableau.load_str("0 -4  1 2  3 1  6 9").unwrap();
        let mut pivots = 0;
        let solution = Solver::new().solve_traced(&mut tableau, Sense::Maximize, |event| {
            if let SolveEvent::Pivot { .. } = event {
                pivots += 1;
            }
        });

        assert_eq!(pivots, 0);
        assert!(solution.is_optimal());
        assert_eq!(solution.objective_value, 0.0);
        assert_eq!(solution.value_of(3), Some(6.0));
        assert_eq!(solution.value_of(4), Some(9.0));
    }

    #[test]
    fn test_negative_row_without_entering_column_is_infeasible() {
        // x3 = -2 - x1 - x2 can never be non-negative
        let mut tableau = Tableau::new(2, 3).unwrap();
        tableau.load_str("-1 -1 1 1 -2").unwrap();
        let before = tableau.clone();
        let mut pivots = 0;
        let solution = Solver::new().solve_traced(&mut tableau, Sense::Minimize, |event| {
            if let SolveEvent::Pivot { .. } = event {
                pivots += 1;
            }
        });

        assert_eq!(solution.status, SolutionStatus::Infeasible);
        assert!(!solution.is_optimal());
        assert_eq!(pivots, 0);
        assert_eq!(tableau, before);
    }

    #[test]
    fn test_phase_one_reduces_infeasible_rows() {
        // min x1 + x2 s.t. x1 >= 1, x2 >= 1
        let mut tableau = Tableau::from_rows(vec![
            vec![0.0, -1.0, -1.0],
            vec![-1.0, -1.0, 0.0],
            vec![-1.0, 0.0, -1.0],
        ])
        .unwrap();
        let count = |t: &Tableau| (1..t.rows()).filter(|&i| t.get(i, 0) < 0.0).count();
        let mut counts = vec![count(&tableau)];
        let solution = Solver::new().solve_traced(&mut tableau, Sense::Minimize, |event| {
            if let SolveEvent::Pivot { tableau, .. } = event {
                counts.push(count(tableau));
            }
        });

        assert_eq!(counts, vec![2, 1, 0]);
        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert_close(solution.objective_value, 2.0);
        assert_close(solution.value_of(1).unwrap(), 1.0);
        assert_close(solution.value_of(2).unwrap(), 1.0);
    }

    #[test]
    fn test_unbounded() {
        // F = -x1 with x3 = 1 + x1 - x2: x1 grows without limit
        let mut tableau = Tableau::from_rows(vec![vec![0.0, 1.0, 0.0], vec![1.0, -1.0, 1.0]]).unwrap();
        let solution = Solver::new().solve(&mut tableau, Sense::Minimize);
        assert_eq!(solution.status, SolutionStatus::Unbounded);
        assert_eq!(solution.pivots, 0);
        assert!(solution.basic.is_empty());
    }

    #[test]
    fn test_zero_objective_after_pivot_is_degenerate() {
        let mut tableau = Tableau::from_rows(vec![vec![2.0, 1.0, 0.0], vec![2.0, 1.0, 1.0]]).unwrap();
        let solution = Solver::new().solve(&mut tableau, Sense::Minimize);
        assert_eq!(solution.status, SolutionStatus::Degenerate);
        assert_eq!(solution.pivots, 1);
        assert_eq!(tableau.objective_value(), 0.0);
    }

    #[test]
    fn test_pivot_limit() {
        let mut tableau = textbook();
        let solution = Solver::new().with_max_pivots(1).solve(&mut tableau, Sense::Maximize);
        assert_eq!(solution.status, SolutionStatus::PivotLimit);
        assert_eq!(solution.pivots, 1);
        // F after the first pivot is -12, reported for maximization
        assert_close(solution.objective_value, 12.0);
    }
}
