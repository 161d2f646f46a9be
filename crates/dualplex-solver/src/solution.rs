/// The result of solving a tableau
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    /// Solution status
    pub status: SolutionStatus,
    /// Objective value in the caller's sense (negated back for maximization)
    pub objective_value: f64,
    /// Basic variables and their values, in constraint-row order
    pub basic: Vec<Assignment>,
    /// Free (non-basic) variable ids, all valued 0
    pub free: Vec<usize>,
    /// Pivots performed
    pub pivots: usize,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Assignment {
    pub id: usize,
    pub value: f64,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolutionStatus {
    /// An optimal solution was found
    Optimal,
    /// A negative free member could not be repaired
    Infeasible,
    /// An improving column has no leaving row
    Unbounded,
    /// Pivoting ended on an objective of exactly zero
    Degenerate,
    /// The configured pivot limit ran out
    PivotLimit,
}

impl Solution {
    pub fn infeasible(pivots: usize) -> Self {
        Self::unacceptable(SolutionStatus::Infeasible, f64::INFINITY, pivots)
    }

    pub fn unbounded(pivots: usize) -> Self {
        Self::unacceptable(SolutionStatus::Unbounded, f64::NEG_INFINITY, pivots)
    }

    pub fn unacceptable(status: SolutionStatus, objective_value: f64, pivots: usize) -> Self {
        Self {
            status,
            objective_value,
            basic: Vec::new(),
            free: Vec::new(),
            pivots,
        }
    }

    pub fn is_optimal(&self) -> bool {
        self.status == SolutionStatus::Optimal
    }

    /// Value of variable `id`; free variables are 0, unknown ids give `None`.
    pub fn value_of(&self, id: usize) -> Option<f64> {
        self.basic
            .iter()
            .find(|a| a.id == id)
            .map(|a| a.value)
            .or_else(|| self.free.contains(&id).then_some(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_of() {
        let solution = Solution {
            status: SolutionStatus::Optimal,
            objective_value: 7.0,
            basic: vec![Assignment { id: 3, value: 1.5 }, Assignment { id: 1, value: 2.0 }],
            free: vec![2, 4],
            pivots: 2,
        };
        assert_eq!(solution.value_of(1), Some(2.0));
        assert_eq!(solution.value_of(3), Some(1.5));
        assert_eq!(solution.value_of(4), Some(0.0));
        assert_eq!(solution.value_of(5), None);
    }

    #[test]
    fn test_unacceptable_constructors() {
        let infeasible = Solution::infeasible(0);
        assert_eq!(infeasible.status, SolutionStatus::Infeasible);
        assert!(!infeasible.is_optimal());
        assert!(infeasible.basic.is_empty());
        assert_eq!(Solution::unbounded(4).objective_value, f64::NEG_INFINITY);
        assert_eq!(Solution::unbounded(4).pivots, 4);
    }
}
