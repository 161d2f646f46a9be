mod render;
mod simplex;
mod solution;
mod tableau;

pub use render::{format_number, TraceWriter};
pub use simplex::{Sense, SolveEvent, Solver};
pub use solution::{Assignment, Solution, SolutionStatus};
pub use tableau::{Pivot, Tableau, TableauError};
