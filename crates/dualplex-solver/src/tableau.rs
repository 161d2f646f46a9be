use std::io::Read;
use std::path::Path;

use log::{debug, trace};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TableauError {
    #[error("Invalid tableau shape {rows}x{cols}: at least 2 rows and 2 columns are required")]
    InvalidShape { rows: usize, cols: usize },
    #[error("Row {row} has {found} entries, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("Invalid number '{token}' at position {position}")]
    InvalidNumber { token: String, position: usize },
    #[error("Not enough numbers: expected {expected}, found {found}")]
    Truncated { expected: usize, found: usize },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Simplex tableau in exchange form.
///
/// Row 0 is the objective row, rows `1..rows` are constraint rows.
/// Column 0 holds free members, columns `1..cols` hold the coefficients
/// of the currently free variables. Each constraint row reads
/// `x_basic = free_member - sum(coefficient * x_free)`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Tableau {
    rows: usize,
    cols: usize,
    data: Vec<Vec<f64>>,
    /// Variable id basic in each constraint row
    basic: Vec<usize>,
    /// Variable id free in each coefficient column
    free: Vec<usize>,
    /// Set until the free-member column first becomes non-negative after a pivot
    reference_pending: bool,
}

/// A performed pivot, as reported to solve observers
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pivot {
    pub row: usize,
    pub col: usize,
    /// True on the single pivot that first made the free-member column non-negative
    pub reference_reached: bool,
}

impl Tableau {
    /// Allocate a zero-filled tableau of a fixed shape.
    pub fn new(rows: usize, cols: usize) -> Result<Self, TableauError> {
        if rows < 2 || cols < 2 {
            return Err(TableauError::InvalidShape { rows, cols });
        }
        Ok(Self::with_data(rows, cols, vec![vec![0.0; cols]; rows]))
    }

    /// Build a tableau from a complete grid, objective cell included.
    pub fn from_rows(data: Vec<Vec<f64>>) -> Result<Self, TableauError> {
        let rows = data.len();
        let cols = data.first().map_or(0, Vec::len);
        if rows < 2 || cols < 2 {
            return Err(TableauError::InvalidShape { rows, cols });
        }
        if let Some((row, line)) = data.iter().enumerate().find(|(_, line)| line.len() != cols) {
            return Err(TableauError::RaggedRow {
                row,
                expected: cols,
                found: line.len(),
            });
        }
        Ok(Self::with_data(rows, cols, data))
    }

    fn with_data(rows: usize, cols: usize, data: Vec<Vec<f64>>) -> Self {
        let mut tableau = Self {
            rows,
            cols,
            data,
            basic: Vec::new(),
            free: Vec::new(),
            reference_pending: true,
        };
        tableau.relabel();
        tableau
    }

    /// Count of numbers the text format must supply for this shape.
    pub fn required_numbers(rows: usize, cols: usize) -> usize {
        (cols - 1) + (rows - 1) * (cols - 1) + (rows - 1)
    }

    /// Load the tableau from whitespace-separated numbers.
    ///
    /// Order: objective coefficients, then every constraint row's
    /// coefficients, then the free member of each constraint row.
    /// The objective cell is reset to 0. Numbers past the required count
    /// are ignored. On error the tableau is left untouched.
    pub fn load_str(&mut self, source: &str) -> Result<(), TableauError> {
        let expected = Self::required_numbers(self.rows, self.cols);
        let mut numbers = Vec::with_capacity(expected);
        for (index, token) in source.split_whitespace().take(expected).enumerate() {
            let value = token.parse::<f64>().map_err(|_| TableauError::InvalidNumber {
                token: token.to_string(),
                position: index + 1,
            })?;
            numbers.push(value);
        }
        if numbers.len() < expected {
            return Err(TableauError::Truncated {
                expected,
                found: numbers.len(),
            });
        }

        let width = self.cols - 1;
        let (objective, rest) = numbers.split_at(width);
        let (block, free_members) = rest.split_at((self.rows - 1) * width);

        self.data[0][0] = 0.0;
        self.data[0][1..].copy_from_slice(objective);
        for (line, (coefficients, &free_member)) in self.data[1..]
            .iter_mut()
            .zip(block.chunks(width).zip(free_members))
        {
            line[0] = free_member;
            line[1..].copy_from_slice(coefficients);
        }

        debug!("loaded {}x{} tableau", self.rows, self.cols);
        Ok(())
    }

    pub fn load_reader(&mut self, mut reader: impl Read) -> Result<(), TableauError> {
        let mut source = String::new();
        reader.read_to_string(&mut source)?;
        self.load_str(&source)
    }

    pub fn load_path(&mut self, path: impl AsRef<Path>) -> Result<(), TableauError> {
        let source = std::fs::read_to_string(path)?;
        self.load_str(&source)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row][col]
    }

    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row]
    }

    /// Raw objective cell; negated relative to a maximization objective.
    pub fn objective_value(&self) -> f64 {
        self.data[0][0]
    }

    pub fn basic_labels(&self) -> &[usize] {
        &self.basic
    }

    pub fn free_labels(&self) -> &[usize] {
        &self.free
    }

    pub fn reference_pending(&self) -> bool {
        self.reference_pending
    }

    /// Restore the initial labelling: free variables `1..cols`, basic
    /// variables numbered from `cols` on. Also re-arms the reference flag.
    pub fn relabel(&mut self) {
        self.free = (1..self.cols).collect();
        self.basic = (self.cols..self.cols + self.rows - 1).collect();
        self.reference_pending = true;
    }

    /// First constraint row with a negative free member.
    pub fn first_infeasible_row(&self) -> Option<usize> {
        (1..self.rows).find(|&i| self.data[i][0] < 0.0)
    }

    /// First coefficient column with a strictly positive entry in `row`.
    /// On the objective row this is the improving column.
    pub fn first_positive_in_row(&self, row: usize) -> Option<usize> {
        (1..self.cols).find(|&j| self.data[row][j] > 0.0)
    }

    /// First coefficient column with a strictly negative entry in `row`.
    /// Raising that free variable raises the row's basic variable.
    pub fn first_negative_in_row(&self, row: usize) -> Option<usize> {
        (1..self.cols).find(|&j| self.data[row][j] < 0.0)
    }

    /// Minimum-ratio leaving row for entering column `col`.
    ///
    /// Only strictly positive, finite ratios `free_member / coefficient`
    /// qualify; ties keep the first row.
    pub fn ratio_test(&self, col: usize) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for i in 1..self.rows {
            let ratio = self.data[i][0] / self.data[i][col];
            if !ratio.is_finite() || ratio <= 0.0 {
                continue;
            }
            match best {
                Some((_, min)) if ratio >= min => {}
                _ => best = Some((i, ratio)),
            }
        }
        best.map(|(i, _)| i)
    }

    /// Exchange the basic variable of `row` with the free variable of `col`.
    ///
    /// The new grid is computed from the untouched pre-pivot grid and then
    /// swapped in.
    ///
    /// # Panics
    ///
    /// Panics if `row` or `col` does not name a constraint row and a
    /// coefficient column.
    pub fn pivot(&mut self, row: usize, col: usize) -> Pivot {
        assert!(
            (1..self.rows).contains(&row) && (1..self.cols).contains(&col),
            "pivot ({row}, {col}) outside {}x{} tableau",
            self.rows,
            self.cols
        );

        let old = &self.data;
        let element = old[row][col];
        let next: Vec<Vec<f64>> = old
            .iter()
            .enumerate()
            .map(|(i, line)| {
                line.iter()
                    .enumerate()
                    .map(|(j, &value)| {
                        if i == row && j == col {
                            1.0 / element
                        } else if i == row {
                            value / element
                        } else if j == col {
                            -value / element
                        } else {
                            value - line[col] * old[row][j] / element
                        }
                    })
                    .collect()
            })
            .collect();
        self.data = next;

        std::mem::swap(&mut self.basic[row - 1], &mut self.free[col - 1]);
        trace!("pivot ({row}, {col}): x{} enters, x{} leaves", self.basic[row - 1], self.free[col - 1]);

        let reference_reached = self.reference_pending && self.first_infeasible_row().is_none();
        if reference_reached {
            self.reference_pending = false;
        }

        Pivot {
            row,
            col,
            reference_reached,
        }
    }

    /// The ambivalent (dual) tableau: transposed, every entry negated.
    ///
    /// The result is an independent copy with fresh labels.
    pub fn dual(&self) -> Tableau {
        let data = (0..self.cols)
            .map(|j| (0..self.rows).map(|i| -self.data[i][j]).collect())
            .collect();
        Self::with_data(self.cols, self.rows, data)
    }
}
