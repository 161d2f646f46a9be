use std::fmt;
use std::io::{self, Write};

use crate::simplex::SolveEvent;
use crate::solution::Solution;
use crate::tableau::Tableau;

/// Width of every tableau cell
const WIDTH: usize = 10;
const SIGNIFICANT: usize = 5;

/// Format a number with 5 significant digits, trailing zeros trimmed.
///
/// Magnitudes below 1e-4 or from 1e5 up switch to exponent form,
/// e.g. `1.2346e+05`.
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if !value.is_finite() {
        return value.to_string();
    }

    let scientific = format!("{:.*e}", SIGNIFICANT - 1, value);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= SIGNIFICANT as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_zeros(mantissa), sign, exponent.abs())
    } else {
        let decimals = (SIGNIFICANT as i32 - 1 - exponent) as usize;
        trim_zeros(&format!("{:.*}", decimals, value)).to_string()
    }
}

fn trim_zeros(number: &str) -> &str {
    if number.contains('.') {
        number.trim_end_matches('0').trim_end_matches('.')
    } else {
        number
    }
}

impl fmt::Display for Tableau {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "|{:>WIDTH$}|{:>WIDTH$}", "", "S")?;
        for id in self.free_labels() {
            write!(f, "|{:>WIDTH$}", format!("x{id}"))?;
        }
        writeln!(f, "|")?;

        for i in 0..self.rows() {
            let label = match i {
                0 => "F".to_string(),
                _ => format!("x{}", self.basic_labels()[i - 1]),
            };
            write!(f, "|{label:>WIDTH$}")?;
            for &value in self.row(i) {
                write!(f, "|{:>WIDTH$}", format_number(value))?;
            }
            writeln!(f, "|")?;
        }
        writeln!(f)
    }
}

impl fmt::Display for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_optimal() {
            return writeln!(f, "Unacceptable solution");
        }

        writeln!(f, "Optimal solution:")?;
        writeln!(f, "F = {}", format_number(self.objective_value))?;
        for assignment in &self.basic {
            write!(f, "x{} = {}; ", assignment.id, format_number(assignment.value))?;
        }
        writeln!(f)?;
        for id in &self.free {
            write!(f, "x{id} = ")?;
        }
        writeln!(f, "0;")
    }
}

/// Writes solve events as a console trace.
///
/// The first write error is kept and returned by [`TraceWriter::finish`];
/// later events are dropped.
pub struct TraceWriter<W: Write> {
    out: W,
    error: Option<io::Error>,
}

impl<W: Write> TraceWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out, error: None }
    }

    pub fn observe(&mut self, event: SolveEvent<'_>) {
        if self.error.is_none() {
            if let Err(e) = self.write_event(event) {
                self.error = Some(e);
            }
        }
    }

    fn write_event(&mut self, event: SolveEvent<'_>) -> io::Result<()> {
        match event {
            SolveEvent::Start(tableau) => write!(self.out, "{tableau}"),
            SolveEvent::Pivot { tableau, pivot } => {
                if pivot.reference_reached {
                    writeln!(self.out, "Reference solution:")?;
                }
                write!(self.out, "{tableau}")?;
                writeln!(self.out, "{} {}", pivot.row, pivot.col)
            }
        }
    }

    pub fn finish(mut self) -> io::Result<W> {
        match self.error.take() {
            Some(e) => Err(e),
            None => {
                self.out.flush()?;
                Ok(self.out)
            }
        }
    }
}
