use clap::{Parser, Subcommand, ValueEnum};
use dualplex_solver::{Sense, Solution, Solver, Tableau, TraceWriter};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "dualplex")]
#[command(about = "Tableau simplex solver with ambivalent (dual) task", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a tableau and its ambivalent task
    Solve {
        /// Whitespace-separated tableau numbers
        file: PathBuf,
        /// Tableau rows, objective row included
        #[arg(short, long, default_value_t = 4)]
        rows: usize,
        /// Tableau columns, free-member column included
        #[arg(short, long, default_value_t = 4)]
        cols: usize,
        /// Objective direction of the primal task
        #[arg(short, long, value_enum, default_value_t = Objective::Max)]
        sense: Objective,
        /// Skip the ambivalent task
        #[arg(long)]
        no_dual: bool,
        /// Do not print the pivot trace
        #[arg(short, long)]
        quiet: bool,
        /// Stop after this many pivots per task
        #[arg(long)]
        max_pivots: Option<usize>,
        /// Output format (pretty, json)
        #[arg(short, long, default_value = "pretty")]
        format: String,
    },
    /// Load a tableau and print it
    Check {
        /// Whitespace-separated tableau numbers
        file: PathBuf,
        #[arg(short, long, default_value_t = 4)]
        rows: usize,
        #[arg(short, long, default_value_t = 4)]
        cols: usize,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Objective {
    Min,
    Max,
}

impl From<Objective> for Sense {
    fn from(objective: Objective) -> Self {
        match objective {
            Objective::Min => Sense::Minimize,
            Objective::Max => Sense::Maximize,
        }
    }
}

fn load(file: &Path, rows: usize, cols: usize) -> Tableau {
    let mut tableau = match Tableau::new(rows, cols) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = tableau.load_path(file) {
        eprintln!("Error reading {}: {}", file.display(), e);
        std::process::exit(1);
    }
    tableau
}

/// Solve with the trace written to stdout unless `quiet`
fn run(quiet: bool, solve: impl FnOnce(&mut dyn FnMut(dualplex_solver::SolveEvent<'_>)) -> Solution) -> Solution {
    if quiet {
        return solve(&mut |_| {});
    }
    let mut trace = TraceWriter::new(io::stdout().lock());
    let solution = solve(&mut |event| trace.observe(event));
    if let Err(e) = trace.finish() {
        log::warn!("trace output failed: {}", e);
    }
    solution
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Solve {
            file,
            rows,
            cols,
            sense,
            no_dual,
            quiet,
            max_pivots,
            format,
        } => {
            let json = format == "json";
            let quiet = quiet || json;
            let mut primal = load(&file, rows, cols);
            let original = primal.clone();

            let mut solver = Solver::new();
            if let Some(max) = max_pivots {
                solver = solver.with_max_pivots(max);
            }

            let primal_solution = run(quiet, |observe| solver.solve_traced(&mut primal, sense.into(), observe));
            if !json {
                print!("{}", primal_solution);
            }

            let dual_solution = if no_dual {
                None
            } else {
                if !json {
                    println!();
                    println!("Solution of ambivalent task");
                    println!();
                }
                let solution = run(quiet, |observe| solver.solve_dual_traced(&original, observe).1);
                if !json {
                    print!("{}", solution);
                }
                Some(solution)
            };

            if json {
                let document = serde_json::json!({
                    "primal": primal_solution,
                    "ambivalent": dual_solution,
                });
                println!("{}", serde_json::to_string_pretty(&document).unwrap_or_else(|e| {
                    format!("Error: {}", e)
                }));
            }

            let _ = io::stdout().flush();
            if !primal_solution.is_optimal() {
                std::process::exit(1);
            }
        }
        Commands::Check { file, rows, cols } => {
            let tableau = load(&file, rows, cols);
            println!("✓ {} is a valid {}x{} tableau", file.display(), rows, cols);
            println!();
            print!("{}", tableau);
        }
    }
}
