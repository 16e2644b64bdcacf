//! Facility Location Solver - Command Line Interface
//!
//! Solves facility location and maximal-profit clustering instances with pooled
//! construction, local search and path relinking.

use clap::{Parser, Subcommand, ValueEnum};
use facloc_solver::config::{BranchingFactor, Filter, LocalSearchKind, PathRelinkingMode, RunConfig};
use facloc_solver::heuristics::find_best_solutions;
use facloc_solver::instance::Problem;
use facloc_solver::reduction::parse_strategies;
use facloc_solver::report::RunReport;

use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "facloc-solver")]
#[command(author = "M2 AI2D Student")]
#[command(version = "1.0")]
#[command(about = "A heuristic solver for facility location and maximal-profit clustering")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for the best solutions of an instance
    Solve {
        #[arg(short, long)]
        instance: PathBuf,

        /// Reduction strategy, e.g. `sdbs+:100:mgesum` or `_best:10` (repeatable)
        #[arg(long = "strategy")]
        strategies: Vec<String>,

        /// Worker threads
        #[arg(short, long, default_value = "4")]
        threads: usize,

        /// Independent restarts
        #[arg(short, long, default_value = "1")]
        restarts: usize,

        /// Random seed
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Number of solutions to output
        #[arg(long, default_value = "1")]
        target_sols: usize,

        /// Filter level for expanded solutions (0 to 4)
        #[arg(long, default_value = "3")]
        filter: u8,

        /// Children per solution: -1 for all, 0 for logarithmic
        #[arg(long, default_value = "-1", allow_hyphen_values = true)]
        branching_factor: i64,

        /// Keep the branching factor fixed even when pools are small
        #[arg(long)]
        no_branching_correction: bool,

        /// Prune solutions that cannot beat the best one found
        #[arg(long)]
        bnb: bool,

        #[arg(long, value_enum, default_value = "best")]
        local_search: LocalSearchArg,

        /// Local search walking between solutions during path relinking
        #[arg(long, value_enum, default_value = "best")]
        pr_local_search: LocalSearchArg,

        #[arg(long, value_enum, default_value = "off")]
        path_relinking: PathRelinkingArg,

        /// Run local search after selection instead of on every level
        #[arg(long)]
        ls_after_select: bool,

        /// Keep non-terminal solutions in the selection
        #[arg(long)]
        select_all: bool,

        /// Forbid moves that only close a facility
        #[arg(long)]
        no_rem_movement: bool,

        /// Forbid moves that only open a facility
        #[arg(long)]
        no_add_movement: bool,

        /// Write the JSON report to file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write per-restart times and values to a CSV file
        #[arg(long)]
        restarts_csv: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Analyze an instance
    Analyze {
        /// Path to the instance file
        #[arg(short, long)]
        instance: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LocalSearchArg {
    /// No local search
    None,
    /// Whitaker's fast exchange, best improvement
    Best,
    /// Whitaker's fast exchange, first improvement
    First,
    /// Resende and Werneck's accelerated swap
    Rw,
}

impl From<LocalSearchArg> for LocalSearchKind {
    fn from(arg: LocalSearchArg) -> Self {
        match arg {
            LocalSearchArg::None => LocalSearchKind::None,
            LocalSearchArg::Best => LocalSearchKind::BestImprovement,
            LocalSearchArg::First => LocalSearchKind::FirstImprovement,
            LocalSearchArg::Rw => LocalSearchKind::ResendeWerneck,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PathRelinkingArg {
    Off,
    /// A single round of relinking
    Once,
    /// Relink again while the best value improves
    UntilNoBetter,
}

impl From<PathRelinkingArg> for PathRelinkingMode {
    fn from(arg: PathRelinkingArg) -> Self {
        match arg {
            PathRelinkingArg::Off => PathRelinkingMode::Off,
            PathRelinkingArg::Once => PathRelinkingMode::OneIteration,
            PathRelinkingArg::UntilNoBetter => PathRelinkingMode::UntilNoBetter,
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Solve {
            instance,
            strategies,
            threads,
            restarts,
            seed,
            target_sols,
            filter,
            branching_factor,
            no_branching_correction,
            bnb,
            local_search,
            pr_local_search,
            path_relinking,
            ls_after_select,
            select_all,
            no_rem_movement,
            no_add_movement,
            output,
            restarts_csv,
            verbose,
        } => {
            init_logging(verbose);
            let filter = match Filter::from_level(filter) {
                Ok(filter) => filter,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            };
            let config = RunConfig {
                target_sols,
                n_threads: threads,
                n_restarts: restarts,
                seed,
                filter,
                branch_and_bound: bnb,
                branching_factor: BranchingFactor::from_arg(branching_factor),
                branching_correction: !no_branching_correction,
                local_search: local_search.into(),
                local_search_pr: pr_local_search.into(),
                path_relinking: path_relinking.into(),
                local_search_before_select: !ls_after_select,
                select_only_terminal: !select_all,
                local_search_rem_movement: !no_rem_movement,
                local_search_add_movement: !no_add_movement,
            };
            solve_instance(&instance, &strategies, config, output, restarts_csv, verbose);
        }

        Commands::Analyze { instance } => {
            init_logging(false);
            analyze_instance(&instance);
        }
    }
}

fn load_problem(path: &PathBuf) -> Problem {
    match Problem::from_file(path) {
        Ok(problem) => problem,
        Err(e) => {
            eprintln!("Error loading instance: {}", e);
            std::process::exit(1);
        }
    }
}

fn solve_instance(
    path: &PathBuf,
    nomenclatures: &[String],
    config: RunConfig,
    output: Option<PathBuf>,
    restarts_csv: Option<PathBuf>,
    verbose: bool,
) {
    log::info!("Loading instance from {:?}", path);
    let problem = load_problem(path);

    let strategies = match parse_strategies(nomenclatures) {
        Ok(strategies) => strategies,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    for strategy in &strategies {
        log::info!("Strategy {}: {} ({})", strategy, strategy.description(), strategy.phase.name());
    }

    let start = Instant::now();
    let result = match find_best_solutions(&problem, &config, &strategies) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    let elapsed = start.elapsed().as_secs_f64();

    let report = RunReport::new(problem.statistics(), config, &strategies, elapsed, result);
    if verbose {
        println!("{}", report);
    } else {
        match report.best() {
            Some(best) => println!("{}", best),
            None => println!("No solution found"),
        }
        println!("Time: {:.3}s", elapsed);
    }

    if let Some(out_path) = output {
        let json = match report.to_json() {
            Ok(json) => json,
            Err(e) => {
                eprintln!("Error serializing report: {}", e);
                std::process::exit(1);
            }
        };
        if let Err(e) = std::fs::write(&out_path, json) {
            eprintln!("Error writing {:?}: {}", out_path, e);
            std::process::exit(1);
        }
        log::info!("Report saved to {:?}", out_path);
    }

    if let Some(csv_path) = restarts_csv {
        if let Err(e) = report.export_restarts_csv(&csv_path) {
            eprintln!("Error writing {:?}: {}", csv_path, e);
            std::process::exit(1);
        }
        log::info!("Restart table saved to {:?}", csv_path);
    }
}

fn analyze_instance(path: &PathBuf) {
    let problem = load_problem(path);

    println!("========== Instance Analysis ==========\n");
    println!("{}", problem.statistics());

    let costs = &problem.facility_cost;
    if !costs.is_empty() {
        let min_cost = costs.iter().cloned().fold(f64::INFINITY, f64::min);
        let max_cost = costs.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        println!("\nFacility Costs:");
        println!("  Min: {:.2}", min_cost);
        println!("  Max: {:.2}", max_cost);
    }

    // clients whose best facility is worth more than staying unassigned
    let n_clients = problem.n_clients();
    let profitable = (0..n_clients)
        .filter(|&c| {
            (0..problem.n_facilities())
                .any(|f| problem.assignment_value(Some(f), c) > problem.assignment_value(None, c))
        })
        .count();
    println!("\nClients:");
    println!("  Worth serving: {} / {}", profitable, n_clients);
}
