mod config;
mod loader;
mod output;

use clap::Parser;
use itemdiff_core::{merge_sources, run_analysis, AnalysisOptions, SourceTable};
use std::path::PathBuf;

pub fn bail(msg: impl std::fmt::Display) -> ! {
    eprintln!("Error: {msg}");
    std::process::exit(1);
}

#[derive(Parser)]
#[command(
    name = "itemdiff",
    version,
    about = "Compare perceived vs. empirical item difficulty from pairwise judgements"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Run the full analysis pipeline on CSV tables
    Analyze(AnalyzeArgs),
    /// Create a remap.toml template in the current directory
    Init,
}

#[derive(Parser)]
struct AnalyzeArgs {
    /// Comparison CSV files, one per source (repeatable)
    #[arg(long = "comparisons", required = true, num_args = 1..)]
    comparisons: Vec<PathBuf>,

    /// Expected-score table CSV (item, theta, expected_score)
    #[arg(long)]
    expected_scores: PathBuf,

    /// TOML remap from expected-score item labels to canonical numbers
    #[arg(long)]
    remap: PathBuf,

    /// Size of the canonical item set (IDs 1..=N)
    #[arg(long, default_value_t = 20)]
    items: i64,

    /// Iteration cap for the paired-comparison fit
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Output JSON instead of tables
    #[arg(long)]
    json: bool,

    /// Show progress during execution
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze(args) => run_analyze(args),
        Commands::Init => {
            let path = config::create_default_remap();
            println!("Created remap template at {}", path.display());
            println!("Fill in the [items] table for your expected-score labels.");
        }
    }
}

fn run_analyze(args: AnalyzeArgs) {
    if args.items < 2 {
        bail(format!("--items must be at least 2, got {}", args.items));
    }
    let item_ids: Vec<i64> = (1..=args.items).collect();

    let tables: Vec<SourceTable> = args
        .comparisons
        .iter()
        .map(|path| {
            let table = loader::load_comparison_table(path);
            if args.verbose {
                eprintln!(
                    "Loaded {} records from {} (tag \"{}\")",
                    table.records.len(),
                    path.display(),
                    table.tag,
                );
            }
            table
        })
        .collect();

    let records = merge_sources(&tables).unwrap_or_else(|e| bail(e));
    if args.verbose {
        eprintln!("Merged {} records from {} sources", records.len(), tables.len());
    }

    let curve_points = loader::load_expected_scores(&args.expected_scores);
    let remap = config::load_remap(&args.remap);
    if args.verbose {
        eprintln!(
            "Loaded {} expected-score points, {} remap entries",
            curve_points.len(),
            remap.len(),
        );
    }

    let mut options = AnalysisOptions::default();
    if let Some(cap) = args.max_iterations {
        options.fit.max_iterations = cap;
    }

    let report = run_analysis(&item_ids, &records, &curve_points, &remap, &options)
        .unwrap_or_else(|e| bail(e));

    // Convergence warnings ride along with the results, never replace them.
    for fit in [&report.student, &report.expert] {
        if !fit.converged {
            eprintln!(
                "Warning: {} fit hit the {}-iteration cap without converging; \
                 treat its estimates with care",
                fit.cohort, fit.iterations,
            );
        }
    }

    if args.json {
        output::print_json(&report);
    } else {
        output::print_report(&report);
    }
}
