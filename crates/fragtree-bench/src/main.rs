mod artifact;
mod logging;
mod report;

use clap::{Args, Parser, Subcommand, ValueEnum};
use fragtree_graph::{FragmentGraph, FragmentationTree};
use fragtree_highs::HighsFactory;
use fragtree_ilp::{ComputedTree, TreeSolver};
use fragtree_solver::TreeOptions;
use fragtree_tools::{
    StageMeasurement, SyntheticGraphConfig, capture_rss_bytes, rss_delta, synthetic_graph,
};
use report::Thresholds;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

const DEFAULT_VERTICES: [usize; 3] = [20, 40, 80];
const SCHEMA_VERSION: u32 = 1;

type BoxError = Box<dyn std::error::Error>;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Fragmentation tree benchmark runner and reporting interface"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Solve synthetic graphs and save JSONL artifacts
    Run(RunArgs),
    /// Solve a single synthetic graph and print its tree
    Solve(SolveArgs),
    /// Render benchmark artifact summaries
    Report(ReportArgs),
    /// Compare two benchmark artifacts and optionally enforce thresholds
    Compare(CompareArgs),
}

/// Synthetic graph shape and solver settings shared by `run` and `solve`.
#[derive(Args, Debug, Clone)]
struct SolveSettings {
    /// Number of colors; defaults to a third of the vertex count
    #[arg(long)]
    colors: Option<u32>,

    /// Probability of a loss between two fragments
    #[arg(long, default_value_t = 0.15)]
    density: f64,

    /// Seed of the graph generator
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Draw fragment formulas from a pool of this size so formulas repeat
    #[arg(long)]
    formula_pool: Option<usize>,

    /// Time limit per solve in seconds
    #[arg(long)]
    time_limit: Option<f64>,

    /// Threads hinted to the backend; 0 leaves the choice to the backend
    #[arg(long, default_value_t = num_cpus::get() as u32)]
    threads: u32,

    /// Reject trees scoring below this value
    #[arg(long)]
    minimal_score: Option<f64>,

    /// Log filter (for example, info or fragtree_ilp=debug); falls back to FRAGTREE_TRACE
    #[arg(long)]
    log_level: Option<String>,
}

impl SolveSettings {
    fn graph_config(&self, vertices: usize) -> SyntheticGraphConfig {
        SyntheticGraphConfig {
            vertices,
            colors: self
                .colors
                .unwrap_or_else(|| u32::try_from(vertices / 3).unwrap_or(u32::MAX).max(1)),
            density: self.density,
            seed: self.seed,
            formula_pool: self.formula_pool,
        }
    }

    fn tree_options(&self) -> TreeOptions {
        let mut options = TreeOptions::new().with_threads(self.threads);
        if let Some(seconds) = self.time_limit {
            options = options.with_time_limit(seconds);
        }
        if let Some(score) = self.minimal_score {
            options = options.with_minimal_score(score);
        }
        options
    }

    fn validate(&self) -> Result<(), BoxError> {
        if !(0.0..=1.0).contains(&self.density) {
            return Err(boxed_input_error("density must be within [0, 1]"));
        }
        if self.colors == Some(0) {
            return Err(boxed_input_error("colors must be greater than zero"));
        }
        if self.time_limit.is_some_and(|seconds| seconds <= 0.0) {
            return Err(boxed_input_error("time-limit must be greater than zero"));
        }
        Ok(())
    }
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Comma-separated list of fragment counts
    #[arg(long, value_delimiter = ',')]
    vertices: Option<Vec<usize>>,

    #[command(flatten)]
    settings: SolveSettings,

    /// Number of repetitions per case
    #[arg(long, default_value_t = 1)]
    repetitions: u32,

    /// Also solve each case seeded with its cold-start tree
    #[arg(long)]
    warm_start: bool,

    /// JSONL output artifact path
    #[arg(long)]
    output: Option<PathBuf>,

    /// Output format for stdout
    #[arg(long, value_enum, default_value = "table")]
    format: OutputFormat,
}

#[derive(Parser, Debug)]
struct SolveArgs {
    /// Number of fragments
    #[arg(long, default_value_t = 40)]
    vertices: usize,

    #[command(flatten)]
    settings: SolveSettings,

    /// Output format for stdout
    #[arg(long, value_enum, default_value = "table")]
    format: OutputFormat,
}

#[derive(Parser, Debug)]
struct ReportArgs {
    /// Input JSONL benchmark artifact
    #[arg(long)]
    input: PathBuf,

    /// Output format for stdout
    #[arg(long, value_enum, default_value = "table")]
    format: OutputFormat,
}

#[derive(Parser, Debug)]
struct CompareArgs {
    /// Baseline JSONL benchmark artifact
    #[arg(long)]
    baseline: PathBuf,

    /// Candidate JSONL benchmark artifact
    #[arg(long)]
    candidate: PathBuf,

    /// Stage filter for comparison (for example, solve or total)
    #[arg(long, default_value = "total")]
    stage: String,

    /// Fail if duration regression exceeds this percentage
    #[arg(long)]
    duration_threshold_pct: Option<f64>,

    /// Fail if memory regression exceeds this percentage
    #[arg(long)]
    memory_threshold_pct: Option<f64>,

    /// Output format for stdout
    #[arg(long, value_enum, default_value = "table")]
    format: OutputFormat,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Ndjson,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum Scenario {
    Cold,
    Warm,
}

impl Scenario {
    fn as_str(self) -> &'static str {
        match self {
            Scenario::Cold => "cold",
            Scenario::Warm => "warm",
        }
    }
}

/// Outcome of one solve, successful or not.
#[derive(Debug, Clone)]
struct CaseExecution {
    vertices: usize,
    losses: usize,
    rows: usize,
    status: String,
    score: Option<f64>,
    stage_measurements: Vec<StageMeasurement>,
    tree: Option<FragmentationTree>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct BenchRecord {
    schema_version: u32,
    run_id: String,
    scenario: String,
    case_name: String,
    repetition: u32,
    vertices: usize,
    losses: usize,
    rows: usize,
    status: String,
    score: Option<f64>,
    stage: String,
    duration_ms: f64,
    rss_before_bytes: Option<u64>,
    rss_after_bytes: Option<u64>,
    rss_delta_bytes: Option<i64>,
}

#[derive(Debug, Serialize)]
struct SolveReport<'a> {
    backend: &'a str,
    status: &'a str,
    score: f64,
    root_score: f64,
    tree_weight: f64,
    score_gap: f64,
    columns: usize,
    rows: usize,
    tree: &'a FragmentationTree,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), BoxError> {
    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => run_command(args),
        Command::Solve(args) => solve_command(args),
        Command::Report(args) => report_command(args),
        Command::Compare(args) => compare_command(args),
    }
}

fn highs_solver() -> TreeSolver {
    TreeSolver::new(Arc::new(HighsFactory::new())).with_memory_tracking(true)
}

fn run_command(args: RunArgs) -> Result<(), BoxError> {
    logging::init_logging(args.settings.log_level.as_deref())?;
    args.settings.validate()?;
    if args.repetitions == 0 {
        return Err(boxed_input_error("repetitions must be greater than zero"));
    }

    let run_id = artifact::new_run_id()?;
    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("artifacts/bench/{run_id}.jsonl")));

    let solver = highs_solver();
    let options = args.settings.tree_options();
    let cases = args
        .vertices
        .clone()
        .unwrap_or_else(|| DEFAULT_VERTICES.to_vec());

    let mut records = Vec::new();
    for vertices in cases {
        let config = args.settings.graph_config(vertices);
        let graph = synthetic_graph(&config)?;
        let case = CaseLabel {
            run_id: &run_id,
            name: format!("v{}_c{}", vertices, config.colors),
        };

        for repetition in 1..=args.repetitions {
            let cold = execute_case(&solver, &graph, &options);
            records.extend(case.records(Scenario::Cold, repetition, &cold));

            if !args.warm_start {
                continue;
            }
            let Some(template) = cold.tree else {
                warn!(
                    component = "bench",
                    operation = "warm_start",
                    status = "skipped",
                    case = case.name.as_str(),
                    "Cold solve produced no tree to start from"
                );
                continue;
            };
            let warm = execute_case(&solver, &graph, &options.clone().with_template(template));
            records.extend(case.records(Scenario::Warm, repetition, &warm));
        }
    }

    artifact::write_jsonl(&output_path, &records)?;
    emit(args.format, &records, |records| {
        report::summary_table(&report::summarize(records))
    })?;
    println!("artifact: {}", output_path.display());
    Ok(())
}

fn solve_command(args: SolveArgs) -> Result<(), BoxError> {
    logging::init_logging(args.settings.log_level.as_deref())?;
    args.settings.validate()?;

    let graph = synthetic_graph(&args.settings.graph_config(args.vertices))?;
    let computed = highs_solver().compute(&graph, &args.settings.tree_options())?;
    match args.format {
        OutputFormat::Table => print!("{}", tree_table(&computed)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&solve_report(&computed))?),
        OutputFormat::Ndjson => println!("{}", serde_json::to_string(&solve_report(&computed))?),
    }
    Ok(())
}

fn report_command(args: ReportArgs) -> Result<(), BoxError> {
    let records: Vec<BenchRecord> = artifact::read_jsonl(&args.input)?;
    emit(args.format, &records, |records| {
        report::summary_table(&report::summarize(records))
    })
}

fn compare_command(args: CompareArgs) -> Result<(), BoxError> {
    let baseline: Vec<BenchRecord> = artifact::read_jsonl(&args.baseline)?;
    let candidate: Vec<BenchRecord> = artifact::read_jsonl(&args.candidate)?;
    let rows = report::compare(
        &report::summarize(&baseline),
        &report::summarize(&candidate),
        &args.stage,
    );
    if rows.is_empty() {
        return Err(boxed_input_error(
            "no overlapping scenario/case/stage rows to compare",
        ));
    }

    emit(args.format, &rows, report::compare_table)?;
    let thresholds = Thresholds {
        duration_pct: args.duration_threshold_pct,
        memory_pct: args.memory_threshold_pct,
    };
    if rows.iter().any(|row| row.regressed(thresholds)) {
        return Err(boxed_input_error(
            "regression threshold violated (see compare output)",
        ));
    }
    Ok(())
}

/// Print `values` as a table, pretty JSON or one JSON object per line.
fn emit<T: Serialize>(
    format: OutputFormat,
    values: &[T],
    table: impl FnOnce(&[T]) -> String,
) -> Result<(), BoxError> {
    match format {
        OutputFormat::Table => print!("{}", table(values)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(values)?),
        OutputFormat::Ndjson => {
            for value in values {
                println!("{}", serde_json::to_string(value)?);
            }
        }
    }
    Ok(())
}

/// Run and case identity shared by every record of a case.
struct CaseLabel<'a> {
    run_id: &'a str,
    name: String,
}

impl CaseLabel<'_> {
    /// One record per measured stage.
    fn records(
        &self,
        scenario: Scenario,
        repetition: u32,
        execution: &CaseExecution,
    ) -> Vec<BenchRecord> {
        execution
            .stage_measurements
            .iter()
            .map(|measurement| BenchRecord {
                schema_version: SCHEMA_VERSION,
                run_id: self.run_id.to_string(),
                scenario: scenario.as_str().to_string(),
                case_name: self.name.clone(),
                repetition,
                vertices: execution.vertices,
                losses: execution.losses,
                rows: execution.rows,
                status: execution.status.clone(),
                score: execution.score,
                stage: measurement.stage.clone(),
                duration_ms: measurement.duration_ms(),
                rss_before_bytes: measurement.rss_before_bytes,
                rss_after_bytes: measurement.rss_after_bytes,
                rss_delta_bytes: measurement.rss_delta_bytes,
            })
            .collect()
    }
}

/// Solve `graph` once and collect the solver's stages plus a `total` stage.
///
/// Failed solves are recorded with their status and a `total` stage only.
fn execute_case(
    solver: &TreeSolver,
    graph: &FragmentGraph,
    options: &TreeOptions,
) -> CaseExecution {
    let total_started = Instant::now();
    let total_rss_before = capture_rss_bytes("bench_total");
    let result = solver.compute(graph, options);
    let total_duration = total_started.elapsed();
    let total_rss_after = capture_rss_bytes("bench_total");

    let total = StageMeasurement {
        stage: "total".to_string(),
        duration: total_duration,
        rss_before_bytes: total_rss_before,
        rss_after_bytes: total_rss_after,
        rss_delta_bytes: rss_delta(total_rss_before, total_rss_after),
    };

    match result {
        Ok(computed) => {
            info!(
                component = "bench",
                operation = "execute_case",
                status = computed.status.as_str(),
                vertices = graph.num_vertices(),
                losses = graph.num_losses(),
                score = computed.score,
                duration_ms = total.duration_ms(),
                "Solved case"
            );
            let mut stages = computed.statistics.stages.clone();
            stages.push(total);
            CaseExecution {
                vertices: graph.num_vertices(),
                losses: graph.num_losses(),
                rows: computed.statistics.num_rows(),
                status: computed.status.as_str().to_string(),
                score: Some(computed.score),
                stage_measurements: stages,
                tree: Some(computed.tree),
            }
        }
        Err(err) => {
            warn!(
                component = "bench",
                operation = "execute_case",
                status = "error",
                code = err.code(),
                vertices = graph.num_vertices(),
                losses = graph.num_losses(),
                error = %err,
                "Case failed"
            );
            let status = err
                .status()
                .map_or_else(|| err.code().to_string(), |status| status.as_str().to_string());
            CaseExecution {
                vertices: graph.num_vertices(),
                losses: graph.num_losses(),
                rows: 0,
                status,
                score: None,
                stage_measurements: vec![total],
                tree: None,
            }
        }
    }
}

fn solve_report(computed: &ComputedTree) -> SolveReport<'_> {
    SolveReport {
        backend: &computed.statistics.backend,
        status: computed.status.as_str(),
        score: computed.score,
        root_score: computed.tree.root_score(),
        tree_weight: computed.tree.tree_weight(),
        score_gap: computed.statistics.score_gap,
        columns: computed.statistics.num_columns,
        rows: computed.statistics.num_rows(),
        tree: &computed.tree,
    }
}

fn tree_table(computed: &ComputedTree) -> String {
    let mut out = format!(
        "backend: {}  status: {}  score: {:.4}  edges: {}\n",
        computed.statistics.backend,
        computed.status,
        computed.score,
        computed.tree.num_edges()
    );
    out.push_str(&format_tree(&computed.tree));
    for stage in &computed.statistics.stages {
        let _ = writeln!(out, "{:<12} {:>12.3} ms", stage.stage, stage.duration_ms());
    }
    out
}

/// One line per node, indented by depth, children in insertion order.
fn format_tree(tree: &FragmentationTree) -> String {
    let mut out = String::new();
    let mut stack = vec![(0usize, 0usize)];
    while let Some((index, depth)) = stack.pop() {
        let Some(node) = tree.node(index) else {
            continue;
        };
        let indent = "  ".repeat(depth);
        match (&node.loss_formula, depth) {
            (_, 0) => {
                let _ = writeln!(out, "{indent}{} (root)", node.formula);
            }
            (Some(loss), _) if !loss.is_empty() => {
                let _ = writeln!(
                    out,
                    "{indent}{} [color {}] {:+.4} via -{}",
                    node.formula, node.color, node.incoming_weight, loss
                );
            }
            _ => {
                let _ = writeln!(
                    out,
                    "{indent}{} [color {}] {:+.4}",
                    node.formula, node.color, node.incoming_weight
                );
            }
        }
        for &child in tree.children(index).iter().rev() {
            stack.push((child, depth + 1));
        }
    }
    out
}

fn boxed_input_error(message: &str) -> BoxError {
    Box::new(std::io::Error::new(
        std::io::ErrorKind::InvalidInput,
        message.to_string(),
    ))
}
