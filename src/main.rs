//! codesim - structural similarity detection for student submissions
//!
//! A single-command CLI around the detection engine: fetch the configured
//! repositories, load and parse every project directory, compare all
//! same-language pairs in parallel, and write the cross-linked spreadsheet.

use anyhow::Result;
use chrono::Local;
use clap::Parser;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Mutex;

use codesim::types::{ColorMode, CompareConfig, RemoteConfig, RunConfig};
use codesim::{DetectionEngine, ProgressReporter, RunOutcome};

/// codesim - structural similarity detection for student submissions
#[derive(Parser)]
#[command(name = "codesim")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Output spreadsheet filename (defaults to a timestamped name)
    #[arg(long)]
    out: Option<PathBuf>,

    /// Environment file holding the remote token and group identifier
    #[arg(long)]
    env: Option<PathBuf>,

    /// File of `url [name]` lines describing projects to fetch
    #[arg(long)]
    projects_file: Option<PathBuf>,

    /// File of `url [name]` lines describing templates to fetch
    #[arg(long)]
    templates_file: Option<PathBuf>,

    /// GitLab personal access token
    #[arg(long)]
    token: Option<String>,

    /// Root group identifier whose subgroups hold the submissions
    #[arg(long)]
    group_id: Option<String>,

    /// Skip any remote fetch
    #[arg(long)]
    offline: bool,

    /// Fetch sources and exit
    #[arg(long)]
    clone_only: bool,

    /// Enable the fast-scan gate (skips descent into lopsided collections)
    #[arg(long)]
    fast: bool,

    /// Worker count (defaults to one fewer than the hardware threads)
    #[arg(long)]
    cpu: Option<usize>,

    /// Local directory holding the submission projects
    #[arg(long, default_value = "projects")]
    projects_directory: PathBuf,

    /// Local directory holding the template projects
    #[arg(long, default_value = "templates")]
    templates_directory: PathBuf,

    /// Include the weight column in detail sheets
    #[arg(long)]
    weight: bool,

    /// Use the three-band palette instead of the continuous gradient
    #[arg(long)]
    legacy_color: bool,

    /// Case-insensitive filter applied to remote project names
    #[arg(long)]
    project_name_regex: Option<String>,

    /// Verbose logging
    #[arg(long)]
    debug: bool,
}

/// Progress bars for the pipeline stages, one at a time.
struct CliProgress {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliProgress {
    fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }
}

impl ProgressReporter for CliProgress {
    fn start(&self, total: u64, message: &str) {
        let bar = if total == 0 {
            ProgressBar::new_spinner()
        } else {
            let bar = ProgressBar::new(total);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template(
                        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
                    )
                    .expect("Invalid progress bar template - this is a bug in codesim")
                    .progress_chars("█▓░"),
            );
            bar
        };
        bar.set_message(message.to_string());
        *self.bar.lock().expect("progress bar lock poisoned") = Some(bar);
    }

    fn inc(&self, delta: u64) {
        if let Some(bar) = &*self.bar.lock().expect("progress bar lock poisoned") {
            bar.inc(delta);
        }
    }

    fn finish(&self, message: &str) {
        if let Some(bar) = self.bar.lock().expect("progress bar lock poisoned").take() {
            bar.finish_with_message(message.to_string());
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let config = build_config(cli);

    println!("{}", style("codesim").cyan().bold());
    println!("{}", style("═".repeat(60)).dim());

    let progress = CliProgress::new();
    let outcome = DetectionEngine::new(&config)
        .with_progress(&progress)
        .run()?;

    if config.clone_only {
        println!(
            "\n{} Sources fetched into {}",
            style("✓").green(),
            config.projects_dir.display()
        );
        report_unmatched(&outcome);
        return Ok(());
    }

    display_outcome(&outcome);
    Ok(())
}

/// Resolve CLI flags into the engine configuration.
fn build_config(cli: Cli) -> RunConfig {
    let workers = cli
        .cpu
        .unwrap_or_else(|| num_cpus::get().saturating_sub(1))
        .max(1);
    let output = cli
        .out
        .unwrap_or_else(|| PathBuf::from(RunConfig::default_output_name(Local::now())));
    RunConfig {
        projects_dir: cli.projects_directory,
        templates_dir: cli.templates_directory,
        output,
        env_file: cli.env,
        projects_file: cli.projects_file,
        templates_file: cli.templates_file,
        offline: cli.offline,
        clone_only: cli.clone_only,
        workers,
        include_weight: cli.weight,
        color_mode: if cli.legacy_color {
            ColorMode::ThreeBand
        } else {
            ColorMode::Gradient
        },
        remote: RemoteConfig {
            token: cli.token,
            group_id: cli.group_id,
            project_name_regex: cli.project_name_regex,
        },
        compare: CompareConfig {
            fast_scan: cli.fast,
            ..CompareConfig::default()
        },
    }
}

/// Print the run summary: counts, the most suspicious pairs, and where the
/// workbook landed.
fn display_outcome(outcome: &RunOutcome) {
    println!("\n{}", style("Results").cyan().bold());
    println!("{}", style("─".repeat(60)).dim());
    println!(
        "  Compared {} pairs across {} projects",
        style(outcome.compared_pairs).green(),
        style(outcome.project_count).green()
    );

    if !outcome.summaries.is_empty() {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(vec!["Language", "First", "Second", "Score"]);
        for summary in outcome.summaries.iter().take(15) {
            table.add_row(vec![
                Cell::new(summary.language),
                Cell::new(&summary.first),
                Cell::new(&summary.second),
                score_cell(summary.probability),
            ]);
        }
        println!("{table}");
        if outcome.summaries.len() > 15 {
            println!(
                "  {} more pairs in the spreadsheet",
                outcome.summaries.len() - 15
            );
        }
    }

    if !outcome.skipped.is_empty() {
        println!(
            "  {} {}",
            style("Skipped (no parseable sources):").yellow(),
            outcome.skipped.join(", ")
        );
    }
    report_unmatched(outcome);

    if let Some(output) = &outcome.output {
        println!(
            "\n{} Report written to {}",
            style("✓").green().bold(),
            style(output.display()).white().bold()
        );
    }
}

fn report_unmatched(outcome: &RunOutcome) {
    if !outcome.unmatched.is_empty() {
        println!(
            "  {} {}",
            style("Not acquired:").yellow(),
            outcome.unmatched.join(", ")
        );
    }
}

/// Colour a score cell in line with the heatmap bands.
fn score_cell(probability: u32) -> Cell {
    let cell = Cell::new(probability);
    if probability > 85 {
        cell.fg(Color::Red)
    } else if probability > 70 {
        cell.fg(Color::Yellow)
    } else {
        cell.fg(Color::Green)
    }
}
