use airisk::report::{self, Summary};
use airisk::{
    attach_results, build_prompt, validate, Assessor, AugmentedTable, GeminiClient, GenerationConfig, ModelClient,
    RawTable, Validated,
};
use chrono::Local;
use clap::{Args as ClapArgs, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Parser, Debug)]
#[command(name = "airisk")]
#[command(author, version, about = "AI risk assessment for IT asset inventories (CSV)")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Inventory CSV, or a directory of them (optional in GUI mode)
    path: Option<PathBuf>,

    /// Launch GUI file picker (auto-enabled when double-clicked)
    #[arg(long)]
    gui: bool,

    /// Output report file (.csv, .json, .html)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Directory for auto-generated reports
    #[arg(long, default_value = "airisk-reports")]
    report_dir: PathBuf,

    /// Don't auto-generate CSV report
    #[arg(long)]
    no_report: bool,

    /// Don't prompt to open report
    #[arg(long)]
    no_open: bool,

    /// Concurrent model calls (default: 1, strictly in order)
    #[arg(short, long, default_value = "1")]
    jobs: usize,

    /// Print every assessment in full
    #[arg(short, long)]
    verbose: bool,

    /// Only show summary
    #[arg(short, long)]
    quiet: bool,

    #[command(flatten)]
    model: ModelArgs,
}

/// Settings for the generative model endpoint
#[derive(ClapArgs, Debug, Clone)]
struct ModelArgs {
    /// API key for the Generative Language API
    #[arg(long, env = "GOOGLE_AI_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,

    /// Model resource name (models/... or tunedModels/...)
    #[arg(long, env = "AIRISK_MODEL", default_value = airisk::model::gemini::DEFAULT_MODEL, global = true)]
    model: String,

    /// API base URL
    #[arg(long, env = "AIRISK_ENDPOINT", default_value = airisk::model::gemini::DEFAULT_ENDPOINT, global = true)]
    endpoint: String,

    /// Maximum tokens per assessment (100-200)
    #[arg(long, default_value = "200", value_parser = clap::value_parser!(u32).range(100..=200), global = true)]
    max_output_tokens: u32,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "60", global = true)]
    timeout_secs: u64,
}

impl ModelArgs {
    fn client(&self) -> GeminiClient {
        let config = GenerationConfig {
            max_output_tokens: self.max_output_tokens,
            ..GenerationConfig::default()
        };
        GeminiClient::new(self.api_key.clone())
            .with_endpoint(self.endpoint.clone())
            .with_model(self.model.clone())
            .with_config(config)
            .with_timeout(self.timeout_secs)
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start interactive web UI
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3001")]
        port: u16,

        /// Don't open a browser
        #[arg(long)]
        no_open: bool,
    },

    /// Ask the model a free-text question
    Query {
        /// Question, sent verbatim
        text: String,
    },

    /// Check an inventory against the column contract without calling the model
    Validate {
        /// Inventory CSV
        path: PathBuf,

        /// Print the prompt each record would send
        #[arg(long)]
        prompts: bool,
    },
}

fn main() {
    let mut args = Args::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if args.verbose { "info" } else { "warn" }),
    )
    .init();

    // Handle subcommands first
    if let Some(cmd) = args.command.take() {
        match cmd {
            Command::Serve { port, no_open } => {
                let client = args.model.client();
                warn_if_unconfigured(&client);
                if let Err(e) = airisk::serve::start(port, &client, !no_open) {
                    eprintln!("Server error: {}", e);
                    std::process::exit(1);
                }
            }
            Command::Query { text } => {
                let client = args.model.client();
                let result = Assessor::new(client).ask(&text);
                match result.failure_reason() {
                    None => println!("{}", result.text()),
                    Some(reason) => {
                        eprintln!("\x1b[31m{}\x1b[0m: {}", result.text(), reason);
                        std::process::exit(2);
                    }
                }
            }
            Command::Validate { path, prompts } => {
                let validated = load(&path).unwrap_or_else(|e| fail(&path, &e));
                print_validation(&path, &validated, false);
                if prompts {
                    for record in validated.table.records() {
                        match build_prompt(record) {
                            Ok(p) => println!("{}\n{}", p, "─".repeat(70)),
                            Err(e) => fail(&path, &e.into()),
                        }
                    }
                }
            }
        }
        return;
    }

    // Determine if we should use GUI mode
    // With GUI feature: launch GUI if --gui flag OR no path provided
    #[cfg(feature = "gui")]
    let use_gui = args.gui || args.path.is_none();

    #[cfg(not(feature = "gui"))]
    let use_gui = false;

    #[cfg(feature = "gui")]
    let path = if use_gui {
        match pick_path_gui() {
            Some(p) => p,
            None => {
                eprintln!("No file or folder selected.");
                std::process::exit(0);
            }
        }
    } else {
        match args.path.clone() {
            Some(p) => p,
            None => std::process::exit(1),
        }
    };

    #[cfg(not(feature = "gui"))]
    let path = if let Some(p) = args.path.clone() {
        p
    } else {
        eprintln!("Usage: airisk <PATH>");
        eprintln!("Run 'airisk --help' for more options.");
        eprintln!("Note: GUI mode not available in this build.");
        std::process::exit(1);
    };

    let files = collect_inventories(&path, &args.report_dir);
    if files.is_empty() {
        eprintln!("No CSV inventories found at {}", path.display());
        std::process::exit(1);
    }
    if args.output.is_some() && files.len() > 1 {
        eprintln!("--output names a single report; {} inventories found. Use --report-dir.", files.len());
        std::process::exit(1);
    }

    let client = args.model.client();
    warn_if_unconfigured(&client);
    let assessor = Assessor::new(client).with_jobs(args.jobs);

    if !args.quiet {
        eprintln!("\x1b[1mAIRisk Analysis\x1b[0m");
        eprintln!("{}", "─".repeat(70));
        eprintln!("Found {} inventory file(s)\n", files.len());
    }

    let mut total_failed = 0;
    let mut total_errors = 0;
    let mut reports = Vec::new();

    for file in &files {
        match run_batch(file, &assessor, &args) {
            Ok((augmented, report_path)) => {
                total_failed += augmented.failed();
                reports.extend(report_path);
            }
            Err(e) => {
                eprintln!("\x1b[31m✗ {}\x1b[0m: {}", file.display(), e);
                total_errors += 1;
            }
        }
    }

    // Open report
    if let Some(report_path) = reports.first() {
        if !args.no_open && reports.len() == 1 {
            if use_gui {
                // In GUI mode, auto-open the report (no prompt)
                let _ = open::that(report_path);
            } else if !args.quiet {
                eprint!("\nOpen report? [Y/n] ");
                io::stderr().flush().ok();

                let mut input = String::new();
                if io::stdin().read_line(&mut input).is_ok() {
                    let input = input.trim().to_lowercase();
                    if input.is_empty() || input == "y" || input == "yes" {
                        if let Err(e) = open::that(report_path) {
                            eprintln!("Failed to open report: {}", e);
                        }
                    }
                }
            }
        }
    }

    if !args.quiet {
        eprintln!("\n\x1b[90mAnalysis complete.\x1b[0m");
    }

    if total_errors > 0 {
        std::process::exit(1);
    } else if total_failed > 0 {
        std::process::exit(2);
    }
}

/// Validate, assess and report one inventory file
fn run_batch<C: ModelClient>(
    file: &Path,
    assessor: &Assessor<C>,
    args: &Args,
) -> airisk::Result<(AugmentedTable, Option<PathBuf>)> {
    let validated = load(file)?;
    if !args.quiet {
        print_validation(file, &validated, true);
    }
    let table = &validated.table;

    // Set up progress bar
    let pb = if !args.quiet && table.len() > 1 {
        let pb = ProgressBar::new(table.len() as u64);
        if let Ok(style) = ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}") {
            pb.set_style(style.progress_chars("=>-"));
        }
        Some(pb)
    } else {
        None
    };

    let results = assessor.assess_table(table, |done, _total| {
        if let Some(ref pb) = pb {
            pb.set_position(done as u64);
        }
    })?;

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    let augmented = attach_results(table, results)?;

    if !args.quiet {
        print_results(&augmented, args.verbose);
    }
    print_summary(&Summary::from_augmented(&augmented));

    // Determine report path
    let report_path = if let Some(ref output) = args.output {
        Some(output.clone())
    } else if !args.no_report {
        std::fs::create_dir_all(&args.report_dir)?;
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let stem = file.file_stem().and_then(|s| s.to_str()).unwrap_or("inventory");
        let filename = format!("ai_risk_assessment_{}_{}.csv", stem, timestamp);
        Some(args.report_dir.join(filename))
    } else {
        None
    };

    if let Some(ref output_path) = report_path {
        report::generate(output_path, &augmented)?;
        if !args.quiet {
            eprintln!("\x1b[32mReport saved: {}\x1b[0m", output_path.display());
        }
    }

    Ok((augmented, report_path))
}

fn load(path: &Path) -> airisk::Result<Validated> {
    let raw = RawTable::from_path(path)?;
    Ok(validate(raw)?)
}

/// CSV files under `path`, skipping anything inside `report_dir` so earlier
/// reports are not assessed again
fn collect_inventories(path: &Path, report_dir: &Path) -> Vec<PathBuf> {
    if path.is_dir() {
        let skip = report_dir.canonicalize().ok();
        let mut files: Vec<PathBuf> = WalkDir::new(path)
            .into_iter()
            .filter_entry(|e| {
                e.depth() == 0 || !e.file_type().is_dir() || !is_within(e.path(), skip.as_deref())
            })
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| ext.eq_ignore_ascii_case("csv"))
                    .unwrap_or(false)
            })
            .map(|e| e.path().to_path_buf())
            .collect();
        files.sort();
        files
    } else if path.exists() {
        vec![path.to_path_buf()]
    } else {
        vec![]
    }
}

fn is_within(path: &Path, dir: Option<&Path>) -> bool {
    match dir {
        Some(dir) => path.canonicalize().map(|p| p.starts_with(dir)).unwrap_or(false),
        None => false,
    }
}

fn print_validation(path: &Path, validated: &Validated, brief: bool) {
    eprintln!(
        "\x1b[1m{}\x1b[0m: {} asset(s), {} column(s)",
        path.display(),
        validated.table.len(),
        validated.table.columns().len()
    );
    for warning in &validated.warnings {
        eprintln!("  \x1b[33m! {}\x1b[0m", warning);
    }
    if !brief && validated.warnings.is_empty() {
        eprintln!("  \x1b[32m✓ All columns present\x1b[0m");
    }
}

fn print_results(augmented: &AugmentedTable, verbose: bool) {
    for (record, result) in augmented.rows() {
        let (color, mark) = if result.is_success() { ("\x1b[32m", "✓") } else { ("\x1b[31m", "✗") };
        let reset = "\x1b[0m";
        let asset = record.get(airisk::schema::ASSET).unwrap_or("?");
        let level = record.get(airisk::schema::LEVEL_OF_RISK).unwrap_or("-");

        println!(
            "{}{}{} {:<14} {:<30}  {}",
            color,
            mark,
            reset,
            truncate(level, 14),
            truncate(asset, 30),
            truncate(&first_line(result.text()), 60)
        );

        if verbose {
            if let Some(reason) = result.failure_reason() {
                eprintln!("    {}", reason);
            } else {
                for line in result.text().lines() {
                    eprintln!("    {}", line);
                }
            }
        }
    }
}

fn print_summary(summary: &Summary) {
    eprintln!("\n{}", "─".repeat(70));
    eprintln!("\x1b[1mSummary:\x1b[0m");
    eprintln!("  \x1b[32m✓ Assessed:\x1b[0m {}", summary.succeeded);
    if summary.failed > 0 {
        eprintln!("  \x1b[31m✗ Failed:\x1b[0m   {}", summary.failed);
    }
    if !summary.risk_levels.is_empty() {
        let levels: Vec<String> = summary
            .risk_levels
            .buckets
            .iter()
            .map(|b| format!("{} {}", b.value, b.count))
            .collect();
        eprintln!("  Risk levels: {}", levels.join(", "));
    }
    if !summary.categories.is_empty() {
        let cats: Vec<String> = summary
            .categories
            .buckets
            .iter()
            .map(|b| format!("{} {}", b.value, b.count))
            .collect();
        eprintln!("  Categories:  {}", cats.join(", "));
    }
}

fn warn_if_unconfigured(client: &GeminiClient) {
    if !client.is_configured() {
        eprintln!("\x1b[33mNo API key set (GOOGLE_AI_KEY); every assessment will fail.\x1b[0m");
    } else {
        log::info!("Using model {}", client.model());
    }
}

fn fail(path: &Path, err: &airisk::Error) -> ! {
    eprintln!("\x1b[31m✗ {}\x1b[0m: {}", path.display(), err);
    std::process::exit(1);
}

#[cfg(feature = "gui")]
fn pick_path_gui() -> Option<PathBuf> {
    rfd::FileDialog::new()
        .set_title("Select asset inventory to assess")
        .add_filter("CSV files", &["csv"])
        .pick_file()
}

fn first_line(s: &str) -> String {
    s.lines().next().unwrap_or("").to_string()
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==========================================================================
    // INVENTORY DISCOVERY TESTS
    // ==========================================================================

    #[test]
    fn test_collect_skips_report_dir() {
        let dir = tempfile::tempdir().unwrap();
        let reports = dir.path().join("airisk-reports");
        std::fs::create_dir_all(&reports).unwrap();
        std::fs::create_dir_all(dir.path().join("site")).unwrap();
        std::fs::write(dir.path().join("inventory.csv"), "Asset\n").unwrap();
        std::fs::write(dir.path().join("site").join("branch.CSV"), "Asset\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();
        std::fs::write(reports.join("ai_risk_assessment_inventory_20240101_000000.csv"), "Asset\n").unwrap();

        let files = collect_inventories(dir.path(), &reports);
        let names: Vec<_> = files
            .iter()
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()))
            .collect();
        assert_eq!(names, vec!["inventory.csv", "branch.CSV"]);
    }

    #[test]
    fn test_collect_missing_report_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("inventory.csv"), "Asset\n").unwrap();
        let files = collect_inventories(dir.path(), &dir.path().join("not-created-yet"));
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_collect_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("inventory.csv");
        std::fs::write(&file, "Asset\n").unwrap();
        assert_eq!(collect_inventories(&file, Path::new("airisk-reports")), vec![file]);
        assert!(collect_inventories(&dir.path().join("missing.csv"), Path::new("airisk-reports")).is_empty());
    }
}
