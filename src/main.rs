mod analysis;
mod categories;
mod dataset;
mod error;
mod export;
mod groups;
mod layout;
mod logging;
mod models;
mod monthly;
mod normalize;
mod products;
mod report;
mod summary;
mod util;

use analysis::{analyze, AnalysisOptions, DEFAULT_MIN_VOLUME, DEFAULT_TOP};
use chrono::Month;
use clap::{Args, Parser, Subcommand};
use dataset::{DatasetCache, InputPaths, DEFAULT_DATA_DIRS};
use logging::emit_info_line;
use normalize::BranchNormalizer;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Instant;
use summary::{write_summary, ReportSummary, SUMMARY_FILE};

#[derive(Parser)]
#[command(name = "pos-analytics")]
#[command(about = "POS report parser and retail analytics", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse the four report exports and write the cleaned tables.
    Parse(ParseArgs),
    /// Print the analytics narrative.
    Analyze(AnalyzeArgs),
    /// Write report_data.json.
    Summary(SummaryArgs),
    /// Parse, analyze, export and summarize in one pass.
    Run(RunArgs),
}

#[derive(Args)]
struct InputArgs {
    /// Directory holding the exports under their standard names.
    #[arg(long)]
    data_dir: Option<PathBuf>,
    #[arg(long)]
    monthly: Option<PathBuf>,
    #[arg(long)]
    products: Option<PathBuf>,
    #[arg(long)]
    groups: Option<PathBuf>,
    #[arg(long)]
    categories: Option<PathBuf>,
    /// JSON object of extra branch name corrections.
    #[arg(long)]
    branch_aliases: Option<PathBuf>,
}

#[derive(Args)]
struct AnalysisArgs {
    #[arg(long)]
    year: Option<i32>,
    #[arg(long)]
    compare_year: Option<i32>,
    #[arg(long, default_value = "January", value_parser = parse_month)]
    yoy_month: Month,
    #[arg(long, default_value_t = DEFAULT_TOP)]
    top: usize,
    #[arg(long, default_value_t = DEFAULT_MIN_VOLUME)]
    min_volume: f64,
}

#[derive(Parser)]
struct ParseArgs {
    #[command(flatten)]
    input: InputArgs,
    #[arg(long, default_value = "output")]
    output_dir: PathBuf,
}

#[derive(Parser)]
struct AnalyzeArgs {
    #[command(flatten)]
    input: InputArgs,
    #[command(flatten)]
    analysis: AnalysisArgs,
}

#[derive(Parser)]
struct SummaryArgs {
    #[command(flatten)]
    input: InputArgs,
    #[command(flatten)]
    analysis: AnalysisArgs,
    #[arg(long, default_value = "output/report_data.json")]
    output: PathBuf,
}

#[derive(Parser)]
struct RunArgs {
    #[command(flatten)]
    input: InputArgs,
    #[command(flatten)]
    analysis: AnalysisArgs,
    #[arg(long, default_value = "output")]
    output_dir: PathBuf,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    logging::init_logging("pos-analytics")?;
    let cli = Cli::parse();
    match cli.command {
        Command::Parse(args) => run_parse(args),
        Command::Analyze(args) => run_analyze(args),
        Command::Summary(args) => run_summary(args),
        Command::Run(args) => run_all(args),
    }
}

fn run_parse(args: ParseArgs) -> Result<(), String> {
    let (paths, mut cache) = prepare(&args.input)?;
    let dataset = cache.get_or_load(&paths).map_err(|err| err.to_string())?;
    let outputs =
        export::export_parsed(&dataset, &args.output_dir).map_err(|err| err.to_string())?;
    emit_info_line(&format!(
        "Parsed: monthly={} products={} groups={} categories={} years={:?}",
        dataset.monthly.len(),
        dataset.products.len(),
        dataset.groups.len(),
        dataset.categories.len(),
        dataset.years()
    ));
    for path in outputs {
        emit_info_line(&format!("CSV output: {}", path.display()));
    }
    Ok(())
}

fn run_analyze(args: AnalyzeArgs) -> Result<(), String> {
    let (paths, mut cache) = prepare(&args.input)?;
    let dataset = cache.get_or_load(&paths).map_err(|err| err.to_string())?;

    let analysis_start = Instant::now();
    let analysis = analyze(&dataset, &args.analysis.options());
    let analysis_elapsed = analysis_start.elapsed();
    report::log_analysis_report(&analysis);
    emit_info_line(&format!(
        "Analysis time: {} ms",
        analysis_elapsed.as_millis()
    ));
    Ok(())
}

fn run_summary(args: SummaryArgs) -> Result<(), String> {
    let (paths, mut cache) = prepare(&args.input)?;
    let dataset = cache.get_or_load(&paths).map_err(|err| err.to_string())?;
    let analysis = analyze(&dataset, &args.analysis.options());
    let summary = ReportSummary::from_analysis(&analysis);
    write_summary(&summary, &args.output).map_err(|err| err.to_string())?;
    emit_info_line(&format!("Summary output: {}", args.output.display()));
    Ok(())
}

fn run_all(args: RunArgs) -> Result<(), String> {
    let (paths, mut cache) = prepare(&args.input)?;
    let parse_start = Instant::now();
    let dataset = cache.get_or_load(&paths).map_err(|err| err.to_string())?;
    emit_info_line(&format!(
        "Parse time: {} ms",
        parse_start.elapsed().as_millis()
    ));

    let mut outputs =
        export::export_parsed(&dataset, &args.output_dir).map_err(|err| err.to_string())?;

    // Later stages hit the cache instead of re-reading the exports.
    let dataset = cache.get_or_load(&paths).map_err(|err| err.to_string())?;
    let analysis_start = Instant::now();
    let analysis = analyze(&dataset, &args.analysis.options());
    let analysis_elapsed = analysis_start.elapsed();
    report::log_analysis_report(&analysis);

    outputs.extend(
        export::export_analysis(&analysis, &args.output_dir).map_err(|err| err.to_string())?,
    );
    let summary_path = args.output_dir.join(SUMMARY_FILE);
    write_summary(&ReportSummary::from_analysis(&analysis), &summary_path)
        .map_err(|err| err.to_string())?;
    outputs.push(summary_path);

    for path in outputs {
        emit_info_line(&format!("Output: {}", path.display()));
    }
    emit_info_line(&format!(
        "Analysis time: {} ms",
        analysis_elapsed.as_millis()
    ));
    Ok(())
}

impl AnalysisArgs {
    fn options(&self) -> AnalysisOptions {
        AnalysisOptions {
            year: self.year,
            compare_year: self.compare_year,
            yoy_month: self.yoy_month,
            top: self.top,
            min_volume: self.min_volume,
        }
    }
}

impl InputArgs {
    fn paths(&self) -> InputPaths {
        let mut paths = match self.data_dir.as_deref() {
            Some(dir) => InputPaths::in_dir(dir),
            None => InputPaths::discover(DEFAULT_DATA_DIRS).unwrap_or_else(|err| {
                log::debug!("no complete export directory found: {err}");
                InputPaths::in_dir(std::path::Path::new(DEFAULT_DATA_DIRS[0]))
            }),
        };
        if let Some(path) = &self.monthly {
            paths.monthly = path.clone();
        }
        if let Some(path) = &self.products {
            paths.products = path.clone();
        }
        if let Some(path) = &self.groups {
            paths.groups = path.clone();
        }
        if let Some(path) = &self.categories {
            paths.categories = path.clone();
        }
        paths
    }

    fn normalizer(&self) -> Result<BranchNormalizer, String> {
        let mut normalizer = BranchNormalizer::default();
        if let Some(path) = &self.branch_aliases {
            let added = normalizer
                .load_corrections(path)
                .map_err(|err| err.to_string())?;
            log::info!("loaded {} branch aliases from {}", added, path.display());
        }
        Ok(normalizer)
    }
}

fn prepare(input: &InputArgs) -> Result<(InputPaths, DatasetCache), String> {
    let paths = input.paths();
    let missing = paths.missing();
    if !missing.is_empty() {
        for path in &missing {
            log::warn!("missing report export: {}", path.display());
        }
        return Err(error::AnalyticsError::MissingInputs(missing).to_string());
    }
    let mut cache = DatasetCache::default();
    if input.branch_aliases.is_some() {
        cache.set_normalizer(input.normalizer()?);
    }
    Ok((paths, cache))
}

fn parse_month(value: &str) -> Result<Month, String> {
    Month::from_str(value.trim()).map_err(|_| format!("unknown month: {value}"))
}
