//! Climate division averaging tool.
//!
//! Averages a gridded field over the 344 US climate divisions and writes a
//! fixed-width `<division> <value>` report. Fields are either already on the
//! reference grid (`--grid`) or regridded on the fly by an external tool
//! (`--source` with `--regrid-cmd`). `--batch` runs a whole manifest against
//! one division map and prints a JSON summary to stdout.

mod batch;
mod dates;
mod regrid;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, ValueEnum};
use division_aggregator::{AggregatorConfig, AggregatorError, Conversion, Pipeline, RunRequest};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use batch::BatchManifest;
use regrid::{RegridCommand, RegridWorkspace};

#[derive(Parser, Debug)]
#[command(name = "climdiv")]
#[command(about = "Average gridded fields over US climate divisions")]
struct Args {
    /// Raw little-endian f32 field already on the reference grid
    #[arg(long, conflicts_with_all = ["source", "batch"])]
    grid: Option<PathBuf>,

    /// Source field to regrid with --regrid-cmd before averaging
    #[arg(long, requires = "regrid_cmd", conflicts_with = "batch")]
    source: Option<PathBuf>,

    /// Regrid command template using {input}, {output} and {grid}
    #[arg(long, env = "CLIMDIV_REGRID_CMD")]
    regrid_cmd: Option<String>,

    /// Division map file (lon|lat|division_code)
    #[arg(short, long, env = "CLIMDIV_MAP")]
    map: Option<PathBuf>,

    /// Report output path
    #[arg(short, long, conflicts_with = "batch")]
    output: Option<PathBuf>,

    /// Unit conversion: "k,m", "M" or "M,N"
    #[arg(long, conflicts_with = "batch")]
    convert: Option<String>,

    /// Decimal places in the report
    #[arg(long)]
    precision: Option<usize>,

    /// Run date (YYYYMMDD or YYYY-MM-DD); refused if too recent
    #[arg(long)]
    date: Option<String>,

    /// Minimum age in days of --date
    #[arg(long, default_value = "1")]
    min_lag_days: i64,

    /// YAML configuration file (defaults come from CLIMDIV_* variables)
    #[arg(short, long, env = "CLIMDIV_CONFIG")]
    config: Option<PathBuf>,

    /// Trust map line order instead of checking coordinates against the grid
    #[arg(long)]
    no_verify_geometry: bool,

    /// Batch manifest (YAML) of grid/output/convert runs
    #[arg(long)]
    batch: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Json)]
    log_format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Json,
    Pretty,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    init_tracing(&args.log_level, args.log_format)?;

    if let Err(e) = run(&args) {
        let kind = e
            .downcast_ref::<AggregatorError>()
            .map(AggregatorError::kind)
            .unwrap_or("Error");
        error!(kind, error = %format!("{:#}", e), "climdiv failed");
        return Err(e);
    }
    Ok(())
}

fn init_tracing(log_level: &str, format: LogFormat) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // stdout is reserved for batch summaries
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish())?,
        LogFormat::Pretty => tracing::subscriber::set_global_default(builder.finish())?,
    }
    Ok(())
}

fn load_config(args: &Args) -> Result<AggregatorConfig> {
    let mut config = match &args.config {
        Some(path) => AggregatorConfig::from_yaml(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => AggregatorConfig::from_env()?,
    };

    if let Some(precision) = args.precision {
        config.precision = precision;
    }
    if args.no_verify_geometry {
        config.verify_geometry = false;
    }

    config.validate()?;
    Ok(config)
}

fn run(args: &Args) -> Result<()> {
    if let Some(date) = &args.date {
        let today = Utc::now().date_naive();
        let date = dates::validate_run_date(date, today, args.min_lag_days)?;
        info!(%date, "Run date accepted");
    }

    let config = load_config(args)?;
    info!(
        grid = %config.grid.descriptor(),
        precision = config.precision,
        verify_geometry = config.verify_geometry,
        "Loaded configuration"
    );
    let pipeline = Pipeline::new(config)?;

    if let Some(manifest_path) = &args.batch {
        return run_batch(args, &pipeline, manifest_path);
    }

    let map = match &args.map {
        Some(map) => map.clone(),
        None => bail!("--map is required"),
    };
    let output = match &args.output {
        Some(output) => output.clone(),
        None => bail!("--output is required"),
    };
    // Parse before any regridding so a bad spec fails fast
    let conversion = args.convert.as_deref().map(Conversion::parse).transpose()?;

    // Keeps the regrid scratch directory alive until the run finishes
    let mut _workspace = None;
    let grid_path = match (&args.grid, &args.source) {
        (Some(grid), None) => grid.clone(),
        (None, Some(source)) => {
            let template = match &args.regrid_cmd {
                Some(t) => t,
                None => bail!("--source requires --regrid-cmd"),
            };
            let command = RegridCommand::parse(template)?;
            let workspace = RegridWorkspace::new()?;
            let path = workspace.regrid(&command, source, &pipeline.config().grid)?;
            _workspace = Some(workspace);
            path
        }
        _ => bail!("exactly one of --grid or --source is required"),
    };

    let summary = pipeline.run(&RunRequest {
        grid_path,
        map_path: map,
        output_path: output,
        conversion,
    })?;

    info!(
        output = %summary.output.display(),
        divisions_with_data = summary.divisions_with_data,
        "Report written"
    );
    Ok(())
}

fn run_batch(args: &Args, pipeline: &Pipeline, manifest_path: &Path) -> Result<()> {
    let manifest = BatchManifest::load(manifest_path)?;
    let map = match args.map.clone().or_else(|| manifest.map.clone()) {
        Some(map) => map,
        None => bail!("batch manifest has no map and --map was not given"),
    };

    info!(
        manifest = %manifest_path.display(),
        runs = manifest.runs.len(),
        map = %map.display(),
        "Starting batch"
    );

    let requests = manifest.requests(&map)?;
    let summaries = batch::run_batch(pipeline, &requests)?;
    println!("{}", serde_json::to_string_pretty(&summaries)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_single_run() {
        let args = Args::try_parse_from([
            "climdiv", "--grid", "g.bin", "--map", "m.txt", "--output", "o.txt", "--convert",
            "k,m",
        ])
        .unwrap();
        assert_eq!(args.grid, Some(PathBuf::from("g.bin")));
        assert_eq!(args.convert.as_deref(), Some("k,m"));
        assert_eq!(args.min_lag_days, 1);
        assert_eq!(args.log_format, LogFormat::Json);
    }

    #[test]
    fn test_args_grid_and_source_conflict() {
        let result = Args::try_parse_from([
            "climdiv",
            "--grid",
            "g.bin",
            "--source",
            "s.grb2",
            "--regrid-cmd",
            "cp {input} {output}",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_args_batch_conflicts_with_output() {
        let result =
            Args::try_parse_from(["climdiv", "--batch", "b.yaml", "--output", "o.txt"]);
        assert!(result.is_err());
    }

    fn args_with_config(yaml: &str, extra: &[&str]) -> (tempfile::TempDir, Args) {
        let dir = test_utils::temp_test_dir();
        let path = test_utils::write_test_file(dir.path(), "climdiv.yaml", yaml);
        let path = path.to_string_lossy().into_owned();

        let mut argv = vec!["climdiv", "--config", path.as_str()];
        argv.extend_from_slice(extra);
        let args = Args::try_parse_from(argv).unwrap();
        (dir, args)
    }

    #[test]
    fn test_cli_overrides_config() {
        let (_dir, args) = args_with_config(
            "precision: 1\nverify_geometry: true\n",
            &["--precision", "4", "--no-verify-geometry"],
        );
        let config = load_config(&args).unwrap();
        assert_eq!(config.precision, 4);
        assert!(!config.verify_geometry);
    }

    #[test]
    fn test_config_file_used_without_overrides() {
        let (_dir, args) = args_with_config("precision: 3\n", &[]);
        let config = load_config(&args).unwrap();
        assert_eq!(config.precision, 3);
        assert!(config.verify_geometry);
    }

    #[test]
    fn test_cli_rejects_excessive_precision() {
        let (_dir, args) = args_with_config("precision: 2\n", &["--precision", "50"]);
        assert!(load_config(&args).is_err());
    }
}
