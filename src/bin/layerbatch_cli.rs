//! LayerBatch CLI
//!
//! Commands: run, bounds, inspect
//! Outputs JSON to stdout
//! Returns non-zero on failure; exit code 2 means the template and the
//! data set disagree (missing slots).

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use layerbatch_core::{
    config::QualityPreset, AspectMode, BatchConfig, BatchPipeline, HostPlatform, PipelineError,
    SizePreset, VideoConfig, VideoFormat,
};

#[derive(Parser)]
#[command(name = "layerbatch-cli")]
#[command(about = "LayerBatch CLI - Visual Template Batch Compiler")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct CommonArgs {
    /// Layered template document (consumed read-only)
    #[arg(short, long)]
    template: PathBuf,

    /// CSV data set
    #[arg(short, long)]
    data: PathBuf,

    /// Directory image column values resolve against
    #[arg(short, long, default_value = "images")]
    image_root: PathBuf,

    /// Scratch directory for reports and generated scripts
    #[arg(short, long, default_value = "work")]
    work_dir: PathBuf,

    /// Override every record's output directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Host application identifier (bundle name on macOS, executable
    /// path on Windows)
    #[arg(long, default_value = "Adobe Photoshop 2024")]
    host_app: String,

    /// Host platform; detected from the running OS when omitted
    #[arg(long, value_enum)]
    platform: Option<HostPlatform>,

    /// Timeout for the bounds pre-pass, seconds
    #[arg(long, default_value_t = 300)]
    bounds_timeout: u64,

    /// Timeout for the full batch run, seconds
    #[arg(long, default_value_t = 1800)]
    batch_timeout: u64,
}

#[derive(Args)]
struct VideoArgs {
    /// Export a rendered video per record
    #[arg(long)]
    video: bool,

    #[arg(long, value_enum, default_value = "h264")]
    format: VideoFormat,

    #[arg(long, value_enum, default_value = "high")]
    preset: QualityPreset,

    #[arg(long, value_enum, default_value = "document")]
    size: SizePreset,

    #[arg(long, value_enum, default_value = "document")]
    aspect: AspectMode,

    /// Explicit export width; with --height, overrides --size
    #[arg(long)]
    width: Option<u32>,

    /// Explicit export height; with --width, overrides --size
    #[arg(long)]
    height: Option<u32>,
}

#[derive(Subcommand)]
enum Commands {
    /// Full batch: extract bounds, validate, resize, compile, execute
    Run {
        #[command(flatten)]
        common: CommonArgs,
        #[command(flatten)]
        video: VideoArgs,
    },

    /// Bounds-extraction pre-pass only; prints the parsed reports
    Bounds {
        #[command(flatten)]
        common: CommonArgs,
    },

    /// Offline walk over a JSON slot-tree snapshot (no host needed)
    Inspect {
        /// Slot-tree snapshot (JSON)
        #[arg(short, long)]
        snapshot: PathBuf,

        /// CSV data set the required names are derived from
        #[arg(short, long)]
        data: PathBuf,

        /// Directory the report artifacts are written to
        #[arg(short, long, default_value = "work")]
        work_dir: PathBuf,
    },
}

fn detect_platform() -> Result<HostPlatform, String> {
    match std::env::consts::OS {
        "macos" => Ok(HostPlatform::Macos),
        "windows" => Ok(HostPlatform::Windows),
        other => Err(format!(
            "unsupported platform '{}' (supported: macos, windows)",
            other
        )),
    }
}

fn build_config(common: CommonArgs, video: Option<VideoArgs>) -> Result<BatchConfig, String> {
    let platform = match common.platform {
        Some(p) => p,
        None => detect_platform()?,
    };
    let video = video.filter(|v| v.video).map(|v| VideoConfig {
        format: v.format,
        preset: v.preset,
        size: v.size,
        aspect: v.aspect,
        width: v.width,
        height: v.height,
    });
    Ok(BatchConfig {
        template: common.template,
        data: common.data,
        image_root: common.image_root,
        work_dir: common.work_dir,
        output_override: common.output,
        host_app: common.host_app,
        platform,
        bounds_timeout_secs: common.bounds_timeout,
        batch_timeout_secs: common.batch_timeout,
        video,
    })
}

fn fail(error: &PipelineError) -> ExitCode {
    eprintln!("{}", serde_json::json!({ "success": false, "error": error.to_string() }));
    match error {
        // Template/data mismatch gets its own exit code so callers can
        // tell it apart from environment failures.
        PipelineError::MissingSlots(_) => ExitCode::from(2),
        _ => ExitCode::FAILURE,
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { common, video } => {
            let config = match build_config(common, Some(video)) {
                Ok(c) => c,
                Err(e) => {
                    eprintln!(r#"{{"success": false, "error": "{}"}}"#, e);
                    return ExitCode::FAILURE;
                }
            };
            let pipeline = BatchPipeline::new(config);
            match pipeline.run() {
                Ok(summary) => {
                    let output = serde_json::json!({
                        "success": true,
                        "summary": summary,
                    });
                    println!("{}", serde_json::to_string_pretty(&output).unwrap());
                    ExitCode::SUCCESS
                }
                Err(e) => fail(&e),
            }
        }

        Commands::Bounds { common } => {
            let config = match build_config(common, None) {
                Ok(c) => c,
                Err(e) => {
                    eprintln!(r#"{{"success": false, "error": "{}"}}"#, e);
                    return ExitCode::FAILURE;
                }
            };
            let pipeline = BatchPipeline::new(config);
            let records = match layerbatch_core::load_records(&pipeline.config().data) {
                Ok(r) => r,
                Err(e) => return fail(&PipelineError::Data(e)),
            };
            let required = layerbatch_core::required_slot_names(&records);
            match pipeline.extract_bounds(&required) {
                Ok((bounds, outcome)) => {
                    let missing = match &outcome {
                        layerbatch_core::ValidationOutcome::AllFound => vec![],
                        layerbatch_core::ValidationOutcome::Missing(names) => names.clone(),
                    };
                    let output = serde_json::json!({
                        "success": missing.is_empty(),
                        "required": required,
                        "missing": missing,
                        "bounds_entries": bounds.len(),
                    });
                    println!("{}", serde_json::to_string_pretty(&output).unwrap());
                    if missing.is_empty() {
                        ExitCode::SUCCESS
                    } else {
                        ExitCode::from(2)
                    }
                }
                Err(e) => fail(&e),
            }
        }

        Commands::Inspect {
            snapshot,
            data,
            work_dir,
        } => {
            let config = BatchConfig {
                template: snapshot.clone(),
                data,
                image_root: PathBuf::from("."),
                work_dir,
                output_override: None,
                host_app: String::new(),
                platform: HostPlatform::Macos,
                bounds_timeout_secs: 300,
                batch_timeout_secs: 1800,
                video: None,
            };
            let pipeline = BatchPipeline::new(config);
            match pipeline.scan_snapshot(&snapshot) {
                Ok(scan) => {
                    let output = serde_json::json!({
                        "success": scan.missing_names().is_empty(),
                        "visited": scan.visited_names(),
                        "missing": scan.missing_names(),
                        "geometry": scan.geometry_report().lines().collect::<Vec<_>>(),
                    });
                    println!("{}", serde_json::to_string_pretty(&output).unwrap());
                    if scan.missing_names().is_empty() {
                        ExitCode::SUCCESS
                    } else {
                        ExitCode::from(2)
                    }
                }
                Err(e) => fail(&e),
            }
        }
    }
}
