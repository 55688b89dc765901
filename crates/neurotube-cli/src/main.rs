//! neurotube CLI - fit tube radii along traced paths
//!
//! Runs the circle fitter on a synthetic tube and prints a JSON report.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use neurotube_fit::{attach_fitted, fit_path, FitProgress, FitReport, FitSettings, FitStage};
use neurotube_math::Calibration;
use neurotube_path::{PathGraph, SwcType};
use serde::Serialize;
use std::path::{Path, PathBuf};

mod logger;
mod synth;

#[derive(Parser)]
#[command(name = "neurotube")]
#[command(about = "Cross-section circle fitting for traced neurites", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit and downsample a synthetic tube
    Synth {
        /// Tube length along x
        #[arg(long, default_value_t = 40.0)]
        length: f64,
        /// Tube radius
        #[arg(long, default_value_t = 3.0)]
        radius: f64,
        /// Sideways amplitude of the tube axis
        #[arg(long, default_value_t = 4.0)]
        amplitude: f64,
        /// Largest offset of the trace from the axis
        #[arg(long, default_value_t = 0.8)]
        jitter: f64,
        /// Voxel spacing in x and y
        #[arg(long, default_value_t = 1.0)]
        spacing: f64,
        /// Voxel spacing in z
        #[arg(long)]
        z_spacing: Option<f64>,
        /// Downsampling tolerance applied to the fitted path
        #[arg(short, long, default_value_t = 0.5)]
        tolerance: f64,
        /// TOML file with fit settings
        #[arg(short, long)]
        settings: Option<PathBuf>,
        /// Fit nodes on a single thread
        #[arg(long)]
        sequential: bool,
        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the default fit settings as TOML
    Settings,
}

/// Outcome of the `synth` command.
#[derive(Serialize)]
struct SynthReport {
    settings: FitSettings,
    source: String,
    fitted: String,
    source_nodes: usize,
    fitted_nodes: usize,
    downsampled_nodes: usize,
    mean_radius: f64,
    fitted_volume: Option<f64>,
    fit: FitReport,
}

struct LogProgress;

impl FitProgress for LogProgress {
    fn stage(&self, stage: FitStage) {
        log::info!("{stage:?}");
    }

    fn node_done(&self, fraction: f64) {
        log::trace!("{:.0}% of nodes fitted", fraction * 100.0);
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::init(cli.verbose)?;

    match cli.command {
        Commands::Synth {
            length,
            radius,
            amplitude,
            jitter,
            spacing,
            z_spacing,
            tolerance,
            settings,
            sequential,
            output,
        } => {
            let mut settings = load_settings(settings.as_deref())?;
            if sequential {
                settings.parallel = false;
            }
            let tube = synth::Tube {
                length,
                radius,
                amplitude,
                jitter,
                calibration: Calibration::new(
                    spacing,
                    spacing,
                    z_spacing.unwrap_or(spacing),
                    "pixels",
                ),
            };
            let report = run_synth(&tube, settings, tolerance)?;
            let json = serde_json::to_string_pretty(&report)?;
            match output {
                Some(file) => {
                    std::fs::write(&file, json)?;
                    println!("Wrote report to {}", file.display());
                }
                None => println!("{json}"),
            }
        }
        Commands::Settings => {
            print!("{}", toml::to_string_pretty(&FitSettings::default())?);
        }
    }

    Ok(())
}

fn load_settings(file: Option<&Path>) -> Result<FitSettings> {
    let Some(file) = file else {
        return Ok(FitSettings::default());
    };
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("reading {}", file.display()))?;
    let settings: FitSettings =
        toml::from_str(&text).with_context(|| format!("parsing {}", file.display()))?;
    settings.validate()?;
    Ok(settings)
}

fn run_synth(tube: &synth::Tube, settings: FitSettings, tolerance: f64) -> Result<SynthReport> {
    let volume = tube.volume()?;
    let mut graph = PathGraph::new();
    let id = graph.insert(tube.trace())?;
    graph.set_swc_type(id, SwcType::Dendrite, false)?;
    graph.set_color_by_swc_type(id)?;

    let fitted = fit_path(graph.path(id)?, &volume, &settings, Some(&LogProgress))?;
    let fit = fitted.report;
    let fid = attach_fitted(&mut graph, id, fitted.path)?;
    graph.set_use_fitted(id, true)?;

    let fitted_nodes = graph.path(fid)?.len();
    let removed = graph.downsample(fid, tolerance)?;
    log::info!("downsampling removed {removed} of {fitted_nodes} fitted nodes");

    let path = graph.path(fid)?;
    Ok(SynthReport {
        settings,
        source: graph.display_name(id)?,
        fitted: path.name(),
        source_nodes: graph.path(id)?.len(),
        fitted_nodes,
        downsampled_nodes: path.len(),
        mean_radius: path.mean_radius(),
        fitted_volume: path.approximate_fitted_volume(),
        fit,
    })
}
