use anyhow::Context;
use clap::Parser;
use generator::profile::{generate, GeneratorConfig, SyntheticFormat};
use patterncore::grid::Scaling;
use patterncore::prelude::{ParseOptions, Polarization};
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use workflow::config::PipelineConfig;
use workflow::runner::Runner;

mod generator;
mod report;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Far-field pattern ingestion driver")]
struct Args {
    /// Pattern file (NEC/MININEC listing, EZNEC table or measurement CSV), `-` for stdin
    input: Option<PathBuf>,
    /// Load the pipeline config from YAML instead of flags
    #[arg(long)]
    config: Option<PathBuf>,
    /// Frequency in MHz for data without a frequency line
    #[arg(long, default_value_t = 0.0)]
    default_frequency: f64,
    /// Rounding granularity of measured positioner angles
    #[arg(long, default_value_t = 1.0)]
    angle_granularity: f64,
    /// Offset added to measured turntable angles
    #[arg(long, default_value_t = 0.0)]
    turntable_offset: f64,
    #[arg(long)]
    interpolate_azimuth_step: Option<f64>,
    #[arg(long, default_value_t = false)]
    turntable_transform: bool,
    #[arg(long, default_value_t = 50.0)]
    system_impedance: f64,
    /// Channels to keep: H, V or sum (repeatable)
    #[arg(long = "polarization", default_values_t = vec![Polarization::Sum])]
    polarizations: Vec<Polarization>,
    #[arg(long)]
    angle_azimuth: Option<f64>,
    /// Elevation above the horizon for the azimuth cut
    #[arg(long)]
    angle_elevation: Option<f64>,
    /// Floor in dB for linear-dB radii; ARRL scaling when absent
    #[arg(long)]
    linear_db_floor: Option<f64>,
    #[arg(long, default_value_t = false)]
    include_grids: bool,
    /// Write a synthetic pattern file instead of reading one
    #[arg(long, value_enum)]
    generate: Option<SyntheticFormat>,
    #[arg(long, default_value_t = 42)]
    seed: u64,
    /// Report (or generated file) destination; stdout when absent
    #[arg(long)]
    output: Option<PathBuf>,
}

fn emit(output: Option<&PathBuf>, text: &str) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
            fs::write(path, text).with_context(|| format!("writing {}", path.display()))
        }
        None => {
            println!("{}", text);
            Ok(())
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    if let Some(format) = args.generate {
        let generator = GeneratorConfig {
            seed: args.seed,
            ..GeneratorConfig::default()
        };
        let text = generate(format, &generator)?;
        return emit(args.output.as_ref(), &text);
    }

    let input = args
        .input
        .as_ref()
        .context("an input file is required unless --generate is given")?;

    let config = if let Some(path) = &args.config {
        PipelineConfig::load(path)?
    } else {
        let parse = ParseOptions {
            default_frequency: args.default_frequency,
            angle_granularity: args.angle_granularity,
            turntable_offset: args.turntable_offset,
        };
        let mut config =
            PipelineConfig::from_args(parse, args.system_impedance, args.polarizations.clone());
        config.interpolate_azimuth_step = args.interpolate_azimuth_step;
        config.turntable_transform = args.turntable_transform;
        config.angle_azimuth = args.angle_azimuth;
        config.angle_elevation = args.angle_elevation;
        config.include_grids = args.include_grids;
        if let Some(floor) = args.linear_db_floor {
            config.scaling = Scaling::linear_db(floor)?;
        }
        config.validate()?;
        config
    };

    let runner = Runner::new(config);
    let report = if input.as_os_str() == "-" {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("reading pattern from stdin")?;
        runner.execute_text("stdin", &text)?
    } else {
        runner.execute_file(input)?
    };
    let json = serde_json::to_string_pretty(&report).context("serializing report")?;
    emit(args.output.as_ref(), &json)?;
    if args.output.is_some() {
        println!(
            "{} ({}) -> {} channel(s), max gain {:.2} dB, {} rows skipped",
            report.source,
            report.dialect,
            report.channels.len(),
            report.summary.max_gain,
            report.metrics.rows_skipped
        );
    }
    Ok(())
}
