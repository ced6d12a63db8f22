// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! hdds-marshal-gen
//!
//! Generates C# value classes, native transfer structs and CDR codecs from a
//! JSON-serialized HDDS type graph.
//!
//! # Usage
//!
//! ```bash
//! # Generate both layouts into ./generated
//! hdds-marshal-gen generate --types types.json --out generated
//!
//! # With platform, targets and templates from a config file
//! hdds-marshal-gen generate --types types.json --config marshal.yaml
//!
//! # Validate a type graph without writing anything
//! hdds-marshal-gen check --types types.json
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use hdds_marshal::{
    Declaration, GenerationReport, Generator, GeneratorConfig, PlatformProfile, TargetLayout,
    TemplateSet,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "hdds-marshal-gen")]
#[command(about = "Type-directed C# marshaling generator for HDDS IDL types")]
#[command(version)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate Values.cs / Transfers.cs per target layout
    Generate {
        #[command(flatten)]
        input: InputArgs,

        /// Output directory
        #[arg(short, long, default_value = "generated")]
        out: PathBuf,
    },

    /// Run generation in memory and report failures
    Check {
        #[command(flatten)]
        input: InputArgs,
    },
}

#[derive(clap::Args, Debug)]
struct InputArgs {
    /// JSON type graph (array of declarations)
    #[arg(short, long, value_name = "FILE")]
    types: PathBuf,

    /// YAML generator configuration
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the configured platform profile
    #[arg(long, value_enum)]
    platform: Option<PlatformArg>,

    /// Override the configured target layouts (comma-separated)
    #[arg(long, value_enum, value_delimiter = ',')]
    targets: Option<Vec<TargetArg>>,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum PlatformArg {
    Windows,
    Linux,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum TargetArg {
    Rectangular,
    Jagged,
}

impl From<PlatformArg> for PlatformProfile {
    fn from(arg: PlatformArg) -> Self {
        match arg {
            PlatformArg::Windows => PlatformProfile::Windows,
            PlatformArg::Linux => PlatformProfile::Linux,
        }
    }
}

impl From<TargetArg> for TargetLayout {
    fn from(arg: TargetArg) -> Self {
        match arg {
            TargetArg::Rectangular => TargetLayout::Rectangular,
            TargetArg::Jagged => TargetLayout::Jagged,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Generate { input, out } => cmd_generate(&input, &out),
        Commands::Check { input } => cmd_check(&input),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("[ERROR] {e:#}");
            std::process::exit(1);
        }
    }
}

/// Returns whether every declaration generated.
fn cmd_generate(input: &InputArgs, out: &Path) -> anyhow::Result<bool> {
    let report = run(input)?;

    for (target, unit) in report.output.targets() {
        let dir = out.join(target.as_str());
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        write_file(&dir.join("Values.cs"), &unit.values_document())?;
        write_file(&dir.join("Transfers.cs"), &unit.transfers_document())?;
        tracing::info!("wrote {} layout to {}", target, dir.display());
    }

    println!("{}", report.render_summary());
    Ok(report.is_success())
}

fn cmd_check(input: &InputArgs) -> anyhow::Result<bool> {
    let report = run(input)?;
    println!("{}", report.render_summary());
    Ok(report.is_success())
}

fn run(input: &InputArgs) -> anyhow::Result<GenerationReport> {
    let (config, templates) = load_config(input)?;
    let declarations = load_types(&input.types)?;
    tracing::info!(
        "generating {} declarations for {:?}",
        declarations.len(),
        config.targets
    );
    let generator = Generator::new(config).with_templates(templates);
    Ok(generator.generate_all(&declarations))
}

fn load_config(input: &InputArgs) -> anyhow::Result<(GeneratorConfig, TemplateSet)> {
    let (mut config, base_dir) = match &input.config {
        Some(path) => {
            let config = GeneratorConfig::from_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?;
            let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
            (config, base)
        }
        None => (GeneratorConfig::default(), PathBuf::new()),
    };

    if let Some(platform) = input.platform {
        config = config.with_platform(platform.into());
    }
    if let Some(targets) = &input.targets {
        let targets: Vec<TargetLayout> = targets.iter().copied().map(Into::into).collect();
        config = config.with_targets(targets);
    }
    config.validate().context("Invalid generator configuration")?;

    let templates = TemplateSet::load(&config, &base_dir).context("Failed to load templates")?;
    Ok((config, templates))
}

fn load_types(path: &Path) -> anyhow::Result<Vec<Declaration>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse type graph {}", path.display()))
}

fn write_file(path: &Path, content: &str) -> anyhow::Result<()> {
    std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}
