//! `kunit` command line tool
//!
//! ```bash
//! # Convert a deck from mm-mg-us to SI, writing charge.m-kg-s.k
//! kunit convert charge.k --src mm-mg-us --dst m-kg-s
//!
//! # Only convert the explosive's equation of state
//! kunit convert charge.k --src mm-mg-us --dst m-kg-s --models eos-jwl -o out.k
//!
//! kunit list-models
//! kunit list-units
//! ```
use std::fmt::Display;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use error_stack::ResultExt;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use kunit::deck_io::{convert_reader, default_output_path};
use kunit::engine::{parse_model_list, Converter};
use kunit::models::builtin_registry;
use kunit::units::describe_unit_systems;

#[derive(Parser)]
#[command(name = "kunit")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Convert LS-DYNA keyword decks between unit systems")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log each block and field that is converted
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a deck
    Convert {
        /// Input deck
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Unit system the deck is written in
        #[arg(long)]
        src: String,

        /// Unit system to convert to
        #[arg(long)]
        dst: String,

        /// "all" or a comma-separated list of model names
        #[arg(short, long, default_value = "all")]
        models: String,

        /// Output deck [default: <INPUT stem>.<DST>.k]
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// List the models (keyword families) that can be converted
    ListModels,

    /// List the known unit systems
    ListUnits,
}

#[derive(Debug)]
enum CliError {
    Setup,
    Read(PathBuf),
    Convert(PathBuf),
    Write(PathBuf),
}

impl Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Setup => write!(f, "Invalid conversion settings"),
            CliError::Read(p) => write!(f, "Could not read {}", p.display()),
            CliError::Convert(p) => write!(f, "Could not convert {}", p.display()),
            CliError::Write(p) => write!(f, "Could not write {}", p.display()),
        }
    }
}

impl std::error::Error for CliError {}

fn main() -> error_stack::Result<(), CliError> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "kunit=debug" } else { "kunit=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Convert { input, src, dst, models, output } => convert(&input, &src, &dst, &models, output),
        Commands::ListModels => {
            list_models();
            Ok(())
        },
        Commands::ListUnits => {
            list_units();
            Ok(())
        },
    }
}

fn convert(input: &Path, src: &str, dst: &str, models: &str, output: Option<PathBuf>) -> error_stack::Result<(), CliError> {
    let mut converter = Converter::new(src, dst).change_context(CliError::Setup)?;
    if let Some(models) = parse_model_list(models) {
        converter = converter.select_models(models.as_slice()).change_context(CliError::Setup)?;
    }

    let f = File::open(input).change_context_lazy(|| CliError::Read(input.to_path_buf()))?;
    let text = convert_reader(BufReader::new(f), &converter)
        .change_context_lazy(|| CliError::Convert(input.to_path_buf()))
        .attach_printable("no output was written")?;

    let output = output.unwrap_or_else(|| default_output_path(input, converter.dst().name()));
    std::fs::write(&output, text).change_context_lazy(|| CliError::Write(output.clone()))?;
    tracing::info!(input = %input.display(), output = %output.display(), "wrote converted deck");
    println!("{}", output.display());
    Ok(())
}

fn list_models() {
    let registry = builtin_registry();
    for name in registry.list_models() {
        if let Some(spec) = registry.get(name) {
            println!("{name:<24} {}", spec.keyword());
        }
    }
}

fn list_units() {
    for unit in describe_unit_systems() {
        println!("{:<10} {}", unit.key, unit.pressure_unit);
    }
}
