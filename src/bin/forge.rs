//! Contract generator CLI
//!
//! Loads contract IR files (`*.contract.json`), classifies them, and emits
//! the staged-builder and value/codec modules. Repeated runs over an
//! unchanged contract set produce byte-identical output.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use config_crate::{Config, Environment, File as ConfigFile, FileFormat};
use serde::Deserialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

use dtoforge::classify::classify;
use dtoforge::codegen::{RenderProfile, Synthesizer};
use dtoforge::ir::{ContractDef, ContractSet};

#[derive(Parser)]
#[command(name = "dtoforge-gen")]
#[command(about = "Generate staged builders and JSON codecs from contract IR")]
struct Cli {
    /// Directory containing *.contract.json files
    #[arg(short, long, default_value = "contracts")]
    contracts: PathBuf,

    /// Path to a dtoforge.toml config file
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Emit generated code for every contract
    Generate {
        /// Output file (defaults to the configured path)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Print to stdout instead of writing the file
        #[arg(long)]
        stdout: bool,
    },

    /// Classify every contract and report schema errors without emitting
    Check,

    /// List contracts and their classified members
    List,
}

/// Settings from dtoforge.toml, overridable with DTOFORGE_* variables
#[derive(Debug, Deserialize, Default)]
struct ForgeConfig {
    #[serde(default)]
    output: OutputConfig,
    #[serde(default)]
    profile: RenderProfile,
}

#[derive(Debug, Deserialize)]
struct OutputConfig {
    path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("src/generated.rs"),
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let set = load_contracts(&cli.contracts)?;
    info!(contracts = set.len(), "loaded contract set");

    match cli.command {
        Commands::Generate { output, stdout } => {
            let synthesizer = Synthesizer::new(&set, config.profile);
            let code = synthesizer
                .generate_all()
                .context("code generation failed")?;
            if stdout {
                print!("{code}");
            } else {
                let path = output.unwrap_or(config.output.path);
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&path, &code)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                info!(path = %path.display(), "wrote generated code");
                println!(
                    "Generated {} contract(s) into {} (fingerprint {})",
                    set.len(),
                    path.display(),
                    &set.fingerprint()[..12]
                );
            }
        }

        Commands::Check => {
            let mut failures = 0usize;
            for id in set.ids() {
                match classify(&set, id) {
                    Ok(members) => {
                        debug!(contract = %id, members = members.len(), "ok");
                    }
                    Err(e) => {
                        failures += 1;
                        eprintln!("{id}: {e}");
                    }
                }
            }
            if failures > 0 {
                bail!("{failures} contract(s) failed classification");
            }
            println!("{} contract(s) ok", set.len());
        }

        Commands::List => {
            for id in set.ids() {
                let members = classify(&set, id)
                    .with_context(|| format!("classification failed for {id}"))?;
                println!("{id}");
                for member in members {
                    let nullable = if member.nullable { "?" } else { "" };
                    let identity = if member.forms_id { " [id]" } else { "" };
                    println!(
                        "  {}{nullable}: {} ({:?}){identity}",
                        member.field_name,
                        member.ty.describe(),
                        member.kind
                    );
                }
            }
        }
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<ForgeConfig> {
    let mut builder = Config::builder();
    match path {
        Some(path) => {
            builder = builder.add_source(ConfigFile::from(path.to_path_buf()));
        }
        None => {
            builder = builder.add_source(
                ConfigFile::new("dtoforge.toml", FileFormat::Toml).required(false),
            );
        }
    }
    let config = builder
        .add_source(Environment::with_prefix("DTOFORGE").separator("__"))
        .build()
        .context("failed to load configuration")?;
    config
        .try_deserialize()
        .context("invalid configuration")
}

fn load_contracts(dir: &Path) -> Result<ContractSet> {
    if !dir.exists() {
        bail!("contract directory {} does not exist", dir.display());
    }
    let mut paths: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.ends_with(".contract.json"))
                .unwrap_or(false)
        })
        .collect();
    // Deterministic insertion order regardless of directory walk order
    paths.sort();

    let mut set = ContractSet::new();
    for path in paths {
        let text = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let def: ContractDef = serde_json::from_str(&text)
            .with_context(|| format!("invalid contract IR in {}", path.display()))?;
        debug!(contract = %def.id, path = %path.display(), "loaded");
        set.insert(def)
            .with_context(|| format!("while loading {}", path.display()))?;
    }
    set.ensure_acyclic()?;
    Ok(set)
}
