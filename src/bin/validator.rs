//! Metamodel Validator CLI
//!
//! Validates projection declarations and exports the resulting metadata.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use projection_metamodel::{DeclarationSet, MetamodelConfig, MetamodelEngine, OutputFormat};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "metamodel-validate")]
#[command(about = "Validate projection declarations against their record schemas")]
struct Cli {
    /// Configuration file (defaults to metamodel.toml lookup)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run registration and validation, print diagnostics
    Check {
        /// Declaration file or directory of JSON files
        input: PathBuf,
        /// Fail on warnings as well as errors
        #[arg(long)]
        strict: bool,
    },

    /// Write the projection metadata graph as JSON
    Export {
        input: PathBuf,
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print registered record schemas
    Schema {
        input: PathBuf,
        /// Only this record or embeddable
        #[arg(short, long)]
        record: Option<String>,
    },

    /// Resolve one path against a record
    Resolve {
        input: PathBuf,
        /// Root record type name
        root: String,
        /// Dotted path, e.g. orders.amount
        path: String,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn load(input: &Path) -> anyhow::Result<DeclarationSet> {
    DeclarationSet::load(input).with_context(|| format!("loading declarations from {}", input.display()))
}

fn to_json<T: serde::Serialize>(value: &T, format: OutputFormat) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Pretty => serde_json::to_string_pretty(value)?,
        OutputFormat::Compact => serde_json::to_string(value)?,
    })
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config.as_ref().map(|p| p.to_string_lossy().into_owned());
    let config = MetamodelConfig::load_from(config_path.as_deref()).context("loading configuration")?;
    let format = config.output.format;
    let fail_on_warnings = config.validation.fail_on_warnings;
    let engine = MetamodelEngine::new(config);

    match cli.command {
        Commands::Check { input, strict } => {
            let set = load(&input)?;
            println!(
                "🔍 Checking {} projection(s) over {} record declaration(s)...",
                set.projections.len(),
                set.records.len()
            );

            let run = engine.run(&set);
            if !run.diagnostics.is_empty() {
                println!();
                print!("{}", run.diagnostics);
            }

            println!();
            if run.is_success(strict || fail_on_warnings) {
                println!("✅ {} projection(s) valid", run.graph.len());
            } else {
                println!(
                    "❌ Validation failed: {} error(s), {} warning(s)",
                    run.diagnostics.error_count(),
                    run.diagnostics.warning_count()
                );
                std::process::exit(1);
            }
            Ok(())
        }

        Commands::Export { input, output } => {
            let set = load(&input)?;
            let run = engine.run(&set);
            let fingerprint = run.fingerprint()?;

            let document = serde_json::json!({
                "fingerprint": fingerprint,
                "nestingOrder": run.graph.nesting_order(),
                "graph": run.graph,
                "diagnostics": run.diagnostics,
            });
            let json = to_json(&document, format)?;

            if let Some(path) = output {
                std::fs::write(&path, &json).with_context(|| format!("writing {}", path.display()))?;
                println!("✅ Metadata written to {:?} ({})", path, fingerprint.short());
            } else {
                println!("{}", json);
            }

            if run.diagnostics.has_errors() {
                eprintln!("❌ {} error(s); the exported graph is partial", run.diagnostics.error_count());
                std::process::exit(1);
            }
            Ok(())
        }

        Commands::Schema { input, record } => {
            let set = load(&input)?;
            let (registry, diagnostics) = engine.register(&set);

            let json = match record {
                Some(name) => match registry.lookup(&name) {
                    Some(schema) => to_json(schema, format)?,
                    None => bail!("record {} is not registered", name),
                },
                None => to_json(&registry.snapshot(), format)?,
            };
            println!("{}", json);

            if !diagnostics.is_empty() {
                eprint!("{}", diagnostics);
            }
            Ok(())
        }

        Commands::Resolve { input, root, path } => {
            let set = load(&input)?;
            let (mut registry, _) = engine.register(&set);
            registry.register_roots([&root]);

            match registry.resolver().resolve(&root, &path) {
                Ok(resolved) => {
                    println!("✅ {}.{} -> {}", root, path, resolved.type_ref);
                    println!("{}", to_json(&resolved, format)?);
                    Ok(())
                }
                Err(e) => {
                    println!("❌ [{}] {}", e.code(), e);
                    std::process::exit(1);
                }
            }
        }
    }
}
