use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use daoc::config::CompilerConfig;
use daoc::model::Declarations;
use daoc::plugin::PluginRegistry;
use daoc::processor::{run_round, RoundOutput};

/// Compile-time query compiler for data-access declarations
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Declarations file (.toml or .json)
    declarations: PathBuf,

    /// Compiler settings; defaults to daoc.toml next to the declarations
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where generated DAO implementations are written
    #[arg(long = "out-dir", default_value = "generated")]
    out_dir: PathBuf,

    /// How diagnostics are printed
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Log round progress to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "daoc=debug" } else { "daoc=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(output) if output.has_errors() => ExitCode::FAILURE,
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: &Cli) -> Result<RoundOutput> {
    let decls = Declarations::load(&cli.declarations)?;
    let config = CompilerConfig::discover(cli.config.as_deref(), &cli.declarations)?;
    let plugins = PluginRegistry::with_defaults();

    let output = run_round(&decls, &config, &plugins)?;
    report(&output, cli.format)?;

    if !output.daos.is_empty() {
        std::fs::create_dir_all(&cli.out_dir)
            .with_context(|| format!("creating {}", cli.out_dir.display()))?;
    }
    for dao in &output.daos {
        let path = cli.out_dir.join(dao.file_name());
        std::fs::write(&path, &dao.source).with_context(|| format!("writing {}", path.display()))?;
        tracing::info!(path = %path.display(), methods = dao.methods.len(), "wrote dao");
    }
    Ok(output)
}

fn report(output: &RoundOutput, format: Format) -> Result<()> {
    match format {
        Format::Text => {
            for diagnostic in output.diagnostics.iter() {
                eprintln!("{diagnostic}");
            }
        }
        Format::Json => {
            let json = serde_json::to_string_pretty(&output.diagnostics)?;
            println!("{json}");
        }
    }
    Ok(())
}
