//! CLI Application logic
//!
//! Contains the command-line interface implementation.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context as _, Result};
use bagscript_bindings::{Context, EngineConfig, LogLevel, ScriptEngine};
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Configuration picked up from the working directory
pub const CONFIG_FILE: &str = "bagscript.toml";

#[derive(Parser)]
#[command(name = "bagscript")]
#[command(author, version, about = "Typeset PDF documents with rhai scripts", long_about = None)]
struct Cli {
    /// Log level: error, warn, info, debug or trace
    #[arg(long, global = true)]
    loglevel: Option<String>,

    /// Configuration file (defaults to bagscript.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a script
    Run {
        /// Script file
        #[arg(default_value = "main.rhai")]
        script: PathBuf,
    },

    /// Compile a script without running it
    Check {
        /// Script file
        script: PathBuf,
    },
}

/// Run the CLI application
///
/// This is the main entry point for the command-line interface.
/// It parses arguments and dispatches to the appropriate command.
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(level) = &cli.loglevel {
        config.log.level = match LogLevel::parse(level) {
            Some(level) => level,
            None => bail!("Unknown log level: {}", level),
        };
    }
    init_logging(config.log.level);

    match cli.command {
        Commands::Run { script } => run_command(&script, &config)?,
        Commands::Check { script } => check_command(&script, &config)?,
    }

    Ok(())
}

/// Install the stderr subscriber. `RUST_LOG` wins over the configured level.
fn init_logging(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(level.as_tracing().into()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Load the configuration from `path`, or from `bagscript.toml` in the
/// working directory, or fall back to the defaults
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let path = match path {
        Some(path) => {
            if !path.exists() {
                bail!("Configuration file not found: {}", path.display());
            }
            path.to_path_buf()
        }
        None => {
            let default = PathBuf::from(CONFIG_FILE);
            if !default.exists() {
                debug!("no {} found, using defaults", CONFIG_FILE);
                return Ok(EngineConfig::default());
            }
            default
        }
    };
    let config = EngineConfig::load(&path)
        .with_context(|| format!("Failed to load configuration: {}", path.display()))?;
    debug!(path = %path.display(), "loaded configuration");
    Ok(config)
}

fn compile(engine: &ScriptEngine, script: &Path) -> Result<rhai::AST> {
    if !script.exists() {
        bail!("Script not found: {}", script.display());
    }
    engine
        .compile_file(script)
        .with_context(|| format!("Failed to compile script: {}", script.display()))
}

/// Execute the run command
pub fn run_command(script: &Path, config: &EngineConfig) -> Result<()> {
    info!("bagscript v{}", bagscript_bindings::VERSION);
    let engine = ScriptEngine::with_config(config, Context::default());
    let ast = compile(&engine, script)?;

    let started = Instant::now();
    engine
        .run(&ast)
        .with_context(|| format!("Failed to run script: {}", script.display()))?;
    info!(
        script = %script.display(),
        cost = engine.context().spent(),
        "finished in {:.2?}",
        started.elapsed()
    );
    Ok(())
}

/// Execute the check command
pub fn check_command(script: &Path, config: &EngineConfig) -> Result<()> {
    let engine = ScriptEngine::with_config(config, Context::default());
    compile(&engine, script)?;
    println!("{}: ok", script.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_defaults() {
        let cli = Cli::try_parse_from(["bagscript", "run"]).unwrap();
        assert!(cli.loglevel.is_none());
        match cli.command {
            Commands::Run { script } => assert_eq!(script, PathBuf::from("main.rhai")),
            Commands::Check { .. } => panic!("expected run"),
        }
    }

    #[test]
    fn test_cli_global_options() {
        let cli = Cli::try_parse_from([
            "bagscript",
            "check",
            "doc.rhai",
            "--loglevel",
            "debug",
            "--config",
            "limits.toml",
        ])
        .unwrap();
        assert_eq!(cli.loglevel.as_deref(), Some("debug"));
        assert_eq!(cli.config, Some(PathBuf::from("limits.toml")));
        assert!(matches!(cli.command, Commands::Check { .. }));
    }

    #[test]
    fn test_check_requires_script() {
        assert!(Cli::try_parse_from(["bagscript", "check"]).is_err());
    }
}
