//! bagscript CLI - run rhai scripts against the document engine
//!
//! # Binary Usage
//!
//! ```bash
//! # Run main.rhai from the current directory
//! bagscript run
//!
//! # Run a script with debug logging and an explicit configuration
//! bagscript --loglevel debug --config limits.toml run report.rhai
//!
//! # Compile a script without running it
//! bagscript check report.rhai
//! ```

pub mod app;

pub use app::{check_command, load_config, run_cli, run_command, CONFIG_FILE};
