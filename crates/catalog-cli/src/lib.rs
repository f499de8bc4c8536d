//! Consolidator CLI library exports.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations (combine, stats, search, config)

pub mod cli;
pub mod commands;

pub use cli::{Cli, CombineArgs, Commands};
pub use commands::{
    apply_overrides, handle_combine, handle_search, handle_stats, init_logging, load_settings,
    show_config,
};
