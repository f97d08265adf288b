//! CLI command handling module
//!
//! Handles all CLI subcommands and argument parsing.

mod commands;
mod logging;
pub mod pipeline;
mod version;

pub use commands::{ConfigSubcommand, handle_config_command};
pub use logging::*;
pub use pipeline::SelectionArgs;
pub use version::display_version;
