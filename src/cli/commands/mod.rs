pub mod batch;
pub mod check;
pub mod config;
pub mod extract;
pub mod report;

use clap::ValueEnum;

/// Output format for commands that print structured data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}
