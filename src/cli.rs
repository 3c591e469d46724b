use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::Parser;

use crate::config::SourceKind;
use crate::theme::ThemeMode;

/// Infinite-scroll product catalog for the terminal.
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Cli {
    /// Read configuration from this file instead of the platform config dir.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Where products come from.
    #[arg(short, long, value_enum)]
    pub source: Option<SourceKind>,

    /// Products per page.
    #[arg(short = 'n', long, value_name = "N")]
    pub page_size: Option<NonZeroUsize>,

    #[arg(short, long, value_enum)]
    pub theme: Option<ThemeMode>,

    /// Print the effective configuration as JSON and exit.
    #[arg(long)]
    pub print_config: bool,
}
