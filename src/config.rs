//! Layered configuration.
//!
//! Sources, lowest priority first:
//!
//! 1. the defaults compiled in from `.config/config.toml`,
//! 2. `config.toml` in the platform config directory, or the file given
//!    with `--config`,
//! 3. environment variables `STOREFRONT__SECTION__KEY`
//!    (e.g. `STOREFRONT__FEED__PAGE_SIZE=20`),
//! 4. command-line flags, applied by [`Config::apply_cli`].
//!
//! ## For contributors
//!
//! New keys need a default in `.config/config.toml`; deserialisation fails
//! when a key is missing from every layer.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, Environment, File, FileFormat};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::cli::Cli;
use crate::feed::{FeedOptions, RetryPolicy};
use crate::source::Category;
use crate::theme::ThemeMode;

const DEFAULTS: &str = include_str!("../.config/config.toml");
const CONFIG_FILE: &str = "config.toml";
const ENV_PREFIX: &str = "STOREFRONT";
const STORE_FILE: &str = "products.json";

/// `store_path` value selecting a store that lives only as long as the
/// process.
pub const MEMORY_STORE: &str = ":memory:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Offset-paginated HTTP catalog.
    Rest,
    /// Local document store with live insertions.
    Document,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub source: SourceConfig,
    pub feed: FeedConfig,
    pub auth: AuthConfig,
    pub ui: UiConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub kind: SourceKind,
    pub base_url: String,
    /// Document store file.  Defaults to `products.json` in the data dir;
    /// [`MEMORY_STORE`] keeps nothing on disk.
    #[serde(default)]
    pub store_path: Option<PathBuf>,
    pub timeout_secs: u64,
    pub user_agent: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedConfig {
    pub page_size: NonZeroUsize,
    pub categories: Vec<String>,
    /// Rows from the bottom of the list at which the next page is requested.
    pub end_reached_threshold: usize,
    pub seed_on_empty: bool,
    pub max_retries: u32,
    pub retry_initial_ms: u64,
    pub retry_max_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Identity Toolkit web API key.  Sign-in is skipped without one.
    /// Secrets are read but never written back out.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    pub endpoint: String,
    #[serde(default, skip_serializing)]
    pub google_id_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiConfig {
    pub theme: ThemeMode,
    pub currency: String,
    pub tick_ms: u64,
    pub banner_ms: u64,
}

impl Config {
    /// Load every layer except the command line.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::from(config_dir().join(CONFIG_FILE)).required(false),
        };
        Self::defaults()
            .add_source(file)
            .add_source(environment())
            .build()?
            .try_deserialize()
    }

    fn defaults() -> ConfigBuilder<DefaultState> {
        config::Config::builder().add_source(File::from_str(DEFAULTS, FileFormat::Toml))
    }

    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(kind) = cli.source {
            self.source.kind = kind;
        }
        if let Some(page_size) = cli.page_size {
            self.feed.page_size = page_size;
        }
        if let Some(theme) = cli.theme {
            self.ui.theme = theme;
        }
    }

    pub fn store_path(&self) -> PathBuf {
        self.source
            .store_path
            .clone()
            .unwrap_or_else(|| data_dir().join(STORE_FILE))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.source.timeout_secs)
    }

    pub fn feed_options(&self) -> FeedOptions {
        FeedOptions {
            page_size: self.feed.page_size,
            category: Category::All,
            // Only a store we can write to can be seeded.
            seed_on_empty: self.feed.seed_on_empty && self.source.kind == SourceKind::Document,
            retry: RetryPolicy {
                max_retries: self.feed.max_retries,
                initial_delay: Duration::from_millis(self.feed.retry_initial_ms),
                max_delay: Duration::from_millis(self.feed.retry_max_ms),
            },
        }
    }

    /// `All` followed by the configured categories.
    pub fn categories(&self) -> Vec<Category> {
        std::iter::once(Category::All)
            .chain(self.feed.categories.iter().map(|c| Category::from(c.as_str())))
            .fold(Vec::new(), |mut acc, c| {
                if !acc.contains(&c) {
                    acc.push(c);
                }
                acc
            })
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("feed.categories")
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "storefront", env!("CARGO_PKG_NAME"))
}

pub fn config_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.config_local_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".").join(".config"))
}

pub fn data_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_local_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".").join(".data"))
}
