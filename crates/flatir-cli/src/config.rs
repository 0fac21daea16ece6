//! Configuration file parsing for flatir.toml.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Execution settings
    #[serde(default)]
    pub run: RunConfig,

    /// Buffer output settings
    #[serde(default)]
    pub compile: CompileConfig,

    /// Logging settings
    #[serde(default)]
    pub log: LogConfig,
}

/// Execution configuration.
#[derive(Debug, Deserialize)]
pub struct RunConfig {
    /// How the top-level receiver inspects
    #[serde(default = "default_self_name")]
    pub self_name: String,

    /// Module owning the top-level scope
    #[serde(default = "default_module_name")]
    pub module_name: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            self_name: default_self_name(),
            module_name: default_module_name(),
        }
    }
}

/// Buffer output configuration.
#[derive(Debug, Default, Deserialize)]
pub struct CompileConfig {
    /// Keep the buffers `run` writes instead of using a temporary directory
    #[serde(default)]
    pub keep_buffers: bool,

    /// Directory for kept and compiled buffers (defaults to next to the source)
    pub output_dir: Option<PathBuf>,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
pub struct LogConfig {
    /// Default tracing filter when `RUST_LOG` is unset
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

fn default_self_name() -> String {
    "main".to_string()
}

fn default_module_name() -> String {
    "Object".to_string()
}

fn default_filter() -> String {
    "warn".to_string()
}

/// Config file names to search for
const CONFIG_NAMES: &[&str] = &["flatir.toml", ".flatir.toml"];

/// Load configuration from a file or search for default config files.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    if let Some(path) = path
        && !path.exists()
    {
        anyhow::bail!("Config file not found: {}", path.display());
    }
    let config_path = path.map(PathBuf::from).or_else(find_config_file);

    match config_path {
        Some(path) if path.exists() => {
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path.display(), e))?;
            Ok(config)
        }
        _ => Ok(Config::default()),
    }
}

/// Search for a configuration file in the current directory and its parents,
/// then in the user configuration directory.
fn find_config_file() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    find_in_ancestors(&cwd).or_else(|| {
        let path = dirs::config_dir()?.join("flatir").join("flatir.toml");
        path.exists().then_some(path)
    })
}

fn find_in_ancestors(start: &Path) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(current) = dir {
        for name in CONFIG_NAMES {
            let path = current.join(name);
            if path.exists() {
                return Some(path);
            }
        }
        dir = current.parent();
    }
    None
}
