use anyhow::{bail, Context, Result};
use clap::Parser;
use cold_core::VocabularyPreference;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

pub const DEFAULT_CONTROLLER_URL: &str = "http://localhost:5000";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5000;

#[derive(Parser, Debug, Default)]
#[command(name = "cold-console", about = "Operator console for a cold search cluster")]
pub struct Args {
    /// Base URL of the cluster controller.
    #[arg(long, env = "COLD_CONTROLLER_URL")]
    pub controller_url: Option<String>,
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,
    #[arg(long)]
    pub request_timeout_ms: Option<u64>,
    /// Control vocabulary: auto, pause or arm.
    #[arg(long, env = "COLD_VOCABULARY")]
    pub vocabulary: Option<String>,
    /// Directory of *.solve files to use as the solver catalog.
    #[arg(long, env = "COLD_SOLVERS_DIR")]
    pub solvers_dir: Option<PathBuf>,
    #[arg(long, env = "COLD_CONFIG_PATH")]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub log_file: Option<PathBuf>,
    #[arg(long, default_value_t = false)]
    pub debug: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    controller_url: Option<String>,
    poll_interval_ms: Option<u64>,
    request_timeout_ms: Option<u64>,
    vocabulary: Option<String>,
    solvers_dir: Option<PathBuf>,
    log_file: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub controller_url: String,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    pub vocabulary: VocabularyPreference,
    pub solvers_dir: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub debug: bool,
}

/// Flags and environment win over the config file, which wins over defaults.
pub fn load_config(args: Args) -> Result<Config> {
    let file = match &args.config {
        Some(path) => read_file_config(path)?,
        None => {
            let path = default_config_path();
            if path.exists() {
                read_file_config(&path)?
            } else {
                FileConfig::default()
            }
        }
    };
    resolve(args, file)
}

fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cold/console.toml")
}

fn read_file_config(path: &Path) -> Result<FileConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    parse_file_config(&contents).with_context(|| format!("invalid config {}", path.display()))
}

fn parse_file_config(contents: &str) -> Result<FileConfig> {
    Ok(toml::from_str(contents)?)
}

fn resolve(args: Args, file: FileConfig) -> Result<Config> {
    let controller_url = args
        .controller_url
        .or(file.controller_url)
        .unwrap_or_else(|| DEFAULT_CONTROLLER_URL.to_string());
    if controller_url.trim().is_empty() {
        bail!("controller url is empty");
    }

    let poll_interval_ms = args
        .poll_interval_ms
        .or(file.poll_interval_ms)
        .unwrap_or(DEFAULT_POLL_INTERVAL_MS);
    if poll_interval_ms == 0 {
        bail!("poll interval must be positive");
    }
    let request_timeout_ms = args
        .request_timeout_ms
        .or(file.request_timeout_ms)
        .unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS);
    if request_timeout_ms == 0 {
        bail!("request timeout must be positive");
    }

    let vocabulary = match args.vocabulary.or(file.vocabulary) {
        Some(raw) => raw
            .parse::<VocabularyPreference>()
            .map_err(anyhow::Error::msg)?,
        None => VocabularyPreference::Auto,
    };

    Ok(Config {
        controller_url: controller_url.trim().to_string(),
        poll_interval: Duration::from_millis(poll_interval_ms),
        request_timeout: Duration::from_millis(request_timeout_ms),
        vocabulary,
        solvers_dir: args.solvers_dir.or(file.solvers_dir),
        log_file: args.log_file.or(file.log_file),
        debug: args.debug,
    })
}
