use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "audioviz.toml";

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_fft_size")]
    pub fft_size: u32,
    #[serde(default = "default_hop_length")]
    pub hop_length: u32,
    #[serde(default = "default_latency_ms")]
    pub simulated_latency_ms: u64,
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: usize,
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_plotly_src")]
    pub plotly_src: String,
    #[serde(default)]
    pub template_dir: Option<PathBuf>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            fft_size: default_fft_size(),
            hop_length: default_hop_length(),
            simulated_latency_ms: default_latency_ms(),
            seed: None,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_upload_mb: default_max_upload_mb(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            plotly_src: default_plotly_src(),
            template_dir: None,
        }
    }
}

fn default_fft_size() -> u32 { 512 }
fn default_hop_length() -> u32 { 256 }
fn default_latency_ms() -> u64 { 1000 }
pub fn default_bind() -> String { "127.0.0.1:8501".into() }
fn default_max_upload_mb() -> usize { 200 }
pub fn default_title() -> String { "AudioViz AI".into() }
fn default_plotly_src() -> String { "https://cdn.plot.ly/plotly-2.35.2.min.js".into() }

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Failed to parse config: {}", path.display()))
}

/// Explicit path, else `./audioviz.toml`, else the per-user config file.
pub fn find_config(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("audioviz").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("audioviz").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}
