use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayCfg {
    #[serde(default = "def_name")]
    pub name: String,
    /// `EnvFilter` directive.
    #[serde(default = "def_logging")]
    pub logging_mode: String,
    #[serde(default)]
    pub log_format: LogFormat,
    /// Header carrying the caller token.
    #[serde(default = "def_auth_header")]
    pub auth_header: String,
}
fn def_name() -> String { "vgate".into() }
fn def_logging() -> String { "info".into() }
fn def_auth_header() -> String { "authorization".into() }

impl Default for GatewayCfg {
    fn default() -> Self {
        Self {
            name: def_name(),
            logging_mode: def_logging(),
            log_format: LogFormat::default(),
            auth_header: def_auth_header(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Plain,
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilesCfg {
    #[serde(default = "def_specifications")]
    pub specifications: PathBuf,
    /// Empty means no consumers.
    #[serde(default)]
    pub grants: PathBuf,
}
fn def_specifications() -> PathBuf { PathBuf::from("specs.yaml") }

impl Default for FilesCfg {
    fn default() -> Self {
        Self {
            specifications: def_specifications(),
            grants: PathBuf::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TracingCfg {
    /// Empty disables span export, `stdout` prints spans.
    #[serde(default)]
    pub otlp_endpoint: String,
    #[serde(default)]
    pub service_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReloadCfg {
    #[serde(default = "def_poll")]
    pub poll_interval_sec: u64,
}
fn def_poll() -> u64 { 5 }

impl Default for ReloadCfg {
    fn default() -> Self {
        Self { poll_interval_sec: def_poll() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub gateway: GatewayCfg,
    #[serde(default)]
    pub files: FilesCfg,
    #[serde(default)]
    pub tracing: TracingCfg,
    #[serde(default)]
    pub reload: ReloadCfg,
}

impl FileConfig {
    /// Service name reported to tracing, falling back to the gateway name.
    pub fn service_name(&self) -> &str {
        if self.tracing.service_name.is_empty() {
            &self.gateway.name
        } else {
            &self.tracing.service_name
        }
    }

    /// Make relative data file paths relative to `dir`.
    pub fn resolve_paths(&mut self, dir: &Path) {
        for p in [&mut self.files.specifications, &mut self.files.grants] {
            if !p.as_os_str().is_empty() && p.is_relative() {
                *p = dir.join(&*p);
            }
        }
    }
}

/// Read the process configuration. Data file paths come back relative to the
/// directory holding `path`.
pub fn load_config(path: impl AsRef<Path>) -> Result<FileConfig> {
    let path = path.as_ref();
    let content =
        fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();

    let mut cfg: FileConfig = match ext {
        "yaml" | "yml" => serde_yml::from_str(&content)?,
        "json" => serde_json::from_str(&content)?,
        "toml" => toml::from_str(&content)?,
        _ => return Err(anyhow!("Unknown config extension: {}", path.display())),
    };

    if let Some(dir) = path.parent() {
        cfg.resolve_paths(dir);
    }
    debug!(config = %path.display(), specifications = %cfg.files.specifications.display(), "config loaded");
    Ok(cfg)
}
