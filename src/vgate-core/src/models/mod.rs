pub mod consumers;
pub mod specs;

pub use consumers::*;
pub use specs::*;

use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

/// Everything read from disk for one configuration generation, before
/// normalization.
#[derive(Debug, Clone, Default)]
pub struct RawConfig {
    pub specifications: SpecificationsTemplate,
    pub consumers: ConsumersTemplate,
}

/// Read a yaml/json/toml document, chosen by file extension.
pub fn read_file<T>(path: impl AsRef<Path>) -> Result<T>
where
    T: DeserializeOwned,
{
    let path = path.as_ref();
    let content =
        fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    let parsed: Result<T> = match ext {
        "yaml" | "yml" => serde_yml::from_str(&content).map_err(Into::into),
        "json" => serde_json::from_str(&content).map_err(Into::into),
        "toml" => toml::from_str(&content).map_err(Into::into),
        _ => Err(anyhow!("unknown config extension: {}", path.display())),
    };

    parsed.with_context(|| format!("parse {}", path.display()))
}

/// Load specifications and consumer grants. An empty grants path means no
/// consumers are configured.
pub fn load_all(specs_p: impl AsRef<Path>, grants_p: impl AsRef<Path>) -> Result<RawConfig> {
    let specifications: SpecificationsTemplate = read_file(specs_p)?;
    let grants_p = grants_p.as_ref();
    let consumers: ConsumersTemplate = if grants_p.as_os_str().is_empty() {
        ConsumersTemplate::default()
    } else {
        read_file(grants_p)?
    };

    Ok(RawConfig {
        specifications,
        consumers,
    })
}
