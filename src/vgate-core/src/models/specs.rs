use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn def_listen_path() -> String {
    "/".into()
}

fn def_method() -> String {
    "GET".into()
}

fn def_status() -> u16 {
    200
}

// ---------- specifications.yaml ----------
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SpecificationsTemplate {
    #[serde(default)]
    pub specifications: Vec<SpecificationDef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum VersionLocation {
    #[default]
    #[serde(alias = "")]
    None,
    Header,
    #[serde(alias = "url-param", alias = "query")]
    QueryParam,
    #[serde(alias = "url")]
    UrlSegment,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SpecificationDef {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "def_listen_path")]
    pub listen_path: String,
    #[serde(default)]
    pub target_url: Option<String>,
    #[serde(default)]
    pub versioning_enabled: bool,
    #[serde(default)]
    pub default_version_name: String,
    #[serde(default)]
    pub version_location: VersionLocation,
    #[serde(default)]
    pub version_key: String,
    #[serde(default)]
    pub version_segment: usize,
    #[serde(default)]
    pub strip_versioning_data: bool,
    #[serde(default)]
    pub versions: BTreeMap<String, VersionDef>,
}

impl SpecificationDef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            listen_path: def_listen_path(),
            ..Default::default()
        }
    }

    /// Builder: enable versioning, reading the identifier at `location` under `key`.
    pub fn versioned_by(mut self, location: VersionLocation, key: impl Into<String>) -> Self {
        self.versioning_enabled = true;
        self.version_location = location;
        self.version_key = key.into();
        self
    }

    pub fn with_listen_path(mut self, path: impl Into<String>) -> Self {
        self.listen_path = path.into();
        self
    }

    pub fn with_default_version(mut self, name: impl Into<String>) -> Self {
        self.default_version_name = name.into();
        self
    }

    pub fn with_version(mut self, name: impl Into<String>, version: VersionDef) -> Self {
        self.versions.insert(name.into(), version);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct VersionDef {
    #[serde(default)]
    pub expires_at: Option<String>,
    #[serde(default)]
    pub override_target_host: Option<String>,
    #[serde(default)]
    pub linked_specification_id: Option<String>,
    #[serde(default)]
    pub path_rules: Option<PathRulesDef>,
}

impl VersionDef {
    pub fn expiring(at: impl Into<String>) -> Self {
        Self {
            expires_at: Some(at.into()),
            ..Default::default()
        }
    }

    pub fn linked_to(spec_id: impl Into<String>) -> Self {
        Self {
            linked_specification_id: Some(spec_id.into()),
            ..Default::default()
        }
    }

    pub fn with_override(mut self, host: impl Into<String>) -> Self {
        self.override_target_host = Some(host.into());
        self
    }

    pub fn with_rules(mut self, rules: PathRulesDef) -> Self {
        self.path_rules = Some(rules);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PathRulesDef {
    #[serde(default)]
    pub bypass: Vec<String>,
    #[serde(default)]
    pub static_replies: Vec<StaticReplyDef>,
    #[serde(default)]
    pub rewrites: Vec<RewriteDef>,
}

/// Reply bodies may be written as plain text or as structured JSON/YAML.
/// Structured bodies are serialized to JSON once, when the snapshot is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BodyDef {
    Text(String),
    Structured(serde_json::Value),
}

impl Default for BodyDef {
    fn default() -> Self {
        BodyDef::Text(String::new())
    }
}

impl From<&str> for BodyDef {
    fn from(s: &str) -> Self {
        BodyDef::Text(s.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StaticReplyDef {
    pub path: String,
    #[serde(default = "def_method")]
    pub method: String,
    #[serde(default = "def_status")]
    pub status_code: u16,
    #[serde(default)]
    pub body: BodyDef,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RewriteDef {
    pub path: String,
    /// Empty or absent means any method.
    #[serde(default)]
    pub method: Option<String>,
    pub match_pattern: String,
    pub replacement: String,
}
