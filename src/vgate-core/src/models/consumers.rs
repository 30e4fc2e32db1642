use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------- grants.yaml ----------
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConsumersTemplate {
    #[serde(default)]
    pub consumers: Vec<Consumer>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Consumer {
    pub id: String,
    /// Tokens this consumer authenticates with.
    #[serde(default)]
    pub keys: Vec<String>,
    /// Specification id -> granted versions.
    #[serde(default)]
    pub access_rights: BTreeMap<String, AccessRight>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AccessRight {
    #[serde(default)]
    pub versions: Vec<String>,
}

impl Consumer {
    pub fn new(id: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            keys: vec![key.into()],
            ..Default::default()
        }
    }

    pub fn grant<I, S>(mut self, spec_id: impl Into<String>, versions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.access_rights.insert(
            spec_id.into(),
            AccessRight {
                versions: versions.into_iter().map(Into::into).collect(),
            },
        );
        self
    }
}
