use serde::Serialize;
use std::collections::BTreeMap;
use vgate_errors::Denial;

/// What the dispatch layer should do with a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum DispatchDecision {
    /// Answer directly from configuration.
    Reply {
        status_code: u16,
        body: String,
        headers: BTreeMap<String, String>,
    },
    /// Proxy upstream.
    Forward {
        /// Path below the listen path, possibly rewritten.
        path: String,
        target_host: Option<String>,
        specification_id: String,
        /// Resolved version of the effective specification. `None` when bypassed.
        version: Option<String>,
        bypassed: bool,
    },
    Denied {
        #[serde(flatten)]
        reason: Denial,
    },
}

impl DispatchDecision {
    pub fn denied(reason: Denial) -> Self {
        DispatchDecision::Denied { reason }
    }

    pub fn denial(&self) -> Option<&Denial> {
        match self {
            DispatchDecision::Denied { reason } => Some(reason),
            _ => None,
        }
    }

    pub fn is_forward(&self) -> bool {
        matches!(self, DispatchDecision::Forward { .. })
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchDecision::Reply { .. } => "reply",
            DispatchDecision::Forward { bypassed: true, .. } => "bypass",
            DispatchDecision::Forward { .. } => "forward",
            DispatchDecision::Denied { .. } => "denied",
        }
    }
}
