//! Normalized, immutable specification structures.
//!
//! Everything here is built once per snapshot from the raw `models` documents
//! and then only read. Anything that could fail to parse (methods, status
//! codes, rewrite patterns, reply bodies) is resolved during that build.

use crate::models::{BodyDef, PathRulesDef, RewriteDef, SpecificationDef, StaticReplyDef, VersionDef};
pub use crate::models::VersionLocation;
use chrono::{DateTime, NaiveDateTime, Utc};
use http::header::{HeaderName, HeaderValue};
use http::{Method, StatusCode};
use regex::Regex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::warn;
use vgate_errors::LoadError;

/// Layout of `expiresAt` values, interpreted as UTC.
pub const EXPIRY_LAYOUT: &str = "%Y-%m-%d %H:%M";

/// Name given to the implicit version of a specification declaring none.
pub const IMPLICIT_VERSION: &str = "Default";

/// Parsed form of a version's `expiresAt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expiry {
    Never,
    At(DateTime<Utc>),
    /// Kept verbatim; treated as not expired.
    Invalid(String),
}

impl Expiry {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => Expiry::Never,
            Some(s) => match NaiveDateTime::parse_from_str(s, EXPIRY_LAYOUT) {
                Ok(at) => Expiry::At(at.and_utc()),
                Err(_) => Expiry::Invalid(s.to_string()),
            },
        }
    }
}

#[derive(Debug)]
pub struct ApiSpecification {
    pub id: String,
    pub name: String,
    pub listen_path: String,
    pub target_url: Option<String>,
    pub versioning_enabled: bool,
    pub default_version_name: Option<String>,
    pub version_location: VersionLocation,
    pub version_key: String,
    pub version_segment: usize,
    pub strip_versioning_data: bool,
    pub versions: HashMap<String, Arc<VersionEntry>>,
    /// Lifted from the implicit version when versioning is disabled.
    pub override_target_host: Option<String>,
    implicit_version: Option<String>,
    override_conflict: Option<String>,
    bypass: HashSet<String>,
}

impl ApiSpecification {
    pub fn version(&self, name: &str) -> Option<&Arc<VersionEntry>> {
        self.versions.get(name)
    }

    /// The sole entry of a non-versioned specification.
    pub fn implicit_version(&self) -> Option<&Arc<VersionEntry>> {
        self.implicit_version.as_deref().and_then(|n| self.versions.get(n))
    }

    /// Name of an entry carrying an override target while versioning is on.
    pub fn override_conflict(&self) -> Option<&str> {
        self.override_conflict.as_deref()
    }

    /// Bypass paths of every version, looked up before any version is known.
    pub fn is_bypassed(&self, path: &str) -> bool {
        self.bypass.contains(path)
    }

    pub fn links(&self) -> impl Iterator<Item = &str> {
        self.versions
            .values()
            .filter_map(|v| v.linked_specification_id.as_deref())
    }
}

#[derive(Debug)]
pub struct VersionEntry {
    pub name: String,
    pub expires_at: Option<String>,
    pub expiry: Expiry,
    pub override_target_host: Option<String>,
    pub linked_specification_id: Option<String>,
    /// Handle to the linked specification, resolved at snapshot build.
    pub linked: Option<Arc<ApiSpecification>>,
    pub path_rules: Option<PathRuleSet>,
}

#[derive(Debug, Clone, Default)]
pub struct PathRuleSet {
    pub bypass: HashSet<String>,
    pub static_replies: Vec<StaticReplyRule>,
    pub rewrites: Vec<RewriteRule>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticReplyRule {
    pub path: String,
    pub method: Method,
    pub status: StatusCode,
    pub body: String,
    pub headers: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct RewriteRule {
    pub path: String,
    pub method: Option<Method>,
    /// Source text as configured.
    pub match_pattern: String,
    /// `match_pattern` anchored at both ends.
    pub regex: Regex,
    pub replacement: String,
}

impl RewriteRule {
    pub fn applies_to(&self, method: &Method) -> bool {
        self.method.as_ref().is_none_or(|m| m == method)
    }
}

/// Versions a caller may use on one specification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallerGrant {
    pub spec_id: String,
    pub allowed_version_names: HashSet<String>,
}

impl CallerGrant {
    pub fn allows(&self, version: &str) -> bool {
        self.allowed_version_names.contains(version)
    }
}

// ---------------- Normalization ----------------

fn non_empty(s: &Option<String>) -> Option<String> {
    s.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub(crate) fn normalize_listen_path(path: &str) -> String {
    let trimmed = path.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        "/".into()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

fn parse_method(spec_id: &str, version: &str, raw: &str) -> Result<Method, LoadError> {
    Method::from_bytes(raw.trim().to_ascii_uppercase().as_bytes()).map_err(|_| {
        LoadError::InvalidMethod {
            spec_id: spec_id.into(),
            version: version.into(),
            method: raw.into(),
        }
    })
}

fn build_reply(spec_id: &str, version: &str, def: &StaticReplyDef) -> Result<StaticReplyRule, LoadError> {
    let method = parse_method(spec_id, version, &def.method)?;
    let status = StatusCode::from_u16(def.status_code).map_err(|_| LoadError::InvalidStatusCode {
        spec_id: spec_id.into(),
        version: version.into(),
        code: def.status_code,
    })?;
    for (k, v) in &def.headers {
        if HeaderName::from_bytes(k.as_bytes()).is_err() || HeaderValue::from_str(v).is_err() {
            return Err(LoadError::InvalidHeader {
                spec_id: spec_id.into(),
                version: version.into(),
                header: k.clone(),
            });
        }
    }
    let body = match &def.body {
        BodyDef::Text(s) => s.clone(),
        BodyDef::Structured(v) => v.to_string(),
    };

    Ok(StaticReplyRule {
        path: def.path.clone(),
        method,
        status,
        body,
        headers: def.headers.clone(),
    })
}

fn build_rewrite(spec_id: &str, version: &str, def: &RewriteDef) -> Result<RewriteRule, LoadError> {
    let method = match def.method.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(m) => Some(parse_method(spec_id, version, m)?),
    };
    let regex = Regex::new(&format!("^(?:{})$", def.match_pattern)).map_err(|e| {
        LoadError::InvalidRewritePattern {
            spec_id: spec_id.into(),
            version: version.into(),
            pattern: def.match_pattern.clone(),
            reason: e.to_string(),
        }
    })?;

    Ok(RewriteRule {
        path: def.path.clone(),
        method,
        match_pattern: def.match_pattern.clone(),
        regex,
        replacement: def.replacement.clone(),
    })
}

fn build_rules(spec_id: &str, version: &str, def: &PathRulesDef) -> Result<PathRuleSet, LoadError> {
    let mut static_replies = Vec::with_capacity(def.static_replies.len());
    for r in &def.static_replies {
        static_replies.push(build_reply(spec_id, version, r)?);
    }
    let mut rewrites = Vec::with_capacity(def.rewrites.len());
    for r in &def.rewrites {
        rewrites.push(build_rewrite(spec_id, version, r)?);
    }

    Ok(PathRuleSet {
        bypass: def.bypass.iter().cloned().collect(),
        static_replies,
        rewrites,
    })
}

fn build_version(spec_id: &str, name: &str, def: &VersionDef) -> Result<VersionEntry, LoadError> {
    let expiry = Expiry::parse(def.expires_at.as_deref());
    if let Expiry::Invalid(raw) = &expiry {
        warn!(spec_id, version = name, expires_at = %raw, "unparseable expiry, version never expires");
    }
    let path_rules = def
        .path_rules
        .as_ref()
        .map(|r| build_rules(spec_id, name, r))
        .transpose()?;

    Ok(VersionEntry {
        name: name.to_string(),
        expires_at: non_empty(&def.expires_at),
        expiry,
        override_target_host: non_empty(&def.override_target_host),
        linked_specification_id: non_empty(&def.linked_specification_id),
        linked: None,
        path_rules,
    })
}

impl ApiSpecification {
    /// Normalize one specification. Link handles are left empty; the snapshot
    /// builder fills them in once every specification exists.
    pub fn from_def(def: &SpecificationDef) -> Result<Self, LoadError> {
        let id = def.id.trim();
        if id.is_empty() {
            return Err(LoadError::EmptySpecificationId);
        }

        let mut versions = HashMap::with_capacity(def.versions.len().max(1));
        for (name, v) in &def.versions {
            versions.insert(name.clone(), Arc::new(build_version(id, name, v)?));
        }

        let default_version_name =
            Some(def.default_version_name.trim().to_string()).filter(|s| !s.is_empty());

        let mut implicit_version = None;
        let mut override_target_host = None;
        let mut override_conflict = None;

        if def.versioning_enabled {
            // Lowest name first so the reported entry is stable across reloads.
            let mut with_override: Vec<&String> = versions
                .iter()
                .filter(|(_, v)| v.override_target_host.is_some())
                .map(|(n, _)| n)
                .collect();
            with_override.sort();
            override_conflict = with_override.first().map(|n| (*n).clone());
        } else {
            let name = match versions.len() {
                0 => {
                    versions.insert(
                        IMPLICIT_VERSION.to_string(),
                        Arc::new(build_version(id, IMPLICIT_VERSION, &VersionDef::default())?),
                    );
                    IMPLICIT_VERSION.to_string()
                }
                1 => versions.keys().next().cloned().unwrap_or_default(),
                _ => match &default_version_name {
                    Some(d) if versions.contains_key(d) => d.clone(),
                    _ => return Err(LoadError::AmbiguousImplicitVersion(id.to_string())),
                },
            };
            override_target_host = versions
                .get(&name)
                .and_then(|v| v.override_target_host.clone());
            implicit_version = Some(name);
        }

        let bypass = versions
            .values()
            .filter_map(|v| v.path_rules.as_ref())
            .flat_map(|r| r.bypass.iter().cloned())
            .collect();

        Ok(Self {
            id: id.to_string(),
            name: if def.name.trim().is_empty() { id.to_string() } else { def.name.clone() },
            listen_path: normalize_listen_path(&def.listen_path),
            target_url: non_empty(&def.target_url),
            versioning_enabled: def.versioning_enabled,
            default_version_name,
            version_location: def.version_location,
            version_key: def.version_key.trim().to_string(),
            version_segment: def.version_segment,
            strip_versioning_data: def.strip_versioning_data,
            versions,
            override_target_host,
            implicit_version,
            override_conflict,
            bypass,
        })
    }

    /// Copy of this specification with every linking version pointing at its
    /// resolved target.
    pub(crate) fn with_links(&self, targets: &HashMap<String, Arc<ApiSpecification>>) -> Self {
        let versions = self
            .versions
            .iter()
            .map(|(name, v)| {
                let linked = v
                    .linked_specification_id
                    .as_ref()
                    .and_then(|id| targets.get(id).cloned());
                let entry = if linked.is_some() {
                    Arc::new(VersionEntry {
                        name: v.name.clone(),
                        expires_at: v.expires_at.clone(),
                        expiry: v.expiry.clone(),
                        override_target_host: v.override_target_host.clone(),
                        linked_specification_id: v.linked_specification_id.clone(),
                        linked,
                        path_rules: v.path_rules.clone(),
                    })
                } else {
                    v.clone()
                };
                (name.clone(), entry)
            })
            .collect();

        Self {
            id: self.id.clone(),
            name: self.name.clone(),
            listen_path: self.listen_path.clone(),
            target_url: self.target_url.clone(),
            versioning_enabled: self.versioning_enabled,
            default_version_name: self.default_version_name.clone(),
            version_location: self.version_location,
            version_key: self.version_key.clone(),
            version_segment: self.version_segment,
            strip_versioning_data: self.strip_versioning_data,
            versions,
            override_target_host: self.override_target_host.clone(),
            implicit_version: self.implicit_version.clone(),
            override_conflict: self.override_conflict.clone(),
            bypass: self.bypass.clone(),
        }
    }
}
