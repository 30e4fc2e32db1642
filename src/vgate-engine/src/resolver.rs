//! Picks the version entry a request runs under.

use crate::expiry::check_at;
use crate::request::InboundRequest;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, warn};
use vgate_core::{ApiSpecification, VersionEntry, VersionLocation};
use vgate_errors::Denial;

/// Outcome of a successful resolution.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// The specification that received the request. Grants are checked here.
    pub authorizing: Arc<ApiSpecification>,
    /// Entry of `authorizing` named by the request (or its default).
    pub version: Arc<VersionEntry>,
    /// Specification whose rules and upstream apply. Differs from
    /// `authorizing` only when `version` links elsewhere.
    pub effective: Arc<ApiSpecification>,
    pub effective_version: Arc<VersionEntry>,
    /// Path below the listen path, with the version segment removed when the
    /// specification strips it.
    pub path: String,
}

impl Resolution {
    pub fn is_linked(&self) -> bool {
        !Arc::ptr_eq(&self.authorizing, &self.effective)
    }

    /// Upstream host override of the entry whose rules apply.
    pub fn target_host(&self) -> Option<&str> {
        self.effective_version.override_target_host.as_deref()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct VersionResolver;

impl VersionResolver {
    pub fn new() -> Self {
        Self
    }

    pub fn resolve(
        &self,
        spec: &Arc<ApiSpecification>,
        req: &InboundRequest,
        sub_path: &str,
    ) -> Result<Resolution, Denial> {
        self.resolve_at(spec, req, sub_path, Utc::now())
    }

    /// Resolve against a fixed clock.
    pub fn resolve_at(
        &self,
        spec: &Arc<ApiSpecification>,
        req: &InboundRequest,
        sub_path: &str,
        now: DateTime<Utc>,
    ) -> Result<Resolution, Denial> {
        // A conflicting specification never resolves, whatever the request names.
        check_conflict(spec)?;
        let (version, path) = select(spec, req, sub_path)?;
        check_expiry(spec, &version, now)?;

        let Some(linked) = version.linked.clone() else {
            return Ok(Resolution {
                authorizing: spec.clone(),
                effective: spec.clone(),
                effective_version: version.clone(),
                version,
                path,
            });
        };

        check_conflict(&linked)?;
        let effective_version = select_without_request(&linked)?;
        check_expiry(&linked, &effective_version, now)?;
        debug!(
            spec = %spec.id,
            version = %version.name,
            effective = %linked.id,
            effective_version = %effective_version.name,
            "followed version link"
        );

        Ok(Resolution {
            authorizing: spec.clone(),
            version,
            effective: linked,
            effective_version,
            path,
        })
    }
}

/// The version identifier carried by the request, if any.
pub fn extract_identifier<'a>(
    spec: &ApiSpecification,
    req: &'a InboundRequest,
    sub_path: &'a str,
) -> Option<&'a str> {
    match spec.version_location {
        VersionLocation::None => None,
        VersionLocation::Header => req.header_value(&spec.version_key),
        VersionLocation::QueryParam => req.query_value(&spec.version_key),
        VersionLocation::UrlSegment => segment(sub_path, spec.version_segment),
    }
}

fn segment(path: &str, index: usize) -> Option<&str> {
    path.strip_prefix('/')
        .unwrap_or(path)
        .split('/')
        .nth(index)
        .filter(|s| !s.is_empty())
}

fn strip_segment(path: &str, index: usize) -> String {
    let kept: Vec<&str> = path
        .strip_prefix('/')
        .unwrap_or(path)
        .split('/')
        .enumerate()
        .filter(|(i, _)| *i != index)
        .map(|(_, s)| s)
        .collect();
    format!("/{}", kept.join("/"))
}

fn select(
    spec: &ApiSpecification,
    req: &InboundRequest,
    sub_path: &str,
) -> Result<(Arc<VersionEntry>, String), Denial> {
    if !spec.versioning_enabled {
        let entry = spec
            .implicit_version()
            .cloned()
            .ok_or_else(|| Denial::VersionNotFound { spec_id: spec.id.clone() })?;
        return Ok((entry, sub_path.to_string()));
    }

    match extract_identifier(spec, req, sub_path) {
        Some(name) => {
            let entry = lookup(spec, name)?;
            let path = if spec.strip_versioning_data
                && spec.version_location == VersionLocation::UrlSegment
            {
                strip_segment(sub_path, spec.version_segment)
            } else {
                sub_path.to_string()
            };
            Ok((entry, path))
        }
        None => Ok((by_default(spec)?, sub_path.to_string())),
    }
}

/// Entry of a linked specification, chosen from its configuration alone.
fn select_without_request(spec: &ApiSpecification) -> Result<Arc<VersionEntry>, Denial> {
    if !spec.versioning_enabled {
        return spec
            .implicit_version()
            .cloned()
            .ok_or_else(|| Denial::VersionNotFound { spec_id: spec.id.clone() });
    }
    by_default(spec)
}

fn by_default(spec: &ApiSpecification) -> Result<Arc<VersionEntry>, Denial> {
    match spec.default_version_name.as_deref() {
        None => Err(Denial::VersionNotFound { spec_id: spec.id.clone() }),
        Some(name) => lookup(spec, name),
    }
}

fn lookup(spec: &ApiSpecification, name: &str) -> Result<Arc<VersionEntry>, Denial> {
    spec.version(name).cloned().ok_or_else(|| Denial::VersionDoesNotExist {
        spec_id: spec.id.clone(),
        name: name.to_string(),
    })
}

fn check_conflict(spec: &ApiSpecification) -> Result<(), Denial> {
    match spec.override_conflict() {
        Some(name) => {
            warn!(spec = %spec.id, version = name, "override target set on a versioned specification");
            Err(Denial::ConfigurationConflict {
                spec_id: spec.id.clone(),
                name: name.to_string(),
            })
        }
        None => Ok(()),
    }
}

fn check_expiry(spec: &ApiSpecification, entry: &VersionEntry, now: DateTime<Utc>) -> Result<(), Denial> {
    if check_at(&entry.expiry, now).is_expired() {
        return Err(Denial::VersionExpired {
            spec_id: spec.id.clone(),
            name: entry.name.clone(),
            expires_at: entry.expires_at.clone().unwrap_or_default(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use http::Method;
    use vgate_core::{SpecificationDef, VersionDef};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn spec(def: SpecificationDef) -> Arc<ApiSpecification> {
        Arc::new(ApiSpecification::from_def(&def).unwrap())
    }

    fn get(target: &str) -> InboundRequest {
        InboundRequest::new(Method::GET, target)
    }

    #[test]
    fn url_segment_is_read_below_listen_path() {
        let s = spec(
            SpecificationDef::new("api")
                .versioned_by(VersionLocation::UrlSegment, "")
                .with_version("v1", VersionDef::default())
                .with_version("v2", VersionDef::default()),
        );
        let r = VersionResolver::new().resolve_at(&s, &get("/v2/users"), "/v2/users", now()).unwrap();
        assert_eq!(r.version.name, "v2");
        assert_eq!(r.path, "/v2/users");
        assert!(!r.is_linked());
    }

    #[test]
    fn url_segment_can_be_stripped() {
        let mut def = SpecificationDef::new("api")
            .versioned_by(VersionLocation::UrlSegment, "")
            .with_version("v1", VersionDef::default());
        def.version_segment = 1;
        def.strip_versioning_data = true;
        let s = spec(def);

        let r = VersionResolver::new()
            .resolve_at(&s, &get("/api/v1/users/7"), "/api/v1/users/7", now())
            .unwrap();
        assert_eq!(r.version.name, "v1");
        assert_eq!(r.path, "/api/users/7");
    }

    #[test]
    fn missing_segment_falls_back_to_default() {
        let s = spec(
            SpecificationDef::new("api")
                .versioned_by(VersionLocation::UrlSegment, "")
                .with_default_version("v1")
                .with_version("v1", VersionDef::default()),
        );
        let r = VersionResolver::new().resolve_at(&s, &get("/"), "/", now()).unwrap();
        assert_eq!(r.version.name, "v1");
    }

    #[test]
    fn location_none_always_uses_default() {
        let s = spec(
            SpecificationDef::new("api")
                .versioned_by(VersionLocation::None, "version")
                .with_version("v1", VersionDef::default()),
        );
        let err = VersionResolver::new()
            .resolve_at(&s, &get("/?version=v1"), "/", now())
            .unwrap_err();
        assert_eq!(err, Denial::VersionNotFound { spec_id: "api".into() });
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let s = spec(
            SpecificationDef::new("api")
                .versioned_by(VersionLocation::QueryParam, "version")
                .with_version("v1", VersionDef::default()),
        );
        let err = VersionResolver::new()
            .resolve_at(&s, &get("/?version=V1"), "/", now())
            .unwrap_err();
        assert_eq!(
            err,
            Denial::VersionDoesNotExist { spec_id: "api".into(), name: "V1".into() }
        );
    }

    #[test]
    fn conflict_wins_over_every_other_outcome() {
        let s = spec(
            SpecificationDef::new("api")
                .versioned_by(VersionLocation::Header, "version")
                .with_version("old", VersionDef::expiring("2006-01-02 15:04"))
                .with_version("v1", VersionDef::default().with_override("www.example.com")),
        );
        let conflict = Denial::ConfigurationConflict { spec_id: "api".into(), name: "v1".into() };
        let resolver = VersionResolver::new();

        for version in [Some("old"), Some("v1"), Some("v9"), None] {
            let mut req = get("/");
            if let Some(v) = version {
                req = req.header("version", v).unwrap();
            }
            assert_eq!(resolver.resolve_at(&s, &req, "/", now()).unwrap_err(), conflict, "{version:?}");
        }
    }

    #[test]
    fn expired_entry_is_denied() {
        let s = spec(
            SpecificationDef::new("api")
                .versioned_by(VersionLocation::Header, "version")
                .with_version("old", VersionDef::expiring("2006-01-02 15:04")),
        );
        let req = get("/").header("version", "old").unwrap();
        let err = VersionResolver::new().resolve_at(&s, &req, "/", now()).unwrap_err();
        assert!(matches!(err, Denial::VersionExpired { ref name, .. } if name == "old"));
    }

    #[test]
    fn segment_helpers() {
        assert_eq!(segment("/v1/a", 0), Some("v1"));
        assert_eq!(segment("/v1/a", 1), Some("a"));
        assert_eq!(segment("/v1/a", 2), None);
        assert_eq!(segment("//a", 0), None);
        assert_eq!(strip_segment("/v1/a/b", 0), "/a/b");
        assert_eq!(strip_segment("/v1", 0), "/");
    }
}
