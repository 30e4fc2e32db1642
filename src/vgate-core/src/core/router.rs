use crate::core::spec::ApiSpecification;
use matchit::Router;
use std::sync::Arc;
use vgate_errors::LoadError;

const REST: &str = "rest";

/// Mounts specifications on their listen paths.
///
/// Every listen path is inserted twice: the bare path, and the path followed
/// by a catch-all, so `/default` and `/default/anything` both land on the same
/// specification.
#[derive(Clone, Default)]
pub struct SpecRouter {
    specs: Router<Arc<ApiSpecification>>,
    mounted: usize,
}

impl std::fmt::Debug for SpecRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpecRouter").field("mounted", &self.mounted).finish()
    }
}

/// A specification matched for a request, with the path below its listen path.
#[derive(Debug, Clone)]
pub struct SpecMatch {
    pub spec: Arc<ApiSpecification>,
    /// Always starts with `/`.
    pub sub_path: String,
}

impl SpecRouter {
    pub fn new() -> Self {
        Self {
            specs: Router::new(),
            mounted: 0,
        }
    }

    pub fn add_spec(&mut self, spec: Arc<ApiSpecification>) -> Result<(), LoadError> {
        let base = spec.listen_path.trim_end_matches('/');
        let exact = if base.is_empty() { "/".to_string() } else { base.to_string() };
        let rest = format!("{}/{{*{}}}", base, REST);

        for path in [exact, rest] {
            self.specs
                .insert(path.as_str(), spec.clone())
                .map_err(|e| LoadError::ListenPathConflict {
                    spec_id: spec.id.clone(),
                    listen_path: spec.listen_path.clone(),
                    reason: e.to_string(),
                })?;
        }
        self.mounted += 1;
        Ok(())
    }

    pub fn find_spec(&self, path: &str) -> Option<SpecMatch> {
        let path = if path.is_empty() { "/" } else { path };
        let found = self.specs.at(path).ok().or_else(|| {
            // `/default/` has an empty catch-all; retry without the slash.
            let trimmed = path.trim_end_matches('/');
            if trimmed.len() < path.len() {
                self.specs.at(if trimmed.is_empty() { "/" } else { trimmed }).ok()
            } else {
                None
            }
        })?;

        let sub_path = match found.params.get(REST) {
            Some(rest) => format!("/{rest}"),
            None => "/".to_string(),
        };

        Some(SpecMatch {
            spec: found.value.clone(),
            sub_path,
        })
    }

    pub fn len(&self) -> usize {
        self.mounted
    }

    pub fn is_empty(&self) -> bool {
        self.mounted == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SpecificationDef;

    fn spec(id: &str, listen: &str) -> Arc<ApiSpecification> {
        Arc::new(ApiSpecification::from_def(&SpecificationDef::new(id).with_listen_path(listen)).unwrap())
    }

    #[test]
    fn matches_listen_path_and_sub_paths() {
        let mut r = SpecRouter::new();
        r.add_spec(spec("base", "/default")).unwrap();
        r.add_spec(spec("versioned", "/new")).unwrap();

        let m = r.find_spec("/default").unwrap();
        assert_eq!(m.spec.id, "base");
        assert_eq!(m.sub_path, "/");

        let m = r.find_spec("/default/users/1").unwrap();
        assert_eq!(m.spec.id, "base");
        assert_eq!(m.sub_path, "/users/1");

        let m = r.find_spec("/new/").unwrap();
        assert_eq!(m.spec.id, "versioned");
        assert_eq!(m.sub_path, "/");

        assert!(r.find_spec("/other").is_none());
        assert!(r.find_spec("/defaults").is_none());
    }

    #[test]
    fn root_listen_path_keeps_full_path() {
        let mut r = SpecRouter::new();
        r.add_spec(spec("test", "/")).unwrap();

        assert_eq!(r.find_spec("/").unwrap().sub_path, "/");
        assert_eq!(r.find_spec("/mock").unwrap().sub_path, "/mock");
        assert_eq!(r.find_spec("/a/extra").unwrap().sub_path, "/a/extra");
    }

    #[test]
    fn same_listen_path_twice_conflicts() {
        let mut r = SpecRouter::new();
        r.add_spec(spec("one", "/api")).unwrap();
        let err = r.add_spec(spec("two", "/api")).unwrap_err();
        assert!(matches!(err, LoadError::ListenPathConflict { .. }));
        assert_eq!(r.len(), 1);
    }
}
