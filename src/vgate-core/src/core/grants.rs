use crate::core::spec::CallerGrant;
use crate::models::{Consumer, ConsumersTemplate};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Identity collaborator: grants of an already-authenticated caller.
pub trait GrantLookup: Send + Sync {
    /// The caller's grant for `spec_id`, if any. `None` authorizes nothing.
    fn grant(&self, caller_token: &str, spec_id: &str) -> Option<Arc<CallerGrant>>;
}

#[derive(Debug, Default)]
pub struct Session {
    pub consumer_id: String,
    pub grants: HashMap<String, Arc<CallerGrant>>,
}

impl From<&Consumer> for Session {
    fn from(c: &Consumer) -> Self {
        let grants = c
            .access_rights
            .iter()
            .map(|(spec_id, right)| {
                let grant = CallerGrant {
                    spec_id: spec_id.clone(),
                    allowed_version_names: right.versions.iter().cloned().collect(),
                };
                (spec_id.clone(), Arc::new(grant))
            })
            .collect();
        Self {
            consumer_id: c.id.clone(),
            grants,
        }
    }
}

/// In-memory sessions keyed by caller token.
#[derive(Debug, Default)]
pub struct GrantStore {
    sessions: DashMap<String, Arc<Session>>,
}

impl GrantStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store holding exactly the consumers of `t`. Reloads build a
    /// fresh store and swap it in with the snapshot.
    pub fn from_template(t: &ConsumersTemplate) -> Self {
        let store = Self::new();
        for c in &t.consumers {
            store.upsert(c);
        }
        info!(sessions = store.len(), "grant store loaded");
        store
    }

    /// Register every key of `consumer`, replacing earlier sessions for them.
    pub fn upsert(&self, consumer: &Consumer) {
        let session = Arc::new(Session::from(consumer));
        for key in consumer.keys.iter().filter(|k| !k.is_empty()) {
            self.sessions.insert(key.clone(), session.clone());
        }
        debug!(consumer = %consumer.id, keys = consumer.keys.len(), "session registered");
    }

    pub fn revoke(&self, key: &str) -> bool {
        self.sessions.remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl GrantLookup for GrantStore {
    fn grant(&self, caller_token: &str, spec_id: &str) -> Option<Arc<CallerGrant>> {
        self.sessions
            .get(caller_token)
            .and_then(|s| s.grants.get(spec_id).cloned())
    }
}

impl<T: GrantLookup + ?Sized> GrantLookup for Arc<T> {
    fn grant(&self, caller_token: &str, spec_id: &str) -> Option<Arc<CallerGrant>> {
        (**self).grant(caller_token, spec_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> GrantStore {
        GrantStore::from_template(&ConsumersTemplate {
            consumers: vec![
                Consumer::new("wrong", "key-wrong").grant("test", ["v3"]),
                Consumer::new("known", "key-known").grant("test", ["v1", "v2", "expired"]),
                Consumer::new("nothing", "key-empty").grant("test", Vec::<String>::new()),
            ],
        })
    }

    #[test]
    fn looks_up_grant_per_spec() {
        let s = store();
        let g = s.grant("key-known", "test").unwrap();
        assert!(g.allows("v1"));
        assert!(g.allows("expired"));
        assert!(!g.allows("v3"));
        assert!(s.grant("key-known", "other").is_none());
        assert!(s.grant("missing", "test").is_none());
    }

    #[test]
    fn empty_grant_allows_nothing() {
        let s = store();
        let g = s.grant("key-empty", "test").unwrap();
        assert!(!g.allows("v1"));
        assert!(!g.allows(""));
    }

    #[test]
    fn revoke_drops_one_token() {
        let s = store();
        assert_eq!(s.len(), 3);
        assert!(s.revoke("key-wrong"));
        assert!(s.grant("key-wrong", "test").is_none());
        assert!(s.grant("key-known", "test").is_some());
        assert!(GrantStore::from_template(&ConsumersTemplate::default()).is_empty());
    }
}
