//! Immutable configuration snapshots and the holder requests read them from.

use crate::core::grants::GrantStore;
use crate::core::router::{SpecMatch, SpecRouter};
use crate::core::spec::ApiSpecification;
use crate::models::SpecificationDef;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;
use vgate_errors::LoadError;

/// Below this many specifications normalization stays sequential.
const PARALLEL_THRESHOLD: usize = 50;

#[derive(Debug)]
pub struct Snapshot {
    pub id: Uuid,
    pub built_at: DateTime<Utc>,
    specs: HashMap<String, Arc<ApiSpecification>>,
    router: SpecRouter,
    /// Caller grants loaded with these specifications; swapped together.
    grants: GrantStore,
}

impl Snapshot {
    /// Normalize `defs`, resolve cross-specification links and mount every
    /// specification on its listen path.
    pub fn build(defs: &[SpecificationDef]) -> Result<Self, LoadError> {
        let mut seen = HashSet::with_capacity(defs.len());
        for d in defs {
            if !seen.insert(d.id.trim()) {
                return Err(LoadError::DuplicateSpecification(d.id.trim().to_string()));
            }
        }

        let normalized: Vec<ApiSpecification> = if defs.len() <= PARALLEL_THRESHOLD {
            defs.iter().map(ApiSpecification::from_def).collect::<Result<_, _>>()?
        } else {
            defs.par_iter().map(ApiSpecification::from_def).collect::<Result<_, _>>()?
        };

        let plain: HashMap<String, Arc<ApiSpecification>> = normalized
            .into_iter()
            .map(|s| (s.id.clone(), Arc::new(s)))
            .collect();

        validate_links(&plain)?;

        // Targets never link further, so their first-pass handle is final.
        let specs: HashMap<String, Arc<ApiSpecification>> = plain
            .iter()
            .map(|(id, s)| {
                let spec = if s.links().next().is_some() {
                    Arc::new(s.with_links(&plain))
                } else {
                    s.clone()
                };
                (id.clone(), spec)
            })
            .collect();

        // Mount in id order so a listen path conflict always names the same pair.
        let mut ids: Vec<&String> = specs.keys().collect();
        ids.sort();
        let mut router = SpecRouter::new();
        for id in ids {
            router.add_spec(specs[id].clone())?;
        }

        let snapshot = Self {
            id: Uuid::new_v4(),
            built_at: Utc::now(),
            specs,
            router,
            grants: GrantStore::new(),
        };
        info!(snapshot = %snapshot.id, specifications = snapshot.len(), "snapshot built");
        Ok(snapshot)
    }

    /// Attach the caller grants that belong to this configuration generation.
    pub fn with_grants(mut self, grants: GrantStore) -> Self {
        self.grants = grants;
        self
    }

    pub fn grants(&self) -> &GrantStore {
        &self.grants
    }

    pub fn specification(&self, id: &str) -> Option<&Arc<ApiSpecification>> {
        self.specs.get(id)
    }

    pub fn specifications(&self) -> impl Iterator<Item = &Arc<ApiSpecification>> {
        self.specs.values()
    }

    pub fn find_spec(&self, path: &str) -> Option<SpecMatch> {
        self.router.find_spec(path)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

fn validate_links(specs: &HashMap<String, Arc<ApiSpecification>>) -> Result<(), LoadError> {
    let mut owners: Vec<&Arc<ApiSpecification>> = specs.values().collect();
    owners.sort_by(|a, b| a.id.cmp(&b.id));

    for spec in owners {
        let mut entries: Vec<_> = spec.versions.values().collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        for v in entries {
            let Some(target) = v.linked_specification_id.as_deref() else {
                continue;
            };
            if target == spec.id {
                return Err(LoadError::SelfLink {
                    spec_id: spec.id.clone(),
                    version: v.name.clone(),
                });
            }
            let Some(linked) = specs.get(target) else {
                return Err(LoadError::UnknownLinkedSpecification {
                    spec_id: spec.id.clone(),
                    version: v.name.clone(),
                    target: target.to_string(),
                });
            };
            if linked.links().next().is_some() {
                return Err(LoadError::ChainedLink {
                    spec_id: spec.id.clone(),
                    version: v.name.clone(),
                    target: target.to_string(),
                });
            }
            debug!(spec = %spec.id, version = %v.name, target, "version link resolved");
        }
    }
    Ok(())
}

/// Holds the current snapshot. Readers take an `Arc` and keep it for the whole
/// request; a swap never disturbs them.
#[derive(Debug)]
pub struct SnapshotStore {
    current: RwLock<Arc<Snapshot>>,
}

impl SnapshotStore {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    pub fn load(&self) -> Arc<Snapshot> {
        self.current.read().clone()
    }

    /// Replace the snapshot wholesale and hand back the previous one.
    pub fn swap(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let next = Arc::new(snapshot);
        let prev = std::mem::replace(&mut *self.current.write(), next.clone());
        info!(from = %prev.id, to = %next.id, "snapshot swapped");
        prev
    }
}
