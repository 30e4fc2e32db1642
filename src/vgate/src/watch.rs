use crate::load_state;
use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::signal;
use tracing::{error, info};
use vgate_config::FileConfig;
use vgate_core::SnapshotStore;

/// Modification times of the watched data files.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct Stamps(Vec<Option<SystemTime>>);

impl Stamps {
    pub(crate) fn read(paths: &[PathBuf]) -> Self {
        Stamps(paths.iter().map(|p| modified(p)).collect())
    }
}

fn modified(p: &Path) -> Option<SystemTime> {
    if p.as_os_str().is_empty() {
        return None;
    }
    fs::metadata(p).and_then(|m| m.modified()).ok()
}

pub async fn run(cfg: &FileConfig) -> Result<()> {
    let store = SnapshotStore::new(load_state(cfg)?);
    let snapshot = store.load();
    info!(specifications = snapshot.len(), callers = snapshot.grants().len(), "watching configuration");

    let paths = vec![cfg.files.specifications.clone(), cfg.files.grants.clone()];
    let mut seen = Stamps::read(&paths);
    let mut ticker = tokio::time::interval(Duration::from_secs(cfg.reload.poll_interval_sec.max(1)));

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let now = Stamps::read(&paths);
                if now == seen {
                    continue;
                }
                seen = now;
                reload(cfg, &store);
            }
            _ = signal::ctrl_c() => {
                info!("Shutting down");
                return Ok(());
            }
        }
    }
}

/// Rebuild specifications and grants as one snapshot; on failure the current
/// snapshot keeps serving.
fn reload(cfg: &FileConfig, store: &SnapshotStore) {
    match load_state(cfg) {
        Ok(snapshot) => {
            let prev = store.swap(snapshot);
            info!(previous = %prev.id, current = %store.load().id, "configuration reloaded");
        }
        Err(e) => error!(error = %format!("{e:#}"), "reload failed, keeping current configuration"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn stamps_change_when_a_file_is_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("specs.yaml");
        fs::write(&p, "specifications: []\n").unwrap();
        let paths = vec![p.clone(), PathBuf::new()];

        let first = Stamps::read(&paths);
        assert_eq!(first, Stamps::read(&paths));
        assert!(first.0[0].is_some());
        assert!(first.0[1].is_none());

        let mut f = fs::OpenOptions::new().append(true).open(&p).unwrap();
        f.write_all(b"# touched\n").unwrap();
        f.set_modified(SystemTime::now() + Duration::from_secs(60)).unwrap();
        drop(f);
        assert_ne!(first, Stamps::read(&paths));
    }
}
