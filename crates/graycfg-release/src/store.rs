use std::collections::BTreeMap;
use std::sync::Arc;

use graycfg_core::{GrayCfgError, Release, ReleaseId, Result};
use parking_lot::RwLock;

/// Authoritative release storage.
pub trait ReleaseStore: Send + Sync {
    /// The release with `id`, only if it is still active.
    fn find_active_one(&self, id: ReleaseId) -> Result<Option<Arc<Release>>>;

    /// The most recent active release of one app/cluster/namespace.
    fn find_latest_active(
        &self,
        app_id: &str,
        cluster_name: &str,
        namespace: &str,
    ) -> Result<Option<Arc<Release>>>;
}

/// Process-local store; "latest" means the highest release id.
#[derive(Debug, Default)]
pub struct InMemoryReleaseStore {
    releases: RwLock<BTreeMap<ReleaseId, Arc<Release>>>,
}

impl InMemoryReleaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, release: Release) -> Result<Arc<Release>> {
        let mut releases = self.releases.write();
        if releases.contains_key(&release.id) {
            return Err(GrayCfgError::Storage(format!(
                "release {} already exists",
                release.id
            )));
        }
        let release = Arc::new(release);
        releases.insert(release.id, release.clone());
        Ok(release)
    }

    /// Mark a release abandoned; returns whether it existed.
    pub fn abandon(&self, id: ReleaseId) -> bool {
        let mut releases = self.releases.write();
        match releases.get(&id) {
            Some(release) => {
                let abandoned = Release::clone(release).abandoned();
                releases.insert(id, Arc::new(abandoned));
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.releases.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.releases.read().is_empty()
    }
}

impl ReleaseStore for InMemoryReleaseStore {
    fn find_active_one(&self, id: ReleaseId) -> Result<Option<Arc<Release>>> {
        Ok(self
            .releases
            .read()
            .get(&id)
            .filter(|r| r.is_active())
            .cloned())
    }

    fn find_latest_active(
        &self,
        app_id: &str,
        cluster_name: &str,
        namespace: &str,
    ) -> Result<Option<Arc<Release>>> {
        Ok(self
            .releases
            .read()
            .values()
            .rev()
            .find(|r| {
                r.is_active()
                    && r.app_id == app_id
                    && r.cluster_name == cluster_name
                    && r.namespace == namespace
            })
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_active_skips_abandoned() {
        let store = InMemoryReleaseStore::new();
        store.publish(Release::new(1, "app", "default", "application")).unwrap();
        store.publish(Release::new(2, "app", "default", "application")).unwrap();
        store.publish(Release::new(3, "app", "sh", "application")).unwrap();

        let latest = store.find_latest_active("app", "default", "application").unwrap();
        assert_eq!(latest.map(|r| r.id), Some(2));

        assert!(store.abandon(2));
        let latest = store.find_latest_active("app", "default", "application").unwrap();
        assert_eq!(latest.map(|r| r.id), Some(1));
        assert!(store.find_active_one(2).unwrap().is_none());
        assert!(!store.abandon(99));
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let store = InMemoryReleaseStore::new();
        store.publish(Release::new(1, "app", "default", "application")).unwrap();
        assert!(store.publish(Release::new(1, "app", "default", "application")).is_err());
        assert_eq!(store.len(), 1);
    }
}
