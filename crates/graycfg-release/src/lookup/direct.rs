use std::sync::Arc;

use graycfg_core::{Release, ReleaseId, Result};

use crate::{ReleaseLookup, ReleaseStore};

/// Reads the store on every call; there is nothing to invalidate.
pub struct DirectReleaseLookup {
    store: Arc<dyn ReleaseStore>,
}

impl DirectReleaseLookup {
    pub fn new(store: Arc<dyn ReleaseStore>) -> Self {
        Self { store }
    }
}

impl ReleaseLookup for DirectReleaseLookup {
    fn find_active_one(&self, id: ReleaseId, _notification_id: i64) -> Result<Option<Arc<Release>>> {
        self.store.find_active_one(id)
    }

    fn find_latest_active(
        &self,
        app_id: &str,
        cluster_name: &str,
        namespace: &str,
        _notification_id: i64,
    ) -> Result<Option<Arc<Release>>> {
        self.store.find_latest_active(app_id, cluster_name, namespace)
    }
}
