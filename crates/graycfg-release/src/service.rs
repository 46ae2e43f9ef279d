use std::sync::Arc;

use graycfg_core::{Release, ReleaseCacheConfig, ReleaseContext, ReleaseMessage, Result};
use tracing::{debug, info};

use crate::{resolve, CachedReleaseLookup, DirectReleaseLookup, GrayRuleIndex, ReleaseLookup, ReleaseStore};

/// Channel release messages are published on.
pub const RELEASE_MESSAGE_CHANNEL: &str = "graycfg-release";

/// Entry point for the serving layer: resolves requests and consumes release messages.
pub struct ConfigService {
    lookup: Arc<dyn ReleaseLookup>,
    gray_rules: Arc<dyn GrayRuleIndex>,
}

impl ConfigService {
    pub fn new(lookup: Arc<dyn ReleaseLookup>, gray_rules: Arc<dyn GrayRuleIndex>) -> Self {
        Self { lookup, gray_rules }
    }

    /// Pick the cached or direct strategy from settings.
    pub fn from_settings(
        store: Arc<dyn ReleaseStore>,
        gray_rules: Arc<dyn GrayRuleIndex>,
        cache: &ReleaseCacheConfig,
    ) -> Self {
        let lookup: Arc<dyn ReleaseLookup> = if cache.enabled {
            info!(
                "Release cache enabled (max {} watch keys, {} releases by id)",
                cache.max_watch_keys, cache.max_releases_by_id
            );
            Arc::new(CachedReleaseLookup::new(
                store,
                cache.max_watch_keys,
                cache.max_releases_by_id,
            ))
        } else {
            info!("Release cache disabled, reading the store directly");
            Arc::new(DirectReleaseLookup::new(store))
        };
        Self::new(lookup, gray_rules)
    }

    /// Resolve the release serving `ctx`; `Ok(None)` when nothing is published.
    pub fn load_config(&self, ctx: &ReleaseContext) -> Result<Option<Arc<Release>>> {
        resolve(self.lookup.as_ref(), self.gray_rules.as_ref(), ctx)
    }

    pub fn handle_message(&self, message: &ReleaseMessage, channel: &str) {
        if channel != RELEASE_MESSAGE_CHANNEL {
            debug!("Ignoring message {} from channel '{}'", message.id, channel);
            return;
        }
        self.lookup.handle_message(message);
    }
}
