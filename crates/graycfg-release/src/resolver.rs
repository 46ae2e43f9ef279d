use std::sync::Arc;

use graycfg_core::{Release, ReleaseContext, ReleaseId, ReleaseMessage, Result, DEFAULT_CLUSTER_NAME};
use tracing::debug;

use crate::GrayRuleIndex;

/// The two primitives a resolution strategy has to provide.
///
/// `notification_id` is the id the client last saw; strategies are free to
/// ignore it.
pub trait ReleaseLookup: Send + Sync {
    /// The release with `id` if it exists and is active.
    fn find_active_one(&self, id: ReleaseId, notification_id: i64) -> Result<Option<Arc<Release>>>;

    /// The latest active release of one app/cluster/namespace.
    fn find_latest_active(
        &self,
        app_id: &str,
        cluster_name: &str,
        namespace: &str,
        notification_id: i64,
    ) -> Result<Option<Arc<Release>>>;

    /// Called for every release message; strategies without state ignore it.
    fn handle_message(&self, _message: &ReleaseMessage) {}
}

/// Clusters to try for `ctx`, in order.
///
/// The explicit cluster is skipped when it is the default one, and the data
/// center is skipped when empty or equal to the explicit cluster, so no
/// cluster is ever looked up twice.
pub fn resolution_tiers(ctx: &ReleaseContext) -> Vec<&str> {
    let mut tiers = Vec::with_capacity(3);
    if ctx.cluster_name != DEFAULT_CLUSTER_NAME {
        tiers.push(ctx.cluster_name.as_str());
    }
    if let Some(data_center) = ctx.data_center_tier() {
        tiers.push(data_center);
    }
    tiers.push(DEFAULT_CLUSTER_NAME);
    tiers
}

/// Pick the release that serves `ctx`.
///
/// `Ok(None)` means no tier has a release, which is a normal outcome.
pub fn resolve(
    lookup: &dyn ReleaseLookup,
    gray_rules: &dyn GrayRuleIndex,
    ctx: &ReleaseContext,
) -> Result<Option<Arc<Release>>> {
    for cluster in resolution_tiers(ctx) {
        if let Some(release) = find_release(lookup, gray_rules, ctx, cluster)? {
            debug!(
                "Resolved {} for client {} via cluster '{}'",
                release, ctx.client_app_id, cluster
            );
            return Ok(Some(release));
        }
    }
    debug!(
        "No release for {}/{}/{} (client {})",
        ctx.config_app_id, ctx.cluster_name, ctx.namespace, ctx.client_app_id
    );
    Ok(None)
}

fn find_release(
    lookup: &dyn ReleaseLookup,
    gray_rules: &dyn GrayRuleIndex,
    ctx: &ReleaseContext,
    cluster: &str,
) -> Result<Option<Arc<Release>>> {
    let gray_release_id = gray_rules.find_release_id(
        &ctx.client_app_id,
        ctx.client_ip.as_deref(),
        &ctx.config_app_id,
        cluster,
        &ctx.namespace,
    );

    if let Some(id) = gray_release_id {
        match lookup.find_active_one(id, ctx.notification_id)? {
            Some(release) => return Ok(Some(release)),
            None => debug!(
                "Gray release {} for client {} is not active, using latest of cluster '{}'",
                id, ctx.client_app_id, cluster
            ),
        }
    }

    lookup.find_latest_active(&ctx.config_app_id, cluster, &ctx.namespace, ctx.notification_id)
}
