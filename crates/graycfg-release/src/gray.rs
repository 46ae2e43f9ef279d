use std::collections::HashMap;

use graycfg_core::ReleaseId;
use parking_lot::RwLock;

/// Answers whether a client should be served a gray (canary) release.
///
/// Implementations own the rule matching; callers only see the resulting id.
pub trait GrayRuleIndex: Send + Sync {
    fn find_release_id(
        &self,
        client_app_id: &str,
        client_ip: Option<&str>,
        config_app_id: &str,
        cluster_name: &str,
        namespace: &str,
    ) -> Option<ReleaseId>;
}

/// Index that never redirects anyone.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGrayRules;

impl GrayRuleIndex for NoGrayRules {
    fn find_release_id(&self, _: &str, _: Option<&str>, _: &str, _: &str, _: &str) -> Option<ReleaseId> {
        None
    }
}

/// Matches any client ip.
pub const ANY_CLIENT_IP: &str = "*";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RuleKey {
    client_app_id: String,
    config_app_id: String,
    cluster_name: String,
    namespace: String,
}

#[derive(Debug, Clone)]
struct StaticRule {
    client_ips: Vec<String>,
    release_id: ReleaseId,
}

/// Exact-match rule table for wiring a host without a rule engine.
#[derive(Debug, Default)]
pub struct StaticGrayRuleIndex {
    rules: RwLock<HashMap<RuleKey, Vec<StaticRule>>>,
}

impl StaticGrayRuleIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route `client_app_id` (optionally restricted to `client_ips`) to `release_id`.
    ///
    /// An empty ip list or [`ANY_CLIENT_IP`] matches every ip. Earlier rules win.
    pub fn add_rule(
        &self,
        client_app_id: &str,
        client_ips: &[&str],
        config_app_id: &str,
        cluster_name: &str,
        namespace: &str,
        release_id: ReleaseId,
    ) {
        let key = RuleKey {
            client_app_id: client_app_id.to_string(),
            config_app_id: config_app_id.to_string(),
            cluster_name: cluster_name.to_string(),
            namespace: namespace.to_string(),
        };
        self.rules.write().entry(key).or_default().push(StaticRule {
            client_ips: client_ips.iter().map(|ip| ip.to_string()).collect(),
            release_id,
        });
    }
}

impl GrayRuleIndex for StaticGrayRuleIndex {
    fn find_release_id(
        &self,
        client_app_id: &str,
        client_ip: Option<&str>,
        config_app_id: &str,
        cluster_name: &str,
        namespace: &str,
    ) -> Option<ReleaseId> {
        let key = RuleKey {
            client_app_id: client_app_id.to_string(),
            config_app_id: config_app_id.to_string(),
            cluster_name: cluster_name.to_string(),
            namespace: namespace.to_string(),
        };
        let rules = self.rules.read();
        rules.get(&key)?.iter().find_map(|rule| {
            let matches = rule.client_ips.is_empty()
                || rule.client_ips.iter().any(|ip| {
                    ip == ANY_CLIENT_IP || Some(ip.as_str()) == client_ip
                });
            matches.then_some(rule.release_id)
        })
    }
}
