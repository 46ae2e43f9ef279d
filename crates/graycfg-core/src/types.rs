use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub type ReleaseId = i64;

/// Cluster every app owns implicitly; the last fallback tier.
pub const DEFAULT_CLUSTER_NAME: &str = "default";

/// Notification id carried by clients that have not received any notification yet.
pub const NO_NOTIFICATION_ID: i64 = -1;

/// Separator used to join app, cluster and namespace into a watch key.
pub const WATCH_KEY_SEPARATOR: char = '+';

/// Build the watch key release messages are published under.
pub fn watch_key(app_id: &str, cluster_name: &str, namespace: &str) -> String {
    format!(
        "{app_id}{sep}{cluster_name}{sep}{namespace}",
        sep = WATCH_KEY_SEPARATOR
    )
}

/// Everything known about a single config request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseContext {
    pub client_app_id: String,
    pub client_ip: Option<String>,
    pub config_app_id: String,
    pub cluster_name: String,
    pub namespace: String,
    /// Data center the client runs in, empty when unknown
    #[serde(default)]
    pub data_center: Option<String>,
    #[serde(default = "ReleaseContext::default_notification_id")]
    pub notification_id: i64,
}

impl ReleaseContext {
    pub fn new(
        client_app_id: impl Into<String>,
        config_app_id: impl Into<String>,
        cluster_name: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            client_app_id: client_app_id.into(),
            client_ip: None,
            config_app_id: config_app_id.into(),
            cluster_name: cluster_name.into(),
            namespace: namespace.into(),
            data_center: None,
            notification_id: NO_NOTIFICATION_ID,
        }
    }

    pub fn with_client_ip(mut self, ip: impl Into<String>) -> Self {
        self.client_ip = Some(ip.into());
        self
    }

    pub fn with_data_center(mut self, data_center: impl Into<String>) -> Self {
        self.data_center = Some(data_center.into());
        self
    }

    pub fn with_notification_id(mut self, notification_id: i64) -> Self {
        self.notification_id = notification_id;
        self
    }

    /// Data center to try as a separate tier, if any.
    ///
    /// Empty values and values equal to the requested cluster yield `None`,
    /// the latter because that tier was already attempted.
    pub fn data_center_tier(&self) -> Option<&str> {
        self.data_center
            .as_deref()
            .filter(|dc| !dc.is_empty() && *dc != self.cluster_name)
    }

    fn default_notification_id() -> i64 {
        NO_NOTIFICATION_ID
    }
}

/// An immutable bundle of configuration published for one app/cluster/namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub id: ReleaseId,
    pub release_key: String,
    pub name: String,
    pub app_id: String,
    pub cluster_name: String,
    pub namespace: String,
    pub configurations: BTreeMap<String, String>,
    #[serde(default)]
    pub is_abandoned: bool,
}

impl Release {
    pub fn new(
        id: ReleaseId,
        app_id: impl Into<String>,
        cluster_name: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        let app_id = app_id.into();
        let cluster_name = cluster_name.into();
        let namespace = namespace.into();
        Self {
            id,
            release_key: format!("{id}-{}", watch_key(&app_id, &cluster_name, &namespace)),
            name: format!("release-{id}"),
            app_id,
            cluster_name,
            namespace,
            configurations: BTreeMap::new(),
            is_abandoned: false,
        }
    }

    pub fn with_configuration(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.configurations.insert(key.into(), value.into());
        self
    }

    /// Parse configurations from the JSON object form releases are stored in.
    pub fn with_configurations_json(mut self, json: &str) -> crate::Result<Self> {
        self.configurations = serde_json::from_str(json)?;
        Ok(self)
    }

    pub fn abandoned(mut self) -> Self {
        self.is_abandoned = true;
        self
    }

    pub fn is_active(&self) -> bool {
        !self.is_abandoned
    }

    pub fn watch_key(&self) -> String {
        watch_key(&self.app_id, &self.cluster_name, &self.namespace)
    }
}

impl fmt::Display for Release {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Release#{}({})", self.id, self.watch_key())
    }
}

/// A release-propagation message: `message` names the watch key that changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseMessage {
    pub id: i64,
    pub message: String,
}

impl ReleaseMessage {
    pub fn new(id: i64, message: impl Into<String>) -> Self {
        Self {
            id,
            message: message.into(),
        }
    }

    pub fn for_release(id: i64, release: &Release) -> Self {
        Self::new(id, release.watch_key())
    }
}
