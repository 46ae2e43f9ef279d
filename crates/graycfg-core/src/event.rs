use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyChangeType {
    Added,
    Modified,
    Deleted,
}

/// A single key change as observed by the layer that delivered it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigChange {
    pub namespace: String,
    pub key: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub change_type: PropertyChangeType,
}

impl ConfigChange {
    pub fn new(
        namespace: impl Into<String>,
        key: impl Into<String>,
        old_value: Option<String>,
        new_value: Option<String>,
    ) -> Self {
        let change_type = match (&old_value, &new_value) {
            (None, _) => PropertyChangeType::Added,
            (Some(_), None) => PropertyChangeType::Deleted,
            (Some(_), Some(_)) => PropertyChangeType::Modified,
        };
        Self {
            namespace: namespace.into(),
            key: key.into(),
            old_value,
            new_value,
            change_type,
        }
    }
}

/// Notification of configuration keys whose value changed in one namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigChangeEvent {
    pub namespace: String,
    changes: BTreeMap<String, ConfigChange>,
}

impl ConfigChangeEvent {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            changes: BTreeMap::new(),
        }
    }

    pub fn with_change(mut self, change: ConfigChange) -> Self {
        self.push(change);
        self
    }

    pub fn push(&mut self, change: ConfigChange) {
        self.changes.insert(change.key.clone(), change);
    }

    pub fn changed_keys(&self) -> impl Iterator<Item = &str> {
        self.changes.keys().map(String::as_str)
    }

    pub fn change(&self, key: &str) -> Option<&ConfigChange> {
        self.changes.get(key)
    }

    /// New value reported for `key`, `None` when deleted or not part of the event.
    pub fn new_value(&self, key: &str) -> Option<&str> {
        self.changes.get(key).and_then(|c| c.new_value.as_deref())
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }
}
