use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::{resolve_placeholders, ConfigChange, ConfigChangeEvent, Result};

/// Receives change events emitted by live property sources.
pub trait ConfigChangeListener: Send + Sync {
    fn on_change(&self, event: &ConfigChangeEvent);
}

/// One layer of configuration properties.
pub trait PropertySource: Send + Sync {
    fn name(&self) -> &str;

    fn get_property(&self, key: &str) -> Option<String>;

    fn property_names(&self) -> Vec<String>;

    /// Present when this layer can emit change events.
    fn as_live(&self) -> Option<&dyn LivePropertySource> {
        None
    }

    /// Layers composed inside this one, highest priority first.
    fn nested_layers(&self) -> Vec<Arc<dyn PropertySource>> {
        Vec::new()
    }
}

/// A property source whose values may change while the process runs.
pub trait LivePropertySource: PropertySource {
    fn add_change_listener(&self, listener: Arc<dyn ConfigChangeListener>);

    fn listener_count(&self) -> usize;
}

/// Immutable in-memory layer, e.g. defaults or values captured at startup.
#[derive(Debug, Clone, Default)]
pub struct MapPropertySource {
    name: String,
    values: BTreeMap<String, String>,
}

impl MapPropertySource {
    pub fn new<K, V>(name: impl Into<String>, values: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            name: name.into(),
            values: values.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

impl PropertySource for MapPropertySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_property(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn property_names(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }
}

/// Mutable layer backed by one configuration namespace.
///
/// Updates compute the per-key diff against the current values and deliver it
/// synchronously to every registered listener.
pub struct LiveMapPropertySource {
    name: String,
    namespace: String,
    values: RwLock<BTreeMap<String, String>>,
    listeners: RwLock<Vec<Arc<dyn ConfigChangeListener>>>,
}

impl LiveMapPropertySource {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            values: RwLock::new(BTreeMap::new()),
            listeners: RwLock::new(Vec::new()),
        }
    }

    pub fn with_values<K, V>(self, values: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        {
            let mut current = self.values.write();
            for (k, v) in values {
                current.insert(k.into(), v.into());
            }
        }
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) -> ConfigChangeEvent {
        self.apply([(key.into(), Some(value.into()))])
    }

    pub fn remove(&self, key: &str) -> ConfigChangeEvent {
        self.apply([(key.to_string(), None)])
    }

    /// Apply a batch of updates; `None` deletes the key.
    pub fn apply(
        &self,
        updates: impl IntoIterator<Item = (String, Option<String>)>,
    ) -> ConfigChangeEvent {
        let mut event = ConfigChangeEvent::new(self.namespace.clone());
        {
            let mut values = self.values.write();
            for (key, new_value) in updates {
                let old_value = match &new_value {
                    Some(v) => values.insert(key.clone(), v.clone()),
                    None => values.remove(&key),
                };
                if old_value != new_value {
                    event.push(ConfigChange::new(self.namespace.clone(), key, old_value, new_value));
                }
            }
        }
        self.fire(&event);
        event
    }

    /// Replace every value, reporting removed keys as deletions.
    pub fn replace_all(&self, next: BTreeMap<String, String>) -> ConfigChangeEvent {
        let removed: Vec<String> = {
            let values = self.values.read();
            values.keys().filter(|k| !next.contains_key(*k)).cloned().collect()
        };
        let updates = next
            .into_iter()
            .map(|(k, v)| (k, Some(v)))
            .chain(removed.into_iter().map(|k| (k, None)));
        self.apply(updates)
    }

    fn fire(&self, event: &ConfigChangeEvent) {
        if event.is_empty() {
            return;
        }
        // Snapshot so listeners may register further listeners without deadlocking.
        let listeners: Vec<_> = self.listeners.read().iter().cloned().collect();
        if listeners.is_empty() {
            warn!(
                "{} key(s) changed in '{}' with no listener attached",
                event.len(),
                self.name
            );
            return;
        }
        debug!(
            "Dispatching {} change(s) from '{}' to {} listener(s)",
            event.len(),
            self.name,
            listeners.len()
        );
        for listener in listeners {
            listener.on_change(event);
        }
    }
}

impl PropertySource for LiveMapPropertySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_property(&self, key: &str) -> Option<String> {
        self.values.read().get(key).cloned()
    }

    fn property_names(&self) -> Vec<String> {
        self.values.read().keys().cloned().collect()
    }

    fn as_live(&self) -> Option<&dyn LivePropertySource> {
        Some(self)
    }
}

impl LivePropertySource for LiveMapPropertySource {
    fn add_change_listener(&self, listener: Arc<dyn ConfigChangeListener>) {
        self.listeners.write().push(listener);
    }

    fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }
}

/// Ordered stack of property sources; index 0 has the highest priority.
pub struct LayeredPropertySource {
    name: String,
    layers: RwLock<Vec<Arc<dyn PropertySource>>>,
}

impl LayeredPropertySource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            layers: RwLock::new(Vec::new()),
        }
    }

    /// Add a layer that overrides all existing ones.
    pub fn add_first(&self, layer: Arc<dyn PropertySource>) {
        self.layers.write().insert(0, layer);
    }

    /// Add a layer that every existing one overrides.
    pub fn add_last(&self, layer: Arc<dyn PropertySource>) {
        self.layers.write().push(layer);
    }

    pub fn layers(&self) -> Vec<Arc<dyn PropertySource>> {
        self.layers.read().clone()
    }

    /// Every live layer, including those nested in composite layers, in priority order.
    pub fn live_layers(&self) -> Vec<Arc<dyn PropertySource>> {
        let mut live = Vec::new();
        collect_live(&self.layers(), &mut live);
        live
    }

    /// Resolve every placeholder in `expression` against the full hierarchy.
    pub fn resolve(&self, expression: &str) -> Result<String> {
        resolve_placeholders(expression, |key| self.get_property(key))
    }
}

fn collect_live(layers: &[Arc<dyn PropertySource>], out: &mut Vec<Arc<dyn PropertySource>>) {
    for layer in layers {
        if layer.as_live().is_some() {
            out.push(layer.clone());
        }
        collect_live(&layer.nested_layers(), out);
    }
}

impl PropertySource for LayeredPropertySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_property(&self, key: &str) -> Option<String> {
        self.layers.read().iter().find_map(|layer| layer.get_property(key))
    }

    fn property_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .layers
            .read()
            .iter()
            .flat_map(|layer| layer.property_names())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    fn nested_layers(&self) -> Vec<Arc<dyn PropertySource>> {
        self.layers()
    }
}
