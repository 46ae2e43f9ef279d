use std::collections::BTreeMap;
use std::sync::Arc;

use graycfg_core::{BindingConfig, LayeredPropertySource};
use tracing::{debug, warn};

use crate::{Bindable, BindingRegistry, ChangePropagator};

/// A property value recorded on an object definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefinitionValue {
    /// Text that may contain placeholders
    Literal(String),
    /// Reference to another object; never bound
    Reference(String),
}

/// Object definitions known before any object is built, keyed by owner name.
#[derive(Debug, Clone, Default)]
pub struct DefinitionRegistry {
    definitions: BTreeMap<String, Vec<(String, DefinitionValue)>>,
}

impl DefinitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, owner: impl Into<String>, property: impl Into<String>, value: DefinitionValue) {
        self.definitions
            .entry(owner.into())
            .or_default()
            .push((property.into(), value));
    }

    pub fn literal(mut self, owner: &str, property: &str, text: &str) -> Self {
        self.add(owner, property, DefinitionValue::Literal(text.to_string()));
        self
    }

    pub fn reference(mut self, owner: &str, property: &str, target: &str) -> Self {
        self.add(owner, property, DefinitionValue::Reference(target.to_string()));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[(String, DefinitionValue)])> {
        self.definitions
            .iter()
            .map(|(owner, properties)| (owner.as_str(), properties.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

/// Host lifecycle hooks that feed the binding registry.
///
/// When `auto_update_injected_properties` is off both hooks do nothing and no
/// listener is ever attached.
pub struct BindingProcessor {
    registry: Arc<BindingRegistry>,
    propagator: Arc<ChangePropagator>,
    enabled: bool,
}

impl BindingProcessor {
    pub fn new(environment: Arc<LayeredPropertySource>, config: &BindingConfig) -> Self {
        let registry = Arc::new(BindingRegistry::new());
        let propagator = ChangePropagator::new(registry.clone(), environment);
        Self {
            registry,
            propagator,
            enabled: config.auto_update_injected_properties,
        }
    }

    pub fn registry(&self) -> &Arc<BindingRegistry> {
        &self.registry
    }

    pub fn propagator(&self) -> &Arc<ChangePropagator> {
        &self.propagator
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Record every literal definition property that references a key.
    ///
    /// Returns the number of pending declarations recorded.
    pub fn post_process_definitions(&self, definitions: &DefinitionRegistry) -> usize {
        if !self.enabled {
            return 0;
        }
        let mut recorded = 0;
        for (owner, properties) in definitions.iter() {
            for (property, value) in properties {
                if let DefinitionValue::Literal(text) = value {
                    recorded += self.registry.declare_pending(owner, property, text);
                }
            }
        }
        debug!("Recorded {} pending declaration(s) from {} definition(s)", recorded, definitions.len());
        recorded
    }

    /// Bind the declarations of a freshly built `object` named `owner`.
    ///
    /// Returns the number of bindings added for it.
    pub fn before_initialization(&self, object: Arc<dyn Bindable>, owner: &str) -> usize {
        if !self.enabled {
            return 0;
        }
        self.propagator.ensure_listening();

        let mut added = 0;
        for field in object.fields() {
            if let Some(expression) = &field.expression {
                added += self.registry.bind_field(&object, &field, expression);
            }
        }
        for setter in object.setters() {
            let Some(expression) = &setter.expression else {
                continue;
            };
            match self.registry.bind_setter(&object, &setter, expression) {
                Ok(count) => added += count,
                Err(e) => warn!("Not monitoring {} of {}: {}", setter.name, owner, e),
            }
        }
        added += self.registry.materialize(&object, owner);
        added
    }
}
