use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use graycfg_core::{extract_keys, LayeredPropertySource};
use tracing::{debug, error};

use crate::{convert, Bindable, BindingError, BindingTarget, FieldDescriptor, Result, SetterDescriptor, TypedValue};

/// A property declaration recorded before its owner exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingBinding {
    pub owner: String,
    pub property: String,
    pub expression: String,
    pub key: String,
}

/// Association between one configuration key and one live location.
///
/// `expression` is the full declaration, which may reference other keys too.
#[derive(Clone)]
pub struct Binding {
    pub key: String,
    pub expression: String,
    pub target: BindingTarget,
}

impl Binding {
    /// Re-resolve the whole expression, convert it and write it to the target.
    pub fn update(&self, environment: &LayeredPropertySource) -> Result<TypedValue> {
        let text = environment.resolve(&self.expression)?;
        let value = convert(&text, self.target.kind())?;
        self.target.apply(value.clone())?;
        Ok(value)
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "key: {}, expression: {}, target: {}", self.key, self.expression, self.target)
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Append-only index from configuration key to bound locations.
///
/// Both multimaps are sharded so concurrent object construction only
/// contends on the keys it touches. Bindings hold their objects for the
/// life of the registry; objects that should be dropped earlier must not be
/// bound.
#[derive(Default)]
pub struct BindingRegistry {
    bindings: DashMap<String, Vec<Binding>>,
    pending: DashMap<String, Vec<PendingBinding>>,
}

impl BindingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `property` of the not-yet-built `owner`; one declaration per key.
    ///
    /// Returns the number of keys recorded, zero for expressions without keys.
    pub fn declare_pending(&self, owner: &str, property: &str, expression: &str) -> usize {
        let keys = extract_keys(expression);
        if keys.is_empty() {
            return 0;
        }
        let count = keys.len();
        let mut pending = self.pending.entry(owner.to_string()).or_default();
        for key in keys {
            pending.push(PendingBinding {
                owner: owner.to_string(),
                property: property.to_string(),
                expression: expression.to_string(),
                key,
            });
        }
        count
    }

    /// Bind a field declaration of `object`; returns the number of bindings added.
    pub fn bind_field(&self, object: &Arc<dyn Bindable>, field: &FieldDescriptor, expression: &str) -> usize {
        let keys = extract_keys(expression);
        for key in &keys {
            self.register(key, expression, BindingTarget::field(object.clone(), field));
        }
        keys.len()
    }

    /// Bind a setter declaration of `object`.
    ///
    /// Factory methods are skipped; setters without exactly one parameter are
    /// rejected and nothing is registered for them.
    pub fn bind_setter(&self, object: &Arc<dyn Bindable>, setter: &SetterDescriptor, expression: &str) -> Result<usize> {
        if setter.factory {
            debug!("Skipping factory method {}.{}", object.type_name(), setter.name);
            return Ok(0);
        }
        let Some(kind) = setter.single_param() else {
            error!(
                "Ignore value setter {}.{}, expecting 1 parameter, actual {} parameters",
                object.type_name(),
                setter.name,
                setter.params.len()
            );
            return Err(BindingError::SetterArity {
                owner: object.type_name().to_string(),
                setter: setter.name.clone(),
                found: setter.params.len(),
            });
        };

        let keys = extract_keys(expression);
        for key in &keys {
            self.register(key, expression, BindingTarget::setter(object.clone(), setter, kind));
        }
        Ok(keys.len())
    }

    /// Turn every pending declaration of `owner` into a binding on `object`.
    ///
    /// Declarations whose property has no write accessor are skipped. The
    /// owner's pending set is drained either way, so a second call is a no-op.
    pub fn materialize(&self, object: &Arc<dyn Bindable>, owner: &str) -> usize {
        let Some((_, pending)) = self.pending.remove(owner) else {
            return 0;
        };

        let mut created = 0;
        for declaration in pending {
            let Some(setter) = object.write_accessor(&declaration.property) else {
                debug!(
                    "{} ({}) has no write accessor for '{}', not monitoring {}",
                    owner,
                    object.type_name(),
                    declaration.property,
                    declaration.key
                );
                continue;
            };
            let Some(kind) = setter.single_param() else {
                debug!(
                    "Write accessor {}.{} does not take exactly one parameter, not monitoring {}",
                    object.type_name(),
                    setter.name,
                    declaration.key
                );
                continue;
            };
            self.register(
                &declaration.key,
                &declaration.expression,
                BindingTarget::setter(object.clone(), &setter, kind),
            );
            created += 1;
        }
        created
    }

    /// Bindings of `key` in registration order.
    pub fn lookup(&self, key: &str) -> Vec<Binding> {
        self.bindings
            .get(key)
            .map(|bindings| bindings.value().clone())
            .unwrap_or_default()
    }

    pub fn pending_count(&self, owner: &str) -> usize {
        self.pending.get(owner).map(|p| p.len()).unwrap_or(0)
    }

    pub fn binding_count(&self) -> usize {
        self.bindings.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn bound_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.bindings.iter().map(|entry| entry.key().clone()).collect();
        keys.sort();
        keys
    }

    fn register(&self, key: &str, expression: &str, target: BindingTarget) {
        let binding = Binding {
            key: key.to_string(),
            expression: expression.to_string(),
            target,
        };
        debug!("Monitoring {}", binding);
        self.bindings.entry(key.to_string()).or_default().push(binding);
    }
}
