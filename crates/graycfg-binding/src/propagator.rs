use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use graycfg_core::{ConfigChangeEvent, ConfigChangeListener, LayeredPropertySource, PropertySource};
use tracing::{debug, error, info};

use crate::BindingRegistry;

/// Outcome of handling one change event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PropagationReport {
    /// Bindings written successfully
    pub updated: usize,
    /// Bindings whose resolution, conversion or write failed
    pub failed: usize,
    /// Keys skipped because a higher-priority layer masks the reported value
    pub skipped_masked: usize,
    /// Keys nothing is bound to
    pub skipped_unbound: usize,
}

/// Re-applies configuration changes to bound objects.
///
/// The propagator attaches itself to the live layers of the environment the
/// first time [`ensure_listening`](Self::ensure_listening) is called; later
/// calls return immediately. Events are handled synchronously on the thread
/// that delivers them.
pub struct ChangePropagator {
    registry: Arc<BindingRegistry>,
    environment: Arc<LayeredPropertySource>,
    listening: AtomicBool,
}

impl ChangePropagator {
    pub fn new(registry: Arc<BindingRegistry>, environment: Arc<LayeredPropertySource>) -> Arc<Self> {
        Arc::new(Self {
            registry,
            environment,
            listening: AtomicBool::new(false),
        })
    }

    pub fn registry(&self) -> &Arc<BindingRegistry> {
        &self.registry
    }

    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Acquire)
    }

    /// Attach to every live layer, exactly once per propagator.
    ///
    /// Returns `true` only for the caller that performed the registration.
    /// Events delivered before registration completes are not replayed.
    pub fn ensure_listening(self: &Arc<Self>) -> bool {
        if self
            .listening
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        let listener: Arc<dyn ConfigChangeListener> = Arc::new(PropagatorListener {
            propagator: Arc::downgrade(self),
        });
        let mut attached = 0;
        for layer in self.environment.live_layers() {
            if let Some(live) = layer.as_live() {
                live.add_change_listener(listener.clone());
                attached += 1;
            }
        }
        info!("Auto update listener attached to {} live property source(s)", attached);
        true
    }

    /// Apply `event` to every binding of its changed keys.
    ///
    /// A key is only applied when the environment's effective value equals the
    /// value reported by the event. Failures are logged per binding and never
    /// stop the remaining bindings or keys.
    pub fn on_change(&self, event: &ConfigChangeEvent) -> PropagationReport {
        let mut report = PropagationReport::default();

        for key in event.changed_keys() {
            let bindings = self.registry.lookup(key);
            if bindings.is_empty() {
                report.skipped_unbound += 1;
                continue;
            }

            let effective = self.environment.get_property(key);
            if effective.as_deref() != event.new_value(key) {
                debug!(
                    "Change of '{}' in {} is masked by a higher priority source, skipping {} binding(s)",
                    key,
                    event.namespace,
                    bindings.len()
                );
                report.skipped_masked += 1;
                continue;
            }

            for binding in &bindings {
                match binding.update(&self.environment) {
                    Ok(value) => {
                        debug!("Auto update changed value successfully, new value: {}, {}", value, binding);
                        report.updated += 1;
                    }
                    Err(e) => {
                        error!("Auto update changed value failed, {}: {}", binding, e);
                        report.failed += 1;
                    }
                }
            }
        }

        report
    }
}

/// Listener handed to live sources; holds the propagator weakly so sources
/// owned by the environment do not keep it alive.
struct PropagatorListener {
    propagator: Weak<ChangePropagator>,
}

impl ConfigChangeListener for PropagatorListener {
    fn on_change(&self, event: &ConfigChangeEvent) {
        if let Some(propagator) = self.propagator.upgrade() {
            propagator.on_change(event);
        }
    }
}
