use std::sync::Arc;
use std::thread;

use graycfg_binding::{
    Bindable, BindingError, BindingProcessor, BindingRegistry, ChangePropagator, DefinitionRegistry,
    FieldDescriptor, PropagationReport, Result, SetterDescriptor, TypedValue, ValueKind,
};
use graycfg_core::{
    BindingConfig, LayeredPropertySource, LiveMapPropertySource, LivePropertySource, MapPropertySource,
};
use parking_lot::{Mutex, RwLock};

type WriteLog = Arc<Mutex<Vec<String>>>;

/// Test object with a port, an address and a name, each writable through a
/// field and a setter.
struct Endpoint {
    label: String,
    port: RwLock<u16>,
    address: RwLock<String>,
    name: RwLock<String>,
    fields: Vec<FieldDescriptor>,
    setters: Vec<SetterDescriptor>,
    log: WriteLog,
}

impl Endpoint {
    fn new(label: &str, log: &WriteLog) -> Self {
        Self {
            label: label.to_string(),
            port: RwLock::new(0),
            address: RwLock::new(String::new()),
            name: RwLock::new(String::new()),
            fields: Vec::new(),
            setters: Vec::new(),
            log: log.clone(),
        }
    }

    fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    fn setter(mut self, setter: SetterDescriptor) -> Self {
        self.setters.push(setter);
        self
    }

    fn port(&self) -> u16 {
        *self.port.read()
    }

    fn address(&self) -> String {
        self.address.read().clone()
    }

    fn name(&self) -> String {
        self.name.read().clone()
    }

    fn write(&self, member: &str, value: TypedValue) -> Result<()> {
        match member {
            "port" | "set_port" => *self.port.write() = value.try_into()?,
            "address" => *self.address.write() = value.try_into()?,
            "name" | "set_name" => *self.name.write() = value.try_into()?,
            other => return Err(BindingError::unknown_member(&self.label, other)),
        }
        self.log.lock().push(format!("{}.{}", self.label, member));
        Ok(())
    }
}

impl Bindable for Endpoint {
    fn type_name(&self) -> &str {
        "Endpoint"
    }

    fn fields(&self) -> Vec<FieldDescriptor> {
        self.fields.clone()
    }

    fn setters(&self) -> Vec<SetterDescriptor> {
        self.setters.clone()
    }

    fn write_accessor(&self, property: &str) -> Option<SetterDescriptor> {
        match property {
            "port" => Some(SetterDescriptor::new("set_port", [ValueKind::U16])),
            "name" => Some(SetterDescriptor::new("set_name", [ValueKind::String])),
            _ => None,
        }
    }

    fn set_field(&self, field: &str, value: TypedValue) -> Result<()> {
        self.write(field, value)
    }

    fn invoke_setter(&self, setter: &str, value: TypedValue) -> Result<()> {
        self.write(setter, value)
    }
}

struct Fixture {
    environment: Arc<LayeredPropertySource>,
    overrides: Arc<LiveMapPropertySource>,
    live: Arc<LiveMapPropertySource>,
    processor: BindingProcessor,
    log: WriteLog,
}

fn fixture() -> Fixture {
    fixture_with(BindingConfig::default())
}

fn fixture_with(config: BindingConfig) -> Fixture {
    let environment = Arc::new(LayeredPropertySource::new("environment"));
    let overrides = Arc::new(LiveMapPropertySource::new("overrides", "overrides"));
    let live = Arc::new(
        LiveMapPropertySource::new("application", "application")
            .with_values([("port", "8080"), ("host", "localhost")]),
    );
    environment.add_last(overrides.clone());
    environment.add_last(live.clone());
    environment.add_last(Arc::new(MapPropertySource::new("defaults", [("name", "svc")])));

    let processor = BindingProcessor::new(environment.clone(), &config);
    Fixture {
        environment,
        overrides,
        live,
        processor,
        log: Arc::new(Mutex::new(Vec::new())),
    }
}

fn port_field(expression: &str) -> FieldDescriptor {
    FieldDescriptor::new("port", ValueKind::U16).with_expression(expression)
}

fn register(fixture: &Fixture, endpoint: Endpoint, owner: &str) -> Arc<Endpoint> {
    let endpoint = Arc::new(endpoint);
    let bindable: Arc<dyn Bindable> = endpoint.clone();
    fixture.processor.before_initialization(bindable, owner);
    endpoint
}

#[test]
fn test_change_updates_every_binding_in_registration_order() {
    let fixture = fixture();
    let first = register(&fixture, Endpoint::new("first", &fixture.log).field(port_field("${port}")), "first");
    let second = register(
        &fixture,
        Endpoint::new("second", &fixture.log).setter(SetterDescriptor::new("set_port", [ValueKind::U16]).with_expression("${port}")),
        "second",
    );

    assert!(fixture.processor.propagator().is_listening());
    assert_eq!(fixture.live.listener_count(), 1);
    assert_eq!(fixture.overrides.listener_count(), 1);

    fixture.live.set("port", "9090");

    assert_eq!(first.port(), 9090);
    assert_eq!(second.port(), 9090);
    assert_eq!(*fixture.log.lock(), vec!["first.port".to_string(), "second.set_port".to_string()]);
}

#[test]
fn test_masked_change_leaves_targets_untouched() {
    let fixture = fixture();
    fixture.overrides.set("port", "7000");
    let endpoint = register(&fixture, Endpoint::new("ep", &fixture.log).field(port_field("${port}")), "ep");

    let event = fixture.live.set("port", "9090");
    assert_eq!(endpoint.port(), 0);
    assert!(fixture.log.lock().is_empty());

    let report = fixture.processor.propagator().on_change(&event);
    assert_eq!(
        report,
        PropagationReport {
            skipped_masked: 1,
            ..Default::default()
        }
    );
}

#[test]
fn test_failing_binding_does_not_block_siblings() {
    let fixture = fixture();
    let numeric = register(&fixture, Endpoint::new("numeric", &fixture.log).field(port_field("${port}")), "numeric");
    let textual = register(
        &fixture,
        Endpoint::new("textual", &fixture.log).field(FieldDescriptor::new("name", ValueKind::String).with_expression("${port}")),
        "textual",
    );

    let event = fixture.live.set("port", "not-a-port");
    assert_eq!(numeric.port(), 0);
    assert_eq!(textual.name(), "not-a-port");

    let report = fixture.processor.propagator().on_change(&event);
    assert_eq!(report.updated, 1);
    assert_eq!(report.failed, 1);
}

#[test]
fn test_composite_expression_is_fully_re_resolved() {
    let fixture = fixture();
    let endpoint = register(
        &fixture,
        Endpoint::new("ep", &fixture.log)
            .field(FieldDescriptor::new("address", ValueKind::String).with_expression("${host}:${port}")),
        "ep",
    );

    fixture.live.set("port", "9443");
    assert_eq!(endpoint.address(), "localhost:9443");

    fixture.live.set("host", "example.org");
    assert_eq!(endpoint.address(), "example.org:9443");
}

#[test]
fn test_deleted_key_falls_back_to_default() {
    let fixture = fixture();
    let endpoint = register(&fixture, Endpoint::new("ep", &fixture.log).field(port_field("${port:1234}")), "ep");

    fixture.live.set("port", "9090");
    assert_eq!(endpoint.port(), 9090);

    fixture.live.remove("port");
    assert_eq!(endpoint.port(), 1234);
}

#[test]
fn test_deleted_key_without_default_keeps_last_value() {
    let fixture = fixture();
    let endpoint = register(&fixture, Endpoint::new("ep", &fixture.log).field(port_field("${port}")), "ep");

    fixture.live.set("port", "9090");
    let event = fixture.live.remove("port");
    assert_eq!(endpoint.port(), 9090);

    let report = fixture.processor.propagator().on_change(&event);
    assert_eq!(report.failed, 1);
}

#[test]
fn test_pending_declarations_bind_to_the_first_built_object_only() {
    let fixture = fixture();
    let definitions = DefinitionRegistry::new()
        .literal("pool", "port", "${port}")
        .literal("pool", "name", "${name}")
        .reference("pool", "metrics", "metricsBean");
    assert_eq!(fixture.processor.post_process_definitions(&definitions), 2);

    let first = register(&fixture, Endpoint::new("first", &fixture.log), "pool");
    let second = register(&fixture, Endpoint::new("second", &fixture.log), "pool");
    assert_eq!(fixture.processor.registry().pending_count("pool"), 0);

    fixture.live.set("port", "6000");
    assert_eq!(first.port(), 6000);
    assert_eq!(second.port(), 0);
}

#[test]
fn test_concurrent_startup_attaches_one_listener_per_live_source() {
    let environment = Arc::new(LayeredPropertySource::new("environment"));
    let live = Arc::new(LiveMapPropertySource::new("application", "application"));
    environment.add_last(live.clone());
    let propagator = ChangePropagator::new(Arc::new(BindingRegistry::new()), environment);

    let winners: usize = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| propagator.ensure_listening()))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|registered| *registered)
            .count()
    });

    assert_eq!(winners, 1);
    assert_eq!(live.listener_count(), 1);
}

#[test]
fn test_nested_live_sources_are_attached() {
    let inner = Arc::new(LayeredPropertySource::new("composite"));
    let nested = Arc::new(LiveMapPropertySource::new("nested", "nested").with_values([("port", "1")]));
    inner.add_last(nested.clone());
    let environment = Arc::new(LayeredPropertySource::new("environment"));
    environment.add_last(inner);

    let processor = BindingProcessor::new(environment, &BindingConfig::default());
    let log: WriteLog = Arc::new(Mutex::new(Vec::new()));
    let endpoint = Arc::new(Endpoint::new("ep", &log).field(port_field("${port}")));
    processor.before_initialization(endpoint.clone(), "ep");

    assert_eq!(nested.listener_count(), 1);
    nested.set("port", "2");
    assert_eq!(endpoint.port(), 2);
}

#[test]
fn test_invalid_setters_are_skipped_without_failing_the_object() {
    let fixture = fixture();
    let endpoint = register(
        &fixture,
        Endpoint::new("ep", &fixture.log)
            .setter(SetterDescriptor::new("configure", [ValueKind::U16, ValueKind::Bool]).with_expression("${port}"))
            .setter(SetterDescriptor::new("build", [ValueKind::U16]).with_expression("${port}").factory())
            .field(port_field("${port}")),
        "ep",
    );

    let bindings = fixture.processor.registry().lookup("port");
    assert_eq!(bindings.len(), 1);
    assert!(bindings[0].target.is_field());

    fixture.live.set("port", "8181");
    assert_eq!(endpoint.port(), 8181);
}

#[test]
fn test_disabled_auto_update_never_listens() {
    let fixture = fixture_with(BindingConfig {
        auto_update_injected_properties: false,
    });
    let endpoint = register(&fixture, Endpoint::new("ep", &fixture.log).field(port_field("${port}")), "ep");

    assert!(!fixture.processor.propagator().is_listening());
    assert_eq!(fixture.live.listener_count(), 0);
    assert_eq!(fixture.processor.registry().binding_count(), 0);

    fixture.live.set("port", "9090");
    assert_eq!(endpoint.port(), 0);
    assert_eq!(fixture.environment.resolve("${port}").unwrap(), "9090");
}

#[test]
fn test_failing_key_does_not_block_other_keys_in_event() {
    let fixture = fixture();
    let numeric = register(&fixture, Endpoint::new("numeric", &fixture.log).field(port_field("${host}")), "numeric");
    let textual = register(
        &fixture,
        Endpoint::new("textual", &fixture.log)
            .field(FieldDescriptor::new("address", ValueKind::String).with_expression("${port}")),
        "textual",
    );

    // "host" is dispatched before "port" and cannot be converted to a port.
    let event = fixture.live.apply([
        ("port".to_string(), Some("9443".to_string())),
        ("host".to_string(), Some("example.org".to_string())),
    ]);
    assert_eq!(event.changed_keys().collect::<Vec<_>>(), vec!["host", "port"]);
    assert_eq!(numeric.port(), 0);
    assert_eq!(textual.address(), "9443");

    let report = fixture.processor.propagator().on_change(&event);
    assert_eq!(report.failed, 1);
    assert_eq!(report.updated, 1);
}

#[test]
fn test_concurrent_registration_keeps_every_binding() {
    const THREADS: usize = 8;
    let registry = BindingRegistry::new();
    let log: WriteLog = Arc::new(Mutex::new(Vec::new()));

    thread::scope(|scope| {
        for i in 0..THREADS {
            let registry = &registry;
            let log = &log;
            scope.spawn(move || {
                let owner = format!("endpoint-{i}");
                registry.declare_pending(&owner, "name", &format!("${{name.{i}}}"));

                let object: Arc<dyn Bindable> = Arc::new(Endpoint::new(&owner, log));
                registry.bind_field(&object, &port_field("${shared}"), "${shared}");
                let setter = SetterDescriptor::new("set_port", [ValueKind::U16]);
                registry.bind_setter(&object, &setter, "${shared.setter}").unwrap();
                assert_eq!(registry.materialize(&object, &owner), 1);
            });
        }
    });

    assert_eq!(registry.binding_count(), 3 * THREADS);
    assert_eq!(registry.lookup("shared").len(), THREADS);
    assert_eq!(registry.lookup("shared.setter").len(), THREADS);
    for i in 0..THREADS {
        assert_eq!(registry.pending_count(&format!("endpoint-{i}")), 0);
        assert_eq!(registry.lookup(&format!("name.{i}")).len(), 1);
    }
}
