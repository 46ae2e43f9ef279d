use std::fmt;
use std::sync::Arc;

use crate::{Result, TypedValue, ValueKind};

/// A field of a bindable object, optionally carrying a value declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: ValueKind,
    /// Placeholder expression declared on the field
    pub expression: Option<String>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
            expression: None,
        }
    }

    pub fn with_expression(mut self, expression: impl Into<String>) -> Self {
        self.expression = Some(expression.into());
        self
    }
}

/// A setter-like method of a bindable object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetterDescriptor {
    pub name: String,
    pub params: Vec<ValueKind>,
    pub expression: Option<String>,
    /// Factory methods produce objects rather than accept values and are never bound
    pub factory: bool,
}

impl SetterDescriptor {
    pub fn new(name: impl Into<String>, params: impl IntoIterator<Item = ValueKind>) -> Self {
        Self {
            name: name.into(),
            params: params.into_iter().collect(),
            expression: None,
            factory: false,
        }
    }

    pub fn with_expression(mut self, expression: impl Into<String>) -> Self {
        self.expression = Some(expression.into());
        self
    }

    pub fn factory(mut self) -> Self {
        self.factory = true;
        self
    }

    /// Declared type of the single parameter, if the setter has exactly one.
    pub fn single_param(&self) -> Option<ValueKind> {
        match self.params.as_slice() {
            [kind] => Some(*kind),
            _ => None,
        }
    }
}

/// An object whose members can be written while the process runs.
///
/// Implementations use interior mutability: objects are shared as
/// `Arc<dyn Bindable>` and written from whichever thread delivers a change.
pub trait Bindable: Send + Sync {
    fn type_name(&self) -> &str;

    /// Fields to inspect for value declarations.
    fn fields(&self) -> Vec<FieldDescriptor> {
        Vec::new()
    }

    /// Setters to inspect for value declarations.
    fn setters(&self) -> Vec<SetterDescriptor> {
        Vec::new()
    }

    /// The setter that writes `property`, if the object has one.
    fn write_accessor(&self, property: &str) -> Option<SetterDescriptor> {
        let _ = property;
        None
    }

    fn set_field(&self, field: &str, value: TypedValue) -> Result<()>;

    fn invoke_setter(&self, setter: &str, value: TypedValue) -> Result<()>;
}

/// The location a binding writes to.
#[derive(Clone)]
pub enum BindingTarget {
    Field {
        object: Arc<dyn Bindable>,
        field: String,
        kind: ValueKind,
    },
    Setter {
        object: Arc<dyn Bindable>,
        setter: String,
        kind: ValueKind,
    },
}

impl BindingTarget {
    pub fn field(object: Arc<dyn Bindable>, field: &FieldDescriptor) -> Self {
        BindingTarget::Field {
            object,
            field: field.name.clone(),
            kind: field.kind,
        }
    }

    pub fn setter(object: Arc<dyn Bindable>, setter: &SetterDescriptor, kind: ValueKind) -> Self {
        BindingTarget::Setter {
            object,
            setter: setter.name.clone(),
            kind,
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            BindingTarget::Field { kind, .. } | BindingTarget::Setter { kind, .. } => *kind,
        }
    }

    pub fn object(&self) -> &Arc<dyn Bindable> {
        match self {
            BindingTarget::Field { object, .. } | BindingTarget::Setter { object, .. } => object,
        }
    }

    pub fn is_field(&self) -> bool {
        matches!(self, BindingTarget::Field { .. })
    }

    /// Whether this target writes into exactly `object`.
    pub fn targets(&self, object: &Arc<dyn Bindable>) -> bool {
        Arc::ptr_eq(self.object(), object)
    }

    pub fn apply(&self, value: TypedValue) -> Result<()> {
        match self {
            BindingTarget::Field { object, field, .. } => object.set_field(field, value),
            BindingTarget::Setter { object, setter, .. } => object.invoke_setter(setter, value),
        }
    }
}

impl fmt::Display for BindingTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingTarget::Field { object, field, kind } => {
                write!(f, "{}.{}: {}", object.type_name(), field, kind)
            }
            BindingTarget::Setter { object, setter, kind } => {
                write!(f, "{}.{}({})", object.type_name(), setter, kind)
            }
        }
    }
}

impl fmt::Debug for BindingTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
