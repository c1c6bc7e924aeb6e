//! Dynamic values flowing through mocks and host objects.

use std::fmt;
use std::sync::Arc;

use crate::call::Call;
use crate::error::{Error, Result};
use crate::node::Mock;
use crate::spec::{Signature, Spec};

/// A host object that mocks can stand in for.
///
/// Real collaborators of the code under test implement this trait so they can
/// be stored in a [`Module`](crate::Module) and later replaced by a mock.
pub trait Object: fmt::Debug + Send + Sync {
    /// Name used in error messages and reprs.
    fn type_name(&self) -> &str;

    /// Read an attribute.
    fn get_attr(&self, name: &str) -> Result<Value>;

    /// Invoke the object.
    fn call(&self, _call: Call) -> Result<Value> {
        Err(Error::NotCallable {
            value: format!("'{}' object", self.type_name()),
        })
    }

    /// Shape description used when autospeccing a replacement.
    fn spec(&self) -> Option<Spec> {
        None
    }
}

/// A value returned by, passed to, or stored on a mock.
#[derive(Clone)]
pub enum Value {
    /// Plain data; `null` stands for "no value".
    Data(serde_json::Value),
    /// A mock handle.
    Mock(Mock),
    /// A host object.
    Object(Arc<dyn Object>),
}

impl Value {
    /// The "no value" value.
    pub fn none() -> Self {
        Value::Data(serde_json::Value::Null)
    }

    /// Wrap a host object.
    pub fn object(object: impl Object + 'static) -> Self {
        Value::Object(Arc::new(object))
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::Data(serde_json::Value::Null))
    }

    pub fn is_mock(&self) -> bool {
        matches!(self, Value::Mock(_))
    }

    pub fn as_mock(&self) -> Option<&Mock> {
        match self {
            Value::Mock(mock) => Some(mock),
            _ => None,
        }
    }

    pub fn into_mock(self) -> Option<Mock> {
        match self {
            Value::Mock(mock) => Some(mock),
            _ => None,
        }
    }

    pub fn as_data(&self) -> Option<&serde_json::Value> {
        match self {
            Value::Data(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_data().and_then(|d| d.as_str())
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_data().and_then(|d| d.as_i64())
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_data().and_then(|d| d.as_f64())
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_data().and_then(|d| d.as_bool())
    }

    /// Short type label for messages.
    pub fn type_label(&self) -> String {
        match self {
            Value::Data(data) => match data {
                serde_json::Value::Null => "None".into(),
                serde_json::Value::Bool(_) => "bool".into(),
                serde_json::Value::Number(n) if n.is_f64() => "float".into(),
                serde_json::Value::Number(_) => "int".into(),
                serde_json::Value::String(_) => "str".into(),
                serde_json::Value::Array(_) => "list".into(),
                serde_json::Value::Object(_) => "dict".into(),
            },
            Value::Mock(mock) => mock.flavor().class_name().into(),
            Value::Object(object) => object.type_name().into(),
        }
    }

    /// Read an attribute of a mock or host object.
    pub fn attr(&self, name: &str) -> Result<Value> {
        match self {
            Value::Mock(mock) => mock.get(name),
            Value::Object(object) => object.get_attr(name),
            Value::Data(_) => Err(Error::AttributeNotFound {
                owner: self.type_label(),
                attribute: name.into(),
            }),
        }
    }

    /// Invoke a mock or callable host object.
    pub fn invoke(&self, call: Call) -> Result<Value> {
        match self {
            Value::Mock(mock) => mock.call(call),
            Value::Object(object) => object.call(call),
            Value::Data(_) => Err(Error::NotCallable {
                value: format!("'{}' object", self.type_label()),
            }),
        }
    }

    /// Spec derived from this value, used by autospec.
    pub fn spec(&self) -> Option<Spec> {
        match self {
            Value::Mock(mock) => mock.spec(),
            Value::Object(object) => object.spec(),
            Value::Data(_) => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Data(a), Value::Data(b)) => a == b,
            (Value::Mock(a), Value::Mock(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => {
                Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
            }
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Data(data) => write!(f, "Data({})", data),
            Value::Mock(mock) => fmt::Debug::fmt(mock, f),
            Value::Object(object) => write!(f, "Object({:?})", object),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Data(serde_json::Value::Null) => f.write_str("None"),
            Value::Data(serde_json::Value::String(s)) => {
                write!(f, "'{}'", s.replace('\'', "\\'"))
            }
            Value::Data(data) => write!(f, "{}", data),
            Value::Mock(mock) => fmt::Display::fmt(mock, f),
            Value::Object(object) => write!(f, "<{} object>", object.type_name()),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(data: serde_json::Value) -> Self {
        Value::Data(data)
    }
}

impl From<Mock> for Value {
    fn from(mock: Mock) -> Self {
        Value::Mock(mock)
    }
}

impl From<&Mock> for Value {
    fn from(mock: &Mock) -> Self {
        Value::Mock(mock.clone())
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::none()
    }
}

macro_rules! impl_from_data {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::Data(serde_json::Value::from(v))
                }
            }
        )*
    };
}

impl_from_data!(&str, String, bool, i32, i64, u32, u64, usize, f64);

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or_else(Value::none)
    }
}

type FunctionBody = dyn Fn(&Call) -> Result<Value> + Send + Sync;

/// A host function with a declared signature.
///
/// Calls are checked against the signature before the body runs, and the
/// signature doubles as the autospec for replacements.
#[derive(Clone)]
pub struct Function {
    name: String,
    signature: Signature,
    body: Arc<FunctionBody>,
}

impl Function {
    pub fn new(
        name: impl Into<String>,
        signature: Signature,
        body: impl Fn(&Call) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            signature,
            body: Arc::new(body),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Function({}{})", self.name, self.signature)
    }
}

impl Object for Function {
    fn type_name(&self) -> &str {
        "function"
    }

    fn get_attr(&self, name: &str) -> Result<Value> {
        Err(Error::AttributeNotFound {
            owner: self.name.clone(),
            attribute: name.into(),
        })
    }

    fn call(&self, call: Call) -> Result<Value> {
        self.signature
            .bind(&call)
            .map_err(|reason| Error::SignatureMismatch {
                target: self.name.clone(),
                reason,
            })?;
        (self.body)(&call)
    }

    fn spec(&self) -> Option<Spec> {
        Some(Spec::callable(self.name.clone(), self.signature.clone()))
    }
}
