//! Magic-method protocols (`len`, iteration, truthiness, context managers).

use serde_json::json;

use crate::call::Call;
use crate::error::{Error, Exception, Result};
use crate::node::Mock;
use crate::value::Value;

/// Mock flavor: plain, or with magic-method support.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Flavor {
    #[default]
    Plain,
    Magic,
}

impl Flavor {
    pub fn class_name(&self) -> &'static str {
        match self {
            Flavor::Plain => "Mock",
            Flavor::Magic => "MagicMock",
        }
    }
}

/// Supported magic methods.
pub const MAGIC_METHODS: &[&str] = &[
    "__len__",
    "__iter__",
    "__contains__",
    "__bool__",
    "__int__",
    "__float__",
    "__str__",
    "__enter__",
    "__exit__",
];

pub(crate) fn is_dunder(name: &str) -> bool {
    name.len() > 4 && name.starts_with("__") && name.ends_with("__")
}

pub(crate) fn is_supported(name: &str) -> bool {
    MAGIC_METHODS.contains(&name)
}

/// Preconfigured return value of a fresh magic method. `__str__` and
/// `__enter__` have none: the first renders the repr, the second returns
/// its default child.
pub(crate) fn default_return(name: &str) -> Option<Value> {
    let data = match name {
        "__len__" => json!(0),
        "__iter__" => json!([]),
        "__contains__" => json!(false),
        "__bool__" => json!(true),
        "__int__" => json!(1),
        "__float__" => json!(1.0),
        "__exit__" => json!(false),
        _ => return None,
    };
    Some(Value::Data(data))
}

impl Mock {
    fn magic_call(&self, method: &str, call: Call) -> Result<Value> {
        if !self.is_magic() {
            return Err(Error::Unsupported {
                mock: self.path(),
                protocol: method.to_string(),
            });
        }
        self.get_or_create_child(method)?.call(call)
    }

    /// `len(mock)`.
    pub fn len(&self) -> Result<usize> {
        let value = self.magic_call("__len__", Call::new())?;
        value
            .as_i64()
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| mismatch("__len__", "a non-negative int", &value))
    }

    /// Whether `len(mock)` is zero.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Items produced by `iter(mock)`.
    pub fn iterate(&self) -> Result<Vec<Value>> {
        let value = self.magic_call("__iter__", Call::new())?;
        match value {
            Value::Data(serde_json::Value::Array(items)) => {
                Ok(items.into_iter().map(Value::Data).collect())
            }
            other => Err(mismatch("__iter__", "a list", &other)),
        }
    }

    /// `item in mock`.
    pub fn contains(&self, item: impl Into<Value>) -> Result<bool> {
        let value = self.magic_call("__contains__", Call::new().arg(item))?;
        value
            .as_bool()
            .ok_or_else(|| mismatch("__contains__", "bool", &value))
    }

    /// `bool(mock)`. Plain mocks are always truthy.
    pub fn truthy(&self) -> Result<bool> {
        if !self.is_magic() {
            return Ok(true);
        }
        let value = self.magic_call("__bool__", Call::new())?;
        value
            .as_bool()
            .ok_or_else(|| mismatch("__bool__", "bool", &value))
    }

    /// `int(mock)`.
    pub fn to_int(&self) -> Result<i64> {
        let value = self.magic_call("__int__", Call::new())?;
        value
            .as_i64()
            .ok_or_else(|| mismatch("__int__", "int", &value))
    }

    /// `float(mock)`.
    pub fn to_float(&self) -> Result<f64> {
        let value = self.magic_call("__float__", Call::new())?;
        value
            .as_f64()
            .ok_or_else(|| mismatch("__float__", "float", &value))
    }

    /// `str(mock)`: the repr unless `__str__` was configured.
    pub fn to_str(&self) -> Result<String> {
        if !self.is_magic() {
            return Ok(self.to_string());
        }
        match self.magic_call("__str__", Call::new())? {
            Value::Mock(_) => Ok(self.to_string()),
            Value::Data(serde_json::Value::String(s)) => Ok(s),
            other => Err(mismatch("__str__", "str", &other)),
        }
    }

    /// Enter the mock as a context manager.
    pub fn enter(&self) -> Result<Value> {
        self.magic_call("__enter__", Call::new())
    }

    /// Leave the context. Returns whether the exception is suppressed.
    pub fn exit(&self, exception: Option<&Exception>) -> Result<bool> {
        let call = match exception {
            Some(e) => Call::new()
                .arg(e.kind())
                .arg(e.message())
                .arg(Value::none()),
            None => Call::new()
                .arg(Value::none())
                .arg(Value::none())
                .arg(Value::none()),
        };
        let value = self.magic_call("__exit__", call)?;
        Ok(match value {
            Value::Data(serde_json::Value::Bool(b)) => b,
            Value::Data(serde_json::Value::Null) => false,
            _ => true,
        })
    }
}

fn mismatch(protocol: &str, expected: &str, found: &Value) -> Error {
    Error::Conversion {
        protocol: protocol.to_string(),
        expected: expected.to_string(),
        found: found.type_label(),
    }
}
