//! Dotted-key mock configuration.
//!
//! ```
//! use mimic_core::{call, Mock, MockConfig, Value};
//!
//! let config = MockConfig::from_yaml_str(
//!     r#"
//! method.return_value: 3
//! other.side_effect:
//!   raise: KeyError
//! "#,
//! )
//! .unwrap();
//! let mock = Mock::builder().configure(config).build().unwrap();
//! assert_eq!(mock.attr("method").unwrap().call(call!()).unwrap(), Value::from(3));
//! assert!(mock.attr("other").unwrap().call(call!()).unwrap_err().is_raised("KeyError"));
//! ```

use serde::Deserialize;
use serde_json::Map;

use crate::error::{Error, Exception, Result};
use crate::node::Mock;
use crate::resolve::{Effect, SideEffect};
use crate::value::Value;

const RETURN_VALUE: &str = "return_value";
const SIDE_EFFECT: &str = "side_effect";

#[derive(Debug, Clone)]
enum Setting {
    Value(Value),
    SideEffect(Option<SideEffect>),
}

#[derive(Debug, Clone)]
struct Entry {
    key: String,
    setting: Setting,
}

/// Configuration applied through `Mock::configure_mock`.
///
/// Keys are dotted paths relative to the mock. A trailing `return_value` or
/// `side_effect` configures the node the path leads to; any other trailing
/// segment assigns an attribute. Shallower keys are applied first.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(try_from = "Map<String, serde_json::Value>")]
pub struct MockConfig {
    entries: Vec<Entry>,
}

impl MockConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a return value or attribute at `key`.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entries.push(Entry {
            key: key.into(),
            setting: Setting::Value(value.into()),
        });
        self
    }

    /// Install a side effect; `key` must end in `side_effect`.
    pub fn set_side_effect(
        mut self,
        key: impl Into<String>,
        side_effect: impl Into<SideEffect>,
    ) -> Self {
        self.entries.push(Entry {
            key: key.into(),
            setting: Setting::SideEffect(Some(side_effect.into())),
        });
        self
    }

    /// Remove a previously configured side effect.
    pub fn clear_side_effect(mut self, key: impl Into<String>) -> Self {
        self.entries.push(Entry {
            key: key.into(),
            setting: Setting::SideEffect(None),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse a JSON object.
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::Object(map) => Self::try_from(map),
            other => Err(Error::config(format!(
                "expected a map of dotted keys, got {}",
                other
            ))),
        }
    }

    /// Parse a YAML mapping.
    pub fn from_yaml_str(source: &str) -> Result<Self> {
        serde_yaml::from_str(source).map_err(|e| Error::config(e.to_string()))
    }

    pub(crate) fn apply(&self, mock: &Mock) -> Result<()> {
        if let Some(entry) = self
            .entries
            .iter()
            .find(|entry| entry.key.split('.').any(str::is_empty))
        {
            return Err(Error::config(format!("empty segment in '{}'", entry.key)));
        }
        let mut entries: Vec<&Entry> = self.entries.iter().collect();
        entries.sort_by_key(|entry| entry.key.matches('.').count());

        for entry in entries {
            let (path, last) = match entry.key.rsplit_once('.') {
                Some((path, last)) => (Some(path), last),
                None => (None, entry.key.as_str()),
            };
            let target = match path {
                Some(path) => mock.attr(path)?,
                None => mock.clone(),
            };
            tracing::debug!(mock = %target.path(), key = %entry.key, "applying configuration");

            match (last, &entry.setting) {
                (RETURN_VALUE, Setting::Value(value)) => target.set_return_value(value.clone()),
                (SIDE_EFFECT, Setting::SideEffect(Some(side_effect))) => {
                    target.set_side_effect(side_effect.clone())
                }
                (SIDE_EFFECT, Setting::SideEffect(None)) => target.clear_side_effect(),
                (SIDE_EFFECT, Setting::Value(_)) => {
                    return Err(Error::config(format!(
                        "'{}' needs a side effect, not a plain value",
                        entry.key
                    )))
                }
                (_, Setting::SideEffect(_)) => {
                    return Err(Error::config(format!(
                        "'{}' does not end in '{}'",
                        entry.key, SIDE_EFFECT
                    )))
                }
                (attribute, Setting::Value(value)) => target.set(attribute, value.clone()),
            }
        }
        Ok(())
    }
}

impl TryFrom<Map<String, serde_json::Value>> for MockConfig {
    type Error = Error;

    fn try_from(map: Map<String, serde_json::Value>) -> Result<Self> {
        let mut config = MockConfig::new();
        for (key, value) in map {
            let setting = if key == SIDE_EFFECT || key.ends_with(".side_effect") {
                Setting::SideEffect(parse_side_effect(&key, value)?)
            } else {
                Setting::Value(Value::Data(value))
            };
            config.entries.push(Entry { key, setting });
        }
        Ok(config)
    }
}

fn parse_side_effect(key: &str, value: serde_json::Value) -> Result<Option<SideEffect>> {
    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Array(steps) => steps
            .into_iter()
            .map(parse_step)
            .collect::<Result<Vec<_>>>()
            .map(|effects| Some(SideEffect::from(effects))),
        serde_json::Value::Object(map) if map.contains_key("raise") => {
            parse_exception(&map).map(|e| Some(SideEffect::Raise(e)))
        }
        other => Err(Error::config(format!(
            "'{}' must be null, a raise map or a list of steps, got {}",
            key, other
        ))),
    }
}

fn parse_step(step: serde_json::Value) -> Result<Effect> {
    if let serde_json::Value::Object(map) = &step {
        if map.contains_key("raise") {
            return parse_exception(map).map(Effect::Raise);
        }
        if map.len() == 1 {
            if map.contains_key("default") {
                return Ok(Effect::Default);
            }
            if let Some(value) = map.get("return") {
                return Ok(Effect::Return(Value::Data(value.clone())));
            }
        }
    }
    Ok(Effect::Return(Value::Data(step)))
}

fn parse_exception(map: &Map<String, serde_json::Value>) -> Result<Exception> {
    let kind = map
        .get("raise")
        .and_then(|kind| kind.as_str())
        .ok_or_else(|| Error::config("'raise' must name an exception kind"))?;
    let mut exception = Exception::new(kind);
    match map.get("message") {
        None | Some(serde_json::Value::Null) => {}
        Some(serde_json::Value::String(message)) => {
            exception = exception.with_message(message.clone())
        }
        Some(other) => {
            return Err(Error::config(format!(
                "exception message must be a string, got {}",
                other
            )))
        }
    }
    if let Some(unknown) = map.keys().find(|k| *k != "raise" && *k != "message") {
        return Err(Error::config(format!("unknown exception field '{}'", unknown)));
    }
    Ok(exception)
}
