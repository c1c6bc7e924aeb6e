//! Scoped substitution of module and mock attributes.
//!
//! A [`Patcher`] describes a replacement; starting it swaps the attribute and
//! returns a [`PatchGuard`] that puts the original back when dropped, whether
//! the scope ends normally, through `?`, or by unwinding.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::config::MockConfig;
use crate::error::{Error, Result};
use crate::magic::Flavor;
use crate::node::{Mock, Slot};
use crate::resolve::SideEffect;
use crate::spec::{Spec, SpecMode};
use crate::value::{Object, Value};

static MODULES: Lazy<RwLock<HashMap<String, Module>>> = Lazy::new(|| RwLock::new(HashMap::new()));

/// A named attribute namespace shared by everyone who imports it.
#[derive(Clone)]
pub struct Module {
    name: Arc<str>,
    attributes: Arc<RwLock<HashMap<String, Value>>>,
}

impl Module {
    /// Register a module, or return the one already registered under `name`.
    pub fn register(name: &str) -> Module {
        MODULES
            .write()
            .entry(name.to_string())
            .or_insert_with(|| Module {
                name: Arc::from(name),
                attributes: Arc::new(RwLock::new(HashMap::new())),
            })
            .clone()
    }

    pub fn import(name: &str) -> Result<Module> {
        MODULES
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::ModuleNotFound {
                module: name.to_string(),
            })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, attribute: &str) -> Result<Value> {
        self.attributes
            .read()
            .get(attribute)
            .cloned()
            .ok_or_else(|| Error::AttributeNotFound {
                owner: format!("module '{}'", self.name),
                attribute: attribute.to_string(),
            })
    }

    pub fn set(&self, attribute: &str, value: impl Into<Value>) {
        let value = value.into();
        self.attributes.write().insert(attribute.to_string(), value);
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(self, attribute: &str, value: impl Into<Value>) -> Self {
        self.set(attribute, value);
        self
    }

    pub fn remove(&self, attribute: &str) -> Option<Value> {
        self.attributes.write().remove(attribute)
    }

    pub fn contains(&self, attribute: &str) -> bool {
        self.attributes.read().contains_key(attribute)
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Module({})", self.name)
    }
}

impl Object for Module {
    fn type_name(&self) -> &str {
        "module"
    }

    fn get_attr(&self, name: &str) -> Result<Value> {
        self.get(name)
    }

    fn spec(&self) -> Option<Spec> {
        Some(Spec::names(self.attributes.read().keys().cloned()))
    }
}

/// Something whose attributes can be swapped out and restored.
pub trait Patchable: Clone + Send + Sync + 'static {
    /// What `replace` hands back for `restore`.
    type Saved: Send;

    fn describe(&self) -> String;

    /// Current value of `attribute`, if it has one.
    fn lookup(&self, attribute: &str) -> Option<Value>;

    fn replace(&self, attribute: &str, value: Value) -> Self::Saved;

    fn restore(&self, attribute: &str, saved: Self::Saved);
}

impl Patchable for Module {
    type Saved = Option<Value>;

    fn describe(&self) -> String {
        format!("module '{}'", self.name)
    }

    fn lookup(&self, attribute: &str) -> Option<Value> {
        self.attributes.read().get(attribute).cloned()
    }

    fn replace(&self, attribute: &str, value: Value) -> Option<Value> {
        self.attributes.write().insert(attribute.to_string(), value)
    }

    fn restore(&self, attribute: &str, saved: Option<Value>) {
        let mut attributes = self.attributes.write();
        match saved {
            Some(value) => {
                attributes.insert(attribute.to_string(), value);
            }
            None => {
                attributes.remove(attribute);
            }
        }
    }
}

/// Slot of a mock attribute taken out by a patch.
#[derive(Debug)]
pub struct SavedSlot(Option<Slot>);

impl Patchable for Mock {
    type Saved = SavedSlot;

    fn describe(&self) -> String {
        format!("'{}'", self.path())
    }

    /// An attribute exists once it was accessed or assigned, or when the
    /// spec declares it. Nothing is fabricated by the lookup itself.
    fn lookup(&self, attribute: &str) -> Option<Value> {
        if let Some(value) = self.peek(attribute) {
            return Some(value);
        }
        match self.spec() {
            Some(spec) if spec.allows(attribute) => self.get(attribute).ok(),
            _ => None,
        }
    }

    fn replace(&self, attribute: &str, value: Value) -> SavedSlot {
        let saved = self.take_slot(attribute);
        self.set(attribute, value);
        SavedSlot(saved)
    }

    fn restore(&self, attribute: &str, saved: SavedSlot) {
        self.put_slot(attribute, saved.0);
    }
}

#[derive(Debug, Clone)]
enum SpecRequest {
    Given(Spec, SpecMode),
    FromOriginal,
}

/// Patch `attribute` of a registered module, addressed as `"module.attribute"`.
///
/// The module part may itself be dotted (`"pkg.sub.attr"` patches `attr` of
/// module `pkg.sub`).
pub fn patch(path: &str) -> Result<Patcher<Module>> {
    let (module, attribute) = path
        .rsplit_once('.')
        .ok_or_else(|| Error::patch(path, "expected 'module.attribute'"))?;
    let module = Module::import(module).map_err(|e| Error::patch(path, e.to_string()))?;
    Ok(Patcher::new(module, attribute, path))
}

/// Patch `attribute` of an arbitrary patchable target.
pub fn patch_object<T: Patchable>(target: &T, attribute: &str) -> Patcher<T> {
    let label = format!("{}.{}", target.describe(), attribute);
    Patcher::new(target.clone(), attribute, &label)
}

/// A pending patch.
#[derive(Debug, Clone)]
#[must_use = "a patcher does nothing until started"]
pub struct Patcher<T: Patchable> {
    target: T,
    attribute: String,
    label: String,
    new_value: Option<Value>,
    spec: Option<SpecRequest>,
    flavor: Flavor,
    return_value: Option<Value>,
    side_effect: Option<SideEffect>,
    config: Option<MockConfig>,
    create: bool,
}

impl<T: Patchable> Patcher<T> {
    fn new(target: T, attribute: &str, label: &str) -> Self {
        Self {
            target,
            attribute: attribute.to_string(),
            label: label.to_string(),
            new_value: None,
            spec: None,
            flavor: Flavor::Magic,
            return_value: None,
            side_effect: None,
            config: None,
            create: false,
        }
    }

    /// Replace with this value instead of a fresh mock.
    pub fn new_value(mut self, value: impl Into<Value>) -> Self {
        self.new_value = Some(value.into());
        self
    }

    pub fn spec(mut self, spec: Spec) -> Self {
        self.spec = Some(SpecRequest::Given(spec, SpecMode::Shallow));
        self
    }

    /// Spec the replacement recursively after the original value.
    pub fn autospec(mut self) -> Self {
        self.spec = Some(SpecRequest::FromOriginal);
        self
    }

    /// Spec the replacement recursively after `spec`.
    pub fn autospec_with(mut self, spec: Spec) -> Self {
        self.spec = Some(SpecRequest::Given(spec, SpecMode::Autospec));
        self
    }

    /// Mock flavor of the replacement; magic by default.
    pub fn flavor(mut self, flavor: Flavor) -> Self {
        self.flavor = flavor;
        self
    }

    pub fn return_value(mut self, value: impl Into<Value>) -> Self {
        self.return_value = Some(value.into());
        self
    }

    pub fn side_effect(mut self, side_effect: impl Into<SideEffect>) -> Self {
        self.side_effect = Some(side_effect.into());
        self
    }

    pub fn configure(mut self, config: MockConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Allow patching an attribute that does not exist yet; it is removed
    /// again on restore.
    pub fn create(mut self, create: bool) -> Self {
        self.create = create;
        self
    }

    fn has_mock_options(&self) -> bool {
        self.spec.is_some()
            || self.return_value.is_some()
            || self.side_effect.is_some()
            || self.config.is_some()
    }

    fn build_mock(&self, original: Option<&Value>) -> Result<Mock> {
        let mut builder = Mock::builder()
            .name(self.attribute.clone())
            .flavor(self.flavor);
        match &self.spec {
            Some(SpecRequest::Given(spec, SpecMode::Shallow)) => {
                builder = builder.spec(spec.clone());
            }
            Some(SpecRequest::Given(spec, SpecMode::Autospec)) => {
                builder = builder.autospec(spec.clone()).flavor(Flavor::Plain);
            }
            Some(SpecRequest::FromOriginal) => {
                let spec = original
                    .and_then(Value::spec)
                    .ok_or_else(|| Error::patch(&self.label, "original value has no spec to autospec from"))?;
                builder = builder.autospec(spec).flavor(Flavor::Plain);
            }
            None => {}
        }
        if let Some(value) = &self.return_value {
            builder = builder.return_value(value.clone());
        }
        if let Some(side_effect) = &self.side_effect {
            builder = builder.side_effect(side_effect.clone());
        }
        if let Some(config) = &self.config {
            builder = builder.configure(config.clone());
        }
        builder.build()
    }

    /// Swap the attribute; the returned guard restores it.
    pub fn start(self) -> Result<PatchGuard<T>> {
        let original = self.target.lookup(&self.attribute);
        if original.is_none() && !self.create {
            return Err(Error::patch(
                &self.label,
                format!(
                    "{} does not have the attribute '{}'",
                    self.target.describe(),
                    self.attribute
                ),
            ));
        }

        let replacement = match &self.new_value {
            Some(_) if self.has_mock_options() => {
                return Err(Error::patch(
                    &self.label,
                    "a new value cannot be combined with mock options",
                ))
            }
            Some(value) => value.clone(),
            None => Value::Mock(self.build_mock(original.as_ref())?),
        };

        let saved = self.target.replace(&self.attribute, replacement.clone());
        tracing::debug!(patch = %self.label, "patch started");
        Ok(PatchGuard {
            target: self.target,
            attribute: self.attribute,
            label: self.label,
            saved: Some(saved),
            replacement,
        })
    }

    /// Run `f` with the replacement mock installed, restoring afterwards.
    pub fn run<R>(self, f: impl FnOnce(&Mock) -> R) -> Result<R> {
        let guard = self.start()?;
        let mock = guard
            .mock()
            .cloned()
            .ok_or_else(|| Error::patch(&guard.label, "replacement is not a mock"))?;
        Ok(f(&mock))
    }
}

/// An active patch. Dropping it restores the original attribute.
#[must_use = "the patch is undone as soon as the guard is dropped"]
pub struct PatchGuard<T: Patchable> {
    target: T,
    attribute: String,
    label: String,
    saved: Option<T::Saved>,
    replacement: Value,
}

impl<T: Patchable> PatchGuard<T> {
    /// The replacement, when it is a mock.
    pub fn mock(&self) -> Option<&Mock> {
        self.replacement.as_mock()
    }

    pub fn value(&self) -> &Value {
        &self.replacement
    }

    /// Restore now instead of at end of scope.
    pub fn stop(mut self) {
        self.restore();
    }

    fn restore(&mut self) {
        if let Some(saved) = self.saved.take() {
            self.target.restore(&self.attribute, saved);
            tracing::debug!(patch = %self.label, "patch restored");
        }
    }
}

impl<T: Patchable> Drop for PatchGuard<T> {
    fn drop(&mut self) {
        self.restore();
    }
}

impl<T: Patchable> fmt::Debug for PatchGuard<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatchGuard")
            .field("label", &self.label)
            .field("active", &self.saved.is_some())
            .finish()
    }
}
