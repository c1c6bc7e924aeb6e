//! Mock nodes and the attribute fabricator.
//!
//! Every mock tree lives in one arena. A [`Mock`] is a cheap handle (arena +
//! node id), so children, return values and the root can be passed around
//! freely while still sharing the same call history.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::call::Call;
use crate::config::MockConfig;
use crate::error::{Error, Result};
use crate::magic::{self, Flavor};
use crate::record::HeldCall;
use crate::resolve::{Installed, SideEffect};
use crate::spec::{Spec, SpecMode};
use crate::value::Value;

/// Serial used for reprs, unique per process.
static NEXT_SERIAL: AtomicU64 = AtomicU64::new(1);

/// Attribute prefixes rejected as probable assertion typos.
const ASSERTION_PREFIXES: &[&str] = &["assert", "assret", "asert", "aseert", "assrt"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(pub(crate) usize);

/// How a node hangs off its parent.
#[derive(Debug, Clone)]
pub(crate) enum Link {
    Root,
    Attribute { parent: NodeId, name: String },
    Magic { parent: NodeId, name: String },
    ReturnValue { parent: NodeId },
}

impl Link {
    pub(crate) fn parent(&self) -> Option<NodeId> {
        match self {
            Link::Root => None,
            Link::Attribute { parent, .. }
            | Link::Magic { parent, .. }
            | Link::ReturnValue { parent } => Some(*parent),
        }
    }
}

/// A value stored inside an arena.
///
/// Mocks of the same arena are kept as bare node ids, so a tree never holds
/// a strong reference to itself and is freed once its last outside handle
/// goes away.
#[derive(Debug, Clone)]
pub(crate) enum Held {
    Value(Value),
    Node(NodeId),
}

/// Content of an attribute slot.
#[derive(Debug, Clone)]
pub(crate) enum Slot {
    /// Fabricated child node.
    Child(NodeId),
    /// Explicitly assigned value.
    Assigned(Held),
}

#[derive(Debug, Clone)]
pub(crate) struct SpecBinding {
    pub(crate) spec: Spec,
    pub(crate) mode: SpecMode,
}

pub(crate) struct Node {
    pub(crate) serial: u64,
    pub(crate) name: Option<String>,
    pub(crate) link: Link,
    pub(crate) flavor: Flavor,
    pub(crate) slots: HashMap<String, Slot>,
    pub(crate) calls: Vec<HeldCall>,
    pub(crate) method_calls: Vec<HeldCall>,
    pub(crate) mock_calls: Vec<HeldCall>,
    pub(crate) return_value: Option<Held>,
    pub(crate) default_return: Option<NodeId>,
    pub(crate) side_effect: Option<Installed>,
    pub(crate) spec: Option<SpecBinding>,
    pub(crate) unsafe_access: bool,
}

impl Node {
    fn new(link: Link, flavor: Flavor, unsafe_access: bool) -> Self {
        Self {
            serial: NEXT_SERIAL.fetch_add(1, Ordering::Relaxed),
            name: None,
            link,
            flavor,
            slots: HashMap::new(),
            calls: Vec::new(),
            method_calls: Vec::new(),
            mock_calls: Vec::new(),
            return_value: None,
            default_return: None,
            side_effect: None,
            spec: None,
            unsafe_access,
        }
    }
}

/// Result of looking up an attribute slot.
pub(crate) enum Resolved {
    Child(NodeId),
    Assigned(Held),
}

#[derive(Default)]
pub(crate) struct Arena {
    nodes: Vec<Node>,
}

impl Arena {
    pub(crate) fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    /// Short name used in assertion messages.
    pub(crate) fn short_name(&self, id: NodeId) -> String {
        let node = self.node(id);
        match &node.link {
            Link::Root => node.name.clone().unwrap_or_else(|| "mock".to_string()),
            Link::Attribute { name, .. } | Link::Magic { name, .. } => name.clone(),
            Link::ReturnValue { .. } => "()".to_string(),
        }
    }

    /// Full dotted path from the root, e.g. `mock.loads().get`.
    pub(crate) fn path(&self, id: NodeId) -> String {
        let node = self.node(id);
        match &node.link {
            Link::Root => node.name.clone().unwrap_or_else(|| "mock".to_string()),
            Link::Attribute { parent, name } | Link::Magic { parent, name } => {
                format!("{}.{}", self.path(*parent), name)
            }
            Link::ReturnValue { parent } => format!("{}()", self.path(*parent)),
        }
    }

    /// Look up `name` on `parent`, fabricating a child when allowed.
    pub(crate) fn resolve_attribute(&mut self, parent: NodeId, name: &str) -> Result<Resolved> {
        let node = self.node(parent);
        if let Some(slot) = node.slots.get(name) {
            return Ok(match slot {
                Slot::Child(id) => Resolved::Child(*id),
                Slot::Assigned(held) => Resolved::Assigned(held.clone()),
            });
        }
        if name.is_empty() {
            return Err(self.missing(parent, name));
        }

        let spec_allows = node.spec.as_ref().map(|binding| binding.spec.allows(name));
        let link = if magic::is_dunder(name) {
            if node.flavor == Flavor::Magic
                && magic::is_supported(name)
                && spec_allows.unwrap_or(true)
            {
                Link::Magic {
                    parent,
                    name: name.to_string(),
                }
            } else {
                return Err(self.missing(parent, name));
            }
        } else if spec_allows == Some(false) {
            return Err(self.missing(parent, name));
        } else if !node.unsafe_access
            && spec_allows.is_none()
            && ASSERTION_PREFIXES.iter().any(|p| name.starts_with(p))
        {
            return Err(Error::UnsafeAttribute {
                attribute: name.to_string(),
            });
        } else {
            Link::Attribute {
                parent,
                name: name.to_string(),
            }
        };

        let child_spec = node
            .spec
            .as_ref()
            .filter(|binding| binding.mode == SpecMode::Autospec)
            .and_then(|binding| binding.spec.child_spec(name))
            .map(|spec| SpecBinding {
                spec,
                mode: SpecMode::Autospec,
            });
        let is_magic = matches!(link, Link::Magic { .. });
        let mut child = Node::new(link, node.flavor, node.unsafe_access);
        child.spec = child_spec;
        if is_magic {
            child.return_value = magic::default_return(name).map(Held::Value);
        }

        let id = self.alloc(child);
        self.node_mut(parent)
            .slots
            .insert(name.to_string(), Slot::Child(id));
        tracing::trace!(parent = %self.path(parent), attribute = name, "fabricated child mock");
        Ok(Resolved::Child(id))
    }

    /// Memoized default return node of `parent`.
    pub(crate) fn default_return(&mut self, parent: NodeId) -> NodeId {
        if let Some(id) = self.node(parent).default_return {
            return id;
        }
        let node = self.node(parent);
        let spec = node
            .spec
            .as_ref()
            .filter(|binding| binding.mode == SpecMode::Autospec)
            .and_then(|binding| binding.spec.return_spec())
            .map(|spec| SpecBinding {
                spec,
                mode: SpecMode::Autospec,
            });
        let mut child = Node::new(Link::ReturnValue { parent }, node.flavor, node.unsafe_access);
        child.spec = spec;
        let id = self.alloc(child);
        self.node_mut(parent).default_return = Some(id);
        id
    }

    fn missing(&self, parent: NodeId, name: &str) -> Error {
        tracing::debug!(mock = %self.path(parent), attribute = name, "attribute rejected");
        Error::AttributeNotFound {
            owner: self.path(parent),
            attribute: name.to_string(),
        }
    }
}

/// Handle to one mock node.
///
/// Cloning the handle does not clone the mock: clones compare equal and share
/// configuration and call history.
#[derive(Clone)]
pub struct Mock {
    arena: Arc<Mutex<Arena>>,
    id: NodeId,
}

impl Mock {
    /// A plain mock with no configuration.
    pub fn new() -> Self {
        Self::root(Node::new(Link::Root, Flavor::Plain, false))
    }

    /// A mock that also supports the magic protocols.
    pub fn magic() -> Self {
        Self::root(Node::new(Link::Root, Flavor::Magic, false))
    }

    pub fn builder() -> MockBuilder {
        MockBuilder::default()
    }

    fn root(node: Node) -> Self {
        let mut arena = Arena::default();
        let id = arena.alloc(node);
        Self {
            arena: Arc::new(Mutex::new(arena)),
            id,
        }
    }

    pub(crate) fn handle(&self, id: NodeId) -> Mock {
        Mock {
            arena: Arc::clone(&self.arena),
            id,
        }
    }

    pub(crate) fn arena(&self) -> &Arc<Mutex<Arena>> {
        &self.arena
    }

    pub(crate) fn id(&self) -> NodeId {
        self.id
    }

    /// Prepare `value` for storage in this mock's arena.
    pub(crate) fn hold(&self, value: Value) -> Held {
        match value {
            Value::Mock(mock) if Arc::ptr_eq(&mock.arena, &self.arena) => Held::Node(mock.id),
            other => Held::Value(other),
        }
    }

    /// Turn a stored value back into a value callers can use.
    pub(crate) fn release(&self, held: &Held) -> Value {
        match held {
            Held::Value(value) => value.clone(),
            Held::Node(id) => Value::Mock(self.handle(*id)),
        }
    }

    pub(crate) fn hold_call(&self, call: &Call) -> HeldCall {
        HeldCall {
            name: call.name().to_string(),
            args: call.args().iter().map(|v| self.hold(v.clone())).collect(),
            kwargs: call
                .kwargs()
                .iter()
                .map(|(k, v)| (k.clone(), self.hold(v.clone())))
                .collect(),
        }
    }

    pub(crate) fn release_call(&self, held: &HeldCall) -> Call {
        let call = held
            .args
            .iter()
            .fold(Call::new(), |call, arg| call.arg(self.release(arg)));
        held.kwargs
            .iter()
            .fold(call, |call, (k, v)| call.kwarg(k.clone(), self.release(v)))
            .on(held.name.clone())
    }

    /// A handle that does not keep the mock tree alive.
    ///
    /// Side-effect closures that need the mock they are installed on should
    /// capture one of these; a strong handle would keep the tree alive.
    pub fn downgrade(&self) -> WeakMock {
        WeakMock {
            arena: Arc::downgrade(&self.arena),
            id: self.id,
        }
    }

    /// Return the child mock for `name`, creating it on first access.
    ///
    /// Repeated access yields the same child. Fails with
    /// [`Error::AttributeNotFound`] when a spec excludes the name and with
    /// [`Error::NotAMock`] when the attribute was assigned plain data.
    pub fn get_or_create_child(&self, name: &str) -> Result<Mock> {
        let resolved = self.arena.lock().resolve_attribute(self.id, name)?;
        let held = match resolved {
            Resolved::Child(id) => return Ok(self.handle(id)),
            Resolved::Assigned(held) => held,
        };
        match self.release(&held) {
            Value::Mock(mock) => Ok(mock),
            _ => Err(Error::NotAMock {
                mock: self.path(),
                attribute: name.to_string(),
            }),
        }
    }

    /// Navigate a dotted path of children, e.g. `"other_attr.some_method"`.
    ///
    /// A `return_value` segment steps into the return value instead of a
    /// child named `return_value`.
    pub fn attr(&self, path: &str) -> Result<Mock> {
        path.split('.').try_fold(self.clone(), |mock, segment| {
            if segment == "return_value" {
                mock.return_mock()
            } else {
                mock.get_or_create_child(segment)
            }
        })
    }

    /// Read an attribute: an assigned value or a (fabricated) child mock.
    pub fn get(&self, name: &str) -> Result<Value> {
        let resolved = self.arena.lock().resolve_attribute(self.id, name)?;
        Ok(match resolved {
            Resolved::Child(id) => Value::Mock(self.handle(id)),
            Resolved::Assigned(held) => self.release(&held),
        })
    }

    /// The current attribute, without fabricating a child when there is none.
    pub(crate) fn peek(&self, name: &str) -> Option<Value> {
        let slot = self.arena.lock().node(self.id).slots.get(name).cloned()?;
        Some(match slot {
            Slot::Child(id) => Value::Mock(self.handle(id)),
            Slot::Assigned(held) => self.release(&held),
        })
    }

    /// Assign an attribute. Assignment is allowed even outside the spec.
    pub fn set(&self, name: &str, value: impl Into<Value>) {
        let held = self.hold(value.into());
        self.arena
            .lock()
            .node_mut(self.id)
            .slots
            .insert(name.to_string(), Slot::Assigned(held));
    }

    /// Remove an attribute slot; the next access fabricates a fresh child.
    pub fn unset(&self, name: &str) -> bool {
        self.arena
            .lock()
            .node_mut(self.id)
            .slots
            .remove(name)
            .is_some()
    }

    pub(crate) fn take_slot(&self, name: &str) -> Option<Slot> {
        self.arena.lock().node_mut(self.id).slots.remove(name)
    }

    pub(crate) fn put_slot(&self, name: &str, slot: Option<Slot>) {
        let mut arena = self.arena.lock();
        let slots = &mut arena.node_mut(self.id).slots;
        match slot {
            Some(slot) => {
                slots.insert(name.to_string(), slot);
            }
            None => {
                slots.remove(name);
            }
        }
    }

    /// The mock this one was fabricated from, if any.
    pub fn parent(&self) -> Option<Mock> {
        let parent = self.arena.lock().node(self.id).link.parent();
        parent.map(|id| self.handle(id))
    }

    /// Short name used in assertion messages (`loads`, or `mock` for an
    /// unnamed root).
    pub fn name(&self) -> String {
        self.arena.lock().short_name(self.id)
    }

    /// Full dotted path from the root (`mock.loads().get`).
    pub fn path(&self) -> String {
        self.arena.lock().path(self.id)
    }

    pub fn flavor(&self) -> Flavor {
        self.arena.lock().node(self.id).flavor
    }

    pub fn is_magic(&self) -> bool {
        self.flavor() == Flavor::Magic
    }

    /// Restrict this mock to the shape of `spec`.
    pub fn apply_spec(&self, spec: Spec, mode: SpecMode) {
        tracing::debug!(mock = %self.path(), ?mode, "applying spec");
        self.arena.lock().node_mut(self.id).spec = Some(SpecBinding { spec, mode });
    }

    pub fn spec(&self) -> Option<Spec> {
        self.arena
            .lock()
            .node(self.id)
            .spec
            .as_ref()
            .map(|binding| binding.spec.clone())
    }

    /// Class named by the spec, if any.
    pub fn spec_class(&self) -> Option<String> {
        self.arena
            .lock()
            .node(self.id)
            .spec
            .as_ref()
            .and_then(|binding| binding.spec.class_name().map(str::to_string))
    }

    /// Type check: true for the spec's class and for the mock classes
    /// themselves (`Mock`, and `MagicMock` for magic mocks).
    pub fn is_instance_of(&self, class: &str) -> bool {
        let flavor = self.flavor();
        class == "Mock"
            || (flavor == Flavor::Magic && class == "MagicMock")
            || self.spec_class().as_deref() == Some(class)
    }

    /// Apply dotted-key configuration.
    pub fn configure_mock(&self, config: &MockConfig) -> Result<()> {
        config.apply(self)
    }
}

impl Default for Mock {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Mock {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.arena, &other.arena) && self.id == other.id
    }
}

impl Eq for Mock {}

impl fmt::Debug for Mock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mock(#{})", self.id.0)
    }
}

/// Non-owning counterpart of [`Mock`], see [`Mock::downgrade`].
#[derive(Clone)]
pub struct WeakMock {
    arena: Weak<Mutex<Arena>>,
    id: NodeId,
}

impl WeakMock {
    /// The mock, if its tree is still alive.
    pub fn upgrade(&self) -> Option<Mock> {
        self.arena.upgrade().map(|arena| Mock { arena, id: self.id })
    }
}

impl fmt::Debug for WeakMock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WeakMock(#{})", self.id.0)
    }
}

impl fmt::Display for Mock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (class, name, spec, serial) = {
            let arena = self.arena.lock();
            let node = arena.node(self.id);
            let name = match (&node.link, &node.name) {
                (Link::Root, None) => None,
                _ => Some(arena.path(self.id)),
            };
            let spec = node
                .spec
                .as_ref()
                .and_then(|binding| binding.spec.class_name().map(str::to_string));
            (node.flavor.class_name(), name, spec, node.serial)
        };
        write!(f, "<{}", class)?;
        if let Some(name) = name {
            write!(f, " name='{}'", name)?;
        }
        if let Some(spec) = spec {
            write!(f, " spec='{}'", spec)?;
        }
        write!(f, " id='{}'>", serial)
    }
}

/// Builder for configured root mocks.
#[derive(Debug, Clone, Default)]
pub struct MockBuilder {
    name: Option<String>,
    flavor: Flavor,
    return_value: Option<Value>,
    side_effect: Option<SideEffect>,
    spec: Option<(Spec, SpecMode)>,
    unsafe_access: bool,
    config: Option<MockConfig>,
}

impl MockBuilder {
    /// Display name. Only settable here; an attribute called `name` is an
    /// ordinary slot.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn magic(mut self) -> Self {
        self.flavor = Flavor::Magic;
        self
    }

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

    /// Restrict names and check the mock's own call signature.
    pub fn spec(mut self, spec: Spec) -> Self {
        self.spec = Some((spec, SpecMode::Shallow));
        self
    }

    /// Spec recursively, checking method signatures.
    pub fn autospec(mut self, spec: Spec) -> Self {
        self.spec = Some((spec, SpecMode::Autospec));
        self
    }

    /// Allow attribute names that look like assertion typos.
    pub fn unsafe_access(mut self, allow: bool) -> Self {
        self.unsafe_access = allow;
        self
    }

    /// Dotted-key configuration applied after construction.
    pub fn configure(mut self, config: MockConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn build(self) -> Result<Mock> {
        let mut node = Node::new(Link::Root, self.flavor, self.unsafe_access);
        node.name = self.name;
        node.spec = self.spec.map(|(spec, mode)| SpecBinding { spec, mode });
        let mock = Mock::root(node);
        if let Some(value) = self.return_value {
            mock.set_return_value(value);
        }
        if let Some(side_effect) = self.side_effect {
            mock.set_side_effect(side_effect);
        }
        if let Some(config) = &self.config {
            mock.configure_mock(config)?;
        }
        Ok(mock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_children_are_identity_stable() {
        let mock = Mock::new();
        let a1 = mock.get_or_create_child("attr_1").unwrap();
        let a2 = mock.get_or_create_child("attr_1").unwrap();
        let b = mock.get_or_create_child("attr_2").unwrap();
        assert_eq!(a1, a2);
        assert_ne!(a1, b);
        assert_eq!(a1.parent(), Some(mock));
    }

    #[test]
    fn test_paths_and_names() {
        let json = Mock::new();
        let get = json.attr("loads.return_value.get").unwrap();
        assert_eq!(get.path(), "mock.loads().get");
        assert_eq!(get.name(), "get");
        assert_eq!(json.name(), "mock");
    }

    #[test]
    fn test_assigned_value_shadows_child() {
        let mock = Mock::new();
        mock.set("status_code", 200);
        assert_eq!(mock.get("status_code").unwrap(), Value::from(200));
        let err = mock.get_or_create_child("status_code").unwrap_err();
        assert!(matches!(err, Error::NotAMock { .. }));
        assert!(mock.unset("status_code"));
        assert!(mock.get("status_code").unwrap().is_mock());
    }

    #[test]
    fn test_empty_names_are_rejected() {
        let mock = Mock::new();
        assert!(matches!(
            mock.get_or_create_child(""),
            Err(Error::AttributeNotFound { .. })
        ));
        assert!(matches!(mock.attr(""), Err(Error::AttributeNotFound { .. })));
        assert!(matches!(
            mock.attr("a..b"),
            Err(Error::AttributeNotFound { .. })
        ));
    }

    #[test]
    fn test_same_tree_values_are_held_by_id() {
        let mock = Mock::new();
        let child = mock.get_or_create_child("child").unwrap();
        mock.set("alias", &child);
        assert!(matches!(
            mock.arena.lock().node(mock.id).slots.get("alias"),
            Some(Slot::Assigned(Held::Node(_)))
        ));
        assert_eq!(mock.get_or_create_child("alias").unwrap(), child);

        let other = Mock::new();
        mock.set("other", &other);
        assert!(matches!(
            mock.arena.lock().node(mock.id).slots.get("other"),
            Some(Slot::Assigned(Held::Value(Value::Mock(_))))
        ));
    }

    #[test]
    fn test_weak_handle() {
        let mock = Mock::new();
        let weak = mock.downgrade();
        assert_eq!(weak.upgrade(), Some(mock.clone()));
        drop(mock);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_dunder_rejected_on_plain_mock() {
        let mock = Mock::new();
        let err = mock.get_or_create_child("__len__").unwrap_err();
        assert!(matches!(err, Error::AttributeNotFound { .. }));
        assert!(Mock::magic().get_or_create_child("__len__").is_ok());
    }

    #[test]
    fn test_assertion_typos_rejected_unless_unsafe() {
        let mock = Mock::new();
        let err = mock.get_or_create_child("assert_caled_once").unwrap_err();
        assert!(matches!(err, Error::UnsafeAttribute { .. }));

        let lenient = Mock::builder().unsafe_access(true).build().unwrap();
        assert!(lenient.get_or_create_child("assert_caled_once").is_ok());
    }

    #[test]
    fn test_repr() {
        let mock = Mock::builder().name("fuga").build().unwrap();
        assert!(mock.to_string().starts_with("<Mock name='fuga' id='"));

        let unnamed = Mock::new();
        assert!(unnamed.to_string().starts_with("<Mock id='"));
        let child = unnamed.get_or_create_child("loads").unwrap();
        assert!(child.to_string().starts_with("<Mock name='mock.loads' id='"));
        assert!(Mock::magic().to_string().starts_with("<MagicMock id='"));
    }

    #[test]
    fn test_handles_are_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Mock>();
        assert_send_sync::<Value>();
    }
}
