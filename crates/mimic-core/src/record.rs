//! Call recording and call-history queries.

use std::collections::{BTreeMap, HashSet};

use crate::call::{join_segment, Call};
use crate::node::{Arena, Held, Link, Mock, NodeId, Slot};

/// What [`Mock::reset_mock_with`] clears besides the call history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResetOptions {
    /// Also drop explicitly configured return values.
    pub return_value: bool,
    /// Also drop configured side effects.
    pub side_effect: bool,
}

/// A call as stored in the arena, see [`Held`].
#[derive(Debug, Clone)]
pub(crate) struct HeldCall {
    pub(crate) name: String,
    pub(crate) args: Vec<Held>,
    pub(crate) kwargs: BTreeMap<String, Held>,
}

impl HeldCall {
    fn named(&self, name: &str) -> HeldCall {
        HeldCall {
            name: name.to_string(),
            ..self.clone()
        }
    }
}

impl Arena {
    /// Record `call` on `id` and propagate it to every ancestor.
    ///
    /// Each ancestor receives the call under the path from itself to the
    /// called node. `method_calls` only follows plain attribute links, while
    /// `mock_calls` sees everything.
    pub(crate) fn record(&mut self, id: NodeId, call: &HeldCall) {
        let node = self.node_mut(id);
        node.calls.push(call.clone());
        node.mock_calls.push(call.named(""));

        let mut name = String::new();
        let mut attributes_only = true;
        let mut current = id;
        loop {
            let (parent, segment) = match &self.node(current).link {
                Link::Root => break,
                Link::Attribute { parent, name } => (*parent, name.clone()),
                Link::Magic { parent, name } => {
                    attributes_only = false;
                    (*parent, name.clone())
                }
                Link::ReturnValue { parent } => {
                    attributes_only = false;
                    (*parent, "()".to_string())
                }
            };
            name = join_segment(&segment, &name);
            let named = call.named(&name);
            let parent_node = self.node_mut(parent);
            if attributes_only {
                parent_node.method_calls.push(named.clone());
            }
            parent_node.mock_calls.push(named);
            current = parent;
        }
    }

    /// `id` plus every node reachable through fabricated links.
    fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut seen = HashSet::new();
        let mut stack = vec![id];
        let mut out = Vec::new();
        while let Some(next) = stack.pop() {
            if !seen.insert(next) {
                continue;
            }
            out.push(next);
            let node = self.node(next);
            stack.extend(node.slots.values().filter_map(|slot| match slot {
                Slot::Child(child) => Some(*child),
                Slot::Assigned(_) => None,
            }));
            stack.extend(node.default_return);
        }
        out
    }

    pub(crate) fn reset(&mut self, id: NodeId, options: ResetOptions) {
        for target in self.subtree(id) {
            let node = self.node_mut(target);
            node.calls.clear();
            node.method_calls.clear();
            node.mock_calls.clear();
            if options.return_value {
                node.return_value = None;
            }
            if options.side_effect {
                node.side_effect = None;
            }
        }
    }
}

impl Mock {
    /// Number of direct calls.
    pub fn call_count(&self) -> usize {
        self.arena().lock().node(self.id()).calls.len()
    }

    pub fn called(&self) -> bool {
        self.call_count() > 0
    }

    /// Arguments of the most recent direct call.
    pub fn call_args(&self) -> Option<Call> {
        let last = self.arena().lock().node(self.id()).calls.last().cloned();
        last.map(|call| self.release_call(&call))
    }

    /// All direct calls, oldest first.
    pub fn call_args_list(&self) -> Vec<Call> {
        let calls = self.arena().lock().node(self.id()).calls.clone();
        self.release_calls(&calls)
    }

    /// Calls to attribute children and their descendants, named by path.
    pub fn method_calls(&self) -> Vec<Call> {
        let calls = self.arena().lock().node(self.id()).method_calls.clone();
        self.release_calls(&calls)
    }

    /// Every call to this mock, its children, magic methods and return
    /// values, in order.
    pub fn mock_calls(&self) -> Vec<Call> {
        let calls = self.arena().lock().node(self.id()).mock_calls.clone();
        self.release_calls(&calls)
    }

    pub(crate) fn release_calls(&self, calls: &[HeldCall]) -> Vec<Call> {
        calls.iter().map(|call| self.release_call(call)).collect()
    }

    /// Clear the call history of this mock and everything fabricated below
    /// it. Configuration and children are kept.
    pub fn reset_mock(&self) {
        self.reset_mock_with(ResetOptions::default());
    }

    pub fn reset_mock_with(&self, options: ResetOptions) {
        tracing::debug!(mock = %self.path(), ?options, "resetting mock");
        self.arena().lock().reset(self.id(), options);
    }
}
