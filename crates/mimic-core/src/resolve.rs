//! Return values and side effects.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use crate::call::Call;
use crate::error::{Error, Exception, Result};
use crate::node::{Arena, Held, Mock, NodeId};
use crate::value::Value;

type ComputeFn = dyn Fn(&Call) -> Effect + Send + Sync;

/// Outcome of one call under a side effect.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Raise the exception.
    Raise(Exception),
    /// Fall back to the mock's return value.
    Default,
    /// Return this value.
    Return(Value),
}

impl Effect {
    pub fn value(value: impl Into<Value>) -> Self {
        Effect::Return(value.into())
    }

    pub fn raise(exception: Exception) -> Self {
        Effect::Raise(exception)
    }
}

/// Behavior that takes precedence over the return value.
#[derive(Clone)]
pub enum SideEffect {
    /// Raise on every call.
    Raise(Exception),
    /// Compute the outcome from the call.
    Compute(Arc<ComputeFn>),
    /// Consume one effect per call; calling past the end is an error.
    Sequence(VecDeque<Effect>),
}

impl SideEffect {
    pub fn raise(exception: Exception) -> Self {
        SideEffect::Raise(exception)
    }

    /// A closure deciding each call's outcome.
    ///
    /// To reach the mock it is installed on, capture a
    /// [`WeakMock`](crate::node::WeakMock): a strong handle would keep the
    /// mock tree alive forever.
    pub fn compute(f: impl Fn(&Call) -> Effect + Send + Sync + 'static) -> Self {
        SideEffect::Compute(Arc::new(f))
    }

    pub fn sequence(effects: impl IntoIterator<Item = Effect>) -> Self {
        SideEffect::Sequence(effects.into_iter().collect())
    }
}

impl From<Exception> for SideEffect {
    fn from(exception: Exception) -> Self {
        SideEffect::Raise(exception)
    }
}

impl From<Vec<Effect>> for SideEffect {
    fn from(effects: Vec<Effect>) -> Self {
        SideEffect::Sequence(effects.into())
    }
}

impl fmt::Debug for SideEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SideEffect::Raise(exception) => f.debug_tuple("Raise").field(exception).finish(),
            SideEffect::Compute(_) => f.write_str("Compute(..)"),
            SideEffect::Sequence(effects) => f.debug_tuple("Sequence").field(effects).finish(),
        }
    }
}

/// A side effect as stored in the arena, see [`Held`].
pub(crate) enum Installed {
    Raise(Exception),
    Compute(Arc<ComputeFn>),
    Sequence(VecDeque<HeldEffect>),
}

pub(crate) enum HeldEffect {
    Raise(Exception),
    Default,
    Return(Held),
}

/// Effect chosen while the arena is locked; computed effects run after.
enum Pending {
    Ready(HeldEffect),
    Compute(Arc<ComputeFn>),
}

impl Arena {
    fn check_signature(&self, id: NodeId, call: &Call) -> Result<()> {
        let Some(binding) = &self.node(id).spec else {
            return Ok(());
        };
        let Some(signature) = binding.spec.signature() else {
            return Ok(());
        };
        signature
            .bind(call)
            .map_err(|reason| Error::SignatureMismatch {
                target: self.path(id),
                reason,
            })
    }

    fn next_effect(&mut self, id: NodeId) -> Result<Pending> {
        let pending = match &mut self.node_mut(id).side_effect {
            None => Some(Pending::Ready(HeldEffect::Default)),
            Some(Installed::Raise(exception)) => {
                Some(Pending::Ready(HeldEffect::Raise(exception.clone())))
            }
            Some(Installed::Compute(f)) => Some(Pending::Compute(Arc::clone(f))),
            Some(Installed::Sequence(effects)) => effects.pop_front().map(Pending::Ready),
        };
        pending.ok_or_else(|| Error::SideEffectExhausted {
            mock: self.path(id),
        })
    }
}

impl Mock {
    /// Invoke the mock.
    ///
    /// With a spec the arguments are bound to its signature first; a
    /// mismatch fails without recording the call. Otherwise the call is
    /// recorded on this mock and its ancestors, then the side effect (if
    /// any) decides the outcome, falling back to the return value.
    pub fn call(&self, call: Call) -> Result<Value> {
        let held = self.hold_call(&call);
        let pending = {
            let mut arena = self.arena().lock();
            arena.check_signature(self.id(), &call)?;
            arena.record(self.id(), &held);
            arena.next_effect(self.id())?
        };
        tracing::trace!(mock = %self.path(), call = %call, "mock called");

        let effect = match pending {
            Pending::Ready(HeldEffect::Raise(exception)) => Effect::Raise(exception),
            Pending::Ready(HeldEffect::Default) => Effect::Default,
            Pending::Ready(HeldEffect::Return(held)) => Effect::Return(self.release(&held)),
            Pending::Compute(f) => f(&call),
        };
        match effect {
            Effect::Raise(exception) => {
                tracing::debug!(mock = %self.path(), %exception, "raising side effect");
                Err(Error::Raised(exception))
            }
            Effect::Return(value) => Ok(value),
            Effect::Default => Ok(self.return_value()),
        }
    }

    /// The configured return value, or the memoized default child.
    pub fn return_value(&self) -> Value {
        let mut arena = self.arena().lock();
        if let Some(held) = arena.node(self.id()).return_value.clone() {
            drop(arena);
            return self.release(&held);
        }
        let id = arena.default_return(self.id());
        drop(arena);
        Value::Mock(self.handle(id))
    }

    /// The return value as a mock, for configuring chained calls.
    pub fn return_mock(&self) -> Result<Mock> {
        self.return_value()
            .into_mock()
            .ok_or_else(|| Error::NotAMock {
                mock: self.path(),
                attribute: "return_value".to_string(),
            })
    }

    pub fn set_return_value(&self, value: impl Into<Value>) {
        let held = self.hold(value.into());
        self.arena().lock().node_mut(self.id()).return_value = Some(held);
    }

    pub fn set_side_effect(&self, side_effect: impl Into<SideEffect>) {
        let installed = match side_effect.into() {
            SideEffect::Raise(exception) => Installed::Raise(exception),
            SideEffect::Compute(f) => Installed::Compute(f),
            SideEffect::Sequence(effects) => Installed::Sequence(
                effects
                    .into_iter()
                    .map(|effect| match effect {
                        Effect::Raise(exception) => HeldEffect::Raise(exception),
                        Effect::Default => HeldEffect::Default,
                        Effect::Return(value) => HeldEffect::Return(self.hold(value)),
                    })
                    .collect(),
            ),
        };
        self.arena().lock().node_mut(self.id()).side_effect = Some(installed);
    }

    pub fn clear_side_effect(&self) {
        self.arena().lock().node_mut(self.id()).side_effect = None;
    }
}
