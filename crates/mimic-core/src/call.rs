//! Recorded invocations.

use std::collections::BTreeMap;
use std::fmt;

use crate::value::Value;

/// One invocation: dotted name, positional arguments and keyword arguments.
///
/// The name is relative to the mock holding the record. It is empty for a
/// direct call, a dotted attribute path for calls made on children
/// (`some_attr.some_method`), and uses `()` to mark a call on a return value
/// (`loads().get`).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Call {
    name: String,
    args: Vec<Value>,
    kwargs: BTreeMap<String, Value>,
}

impl Call {
    /// An empty call with no name and no arguments.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a positional argument.
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    /// Add a keyword argument.
    pub fn kwarg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.kwargs.insert(key.into(), value.into());
        self
    }

    /// Set the dotted name, e.g. `"some_attr.some_method"`.
    pub fn on(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn kwargs(&self) -> &BTreeMap<String, Value> {
        &self.kwargs
    }

    /// Positional argument at `index`.
    pub fn arg_at(&self, index: usize) -> Option<&Value> {
        self.args.get(index)
    }

    /// Keyword argument by name.
    pub fn kwarg_named(&self, key: &str) -> Option<&Value> {
        self.kwargs.get(key)
    }

    /// Whether arguments match, ignoring the name.
    pub fn same_args(&self, other: &Call) -> bool {
        self.args == other.args && self.kwargs == other.kwargs
    }

    /// Render the call as `prefix(args)`.
    pub fn render_as(&self, prefix: &str) -> String {
        format!("{}({})", prefix, self.render_args())
    }

    fn render_args(&self) -> String {
        self.args
            .iter()
            .map(|v| v.to_string())
            .chain(self.kwargs.iter().map(|(k, v)| format!("{}={}", k, v)))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            f.write_str(&self.render_as("call"))
        } else if self.name.starts_with('(') {
            // Calls on the root's return value: `call()(1)`.
            f.write_str(&self.render_as(&format!("call{}", self.name)))
        } else {
            f.write_str(&self.render_as(&format!("call.{}", self.name)))
        }
    }
}

/// Join a path segment in front of an already built call name.
///
/// `()` segments attach without a dot, so `join_segment("loads", "().get")`
/// is `loads().get`.
pub(crate) fn join_segment(segment: &str, rest: &str) -> String {
    if rest.is_empty() {
        segment.to_string()
    } else if rest.starts_with('(') {
        format!("{}{}", segment, rest)
    } else {
        format!("{}.{}", segment, rest)
    }
}

/// Render a list of calls as `[call(..), call.x(..)]`.
pub(crate) fn render_list(calls: &[Call]) -> String {
    let items: Vec<String> = calls.iter().map(|c| c.to_string()).collect();
    format!("[{}]", items.join(", "))
}

/// Build a [`Call`] from positional and keyword arguments.
///
/// ```
/// use mimic_core::call;
///
/// let c = call!("{}", 1; hoge = "fuga");
/// assert_eq!(c.args().len(), 2);
/// assert_eq!(c.to_string(), "call('{}', 1, hoge='fuga')");
/// ```
#[macro_export]
macro_rules! call {
    () => {
        $crate::Call::new()
    };
    ($($arg:expr),+ $(,)?) => {
        $crate::Call::new()$(.arg($arg))+
    };
    ($($arg:expr),* ; $($key:ident = $val:expr),+ $(,)?) => {
        $crate::Call::new()$(.arg($arg))*$(.kwarg(stringify!($key), $val))+
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_return_value_call_display() {
        assert_eq!(Call::new().arg(1).on("()").to_string(), "call()(1)");
        assert_eq!(Call::new().on("().get").to_string(), "call().get()");
        assert_eq!(Call::new().on("get().json").to_string(), "call.get().json()");
    }

    #[test]
    fn test_call_display() {
        let c = Call::new().arg("x").kwarg("hoge", "fuga");
        assert_eq!(c.to_string(), "call('x', hoge='fuga')");

        let c = Call::new().arg("y").on("loads().get");
        assert_eq!(c.to_string(), "call.loads().get('y')");
    }

    #[test]
    fn test_call_macro_forms() {
        assert_eq!(crate::call!(), Call::new());
        assert_eq!(crate::call!(1, "a"), Call::new().arg(1).arg("a"));
        assert_eq!(
            crate::call!(; hoge = "fuga"),
            Call::new().kwarg("hoge", "fuga")
        );
        assert_eq!(
            crate::call!("k"; a = 1, b = 2),
            Call::new().arg("k").kwarg("a", 1).kwarg("b", 2)
        );
    }

    #[test]
    fn test_equality_includes_name() {
        let a = Call::new().arg(1).on("loads");
        let b = Call::new().arg(1);
        assert_ne!(a, b);
        assert!(a.same_args(&b));
    }

    #[test]
    fn test_join_segment() {
        assert_eq!(join_segment("loads", ""), "loads");
        assert_eq!(join_segment("loads", "().get"), "loads().get");
        assert_eq!(join_segment("()", "get"), "().get");
        assert_eq!(join_segment("a", "b.c"), "a.b.c");
    }
}
