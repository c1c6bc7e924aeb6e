//! Reference descriptions used to restrict a mock's shape.
//!
//! A spec is built once from the real type (names, methods and their
//! parameter lists) and consulted on every attribute access and call, instead
//! of introspecting the real type each time.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use crate::call::Call;

/// How a parameter can be bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    PositionalOnly,
    PositionalOrKeyword,
    KeywordOnly,
    /// `*args`
    VarPositional,
    /// `**kwargs`
    VarKeyword,
}

/// One declared parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub kind: ParamKind,
    pub has_default: bool,
}

impl Param {
    fn required(&self) -> bool {
        !self.has_default
            && !matches!(self.kind, ParamKind::VarPositional | ParamKind::VarKeyword)
    }
}

/// A callable's declared parameter list (without the receiver).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signature {
    params: Vec<Param>,
}

impl Signature {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, name: &str, kind: ParamKind, has_default: bool) -> Self {
        self.params.push(Param {
            name: name.to_string(),
            kind,
            has_default,
        });
        self
    }

    /// Required positional-or-keyword parameter.
    pub fn param(self, name: &str) -> Self {
        self.push(name, ParamKind::PositionalOrKeyword, false)
    }

    /// Positional-or-keyword parameter with a default.
    pub fn optional(self, name: &str) -> Self {
        self.push(name, ParamKind::PositionalOrKeyword, true)
    }

    /// Required positional-only parameter.
    pub fn positional_only(self, name: &str) -> Self {
        self.push(name, ParamKind::PositionalOnly, false)
    }

    /// Required keyword-only parameter.
    pub fn keyword_only(self, name: &str) -> Self {
        self.push(name, ParamKind::KeywordOnly, false)
    }

    /// Keyword-only parameter with a default.
    pub fn optional_keyword(self, name: &str) -> Self {
        self.push(name, ParamKind::KeywordOnly, true)
    }

    /// Accept extra positional arguments.
    pub fn var_args(self, name: &str) -> Self {
        self.push(name, ParamKind::VarPositional, false)
    }

    /// Accept extra keyword arguments.
    pub fn var_kwargs(self, name: &str) -> Self {
        self.push(name, ParamKind::VarKeyword, false)
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Check that `call`'s arguments bind to this signature.
    ///
    /// Returns the reason on mismatch, worded after the usual binder
    /// messages ("missing a required argument: 'arg2'").
    pub fn bind(&self, call: &Call) -> Result<(), String> {
        let mut bound: BTreeSet<&str> = BTreeSet::new();
        let positional: Vec<&Param> = self
            .params
            .iter()
            .filter(|p| {
                matches!(
                    p.kind,
                    ParamKind::PositionalOnly | ParamKind::PositionalOrKeyword
                )
            })
            .collect();
        let var_positional = self
            .params
            .iter()
            .any(|p| p.kind == ParamKind::VarPositional);
        let var_keyword = self.params.iter().any(|p| p.kind == ParamKind::VarKeyword);

        if call.args().len() > positional.len() && !var_positional {
            return Err("too many positional arguments".to_string());
        }
        for param in positional.iter().take(call.args().len()) {
            bound.insert(param.name.as_str());
        }

        for key in call.kwargs().keys() {
            match self.params.iter().find(|p| p.name == *key) {
                Some(param) if param.kind == ParamKind::PositionalOnly => {
                    if !var_keyword {
                        return Err(format!(
                            "'{}' parameter is positional only, but was passed as a keyword",
                            key
                        ));
                    }
                }
                Some(param)
                    if matches!(
                        param.kind,
                        ParamKind::PositionalOrKeyword | ParamKind::KeywordOnly
                    ) =>
                {
                    if !bound.insert(param.name.as_str()) {
                        return Err(format!("multiple values for argument '{}'", key));
                    }
                }
                _ => {
                    if !var_keyword {
                        return Err(format!("got an unexpected keyword argument '{}'", key));
                    }
                }
            }
        }

        if let Some(missing) = self
            .params
            .iter()
            .find(|p| p.required() && !bound.contains(p.name.as_str()))
        {
            return Err(format!("missing a required argument: '{}'", missing.name));
        }

        Ok(())
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::with_capacity(self.params.len() + 2);
        let mut star_emitted = false;
        let mut slash_pending = false;
        for param in &self.params {
            if param.kind != ParamKind::PositionalOnly && slash_pending {
                parts.push("/".to_string());
                slash_pending = false;
            }
            let rendered = match param.kind {
                ParamKind::VarPositional => {
                    star_emitted = true;
                    format!("*{}", param.name)
                }
                ParamKind::VarKeyword => format!("**{}", param.name),
                ParamKind::KeywordOnly if !star_emitted => {
                    star_emitted = true;
                    parts.push("*".to_string());
                    param.name.clone()
                }
                ParamKind::PositionalOnly => {
                    slash_pending = true;
                    param.name.clone()
                }
                _ => param.name.clone(),
            };
            if param.has_default {
                parts.push(format!("{}=...", rendered));
            } else {
                parts.push(rendered);
            }
        }
        if slash_pending {
            parts.push("/".to_string());
        }
        write!(f, "({})", parts.join(", "))
    }
}

/// A member declared by a class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Member {
    Attribute,
    Method(Signature),
}

/// Declared shape of a class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassSpec {
    name: String,
    constructor: Option<Signature>,
    members: BTreeMap<String, Member>,
    instance_attributes: BTreeSet<String>,
}

impl ClassSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constructor: None,
            members: BTreeMap::new(),
            instance_attributes: BTreeSet::new(),
        }
    }

    /// Constructor parameters (without the receiver).
    pub fn constructor(mut self, signature: Signature) -> Self {
        self.constructor = Some(signature);
        self
    }

    /// Method parameters (without the receiver).
    pub fn method(mut self, name: impl Into<String>, signature: Signature) -> Self {
        self.members.insert(name.into(), Member::Method(signature));
        self
    }

    /// Class-level attribute.
    pub fn attribute(mut self, name: impl Into<String>) -> Self {
        self.members.insert(name.into(), Member::Attribute);
        self
    }

    /// Attribute that only exists on instances (set by the constructor).
    pub fn instance_attribute(mut self, name: impl Into<String>) -> Self {
        self.instance_attributes.insert(name.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.get(name)
    }
}

/// Restriction applied to a mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Spec {
    /// Plain allow-list of attribute names.
    Names(BTreeSet<String>),
    /// Mimic the class object itself.
    Class(Arc<ClassSpec>),
    /// Mimic an instance of the class.
    Instance(Arc<ClassSpec>),
    /// Mimic a function or bound method.
    Callable { name: String, signature: Signature },
}

impl Spec {
    pub fn names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Spec::Names(names.into_iter().map(Into::into).collect())
    }

    pub fn class(class: ClassSpec) -> Self {
        Spec::Class(Arc::new(class))
    }

    pub fn instance(class: ClassSpec) -> Self {
        Spec::Instance(Arc::new(class))
    }

    pub fn callable(name: impl Into<String>, signature: Signature) -> Self {
        Spec::Callable {
            name: name.into(),
            signature,
        }
    }

    /// Whether `name` is a member of the reference.
    pub fn allows(&self, name: &str) -> bool {
        match self {
            Spec::Names(names) => names.contains(name),
            Spec::Class(class) => class.members.contains_key(name),
            Spec::Instance(class) => {
                class.members.contains_key(name) || class.instance_attributes.contains(name)
            }
            Spec::Callable { .. } => false,
        }
    }

    /// Class the mock reports itself as an instance of.
    pub fn class_name(&self) -> Option<&str> {
        match self {
            Spec::Class(class) | Spec::Instance(class) => Some(class.name()),
            Spec::Callable { .. } => Some("function"),
            Spec::Names(_) => None,
        }
    }

    /// Signature checked when the specced mock itself is called.
    pub fn signature(&self) -> Option<&Signature> {
        match self {
            Spec::Class(class) => class.constructor.as_ref(),
            Spec::Callable { signature, .. } => Some(signature),
            Spec::Instance(_) | Spec::Names(_) => None,
        }
    }

    /// Spec for the child `name` under autospec.
    pub fn child_spec(&self, name: &str) -> Option<Spec> {
        match self {
            Spec::Class(class) | Spec::Instance(class) => match class.member(name)? {
                Member::Method(signature) => Some(Spec::Callable {
                    name: name.to_string(),
                    signature: signature.clone(),
                }),
                Member::Attribute => None,
            },
            Spec::Names(_) | Spec::Callable { .. } => None,
        }
    }

    /// Spec for the return value under autospec: calling a class yields an
    /// instance.
    pub fn return_spec(&self) -> Option<Spec> {
        match self {
            Spec::Class(class) => Some(Spec::Instance(Arc::clone(class))),
            _ => None,
        }
    }
}

/// How far a spec reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpecMode {
    /// Restrict this mock's names and check its own call signature.
    #[default]
    Shallow,
    /// Also spec children and return values, checking method signatures.
    Autospec,
}
