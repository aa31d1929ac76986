//! Value sources: options, positional arguments, environment variables
//!
//! A `ParentNode` owns the shared metadata (injection name, help, default,
//! tags) plus a closed [`ParentKind`] describing where its raw value comes
//! from, and carries the per-invocation resolution state: a value computed
//! lazily, at most once, then cached.

use std::cell::{Cell, OnceCell};
use std::collections::HashMap;

use crate::child::ChildNode;
use crate::error::ProcessError;
use crate::host::{RawInput, RawValue};
use crate::node::Node;
use crate::value::{Value, ValueType};

/// Where a parent's raw value comes from.
#[derive(Debug)]
pub enum ParentKind {
    Opt(OptSpec),
    Arg(ArgSpec),
    Env(EnvSpec),
}

#[derive(Debug)]
pub struct OptSpec {
    pub long: String,
    pub short: Option<char>,
    pub value_type: ValueType,
    pub flag: bool,
    pub multiple: bool,
}

#[derive(Debug)]
pub struct ArgSpec {
    pub value_type: ValueType,
    pub multiple: bool,
}

#[derive(Debug)]
pub struct EnvSpec {
    pub var: String,
    pub value_type: ValueType,
}

/// A declared value source and its processing pipeline.
pub struct ParentNode {
    name: String,
    param: String,
    help: Option<String>,
    required: bool,
    default: Option<Value>,
    tags: Vec<String>,
    extra: HashMap<String, serde_json::Value>,
    kind: ParentKind,
    pub(crate) children: Vec<ChildNode>,

    // Per-invocation resolution state. The whole engine is single-threaded
    // (one linear pass per invocation), so cells are sufficient.
    cached: OnceCell<Value>,
    provided: Cell<bool>,
    resolving: Cell<bool>,
}

impl std::fmt::Debug for ParentNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParentNode")
            .field("name", &self.name)
            .field("param", &self.param)
            .field("kind", &self.kind)
            .field("children", &self.children.len())
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

impl Node for ParentNode {
    fn node_name(&self) -> &str {
        &self.name
    }
}

impl ParentNode {
    pub(crate) fn new(
        name: String,
        param: Option<String>,
        help: Option<String>,
        required: bool,
        default: Option<Value>,
        tags: Vec<String>,
        extra: HashMap<String, serde_json::Value>,
        kind: ParentKind,
    ) -> Self {
        let param = param.unwrap_or_else(|| name.replace('-', "_"));
        Self {
            name,
            param,
            help,
            required,
            default,
            tags,
            extra,
            kind,
            children: Vec::new(),
            cached: OnceCell::new(),
            provided: Cell::new(false),
            resolving: Cell::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Injection name: the key the final value is published under.
    pub fn param(&self) -> &str {
        &self.param
    }

    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    pub fn required(&self) -> bool {
        self.required
    }

    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Free-form metadata attached at declaration time.
    pub fn extra(&self) -> &HashMap<String, serde_json::Value> {
        &self.extra
    }

    pub fn kind(&self) -> &ParentKind {
        &self.kind
    }

    pub fn is_option(&self) -> bool {
        matches!(self.kind, ParentKind::Opt(_))
    }

    pub fn is_argument(&self) -> bool {
        matches!(self.kind, ParentKind::Arg(_))
    }

    pub fn is_env(&self) -> bool {
        matches!(self.kind, ParentKind::Env(_))
    }

    pub fn children(&self) -> &[ChildNode] {
        &self.children
    }

    /// Whether the user explicitly supplied this value (set by `load`).
    pub fn was_provided(&self) -> bool {
        self.provided.get()
    }

    /// The final value, if this parent has been resolved.
    pub fn value(&self) -> Option<&Value> {
        self.cached.get()
    }

    pub fn is_resolved(&self) -> bool {
        self.cached.get().is_some()
    }

    /// Produces the base value for the pipeline and records `was_provided`.
    ///
    /// Required options and arguments are enforced by the host parser before
    /// the core runs; required environment variables are enforced here since
    /// the parser never sees them.
    pub(crate) fn load(&self, input: &RawInput) -> Result<Value, ProcessError> {
        match &self.kind {
            ParentKind::Opt(spec) => self.load_raw(input, spec.value_type),
            ParentKind::Arg(spec) => self.load_raw(input, spec.value_type),
            ParentKind::Env(spec) => match input.env(&spec.var) {
                Some(raw) => {
                    self.provided.set(true);
                    spec.value_type
                        .coerce(raw)
                        .map_err(|e| ProcessError::invalid(&self.param, e))
                }
                None => {
                    self.provided.set(false);
                    if self.required && self.default.is_none() {
                        return Err(ProcessError::MissingEnv {
                            param: self.param.clone(),
                            var: spec.var.clone(),
                        });
                    }
                    Ok(self.default.clone().unwrap_or(Value::None))
                }
            },
        }
    }

    fn load_raw(&self, input: &RawInput, value_type: ValueType) -> Result<Value, ProcessError> {
        match input.raw(&self.param) {
            Some(RawValue::Single(s)) => {
                self.provided.set(true);
                value_type
                    .coerce(s)
                    .map_err(|e| ProcessError::invalid(&self.param, e))
            }
            Some(RawValue::Many(items)) => {
                self.provided.set(true);
                value_type
                    .coerce_many(items)
                    .map_err(|e| ProcessError::invalid(&self.param, e))
            }
            Some(RawValue::Flag(b)) => {
                self.provided.set(true);
                Ok(Value::Bool(*b))
            }
            None => {
                self.provided.set(false);
                Ok(self.default.clone().unwrap_or(Value::None))
            }
        }
    }

    /// Marks resolution in flight; `false` means it already was (a cycle).
    pub(crate) fn begin_resolve(&self) -> bool {
        if self.resolving.get() {
            return false;
        }
        self.resolving.set(true);
        true
    }

    /// Stores the pipeline output. First write wins; later calls are no-ops
    /// returning the original, which keeps resolution at-most-once.
    pub(crate) fn store(&self, value: Value) -> &Value {
        self.resolving.set(false);
        self.cached.get_or_init(|| value)
    }

    pub(crate) fn abort_resolve(&self) {
        self.resolving.set(false);
    }

    /// Clears per-invocation state so the next invocation starts fresh.
    pub(crate) fn reset(&mut self) {
        self.cached = OnceCell::new();
        self.provided.set(false);
        self.resolving.set(false);
    }
}

/// Builder for a command-line option.
#[derive(Debug, Default)]
pub struct Opt {
    name: String,
    param: Option<String>,
    long: Option<String>,
    short: Option<char>,
    help: Option<String>,
    required: bool,
    default: Option<Value>,
    tags: Vec<String>,
    extra: HashMap<String, serde_json::Value>,
    value_type: ValueType,
    flag: bool,
    multiple: bool,
}

impl Opt {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Overrides the injection name (defaults to the declared name with
    /// hyphens mapped to underscores).
    pub fn param(mut self, param: impl Into<String>) -> Self {
        self.param = Some(param.into());
        self
    }

    /// Overrides the long flag (defaults to `--kebab-case` of the name).
    pub fn long(mut self, long: impl Into<String>) -> Self {
        self.long = Some(long.into());
        self
    }

    pub fn short(mut self, short: char) -> Self {
        self.short = Some(short);
        self
    }

    pub fn help(mut self, text: impl Into<String>) -> Self {
        self.help = Some(text.into());
        self
    }

    pub fn required(mut self, yes: bool) -> Self {
        self.required = yes;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn value_type(mut self, vt: ValueType) -> Self {
        self.value_type = vt;
        self
    }

    /// Declares a boolean flag (no value token; absent means `false`).
    pub fn flag(mut self) -> Self {
        self.flag = true;
        self
    }

    /// Allows repeated occurrences, producing a list value.
    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    pub fn meta(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    pub(crate) fn into_node(self) -> ParentNode {
        let long = self
            .long
            .unwrap_or_else(|| self.name.replace('_', "-"));
        let default = if self.flag && self.default.is_none() {
            Some(Value::Bool(false))
        } else {
            self.default
        };
        let kind = ParentKind::Opt(OptSpec {
            long,
            short: self.short,
            value_type: self.value_type,
            flag: self.flag,
            multiple: self.multiple,
        });
        ParentNode::new(
            self.name,
            self.param,
            self.help,
            self.required,
            default,
            self.tags,
            self.extra,
            kind,
        )
    }
}

/// Builder for a positional argument.
#[derive(Debug, Default)]
pub struct Arg {
    name: String,
    param: Option<String>,
    help: Option<String>,
    required: bool,
    default: Option<Value>,
    tags: Vec<String>,
    extra: HashMap<String, serde_json::Value>,
    value_type: ValueType,
    multiple: bool,
}

impl Arg {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn param(mut self, param: impl Into<String>) -> Self {
        self.param = Some(param.into());
        self
    }

    pub fn help(mut self, text: impl Into<String>) -> Self {
        self.help = Some(text.into());
        self
    }

    pub fn required(mut self, yes: bool) -> Self {
        self.required = yes;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn value_type(mut self, vt: ValueType) -> Self {
        self.value_type = vt;
        self
    }

    /// Accepts any number of trailing tokens, producing a list value.
    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    pub(crate) fn into_node(self) -> ParentNode {
        let kind = ParentKind::Arg(ArgSpec {
            value_type: self.value_type,
            multiple: self.multiple,
        });
        ParentNode::new(
            self.name,
            self.param,
            self.help,
            self.required,
            self.default,
            self.tags,
            self.extra,
            kind,
        )
    }
}

/// Builder for an environment-variable source.
#[derive(Debug, Default)]
pub struct EnvVar {
    name: String,
    var: String,
    param: Option<String>,
    help: Option<String>,
    required: bool,
    default: Option<Value>,
    tags: Vec<String>,
    extra: HashMap<String, serde_json::Value>,
    value_type: ValueType,
}

impl EnvVar {
    pub fn new(name: impl Into<String>, var: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            var: var.into(),
            ..Self::default()
        }
    }

    pub fn param(mut self, param: impl Into<String>) -> Self {
        self.param = Some(param.into());
        self
    }

    pub fn help(mut self, text: impl Into<String>) -> Self {
        self.help = Some(text.into());
        self
    }

    pub fn required(mut self, yes: bool) -> Self {
        self.required = yes;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn value_type(mut self, vt: ValueType) -> Self {
        self.value_type = vt;
        self
    }

    pub(crate) fn into_node(self) -> ParentNode {
        let kind = ParentKind::Env(EnvSpec {
            var: self.var,
            value_type: self.value_type,
        });
        ParentNode::new(
            self.name,
            self.param,
            self.help,
            self.required,
            self.default,
            self.tags,
            self.extra,
            kind,
        )
    }
}
