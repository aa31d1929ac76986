//! Processors: per-value handlers and group (tag) handlers
//!
//! A processor attached under a parent sees one value at a time and is
//! dispatched by the value's runtime category; a processor attached under a
//! tag sees the whole group's value map and is validation/side-effect only.
//! The two capabilities are separate traits so the modes cannot be confused;
//! which one a [`ChildNode`] carries is fixed at declaration time.

use futures::future::LocalBoxFuture;
use indexmap::IndexMap;

use crate::context::Context;
use crate::error::ProcessError;
use crate::node::{Node, NodeKey};
use crate::value::Value;

/// Aggregated values of a tag's members, in declaration order.
pub type TagValues = IndexMap<String, Value>;

/// A per-value validator/transformer.
///
/// Only override the categories you care about. Each category method
/// defaults to [`handle_all`](ValueHandler::handle_all), which itself
/// defaults to passing the value through unchanged, so an unimplemented
/// category is a no-op rather than an error.
pub trait ValueHandler {
    /// Stable name used in diagnostics and tree dumps.
    fn name(&self) -> &str;

    /// Asynchronous variant. When this returns a future, the dispatcher
    /// drives it to completion before the next pipeline stage runs and the
    /// synchronous handlers are skipped for this stage.
    fn handle_future<'a>(
        &'a self,
        _value: &'a Value,
        _ctx: &'a Context<'a>,
    ) -> Option<LocalBoxFuture<'a, Result<Value, ProcessError>>> {
        None
    }

    fn handle_str(&self, value: String, ctx: &Context<'_>) -> Result<Value, ProcessError> {
        self.handle_all(Value::Str(value), ctx)
    }

    fn handle_int(&self, value: i64, ctx: &Context<'_>) -> Result<Value, ProcessError> {
        self.handle_all(Value::Int(value), ctx)
    }

    fn handle_float(&self, value: f64, ctx: &Context<'_>) -> Result<Value, ProcessError> {
        self.handle_all(Value::Float(value), ctx)
    }

    fn handle_bool(&self, value: bool, ctx: &Context<'_>) -> Result<Value, ProcessError> {
        self.handle_all(Value::Bool(value), ctx)
    }

    fn handle_list(&self, value: Vec<Value>, ctx: &Context<'_>) -> Result<Value, ProcessError> {
        self.handle_all(Value::List(value), ctx)
    }

    /// Fallback for any category without a specific handler.
    fn handle_all(&self, value: Value, _ctx: &Context<'_>) -> Result<Value, ProcessError> {
        Ok(value)
    }
}

/// A group validator attached under a tag.
///
/// Receives the tag's aggregated member values; the return is not fed back
/// into any parameter, so implementations validate or observe, never
/// transform.
pub trait TagHandler {
    fn name(&self) -> &str;

    fn handle_tag(&self, values: &TagValues, ctx: &Context<'_>) -> Result<(), ProcessError>;
}

/// Which capability a child carries, fixed by how it was declared.
pub enum ChildKind {
    Value(Box<dyn ValueHandler>),
    Group(Box<dyn TagHandler>),
}

/// A declared processor, attached under exactly one parent or tag.
pub struct ChildNode {
    name: String,
    kind: ChildKind,
    /// Position under the anchor, stamped by the build pass.
    key: NodeKey,
}

impl Node for ChildNode {
    fn node_name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for ChildNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.kind {
            ChildKind::Value(_) => "value",
            ChildKind::Group(_) => "group",
        };
        f.debug_struct("ChildNode")
            .field("name", &self.name)
            .field("kind", &kind)
            .finish()
    }
}

impl ChildNode {
    pub fn value(handler: impl ValueHandler + 'static) -> Self {
        Self {
            name: handler.name().to_string(),
            kind: ChildKind::Value(Box::new(handler)),
            key: NodeKey::Index(0),
        }
    }

    pub fn group(handler: impl TagHandler + 'static) -> Self {
        Self {
            name: handler.name().to_string(),
            kind: ChildKind::Group(Box::new(handler)),
            key: NodeKey::Index(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Position under the anchor, in attachment order.
    pub fn key(&self) -> &NodeKey {
        &self.key
    }

    pub(crate) fn set_key(&mut self, key: NodeKey) {
        self.key = key;
    }

    pub fn kind(&self) -> &ChildKind {
        &self.kind
    }

    /// Whether this child requires a tag anchor.
    pub fn is_group(&self) -> bool {
        matches!(self.kind, ChildKind::Group(_))
    }
}

/// Routes one value through one handler.
///
/// `None` values skip the handler entirely: defaults were substituted during
/// `load`, so `None` means "declared with no default and not provided" and
/// there is nothing to validate or transform.
pub(crate) fn dispatch(
    handler: &dyn ValueHandler,
    value: Value,
    ctx: &Context<'_>,
) -> Result<Value, ProcessError> {
    if value.is_none() {
        return Ok(value);
    }
    if let Some(fut) = handler.handle_future(&value, ctx) {
        return futures::executor::block_on(fut);
    }
    match value {
        Value::Str(s) => handler.handle_str(s, ctx),
        Value::Int(i) => handler.handle_int(i, ctx),
        Value::Float(x) => handler.handle_float(x, ctx),
        Value::Bool(b) => handler.handle_bool(b, ctx),
        Value::List(items) => handler.handle_list(items, ctx),
        Value::None => Ok(Value::None),
    }
}
