//! Lazy value resolution
//!
//! Each parent's value is computed on first access: `load` produces the base
//! value, then every attached child transforms it in attachment order, and
//! the final output is cached for the rest of the invocation. Tag children
//! run afterwards against the aggregated group view.

use tracing::{debug, trace};

use crate::child::{dispatch, ChildKind};
use crate::context::Context;
use crate::error::ProcessError;
use crate::parent::ParentNode;
use crate::tag::Tag;
use crate::value::Value;

/// Resolves one parent, memoized. The pipeline is strict left-to-right:
/// each stage's output feeds the next stage's input.
pub(crate) fn resolve_parent<'a>(
    parent: &'a ParentNode,
    ctx: &Context<'a>,
) -> Result<&'a Value, ProcessError> {
    if let Some(value) = parent.value() {
        return Ok(value);
    }
    if !parent.begin_resolve() {
        return Err(ProcessError::Cycle {
            param: parent.param().to_string(),
        });
    }

    let loaded = match parent.load(ctx.input()) {
        Ok(value) => value,
        Err(e) => {
            parent.abort_resolve();
            return Err(e);
        }
    };
    debug!(
        parent = %parent.name(),
        provided = parent.was_provided(),
        base = %loaded.type_name(),
        "loaded base value"
    );

    let mut value = loaded;
    for child in parent.children() {
        let scoped = ctx.scoped_parent(parent, Some(child));
        match child.kind() {
            ChildKind::Value(handler) => {
                value = match dispatch(handler.as_ref(), value, &scoped) {
                    Ok(next) => next,
                    Err(e) => {
                        parent.abort_resolve();
                        return Err(e);
                    }
                };
                trace!(parent = %parent.name(), child = %child.name(), "stage done");
            }
            // Rejected at build time; nothing to run here.
            ChildKind::Group(_) => continue,
        }
    }

    Ok(parent.store(value))
}

/// Runs a tag's group handlers against the aggregated member values.
/// Handler output is not fed back into any parameter.
pub(crate) fn run_tag_children<'a>(tag: &'a Tag, ctx: &Context<'a>) -> Result<(), ProcessError> {
    if tag.children().is_empty() {
        return Ok(());
    }
    let values = tag.get_value(ctx)?;
    debug!(tag = %tag.name(), members = values.len(), "running group handlers");
    for child in tag.children() {
        if let ChildKind::Group(handler) = child.kind() {
            let scoped = ctx.scoped_tag(tag, Some(child));
            handler.handle_tag(&values, &scoped)?;
        }
    }
    Ok(())
}
