//! Tags: named cross-parameter groups
//!
//! A tag collects parents that declared it and gives group handlers a single
//! aggregated view of their values, for invariants like "at least one of
//! these" or mutual exclusion.

use crate::child::{ChildNode, TagValues};
use crate::context::Context;
use crate::error::ProcessError;
use crate::node::Node;

/// A named, unordered group of parent nodes.
pub struct Tag {
    name: String,
    /// Member parent names, in parent declaration order. Populated by the
    /// build pass from each parent's `tags` list.
    pub(crate) members: Vec<String>,
    pub(crate) children: Vec<ChildNode>,
}

impl Node for Tag {
    fn node_name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tag")
            .field("name", &self.name)
            .field("members", &self.members)
            .field("children", &self.children.len())
            .finish()
    }
}

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn members(&self) -> &[String] {
        &self.members
    }

    pub fn children(&self) -> &[ChildNode] {
        &self.children
    }

    /// Aggregates member values, resolving members that have not been
    /// resolved yet. First accessor pays; later accessors hit the caches.
    pub fn get_value(&self, ctx: &Context<'_>) -> Result<TagValues, ProcessError> {
        let mut out = TagValues::new();
        for member in &self.members {
            let parent = ctx.parent(member).ok_or_else(|| {
                ProcessError::Failed(format!(
                    "tag '{}' references unknown parent '{}'",
                    self.name, member
                ))
            })?;
            let value = ctx.resolve(parent)?;
            out.insert(member.clone(), value.clone());
        }
        Ok(out)
    }

    /// Member names the user explicitly provided, in declaration order.
    pub fn get_provided_values(&self, ctx: &Context<'_>) -> Vec<String> {
        self.members
            .iter()
            .filter(|member| {
                ctx.parent(member)
                    .map(|p| ctx.is_provided(p))
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }
}
