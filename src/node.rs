//! Base node vocabulary shared by the tree

use std::fmt;

use crate::child::ChildNode;
use crate::parent::ParentNode;
use crate::root::RootNode;
use crate::tag::Tag;

/// Key under which a node is stored in its container.
///
/// Parents hang off the root by injection name; children hang off their
/// anchor by attachment index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeKey {
    Name(String),
    Index(usize),
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKey::Name(name) => write!(f, "{}", name),
            NodeKey::Index(i) => write!(f, "{}", i),
        }
    }
}

/// Anything addressable in the built tree.
pub trait Node {
    fn node_name(&self) -> &str;
}

/// A borrowed reference to any node kind, for heterogeneous lookups.
#[derive(Clone, Copy)]
pub enum NodeRef<'a> {
    Root(&'a RootNode),
    Parent(&'a ParentNode),
    Tag(&'a Tag),
    Child(&'a ChildNode),
}

impl<'a> NodeRef<'a> {
    pub fn name(&self) -> &'a str {
        match self {
            NodeRef::Root(root) => root.node_name(),
            NodeRef::Parent(parent) => parent.node_name(),
            NodeRef::Tag(tag) => tag.node_name(),
            NodeRef::Child(child) => child.node_name(),
        }
    }

    /// Key under which this node is stored in its container: parents and
    /// tags by name, children by attachment index.
    pub fn key(&self) -> NodeKey {
        match self {
            NodeRef::Root(root) => NodeKey::Name(root.node_name().to_string()),
            NodeRef::Parent(parent) => NodeKey::Name(parent.param().to_string()),
            NodeRef::Tag(tag) => NodeKey::Name(tag.node_name().to_string()),
            NodeRef::Child(child) => child.key().clone(),
        }
    }

    pub fn is_parent(&self) -> bool {
        matches!(self, NodeRef::Parent(_))
    }

    pub fn is_tag(&self) -> bool {
        matches!(self, NodeRef::Tag(_))
    }
}
