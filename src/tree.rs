//! Tree assembly: registration queue, build pass, name validation
//!
//! Registrations are queued in builder-call order and committed in one pass
//! when the root is constructed. Children carry no explicit parent
//! reference; each one attaches to the most recently registered anchor
//! (parent or tag), which is exactly the adjacency the builder call order
//! encodes.

use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::debug;

use crate::child::ChildNode;
use crate::error::BuildError;
use crate::node::{Node, NodeKey};
use crate::parent::ParentNode;
use crate::root::RootNode;
use crate::tag::Tag;

/// A queued registration, not yet attached to the tree.
#[derive(Debug)]
pub enum Pending {
    Parent(ParentNode),
    Child(ChildNode),
    Tag(Tag),
}

/// Per-root registration queue plus the built graph.
///
/// One `Tree` per root command; the queue is instance state, so two roots
/// under construction never observe each other's registrations.
#[derive(Debug)]
pub struct Tree {
    pending: Vec<Pending>,
    root: Option<RootNode>,
    tags: IndexMap<String, Tag>,
    /// Free-form storage for extensions built on top of the engine.
    pub data: HashMap<String, serde_json::Value>,
    /// Attachment anchors: queue sequence number of the most recently
    /// registered parent / tag, plus its lookup key.
    recent: Option<(usize, String)>,
    recent_tag: Option<(usize, String)>,
    is_validated: bool,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            root: None,
            tags: IndexMap::new(),
            data: HashMap::new(),
            recent: None,
            recent_tag: None,
            is_validated: false,
        }
    }

    pub fn queue_parent(&mut self, node: ParentNode) {
        self.pending.push(Pending::Parent(node));
    }

    pub fn queue_child(&mut self, node: ChildNode) {
        self.pending.push(Pending::Child(node));
    }

    pub fn queue_tag(&mut self, node: Tag) {
        self.pending.push(Pending::Tag(node));
    }

    /// Drains the queue. A second call right after returns empty.
    pub fn get_pending_nodes(&mut self) -> Vec<Pending> {
        std::mem::take(&mut self.pending)
    }

    pub fn register_root(&mut self, root: RootNode) -> Result<(), BuildError> {
        if self.root.is_some() {
            return Err(BuildError::RootExists);
        }
        self.root = Some(root);
        Ok(())
    }

    pub fn root(&self) -> Option<&RootNode> {
        self.root.as_ref()
    }

    pub(crate) fn root_mut(&mut self) -> Option<&mut RootNode> {
        self.root.as_mut()
    }

    pub fn tags(&self) -> &IndexMap<String, Tag> {
        &self.tags
    }

    pub fn tag(&self, name: &str) -> Option<&Tag> {
        self.tags.get(name)
    }

    pub fn is_validated(&self) -> bool {
        self.is_validated
    }

    /// Commits the queue into the tree and validates the name space.
    ///
    /// Idempotent: once validated, later calls (nested sub-invocations) are
    /// no-ops and never re-register anything.
    pub fn validate_and_build(&mut self) -> Result<(), BuildError> {
        if self.is_validated {
            return Ok(());
        }

        let pending = self.get_pending_nodes();
        for (seq, item) in pending.into_iter().enumerate() {
            match item {
                Pending::Parent(node) => {
                    let key = node.param().to_string();
                    let root = self.root.as_mut().ok_or(BuildError::NoRoot)?;
                    if root.children.contains_key(&key) {
                        return Err(BuildError::ParentExists(key));
                    }
                    debug!(parent = %node.name(), key = %key, "registering parent");
                    root.children.insert(key.clone(), node);
                    self.recent = Some((seq, key));
                }
                Pending::Tag(tag) => {
                    let name = tag.name().to_string();
                    if self.tags.contains_key(&name) {
                        return Err(BuildError::NameExists {
                            name: name.clone(),
                            tip: "declare each tag once; parents join it via their tags list"
                                .to_string(),
                        });
                    }
                    debug!(tag = %name, "registering tag");
                    self.tags.insert(name.clone(), tag);
                    self.recent_tag = Some((seq, name));
                }
                Pending::Child(child) => self.attach_child(child)?,
            }
        }

        self.populate_tag_members();
        self.validate_names()?;
        self.is_validated = true;
        Ok(())
    }

    /// Attaches a child to the most recently registered anchor. When a
    /// parent and a tag were both registered earlier, the one with the
    /// higher sequence number wins.
    fn attach_child(&mut self, mut child: ChildNode) -> Result<(), BuildError> {
        let parent_seq = self.recent.as_ref().map(|(seq, _)| *seq);
        let tag_seq = self.recent_tag.as_ref().map(|(seq, _)| *seq);

        let tag_is_anchor = match (parent_seq, tag_seq) {
            (None, None) => {
                return Err(BuildError::NoParent(child.name().to_string()));
            }
            (Some(p), Some(t)) => t > p,
            (None, Some(_)) => true,
            (Some(_), None) => false,
        };

        if tag_is_anchor {
            let tag_name = self
                .recent_tag
                .as_ref()
                .map(|(_, name)| name.clone())
                .ok_or_else(|| BuildError::NoParent(child.name().to_string()))?;
            if !child.is_group() {
                return Err(BuildError::TagHandlerMissing {
                    tag: tag_name,
                    child: child.name().to_string(),
                });
            }
            debug!(tag = %tag_name, child = %child.name(), "attaching group child");
            let tag = self
                .tags
                .get_mut(&tag_name)
                .ok_or_else(|| BuildError::NoParent(child.name().to_string()))?;
            child.set_key(NodeKey::Index(tag.children.len()));
            tag.children.push(child);
        } else {
            let key = self
                .recent
                .as_ref()
                .map(|(_, key)| key.clone())
                .ok_or_else(|| BuildError::NoParent(child.name().to_string()))?;
            let parent = self
                .root
                .as_mut()
                .and_then(|root| root.children.get_mut(&key))
                .ok_or_else(|| BuildError::NoParent(child.name().to_string()))?;
            if child.is_group() {
                return Err(BuildError::GroupHandlerMisplaced {
                    parent: parent.name().to_string(),
                    child: child.name().to_string(),
                });
            }
            debug!(parent = %parent.name(), child = %child.name(), "attaching child");
            child.set_key(NodeKey::Index(parent.children.len()));
            parent.children.push(child);
        }
        Ok(())
    }

    /// Auto-creates tags referenced by parents but never declared, then
    /// fills every tag's member list in parent declaration order.
    fn populate_tag_members(&mut self) {
        let Some(root) = self.root.as_ref() else {
            return;
        };

        let mut referenced: Vec<(String, String)> = Vec::new();
        for parent in root.children.values() {
            for tag in parent.tags() {
                referenced.push((tag.clone(), parent.name().to_string()));
            }
        }

        for tag in self.tags.values_mut() {
            tag.members.clear();
        }
        for (tag_name, parent_name) in referenced {
            let tag = self
                .tags
                .entry(tag_name.clone())
                .or_insert_with(|| Tag::new(tag_name));
            tag.members.push(parent_name);
        }
    }

    /// Scans the parent and tag namespaces for collisions and self-tags.
    fn validate_names(&self) -> Result<(), BuildError> {
        let Some(root) = self.root.as_ref() else {
            return Err(BuildError::NoRoot);
        };

        let mut seen: HashMap<&str, &'static str> = HashMap::new();
        for parent in root.children.values() {
            if let Some(prev) = seen.insert(parent.name(), "parent") {
                return Err(BuildError::NameExists {
                    name: parent.name().to_string(),
                    tip: format!("already used by a {}; rename one of the two", prev),
                });
            }
            if parent.tags().iter().any(|t| t == parent.name()) {
                return Err(BuildError::NameExists {
                    name: parent.name().to_string(),
                    tip: "a parent cannot list its own name as a tag; \
                          pick a distinct tag name"
                        .to_string(),
                });
            }
        }
        for tag in self.tags.keys() {
            if let Some(prev) = seen.insert(tag.as_str(), "tag") {
                return Err(BuildError::NameExists {
                    name: tag.clone(),
                    tip: format!("already used by a {}; rename the tag", prev),
                });
            }
        }
        Ok(())
    }

    /// Prints the tree: root, then parents and tags, then their children.
    pub fn visualize(&self) -> Result<(), BuildError> {
        print!("{}", self.render()?);
        Ok(())
    }

    /// Same text `visualize` prints, for tests and embedding.
    pub fn render(&self) -> Result<String, BuildError> {
        let root = self.root.as_ref().ok_or(BuildError::NoRoot)?;
        let mut out = String::new();
        out.push_str(root.node_name());
        out.push('\n');
        for parent in root.children.values() {
            let kind = if parent.is_option() {
                "option"
            } else if parent.is_argument() {
                "argument"
            } else {
                "env"
            };
            out.push_str(&format!("  {} ({})\n", parent.name(), kind));
            for child in parent.children() {
                out.push_str(&format!("    {}\n", child.name()));
            }
        }
        for tag in self.tags.values() {
            out.push_str(&format!("  {} (tag)\n", tag.name()));
            for child in tag.children() {
                out.push_str(&format!("    {}\n", child.name()));
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::child::{TagValues, ValueHandler};
    use crate::context::Context;
    use crate::error::ProcessError;
    use crate::parent::Opt;
    use crate::value::Value;

    struct Noop;

    impl ValueHandler for Noop {
        fn name(&self) -> &str {
            "noop"
        }
    }

    struct GroupNoop;

    impl crate::child::TagHandler for GroupNoop {
        fn name(&self) -> &str {
            "group_noop"
        }

        fn handle_tag(&self, _values: &TagValues, _ctx: &Context<'_>) -> Result<(), ProcessError> {
            Ok(())
        }
    }

    fn tree_with_root() -> Tree {
        let mut tree = Tree::new();
        tree.register_root(RootNode::new("test".to_string(), None))
            .unwrap();
        tree
    }

    #[test]
    fn second_root_is_rejected() {
        let mut tree = tree_with_root();
        let err = tree
            .register_root(RootNode::new("other".to_string(), None))
            .unwrap_err();
        assert_eq!(err, BuildError::RootExists);
    }

    #[test]
    fn pending_drain_is_idempotent() {
        let mut tree = Tree::new();
        tree.queue_parent(Opt::new("a").into_node());
        assert_eq!(tree.get_pending_nodes().len(), 1);
        assert!(tree.get_pending_nodes().is_empty());
    }

    #[test]
    fn child_attaches_to_nearest_preceding_parent() {
        let mut tree = tree_with_root();
        tree.queue_parent(Opt::new("a").into_node());
        tree.queue_child(ChildNode::value(Noop));
        tree.queue_parent(Opt::new("b").into_node());
        tree.validate_and_build().unwrap();

        let root = tree.root().unwrap();
        assert_eq!(root.children["a"].children().len(), 1);
        assert_eq!(root.children["b"].children().len(), 0);
    }

    #[test]
    fn orphan_child_raises_no_parent() {
        let mut tree = tree_with_root();
        tree.queue_child(ChildNode::value(Noop));
        let err = tree.validate_and_build().unwrap_err();
        assert_eq!(err, BuildError::NoParent("noop".to_string()));
    }

    #[test]
    fn duplicate_parent_key_is_rejected() {
        let mut tree = tree_with_root();
        tree.queue_parent(Opt::new("a").into_node());
        tree.queue_parent(Opt::new("a").into_node());
        let err = tree.validate_and_build().unwrap_err();
        assert_eq!(err, BuildError::ParentExists("a".to_string()));
    }

    #[test]
    fn self_tag_is_a_name_error() {
        let mut tree = tree_with_root();
        tree.queue_parent(Opt::new("a").tag("a").into_node());
        let err = tree.validate_and_build().unwrap_err();
        assert!(matches!(err, BuildError::NameExists { name, .. } if name == "a"));
    }

    #[test]
    fn duplicate_tag_declaration_is_rejected_during_drain() {
        let mut tree = tree_with_root();
        tree.queue_tag(Tag::new("grp"));
        tree.queue_tag(Tag::new("grp"));
        let err = tree.validate_and_build().unwrap_err();
        assert!(matches!(err, BuildError::NameExists { name, .. } if name == "grp"));
    }

    #[test]
    fn tag_name_clashing_with_parent_is_a_name_error() {
        let mut tree = tree_with_root();
        tree.queue_parent(Opt::new("limit").into_node());
        tree.queue_tag(Tag::new("limit"));
        let err = tree.validate_and_build().unwrap_err();
        assert!(matches!(err, BuildError::NameExists { name, .. } if name == "limit"));
    }

    #[test]
    fn value_child_under_tag_fails_fast_naming_both() {
        let mut tree = tree_with_root();
        tree.queue_tag(Tag::new("grp"));
        tree.queue_child(ChildNode::value(Noop));
        let err = tree.validate_and_build().unwrap_err();
        assert_eq!(
            err,
            BuildError::TagHandlerMissing {
                tag: "grp".to_string(),
                child: "noop".to_string(),
            }
        );
    }

    #[test]
    fn group_child_under_parent_fails_fast() {
        let mut tree = tree_with_root();
        tree.queue_parent(Opt::new("a").into_node());
        tree.queue_child(ChildNode::group(GroupNoop));
        let err = tree.validate_and_build().unwrap_err();
        assert_eq!(
            err,
            BuildError::GroupHandlerMisplaced {
                parent: "a".to_string(),
                child: "group_noop".to_string(),
            }
        );
    }

    #[test]
    fn more_recent_anchor_wins() {
        // parent then tag: the tag is the anchor
        let mut tree = tree_with_root();
        tree.queue_parent(Opt::new("a").into_node());
        tree.queue_tag(Tag::new("grp"));
        tree.queue_child(ChildNode::group(GroupNoop));
        tree.validate_and_build().unwrap();
        assert_eq!(tree.tag("grp").unwrap().children().len(), 1);

        // tag then parent: the parent is the anchor
        let mut tree = tree_with_root();
        tree.queue_tag(Tag::new("grp"));
        tree.queue_parent(Opt::new("a").into_node());
        tree.queue_child(ChildNode::value(Noop));
        tree.validate_and_build().unwrap();
        assert_eq!(tree.root().unwrap().children["a"].children().len(), 1);
        assert_eq!(tree.tag("grp").unwrap().children().len(), 0);
    }

    #[test]
    fn referenced_tags_are_auto_created_with_members_in_order() {
        let mut tree = tree_with_root();
        tree.queue_parent(Opt::new("x").tag("grp").into_node());
        tree.queue_parent(Opt::new("y").tag("grp").into_node());
        tree.validate_and_build().unwrap();

        let tag = tree.tag("grp").unwrap();
        assert_eq!(tag.members(), ["x", "y"]);
        assert!(tag.children().is_empty());
    }

    #[test]
    fn build_is_idempotent() {
        let mut tree = tree_with_root();
        tree.queue_parent(Opt::new("a").into_node());
        tree.validate_and_build().unwrap();
        assert!(tree.is_validated());

        // queued nodes after validation are never committed by a re-entry
        tree.queue_parent(Opt::new("b").into_node());
        tree.validate_and_build().unwrap();
        assert_eq!(tree.root().unwrap().children.len(), 1);
    }

    #[test]
    fn render_shows_hierarchy() {
        let mut tree = tree_with_root();
        tree.queue_parent(Opt::new("name").into_node());
        tree.queue_child(ChildNode::value(Noop));
        tree.queue_tag(Tag::new("grp"));
        tree.validate_and_build().unwrap();

        let text = tree.render().unwrap();
        assert_eq!(text, "test\n  name (option)\n    noop\n  grp (tag)\n");
    }

    #[test]
    fn visualize_without_root_is_an_error() {
        let tree = Tree::new();
        assert_eq!(tree.render().unwrap_err(), BuildError::NoRoot);
    }
}
