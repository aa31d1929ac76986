//! Per-invocation context handed to processor code
//!
//! A `Context` is a read-only view over the built tree, the invocation's raw
//! input, and the node currently being processed. Handlers use it to look at
//! the rest of the tree: siblings, tagged groups, provided/missing sets, and
//! other parents' values (triggering their lazy resolution when needed).

use indexmap::IndexMap;

use crate::child::ChildNode;
use crate::config;
use crate::error::{ContextError, ProcessError};
use crate::host::RawInput;
use crate::node::{Node, NodeRef};
use crate::parent::{ParentKind, ParentNode};
use crate::resolve;
use crate::root::RootNode;
use crate::tag::Tag;
use crate::tree::Tree;
use crate::value::Value;

/// The node whose pipeline is currently executing.
#[derive(Clone, Copy)]
pub(crate) enum Scope<'a> {
    None,
    Parent {
        parent: &'a ParentNode,
        child: Option<&'a ChildNode>,
    },
    Tag {
        tag: &'a Tag,
        child: Option<&'a ChildNode>,
    },
}

/// Read-only facade over one invocation. Never shared across invocations.
#[derive(Clone, Copy)]
pub struct Context<'a> {
    tree: &'a Tree,
    root: &'a RootNode,
    input: &'a RawInput,
    scope: Scope<'a>,
    debug: bool,
}

impl<'a> Context<'a> {
    pub(crate) fn new(tree: &'a Tree, root: &'a RootNode, input: &'a RawInput) -> Self {
        Self {
            tree,
            root,
            input,
            scope: Scope::None,
            debug: config::debug_enabled(),
        }
    }

    pub(crate) fn scoped_parent(
        &self,
        parent: &'a ParentNode,
        child: Option<&'a ChildNode>,
    ) -> Self {
        Self {
            scope: Scope::Parent { parent, child },
            ..*self
        }
    }

    pub(crate) fn scoped_tag(&self, tag: &'a Tag, child: Option<&'a ChildNode>) -> Self {
        Self {
            scope: Scope::Tag { tag, child },
            ..*self
        }
    }

    pub(crate) fn input(&self) -> &'a RawInput {
        self.input
    }

    /// Debug toggle (see [`config::DEBUG_ENV`]).
    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn root(&self) -> &'a RootNode {
        self.root
    }

    /// Looks up a parent by name (injection name also accepted).
    pub fn parent(&self, name: &str) -> Option<&'a ParentNode> {
        self.root
            .children
            .get(name)
            .or_else(|| self.root.children.values().find(|p| p.name() == name))
    }

    pub fn tag(&self, name: &str) -> Option<&'a Tag> {
        self.tree.tag(name)
    }

    /// Looks up any node (root, parent, tag, or child) by name.
    pub fn node(&self, name: &str) -> Option<NodeRef<'a>> {
        if self.root.node_name() == name {
            return Some(NodeRef::Root(self.root));
        }
        if let Some(parent) = self.parent(name) {
            return Some(NodeRef::Parent(parent));
        }
        if let Some(tag) = self.tree.tag(name) {
            return Some(NodeRef::Tag(tag));
        }
        for parent in self.root.children.values() {
            if let Some(child) = parent.children().iter().find(|c| c.name() == name) {
                return Some(NodeRef::Child(child));
            }
        }
        for tag in self.tree.tags().values() {
            if let Some(child) = tag.children().iter().find(|c| c.name() == name) {
                return Some(NodeRef::Child(child));
            }
        }
        None
    }

    /// Children of the named parent, or of the current scope's owner when
    /// `name` is `None`.
    pub fn children(&self, name: Option<&str>) -> Vec<&'a ChildNode> {
        match name {
            Some(name) => self
                .parent(name)
                .map(|p| p.children().iter().collect())
                .or_else(|| self.tag(name).map(|t| t.children().iter().collect()))
                .unwrap_or_default(),
            None => match self.scope {
                Scope::Parent { parent, .. } => parent.children().iter().collect(),
                Scope::Tag { tag, .. } => tag.children().iter().collect(),
                Scope::None => Vec::new(),
            },
        }
    }

    /// Fellow children under the current anchor, excluding the current one.
    pub fn siblings(&self) -> Vec<&'a ChildNode> {
        let current = match self.scope {
            Scope::Parent { child, .. } | Scope::Tag { child, .. } => child,
            Scope::None => None,
        };
        let Some(current) = current else {
            return Vec::new();
        };
        self.children(None)
            .into_iter()
            .filter(|c| !std::ptr::eq(*c, current))
            .collect()
    }

    /// Whether the user explicitly supplied this parent's value. Derived
    /// from the raw input, so it is stable regardless of resolution order.
    pub fn is_provided(&self, parent: &ParentNode) -> bool {
        match parent.kind() {
            ParentKind::Env(spec) => self.input.env(&spec.var).is_some(),
            _ => self.input.raw(parent.param()).is_some(),
        }
    }

    fn parents_where(
        &self,
        keep: impl Fn(&ParentNode) -> bool,
    ) -> Vec<&'a ParentNode> {
        self.root.children.values().filter(|p| keep(p)).collect()
    }

    pub fn provided_arguments(&self) -> Vec<&'a ParentNode> {
        self.parents_where(|p| p.is_argument() && self.is_provided(p))
    }

    pub fn provided_options(&self) -> Vec<&'a ParentNode> {
        self.parents_where(|p| p.is_option() && self.is_provided(p))
    }

    pub fn provided_envs(&self) -> Vec<&'a ParentNode> {
        self.parents_where(|p| p.is_env() && self.is_provided(p))
    }

    pub fn missing_arguments(&self) -> Vec<&'a ParentNode> {
        self.parents_where(|p| p.is_argument() && !self.is_provided(p))
    }

    pub fn missing_options(&self) -> Vec<&'a ParentNode> {
        self.parents_where(|p| p.is_option() && !self.is_provided(p))
    }

    pub fn missing_envs(&self) -> Vec<&'a ParentNode> {
        self.parents_where(|p| p.is_env() && !self.is_provided(p))
    }

    /// Resolved value of a provided parent; `None` when absent or when the
    /// parent has not been resolved yet.
    pub fn provided_value(&self, name: &str) -> Option<&'a Value> {
        let parent = self.parent(name)?;
        if self.is_provided(parent) {
            parent.value()
        } else {
            None
        }
    }

    /// Resolved values of all provided parents, triggering resolution.
    pub fn provided_values(&self) -> Result<IndexMap<String, Value>, ProcessError> {
        let mut out = IndexMap::new();
        for parent in self.root.children.values() {
            if self.is_provided(parent) {
                let value = self.resolve(parent)?;
                out.insert(parent.name().to_string(), value.clone());
            }
        }
        Ok(out)
    }

    /// Resolved values of all parents, triggering resolution as needed.
    pub fn values(&self) -> Result<IndexMap<String, Value>, ProcessError> {
        let mut out = IndexMap::new();
        for parent in self.root.children.values() {
            let value = self.resolve(parent)?;
            out.insert(parent.name().to_string(), value.clone());
        }
        Ok(out)
    }

    /// Resolves one parent (memoized; at most one `load` per invocation).
    pub fn resolve(&self, parent: &'a ParentNode) -> Result<&'a Value, ProcessError> {
        resolve::resolve_parent(parent, self)
    }

    /// All tags and their member parents.
    pub fn tagged(&self) -> IndexMap<&'a str, Vec<&'a ParentNode>> {
        let mut out: IndexMap<&str, Vec<&ParentNode>> = IndexMap::new();
        for tag in self.tree.tags().values() {
            let members = tag
                .members()
                .iter()
                .filter_map(|name| self.parent(name))
                .collect();
            out.insert(tag.name(), members);
        }
        out
    }

    /// Tags declared by the parent that owns the current scope.
    pub fn current_tags(&self) -> Vec<&'a str> {
        match self.scope {
            Scope::Parent { parent, .. } => {
                parent.tags().iter().map(|s| s.as_str()).collect()
            }
            Scope::Tag { tag, .. } => vec![tag.name()],
            Scope::None => Vec::new(),
        }
    }

    /// The active anchor as a parent node; fails when it is a tag.
    pub fn current_parent_as_parent(&self) -> Result<&'a ParentNode, ContextError> {
        match self.scope {
            Scope::Parent { parent, .. } => Ok(parent),
            Scope::Tag { tag, .. } => Err(ContextError::NotAParent(tag.name().to_string())),
            Scope::None => Err(ContextError::NoScope),
        }
    }

    /// The active anchor as a tag; fails when it is a parent node.
    pub fn current_parent_as_tag(&self) -> Result<&'a Tag, ContextError> {
        match self.scope {
            Scope::Tag { tag, .. } => Ok(tag),
            Scope::Parent { parent, .. } => {
                Err(ContextError::NotATag(parent.name().to_string()))
            }
            Scope::None => Err(ContextError::NoScope),
        }
    }

    pub fn is_tag_scope(&self) -> bool {
        matches!(self.scope, Scope::Tag { .. })
    }

    pub fn is_option(&self) -> bool {
        matches!(self.scope, Scope::Parent { parent, .. } if parent.is_option())
    }

    pub fn is_argument(&self) -> bool {
        matches!(self.scope, Scope::Parent { parent, .. } if parent.is_argument())
    }

    pub fn is_env(&self) -> bool {
        matches!(self.scope, Scope::Parent { parent, .. } if parent.is_env())
    }

    /// Whether the current scope's parent belongs to at least one tag.
    pub fn is_tagged(&self) -> bool {
        matches!(self.scope, Scope::Parent { parent, .. } if !parent.tags().is_empty())
    }
}

impl From<ContextError> for ProcessError {
    fn from(err: ContextError) -> Self {
        ProcessError::Failed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::RawValue;
    use crate::parent::{Arg, EnvVar, Opt};
    use crate::processors::{RequireAtLeast, ToLowercase, ToUppercase};
    use crate::root::{App, Command};

    fn demo_app() -> App {
        Command::new("demo")
            .option(Opt::new("name").tag("who"))
            .child(ToUppercase)
            .child(ToLowercase)
            .argument(Arg::new("path"))
            .env(EnvVar::new("lang", "DEMO_LANG").default_value("en"))
            .tag("who")
            .tag_child(RequireAtLeast(1))
            .build()
            .unwrap()
    }

    fn provided_input() -> RawInput {
        let mut input = RawInput::default();
        input.insert("name", RawValue::Single("Ada".into()));
        input
    }

    #[test]
    fn lookups_cover_every_node_kind() {
        let app = demo_app();
        let input = provided_input();
        let ctx = app.context(&input).unwrap();

        assert_eq!(ctx.root().name(), "demo");
        assert!(ctx.parent("name").is_some());
        assert!(ctx.parent("nope").is_none());
        assert!(ctx.tag("who").is_some());

        let root = ctx.node("demo").unwrap();
        assert!(!root.is_parent() && !root.is_tag());
        assert!(ctx.node("name").unwrap().is_parent());
        assert!(ctx.node("who").unwrap().is_tag());
        assert_eq!(ctx.node("to_uppercase").unwrap().name(), "to_uppercase");
        assert_eq!(ctx.node("require_at_least").unwrap().name(), "require_at_least");
        assert!(ctx.node("missing").is_none());
    }

    #[test]
    fn children_and_siblings_follow_the_scope() {
        let app = demo_app();
        let input = provided_input();
        let ctx = app.context(&input).unwrap();

        assert_eq!(ctx.children(Some("name")).len(), 2);
        assert_eq!(ctx.children(Some("who")).len(), 1);
        assert!(ctx.children(Some("missing")).is_empty());
        assert!(ctx.children(None).is_empty());
        assert!(ctx.siblings().is_empty());

        let parent = ctx.parent("name").unwrap();
        let first = &parent.children()[0];
        let scoped = ctx.scoped_parent(parent, Some(first));
        assert_eq!(scoped.children(None).len(), 2);
        let siblings = scoped.siblings();
        assert_eq!(siblings.len(), 1);
        assert_eq!(siblings[0].name(), "to_lowercase");
    }

    #[test]
    fn provided_and_missing_sets_partition_by_kind() {
        let app = demo_app();
        let input = provided_input();
        let ctx = app.context(&input).unwrap();

        fn names<'a>(parents: Vec<&'a ParentNode>) -> Vec<&'a str> {
            parents.into_iter().map(|p| p.name()).collect()
        }
        assert_eq!(names(ctx.provided_options()), ["name"]);
        assert!(ctx.provided_arguments().is_empty());
        assert!(ctx.provided_envs().is_empty());
        assert_eq!(names(ctx.missing_arguments()), ["path"]);
        assert_eq!(names(ctx.missing_envs()), ["lang"]);
        assert!(ctx.missing_options().is_empty());

        let mut input = provided_input();
        input.set_env("DEMO_LANG", "fr");
        let ctx = app.context(&input).unwrap();
        assert_eq!(names(ctx.provided_envs()), ["lang"]);
        assert!(ctx.missing_envs().is_empty());
    }

    #[test]
    fn provided_value_requires_prior_resolution() {
        let app = demo_app();
        let input = provided_input();
        let ctx = app.context(&input).unwrap();

        // provided but not resolved yet
        assert_eq!(ctx.provided_value("name"), None);
        ctx.resolve(ctx.parent("name").unwrap()).unwrap();
        assert_eq!(ctx.provided_value("name"), Some(&Value::Str("ada".into())));
        // resolved but never provided
        ctx.resolve(ctx.parent("path").unwrap()).unwrap();
        assert_eq!(ctx.provided_value("path"), None);
    }

    #[test]
    fn value_maps_trigger_resolution() {
        let app = demo_app();
        let input = provided_input();
        let ctx = app.context(&input).unwrap();

        let provided = ctx.provided_values().unwrap();
        assert_eq!(provided.len(), 1);
        assert_eq!(provided.get("name"), Some(&Value::Str("ada".into())));

        let all = ctx.values().unwrap();
        let keys: Vec<&str> = all.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, ["name", "path", "lang"]);
        assert_eq!(all.get("path"), Some(&Value::None));
        assert_eq!(all.get("lang"), Some(&Value::Str("en".into())));
    }

    #[test]
    fn tagged_groups_members_by_tag() {
        let app = demo_app();
        let input = provided_input();
        let ctx = app.context(&input).unwrap();

        let tagged = ctx.tagged();
        assert_eq!(tagged.len(), 1);
        let members: Vec<&str> = tagged.get("who").unwrap().iter().map(|p| p.name()).collect();
        assert_eq!(members, ["name"]);
    }

    #[test]
    fn scope_accessors_distinguish_parent_and_tag() {
        let app = demo_app();
        let input = provided_input();
        let ctx = app.context(&input).unwrap();

        assert!(matches!(
            ctx.current_parent_as_parent(),
            Err(ContextError::NoScope)
        ));
        assert!(ctx.current_tags().is_empty());

        let parent = ctx.parent("name").unwrap();
        let scoped = ctx.scoped_parent(parent, None);
        assert_eq!(scoped.current_parent_as_parent().unwrap().name(), "name");
        assert!(matches!(
            scoped.current_parent_as_tag(),
            Err(ContextError::NotATag(name)) if name == "name"
        ));
        assert_eq!(scoped.current_tags(), ["who"]);
        assert!(scoped.is_option());
        assert!(!scoped.is_argument());
        assert!(!scoped.is_env());
        assert!(scoped.is_tagged());
        assert!(!scoped.is_tag_scope());

        let tag = ctx.tag("who").unwrap();
        let tag_scope = ctx.scoped_tag(tag, None);
        assert!(matches!(
            tag_scope.current_parent_as_parent(),
            Err(ContextError::NotAParent(name)) if name == "who"
        ));
        assert_eq!(tag_scope.current_parent_as_tag().unwrap().name(), "who");
        assert!(tag_scope.is_tag_scope());
        assert_eq!(tag_scope.current_tags(), ["who"]);
        assert!(!tag_scope.is_option());
    }
}
