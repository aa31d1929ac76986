//! Root command: builder, built application, invocation entry points
//!
//! `Command` is the registration surface: sources, processors and tags are
//! declared top-down and queued into the command's own tree. `build`
//! registers the root and commits the queue; the resulting `App` parses
//! argv through clap and resolves every parameter before handing the final
//! values back for injection.

use std::collections::HashMap;
use std::ffi::OsString;

use indexmap::IndexMap;
use serde::Serialize;

use crate::child::{ChildNode, TagHandler, ValueHandler};
use crate::context::Context;
use crate::error::{BuildError, RunError};
use crate::host::{self, RawInput};
use crate::node::Node;
use crate::parent::{Arg, EnvVar, Opt, ParentNode};
use crate::resolve;
use crate::tag::Tag;
use crate::tree::Tree;
use crate::value::Value;

/// The top of the built tree. Its direct children are the root command's
/// parents; tags live beside them on the tree.
#[derive(Debug)]
pub struct RootNode {
    name: String,
    about: Option<String>,
    pub(crate) children: IndexMap<String, ParentNode>,
}

impl Node for RootNode {
    fn node_name(&self) -> &str {
        &self.name
    }
}

impl RootNode {
    pub(crate) fn new(name: String, about: Option<String>) -> Self {
        Self {
            name,
            about,
            children: IndexMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn about(&self) -> Option<&str> {
        self.about.as_deref()
    }

    /// Parents in declaration order.
    pub fn parents(&self) -> impl Iterator<Item = &ParentNode> {
        self.children.values()
    }

    pub fn parent(&self, key: &str) -> Option<&ParentNode> {
        self.children
            .get(key)
            .or_else(|| self.children.values().find(|p| p.name() == key))
    }
}

/// Declarative builder for one command (or command group).
///
/// Registration order is meaningful: a processor added with [`child`]
/// attaches to the most recently added source or tag.
///
/// [`child`]: Command::child
pub struct Command {
    name: String,
    about: Option<String>,
    tree: Tree,
    subcommands: Vec<Command>,
}

impl Command {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            about: None,
            tree: Tree::new(),
            subcommands: Vec::new(),
        }
    }

    pub fn about(mut self, text: impl Into<String>) -> Self {
        self.about = Some(text.into());
        self
    }

    pub fn option(mut self, opt: Opt) -> Self {
        self.tree.queue_parent(opt.into_node());
        self
    }

    pub fn argument(mut self, arg: Arg) -> Self {
        self.tree.queue_parent(arg.into_node());
        self
    }

    pub fn env(mut self, env: EnvVar) -> Self {
        self.tree.queue_parent(env.into_node());
        self
    }

    pub fn tag(mut self, name: impl Into<String>) -> Self {
        self.tree.queue_tag(Tag::new(name));
        self
    }

    /// Attaches a per-value processor to the most recent source or tag.
    pub fn child(mut self, handler: impl ValueHandler + 'static) -> Self {
        self.tree.queue_child(ChildNode::value(handler));
        self
    }

    /// Attaches a group validator to the most recent tag.
    pub fn tag_child(mut self, handler: impl TagHandler + 'static) -> Self {
        self.tree.queue_child(ChildNode::group(handler));
        self
    }

    pub fn subcommand(mut self, command: Command) -> Self {
        self.subcommands.push(command);
        self
    }

    /// Registers the root and commits all queued registrations.
    pub fn build(self) -> Result<App, BuildError> {
        let Command {
            name,
            about,
            mut tree,
            subcommands,
        } = self;
        tree.register_root(RootNode::new(name.clone(), about.clone()))?;
        tree.validate_and_build()?;
        let subcommands = subcommands
            .into_iter()
            .map(Command::build)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(App {
            name,
            about,
            tree,
            subcommands,
        })
    }
}

/// Final values keyed by injection name, in declaration order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Values(pub(crate) IndexMap<String, Value>);

impl Values {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.0).unwrap_or(serde_json::Value::Null)
    }
}

/// Outcome of one invocation: which subcommand ran and the merged values
/// (innermost command wins on key overlap).
#[derive(Debug)]
pub struct Invocation {
    pub path: Vec<String>,
    pub values: Values,
}

/// A built command, ready to parse and resolve invocations.
#[derive(Debug)]
pub struct App {
    name: String,
    about: Option<String>,
    tree: Tree,
    subcommands: Vec<App>,
}

impl App {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn about(&self) -> Option<&str> {
        self.about.as_deref()
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn subcommands(&self) -> &[App] {
        &self.subcommands
    }

    /// Prints the node tree for diagnostics.
    pub fn visualize(&self) -> Result<(), BuildError> {
        self.tree.visualize()
    }

    pub fn render(&self) -> Result<String, BuildError> {
        self.tree.render()
    }

    /// A fresh context over this app's tree and the given raw input.
    pub fn context<'a>(&'a self, input: &'a RawInput) -> Result<Context<'a>, BuildError> {
        let root = self.tree.root().ok_or(BuildError::NoRoot)?;
        Ok(Context::new(&self.tree, root, input))
    }

    /// Parses the process arguments and environment and resolves the tree.
    pub fn run(&mut self) -> Result<Invocation, RunError> {
        let argv: Vec<OsString> = std::env::args_os().collect();
        self.run_with(argv, RawInput::env_snapshot())
    }

    /// Like [`run`](App::run) with explicit argv; the environment snapshot
    /// still comes from the process.
    pub fn run_from<I, T>(&mut self, argv: I) -> Result<Invocation, RunError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        self.run_with(argv, RawInput::env_snapshot())
    }

    /// Fully explicit entry point: argv plus an environment snapshot.
    pub fn run_with<I, T>(
        &mut self,
        argv: I,
        env: HashMap<String, String>,
    ) -> Result<Invocation, RunError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let command = host::to_clap(self);
        let matches = command.try_get_matches_from(argv)?;
        let mut path = Vec::new();
        let mut merged = IndexMap::new();
        self.run_matches(&matches, &env, &mut path, &mut merged)?;
        Ok(Invocation {
            path,
            values: Values(merged),
        })
    }

    fn run_matches(
        &mut self,
        matches: &clap::ArgMatches,
        env: &HashMap<String, String>,
        path: &mut Vec<String>,
        merged: &mut IndexMap<String, Value>,
    ) -> Result<(), RunError> {
        let level = self.resolve_matches(matches, env)?;
        merged.extend(level.0);
        if let Some((name, sub_matches)) = matches.subcommand() {
            if let Some(sub) = self.subcommands.iter_mut().find(|a| a.name == name) {
                path.push(name.to_string());
                sub.run_matches(sub_matches, env, path, merged)?;
            }
        }
        Ok(())
    }

    /// Resolves one command level: every parent in declaration order, then
    /// each tag's group handlers.
    fn resolve_matches(
        &mut self,
        matches: &clap::ArgMatches,
        env: &HashMap<String, String>,
    ) -> Result<Values, RunError> {
        self.reset_invocation_state();
        let root = self.tree.root().ok_or(BuildError::NoRoot)?;
        let input = host::raw_input(root, matches, env);
        let ctx = Context::new(&self.tree, root, &input);

        let mut values = IndexMap::new();
        for parent in root.children.values() {
            let value = ctx.resolve(parent)?;
            values.insert(parent.param().to_string(), value.clone());
        }
        for tag in self.tree.tags().values() {
            resolve::run_tag_children(tag, &ctx)?;
        }
        Ok(Values(values))
    }

    /// Clears cached values and provided flags from a previous invocation.
    fn reset_invocation_state(&mut self) {
        if let Some(root) = self.tree.root_mut() {
            for parent in root.children.values_mut() {
                parent.reset();
            }
        }
    }
}
