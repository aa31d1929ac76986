//! paramtree - declarative parameter pipelines for clap CLIs
//!
//! Value sources (options, positional arguments, environment variables) and
//! processors (validators/transformers) are declared through a builder; the
//! library assembles a node tree, parses argv through clap, and resolves
//! every parameter - lazily, at most once - through its processor pipeline
//! before the command body runs. Tags group parameters for cross-parameter
//! validation.

pub mod child;
pub mod config;
pub mod context;
pub mod error;
pub mod host;
pub mod node;
pub mod parent;
pub mod processors;
pub mod root;
pub mod tag;
pub mod tree;
pub mod value;

mod resolve;

pub use child::{ChildKind, ChildNode, TagHandler, TagValues, ValueHandler};
pub use context::Context;
pub use error::{BuildError, ContextError, ProcessError, RunError};
pub use host::{RawInput, RawValue};
pub use node::{Node, NodeKey, NodeRef};
pub use parent::{Arg, EnvVar, Opt, ParentKind, ParentNode};
pub use root::{App, Command, Invocation, RootNode, Values};
pub use tag::Tag;
pub use tree::Tree;
pub use value::{Value, ValueType};
