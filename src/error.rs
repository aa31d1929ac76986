//! Error taxonomy
//!
//! Build-time failures are authoring mistakes and terminate before any user
//! input is processed; process-time failures are ordinary usage errors
//! surfaced through the host's error channel. Nothing here is retried.

use thiserror::Error;

use crate::value::CoerceError;

/// Failures while assembling or validating the node tree.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("no root node has been registered")]
    NoRoot,

    #[error("a root node is already registered for this tree")]
    RootExists,

    #[error("a parent named '{0}' is already registered under this root")]
    ParentExists(String),

    #[error("could not attach child '{0}': no parent or tag registered before it")]
    NoParent(String),

    #[error("name '{name}' is used more than once ({tip})")]
    NameExists { name: String, tip: String },

    #[error(
        "child '{child}' is attached under tag '{tag}' but only handles single values; \
         attach a group-aware handler instead"
    )]
    TagHandlerMissing { tag: String, child: String },

    #[error(
        "child '{child}' is a group handler but is attached under parent '{parent}'; \
         group handlers must sit under a tag"
    )]
    GroupHandlerMisplaced { parent: String, child: String },
}

/// Failures while resolving a parameter value or running a processor.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProcessError {
    #[error("invalid value for '{param}': {reason}")]
    Invalid { param: String, reason: String },

    #[error("'{param}' is required: set the {var} environment variable")]
    MissingEnv { param: String, var: String },

    #[error("resolution of '{param}' depends on itself")]
    Cycle { param: String },

    #[error("{0}")]
    Failed(String),
}

impl ProcessError {
    /// Shorthand for handler bodies raising a plain validation failure.
    pub fn failed(message: impl Into<String>) -> Self {
        ProcessError::Failed(message.into())
    }

    pub(crate) fn invalid(param: &str, err: CoerceError) -> Self {
        ProcessError::Invalid {
            param: param.to_string(),
            reason: err.to_string(),
        }
    }
}

/// Failures from context queries made by processor code.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContextError {
    #[error("current scope '{0}' is not a parent node")]
    NotAParent(String),

    #[error("current scope '{0}' is not a tag")]
    NotATag(String),

    #[error("no node is being processed in this context")]
    NoScope,
}

/// Top-level failures from running a built command.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Usage(#[from] ProcessError),

    #[error(transparent)]
    Parse(#[from] clap::Error),
}

impl RunError {
    /// Conventional process exit code for this failure class.
    ///
    /// Usage and authoring errors both exit 2, matching clap's convention
    /// for bad invocations.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunError::Parse(e) => e.exit_code(),
            RunError::Build(_) | RunError::Usage(_) => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_handler_missing_names_both_sides() {
        let err = BuildError::TagHandlerMissing {
            tag: "credentials".into(),
            child: "to_uppercase".into(),
        };
        let text = err.to_string();
        assert!(text.contains("credentials"));
        assert!(text.contains("to_uppercase"));
    }

    #[test]
    fn name_exists_carries_tip() {
        let err = BuildError::NameExists {
            name: "verbose".into(),
            tip: "rename the tag or the option".into(),
        };
        assert!(err.to_string().contains("rename the tag"));
    }

    #[test]
    fn usage_errors_exit_two() {
        let err = RunError::Usage(ProcessError::failed("too short"));
        assert_eq!(err.exit_code(), 2);
    }
}
