//! Host collaborator boundary (clap)
//!
//! The core never touches argv or renders help; this adapter turns the
//! built tree into a `clap::Command`, and turns parsed matches plus an
//! environment snapshot into the [`RawInput`] the resolution engine
//! consumes: per parameter, an optional raw value and the fact that the
//! user provided one.

use std::collections::HashMap;

use clap::parser::ValueSource;
use clap::ArgAction;

use crate::parent::ParentKind;
use crate::root::{App, RootNode};

/// One parameter's raw, pre-pipeline value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawValue {
    Single(String),
    Many(Vec<String>),
    Flag(bool),
}

/// Everything the core consumes for one invocation: raw values for the
/// parameters the user actually provided, plus an environment snapshot
/// captured once at entry.
#[derive(Debug, Default)]
pub struct RawInput {
    values: HashMap<String, RawValue>,
    env: HashMap<String, String>,
}

impl RawInput {
    /// Records a user-provided raw value. Absence of a key means the
    /// parameter was not provided.
    pub fn insert(&mut self, param: &str, raw: RawValue) {
        self.values.insert(param.to_string(), raw);
    }

    pub fn set_env(&mut self, var: &str, value: &str) {
        self.env.insert(var.to_string(), value.to_string());
    }

    pub fn raw(&self, param: &str) -> Option<&RawValue> {
        self.values.get(param)
    }

    pub fn env(&self, var: &str) -> Option<&str> {
        self.env.get(var).map(|s| s.as_str())
    }

    /// Snapshot of the process environment.
    pub fn env_snapshot() -> HashMap<String, String> {
        std::env::vars().collect()
    }
}

/// Builds the clap command for an app, subcommands included.
pub(crate) fn to_clap(app: &App) -> clap::Command {
    let mut command = clap::Command::new(app.name().to_string());
    if let Some(about) = app.about() {
        command = command.about(about.to_string());
    }
    if let Some(root) = app.tree().root() {
        for parent in root.parents() {
            match parent.kind() {
                ParentKind::Opt(spec) => {
                    let mut arg = clap::Arg::new(parent.param().to_string())
                        .long(spec.long.clone());
                    if let Some(short) = spec.short {
                        arg = arg.short(short);
                    }
                    if let Some(help) = parent.help() {
                        arg = arg.help(help.to_string());
                    }
                    arg = if spec.flag {
                        arg.action(ArgAction::SetTrue)
                    } else if spec.multiple {
                        arg.action(ArgAction::Append)
                    } else {
                        arg.action(ArgAction::Set)
                    };
                    // Defaults are substituted by the core, not clap; only
                    // truly defaultless parameters are required here.
                    if parent.required() && parent.default().is_none() && !spec.flag {
                        arg = arg.required(true);
                    }
                    command = command.arg(arg);
                }
                ParentKind::Arg(spec) => {
                    let mut arg = clap::Arg::new(parent.param().to_string());
                    if let Some(help) = parent.help() {
                        arg = arg.help(help.to_string());
                    }
                    if spec.multiple {
                        arg = arg.num_args(0..).action(ArgAction::Append);
                    }
                    if parent.required() && parent.default().is_none() {
                        arg = arg.required(true);
                    }
                    command = command.arg(arg);
                }
                // Environment sources are invisible to the parser; the
                // core reads them from the snapshot.
                ParentKind::Env(_) => {}
            }
        }
    }
    for sub in app.subcommands() {
        command = command.subcommand(to_clap(sub));
    }
    command
}

/// Extracts the raw values the user provided at this command level.
pub(crate) fn raw_input(
    root: &RootNode,
    matches: &clap::ArgMatches,
    env: &HashMap<String, String>,
) -> RawInput {
    let mut input = RawInput {
        values: HashMap::new(),
        env: env.clone(),
    };
    for parent in root.parents() {
        let param = parent.param();
        match parent.kind() {
            ParentKind::Opt(spec) if spec.flag => {
                if matches.value_source(param) == Some(ValueSource::CommandLine) {
                    input.insert(param, RawValue::Flag(matches.get_flag(param)));
                }
            }
            ParentKind::Opt(spec) if spec.multiple => {
                if let Some(raws) = matches.get_many::<String>(param) {
                    input.insert(param, RawValue::Many(raws.cloned().collect()));
                }
            }
            ParentKind::Opt(_) => {
                if let Some(raw) = matches.get_one::<String>(param) {
                    input.insert(param, RawValue::Single(raw.clone()));
                }
            }
            ParentKind::Arg(spec) if spec.multiple => {
                if let Some(raws) = matches.get_many::<String>(param) {
                    input.insert(param, RawValue::Many(raws.cloned().collect()));
                }
            }
            ParentKind::Arg(_) => {
                if let Some(raw) = matches.get_one::<String>(param) {
                    input.insert(param, RawValue::Single(raw.clone()));
                }
            }
            ParentKind::Env(_) => {}
        }
    }
    input
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parent::{Arg, Opt};
    use crate::root::Command;
    use crate::value::ValueType;

    fn demo_app() -> App {
        Command::new("demo")
            .option(Opt::new("name").short('n'))
            .option(Opt::new("verbose").flag())
            .option(Opt::new("item").multiple())
            .argument(Arg::new("count").value_type(ValueType::Int))
            .build()
            .unwrap()
    }

    #[test]
    fn clap_command_mirrors_the_tree() {
        let app = demo_app();
        let command = to_clap(&app);
        let ids: Vec<String> = command
            .get_arguments()
            .map(|a| a.get_id().to_string())
            .collect();
        assert_eq!(ids, ["name", "verbose", "item", "count"]);
    }

    #[test]
    fn provided_parameters_land_in_raw_input() {
        let app = demo_app();
        let matches = to_clap(&app)
            .try_get_matches_from(["demo", "-n", "ada", "--item", "a", "--item", "b", "5"])
            .unwrap();
        let input = raw_input(app.tree().root().unwrap(), &matches, &HashMap::new());

        assert_eq!(input.raw("name"), Some(&RawValue::Single("ada".into())));
        assert_eq!(
            input.raw("item"),
            Some(&RawValue::Many(vec!["a".into(), "b".into()]))
        );
        assert_eq!(input.raw("count"), Some(&RawValue::Single("5".into())));
        // flag not passed: absent, so the core sees it as not provided
        assert_eq!(input.raw("verbose"), None);
    }

    #[test]
    fn passed_flag_is_provided() {
        let app = demo_app();
        let matches = to_clap(&app)
            .try_get_matches_from(["demo", "--verbose"])
            .unwrap();
        let input = raw_input(app.tree().root().unwrap(), &matches, &HashMap::new());
        assert_eq!(input.raw("verbose"), Some(&RawValue::Flag(true)));
    }

    #[test]
    fn required_option_is_enforced_by_clap() {
        let app = Command::new("demo")
            .option(Opt::new("must").required(true))
            .build()
            .unwrap();
        let err = to_clap(&app).try_get_matches_from(["demo"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }
}
