//! Property tests for registration-order semantics and pipeline composition.

use std::collections::HashMap;

use proptest::prelude::*;

use paramtree::processors::Suffix;
use paramtree::{BuildError, Command, Opt, RawInput, Value, ValueHandler};

struct Noop;

impl ValueHandler for Noop {
    fn name(&self) -> &str {
        "noop"
    }
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Option,
    Tag,
    Child,
}

/// What the registration rules predict for a given op sequence.
#[derive(Debug, PartialEq)]
enum Expected {
    /// No build error; child count per option index.
    Counts(HashMap<usize, usize>),
    /// The first child with no preceding anchor fails the build.
    NoParent,
    /// The first plain child whose nearest anchor is a tag fails the build.
    ChildUnderTag,
}

fn predict(ops: &[Op]) -> Expected {
    #[derive(Clone, Copy)]
    enum Anchor {
        None,
        Option(usize),
        Tag,
    }
    let mut anchor = Anchor::None;
    let mut counts: HashMap<usize, usize> = HashMap::new();
    for (i, op) in ops.iter().enumerate() {
        match op {
            Op::Option => anchor = Anchor::Option(i),
            Op::Tag => anchor = Anchor::Tag,
            Op::Child => match anchor {
                Anchor::None => return Expected::NoParent,
                Anchor::Tag => return Expected::ChildUnderTag,
                Anchor::Option(idx) => *counts.entry(idx).or_default() += 1,
            },
        }
    }
    Expected::Counts(counts)
}

fn build(ops: &[Op]) -> Result<paramtree::App, BuildError> {
    let mut cmd = Command::new("app");
    for (i, op) in ops.iter().enumerate() {
        cmd = match op {
            Op::Option => cmd.option(Opt::new(format!("o{i}"))),
            Op::Tag => cmd.tag(format!("t{i}")),
            Op::Child => cmd.child(Noop),
        };
    }
    cmd.build()
}

fn op_strategy() -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(
        prop_oneof![Just(Op::Option), Just(Op::Tag), Just(Op::Child)],
        0..12,
    )
}

proptest! {
    #[test]
    fn children_attach_to_the_nearest_preceding_anchor(ops in op_strategy()) {
        let outcome = build(&ops);
        match predict(&ops) {
            Expected::NoParent => {
                prop_assert!(matches!(outcome, Err(BuildError::NoParent(_))));
            }
            Expected::ChildUnderTag => {
                prop_assert!(
                    matches!(outcome, Err(BuildError::TagHandlerMissing { .. })),
                    "expected TagHandlerMissing, got {:?}",
                    outcome
                );
            }
            Expected::Counts(counts) => {
                let app = outcome.unwrap();
                let input = RawInput::default();
                let ctx = app.context(&input).unwrap();
                for (i, op) in ops.iter().enumerate() {
                    if matches!(op, Op::Option) {
                        let parent = ctx.parent(&format!("o{i}")).unwrap();
                        let expected = counts.get(&i).copied().unwrap_or(0);
                        prop_assert_eq!(parent.children().len(), expected);
                    }
                }
            }
        }
    }

    #[test]
    fn suffix_chain_composes_in_order(
        base in "[a-z]{1,8}",
        suffixes in prop::collection::vec("[a-z]{1,4}", 0..5),
    ) {
        let mut cmd = Command::new("app").option(Opt::new("word"));
        for s in &suffixes {
            cmd = cmd.child(Suffix::new(s.clone()));
        }
        let mut app = cmd.build().unwrap();

        let inv = app
            .run_with(["app", "--word", base.as_str()], HashMap::new())
            .unwrap();
        let expected = format!("{base}{}", suffixes.concat());
        prop_assert_eq!(inv.values.get("word"), Some(&Value::Str(expected)));
    }
}
