//! Rewrites a compiler command line so that only the enabled optimization
//! flags survive on top of an `-O0` baseline.

use std::{
    collections::{HashMap, HashSet},
    ffi::OsStr,
};

use tracing::{debug, info, instrument};

use crate::{
    invocation::OptLevel,
    policy::{FlagSet, flag_name},
};
use classify::ArgKind;

pub mod classify;

/// Rewrites `args` with the default options.
pub fn rewrite<S>(args: &[S], universe: &FlagSet, enabled: &FlagSet) -> Vec<S>
where
    S: AsRef<OsStr> + Clone + for<'x> From<&'x str>,
{
    Rewriter::new(universe, enabled).rewrite(args)
}

#[derive(Debug, Clone, Copy)]
pub struct Rewriter<'a> {
    universe: &'a FlagSet,
    enabled: &'a FlagSet,
    append_missing: bool,
    append_stray: bool,
}

enum Slot<'s, S> {
    /// Passed through untouched.
    Plain(&'s S),
    /// An optimization flag the policy has a say over.
    Optimization {
        arg: &'s S,
        name: &'s str,
        keep: bool,
    },
}

impl<'a> Rewriter<'a> {
    pub fn new(universe: &'a FlagSet, enabled: &'a FlagSet) -> Self {
        Self {
            universe,
            enabled,
            append_missing: true,
            append_stray: false,
        }
    }

    /// Append enabled flags that the original command line never passed.
    pub fn append_missing(mut self, value: bool) -> Self {
        self.append_missing = value;
        self
    }

    /// Treat enabled flags missing from the universe as known optimization
    /// flags, so they are forced on as well.
    pub fn append_stray(mut self, value: bool) -> Self {
        self.append_stray = value;
        self
    }

    fn is_stray(&self, flag: &str) -> bool {
        self.enabled.matches(flag) && !self.universe.matches(flag)
    }

    fn is_controlled(&self, flag: &str) -> bool {
        self.universe.matches(flag) || (self.append_stray && self.is_stray(flag))
    }

    /// Arguments that are not valid UTF-8 are never classified and pass
    /// through as they are.
    #[instrument(level = "debug", skip_all)]
    pub fn rewrite<S>(&self, args: &[S]) -> Vec<S>
    where
        S: AsRef<OsStr> + Clone + for<'x> From<&'x str>,
    {
        if self.universe.is_empty() {
            debug!("no optimization flags configured, passing arguments through");
            return args.to_vec();
        }

        let mut slots = Vec::with_capacity(args.len());
        // A value flag at the very end with nothing to consume.
        let mut dangling = None;
        let mut args_iter = args.iter();

        while let Some(arg) = args_iter.next() {
            let Some(text) = arg.as_ref().to_str() else {
                debug!("passing through non-UTF-8 argument {:?}", arg.as_ref());
                slots.push(Slot::Plain(arg));
                continue;
            };

            debug!("classifying {:?}", text);
            match ArgKind::of(text) {
                ArgKind::OptLevel(level) => {
                    info!(
                        "the flag {:?} ({:?}) cannot be used with this tool; ignoring it",
                        text, level
                    );
                }
                ArgKind::TakesValue => match args_iter.next() {
                    Some(value) => {
                        slots.push(Slot::Plain(arg));
                        slots.push(Slot::Plain(value));
                    }
                    None => {
                        debug!("{:?} is missing its value", text);
                        dangling = Some(arg);
                    }
                },
                ArgKind::Flag if self.is_controlled(text) => {
                    let keep = self.enabled.matches(text);
                    debug!("optimization flag {:?}, keep: {}", text, keep);
                    slots.push(Slot::Optimization {
                        arg,
                        name: flag_name(text),
                        keep,
                    });
                }
                ArgKind::Flag | ArgKind::Operand => slots.push(Slot::Plain(arg)),
            }
        }

        // The last occurrence of a flag decides whether it stays.
        let last_seen: HashMap<&str, usize> = slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| match *slot {
                Slot::Optimization { name, .. } => Some((name, i)),
                Slot::Plain(_) => None,
            })
            .collect();

        let mut output = Vec::with_capacity(slots.len() + 2 + self.enabled.len());
        let mut present = HashSet::new();
        let mut baseline_at = 0;

        for (i, slot) in slots.into_iter().enumerate() {
            match slot {
                Slot::Plain(arg) => {
                    output.push(arg.clone());
                    baseline_at = output.len();
                }
                Slot::Optimization { arg, name, keep } => {
                    if last_seen.get(name) != Some(&i) {
                        debug!("dropping earlier occurrence of {:?}", name);
                    } else if keep {
                        present.insert(name);
                        output.push(arg.clone());
                    }
                }
            }
        }

        // After every plain argument, so it overrides any level the build asked for.
        output.insert(baseline_at, S::from(OptLevel::BASELINE));

        if self.append_missing {
            for flag in self.enabled.iter().filter(|x| self.is_controlled(x)) {
                if present.insert(flag_name(flag)) {
                    debug!("forcing enabled flag {:?}", flag);
                    output.push(S::from(flag));
                }
            }
        }

        // Left last so it cannot swallow anything we add.
        if let Some(arg) = dangling {
            output.push(arg.clone());
        }

        output
    }
}
