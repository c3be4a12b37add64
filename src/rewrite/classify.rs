use crate::invocation::OptLevel;

/// Flags whose value is passed as the next argument.
pub const SEPARATE_VALUE_FLAGS: &[&str] = &[
    "-o",
    "-I",
    "-D",
    "-U",
    "-L",
    "-l",
    "-x",
    "-MF",
    "-MT",
    "-MQ",
    "-include",
    "-imacros",
    "-isystem",
    "-idirafter",
    "-iquote",
    "-iprefix",
    "-iwithprefix",
    "-iwithprefixbefore",
    "-isysroot",
    "--sysroot",
    "-Xlinker",
    "-Xpreprocessor",
    "-Xassembler",
    "-Xclang",
    "--param",
    "-aux-info",
    "-T",
    "-u",
    "-e",
    "-z",
    "-arch",
    "-target",
    "--target",
    "-G",
    "-specs",
    "-wrapper",
];

/// The syntactic role of a single argument, before any policy is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    /// `-O`, `-O2`, `-Ofast`, ...
    OptLevel(OptLevel),
    /// A flag that consumes the following argument as its value.
    TakesValue,
    /// Any other flag. Only these are looked up in the flag sets.
    Flag,
    /// Input files, `-`, and anything else not starting with a dash.
    Operand,
}

impl ArgKind {
    pub fn of(arg: &str) -> Self {
        if arg.len() < 2 || !arg.starts_with('-') {
            return ArgKind::Operand;
        }
        if let Some(level) = OptLevel::from_flag(arg) {
            return ArgKind::OptLevel(level);
        }
        if SEPARATE_VALUE_FLAGS.contains(&arg) {
            return ArgKind::TakesValue;
        }
        ArgKind::Flag
    }
}
