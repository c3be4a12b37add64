use std::{ffi::OsStr, path::Path};

/// Which real compiler an invocation stands in for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum CompilerIdentity {
    #[default]
    Cc,
    Cxx,
}

impl CompilerIdentity {
    /// Guesses the identity from the name the wrapper was invoked as, so a
    /// `copa++` or `copa-cxx` symlink behaves as the C++ driver. A bare `cpp`
    /// is the preprocessor and stays C.
    pub fn from_program_name(argv0: &OsStr) -> Self {
        let stem = Path::new(argv0)
            .file_stem()
            .map(|x| x.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        let cxx = ["++", "xx", "-cpp", "_cpp"];
        if cxx.iter().any(|suffix| stem.ends_with(suffix)) {
            CompilerIdentity::Cxx
        } else {
            CompilerIdentity::Cc
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "cc" | "c" | "gcc" => Some(CompilerIdentity::Cc),
            "c++" | "cxx" | "cpp" | "g++" => Some(CompilerIdentity::Cxx),
            _ => None,
        }
    }

    pub fn default_compiler(&self) -> &'static str {
        match self {
            CompilerIdentity::Cc => "gcc",
            CompilerIdentity::Cxx => "g++",
        }
    }
}

/// An optimization level as selected by a `-O` family token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OptLevel {
    None,       // -O0
    Less,       // -O, -O1
    Default,    // -O2
    Aggressive, // -O3 and above
    Size,       // -Os
    MinSize,    // -Oz
    Fast,       // -Ofast
    Debug,      // -Og
}

impl OptLevel {
    /// The level every rewritten command line is pinned to.
    pub const BASELINE: &'static str = "-O0";

    /// Classifies a single argument, returning `None` when it is not an
    /// optimization-level flag.
    pub fn from_flag(arg: &str) -> Option<Self> {
        let level = arg.strip_prefix("-O")?;
        let level = match level {
            "" | "1" => OptLevel::Less,
            "0" => OptLevel::None,
            "2" => OptLevel::Default,
            "s" => OptLevel::Size,
            "z" => OptLevel::MinSize,
            "fast" => OptLevel::Fast,
            "g" => OptLevel::Debug,
            digits if digits.bytes().all(|b| b.is_ascii_digit()) => {
                if digits.bytes().all(|b| b == b'0') {
                    OptLevel::None
                } else {
                    OptLevel::Aggressive
                }
            }
            _ => return None,
        };
        Some(level)
    }
}
