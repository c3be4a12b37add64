use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
};

use clap::{ArgAction, Parser, ValueEnum, builder::BoolishValueParser};
use serde::{Deserialize, Serialize};

use crate::{error::CopaError, invocation::CompilerIdentity};

/// What to do with enabled flags that are missing from the known flag set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StrayFlagPolicy {
    /// Log a warning and leave them alone.
    #[default]
    Warn,
    /// Leave them alone silently.
    Ignore,
    /// Force them on like any other enabled flag.
    Append,
}

/// Options read from the environment. The wrapper's own command line belongs
/// to the compiler, so this is only ever parsed against the program name.
#[derive(Parser, Debug, Default)]
pub struct EnvOptions {
    /// Which compiler this invocation stands in for (cc or c++).
    #[arg(long, env = "COPA_COMPILER_KIND", value_parser = parse_identity)]
    pub compiler_kind: Option<CompilerIdentity>,

    /// The real C compiler.
    #[arg(long, env = "COPA_CC")]
    pub cc: Option<PathBuf>,

    /// The real C++ compiler.
    #[arg(long, env = "COPA_CXX")]
    pub cxx: Option<PathBuf>,

    /// Every optimization flag the C compiler knows.
    #[arg(long, env = "COPA_CC_FLAGS_FILE")]
    pub cc_flags_file: Option<PathBuf>,

    /// Every optimization flag the C++ compiler knows.
    #[arg(long, env = "COPA_CXX_FLAGS_FILE")]
    pub cxx_flags_file: Option<PathBuf>,

    /// The optimization flags to keep enabled.
    #[arg(long, env = "COPA_CURRENT_FLAGS_FILE")]
    pub current_flags_file: Option<PathBuf>,

    #[arg(long, env = "COPA_STRAY_FLAGS")]
    pub stray_flags: Option<StrayFlagPolicy>,

    /// Append enabled flags the build never passed.
    #[arg(long, env = "COPA_APPEND_MISSING", action = ArgAction::Set, value_parser = BoolishValueParser::new())]
    pub append_missing: Option<bool>,

    /// Print the original and rewritten command lines to stderr.
    #[arg(long, env = "COPA_DUMP", action = ArgAction::Set, value_parser = BoolishValueParser::new())]
    pub dump: Option<bool>,

    /// A TOML file with defaults for all of the above.
    #[arg(long, env = "COPA_CONFIG")]
    pub config: Option<PathBuf>,
}

fn parse_identity(value: &str) -> Result<CompilerIdentity, String> {
    CompilerIdentity::parse(value).ok_or_else(|| format!("unknown compiler kind {value:?}"))
}

/// A config file. Namely copa.toml
#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub current_flags_file: Option<PathBuf>,
    pub stray_flags: Option<StrayFlagPolicy>,
    pub append_missing: Option<bool>,
    pub dump: Option<bool>,
    #[serde(default)]
    pub cc: CompilerSection,
    #[serde(default)]
    pub cxx: CompilerSection,
}

/// Settings for one compiler identity.
#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct CompilerSection {
    /// The real compiler binary.
    pub compiler: Option<PathBuf>,
    /// The file listing every optimization flag this compiler knows.
    pub flags_file: Option<PathBuf>,
}

impl ConfigFile {
    pub fn read(path: &Path) -> Result<Self, CopaError> {
        let contents =
            std::fs::read_to_string(path).map_err(|source| CopaError::Configuration {
                path: path.to_path_buf(),
                source,
            })?;
        let mut file: ConfigFile =
            toml::from_str(&contents).map_err(|source| CopaError::InvalidConfigFile {
                path: path.to_path_buf(),
                source,
            })?;

        // Relative paths are relative to the config file.
        if let Some(base) = path.parent() {
            for path in [
                &mut file.current_flags_file,
                &mut file.cc.flags_file,
                &mut file.cxx.flags_file,
            ]
            .into_iter()
            .flatten()
            {
                if path.is_relative() {
                    *path = base.join(&*path);
                }
            }
        }

        Ok(file)
    }
}

/// The resolved configuration of one wrapper invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrapperConfig {
    pub identity: CompilerIdentity,
    pub cc: PathBuf,
    pub cxx: PathBuf,
    pub cc_flags_file: Option<PathBuf>,
    pub cxx_flags_file: Option<PathBuf>,
    pub current_flags_file: Option<PathBuf>,
    pub stray_flags: StrayFlagPolicy,
    pub append_missing: bool,
    pub dump: bool,
}

impl Default for WrapperConfig {
    fn default() -> Self {
        Self {
            identity: CompilerIdentity::Cc,
            cc: PathBuf::from(CompilerIdentity::Cc.default_compiler()),
            cxx: PathBuf::from(CompilerIdentity::Cxx.default_compiler()),
            cc_flags_file: None,
            cxx_flags_file: None,
            current_flags_file: None,
            stray_flags: StrayFlagPolicy::default(),
            append_missing: true,
            dump: false,
        }
    }
}

impl WrapperConfig {
    /// Builds the configuration from the process environment.
    pub fn from_env(argv0: &OsStr) -> Result<Self, CopaError> {
        let options = EnvOptions::try_parse_from([argv0])
            .map_err(|e| CopaError::InvalidOption(e.to_string()))?;
        Self::resolve(argv0, options)
    }

    /// Merges the options over the config file (if any) and the defaults.
    pub fn resolve(argv0: &OsStr, options: EnvOptions) -> Result<Self, CopaError> {
        let file = match &options.config {
            Some(path) => ConfigFile::read(path)?,
            None => ConfigFile::default(),
        };
        let defaults = WrapperConfig::default();

        Ok(WrapperConfig {
            identity: options
                .compiler_kind
                .unwrap_or_else(|| CompilerIdentity::from_program_name(argv0)),
            cc: options.cc.or(file.cc.compiler).unwrap_or(defaults.cc),
            cxx: options.cxx.or(file.cxx.compiler).unwrap_or(defaults.cxx),
            cc_flags_file: options.cc_flags_file.or(file.cc.flags_file),
            cxx_flags_file: options.cxx_flags_file.or(file.cxx.flags_file),
            current_flags_file: options.current_flags_file.or(file.current_flags_file),
            stray_flags: options
                .stray_flags
                .or(file.stray_flags)
                .unwrap_or(defaults.stray_flags),
            append_missing: options
                .append_missing
                .or(file.append_missing)
                .unwrap_or(defaults.append_missing),
            dump: options.dump.or(file.dump).unwrap_or(defaults.dump),
        })
    }

    /// The real compiler for the selected identity.
    pub fn compiler(&self) -> &Path {
        match self.identity {
            CompilerIdentity::Cc => &self.cc,
            CompilerIdentity::Cxx => &self.cxx,
        }
    }

    /// The universe file for the selected identity.
    pub fn universe_file(&self) -> Option<&Path> {
        match self.identity {
            CompilerIdentity::Cc => self.cc_flags_file.as_deref(),
            CompilerIdentity::Cxx => self.cxx_flags_file.as_deref(),
        }
    }
}
