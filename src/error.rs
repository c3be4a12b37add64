use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CopaError {
    #[error("cannot read {path:?}")]
    Configuration {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config file {path:?}")]
    InvalidConfigFile {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid option: {0}")]
    InvalidOption(String),
    #[error("failed to run the real compiler {program:?}")]
    Delegation {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CopaError {
    /// The process exit code used when this error aborts an invocation.
    pub fn exit_code(&self) -> i32 {
        match self {
            CopaError::Delegation { source, .. }
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                127
            }
            CopaError::Delegation { .. } => 126,
            _ => 1,
        }
    }
}
