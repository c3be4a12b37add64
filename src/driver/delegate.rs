use std::{
    ffi::OsString,
    path::Path,
    process::{Command, ExitStatus},
};

use tracing::instrument;

use crate::error::CopaError;

/// Runs the real compiler.
pub trait Executor {
    /// Runs `program` with `args` and returns its exit code.
    fn execute(&self, program: &Path, args: &[OsString]) -> Result<i32, CopaError>;
}

/// Spawns the compiler as a child process sharing our stdin, stdout and stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessExecutor;

impl Executor for ProcessExecutor {
    #[instrument(level = "debug", skip(self))]
    fn execute(&self, program: &Path, args: &[OsString]) -> Result<i32, CopaError> {
        let mut compiler = Command::new(program);
        let status = compiler
            .args(args)
            .status()
            .map_err(|source| CopaError::Delegation {
                program: program.to_path_buf(),
                source,
            })?;
        tracing::debug!("Compiler result ok: {}", status.success());

        Ok(exit_code(status))
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            tracing::debug!("Compiler killed by signal {}", signal);
            return 128 + signal;
        }
    }

    1
}

/// Renders a command line for humans, quoting arguments that contain spaces.
/// Bytes that are not valid UTF-8 show up as replacement characters.
pub fn render_command(program: &Path, args: &[OsString]) -> String {
    let mut rendered = program.display().to_string();
    for arg in args {
        let arg = arg.to_string_lossy();
        rendered.push(' ');
        if arg.is_empty() || arg.contains(char::is_whitespace) {
            rendered.push('"');
            rendered.push_str(&arg);
            rendered.push('"');
        } else {
            rendered.push_str(&arg);
        }
    }
    rendered
}
