use std::{ffi::OsString, io::IsTerminal, time::Instant};

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use crate::{
    error::CopaError,
    policy::Policy,
    rewrite::Rewriter,
};
use config::{StrayFlagPolicy, WrapperConfig};
use delegate::{Executor, ProcessExecutor, render_command};

pub mod config;
pub mod delegate;

/// Loads the policy, rewrites `args` and hands them to the real compiler.
///
/// Returns the compiler's exit code. Policy errors are returned before the
/// executor is touched.
pub fn run(
    config: &WrapperConfig,
    args: &[OsString],
    executor: &dyn Executor,
) -> Result<i32, CopaError> {
    let policy = Policy::load(config)?;

    let rewritten = Rewriter::new(&policy.universe, &policy.enabled)
        .append_missing(config.append_missing)
        .append_stray(config.stray_flags == StrayFlagPolicy::Append)
        .rewrite(args);

    let program = config.compiler();
    if config.dump {
        eprintln!("copa: original: {}", render_command(program, args));
        eprintln!("copa: rewritten: {}", render_command(program, &rewritten));
    }

    executor.execute(program, &rewritten)
}

pub fn main() {
    let start_time = Instant::now();

    init_tracing();

    let code = match try_main() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("copa: error: {err:#}");
            err.downcast_ref::<CopaError>()
                .map_or(1, CopaError::exit_code)
        }
    };

    tracing::debug!("Done in {:?}", start_time.elapsed());
    std::process::exit(code);
}

fn try_main() -> anyhow::Result<i32> {
    let mut argv = std::env::args_os();
    let argv0 = argv.next().unwrap_or_else(|| OsString::from("copa"));
    let args: Vec<OsString> = argv.collect();

    let config = WrapperConfig::from_env(&argv0).context("invalid copa configuration")?;
    tracing::debug!("Running with config: {:#?}", config);

    let code = run(&config, &args, &ProcessExecutor)?;
    Ok(code)
}

/// Logs go to stderr only; configure scripts read the compiler's stdout.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("COPA_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .init();
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, ffi::OsString, path::Path, path::PathBuf};

    use super::{
        config::{StrayFlagPolicy, WrapperConfig},
        delegate::Executor,
        run,
    };
    use crate::error::CopaError;

    #[derive(Default)]
    struct Recorder {
        calls: RefCell<Vec<(PathBuf, Vec<OsString>)>>,
        code: i32,
    }

    impl Executor for Recorder {
        fn execute(&self, program: &Path, args: &[OsString]) -> Result<i32, CopaError> {
            self.calls
                .borrow_mut()
                .push((program.to_path_buf(), args.to_vec()));
            Ok(self.code)
        }
    }

    fn args(list: &[&str]) -> Vec<OsString> {
        list.iter().map(OsString::from).collect()
    }

    #[test]
    fn unconfigured_is_a_drop_in_compiler() {
        let recorder = Recorder {
            code: 4,
            ..Default::default()
        };
        let input = args(&["-O2", "-c", "a.c"]);
        let code = run(&WrapperConfig::default(), &input, &recorder).unwrap();

        assert_eq!(code, 4);
        assert_eq!(
            recorder.calls.into_inner(),
            vec![(PathBuf::from("gcc"), input)]
        );
    }

    #[test]
    fn rewrites_before_delegating() {
        let dir = tempfile::tempdir().unwrap();
        let universe = dir.path().join("g++.txt");
        let current = dir.path().join("current.txt");
        std::fs::write(&universe, "-falign-functions\n-fcaller-saves\n-fbogus-cc-only\n").unwrap();
        std::fs::write(&current, "-fcaller-saves\n-fstray\n").unwrap();

        let config = WrapperConfig {
            identity: crate::invocation::CompilerIdentity::Cxx,
            cxx_flags_file: Some(universe),
            current_flags_file: Some(current),
            stray_flags: StrayFlagPolicy::Append,
            ..Default::default()
        };
        let recorder = Recorder::default();
        let input = args(&["-c", "foo.cc", "-O2", "-falign-functions", "-o", "foo.o"]);
        run(&config, &input, &recorder).unwrap();

        assert_eq!(
            recorder.calls.into_inner(),
            vec![(
                PathBuf::from("g++"),
                args(&["-c", "foo.cc", "-o", "foo.o", "-O0", "-fcaller-saves", "-fstray"])
            )]
        );
    }

    #[test]
    fn unreadable_policy_never_runs_the_compiler() {
        let dir = tempfile::tempdir().unwrap();
        let universe = dir.path().join("gcc.txt");
        std::fs::write(&universe, "-fgcse\n").unwrap();

        let config = WrapperConfig {
            cc_flags_file: Some(universe),
            current_flags_file: Some(dir.path().join("missing.txt")),
            ..Default::default()
        };
        let recorder = Recorder::default();
        let error = run(&config, &args(&["a.c"]), &recorder).expect_err("expected error");

        assert!(matches!(&error, CopaError::Configuration { .. }), "{:#?}", error);
        assert_ne!(error.exit_code(), 0);
        assert!(recorder.calls.borrow().is_empty());
    }
}
