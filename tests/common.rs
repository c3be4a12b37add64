use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    process::Command,
};

use copa::policy::FlagSet;

#[allow(unused)]
pub fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|x| x.to_string()).collect()
}

#[allow(unused)]
pub fn os_args(list: &[&str]) -> Vec<OsString> {
    list.iter().map(OsString::from).collect()
}

#[allow(unused)]
pub fn set(list: &[&str]) -> FlagSet {
    list.iter().copied().collect()
}

/// Writes a policy file with one flag per line.
#[allow(unused)]
pub fn write_policy(dir: &Path, name: &str, flags: &[&str]) -> PathBuf {
    let path = dir.join(name);
    let mut contents = flags.join("\n");
    contents.push('\n');
    std::fs::write(&path, contents).expect("failed to write policy file");
    path
}

/// The wrapper binary with a clean environment, so a developer's own
/// `COPA_*` variables cannot leak into the tests.
#[allow(unused)]
pub fn copa() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_copa"));
    cmd.env_clear();
    if let Some(path) = std::env::var_os("PATH") {
        cmd.env("PATH", path);
    }
    cmd
}
