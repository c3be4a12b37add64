use std::{collections::HashSet, path::Path};

use itertools::Itertools;
use tracing::instrument;

use crate::{
    driver::config::{StrayFlagPolicy, WrapperConfig},
    error::CopaError,
};

/// A set of flag literals that remembers the order flags were first seen in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagSet {
    ordered: Vec<String>,
    members: HashSet<String>,
}

impl FlagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses the policy file format: one flag per line, surrounding
    /// whitespace trimmed, blank lines skipped.
    pub fn parse(contents: &str) -> Self {
        contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect()
    }

    pub fn read(path: &Path) -> Result<Self, CopaError> {
        let contents =
            std::fs::read_to_string(path).map_err(|source| CopaError::Configuration {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::parse(&contents))
    }

    /// Returns whether the flag was newly inserted.
    pub fn insert(&mut self, flag: impl Into<String>) -> bool {
        let flag = flag.into();
        if self.members.contains(&flag) {
            return false;
        }
        self.members.insert(flag.clone());
        self.ordered.push(flag);
        true
    }

    pub fn contains(&self, flag: &str) -> bool {
        self.members.contains(flag)
    }

    /// Matches either the exact token or, for `name=value` tokens, the name.
    pub fn matches(&self, token: &str) -> bool {
        self.contains(token) || self.contains(flag_name(token))
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    /// Iterates in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ordered.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for FlagSet {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        let mut set = FlagSet::new();
        for flag in iter {
            set.insert(flag);
        }
        set
    }
}

/// The part of a flag used for set membership: everything before the first `=`.
pub fn flag_name(token: &str) -> &str {
    token.split_once('=').map_or(token, |(name, _)| name)
}

/// The resolved optimization policy for one invocation.
#[derive(Debug, Clone, Default)]
pub struct Policy {
    /// Every optimization flag the compiler knows. Empty means pass-through.
    pub universe: FlagSet,
    /// Flags that stay enabled.
    pub enabled: FlagSet,
}

impl Policy {
    #[instrument(level = "debug", skip_all)]
    pub fn load(config: &WrapperConfig) -> Result<Self, CopaError> {
        let universe = read_optional(config.universe_file())?;
        let enabled = read_optional(config.current_flags_file.as_deref())?;
        tracing::debug!(
            "loaded policy: {} known flags, {} enabled",
            universe.len(),
            enabled.len()
        );

        let policy = Policy { universe, enabled };

        if !policy.is_pass_through() {
            let strays = policy.strays().collect_vec();
            match config.stray_flags {
                StrayFlagPolicy::Warn => {
                    for flag in &strays {
                        tracing::warn!(
                            "enabled flag {:?} is not a known optimization flag; not forcing it",
                            flag
                        );
                    }
                }
                StrayFlagPolicy::Append => {
                    for flag in &strays {
                        tracing::debug!("enabled flag {:?} is unknown, appending anyway", flag);
                    }
                }
                StrayFlagPolicy::Ignore => {}
            }
        }

        Ok(policy)
    }

    pub fn is_pass_through(&self) -> bool {
        self.universe.is_empty()
    }

    /// Enabled flags the universe does not know about.
    pub fn strays(&self) -> impl Iterator<Item = &str> {
        self.enabled.iter().filter(|x| !self.universe.matches(x))
    }
}

fn read_optional(path: Option<&Path>) -> Result<FlagSet, CopaError> {
    match path {
        Some(path) => {
            let set = FlagSet::read(path)?;
            tracing::debug!("read {} flags from {:?}", set.len(), path);
            Ok(set)
        }
        None => Ok(FlagSet::new()),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::{FlagSet, Policy, flag_name};
    use crate::{
        driver::config::{StrayFlagPolicy, WrapperConfig},
        error::CopaError,
    };

    fn write_flags(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn parse_trims_and_dedups() {
        let set = FlagSet::parse("  -fcaller-saves \n\n-fgcse\r\n-fcaller-saves\n\t\n");
        assert_eq!(set.iter().collect::<Vec<_>>(), ["-fcaller-saves", "-fgcse"]);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn matches_valued_flags_by_name() {
        let set: FlagSet = ["-falign-functions"].into_iter().collect();
        assert!(set.matches("-falign-functions=32"));
        assert!(set.matches("-falign-functions"));
        assert!(!set.matches("-falign-loops=32"));
        assert_eq!(flag_name("-falign-functions=32:16"), "-falign-functions");
        assert_eq!(flag_name("foo.c"), "foo.c");
    }

    #[test]
    fn unset_paths_mean_pass_through() {
        let config = WrapperConfig::default();
        let policy = Policy::load(&config).unwrap();
        assert!(policy.is_pass_through());
        assert!(policy.enabled.is_empty());
    }

    #[test]
    fn loads_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let universe = write_flags(&dir, "all.txt", "-fgcse\n-fcaller-saves\n-fipa-pta\n");
        let current = write_flags(&dir, "current.txt", "-fipa-pta\n-fbogus\n");

        let config = WrapperConfig {
            cc_flags_file: Some(universe),
            current_flags_file: Some(current),
            stray_flags: StrayFlagPolicy::Ignore,
            ..Default::default()
        };
        let policy = Policy::load(&config).unwrap();

        assert_eq!(policy.universe.len(), 3);
        assert!(policy.enabled.contains("-fipa-pta"));
        assert_eq!(policy.strays().collect::<Vec<_>>(), ["-fbogus"]);
    }

    #[test]
    fn unreadable_current_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let universe = write_flags(&dir, "all.txt", "-fgcse\n");
        let missing = dir.path().join("missing.txt");

        let config = WrapperConfig {
            cc_flags_file: Some(universe),
            current_flags_file: Some(missing.clone()),
            ..Default::default()
        };
        let error = Policy::load(&config).expect_err("expected error");
        assert!(
            matches!(&error, CopaError::Configuration { path, .. } if *path == missing),
            "{:#?}",
            error
        );
    }

    #[test]
    fn non_utf8_universe_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("all.txt");
        std::fs::write(&path, [0xff, 0xfe, b'\n']).unwrap();

        let config = WrapperConfig {
            cc_flags_file: Some(path),
            ..Default::default()
        };
        assert!(matches!(
            Policy::load(&config),
            Err(CopaError::Configuration { .. })
        ));
    }
}
