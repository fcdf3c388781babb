use thiserror::Error;

/// Environment variable naming a single target executable (single-target launch).
pub const ENV_ELF: &str = "RVWEB_ELF";

/// Environment variable holding a whitespace-delimited command line (command-line launch).
pub const ENV_CMDLINE: &str = "RVWEB_CMDLINE";

/// Arguments handed to the guest entry point. Built once, never modified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchArgs(Vec<String>);

impl LaunchArgs {
    /// A single-element argument list naming the target executable.
    pub fn single(target: impl Into<String>) -> Self {
        Self(vec![target.into()])
    }

    /// Split a command line on whitespace runs.
    ///
    /// Consecutive separators collapse and leading/trailing whitespace is ignored. There is no
    /// quoting or escaping: `"a b  c"` yields `["a", "b", "c"]`.
    pub fn from_command_line(cli: &str) -> Self {
        Self(cli.split_whitespace().map(str::to_owned).collect())
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

/// How the dispatcher starts the guest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchMode {
    /// Launch the named target as soon as the guest is ready. `None` is a configuration error
    /// that skips the launch without tearing anything down.
    Target(Option<String>),
    /// Wait for the host to supply a command line after readiness.
    CommandLine,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("both RVWEB_ELF and RVWEB_CMDLINE are set; choose one launch mode")]
    Conflicting,
}

/// Host-visible launch configuration: either one target or one command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchConfig {
    Target(String),
    CommandLine(String),
}

impl LaunchConfig {
    /// Read the launch configuration from [`ENV_ELF`] / [`ENV_CMDLINE`].
    ///
    /// Empty values count as unset. Returns `Ok(None)` when neither is set.
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Option<Self>, ConfigError> {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        match (non_empty(ENV_ELF), non_empty(ENV_CMDLINE)) {
            (Some(_), Some(_)) => Err(ConfigError::Conflicting),
            (Some(target), None) => Ok(Some(Self::Target(target))),
            (None, Some(cli)) => Ok(Some(Self::CommandLine(cli))),
            (None, None) => Ok(None),
        }
    }

    pub fn mode(&self) -> LaunchMode {
        match self {
            Self::Target(target) => LaunchMode::Target(Some(target.clone())),
            Self::CommandLine(_) => LaunchMode::CommandLine,
        }
    }

    /// The command line to hand to the dispatcher once the guest is ready, if any.
    pub fn command_line(&self) -> Option<&str> {
        match self {
            Self::Target(_) => None,
            Self::CommandLine(cli) => Some(cli),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn command_line_collapses_whitespace_runs() {
        let args = LaunchArgs::from_command_line("a b  c");
        assert_eq!(args.as_slice(), &["a", "b", "c"]);
    }

    #[test]
    fn command_line_ignores_outer_whitespace_and_tabs() {
        let args = LaunchArgs::from_command_line("  -k\tImage  -b dtb \n");
        assert_eq!(args.iter().collect::<Vec<_>>(), vec!["-k", "Image", "-b", "dtb"]);
    }

    #[test]
    fn quotes_are_not_interpreted() {
        let args = LaunchArgs::from_command_line(r#"run "hello world""#);
        assert_eq!(args.as_slice(), &["run", "\"hello", "world\""]);
    }

    #[test]
    fn blank_command_line_yields_no_arguments() {
        assert!(LaunchArgs::from_command_line("   ").is_empty());
    }

    #[test]
    fn config_prefers_whichever_variable_is_set() {
        assert_eq!(
            LaunchConfig::from_lookup(lookup(&[(ENV_ELF, "hello.elf")])),
            Ok(Some(LaunchConfig::Target("hello.elf".into())))
        );
        assert_eq!(
            LaunchConfig::from_lookup(lookup(&[(ENV_CMDLINE, "-k Image")])),
            Ok(Some(LaunchConfig::CommandLine("-k Image".into())))
        );
    }

    #[test]
    fn config_treats_empty_values_as_unset() {
        assert_eq!(
            LaunchConfig::from_lookup(lookup(&[(ENV_ELF, ""), (ENV_CMDLINE, "  ")])),
            Ok(None)
        );
    }

    #[test]
    fn config_rejects_both_modes() {
        assert_eq!(
            LaunchConfig::from_lookup(lookup(&[(ENV_ELF, "a"), (ENV_CMDLINE, "b")])),
            Err(ConfigError::Conflicting)
        );
    }

    #[test]
    fn config_maps_to_launch_mode() {
        let target = LaunchConfig::Target("x.elf".into());
        assert_eq!(target.mode(), LaunchMode::Target(Some("x.elf".into())));
        assert_eq!(target.command_line(), None);

        let cli = LaunchConfig::CommandLine("a b".into());
        assert_eq!(cli.mode(), LaunchMode::CommandLine);
        assert_eq!(cli.command_line(), Some("a b"));
    }
}
