//! Shim configuration
//!
//! The sandbox has no users, processes or hostname of its own. The values
//! reported for them are placeholders, kept here so embedders can pick
//! their own.

use crate::{BurrowError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Placeholder answers for identity, host and clock queries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShimConfig {
    /// Reported real user id
    pub uid: u32,

    /// Reported real group id
    pub gid: u32,

    /// Reported effective user id
    pub euid: u32,

    /// Reported effective group id
    pub egid: u32,

    /// Reported process id
    pub pid: u32,

    /// Reported parent process id
    pub ppid: u32,

    /// Supplementary groups
    pub groups: Vec<u32>,

    /// Answer to `kern.hostname`
    pub hostname: String,

    /// Initial file mode creation mask
    pub umask: u32,

    /// Precision hint passed with realtime clock queries, in nanoseconds
    pub clock_precision_ns: u64,
}

impl Default for ShimConfig {
    fn default() -> Self {
        Self {
            uid: 1,
            gid: 1,
            euid: 1,
            egid: 1,
            pid: 3,
            ppid: 2,
            groups: vec![1],
            hostname: "js".into(),
            umask: 0,
            clock_precision_ns: 1_000,
        }
    }
}

impl ShimConfig {
    /// Create a new config builder
    #[must_use]
    pub fn builder() -> ShimConfigBuilder {
        ShimConfigBuilder::default()
    }

    /// Reject values no caller could make sense of
    pub fn validate(&self) -> Result<()> {
        if self.hostname.is_empty() {
            return Err(BurrowError::Config("hostname must not be empty".into()));
        }
        if self.umask > 0o777 {
            return Err(BurrowError::Config(format!(
                "umask {:#o} has bits outside 0o777",
                self.umask
            )));
        }
        if self.clock_precision_ns == 0 {
            return Err(BurrowError::Config(
                "clock precision must be at least 1ns".into(),
            ));
        }
        Ok(())
    }
}

/// Builder for ShimConfig
#[derive(Debug, Default)]
pub struct ShimConfigBuilder {
    config: ShimConfig,
}

impl ShimConfigBuilder {
    /// Set real and effective user id together
    #[must_use]
    pub const fn uid(mut self, uid: u32) -> Self {
        self.config.uid = uid;
        self.config.euid = uid;
        self
    }

    /// Set real and effective group id together
    #[must_use]
    pub const fn gid(mut self, gid: u32) -> Self {
        self.config.gid = gid;
        self.config.egid = gid;
        self
    }

    #[must_use]
    pub const fn euid(mut self, euid: u32) -> Self {
        self.config.euid = euid;
        self
    }

    #[must_use]
    pub const fn egid(mut self, egid: u32) -> Self {
        self.config.egid = egid;
        self
    }

    #[must_use]
    pub const fn pid(mut self, pid: u32) -> Self {
        self.config.pid = pid;
        self
    }

    #[must_use]
    pub const fn ppid(mut self, ppid: u32) -> Self {
        self.config.ppid = ppid;
        self
    }

    #[must_use]
    pub fn group(mut self, gid: u32) -> Self {
        self.config.groups.push(gid);
        self
    }

    #[must_use]
    pub fn groups(mut self, groups: impl IntoIterator<Item = u32>) -> Self {
        self.config.groups = groups.into_iter().collect();
        self
    }

    #[must_use]
    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.config.hostname = hostname.into();
        self
    }

    #[must_use]
    pub const fn umask(mut self, mask: u32) -> Self {
        self.config.umask = mask;
        self
    }

    #[must_use]
    pub const fn clock_precision_ns(mut self, ns: u64) -> Self {
        self.config.clock_precision_ns = ns;
        self
    }

    #[must_use]
    pub fn build(self) -> ShimConfig {
        self.config
    }
}

/// Get the config file path from the BURROW_CONFIG env var, if set
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    std::env::var_os("BURROW_CONFIG").map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid_placeholders() {
        let config = ShimConfig::default();
        config.validate().unwrap();
        assert_eq!((config.uid, config.gid, config.pid, config.ppid), (1, 1, 3, 2));
        assert_eq!(config.groups, vec![1]);
        assert_eq!(config.hostname, "js");
    }

    #[test]
    fn builder_sets_real_and_effective_ids() {
        let config = ShimConfig::builder().uid(1000).gid(100).euid(0).build();
        assert_eq!((config.uid, config.euid), (1000, 0));
        assert_eq!((config.gid, config.egid), (100, 100));
    }

    #[test]
    fn validate_rejects_nonsense() {
        assert!(ShimConfig::builder().hostname("").build().validate().is_err());
        assert!(ShimConfig::builder().umask(0o1777).build().validate().is_err());
        assert!(ShimConfig::builder().clock_precision_ns(0).build().validate().is_err());
    }
}
