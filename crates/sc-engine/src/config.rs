use std::time::Duration;

use crate::packages::InstallPolicy;

/// Configuration for a build or update pass.
#[derive(Debug, Clone)]
pub struct PassConfig {
    /// Whether module packages are installed before configuration.
    pub install_packages: bool,
    /// Polling and timeout policy for package installs.
    pub install_policy: InstallPolicy,
    /// Maximum operation log size (oldest operations dropped when exceeded). 0 = unlimited.
    pub max_ops: usize,
}

impl Default for PassConfig {
    fn default() -> Self {
        Self {
            install_packages: true,
            install_policy: InstallPolicy::default(),
            max_ops: 0,
        }
    }
}

impl PassConfig {
    /// Enable or disable package installation.
    pub fn with_install_packages(mut self, install: bool) -> Self {
        self.install_packages = install;
        self
    }

    /// Set the package install policy.
    pub fn with_install_policy(mut self, policy: InstallPolicy) -> Self {
        self.install_policy = policy;
        self
    }

    /// Set the per-package install timeout.
    pub fn with_install_timeout(mut self, timeout: Duration) -> Self {
        self.install_policy.timeout = timeout;
        self
    }

    /// Set the maximum operation log size (0 = unlimited).
    pub fn with_max_ops(mut self, max: usize) -> Self {
        self.max_ops = max;
        self
    }
}
