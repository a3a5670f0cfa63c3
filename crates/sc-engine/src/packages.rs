//! Host package installation with polling and per-package timeouts.

use std::fmt;
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::error::EngineResult;

/// Identifier of an issued install request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(pub u64);

/// State of an install request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestStatus {
    /// Still running.
    Pending,
    /// Installed.
    Succeeded,
    /// The package manager reported an error.
    Failed(String),
}

/// The package manager the installer drives.
pub trait PackageClient: fmt::Debug {
    /// Start installing a package.
    fn request(&mut self, package: &str) -> EngineResult<RequestId>;

    /// Current status of a request.
    fn poll(&mut self, request: RequestId) -> RequestStatus;
}

/// Polling cadence and per-package deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstallPolicy {
    /// Delay between polling rounds.
    pub poll_interval: Duration,
    /// How long a single package may stay pending, from when its request
    /// was issued.
    pub timeout: Duration,
}

impl Default for InstallPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            timeout: Duration::from_secs(120),
        }
    }
}

/// Final outcome for one package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallOutcome {
    /// Installed.
    Installed,
    /// The request could not be issued or the install failed.
    Failed(String),
    /// Still pending when the timeout elapsed.
    TimedOut,
}

impl fmt::Display for InstallOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Installed => f.write_str("installed"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
            Self::TimedOut => f.write_str("timed out"),
        }
    }
}

/// Outcome of one package install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageResult {
    /// Package id.
    pub package: String,
    /// What happened.
    pub outcome: InstallOutcome,
}

/// Outcomes of an install run, in request order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InstallSummary {
    /// One entry per requested package.
    pub results: Vec<PackageResult>,
}

impl InstallSummary {
    /// Whether every package installed.
    pub fn is_success(&self) -> bool {
        self.results
            .iter()
            .all(|r| r.outcome == InstallOutcome::Installed)
    }

    /// Packages that did not install.
    pub fn failures(&self) -> Vec<&PackageResult> {
        self.results
            .iter()
            .filter(|r| r.outcome != InstallOutcome::Installed)
            .collect()
    }

    /// Number of requested packages.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Return `true` if nothing was requested.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

struct Outstanding {
    slot: usize,
    request: RequestId,
    issued: Instant,
}

/// Install `packages`, waiting for every request to finish or time out.
///
/// All requests are issued before polling starts. A timed-out package does
/// not cancel its siblings.
pub fn install_packages(
    client: &mut dyn PackageClient,
    packages: &[String],
    policy: &InstallPolicy,
) -> InstallSummary {
    let mut outcomes: Vec<Option<InstallOutcome>> = vec![None; packages.len()];
    let mut outstanding = Vec::new();

    for (slot, package) in packages.iter().enumerate() {
        match client.request(package) {
            Ok(request) => {
                log::info!("installing package {package}");
                outstanding.push(Outstanding {
                    slot,
                    request,
                    issued: Instant::now(),
                });
            }
            Err(e) => {
                log::error!("package {package} request failed: {e}");
                outcomes[slot] = Some(InstallOutcome::Failed(e.to_string()));
            }
        }
    }

    while !outstanding.is_empty() {
        outstanding.retain(|pending| {
            let package = &packages[pending.slot];
            let outcome = match client.poll(pending.request) {
                RequestStatus::Succeeded => {
                    log::info!("package {package} installed");
                    InstallOutcome::Installed
                }
                RequestStatus::Failed(reason) => {
                    log::error!("package {package} failed: {reason}");
                    InstallOutcome::Failed(reason)
                }
                RequestStatus::Pending if pending.issued.elapsed() >= policy.timeout => {
                    log::error!("package {package} timed out after {:?}", policy.timeout);
                    InstallOutcome::TimedOut
                }
                RequestStatus::Pending => return true,
            };
            outcomes[pending.slot] = Some(outcome);
            false
        });
        if !outstanding.is_empty() {
            thread::sleep(policy.poll_interval);
        }
    }

    InstallSummary {
        results: packages
            .iter()
            .zip(outcomes)
            .map(|(package, outcome)| PackageResult {
                package: package.clone(),
                outcome: outcome.unwrap_or(InstallOutcome::TimedOut),
            })
            .collect(),
    }
}
