//! Reachability gate for the remote profile.
//!
//! # Design
//! - A direct existence probe decides reachability.
//! - On failure the authentication trigger runs once; a trigger that cannot
//!   launch fails the gate immediately.
//! - Afterwards the probe is polled at a fixed interval until the path appears
//!   or the deadline passes. The caller decides what failure means for the run.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use profsync_config::AccessSettings;
use profsync_events::{Event, EventBus};
use tokio::process::Command;
use tokio::time::{Instant, sleep};
use tracing::{error, info, warn};

use crate::endpoint::RemoteEndpoint;
use crate::error::{ExecError, ExecResult};

/// Existence check for a remote path.
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    /// Whether `path` currently exists and is accessible.
    async fn is_reachable(&self, path: &Path) -> bool;
}

/// Out-of-band action that prompts the user to authenticate against a host.
#[async_trait]
pub trait AuthTrigger: Send + Sync {
    /// Start the action against the host root `root`.
    async fn trigger(&self, root: &Path) -> ExecResult<()>;
}

/// Probe backed by the filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsProbe;

#[async_trait]
impl ReachabilityProbe for FsProbe {
    async fn is_reachable(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }
}

/// Trigger that opens a file browser at the host root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserTrigger {
    browser: String,
}

impl BrowserTrigger {
    /// Trigger launching `browser`.
    #[must_use]
    pub fn new(browser: impl Into<String>) -> Self {
        Self {
            browser: browser.into(),
        }
    }
}

#[async_trait]
impl AuthTrigger for BrowserTrigger {
    async fn trigger(&self, root: &Path) -> ExecResult<()> {
        // The browser keeps running on its own; only the launch is observed.
        let _child = Command::new(&self.browser)
            .arg(root)
            .spawn()
            .map_err(|source| ExecError::Launch {
                program: self.browser.clone(),
                source,
            })?;
        Ok(())
    }
}

/// Reachability gate with a bounded authentication wait.
pub struct AccessGate {
    probe: Arc<dyn ReachabilityProbe>,
    trigger: Arc<dyn AuthTrigger>,
    events: EventBus,
    poll_interval: Duration,
    timeout: Duration,
}

impl AccessGate {
    /// Gate polling every `poll_interval` for at most `timeout`.
    #[must_use]
    pub fn new(
        probe: Arc<dyn ReachabilityProbe>,
        trigger: Arc<dyn AuthTrigger>,
        events: EventBus,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            probe,
            trigger,
            events,
            poll_interval,
            timeout,
        }
    }

    /// Gate using the filesystem probe and the configured browser.
    #[must_use]
    pub fn from_settings(settings: &AccessSettings, events: EventBus) -> Self {
        Self::new(
            Arc::new(FsProbe),
            Arc::new(BrowserTrigger::new(settings.browser.clone())),
            events,
            settings.poll_interval(),
            settings.timeout(),
        )
    }

    /// Ensure the endpoint's base path is reachable.
    pub async fn ensure_access(&self, endpoint: &RemoteEndpoint) -> bool {
        let target = endpoint.base_path();
        if self.check(target).await {
            info!(path = %target.display(), "remote profile is reachable");
            return true;
        }

        let root = endpoint.host_root();
        warn!(path = %target.display(), "remote profile not reachable; opening {} to authenticate", root.display());
        let launched = self.trigger.trigger(&root).await;
        let _ = self.events.publish(Event::AuthenticationTriggered {
            root: root.display().to_string(),
            launched: launched.is_ok(),
        });
        if let Err(err) = launched {
            error!(error = %err, detail = ?err, "could not start authentication");
            return false;
        }

        info!(
            timeout_secs = self.timeout.as_secs(),
            "waiting for access to {}",
            target.display()
        );
        let deadline = Instant::now() + self.timeout;
        loop {
            sleep(self.poll_interval).await;
            if self.check(target).await {
                info!(path = %target.display(), "access granted");
                return true;
            }
            if Instant::now() >= deadline {
                error!(
                    path = %target.display(),
                    timeout_secs = self.timeout.as_secs(),
                    "timed out waiting for access"
                );
                return false;
            }
        }
    }

    async fn check(&self, target: &Path) -> bool {
        let reachable = self.probe.is_reachable(target).await;
        let _ = self.events.publish(Event::AccessChecked {
            target: target.display().to_string(),
            reachable,
        });
        reachable
    }
}
