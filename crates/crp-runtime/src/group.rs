//! Lifecycle of a launched container group.
//!
//! A [`ContainerGroup`] is a scoped resource: the teardown guard is armed
//! before the first container starts, and dropping the group (normal
//! return, error propagation, or unwinding) forcibly removes every
//! container carrying the management label.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crp_common::config::LaunchSettings;
use crp_common::constants;
use crp_common::error::Result;
use crp_compose::ComposedGroup;
use crp_core::capability::CapabilityPolicy;

use crate::backend::{ContainerBackend, ProcessExit};
use crate::launcher::{LaunchRecord, Launcher};

/// Interval between exit checks while waiting on containers.
pub const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Cooperative cancellation token backed by an `AtomicBool`.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called on
    /// any clone.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Removes every labeled container, returning how many were removed.
///
/// Failures are logged, never returned, so teardown cannot change the
/// outcome of a run. Safe to call any number of times.
pub fn teardown(backend: &dyn ContainerBackend) -> usize {
    match backend.remove_labeled(constants::MANAGEMENT_LABEL) {
        Ok(0) => {
            tracing::debug!("no labeled containers to remove");
            0
        }
        Ok(removed) => {
            tracing::info!(removed, "removed labeled containers");
            removed
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to remove labeled containers");
            0
        }
    }
}

/// Runs [`teardown`] when dropped.
pub struct TeardownGuard<'a> {
    backend: &'a dyn ContainerBackend,
}

impl<'a> TeardownGuard<'a> {
    /// Arms a guard for `backend`.
    #[must_use]
    pub fn arm(backend: &'a dyn ContainerBackend) -> Self {
        Self { backend }
    }
}

impl Drop for TeardownGuard<'_> {
    fn drop(&mut self) {
        let _ = teardown(self.backend);
    }
}

/// How waiting on a group ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    /// Every engine process exited; exits are listed in launch order.
    Completed(Vec<(String, ProcessExit)>),
    /// Cancellation was requested before every process exited.
    Interrupted,
}

/// A started container group. Dropping it tears the group down.
pub struct ContainerGroup<'a> {
    records: Vec<LaunchRecord>,
    // Declared last so records are dropped before containers are removed.
    _guard: TeardownGuard<'a>,
}

impl<'a> ContainerGroup<'a> {
    /// Starts every container of `composed` in order.
    ///
    /// The first container owns the network namespace; every later one is
    /// launched sharing the first one's namespace and volumes.
    ///
    /// # Errors
    ///
    /// Returns the first launch error. Containers started before it are
    /// removed as the partially built group is dropped.
    pub fn launch(
        backend: &'a dyn ContainerBackend,
        composed: &ComposedGroup,
        policy: &CapabilityPolicy,
        settings: &LaunchSettings,
    ) -> Result<Self> {
        let mut group = Self {
            records: Vec::with_capacity(composed.len()),
            _guard: TeardownGuard::arm(backend),
        };
        let launcher = Launcher::new(backend, policy, settings);

        for container in composed {
            let share_with = group.records.first().map(|r| r.name.as_str());
            let record = launcher.launch(container, share_with)?;
            group.records.push(record);
        }

        tracing::info!(
            "When you gracefully terminate this process [Ctrl+C] the containers will be destroyed."
        );
        Ok(group)
    }

    /// Started containers in launch order.
    #[must_use]
    pub fn records(&self) -> &[LaunchRecord] {
        &self.records
    }

    /// Name of the namespace-owning container.
    #[must_use]
    pub fn primary_name(&self) -> Option<&str> {
        self.records.first().map(|r| r.name.as_str())
    }

    /// Waits for each engine process in launch order.
    ///
    /// Cancellation stops the wait without touching the processes;
    /// removal is left to the teardown guard.
    ///
    /// # Errors
    ///
    /// Returns an error if a process status cannot be queried.
    pub fn wait(&mut self, cancel: &CancelToken, poll: Duration) -> Result<WaitOutcome> {
        let mut exits = Vec::with_capacity(self.records.len());

        for record in &mut self.records {
            let exit = loop {
                if cancel.is_cancelled() {
                    tracing::info!("interrupted, stopping wait");
                    return Ok(WaitOutcome::Interrupted);
                }
                if let Some(exit) = record.process.try_wait()? {
                    break exit;
                }
                thread::sleep(poll);
            };

            if exit.success() {
                tracing::info!(name = %record.name, "container exited");
            } else {
                tracing::warn!(name = %record.name, %exit, "container exited unsuccessfully");
            }
            exits.push((record.name.clone(), exit));
        }

        Ok(WaitOutcome::Completed(exits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_token_starts_uncancelled() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn cancel_token_is_idempotent_and_shared() {
        let a = CancelToken::new();
        let b = a.clone();
        a.cancel();
        a.cancel();
        assert!(b.is_cancelled());
    }
}
