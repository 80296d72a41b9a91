//! Polling for remote state transitions.
//!
//! Workspaces and workspace groups are provisioned asynchronously: create,
//! resize, suspend and delete return before the object settles. Callers poll
//! until the object reports the state they need.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::debug;

use super::models::states;
use crate::error::ProviderError;

/// What the poller should look for.
#[derive(Debug, Clone, Copy)]
pub struct WaitFor<'a> {
    /// Human-readable object description for log and error messages.
    pub what: &'a str,
    /// The state that ends the wait successfully.
    pub target: &'a str,
    /// Treat a 404 as reaching the target (used when waiting for deletion).
    pub gone_is_target: bool,
}

impl<'a> WaitFor<'a> {
    /// Wait until the object reports `target`.
    pub fn state(what: &'a str, target: &'a str) -> Self {
        Self {
            what,
            target,
            gone_is_target: false,
        }
    }

    /// Wait until the object is terminated or no longer exists.
    pub fn terminated(what: &'a str) -> Self {
        Self {
            what,
            target: states::TERMINATED,
            gone_is_target: true,
        }
    }
}

/// Poll `fetch_state` every `interval` until it returns the target state.
///
/// Fails immediately if the object reports `FAILED`, and with
/// [`ProviderError::DeadlineExceeded`] once `timeout` has elapsed.
pub async fn wait_for_state<F, Fut>(
    spec: WaitFor<'_>,
    interval: Duration,
    timeout: Duration,
    mut fetch_state: F,
) -> Result<(), ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<String, ProviderError>>,
{
    // A timeout too large to represent means no deadline.
    let deadline = Instant::now().checked_add(timeout);

    loop {
        match fetch_state().await {
            Ok(state) if state.eq_ignore_ascii_case(spec.target) => return Ok(()),
            Ok(state) if state.eq_ignore_ascii_case(states::FAILED) => {
                return Err(ProviderError::FailedPrecondition(format!(
                    "{} entered state {} while waiting for {}",
                    spec.what, state, spec.target
                )));
            },
            Ok(state) => {
                debug!(what = spec.what, state = %state, target = spec.target, "Waiting for state");
            },
            Err(e) if e.is_not_found() && spec.gone_is_target => return Ok(()),
            Err(e) => return Err(e),
        }

        let past_deadline = match (Instant::now().checked_add(interval), deadline) {
            (_, None) => false,
            (Some(next_poll), Some(deadline)) => next_poll > deadline,
            (None, Some(_)) => true,
        };
        if past_deadline {
            return Err(ProviderError::DeadlineExceeded(format!(
                "timed out after {:?} waiting for {} to become {}",
                timeout, spec.what, spec.target
            )));
        }
        sleep(interval).await;
    }
}
