//! Start/shutdown state machine shared by the concrete piers.
//!
//! `NotStarted -> Running -> ShutDown`, or `NotStarted -> ShutDown` when a
//! pier is shut down before it ever started. `ShutDown` is terminal.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use pierlink_types::error::PierError;

use crate::traits::PierStatus;

/// How long [`PierLifecycle::shutdown`] waits for the connection task
/// before aborting it.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

struct State {
    status: PierStatus,
    task: Option<JoinHandle<()>>,
}

/// Lifecycle bookkeeping for one pier: status, cancellation token and the
/// spawned connection task.
pub struct PierLifecycle {
    name: &'static str,
    cancel: CancellationToken,
    state: Mutex<State>,
}

impl PierLifecycle {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            cancel: CancellationToken::new(),
            state: Mutex::new(State {
                status: PierStatus::NotStarted,
                task: None,
            }),
        }
    }

    pub fn status(&self) -> PierStatus {
        self.state.lock().status
    }

    pub fn is_running(&self) -> bool {
        self.status() == PierStatus::Running
    }

    /// Token cancelled when the pier shuts down. In-flight sends select on it.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Move `NotStarted -> Running` and hand out the cancellation token the
    /// connection task should watch.
    pub fn begin(&self) -> Result<CancellationToken, PierError> {
        let mut state = self.state.lock();
        match state.status {
            PierStatus::NotStarted => {
                state.status = PierStatus::Running;
                debug!(pier = self.name, "pier starting");
                Ok(self.cancel.clone())
            }
            other => Err(PierError::InvalidState {
                expected: PierStatus::NotStarted.as_str(),
                actual: other.as_str(),
            }),
        }
    }

    /// Record the connection task spawned after [`begin`](Self::begin).
    ///
    /// If a shutdown raced in between, the task is aborted straight away.
    pub fn attach(&self, task: JoinHandle<()>) {
        let mut state = self.state.lock();
        if state.status == PierStatus::ShutDown {
            task.abort();
            return;
        }
        state.task = Some(task);
    }

    /// Move to `ShutDown`, cancel the token and wait up to
    /// [`SHUTDOWN_GRACE`] for the connection task.
    pub async fn shutdown(&self) {
        let task = {
            let mut state = self.state.lock();
            if state.status == PierStatus::ShutDown {
                return;
            }
            state.status = PierStatus::ShutDown;
            state.task.take()
        };
        self.cancel.cancel();

        let Some(mut task) = task else {
            debug!(pier = self.name, "pier shut down (no task running)");
            return;
        };

        match tokio::time::timeout(SHUTDOWN_GRACE, &mut task).await {
            Ok(Ok(())) => debug!(pier = self.name, "pier task finished"),
            Ok(Err(e)) => warn!(pier = self.name, error = %e, "pier task ended abnormally"),
            Err(_) => {
                warn!(
                    pier = self.name,
                    grace_secs = SHUTDOWN_GRACE.as_secs(),
                    "pier task did not stop in time, aborting"
                );
                task.abort();
            }
        }
    }
}
