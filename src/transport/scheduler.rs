//! One-shot delayed task scheduling.
//!
//! The session never owns a timer. It asks a [`Scheduler`] supplied by the
//! application to run a task after a delay and keeps the returned
//! [`ScheduleHandle`] so it can cancel the task on close. Periodic work
//! such as the heartbeat re-arms itself from inside the task.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::runtime::Handle;
use tracing::{trace, warn};

use crate::error::{Error, Result};

// ============================================================================
// Types
// ============================================================================

/// A task handed to a scheduler.
pub type Task = BoxFuture<'static, ()>;

// ============================================================================
// ScheduleHandle
// ============================================================================

/// Cancellation handle for a scheduled task.
///
/// Dropping the handle leaves the task scheduled.
pub struct ScheduleHandle {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl ScheduleHandle {
    /// Creates a handle that runs `cancel` when cancelled.
    #[must_use]
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Creates a handle whose cancellation does nothing.
    #[inline]
    #[must_use]
    pub fn detached() -> Self {
        Self { cancel: None }
    }

    /// Cancels the task if it has not run yet.
    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for ScheduleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduleHandle")
            .field("cancellable", &self.cancel.is_some())
            .finish()
    }
}

// ============================================================================
// Scheduler Trait
// ============================================================================

/// One-shot "run this after a delay" capability.
pub trait Scheduler: Send + Sync {
    /// Schedules `task` to run once after `delay`.
    ///
    /// # Errors
    ///
    /// [`Error::Scheduler`] if the task cannot be registered.
    fn schedule(&self, delay: Duration, task: Task) -> Result<ScheduleHandle>;

    /// Receives failures from scheduled tasks.
    ///
    /// The default implementation logs a warning.
    fn report_error(&self, error: &Error) {
        warn!(error = %error, "Scheduled task failed");
    }
}

// ============================================================================
// TokioScheduler
// ============================================================================

/// Scheduler that spawns each task on a tokio runtime.
#[derive(Debug, Clone, Default)]
pub struct TokioScheduler {
    runtime: Option<Handle>,
}

impl TokioScheduler {
    /// Creates a scheduler using the runtime current at each call.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self { runtime: None }
    }

    /// Creates a scheduler bound to a specific runtime.
    #[inline]
    #[must_use]
    pub fn with_handle(runtime: Handle) -> Self {
        Self {
            runtime: Some(runtime),
        }
    }

    /// Creates a shared scheduler ready to pass to `Session::connect`.
    #[must_use]
    pub fn shared() -> Arc<dyn Scheduler> {
        Arc::new(Self::new())
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: Task) -> Result<ScheduleHandle> {
        let runtime = match &self.runtime {
            Some(runtime) => runtime.clone(),
            None => Handle::try_current()
                .map_err(|e| Error::scheduler(format!("no tokio runtime: {e}")))?,
        };

        let join = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        });

        trace!(delay_ms = delay.as_millis() as u64, "Task scheduled");
        let abort = join.abort_handle();
        Ok(ScheduleHandle::new(move || abort.abort()))
    }
}

// ============================================================================
// Tests
// ============================================================================
