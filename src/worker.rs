//! Background jobs for the remote collaborators in [`crate::remote`].
//!
//! Front ends that provide an [`IssueTracker`] or [`UpdateInstaller`] spawn
//! jobs here and feed each [`JobResult`] to
//! [`App::apply_job_result`](crate::app::App::apply_job_result). The CLI runs
//! one command per process and has no use for them.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use crate::error::FstkError;
use crate::remote::{IssueTracker, UpdateInstaller};

/// Outcome of a background job, applied by the thread that owns the
/// application state.
#[derive(Debug)]
pub enum JobResult {
    TicketTitles(Option<HashMap<String, String>>),
    CredentialsChecked {
        valid: bool,
        user_requested: bool,
    },
    UpdateChecked {
        latest: Result<String, FstkError>,
        user_requested: bool,
    },
}

/// Fire-and-forget background jobs with a single result channel.
///
/// Jobs run on detached threads and cannot be cancelled. Once the `Jobs`
/// value is dropped, results from jobs still in flight are discarded.
#[derive(Debug)]
pub struct Jobs {
    tx: Sender<JobResult>,
    rx: Receiver<JobResult>,
}

impl Default for Jobs {
    fn default() -> Self {
        Self::new()
    }
}

impl Jobs {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx }
    }

    pub fn spawn<F>(&self, job: F)
    where
        F: FnOnce() -> JobResult + Send + 'static,
    {
        let tx = self.tx.clone();
        thread::spawn(move || {
            let result = job();
            if tx.send(result).is_err() {
                tracing::debug!("discarding background job result after shutdown");
            }
        });
    }

    pub fn resolve_titles(&self, tracker: Arc<dyn IssueTracker>, tickets: Vec<String>) {
        self.spawn(move || JobResult::TicketTitles(tracker.resolve_titles(&tickets)));
    }

    pub fn check_credentials(&self, tracker: Arc<dyn IssueTracker>, user_requested: bool) {
        self.spawn(move || JobResult::CredentialsChecked {
            valid: tracker.credentials_valid(),
            user_requested,
        });
    }

    pub fn check_for_update(&self, installer: Arc<dyn UpdateInstaller>, user_requested: bool) {
        self.spawn(move || {
            let latest = installer.latest_version();
            if let Err(err) = &latest {
                tracing::info!(error = %err, "check for update failed");
            }
            JobResult::UpdateChecked {
                latest,
                user_requested,
            }
        });
    }

    /// Next finished result, without blocking.
    pub fn try_next(&self) -> Option<JobResult> {
        self.rx.try_recv().ok()
    }

    /// Next finished result, waiting at most `timeout`.
    pub fn next_timeout(&self, timeout: Duration) -> Option<JobResult> {
        match self.rx.recv_timeout(timeout) {
            Ok(result) => Some(result),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Every result that has already arrived.
    pub fn drain(&self) -> Vec<JobResult> {
        self.rx.try_iter().collect()
    }
}
