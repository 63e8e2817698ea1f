//! Checks and analyses running on a background thread.
//!
//! A submitted task owns its snapshot, so the editing model stays free for
//! further edits. The result arrives once, as a whole, through the returned
//! [`TaskHandle`]. Dropping the handle stops nobody from finishing; the result
//! is simply discarded.

use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use log::debug;

use crate::analysis::{self, AnalysisResults};
use crate::checker::{self, StabilityReport};
use crate::config::AnalysisConfig;
use crate::errors::AnalysisError;
use crate::loads::LoadCases;
use crate::progress::ProgressReporter;
use crate::snapshot::TrussSnapshot;

/// Handle to the result of a background task.
#[derive(Debug)]
pub struct TaskHandle<T> {
    /// Receives the single result of the worker.
    receiver: Receiver<Result<T, AnalysisError>>,
}

impl<T> TaskHandle<T> {
    /// Block until the task delivers its result.
    ///
    /// # Errors
    ///
    /// Returns the task's own error, or [`AnalysisError::TaskPanicked`] when the
    /// worker ended without sending anything.
    pub fn wait(self) -> Result<T, AnalysisError> {
        self.receiver
            .recv()
            .map_err(|_| AnalysisError::TaskPanicked)?
    }

    /// Return the result if it is ready, without blocking.
    ///
    /// The result is handed out once; later calls report
    /// [`AnalysisError::TaskPanicked`].
    pub fn try_result(&self) -> Option<Result<T, AnalysisError>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(AnalysisError::TaskPanicked)),
        }
    }
}

/// Run `work` on a named thread and hand its result back over a channel.
fn spawn<T, F>(name: &'static str, work: F) -> TaskHandle<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, AnalysisError> + Send + 'static,
{
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        debug!("{name} task started");
        // The receiver may already be gone; the result is then discarded.
        let _ = sender.send(work());
    });
    TaskHandle { receiver }
}

/// Run the stability check on a background thread.
///
/// # Examples
/// ```
/// use trussx::progress::ProgressReporter;
/// use trussx::task::submit_check;
/// use trussx::{AnalysisConfig, Truss};
///
/// let handle = submit_check(Truss::new().snapshot(), AnalysisConfig::default(), ProgressReporter::new());
/// let report = handle.wait().expect("worker delivers a report");
/// assert!(!report.stable);
/// ```
#[must_use]
pub fn submit_check(
    snapshot: TrussSnapshot,
    config: AnalysisConfig,
    progress: ProgressReporter,
) -> TaskHandle<StabilityReport> {
    spawn("stability check", move || {
        Ok(checker::check_with_progress(&snapshot, &config, &progress))
    })
}

/// Run an analysis on a background thread.
#[must_use]
pub fn submit_analysis(
    snapshot: TrussSnapshot,
    cases: LoadCases,
    config: AnalysisConfig,
    progress: ProgressReporter,
) -> TaskHandle<AnalysisResults> {
    spawn("analysis", move || {
        analysis::analyze_with_progress(&snapshot, &cases, &config, &progress)
    })
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::progress::Milestone;

    #[test]
    fn failed_check_still_reports_every_milestone() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let progress = ProgressReporter::with_callback(Box::new(move |milestone: Milestone| {
            if let Ok(mut seen) = sink.lock() {
                seen.push(milestone.percent());
            }
        }));
        let report = submit_check(TrussSnapshot::default(), AnalysisConfig::default(), progress)
            .wait()
            .expect("worker delivers a report");
        assert!(!report.stable);
        assert_eq!(*seen.lock().expect("lock is not poisoned"), vec![0, 50, 75, 100]);
    }

    #[test]
    fn analysis_errors_travel_through_the_handle() {
        let handle = submit_analysis(
            TrussSnapshot::default(),
            LoadCases::default(),
            AnalysisConfig::default(),
            ProgressReporter::new(),
        );
        assert!(matches!(handle.wait(), Err(AnalysisError::Unstable(_))));
    }
}
