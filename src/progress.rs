//! Milestone progress reporting for background checks and analyses.

/// Progress milestones of a check or an analysis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Milestone {
    /// Work has started.
    Started,
    /// The model has been prepared; stiffness assembly or the first checks are done.
    Prepared,
    /// The main computation has finished; results are being recovered.
    Solved,
    /// Results are ready.
    Finished,
}

impl Milestone {
    /// Completion percentage of the milestone.
    ///
    /// # Examples
    /// ```
    /// use trussx::progress::Milestone;
    ///
    /// assert_eq!(Milestone::Prepared.percent(), 50);
    /// ```
    #[must_use]
    pub fn percent(self) -> u8 {
        match self {
            Milestone::Started => 0,
            Milestone::Prepared => 50,
            Milestone::Solved => 75,
            Milestone::Finished => 100,
        }
    }
}

/// Callback receiving milestones. It runs on the worker thread.
pub type ProgressCallback = Box<dyn Fn(Milestone) + Send + Sync>;

/// Optional sink for milestones.
#[derive(Default)]
pub struct ProgressReporter {
    /// Sink, if any.
    callback: Option<ProgressCallback>,
}

impl ProgressReporter {
    /// Reporter that discards every milestone.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reporter forwarding milestones to `callback`.
    #[must_use]
    pub fn with_callback(callback: ProgressCallback) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    /// Forward `milestone` to the callback.
    pub(crate) fn report(&self, milestone: Milestone) {
        if let Some(callback) = &self.callback {
            callback(milestone);
        }
    }
}

impl std::fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("callback", &self.callback.is_some())
            .finish()
    }
}
