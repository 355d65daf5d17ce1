/// Outcome of a single file submission within a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Pending,
    Succeeded,
    Failed,
}

/// One file of a batch, tagged with its position in the input.
#[derive(Debug, Clone)]
pub struct UploadTask<F> {
    pub file: F,
    pub index: usize,
    pub outcome: TaskOutcome,
}

/// Progress observation emitted after every submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    pub completed: usize,
    pub total: usize,
    pub percent: u8,
}

/// Aggregate classification of a finished batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchKind {
    /// Nothing was submitted
    Empty,
    AllSucceeded,
    PartialSuccess { success_count: usize, total: usize },
    AllFailed,
}

/// `round(completed / total * 100)`, rounding halves up.
pub fn percent_complete(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let completed = completed.min(total);
    ((completed * 200 + total) / (2 * total)) as u8
}

/// Pure state for one upload batch.
///
/// Tracks per-file outcomes and the retry list without doing any I/O, so
/// the accounting can be driven and checked independently of a transport.
///
/// Lifecycle: `start_batch` → `record_outcome` once per file → `finalize`.
/// The task list only lives between `start_batch` and `finalize`; the retry
/// list survives until the next `start_batch`.
pub struct UploadBatchState<F> {
    tasks: Vec<UploadTask<F>>,
    completed: usize,
    success_count: usize,
    retained: Vec<F>,
}

impl<F> Default for UploadBatchState<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F> UploadBatchState<F> {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            completed: 0,
            success_count: 0,
            retained: Vec::new(),
        }
    }

    /// Begin a new batch, discarding any previous tasks and retry list.
    pub fn start_batch(&mut self, files: Vec<F>) {
        self.tasks = files
            .into_iter()
            .enumerate()
            .map(|(index, file)| UploadTask {
                file,
                index,
                outcome: TaskOutcome::Pending,
            })
            .collect();
        self.completed = 0;
        self.success_count = 0;
        self.retained.clear();
    }

    /// Record the result of the submission at `index`.
    ///
    /// Returns the progress observation, or `None` when the index is unknown,
    /// already recorded, or `outcome` is `Pending`.
    pub fn record_outcome(&mut self, index: usize, outcome: TaskOutcome) -> Option<BatchProgress> {
        if outcome == TaskOutcome::Pending {
            return None;
        }
        let task = self.tasks.get_mut(index)?;
        if task.outcome != TaskOutcome::Pending {
            return None;
        }
        task.outcome = outcome;
        self.completed += 1;
        if outcome == TaskOutcome::Succeeded {
            self.success_count += 1;
        }
        Some(self.progress())
    }

    pub fn progress(&self) -> BatchProgress {
        let total = self.tasks.len();
        BatchProgress {
            completed: self.completed,
            total,
            percent: percent_complete(self.completed, total),
        }
    }

    pub fn tasks(&self) -> &[UploadTask<F>] {
        &self.tasks
    }

    pub fn success_count(&self) -> usize {
        self.success_count
    }

    /// Files kept for a retry after the last `finalize`.
    pub fn retained(&self) -> &[F] {
        &self.retained
    }

    pub fn take_retained(&mut self) -> Vec<F> {
        std::mem::take(&mut self.retained)
    }

    /// Classify the batch and drop the task list.
    ///
    /// On partial success the retry list is the suffix of the input starting
    /// at `success_count`, not the set of tasks marked `Failed`. Failures are
    /// not necessarily contiguous, so this can retain files that were
    /// uploaded and skip files that were not.
    pub fn finalize(&mut self) -> BatchKind {
        let total = self.tasks.len();
        let success_count = self.success_count;
        let tasks = std::mem::take(&mut self.tasks);

        let kind = if total == 0 {
            BatchKind::Empty
        } else if success_count == total {
            BatchKind::AllSucceeded
        } else if success_count > 0 {
            BatchKind::PartialSuccess {
                success_count,
                total,
            }
        } else {
            BatchKind::AllFailed
        };

        self.retained = match kind {
            BatchKind::Empty | BatchKind::AllSucceeded => Vec::new(),
            BatchKind::PartialSuccess { success_count, .. } => tasks
                .into_iter()
                .skip(success_count)
                .map(|task| task.file)
                .collect(),
            BatchKind::AllFailed => tasks.into_iter().map(|task| task.file).collect(),
        };

        kind
    }
}
