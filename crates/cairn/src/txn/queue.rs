//! Serial reference implementation of the task queue.

use tracing::debug;

use crate::error::{EngineError, EngineResult};
use crate::index::descriptor::IndexRegistry;
use crate::txn::{Revert, Task, TaskCtx, TaskQueue, TransactionMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Active(TransactionMode),
}

/// A transaction queue that runs each task at enqueue time, in order.
///
/// Serial execution makes the queue's guarantees trivially true: tasks run
/// FIFO, never concurrently, and each completes before the next is accepted.
/// The first task failure is latched; every later enqueue is refused with the
/// latched error, and `commit` surfaces it instead of committing.
#[derive(Debug, Default)]
pub struct SerialQueue {
    phase: Phase,
    error: Option<EngineError>,
    reverts: Vec<Revert>,
    tasks_run: u64,
}

impl Default for Phase {
    fn default() -> Self {
        Self::Idle
    }
}

impl SerialQueue {
    /// Create an idle queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a transaction.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidState`] if one is already active.
    pub fn begin(&mut self, mode: TransactionMode) -> EngineResult<()> {
        if matches!(self.phase, Phase::Active(_)) {
            return Err(EngineError::invalid_state("transaction already active"));
        }
        self.phase = Phase::Active(mode);
        self.error = None;
        self.reverts.clear();
        Ok(())
    }

    /// Commit the active transaction.
    ///
    /// Eager namespace mutations become permanent (their undo records are
    /// discarded).
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidState`] if no transaction is active, or
    /// the latched error if one of the transaction's tasks failed — an
    /// errored transaction cannot commit and must be aborted.
    pub fn commit(&mut self) -> EngineResult<()> {
        if !self.is_active() {
            return Err(EngineError::invalid_state("no active transaction"));
        }
        if let Some(error) = self.error.clone() {
            return Err(error);
        }
        self.phase = Phase::Idle;
        self.reverts.clear();
        debug!(tasks = self.tasks_run, "transaction committed");
        Ok(())
    }

    /// Abort the active transaction, replaying namespace undo records
    /// newest-first so the registry reads as it did before `begin`.
    ///
    /// Tasks enqueued after this never run: the queue is idle again.
    pub fn abort(&mut self, registry: &mut IndexRegistry) {
        let reverts = std::mem::take(&mut self.reverts);
        debug!(reverts = reverts.len(), "transaction aborted");
        for revert in reverts.into_iter().rev() {
            revert.apply(registry);
        }
        self.phase = Phase::Idle;
    }

    /// The error latched by the first failed task, if any.
    #[must_use]
    pub fn latched_error(&self) -> Option<&EngineError> {
        self.error.as_ref()
    }

    fn run(&mut self, ctx: &mut TaskCtx<'_>, task: Task<'_>) -> EngineResult<()> {
        if !self.is_active() {
            return Err(EngineError::invalid_state("no active transaction"));
        }
        if let Some(error) = self.error.clone() {
            // The transaction is already doomed; refuse further work.
            return Err(error);
        }
        self.tasks_run += 1;
        match task(ctx) {
            Ok(()) => Ok(()),
            Err(error) => {
                self.error = Some(error.clone());
                Err(error)
            }
        }
    }
}

impl TaskQueue for SerialQueue {
    fn enqueue_request(&mut self, ctx: &mut TaskCtx<'_>, task: Task<'_>) -> EngineResult<()> {
        self.run(ctx, task)
    }

    fn enqueue_maintenance(&mut self, ctx: &mut TaskCtx<'_>, task: Task<'_>) -> EngineResult<()> {
        self.run(ctx, task)
    }

    fn is_active(&self) -> bool {
        matches!(self.phase, Phase::Active(_))
    }

    fn is_errored(&self) -> bool {
        self.error.is_some()
    }

    fn is_version_change(&self) -> bool {
        matches!(self.phase, Phase::Active(TransactionMode::VersionChange))
    }

    fn push_revert(&mut self, revert: Revert) {
        self.reverts.push(revert);
    }
}
