//! Transaction queue interface and reference implementation.
//!
//! Every index operation — structural work and reads alike — runs as a queued
//! task so one linear order governs everything a transaction does. The engine
//! never threads; it hands closures to a [`TaskQueue`] and the queue invokes
//! them FIFO, recording exactly one outcome per task.
//!
//! Namespace mutations (registering a descriptor, renaming, hiding a deleted
//! name) happen eagerly at call time so they are synchronously visible inside
//! the transaction. Each eager mutation pushes a [`Revert`] onto the queue;
//! abort replays the reverts newest-first so the committed descriptor set is
//! exactly what it was before the transaction began.

mod queue;

pub use queue::SerialQueue;

use cairn_store::StoreTx;

use crate::codec::RecordCodec;
use crate::error::EngineResult;
use crate::index::descriptor::{IndexDescriptor, IndexRegistry, IndexSlot};

/// What a queued task gets to work with.
pub struct TaskCtx<'a> {
    /// The backing flat store.
    pub store: &'a mut dyn StoreTx,
    /// The owning store's descriptor registry.
    pub registry: &'a mut IndexRegistry,
    /// The record payload codec.
    pub codec: &'a dyn RecordCodec,
}

/// One queued unit of work.
///
/// Runs to exactly one outcome; the queue latches the first `Err` and skips
/// everything enqueued after it.
pub type Task<'t> = Box<dyn FnOnce(&mut TaskCtx<'_>) -> EngineResult<()> + 't>;

/// Transaction kinds. Only a version-change transaction may alter schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionMode {
    /// Reads and record writes.
    ReadWrite,
    /// Reads, record writes, and index/store schema changes.
    VersionChange,
}

/// Undo record for an eager namespace mutation.
///
/// Reverts carry plain data rather than closures so replaying them needs
/// nothing but the registry, and replaying one twice (or after the caller
/// already cleaned up) is harmless.
#[derive(Debug)]
pub enum Revert {
    /// Evict a descriptor registered during this transaction.
    RemoveDescriptor(IndexSlot),
    /// Put back a descriptor evicted during this transaction.
    RestoreDescriptor(IndexSlot, IndexDescriptor),
    /// Restore a pre-rename name and clear the pending-name marker.
    RestoreName(IndexSlot, String),
    /// Clear an eager pending-delete marker.
    ClearPendingDelete(IndexSlot),
}

impl Revert {
    /// Apply the undo against the registry.
    pub fn apply(self, registry: &mut IndexRegistry) {
        match self {
            Self::RemoveDescriptor(slot) => {
                registry.remove(slot);
            }
            Self::RestoreDescriptor(slot, descriptor) => {
                registry.restore(slot, descriptor);
            }
            Self::RestoreName(slot, name) => {
                if let Some(descriptor) = registry.get_mut(slot) {
                    descriptor.name = name;
                    descriptor.state.pending_name = None;
                }
            }
            Self::ClearPendingDelete(slot) => {
                if let Some(descriptor) = registry.get_mut(slot) {
                    descriptor.state.pending_delete = false;
                }
            }
        }
    }
}

/// The transaction queue contract.
///
/// `enqueue_request` carries work whose result the caller observes;
/// `enqueue_maintenance` carries internal steps (backfill, rebuilds). Both
/// guarantee FIFO execution and one terminal outcome per task.
pub trait TaskQueue {
    /// Queue a caller-visible operation.
    fn enqueue_request(&mut self, ctx: &mut TaskCtx<'_>, task: Task<'_>) -> EngineResult<()>;

    /// Queue an internal maintenance step.
    fn enqueue_maintenance(&mut self, ctx: &mut TaskCtx<'_>, task: Task<'_>) -> EngineResult<()>;

    /// Whether a transaction is active (begun, not finished, not aborted).
    fn is_active(&self) -> bool;

    /// Whether the active transaction has latched an error.
    fn is_errored(&self) -> bool;

    /// Whether the active transaction may alter schema.
    fn is_version_change(&self) -> bool;

    /// Record an undo for an eager namespace mutation.
    fn push_revert(&mut self, revert: Revert);
}
