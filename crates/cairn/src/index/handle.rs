//! The index handle: the capability callers query an index through.
//!
//! A handle holds the owning store's shared state and the index's stable
//! registry slot, so it stays valid across renames and goes properly dead on
//! deletion. Every method validates lifecycle state before doing anything.

use std::cell::RefCell;
use std::rc::Rc;

use cairn_core::{Key, KeyPath, KeyRange};
use cairn_store::Direction;
use serde_json::Value;

use crate::error::{EngineError, EngineResult};
use crate::index::cursor::{CursorPolicy, CursorPosition, IndexCursor};
use crate::index::descriptor::{IndexDescriptor, IndexSlot};
use crate::index::meta::VALUE_COLUMN;
use crate::index::{fetch, query, rebuild};
use crate::store::StoreInner;
use crate::txn::{Revert, TaskCtx, TaskQueue};

/// A handle to one index of an object store.
///
/// Obtained from [`ObjectStore::create_index`](crate::ObjectStore::create_index)
/// or [`ObjectStore::index`](crate::ObjectStore::index).
#[derive(Clone)]
pub struct Index {
    inner: Rc<RefCell<StoreInner>>,
    slot: IndexSlot,
}

impl std::fmt::Debug for Index {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Index")
            .field("slot", &self.slot)
            .finish_non_exhaustive()
    }
}

impl Index {
    pub(crate) fn new(inner: Rc<RefCell<StoreInner>>, slot: IndexSlot) -> Self {
        Self { inner, slot }
    }

    /// The index's current name.
    pub fn name(&self) -> EngineResult<String> {
        Ok(self.descriptor()?.name)
    }

    /// The index's key path.
    pub fn key_path(&self) -> EngineResult<KeyPath> {
        Ok(self.descriptor()?.key_path)
    }

    /// Whether this index rejects duplicate keys.
    pub fn unique(&self) -> EngineResult<bool> {
        Ok(self.descriptor()?.unique)
    }

    /// Whether this index expands array keys into one entry per element.
    pub fn multi_entry(&self) -> EngineResult<bool> {
        Ok(self.descriptor()?.multi_entry)
    }

    /// Rename this index.
    ///
    /// The new name is visible to subsequent operations in the same
    /// transaction immediately; the physical column rename (a table rebuild)
    /// is queued behind it.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidState`] if the index is deleted or no active
    /// version-change transaction exists; [`EngineError::Constraint`] if the
    /// name is taken.
    pub fn rename(&self, new_name: &str) -> EngineResult<()> {
        let inner = &mut *self.inner.borrow_mut();
        if !inner.queue.is_active() || !inner.queue.is_version_change() {
            return Err(EngineError::invalid_state(
                "rename requires an active version-change transaction",
            ));
        }
        if inner.queue.is_errored() {
            return Err(EngineError::invalid_state("transaction has errored"));
        }

        let Some(descriptor) = inner.registry.get(self.slot) else {
            return Err(EngineError::invalid_state("index no longer exists"));
        };
        if !descriptor.state.is_visible() {
            return Err(EngineError::invalid_state("index is deleted"));
        }
        let old_name = descriptor.name.clone();
        if old_name == new_name {
            return Ok(());
        }
        if inner.registry.name_in_use(new_name) {
            return Err(EngineError::constraint(format!(
                "an index named {new_name} already exists"
            )));
        }

        inner
            .queue
            .push_revert(Revert::RestoreName(self.slot, old_name.clone()));
        if let Some(descriptor) = inner.registry.get_mut(self.slot) {
            descriptor.name = new_name.to_string();
            descriptor.state.pending_name = Some(old_name);
        }

        let StoreInner {
            name,
            registry,
            backing,
            queue,
            codec,
            ..
        } = inner;
        let table = name.clone();
        let mut ctx = TaskCtx {
            store: backing.as_mut(),
            registry,
            codec: codec.as_ref(),
        };
        rebuild::enqueue_rename(queue, &mut ctx, &table, self.slot)
    }

    /// Fetch the first record in the range, or `None` if nothing matches.
    pub fn get(&self, range: impl Into<KeyRange>) -> EngineResult<Option<Value>> {
        let positions = self.run_query(
            Some(range.into()),
            query::QueryOptions { null_disallowed: true, count_only: false },
            Direction::Forward,
            Some(1),
            true,
        )?;
        Ok(positions.into_iter().next().and_then(|p| p.value))
    }

    /// Fetch the first matching record's primary key, or `None`.
    pub fn get_key(&self, range: impl Into<KeyRange>) -> EngineResult<Option<Key>> {
        let positions = self.run_query(
            Some(range.into()),
            query::QueryOptions { null_disallowed: true, count_only: false },
            Direction::Forward,
            Some(1),
            false,
        )?;
        Ok(positions.into_iter().next().map(|p| p.primary_key))
    }

    /// Fetch every matching record in key order, up to `limit`.
    ///
    /// A multi-entry record appears once per matching element.
    pub fn get_all(
        &self,
        range: Option<KeyRange>,
        limit: Option<usize>,
    ) -> EngineResult<Vec<Value>> {
        let positions = self.run_query(
            range,
            query::QueryOptions::default(),
            Direction::Forward,
            limit,
            true,
        )?;
        Ok(positions.into_iter().filter_map(|p| p.value).collect())
    }

    /// Fetch every matching record's primary key in key order, up to `limit`.
    pub fn get_all_keys(
        &self,
        range: Option<KeyRange>,
        limit: Option<usize>,
    ) -> EngineResult<Vec<Key>> {
        let positions = self.run_query(
            range,
            query::QueryOptions::default(),
            Direction::Forward,
            limit,
            false,
        )?;
        Ok(positions.into_iter().map(|p| p.primary_key).collect())
    }

    /// Count matching logical entries. Distinct elements of one multi-entry
    /// record count individually; duplicates within the record do not.
    pub fn count(&self, range: Option<KeyRange>) -> EngineResult<usize> {
        let positions = self.run_query(
            range,
            query::QueryOptions { count_only: true, null_disallowed: false },
            Direction::Forward,
            None,
            false,
        )?;
        Ok(positions.len())
    }

    /// Open a cursor over matching entries, record payloads included.
    pub fn open_cursor(
        &self,
        range: Option<KeyRange>,
        direction: Direction,
        policy: CursorPolicy,
    ) -> EngineResult<IndexCursor> {
        let positions =
            self.run_query(range, query::QueryOptions::default(), direction, None, true)?;
        Ok(IndexCursor::new(positions, policy))
    }

    /// Open a cursor over matching entries, keys only.
    pub fn open_key_cursor(
        &self,
        range: Option<KeyRange>,
        direction: Direction,
        policy: CursorPolicy,
    ) -> EngineResult<IndexCursor> {
        let positions =
            self.run_query(range, query::QueryOptions::default(), direction, None, false)?;
        Ok(IndexCursor::new(positions, policy))
    }

    /// The descriptor behind this handle, lifecycle-checked for reads.
    fn descriptor(&self) -> EngineResult<IndexDescriptor> {
        let inner = self.inner.borrow();
        let Some(descriptor) = inner.registry.get(self.slot) else {
            return Err(EngineError::invalid_state("index no longer exists"));
        };
        if !descriptor.state.is_visible() {
            return Err(EngineError::invalid_state("index is deleted"));
        }
        if descriptor.state.pending_create && inner.queue.is_errored() {
            return Err(EngineError::invalid_state("owning transaction has errored"));
        }
        Ok(descriptor.clone())
    }

    /// Compile and run one query through the transaction queue, decoding the
    /// hits into cursor positions inside the queued task.
    fn run_query(
        &self,
        range: Option<KeyRange>,
        opts: query::QueryOptions,
        direction: Direction,
        limit: Option<usize>,
        with_values: bool,
    ) -> EngineResult<Vec<CursorPosition>> {
        let descriptor = self.descriptor()?;
        let compiled =
            query::compile(descriptor.column(), descriptor.multi_entry, range.as_ref(), opts)?;

        let inner = &mut *self.inner.borrow_mut();
        let StoreInner {
            name,
            registry,
            backing,
            queue,
            codec,
            ..
        } = inner;
        let table = name.clone();
        let results = Rc::new(RefCell::new(Vec::new()));
        let out = results.clone();
        let mut ctx = TaskCtx {
            store: backing.as_mut(),
            registry,
            codec: codec.as_ref(),
        };
        queue.enqueue_request(
            &mut ctx,
            Box::new(move |ctx| {
                let hits =
                    fetch::execute(&*ctx.store, &table, VALUE_COLUMN, &compiled, direction, limit)?;
                let mut positions = Vec::with_capacity(hits.len());
                for hit in hits {
                    let value = match (with_values, &hit.value) {
                        (true, Some(bytes)) => Some(ctx.codec.decode_record(bytes)?),
                        _ => None,
                    };
                    positions.push(CursorPosition {
                        key: hit.key,
                        primary_key: Key::decode(&hit.primary_key)?,
                        value,
                    });
                }
                *out.borrow_mut() = positions;
                Ok(())
            }),
        )?;
        let positions = std::mem::take(&mut *results.borrow_mut());
        Ok(positions)
    }
}
