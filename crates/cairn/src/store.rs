//! The object store: a primary-key-ordered record collection with indexes.
//!
//! An [`ObjectStore`] owns one table in the backing flat store (payload
//! column plus one column per index), the descriptor registry, and the
//! transaction queue every operation runs through. Record writes maintain
//! all visible index columns inline, the same extraction-and-encoding path
//! the backfill uses.

use std::cell::RefCell;
use std::rc::Rc;

use cairn_core::encoding::composite::{contains_encoded, decode_key_set, encode_key_set};
use cairn_core::{Key, KeyPath};
use cairn_store::{CompareOp, Predicate, Row, ScanQuery, StoreTx};
use serde_json::Value;
use tracing::debug;

use crate::codec::{JsonCodec, RecordCodec};
use crate::error::{EngineError, EngineResult};
use crate::index::descriptor::{IndexDescriptor, IndexRegistry, LifecycleState};
use crate::index::handle::Index;
use crate::index::meta::{self, VALUE_COLUMN};
use crate::index::{query, rebuild};
use crate::txn::{Revert, SerialQueue, TaskCtx, TaskQueue, TransactionMode};

/// Object-store creation options.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreOptions {
    /// Generate numeric primary keys for records put without one.
    pub auto_increment: bool,
}

/// Index creation options.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexOptions {
    /// Reject two records sharing an extracted key.
    pub unique: bool,
    /// Expand an array-valued extracted key into one entry per element.
    pub multi_entry: bool,
}

pub(crate) struct StoreInner {
    pub(crate) name: String,
    pub(crate) auto_increment: bool,
    pub(crate) next_key: u64,
    pub(crate) registry: IndexRegistry,
    pub(crate) backing: Box<dyn StoreTx>,
    pub(crate) queue: SerialQueue,
    pub(crate) codec: Box<dyn RecordCodec>,
}

/// A handle to one object store.
///
/// Cheap to clone; all clones and all [`Index`] handles obtained from them
/// share the same underlying state.
#[derive(Clone)]
pub struct ObjectStore {
    inner: Rc<RefCell<StoreInner>>,
}

impl std::fmt::Debug for ObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStore").finish_non_exhaustive()
    }
}

impl ObjectStore {
    /// Create a new object store in the backing store.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Constraint`] if a table with this name already
    /// exists, or [`EngineError::Unknown`] on storage failure.
    pub fn create(
        backing: impl StoreTx + 'static,
        name: &str,
        options: StoreOptions,
    ) -> EngineResult<Self> {
        Self::create_with_codec(backing, name, options, JsonCodec)
    }

    /// [`ObjectStore::create`] with a caller-supplied record codec.
    pub fn create_with_codec(
        mut backing: impl StoreTx + 'static,
        name: &str,
        options: StoreOptions,
        codec: impl RecordCodec + 'static,
    ) -> EngineResult<Self> {
        if backing.table_exists(name) {
            return Err(EngineError::constraint(format!(
                "object store {name} already exists"
            )));
        }
        backing.create_table(name, &[VALUE_COLUMN.to_string()])?;
        meta::ensure_schema_table(&mut backing)?;
        let registry = IndexRegistry::new();
        meta::persist(&mut backing, name, &registry)?;
        debug!(store = %name, "object store created");

        Ok(Self {
            inner: Rc::new(RefCell::new(StoreInner {
                name: name.to_string(),
                auto_increment: options.auto_increment,
                next_key: 1,
                registry,
                backing: Box::new(backing),
                queue: SerialQueue::new(),
                codec: Box::new(codec),
            })),
        })
    }

    /// Reopen an existing object store, rebuilding the descriptor registry
    /// from its persisted metadata (tombstones included).
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidState`] if no such table exists.
    pub fn open(
        backing: impl StoreTx + 'static,
        name: &str,
        options: StoreOptions,
    ) -> EngineResult<Self> {
        Self::open_with_codec(backing, name, options, JsonCodec)
    }

    /// [`ObjectStore::open`] with a caller-supplied record codec.
    ///
    /// A store created through [`ObjectStore::create_with_codec`] must be
    /// reopened with the same codec; its payloads are opaque to any other.
    pub fn open_with_codec(
        backing: impl StoreTx + 'static,
        name: &str,
        options: StoreOptions,
        codec: impl RecordCodec + 'static,
    ) -> EngineResult<Self> {
        if !backing.table_exists(name) {
            return Err(EngineError::invalid_state(format!(
                "no such object store: {name}"
            )));
        }
        let mut registry = IndexRegistry::new();
        for (index_name, metadata) in meta::load(&backing, name)? {
            let mut descriptor = IndexDescriptor::new(
                index_name,
                metadata.key_path,
                metadata.unique,
                metadata.multi_entry,
            );
            descriptor.state = LifecycleState {
                deleted: metadata.deleted,
                ..LifecycleState::default()
            };
            registry.insert(descriptor);
        }

        // Seed the key generator past every numeric primary key already in
        // the table, so generated keys never collide with stored records.
        let mut next_key = 1;
        for row in backing.scan(name, &ScanQuery::new())? {
            if let Key::Number(n) = Key::decode(&row.primary_key)? {
                if n.is_finite() && n >= next_key as f64 {
                    next_key = (n as u64).saturating_add(1);
                }
            }
        }
        debug!(store = %name, next_key, "object store opened");

        Ok(Self {
            inner: Rc::new(RefCell::new(StoreInner {
                name: name.to_string(),
                auto_increment: options.auto_increment,
                next_key,
                registry,
                backing: Box::new(backing),
                queue: SerialQueue::new(),
                codec: Box::new(codec),
            })),
        })
    }

    /// The store's name.
    #[must_use]
    pub fn name(&self) -> String {
        self.inner.borrow().name.clone()
    }

    /// Whether this store generates primary keys.
    #[must_use]
    pub fn auto_increment(&self) -> bool {
        self.inner.borrow().auto_increment
    }

    /// Names of the store's visible indexes, in creation order.
    #[must_use]
    pub fn index_names(&self) -> Vec<String> {
        self.inner.borrow().registry.visible_names()
    }

    /// Begin a transaction on this store.
    pub fn begin(&self, mode: TransactionMode) -> EngineResult<()> {
        self.inner.borrow_mut().queue.begin(mode)
    }

    /// Commit the active transaction.
    pub fn commit(&self) -> EngineResult<()> {
        self.inner.borrow_mut().queue.commit()
    }

    /// Abort the active transaction, rolling back eager namespace changes.
    pub fn abort(&self) {
        let inner = &mut *self.inner.borrow_mut();
        let StoreInner {
            queue, registry, ..
        } = inner;
        queue.abort(registry);
    }

    /// Store a record, maintaining every visible index column.
    ///
    /// With no explicit key, an auto-increment store generates one;
    /// otherwise the call fails with [`EngineError::Data`]. Returns the key
    /// the record was stored under.
    ///
    /// # Errors
    ///
    /// [`EngineError::Constraint`] if a unique index would end up with a
    /// duplicate key; [`EngineError::InvalidState`] outside a transaction.
    pub fn put(&self, record: &Value, key: Option<Key>) -> EngineResult<Key> {
        let inner = &mut *self.inner.borrow_mut();

        let key = match key {
            Some(key) => {
                key.validate()?;
                // Keep the generator ahead of explicit numeric keys.
                if let Key::Number(n) = &key {
                    if n.is_finite() && *n >= inner.next_key as f64 {
                        inner.next_key = (*n as u64).saturating_add(1);
                    }
                }
                key
            }
            None if inner.auto_increment => {
                let generated = Key::Number(inner.next_key as f64);
                inner.next_key += 1;
                generated
            }
            None => {
                return Err(EngineError::data(
                    "a key is required for a non-auto-increment store",
                ))
            }
        };

        let StoreInner {
            name,
            registry,
            backing,
            queue,
            codec,
            ..
        } = inner;
        let table = name.clone();
        let record = record.clone();
        let put_key = key.clone();
        let mut ctx = TaskCtx {
            store: backing.as_mut(),
            registry,
            codec: codec.as_ref(),
        };
        queue.enqueue_request(
            &mut ctx,
            Box::new(move |ctx| {
                let primary_key = put_key.encode()?;
                let payload = ctx.codec.encode_record(&record)?;
                let mut row =
                    Row::new(primary_key.clone()).with_cell(VALUE_COLUMN, Some(payload));

                let descriptors: Vec<IndexDescriptor> = ctx
                    .registry
                    .iter()
                    .filter(|(_, d)| d.state.is_visible())
                    .map(|(_, d)| d.clone())
                    .collect();
                for descriptor in &descriptors {
                    let cell = index_cell(descriptor, &record);
                    if descriptor.unique {
                        if let Some(bytes) = &cell {
                            if unique_conflict(
                                &*ctx.store,
                                &table,
                                descriptor,
                                bytes,
                                &primary_key,
                            )? {
                                return Err(EngineError::constraint(format!(
                                    "duplicate key for unique index {}",
                                    descriptor.name
                                )));
                            }
                        }
                    }
                    row = row.with_cell(descriptor.column(), cell);
                }

                ctx.store.insert(&table, row)?;
                Ok(())
            }),
        )?;
        Ok(key)
    }

    /// Fetch a record by primary key.
    pub fn get(&self, key: &Key) -> EngineResult<Option<Value>> {
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
        let primary_key = key.encode()?;
        let found = Rc::new(RefCell::new(None));
        let out = found.clone();
        let mut ctx = TaskCtx {
            store: backing.as_mut(),
            registry,
            codec: codec.as_ref(),
        };
        queue.enqueue_request(
            &mut ctx,
            Box::new(move |ctx| {
                if let Some(row) = ctx.store.get(&table, &primary_key)? {
                    if let Some(payload) = row.cell(VALUE_COLUMN) {
                        *out.borrow_mut() = Some(ctx.codec.decode_record(payload)?);
                    }
                }
                Ok(())
            }),
        )?;
        let found = found.borrow_mut().take();
        Ok(found)
    }

    /// Delete a record by primary key. Returns whether it existed.
    pub fn delete(&self, key: &Key) -> EngineResult<bool> {
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
        let primary_key = key.encode()?;
        let existed = Rc::new(std::cell::Cell::new(false));
        let out = existed.clone();
        let mut ctx = TaskCtx {
            store: backing.as_mut(),
            registry,
            codec: codec.as_ref(),
        };
        queue.enqueue_request(
            &mut ctx,
            Box::new(move |ctx| {
                out.set(ctx.store.delete(&table, &primary_key)?);
                Ok(())
            }),
        )?;
        Ok(existed.get())
    }

    /// Create an index over this store and backfill it from existing records.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidState`] outside an active version-change
    /// transaction; [`EngineError::Constraint`] if the name is taken or the
    /// backfill finds duplicate keys under `unique` — in which case the
    /// index is absent afterwards.
    pub fn create_index(
        &self,
        name: &str,
        key_path: KeyPath,
        options: IndexOptions,
    ) -> EngineResult<Index> {
        let inner = &mut *self.inner.borrow_mut();
        require_version_change(&inner.queue)?;
        if inner.registry.name_in_use(name) {
            return Err(EngineError::constraint(format!(
                "an index named {name} already exists"
            )));
        }

        let mut descriptor =
            IndexDescriptor::new(name, key_path, options.unique, options.multi_entry);

        // A tombstoned predecessor of the same name left its column behind;
        // reuse it and evict the tombstone.
        if let Some(tombstone_slot) = inner.registry.tombstone(name) {
            if let Some(tombstone) = inner.registry.remove(tombstone_slot) {
                inner
                    .queue
                    .push_revert(Revert::RestoreDescriptor(tombstone_slot, tombstone));
            }
            descriptor.state.recreated = true;
        }

        let slot = inner.registry.insert(descriptor);
        inner.queue.push_revert(Revert::RemoveDescriptor(slot));

        let StoreInner {
            name: store_name,
            registry,
            backing,
            queue,
            codec,
            ..
        } = inner;
        let table = store_name.clone();
        let mut ctx = TaskCtx {
            store: backing.as_mut(),
            registry,
            codec: codec.as_ref(),
        };
        if let Err(error) = rebuild::enqueue_create(queue, &mut ctx, &table, slot) {
            // The creation failed as a whole; the name must not linger.
            ctx.registry.remove(slot);
            return Err(error);
        }

        Ok(Index::new(self.inner.clone(), slot))
    }

    /// Delete an index. The name disappears immediately; physical teardown
    /// is queued.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidState`] outside an active version-change
    /// transaction or if no visible index carries the name.
    pub fn delete_index(&self, name: &str) -> EngineResult<()> {
        let inner = &mut *self.inner.borrow_mut();
        require_version_change(&inner.queue)?;
        let Some(slot) = inner.registry.resolve(name) else {
            return Err(EngineError::invalid_state(format!("no such index: {name}")));
        };

        let Some(descriptor) = inner.registry.get_mut(slot) else {
            return Err(EngineError::invalid_state(format!("no such index: {name}")));
        };
        inner
            .queue
            .push_revert(Revert::RestoreDescriptor(slot, descriptor.clone()));
        descriptor.state.pending_delete = true;

        let StoreInner {
            name: store_name,
            registry,
            backing,
            queue,
            codec,
            ..
        } = inner;
        let table = store_name.clone();
        let mut ctx = TaskCtx {
            store: backing.as_mut(),
            registry,
            codec: codec.as_ref(),
        };
        rebuild::enqueue_delete(queue, &mut ctx, &table, slot)
    }

    /// Look up a visible index by name.
    pub fn index(&self, name: &str) -> EngineResult<Index> {
        let inner = self.inner.borrow();
        inner
            .registry
            .resolve(name)
            .map(|slot| Index::new(self.inner.clone(), slot))
            .ok_or_else(|| EngineError::invalid_state(format!("no such index: {name}")))
    }
}

/// Structural operations demand an active, unerrored version-change
/// transaction.
fn require_version_change(queue: &SerialQueue) -> EngineResult<()> {
    if !queue.is_active() {
        return Err(EngineError::invalid_state("no active transaction"));
    }
    if !queue.is_version_change() {
        return Err(EngineError::invalid_state(
            "schema changes require a version-change transaction",
        ));
    }
    if queue.is_errored() {
        return Err(EngineError::invalid_state("transaction has errored"));
    }
    Ok(())
}

/// One record's cell for one index; `None` means no entry.
fn index_cell(descriptor: &IndexDescriptor, record: &Value) -> Option<Vec<u8>> {
    let key = descriptor.key_path.evaluate(record)?;
    let encoded = if descriptor.multi_entry {
        encode_key_set(&key)
    } else {
        key.encode()
    };
    encoded.ok()
}

/// Whether storing `cell` under `primary_key` would give a unique index two
/// records with one key. Multi-entry cells conflict when any element is
/// already present in another record's set; the containment prefilter prunes
/// rows and the frame-exact membership check decides.
fn unique_conflict(
    store: &dyn StoreTx,
    table: &str,
    descriptor: &IndexDescriptor,
    cell: &[u8],
    primary_key: &[u8],
) -> EngineResult<bool> {
    if descriptor.multi_entry {
        for element in decode_key_set(cell)? {
            let encoded = element.encode()?;
            let scan = query::compile_candidates(descriptor.column(), &[element])?;
            for row in store.scan(table, &scan)? {
                if row.primary_key == primary_key {
                    continue;
                }
                let Some(existing) = row.cell(descriptor.column()) else {
                    continue;
                };
                if contains_encoded(existing, &encoded)? {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    } else {
        let scan = ScanQuery::new().with_predicate(Predicate::Compare {
            column: descriptor.column().to_string(),
            op: CompareOp::Eq,
            value: cell.to_vec(),
        });
        Ok(store
            .scan(table, &scan)?
            .iter()
            .any(|row| row.primary_key != primary_key))
    }
}
