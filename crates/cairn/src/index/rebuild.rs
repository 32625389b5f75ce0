//! Structural schema procedures: create, rename, and delete an index.
//!
//! The flat store has no "add a uniquely-ordered, renamable index column"
//! primitive, so each procedure is a chain of discrete steps pushed through
//! the transaction queue. A step that fails latches the transaction's error
//! and the rest of the chain never runs; the queue's abort path unwinds the
//! eager namespace mutations the caller made.
//!
//! Rename is the expensive one: with no in-place column rename, the table is
//! rebuilt through a shadow copy — same primary key and payload, every
//! surviving index column under its new name — then swapped into place and
//! its ordering structures recreated. Tombstoned columns of deleted indexes
//! are dropped by the same rebuild.

use std::collections::BTreeSet;

use cairn_core::encoding::composite::{decode_key_set, encode_key_set};
use cairn_store::{Row, ScanQuery, StoreTx, PRIMARY_ORDERING};
use tracing::{debug, trace};

use crate::codec::RecordCodec;
use crate::error::{EngineError, EngineResult};
use crate::index::descriptor::{IndexDescriptor, IndexSlot};
use crate::index::meta::{self, VALUE_COLUMN};
use crate::txn::{TaskCtx, TaskQueue};

/// Queue the structural steps that realize a freshly registered index.
///
/// Steps: structural column/ordering work, metadata persist, backfill with
/// uniqueness detection, and the pending-flag clear. The first failing step
/// surfaces its error; the descriptor itself is the caller's to clean up.
pub fn enqueue_create(
    queue: &mut dyn TaskQueue,
    ctx: &mut TaskCtx<'_>,
    store_name: &str,
    slot: IndexSlot,
) -> EngineResult<()> {
    let table = store_name.to_string();

    let step_table = table.clone();
    queue.enqueue_maintenance(
        ctx,
        Box::new(move |ctx| {
            let descriptor = snapshot(ctx, slot)?;
            if descriptor.state.recreated {
                debug!(index = %descriptor.name, "reusing tombstoned index column");
            } else {
                ctx.store.add_column(&step_table, descriptor.column())?;
            }
            ctx.store.create_ordering(&step_table, descriptor.column())?;
            Ok(())
        }),
    )?;

    let step_table = table.clone();
    queue.enqueue_maintenance(
        ctx,
        Box::new(move |ctx| meta::persist(ctx.store, &step_table, ctx.registry)),
    )?;

    let step_table = table.clone();
    queue.enqueue_maintenance(ctx, Box::new(move |ctx| backfill(ctx, &step_table, slot)))?;

    queue.enqueue_maintenance(
        ctx,
        Box::new(move |ctx| {
            if let Some(descriptor) = ctx.registry.get_mut(slot) {
                descriptor.state.pending_create = false;
            }
            Ok(())
        }),
    )
}

/// Queue the structural steps behind a rename whose namespace change the
/// caller already applied (the descriptor carries the old name in
/// `pending_name` until the last step clears it).
pub fn enqueue_rename(
    queue: &mut dyn TaskQueue,
    ctx: &mut TaskCtx<'_>,
    store_name: &str,
    slot: IndexSlot,
) -> EngineResult<()> {
    let table = store_name.to_string();

    let step_table = table.clone();
    queue.enqueue_maintenance(
        ctx,
        Box::new(move |ctx| rebuild_table(ctx, &step_table)),
    )?;

    let step_table = table.clone();
    queue.enqueue_maintenance(
        ctx,
        Box::new(move |ctx| {
            // Backends can tie the primary ordering structure to the table
            // identity; drop and recreate it after the swap.
            ctx.store.drop_ordering(&step_table, PRIMARY_ORDERING)?;
            ctx.store.create_ordering(&step_table, PRIMARY_ORDERING)?;
            let columns: Vec<String> = ctx
                .registry
                .iter()
                .filter(|(_, d)| d.state.is_visible())
                .map(|(_, d)| d.column().to_string())
                .collect();
            for column in columns {
                ctx.store.create_ordering(&step_table, &column)?;
            }
            Ok(())
        }),
    )?;

    queue.enqueue_maintenance(
        ctx,
        Box::new(move |ctx| {
            meta::persist(ctx.store, &table, ctx.registry)?;
            if let Some(descriptor) = ctx.registry.get_mut(slot) {
                descriptor.state.pending_name = None;
            }
            Ok(())
        }),
    )
}

/// Queue the teardown steps behind a deletion whose namespace change the
/// caller already applied (`pending_delete` is set on the descriptor).
pub fn enqueue_delete(
    queue: &mut dyn TaskQueue,
    ctx: &mut TaskCtx<'_>,
    store_name: &str,
    slot: IndexSlot,
) -> EngineResult<()> {
    let table = store_name.to_string();

    let step_table = table.clone();
    queue.enqueue_maintenance(
        ctx,
        Box::new(move |ctx| {
            let descriptor = snapshot(ctx, slot)?;
            if ctx.store.has_ordering(&step_table, descriptor.column()) {
                ctx.store.drop_ordering(&step_table, descriptor.column())?;
            }
            // The column itself stays behind as a cheap tombstone; a future
            // recreate reuses it and a future rename rebuild purges it.
            Ok(())
        }),
    )?;

    queue.enqueue_maintenance(
        ctx,
        Box::new(move |ctx| {
            if let Some(descriptor) = ctx.registry.get_mut(slot) {
                descriptor.state.deleted = true;
                descriptor.state.pending_delete = false;
                descriptor.state.recreated = false;
                debug!(index = %descriptor.name, "index deleted");
            }
            meta::persist(ctx.store, &table, ctx.registry)
        }),
    )
}

/// Shadow-copy rebuild of the object-store table.
///
/// The shadow gets the payload column plus every visible index column under
/// its current (post-rename) name; the projection maps each from its old
/// physical column. Tombstoned columns are left out, which purges them, so
/// their registry entries are evicted here too.
fn rebuild_table(ctx: &mut TaskCtx<'_>, table: &str) -> EngineResult<()> {
    let shadow = format!("__{table}_rebuild");

    let mut columns = vec![VALUE_COLUMN.to_string()];
    let mut mapping = vec![(VALUE_COLUMN.to_string(), VALUE_COLUMN.to_string())];
    let mut purged = Vec::new();
    for (slot, descriptor) in ctx.registry.iter() {
        if descriptor.state.is_visible() {
            let physical = descriptor
                .state
                .pending_name
                .clone()
                .unwrap_or_else(|| descriptor.name.clone());
            columns.push(descriptor.name.clone());
            mapping.push((physical, descriptor.name.clone()));
        } else if descriptor.state.deleted {
            purged.push(slot);
        }
    }

    debug!(%table, surviving = columns.len() - 1, purged = purged.len(), "rebuilding table");
    ctx.store.create_table(&shadow, &columns)?;
    ctx.store.copy_projection(table, &shadow, &mapping)?;
    ctx.store.drop_table(table)?;
    ctx.store.rename_table(&shadow, table)?;

    // Their physical columns are gone; the tombstones no longer describe
    // anything reusable.
    for slot in purged {
        ctx.registry.remove(slot);
    }
    Ok(())
}

/// Stream every record through key extraction and populate the index column.
///
/// A record whose key cannot be extracted or encoded simply gets no entry —
/// its cell is written as null, which also scrubs stale data when a
/// tombstoned column is being reused. A duplicate key under `unique` aborts
/// the whole creation after clearing everything written so far.
fn backfill(ctx: &mut TaskCtx<'_>, table: &str, slot: IndexSlot) -> EngineResult<()> {
    let descriptor = snapshot(ctx, slot)?;
    let rows = ctx.store.scan(table, &ScanQuery::new())?;
    let mut seen: BTreeSet<Vec<u8>> = BTreeSet::new();

    debug!(index = %descriptor.name, records = rows.len(), "backfill started");
    for row in &rows {
        let cell = extract_cell(ctx.codec, &descriptor, row);

        if descriptor.unique {
            if let Some(bytes) = &cell {
                for element in distinct_elements(&descriptor, bytes)? {
                    if !seen.insert(element) {
                        clear_column(ctx.store, table, descriptor.column(), &rows)?;
                        return Err(EngineError::constraint(format!(
                            "duplicate key for unique index {}",
                            descriptor.name
                        )));
                    }
                }
            }
        }

        let mut updated = row.clone();
        updated
            .cells
            .insert(descriptor.column().to_string(), cell);
        ctx.store.insert(table, updated)?;
    }
    Ok(())
}

/// The encoded keys one populated cell contributes to uniqueness checking:
/// the cell itself for a plain index, each distinct element for multi-entry
/// (duplicates inside one record collapse before this point).
fn distinct_elements(descriptor: &IndexDescriptor, cell: &[u8]) -> EngineResult<Vec<Vec<u8>>> {
    if descriptor.multi_entry {
        decode_key_set(cell)?
            .iter()
            .map(|key| key.encode().map_err(EngineError::from))
            .collect()
    } else {
        Ok(vec![cell.to_vec()])
    }
}

/// Extract and encode one record's index cell; `None` means no entry.
fn extract_cell(
    codec: &dyn RecordCodec,
    descriptor: &IndexDescriptor,
    row: &Row,
) -> Option<Vec<u8>> {
    let payload = row.cell(VALUE_COLUMN)?;
    let record = match codec.decode_record(payload) {
        Ok(record) => record,
        Err(error) => {
            trace!(index = %descriptor.name, %error, "record skipped: undecodable payload");
            return None;
        }
    };
    let key = descriptor.key_path.evaluate(&record)?;
    let encoded = if descriptor.multi_entry {
        encode_key_set(&key)
    } else {
        key.encode()
    };
    match encoded {
        Ok(bytes) => Some(bytes),
        Err(error) => {
            trace!(index = %descriptor.name, %error, "record skipped: unencodable key");
            None
        }
    }
}

/// Null out the index column for every row: the unique-violation rollback.
fn clear_column(
    store: &mut dyn StoreTx,
    table: &str,
    column: &str,
    rows: &[Row],
) -> EngineResult<()> {
    for row in rows {
        let mut cleared = row.clone();
        cleared.cells.insert(column.to_string(), None);
        store.insert(table, cleared)?;
    }
    Ok(())
}

/// The descriptor a structural step operates on; its disappearance means the
/// transaction is being torn down around us.
fn snapshot(ctx: &TaskCtx<'_>, slot: IndexSlot) -> EngineResult<IndexDescriptor> {
    ctx.registry
        .get(slot)
        .cloned()
        .ok_or_else(|| EngineError::invalid_state("index no longer exists"))
}
