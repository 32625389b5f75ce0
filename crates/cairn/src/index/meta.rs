//! Persisted index metadata.
//!
//! Each object store's index list is serialized as a JSON mapping from index
//! name to `{keyPath, unique, multiEntry, deleted}` and stored in a schema
//! row keyed by the store's name. The whole mapping is rewritten in one row
//! insert whenever the list changes, so readers never see a half-updated
//! list.

use std::collections::BTreeMap;

use cairn_core::KeyPath;
use cairn_store::{Row, StoreTx};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::index::descriptor::IndexRegistry;

/// Column holding the record payload in every object-store table.
pub const VALUE_COLUMN: &str = "value";

/// Table holding one schema row per object store.
pub const SCHEMA_TABLE: &str = "__cairn_schema";

/// Column of [`SCHEMA_TABLE`] holding the serialized index mapping.
pub const INDEXES_COLUMN: &str = "indexes";

/// The persisted form of one index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexMetadata {
    /// Where the index key comes from in a record.
    pub key_path: KeyPath,
    /// Whether two records may share an extracted key.
    pub unique: bool,
    /// Whether an array-valued extracted key yields one entry per element.
    pub multi_entry: bool,
    /// Whether this entry is a tombstone for a deleted index.
    pub deleted: bool,
}

/// Create the schema table if this store has never had one.
pub fn ensure_schema_table(store: &mut dyn StoreTx) -> EngineResult<()> {
    if !store.table_exists(SCHEMA_TABLE) {
        store.create_table(SCHEMA_TABLE, &[INDEXES_COLUMN.to_string()])?;
    }
    Ok(())
}

/// Rewrite the store's schema row from the registry's current state.
///
/// Tombstones are persisted with `deleted: true` so a reopened store knows
/// which physical columns linger for reuse.
pub fn persist(
    store: &mut dyn StoreTx,
    store_name: &str,
    registry: &IndexRegistry,
) -> EngineResult<()> {
    let mapping: BTreeMap<&str, IndexMetadata> = registry
        .iter()
        .map(|(_, d)| {
            (
                d.name.as_str(),
                IndexMetadata {
                    key_path: d.key_path.clone(),
                    unique: d.unique,
                    multi_entry: d.multi_entry,
                    deleted: d.state.deleted,
                },
            )
        })
        .collect();

    let bytes = serde_json::to_vec(&mapping)
        .map_err(|e| EngineError::corrupt(format!("unserializable index metadata: {e}")))?;
    let row = Row::new(store_name.as_bytes().to_vec()).with_cell(INDEXES_COLUMN, Some(bytes));
    store.insert(SCHEMA_TABLE, row)?;
    Ok(())
}

/// Read the store's persisted index mapping. Missing row means no indexes.
pub fn load(
    store: &dyn StoreTx,
    store_name: &str,
) -> EngineResult<BTreeMap<String, IndexMetadata>> {
    let Some(row) = store.get(SCHEMA_TABLE, store_name.as_bytes())? else {
        return Ok(BTreeMap::new());
    };
    let Some(bytes) = row.cell(INDEXES_COLUMN) else {
        return Ok(BTreeMap::new());
    };
    serde_json::from_slice(bytes)
        .map_err(|e| EngineError::corrupt(format!("bad index metadata row: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use cairn_store::backends::MemoryStore;

    use super::*;
    use crate::index::descriptor::IndexDescriptor;

    #[test]
    fn persist_and_load_round_trip() {
        let mut store = MemoryStore::new();
        ensure_schema_table(&mut store).unwrap();

        let mut registry = IndexRegistry::new();
        registry.insert(IndexDescriptor::new(
            "tagIdx",
            KeyPath::single("tags"),
            false,
            true,
        ));
        let dead = registry.insert(IndexDescriptor::new(
            "old",
            KeyPath::single("old"),
            true,
            false,
        ));
        registry.get_mut(dead).unwrap().state.deleted = true;

        persist(&mut store, "people", &registry).unwrap();
        let mapping = load(&store, "people").unwrap();

        assert_eq!(mapping.len(), 2);
        let tag = &mapping["tagIdx"];
        assert!(tag.multi_entry && !tag.unique && !tag.deleted);
        assert!(mapping["old"].deleted);
    }

    #[test]
    fn wire_form_uses_camel_case_fields() {
        let meta = IndexMetadata {
            key_path: KeyPath::single("tags"),
            unique: false,
            multi_entry: true,
            deleted: false,
        };
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "keyPath": "tags",
                "unique": false,
                "multiEntry": true,
                "deleted": false,
            })
        );
    }

    #[test]
    fn missing_schema_row_means_no_indexes() {
        let mut store = MemoryStore::new();
        ensure_schema_table(&mut store).unwrap();
        assert!(load(&store, "nobody").unwrap().is_empty());
    }

    #[test]
    fn rewrite_replaces_the_whole_mapping() {
        let mut store = MemoryStore::new();
        ensure_schema_table(&mut store).unwrap();

        let mut registry = IndexRegistry::new();
        let slot = registry.insert(IndexDescriptor::new(
            "a",
            KeyPath::single("a"),
            false,
            false,
        ));
        persist(&mut store, "s", &registry).unwrap();

        registry.get_mut(slot).unwrap().name = "b".to_string();
        persist(&mut store, "s", &registry).unwrap();

        let mapping = load(&store, "s").unwrap();
        assert!(mapping.contains_key("b"));
        assert!(!mapping.contains_key("a"));
    }
}
