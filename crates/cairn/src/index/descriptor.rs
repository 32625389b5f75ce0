//! Index descriptors, lifecycle flags, and the descriptor registry.
//!
//! A descriptor is one index's identity: name, key path, options, and the
//! transactional lifecycle flags that govern what may be done with it.
//! Descriptors live in an arena-style registry and are addressed by a stable
//! [`IndexSlot`], so open handles survive renames — they resolve through the
//! slot, never through a cached name.

use cairn_core::KeyPath;

/// Transactional lifecycle flags of one index.
///
/// These are independent flags rather than a single enum because several
/// combine legitimately during a version-change transaction: an index created
/// and then renamed in the same transaction carries `pending_create` and
/// `pending_name` at once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LifecycleState {
    /// Creation registered but structural work not yet finished.
    pub pending_create: bool,
    /// Deletion registered but physical teardown not yet finished.
    pub pending_delete: bool,
    /// Physical teardown finished; the descriptor is a tombstone.
    pub deleted: bool,
    /// This index reuses the tombstoned column of a same-named predecessor.
    pub recreated: bool,
    /// The name before an in-flight rename, kept until the physical rename
    /// completes so an abort can restore it.
    pub pending_name: Option<String>,
}

impl LifecycleState {
    /// Fresh state for a newly registered descriptor.
    #[must_use]
    pub fn pending_create() -> Self {
        Self {
            pending_create: true,
            ..Self::default()
        }
    }

    /// Whether reads may see this index at all.
    #[inline]
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        !self.deleted && !self.pending_delete
    }
}

/// One index's identity and options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDescriptor {
    /// The index name, unique among visible siblings.
    pub name: String,
    /// Where the index key comes from in a record.
    pub key_path: KeyPath,
    /// Whether two records may share an extracted key.
    pub unique: bool,
    /// Whether an array-valued extracted key yields one entry per element.
    pub multi_entry: bool,
    /// Transactional lifecycle flags.
    pub state: LifecycleState,
}

impl IndexDescriptor {
    /// Create a descriptor in `pending_create` state.
    #[must_use]
    pub fn new(name: impl Into<String>, key_path: KeyPath, unique: bool, multi_entry: bool) -> Self {
        Self {
            name: name.into(),
            key_path,
            unique,
            multi_entry,
            state: LifecycleState::pending_create(),
        }
    }

    /// The physical column holding this index's encoded keys.
    ///
    /// The column is named after the index; renames rebuild the table rather
    /// than alias the column, so the two never drift apart.
    #[inline]
    #[must_use]
    pub fn column(&self) -> &str {
        &self.name
    }
}

/// Stable identity of a registered descriptor.
///
/// Slots are never reused within one registry, so a handle holding a slot for
/// a deleted index resolves to the tombstone (and fails state checks) rather
/// than aliasing an unrelated newer index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndexSlot(usize);

/// Arena of index descriptors for one object store.
///
/// Deleted descriptors stay in their slot as tombstones until something
/// explicitly evicts them (recreation of the same name reuses the physical
/// column and drops the tombstone).
#[derive(Debug, Default)]
pub struct IndexRegistry {
    slots: Vec<Option<IndexDescriptor>>,
}

impl IndexRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor, returning its stable slot.
    pub fn insert(&mut self, descriptor: IndexDescriptor) -> IndexSlot {
        let slot = IndexSlot(self.slots.len());
        self.slots.push(Some(descriptor));
        slot
    }

    /// Look up a descriptor by slot.
    #[must_use]
    pub fn get(&self, slot: IndexSlot) -> Option<&IndexDescriptor> {
        self.slots.get(slot.0).and_then(Option::as_ref)
    }

    /// Look up a descriptor by slot, mutably.
    pub fn get_mut(&mut self, slot: IndexSlot) -> Option<&mut IndexDescriptor> {
        self.slots.get_mut(slot.0).and_then(Option::as_mut)
    }

    /// Evict a descriptor, returning it if the slot was occupied.
    pub fn remove(&mut self, slot: IndexSlot) -> Option<IndexDescriptor> {
        self.slots.get_mut(slot.0).and_then(Option::take)
    }

    /// Re-occupy a slot, used when an abort restores an evicted tombstone.
    pub fn restore(&mut self, slot: IndexSlot, descriptor: IndexDescriptor) {
        if let Some(entry) = self.slots.get_mut(slot.0) {
            *entry = Some(descriptor);
        }
    }

    /// Resolve a name to the slot of the visible descriptor carrying it.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<IndexSlot> {
        self.iter()
            .find(|(_, d)| d.state.is_visible() && d.name == name)
            .map(|(slot, _)| slot)
    }

    /// Find a tombstoned descriptor by name, if one exists.
    #[must_use]
    pub fn tombstone(&self, name: &str) -> Option<IndexSlot> {
        self.iter()
            .find(|(_, d)| d.state.deleted && d.name == name)
            .map(|(slot, _)| slot)
    }

    /// Whether a visible descriptor already claims this name.
    #[must_use]
    pub fn name_in_use(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    /// Names of all visible indexes, in registration order.
    #[must_use]
    pub fn visible_names(&self) -> Vec<String> {
        self.iter()
            .filter(|(_, d)| d.state.is_visible())
            .map(|(_, d)| d.name.clone())
            .collect()
    }

    /// Iterate all occupied slots, tombstones included.
    pub fn iter(&self) -> impl Iterator<Item = (IndexSlot, &IndexDescriptor)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, d)| d.as_ref().map(|d| (IndexSlot(i), d)))
    }
}
