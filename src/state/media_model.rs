//! Media list model
//!
//! A flat, sortable list of the media files of one folder. The list is a
//! point-in-time snapshot: changing the root marks it dirty and the next read
//! performs exactly one scan.

use serde::{Deserialize, Serialize};
use std::cell::{Ref, RefCell};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::media::{DirectoryScanner, MediaEntry, MediaScanner};
use super::path_index::paths_equal;
use super::roles::{MediaRole, RoleValue};
use super::signal::{Change, Signal};

/// The various sort options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortKey {
    #[default]
    Name,
    Size,
    Date,
    Type,
}

impl SortKey {
    /// Decode the integer stored in settings. Unknown values fall back to `Name`.
    pub fn from_setting(value: i64) -> Self {
        match value {
            1 => Self::Size,
            2 => Self::Date,
            3 => Self::Type,
            _ => Self::Name,
        }
    }

    pub fn to_setting(self) -> i64 {
        match self {
            Self::Name => 0,
            Self::Size => 1,
            Self::Date => 2,
            Self::Type => 3,
        }
    }
}

/// The sort order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn from_setting(value: i64) -> Self {
        if value == 1 {
            Self::Descending
        } else {
            Self::Ascending
        }
    }

    pub fn to_setting(self) -> i64 {
        match self {
            Self::Ascending => 0,
            Self::Descending => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SortSpec {
    pub key: SortKey,
    pub order: SortOrder,
}

impl SortSpec {
    pub fn new(key: SortKey, order: SortOrder) -> Self {
        Self { key, order }
    }

    /// Ascending comparison by key. Equal keys compare equal so a stable
    /// sort keeps their relative order.
    pub fn compare(&self, a: &MediaEntry, b: &MediaEntry) -> Ordering {
        match self.key {
            SortKey::Name => a.name.cmp(&b.name),
            SortKey::Size => a.size.cmp(&b.size),
            SortKey::Date => a.modified.cmp(&b.modified),
            SortKey::Type => a.kind.cmp(&b.kind),
        }
    }

    /// Stable ascending sort, reversed as a whole for `Descending`, so the
    /// two orders are exact mirrors even among equal keys.
    pub fn apply(&self, entries: &mut [MediaEntry]) {
        entries.sort_by(|a, b| self.compare(a, b));
        if self.order == SortOrder::Descending {
            entries.reverse();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Clean,
    Dirty,
}

/// The entries of the current root plus whether they still need a scan.
#[derive(Debug)]
struct MediaCollection {
    state: ScanState,
    entries: Vec<MediaEntry>,
}

impl MediaCollection {
    fn new() -> Self {
        Self {
            state: ScanState::Clean,
            entries: Vec::new(),
        }
    }

    fn mark_dirty(&mut self) {
        self.entries.clear();
        self.state = ScanState::Dirty;
    }

    /// The only Dirty -> Clean transition.
    fn ensure_scanned(&mut self, root: Option<&Path>, scanner: &dyn MediaScanner, sort: SortSpec) {
        if self.state == ScanState::Clean {
            return;
        }

        if let Some(root) = root {
            self.entries = scanner.scan(root);
            sort.apply(&mut self.entries);
        }
        self.state = ScanState::Clean;
    }
}

/// Position of an entry in the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MediaIndex {
    row: usize,
    generation: u64,
}

impl MediaIndex {
    pub fn row(&self) -> usize {
        self.row
    }
}

pub struct MediaModel {
    root: Option<PathBuf>,
    collection: RefCell<MediaCollection>,
    sort: SortSpec,
    scanner: Box<dyn MediaScanner>,
    /// Bumped on every reset so handles from an older snapshot are rejected.
    generation: u64,
    changed: Signal<Change>,
    root_changed: Signal<PathBuf>,
    sort_key_changed: Signal<SortKey>,
    sort_order_changed: Signal<SortOrder>,
}

impl MediaModel {
    pub fn new() -> Self {
        Self::with_scanner(Box::new(DirectoryScanner))
    }

    pub fn with_scanner(scanner: Box<dyn MediaScanner>) -> Self {
        Self {
            root: None,
            collection: RefCell::new(MediaCollection::new()),
            sort: SortSpec::default(),
            scanner,
            generation: 0,
            changed: Signal::new(),
            root_changed: Signal::new(),
            sort_key_changed: Signal::new(),
            sort_order_changed: Signal::new(),
        }
    }

    pub fn changed(&mut self) -> &mut Signal<Change> {
        &mut self.changed
    }

    pub fn root_changed(&mut self) -> &mut Signal<PathBuf> {
        &mut self.root_changed
    }

    pub fn sort_key_changed(&mut self) -> &mut Signal<SortKey> {
        &mut self.sort_key_changed
    }

    pub fn sort_order_changed(&mut self) -> &mut Signal<SortOrder> {
        &mut self.sort_order_changed
    }

    pub fn role_names() -> Vec<(MediaRole, &'static str)> {
        MediaRole::ALL.iter().map(|role| (*role, role.name())).collect()
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Point the model at a new folder.
    ///
    /// Returns `false` and does nothing when `path` is the current root or is
    /// not an existing directory.
    pub fn set_root(&mut self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        if self.root.as_deref() == Some(path) || !path.is_dir() {
            return false;
        }

        self.changed.emit(&Change::BeginReset);
        self.collection.borrow_mut().mark_dirty();
        self.root = Some(path.to_path_buf());
        self.generation += 1;
        self.changed.emit(&Change::EndReset);

        info!(root = %path.display(), "Media root changed");
        self.root_changed.emit(&path.to_path_buf());
        true
    }

    /// Drop the current snapshot so the next read rescans the root.
    pub fn refresh(&mut self) {
        self.changed.emit(&Change::BeginReset);
        self.collection.borrow_mut().mark_dirty();
        self.generation += 1;
        self.changed.emit(&Change::EndReset);
    }

    /// The current entries, scanning the root first if the snapshot is dirty.
    pub fn entries(&self) -> Ref<'_, [MediaEntry]> {
        self.ensure_scanned();
        Ref::map(self.collection.borrow(), |c| c.entries.as_slice())
    }

    fn ensure_scanned(&self) {
        self.collection
            .borrow_mut()
            .ensure_scanned(self.root.as_deref(), self.scanner.as_ref(), self.sort);
    }

    fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn sort_spec(&self) -> SortSpec {
        self.sort
    }

    pub fn sort_key(&self) -> SortKey {
        self.sort.key
    }

    pub fn set_sort_key(&mut self, key: SortKey) {
        if self.sort.key != key {
            self.sort.key = key;
            self.sort_key_changed.emit(&key);
            self.sort();
        }
    }

    pub fn sort_order(&self) -> SortOrder {
        self.sort.order
    }

    /// Flip the order. Entries are already sorted by the current key, so
    /// they are reversed in place rather than re-sorted.
    pub fn set_sort_order(&mut self, order: SortOrder) {
        if self.sort.order == order {
            return;
        }
        self.sort_order_changed.emit(&order);

        self.changed.emit(&Change::BeginReset);
        // scan with the old order before flipping
        self.ensure_scanned();
        self.sort.order = order;
        self.collection.get_mut().entries.reverse();
        self.generation += 1;
        debug!(order = ?order, "Reversed media list");
        self.changed.emit(&Change::EndReset);
    }

    /// Re-sort the current entries in place with the current sort spec.
    pub fn sort(&mut self) {
        self.changed.emit(&Change::BeginReset);
        self.ensure_scanned();
        self.sort.apply(&mut self.collection.get_mut().entries);
        self.generation += 1;
        debug!(key = ?self.sort.key, order = ?self.sort.order, "Sorted media list");
        self.changed.emit(&Change::EndReset);
    }

    /// Row of the entry whose path is `path` (linear scan, first match).
    pub fn index_by_path(&self, path: impl AsRef<Path>) -> Option<usize> {
        let wanted = path.as_ref().to_string_lossy();
        let entries = self.entries();
        entries
            .iter()
            .position(|entry| paths_equal(&entry.path.to_string_lossy(), &wanted))
    }

    pub fn model_index_by_path(&self, path: impl AsRef<Path>) -> Option<MediaIndex> {
        let row = self.index_by_path(path)?;
        self.index(row)
    }

    /// Handle for `row`, or `None` when out of range.
    pub fn index(&self, row: usize) -> Option<MediaIndex> {
        (row < self.len()).then_some(MediaIndex {
            row,
            generation: self.generation,
        })
    }

    /// The entry before `index`, or `None` at the first row.
    pub fn previous(&self, index: MediaIndex) -> Option<MediaIndex> {
        if !self.is_valid(index) || index.row == 0 {
            return None;
        }
        self.index(index.row - 1)
    }

    /// The entry after `index`, or `None` at the last row.
    pub fn next(&self, index: MediaIndex) -> Option<MediaIndex> {
        if !self.is_valid(index) {
            return None;
        }
        self.index(index.row + 1)
    }

    pub fn media(&self, index: MediaIndex) -> Option<MediaEntry> {
        if !self.is_valid(index) {
            return None;
        }
        self.entries().get(index.row).cloned()
    }

    /// Plain row of a handle, `None` when the handle is stale.
    pub fn row_of(&self, index: MediaIndex) -> Option<usize> {
        self.is_valid(index).then_some(index.row)
    }

    pub fn is_valid(&self, index: MediaIndex) -> bool {
        index.generation == self.generation && index.row < self.len()
    }

    /// A flat list has no parents.
    pub fn parent(&self, _index: MediaIndex) -> Option<MediaIndex> {
        None
    }

    pub fn row_count(&self, parent: Option<MediaIndex>) -> usize {
        match parent {
            Some(_) => 0,
            None => self.len(),
        }
    }

    pub fn column_count(&self, _parent: Option<MediaIndex>) -> usize {
        1
    }

    pub fn data(&self, index: MediaIndex, role: MediaRole) -> Option<RoleValue> {
        let entry = self.media(index)?;
        let value = match role {
            MediaRole::Name => RoleValue::Text(entry.name),
            MediaRole::Path => RoleValue::Path(entry.path),
            MediaRole::Date => RoleValue::Date(entry.modified),
            MediaRole::Size => RoleValue::Bytes(entry.size),
            MediaRole::Type => RoleValue::Kind(entry.kind),
        };
        Some(value)
    }
}

impl Default for MediaModel {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MediaModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaModel")
            .field("root", &self.root)
            .field("sort", &self.sort)
            .field("generation", &self.generation)
            .finish()
    }
}
