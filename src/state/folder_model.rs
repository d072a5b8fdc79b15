//! Folder tree model
//!
//! Nodes live in an arena owned by the model. Parents own their children
//! through index lists and the back-reference to a parent is a plain id used
//! only for lookups. Handles carry the model generation, which is bumped on
//! every reset, so a handle to a freed node simply resolves to nothing.

use std::cell::Cell;
use std::path::Path;
use tracing::debug;

use super::folder::Folder;
use super::media::count_media;
use super::path_index::{self, display_name, normalize_path, PathTree};
use super::roles::{FolderRole, RoleValue};
use super::signal::{Change, Signal};

/// Arena slot of a folder node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Position of a folder in the tree: its row among its siblings plus the
/// node it points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FolderIndex {
    row: usize,
    node: NodeId,
    generation: u64,
}

impl FolderIndex {
    pub fn row(&self) -> usize {
        self.row
    }

    pub fn node(&self) -> NodeId {
        self.node
    }
}

#[derive(Debug)]
struct FolderNode {
    path: String,
    name: String,
    /// Pre-computed by the template, or derived on first access.
    media_count: Cell<Option<usize>>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Tree-shaped read model over a forest of folders.
#[derive(Debug, Default)]
pub struct FolderModel {
    nodes: Vec<FolderNode>,
    roots: Vec<NodeId>,
    generation: u64,
    changed: Signal<Change>,
}

impl FolderModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Structural change notifications.
    pub fn changed(&mut self) -> &mut Signal<Change> {
        &mut self.changed
    }

    pub fn role_names() -> Vec<(FolderRole, &'static str)> {
        FolderRole::ALL.iter().map(|role| (*role, role.name())).collect()
    }

    pub fn root_paths(&self) -> Vec<String> {
        self.roots
            .iter()
            .map(|id| self.nodes[id.0].path.clone())
            .collect()
    }

    /// Discard the whole forest and create one shallow root per path.
    pub fn replace_roots<I, S>(&mut self, paths: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.changed.emit(&Change::BeginReset);
        self.reset_storage();

        for path in paths {
            let path = normalize_path(path.as_ref());
            let id = self.alloc(FolderNode {
                name: display_name(&path),
                path,
                media_count: Cell::new(None),
                parent: None,
                children: Vec::new(),
            });
            self.roots.push(id);
        }

        debug!(roots = self.roots.len(), "Replaced folder roots");
        self.changed.emit(&Change::EndReset);
    }

    /// Deep-copy `template` and append it as a new root.
    pub fn append_root(&mut self, template: &Folder) -> FolderIndex {
        let row = self.roots.len();
        self.changed.emit(&Change::BeginInsertRows {
            first: row,
            last: row,
        });

        let node = self.insert_tree(template, None);
        self.roots.push(node);

        debug!(path = %template.path(), row, "Appended folder root");
        self.changed.emit(&Change::EndInsertRows);

        FolderIndex {
            row,
            node,
            generation: self.generation,
        }
    }

    /// Remove every root.
    pub fn clear(&mut self) {
        self.changed.emit(&Change::BeginReset);
        self.reset_storage();
        self.changed.emit(&Change::EndReset);
    }

    /// Find the folder at `path`, whatever its separator style.
    pub fn resolve_path(&self, path: &str) -> Option<FolderIndex> {
        path_index::resolve(self, path).map(|(row, node)| FolderIndex {
            row,
            node,
            generation: self.generation,
        })
    }

    /// The child at `row` under `parent` (or the root at `row`).
    pub fn index(&self, row: usize, parent: Option<FolderIndex>) -> Option<FolderIndex> {
        let siblings = match parent {
            Some(parent) => &self.node(parent)?.children,
            None => &self.roots,
        };

        siblings.get(row).map(|&node| FolderIndex {
            row,
            node,
            generation: self.generation,
        })
    }

    /// The parent of `index`, with its row among its own siblings.
    ///
    /// Roots have no parent.
    pub fn parent(&self, index: FolderIndex) -> Option<FolderIndex> {
        let parent = self.node(index)?.parent?;
        let siblings = match self.nodes[parent.0].parent {
            Some(grandparent) => &self.nodes[grandparent.0].children,
            None => &self.roots,
        };
        let row = siblings.iter().position(|&id| id == parent)?;

        Some(FolderIndex {
            row,
            node: parent,
            generation: self.generation,
        })
    }

    pub fn row_count(&self, parent: Option<FolderIndex>) -> usize {
        match parent {
            Some(parent) => self.node(parent).map_or(0, |node| node.children.len()),
            None => self.roots.len(),
        }
    }

    pub fn column_count(&self, _parent: Option<FolderIndex>) -> usize {
        1
    }

    /// Whether `index` still points at a live node of this model.
    pub fn is_valid(&self, index: FolderIndex) -> bool {
        self.node(index).is_some()
    }

    pub fn data(&self, index: FolderIndex, role: FolderRole) -> Option<RoleValue> {
        let node = self.node(index)?;
        let value = match role {
            FolderRole::Name => RoleValue::Text(node.name.clone()),
            FolderRole::Path => RoleValue::Text(node.path.clone()),
            FolderRole::MediaCount => RoleValue::Count(Self::media_count_of(node)),
            FolderRole::Folder => RoleValue::Folder(index),
        };
        Some(value)
    }

    fn media_count_of(node: &FolderNode) -> usize {
        if let Some(count) = node.media_count.get() {
            return count;
        }
        let count = count_media(Path::new(&node.path));
        node.media_count.set(Some(count));
        count
    }

    fn node(&self, index: FolderIndex) -> Option<&FolderNode> {
        if index.generation != self.generation {
            return None;
        }
        self.nodes.get(index.node.0)
    }

    fn reset_storage(&mut self) {
        self.nodes.clear();
        self.roots.clear();
        self.generation += 1;
    }

    fn alloc(&mut self, node: FolderNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    fn insert_tree(&mut self, template: &Folder, parent: Option<NodeId>) -> NodeId {
        let id = self.alloc(FolderNode {
            path: template.path().to_string(),
            name: template.name().to_string(),
            media_count: Cell::new(template.media_count()),
            parent,
            children: Vec::new(),
        });

        for child in template.children() {
            let duplicate = self.nodes[id.0]
                .children
                .iter()
                .any(|existing| self.nodes[existing.0].path == child.path());
            if duplicate {
                debug!(path = %child.path(), "Skipping duplicate child folder");
                continue;
            }

            let child_id = self.insert_tree(child, Some(id));
            self.nodes[id.0].children.push(child_id);
        }

        id
    }
}

impl PathTree for FolderModel {
    type Node = NodeId;

    fn children_of(&self, parent: Option<NodeId>) -> &[NodeId] {
        match parent {
            Some(parent) => &self.nodes[parent.0].children,
            None => &self.roots,
        }
    }

    fn path_of(&self, node: NodeId) -> &str {
        &self.nodes[node.0].path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::fs;
    use std::rc::Rc;
    use tempfile::tempdir;

    fn photos() -> Folder {
        Folder::new("/data/photos")
            .with_child(Folder::new("/data/photos/2023").with_media_count(3))
            .with_child(
                Folder::new("/data/photos/2024")
                    .with_media_count(5)
                    .with_child(Folder::new("/data/photos/2024/summer").with_media_count(1)),
            )
    }

    fn text(model: &FolderModel, index: FolderIndex, role: FolderRole) -> String {
        match model.data(index, role) {
            Some(RoleValue::Text(value)) => value,
            other => panic!("unexpected value {other:?}"),
        }
    }

    #[test]
    fn test_resolve_path_ignores_separator_style() {
        let mut model = FolderModel::new();
        model.append_root(&Folder::new("C:\\"));
        model.append_root(&photos());

        let a = model.resolve_path("/data/photos/2024/summer").unwrap();
        let b = model.resolve_path("\\data\\photos\\2024\\summer\\").unwrap();
        let c = model.resolve_path("/data//photos/2024/summer/").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(text(&model, a, FolderRole::Name), "summer");

        assert!(model.resolve_path("/data/photos/2025").is_none());
        assert!(model.resolve_path("/data/photos/2024/summer/x").is_none());
        assert_eq!(model.resolve_path("C:/").unwrap().row(), 0);
    }

    #[test]
    fn test_replace_roots_is_idempotent() {
        let mut model = FolderModel::new();
        model.replace_roots(["/a", "/b/"]);
        let first: Vec<String> = (0..model.row_count(None))
            .map(|row| text(&model, model.index(row, None).unwrap(), FolderRole::Path))
            .collect();

        model.replace_roots(["/a", "/b/"]);
        let second: Vec<String> = (0..model.row_count(None))
            .map(|row| text(&model, model.index(row, None).unwrap(), FolderRole::Path))
            .collect();

        assert_eq!(model.row_count(None), 2);
        assert_eq!(first, second);
        assert_eq!(second, vec!["/a", "/b"]);
        assert_eq!(model.root_paths(), vec!["/a", "/b"]);
    }

    #[test]
    fn test_structural_brackets() {
        let events = Rc::new(RefCell::new(Vec::new()));
        let mut model = FolderModel::new();
        let sink = Rc::clone(&events);
        model.changed().connect(move |change| sink.borrow_mut().push(*change));

        model.replace_roots(["/a", "/b"]);
        model.append_root(&Folder::new("/c"));
        model.clear();

        assert_eq!(
            *events.borrow(),
            vec![
                Change::BeginReset,
                Change::EndReset,
                Change::BeginInsertRows { first: 2, last: 2 },
                Change::EndInsertRows,
                Change::BeginReset,
                Change::EndReset,
            ]
        );
        assert_eq!(model.row_count(None), 0);
    }

    #[test]
    fn test_append_root_deep_copies() {
        let mut model = FolderModel::new();
        let mut template = photos();
        let root = model.append_root(&template);

        template.push_child(Folder::new("/data/photos/2025"));
        drop(template);

        assert_eq!(model.row_count(Some(root)), 2);
        let year = model.index(1, Some(root)).unwrap();
        assert_eq!(text(&model, year, FolderRole::Name), "2024");
        assert_eq!(model.data(year, FolderRole::MediaCount), Some(RoleValue::Count(5)));
        assert_eq!(model.row_count(Some(year)), 1);
    }

    #[test]
    fn test_parent_row_lookup() {
        let mut model = FolderModel::new();
        model.append_root(&Folder::new("/other"));
        let root = model.append_root(&photos());

        let summer = model.resolve_path("/data/photos/2024/summer").unwrap();
        let year = model.parent(summer).unwrap();
        assert_eq!(year.row(), 1);
        assert_eq!(text(&model, year, FolderRole::Path), "/data/photos/2024");

        let top = model.parent(year).unwrap();
        assert_eq!(top, root);
        assert_eq!(top.row(), 1);
        assert!(model.parent(top).is_none());
    }

    #[test]
    fn test_stale_and_invalid_indexes() {
        let mut model = FolderModel::new();
        let root = model.append_root(&photos());
        assert!(model.index(5, None).is_none());
        assert!(model.index(9, Some(root)).is_none());

        model.replace_roots(["/elsewhere"]);
        assert!(!model.is_valid(root));
        assert_eq!(model.data(root, FolderRole::Name), None);
        assert_eq!(model.row_count(Some(root)), 0);
        assert!(model.parent(root).is_none());
    }

    #[test]
    fn test_folder_role_returns_handle() {
        let mut model = FolderModel::new();
        let root = model.append_root(&photos());
        assert_eq!(model.data(root, FolderRole::Folder), Some(RoleValue::Folder(root)));
        assert_eq!(model.column_count(None), 1);
        let names: Vec<&str> = FolderModel::role_names().into_iter().map(|(_, n)| n).collect();
        assert_eq!(names, vec!["name", "path", "mediaCount", "folder"]);
    }

    #[test]
    fn test_media_count_is_derived_lazily() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.jpg"), b"x").unwrap();
        fs::write(dir.path().join("b.nef"), b"x").unwrap();

        let mut model = FolderModel::new();
        model.replace_roots([dir.path().to_string_lossy()]);
        let root = model.index(0, None).unwrap();
        assert_eq!(model.data(root, FolderRole::MediaCount), Some(RoleValue::Count(2)));

        // memoized: later files are not picked up until the roots are rebuilt
        fs::write(dir.path().join("c.png"), b"x").unwrap();
        assert_eq!(model.data(root, FolderRole::MediaCount), Some(RoleValue::Count(2)));
    }
}
