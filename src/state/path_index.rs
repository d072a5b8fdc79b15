//! Path normalization and hierarchy lookup
//!
//! Both models compare paths through this module so that `C:\Photos\`,
//! `C:/Photos` and `C://Photos/` all name the same folder.

/// The canonical separator used by every normalized path.
pub const SEPARATOR: char = '/';

/// Normalize a path string for comparison.
///
/// - Backslashes become forward slashes
/// - Repeated separators collapse into one
/// - `.` segments are dropped and `..` segments are resolved lexically
/// - Trailing separators are removed, except for the filesystem root `/`
pub fn normalize_path(path: &str) -> String {
    let unified = path.replace('\\', "/");
    let absolute = unified.starts_with(SEPARATOR);

    let mut segments: Vec<&str> = Vec::new();
    for segment in unified.split(SEPARATOR) {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.last().is_some_and(|last| *last != "..") {
                    segments.pop();
                } else if !absolute {
                    segments.push("..");
                }
            }
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    if absolute {
        format!("/{joined}")
    } else {
        joined
    }
}

/// Check whether two path strings name the same location once normalized.
pub fn paths_equal(a: &str, b: &str) -> bool {
    normalize_path(a) == normalize_path(b)
}

/// The last component of a path, used as a display name.
///
/// The filesystem root and bare drive names are their own display name.
pub fn display_name(path: &str) -> String {
    let normalized = normalize_path(path);
    match normalized.rsplit(SEPARATOR).next() {
        Some(last) if !last.is_empty() => last.to_string(),
        _ => normalized,
    }
}

/// Cumulative normalized prefixes of a path.
///
/// `/home/user/pics` yields `/`, `/home`, `/home/user`, `/home/user/pics`.
pub fn prefixes(path: &str) -> Vec<String> {
    let normalized = normalize_path(path);
    if normalized.is_empty() {
        return Vec::new();
    }

    let mut out = Vec::new();
    let mut current = String::new();
    if normalized.starts_with(SEPARATOR) {
        current.push(SEPARATOR);
        out.push(current.clone());
    }

    for segment in normalized.split(SEPARATOR).filter(|s| !s.is_empty()) {
        if !current.is_empty() && !current.ends_with(SEPARATOR) {
            current.push(SEPARATOR);
        }
        current.push_str(segment);
        out.push(current.clone());
    }

    out
}

/// A hierarchy whose nodes carry normalized paths.
pub trait PathTree {
    type Node: Copy;

    /// Children of `parent`, or the roots when `parent` is `None`.
    fn children_of(&self, parent: Option<Self::Node>) -> &[Self::Node];

    /// The normalized path of a node.
    fn path_of(&self, node: Self::Node) -> &str;
}

/// Resolve `path` to a node and its row among its siblings.
///
/// The path is walked one prefix at a time. Prefixes that match no root are
/// skipped until a root is entered, since a root may span several segments
/// (`/home/user`). Once inside a root, every further prefix must match a
/// child exactly or the lookup fails.
pub fn resolve<T: PathTree + ?Sized>(tree: &T, path: &str) -> Option<(usize, T::Node)> {
    let mut found: Option<(usize, T::Node)> = None;

    for prefix in prefixes(path) {
        let level = tree.children_of(found.map(|(_, node)| node));
        let hit = level
            .iter()
            .position(|&node| tree.path_of(node) == prefix);

        match (hit, found) {
            (Some(row), _) => found = Some((row, level[row])),
            (None, None) => continue,
            (None, Some(_)) => return None,
        }
    }

    found
}
