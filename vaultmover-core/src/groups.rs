//! Folder hierarchy resolution for exports that store folders by id.

use crate::entry::{Entry, GROUP};
use crate::{MigrationError, Result};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone)]
struct Folder {
    name: String,
    parent: String,
}

/// Folders keyed by id, each pointing at its parent id.
#[derive(Debug, Clone, Default)]
pub struct FolderTree {
    folders: HashMap<String, Folder>,
}

impl FolderTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, name: impl Into<String>, parent: impl Into<String>) {
        self.folders.insert(
            id.into(),
            Folder {
                name: name.into(),
                parent: parent.into(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.folders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }

    /// Full slash separated path of a folder id, root first.
    ///
    /// Unknown ids resolve to the empty path. A parent chain that loops back
    /// on itself is reported as [`MigrationError::CorruptGroupTree`].
    pub fn resolve(&self, id: &str) -> Result<String> {
        let mut segments = Vec::new();
        let mut visited = HashSet::new();
        let mut current = id;
        while let Some(folder) = self.folders.get(current) {
            if !visited.insert(current) {
                return Err(MigrationError::CorruptGroupTree(id.to_string()));
            }
            segments.push(folder.name.as_str());
            current = &folder.parent;
        }
        segments.reverse();
        Ok(segments.join("/"))
    }

    /// Replace the folder id held in each entry's `group` with its path.
    pub fn assign(&self, entries: &mut [Entry]) -> Result<()> {
        for entry in entries.iter_mut() {
            let id = entry.text(GROUP).unwrap_or_default().to_string();
            let path = self.resolve(&id)?;
            entry.set(GROUP, path);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_nested() {
        let mut tree = FolderTree::new();
        tree.insert("1", "Root", "");
        tree.insert("2", "Social", "1");
        tree.insert("3", "Friends", "2");
        assert_eq!(tree.resolve("3").unwrap(), "Root/Social/Friends");
        assert_eq!(tree.resolve("1").unwrap(), "Root");
        assert_eq!(tree.resolve("missing").unwrap(), "");
        assert_eq!(tree.resolve("").unwrap(), "");
    }

    #[test]
    fn test_cycle_is_an_error() {
        let mut tree = FolderTree::new();
        tree.insert("a", "A", "b");
        tree.insert("b", "B", "a");
        let err = tree.resolve("a").unwrap_err();
        assert!(matches!(err, MigrationError::CorruptGroupTree(id) if id == "a"));
    }

    #[test]
    fn test_self_parent_is_an_error() {
        let mut tree = FolderTree::new();
        tree.insert("x", "X", "x");
        assert!(tree.resolve("x").is_err());
    }

    #[test]
    fn test_assign_groups() {
        let mut tree = FolderTree::new();
        tree.insert("f1", "Emails", "");
        let mut entries = vec![
            [("title", "a"), ("group", "f1")].into_iter().collect::<Entry>(),
            [("title", "b")].into_iter().collect::<Entry>(),
        ];
        tree.assign(&mut entries).unwrap();
        assert_eq!(entries[0].text(GROUP), Some("Emails"));
        assert_eq!(entries[1].text(GROUP), Some(""));
    }
}
