//! Folder tree structures for hierarchical display.

use serde::{Deserialize, Serialize};

use folio_core::types::FolderId;

/// A node in a folder tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderNode {
    /// Folder ID.
    pub id: FolderId,
    /// Folder label.
    pub label: String,
    /// Folder slug.
    pub slug: String,
    /// Depth below the tree root (0 for the root).
    pub depth: u32,
    /// Number of materials directly in this folder.
    pub material_count: i64,
    /// Number of folders directly in this folder.
    pub nested_folder_count: i64,
    /// Whether children were cut off by the depth limit.
    pub truncated: bool,
    /// Child folder nodes.
    pub children: Vec<FolderNode>,
}

impl FolderNode {
    /// Number of nodes in this subtree, including this one.
    pub fn size(&self) -> u64 {
        1 + self.children.iter().map(FolderNode::size).sum::<u64>()
    }
}

/// A folder tree rooted at a specific folder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderTree {
    /// The root node.
    pub root: FolderNode,
    /// Total number of folders in the tree.
    pub total_folders: u64,
}

impl FolderTree {
    /// Wrap a root node, counting its folders.
    pub fn new(root: FolderNode) -> Self {
        let total_folders = root.size();
        Self {
            root,
            total_folders,
        }
    }
}
