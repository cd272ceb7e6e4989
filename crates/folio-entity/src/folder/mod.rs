//! Folder domain entities.

pub mod content;
pub mod model;
pub mod slug;
pub mod tree;
pub mod views;

pub use content::{ContentItem, FolderContent, FolderContentRow};
pub use model::{CreateFolder, Folder, FolderVisibility, UpdateFolder};
pub use slug::derive_slug;
pub use tree::{FolderNode, FolderTree};
pub use views::{FolderDetail, FolderStats, FolderWithCounts, MaterialEntry, NestedFolderEntry};
