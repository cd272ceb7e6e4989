//! Read models assembled from folders, their content links, and creators.
//!
//! Counts in these types are always computed from `folder_contents` at read
//! time; no count is stored on the folder row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use folio_core::types::FolderContentId;

use super::model::Folder;
use crate::material::MaterialSummary;
use crate::user::CreatorProfile;

/// Material and nested-folder counts of one folder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderStats {
    /// Links with a material.
    pub material_count: i64,
    /// Links with a nested folder.
    pub nested_folder_count: i64,
}

/// A folder row annotated with its creator and aggregate counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderWithCounts {
    /// The folder itself.
    #[serde(flatten)]
    pub folder: Folder,
    /// Public profile of the folder's creator.
    pub creator: Option<CreatorProfile>,
    /// Links with a material.
    pub material_count: i64,
    /// Links with a nested folder.
    pub nested_folder_count: i64,
}

impl FolderWithCounts {
    /// The counts as a [`FolderStats`] value.
    pub fn stats(&self) -> FolderStats {
        FolderStats {
            material_count: self.material_count,
            nested_folder_count: self.nested_folder_count,
        }
    }
}

/// A material linked directly inside a folder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialEntry {
    /// The content link.
    pub link_id: FolderContentId,
    /// When the material was added.
    pub added_at: DateTime<Utc>,
    /// The linked material.
    pub material: MaterialSummary,
}

/// A folder linked directly inside another folder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NestedFolderEntry {
    /// The content link.
    pub link_id: FolderContentId,
    /// When the folder was nested.
    pub added_at: DateTime<Utc>,
    /// The nested folder.
    pub folder: Folder,
    /// Public profile of the nested folder's creator.
    pub creator: Option<CreatorProfile>,
    /// Materials directly inside the nested folder.
    pub material_count: i64,
}

/// A folder with one level of its content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderDetail {
    /// The folder itself.
    #[serde(flatten)]
    pub folder: Folder,
    /// Public profile of the folder's creator.
    pub creator: Option<CreatorProfile>,
    /// Materials directly inside the folder.
    pub materials: Vec<MaterialEntry>,
    /// Folders directly inside the folder.
    pub nested_folders: Vec<NestedFolderEntry>,
    /// Links with a material.
    pub material_count: i64,
    /// Links with a nested folder.
    pub nested_folder_count: i64,
}

impl FolderDetail {
    /// The counts as a [`FolderStats`] value.
    pub fn stats(&self) -> FolderStats {
        FolderStats {
            material_count: self.material_count,
            nested_folder_count: self.nested_folder_count,
        }
    }
}
