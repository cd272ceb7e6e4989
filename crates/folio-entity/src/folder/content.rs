//! Folder content links: the edges of the containment graph.
//!
//! A link points from a parent folder to exactly one item, either a
//! material or a nested folder. The storage row keeps two nullable columns;
//! [`ContentItem`] is the only shape the rest of the crate sees.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use folio_core::AppError;
use folio_core::types::{FolderContentId, FolderId, MaterialId};

/// The item a content link points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum ContentItem {
    /// A material owned by the material store.
    Material(MaterialId),
    /// Another folder, nested inside the parent.
    NestedFolder(FolderId),
}

impl ContentItem {
    /// The material id, if this is a material link.
    pub fn material_id(&self) -> Option<MaterialId> {
        match self {
            Self::Material(id) => Some(*id),
            Self::NestedFolder(_) => None,
        }
    }

    /// The child folder id, if this is a nested-folder link.
    pub fn folder_id(&self) -> Option<FolderId> {
        match self {
            Self::Material(_) => None,
            Self::NestedFolder(id) => Some(*id),
        }
    }
}

/// One content link of a folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderContent {
    /// Link identifier.
    pub id: FolderContentId,
    /// The containing folder.
    pub folder_id: FolderId,
    /// What the folder contains.
    pub item: ContentItem,
    /// When the link was created.
    pub created_at: DateTime<Utc>,
}

/// Raw `folder_contents` row.
#[derive(Debug, Clone, FromRow)]
pub struct FolderContentRow {
    /// Link identifier.
    pub id: FolderContentId,
    /// The containing folder.
    pub folder_id: FolderId,
    /// Linked material, if any.
    pub content_material_id: Option<MaterialId>,
    /// Linked child folder, if any.
    pub content_folder_id: Option<FolderId>,
    /// When the link was created.
    pub created_at: DateTime<Utc>,
}

impl TryFrom<FolderContentRow> for FolderContent {
    type Error = AppError;

    fn try_from(row: FolderContentRow) -> Result<Self, Self::Error> {
        let item = match (row.content_material_id, row.content_folder_id) {
            (Some(material_id), None) => ContentItem::Material(material_id),
            (None, Some(folder_id)) => ContentItem::NestedFolder(folder_id),
            _ => {
                return Err(AppError::internal(format!(
                    "Folder content {} must reference exactly one of material or folder",
                    row.id
                )));
            }
        };
        Ok(Self {
            id: row.id,
            folder_id: row.folder_id,
            item,
            created_at: row.created_at,
        })
    }
}
