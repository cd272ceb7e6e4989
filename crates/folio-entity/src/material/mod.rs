//! Material references.
//!
//! Materials are owned by the material store. The folder engine only links
//! them by id and reads the summary columns it displays inside a folder.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use folio_core::types::MaterialId;

use crate::user::CreatorProfile;

/// Display summary of a material linked into a folder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialSummary {
    /// Material identifier.
    pub id: MaterialId,
    /// Material title.
    pub title: String,
    /// Optional description.
    pub description: Option<String>,
    /// Public profile of the material's creator.
    pub creator: Option<CreatorProfile>,
    /// When the material was created.
    pub created_at: DateTime<Utc>,
}
