//! Public profile fields of a content creator.

use serde::{Deserialize, Serialize};

use folio_core::types::UserId;

/// The public subset of a user record, joined onto folders and materials
/// for display. Never carries credentials or contact details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatorProfile {
    /// User identifier.
    pub id: UserId,
    /// Login name.
    pub username: String,
    /// Human-readable display name.
    pub display_name: Option<String>,
    /// Avatar image URL.
    pub avatar_url: Option<String>,
}

impl CreatorProfile {
    /// Assemble a profile from the nullable columns of a LEFT JOIN.
    ///
    /// Returns `None` when the creator is unset or the user row is gone.
    pub fn from_join(
        id: Option<UserId>,
        username: Option<String>,
        display_name: Option<String>,
        avatar_url: Option<String>,
    ) -> Option<Self> {
        match (id, username) {
            (Some(id), Some(username)) => Some(Self {
                id,
                username,
                display_name,
                avatar_url,
            }),
            _ => None,
        }
    }

    /// The name to show for this creator.
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.username)
    }
}
