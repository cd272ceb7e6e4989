//! Folder entity model.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidationError};

use folio_core::AppError;
use folio_core::types::{CourseId, FolderId, UserId};

/// Who may contribute materials to a folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "folder_visibility", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FolderVisibility {
    /// Anyone may add materials; only the owner may remove them.
    Public,
    /// Only the owner may change the folder's content.
    Private,
}

impl FolderVisibility {
    /// Return the visibility as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }
}

impl Default for FolderVisibility {
    fn default() -> Self {
        Self::Public
    }
}

impl fmt::Display for FolderVisibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FolderVisibility {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "public" => Ok(Self::Public),
            "private" => Ok(Self::Private),
            _ => Err(AppError::validation(format!(
                "Invalid visibility: '{s}'. Expected one of: public, private"
            ))),
        }
    }
}

/// A user-owned container of materials and other folders.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Folder {
    /// Unique folder identifier.
    pub id: FolderId,
    /// The owning user (null once the creator account is deleted).
    pub creator_id: Option<UserId>,
    /// Folder label.
    pub label: String,
    /// Unique URL-safe alternate identifier, fixed at creation.
    pub slug: String,
    /// Optional description.
    pub description: Option<String>,
    /// Contribution policy.
    pub visibility: FolderVisibility,
    /// Informational course association.
    pub target_course_id: Option<CourseId>,
    /// Like counter.
    pub likes: i32,
    /// View counter.
    pub views: i32,
    /// When the folder was last viewed by an identified user.
    pub last_viewed_at: Option<DateTime<Utc>>,
    /// When the folder was created.
    pub created_at: DateTime<Utc>,
    /// When the folder was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Folder {
    /// Whether `user_id` owns this folder.
    ///
    /// A folder whose creator was deleted has no owner.
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.creator_id == Some(user_id)
    }

    /// Whether `user_id` may add materials to this folder.
    pub fn accepts_contributions_from(&self, user_id: UserId) -> bool {
        self.is_owned_by(user_id) || self.visibility == FolderVisibility::Public
    }
}

/// Data required to create a new folder.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateFolder {
    /// The creating user.
    pub creator_id: UserId,
    /// Folder label.
    #[validate(
        length(max = 255, message = "Label must be at most 255 characters"),
        custom(function = "validate_label")
    )]
    pub label: String,
    /// Optional description.
    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: Option<String>,
    /// Contribution policy; public when unset.
    #[serde(default)]
    pub visibility: Option<FolderVisibility>,
    /// Informational course association.
    #[serde(default)]
    pub target_course_id: Option<CourseId>,
}

/// Partial update of a folder. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateFolder {
    /// New label. The slug is not re-derived.
    #[validate(
        length(max = 255, message = "Label must be at most 255 characters"),
        custom(function = "validate_label")
    )]
    pub label: Option<String>,
    /// New description; an empty string clears it.
    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: Option<String>,
    /// New contribution policy.
    pub visibility: Option<FolderVisibility>,
    /// New course association.
    pub target_course_id: Option<CourseId>,
}

impl UpdateFolder {
    /// Whether the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.label.is_none()
            && self.description.is_none()
            && self.visibility.is_none()
            && self.target_course_id.is_none()
    }

    /// Apply the patch to an in-memory folder.
    pub fn apply(&self, folder: &mut Folder) {
        if let Some(label) = &self.label {
            folder.label = label.trim().to_string();
        }
        if let Some(description) = &self.description {
            folder.description = normalize_description(description);
        }
        if let Some(visibility) = self.visibility {
            folder.visibility = visibility;
        }
        if let Some(course_id) = self.target_course_id {
            folder.target_course_id = Some(course_id);
        }
    }
}

/// Map an empty or blank description to `None`.
pub fn normalize_description(description: &str) -> Option<String> {
    let trimmed = description.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn validate_label(label: &str) -> Result<(), ValidationError> {
    if label.trim().is_empty() {
        let mut err = ValidationError::new("required");
        err.message = Some("Label is required".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(label: &str) -> CreateFolder {
        CreateFolder {
            creator_id: UserId::new(),
            label: label.to_string(),
            description: None,
            visibility: None,
            target_course_id: None,
        }
    }

    #[test]
    fn test_blank_label_rejected() {
        assert!(draft("   ").validate().is_err());
        assert!(draft("").validate().is_err());
        assert!(draft("Algorithms").validate().is_ok());
    }

    #[test]
    fn test_overlong_label_rejected() {
        assert!(draft(&"x".repeat(256)).validate().is_err());
    }

    #[test]
    fn test_visibility_parse() {
        assert_eq!("PUBLIC".parse::<FolderVisibility>().unwrap(), FolderVisibility::Public);
        assert!("shared".parse::<FolderVisibility>().is_err());
        assert_eq!(FolderVisibility::default(), FolderVisibility::Public);
    }

    #[test]
    fn test_normalize_description() {
        assert_eq!(normalize_description("  "), None);
        assert_eq!(normalize_description(" notes "), Some("notes".to_string()));
    }
}
