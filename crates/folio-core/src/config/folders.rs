//! Folder engine configuration.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Tunables for folder listing, slugs, view tracking, and tree rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderConfig {
    /// Page size used when the caller does not ask for one.
    #[serde(default = "default_page_size")]
    pub default_page_size: u64,
    /// Upper bound on any requested page size.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u64,
    /// Maximum number of characters kept from the label when deriving a slug.
    #[serde(default = "default_slug_max_length")]
    pub slug_max_length: usize,
    /// Whether reads by an identified viewer record a view.
    #[serde(default = "default_true")]
    pub track_views: bool,
    /// Deepest level rendered by the folder tree.
    #[serde(default = "default_max_tree_depth")]
    pub max_tree_depth: u32,
}

impl FolderConfig {
    /// Validate the folder section.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.default_page_size == 0 {
            return Err(AppError::configuration(
                "folders.default_page_size must be positive",
            ));
        }
        if self.max_page_size < self.default_page_size {
            return Err(AppError::configuration(
                "folders.max_page_size must be >= folders.default_page_size",
            ));
        }
        if self.slug_max_length == 0 {
            return Err(AppError::configuration(
                "folders.slug_max_length must be positive",
            ));
        }
        Ok(())
    }
}

impl Default for FolderConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            slug_max_length: default_slug_max_length(),
            track_views: true,
            max_tree_depth: default_max_tree_depth(),
        }
    }
}

fn default_page_size() -> u64 {
    20
}

fn default_max_page_size() -> u64 {
    100
}

fn default_slug_max_length() -> usize {
    50
}

fn default_true() -> bool {
    true
}

fn default_max_tree_depth() -> u32 {
    16
}
