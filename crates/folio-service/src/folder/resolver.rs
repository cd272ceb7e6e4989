//! Classification of caller-supplied folder identifiers.

use std::fmt;

use uuid::Uuid;

use folio_core::types::FolderId;

/// Group lengths of the canonical hyphenated UUID text form.
const UUID_GROUPS: [usize; 5] = [8, 4, 4, 4, 12];

/// A folder reference as typed by a caller: an opaque id or a slug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderIdentifier {
    /// Canonical `8-4-4-4-12` hex id.
    Id(FolderId),
    /// Anything else is treated as a slug.
    Slug(String),
}

impl FolderIdentifier {
    /// Classify `raw` without touching storage.
    ///
    /// Only the canonical hyphenated form (any letter case) counts as an id.
    /// Braced, URN, or unhyphenated UUID spellings fall through to slug
    /// lookup and will simply not match.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if has_uuid_shape(raw) {
            if let Ok(uuid) = Uuid::parse_str(raw) {
                return Self::Id(FolderId::from_uuid(uuid));
            }
        }
        Self::Slug(raw.to_string())
    }
}

impl fmt::Display for FolderIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Slug(slug) => write!(f, "{slug}"),
        }
    }
}

fn has_uuid_shape(raw: &str) -> bool {
    let groups: Vec<&str> = raw.split('-').collect();
    groups.len() == UUID_GROUPS.len()
        && groups
            .iter()
            .zip(UUID_GROUPS)
            .all(|(group, len)| group.len() == len && group.bytes().all(|b| b.is_ascii_hexdigit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_uuid_is_id() {
        let parsed = FolderIdentifier::parse("123e4567-e89b-12d3-a456-426614174000");
        let expected = Uuid::parse_str("123e4567-e89b-12d3-a456-426614174000").unwrap();
        assert_eq!(parsed, FolderIdentifier::Id(FolderId::from_uuid(expected)));
    }

    #[test]
    fn test_uppercase_uuid_is_id() {
        let parsed = FolderIdentifier::parse("123E4567-E89B-12D3-A456-426614174000");
        assert!(matches!(parsed, FolderIdentifier::Id(_)));
    }

    #[test]
    fn test_slug_is_slug() {
        assert_eq!(
            FolderIdentifier::parse("data_structures_1a2b3c4d"),
            FolderIdentifier::Slug("data_structures_1a2b3c4d".to_string())
        );
    }

    #[test]
    fn test_non_canonical_uuid_spellings_are_slugs() {
        for raw in [
            "123e4567e89b12d3a456426614174000",
            "{123e4567-e89b-12d3-a456-426614174000}",
            "urn:uuid:123e4567-e89b-12d3-a456-426614174000",
            "123e4567-e89b-12d3-a456-42661417400g",
            "123e4567-e89b-12d3-a456-4266141740000",
        ] {
            assert!(
                matches!(FolderIdentifier::parse(raw), FolderIdentifier::Slug(_)),
                "{raw} should be a slug"
            );
        }
    }
}
