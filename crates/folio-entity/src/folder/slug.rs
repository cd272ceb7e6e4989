//! Slug derivation for folders.

use folio_core::types::FolderId;

/// Label used when nothing alphanumeric survives sanitization.
const FALLBACK_SLUG: &str = "folder";

/// Derive the slug for a folder from its label and id.
///
/// The label is lower-cased, stripped of everything except ASCII
/// alphanumerics and whitespace, whitespace runs become a single `_`, the
/// result is cut to `max_len` characters, and the first eight hex digits of
/// the id are appended. The id suffix keeps slugs unique across folders with
/// the same label.
pub fn derive_slug(label: &str, id: FolderId, max_len: usize) -> String {
    let lowered = label.to_lowercase();
    let cleaned: String = lowered
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
        .collect();

    let mut base = cleaned.split_whitespace().collect::<Vec<_>>().join("_");
    if base.len() > max_len {
        base.truncate(max_len);
        while base.ends_with('_') {
            base.pop();
        }
    }
    if base.is_empty() {
        base.push_str(FALLBACK_SLUG);
    }

    format!("{base}_{}", id.short_hex())
}
