//! Folder store trait for pluggable persistence backends.

use std::collections::{HashSet, VecDeque};

use async_trait::async_trait;

use folio_core::result::AppResult;
use folio_core::types::{FolderId, MaterialId, UserId};
use folio_entity::folder::{
    CreateFolder, Folder, FolderContent, FolderDetail, FolderStats, FolderWithCounts, UpdateFolder,
};

/// Data access for folders and their content links.
///
/// Implementations do no authorization. Two exist: the PostgreSQL
/// [`FolderRepository`](crate::repositories::FolderRepository) and the
/// in-process [`MemoryFolderRepository`](crate::memory::MemoryFolderRepository).
#[async_trait]
pub trait FolderStore: Send + Sync + std::fmt::Debug + 'static {
    /// Persist a new folder, assigning its id and slug.
    async fn create(&self, draft: &CreateFolder) -> AppResult<Folder>;

    /// Find a bare folder row by id.
    async fn find_by_id(&self, id: FolderId) -> AppResult<Option<Folder>>;

    /// Find a bare folder row by slug.
    async fn find_by_slug(&self, slug: &str) -> AppResult<Option<Folder>>;

    /// Apply a patch to a folder and return the stored row.
    async fn update(&self, id: FolderId, patch: &UpdateFolder) -> AppResult<Folder>;

    /// Delete a folder and every link where it is parent or nested child.
    /// Returns `true` if a folder was deleted.
    async fn delete(&self, id: FolderId) -> AppResult<bool>;

    /// Folders owned by `owner`, most recently viewed first, with counts.
    async fn list_by_owner(
        &self,
        owner: UserId,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<FolderWithCounts>>;

    /// Public folders, newest first, with counts.
    async fn list_public(&self, limit: u64, offset: u64) -> AppResult<Vec<FolderWithCounts>>;

    /// A folder with one level of content, looked up by id.
    async fn get_by_id(&self, id: FolderId) -> AppResult<Option<FolderDetail>>;

    /// A folder with one level of content, looked up by slug.
    async fn get_by_slug(&self, slug: &str) -> AppResult<Option<FolderDetail>>;

    /// Case-insensitive substring search over label and description,
    /// ranked by likes, then views, then creation time.
    async fn search(&self, query: &str, limit: u64, offset: u64)
    -> AppResult<Vec<FolderWithCounts>>;

    /// The link placing `material_id` in `folder_id`, if any.
    async fn find_content_by_material(
        &self,
        folder_id: FolderId,
        material_id: MaterialId,
    ) -> AppResult<Option<FolderContent>>;

    /// Link a material into a folder.
    async fn add_material(
        &self,
        folder_id: FolderId,
        material_id: MaterialId,
    ) -> AppResult<FolderContent>;

    /// Unlink a material from a folder, returning the removed link.
    async fn remove_material(
        &self,
        folder_id: FolderId,
        material_id: MaterialId,
    ) -> AppResult<Option<FolderContent>>;

    /// The link nesting `child_id` inside `parent_id`, if any.
    async fn find_nested_link(
        &self,
        parent_id: FolderId,
        child_id: FolderId,
    ) -> AppResult<Option<FolderContent>>;

    /// Nest `child_id` inside `parent_id`.
    ///
    /// Implementations must re-check, atomically with the insert, that
    /// `parent_id` is not reachable from `child_id`, and fail with a
    /// validation error otherwise.
    async fn add_nested_folder(
        &self,
        parent_id: FolderId,
        child_id: FolderId,
    ) -> AppResult<FolderContent>;

    /// Remove the nesting of `child_id` inside `parent_id`, returning the
    /// removed link.
    async fn remove_nested_folder(
        &self,
        parent_id: FolderId,
        child_id: FolderId,
    ) -> AppResult<Option<FolderContent>>;

    /// Folders nested directly inside `folder_id`.
    async fn find_nested_children(&self, folder_id: FolderId) -> AppResult<Vec<Folder>>;

    /// Material and nested-folder counts of one folder.
    async fn get_folder_stats(&self, folder_id: FolderId) -> AppResult<FolderStats>;

    /// Record a view: stamp `last_viewed_at` and bump the view counter.
    async fn track_view(&self, folder_id: FolderId) -> AppResult<()>;

    /// Folders that directly contain `material_id`, each with one level
    /// of content.
    async fn find_folders_by_material(&self, material_id: MaterialId)
    -> AppResult<Vec<FolderDetail>>;

    /// Distinct ids of materials linked in any folder owned by `owner`.
    async fn material_ids_in_user_folders(&self, owner: UserId) -> AppResult<Vec<MaterialId>>;

    /// Every folder reachable from `folder_id` through nested-folder links,
    /// excluding `folder_id` itself unless a cycle leads back to it.
    ///
    /// Walks one level per query with an explicit worklist and a visited
    /// set, so it terminates on any graph and never grows the call stack.
    async fn get_all_nested_folders(&self, folder_id: FolderId) -> AppResult<Vec<Folder>> {
        let mut visited: HashSet<FolderId> = HashSet::new();
        let mut frontier: VecDeque<FolderId> = VecDeque::from([folder_id]);
        let mut descendants = Vec::new();

        while let Some(current) = frontier.pop_front() {
            for child in self.find_nested_children(current).await? {
                if visited.insert(child.id) {
                    frontier.push_back(child.id);
                    descendants.push(child);
                }
            }
        }

        Ok(descendants)
    }
}
