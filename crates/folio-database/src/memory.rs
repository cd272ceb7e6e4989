//! In-memory folder store.
//!
//! Mirrors the PostgreSQL repository's semantics (orderings, cascades,
//! uniqueness, and the atomic cycle re-check) over plain maps behind one
//! async lock. Service tests run against it.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use folio_core::config::FolderConfig;
use folio_core::error::AppError;
use folio_core::result::AppResult;
use folio_core::types::{FolderContentId, FolderId, MaterialId, UserId};
use folio_entity::folder::model::normalize_description;
use folio_entity::folder::{
    ContentItem, CreateFolder, Folder, FolderContent, FolderDetail, FolderStats,
    FolderVisibility, FolderWithCounts, MaterialEntry, NestedFolderEntry, UpdateFolder,
    derive_slug,
};
use folio_entity::material::MaterialSummary;
use folio_entity::user::CreatorProfile;

use crate::store::FolderStore;

#[derive(Debug, Clone)]
struct MaterialRecord {
    title: String,
    description: Option<String>,
    creator_id: Option<UserId>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct MemoryState {
    users: HashMap<UserId, CreatorProfile>,
    materials: HashMap<MaterialId, MaterialRecord>,
    folders: HashMap<FolderId, Folder>,
    contents: Vec<FolderContent>,
}

impl MemoryState {
    fn creator(&self, id: Option<UserId>) -> Option<CreatorProfile> {
        id.and_then(|id| self.users.get(&id).cloned())
    }

    fn stats(&self, folder_id: FolderId) -> FolderStats {
        self.contents
            .iter()
            .filter(|c| c.folder_id == folder_id)
            .fold(FolderStats::default(), |mut stats, c| {
                match c.item {
                    ContentItem::Material(_) => stats.material_count += 1,
                    ContentItem::NestedFolder(_) => stats.nested_folder_count += 1,
                }
                stats
            })
    }

    fn with_counts(&self, folder: &Folder) -> FolderWithCounts {
        let stats = self.stats(folder.id);
        FolderWithCounts {
            folder: folder.clone(),
            creator: self.creator(folder.creator_id),
            material_count: stats.material_count,
            nested_folder_count: stats.nested_folder_count,
        }
    }

    fn link(&self, folder_id: FolderId, item: ContentItem) -> Option<&FolderContent> {
        self.contents
            .iter()
            .find(|c| c.folder_id == folder_id && c.item == item)
    }

    fn unlink(&mut self, folder_id: FolderId, item: ContentItem) -> Option<FolderContent> {
        let pos = self
            .contents
            .iter()
            .position(|c| c.folder_id == folder_id && c.item == item)?;
        Some(self.contents.remove(pos))
    }

    fn children(&self, folder_id: FolderId) -> impl Iterator<Item = &FolderContent> {
        self.contents.iter().filter(move |c| c.folder_id == folder_id)
    }

    /// Whether `target` is reachable from `start`, counting `start` itself.
    fn reaches(&self, start: FolderId, target: FolderId) -> bool {
        let mut visited = HashSet::from([start]);
        let mut frontier = VecDeque::from([start]);
        while let Some(current) = frontier.pop_front() {
            if current == target {
                return true;
            }
            for link in self.children(current) {
                if let ContentItem::NestedFolder(child) = link.item {
                    if visited.insert(child) {
                        frontier.push_back(child);
                    }
                }
            }
        }
        false
    }

    fn detail(&self, folder: &Folder) -> FolderDetail {
        let mut materials = Vec::new();
        let mut nested_folders = Vec::new();

        for link in self.children(folder.id) {
            match link.item {
                ContentItem::Material(material_id) => {
                    if let Some(record) = self.materials.get(&material_id) {
                        materials.push(MaterialEntry {
                            link_id: link.id,
                            added_at: link.created_at,
                            material: MaterialSummary {
                                id: material_id,
                                title: record.title.clone(),
                                description: record.description.clone(),
                                creator: self.creator(record.creator_id),
                                created_at: record.created_at,
                            },
                        });
                    }
                }
                ContentItem::NestedFolder(child_id) => {
                    if let Some(child) = self.folders.get(&child_id) {
                        nested_folders.push(NestedFolderEntry {
                            link_id: link.id,
                            added_at: link.created_at,
                            folder: child.clone(),
                            creator: self.creator(child.creator_id),
                            material_count: self.stats(child_id).material_count,
                        });
                    }
                }
            }
        }

        let stats = self.stats(folder.id);
        FolderDetail {
            folder: folder.clone(),
            creator: self.creator(folder.creator_id),
            materials,
            nested_folders,
            material_count: stats.material_count,
            nested_folder_count: stats.nested_folder_count,
        }
    }
}

/// Folder store kept entirely in process memory.
#[derive(Debug)]
pub struct MemoryFolderRepository {
    state: RwLock<MemoryState>,
    slug_max_length: usize,
    fail_view_tracking: AtomicBool,
}

impl MemoryFolderRepository {
    /// Create an empty store.
    pub fn new(config: &FolderConfig) -> Self {
        Self {
            state: RwLock::new(MemoryState::default()),
            slug_max_length: config.slug_max_length,
            fail_view_tracking: AtomicBool::new(false),
        }
    }

    /// Register a user profile, standing in for the identity provider's table.
    pub async fn insert_user(&self, profile: CreatorProfile) {
        self.state.write().await.users.insert(profile.id, profile);
    }

    /// Register a material, standing in for the material store's table.
    pub async fn insert_material(
        &self,
        title: impl Into<String>,
        description: Option<String>,
        creator_id: Option<UserId>,
    ) -> MaterialId {
        let id = MaterialId::new();
        let record = MaterialRecord {
            title: title.into(),
            description,
            creator_id,
            created_at: Utc::now(),
        };
        self.state.write().await.materials.insert(id, record);
        id
    }

    /// Make every subsequent [`FolderStore::track_view`] call fail, as an
    /// unreachable database would.
    pub fn set_view_tracking_failure(&self, fail: bool) {
        self.fail_view_tracking.store(fail, AtomicOrdering::SeqCst);
    }

    /// Overwrite a folder's like counter.
    pub async fn set_likes(&self, folder_id: FolderId, likes: i32) -> AppResult<()> {
        let mut state = self.state.write().await;
        let folder = state
            .folders
            .get_mut(&folder_id)
            .ok_or_else(|| AppError::not_found(format!("Folder {folder_id} not found")))?;
        folder.likes = likes;
        Ok(())
    }

    /// Total number of content links, across all folders.
    pub async fn link_count(&self) -> usize {
        self.state.read().await.contents.len()
    }

    fn page<T>(items: Vec<T>, limit: u64, offset: u64) -> Vec<T> {
        items
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .collect()
    }
}

fn newest_first(a: &Folder, b: &Folder) -> Ordering {
    b.created_at.cmp(&a.created_at).then_with(|| b.id.0.cmp(&a.id.0))
}

#[async_trait]
impl FolderStore for MemoryFolderRepository {
    async fn create(&self, draft: &CreateFolder) -> AppResult<Folder> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&draft.creator_id) {
            return Err(AppError::not_found(format!("User {} not found", draft.creator_id)));
        }

        let id = FolderId::new();
        let label = draft.label.trim().to_string();
        let slug = derive_slug(&label, id, self.slug_max_length);
        if state.folders.values().any(|f| f.slug == slug) {
            return Err(AppError::conflict(format!("Folder slug '{slug}' already exists")));
        }

        let now = Utc::now();
        let folder = Folder {
            id,
            creator_id: Some(draft.creator_id),
            label,
            slug,
            description: draft.description.as_deref().and_then(normalize_description),
            visibility: draft.visibility.unwrap_or_default(),
            target_course_id: draft.target_course_id,
            likes: 0,
            views: 0,
            last_viewed_at: None,
            created_at: now,
            updated_at: now,
        };
        state.folders.insert(id, folder.clone());
        Ok(folder)
    }

    async fn find_by_id(&self, id: FolderId) -> AppResult<Option<Folder>> {
        Ok(self.state.read().await.folders.get(&id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> AppResult<Option<Folder>> {
        let state = self.state.read().await;
        Ok(state.folders.values().find(|f| f.slug == slug).cloned())
    }

    async fn update(&self, id: FolderId, patch: &UpdateFolder) -> AppResult<Folder> {
        let mut state = self.state.write().await;
        let folder = state
            .folders
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Folder {id} not found")))?;
        patch.apply(folder);
        folder.updated_at = Utc::now();
        Ok(folder.clone())
    }

    async fn delete(&self, id: FolderId) -> AppResult<bool> {
        let mut state = self.state.write().await;
        if state.folders.remove(&id).is_none() {
            return Ok(false);
        }
        state
            .contents
            .retain(|c| c.folder_id != id && c.item != ContentItem::NestedFolder(id));
        Ok(true)
    }

    async fn list_by_owner(
        &self,
        owner: UserId,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<FolderWithCounts>> {
        let state = self.state.read().await;
        let mut folders: Vec<&Folder> = state
            .folders
            .values()
            .filter(|f| f.creator_id == Some(owner))
            .collect();
        // Option orders None first, so comparing b to a puts unviewed folders last.
        folders.sort_by(|a, b| {
            b.last_viewed_at
                .cmp(&a.last_viewed_at)
                .then_with(|| newest_first(a, b))
        });
        let rows = folders.into_iter().map(|f| state.with_counts(f)).collect();
        Ok(Self::page(rows, limit, offset))
    }

    async fn list_public(&self, limit: u64, offset: u64) -> AppResult<Vec<FolderWithCounts>> {
        let state = self.state.read().await;
        let mut folders: Vec<&Folder> = state
            .folders
            .values()
            .filter(|f| f.visibility == FolderVisibility::Public)
            .collect();
        folders.sort_by(|a, b| newest_first(a, b));
        let rows = folders.into_iter().map(|f| state.with_counts(f)).collect();
        Ok(Self::page(rows, limit, offset))
    }

    async fn get_by_id(&self, id: FolderId) -> AppResult<Option<FolderDetail>> {
        let state = self.state.read().await;
        Ok(state.folders.get(&id).map(|f| state.detail(f)))
    }

    async fn get_by_slug(&self, slug: &str) -> AppResult<Option<FolderDetail>> {
        let state = self.state.read().await;
        Ok(state
            .folders
            .values()
            .find(|f| f.slug == slug)
            .map(|f| state.detail(f)))
    }

    async fn search(
        &self,
        query: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<FolderWithCounts>> {
        let needle = query.trim().to_lowercase();
        let state = self.state.read().await;
        let mut folders: Vec<&Folder> = state
            .folders
            .values()
            .filter(|f| {
                f.label.to_lowercase().contains(&needle)
                    || f
                        .description
                        .as_ref()
                        .is_some_and(|d| d.to_lowercase().contains(&needle))
            })
            .collect();
        folders.sort_by(|a, b| {
            b.likes
                .cmp(&a.likes)
                .then_with(|| b.views.cmp(&a.views))
                .then_with(|| newest_first(a, b))
        });
        let rows = folders.into_iter().map(|f| state.with_counts(f)).collect();
        Ok(Self::page(rows, limit, offset))
    }

    async fn find_content_by_material(
        &self,
        folder_id: FolderId,
        material_id: MaterialId,
    ) -> AppResult<Option<FolderContent>> {
        let state = self.state.read().await;
        Ok(state
            .link(folder_id, ContentItem::Material(material_id))
            .cloned())
    }

    async fn add_material(
        &self,
        folder_id: FolderId,
        material_id: MaterialId,
    ) -> AppResult<FolderContent> {
        let mut state = self.state.write().await;
        if !state.folders.contains_key(&folder_id) {
            return Err(AppError::not_found(format!("Folder {folder_id} not found")));
        }
        if !state.materials.contains_key(&material_id) {
            return Err(AppError::not_found(format!("Material {material_id} not found")));
        }
        let item = ContentItem::Material(material_id);
        if state.link(folder_id, item).is_some() {
            return Err(AppError::conflict("Material is already in this folder"));
        }

        let content = FolderContent {
            id: FolderContentId::new(),
            folder_id,
            item,
            created_at: Utc::now(),
        };
        state.contents.push(content.clone());
        Ok(content)
    }

    async fn remove_material(
        &self,
        folder_id: FolderId,
        material_id: MaterialId,
    ) -> AppResult<Option<FolderContent>> {
        let mut state = self.state.write().await;
        Ok(state.unlink(folder_id, ContentItem::Material(material_id)))
    }

    async fn find_nested_link(
        &self,
        parent_id: FolderId,
        child_id: FolderId,
    ) -> AppResult<Option<FolderContent>> {
        let state = self.state.read().await;
        Ok(state
            .link(parent_id, ContentItem::NestedFolder(child_id))
            .cloned())
    }

    async fn add_nested_folder(
        &self,
        parent_id: FolderId,
        child_id: FolderId,
    ) -> AppResult<FolderContent> {
        // The write lock spans check and insert, so no other link can land
        // in between.
        let mut state = self.state.write().await;
        for id in [parent_id, child_id] {
            if !state.folders.contains_key(&id) {
                return Err(AppError::not_found(format!("Folder {id} not found")));
            }
        }
        if state.reaches(child_id, parent_id) {
            return Err(AppError::validation("Circular nesting not allowed"));
        }
        let item = ContentItem::NestedFolder(child_id);
        if state.link(parent_id, item).is_some() {
            return Err(AppError::conflict("Folder is already nested in this folder"));
        }

        let content = FolderContent {
            id: FolderContentId::new(),
            folder_id: parent_id,
            item,
            created_at: Utc::now(),
        };
        state.contents.push(content.clone());
        Ok(content)
    }

    async fn remove_nested_folder(
        &self,
        parent_id: FolderId,
        child_id: FolderId,
    ) -> AppResult<Option<FolderContent>> {
        let mut state = self.state.write().await;
        Ok(state.unlink(parent_id, ContentItem::NestedFolder(child_id)))
    }

    async fn find_nested_children(&self, folder_id: FolderId) -> AppResult<Vec<Folder>> {
        let state = self.state.read().await;
        Ok(state
            .children(folder_id)
            .filter_map(|c| c.item.folder_id())
            .filter_map(|id| state.folders.get(&id).cloned())
            .collect())
    }

    async fn get_folder_stats(&self, folder_id: FolderId) -> AppResult<FolderStats> {
        Ok(self.state.read().await.stats(folder_id))
    }

    async fn track_view(&self, folder_id: FolderId) -> AppResult<()> {
        if self.fail_view_tracking.load(AtomicOrdering::SeqCst) {
            return Err(AppError::service_unavailable("View tracking store unavailable"));
        }
        let mut state = self.state.write().await;
        if let Some(folder) = state.folders.get_mut(&folder_id) {
            folder.last_viewed_at = Some(Utc::now());
            folder.views += 1;
        }
        Ok(())
    }

    async fn find_folders_by_material(
        &self,
        material_id: MaterialId,
    ) -> AppResult<Vec<FolderDetail>> {
        let state = self.state.read().await;
        let item = ContentItem::Material(material_id);
        let mut folders: Vec<&Folder> = state
            .folders
            .values()
            .filter(|f| state.link(f.id, item).is_some())
            .collect();
        folders.sort_by(|a, b| newest_first(a, b));
        Ok(folders.into_iter().map(|f| state.detail(f)).collect())
    }

    async fn material_ids_in_user_folders(&self, owner: UserId) -> AppResult<Vec<MaterialId>> {
        let state = self.state.read().await;
        let mut seen = HashSet::new();
        Ok(state
            .contents
            .iter()
            .filter(|c| {
                state
                    .folders
                    .get(&c.folder_id)
                    .is_some_and(|f| f.creator_id == Some(owner))
            })
            .filter_map(|c| c.item.material_id())
            .filter(|id| seen.insert(*id))
            .collect())
    }
}
