//! Folder operations with ownership, visibility, and nesting rules.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use tokio_util::task::TaskTracker;
use validator::Validate;

use folio_core::config::FolderConfig;
use folio_core::error::AppError;
use folio_core::types::{CourseId, FolderId, MaterialId, PageRequest, PageResponse, UserId};
use folio_database::FolderStore;
use folio_entity::folder::{
    CreateFolder, Folder, FolderContent, FolderDetail, FolderStats, FolderVisibility,
    FolderWithCounts, UpdateFolder,
};

use super::resolver::FolderIdentifier;
use crate::context::RequestContext;

/// Manages folders and the content links between them.
#[derive(Debug, Clone)]
pub struct FolderService {
    /// Folder store.
    store: Arc<dyn FolderStore>,
    /// Folder engine settings.
    config: FolderConfig,
    /// Background view writes that have not finished yet.
    view_writes: TaskTracker,
}

/// Request to create a new folder. The creator is taken from the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateFolderRequest {
    /// Folder label.
    pub label: String,
    /// Optional description.
    pub description: Option<String>,
    /// Contribution policy; public when unset.
    pub visibility: Option<FolderVisibility>,
    /// Informational course association.
    pub target_course_id: Option<CourseId>,
}

impl FolderService {
    /// Creates a new folder service.
    pub fn new(store: Arc<dyn FolderStore>, config: FolderConfig) -> Self {
        Self {
            store,
            config,
            view_writes: TaskTracker::new(),
        }
    }

    /// Build a page request bounded by the configured page size limits.
    pub fn page_request(&self, page: u64, page_size: Option<u64>) -> PageRequest {
        PageRequest::bounded(
            page,
            page_size.unwrap_or(self.config.default_page_size),
            self.config.max_page_size,
        )
    }

    /// Creates a folder owned by the caller.
    pub async fn create(
        &self,
        ctx: &RequestContext,
        req: CreateFolderRequest,
    ) -> Result<Folder, AppError> {
        let draft = CreateFolder {
            creator_id: ctx.user_id,
            label: req.label,
            description: req.description,
            visibility: Some(req.visibility.unwrap_or_default()),
            target_course_id: req.target_course_id,
        };
        draft.validate()?;

        let folder = self.store.create(&draft).await?;

        info!(
            user_id = %ctx.user_id,
            folder_id = %folder.id,
            slug = %folder.slug,
            visibility = %folder.visibility,
            "Folder created"
        );

        Ok(folder)
    }

    /// Gets a folder with one level of content by id or slug.
    ///
    /// When a viewer is given, a view is recorded in the background. The
    /// read never waits on that write, and a failed write is only logged.
    pub async fn get(
        &self,
        id_or_slug: &str,
        viewer: Option<&RequestContext>,
    ) -> Result<FolderDetail, AppError> {
        let identifier = FolderIdentifier::parse(id_or_slug);
        debug!(identifier = %identifier, "Resolving folder");

        let detail = self
            .find_detail(&identifier)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Folder '{identifier}' not found")))?;

        if let Some(viewer) = viewer {
            if self.config.track_views {
                self.spawn_track_view(detail.folder.id, viewer.user_id);
            }
        }

        Ok(detail)
    }

    /// Resolves an id or slug to the bare folder row, without loading its
    /// content or recording a view.
    pub async fn resolve(&self, id_or_slug: &str) -> Result<Folder, AppError> {
        let identifier = FolderIdentifier::parse(id_or_slug);
        match &identifier {
            FolderIdentifier::Id(id) => self.store.find_by_id(*id).await?,
            FolderIdentifier::Slug(slug) => self.store.find_by_slug(slug).await?,
        }
        .ok_or_else(|| AppError::not_found(format!("Folder '{identifier}' not found")))
    }

    /// Updates a folder owned by the caller.
    pub async fn update(
        &self,
        ctx: &RequestContext,
        folder_id: FolderId,
        patch: UpdateFolder,
    ) -> Result<Folder, AppError> {
        let folder = self.load_owned(ctx, folder_id, "update").await?;
        patch.validate()?;

        if patch.is_empty() {
            return Ok(folder);
        }

        let folder = self.store.update(folder_id, &patch).await?;

        info!(user_id = %ctx.user_id, folder_id = %folder_id, "Folder updated");
        Ok(folder)
    }

    /// Deletes a folder owned by the caller.
    ///
    /// Links into and out of the folder are removed with it. Folders nested
    /// inside it are not deleted.
    pub async fn remove(&self, ctx: &RequestContext, folder_id: FolderId) -> Result<(), AppError> {
        let folder = self.load_owned(ctx, folder_id, "delete").await?;

        if !self.store.delete(folder_id).await? {
            return Err(AppError::not_found(format!("Folder {folder_id} not found")));
        }

        info!(
            user_id = %ctx.user_id,
            folder_id = %folder_id,
            slug = %folder.slug,
            "Folder deleted"
        );
        Ok(())
    }

    /// Links a material into a folder.
    ///
    /// The owner may always add. Anyone may add to a public folder.
    pub async fn add_material_to_folder(
        &self,
        ctx: &RequestContext,
        folder_id: FolderId,
        material_id: MaterialId,
    ) -> Result<FolderContent, AppError> {
        let folder = self.load(folder_id).await?;

        if !folder.accepts_contributions_from(ctx.user_id) {
            warn!(
                user_id = %ctx.user_id,
                folder_id = %folder_id,
                "Material contribution to private folder denied"
            );
            return Err(AppError::authorization(
                "Only the owner can add materials to a private folder",
            ));
        }

        if self
            .store
            .find_content_by_material(folder_id, material_id)
            .await?
            .is_some()
        {
            return Err(AppError::conflict("Material is already in this folder"));
        }

        let link = self.store.add_material(folder_id, material_id).await?;

        info!(
            user_id = %ctx.user_id,
            folder_id = %folder_id,
            material_id = %material_id,
            "Material added to folder"
        );
        Ok(link)
    }

    /// Unlinks a material from a folder. Only the owner may remove content,
    /// public folders included.
    pub async fn remove_material_from_folder(
        &self,
        ctx: &RequestContext,
        folder_id: FolderId,
        material_id: MaterialId,
    ) -> Result<FolderContent, AppError> {
        self.load_owned(ctx, folder_id, "remove material").await?;

        let link = self
            .store
            .remove_material(folder_id, material_id)
            .await?
            .ok_or_else(|| AppError::not_found("Material is not in this folder"))?;

        info!(
            user_id = %ctx.user_id,
            folder_id = %folder_id,
            material_id = %material_id,
            "Material removed from folder"
        );
        Ok(link)
    }

    /// Nests `child_id` inside `parent_id`.
    ///
    /// The caller must own the parent. The child only has to exist. The link
    /// is refused if the parent is the child or is already nested anywhere
    /// below it.
    pub async fn add_nested_folder(
        &self,
        ctx: &RequestContext,
        parent_id: FolderId,
        child_id: FolderId,
    ) -> Result<FolderContent, AppError> {
        self.load_owned(ctx, parent_id, "nest folder").await?;
        self.load(child_id).await?;

        if parent_id == child_id {
            return Err(AppError::validation("Circular nesting not allowed"));
        }

        let descendants = self.store.get_all_nested_folders(child_id).await?;
        if descendants.iter().any(|f| f.id == parent_id) {
            warn!(
                user_id = %ctx.user_id,
                parent_id = %parent_id,
                child_id = %child_id,
                "Nesting rejected: would create a cycle"
            );
            return Err(AppError::validation("Circular nesting not allowed"));
        }

        if self
            .store
            .find_nested_link(parent_id, child_id)
            .await?
            .is_some()
        {
            return Err(AppError::conflict("Folder is already nested in this folder"));
        }

        // The store repeats the reachability check atomically with the insert.
        let link = self.store.add_nested_folder(parent_id, child_id).await?;

        info!(
            user_id = %ctx.user_id,
            parent_id = %parent_id,
            child_id = %child_id,
            "Folder nested"
        );
        Ok(link)
    }

    /// Removes the nesting of `child_id` inside `parent_id`.
    pub async fn remove_nested_folder(
        &self,
        ctx: &RequestContext,
        parent_id: FolderId,
        child_id: FolderId,
    ) -> Result<FolderContent, AppError> {
        self.load_owned(ctx, parent_id, "unnest folder").await?;

        let link = self
            .store
            .remove_nested_folder(parent_id, child_id)
            .await?
            .ok_or_else(|| AppError::not_found("Folder is not nested in this folder"))?;

        info!(
            user_id = %ctx.user_id,
            parent_id = %parent_id,
            child_id = %child_id,
            "Folder unnested"
        );
        Ok(link)
    }

    /// Lists folders created by `creator_id`, most recently viewed first.
    pub async fn find_by_creator(
        &self,
        creator_id: UserId,
        page: PageRequest,
    ) -> Result<PageResponse<FolderWithCounts>, AppError> {
        let page = self.bound(page);
        let rows = self
            .store
            .list_by_owner(creator_id, page.overfetch_limit(), page.offset())
            .await?;
        Ok(PageResponse::from_overfetched(rows, &page))
    }

    /// Lists public folders, newest first.
    pub async fn find_all_paginated(
        &self,
        page: PageRequest,
    ) -> Result<PageResponse<FolderWithCounts>, AppError> {
        let page = self.bound(page);
        let rows = self
            .store
            .list_public(page.overfetch_limit(), page.offset())
            .await?;
        Ok(PageResponse::from_overfetched(rows, &page))
    }

    /// Searches folder labels and descriptions, most popular first.
    pub async fn search_folders(
        &self,
        query: &str,
        page: PageRequest,
    ) -> Result<PageResponse<FolderWithCounts>, AppError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::validation("Search query cannot be empty"));
        }

        let page = self.bound(page);
        let rows = self
            .store
            .search(query, page.overfetch_limit(), page.offset())
            .await?;
        debug!(query = %query, returned = rows.len(), "Folder search");
        Ok(PageResponse::from_overfetched(rows, &page))
    }

    /// Folders that directly contain `material_id`.
    pub async fn get_folders_by_material(
        &self,
        material_id: MaterialId,
    ) -> Result<Vec<FolderDetail>, AppError> {
        self.store.find_folders_by_material(material_id).await
    }

    /// Material and nested-folder counts of one folder.
    pub async fn get_folder_stats(&self, folder_id: FolderId) -> Result<FolderStats, AppError> {
        self.load(folder_id).await?;
        self.store.get_folder_stats(folder_id).await
    }

    /// Distinct materials linked anywhere in the folders `user_id` owns.
    pub async fn get_material_ids_in_user_folders(
        &self,
        user_id: UserId,
    ) -> Result<Vec<MaterialId>, AppError> {
        self.store.material_ids_in_user_folders(user_id).await
    }

    /// Look up a detail view without recording a view.
    pub(crate) async fn find_detail(
        &self,
        identifier: &FolderIdentifier,
    ) -> Result<Option<FolderDetail>, AppError> {
        match identifier {
            FolderIdentifier::Id(id) => self.store.get_by_id(*id).await,
            FolderIdentifier::Slug(slug) => self.store.get_by_slug(slug).await,
        }
    }

    fn spawn_track_view(&self, folder_id: FolderId, viewer_id: UserId) {
        let store = Arc::clone(&self.store);
        self.view_writes.spawn(async move {
            if let Err(e) = store.track_view(folder_id).await {
                warn!(
                    folder_id = %folder_id,
                    viewer_id = %viewer_id,
                    error = %e,
                    "Failed to record folder view"
                );
            }
        });
    }

    /// Wait up to `grace` for background view writes to finish.
    ///
    /// Short-lived callers run this before closing the store so recorded
    /// views are not dropped on exit. Returns `false` if writes were still
    /// outstanding when the grace period ran out.
    pub async fn flush_view_tracking(&self, grace: Duration) -> bool {
        self.view_writes.close();
        let finished = tokio::time::timeout(grace, self.view_writes.wait())
            .await
            .is_ok();
        self.view_writes.reopen();

        if !finished {
            warn!(
                pending = self.view_writes.len(),
                grace_ms = grace.as_millis() as u64,
                "Folder view writes still pending after grace period"
            );
        }
        finished
    }

    fn bound(&self, page: PageRequest) -> PageRequest {
        PageRequest::bounded(page.page, page.page_size, self.config.max_page_size)
    }

    async fn load(&self, folder_id: FolderId) -> Result<Folder, AppError> {
        self.store
            .find_by_id(folder_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Folder {folder_id} not found")))
    }

    async fn load_owned(
        &self,
        ctx: &RequestContext,
        folder_id: FolderId,
        action: &str,
    ) -> Result<Folder, AppError> {
        let folder = self.load(folder_id).await?;
        if !ctx.owns(&folder) {
            warn!(
                user_id = %ctx.user_id,
                role = %ctx.role,
                folder_id = %folder_id,
                action = action,
                "Folder action denied: caller is not the owner"
            );
            return Err(AppError::authorization(format!(
                "Only the folder owner can {action}"
            )));
        }
        Ok(folder)
    }
}
