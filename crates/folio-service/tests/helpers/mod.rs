//! Shared helpers for service tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use folio_core::config::FolderConfig;
use folio_core::types::{FolderId, MaterialId, UserId};
use folio_database::{FolderStore, MemoryFolderRepository};
use folio_entity::folder::{Folder, FolderVisibility};
use folio_entity::user::{CreatorProfile, UserRole};
use folio_service::{CreateFolderRequest, FolderService, RequestContext, TreeService};

/// Services wired over a fresh in-memory store.
pub struct TestApp {
    /// The store, for seeding and direct inspection.
    pub store: Arc<MemoryFolderRepository>,
    /// Folder service under test.
    pub folders: FolderService,
    /// Tree service under test.
    pub trees: TreeService,
}

impl TestApp {
    /// Create a new test application with default folder settings.
    pub fn new() -> Self {
        Self::with_config(FolderConfig::default())
    }

    /// Create a new test application with custom folder settings.
    pub fn with_config(config: FolderConfig) -> Self {
        let store = Arc::new(MemoryFolderRepository::new(&config));
        let dyn_store: Arc<dyn FolderStore> = store.clone();
        Self {
            folders: FolderService::new(Arc::clone(&dyn_store), config.clone()),
            trees: TreeService::new(dyn_store, config.max_tree_depth),
            store,
        }
    }

    /// Register a user and return a context acting as them.
    pub async fn create_test_user(&self, username: &str) -> RequestContext {
        let id = UserId::new();
        self.store
            .insert_user(CreatorProfile {
                id,
                username: username.to_string(),
                display_name: None,
                avatar_url: None,
            })
            .await;
        RequestContext::new(id, UserRole::Student)
    }

    /// Register a material created by `ctx`.
    pub async fn create_material(&self, ctx: &RequestContext, title: &str) -> MaterialId {
        self.store
            .insert_material(title, None, Some(ctx.user_id))
            .await
    }

    /// Create a public folder owned by `ctx`.
    pub async fn create_folder(&self, ctx: &RequestContext, label: &str) -> Folder {
        self.create_folder_with(ctx, label, FolderVisibility::Public)
            .await
    }

    /// Create a folder owned by `ctx` with the given visibility.
    pub async fn create_folder_with(
        &self,
        ctx: &RequestContext,
        label: &str,
        visibility: FolderVisibility,
    ) -> Folder {
        self.folders
            .create(
                ctx,
                CreateFolderRequest {
                    label: label.to_string(),
                    visibility: Some(visibility),
                    ..Default::default()
                },
            )
            .await
            .expect("Failed to create folder")
    }

    /// Wait until the background view write for `folder_id` reaches `views`.
    pub async fn wait_for_views(&self, folder_id: FolderId, views: i32) -> Folder {
        for _ in 0..100 {
            let folder = self
                .store
                .find_by_id(folder_id)
                .await
                .expect("Failed to load folder")
                .expect("Folder disappeared");
            if folder.views >= views {
                return folder;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("view count for {folder_id} never reached {views}");
    }
}
