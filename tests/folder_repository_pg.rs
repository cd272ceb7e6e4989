//! PostgreSQL folder repository tests.
//!
//! Run against a scratch database named by `FOLIO_TEST_DATABASE_URL`; every
//! test returns early when it is unset. Each test seeds its own users so the
//! tests can share one database and run in parallel.

use std::sync::Arc;

use sqlx::PgPool;
use uuid::Uuid;

use folio_core::ErrorKind;
use folio_core::config::FolderConfig;
use folio_core::types::{FolderId, MaterialId, UserId};
use folio_database::migration::run_migrations;
use folio_database::{FolderRepository, FolderStore};
use folio_entity::folder::{CreateFolder, Folder, FolderStats, FolderVisibility};

struct TestDb {
    pool: PgPool,
    repo: Arc<FolderRepository>,
}

impl TestDb {
    async fn connect() -> Option<Self> {
        let url = std::env::var("FOLIO_TEST_DATABASE_URL").ok()?;
        let pool = PgPool::connect(&url)
            .await
            .expect("Failed to connect to test database");
        run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = Arc::new(FolderRepository::new(pool.clone(), &FolderConfig::default()));
        Some(Self { pool, repo })
    }

    async fn create_user(&self) -> UserId {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO users (id, username) VALUES ($1, $2)")
            .bind(id)
            .bind(format!("user_{}", id.simple()))
            .execute(&self.pool)
            .await
            .expect("Failed to insert user");
        UserId::from_uuid(id)
    }

    async fn create_material(&self, creator: UserId, title: &str) -> MaterialId {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO materials (id, creator_id, title) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(creator)
            .bind(title)
            .execute(&self.pool)
            .await
            .expect("Failed to insert material");
        MaterialId::from_uuid(id)
    }

    async fn create_folder(&self, creator: UserId, label: &str) -> Folder {
        self.repo
            .create(&CreateFolder {
                creator_id: creator,
                label: label.to_string(),
                description: None,
                visibility: None,
                target_course_id: None,
            })
            .await
            .expect("Failed to create folder")
    }
}

#[tokio::test]
async fn test_create_and_load_detail() {
    let Some(db) = TestDb::connect().await else { return };
    let owner = db.create_user().await;
    let parent = db.create_folder(owner, "Data Structures!!").await;
    let child = db.create_folder(owner, "Trees").await;
    let material = db.create_material(owner, "Lecture 1").await;
    let child_material = db.create_material(owner, "Lecture 2").await;

    assert!(parent.slug.starts_with("data_structures_"));
    assert_eq!(parent.visibility, FolderVisibility::Public);

    db.repo.add_material(parent.id, material).await.unwrap();
    db.repo.add_nested_folder(parent.id, child.id).await.unwrap();
    db.repo.add_material(child.id, child_material).await.unwrap();

    let detail = db.repo.get_by_slug(&parent.slug).await.unwrap().unwrap();
    assert_eq!(
        detail.stats(),
        FolderStats {
            material_count: 1,
            nested_folder_count: 1,
        }
    );
    assert_eq!(detail.materials[0].material.title, "Lecture 1");
    assert_eq!(detail.nested_folders[0].folder.id, child.id);
    assert_eq!(detail.nested_folders[0].material_count, 1);
    assert!(detail.creator.is_some());

    let listed = db.repo.list_by_owner(owner, 10, 0).await.unwrap();
    let row = listed.iter().find(|r| r.folder.id == parent.id).unwrap();
    assert_eq!(row.stats(), detail.stats());
}

#[tokio::test]
async fn test_nesting_rejects_cycles() {
    let Some(db) = TestDb::connect().await else { return };
    let owner = db.create_user().await;
    let a = db.create_folder(owner, "A").await;
    let b = db.create_folder(owner, "B").await;
    let c = db.create_folder(owner, "C").await;

    db.repo.add_nested_folder(a.id, b.id).await.unwrap();
    db.repo.add_nested_folder(b.id, c.id).await.unwrap();

    let err = db.repo.add_nested_folder(c.id, a.id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
    let err = db.repo.add_nested_folder(a.id, a.id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);

    let closure = db.repo.get_all_nested_folders(a.id).await.unwrap();
    let ids: Vec<FolderId> = closure.iter().map(|f| f.id).collect();
    assert_eq!(ids, vec![b.id, c.id]);
}

#[tokio::test]
async fn test_concurrent_opposite_nesting_admits_one() {
    let Some(db) = TestDb::connect().await else { return };
    let owner = db.create_user().await;
    let a = db.create_folder(owner, "A").await;
    let b = db.create_folder(owner, "B").await;

    let first = tokio::spawn({
        let repo = Arc::clone(&db.repo);
        async move { repo.add_nested_folder(a.id, b.id).await }
    });
    let second = tokio::spawn({
        let repo = Arc::clone(&db.repo);
        async move { repo.add_nested_folder(b.id, a.id).await }
    });

    let first = first.await.unwrap();
    let second = second.await.unwrap();
    assert_eq!(first.is_ok() as u8 + second.is_ok() as u8, 1);
    let loser = first.err().or(second.err()).unwrap();
    assert_eq!(loser.kind, ErrorKind::Validation);
}

#[tokio::test]
async fn test_link_constraints_map_to_error_kinds() {
    let Some(db) = TestDb::connect().await else { return };
    let owner = db.create_user().await;
    let folder = db.create_folder(owner, "Constraints").await;
    let child = db.create_folder(owner, "Child").await;
    let material = db.create_material(owner, "Notes").await;

    db.repo.add_material(folder.id, material).await.unwrap();
    let err = db.repo.add_material(folder.id, material).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);

    db.repo.add_nested_folder(folder.id, child.id).await.unwrap();
    let err = db.repo.add_nested_folder(folder.id, child.id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);

    let err = db
        .repo
        .add_material(folder.id, MaterialId::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);

    let err = db
        .repo
        .add_nested_folder(folder.id, FolderId::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_delete_cascades_links_only() {
    let Some(db) = TestDb::connect().await else { return };
    let owner = db.create_user().await;
    let top = db.create_folder(owner, "Top").await;
    let middle = db.create_folder(owner, "Middle").await;
    let bottom = db.create_folder(owner, "Bottom").await;

    db.repo.add_nested_folder(top.id, middle.id).await.unwrap();
    db.repo.add_nested_folder(middle.id, bottom.id).await.unwrap();

    assert!(db.repo.delete(middle.id).await.unwrap());
    assert!(!db.repo.delete(middle.id).await.unwrap());

    assert_eq!(db.repo.get_folder_stats(top.id).await.unwrap(), FolderStats::default());
    assert!(db.repo.find_by_id(bottom.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_search_matches_literally_and_ranks_by_likes() {
    let Some(db) = TestDb::connect().await else { return };
    let owner = db.create_user().await;
    let marker = Uuid::new_v4().simple().to_string();
    let plain = db.create_folder(owner, &format!("{marker} plain")).await;
    let liked = db.create_folder(owner, &format!("{marker} liked")).await;
    db.create_folder(owner, "100 percent").await;

    sqlx::query("UPDATE folders SET likes = 3 WHERE id = $1")
        .bind(liked.id)
        .execute(&db.pool)
        .await
        .unwrap();

    let found = db.repo.search(&marker.to_uppercase(), 10, 0).await.unwrap();
    let ids: Vec<FolderId> = found.iter().map(|r| r.folder.id).collect();
    assert_eq!(ids, vec![liked.id, plain.id]);

    let wildcard = db.repo.search(&format!("{marker}%"), 10, 0).await.unwrap();
    assert!(wildcard.is_empty());
}

#[tokio::test]
async fn test_track_view_stamps_and_counts() {
    let Some(db) = TestDb::connect().await else { return };
    let owner = db.create_user().await;
    let folder = db.create_folder(owner, "Viewed").await;

    db.repo.track_view(folder.id).await.unwrap();
    db.repo.track_view(folder.id).await.unwrap();

    let stored = db.repo.find_by_id(folder.id).await.unwrap().unwrap();
    assert_eq!(stored.views, 2);
    assert!(stored.last_viewed_at.is_some());

    let listed = db.repo.list_by_owner(owner, 10, 0).await.unwrap();
    assert_eq!(listed[0].folder.id, folder.id);
}

#[tokio::test]
async fn test_find_by_slug_returns_bare_row() {
    let Some(db) = TestDb::connect().await else { return };
    let owner = db.create_user().await;
    let folder = db.create_folder(owner, "Slugged").await;

    let found = db.repo.find_by_slug(&folder.slug).await.unwrap().unwrap();
    assert_eq!(found.id, folder.id);
    assert!(db.repo.find_by_slug("missing_1a2b3c4d").await.unwrap().is_none());
}

#[tokio::test]
async fn test_offset_beyond_bigint_range_returns_nothing() {
    let Some(db) = TestDb::connect().await else { return };
    let owner = db.create_user().await;
    db.create_folder(owner, "Far away").await;

    let rows = db.repo.list_by_owner(owner, 101, u64::MAX).await.unwrap();
    assert!(rows.is_empty());
}
