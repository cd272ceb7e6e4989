//! PostgreSQL folder repository.

use std::collections::HashMap;

use async_trait::async_trait;
use futures::future::try_join_all;
use sqlx::error::ErrorKind as SqlErrorKind;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use folio_core::config::FolderConfig;
use folio_core::error::{AppError, ErrorKind};
use folio_core::result::AppResult;
use folio_core::types::{FolderContentId, FolderId, MaterialId, UserId};
use folio_entity::folder::model::normalize_description;
use folio_entity::folder::{
    CreateFolder, Folder, FolderContent, FolderContentRow, FolderDetail, FolderStats,
    FolderWithCounts, MaterialEntry, NestedFolderEntry, UpdateFolder, derive_slug,
};
use folio_entity::material::MaterialSummary;
use folio_entity::user::CreatorProfile;

use crate::store::FolderStore;

/// Advisory lock key serializing writes to the containment graph.
const NESTING_LOCK_KEY: i64 = 0x666f_6c69_6f00_0001;

const FOLDER_COLUMNS: &str = "f.id, f.creator_id, f.label, f.slug, f.description, f.visibility, \
     f.target_course_id, f.likes, f.views, f.last_viewed_at, f.created_at, f.updated_at";

const CONTENT_COLUMNS: &str = "id, folder_id, content_material_id, content_folder_id, created_at";

/// Folder rows joined with one grouped aggregate over `folder_contents`
/// and with the creator's public profile. The aggregate is computed once
/// for the whole result set rather than once per folder.
const SUMMARY_FROM: &str = "FROM folders f \
     LEFT JOIN ( \
        SELECT folder_id, \
               COUNT(*) FILTER (WHERE content_material_id IS NOT NULL) AS material_count, \
               COUNT(*) FILTER (WHERE content_folder_id IS NOT NULL) AS nested_folder_count \
        FROM folder_contents \
        GROUP BY folder_id \
     ) c ON c.folder_id = f.id \
     LEFT JOIN users u ON u.id = f.creator_id";

const SUMMARY_EXTRA_COLUMNS: &str = "COALESCE(c.material_count, 0) AS material_count, \
     COALESCE(c.nested_folder_count, 0) AS nested_folder_count, \
     u.username AS creator_username, u.display_name AS creator_display_name, \
     u.avatar_url AS creator_avatar_url";

/// Whether `$2` is reachable from `$1` through nested-folder links.
/// `UNION` discards revisited ids, so the recursion ends on any graph.
const REACHES_SQL: &str = "WITH RECURSIVE reachable(id) AS ( \
        SELECT $1::uuid \
        UNION \
        SELECT fc.content_folder_id FROM folder_contents fc \
        INNER JOIN reachable r ON fc.folder_id = r.id \
        WHERE fc.content_folder_id IS NOT NULL \
     ) SELECT EXISTS (SELECT 1 FROM reachable WHERE id = $2)";

#[derive(Debug, FromRow)]
struct FolderSummaryRow {
    #[sqlx(flatten)]
    folder: Folder,
    material_count: i64,
    nested_folder_count: i64,
    creator_username: Option<String>,
    creator_display_name: Option<String>,
    creator_avatar_url: Option<String>,
}

impl From<FolderSummaryRow> for FolderWithCounts {
    fn from(row: FolderSummaryRow) -> Self {
        let creator = CreatorProfile::from_join(
            row.folder.creator_id,
            row.creator_username,
            row.creator_display_name,
            row.creator_avatar_url,
        );
        Self {
            folder: row.folder,
            creator,
            material_count: row.material_count,
            nested_folder_count: row.nested_folder_count,
        }
    }
}

#[derive(Debug, FromRow)]
struct FolderHeaderRow {
    #[sqlx(flatten)]
    folder: Folder,
    creator_username: Option<String>,
    creator_display_name: Option<String>,
    creator_avatar_url: Option<String>,
}

#[derive(Debug, FromRow)]
struct MaterialEntryRow {
    link_id: FolderContentId,
    added_at: chrono::DateTime<chrono::Utc>,
    material_id: MaterialId,
    title: String,
    description: Option<String>,
    material_created_at: chrono::DateTime<chrono::Utc>,
    creator_id: Option<UserId>,
    creator_username: Option<String>,
    creator_display_name: Option<String>,
    creator_avatar_url: Option<String>,
}

impl From<MaterialEntryRow> for MaterialEntry {
    fn from(row: MaterialEntryRow) -> Self {
        Self {
            link_id: row.link_id,
            added_at: row.added_at,
            material: MaterialSummary {
                id: row.material_id,
                title: row.title,
                description: row.description,
                creator: CreatorProfile::from_join(
                    row.creator_id,
                    row.creator_username,
                    row.creator_display_name,
                    row.creator_avatar_url,
                ),
                created_at: row.material_created_at,
            },
        }
    }
}

#[derive(Debug, FromRow)]
struct NestedEntryRow {
    link_id: FolderContentId,
    added_at: chrono::DateTime<chrono::Utc>,
    #[sqlx(flatten)]
    folder: Folder,
    creator_username: Option<String>,
    creator_display_name: Option<String>,
    creator_avatar_url: Option<String>,
}

/// Repository for folder CRUD, content links, and aggregate queries.
#[derive(Debug, Clone)]
pub struct FolderRepository {
    pool: PgPool,
    slug_max_length: usize,
}

impl FolderRepository {
    /// Create a new folder repository.
    pub fn new(pool: PgPool, config: &FolderConfig) -> Self {
        Self {
            pool,
            slug_max_length: config.slug_max_length,
        }
    }

    async fn list_summaries(
        &self,
        filter: &str,
        order: &str,
        bind: Option<SummaryBind<'_>>,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<FolderWithCounts>> {
        let (limit_idx, offset_idx) = if bind.is_some() { (2, 3) } else { (1, 2) };
        let sql = format!(
            "SELECT {FOLDER_COLUMNS}, {SUMMARY_EXTRA_COLUMNS} {SUMMARY_FROM} {filter} \
             ORDER BY {order} LIMIT ${limit_idx} OFFSET ${offset_idx}"
        );

        let mut query = sqlx::query_as::<_, FolderSummaryRow>(&sql);
        query = match bind {
            Some(SummaryBind::Owner(owner)) => query.bind(owner),
            Some(SummaryBind::Pattern(pattern)) => query.bind(pattern),
            None => query,
        };

        let rows = query
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .bind(i64::try_from(offset).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list folders", e))?;

        Ok(rows.into_iter().map(FolderWithCounts::from).collect())
    }

    async fn find_header(
        &self,
        filter: &str,
        key: HeaderKey<'_>,
    ) -> AppResult<Option<FolderHeaderRow>> {
        let sql = format!(
            "SELECT {FOLDER_COLUMNS}, u.username AS creator_username, \
             u.display_name AS creator_display_name, u.avatar_url AS creator_avatar_url \
             FROM folders f LEFT JOIN users u ON u.id = f.creator_id WHERE {filter}"
        );
        let query = sqlx::query_as::<_, FolderHeaderRow>(&sql);
        let query = match key {
            HeaderKey::Id(id) => query.bind(id),
            HeaderKey::Slug(slug) => query.bind(slug),
        };
        query
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find folder", e))
    }

    /// Load one level of content and the counts around a folder header.
    async fn assemble_detail(&self, header: FolderHeaderRow) -> AppResult<FolderDetail> {
        let folder_id = header.folder.id;

        let materials = sqlx::query_as::<_, MaterialEntryRow>(
            "SELECT fc.id AS link_id, fc.created_at AS added_at, \
                    m.id AS material_id, m.title, m.description, \
                    m.created_at AS material_created_at, \
                    m.creator_id, u.username AS creator_username, \
                    u.display_name AS creator_display_name, u.avatar_url AS creator_avatar_url \
             FROM folder_contents fc \
             INNER JOIN materials m ON m.id = fc.content_material_id \
             LEFT JOIN users u ON u.id = m.creator_id \
             WHERE fc.folder_id = $1 \
             ORDER BY fc.created_at ASC",
        )
        .bind(folder_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to load folder materials", e)
        })?;

        let nested_sql = format!(
            "SELECT fc.id AS link_id, fc.created_at AS added_at, {FOLDER_COLUMNS}, \
                    u.username AS creator_username, u.display_name AS creator_display_name, \
                    u.avatar_url AS creator_avatar_url \
             FROM folder_contents fc \
             INNER JOIN folders f ON f.id = fc.content_folder_id \
             LEFT JOIN users u ON u.id = f.creator_id \
             WHERE fc.folder_id = $1 \
             ORDER BY fc.created_at ASC"
        );
        let nested = sqlx::query_as::<_, NestedEntryRow>(&nested_sql)
            .bind(folder_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to load nested folders", e)
            })?;

        let stats = self.get_folder_stats(folder_id).await?;

        let child_ids: Vec<Uuid> = nested.iter().map(|n| n.folder.id.into_uuid()).collect();
        let child_counts = self.material_counts_for(&child_ids).await?;

        let nested_folders = nested
            .into_iter()
            .map(|row| NestedFolderEntry {
                link_id: row.link_id,
                added_at: row.added_at,
                material_count: child_counts.get(&row.folder.id).copied().unwrap_or(0),
                creator: CreatorProfile::from_join(
                    row.folder.creator_id,
                    row.creator_username,
                    row.creator_display_name,
                    row.creator_avatar_url,
                ),
                folder: row.folder,
            })
            .collect();

        let creator = CreatorProfile::from_join(
            header.folder.creator_id,
            header.creator_username,
            header.creator_display_name,
            header.creator_avatar_url,
        );

        Ok(FolderDetail {
            folder: header.folder,
            creator,
            materials: materials.into_iter().map(MaterialEntry::from).collect(),
            nested_folders,
            material_count: stats.material_count,
            nested_folder_count: stats.nested_folder_count,
        })
    }

    /// Material counts for many folders in one grouped query.
    async fn material_counts_for(&self, folder_ids: &[Uuid]) -> AppResult<HashMap<FolderId, i64>> {
        if folder_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<(FolderId, i64)> = sqlx::query_as(
            "SELECT folder_id, COUNT(*) AS material_count FROM folder_contents \
             WHERE folder_id = ANY($1) AND content_material_id IS NOT NULL \
             GROUP BY folder_id",
        )
        .bind(folder_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to count child materials", e)
        })?;

        Ok(rows.into_iter().collect())
    }
}

enum SummaryBind<'a> {
    Owner(UserId),
    Pattern(&'a str),
}

enum HeaderKey<'a> {
    Id(FolderId),
    Slug(&'a str),
}

/// Escape `LIKE` metacharacters so user input matches literally.
fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Map a failed content-link write onto the domain error kinds.
fn map_link_error(e: sqlx::Error, context: &str) -> AppError {
    if let sqlx::Error::Database(ref db_err) = e {
        match db_err.kind() {
            SqlErrorKind::UniqueViolation => {
                return match db_err.constraint() {
                    Some("folder_contents_material_key") => {
                        AppError::conflict("Material is already in this folder")
                    }
                    Some("folder_contents_nested_key") => {
                        AppError::conflict("Folder is already nested in this folder")
                    }
                    _ => AppError::conflict(format!("{context}: duplicate entry")),
                };
            }
            SqlErrorKind::ForeignKeyViolation => {
                return AppError::not_found(format!("{context}: referenced item does not exist"));
            }
            SqlErrorKind::CheckViolation => {
                return AppError::validation(format!("{context}: {}", db_err.message()));
            }
            _ => {}
        }
    }
    AppError::with_source(ErrorKind::Database, context.to_string(), e)
}

#[async_trait]
impl FolderStore for FolderRepository {
    async fn create(&self, draft: &CreateFolder) -> AppResult<Folder> {
        let id = FolderId::new();
        let label = draft.label.trim();
        let slug = derive_slug(label, id, self.slug_max_length);

        sqlx::query_as::<_, Folder>(
            "INSERT INTO folders \
                 (id, creator_id, label, slug, description, visibility, target_course_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING id, creator_id, label, slug, description, visibility, target_course_id, \
                       likes, views, last_viewed_at, created_at, updated_at",
        )
        .bind(id)
        .bind(draft.creator_id)
        .bind(label)
        .bind(&slug)
        .bind(draft.description.as_deref().and_then(normalize_description))
        .bind(draft.visibility.unwrap_or_default())
        .bind(draft.target_course_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err)
                if db_err.constraint() == Some("folders_slug_key") =>
            {
                AppError::conflict(format!("Folder slug '{slug}' already exists"))
            }
            sqlx::Error::Database(ref db_err)
                if db_err.kind() == SqlErrorKind::ForeignKeyViolation =>
            {
                AppError::not_found(format!("User {} not found", draft.creator_id))
            }
            _ => AppError::with_source(ErrorKind::Database, "Failed to create folder", e),
        })
    }

    async fn find_by_id(&self, id: FolderId) -> AppResult<Option<Folder>> {
        let sql = format!("SELECT {FOLDER_COLUMNS} FROM folders f WHERE f.id = $1");
        sqlx::query_as::<_, Folder>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find folder", e))
    }

    async fn find_by_slug(&self, slug: &str) -> AppResult<Option<Folder>> {
        let sql = format!("SELECT {FOLDER_COLUMNS} FROM folders f WHERE f.slug = $1");
        sqlx::query_as::<_, Folder>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find folder", e))
    }

    async fn update(&self, id: FolderId, patch: &UpdateFolder) -> AppResult<Folder> {
        sqlx::query_as::<_, Folder>(
            "UPDATE folders SET \
                label = COALESCE($2, label), \
                description = CASE WHEN $3::text IS NULL THEN description \
                                   ELSE NULLIF(btrim($3), '') END, \
                visibility = COALESCE($4, visibility), \
                target_course_id = COALESCE($5, target_course_id), \
                updated_at = NOW() \
             WHERE id = $1 \
             RETURNING id, creator_id, label, slug, description, visibility, target_course_id, \
                       likes, views, last_viewed_at, created_at, updated_at",
        )
        .bind(id)
        .bind(patch.label.as_deref().map(str::trim))
        .bind(patch.description.as_deref())
        .bind(patch.visibility)
        .bind(patch.target_course_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update folder", e))?
        .ok_or_else(|| AppError::not_found(format!("Folder {id} not found")))
    }

    async fn delete(&self, id: FolderId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM folders WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete folder", e)
            })?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_by_owner(
        &self,
        owner: UserId,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<FolderWithCounts>> {
        self.list_summaries(
            "WHERE f.creator_id = $1",
            "f.last_viewed_at DESC NULLS LAST, f.created_at DESC, f.id DESC",
            Some(SummaryBind::Owner(owner)),
            limit,
            offset,
        )
        .await
    }

    async fn list_public(&self, limit: u64, offset: u64) -> AppResult<Vec<FolderWithCounts>> {
        self.list_summaries(
            "WHERE f.visibility = 'public'",
            "f.created_at DESC, f.id DESC",
            None,
            limit,
            offset,
        )
        .await
    }

    async fn get_by_id(&self, id: FolderId) -> AppResult<Option<FolderDetail>> {
        match self.find_header("f.id = $1", HeaderKey::Id(id)).await? {
            Some(header) => self.assemble_detail(header).await.map(Some),
            None => Ok(None),
        }
    }

    async fn get_by_slug(&self, slug: &str) -> AppResult<Option<FolderDetail>> {
        match self.find_header("f.slug = $1", HeaderKey::Slug(slug)).await? {
            Some(header) => self.assemble_detail(header).await.map(Some),
            None => Ok(None),
        }
    }

    async fn search(
        &self,
        query: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<FolderWithCounts>> {
        let pattern = like_pattern(query.trim());
        self.list_summaries(
            "WHERE f.label ILIKE $1 OR f.description ILIKE $1",
            "f.likes DESC, f.views DESC, f.created_at DESC, f.id DESC",
            Some(SummaryBind::Pattern(&pattern)),
            limit,
            offset,
        )
        .await
    }

    async fn find_content_by_material(
        &self,
        folder_id: FolderId,
        material_id: MaterialId,
    ) -> AppResult<Option<FolderContent>> {
        let sql = format!(
            "SELECT {CONTENT_COLUMNS} FROM folder_contents \
             WHERE folder_id = $1 AND content_material_id = $2"
        );
        sqlx::query_as::<_, FolderContentRow>(&sql)
            .bind(folder_id)
            .bind(material_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find material link", e)
            })?
            .map(FolderContent::try_from)
            .transpose()
    }

    async fn add_material(
        &self,
        folder_id: FolderId,
        material_id: MaterialId,
    ) -> AppResult<FolderContent> {
        let sql = format!(
            "INSERT INTO folder_contents (id, folder_id, content_material_id) \
             VALUES ($1, $2, $3) RETURNING {CONTENT_COLUMNS}"
        );
        sqlx::query_as::<_, FolderContentRow>(&sql)
            .bind(FolderContentId::new())
            .bind(folder_id)
            .bind(material_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_link_error(e, "Failed to add material"))?
            .try_into()
    }

    async fn remove_material(
        &self,
        folder_id: FolderId,
        material_id: MaterialId,
    ) -> AppResult<Option<FolderContent>> {
        let sql = format!(
            "DELETE FROM folder_contents WHERE folder_id = $1 AND content_material_id = $2 \
             RETURNING {CONTENT_COLUMNS}"
        );
        sqlx::query_as::<_, FolderContentRow>(&sql)
            .bind(folder_id)
            .bind(material_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to remove material", e)
            })?
            .map(FolderContent::try_from)
            .transpose()
    }

    async fn find_nested_link(
        &self,
        parent_id: FolderId,
        child_id: FolderId,
    ) -> AppResult<Option<FolderContent>> {
        let sql = format!(
            "SELECT {CONTENT_COLUMNS} FROM folder_contents \
             WHERE folder_id = $1 AND content_folder_id = $2"
        );
        sqlx::query_as::<_, FolderContentRow>(&sql)
            .bind(parent_id)
            .bind(child_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find nested link", e)
            })?
            .map(FolderContent::try_from)
            .transpose()
    }

    async fn add_nested_folder(
        &self,
        parent_id: FolderId,
        child_id: FolderId,
    ) -> AppResult<FolderContent> {
        let db_err = |context: &'static str| {
            move |e: sqlx::Error| AppError::with_source(ErrorKind::Database, context, e)
        };

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_err("Failed to begin nesting transaction"))?;

        // All nesting writes queue here, so two concurrent links can never
        // each pass the reachability check against a graph missing the other.
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(NESTING_LOCK_KEY)
            .execute(&mut *tx)
            .await
            .map_err(db_err("Failed to lock folder graph"))?;

        let present: Vec<FolderId> =
            sqlx::query_scalar("SELECT id FROM folders WHERE id = $1 OR id = $2 FOR SHARE")
                .bind(parent_id)
                .bind(child_id)
                .fetch_all(&mut *tx)
                .await
                .map_err(db_err("Failed to lock nesting endpoints"))?;

        if !present.contains(&parent_id) {
            return Err(AppError::not_found(format!("Folder {parent_id} not found")));
        }
        if !present.contains(&child_id) {
            return Err(AppError::not_found(format!("Folder {child_id} not found")));
        }

        let creates_cycle: bool = sqlx::query_scalar(REACHES_SQL)
            .bind(child_id)
            .bind(parent_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_err("Failed to check folder reachability"))?;

        if creates_cycle {
            return Err(AppError::validation("Circular nesting not allowed"));
        }

        let sql = format!(
            "INSERT INTO folder_contents (id, folder_id, content_folder_id) \
             VALUES ($1, $2, $3) RETURNING {CONTENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, FolderContentRow>(&sql)
            .bind(FolderContentId::new())
            .bind(parent_id)
            .bind(child_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_link_error(e, "Failed to nest folder"))?;

        tx.commit()
            .await
            .map_err(db_err("Failed to commit nesting transaction"))?;

        row.try_into()
    }

    async fn remove_nested_folder(
        &self,
        parent_id: FolderId,
        child_id: FolderId,
    ) -> AppResult<Option<FolderContent>> {
        let sql = format!(
            "DELETE FROM folder_contents WHERE folder_id = $1 AND content_folder_id = $2 \
             RETURNING {CONTENT_COLUMNS}"
        );
        sqlx::query_as::<_, FolderContentRow>(&sql)
            .bind(parent_id)
            .bind(child_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to remove nested folder", e)
            })?
            .map(FolderContent::try_from)
            .transpose()
    }

    async fn find_nested_children(&self, folder_id: FolderId) -> AppResult<Vec<Folder>> {
        let sql = format!(
            "SELECT {FOLDER_COLUMNS} FROM folder_contents fc \
             INNER JOIN folders f ON f.id = fc.content_folder_id \
             WHERE fc.folder_id = $1 \
             ORDER BY fc.created_at ASC"
        );
        sqlx::query_as::<_, Folder>(&sql)
            .bind(folder_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to list nested folders", e)
            })
    }

    async fn get_folder_stats(&self, folder_id: FolderId) -> AppResult<FolderStats> {
        // Both counts come from one statement, so they share a snapshot.
        let (material_count, nested_folder_count): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*) FILTER (WHERE content_material_id IS NOT NULL), \
                    COUNT(*) FILTER (WHERE content_folder_id IS NOT NULL) \
             FROM folder_contents WHERE folder_id = $1",
        )
        .bind(folder_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count content", e))?;

        Ok(FolderStats {
            material_count,
            nested_folder_count,
        })
    }

    async fn track_view(&self, folder_id: FolderId) -> AppResult<()> {
        sqlx::query(
            "UPDATE folders SET last_viewed_at = NOW(), views = views + 1 WHERE id = $1",
        )
        .bind(folder_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to track view", e))?;
        Ok(())
    }

    async fn find_folders_by_material(
        &self,
        material_id: MaterialId,
    ) -> AppResult<Vec<FolderDetail>> {
        let sql = format!(
            "SELECT {FOLDER_COLUMNS}, u.username AS creator_username, \
                    u.display_name AS creator_display_name, u.avatar_url AS creator_avatar_url \
             FROM folders f \
             LEFT JOIN users u ON u.id = f.creator_id \
             WHERE EXISTS ( \
                SELECT 1 FROM folder_contents fc \
                WHERE fc.folder_id = f.id AND fc.content_material_id = $1 \
             ) \
             ORDER BY f.created_at DESC, f.id DESC"
        );
        let headers = sqlx::query_as::<_, FolderHeaderRow>(&sql)
            .bind(material_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find folders by material", e)
            })?;

        try_join_all(headers.into_iter().map(|h| self.assemble_detail(h))).await
    }

    async fn material_ids_in_user_folders(&self, owner: UserId) -> AppResult<Vec<MaterialId>> {
        sqlx::query_scalar::<_, MaterialId>(
            "SELECT DISTINCT fc.content_material_id FROM folder_contents fc \
             INNER JOIN folders f ON f.id = fc.folder_id \
             WHERE f.creator_id = $1 AND fc.content_material_id IS NOT NULL",
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list folder materials", e)
        })
    }
}
