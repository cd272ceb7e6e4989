//! Folder management CLI commands.

use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;
use uuid::Uuid;

use crate::output::{self, OutputFormat};
use folio_core::config::AppConfig;
use folio_core::error::AppError;
use folio_core::types::{CourseId, FolderId, MaterialId, PageResponse, UserId};
use folio_database::{FolderRepository, FolderStore};
use folio_entity::folder::{
    FolderContent, FolderDetail, FolderNode, FolderVisibility, FolderWithCounts, UpdateFolder,
};
use folio_entity::user::{CreatorProfile, UserRole};
use folio_service::{
    CreateFolderRequest, FolderIdentifier, FolderService, RequestContext, TreeService,
};

/// How long to let background view writes finish before the pool closes.
const VIEW_WRITE_GRACE: Duration = Duration::from_secs(2);

/// Arguments for folder commands
#[derive(Debug, Args)]
pub struct FolderArgs {
    /// Acting user ID, as issued by the identity provider
    #[arg(long = "as", global = true)]
    pub acting_user: Option<String>,

    /// Role of the acting user
    #[arg(long, global = true, default_value = "student")]
    pub role: String,

    /// Folder subcommand
    #[command(subcommand)]
    pub command: FolderCommand,
}

/// Page selection shared by listing commands
#[derive(Debug, Args)]
pub struct PageArgs {
    /// Page number (1-based)
    #[arg(long, default_value = "1")]
    pub page: u64,
    /// Items per page
    #[arg(long)]
    pub page_size: Option<u64>,
}

/// Folder subcommands
#[derive(Debug, Subcommand)]
pub enum FolderCommand {
    /// Create a new folder owned by the acting user
    Create {
        /// Folder label
        #[arg(short, long)]
        label: String,
        /// Optional description
        #[arg(short, long)]
        description: Option<String>,
        /// Only the owner may add materials
        #[arg(long)]
        private: bool,
        /// Associated course ID
        #[arg(long)]
        course: Option<String>,
    },
    /// Show a folder and its direct contents
    Show {
        /// Folder ID or slug
        folder: String,
    },
    /// Update a folder owned by the acting user
    Update {
        /// Folder ID or slug
        folder: String,
        /// New label
        #[arg(short, long)]
        label: Option<String>,
        /// New description (empty clears it)
        #[arg(short, long)]
        description: Option<String>,
        /// New visibility: public or private
        #[arg(long)]
        visibility: Option<String>,
        /// New associated course ID
        #[arg(long)]
        course: Option<String>,
    },
    /// Delete a folder owned by the acting user
    Delete {
        /// Folder ID or slug
        folder: String,
    },
    /// List folders created by a user, most recently viewed first
    List {
        /// Creator ID (defaults to the acting user)
        #[arg(long)]
        user: Option<String>,
        #[command(flatten)]
        page: PageArgs,
    },
    /// Search folders by label or description
    Search {
        /// Text to look for
        query: String,
        #[command(flatten)]
        page: PageArgs,
    },
    /// Browse public folders, newest first
    Browse {
        #[command(flatten)]
        page: PageArgs,
    },
    /// Add a material to a folder
    AddMaterial {
        /// Folder ID or slug
        folder: String,
        /// Material ID
        material: String,
    },
    /// Remove a material from a folder
    RemoveMaterial {
        /// Folder ID or slug
        folder: String,
        /// Material ID
        material: String,
    },
    /// Nest one folder inside another
    Nest {
        /// Parent folder ID or slug
        parent: String,
        /// Child folder ID or slug
        child: String,
    },
    /// Remove a nested folder from its parent
    Unnest {
        /// Parent folder ID or slug
        parent: String,
        /// Child folder ID or slug
        child: String,
    },
    /// Show content counts of a folder
    Stats {
        /// Folder ID or slug
        folder: String,
    },
    /// Show the tree of folders nested under a folder
    Tree {
        /// Folder ID or slug
        folder: String,
        /// Max depth
        #[arg(short, long)]
        depth: Option<u32>,
    },
    /// List folders that contain a material
    ByMaterial {
        /// Material ID
        material: String,
    },
    /// List materials found in a user's folders
    MaterialIds {
        /// Owner ID (defaults to the acting user)
        #[arg(long)]
        user: Option<String>,
    },
}

/// Folder display row
#[derive(Debug, Serialize, Tabled)]
struct FolderRow {
    /// Folder ID
    id: String,
    /// Slug
    slug: String,
    /// Label
    label: String,
    /// Visibility
    visibility: String,
    /// Materials
    materials: i64,
    /// Nested folders
    folders: i64,
    /// Likes
    likes: i32,
    /// Views
    views: i32,
    /// Creator
    creator: String,
    /// Created at
    created_at: String,
}

impl From<&FolderWithCounts> for FolderRow {
    fn from(row: &FolderWithCounts) -> Self {
        Self {
            id: row.folder.id.to_string(),
            slug: row.folder.slug.clone(),
            label: row.folder.label.clone(),
            visibility: row.folder.visibility.to_string(),
            materials: row.material_count,
            folders: row.nested_folder_count,
            likes: row.folder.likes,
            views: row.folder.views,
            creator: creator_label(row.creator.as_ref()),
            created_at: row.folder.created_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

impl From<&FolderDetail> for FolderRow {
    fn from(detail: &FolderDetail) -> Self {
        Self {
            id: detail.folder.id.to_string(),
            slug: detail.folder.slug.clone(),
            label: detail.folder.label.clone(),
            visibility: detail.folder.visibility.to_string(),
            materials: detail.material_count,
            folders: detail.nested_folder_count,
            likes: detail.folder.likes,
            views: detail.folder.views,
            creator: creator_label(detail.creator.as_ref()),
            created_at: detail.folder.created_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

/// Content link display row
#[derive(Debug, Serialize, Tabled)]
struct ContentRow {
    /// Link ID
    link_id: String,
    /// Item kind
    kind: String,
    /// Item ID
    item_id: String,
    /// Title or label
    title: String,
    /// Materials inside a nested folder
    materials: String,
    /// Added at
    added_at: String,
}

/// Material ID row
#[derive(Debug, Serialize, Tabled)]
struct MaterialIdRow {
    /// Material ID
    material_id: String,
}

/// Execute folder commands
pub async fn execute(
    args: &FolderArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let db = super::connect(config).await?;
    let store: Arc<dyn FolderStore> = Arc::new(FolderRepository::new(
        db.pool().clone(),
        &config.folders,
    ));
    let folders = FolderService::new(Arc::clone(&store), config.folders.clone());
    let trees = TreeService::new(store, config.folders.max_tree_depth);

    let result = run(args, &folders, &trees, format).await;
    folders.flush_view_tracking(VIEW_WRITE_GRACE).await;
    db.close().await;
    result
}

async fn run(
    args: &FolderArgs,
    folders: &FolderService,
    trees: &TreeService,
    format: OutputFormat,
) -> Result<(), AppError> {
    let actor = args
        .acting_user
        .as_deref()
        .map(|raw| acting_context(raw, &args.role))
        .transpose()?;

    match &args.command {
        FolderCommand::Create {
            label,
            description,
            private,
            course,
        } => {
            let ctx = require_actor(actor.as_ref())?;
            let visibility = if *private {
                FolderVisibility::Private
            } else {
                FolderVisibility::Public
            };
            let folder = folders
                .create(
                    ctx,
                    CreateFolderRequest {
                        label: label.clone(),
                        description: description.clone(),
                        visibility: Some(visibility),
                        target_course_id: course
                            .as_deref()
                            .map(|c| parse_uuid(c, "course").map(CourseId::from_uuid))
                            .transpose()?,
                    },
                )
                .await?;

            match format {
                OutputFormat::Json => output::print_json(&folder),
                OutputFormat::Table => output::print_success(&format!(
                    "Folder '{}' created (id: {}, slug: {})",
                    folder.label, folder.id, folder.slug
                )),
            }
        }
        FolderCommand::Show { folder } => {
            let detail = folders.get(folder, actor.as_ref()).await?;
            print_detail(&detail, format);
        }
        FolderCommand::Update {
            folder,
            label,
            description,
            visibility,
            course,
        } => {
            let ctx = require_actor(actor.as_ref())?;
            let folder_id = resolve_folder(folders, folder).await?;
            let patch = UpdateFolder {
                label: label.clone(),
                description: description.clone(),
                visibility: visibility.as_deref().map(str::parse).transpose()?,
                target_course_id: course
                    .as_deref()
                    .map(|c| parse_uuid(c, "course").map(CourseId::from_uuid))
                    .transpose()?,
            };
            let updated = folders.update(ctx, folder_id, patch).await?;

            match format {
                OutputFormat::Json => output::print_json(&updated),
                OutputFormat::Table => {
                    output::print_success(&format!("Folder '{}' updated", updated.label))
                }
            }
        }
        FolderCommand::Delete { folder } => {
            let ctx = require_actor(actor.as_ref())?;
            let folder_id = resolve_folder(folders, folder).await?;
            folders.remove(ctx, folder_id).await?;
            output::print_success(&format!("Folder {folder_id} deleted"));
        }
        FolderCommand::List { user, page } => {
            let owner = match user {
                Some(raw) => UserId::from_uuid(parse_uuid(raw, "user")?),
                None => require_actor(actor.as_ref())?.user_id,
            };
            let request = folders.page_request(page.page, page.page_size);
            let result = folders.find_by_creator(owner, request).await?;
            print_page(result, format);
        }
        FolderCommand::Search { query, page } => {
            let request = folders.page_request(page.page, page.page_size);
            let result = folders.search_folders(query, request).await?;
            print_page(result, format);
        }
        FolderCommand::Browse { page } => {
            let request = folders.page_request(page.page, page.page_size);
            let result = folders.find_all_paginated(request).await?;
            print_page(result, format);
        }
        FolderCommand::AddMaterial { folder, material } => {
            let ctx = require_actor(actor.as_ref())?;
            let folder_id = resolve_folder(folders, folder).await?;
            let material_id = MaterialId::from_uuid(parse_uuid(material, "material")?);
            let link = folders
                .add_material_to_folder(ctx, folder_id, material_id)
                .await?;
            print_link(&link, "Material added", format);
        }
        FolderCommand::RemoveMaterial { folder, material } => {
            let ctx = require_actor(actor.as_ref())?;
            let folder_id = resolve_folder(folders, folder).await?;
            let material_id = MaterialId::from_uuid(parse_uuid(material, "material")?);
            let link = folders
                .remove_material_from_folder(ctx, folder_id, material_id)
                .await?;
            print_link(&link, "Material removed", format);
        }
        FolderCommand::Nest { parent, child } => {
            let ctx = require_actor(actor.as_ref())?;
            let parent_id = resolve_folder(folders, parent).await?;
            let child_id = resolve_folder(folders, child).await?;
            let link = folders.add_nested_folder(ctx, parent_id, child_id).await?;
            print_link(&link, "Folder nested", format);
        }
        FolderCommand::Unnest { parent, child } => {
            let ctx = require_actor(actor.as_ref())?;
            let parent_id = resolve_folder(folders, parent).await?;
            let child_id = resolve_folder(folders, child).await?;
            let link = folders.remove_nested_folder(ctx, parent_id, child_id).await?;
            print_link(&link, "Folder unnested", format);
        }
        FolderCommand::Stats { folder } => {
            let folder_id = resolve_folder(folders, folder).await?;
            let stats = folders.get_folder_stats(folder_id).await?;
            match format {
                OutputFormat::Json => output::print_json(&stats),
                OutputFormat::Table => {
                    output::print_kv("Folder", &folder_id.to_string());
                    output::print_kv("Materials", &stats.material_count.to_string());
                    output::print_kv("Nested folders", &stats.nested_folder_count.to_string());
                }
            }
        }
        FolderCommand::Tree { folder, depth } => {
            let tree = trees.get_tree(folder, *depth).await?;
            match format {
                OutputFormat::Json => output::print_json(&tree),
                OutputFormat::Table => {
                    print_node(&tree.root, "", true, true);
                    println!();
                    println!("{} folders", tree.total_folders);
                }
            }
        }
        FolderCommand::ByMaterial { material } => {
            let material_id = MaterialId::from_uuid(parse_uuid(material, "material")?);
            let details = folders.get_folders_by_material(material_id).await?;
            match format {
                OutputFormat::Json => output::print_json(&details),
                OutputFormat::Table => {
                    let rows: Vec<FolderRow> = details.iter().map(FolderRow::from).collect();
                    output::print_list(&rows, format);
                }
            }
        }
        FolderCommand::MaterialIds { user } => {
            let owner = match user {
                Some(raw) => UserId::from_uuid(parse_uuid(raw, "user")?),
                None => require_actor(actor.as_ref())?.user_id,
            };
            let ids = folders.get_material_ids_in_user_folders(owner).await?;
            let rows: Vec<MaterialIdRow> = ids
                .iter()
                .map(|id| MaterialIdRow {
                    material_id: id.to_string(),
                })
                .collect();
            output::print_list(&rows, format);
        }
    }

    Ok(())
}

fn parse_uuid(raw: &str, what: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim())
        .map_err(|e| AppError::validation(format!("Invalid {what} ID '{raw}': {e}")))
}

fn acting_context(raw: &str, role: &str) -> Result<RequestContext, AppError> {
    let user_id = UserId::from_uuid(parse_uuid(raw, "user")?);
    let role: UserRole = role.parse()?;
    Ok(RequestContext::new(user_id, role))
}

fn require_actor(actor: Option<&RequestContext>) -> Result<&RequestContext, AppError> {
    actor.ok_or_else(|| {
        AppError::authentication("This command needs an acting user: pass --as <user-id>")
    })
}

/// Turn an id or slug into a folder id. Slugs are looked up without
/// recording a view.
async fn resolve_folder(folders: &FolderService, raw: &str) -> Result<FolderId, AppError> {
    match FolderIdentifier::parse(raw) {
        FolderIdentifier::Id(id) => Ok(id),
        FolderIdentifier::Slug(_) => Ok(folders.resolve(raw).await?.id),
    }
}

fn creator_label(creator: Option<&CreatorProfile>) -> String {
    creator.map(|c| c.label().to_string()).unwrap_or_else(|| "-".to_string())
}

fn print_page(page: PageResponse<FolderWithCounts>, format: OutputFormat) {
    match format {
        OutputFormat::Json => output::print_json(&page),
        OutputFormat::Table => {
            let rows: Vec<FolderRow> = page.items.iter().map(FolderRow::from).collect();
            output::print_list(&rows, format);
            output::print_page_footer(page.page, page.has_more);
        }
    }
}

fn print_link(link: &FolderContent, message: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => output::print_json(link),
        OutputFormat::Table => output::print_success(&format!(
            "{message} (folder: {}, link: {})",
            link.folder_id, link.id
        )),
    }
}

fn print_detail(detail: &FolderDetail, format: OutputFormat) {
    if format == OutputFormat::Json {
        output::print_json(detail);
        return;
    }

    let folder = &detail.folder;
    output::print_kv("ID", &folder.id.to_string());
    output::print_kv("Slug", &folder.slug);
    output::print_kv("Label", &folder.label);
    output::print_kv("Description", folder.description.as_deref().unwrap_or("-"));
    output::print_kv("Visibility", folder.visibility.as_str());
    output::print_kv("Creator", &creator_label(detail.creator.as_ref()));
    output::print_kv("Likes", &folder.likes.to_string());
    output::print_kv("Views", &folder.views.to_string());
    output::print_kv("Materials", &detail.material_count.to_string());
    output::print_kv("Nested folders", &detail.nested_folder_count.to_string());

    let mut rows: Vec<ContentRow> = detail
        .materials
        .iter()
        .map(|entry| ContentRow {
            link_id: entry.link_id.to_string(),
            kind: "material".to_string(),
            item_id: entry.material.id.to_string(),
            title: entry.material.title.clone(),
            materials: "-".to_string(),
            added_at: entry.added_at.format("%Y-%m-%d %H:%M").to_string(),
        })
        .collect();
    rows.extend(detail.nested_folders.iter().map(|entry| ContentRow {
        link_id: entry.link_id.to_string(),
        kind: "folder".to_string(),
        item_id: entry.folder.id.to_string(),
        title: entry.folder.label.clone(),
        materials: entry.material_count.to_string(),
        added_at: entry.added_at.format("%Y-%m-%d %H:%M").to_string(),
    }));

    output::print_heading("Contents");
    output::print_list(&rows, OutputFormat::Table);
}

fn print_node(node: &FolderNode, prefix: &str, is_last: bool, is_root: bool) {
    let marker = if node.truncated { " …" } else { "" };
    let line = format!("{} [{} materials]{marker}", node.label, node.material_count);
    if is_root {
        println!("{line}");
    } else {
        let branch = if is_last { "└── " } else { "├── " };
        println!("{prefix}{branch}{line}");
    }

    let child_prefix = if is_root {
        String::new()
    } else if is_last {
        format!("{prefix}    ")
    } else {
        format!("{prefix}│   ")
    };
    for (i, child) in node.children.iter().enumerate() {
        print_node(child, &child_prefix, i + 1 == node.children.len(), false);
    }
}
