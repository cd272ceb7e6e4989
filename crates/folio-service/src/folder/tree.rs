//! Folder tree building over nested-folder links.

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::debug;

use folio_core::error::AppError;
use folio_core::types::FolderId;
use folio_database::FolderStore;
use folio_entity::folder::{Folder, FolderNode, FolderTree};

use super::resolver::FolderIdentifier;

type NodeFuture<'a> = Pin<Box<dyn Future<Output = Result<FolderNode, AppError>> + Send + 'a>>;

/// Builds nested-folder trees for display.
#[derive(Debug, Clone)]
pub struct TreeService {
    /// Folder store.
    store: Arc<dyn FolderStore>,
    /// Depth used when the caller does not ask for one.
    default_max_depth: u32,
}

impl TreeService {
    /// Creates a new tree service.
    pub fn new(store: Arc<dyn FolderStore>, default_max_depth: u32) -> Self {
        Self {
            store,
            default_max_depth,
        }
    }

    /// Builds the tree of folders nested under the folder named by
    /// `id_or_slug`.
    ///
    /// Each folder appears at most once, at the first position reached.
    /// Nodes at `max_depth` are marked truncated when they have children.
    pub async fn get_tree(
        &self,
        id_or_slug: &str,
        max_depth: Option<u32>,
    ) -> Result<FolderTree, AppError> {
        let identifier = FolderIdentifier::parse(id_or_slug);
        let root = match &identifier {
            FolderIdentifier::Id(id) => self.store.find_by_id(*id).await?,
            FolderIdentifier::Slug(slug) => self.store.find_by_slug(slug).await?,
        }
        .ok_or_else(|| AppError::not_found(format!("Folder '{identifier}' not found")))?;

        let max_depth = max_depth
            .unwrap_or(self.default_max_depth)
            .min(self.default_max_depth);
        let mut visited = HashSet::from([root.id]);
        let node = self.build_node(root, 0, max_depth, &mut visited).await?;

        let tree = FolderTree::new(node);
        debug!(
            root_id = %tree.root.id,
            total_folders = tree.total_folders,
            max_depth = max_depth,
            "Folder tree built"
        );
        Ok(tree)
    }

    fn build_node<'a>(
        &'a self,
        folder: Folder,
        depth: u32,
        max_depth: u32,
        visited: &'a mut HashSet<FolderId>,
    ) -> NodeFuture<'a> {
        Box::pin(async move {
            let stats = self.store.get_folder_stats(folder.id).await?;

            let mut children = Vec::new();
            let truncated = depth >= max_depth && stats.nested_folder_count > 0;
            if !truncated {
                for child in self.store.find_nested_children(folder.id).await? {
                    if visited.insert(child.id) {
                        children.push(self.build_node(child, depth + 1, max_depth, visited).await?);
                    }
                }
            }

            Ok(FolderNode {
                id: folder.id,
                label: folder.label,
                slug: folder.slug,
                depth,
                material_count: stats.material_count,
                nested_folder_count: stats.nested_folder_count,
                truncated,
                children,
            })
        })
    }
}
