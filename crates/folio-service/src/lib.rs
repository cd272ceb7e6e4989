//! # folio-service
//!
//! Business logic service layer for Folio. Services enforce ownership and
//! visibility rules and the acyclic nesting invariant on top of a
//! [`FolderStore`](folio_database::FolderStore).
//!
//! Services follow constructor injection: the store is provided at
//! construction time as an `Arc<dyn FolderStore>`.

pub mod context;
pub mod folder;

pub use context::RequestContext;
pub use folder::{CreateFolderRequest, FolderIdentifier, FolderService, TreeService};
