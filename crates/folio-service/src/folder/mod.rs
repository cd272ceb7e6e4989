//! Folder management and tree services.

pub mod resolver;
pub mod service;
pub mod tree;

pub use resolver::FolderIdentifier;
pub use service::{CreateFolderRequest, FolderService};
pub use tree::TreeService;
