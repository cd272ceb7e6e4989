//! # folio-database
//!
//! PostgreSQL connection management, schema migrations, and the
//! [`FolderStore`] implementations: [`FolderRepository`] over PostgreSQL
//! and [`MemoryFolderRepository`] held in process memory.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use memory::MemoryFolderRepository;
pub use repositories::FolderRepository;
pub use store::FolderStore;
