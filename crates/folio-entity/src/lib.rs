//! # folio-entity
//!
//! Domain entity models for Folio. Every struct in this crate represents a
//! database table row, a read model assembled from several tables, or a
//! domain value object. Row entities additionally derive `sqlx::FromRow`.

pub mod folder;
pub mod material;
pub mod user;
