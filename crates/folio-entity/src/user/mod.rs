//! User-facing entities supplied by the identity provider.

pub mod profile;
pub mod role;

pub use profile::CreatorProfile;
pub use role::UserRole;
