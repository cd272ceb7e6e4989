//! Request context carrying the caller identity supplied by the identity provider.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use folio_core::types::UserId;
use folio_entity::folder::Folder;
use folio_entity::user::UserRole;

/// Context for the current authenticated caller.
///
/// The identity is trusted verbatim: authentication happens upstream, and
/// every ownership comparison in the services uses [`RequestContext::user_id`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// The authenticated user's ID.
    pub user_id: UserId,
    /// The user's role, recorded for logging only.
    pub role: UserRole,
    /// When the request was received.
    pub request_time: DateTime<Utc>,
}

impl RequestContext {
    /// Creates a new request context.
    pub fn new(user_id: UserId, role: UserRole) -> Self {
        Self {
            user_id,
            role,
            request_time: Utc::now(),
        }
    }

    /// Returns whether the caller created `folder`.
    pub fn owns(&self, folder: &Folder) -> bool {
        folder.is_owned_by(self.user_id)
    }
}
