//! Explicit per-request identity.

use gather_types::UserId;

/// Identity of the caller of a core operation.
///
/// Built by the API layer from the bearer token, if any, and passed
/// explicitly into every operation that needs to know who is asking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestContext {
    user_id: Option<UserId>,
}

impl RequestContext {
    /// A context with no authenticated user.
    pub const fn anonymous() -> Self {
        Self { user_id: None }
    }

    /// A context for an authenticated user.
    pub const fn authenticated(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
        }
    }

    /// The authenticated user, if any.
    pub const fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    /// Whether the caller is authenticated.
    pub const fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }
}
