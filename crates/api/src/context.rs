use audioforge_core::UserId;

/// Authenticated caller identity, inserted by the auth middleware and
/// consumed by every owner-scoped handler.
#[derive(Debug, Clone, Copy)]
pub struct UserContext {
    user_id: UserId,
}

impl UserContext {
    pub fn new(user_id: UserId) -> Self {
        Self { user_id }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }
}
