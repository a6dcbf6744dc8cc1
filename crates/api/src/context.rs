use receiptdesk_branches::{User, UserRole};
use receiptdesk_core::UserId;

/// The account a request acts as, resolved from the `x-receiptdesk-user` header.
///
/// Immutable and present on every route behind the actor middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorContext {
    user_id: UserId,
    username: String,
    role: UserRole,
    branch_name: Option<String>,
}

impl ActorContext {
    pub fn from_user(user: &User) -> Self {
        Self {
            user_id: user.id_typed(),
            username: user.username().to_string(),
            role: user.role(),
            branch_name: user.branch_name().map(str::to_string),
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn role(&self) -> UserRole {
        self.role
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn branch_name(&self) -> Option<&str> {
        self.branch_name.as_deref()
    }
}
