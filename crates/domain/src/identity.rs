use serde::{Deserialize, Serialize};

use crate::auth::Role;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActorIdentity {
    pub user_id: String,
    pub username: String,
    pub role: Role,
}

impl ActorIdentity {
    pub fn new(user_id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            username: username.into(),
            role: Role::User,
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    /// Owners may always act on their content; admins may moderate anything.
    pub fn can_manage(&self, owner_id: &str) -> bool {
        self.user_id == owner_id || self.role.is_admin()
    }
}
