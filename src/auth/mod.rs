//! Roles, password hashing, bearer tokens and login throttling.

mod password;
mod roles;
mod throttle;
mod token;

pub use password::{hash_password, verify_password};
pub use roles::Role;
pub use throttle::LoginThrottle;
pub use token::{Claims, TokenSigner, generate_secret};

use serde::Serialize;

use crate::error::PanelError;

/// The caller behind a verified bearer token with a live session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthUser {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
    #[serde(skip)]
    pub session: String,
}

impl AuthUser {
    pub fn require(&self, required: Role) -> Result<(), PanelError> {
        if self.role.permits(required) {
            Ok(())
        } else {
            Err(PanelError::forbidden(format!(
                "role {} required, caller is {}",
                required, self.role
            )))
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
