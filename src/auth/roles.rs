use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::error::PanelError;

/// Account roles, ordered by privilege.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Viewer,
    #[default]
    User,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Viewer, Role::User, Role::Admin];

    fn rank(&self) -> u8 {
        match self {
            Role::Viewer => 1,
            Role::User => 2,
            Role::Admin => 3,
        }
    }

    /// Whether this role may perform an operation that requires `required`.
    pub fn permits(&self, required: Role) -> bool {
        self.rank() >= required.rank()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Viewer => "viewer",
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = PanelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| PanelError::validation(format!("unknown role {s:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hierarchy() {
        assert!(Role::Admin.permits(Role::User));
        assert!(Role::User.permits(Role::Viewer));
        assert!(Role::User.permits(Role::User));
        assert!(!Role::Viewer.permits(Role::User));
        assert!(!Role::User.permits(Role::Admin));
    }

    #[test]
    fn parses_lowercase_names_only() {
        assert_eq!("admin".parse::<Role>().ok(), Some(Role::Admin));
        assert!("Admin".parse::<Role>().is_err());
        assert!("root".parse::<Role>().is_err());
    }
}
