use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// HMAC secret for bearer tokens. Empty => a random per-process secret is generated at
    /// startup, which invalidates every token on restart.
    /// TOML: `auth.jwt_secret`.
    #[serde(default)]
    pub jwt_secret: String,

    /// Token and session lifetime.
    /// TOML: `auth.token_ttl_secs`. Default: `86400`.
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,

    /// bcrypt work factor (4..=31).
    /// TOML: `auth.bcrypt_cost`. Default: `12`.
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,

    /// Failed logins per username before the name is locked out.
    /// TOML: `auth.max_login_attempts`. Default: `5`.
    #[serde(default = "default_max_login_attempts")]
    pub max_login_attempts: u32,

    /// TOML: `auth.lockout_secs`. Default: `900`.
    #[serde(default = "default_lockout_secs")]
    pub lockout_secs: u64,

    /// Password for the `admin` account created on an empty user table.
    /// TOML: `auth.bootstrap_admin_password`. Default: `admin123`.
    #[serde(default = "default_bootstrap_admin_password")]
    pub bootstrap_admin_password: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_ttl_secs: default_token_ttl_secs(),
            bcrypt_cost: default_bcrypt_cost(),
            max_login_attempts: default_max_login_attempts(),
            lockout_secs: default_lockout_secs(),
            bootstrap_admin_password: default_bootstrap_admin_password(),
        }
    }
}

fn default_token_ttl_secs() -> u64 {
    24 * 60 * 60
}

fn default_bcrypt_cost() -> u32 {
    12
}

fn default_max_login_attempts() -> u32 {
    5
}

fn default_lockout_secs() -> u64 {
    15 * 60
}

fn default_bootstrap_admin_password() -> String {
    "admin123".to_string()
}
