//! Accounts, sessions and logins on top of the DB actor.

mod preferences;
mod validation;

pub use preferences::{default_avatar, default_preferences, merge_preferences};

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{
    AuthUser, LoginThrottle, Role, TokenSigner, hash_password, verify_password,
};
use crate::config::AuthConfig;
use crate::db::{
    DbActorHandle, DbLogEntry, DbSession, DbUser, DbUserStats, DbUserSummary, LogCreate,
    SessionCreate, UserCreate, UserListQuery, UserPatch,
};
use crate::error::{PanelError, TokenError};
use crate::plugins::{PluginManager, hooks};

/// Name of the account created on first start; it cannot be deleted.
pub const BOOTSTRAP_ADMIN: &str = "admin";

const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub password: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub avatar: Option<String>,
    pub preferences: Option<Value>,
}

/// Account as returned to clients.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UserView {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub role: String,
    pub avatar: Option<String>,
    pub preferences: Value,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DbUser> for UserView {
    fn from(user: DbUser) -> Self {
        let preferences = serde_json::from_str(&user.preferences).unwrap_or_else(|_| json!({}));
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
            avatar: user.avatar,
            preferences,
            is_active: user.is_active,
            last_login: user.last_login,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserView,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub pages: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserPage {
    pub users: Vec<DbUserSummary>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct ProfileStats {
    pub total_sessions: usize,
    pub active_sessions: usize,
    pub last_activity: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    #[serde(flatten)]
    pub user: UserView,
    pub sessions: Vec<DbSession>,
    pub recent_logs: Vec<DbLogEntry>,
    pub stats: ProfileStats,
}

/// Client details recorded with sessions and audit entries.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Clone)]
pub struct UserService {
    db: DbActorHandle,
    signer: TokenSigner,
    throttle: LoginThrottle,
    plugins: PluginManager,
    bcrypt_cost: u32,
    max_login_attempts: i64,
    lockout: TimeDelta,
    bootstrap_password: String,
}

fn parse_role(role: &str) -> Result<Role, PanelError> {
    role.parse()
}

impl UserService {
    pub fn new(
        db: DbActorHandle,
        signer: TokenSigner,
        cfg: &AuthConfig,
        plugins: PluginManager,
    ) -> Self {
        let lockout_secs = i64::try_from(cfg.lockout_secs).unwrap_or(i64::MAX / 1000);
        Self {
            db,
            signer,
            throttle: LoginThrottle::new(
                cfg.max_login_attempts,
                Duration::from_secs(cfg.lockout_secs),
            ),
            plugins,
            bcrypt_cost: cfg.bcrypt_cost,
            max_login_attempts: i64::from(cfg.max_login_attempts.max(1)),
            lockout: TimeDelta::try_seconds(lockout_secs).unwrap_or(TimeDelta::days(365)),
            bootstrap_password: cfg.bootstrap_admin_password.clone(),
        }
    }

    pub fn signer(&self) -> &TokenSigner {
        &self.signer
    }

    async fn audit(&self, entry: LogCreate) {
        if let Err(e) = self.db.insert_log(entry).await {
            warn!(error = %e, "failed to persist audit log");
        }
    }

    async fn find(&self, username: &str) -> Result<DbUser, PanelError> {
        self.db
            .get_user_by_username(username)
            .await?
            .ok_or_else(|| PanelError::not_found(format!("user {username:?}")))
    }

    /// Creates the default admin when the users table is empty. Returns whether it did.
    pub async fn bootstrap_admin(&self) -> Result<bool, PanelError> {
        if self.db.count_users().await? > 0 {
            return Ok(false);
        }
        let input = NewUser {
            username: BOOTSTRAP_ADMIN.to_string(),
            password: self.bootstrap_password.clone(),
            email: None,
            role: Some(Role::Admin.to_string()),
            avatar: None,
        };
        self.create_user(input, Role::Admin).await?;
        warn!(
            username = BOOTSTRAP_ADMIN,
            "bootstrap admin created; change its password"
        );
        Ok(true)
    }

    pub async fn create_user(
        &self,
        input: NewUser,
        creator_role: Role,
    ) -> Result<UserView, PanelError> {
        validation::username(&input.username)?;
        validation::password(&input.password)?;
        if let Some(email) = input.email.as_deref() {
            validation::email(email)?;
        }
        if let Some(avatar) = input.avatar.as_deref() {
            validation::avatar(avatar)?;
        }
        let role = match input.role.as_deref() {
            Some(role) => parse_role(role)?,
            None => Role::default(),
        };
        if role == Role::Admin && creator_role != Role::Admin {
            return Err(PanelError::forbidden("only admins may create admins"));
        }

        if self.db.get_user_by_username(&input.username).await?.is_some() {
            return Err(PanelError::Conflict(format!(
                "username {:?} already exists",
                input.username
            )));
        }
        if let Some(email) = input.email.as_deref()
            && self.db.email_taken(email, None).await?
        {
            return Err(PanelError::Conflict(format!(
                "email {email:?} is already registered"
            )));
        }

        let password_hash = hash_password(input.password, self.bcrypt_cost).await?;
        let avatar = input
            .avatar
            .unwrap_or_else(|| default_avatar(&input.username));
        let id = self
            .db
            .create_user(UserCreate {
                username: input.username.clone(),
                password_hash,
                email: input.email,
                role: role.to_string(),
                avatar: Some(avatar),
                preferences: default_preferences().to_string(),
            })
            .await?;

        info!(user_id = id, username = %input.username, %role, "user created");
        self.audit(
            LogCreate::new("info", format!("User created: {} ({role})", input.username))
                .context("user_management"),
        )
        .await;

        let user = self
            .db
            .get_user_by_id(id)
            .await?
            .ok_or_else(|| PanelError::UnexpectedError(format!("user {id} vanished")))?;
        Ok(user.into())
    }

    pub async fn login(
        &self,
        username: &str,
        password: &str,
        client: ClientInfo,
    ) -> Result<LoginOutcome, PanelError> {
        if username.is_empty() || password.is_empty() {
            return Err(PanelError::MissingCredentials);
        }
        self.throttle.check(username)?;

        let Some(user) = self.db.get_user_by_username(username).await? else {
            self.login_failed(username, None, &client).await;
            return Err(PanelError::InvalidCredentials);
        };

        let now = Utc::now();
        if let Some(until) = user.locked_until
            && until > now
        {
            return Err(PanelError::AccountLocked { until });
        }

        if !verify_password(password.to_string(), user.password_hash.clone()).await? {
            self.login_failed(username, Some(&user), &client).await;
            return Err(PanelError::InvalidCredentials);
        }

        let role = parse_role(&user.role)?;
        let session = Uuid::new_v4().to_string();
        let (token, expires_at) = self.signer.issue(user.id, &user.username, role, &session)?;
        self.db
            .create_session(SessionCreate {
                user_id: user.id,
                session_token: session,
                ip_address: client.ip.clone(),
                user_agent: client.user_agent.clone(),
                expires_at,
            })
            .await?;
        self.db
            .patch_user(UserPatch {
                id: user.id,
                last_login: Some(now),
                login_attempts: Some(0),
                clear_lock: true,
                ..Default::default()
            })
            .await?;
        self.throttle.clear(username);

        info!(user_id = user.id, username, "user logged in");
        self.audit(
            LogCreate::new("info", format!("User logged in: {username}"))
                .context("authentication")
                .user(user.id)
                .client(client.ip.clone(), client.user_agent),
        )
        .await;
        self.plugins
            .call_hook(
                hooks::USER_LOGIN,
                json!({
                    "user_id": user.id,
                    "username": user.username,
                    "role": role,
                    "ip": client.ip,
                    "at": now,
                }),
            )
            .await;

        let user = self.db.get_user_by_id(user.id).await?.unwrap_or(user);
        Ok(LoginOutcome {
            token,
            expires_at,
            user: user.into(),
        })
    }

    async fn login_failed(&self, username: &str, user: Option<&DbUser>, client: &ClientInfo) {
        let failures = self.throttle.record_failure(username);
        warn!(username, failures, "login failed");

        if let Some(user) = user {
            let attempts = user.login_attempts + 1;
            let locked_until =
                (attempts >= self.max_login_attempts).then(|| Utc::now() + self.lockout);
            let patch = UserPatch {
                id: user.id,
                login_attempts: Some(if locked_until.is_some() { 0 } else { attempts }),
                locked_until,
                ..Default::default()
            };
            if let Err(e) = self.db.patch_user(patch).await {
                warn!(username, error = %e, "failed to record login attempt");
            }
        }

        let mut entry = LogCreate::new("warning", format!("Failed login for {username}"))
            .context("authentication")
            .client(client.ip.clone(), client.user_agent.clone());
        if let Some(user) = user {
            entry = entry.user(user.id);
        }
        self.audit(entry).await;
    }

    pub async fn logout(&self, session: &str, user_id: i64) -> Result<(), PanelError> {
        self.db.end_session(session).await?;
        info!(user_id, "user logged out");
        self.audit(
            LogCreate::new("info", "User logged out")
                .context("authentication")
                .user(user_id),
        )
        .await;
        Ok(())
    }

    /// Resolves a bearer token to its caller, requiring a live session.
    pub async fn verify(&self, token: &str) -> Result<AuthUser, PanelError> {
        let claims = self.signer.verify(token)?;
        let session = self
            .db
            .get_session(&claims.sid)
            .await?
            .ok_or(TokenError::Revoked)?;
        if !session.is_active || session.expires_at <= Utc::now() || session.user_id != claims.sub
        {
            return Err(TokenError::Revoked.into());
        }
        Ok(AuthUser {
            user_id: claims.sub,
            username: claims.username,
            role: claims.role,
            session: claims.sid,
        })
    }

    pub async fn update_user(
        &self,
        username: &str,
        update: UserUpdate,
        updater_role: Role,
    ) -> Result<UserView, PanelError> {
        if let Some(password) = update.password.as_deref() {
            validation::password(password)?;
        }
        if let Some(email) = update.email.as_deref() {
            validation::email(email)?;
        }
        if let Some(avatar) = update.avatar.as_deref() {
            validation::avatar(avatar)?;
        }
        let role = update.role.as_deref().map(parse_role).transpose()?;
        if role.is_some() && updater_role != Role::Admin {
            return Err(PanelError::forbidden("only admins may change roles"));
        }
        if let Some(prefs) = update.preferences.as_ref()
            && !prefs.is_object()
        {
            return Err(PanelError::validation("preferences must be a JSON object"));
        }

        let user = self.find(username).await?;
        if let Some(email) = update.email.as_deref()
            && self.db.email_taken(email, Some(user.id)).await?
        {
            return Err(PanelError::Conflict(format!(
                "email {email:?} is already registered"
            )));
        }

        let password_hash = match update.password {
            Some(password) => Some(hash_password(password, self.bcrypt_cost).await?),
            None => None,
        };
        let role_changed = role.is_some_and(|r| r.as_str() != user.role);
        self.db
            .patch_user(UserPatch {
                id: user.id,
                email: update.email,
                password_hash,
                role: role.map(|r| r.to_string()),
                avatar: update.avatar,
                preferences: update.preferences.map(|p| p.to_string()),
                ..Default::default()
            })
            .await?;
        if role_changed {
            // Tokens carry the role, so sessions issued under the old one are ended.
            self.db.end_user_sessions(user.id).await?;
        }

        info!(username, "user updated");
        self.audit(
            LogCreate::new("info", format!("User updated: {username}"))
                .context("user_management")
                .user(user.id),
        )
        .await;
        self.find(username).await.map(Into::into)
    }

    pub async fn delete_user(&self, username: &str, deleter_role: Role) -> Result<(), PanelError> {
        if deleter_role != Role::Admin {
            return Err(PanelError::forbidden("only admins may delete users"));
        }
        let user = self.find(username).await?;
        if user.username == BOOTSTRAP_ADMIN {
            return Err(PanelError::forbidden(
                "the default admin account cannot be deleted",
            ));
        }

        self.db
            .patch_user(UserPatch {
                id: user.id,
                is_active: Some(false),
                ..Default::default()
            })
            .await?;
        let ended = self.db.end_user_sessions(user.id).await?;

        warn!(username, sessions_ended = ended, "user deleted");
        self.audit(
            LogCreate::new("warning", format!("User deleted: {username}"))
                .context("user_management"),
        )
        .await;
        Ok(())
    }

    pub async fn list_users(
        &self,
        page: u32,
        limit: u32,
        role: Option<&str>,
    ) -> Result<UserPage, PanelError> {
        let role = role.map(parse_role).transpose()?;
        let page = page.max(1);
        let limit = limit.clamp(1, MAX_PAGE_SIZE);
        let query = UserListQuery {
            limit: i64::from(limit),
            offset: i64::from(page - 1) * i64::from(limit),
        };
        let (users, total) = self
            .db
            .list_users(query, role.map(|r| r.to_string()))
            .await?;
        let limit_i = i64::from(limit);
        Ok(UserPage {
            users,
            pagination: Pagination {
                page,
                limit,
                total,
                pages: (total + limit_i - 1) / limit_i,
            },
        })
    }

    pub async fn profile(&self, username: &str) -> Result<UserProfile, PanelError> {
        let user = self.find(username).await?;
        let sessions = self.db.recent_sessions(user.id, 10).await?;
        let recent_logs = self.db.recent_user_logs(user.id, 20).await?;
        let now = Utc::now();
        let stats = ProfileStats {
            total_sessions: sessions.len(),
            active_sessions: sessions
                .iter()
                .filter(|s| s.is_active && s.expires_at > now)
                .count(),
            last_activity: user.last_login,
        };
        Ok(UserProfile {
            user: user.into(),
            sessions,
            recent_logs,
            stats,
        })
    }

    pub async fn update_preferences(
        &self,
        username: &str,
        preferences: Value,
    ) -> Result<Value, PanelError> {
        if !preferences.is_object() {
            return Err(PanelError::validation("preferences must be a JSON object"));
        }
        let user = self.find(username).await?;
        let current: Value = serde_json::from_str(&user.preferences).unwrap_or(Value::Null);
        let merged = merge_preferences(&current, &preferences);
        self.db
            .patch_user(UserPatch {
                id: user.id,
                preferences: Some(merged.to_string()),
                ..Default::default()
            })
            .await?;
        Ok(merged)
    }

    pub async fn stats(&self) -> Result<DbUserStats, PanelError> {
        self.db.user_stats().await
    }

    pub async fn cleanup_expired_sessions(&self) -> Result<u64, PanelError> {
        let expired = self.db.expire_sessions().await?;
        if expired > 0 {
            info!(expired, "expired sessions cleaned up");
        }
        Ok(expired)
    }
}
