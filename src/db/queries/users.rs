use chrono::{TimeDelta, Utc};
use sqlx::SqlitePool;

use super::conflict_on_unique;
use crate::db::models::{DbUser, DbUserStats, DbUserSummary};
use crate::db::patch::{UserCreate, UserListQuery};
use crate::error::PanelError;

const USER_COLUMNS: &str = "id, username, password_hash, email, role, avatar, preferences, \
     is_active, last_login, login_attempts, locked_until, created_at, updated_at";

pub(crate) async fn create(pool: &SqlitePool, create: UserCreate) -> Result<i64, PanelError> {
    let now = Utc::now();
    let username = create.username.clone();
    sqlx::query_scalar(
        r#"
        INSERT INTO users (username, password_hash, email, role, avatar, preferences, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(create.username)
    .bind(create.password_hash)
    .bind(create.email)
    .bind(create.role)
    .bind(create.avatar)
    .bind(create.preferences)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await
    .map_err(|e| conflict_on_unique(e, format!("username {username:?} already exists")))
}

pub(crate) async fn get_active_by_username(
    pool: &SqlitePool,
    username: &str,
) -> Result<Option<DbUser>, PanelError> {
    let row = sqlx::query_as::<_, DbUser>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE username = ? AND is_active = 1"
    ))
    .bind(username)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub(crate) async fn get_by_id(pool: &SqlitePool, id: i64) -> Result<Option<DbUser>, PanelError> {
    let row = sqlx::query_as::<_, DbUser>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Whether another account already uses `email`.
pub(crate) async fn email_taken(
    pool: &SqlitePool,
    email: &str,
    exclude_user: Option<i64>,
) -> Result<bool, PanelError> {
    let taken: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM users
            WHERE email = ? AND is_active = 1 AND (? IS NULL OR id != ?)
        )
        "#,
    )
    .bind(email)
    .bind(exclude_user)
    .bind(exclude_user)
    .fetch_one(pool)
    .await?;
    Ok(taken)
}

/// Active users, newest first, with their live session count. Returns the page and the total.
pub(crate) async fn list(
    pool: &SqlitePool,
    query: UserListQuery,
    role: Option<String>,
) -> Result<(Vec<DbUserSummary>, i64), PanelError> {
    let now = Utc::now();
    let rows = sqlx::query_as::<_, DbUserSummary>(
        r#"
        SELECT
            u.id, u.username, u.email, u.role, u.avatar, u.is_active, u.last_login, u.created_at,
            (
                SELECT COUNT(*) FROM user_sessions s
                WHERE s.user_id = u.id AND s.is_active = 1 AND s.expires_at > ?
            ) AS active_sessions
        FROM users u
        WHERE u.is_active = 1 AND (? IS NULL OR u.role = ?)
        ORDER BY u.created_at DESC, u.id DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(now)
    .bind(&role)
    .bind(&role)
    .bind(query.limit)
    .bind(query.offset)
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM users WHERE is_active = 1 AND (? IS NULL OR role = ?)",
    )
    .bind(&role)
    .bind(&role)
    .fetch_one(pool)
    .await?;

    Ok((rows, total))
}

pub(crate) async fn stats(pool: &SqlitePool) -> Result<DbUserStats, PanelError> {
    let now = Utc::now();
    let week_ago = now - TimeDelta::days(7);
    let month_ago = now - TimeDelta::days(30);

    let row = sqlx::query_as::<_, DbUserStats>(
        r#"
        SELECT
            COUNT(*) AS total,
            COALESCE(SUM(CASE WHEN role = 'admin' THEN 1 ELSE 0 END), 0) AS admins,
            COALESCE(SUM(CASE WHEN role = 'user' THEN 1 ELSE 0 END), 0) AS users,
            COALESCE(SUM(CASE WHEN role = 'viewer' THEN 1 ELSE 0 END), 0) AS viewers,
            COALESCE(SUM(CASE WHEN last_login >= ? THEN 1 ELSE 0 END), 0) AS active_last_7_days,
            COALESCE(SUM(CASE WHEN created_at >= ? THEN 1 ELSE 0 END), 0) AS new_last_30_days,
            (
                SELECT COUNT(*) FROM user_sessions
                WHERE is_active = 1 AND expires_at > ?
            ) AS active_sessions
        FROM users
        WHERE is_active = 1
        "#,
    )
    .bind(week_ago)
    .bind(month_ago)
    .bind(now)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// All rows, including deactivated ones.
pub(crate) async fn count(pool: &SqlitePool) -> Result<i64, PanelError> {
    let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;
    Ok(n)
}
