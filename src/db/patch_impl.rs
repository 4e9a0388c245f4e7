//! Patch envelopes -> DbPatchable implementations.
//!
//! This sits in the `db` module because it contains SQL/table knowledge.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::db::patch::{AlertRulePatch, DbPatchable, UserPatch};
use crate::error::PanelError;

#[async_trait]
impl DbPatchable for UserPatch {
    async fn apply_patch(&self, pool: &SqlitePool) -> Result<(), PanelError> {
        let updated_at = Utc::now();

        let res = sqlx::query(
            r#"
            UPDATE users
            SET
                email = COALESCE(?, email),
                password_hash = COALESCE(?, password_hash),
                role = COALESCE(?, role),
                avatar = COALESCE(?, avatar),
                preferences = COALESCE(?, preferences),
                is_active = COALESCE(?, is_active),
                last_login = COALESCE(?, last_login),
                login_attempts = COALESCE(?, login_attempts),
                locked_until = CASE WHEN ? THEN NULL ELSE COALESCE(?, locked_until) END,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&self.email)
        .bind(&self.password_hash)
        .bind(&self.role)
        .bind(&self.avatar)
        .bind(&self.preferences)
        .bind(self.is_active)
        .bind(self.last_login)
        .bind(self.login_attempts)
        .bind(self.clear_lock)
        .bind(self.locked_until)
        .bind(updated_at)
        .bind(self.id)
        .execute(pool)
        .await?;

        let affected = res.rows_affected();
        debug!(
            table = "users",
            id = self.id,
            affected,
            password_set = self.password_hash.is_some(),
            role_set = self.role.is_some(),
            is_active_set = self.is_active.is_some(),
            clear_lock = self.clear_lock,
            "db patch applied"
        );

        if affected == 0 {
            return Err(PanelError::not_found(format!("user id={}", self.id)));
        }
        Ok(())
    }
}

#[async_trait]
impl DbPatchable for AlertRulePatch {
    async fn apply_patch(&self, pool: &SqlitePool) -> Result<(), PanelError> {
        let updated_at = Utc::now();

        let res = sqlx::query(
            r#"
            UPDATE alert_rules
            SET
                name = COALESCE(?, name),
                description = COALESCE(?, description),
                metric = COALESCE(?, metric),
                operator = COALESCE(?, operator),
                threshold = COALESCE(?, threshold),
                severity = COALESCE(?, severity),
                enabled = COALESCE(?, enabled),
                notification_channels = COALESCE(?, notification_channels),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&self.name)
        .bind(&self.description)
        .bind(&self.metric)
        .bind(&self.operator)
        .bind(self.threshold)
        .bind(&self.severity)
        .bind(self.enabled)
        .bind(&self.notification_channels)
        .bind(updated_at)
        .bind(self.id)
        .execute(pool)
        .await?;

        let affected = res.rows_affected();
        debug!(
            table = "alert_rules",
            id = self.id,
            affected,
            threshold_set = self.threshold.is_some(),
            enabled_set = self.enabled.is_some(),
            "db patch applied"
        );

        if affected == 0 {
            return Err(PanelError::not_found(format!("alert rule id={}", self.id)));
        }
        Ok(())
    }
}
