use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppResult,
    repository::{AuditEntry, AuditRepository},
    state::AppState,
};

/// Audit trail written with plain sqlx against `audit_logs`.
#[derive(Clone)]
pub struct SqlxAuditLog {
    pool: DbPool,
}

impl SqlxAuditLog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditRepository for SqlxAuditLog {
    async fn record(&self, entry: AuditEntry) -> AppResult<()> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO audit_logs (id, actor, action, resource, metadata)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(id)
        .bind(entry.actor)
        .bind(entry.action)
        .bind(entry.resource)
        .bind(entry.metadata)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Best-effort audit; a failed write is logged and never fails the caller.
pub async fn log_audit(
    state: &AppState,
    actor: Option<String>,
    action: &str,
    resource: Option<&str>,
    metadata: Option<Value>,
) {
    let entry = AuditEntry {
        actor,
        action: action.to_string(),
        resource: resource.map(str::to_string),
        metadata,
    };
    if let Err(err) = state.repos.audit.record(entry).await {
        tracing::warn!(error = %err, action, "audit log failed");
    }
}
