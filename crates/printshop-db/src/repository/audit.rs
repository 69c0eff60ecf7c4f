//! # Audit Log Writer and Queries
//!
//! ## Isolation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  business write ──► COMMIT                                             │
//! │                        │                                                │
//! │                        ▼                                                │
//! │  AuditLogWriter::record(event)                                         │
//! │     ├── snapshot failed?  error! and drop                              │
//! │     ├── BEGIN ─ INSERT audit_logs ─ COMMIT   (own transaction)        │
//! │     └── any DbError?      error! and drop                              │
//! │                                                                         │
//! │  record() returns (), so nothing can roll back the business write.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Records are never updated or deleted.
//!
//! ## Read-time Enrichment
//! - `user_name`: full name (or username) of the user whose id or username
//!   matches the stored actor
//! - `print_job_id` / `customer_name`: taken from the live print job for
//!   print-job entity types, falling back to what was stored at write time

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, error};

use crate::error::{DbError, DbResult};
use printshop_core::audit::{AuditAction, AuditEvent, AuditFilter, AuditLog};
use printshop_core::types::Page;

const SELECT_AUDIT: &str = r#"
    SELECT a.id, a.entity_type, a.entity_id, a.action, a.timestamp, a.user_id,
           a.old_value, a.new_value, a.changes, a.ip_address, a.user_agent,
           COALESCE(pj.id, a.print_job_id) AS print_job_id,
           COALESCE(c.name, a.customer_name) AS customer_name,
           (SELECT COALESCE(u.full_name, u.username) FROM users u
             WHERE CAST(u.id AS TEXT) = a.user_id OR u.username = a.user_id
             LIMIT 1) AS user_name
    FROM audit_logs a
    LEFT JOIN print_jobs pj
           ON pj.id = a.entity_id
          AND pj.print_type = CASE a.entity_type
                WHEN 'DigitalPrint' THEN 'digital'
                WHEN 'OffsetPrint' THEN 'offset'
                WHEN 'DuploPrint' THEN 'duplo'
                WHEN 'SublimationPrint' THEN 'sublimation'
                WHEN 'OtherPrint' THEN 'other'
              END
    LEFT JOIN customers c ON c.id = pj.customer_id
"#;

const ORDER_NEWEST_FIRST: &str = " ORDER BY a.timestamp DESC, a.id DESC";

// =============================================================================
// Writer
// =============================================================================

/// Commits audit events independently of the operation that caused them.
#[derive(Debug, Clone)]
pub struct AuditLogWriter {
    pool: SqlitePool,
}

impl AuditLogWriter {
    pub fn new(pool: SqlitePool) -> Self {
        AuditLogWriter { pool }
    }

    /// Persists one event. Never fails from the caller's point of view.
    pub async fn record(&self, event: AuditEvent) {
        if let Some(failure) = event.snapshot_failure() {
            error!(
                entity_type = %event.entity_type,
                entity_id = event.entity_id,
                action = ?event.action,
                error = %failure,
                "Dropping audit record: snapshot failed"
            );
            return;
        }

        match self.insert(&event).await {
            Ok(id) => debug!(
                id,
                entity_type = %event.entity_type,
                entity_id = event.entity_id,
                action = ?event.action,
                "Audit record written"
            ),
            Err(err) => error!(
                entity_type = %event.entity_type,
                entity_id = event.entity_id,
                action = ?event.action,
                error = %err,
                "Failed to write audit record"
            ),
        }
    }

    async fn insert(&self, event: &AuditEvent) -> DbResult<i64> {
        let mut tx = self.pool.begin().await?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO audit_logs (
                entity_type, entity_id, action, timestamp, user_id, old_value, new_value,
                changes, ip_address, user_agent, print_job_id, customer_name
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            RETURNING id
            "#,
        )
        .bind(&event.entity_type)
        .bind(event.entity_id)
        .bind(event.action)
        .bind(Utc::now())
        .bind(&event.actor)
        .bind(event.old_snapshot())
        .bind(event.new_snapshot())
        .bind(event.summary())
        .bind(&event.context.ip_address)
        .bind(&event.context.user_agent)
        .bind(event.print_job_id)
        .bind(&event.customer_name)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        Ok(id)
    }
}

// =============================================================================
// Queries
// =============================================================================

/// Read side of the audit trail. Every listing is newest first.
#[derive(Debug, Clone)]
pub struct AuditLogRepository {
    pool: SqlitePool,
}

impl AuditLogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        AuditLogRepository { pool }
    }

    pub async fn get(&self, id: i64) -> DbResult<AuditLog> {
        let log: Option<AuditLog> = sqlx::query_as(&format!("{SELECT_AUDIT} WHERE a.id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        log.ok_or_else(|| DbError::not_found("AuditLog", id))
    }

    /// History of one entity.
    pub async fn by_entity(&self, entity_type: &str, entity_id: i64) -> DbResult<Vec<AuditLog>> {
        self.filtered(&AuditFilter {
            entity_type: Some(entity_type.to_string()),
            entity_id: Some(entity_id),
            ..Default::default()
        })
        .await
    }

    pub async fn by_entity_type(&self, entity_type: &str) -> DbResult<Vec<AuditLog>> {
        self.filtered(&AuditFilter {
            entity_type: Some(entity_type.to_string()),
            ..Default::default()
        })
        .await
    }

    pub async fn by_user(&self, user_id: &str) -> DbResult<Vec<AuditLog>> {
        self.filtered(&AuditFilter {
            user_id: Some(user_id.to_string()),
            ..Default::default()
        })
        .await
    }

    pub async fn by_action(&self, action: AuditAction) -> DbResult<Vec<AuditLog>> {
        self.filtered(&AuditFilter {
            action: Some(action),
            ..Default::default()
        })
        .await
    }

    /// Records with `from <= timestamp <= to`.
    pub async fn between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> DbResult<Vec<AuditLog>> {
        self.filtered(&AuditFilter {
            from: Some(from),
            to: Some(to),
            ..Default::default()
        })
        .await
    }

    /// One page of the records matching `filter`. `page` is zero-based.
    pub async fn search(&self, filter: &AuditFilter, page: u32, size: u32) -> DbResult<Page<AuditLog>> {
        let mut count: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT COUNT(*) FROM audit_logs a");
        push_filter(&mut count, filter);
        let total_items: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(SELECT_AUDIT);
        push_filter(&mut qb, filter);
        qb.push(ORDER_NEWEST_FIRST);
        qb.push(" LIMIT ").push_bind(i64::from(size));
        qb.push(" OFFSET ").push_bind(i64::from(page) * i64::from(size));
        let items: Vec<AuditLog> = qb.build_query_as().fetch_all(&self.pool).await?;

        Ok(Page {
            items,
            page,
            size,
            total_items,
        })
    }

    async fn filtered(&self, filter: &AuditFilter) -> DbResult<Vec<AuditLog>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(SELECT_AUDIT);
        push_filter(&mut qb, filter);
        qb.push(ORDER_NEWEST_FIRST);
        let logs: Vec<AuditLog> = qb.build_query_as().fetch_all(&self.pool).await?;
        Ok(logs)
    }
}

fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &AuditFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(entity_type) = &filter.entity_type {
        qb.push(" AND a.entity_type = ").push_bind(entity_type.clone());
    }
    if let Some(entity_id) = filter.entity_id {
        qb.push(" AND a.entity_id = ").push_bind(entity_id);
    }
    if let Some(user_id) = &filter.user_id {
        qb.push(" AND a.user_id = ").push_bind(user_id.clone());
    }
    if let Some(action) = filter.action {
        qb.push(" AND a.action = ").push_bind(action);
    }
    if let Some(from) = filter.from {
        qb.push(" AND a.timestamp >= ").push_bind(from);
    }
    if let Some(to) = filter.to {
        qb.push(" AND a.timestamp <= ").push_bind(to);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support;
    use crate::NewUser;
    use chrono::Duration;
    use printshop_core::audit::RequestContext;
    use printshop_core::money::Money;
    use printshop_core::print_job::{JobRecord, PrintDetails};
    use printshop_core::types::{CustomerInput, PaymentStatus, UserRole};
    use serde::{Serialize, Serializer};

    #[derive(Serialize)]
    struct Snapshot {
        name: &'static str,
    }

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("nope"))
        }
    }

    #[tokio::test]
    async fn test_create_then_delete_are_independent_records() {
        let db = test_support::db().await;
        let writer = db.audit_writer();

        writer
            .record(
                AuditEvent::new("Customer", 7, AuditAction::Create)
                    .new_value(&Snapshot { name: "Ada" })
                    .actor(Some("admin".to_string()))
                    .context(RequestContext::new(Some("203.0.113.9"), None, Some("curl/8"))),
            )
            .await;
        writer
            .record(
                AuditEvent::new("Customer", 7, AuditAction::Delete)
                    .old_value(&Snapshot { name: "Ada" })
                    .actor(Some("admin".to_string())),
            )
            .await;

        let history = db.audit_logs().by_entity("Customer", 7).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].action, AuditAction::Delete);
        assert_eq!(history[0].old_value.as_deref(), Some(r#"{"name":"Ada"}"#));
        assert_eq!(history[0].new_value, None);
        assert_eq!(history[1].action, AuditAction::Create);
        assert_eq!(history[1].changes.as_deref(), Some("Entity created"));
        assert_eq!(history[1].ip_address.as_deref(), Some("203.0.113.9"));
        assert_eq!(history[1].user_agent.as_deref(), Some("curl/8"));
    }

    #[tokio::test]
    async fn test_snapshot_failure_drops_only_the_record() {
        let db = test_support::db().await;
        db.audit_writer()
            .record(AuditEvent::new("Customer", 1, AuditAction::Update).new_value(&Unserializable))
            .await;
        assert!(db.audit_logs().by_entity_type("Customer").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_is_swallowed() {
        let db = test_support::db().await;
        let writer = db.audit_writer();
        db.close().await;
        writer
            .record(AuditEvent::new("Loan", 1, AuditAction::Create).new_value(&Snapshot { name: "x" }))
            .await;
    }

    #[tokio::test]
    async fn test_user_name_resolution() {
        let db = test_support::db().await;
        let user = db
            .users()
            .create(&NewUser {
                username: "grace".to_string(),
                email: "grace@example.com".to_string(),
                full_name: Some("Grace Hopper".to_string()),
                role: UserRole::Admin,
                password_hash: "hash".to_string(),
            })
            .await
            .unwrap();
        let writer = db.audit_writer();
        for actor in [user.id.to_string(), "grace".to_string(), "ghost".to_string()] {
            writer
                .record(AuditEvent::new("Loan", 3, AuditAction::Update).actor(Some(actor)))
                .await;
        }

        let logs = db.audit_logs().by_entity("Loan", 3).await.unwrap();
        let names: Vec<Option<&str>> = logs.iter().map(|l| l.user_name.as_deref()).collect();
        assert_eq!(names, vec![None, Some("Grace Hopper"), Some("Grace Hopper")]);
        assert_eq!(db.audit_logs().by_user("grace").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_print_job_enrichment_from_live_record() {
        let db = test_support::db().await;
        let customer = db
            .customers()
            .create(&CustomerInput {
                name: "Acme Cafe".to_string(),
                email: None,
                phone: None,
                address: None,
            })
            .await
            .unwrap();
        let job = db
            .print_jobs()
            .create(JobRecord {
                job_number: "DP-1".to_string(),
                job_name: None,
                job_description: None,
                customer_id: Some(customer.id),
                customer_name: None,
                amount_paid: Money::zero(),
                expenses_cost: Money::zero(),
                total_amount: Money::from_cents(5_000),
                balance: Money::zero(),
                payment_status: PaymentStatus::Unpaid,
                expenses: vec![],
                details: PrintDetails::Digital(Default::default()),
            })
            .await
            .unwrap();

        db.audit_writer()
            .record(AuditEvent::new("DigitalPrint", job.id, AuditAction::Create).new_value(&job))
            .await;
        // Same id under a different variant tag must not pick up the job.
        db.audit_writer()
            .record(AuditEvent::new("OffsetPrint", job.id, AuditAction::Create))
            .await;

        let digital = db.audit_logs().by_entity("DigitalPrint", job.id).await.unwrap();
        assert_eq!(digital[0].print_job_id, Some(job.id));
        assert_eq!(digital[0].customer_name.as_deref(), Some("Acme Cafe"));

        let offset = db.audit_logs().by_entity("OffsetPrint", job.id).await.unwrap();
        assert_eq!(offset[0].print_job_id, None);
    }

    #[tokio::test]
    async fn test_paginated_search() {
        let db = test_support::db().await;
        let writer = db.audit_writer();
        for id in 1..=5 {
            writer
                .record(AuditEvent::new("Supplier", id, AuditAction::Create))
                .await;
        }
        writer
            .record(AuditEvent::new("Supplier", 1, AuditAction::Update))
            .await;

        let filter = AuditFilter {
            entity_type: Some("Supplier".to_string()),
            action: Some(AuditAction::Create),
            ..Default::default()
        };
        let page = db.audit_logs().search(&filter, 1, 2).await.unwrap();
        assert_eq!(page.total_items, 5);
        assert_eq!(page.total_pages(), 3);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].entity_id, 3);

        let everything = db.audit_logs().search(&AuditFilter::default(), 0, 50).await.unwrap();
        assert_eq!(everything.total_items, 6);

        let now = Utc::now();
        let window = db
            .audit_logs()
            .between(now - Duration::minutes(1), now + Duration::minutes(1))
            .await
            .unwrap();
        assert_eq!(window.len(), 6);
        assert_eq!(db.audit_logs().by_action(AuditAction::Update).await.unwrap().len(), 1);
    }
}
