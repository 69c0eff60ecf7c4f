//! # Recurring Expense Repository
//!
//! Definitions plus monthly entry generation.
//!
//! ## Generation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  generate_monthly_entries(y, m)                                        │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │    active definitions ──┐                                              │
//! │    ids with an entry    ├─► plan_monthly_entries(..) ─► Vec<New..>     │
//! │      for (y, m)       ──┘                                              │
//! │    INSERT .. ON CONFLICT (recurring_expense_id, year, month) DO NOTHING│
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Running it twice for the same period inserts nothing the second time. │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashSet;

use chrono::{Datelike, NaiveDate, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::today;
use printshop_core::money::Money;
use printshop_core::recurring::{
    self, MonthlyExpenseEntry, RecurringExpense, RecurringExpenseInput,
};

const SELECT_DEFINITION: &str = r#"
    SELECT id, name, description, category, amount, frequency, start_date, end_date,
           is_active, auto_generate, next_due_date, created_at, updated_at
    FROM recurring_expenses
"#;

#[derive(Debug, Clone)]
pub struct RecurringExpenseRepository {
    pool: SqlitePool,
}

impl RecurringExpenseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        RecurringExpenseRepository { pool }
    }

    // =========================================================================
    // Definitions
    // =========================================================================

    /// Creates a definition with its schedule refreshed as of today.
    pub async fn create(&self, input: &RecurringExpenseInput) -> DbResult<RecurringExpense> {
        let now = Utc::now();
        let mut definition = RecurringExpense {
            id: 0,
            name: input.name.trim().to_string(),
            description: input.description.clone(),
            category: input.category,
            amount: input.amount,
            frequency: input.frequency,
            start_date: input.start_date,
            end_date: input.end_date,
            is_active: input.is_active,
            auto_generate: input.auto_generate,
            next_due_date: None,
            created_at: now,
            updated_at: now,
        };
        definition.refresh_schedule(today());

        debug!(
            name = %definition.name,
            frequency = ?definition.frequency,
            next_due = ?definition.next_due_date,
            "Creating recurring expense"
        );

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO recurring_expenses (
                name, description, category, amount, frequency, start_date, end_date,
                is_active, auto_generate, next_due_date, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)
            RETURNING id
            "#,
        )
        .bind(&definition.name)
        .bind(&definition.description)
        .bind(definition.category)
        .bind(definition.amount)
        .bind(definition.frequency)
        .bind(definition.start_date)
        .bind(definition.end_date)
        .bind(definition.is_active)
        .bind(definition.auto_generate)
        .bind(definition.next_due_date)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        definition.id = id;
        Ok(definition)
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<RecurringExpense>> {
        let definition = sqlx::query_as(&format!("{SELECT_DEFINITION} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(definition)
    }

    pub async fn get(&self, id: i64) -> DbResult<RecurringExpense> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("RecurringExpense", id))
    }

    pub async fn list(&self) -> DbResult<Vec<RecurringExpense>> {
        let definitions = sqlx::query_as(&format!("{SELECT_DEFINITION} ORDER BY name, id"))
            .fetch_all(&self.pool)
            .await?;
        Ok(definitions)
    }

    pub async fn list_active(&self) -> DbResult<Vec<RecurringExpense>> {
        let definitions =
            sqlx::query_as(&format!("{SELECT_DEFINITION} WHERE is_active = 1 ORDER BY name, id"))
                .fetch_all(&self.pool)
                .await?;
        Ok(definitions)
    }

    /// Replaces the editable fields and refreshes the schedule.
    ///
    /// Returns `(before, after)`.
    pub async fn update(
        &self,
        id: i64,
        input: &RecurringExpenseInput,
    ) -> DbResult<(RecurringExpense, RecurringExpense)> {
        let before = self.get(id).await?;
        let mut after = RecurringExpense {
            name: input.name.trim().to_string(),
            description: input.description.clone(),
            category: input.category,
            amount: input.amount,
            frequency: input.frequency,
            start_date: input.start_date,
            end_date: input.end_date,
            is_active: input.is_active,
            auto_generate: input.auto_generate,
            ..before.clone()
        };
        after.refresh_schedule(today());
        debug!(id, next_due = ?after.next_due_date, "Updating recurring expense");

        let after = self.save(after).await?;
        Ok((before, after))
    }

    /// Flips `is_active`. Reactivating an expired definition is undone by
    /// the schedule refresh on the same save.
    pub async fn toggle_active(&self, id: i64) -> DbResult<(RecurringExpense, RecurringExpense)> {
        let before = self.get(id).await?;
        let mut after = before.clone();
        after.is_active = !after.is_active;
        after.refresh_schedule(today());
        debug!(id, is_active = after.is_active, "Toggling recurring expense");

        let after = self.save(after).await?;
        Ok((before, after))
    }

    /// Deletes a definition and, by cascade, its monthly entries.
    pub async fn delete(&self, id: i64) -> DbResult<RecurringExpense> {
        let existing = self.get(id).await?;
        debug!(id, "Deleting recurring expense");

        sqlx::query("DELETE FROM recurring_expenses WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(existing)
    }

    async fn save(&self, definition: RecurringExpense) -> DbResult<RecurringExpense> {
        let saved = sqlx::query_as(
            r#"
            UPDATE recurring_expenses SET
                name = ?2, description = ?3, category = ?4, amount = ?5, frequency = ?6,
                start_date = ?7, end_date = ?8, is_active = ?9, auto_generate = ?10,
                next_due_date = ?11, updated_at = ?12
            WHERE id = ?1
            RETURNING *
            "#,
        )
        .bind(definition.id)
        .bind(&definition.name)
        .bind(&definition.description)
        .bind(definition.category)
        .bind(definition.amount)
        .bind(definition.frequency)
        .bind(definition.start_date)
        .bind(definition.end_date)
        .bind(definition.is_active)
        .bind(definition.auto_generate)
        .bind(definition.next_due_date)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;
        Ok(saved)
    }

    // =========================================================================
    // Scheduling
    // =========================================================================

    /// Materializes the entries due in (`year`, `month`) that do not exist
    /// yet and returns only the newly created ones.
    pub async fn generate_monthly_entries(
        &self,
        year: i32,
        month: u32,
    ) -> DbResult<Vec<MonthlyExpenseEntry>> {
        let mut tx = self.pool.begin().await?;

        let definitions: Vec<RecurringExpense> =
            sqlx::query_as(&format!("{SELECT_DEFINITION} WHERE is_active = 1"))
                .fetch_all(&mut *tx)
                .await?;

        let existing: Vec<i64> = sqlx::query_scalar(
            "SELECT recurring_expense_id FROM monthly_expense_entries WHERE year = ?1 AND month = ?2",
        )
        .bind(year)
        .bind(month)
        .fetch_all(&mut *tx)
        .await?;
        let already_generated: HashSet<i64> = existing.into_iter().collect();

        let planned = recurring::plan_monthly_entries(&definitions, &already_generated, year, month);
        let now = Utc::now();
        let mut created = Vec::with_capacity(planned.len());

        for entry in planned {
            let inserted: Option<MonthlyExpenseEntry> = sqlx::query_as(
                r#"
                INSERT INTO monthly_expense_entries (
                    recurring_expense_id, year, month, amount, payment_status, due_date,
                    created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
                ON CONFLICT (recurring_expense_id, year, month) DO NOTHING
                RETURNING *
                "#,
            )
            .bind(entry.recurring_expense_id)
            .bind(entry.year)
            .bind(entry.month)
            .bind(entry.amount)
            .bind(entry.payment_status)
            .bind(entry.due_date)
            .bind(now)
            .fetch_optional(&mut *tx)
            .await?;

            if let Some(mut inserted) = inserted {
                inserted.recurring_expense_name = definitions
                    .iter()
                    .find(|d| d.id == inserted.recurring_expense_id)
                    .map(|d| d.name.clone());
                created.push(inserted);
            }
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(year, month, created = created.len(), "Generated monthly expense entries");
        Ok(created)
    }

    /// [`Self::generate_monthly_entries`] for the month containing `today`.
    pub async fn auto_generate_current_month(
        &self,
        today: NaiveDate,
    ) -> DbResult<Vec<MonthlyExpenseEntry>> {
        self.generate_monthly_entries(today.year(), today.month()).await
    }

    /// Sum of active monthly definitions.
    pub async fn monthly_budget(&self) -> DbResult<Money> {
        let definitions = self.list_active().await?;
        Ok(recurring::monthly_budget(&definitions))
    }

    /// Active definitions whose next due date falls within `days` of `today`.
    pub async fn due_soon(&self, today: NaiveDate, days: i64) -> DbResult<Vec<RecurringExpense>> {
        let mut definitions: Vec<RecurringExpense> = self
            .list_active()
            .await?
            .into_iter()
            .filter(|d| d.is_due_within(today, days))
            .collect();
        definitions.sort_by_key(|d| d.next_due_date);
        Ok(definitions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support;
    use printshop_core::recurring::{ExpenseCategory, Frequency};
    use printshop_core::types::PaymentStatus;

    fn input(name: &str, frequency: Frequency, start: NaiveDate, cents: i64) -> RecurringExpenseInput {
        RecurringExpenseInput {
            name: name.to_string(),
            description: None,
            category: ExpenseCategory::Rent,
            amount: Money::from_cents(cents),
            frequency,
            start_date: start,
            end_date: None,
            is_active: true,
            auto_generate: true,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_generation_is_idempotent() {
        let db = test_support::db().await;
        let repo = db.recurring_expenses();
        repo.create(&input("Rent", Frequency::Monthly, date(2024, 1, 5), 50_000_00))
            .await
            .unwrap();
        repo.create(&input("Insurance", Frequency::Quarterly, date(2024, 1, 5), 9_000_00))
            .await
            .unwrap();

        let first = repo.generate_monthly_entries(2024, 4).await.unwrap();
        assert_eq!(first.len(), 2);
        assert!(first.iter().all(|e| e.due_date == date(2024, 4, 30)));
        assert!(first.iter().all(|e| e.recurring_expense_name.is_some()));

        let second = repo.generate_monthly_entries(2024, 4).await.unwrap();
        assert!(second.is_empty());

        let feb = repo.generate_monthly_entries(2024, 2).await.unwrap();
        assert_eq!(feb.len(), 1);
        assert_eq!(feb[0].due_date, date(2024, 2, 29));
        assert_eq!(feb[0].payment_status, PaymentStatus::Unpaid);
    }

    #[tokio::test]
    async fn test_generation_skips_manual_and_inactive() {
        let db = test_support::db().await;
        let repo = db.recurring_expenses();

        let mut manual = input("Cleaning", Frequency::Monthly, date(2024, 1, 1), 1_000_00);
        manual.auto_generate = false;
        repo.create(&manual).await.unwrap();

        let paused = repo
            .create(&input("Internet", Frequency::Monthly, date(2024, 1, 1), 2_000_00))
            .await
            .unwrap();
        repo.toggle_active(paused.id).await.unwrap();

        assert!(repo.generate_monthly_entries(2024, 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_expired_definition_is_deactivated_on_save() {
        let db = test_support::db().await;
        let mut ended = input("Old lease", Frequency::Monthly, date(2020, 1, 1), 10_000_00);
        ended.end_date = Some(date(2020, 6, 30));

        let saved = db.recurring_expenses().create(&ended).await.unwrap();
        assert!(!saved.is_active);
        assert_eq!(saved.next_due_date, None);
    }

    #[tokio::test]
    async fn test_month_end_schedule_and_end_date_boundary() {
        let db = test_support::db().await;
        let repo = db.recurring_expenses();

        // 2020-01-31 → 02-29 → 03-29 → ... → 2021-02-28 → 28th from then on.
        let mut lease = input("Lease", Frequency::Monthly, date(2020, 1, 31), 30_000_00);
        let saved = repo.create(&lease).await.unwrap();
        let next = saved.next_due_date.unwrap();
        assert_eq!(next.day(), 28);
        assert!(next > today());

        lease.end_date = Some(next);
        let (_, kept) = repo.update(saved.id, &lease).await.unwrap();
        assert!(kept.is_active);
        assert_eq!(kept.next_due_date, Some(next));

        lease.end_date = Some(next - chrono::Duration::days(1));
        let (_, ended) = repo.update(saved.id, &lease).await.unwrap();
        assert!(!ended.is_active);
        assert_eq!(ended.next_due_date, None);
    }

    #[tokio::test]
    async fn test_budget_and_due_soon() {
        let db = test_support::db().await;
        let repo = db.recurring_expenses();
        let start = today();
        repo.create(&input("Rent", Frequency::Monthly, start, 50_000_00))
            .await
            .unwrap();
        repo.create(&input("Salary", Frequency::Monthly, start, 80_000_00))
            .await
            .unwrap();
        repo.create(&input("Audit fee", Frequency::Yearly, start, 20_000_00))
            .await
            .unwrap();

        assert_eq!(repo.monthly_budget().await.unwrap().cents(), 130_000_00);

        // Next occurrence is a month out, so a 40-day window catches both
        // monthly definitions but not the yearly one.
        let soon = repo.due_soon(today(), 40).await.unwrap();
        assert_eq!(soon.len(), 2);
        assert!(repo.due_soon(today(), 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_cascades_entries() {
        let db = test_support::db().await;
        let repo = db.recurring_expenses();
        let rent = repo
            .create(&input("Rent", Frequency::Monthly, date(2024, 1, 1), 50_000_00))
            .await
            .unwrap();
        repo.generate_monthly_entries(2024, 1).await.unwrap();
        repo.delete(rent.id).await.unwrap();
        assert!(db.monthly_entries().list_for_month(2024, 1).await.unwrap().is_empty());
    }
}
