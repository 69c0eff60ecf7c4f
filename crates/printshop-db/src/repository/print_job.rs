//! # Print Job Repository
//!
//! One table for all five variants; each variant uses its own subset of the
//! nullable detail columns.
//!
//! ## Persist Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create(record) / update(id, record)                                   │
//! │     │                                                                   │
//! │     ├── resolve customer_id → customer_name      (NotFound if missing) │
//! │     ├── resolve supplier_id → supplier_name      (offset only)         │
//! │     ├── pricing::recalculate(&mut record)        (derived fields)      │
//! │     └── BEGIN                                                          │
//! │           ├── INSERT/UPDATE print_jobs                                 │
//! │           ├── replace print_expenses                                   │
//! │           └── COMMIT                                                   │
//! │                                                                         │
//! │  record_payment(id, payment)                                           │
//! │     └── BEGIN                                                          │
//! │           ├── INSERT job_payments                                      │
//! │           ├── amount_paid = SUM(job_payments.amount)                   │
//! │           ├── pricing::settle → balance, payment_status                │
//! │           └── COMMIT                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool, Transaction};
use tracing::debug;

use crate::error::{DbError, DbResult};
use printshop_core::money::Money;
use printshop_core::pricing;
use printshop_core::print_job::{
    DigitalDetails, DuploDetails, JobPayment, JobPaymentInput, JobRecord, OffsetDetails,
    OtherDetails, PrintDetails, PrintExpense, PrintJob, PrintType, SublimationDetails,
};
use printshop_core::types::{PaymentStatus, Percentage, SublimationType};

const SELECT_JOB: &str = r#"
    SELECT p.*, c.name AS customer_name, s.name AS supplier_name
    FROM print_jobs p
    LEFT JOIN customers c ON c.id = p.customer_id
    LEFT JOIN suppliers s ON s.id = p.supplier_id
"#;

// =============================================================================
// Rows
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct PrintJobRow {
    id: i64,
    print_type: PrintType,
    job_number: String,
    job_name: Option<String>,
    job_description: Option<String>,
    customer_id: Option<i64>,
    customer_name: Option<String>,
    amount_paid: Money,
    expenses_cost: Money,
    total_amount: Money,
    balance: Money,
    payment_status: PaymentStatus,
    material: Option<String>,
    quality: Option<String>,
    square_feet: Option<String>,
    job_type: Option<String>,
    quantity: Option<i64>,
    supplier_id: Option<i64>,
    supplier_name: Option<String>,
    supplier_job_amount: Option<Money>,
    profit_percentage: Option<Percentage>,
    paper_size: Option<String>,
    copies: Option<i64>,
    base_cost: Option<Money>,
    other_expenses: Option<Money>,
    other_expenses_description: Option<String>,
    sublimation_type: Option<SublimationType>,
    unit_price: Option<Money>,
    subtotal: Option<Money>,
    total_profit: Option<Money>,
    description: Option<String>,
    print_date: Option<NaiveDate>,
    total_cost: Option<Money>,
    customer_remark: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct PrintExpenseRow {
    id: i64,
    print_job_id: i64,
    description: String,
    amount: Money,
}

impl PrintJobRow {
    fn into_job(self, expenses: Vec<PrintExpense>) -> DbResult<PrintJob> {
        let corrupt = |reason: &str| DbError::corrupt("print_jobs", format!("job {}: {reason}", self.id));

        let details = match self.print_type {
            PrintType::Digital => PrintDetails::Digital(DigitalDetails {
                material: self.material,
                quality: self.quality,
                square_feet: match self.square_feet.as_deref() {
                    Some(raw) => Some(
                        Decimal::from_str(raw).map_err(|_| corrupt("square_feet is not a number"))?,
                    ),
                    None => None,
                },
            }),
            PrintType::Offset => PrintDetails::Offset(OffsetDetails {
                job_type: self.job_type,
                quantity: self.quantity,
                supplier_id: self.supplier_id,
                supplier_name: self.supplier_name,
                supplier_job_amount: self.supplier_job_amount,
                profit_percentage: self.profit_percentage,
            }),
            PrintType::Duplo => PrintDetails::Duplo(DuploDetails {
                quantity: self.quantity,
                paper_size: self.paper_size,
                copies: self.copies,
                base_cost: self.base_cost,
                other_expenses: self.other_expenses,
                other_expenses_description: self.other_expenses_description,
                profit_percentage: self.profit_percentage,
            }),
            PrintType::Sublimation => PrintDetails::Sublimation(SublimationDetails {
                sublimation_type: self
                    .sublimation_type
                    .ok_or_else(|| corrupt("sublimation_type missing"))?,
                quantity: self.quantity,
                unit_price: self.unit_price,
                profit_percentage: self.profit_percentage,
                other_expenses: self.other_expenses,
                other_expenses_description: self.other_expenses_description,
                subtotal: self.subtotal.unwrap_or_default(),
                total_profit: self.total_profit.unwrap_or_default(),
            }),
            PrintType::Other => PrintDetails::Other(OtherDetails {
                description: self.description.ok_or_else(|| corrupt("description missing"))?,
                print_date: self.print_date.ok_or_else(|| corrupt("print_date missing"))?,
                total_cost: self.total_cost,
                customer_remark: self.customer_remark,
            }),
        };

        Ok(PrintJob {
            id: self.id,
            job: JobRecord {
                job_number: self.job_number,
                job_name: self.job_name,
                job_description: self.job_description,
                customer_id: self.customer_id,
                customer_name: self.customer_name,
                amount_paid: self.amount_paid,
                expenses_cost: self.expenses_cost,
                total_amount: self.total_amount,
                balance: self.balance,
                payment_status: self.payment_status,
                expenses,
                details,
            },
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Flattened detail columns for binding. Unused columns stay `None`.
#[derive(Default)]
struct DetailColumns {
    material: Option<String>,
    quality: Option<String>,
    square_feet: Option<String>,
    job_type: Option<String>,
    quantity: Option<i64>,
    supplier_id: Option<i64>,
    supplier_job_amount: Option<Money>,
    profit_percentage: Option<Percentage>,
    paper_size: Option<String>,
    copies: Option<i64>,
    base_cost: Option<Money>,
    other_expenses: Option<Money>,
    other_expenses_description: Option<String>,
    sublimation_type: Option<SublimationType>,
    unit_price: Option<Money>,
    subtotal: Option<Money>,
    total_profit: Option<Money>,
    description: Option<String>,
    print_date: Option<NaiveDate>,
    total_cost: Option<Money>,
    customer_remark: Option<String>,
}

impl From<&PrintDetails> for DetailColumns {
    fn from(details: &PrintDetails) -> Self {
        match details.clone() {
            PrintDetails::Digital(d) => DetailColumns {
                material: d.material,
                quality: d.quality,
                square_feet: d.square_feet.map(|v| v.to_string()),
                ..Default::default()
            },
            PrintDetails::Offset(d) => DetailColumns {
                job_type: d.job_type,
                quantity: d.quantity,
                supplier_id: d.supplier_id,
                supplier_job_amount: d.supplier_job_amount,
                profit_percentage: d.profit_percentage,
                ..Default::default()
            },
            PrintDetails::Duplo(d) => DetailColumns {
                quantity: d.quantity,
                paper_size: d.paper_size,
                copies: d.copies,
                base_cost: d.base_cost,
                other_expenses: d.other_expenses,
                other_expenses_description: d.other_expenses_description,
                profit_percentage: d.profit_percentage,
                ..Default::default()
            },
            PrintDetails::Sublimation(d) => DetailColumns {
                sublimation_type: Some(d.sublimation_type),
                quantity: d.quantity,
                unit_price: d.unit_price,
                profit_percentage: d.profit_percentage,
                other_expenses: d.other_expenses,
                other_expenses_description: d.other_expenses_description,
                subtotal: Some(d.subtotal),
                total_profit: Some(d.total_profit),
                ..Default::default()
            },
            PrintDetails::Other(d) => DetailColumns {
                description: Some(d.description),
                print_date: Some(d.print_date),
                total_cost: d.total_cost,
                customer_remark: d.customer_remark,
                ..Default::default()
            },
        }
    }
}

/// Aggregate figures over a set of jobs.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct PrintJobSummary {
    pub job_count: i64,
    pub total_amount: Money,
    pub amount_paid: Money,
    pub balance: Money,
    pub expenses_cost: Money,
    pub unpaid_count: i64,
    pub partially_paid_count: i64,
    pub paid_count: i64,
}

// =============================================================================
// Repository
// =============================================================================

#[derive(Debug, Clone)]
pub struct PrintJobRepository {
    pool: SqlitePool,
}

impl PrintJobRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PrintJobRepository { pool }
    }

    /// Prices and inserts a job with its line items.
    pub async fn create(&self, mut record: JobRecord) -> DbResult<PrintJob> {
        self.resolve_references(&mut record).await?;
        pricing::recalculate(&mut record);

        debug!(
            job_number = %record.job_number,
            print_type = ?record.print_type(),
            total = %record.total_amount,
            "Creating print job"
        );

        let now = Utc::now();
        let cols = DetailColumns::from(&record.details);
        let mut tx = self.pool.begin().await?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO print_jobs (
                print_type, job_number, job_name, job_description, customer_id,
                amount_paid, expenses_cost, total_amount, balance, payment_status,
                material, quality, square_feet,
                job_type, quantity, supplier_id, supplier_job_amount, profit_percentage,
                paper_size, copies, base_cost, other_expenses, other_expenses_description,
                sublimation_type, unit_price, subtotal, total_profit,
                description, print_date, total_cost, customer_remark,
                created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5,
                ?6, ?7, ?8, ?9, ?10,
                ?11, ?12, ?13,
                ?14, ?15, ?16, ?17, ?18,
                ?19, ?20, ?21, ?22, ?23,
                ?24, ?25, ?26, ?27,
                ?28, ?29, ?30, ?31,
                ?32, ?32
            )
            RETURNING id
            "#,
        )
        .bind(record.print_type())
        .bind(record.job_number.trim())
        .bind(&record.job_name)
        .bind(&record.job_description)
        .bind(record.customer_id)
        .bind(record.amount_paid)
        .bind(record.expenses_cost)
        .bind(record.total_amount)
        .bind(record.balance)
        .bind(record.payment_status)
        .bind(cols.material)
        .bind(cols.quality)
        .bind(cols.square_feet)
        .bind(cols.job_type)
        .bind(cols.quantity)
        .bind(cols.supplier_id)
        .bind(cols.supplier_job_amount)
        .bind(cols.profit_percentage)
        .bind(cols.paper_size)
        .bind(cols.copies)
        .bind(cols.base_cost)
        .bind(cols.other_expenses)
        .bind(cols.other_expenses_description)
        .bind(cols.sublimation_type)
        .bind(cols.unit_price)
        .bind(cols.subtotal)
        .bind(cols.total_profit)
        .bind(cols.description)
        .bind(cols.print_date)
        .bind(cols.total_cost)
        .bind(cols.customer_remark)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        insert_expenses(&mut tx, id, &record.expenses).await?;
        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        self.get(id).await
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<PrintJob>> {
        let row: Option<PrintJobRow> = sqlx::query_as(&format!("{SELECT_JOB} WHERE p.id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let expenses = self.expenses_for(&[row.id]).await?.remove(&row.id).unwrap_or_default();
                Ok(Some(row.into_job(expenses)?))
            }
            None => Ok(None),
        }
    }

    pub async fn get(&self, id: i64) -> DbResult<PrintJob> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("PrintJob", id))
    }

    /// Fetches a job only if it is of the given variant.
    pub async fn get_typed(&self, id: i64, print_type: PrintType) -> DbResult<PrintJob> {
        match self.get_by_id(id).await? {
            Some(job) if job.print_type() == print_type => Ok(job),
            _ => Err(DbError::not_found(print_type.entity_type(), id)),
        }
    }

    /// All jobs, newest first, optionally of one variant.
    pub async fn list(&self, print_type: Option<PrintType>) -> DbResult<Vec<PrintJob>> {
        let rows: Vec<PrintJobRow> = sqlx::query_as(&format!(
            "{SELECT_JOB} WHERE (?1 IS NULL OR p.print_type = ?1) ORDER BY p.created_at DESC, p.id DESC"
        ))
        .bind(print_type)
        .fetch_all(&self.pool)
        .await?;
        self.hydrate(rows).await
    }

    pub async fn list_by_customer(&self, customer_id: i64) -> DbResult<Vec<PrintJob>> {
        let rows: Vec<PrintJobRow> = sqlx::query_as(&format!(
            "{SELECT_JOB} WHERE p.customer_id = ?1 ORDER BY p.created_at DESC, p.id DESC"
        ))
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;
        self.hydrate(rows).await
    }

    pub async fn list_by_status(&self, status: PaymentStatus) -> DbResult<Vec<PrintJob>> {
        let rows: Vec<PrintJobRow> = sqlx::query_as(&format!(
            "{SELECT_JOB} WHERE p.payment_status = ?1 ORDER BY p.created_at DESC, p.id DESC"
        ))
        .bind(status)
        .fetch_all(&self.pool)
        .await?;
        self.hydrate(rows).await
    }

    /// Re-prices and replaces a job, including its line items.
    ///
    /// The variant cannot change. Returns `(before, after)`.
    pub async fn update(&self, id: i64, mut record: JobRecord) -> DbResult<(PrintJob, PrintJob)> {
        let before = self.get_typed(id, record.print_type()).await?;
        self.resolve_references(&mut record).await?;
        if let Some(paid) = self.recorded_payments_total(id).await? {
            record.amount_paid = paid;
        }
        pricing::recalculate(&mut record);

        debug!(id, total = %record.total_amount, "Updating print job");

        let cols = DetailColumns::from(&record.details);
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE print_jobs SET
                job_number = ?2, job_name = ?3, job_description = ?4, customer_id = ?5,
                amount_paid = ?6, expenses_cost = ?7, total_amount = ?8, balance = ?9,
                payment_status = ?10,
                material = ?11, quality = ?12, square_feet = ?13,
                job_type = ?14, quantity = ?15, supplier_id = ?16,
                supplier_job_amount = ?17, profit_percentage = ?18,
                paper_size = ?19, copies = ?20, base_cost = ?21, other_expenses = ?22,
                other_expenses_description = ?23,
                sublimation_type = ?24, unit_price = ?25, subtotal = ?26, total_profit = ?27,
                description = ?28, print_date = ?29, total_cost = ?30, customer_remark = ?31,
                updated_at = ?32
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(record.job_number.trim())
        .bind(&record.job_name)
        .bind(&record.job_description)
        .bind(record.customer_id)
        .bind(record.amount_paid)
        .bind(record.expenses_cost)
        .bind(record.total_amount)
        .bind(record.balance)
        .bind(record.payment_status)
        .bind(cols.material)
        .bind(cols.quality)
        .bind(cols.square_feet)
        .bind(cols.job_type)
        .bind(cols.quantity)
        .bind(cols.supplier_id)
        .bind(cols.supplier_job_amount)
        .bind(cols.profit_percentage)
        .bind(cols.paper_size)
        .bind(cols.copies)
        .bind(cols.base_cost)
        .bind(cols.other_expenses)
        .bind(cols.other_expenses_description)
        .bind(cols.sublimation_type)
        .bind(cols.unit_price)
        .bind(cols.subtotal)
        .bind(cols.total_profit)
        .bind(cols.description)
        .bind(cols.print_date)
        .bind(cols.total_cost)
        .bind(cols.customer_remark)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM print_expenses WHERE print_job_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        insert_expenses(&mut tx, id, &record.expenses).await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let after = self.get(id).await?;
        Ok((before, after))
    }

    /// Deletes a job; line items and payments go with it.
    pub async fn delete(&self, id: i64) -> DbResult<PrintJob> {
        let existing = self.get(id).await?;
        debug!(id, "Deleting print job");

        sqlx::query("DELETE FROM print_jobs WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(existing)
    }

    /// Records a payment and re-settles the job.
    ///
    /// `amount_paid` becomes the sum of every payment recorded for the job.
    /// Returns `(before, payment, after)`.
    pub async fn record_payment(
        &self,
        id: i64,
        input: &JobPaymentInput,
    ) -> DbResult<(PrintJob, JobPayment, PrintJob)> {
        let before = self.get(id).await?;
        debug!(id, amount = %input.amount, "Recording print job payment");

        let mut tx = self.pool.begin().await?;

        let payment: JobPayment = sqlx::query_as(
            r#"
            INSERT INTO job_payments (print_job_id, amount, payment_method, reference, payment_type, paid_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            RETURNING id, print_job_id, amount, payment_method, reference, payment_type, paid_at
            "#,
        )
        .bind(id)
        .bind(input.amount)
        .bind(input.payment_method)
        .bind(&input.reference)
        .bind(input.payment_type)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        let paid: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount), 0) FROM job_payments WHERE print_job_id = ?1",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        let mut record = before.job.clone();
        record.amount_paid = Money::from_cents(paid);
        pricing::settle(&mut record);

        sqlx::query(
            r#"
            UPDATE print_jobs SET amount_paid = ?2, balance = ?3, payment_status = ?4, updated_at = ?5
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(record.amount_paid)
        .bind(record.balance)
        .bind(record.payment_status)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let after = self.get(id).await?;
        Ok((before, payment, after))
    }

    /// Sum of the recorded payments, `None` when the job has none.
    async fn recorded_payments_total(&self, id: i64) -> DbResult<Option<Money>> {
        let paid: Option<i64> =
            sqlx::query_scalar("SELECT SUM(amount) FROM job_payments WHERE print_job_id = ?1")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        Ok(paid.map(Money::from_cents))
    }

    pub async fn payments(&self, id: i64) -> DbResult<Vec<JobPayment>> {
        let payments = sqlx::query_as(
            r#"
            SELECT id, print_job_id, amount, payment_method, reference, payment_type, paid_at
            FROM job_payments
            WHERE print_job_id = ?1
            ORDER BY paid_at, id
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        Ok(payments)
    }

    /// Totals over all jobs, or over one variant.
    pub async fn summary(&self, print_type: Option<PrintType>) -> DbResult<PrintJobSummary> {
        let summary = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) AS job_count,
                COALESCE(SUM(total_amount), 0) AS total_amount,
                COALESCE(SUM(amount_paid), 0) AS amount_paid,
                COALESCE(SUM(balance), 0) AS balance,
                COALESCE(SUM(expenses_cost), 0) AS expenses_cost,
                COALESCE(SUM(payment_status = 'unpaid'), 0) AS unpaid_count,
                COALESCE(SUM(payment_status = 'partially_paid'), 0) AS partially_paid_count,
                COALESCE(SUM(payment_status = 'paid'), 0) AS paid_count
            FROM print_jobs
            WHERE (?1 IS NULL OR print_type = ?1)
            "#,
        )
        .bind(print_type)
        .fetch_one(&self.pool)
        .await?;
        Ok(summary)
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    /// Fills in the names behind `customer_id` and an offset `supplier_id`.
    async fn resolve_references(&self, record: &mut JobRecord) -> DbResult<()> {
        record.customer_name = match record.customer_id {
            Some(customer_id) => Some(
                sqlx::query_scalar::<_, String>("SELECT name FROM customers WHERE id = ?1")
                    .bind(customer_id)
                    .fetch_optional(&self.pool)
                    .await?
                    .ok_or_else(|| DbError::not_found("Customer", customer_id))?,
            ),
            None => None,
        };

        if let PrintDetails::Offset(details) = &mut record.details {
            details.supplier_name = match details.supplier_id {
                Some(supplier_id) => Some(
                    sqlx::query_scalar::<_, String>("SELECT name FROM suppliers WHERE id = ?1")
                        .bind(supplier_id)
                        .fetch_optional(&self.pool)
                        .await?
                        .ok_or_else(|| DbError::not_found("Supplier", supplier_id))?,
                ),
                None => None,
            };
        }
        Ok(())
    }

    async fn hydrate(&self, rows: Vec<PrintJobRow>) -> DbResult<Vec<PrintJob>> {
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let mut expenses = self.expenses_for(&ids).await?;
        rows.into_iter()
            .map(|row| {
                let items = expenses.remove(&row.id).unwrap_or_default();
                row.into_job(items)
            })
            .collect()
    }

    async fn expenses_for(&self, job_ids: &[i64]) -> DbResult<HashMap<i64, Vec<PrintExpense>>> {
        let mut grouped: HashMap<i64, Vec<PrintExpense>> = HashMap::new();
        if job_ids.is_empty() {
            return Ok(grouped);
        }

        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT id, print_job_id, description, amount FROM print_expenses WHERE print_job_id IN (",
        );
        let mut separated = query.separated(", ");
        for id in job_ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") ORDER BY id");

        let rows: Vec<PrintExpenseRow> = query.build_query_as().fetch_all(&self.pool).await?;
        for row in rows {
            grouped.entry(row.print_job_id).or_default().push(PrintExpense {
                id: Some(row.id),
                description: row.description,
                amount: row.amount,
            });
        }
        Ok(grouped)
    }
}

async fn insert_expenses(
    tx: &mut Transaction<'_, Sqlite>,
    job_id: i64,
    expenses: &[PrintExpense],
) -> DbResult<()> {
    for item in expenses {
        sqlx::query("INSERT INTO print_expenses (print_job_id, description, amount) VALUES (?1, ?2, ?3)")
            .bind(job_id)
            .bind(item.description.trim())
            .bind(item.amount)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support;
    use printshop_core::print_job::PrintDetails;
    use printshop_core::types::{CustomerInput, PaymentMethod, PaymentType};

    fn record(job_number: &str, details: PrintDetails) -> JobRecord {
        JobRecord {
            job_number: job_number.to_string(),
            job_name: Some("Test job".to_string()),
            job_description: None,
            customer_id: None,
            customer_name: None,
            amount_paid: Money::zero(),
            expenses_cost: Money::zero(),
            total_amount: Money::zero(),
            balance: Money::zero(),
            payment_status: PaymentStatus::Unpaid,
            expenses: vec![],
            details,
        }
    }

    fn duplo() -> PrintDetails {
        PrintDetails::Duplo(DuploDetails {
            base_cost: Some(Money::from_cents(10_000)),
            other_expenses: Some(Money::from_cents(2_000)),
            profit_percentage: Some(Percentage::from_whole(15)),
            ..Default::default()
        })
    }

    fn payment(cents: i64) -> JobPaymentInput {
        JobPaymentInput {
            amount: Money::from_cents(cents),
            payment_method: Some(PaymentMethod::Cash),
            reference: None,
            payment_type: Some(PaymentType::Partial),
        }
    }

    #[tokio::test]
    async fn test_create_prices_the_job() {
        let db = test_support::db().await;
        let job = db.print_jobs().create(record("DP-1", duplo())).await.unwrap();

        assert_eq!(job.job.total_amount.cents(), 13_800);
        assert_eq!(job.job.expenses_cost.cents(), 12_000);
        assert_eq!(job.job.balance.cents(), 13_800);
        assert_eq!(job.job.payment_status, PaymentStatus::Unpaid);
    }

    #[tokio::test]
    async fn test_sublimation_defaults_are_persisted() {
        let db = test_support::db().await;
        let details = PrintDetails::Sublimation(SublimationDetails {
            sublimation_type: SublimationType::Mugs,
            quantity: Some(10),
            unit_price: Some(Money::from_cents(500)),
            profit_percentage: None,
            other_expenses: None,
            other_expenses_description: None,
            subtotal: Money::zero(),
            total_profit: Money::zero(),
        });
        let job = db.print_jobs().create(record("SB-1", details)).await.unwrap();

        assert_eq!(job.job.total_amount.cents(), 6_000);
        match &job.job.details {
            PrintDetails::Sublimation(d) => {
                assert_eq!(d.subtotal.cents(), 5_000);
                assert_eq!(d.total_profit.cents(), 1_000);
                assert_eq!(d.profit_percentage, Some(Percentage::from_whole(20)));
            }
            other => panic!("unexpected details: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_line_items_roundtrip_and_cascade() {
        let db = test_support::db().await;
        let repo = db.print_jobs();
        let mut input = record("DG-1", PrintDetails::Digital(DigitalDetails {
            material: Some("vinyl".to_string()),
            quality: None,
            square_feet: Some(Decimal::new(125, 1)),
        }));
        input.total_amount = Money::from_cents(50_000);
        input.expenses = vec![
            PrintExpense { id: None, description: "Ink".to_string(), amount: Money::from_cents(4_000) },
            PrintExpense { id: None, description: "Lamination".to_string(), amount: Money::from_cents(1_000) },
        ];

        let job = repo.create(input).await.unwrap();
        assert_eq!(job.job.expenses.len(), 2);
        assert_eq!(job.job.expenses_cost.cents(), 5_000);
        match &job.job.details {
            PrintDetails::Digital(d) => assert_eq!(d.square_feet, Some(Decimal::new(125, 1))),
            other => panic!("unexpected details: {other:?}"),
        }

        repo.record_payment(job.id, &payment(1_000)).await.unwrap();
        repo.delete(job.id).await.unwrap();

        let leftovers: i64 = sqlx::query_scalar(
            "SELECT (SELECT COUNT(*) FROM print_expenses) + (SELECT COUNT(*) FROM job_payments)",
        )
        .fetch_one(db.pool())
        .await
        .unwrap();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn test_payments_settle_the_job() {
        let db = test_support::db().await;
        let repo = db.print_jobs();
        let job = repo.create(record("DP-2", duplo())).await.unwrap();

        let (_, _, after) = repo.record_payment(job.id, &payment(5_000)).await.unwrap();
        assert_eq!(after.job.amount_paid.cents(), 5_000);
        assert_eq!(after.job.balance.cents(), 8_800);
        assert_eq!(after.job.payment_status, PaymentStatus::PartiallyPaid);

        let (before, _, after) = repo.record_payment(job.id, &payment(8_800)).await.unwrap();
        assert_eq!(before.job.payment_status, PaymentStatus::PartiallyPaid);
        assert_eq!(after.job.balance, Money::zero());
        assert_eq!(after.job.payment_status, PaymentStatus::Paid);
        assert_eq!(repo.payments(job.id).await.unwrap().len(), 2);

        let summary = repo.summary(Some(PrintType::Duplo)).await.unwrap();
        assert_eq!(summary.job_count, 1);
        assert_eq!(summary.paid_count, 1);
        assert_eq!(summary.amount_paid.cents(), 13_800);
    }

    #[tokio::test]
    async fn test_customer_is_resolved_or_not_found() {
        let db = test_support::db().await;
        let repo = db.print_jobs();

        let mut missing = record("DP-3", duplo());
        missing.customer_id = Some(404);
        assert!(matches!(
            repo.create(missing).await,
            Err(DbError::NotFound { .. })
        ));

        let customer = db
            .customers()
            .create(&CustomerInput {
                name: "Ada".to_string(),
                email: None,
                phone: None,
                address: None,
            })
            .await
            .unwrap();
        let mut linked = record("DP-4", duplo());
        linked.customer_id = Some(customer.id);
        let job = repo.create(linked).await.unwrap();
        assert_eq!(job.job.customer_name.as_deref(), Some("Ada"));
        assert_eq!(repo.list_by_customer(customer.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_reprices_and_keeps_variant() {
        let db = test_support::db().await;
        let repo = db.print_jobs();
        let job = repo.create(record("DP-5", duplo())).await.unwrap();

        let mut changed = job.job.clone();
        if let PrintDetails::Duplo(d) = &mut changed.details {
            d.profit_percentage = Some(Percentage::zero());
        }
        let (before, after) = repo.update(job.id, changed).await.unwrap();
        assert_eq!(before.job.total_amount.cents(), 13_800);
        assert_eq!(after.job.total_amount.cents(), 12_000);

        let other = record("OT-1", PrintDetails::Other(OtherDetails {
            description: "Cards".to_string(),
            print_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            total_cost: None,
            customer_remark: None,
        }));
        assert!(matches!(
            repo.update(job.id, other).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_update_keeps_recorded_payments() {
        let db = test_support::db().await;
        let repo = db.print_jobs();
        let job = repo.create(record("DP-6", duplo())).await.unwrap();
        repo.record_payment(job.id, &payment(3_000)).await.unwrap();

        let mut changed = job.job.clone();
        changed.amount_paid = Money::zero();
        let (_, after) = repo.update(job.id, changed).await.unwrap();
        assert_eq!(after.job.amount_paid.cents(), 3_000);
        assert_eq!(after.job.balance.cents(), 10_800);
        assert_eq!(after.job.payment_status, PaymentStatus::PartiallyPaid);
    }

    #[tokio::test]
    async fn test_duplicate_job_number() {
        let db = test_support::db().await;
        let repo = db.print_jobs();
        repo.create(record("DUP", duplo())).await.unwrap();
        let err = repo.create(record("DUP", duplo())).await.unwrap_err();
        assert!(err.is_unique_violation());
    }
}
