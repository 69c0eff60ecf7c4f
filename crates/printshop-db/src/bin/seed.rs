//! # Seed Data Generator
//!
//! Populates a development database with a small, realistic print shop.
//!
//! ## Usage
//! ```bash
//! # 40 print jobs (default)
//! cargo run -p printshop-db --bin seed
//!
//! # More jobs
//! cargo run -p printshop-db --bin seed -- --jobs 200
//!
//! # Specify database path
//! cargo run -p printshop-db --bin seed -- --db ./data/printshop.db
//! ```
//!
//! ## Generated Data
//! - Customers and suppliers
//! - One active sublimation price per blank type
//! - Print jobs cycling through all five variants, some partly paid
//! - One business loan with its first three installments
//! - Rent, salary and insurance definitions, plus this month's entries

use chrono::{Datelike, Utc};
use printshop_core::calendar;
use printshop_core::loan::{LoanInput, LoanPaymentInput, LoanStatus, LoanType};
use printshop_core::print_job::{
    DigitalDetails, DuploDetails, JobPaymentInput, JobRecord, OffsetDetails, OtherDetails,
    PrintDetails, PrintExpense, SublimationDetails,
};
use printshop_core::recurring::{ExpenseCategory, Frequency, RecurringExpenseInput};
use printshop_core::types::{
    CustomerInput, PaymentMethod, PaymentStatus, PaymentType, Percentage, SublimationPriceInput,
    SublimationType, SupplierInput,
};
use printshop_core::Money;
use printshop_db::{Database, DbConfig};
use rust_decimal::Decimal;
use std::env;

const CUSTOMERS: &[&str] = &[
    "Blue Lotus Cafe",
    "Harbor Real Estate",
    "St. Mary's School",
    "Green Leaf Pharmacy",
    "City Marathon Club",
    "Northside Dental",
];

const SUPPLIERS: &[&str] = &["Lanka Offset Works", "PaperMart Wholesale", "InkJet Supplies Co"];

const SUBLIMATION_PRICES: &[(SublimationType, i64)] = &[
    (SublimationType::Mugs, 450_00),
    (SublimationType::Cristal, 1_200_00),
    (SublimationType::Glass, 650_00),
    (SublimationType::Bottles, 900_00),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut jobs: usize = 40;
    let mut db_path = String::from("./printshop_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--jobs" | "-j" => {
                if i + 1 < args.len() {
                    jobs = args[i + 1].parse().unwrap_or(40);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Print Shop Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -j, --jobs <N>     Number of print jobs to generate (default: 40)");
                println!("  -d, --db <PATH>    Database file path (default: ./printshop_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Print Shop Seed Data Generator");
    println!("=================================");
    println!("Database: {}", db_path);
    println!("Jobs:     {}", jobs);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.customers().list().await?.len();
    if existing > 0 {
        println!("⚠ Database already has {} customers", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let mut customer_ids = Vec::new();
    for name in CUSTOMERS {
        let customer = db
            .customers()
            .create(&CustomerInput {
                name: name.to_string(),
                email: Some(format!("{}@example.com", slug(name))),
                phone: None,
                address: None,
            })
            .await?;
        customer_ids.push(customer.id);
    }

    let mut supplier_ids = Vec::new();
    for name in SUPPLIERS {
        let supplier = db
            .suppliers()
            .create(&SupplierInput {
                name: name.to_string(),
                email: None,
                phone: None,
                address: None,
            })
            .await?;
        supplier_ids.push(supplier.id);
    }
    println!("✓ {} customers, {} suppliers", customer_ids.len(), supplier_ids.len());

    for (sublimation_type, cents) in SUBLIMATION_PRICES {
        db.sublimation_prices()
            .create(&SublimationPriceInput {
                sublimation_type: *sublimation_type,
                unit_price: Money::from_cents(*cents),
                description: None,
                is_active: true,
            })
            .await?;
    }
    println!("✓ {} sublimation prices", SUBLIMATION_PRICES.len());

    let start = std::time::Instant::now();
    let mut generated = 0;
    for seed in 0..jobs {
        let customer_id = customer_ids[seed % customer_ids.len()];
        let supplier_id = supplier_ids[seed % supplier_ids.len()];
        let record = generate_job(seed, customer_id, supplier_id);
        let job_number = record.job_number.clone();

        let job = match db.print_jobs().create(record).await {
            Ok(job) => job,
            Err(e) => {
                eprintln!("Failed to insert {}: {}", job_number, e);
                continue;
            }
        };
        generated += 1;

        // Every third job gets a deposit of roughly half its total.
        if seed % 3 == 0 && job.job.total_amount.is_positive() {
            let deposit = Money::from_cents(job.job.total_amount.cents() / 2);
            db.print_jobs()
                .record_payment(
                    job.id,
                    &JobPaymentInput {
                        amount: deposit,
                        payment_method: Some(PaymentMethod::Cash),
                        reference: None,
                        payment_type: Some(PaymentType::Partial),
                    },
                )
                .await?;
        }
    }
    println!("✓ Generated {} print jobs in {:?}", generated, start.elapsed());

    let today = Utc::now().date_naive();
    let loan_start = today.with_day(1).unwrap_or(today);
    let loan = db
        .loans()
        .create(
            &LoanInput {
                loan_name: "Offset press financing".to_string(),
                principal_amount: Money::from_cents(1_200_000_00),
                interest_rate: Percentage::from_whole(12),
                loan_term_months: 24,
                start_date: loan_start,
                status: LoanStatus::Active,
                loan_type: LoanType::Business,
                description: None,
                lender: Some("City Bank".to_string()),
            },
            None,
        )
        .await?;
    for n in 1..=3 {
        db.loan_payments()
            .create(&LoanPaymentInput {
                loan_id: loan.id,
                payment_number: n,
                amount: loan.monthly_payment,
                due_date: calendar::add_months(loan.start_date, n as u32),
                paid_date: None,
                payment_status: PaymentStatus::Unpaid,
                payment_method: None,
                transaction_reference: None,
                notes: None,
                late_fee: Money::zero(),
            })
            .await?;
    }
    println!("✓ Loan '{}' with EMI {}", loan.loan_name, loan.monthly_payment);

    let year_start = calendar::first_of_month(today.year(), 1).unwrap_or(today);
    for (name, category, frequency, cents) in [
        ("Shop rent", ExpenseCategory::Rent, Frequency::Monthly, 75_000_00),
        ("Staff salaries", ExpenseCategory::Salary, Frequency::Monthly, 180_000_00),
        ("Fire insurance", ExpenseCategory::Insurance, Frequency::Quarterly, 12_000_00),
    ] {
        db.recurring_expenses()
            .create(&RecurringExpenseInput {
                name: name.to_string(),
                description: None,
                category,
                amount: Money::from_cents(cents),
                frequency,
                start_date: year_start,
                end_date: None,
                is_active: true,
                auto_generate: true,
            })
            .await?;
    }
    let entries = db
        .recurring_expenses()
        .auto_generate_current_month(today)
        .await?;
    println!("✓ {} monthly expense entries for {}", entries.len(), today.format("%B %Y"));

    let summary = db.print_jobs().summary(None).await?;
    println!();
    println!("  Revenue: {}  Collected: {}  Outstanding: {}",
        summary.total_amount, summary.amount_paid, summary.balance);
    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// One job, cycling through the variants by `seed`.
fn generate_job(seed: usize, customer_id: i64, supplier_id: i64) -> JobRecord {
    let quantity = 10 + (seed as i64 * 7) % 90;
    let (prefix, details, expenses, total_amount) = match seed % 5 {
        0 => (
            "DP",
            PrintDetails::Digital(DigitalDetails {
                material: Some("Flex banner".to_string()),
                quality: Some("720 dpi".to_string()),
                square_feet: Some(Decimal::new(quantity * 10 + 5, 1)),
            }),
            vec![expense("Eyelets", 150_00)],
            Money::from_cents(quantity * 120_00),
        ),
        1 => (
            "OP",
            PrintDetails::Offset(OffsetDetails {
                job_type: Some("Leaflets".to_string()),
                quantity: Some(quantity * 100),
                supplier_id: Some(supplier_id),
                supplier_name: None,
                supplier_job_amount: Some(Money::from_cents(quantity * 45_00)),
                profit_percentage: Some(Percentage::from_whole(25)),
            }),
            vec![],
            Money::zero(),
        ),
        2 => (
            "DUP",
            PrintDetails::Duplo(DuploDetails {
                quantity: Some(quantity),
                paper_size: Some("A4".to_string()),
                copies: Some(quantity * 50),
                base_cost: Some(Money::from_cents(quantity * 30_00)),
                other_expenses: Some(Money::from_cents(500_00)),
                other_expenses_description: Some("Stapling".to_string()),
                profit_percentage: Some(Percentage::from_whole(15)),
            }),
            vec![expense("Master roll", 800_00)],
            Money::zero(),
        ),
        3 => (
            "SUB",
            PrintDetails::Sublimation(SublimationDetails {
                sublimation_type: SublimationType::Mugs,
                quantity: Some(quantity),
                unit_price: Some(Money::from_cents(450_00)),
                profit_percentage: Some(Percentage::from_whole(20)),
                other_expenses: None,
                other_expenses_description: None,
                subtotal: Money::zero(),
                total_profit: Money::zero(),
            }),
            vec![],
            Money::zero(),
        ),
        _ => (
            "OTH",
            PrintDetails::Other(OtherDetails {
                description: "Laminated ID cards".to_string(),
                print_date: Utc::now().date_naive(),
                total_cost: Some(Money::from_cents(quantity * 40_00)),
                customer_remark: None,
            }),
            vec![],
            Money::from_cents(quantity * 65_00),
        ),
    };

    JobRecord {
        job_number: format!("{}-{:05}", prefix, seed + 1),
        job_name: Some(format!("Job {}", seed + 1)),
        job_description: None,
        customer_id: Some(customer_id),
        customer_name: None,
        amount_paid: Money::zero(),
        expenses_cost: Money::zero(),
        total_amount,
        balance: Money::zero(),
        payment_status: PaymentStatus::Unpaid,
        expenses,
        details,
    }
}

fn expense(description: &str, cents: i64) -> PrintExpense {
    PrintExpense {
        id: None,
        description: description.to_string(),
        amount: Money::from_cents(cents),
    }
}

fn slug(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase()
}
