//! End-to-end tests over the full router and an in-memory database.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use printshop_api::{build_router, ApiConfig, AppState};
use printshop_db::{Database, DbConfig};

// =============================================================================
// Harness
// =============================================================================

struct TestApp {
    router: Router,
    token: String,
}

impl TestApp {
    /// Fresh database with one administrator signed in.
    async fn new() -> Self {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let router = build_router(AppState::new(db, ApiConfig::default()));

        let mut app = TestApp {
            router,
            token: String::new(),
        };
        let (status, body) = app
            .send(
                Method::POST,
                "/api/auth/register",
                Some(json!({
                    "username": "admin",
                    "email": "admin@example.com",
                    "password": "correct-horse",
                    "full_name": "Shop Admin"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        assert_eq!(body["user"]["role"], "admin");
        app.token = body["access_token"].as_str().unwrap().to_string();
        app
    }

    async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if !self.token.is_empty() {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", self.token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None).await
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(body)).await
    }
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_health_is_public() {
    let mut app = TestApp::new().await;
    app.token.clear();

    let (status, body) = app.get("/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], true);
}

#[tokio::test]
async fn test_protected_routes_need_a_token() {
    let mut app = TestApp::new().await;
    app.token.clear();

    let (status, body) = app.get("/api/customers").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    app.token = "not-a-jwt".to_string();
    let (status, _) = app.get("/api/customers").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_second_registration_is_a_plain_user() {
    let mut app = TestApp::new().await;
    app.token.clear();

    let (status, body) = app
        .post(
            "/api/auth/register",
            json!({
                "username": "clerk",
                "email": "clerk@example.com",
                "password": "long-enough",
                "full_name": null
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["role"], "user");
    assert!(body["user"].get("password_hash").is_none());

    app.token = body["access_token"].as_str().unwrap().to_string();
    let (status, body) = app.get("/api/users").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_login_and_refresh_rotation() {
    let mut app = TestApp::new().await;
    app.token.clear();

    let (status, body) = app
        .post(
            "/api/auth/login",
            json!({ "username_or_email": "admin@example.com", "password": "correct-horse" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let refresh = body["refresh_token"].as_str().unwrap().to_string();

    let (status, body) = app
        .post("/api/auth/refresh-token", json!({ "refresh_token": refresh }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "Bearer");

    // Issuing a new pair revoked the old refresh token.
    let (status, body) = app
        .post("/api/auth/refresh-token", json!({ "refresh_token": refresh }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    let (status, _) = app
        .post(
            "/api/auth/login",
            json!({ "username_or_email": "admin", "password": "wrong-password" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_customer_crud_is_audited() {
    let app = TestApp::new().await;

    let (status, customer) = app
        .post(
            "/api/customers",
            json!({ "name": "Acme Stationers", "email": "orders@acme.test", "phone": null, "address": null }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = customer["id"].as_i64().unwrap();
    assert!(customer["customer_number"].as_str().unwrap().starts_with("CUST"));

    let (status, updated) = app
        .send(
            Method::PUT,
            &format!("/api/customers/{id}"),
            Some(json!({ "name": "Acme Stationers Ltd", "email": null, "phone": "0771234567", "address": null })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["customer_number"], customer["customer_number"]);

    let (status, _) = app.send(Method::DELETE, &format!("/api/customers/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.get(&format!("/api/customers/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, logs) = app.get(&format!("/api/audit-logs/entity/Customer/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    let actions: Vec<&str> = logs
        .as_array()
        .unwrap()
        .iter()
        .map(|log| log["action"].as_str().unwrap())
        .collect();
    assert_eq!(actions, vec!["delete", "update", "create"]);
    assert_eq!(logs[0]["user_id"], "admin");
    assert_eq!(logs[0]["user_name"], "Shop Admin");
    assert!(logs[2]["old_value"].is_null());
}

#[tokio::test]
async fn test_sublimation_job_is_priced_and_paid() {
    let app = TestApp::new().await;

    let (status, customer) = app
        .post("/api/customers", json!({ "name": "Cafe Luna", "email": null, "phone": null, "address": null }))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    // 10 mugs at 450.00, default 20% markup.
    let (status, job) = app
        .post(
            "/api/sublimation-prints",
            json!({
                "job_number": "SUB-001",
                "job_name": "Logo mugs",
                "job_description": null,
                "customer_id": customer["id"],
                "sublimation_type": "mugs",
                "quantity": 10,
                "unit_price": 45000
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{job}");
    assert_eq!(job["print_type"], "sublimation");
    assert_eq!(job["subtotal"], 450_000);
    assert_eq!(job["total_profit"], 90_000);
    assert_eq!(job["total_amount"], 540_000);
    assert_eq!(job["customer_name"], "Cafe Luna");
    assert_eq!(job["payment_status"], "unpaid");
    let id = job["id"].as_i64().unwrap();

    // Another variant's resource does not see it.
    let (status, _) = app.get(&format!("/api/digital-prints/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, receipt) = app
        .post(
            &format!("/api/sublimation-prints/{id}/payment"),
            json!({ "amount": 200_000, "payment_method": "cash", "reference": null, "payment_type": null }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{receipt}");
    assert_eq!(receipt["job"]["amount_paid"], 200_000);
    assert_eq!(receipt["job"]["balance"], 340_000);
    assert_eq!(receipt["job"]["payment_status"], "partially_paid");

    let (status, logs) = app.get("/api/audit-logs/action/payment_recorded").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(logs.as_array().unwrap().len(), 1);
    assert_eq!(logs[0]["entity_type"], "SublimationPrint");
    assert_eq!(logs[0]["print_job_id"], id);
    assert_eq!(logs[0]["customer_name"], "Cafe Luna");
}

#[tokio::test]
async fn test_other_print_rejects_line_items() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post(
            "/api/other-prints",
            json!({
                "job_number": "OTH-001",
                "job_name": null,
                "job_description": null,
                "customer_id": null,
                "description": "Wedding cards",
                "print_date": "2024-03-01",
                "total_cost": 10_000,
                "customer_remark": null,
                "total_amount": 15_000,
                "expenses": [{ "description": "Envelopes", "amount": 1_000 }]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "BUSINESS_RULE");
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_malformed_body_gets_an_error_body() {
    let app = TestApp::new().await;

    let (status, body) = app.post("/api/customers", json!({ "email": "x@y.z" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = app.get("/api/customers/not-a-number").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_oversized_sublimation_job_is_rejected() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post(
            "/api/sublimation-prints",
            json!({
                "job_number": "SUB-BIG",
                "job_name": null,
                "job_description": null,
                "customer_id": null,
                "sublimation_type": "mugs",
                "quantity": 1_000_000_000_000i64,
                "unit_price": 100_000_000,
                "profit_percentage": 20
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (_, jobs) = app.get("/api/sublimation-prints").await;
    assert_eq!(jobs.as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn test_loan_emi_and_installment_split() {
    let app = TestApp::new().await;

    let (status, loan) = app
        .post(
            "/api/loans",
            json!({
                "loan_name": "Press upgrade",
                "principal_amount": 12_000_000,
                "interest_rate": 12,
                "loan_term_months": 12,
                "start_date": "2024-01-15",
                "loan_type": "business",
                "description": null,
                "lender": "City Bank"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{loan}");
    assert_eq!(loan["monthly_payment"], 1_066_185);
    assert_eq!(loan["end_date"], "2025-01-15");
    let loan_id = loan["id"].as_i64().unwrap();

    let (status, payment) = app
        .post(
            "/api/loan-payments",
            json!({
                "loan_id": loan_id,
                "payment_number": 1,
                "amount": 1_066_185,
                "due_date": "2024-02-15",
                "paid_date": "2024-02-15",
                "payment_status": "paid",
                "payment_method": "bank_transfer",
                "transaction_reference": null,
                "notes": null
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{payment}");
    // One month of 1% interest on 120,000.00.
    assert_eq!(payment["interest_component"], 120_000);
    assert_eq!(payment["principal_component"], 946_185);

    let (status, summary) = app.get(&format!("/api/loans/{loan_id}/summary")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["completed_payments"], 1);
    assert_eq!(summary["remaining_payments"], 11);
    assert_eq!(summary["paid_amount"], 1_066_185);
}

#[tokio::test]
async fn test_recurring_generation_is_idempotent() {
    let app = TestApp::new().await;

    let (status, definition) = app
        .post(
            "/api/recurring-expenses",
            json!({
                "name": "Shop rent",
                "description": null,
                "category": "rent",
                "amount": 5_000_000,
                "frequency": "monthly",
                "start_date": "2024-01-01",
                "end_date": null
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{definition}");

    let (status, created) = app.post("/api/recurring-expenses/generate/2024/3", json!({})).await;
    assert_eq!(status, StatusCode::CREATED);
    let created = created.as_array().unwrap().clone();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0]["due_date"], "2024-03-31");
    assert_eq!(created[0]["recurring_expense_name"], "Shop rent");

    let (_, again) = app.post("/api/recurring-expenses/generate/2024/3", json!({})).await;
    assert!(again.as_array().unwrap().is_empty());

    let (status, body) = app.post("/api/recurring-expenses/generate/2024/13", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, totals) = app.get("/api/monthly-expense-entries/summary/2024/3").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(totals["entry_count"], 1);
    assert_eq!(totals["total"], 5_000_000);

    let (_, logs) = app.get("/api/audit-logs/entity-type/MonthlyExpenseEntry").await;
    assert_eq!(logs.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_audit_search_pages() {
    let app = TestApp::new().await;
    for name in ["One", "Two", "Three"] {
        let (status, _) = app
            .post("/api/suppliers", json!({ "name": name, "email": null, "phone": null, "address": null }))
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, page) = app.get("/api/audit-logs?entity_type=Supplier&size=2&page=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total_items"], 3);
    assert_eq!(page["size"], 2);
    assert_eq!(page["items"].as_array().unwrap().len(), 1);
}
