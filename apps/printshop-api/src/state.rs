//! Shared application state.

use std::sync::Arc;

use printshop_core::AuditEvent;
use printshop_db::Database;

use crate::auth::JwtManager;
use crate::config::ApiConfig;
use crate::extract::Actor;

/// Handed to every handler through axum's `State`. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub jwt: Arc<JwtManager>,
    pub config: Arc<ApiConfig>,
}

impl AppState {
    pub fn new(db: Database, config: ApiConfig) -> Self {
        let jwt = JwtManager::new(&config.jwt_secret, config.jwt_access_lifetime_secs);
        AppState {
            db,
            jwt: Arc::new(jwt),
            config: Arc::new(config),
        }
    }

    /// Hands an event to the audit writer, stamped with the caller's
    /// identity and request metadata. Runs after the business write has
    /// committed and never fails.
    pub async fn audit(&self, actor: &Actor, event: AuditEvent) {
        self.db.audit_writer().record(actor.stamp(event)).await;
    }
}
