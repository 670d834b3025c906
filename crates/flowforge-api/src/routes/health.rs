//! Liveness/readiness endpoint: status, version, and process uptime.
//! This engine owns no database and talks to no MCP servers, so the
//! response carries neither.

use crate::startup::get_uptime_seconds;
use crate::AppState;
use actix_web::{web, HttpResponse};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
struct HealthStatus {
    status: &'static str,
    version: &'static str,
    uptime_seconds: u64,
}

async fn health_check(_state: web::Data<Arc<AppState>>) -> HttpResponse {
    HttpResponse::Ok().json(HealthStatus {
        status: "healthy",
        version: crate::VERSION,
        uptime_seconds: get_uptime_seconds(),
    })
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check));
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, App};
    use flowforge_core::{EngineConfig, HistoryStore, NodeRegistry};

    #[actix_web::test]
    async fn health_reports_ok() {
        let config = EngineConfig::default();
        let history = HistoryStore::new(&config);
        let registry = NodeRegistry::with_builtins(Arc::new(flowforge_core::nodes::agent::ShellAgentRunner));
        let state = Arc::new(AppState::new(config, registry, history));

        let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(configure)).await;
        let req = test::TestRequest::get().uri("/health").to_request();
        let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(resp["status"], "healthy");
    }
}
