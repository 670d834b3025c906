//! REST/SSE server exposing the `run` / `validate` / `history` / `health`
//! surface for the workflow engine. Route wiring and HTTP framing live
//! here; `flowforge-cli`'s `serve` command owns the process and hands
//! this crate a built [`AppState`].
//!
//! Follows an `init_routes` + `HttpServer::new` wiring shape, trimmed of
//! the JWT/rate-limit/OpenAPI/WebSocket surface this engine has no use
//! for.

pub mod routes;
mod startup;
mod state;

pub use state::AppState;

use actix_cors::Cors;
use actix_web::{middleware as actix_middleware, web, App, HttpServer};
use std::io;
use std::sync::Arc;
use tracing::info;

/// Current version of the API server, re-exported for diagnostics.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Bind and run the HTTP server until the process is terminated.
pub async fn serve(state: Arc<AppState>) -> io::Result<()> {
    startup::init_startup_time();
    let bind_addr = format!("{}:{}", state.config.api_host, state.config.api_port);
    info!(%bind_addr, "starting flowforge-api");

    HttpServer::new(move || {
        let cors = Cors::default().allow_any_origin().allow_any_method().allow_any_header().max_age(3600);
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(actix_middleware::Logger::default())
            .wrap(cors)
            .configure(routes::init_routes)
    })
    .bind(bind_addr)?
    .run()
    .await
}
