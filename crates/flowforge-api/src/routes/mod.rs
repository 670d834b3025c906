//! Route wiring: a `web::scope().configure(...)` composition over the
//! endpoints this engine exposes.

mod events;
mod health;
mod workflows;

use actix_web::web;

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("").configure(health::configure).configure(workflows::configure).configure(events::configure));
}
