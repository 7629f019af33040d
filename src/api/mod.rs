//! Resolver HTTP API
//!
//! Exposes `POST /resolve-game` for clients and a few read-only contract views.

pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;

pub use handlers::AppState;
pub use server::{init_tracing, ApiServer};
