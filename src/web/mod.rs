//! Board web server module.
//!
//! Serves the board UI page and the JSON task API on one axum server.

mod server;
pub mod templates;

pub use server::{BoardServer, build_router, start_server};
