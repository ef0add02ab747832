//! Axum HTTP gateway.
//!
//! Accepts video submissions, stores the original, enqueues the
//! compression job, and serves history, download, and delete
//! operations over the resulting records.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod submission;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
