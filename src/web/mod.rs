//! Web server module
//!
//! JSON API under `/api/v1` for search, comparison, health and stats.

mod handlers;
mod middleware;
mod response;
mod routes;
mod state;

pub use middleware::DEVICE_ID_HEADER;
pub use response::{ApiError, Envelope, ErrorBody};
pub use routes::create_router;
pub use state::AppState;
