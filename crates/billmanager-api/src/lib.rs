//! HTTP surface for the bill manager.

mod error;
mod routes;
mod state;

pub use error::{ApiError, ErrorDetails};
pub use routes::router;
pub use state::{AppState, DEFAULT_MAX_UPLOAD_BYTES};
