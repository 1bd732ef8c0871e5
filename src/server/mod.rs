//! The `GET /status` endpoint and a client for it.

mod remote;
mod routes;

pub use remote::StatusApiClient;
pub use routes::{router, serve, StatusState};
