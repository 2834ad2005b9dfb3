//! `docvault-server` exposes document collections, chunk ingestion and
//! filtered retrieval over HTTP. Every route answers with a
//! `{ ok, message, data }` envelope at status 200.

pub mod config;
pub mod error;
pub mod extract;
pub mod response;
pub mod rest;
pub mod server;
pub mod state;
pub mod telemetry;
pub mod tokens;

pub use config::ServerSettings;
pub use error::ApiError;
pub use response::{ApiResponse, Envelope};
pub use rest::app_router;
pub use server::run_server;
pub use state::AppState;
pub use tokens::{HfTokenCounter, TokenCounter};
