//! Railwatch Server - HTTP commands in, WebSocket events out.
//!
//! ```text
//!  dashboard ──POST──► routes ──► RailEngine ──► BroadcastHub
//!                                                    │
//!  dashboard ◄──WS text frames── ws::observe ◄───────┘
//! ```

pub mod config;
pub mod routes;
pub mod ws;

pub use config::ServerArgs;
pub use routes::{create_router, ApiError, ApiResponse, AppState};
