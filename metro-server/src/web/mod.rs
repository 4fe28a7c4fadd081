//! Web layer for the metro information server.
//!
//! Provides HTTP endpoints for routes, nearby stations, arrivals, crowding
//! and the line list, each as an HTML page or JSON.

mod dto;
mod routes;
mod state;
pub mod templates;

pub use dto::*;
pub use routes::{AppError, create_router};
pub use state::AppState;
pub use templates::*;
