mod error;
pub mod health;
pub mod signaling;

pub use error::ApiError;

// Re-export all handlers for easy route registration
pub use health::{health_handler, health_live_handler, metrics_handler};
pub use signaling::{message, sign_in, sign_out, wait};
