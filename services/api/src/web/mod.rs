pub mod activities;
pub mod analytics;
pub mod auth;
pub mod extract;
pub mod middleware;
pub mod protocol;
pub mod rest;
pub mod router;
pub mod state;

// Re-export what the binaries need to assemble the server.
pub use middleware::require_auth;
pub use router::build_router;
pub use state::AppState;
