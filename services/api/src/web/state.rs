//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use campus_core::ports::DatabaseService;
use campus_core::service::ActivityService;
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Direct port access for the auth endpoints.
    pub db: Arc<dyn DatabaseService>,
    pub service: ActivityService,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: Arc<dyn DatabaseService>, config: Arc<Config>) -> Self {
        Self {
            service: ActivityService::new(db.clone()),
            db,
            config,
        }
    }
}
