// Application state module
// Built once at startup and shared by every connection

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use tokio::sync::{watch, Notify};

use super::types::Config;
use crate::appeal::AppealStore;

/// Application state
pub struct AppState {
    pub config: Config,
    pub appeals: AppealStore,
    /// Connections currently being served
    pub active_connections: AtomicUsize,
    /// Fired once when the server should stop accepting
    pub shutdown: Arc<Notify>,
    /// Flipped to `true` once accepting has stopped; open connections
    /// finish their current request and close
    pub draining: watch::Sender<bool>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let appeals = AppealStore::new(&config.appeals.dir);
        Self {
            config,
            appeals,
            active_connections: AtomicUsize::new(0),
            shutdown: Arc::new(Notify::new()),
            draining: watch::Sender::new(false),
        }
    }
}
