use std::sync::Arc;

use crate::screening::SessionCoordinator;
use crate::store::ScreeningStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Read access for progress polling; writes go through the coordinator.
    pub store: Arc<dyn ScreeningStore>,
    pub coordinator: Arc<SessionCoordinator>,
}
