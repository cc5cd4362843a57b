//! Shared application state for axum handlers.

use std::sync::Arc;

use duolight_app::event_bus::InProcessEventBus;
use duolight_app::ports::EventPublisher;
use duolight_app::services::bridge::Bridge;

/// Application state shared across all axum handlers.
///
/// Generic over the bridge's event publisher to avoid dynamic dispatch.
/// `Clone` is implemented manually so `P` itself does not need to be
/// `Clone` for the state to be.
pub struct AppState<P> {
    /// Registry of bridged accessories.
    pub bridge: Bridge<P>,
    /// Broadcast bus the SSE stream subscribes to.
    pub event_bus: Arc<InProcessEventBus>,
}

impl<P> Clone for AppState<P> {
    fn clone(&self) -> Self {
        Self {
            bridge: self.bridge.clone(),
            event_bus: Arc::clone(&self.event_bus),
        }
    }
}

impl<P> AppState<P>
where
    P: EventPublisher + Clone + Send + Sync + 'static,
{
    pub fn new(bridge: Bridge<P>, event_bus: Arc<InProcessEventBus>) -> Self {
        Self { bridge, event_bus }
    }
}
