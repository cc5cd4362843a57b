//! Event bus port — push attribute updates to whoever listens.

use std::future::Future;

use duolight_domain::error::DuolightError;
use duolight_domain::event::Event;

/// Publishes domain events to interested subscribers.
pub trait EventPublisher {
    /// Publish an event to all current subscribers.
    fn publish(&self, event: Event) -> impl Future<Output = Result<(), DuolightError>> + Send;
}

impl<T: EventPublisher + Send + Sync> EventPublisher for std::sync::Arc<T> {
    fn publish(&self, event: Event) -> impl Future<Output = Result<(), DuolightError>> + Send {
        (**self).publish(event)
    }
}
