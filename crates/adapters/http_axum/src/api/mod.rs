//! JSON REST API handler modules.

#[allow(clippy::missing_errors_doc)]
pub mod accessories;
pub mod sse;

use axum::Router;
use axum::routing::get;

use duolight_app::ports::EventPublisher;

use crate::state::AppState;

/// Build the `/api` sub-router.
pub fn routes<P>() -> Router<AppState<P>>
where
    P: EventPublisher + Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/accessories", get(accessories::list::<P>))
        .route("/accessories/{id}", get(accessories::get::<P>))
        .route(
            "/accessories/{id}/{attribute}",
            get(accessories::read_attribute::<P>).put(accessories::write_attribute::<P>),
        )
        .route("/events", get(sse::stream::<P>))
}
