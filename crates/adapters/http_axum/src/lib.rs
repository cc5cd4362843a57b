//! # duolight-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum). This is the host
//! surface of the bridge.
//!
//! ## Routes
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `GET /health` | Liveness probe |
//! | `GET /api/accessories` | Every bridged accessory |
//! | `GET /api/accessories/{id}` | One accessory |
//! | `GET /api/accessories/{id}/{attribute}` | Read `on`, `brightness`, `hue` or `saturation` |
//! | `PUT /api/accessories/{id}/{attribute}` | Set-request, returns the updated accessory |
//! | `GET /api/events` | SSE stream of attribute changes |
//!
//! ## Dependency rule
//! Depends on `duolight-app` (for port traits and services) and
//! `duolight-domain` (for domain types used in request/response mapping).
//! Never leaks axum types into the domain.

pub mod api;
mod error;
pub mod router;
pub mod state;

pub use error::ApiError;
