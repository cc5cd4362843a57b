//! # duolight-domain
//!
//! Pure domain model for the duolight BLE lamp bridge.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers and error conventions
//! - Define the **attributes** exposed to the host (on, brightness, hue, saturation)
//! - Define the **lamp state** and the dual-channel reconciliation rules that
//!   map one exposed surface onto the white and color sub-lamps
//! - Convert between the device's RGB wire format and the exposed HSL model
//! - Encode outbound command frames and decode inbound status notifications
//! - Define **events** pushed to the host when an attribute changes
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;

pub mod attribute;
pub mod color;
pub mod event;
pub mod lamp;
pub mod protocol;
