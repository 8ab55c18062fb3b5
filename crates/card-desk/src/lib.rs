//! Lifecycle core of the card-issuance back office.
//!
//! The crate models the application → batch → card workflow as plain domain
//! types with exhaustively checked status transitions, a service facade over a
//! storage trait, and pure reporting projections. An axum router exposes the
//! boundary so any front end can drive the workflow without re-implementing
//! the transition rules.

pub mod catalog;
pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
