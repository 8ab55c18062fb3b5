//! Workflow modules. Each workflow owns its domain types, storage trait,
//! service facade, reporting projections, and HTTP router.

pub mod issuance;
