//! Card-issuance workflow: applications, batches, cards, and reporting.
//!
//! The workflow is modeled as plain domain types with closed status enums,
//! a service facade over the [`IssuanceStore`] trait, pure reporting
//! projections, and a router exposing the boundary. All catalog lookups go
//! through an explicitly passed [`crate::catalog::CatalogSnapshot`].

pub(crate) mod dates;
pub mod domain;
pub mod report;
pub mod repository;
pub mod router;
pub mod service;
pub mod validation;

#[cfg(test)]
mod tests;

pub use domain::{
    Application, ApplicationId, ApplicationStatus, Batch, BatchId, BatchItem, BatchStatus, Card,
    CardEvent, CardId, CardStatus, Client, ClientId, Decision, TransitionError,
};
pub use report::{
    funnel, reject_reasons, sla, volume, Bucket, FunnelReport, ReportSnapshot, RejectReasonCount,
    SlaMetric, SlaPoint, VolumePoint,
};
pub use repository::{IssuanceStore, RepositoryError};
pub use router::{issuance_router, IssuanceState};
pub use service::{
    ApplicationFilter, CardEventRequest, DecisionRequest, IssuanceError, IssuanceService,
    IssueCardsOutcome, NewApplication, NewBatch, NewClient, Page, PageMeta, PageRequest,
};
pub use validation::{FieldError, ValidationError};
