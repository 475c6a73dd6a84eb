//! # carelink-dispute: Dispute Case Lifecycle
//!
//! A dispute case is filed by a complainant against the other party to a
//! booking, reviewed by admins, answered by the parties, and closed by a
//! decision, or by the complainant withdrawing.
//!
//! ## Layers
//!
//! - [`status`]: the pure lifecycle graph. No I/O, no case data.
//! - [`case`]: the [`DisputeCase`] aggregate. Each method validates,
//!   mutates, and appends one hash-chained [`timeline`] entry.
//! - [`store`]: the [`CaseStore`] seam and its in-memory implementation.
//! - [`service`]: [`CaseService`], the read → apply → compare-and-swap loop
//!   every caller goes through.
//!
//! Deciding a case moves money and lives in `carelink-resolution`; this
//! crate only provides the claim, commit, and release steps it uses.

pub mod case;
pub mod error;
pub mod migration;
pub mod model;
pub mod satisfaction;
pub mod service;
pub mod status;
pub mod store;
pub mod timeline;

pub use case::{DisputeCase, NewDispute, PartyView, ResponseInput, StatusChange};
pub use error::DisputeError;
pub use migration::{migrate_document, migrate_documents, MigrationError, MigrationReport};
pub use model::{
    AdminDecision, DecisionKind, DisputeType, Evidence, EvidenceInput, EvidenceKind, InternalNote,
    Party, PartyResponse, PartyRole, PartySide, PendingResolution, Priority, ReconciliationFlag,
    RequestedResolution, Settlement, Severity,
};
pub use satisfaction::Satisfaction;
pub use service::{CasePage, CaseService, CaseServiceConfig};
pub use status::{DisputeStatus, ResponseGate, Transition, Trigger};
pub use store::{CaseFilter, CaseStore, MemoryCaseStore};
pub use timeline::{ChainBreak, TimelineAction, TimelineEntry};
