//! diagd Collect - Bounded-time diagnostic collection
//!
//! Provides:
//! - `with_deadline`: deadline wrapper for remote source calls
//! - `AnnotationProvider` / `AttachmentProvider`: the closed set of remote sources
//! - `NonPlatformStore`: client-registered, persisted annotations
//! - `InspectDataBudget`: adaptive size ceiling for the inspect export
//! - `Datastore`: concurrent fan-out and merge under one deadline
//! - `Archive`: compressed snapshot of one collection

pub mod annotations;
pub mod archive;
pub mod attachments;
pub mod budget;
pub mod datastore;
pub mod deadline;

#[cfg(test)]
mod test_support;

pub use annotations::{AnnotationProvider, NonPlatformStore, StoreError};
pub use archive::Archive;
pub use attachments::{AttachmentProvider, StaticAttachments};
pub use budget::{BudgetRecord, InspectDataBudget};
pub use datastore::Datastore;
pub use deadline::with_deadline;
