//! # Declarative
//!
//! A provider for declarative reconciliation of remotely hosted resources.
//!
//! Given a desired description of a resource (a reference to its remote
//! collection plus a set of attributes), the provider drives the remote
//! service toward that state through a fixed lifecycle, without keeping any
//! local database of its own.
//!
//! ## Core Concepts
//!
//! - **ResourceDescriptor**: The desired state, a [`ResourceRef`] plus attributes
//! - **ProviderState**: What callers persist between runs (remote id, inputs, last info)
//! - **ReconciliationProvider**: The inspect/diff/read/create/update/delete state machine
//! - **ResourceHandle**: Drives one resource through a full reconciliation cycle
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{
//!     ProviderConfig, ReconciliationProvider, ResourceDescriptor, ResourceHandle,
//! };
//!
//! let provider = ReconciliationProvider::new(
//!     binding,
//!     lookup,
//!     ProviderConfig::default().with_find_before_create(true),
//! );
//!
//! let desired: ResourceDescriptor = serde_json::from_value(serde_json::json!({
//!     "resource": "taskrouter/Workspaces",
//!     "attributes": { "friendlyName": "support" }
//! }))?;
//!
//! let mut handle = ResourceHandle::new("support", &provider);
//! handle.reconcile(desired).await?;
//! println!("remote id: {:?}", handle.remote_id());
//! ```
//!
//! ## Provider Traits
//!
//! The crate uses traits for dependency injection:
//!
//! - [`ApiBinding`]: Maps a resource reference to remote create/fetch/update/remove calls
//! - [`KeyLookup`]: Finds a pre-existing remote object by its identifying attribute
//!
//! Every remote call goes through [`retrykit`], so rate-limited requests are
//! retried with exponential backoff while every other failure surfaces
//! immediately.

pub mod context;
pub mod diff;
pub mod error;
pub mod handle;
pub mod provider;
pub mod resource;
pub mod types;
pub mod value;

#[cfg(test)]
mod testing;

// Re-export main types at crate root
pub use context::{
    ApiBinding, CollectionOps, InstanceOps, KeyLookup, NoLookup, ProviderConfig,
};
pub use diff::{DiffSummary, compute_diff};
pub use error::{Error, ErrorCategory, RemoteError, Result};
pub use handle::{Lifecycle, ReconcileOutcome, ResourceHandle};
pub use provider::ReconciliationProvider;
pub use resource::{Attributes, ResourceDescriptor, ResourceRef};
pub use types::{
    AdoptionNotice, CheckResult, DeleteOutcome, DiffResult, Phase, PlannedChange, ProviderState,
};
pub use retrykit::BackoffConfig;
