//! Core types for declarative resource reconciliation

use crate::resource::{Attributes, ResourceDescriptor};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// State a caller must persist between reconciliation calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderState {
    /// Remote identifier, assigned once at create (or adoption) time
    pub remote_id: String,
    /// Descriptor the state was last reconciled from
    pub inputs: ResourceDescriptor,
    /// Last remote snapshot (cleaned)
    #[serde(default)]
    pub info: Attributes,
}

/// Result of comparing prior inputs with desired inputs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffResult {
    /// Whether anything needs to change
    pub changed: bool,
    /// Why the change cannot be applied in place (empty for in-place updates)
    pub replace_reasons: BTreeSet<String>,
}

impl DiffResult {
    /// Nothing to do
    pub fn no_change() -> Self {
        Self::default()
    }

    /// In-place update
    pub fn update() -> Self {
        Self {
            changed: true,
            replace_reasons: BTreeSet::new(),
        }
    }

    /// Destroy-then-recreate, for a single reason
    pub fn replace(reason: &str) -> Self {
        Self {
            changed: true,
            replace_reasons: BTreeSet::from([reason.to_string()]),
        }
    }

    /// Check if the change requires replacement
    pub fn requires_replace(&self) -> bool {
        !self.replace_reasons.is_empty()
    }
}

/// Informational annotation: a remote object will be adopted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdoptionNotice {
    /// Identifying attribute value the object was found by
    pub key: String,
    /// Identifier of the found object, when the lookup returned one
    pub remote_id: Option<String>,
    /// Whether the found object already matches the desired attributes
    pub matches: bool,
}

/// Outcome of the inspect phase
#[derive(Debug, Clone, PartialEq)]
pub struct CheckResult {
    /// Descriptor to use for the following phases
    pub inputs: ResourceDescriptor,
    /// Set when create will adopt an existing remote object
    pub adoption: Option<AdoptionNotice>,
}

impl CheckResult {
    /// A check result without annotations
    pub fn new(inputs: ResourceDescriptor) -> Self {
        Self {
            inputs,
            adoption: None,
        }
    }
}

/// What delete did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The remote object was removed
    Removed,
    /// The remote object was left in place
    Detached { reason: String },
}

/// What the next reconciliation of a resource would do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedChange {
    /// No remote object is bound yet
    Create { adoption: Option<AdoptionNotice> },
    /// Update in place
    Update,
    /// Create a new object, then delete the old one
    Replace { reasons: BTreeSet<String> },
    /// Already in the desired state
    NoChange,
}

impl PlannedChange {
    /// Check if the plan represents a change
    pub fn is_change(&self) -> bool {
        !matches!(self, Self::NoChange)
    }
}

/// Phase whose failures are wrapped with their source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Create,
    Update,
    Delete,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Create => "create",
            Phase::Update => "update",
            Phase::Delete => "delete",
        };
        write!(f, "{name}")
    }
}
