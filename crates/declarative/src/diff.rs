//! Diff computation for resources

use crate::resource::{REPLACE_AND_NOT_DELETE, ResourceDescriptor};
use crate::types::{DiffResult, PlannedChange};
use crate::value::{attributes_equal, clean_attributes};

/// Replace reason when the resource reference changed
pub const REASON_RESOURCE: &str = "resource";

/// Compare prior inputs with desired inputs
///
/// - A changed resource reference always forces replacement, and is then
///   the only reason reported.
/// - Changed attributes with a truthy `replaceAndNotDelete` force
///   replacement for that reason.
/// - Any other attribute change is an in-place update.
///
/// Attributes are compared with `null` members stripped, the same way they
/// are stored in provider state.
pub fn compute_diff(prior: &ResourceDescriptor, desired: &ResourceDescriptor) -> DiffResult {
    if prior.resource != desired.resource {
        return DiffResult::replace(REASON_RESOURCE);
    }

    let before = clean_attributes(prior.attributes.clone(), false);
    let after = clean_attributes(desired.attributes.clone(), false);
    if attributes_equal(&before, &after) {
        return DiffResult::no_change();
    }

    if desired.detach_on_delete() {
        DiffResult::replace(REPLACE_AND_NOT_DELETE)
    } else {
        DiffResult::update()
    }
}

/// Diff summary statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffSummary {
    /// Number of resources to create (or adopt)
    pub creates: usize,
    /// Number of resources to update in place
    pub updates: usize,
    /// Number of resources to replace
    pub replaces: usize,
    /// Number of state entries to delete
    pub deletes: usize,
    /// Number of resources already in the desired state
    pub unchanged: usize,
}

impl DiffSummary {
    /// Create a summary from a list of planned changes
    pub fn from_changes<'a>(changes: impl IntoIterator<Item = &'a PlannedChange>) -> Self {
        let mut summary = Self::default();
        for change in changes {
            summary.add(change);
        }
        summary
    }

    /// Add a planned change to the summary
    pub fn add(&mut self, change: &PlannedChange) {
        match change {
            PlannedChange::Create { .. } => self.creates += 1,
            PlannedChange::Update => self.updates += 1,
            PlannedChange::Replace { .. } => self.replaces += 1,
            PlannedChange::NoChange => self.unchanged += 1,
        }
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.creates + self.updates + self.replaces + self.deletes
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}
