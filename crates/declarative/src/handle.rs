//! Caller-facing handle for one resource
//!
//! A [`ResourceHandle`] binds one logical resource to a provider and runs its
//! phases strictly in order: inspect, then diff, then exactly one of
//! create, update or replace.

use crate::context::{ApiBinding, KeyLookup};
use crate::error::Result;
use crate::provider::ReconciliationProvider;
use crate::resource::{Attributes, ResourceDescriptor};
use crate::types::{DeleteOutcome, PlannedChange, ProviderState};
use std::collections::BTreeSet;

/// Where a resource is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// No remote id assigned yet
    Unbound,
    /// Bound to a remote object
    Bound,
    /// Deleted (or detached) by this handle
    Deleted,
}

/// What a reconcile call did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// A remote object was created, or an existing one adopted
    Created { adopted: bool },
    /// The bound object was updated in place
    Updated,
    /// A new object replaced the bound one
    Replaced {
        reasons: BTreeSet<String>,
        previous: Option<DeleteOutcome>,
    },
    /// Nothing needed to change
    Unchanged,
}

/// One logical resource bound to a provider
pub struct ResourceHandle<'p, B, L> {
    name: String,
    provider: &'p ReconciliationProvider<B, L>,
    state: Option<ProviderState>,
    deleted: bool,
}

impl<'p, B: ApiBinding, L: KeyLookup> ResourceHandle<'p, B, L> {
    /// Handle for a resource that has no remote object yet
    pub fn new(name: impl Into<String>, provider: &'p ReconciliationProvider<B, L>) -> Self {
        Self {
            name: name.into(),
            provider,
            state: None,
            deleted: false,
        }
    }

    /// Handle for a resource with persisted state
    pub fn from_state(
        name: impl Into<String>,
        provider: &'p ReconciliationProvider<B, L>,
        state: ProviderState,
    ) -> Self {
        Self {
            name: name.into(),
            provider,
            state: Some(state),
            deleted: false,
        }
    }

    /// Name the caller knows this resource by
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Where the handle is in its Unbound, Bound, Deleted cycle
    pub fn lifecycle(&self) -> Lifecycle {
        match (&self.state, self.deleted) {
            (Some(_), _) => Lifecycle::Bound,
            (None, true) => Lifecycle::Deleted,
            (None, false) => Lifecycle::Unbound,
        }
    }

    /// Remote identifier, once bound
    pub fn remote_id(&self) -> Option<&str> {
        self.state.as_ref().map(|s| s.remote_id.as_str())
    }

    /// Current provider state, once bound
    pub fn state(&self) -> Option<&ProviderState> {
        self.state.as_ref()
    }

    /// Last remote snapshot, once bound
    pub fn info(&self) -> Option<&Attributes> {
        self.state.as_ref().map(|s| &s.info)
    }

    /// Take the state out of the handle for persisting
    pub fn into_state(self) -> Option<ProviderState> {
        self.state
    }

    /// Work out what [`reconcile`](Self::reconcile) would do, without changing anything
    pub async fn plan(&self, desired: ResourceDescriptor) -> Result<PlannedChange> {
        match &self.state {
            None => {
                let check = self.provider.inspect(None, desired).await?;
                Ok(PlannedChange::Create {
                    adoption: check.adoption,
                })
            }
            Some(state) => {
                let diff = self.provider.diff(&state.remote_id, state, &desired);
                Ok(if !diff.changed {
                    PlannedChange::NoChange
                } else if diff.requires_replace() {
                    PlannedChange::Replace {
                        reasons: diff.replace_reasons,
                    }
                } else {
                    PlannedChange::Update
                })
            }
        }
    }

    /// Drive the remote object toward `desired`
    ///
    /// Replacement creates the new object first, then deletes the old one
    /// (subject to the delete guard). If the new object turns out to be the
    /// old one, adopted again by lookup, nothing is deleted. When deleting
    /// the old object fails the handle stays bound to the new one.
    pub async fn reconcile(&mut self, desired: ResourceDescriptor) -> Result<ReconcileOutcome> {
        let Some(prior) = self.state.as_ref() else {
            let check = self.provider.inspect(None, desired).await?;
            let adopted = check.adoption.is_some() || check.inputs.supplied_id().is_some();
            let state = self.provider.create(check.inputs).await?;
            log::debug!("{}: bound to {}", self.name, state.remote_id);

            self.state = Some(state);
            self.deleted = false;
            return Ok(ReconcileOutcome::Created { adopted });
        };

        let diff = self.provider.diff(&prior.remote_id, prior, &desired);
        if !diff.changed {
            return Ok(ReconcileOutcome::Unchanged);
        }

        if !diff.requires_replace() {
            let state = self
                .provider
                .update(&prior.remote_id, prior, desired)
                .await?;
            self.state = Some(state);
            return Ok(ReconcileOutcome::Updated);
        }

        let old = prior.clone();
        let replacement = self.provider.create(desired).await?;
        let new_id = replacement.remote_id.clone();
        self.state = Some(replacement);

        let previous = if new_id == old.remote_id {
            None
        } else {
            Some(self.provider.delete(&old.remote_id, &old).await?)
        };
        log::debug!("{}: replaced {} with {}", self.name, old.remote_id, new_id);

        Ok(ReconcileOutcome::Replaced {
            reasons: diff.replace_reasons,
            previous,
        })
    }

    /// Refresh the remote snapshot; returns false when nothing is bound
    pub async fn refresh(&mut self) -> Result<bool> {
        let Some(state) = self.state.take() else {
            return Ok(false);
        };

        let remote_id = state.remote_id.clone();
        match self.provider.read(&remote_id, state.clone()).await {
            Ok(refreshed) => {
                self.state = Some(refreshed);
                Ok(true)
            }
            Err(e) => {
                self.state = Some(state);
                Err(e)
            }
        }
    }

    /// Delete the bound remote object; returns None when nothing is bound
    pub async fn destroy(&mut self) -> Result<Option<DeleteOutcome>> {
        let Some(state) = self.state.as_ref() else {
            return Ok(None);
        };

        let outcome = self.provider.delete(&state.remote_id, state).await?;
        self.state = None;
        self.deleted = true;
        Ok(Some(outcome))
    }
}
