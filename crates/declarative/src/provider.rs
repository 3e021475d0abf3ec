//! Reconciliation provider - the inspect/diff/read/create/update/delete state machine
//!
//! The provider holds no state of its own between calls. Everything it needs
//! to know about a resource is passed in, and everything a caller must
//! remember comes back as a [`ProviderState`].

use crate::context::{ApiBinding, KeyLookup, NoLookup, ProviderConfig};
use crate::diff::compute_diff;
use crate::error::{Error, RemoteError, Result};
use crate::resource::{Attributes, ResourceDescriptor};
use crate::types::{AdoptionNotice, CheckResult, DeleteOutcome, DiffResult, Phase, ProviderState};
use crate::value::{clean_attributes, matches_remote, remote_id_of};
use retrykit::{LogCallback, with_backoff};
use std::future::Future;

/// Drives remote resources toward their desired state
///
/// # Type Parameters
/// * `B` - Binding from resource references to remote calls
/// * `L` - Lookup used to adopt pre-existing remote objects
pub struct ReconciliationProvider<B, L = NoLookup> {
    binding: B,
    lookup: L,
    config: ProviderConfig,
}

impl<B: ApiBinding> ReconciliationProvider<B, NoLookup> {
    /// Create a provider that never adopts existing objects
    pub fn without_lookup(binding: B, config: ProviderConfig) -> Self {
        Self::new(binding, NoLookup, config)
    }
}

impl<B: ApiBinding, L: KeyLookup> ReconciliationProvider<B, L> {
    /// Create a new provider
    pub fn new(binding: B, lookup: L, config: ProviderConfig) -> Self {
        Self {
            binding,
            lookup,
            config,
        }
    }

    /// The configuration the provider was built with
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Inspect desired inputs before any change is made
    ///
    /// Only unbound resources (no `prior` state) with an identifying
    /// attribute and no supplied `sid` are looked up, and only when
    /// adoption is enabled. A found object is reported, never acted on.
    pub async fn inspect(
        &self,
        prior: Option<&ProviderState>,
        desired: ResourceDescriptor,
    ) -> Result<CheckResult> {
        if prior.is_some() || desired.supplied_id().is_some() {
            return Ok(CheckResult::new(desired));
        }

        let Some((key, found)) = self.find_existing(&desired).await? else {
            return Ok(CheckResult::new(desired));
        };

        let matches = matches_remote(&found, &desired.attributes);
        log::info!(
            "Resource \"{}\" will be imported and attributes are {}",
            key,
            if matches { "the same" } else { "different" }
        );

        Ok(CheckResult {
            inputs: desired,
            adoption: Some(AdoptionNotice {
                key,
                remote_id: remote_id_of(&found).map(str::to_string),
                matches,
            }),
        })
    }

    /// Compare prior inputs with desired inputs
    pub fn diff(
        &self,
        remote_id: &str,
        prior: &ProviderState,
        desired: &ResourceDescriptor,
    ) -> DiffResult {
        let diff = compute_diff(&prior.inputs, desired);
        log::debug!(
            "Diff {} {}: changed={} replace={:?}",
            desired.resource,
            remote_id,
            diff.changed,
            diff.replace_reasons
        );
        diff
    }

    /// Refresh `info` from the remote object
    pub async fn read(&self, remote_id: &str, state: ProviderState) -> Result<ProviderState> {
        log::debug!("Reading {} {}", state.inputs.resource, remote_id);

        let ops = self.binding.instance(&state.inputs.resource, remote_id);
        let ops = ops.as_ref();
        let info = self.call(move || ops.fetch()).await?;

        Ok(ProviderState {
            remote_id: remote_id.to_string(),
            inputs: state.inputs,
            info: clean_attributes(info, false),
        })
    }

    /// Create the remote object, or adopt an existing one
    ///
    /// A supplied `sid`, or an object found by identifying attribute while
    /// adoption is enabled, turns create into an update against that
    /// identifier. Calling create again after a crash therefore adopts the
    /// object the first call made instead of duplicating it.
    pub async fn create(&self, desired: ResourceDescriptor) -> Result<ProviderState> {
        match self.create_or_adopt(&desired).await {
            Ok(state) => Ok(state),
            Err(e) => Err(self.fail(Phase::Create, &desired, e)),
        }
    }

    async fn create_or_adopt(&self, desired: &ResourceDescriptor) -> Result<ProviderState> {
        let adopt_id = match desired.supplied_id() {
            Some(sid) => Some(sid.to_string()),
            None => match self.find_existing(desired).await? {
                Some((key, found)) => {
                    let sid = remote_id_of(&found).ok_or_else(|| Error::MissingIdentifier {
                        resource: desired.label(),
                    })?;
                    log::info!("Resource \"{}\" was imported", key);
                    Some(sid.to_string())
                }
                None => None,
            },
        };

        let attributes = desired.api_attributes();
        let info = match &adopt_id {
            Some(sid) => {
                log::debug!("Updating {} {} in place of create", desired.resource, sid);
                let ops = self.binding.instance(&desired.resource, sid);
                let ops = ops.as_ref();
                let attributes = &attributes;
                self.call(move || ops.update(attributes)).await?
            }
            None => {
                log::debug!("Creating {}", desired.label());
                let ops = self.binding.collection(&desired.resource);
                let ops = ops.as_ref();
                let attributes = &attributes;
                self.call(move || ops.create(attributes)).await?
            }
        };

        let info = clean_attributes(info, false);
        let remote_id = remote_id_of(&info)
            .map(str::to_string)
            .or(adopt_id)
            .ok_or_else(|| Error::MissingIdentifier {
                resource: desired.label(),
            })?;

        Ok(ProviderState {
            remote_id,
            inputs: desired.cleaned(),
            info,
        })
    }

    /// Update the bound remote object in place
    pub async fn update(
        &self,
        remote_id: &str,
        prior: &ProviderState,
        desired: ResourceDescriptor,
    ) -> Result<ProviderState> {
        log::debug!(
            "Updating {} {} ({} -> {} attributes)",
            desired.resource,
            remote_id,
            prior.inputs.attributes.len(),
            desired.attributes.len()
        );

        let ops = self.binding.instance(&desired.resource, remote_id);
        let ops = ops.as_ref();
        let attributes = desired.api_attributes();
        let attributes = &attributes;

        match self.call(move || ops.update(attributes)).await {
            Ok(info) => Ok(ProviderState {
                remote_id: remote_id.to_string(),
                inputs: desired.cleaned(),
                info: clean_attributes(info, false),
            }),
            Err(e) => Err(self.fail(Phase::Update, &desired, e)),
        }
    }

    /// Remove the bound remote object, unless it must be left in place
    ///
    /// Objects whose inputs carry a supplied `sid` or a truthy
    /// `replaceAndNotDelete` are never removed.
    pub async fn delete(&self, remote_id: &str, state: &ProviderState) -> Result<DeleteOutcome> {
        if let Some(reason) = state.inputs.delete_guard() {
            log::info!(
                "Leaving {} {} in place: {}",
                state.inputs.resource,
                remote_id,
                reason
            );
            return Ok(DeleteOutcome::Detached {
                reason: reason.to_string(),
            });
        }

        log::debug!("Removing {} {}", state.inputs.resource, remote_id);
        let ops = self.binding.instance(&state.inputs.resource, remote_id);
        let ops = ops.as_ref();

        match self.call(move || ops.remove()).await {
            Ok(()) => Ok(DeleteOutcome::Removed),
            Err(e) => Err(self.fail(Phase::Delete, &state.inputs, e)),
        }
    }

    async fn find_existing(
        &self,
        desired: &ResourceDescriptor,
    ) -> Result<Option<(String, Attributes)>> {
        if !self.config.find_before_create {
            return Ok(None);
        }
        let Some(key) = desired.identifying_key() else {
            return Ok(None);
        };

        let lookup = &self.lookup;
        let found = self
            .call(move || lookup.find_by_key(&desired.resource, &desired.attributes))
            .await?;
        Ok(found.map(|object| (key.to_string(), object)))
    }

    async fn call<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, RemoteError>>,
    {
        with_backoff(&self.config.backoff, Some(&LogCallback), operation)
            .await
            .map_err(|e| {
                if e.is_exhausted() {
                    log::warn!("Giving up on a rate-limited call: {e}");
                }
                Error::from(e)
            })
    }

    fn fail(&self, phase: Phase, desired: &ResourceDescriptor, source: Error) -> Error {
        log::error!("Failed to {} {}: {}", phase, desired.label(), source);
        Error::ReconciliationFailed {
            phase,
            resource: desired.label(),
            source: Box::new(source),
        }
    }
}
