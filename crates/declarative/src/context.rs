//! Provider configuration and collaborator traits
//!
//! These traits allow the declarative crate to be used without
//! depending on a specific remote API client or lookup strategy.

use crate::error::RemoteError;
use crate::resource::{Attributes, ResourceRef};
use async_trait::async_trait;
use retrykit::BackoffConfig;
use std::sync::Arc;

/// Configuration threaded into a provider at construction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Look up existing remote objects by identifying attribute before creating
    pub find_before_create: bool,
    /// Backoff applied to every remote call
    pub backoff: BackoffConfig,
}

impl ProviderConfig {
    /// Enable or disable adoption by lookup
    pub fn with_find_before_create(mut self, enabled: bool) -> Self {
        self.find_before_create = enabled;
        self
    }

    /// Replace the backoff configuration
    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }
}

/// Remote calls bound to a collection
#[async_trait]
pub trait CollectionOps: Send + Sync {
    /// Create a new remote object, returning the raw response
    async fn create(&self, attributes: &Attributes) -> Result<Attributes, RemoteError>;
}

/// Remote calls bound to one remote identifier
#[async_trait]
pub trait InstanceOps: Send + Sync {
    /// Fetch the current remote object
    async fn fetch(&self) -> Result<Attributes, RemoteError>;

    /// Update the remote object, returning the raw response
    async fn update(&self, attributes: &Attributes) -> Result<Attributes, RemoteError>;

    /// Remove the remote object
    async fn remove(&self) -> Result<(), RemoteError>;
}

/// Maps a resource reference to concrete remote API calls
///
/// Implement this trait to connect the provider to a remote API.
pub trait ApiBinding: Send + Sync {
    /// Operations on the collection a reference points to
    fn collection<'a>(&'a self, resource: &ResourceRef) -> Box<dyn CollectionOps + 'a>;

    /// Operations on one object of that collection
    fn instance<'a>(
        &'a self,
        resource: &ResourceRef,
        remote_id: &str,
    ) -> Box<dyn InstanceOps + 'a>;
}

/// Finds pre-existing remote objects by identifying attribute
///
/// Absence is not an error: return `Ok(None)`.
#[async_trait]
pub trait KeyLookup: Send + Sync {
    /// Search `resource` for an object matching the identifying attributes
    async fn find_by_key(
        &self,
        resource: &ResourceRef,
        attributes: &Attributes,
    ) -> Result<Option<Attributes>, RemoteError>;
}

/// Lookup that never finds anything
pub struct NoLookup;

#[async_trait]
impl KeyLookup for NoLookup {
    async fn find_by_key(
        &self,
        _resource: &ResourceRef,
        _attributes: &Attributes,
    ) -> Result<Option<Attributes>, RemoteError> {
        Ok(None)
    }
}

impl<T: ApiBinding + ?Sized> ApiBinding for Arc<T> {
    fn collection<'a>(&'a self, resource: &ResourceRef) -> Box<dyn CollectionOps + 'a> {
        (**self).collection(resource)
    }

    fn instance<'a>(
        &'a self,
        resource: &ResourceRef,
        remote_id: &str,
    ) -> Box<dyn InstanceOps + 'a> {
        (**self).instance(resource, remote_id)
    }
}

#[async_trait]
impl<T: KeyLookup + ?Sized> KeyLookup for Arc<T> {
    async fn find_by_key(
        &self,
        resource: &ResourceRef,
        attributes: &Attributes,
    ) -> Result<Option<Attributes>, RemoteError> {
        (**self).find_by_key(resource, attributes).await
    }
}
