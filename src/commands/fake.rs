//! In-memory remote for command tests

use async_trait::async_trait;
use declarative::{
    ApiBinding, Attributes, CollectionOps, InstanceOps, KeyLookup, ProviderConfig,
    ReconciliationProvider, RemoteError, ResourceRef,
};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Writes carrying this friendlyName are rejected with a 400
pub const BROKEN: &str = "broken";

pub type FakeProvider = ReconciliationProvider<Arc<MemoryRemote>, Arc<MemoryRemote>>;

#[derive(Default)]
pub struct MemoryRemote {
    objects: Mutex<BTreeMap<String, Attributes>>,
    next_id: AtomicUsize,
    pub creates: AtomicUsize,
    pub removes: AtomicUsize,
}

impl MemoryRemote {
    pub fn provider(self: &Arc<Self>, find_before_create: bool) -> FakeProvider {
        ReconciliationProvider::new(
            self.clone(),
            self.clone(),
            ProviderConfig::default().with_find_before_create(find_before_create),
        )
    }

    pub fn insert(&self, sid: &str, attributes: Value) {
        let mut object = attributes.as_object().cloned().unwrap_or_default();
        object.insert("sid".into(), json!(sid));
        self.objects.lock().unwrap().insert(sid.into(), object);
    }

    pub fn object(&self, sid: &str) -> Option<Attributes> {
        self.objects.lock().unwrap().get(sid).cloned()
    }

    pub fn clear(&self) {
        self.objects.lock().unwrap().clear();
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn removes(&self) -> usize {
        self.removes.load(Ordering::SeqCst)
    }

    fn reject_broken(attributes: &Attributes) -> Result<(), RemoteError> {
        if attributes.get("friendlyName") == Some(&json!(BROKEN)) {
            return Err(RemoteError::status(400, "friendlyName is not allowed"));
        }
        Ok(())
    }
}

fn not_found(sid: &str) -> RemoteError {
    RemoteError::status(404, format!("{sid} not found"))
}

struct Collection<'a>(&'a MemoryRemote);

struct Instance<'a>(&'a MemoryRemote, String);

#[async_trait]
impl CollectionOps for Collection<'_> {
    async fn create(&self, attributes: &Attributes) -> Result<Attributes, RemoteError> {
        MemoryRemote::reject_broken(attributes)?;
        self.0.creates.fetch_add(1, Ordering::SeqCst);
        let sid = format!("XX{:03}", self.0.next_id.fetch_add(1, Ordering::SeqCst) + 1);

        let mut object = attributes.clone();
        object.insert("sid".into(), json!(sid));
        self.0.objects.lock().unwrap().insert(sid, object.clone());
        Ok(object)
    }
}

#[async_trait]
impl InstanceOps for Instance<'_> {
    async fn fetch(&self) -> Result<Attributes, RemoteError> {
        self.0.object(&self.1).ok_or_else(|| not_found(&self.1))
    }

    async fn update(&self, attributes: &Attributes) -> Result<Attributes, RemoteError> {
        MemoryRemote::reject_broken(attributes)?;
        let mut objects = self.0.objects.lock().unwrap();
        let object = objects.get_mut(&self.1).ok_or_else(|| not_found(&self.1))?;
        object.extend(attributes.clone());
        Ok(object.clone())
    }

    async fn remove(&self) -> Result<(), RemoteError> {
        self.0.removes.fetch_add(1, Ordering::SeqCst);
        self.0
            .objects
            .lock()
            .unwrap()
            .remove(&self.1)
            .map(|_| ())
            .ok_or_else(|| not_found(&self.1))
    }
}

impl ApiBinding for MemoryRemote {
    fn collection<'a>(&'a self, _resource: &ResourceRef) -> Box<dyn CollectionOps + 'a> {
        Box::new(Collection(self))
    }

    fn instance<'a>(
        &'a self,
        _resource: &ResourceRef,
        remote_id: &str,
    ) -> Box<dyn InstanceOps + 'a> {
        Box::new(Instance(self, remote_id.to_string()))
    }
}

#[async_trait]
impl KeyLookup for MemoryRemote {
    async fn find_by_key(
        &self,
        _resource: &ResourceRef,
        attributes: &Attributes,
    ) -> Result<Option<Attributes>, RemoteError> {
        let Some(wanted) = attributes.get("uniqueName") else {
            return Ok(None);
        };
        let objects = self.objects.lock().unwrap();
        Ok(objects
            .values()
            .find(|o| o.get("uniqueName") == Some(wanted))
            .cloned())
    }
}
