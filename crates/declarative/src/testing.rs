//! In-memory remote used by the unit tests

use crate::context::{ApiBinding, CollectionOps, InstanceOps, KeyLookup};
use crate::error::RemoteError;
use crate::resource::{Attributes, FRIENDLY_NAME, ResourceRef, UNIQUE_NAME};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

/// Number of calls per remote operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Calls {
    pub create: usize,
    pub fetch: usize,
    pub update: usize,
    pub remove: usize,
    pub lookup: usize,
}

#[derive(Default)]
struct Inner {
    objects: BTreeMap<String, Attributes>,
    next_id: u32,
    calls: Calls,
    failures: VecDeque<RemoteError>,
    remove_failures: VecDeque<RemoteError>,
}

/// Remote that stores objects by sid and counts every call
#[derive(Default)]
pub struct FakeRemote {
    inner: Mutex<Inner>,
}

impl FakeRemote {
    /// Seed an existing remote object
    pub fn insert(&self, sid: &str, attributes: Value) {
        let mut object = as_attributes(attributes);
        object.insert("sid".into(), json!(sid));
        self.inner.lock().unwrap().objects.insert(sid.into(), object);
    }

    /// Queue a failure returned by the next remote call
    pub fn fail_next(&self, error: RemoteError) {
        self.inner.lock().unwrap().failures.push_back(error);
    }

    /// Queue a failure returned by the next remove call only
    pub fn fail_next_remove(&self, error: RemoteError) {
        self.inner.lock().unwrap().remove_failures.push_back(error);
    }

    pub fn calls(&self) -> Calls {
        self.inner.lock().unwrap().calls
    }

    pub fn object(&self, sid: &str) -> Option<Attributes> {
        self.inner.lock().unwrap().objects.get(sid).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().objects.len()
    }

    fn record(&self, count: impl FnOnce(&mut Calls)) -> Result<(), RemoteError> {
        let mut inner = self.inner.lock().unwrap();
        count(&mut inner.calls);
        match inner.failures.pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

pub fn as_attributes(value: Value) -> Attributes {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

fn not_found(sid: &str) -> RemoteError {
    RemoteError::status(404, format!("{sid} not found"))
}

struct FakeCollection<'a> {
    remote: &'a FakeRemote,
}

#[async_trait]
impl CollectionOps for FakeCollection<'_> {
    async fn create(&self, attributes: &Attributes) -> Result<Attributes, RemoteError> {
        self.remote.record(|c| c.create += 1)?;
        let mut inner = self.remote.inner.lock().unwrap();
        inner.next_id += 1;
        let sid = format!("SX{:03}", inner.next_id);

        let mut object = attributes.clone();
        object.insert("sid".into(), json!(sid));
        object.insert("url".into(), Value::Null);
        inner.objects.insert(sid, object.clone());
        Ok(object)
    }
}

struct FakeInstance<'a> {
    remote: &'a FakeRemote,
    sid: String,
}

#[async_trait]
impl InstanceOps for FakeInstance<'_> {
    async fn fetch(&self) -> Result<Attributes, RemoteError> {
        self.remote.record(|c| c.fetch += 1)?;
        self.remote
            .object(&self.sid)
            .ok_or_else(|| not_found(&self.sid))
    }

    async fn update(&self, attributes: &Attributes) -> Result<Attributes, RemoteError> {
        self.remote.record(|c| c.update += 1)?;
        let mut inner = self.remote.inner.lock().unwrap();
        let object = inner
            .objects
            .get_mut(&self.sid)
            .ok_or_else(|| not_found(&self.sid))?;
        for (k, v) in attributes {
            object.insert(k.clone(), v.clone());
        }
        Ok(object.clone())
    }

    async fn remove(&self) -> Result<(), RemoteError> {
        self.remote.record(|c| c.remove += 1)?;
        let mut inner = self.remote.inner.lock().unwrap();
        if let Some(err) = inner.remove_failures.pop_front() {
            return Err(err);
        }
        inner
            .objects
            .remove(&self.sid)
            .map(|_| ())
            .ok_or_else(|| not_found(&self.sid))
    }
}

impl ApiBinding for FakeRemote {
    fn collection<'a>(&'a self, _resource: &ResourceRef) -> Box<dyn CollectionOps + 'a> {
        Box::new(FakeCollection { remote: self })
    }

    fn instance<'a>(
        &'a self,
        _resource: &ResourceRef,
        remote_id: &str,
    ) -> Box<dyn InstanceOps + 'a> {
        Box::new(FakeInstance {
            remote: self,
            sid: remote_id.to_string(),
        })
    }
}

#[async_trait]
impl KeyLookup for FakeRemote {
    async fn find_by_key(
        &self,
        _resource: &ResourceRef,
        attributes: &Attributes,
    ) -> Result<Option<Attributes>, RemoteError> {
        self.record(|c| c.lookup += 1)?;
        let inner = self.inner.lock().unwrap();
        let found = [UNIQUE_NAME, FRIENDLY_NAME].iter().find_map(|key| {
            let wanted = attributes.get(*key)?;
            inner
                .objects
                .values()
                .find(|object| object.get(*key) == Some(wanted))
                .cloned()
        });
        Ok(found)
    }
}
