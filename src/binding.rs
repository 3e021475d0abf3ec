//! HTTP implementation of the remote API binding.
//!
//! Resource references map directly onto URL paths below the configured base:
//!
//! | Call | Request |
//! |---|---|
//! | create | `POST {base}/{ref}` |
//! | fetch | `GET {base}/{ref}/{id}` |
//! | update | `POST {base}/{ref}/{id}` |
//! | remove | `DELETE {base}/{ref}/{id}` |
//! | lookup | `GET {base}/{ref}`, then each `meta.next_page_url` |
//!
//! Requests run on the blocking pool since `ureq` is synchronous.

use crate::config::ApiConfig;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use declarative::resource::{FRIENDLY_NAME, UNIQUE_NAME};
use declarative::value::to_snake_case;
use declarative::{
    ApiBinding, Attributes, CollectionOps, InstanceOps, KeyLookup, RemoteError, ResourceRef,
};
use serde_json::Value;
use std::fmt;
use std::future::Future;

const USER_AGENT: &str = concat!("converge/", env!("CARGO_PKG_VERSION"));

/// Identifying attributes, in lookup order
const LOOKUP_KEYS: [&str; 2] = [UNIQUE_NAME, FRIENDLY_NAME];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Method {
    Get,
    Post,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
            Method::Delete => write!(f, "DELETE"),
        }
    }
}

/// Authenticated JSON client shared by the binding and the lookup
#[derive(Clone)]
pub struct HttpClient {
    agent: ureq::Agent,
    base_url: String,
    authorization: String,
}

impl HttpClient {
    pub fn new(config: &ApiConfig) -> Self {
        let credentials = format!("{}:{}", config.account_sid, config.auth_token);
        Self {
            agent: ureq::Agent::new_with_config(
                ureq::Agent::config_builder()
                    .http_status_as_error(false)
                    .build(),
            ),
            base_url: config.base_url.clone(),
            authorization: format!("Basic {}", STANDARD.encode(credentials)),
        }
    }

    fn collection_url(&self, resource: &ResourceRef) -> String {
        format!("{}/{}", self.base_url, resource.path())
    }

    fn instance_url(&self, resource: &ResourceRef, remote_id: &str) -> String {
        format!("{}/{}", self.collection_url(resource), remote_id)
    }

    async fn send(
        &self,
        method: Method,
        url: String,
        body: Option<Attributes>,
    ) -> Result<Option<Value>, RemoteError> {
        let client = self.clone();
        tokio::task::spawn_blocking(move || client.send_blocking(method, &url, body.as_ref()))
            .await
            .map_err(|e| RemoteError::transport(format!("request task failed: {e}")))?
    }

    fn send_blocking(
        &self,
        method: Method,
        url: &str,
        body: Option<&Attributes>,
    ) -> Result<Option<Value>, RemoteError> {
        log::debug!("{method} {url}");

        let auth = self.authorization.as_str();
        let response = match method {
            Method::Get => self
                .agent
                .get(url)
                .header("Authorization", auth)
                .header("Accept", "application/json")
                .header("User-Agent", USER_AGENT)
                .call(),
            Method::Delete => self
                .agent
                .delete(url)
                .header("Authorization", auth)
                .header("User-Agent", USER_AGENT)
                .call(),
            Method::Post => {
                let request = self
                    .agent
                    .post(url)
                    .header("Authorization", auth)
                    .header("Accept", "application/json")
                    .header("User-Agent", USER_AGENT);
                match body {
                    Some(body) => request.send_json(body),
                    None => request.send_empty(),
                }
            }
        };

        let mut response = response.map_err(remote_error)?;
        let status = response.status().as_u16();
        if status >= 400 {
            let body = response.body_mut().read_to_string().unwrap_or_default();
            return Err(RemoteError::status(status, error_message(status, &body)));
        }
        if method == Method::Delete || status == 204 {
            return Ok(None);
        }

        response
            .body_mut()
            .read_json::<Value>()
            .map(Some)
            .map_err(|e| RemoteError::transport(format!("invalid response from {url}: {e}")))
    }
}

fn remote_error(err: ureq::Error) -> RemoteError {
    match err {
        ureq::Error::StatusCode(code) => RemoteError::status(code, format!("HTTP {code}")),
        other => RemoteError::transport(other.to_string()),
    }
}

/// Message of an error response: its `message` member, else the raw body
fn error_message(status: u16, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return format!("HTTP {status}");
    }
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => match map.get("message").and_then(Value::as_str) {
            Some(message) => message.to_string(),
            None => body.to_string(),
        },
        _ => body.to_string(),
    }
}

fn into_object(value: Option<Value>) -> Result<Attributes, RemoteError> {
    match value {
        Some(Value::Object(map)) => Ok(map),
        Some(other) => Err(RemoteError::transport(format!(
            "expected a JSON object, got {other}"
        ))),
        None => Err(RemoteError::transport("expected a JSON object, got no body")),
    }
}

// ============================================================================
// ApiBinding
// ============================================================================

/// [`ApiBinding`] over plain REST paths
pub struct HttpBinding {
    client: HttpClient,
}

impl HttpBinding {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

struct HttpCollection<'a> {
    client: &'a HttpClient,
    url: String,
}

struct HttpInstance<'a> {
    client: &'a HttpClient,
    url: String,
}

#[async_trait]
impl CollectionOps for HttpCollection<'_> {
    async fn create(&self, attributes: &Attributes) -> Result<Attributes, RemoteError> {
        let response = self
            .client
            .send(Method::Post, self.url.clone(), Some(attributes.clone()))
            .await?;
        into_object(response)
    }
}

#[async_trait]
impl InstanceOps for HttpInstance<'_> {
    async fn fetch(&self) -> Result<Attributes, RemoteError> {
        into_object(self.client.send(Method::Get, self.url.clone(), None).await?)
    }

    async fn update(&self, attributes: &Attributes) -> Result<Attributes, RemoteError> {
        let response = self
            .client
            .send(Method::Post, self.url.clone(), Some(attributes.clone()))
            .await?;
        into_object(response)
    }

    async fn remove(&self) -> Result<(), RemoteError> {
        self.client
            .send(Method::Delete, self.url.clone(), None)
            .await
            .map(|_| ())
    }
}

impl ApiBinding for HttpBinding {
    fn collection<'a>(&'a self, resource: &ResourceRef) -> Box<dyn CollectionOps + 'a> {
        Box::new(HttpCollection {
            client: &self.client,
            url: self.client.collection_url(resource),
        })
    }

    fn instance<'a>(
        &'a self,
        resource: &ResourceRef,
        remote_id: &str,
    ) -> Box<dyn InstanceOps + 'a> {
        Box::new(HttpInstance {
            client: &self.client,
            url: self.client.instance_url(resource, remote_id),
        })
    }
}

// ============================================================================
// KeyLookup
// ============================================================================

/// [`KeyLookup`] that lists the collection and matches identifying attributes
pub struct HttpKeyLookup {
    client: HttpClient,
}

impl HttpKeyLookup {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl KeyLookup for HttpKeyLookup {
    async fn find_by_key(
        &self,
        resource: &ResourceRef,
        attributes: &Attributes,
    ) -> Result<Option<Attributes>, RemoteError> {
        let client = &self.client;
        find_in_pages(
            client.collection_url(resource),
            resource.kind(),
            attributes,
            |url| client.send(Method::Get, url, None),
        )
        .await
    }
}

/// Walk a paginated listing until an object matches or the pages run out
async fn find_in_pages<F, Fut>(
    first_url: String,
    kind: &str,
    attributes: &Attributes,
    mut fetch: F,
) -> Result<Option<Attributes>, RemoteError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<Option<Value>, RemoteError>>,
{
    let mut url = first_url;
    loop {
        log::debug!("Looking up {kind} in {url}");
        let listing = fetch(url.clone()).await?;
        let next = next_page_url(listing.as_ref());

        if let Some(found) = find_match(listed_items(listing, kind), attributes) {
            return Ok(Some(found));
        }
        match next {
            Some(next) if next != url => url = next,
            _ => return Ok(None),
        }
    }
}

/// `meta.next_page_url` of a listing page, when there is another page
fn next_page_url(listing: Option<&Value>) -> Option<String> {
    listing?
        .get("meta")?
        .get("next_page_url")?
        .as_str()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Pull the listed objects out of a collection response
///
/// Accepts a bare array, or an object holding the array under the snake_case
/// collection name (falling back to its first array member).
fn listed_items(listing: Option<Value>, kind: &str) -> Vec<Attributes> {
    let array = match listing {
        Some(Value::Array(items)) => items,
        Some(Value::Object(mut page)) => {
            let key = to_snake_case(kind);
            match page.remove(&key) {
                Some(Value::Array(items)) => items,
                _ => page
                    .into_iter()
                    .find_map(|(_, v)| match v {
                        Value::Array(items) => Some(items),
                        _ => None,
                    })
                    .unwrap_or_default(),
            }
        }
        _ => Vec::new(),
    };

    array
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .collect()
}

/// First listed object whose identifying attribute equals the desired one
///
/// `uniqueName` is tried before `friendlyName`; remote fields may be spelled
/// in camelCase or snake_case.
fn find_match(items: Vec<Attributes>, attributes: &Attributes) -> Option<Attributes> {
    let (key, wanted) = LOOKUP_KEYS.iter().find_map(|key| {
        attributes
            .get(*key)
            .filter(|v| v.as_str().is_some_and(|s| !s.is_empty()))
            .map(|v| (*key, v))
    })?;
    let snake = to_snake_case(key);

    items
        .into_iter()
        .find(|item| item.get(key).or_else(|| item.get(&snake)) == Some(wanted))
}
