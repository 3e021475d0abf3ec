//! Resource references and descriptors
//!
//! A [`ResourceDescriptor`] is the desired state handed to one reconciliation
//! call: which remote collection the resource lives in, and the attributes it
//! should have.

use crate::error::Error;
use crate::value::{clean_attributes, is_truthy};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Attribute map of a resource or a remote response
pub type Attributes = serde_json::Map<String, Value>;

/// Pre-supplied remote identifier ("I did not create this")
pub const SID: &str = "sid";

/// Preferred identifying attribute
pub const UNIQUE_NAME: &str = "uniqueName";

/// Fallback identifying attribute
pub const FRIENDLY_NAME: &str = "friendlyName";

/// Flag: replace instead of updating in place, never delete the old object
pub const REPLACE_AND_NOT_DELETE: &str = "replaceAndNotDelete";

/// Keys that steer the provider and are never sent to the remote API
pub const CONTROL_KEYS: &[&str] = &[SID, REPLACE_AND_NOT_DELETE];

/// Pointer to the remote collection a resource belongs to
///
/// Written as a `/`-separated path that alternates collection names and
/// parent identifiers, e.g. `taskrouter/Workspaces/WS01/Workflows`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceRef {
    segments: Vec<String>,
}

impl ResourceRef {
    /// Parse a reference path
    pub fn parse(path: &str) -> Result<Self, Error> {
        let trimmed = path.trim().trim_matches('/');
        if trimmed.is_empty() {
            return Err(Error::InvalidReference(path.to_string()));
        }

        let segments: Vec<String> = trimmed.split('/').map(str::to_string).collect();
        if segments.iter().any(|s| s.trim().is_empty()) {
            return Err(Error::InvalidReference(path.to_string()));
        }

        Ok(Self { segments })
    }

    /// Path segments
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Name of the collection the resource lives in (the last segment)
    pub fn kind(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// The reference as a path
    pub fn path(&self) -> String {
        self.segments.join("/")
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path())
    }
}

impl FromStr for ResourceRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ResourceRef {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ResourceRef> for String {
    fn from(value: ResourceRef) -> Self {
        value.path()
    }
}

/// Desired state of one resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    /// Remote collection the resource belongs to
    pub resource: ResourceRef,
    /// Desired attributes
    #[serde(default)]
    pub attributes: Attributes,
}

impl ResourceDescriptor {
    /// Create a descriptor
    pub fn new(resource: ResourceRef, attributes: Attributes) -> Self {
        Self {
            resource,
            attributes,
        }
    }

    /// Remote identifier supplied by configuration, if any
    pub fn supplied_id(&self) -> Option<&str> {
        non_empty_str(self.attributes.get(SID))
    }

    /// Identifying attribute value (`uniqueName`, then `friendlyName`)
    pub fn identifying_key(&self) -> Option<&str> {
        non_empty_str(self.attributes.get(UNIQUE_NAME))
            .or_else(|| non_empty_str(self.attributes.get(FRIENDLY_NAME)))
    }

    /// Whether the "replace and do not delete" flag is set
    pub fn detach_on_delete(&self) -> bool {
        self.attributes
            .get(REPLACE_AND_NOT_DELETE)
            .is_some_and(is_truthy)
    }

    /// Why deleting this resource must leave the remote object alone, if it must
    pub fn delete_guard(&self) -> Option<&'static str> {
        if self.supplied_id().is_some() {
            Some("sid was supplied by configuration")
        } else if self.detach_on_delete() {
            Some("replaceAndNotDelete is set")
        } else {
            None
        }
    }

    /// Attributes sent to the remote API (control keys removed)
    pub fn api_attributes(&self) -> Attributes {
        self.attributes
            .iter()
            .filter(|(k, _)| !CONTROL_KEYS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Copy with `null` attributes stripped, as stored in provider state
    pub fn cleaned(&self) -> Self {
        Self {
            resource: self.resource.clone(),
            attributes: clean_attributes(self.attributes.clone(), false),
        }
    }

    /// Short human-readable label, e.g. `taskrouter/Workspaces "support"`
    pub fn label(&self) -> String {
        match self.identifying_key().or_else(|| self.supplied_id()) {
            Some(key) => format!("{} \"{}\"", self.resource, key),
            None => self.resource.to_string(),
        }
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}
