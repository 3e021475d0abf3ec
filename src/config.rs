use anyhow::{Context, Result, bail};
use declarative::{Attributes, ResourceDescriptor, ResourceRef};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Environment variable holding the API base URL
pub const API_URL_VAR: &str = "CONVERGE_API_URL";
/// Environment variable holding the account identifier
pub const ACCOUNT_SID_VAR: &str = "CONVERGE_ACCOUNT_SID";
/// Environment variable holding the auth token
pub const AUTH_TOKEN_VAR: &str = "CONVERGE_AUTH_TOKEN";

// ============================================================================
// Manifest
// ============================================================================

/// Desired resources, in the order they are applied
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub resources: Vec<ManifestResource>,
}

/// One named entry of the manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestResource {
    pub name: String,
    pub resource: ResourceRef,
    #[serde(default)]
    pub attributes: Attributes,
}

impl ManifestResource {
    pub fn descriptor(&self) -> ResourceDescriptor {
        ResourceDescriptor::new(self.resource.clone(), self.attributes.clone())
    }
}

impl Manifest {
    /// Load a manifest, picking the format from the file extension
    ///
    /// `.json` files are read as JSON, everything else as TOML.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read manifest {}", path.display()))?;

        let manifest: Self = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content)
                .with_context(|| format!("Invalid JSON manifest {}", path.display()))?
        } else {
            toml::from_str(&content)
                .with_context(|| format!("Invalid TOML manifest {}", path.display()))?
        };

        manifest.validate()?;
        log::debug!(
            "Loaded {} resources from {}",
            manifest.resources.len(),
            path.display()
        );
        Ok(manifest)
    }

    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for entry in &self.resources {
            if entry.name.trim().is_empty() {
                bail!("Resource for {} has an empty name", entry.resource);
            }
            if !seen.insert(entry.name.as_str()) {
                bail!("Resource name \"{}\" is used more than once", entry.name);
            }
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ManifestResource> {
        self.resources.iter().find(|r| r.name == name)
    }
}

// ============================================================================
// API Client Config
// ============================================================================

/// Connection settings for the remote API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub base_url: String,
    pub account_sid: String,
    pub auth_token: String,
}

impl ApiConfig {
    /// Read the settings from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let require = |key: &str| {
            get(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("{key} is not set"))
        };

        Ok(Self {
            base_url: require(API_URL_VAR)?.trim_end_matches('/').to_string(),
            account_sid: require(ACCOUNT_SID_VAR)?,
            auth_token: require(AUTH_TOKEN_VAR)?,
        })
    }
}
