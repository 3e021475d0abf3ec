//! Commands that drive manifest resources through the reconciliation provider
//!
//! - `plan` - Preview what apply would change
//! - `apply` - Make remote state match the manifest
//! - `refresh` - Re-read bound resources from the remote
//! - `destroy` - Delete every bound resource
//! - `status` - Show what the state file knows

pub mod apply;
pub mod destroy;
pub mod plan;
pub mod refresh;
pub mod status;

#[cfg(test)]
mod fake;

use anyhow::Result;
use declarative::{ProviderState, ReconciliationProvider, ResourceRef};

use crate::Context;
use crate::binding::{HttpBinding, HttpClient, HttpKeyLookup};
use crate::config::{ApiConfig, Manifest};
use crate::state::StateFile;

/// Provider talking to the configured HTTP API
pub type HttpProvider = ReconciliationProvider<HttpBinding, HttpKeyLookup>;

/// Build the provider from the environment and the global flags
pub fn http_provider(ctx: &Context) -> Result<HttpProvider> {
    let api = ApiConfig::from_env()?;
    let client = HttpClient::new(&api);
    log::debug!("Using API at {}", api.base_url);

    Ok(ReconciliationProvider::new(
        HttpBinding::new(client.clone()),
        HttpKeyLookup::new(client),
        ctx.provider.clone(),
    ))
}

/// Load the manifest and the state file named by the global flags
pub fn load(ctx: &Context) -> Result<(Manifest, StateFile)> {
    let manifest = Manifest::load(&ctx.manifest_path)?;
    let state = StateFile::load(&ctx.state_path)?;
    Ok((manifest, state))
}

// ============================================================================
// Target Parsing
// ============================================================================

/// Narrows a command to some resources
///
/// `name` selects a resource by manifest name or by collection kind,
/// `Kind.name` requires both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    kind: Option<String>,
    name: String,
}

pub fn parse_target(target: &str) -> Target {
    match target.split_once('.') {
        Some((kind, name)) if !kind.is_empty() && !name.is_empty() => Target {
            kind: Some(kind.to_string()),
            name: name.to_string(),
        },
        _ => Target {
            kind: None,
            name: target.to_string(),
        },
    }
}

impl Target {
    pub fn matches(&self, name: &str, resource: &ResourceRef) -> bool {
        match &self.kind {
            Some(kind) => kind == resource.kind() && self.name == name,
            None => self.name == name || self.name == resource.kind(),
        }
    }
}

/// Whether a resource passes the optional target filter
pub fn selected(target: Option<&Target>, name: &str, resource: &ResourceRef) -> bool {
    target.is_none_or(|t| t.matches(name, resource))
}

/// State entries whose name is no longer in the manifest
pub fn orphans<'a>(
    manifest: &Manifest,
    state: &'a StateFile,
    target: Option<&Target>,
) -> Vec<(&'a str, &'a ProviderState)> {
    state
        .resources
        .iter()
        .filter(|(name, _)| manifest.get(name).is_none())
        .filter(|(name, entry)| selected(target, name, &entry.inputs.resource))
        .map(|(name, entry)| (name.as_str(), entry))
        .collect()
}
