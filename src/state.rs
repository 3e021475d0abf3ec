use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use declarative::ProviderState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

// ============================================================================
// State Structures
// ============================================================================

/// Everything converge remembers between runs
///
/// The remote service is the source of truth; this file only records which
/// remote object each manifest entry is bound to and what it looked like
/// after the last successful call.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StateFile {
    /// Provider state per manifest resource name
    #[serde(default)]
    pub resources: BTreeMap<String, ProviderState>,

    /// Last time the state was saved
    pub last_updated: DateTime<Utc>,

    #[serde(skip)]
    path: PathBuf,
}

// ============================================================================
// StateFile Implementation
// ============================================================================

impl StateFile {
    /// Default state file path (~/.local/state/converge/state.json)
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home
            .join(".local")
            .join("state")
            .join("converge")
            .join("state.json"))
    }

    /// Resolve a user-supplied path, expanding `~`, or fall back to the default
    pub fn resolve_path(path: Option<&str>) -> Result<PathBuf> {
        match path {
            Some(path) => Ok(PathBuf::from(shellexpand::tilde(path).as_ref())),
            None => Self::default_path(),
        }
    }

    /// Empty state that will be written to `path`
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            resources: BTreeMap::new(),
            last_updated: Utc::now(),
            path: path.into(),
        }
    }

    /// Load state from disk, or return empty state if the file doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("State file {} does not exist, using empty state", path.display());
            return Ok(Self::empty(path));
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;

        let mut state: StateFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))?;
        state.path = path.to_path_buf();

        log::debug!("Loaded state from {}", path.display());
        Ok(state)
    }

    /// Update the timestamp and write the state to disk
    pub fn save(&mut self) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;
        }

        self.last_updated = Utc::now();
        let content =
            serde_json::to_string_pretty(&self).context("Failed to serialize state to JSON")?;

        fs::write(&self.path, content)
            .with_context(|| format!("Failed to write state file: {}", self.path.display()))?;

        log::debug!("Saved state to {}", self.path.display());
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, name: &str) -> Option<&ProviderState> {
        self.resources.get(name)
    }

    /// Record the state of a bound resource
    pub fn set(&mut self, name: &str, state: ProviderState) {
        self.resources.insert(name.to_string(), state);
    }

    /// Forget a resource
    pub fn remove(&mut self, name: &str) -> Option<ProviderState> {
        self.resources.remove(name)
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
