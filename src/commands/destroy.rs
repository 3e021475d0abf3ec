use anyhow::{Result, bail};
use declarative::{ApiBinding, DeleteOutcome, KeyLookup, ReconciliationProvider, ResourceHandle};
use std::path::Path;

use super::{Target, parse_target, selected};
use crate::Context;
use crate::config::Manifest;
use crate::state::StateFile;
use crate::ui;

pub async fn run(ctx: &Context, target: Option<&str>) -> Result<()> {
    let mut state = StateFile::load(&ctx.state_path)?;
    if state.is_empty() {
        ui::info("Nothing to destroy, state is empty");
        return Ok(());
    }

    let manifest = load_optional_manifest(&ctx.manifest_path)?;
    let provider = super::http_provider(ctx)?;
    let target = target.map(parse_target);

    ui::header("Converge Destroy");
    let failed = destroy_all(&provider, manifest.as_ref(), &mut state, target.as_ref()).await?;

    if failed > 0 {
        bail!("{failed} resource(s) could not be destroyed");
    }
    Ok(())
}

fn load_optional_manifest(path: &Path) -> Result<Option<Manifest>> {
    if path.exists() {
        Manifest::load(path).map(Some)
    } else {
        Ok(None)
    }
}

/// Order in which bound resources are destroyed
///
/// Entries missing from the manifest go first, then manifest entries in
/// reverse order so children are removed before the parents they were
/// declared after.
pub fn destroy_order(manifest: Option<&Manifest>, state: &StateFile) -> Vec<String> {
    let mut listed = Vec::new();
    let mut unlisted = Vec::new();

    if let Some(manifest) = manifest {
        for entry in manifest.resources.iter().rev() {
            if state.get(&entry.name).is_some() {
                listed.push(entry.name.clone());
            }
        }
    }
    for name in state.resources.keys() {
        if !listed.contains(name) {
            unlisted.push(name.clone());
        }
    }

    unlisted.extend(listed);
    unlisted
}

/// Delete every selected bound resource, returning the number of failures
pub async fn destroy_all<B: ApiBinding, L: KeyLookup>(
    provider: &ReconciliationProvider<B, L>,
    manifest: Option<&Manifest>,
    state: &mut StateFile,
    target: Option<&Target>,
) -> Result<usize> {
    let mut failed = 0;

    for name in destroy_order(manifest, state) {
        let Some(entry) = state.get(&name).cloned() else {
            continue;
        };
        if !selected(target, &name, &entry.inputs.resource) {
            continue;
        }

        let mut handle = ResourceHandle::from_state(&name, provider, entry);
        match handle.destroy().await {
            Ok(outcome) => {
                match outcome {
                    Some(DeleteOutcome::Detached { reason }) => {
                        ui::warn(&format!("{name} left in place: {reason}"));
                    }
                    _ => ui::success(&format!("{name} deleted")),
                }
                state.remove(&name);
                state.save()?;
            }
            Err(err) => {
                ui::error(&format!("{name}: {}", ui::error_chain(&err)));
                failed += 1;
            }
        }
    }

    Ok(failed)
}
