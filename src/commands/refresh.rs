use anyhow::{Result, bail};
use declarative::{ApiBinding, KeyLookup, ReconciliationProvider, ResourceHandle};

use super::{Target, parse_target, selected};
use crate::Context;
use crate::state::StateFile;
use crate::ui;

pub async fn run(ctx: &Context, target: Option<&str>) -> Result<()> {
    let mut state = StateFile::load(&ctx.state_path)?;
    if state.is_empty() {
        ui::info("Nothing to refresh, state is empty");
        return Ok(());
    }

    let provider = super::http_provider(ctx)?;
    let target = target.map(parse_target);

    ui::header("Converge Refresh");
    let (refreshed, failed) = refresh_all(&provider, &mut state, target.as_ref()).await?;

    ui::info(&format!("Refreshed {refreshed} resource(s)"));
    if failed > 0 {
        bail!("{failed} resource(s) could not be refreshed");
    }
    Ok(())
}

/// Re-read every selected bound resource and persist the new snapshots
///
/// Returns how many were refreshed and how many failed.
pub async fn refresh_all<B: ApiBinding, L: KeyLookup>(
    provider: &ReconciliationProvider<B, L>,
    state: &mut StateFile,
    target: Option<&Target>,
) -> Result<(usize, usize)> {
    let bound: Vec<_> = state
        .resources
        .iter()
        .filter(|(name, entry)| selected(target, name, &entry.inputs.resource))
        .map(|(name, entry)| (name.clone(), entry.clone()))
        .collect();

    let (mut refreshed, mut failed) = (0, 0);
    for (name, entry) in bound {
        let mut handle = ResourceHandle::from_state(&name, provider, entry);
        match handle.refresh().await {
            Ok(_) => {
                if let Some(after) = handle.into_state() {
                    state.set(&name, after);
                }
                ui::success(&name);
                refreshed += 1;
            }
            Err(err) => {
                ui::error(&format!("{name}: {}", ui::error_chain(&err)));
                failed += 1;
            }
        }
    }

    if refreshed > 0 {
        state.save()?;
    }
    Ok((refreshed, failed))
}
