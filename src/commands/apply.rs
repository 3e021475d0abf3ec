use anyhow::{Result, bail};
use colored::Colorize;
use declarative::{
    ApiBinding, DeleteOutcome, KeyLookup, ReconcileOutcome, ReconciliationProvider,
    ResourceHandle,
};

use super::{Target, orphans, parse_target, plan, selected};
use crate::Context;
use crate::config::Manifest;
use crate::state::StateFile;
use crate::ui;

/// What one apply run did
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub created: usize,
    pub adopted: usize,
    pub updated: usize,
    pub replaced: usize,
    pub deleted: usize,
    pub detached: usize,
    pub unchanged: usize,
    /// Resource name and rendered error
    pub failed: Vec<(String, String)>,
}

impl ApplyReport {
    fn record(&mut self, outcome: &ReconcileOutcome) {
        match outcome {
            ReconcileOutcome::Created { adopted: false } => self.created += 1,
            ReconcileOutcome::Created { adopted: true } => self.adopted += 1,
            ReconcileOutcome::Updated => self.updated += 1,
            ReconcileOutcome::Replaced { .. } => self.replaced += 1,
            ReconcileOutcome::Unchanged => self.unchanged += 1,
        }
    }

    fn record_delete(&mut self, outcome: &DeleteOutcome) {
        match outcome {
            DeleteOutcome::Removed => self.deleted += 1,
            DeleteOutcome::Detached { .. } => self.detached += 1,
        }
    }

    fn fail(&mut self, name: &str, err: &declarative::Error) {
        let rendered = ui::error_chain(err);
        ui::error(&format!("{name}: {rendered}"));
        let category = err.category();
        ui::dim(&format!("    {}. {}", category.description(), category.advice()));
        self.failed.push((name.to_string(), rendered));
    }
}

pub async fn run(ctx: &Context, target: Option<&str>, dry_run: bool) -> Result<()> {
    let (manifest, mut state) = super::load(ctx)?;
    let provider = super::http_provider(ctx)?;
    let target = target.map(parse_target);

    if dry_run {
        ui::info("Dry run: nothing will be changed");
        let entries = plan::compute(&provider, &manifest, &state, target.as_ref()).await?;
        plan::show(&entries);
        return Ok(());
    }

    ui::header("Converge Apply");
    let report = reconcile_all(&provider, &manifest, &mut state, target.as_ref()).await?;
    show_report(&report, ctx.quiet);

    if !report.failed.is_empty() {
        bail!("{} resource(s) failed to apply", report.failed.len());
    }
    Ok(())
}

/// Reconcile every selected manifest resource, then delete orphaned entries
///
/// Resources are handled in manifest order. A failing resource is reported
/// and skipped; the rest still run. State is saved after every resource
/// whose entry changed.
pub async fn reconcile_all<B: ApiBinding, L: KeyLookup>(
    provider: &ReconciliationProvider<B, L>,
    manifest: &Manifest,
    state: &mut StateFile,
    target: Option<&Target>,
) -> Result<ApplyReport> {
    let mut report = ApplyReport::default();

    for entry in &manifest.resources {
        if !selected(target, &entry.name, &entry.resource) {
            continue;
        }

        let before = state.get(&entry.name).cloned();
        let mut handle = match before.clone() {
            Some(bound) => ResourceHandle::from_state(&entry.name, provider, bound),
            None => ResourceHandle::new(&entry.name, provider),
        };

        match handle.reconcile(entry.descriptor()).await {
            Ok(outcome) => {
                print_outcome(&entry.name, handle.remote_id(), &outcome);
                report.record(&outcome);
            }
            Err(err) => report.fail(&entry.name, &err),
        }

        if let Some(after) = handle.into_state()
            && before.as_ref() != Some(&after)
        {
            state.set(&entry.name, after);
            state.save()?;
        }
    }

    let orphaned: Vec<_> = orphans(manifest, state, target)
        .into_iter()
        .map(|(name, bound)| (name.to_string(), bound.clone()))
        .collect();

    for (name, bound) in orphaned {
        let mut handle = ResourceHandle::from_state(&name, provider, bound);
        match handle.destroy().await {
            Ok(Some(outcome)) => {
                print_delete(&name, &outcome);
                report.record_delete(&outcome);
                state.remove(&name);
                state.save()?;
            }
            Ok(None) => {}
            Err(err) => report.fail(&name, &err),
        }
    }

    Ok(report)
}

fn print_outcome(name: &str, remote_id: Option<&str>, outcome: &ReconcileOutcome) {
    let id = remote_id.unwrap_or("?");
    match outcome {
        ReconcileOutcome::Created { adopted: false } => {
            ui::success(&format!("{} created ({})", name.bold(), id));
        }
        ReconcileOutcome::Created { adopted: true } => {
            ui::success(&format!("{} adopted ({})", name.bold(), id));
        }
        ReconcileOutcome::Updated => ui::success(&format!("{} updated ({})", name.bold(), id)),
        ReconcileOutcome::Replaced { reasons, previous } => {
            let reasons: Vec<_> = reasons.iter().map(String::as_str).collect();
            ui::success(&format!(
                "{} replaced ({}) because of {}",
                name.bold(),
                id,
                reasons.join(", ")
            ));
            if let Some(DeleteOutcome::Detached { reason }) = previous {
                ui::dim(&format!("    previous object left in place: {reason}"));
            }
        }
        ReconcileOutcome::Unchanged => ui::dim(&format!("{name} unchanged")),
    }
}

fn print_delete(name: &str, outcome: &DeleteOutcome) {
    match outcome {
        DeleteOutcome::Removed => ui::success(&format!("{} deleted", name.bold())),
        DeleteOutcome::Detached { reason } => {
            ui::warn(&format!("{} dropped from state, left in place: {}", name.bold(), reason));
        }
    }
}

fn show_report(report: &ApplyReport, quiet: bool) {
    if quiet && report.failed.is_empty() {
        return;
    }

    ui::section("Summary");
    ui::kv("created", &report.created.to_string());
    ui::kv("adopted", &report.adopted.to_string());
    ui::kv("updated", &report.updated.to_string());
    ui::kv("replaced", &report.replaced.to_string());
    ui::kv("deleted", &report.deleted.to_string());
    if report.detached > 0 {
        ui::kv("detached", &report.detached.to_string());
    }
    ui::kv("unchanged", &report.unchanged.to_string());

    if !report.failed.is_empty() {
        ui::kv("failed", &report.failed.len().to_string().red().to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fake::{BROKEN, MemoryRemote};
    use crate::config::ManifestResource;
    use declarative::ResourceRef;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn resource(name: &str, attributes: Value) -> ManifestResource {
        ManifestResource {
            name: name.into(),
            resource: ResourceRef::parse("serverless/Services").unwrap(),
            attributes: attributes.as_object().cloned().unwrap(),
        }
    }

    fn manifest(resources: Vec<ManifestResource>) -> Manifest {
        Manifest { resources }
    }

    #[tokio::test]
    async fn test_apply_is_idempotent_and_persists_state() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        let remote = Arc::new(MemoryRemote::default());
        let provider = remote.provider(false);
        let manifest = manifest(vec![
            resource("a", json!({ "uniqueName": "a" })),
            resource("b", json!({ "uniqueName": "b" })),
        ]);

        let mut state = StateFile::load(&path).unwrap();
        let first = reconcile_all(&provider, &manifest, &mut state, None).await.unwrap();
        assert_eq!(first.created, 2);

        let mut reloaded = StateFile::load(&path).unwrap();
        assert_eq!(reloaded.resources.len(), 2);
        let second = reconcile_all(&provider, &manifest, &mut reloaded, None).await.unwrap();

        assert_eq!(
            second,
            ApplyReport {
                unchanged: 2,
                ..Default::default()
            }
        );
        assert_eq!(remote.creates(), 2);
    }

    #[tokio::test]
    async fn test_apply_isolates_failures() {
        let dir = TempDir::new().unwrap();
        let remote = Arc::new(MemoryRemote::default());
        let provider = remote.provider(false);
        let manifest = manifest(vec![
            resource("first", json!({ "friendlyName": "first" })),
            resource("bad", json!({ "friendlyName": BROKEN })),
            resource("last", json!({ "friendlyName": "last" })),
        ]);

        let mut state = StateFile::empty(dir.path().join("state.json"));
        let report = reconcile_all(&provider, &manifest, &mut state, None).await.unwrap();

        assert_eq!(report.created, 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "bad");
        assert!(report.failed[0].1.contains("status 400"));
        assert!(state.get("bad").is_none());
        assert!(state.get("last").is_some());
    }

    #[tokio::test]
    async fn test_apply_updates_then_adopts() {
        let dir = TempDir::new().unwrap();
        let remote = Arc::new(MemoryRemote::default());
        remote.insert("ZS1", json!({ "uniqueName": "existing", "friendlyName": "Old" }));
        let provider = remote.provider(true);
        let mut state = StateFile::empty(dir.path().join("state.json"));

        let desired = manifest(vec![resource(
            "existing",
            json!({ "uniqueName": "existing", "friendlyName": "New" }),
        )]);
        let report = reconcile_all(&provider, &desired, &mut state, None).await.unwrap();
        assert_eq!(report.adopted, 1);
        assert_eq!(state.get("existing").unwrap().remote_id, "ZS1");
        assert_eq!(remote.object("ZS1").unwrap().get("friendlyName"), Some(&json!("New")));

        let renamed = manifest(vec![resource(
            "existing",
            json!({ "uniqueName": "existing", "friendlyName": "Newer" }),
        )]);
        let report = reconcile_all(&provider, &renamed, &mut state, None).await.unwrap();
        assert_eq!(report.updated, 1);
        assert_eq!(remote.creates(), 0);
    }

    #[tokio::test]
    async fn test_apply_deletes_orphans() {
        let dir = TempDir::new().unwrap();
        let remote = Arc::new(MemoryRemote::default());
        let provider = remote.provider(false);
        let mut state = StateFile::empty(dir.path().join("state.json"));

        let both = manifest(vec![
            resource("keep", json!({ "uniqueName": "keep" })),
            resource("drop", json!({ "uniqueName": "drop" })),
            resource("detach", json!({ "uniqueName": "detach", "replaceAndNotDelete": true })),
        ]);
        reconcile_all(&provider, &both, &mut state, None).await.unwrap();
        assert_eq!(remote.len(), 3);

        let only_keep = manifest(vec![resource("keep", json!({ "uniqueName": "keep" }))]);
        let report = reconcile_all(&provider, &only_keep, &mut state, None).await.unwrap();

        assert_eq!((report.unchanged, report.deleted, report.detached), (1, 1, 1));
        assert_eq!(state.resources.keys().collect::<Vec<_>>(), vec!["keep"]);
        assert_eq!(remote.len(), 2);
        assert_eq!(remote.removes(), 1);
    }

    #[tokio::test]
    async fn test_apply_target_skips_other_orphans() {
        let dir = TempDir::new().unwrap();
        let remote = Arc::new(MemoryRemote::default());
        let provider = remote.provider(false);
        let mut state = StateFile::empty(dir.path().join("state.json"));

        let both = manifest(vec![
            resource("a", json!({ "uniqueName": "a" })),
            resource("b", json!({ "uniqueName": "b" })),
        ]);
        reconcile_all(&provider, &both, &mut state, None).await.unwrap();

        let target = parse_target("a");
        let report = reconcile_all(&provider, &manifest(vec![]), &mut state, Some(&target))
            .await
            .unwrap();

        assert_eq!(report.deleted, 1);
        assert!(state.get("a").is_none());
        assert!(state.get("b").is_some());
    }
}
