use anyhow::{Context as _, Result};
use colored::{ColoredString, Colorize};
use declarative::{
    ApiBinding, DiffSummary, KeyLookup, PlannedChange, ReconciliationProvider, ResourceHandle,
};

use super::{Target, orphans, parse_target, selected};
use crate::Context;
use crate::config::Manifest;
use crate::state::StateFile;
use crate::ui;

/// One line of a plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanEntry {
    /// A manifest resource and what apply would do to it
    Resource {
        name: String,
        label: String,
        change: PlannedChange,
    },
    /// A state entry no longer in the manifest, deleted by apply
    Orphan { name: String, label: String },
}

pub async fn run(ctx: &Context, target: Option<&str>) -> Result<()> {
    let (manifest, state) = super::load(ctx)?;
    let provider = super::http_provider(ctx)?;
    let target = target.map(parse_target);

    let entries = compute(&provider, &manifest, &state, target.as_ref()).await?;
    show(&entries);
    Ok(())
}

/// Work out what apply would do, without changing anything remotely
pub async fn compute<B: ApiBinding, L: KeyLookup>(
    provider: &ReconciliationProvider<B, L>,
    manifest: &Manifest,
    state: &StateFile,
    target: Option<&Target>,
) -> Result<Vec<PlanEntry>> {
    let mut entries = Vec::new();

    for entry in &manifest.resources {
        if !selected(target, &entry.name, &entry.resource) {
            continue;
        }

        let desired = entry.descriptor();
        let label = desired.label();
        let handle = match state.get(&entry.name) {
            Some(bound) => ResourceHandle::from_state(&entry.name, provider, bound.clone()),
            None => ResourceHandle::new(&entry.name, provider),
        };
        let change = handle
            .plan(desired)
            .await
            .with_context(|| format!("Failed to plan {}", entry.name))?;

        entries.push(PlanEntry::Resource {
            name: entry.name.clone(),
            label,
            change,
        });
    }

    for (name, bound) in orphans(manifest, state, target) {
        entries.push(PlanEntry::Orphan {
            name: name.to_string(),
            label: bound.inputs.label(),
        });
    }

    Ok(entries)
}

/// Summary counts for a plan
pub fn summarize(entries: &[PlanEntry]) -> DiffSummary {
    let mut summary = DiffSummary::default();
    for entry in entries {
        match entry {
            PlanEntry::Resource { change, .. } => summary.add(change),
            PlanEntry::Orphan { .. } => summary.deletes += 1,
        }
    }
    summary
}

fn marker(entry: &PlanEntry) -> (ColoredString, String) {
    match entry {
        PlanEntry::Orphan { .. } => ("-".red(), "delete (no longer in manifest)".into()),
        PlanEntry::Resource { change, .. } => match change {
            PlannedChange::Create { adoption: None } => ("+".green(), "create".into()),
            PlannedChange::Create {
                adoption: Some(notice),
            } => (
                "+".green(),
                format!(
                    "adopt {} (attributes are {})",
                    notice.remote_id.as_deref().unwrap_or("existing object"),
                    if notice.matches { "the same" } else { "different" }
                ),
            ),
            PlannedChange::Update => ("~".yellow(), "update in place".into()),
            PlannedChange::Replace { reasons } => (
                "-/+".red(),
                format!(
                    "replace ({})",
                    reasons.iter().cloned().collect::<Vec<_>>().join(", ")
                ),
            ),
            PlannedChange::NoChange => ("=".dimmed(), "no change".into()),
        },
    }
}

/// Print a plan
pub fn show(entries: &[PlanEntry]) {
    ui::header("Converge Plan");

    if entries.is_empty() {
        ui::info("Nothing matches");
        return;
    }

    for entry in entries {
        let (symbol, description) = marker(entry);
        let (name, label) = match entry {
            PlanEntry::Resource { name, label, .. } | PlanEntry::Orphan { name, label } => {
                (name, label)
            }
        };
        println!("  {} {} {}", symbol, name.bold(), description);
        ui::dim(&format!("    {label}"));
    }

    let summary = summarize(entries);
    println!();
    if summary.has_changes() {
        ui::info(&format!(
            "Plan: {} to create, {} to update, {} to replace, {} to delete",
            summary.creates, summary.updates, summary.replaces, summary.deletes
        ));
    } else {
        ui::success("No changes. Remote resources match the manifest.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fake::MemoryRemote;
    use crate::config::ManifestResource;
    use declarative::{ProviderState, ResourceRef};
    use serde_json::{Value, json};
    use std::sync::Arc;

    fn resource(name: &str, path: &str, attributes: Value) -> ManifestResource {
        ManifestResource {
            name: name.into(),
            resource: ResourceRef::parse(path).unwrap(),
            attributes: attributes.as_object().cloned().unwrap(),
        }
    }

    fn bound(entry: &ManifestResource, remote_id: &str) -> ProviderState {
        ProviderState {
            remote_id: remote_id.into(),
            inputs: entry.descriptor(),
            info: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_plan_covers_every_change() {
        let remote = Arc::new(MemoryRemote::default());
        remote.insert("ZS9", json!({ "uniqueName": "adopted" }));
        let provider = remote.provider(true);

        let unchanged = resource("same", "serverless/Services", json!({ "uniqueName": "same" }));
        let updated = resource("upd", "serverless/Services", json!({ "uniqueName": "upd" }));
        let moved = resource("moved", "taskrouter/Workspaces/WS2/Workflows", json!({}));
        let manifest = Manifest {
            resources: vec![
                resource("new", "serverless/Services", json!({ "uniqueName": "new" })),
                resource("adopted", "serverless/Services", json!({ "uniqueName": "adopted" })),
                unchanged.clone(),
                updated.clone(),
                moved.clone(),
            ],
        };

        let mut state = StateFile::empty("unused.json");
        state.set("same", bound(&unchanged, "ZS1"));
        let mut stale = bound(&updated, "ZS2");
        stale.inputs.attributes.insert("friendlyName".into(), json!("old"));
        state.set("upd", stale);
        let mut old_home = bound(&moved, "WW1");
        old_home.inputs.resource = ResourceRef::parse("taskrouter/Workspaces/WS1/Workflows").unwrap();
        state.set("moved", old_home);
        state.set("gone", bound(&unchanged, "ZS3"));

        let entries = compute(&provider, &manifest, &state, None).await.unwrap();
        let changes: Vec<_> = entries
            .iter()
            .map(|e| match e {
                PlanEntry::Resource { name, change, .. } => (name.as_str(), Some(change)),
                PlanEntry::Orphan { name, .. } => (name.as_str(), None),
            })
            .collect();

        assert_eq!(changes.len(), 6);
        assert_eq!(changes[0], ("new", Some(&PlannedChange::Create { adoption: None })));
        assert!(matches!(
            changes[1],
            ("adopted", Some(PlannedChange::Create { adoption: Some(n) })) if n.matches
        ));
        assert_eq!(changes[2], ("same", Some(&PlannedChange::NoChange)));
        assert_eq!(changes[3], ("upd", Some(&PlannedChange::Update)));
        assert!(matches!(changes[4], ("moved", Some(PlannedChange::Replace { .. }))));
        assert_eq!(changes[5], ("gone", None));

        let summary = summarize(&entries);
        assert_eq!(
            (summary.creates, summary.updates, summary.replaces, summary.deletes),
            (2, 1, 1, 1)
        );
        assert_eq!((remote.creates(), remote.removes(), remote.len()), (0, 0, 1));
    }

    #[tokio::test]
    async fn test_plan_respects_target() {
        let remote = Arc::new(MemoryRemote::default());
        let provider = remote.provider(false);
        let manifest = Manifest {
            resources: vec![
                resource("a", "serverless/Services", json!({})),
                resource("b", "taskrouter/Workspaces", json!({})),
            ],
        };
        let state = StateFile::empty("unused.json");

        let target = parse_target("Workspaces");
        let entries = compute(&provider, &manifest, &state, Some(&target)).await.unwrap();

        assert_eq!(entries.len(), 1);
        assert!(matches!(&entries[0], PlanEntry::Resource { name, .. } if name == "b"));
    }
}
