use anyhow::Result;
use colored::Colorize;

use crate::Context;
use crate::config::Manifest;
use crate::state::StateFile;
use crate::ui;

/// Show what the state file knows, without contacting the remote
pub fn run(ctx: &Context) -> Result<()> {
    ui::header("Converge Status");

    let state = StateFile::load(&ctx.state_path)?;
    let manifest = if ctx.manifest_path.exists() {
        Some(Manifest::load(&ctx.manifest_path)?)
    } else {
        None
    };

    ui::kv("State", &state.path().display().to_string());
    if !state.is_empty() {
        ui::kv(
            "Last updated",
            &state
                .last_updated
                .format("%Y-%m-%d %H:%M:%S UTC")
                .to_string(),
        );
    }

    if state.is_empty() && manifest.as_ref().is_none_or(|m| m.resources.is_empty()) {
        ui::info("No resources yet. Run `converge apply` to create them.");
        return Ok(());
    }

    ui::section("Resources");

    for (name, entry) in &state.resources {
        let in_manifest = manifest.as_ref().is_none_or(|m| m.get(name).is_some());
        let icon = if in_manifest { "✓".green() } else { "⚠".yellow() };

        println!(
            "  {} {} {}",
            icon,
            name.bold(),
            format!("({})", entry.remote_id).dimmed()
        );
        ui::dim(&format!("    {}", entry.inputs.resource));
        if !in_manifest {
            ui::dim("    no longer in manifest, apply will delete it");
        }
        if ctx.verbose > 0 && !ctx.quiet {
            for (key, value) in &entry.info {
                ui::dim(&format!("    {key}: {value}"));
            }
        }
    }

    if let Some(manifest) = &manifest {
        for entry in &manifest.resources {
            if state.get(&entry.name).is_none() {
                println!(
                    "  {} {} {}",
                    "✗".red(),
                    entry.name.bold(),
                    "(not applied)".dimmed()
                );
                ui::dim(&format!("    {}", entry.resource));
            }
        }
    }

    Ok(())
}
