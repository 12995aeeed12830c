//! Registration of the gate in the agent's settings file.
//!
//! `palisade install` writes a PreToolUse hook entry into
//! `~/.claude/settings.json` so the agent runs the gate before every Bash
//! tool call, and adds ask-confirmation patterns for the deletion commands
//! as a second layer. `palisade uninstall` removes exactly what install
//! added and leaves everything else in the file alone.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use tracing::{debug, info};

pub mod settings;

pub use settings::ASK_PERMISSIONS;

/// Returns the settings file the agent reads hooks from.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn default_settings_path() -> Result<PathBuf> {
    let home = crate::hook::home_dir().ok_or_else(|| anyhow!("Could not determine home directory"))?;
    Ok(home.join(".claude").join("settings.json"))
}

/// Registers the running binary as a PreToolUse hook for Bash commands.
///
/// The binary's own path becomes the hook command, so the installed entry
/// keeps working when PATH changes. Ask-confirmation patterns for the
/// deletion commands are added alongside unless `no_ask_permissions` is
/// set. The settings file is written only when something changed.
///
/// # Errors
///
/// Returns an error if the settings file cannot be read, parsed, or
/// written. A file that fails to parse is never overwritten.
pub fn run_install(no_ask_permissions: bool, settings_path: Option<PathBuf>) -> Result<()> {
    let path = resolve_settings_path(settings_path)?;
    let command = current_command()?;

    let mut document = load_settings(&path)?;
    let mut changed = settings::add_hook(&mut document, &command);
    if changed {
        println!("Registered PreToolUse hook: {command}");
    } else {
        println!("PreToolUse hook already registered");
    }

    if !no_ask_permissions {
        let added = settings::add_ask_permissions(&mut document);
        for pattern in &added {
            println!("Added ask permission: {pattern}");
        }
        changed = changed || !added.is_empty();
    }

    if changed {
        save_settings(&path, &document)?;
        info!(path = %path.display(), "Updated settings");
        println!("Settings saved to {}", path.display());
    } else {
        println!("No changes needed");
    }
    Ok(())
}

/// Removes the hook entry and ask-confirmation patterns that install added.
///
/// Containers emptied by the removal are cleaned up; hooks and permissions
/// registered by anything else are untouched.
///
/// # Errors
///
/// Returns an error if the settings file cannot be read, parsed, or
/// written.
pub fn run_uninstall(settings_path: Option<PathBuf>) -> Result<()> {
    let path = resolve_settings_path(settings_path)?;
    if !path.exists() {
        println!("No settings file at {}; nothing to remove", path.display());
        return Ok(());
    }
    let command = current_command()?;

    let mut document = load_settings(&path)?;
    let mut changed = settings::remove_hook(&mut document, &command);
    if changed {
        println!("Removed PreToolUse hook: {command}");
    } else {
        println!("PreToolUse hook was not registered");
    }

    let removed = settings::remove_ask_permissions(&mut document);
    for pattern in &removed {
        println!("Removed ask permission: {pattern}");
    }
    changed = changed || !removed.is_empty();

    if changed {
        save_settings(&path, &document)?;
        info!(path = %path.display(), "Updated settings");
        println!("Settings saved to {}", path.display());
    } else {
        println!("No changes needed");
    }
    Ok(())
}

fn resolve_settings_path(settings_path: Option<PathBuf>) -> Result<PathBuf> {
    match settings_path {
        Some(path) => Ok(path),
        None => default_settings_path(),
    }
}

/// Returns the hook command string to register: the running binary's path.
fn current_command() -> Result<String> {
    let executable =
        std::env::current_exe().context("Failed to resolve the path of the running binary")?;
    Ok(executable.to_string_lossy().into_owned())
}

/// Loads the settings document, treating a missing file as empty.
///
/// # Errors
///
/// Returns an error if the file exists but does not parse as JSON. Nothing
/// is ever merged into a document that could not be read back faithfully.
fn load_settings(path: &Path) -> Result<Value> {
    if !path.exists() {
        return Ok(serde_json::json!({}));
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let document: Value = serde_json::from_str(&content).with_context(|| {
        format!(
            "Settings file {} is not valid JSON; fix or remove it before installing",
            path.display()
        )
    })?;
    if !document.is_object() {
        anyhow::bail!(
            "Settings file {} does not contain a JSON object",
            path.display()
        );
    }
    Ok(document)
}

/// Saves the settings document as pretty-printed JSON with a trailing
/// newline.
fn save_settings(path: &Path, document: &Value) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let mut content = serde_json::to_string_pretty(document)?;
    content.push('\n');
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    debug!(path = %path.display(), "Saved settings");
    Ok(())
}
