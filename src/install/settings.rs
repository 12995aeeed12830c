//! Pure edits over the Claude Code settings document.
//!
//! The settings file is shared with the host agent and with anything else
//! the user configured, so edits work on raw [`serde_json::Value`] trees:
//! foreign keys round-trip untouched, additions never clobber, and removals
//! take out exactly what an install added, cascading away containers they
//! emptied.

use serde_json::{json, Value};

/// Tool patterns that should prompt for confirmation before running.
pub const ASK_PERMISSIONS: &[&str] = &["Bash(rm:*)", "Bash(unlink:*)", "Bash(rmdir:*)"];

const MATCHER: &str = "Bash";

/// Adds the PreToolUse hook entry for `command` under the Bash matcher.
///
/// Creates the `hooks.PreToolUse` array and the matcher entry as needed.
/// Returns whether the document changed; an identical registration is left
/// alone.
pub fn add_hook(settings: &mut Value, command: &str) -> bool {
    let hooks = ensure_object_entry(settings, "hooks");
    let pre_tool_use = ensure_array_entry(hooks, "PreToolUse");

    let position = pre_tool_use
        .iter()
        .position(|entry| entry.get("matcher").and_then(Value::as_str) == Some(MATCHER));
    let index = match position {
        Some(index) => index,
        None => {
            pre_tool_use.push(json!({ "matcher": MATCHER, "hooks": [] }));
            pre_tool_use.len() - 1
        }
    };

    let entry_hooks = ensure_array_entry(&mut pre_tool_use[index], "hooks");
    let already_present = entry_hooks
        .iter()
        .any(|hook| hook.get("command").and_then(Value::as_str) == Some(command));
    if already_present {
        return false;
    }

    entry_hooks.push(json!({ "type": "command", "command": command }));
    true
}

/// Removes the PreToolUse hook entry for `command`, cascading cleanup of the
/// containers it leaves empty: hooks array, matcher entry, `PreToolUse`,
/// then `hooks` itself.
///
/// Returns whether the document changed. Hooks registered by anything else
/// are never touched.
pub fn remove_hook(settings: &mut Value, command: &str) -> bool {
    let Some(pre_tool_use) = settings
        .get_mut("hooks")
        .and_then(|hooks| hooks.get_mut("PreToolUse"))
        .and_then(Value::as_array_mut)
    else {
        return false;
    };

    let Some(matcher_index) = pre_tool_use
        .iter()
        .position(|entry| entry.get("matcher").and_then(Value::as_str) == Some(MATCHER))
    else {
        return false;
    };

    let Some(entry_hooks) = pre_tool_use[matcher_index]
        .get_mut("hooks")
        .and_then(Value::as_array_mut)
    else {
        return false;
    };

    let Some(hook_index) = entry_hooks
        .iter()
        .position(|hook| hook.get("command").and_then(Value::as_str) == Some(command))
    else {
        return false;
    };

    entry_hooks.remove(hook_index);

    if entry_hooks.is_empty() {
        pre_tool_use.remove(matcher_index);
        if pre_tool_use.is_empty() {
            remove_object_entry(settings, "hooks", "PreToolUse");
        }
    }
    true
}

/// Adds the ask-confirmation patterns to `permissions.ask`.
///
/// Returns the patterns actually added; ones already present are skipped.
pub fn add_ask_permissions(settings: &mut Value) -> Vec<&'static str> {
    let permissions = ensure_object_entry(settings, "permissions");
    let ask = ensure_array_entry(permissions, "ask");

    let mut added = Vec::new();
    for pattern in ASK_PERMISSIONS {
        let present = ask.iter().any(|entry| entry.as_str() == Some(*pattern));
        if !present {
            ask.push(Value::String((*pattern).to_string()));
            added.push(*pattern);
        }
    }
    added
}

/// Removes the ask-confirmation patterns, cascading cleanup of an emptied
/// `ask` array and `permissions` object.
///
/// Returns the patterns actually removed.
pub fn remove_ask_permissions(settings: &mut Value) -> Vec<&'static str> {
    let Some(ask) = settings
        .get_mut("permissions")
        .and_then(|permissions| permissions.get_mut("ask"))
        .and_then(Value::as_array_mut)
    else {
        return Vec::new();
    };

    let mut removed = Vec::new();
    for pattern in ASK_PERMISSIONS {
        if let Some(index) = ask.iter().position(|entry| entry.as_str() == Some(*pattern)) {
            ask.remove(index);
            removed.push(*pattern);
        }
    }

    if ask.is_empty() {
        remove_object_entry(settings, "permissions", "ask");
    }
    removed
}

/// Returns the object entry at `key`, inserting an empty object if the key
/// is absent or holds something that is not an object.
fn ensure_object_entry<'a>(parent: &'a mut Value, key: &str) -> &'a mut Value {
    let entry = as_object(parent).entry(key.to_string()).or_insert_with(|| json!({}));
    if !entry.is_object() {
        *entry = json!({});
    }
    entry
}

/// Returns the array entry at `key`, inserting an empty array if the key is
/// absent or holds something that is not an array.
fn ensure_array_entry<'a>(parent: &'a mut Value, key: &str) -> &'a mut Vec<Value> {
    let entry = as_object(parent).entry(key.to_string()).or_insert_with(|| json!([]));
    if !entry.is_array() {
        *entry = json!([]);
    }
    entry.as_array_mut().expect("entry was just coerced to an array")
}

/// Coerces a value to an object in place. A scalar sitting where a container
/// belongs cannot be merged into, so it is replaced.
fn as_object(value: &mut Value) -> &mut serde_json::Map<String, Value> {
    if !value.is_object() {
        *value = json!({});
    }
    value.as_object_mut().expect("value was just coerced to an object")
}

/// Removes `parent_key.child_key`, then `parent_key` itself if that left it
/// empty.
fn remove_object_entry(settings: &mut Value, parent_key: &str, child_key: &str) {
    let Some(parent) = settings.get_mut(parent_key).and_then(Value::as_object_mut) else {
        return;
    };
    parent.remove(child_key);
    if parent.is_empty() {
        if let Some(object) = settings.as_object_mut() {
            object.remove(parent_key);
        }
    }
}
