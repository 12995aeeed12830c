//! PreToolUse request handling.
//!
//! Claude Code runs the gate once per tool call, writing a JSON object to its
//! stdin and reading the exit status: 0 lets the tool call proceed, 2 blocks
//! it and surfaces stderr to the model. Only `Bash` tool calls with a
//! non-empty command are analyzed; every other request is allowed through.
//!
//! A request that cannot be understood (malformed JSON, unusable working
//! directory) blocks; a request for some other tool is none of this gate's
//! business and passes through.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;
use tracing::debug;

use crate::analyze;
use crate::classify;
use crate::resolve::GuardContext;
use crate::verdict::{self, Blocked, Verdict};

/// A PreToolUse payload as delivered on stdin.
///
/// Unknown fields are ignored and known fields default when absent, so the
/// gate stays compatible with payload additions on the host side.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HookRequest {
    #[serde(default)]
    pub tool_name: String,
    #[serde(default)]
    pub tool_input: ToolInput,
    #[serde(default)]
    pub cwd: String,
}

/// The `tool_input` object of a Bash tool call.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolInput {
    #[serde(default)]
    pub command: String,
}

impl HookRequest {
    /// Parses a request from raw JSON.
    ///
    /// # Errors
    ///
    /// Returns the deserialization error for malformed JSON; the gate blocks
    /// on it rather than guessing.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

/// Evaluates one raw request end to end. Never panics and never errors:
/// every failure mode folds into a [`Verdict`].
#[must_use]
pub fn evaluate_request(raw: &str) -> Verdict {
    match HookRequest::from_json(raw) {
        Ok(request) => evaluate_hook(&request),
        Err(err) => Verdict::Block(Blocked::InvalidRequest {
            message: format!("ERROR: Invalid JSON input: {err}"),
        }),
    }
}

/// Evaluates an already parsed request.
#[must_use]
pub fn evaluate_hook(request: &HookRequest) -> Verdict {
    if request.tool_name != "Bash" {
        return Verdict::Allow;
    }
    let command = request.tool_input.command.as_str();
    if command.is_empty() {
        return Verdict::Allow;
    }

    let cwd = Path::new(&request.cwd);
    if request.cwd.is_empty() || !cwd.is_dir() {
        return Verdict::Block(Blocked::InvalidRequest {
            message: format!(
                "ERROR: Invalid or missing working directory: {}",
                request.cwd
            ),
        });
    }
    let abs_cwd = match std::fs::canonicalize(cwd) {
        Ok(path) => path,
        Err(err) => {
            return Verdict::Block(Blocked::InvalidRequest {
                message: format!("ERROR: Cannot resolve working directory: {err}"),
            })
        }
    };

    // Fast path: nothing on the line even names a tracked command
    if !classify::mentions_tracked_command(command) {
        debug!("no tracked command names; allowing without analysis");
        return Verdict::Allow;
    }

    let Some(home) = home_dir() else {
        return Verdict::Block(Blocked::InvalidRequest {
            message: "ERROR: Cannot determine home directory".to_string(),
        });
    };

    let ctx = GuardContext::new(abs_cwd, home);
    match analyze::analyze_line(command, &ctx) {
        Ok(analysis) => {
            debug!(
                resolved = analysis.resolved.len(),
                unresolvable = analysis.unresolvable.len(),
                "analysis complete"
            );
            verdict::evaluate(&analysis, command, &ctx)
        }
        Err(err) => {
            debug!(error = %err, "command line failed to tokenize");
            Verdict::Block(Blocked::Malformed {
                command: command.to_string(),
            })
        }
    }
}

/// Reads one request from stdin and evaluates it.
///
/// # Errors
///
/// Errors only when stdin cannot be read at all; everything else becomes a
/// verdict.
pub fn run_gate() -> anyhow::Result<Verdict> {
    let mut raw = String::new();
    std::io::stdin()
        .read_to_string(&mut raw)
        .context("failed to read hook input from stdin")?;
    Ok(evaluate_request(&raw))
}

/// The current user's home directory: `$HOME` first, then the platform
/// lookup.
pub(crate) fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(|| directories::BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf()))
}
