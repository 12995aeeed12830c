//! Command-name classification.
//!
//! Two closed sets drive the gate: deletion commands, which remove filesystem
//! entries, and executors, which can run a deletion command indirectly.
//! Matching is case-sensitive and keyed on the basename, so `/bin/rm` and
//! `rm` classify identically.

use once_cell::sync::Lazy;
use regex::Regex;

/// Commands that delete filesystem entries.
pub const DELETION_COMMANDS: &[&str] = &["rm", "unlink", "rmdir", "shred"];

/// Wrappers that run their argument vector as a command after their own
/// flags (privilege, environment, scheduling, repetition).
const WRAPPER_COMMANDS: &[&str] = &[
    "sudo", "doas", "env", "nice", "nohup", "time", "timeout", "watch",
];

/// Shell interpreters that accept an inline command string via `-c`.
const SHELL_COMMANDS: &[&str] = &["sh", "bash", "zsh", "dash", "fish"];

/// Executors whose argument paths arrive on a data stream at runtime.
const STREAM_COMMANDS: &[&str] = &["xargs", "parallel"];

const FIND_COMMAND: &str = "find";

/// How the analyzer treats an invocation, decided by its head token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandClass {
    /// Deletes the paths in its operands.
    Deletion,
    /// Runs its trailing argument vector as a command.
    Wrapper,
    /// Runs an inline command string (`sh -c "..."`).
    Shell,
    /// Feeds stdin-derived arguments to a command (`xargs`, `parallel`).
    Stream,
    /// Walks the filesystem and can act on each entry (`find`).
    Find,
    /// Cannot delete anything; not analyzed further.
    Inert,
}

/// Strips any directory prefix from a command token.
#[must_use]
pub fn command_basename(token: &str) -> &str {
    token.rsplit('/').next().unwrap_or(token)
}

/// Classifies a head token by its basename.
#[must_use]
pub fn classify(head: &str) -> CommandClass {
    let name = command_basename(head);
    if DELETION_COMMANDS.contains(&name) {
        CommandClass::Deletion
    } else if WRAPPER_COMMANDS.contains(&name) {
        CommandClass::Wrapper
    } else if SHELL_COMMANDS.contains(&name) {
        CommandClass::Shell
    } else if STREAM_COMMANDS.contains(&name) {
        CommandClass::Stream
    } else if name == FIND_COMMAND {
        CommandClass::Find
    } else {
        CommandClass::Inert
    }
}

/// True when the token names a deletion command, under any path spelling.
#[must_use]
pub fn is_deletion_command(token: &str) -> bool {
    DELETION_COMMANDS.contains(&command_basename(token))
}

/// Word-boundary scan over every tracked name, compiled once.
///
/// Basenames cover path spellings: `\brm\b` also hits `/bin/rm` because
/// `/` is not a word character.
static TRACKED_NAME: Lazy<Regex> = Lazy::new(|| {
    let mut names: Vec<&str> = Vec::new();
    names.extend_from_slice(DELETION_COMMANDS);
    names.extend_from_slice(WRAPPER_COMMANDS);
    names.extend_from_slice(SHELL_COMMANDS);
    names.extend_from_slice(STREAM_COMMANDS);
    names.push(FIND_COMMAND);
    let pattern = format!(r"\b(?:{})\b", names.join("|"));
    Regex::new(&pattern).expect("invalid tracked-name regex")
});

/// Fast pre-scan: does the line mention any tracked command name at all?
///
/// A miss means the full analysis can be skipped. False positives (a tracked
/// name appearing as data, like `grep rm log`) fall through to the full
/// analysis, which classifies them as inert.
#[must_use]
pub fn mentions_tracked_command(line: &str) -> bool {
    TRACKED_NAME.is_match(line)
}
