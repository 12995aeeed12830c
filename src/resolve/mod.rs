//! Path resolution against a working-directory anchor.
//!
//! Every deletion operand must resolve to a concrete absolute path before the
//! containment check can mean anything. Arguments carrying shell expansion
//! syntax or glob characters cannot be resolved statically; they come back as
//! tagged [`Unresolvable`] reasons and force a block.
//!
//! Resolution order for a plain argument: `~` expansion against the injected
//! home, join onto the working directory, lexical `.`/`..` normalization,
//! then symlink resolution when the path exists on disk. A path that does not
//! exist yet is normal for a deletion target and keeps its normalized form.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Anchors for one gate evaluation.
///
/// Built once per request from the canonicalized working directory and the
/// user's home directory; never cached across requests.
#[derive(Debug, Clone)]
pub struct GuardContext {
    cwd: PathBuf,
    home: PathBuf,
}

impl GuardContext {
    /// Creates a context. `cwd` must already be absolute and canonical.
    #[must_use]
    pub fn new(cwd: PathBuf, home: PathBuf) -> Self {
        Self { cwd, home }
    }

    /// The working directory deletions are confined to.
    #[must_use]
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// The home directory used for `~` expansion.
    #[must_use]
    pub fn home(&self) -> &Path {
        &self.home
    }
}

/// Why a deletion target cannot be pinned down statically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnresolvableKind {
    /// `$VAR` or `${VAR}` expansion.
    Variable,
    /// `$(…)` or backtick substitution.
    CommandSubstitution,
    /// `*`, `?` or `[…]` glob characters.
    Glob,
    /// `~user` for some other user.
    ForeignHome,
    /// Paths arrive on stdin at runtime.
    StreamSourced,
    /// Paths are produced while the command runs.
    DynamicPaths,
    /// A nested shell command string that fails to tokenize.
    MalformedNested,
    /// A shell invocation with no inspectable command string.
    OpaqueShell,
}

/// A reason the analysis must fail closed: a kind tag plus the line reported
/// back to the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unresolvable {
    pub kind: UnresolvableKind,
    pub detail: String,
}

impl Unresolvable {
    fn new(kind: UnresolvableKind, detail: String) -> Self {
        Self { kind, detail }
    }

    pub(crate) fn variable(arg: &str) -> Self {
        Self::new(
            UnresolvableKind::Variable,
            format!("Unresolvable path: {arg} (shell variable)"),
        )
    }

    pub(crate) fn substitution(arg: &str) -> Self {
        Self::new(
            UnresolvableKind::CommandSubstitution,
            format!("Unresolvable path: {arg} (command substitution)"),
        )
    }

    pub(crate) fn glob(arg: &str) -> Self {
        Self::new(
            UnresolvableKind::Glob,
            format!("Unresolvable path: {arg} (glob pattern)"),
        )
    }

    pub(crate) fn foreign_home(arg: &str) -> Self {
        Self::new(
            UnresolvableKind::ForeignHome,
            format!("Unresolvable path: {arg} (home directory of another user)"),
        )
    }

    pub(crate) fn stream_sourced(executor: &str, deletion: &str) -> Self {
        Self::new(
            UnresolvableKind::StreamSourced,
            format!("{executor} with {deletion} - paths come from stdin"),
        )
    }

    pub(crate) fn find_action(action: &str, deletion: &str) -> Self {
        Self::new(
            UnresolvableKind::DynamicPaths,
            format!("find {action} with {deletion} - paths are dynamic"),
        )
    }

    pub(crate) fn find_delete() -> Self {
        Self::new(
            UnresolvableKind::DynamicPaths,
            "find -delete - paths are dynamic".to_string(),
        )
    }

    pub(crate) fn malformed_nested(shell: &str) -> Self {
        Self::new(
            UnresolvableKind::MalformedNested,
            format!("Malformed nested command in {shell} -c"),
        )
    }

    pub(crate) fn opaque_shell(shell: &str) -> Self {
        Self::new(
            UnresolvableKind::OpaqueShell,
            format!("{shell} without an inline -c command - cannot inspect"),
        )
    }
}

impl fmt::Display for Unresolvable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.detail)
    }
}

static BARE_VARIABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$[A-Za-z_]").expect("invalid variable regex"));

static GLOB_BRACKET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[.*\]").expect("invalid bracket regex"));

/// Checks an argument for content that cannot be resolved statically.
///
/// Checks are ordered; a composite argument reports its first matching kind.
/// A lone backtick counts as substitution: a real substitution spanning
/// several words leaves an unpaired backtick in each of its edge tokens.
fn unresolvable_content(arg: &str) -> Option<Unresolvable> {
    if arg.contains("${") {
        return Some(Unresolvable::variable(arg));
    }
    if arg.contains("$(") || arg.contains('`') {
        return Some(Unresolvable::substitution(arg));
    }
    if BARE_VARIABLE.is_match(arg) {
        return Some(Unresolvable::variable(arg));
    }
    if arg.contains('*') || arg.contains('?') || GLOB_BRACKET.is_match(arg) {
        return Some(Unresolvable::glob(arg));
    }
    None
}

/// Resolves `.` and `..` components without touching the filesystem.
///
/// Parent components at the root are clamped, as the kernel does.
#[must_use]
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::RootDir => normalized.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            Component::Normal(part) => normalized.push(part),
            Component::Prefix(prefix) => normalized.push(prefix.as_os_str()),
        }
    }
    normalized
}

/// Resolves one deletion operand to an absolute path.
///
/// # Errors
///
/// Returns the tagged [`Unresolvable`] reason when the argument cannot be
/// resolved statically: expansion syntax, glob characters, or a `~user`
/// reference to a foreign home.
pub fn resolve_path(arg: &str, ctx: &GuardContext) -> Result<PathBuf, Unresolvable> {
    if let Some(reason) = unresolvable_content(arg) {
        return Err(reason);
    }

    let expanded = if arg == "~" {
        ctx.home().to_path_buf()
    } else if let Some(rest) = arg.strip_prefix("~/") {
        ctx.home().join(rest)
    } else if arg.starts_with('~') {
        // ~otheruser: the other user's home cannot be resolved safely
        return Err(Unresolvable::foreign_home(arg));
    } else {
        PathBuf::from(arg)
    };

    let absolute = if expanded.is_absolute() {
        expanded
    } else {
        ctx.cwd().join(expanded)
    };
    let normalized = normalize_lexically(&absolute);

    // Follow symlinks only when the path exists, so a link inside the
    // working directory cannot mask a target outside it. A path that does
    // not exist yet keeps its normalized form.
    match fs::canonicalize(&normalized) {
        Ok(real) => Ok(real),
        Err(_) => Ok(normalized),
    }
}

/// True when `path` is `directory` itself or a descendant of it.
///
/// The comparison is component-wise, so `/home/user` never matches
/// `/home/username`.
#[must_use]
pub fn is_within(path: &Path, directory: &Path) -> bool {
    path.starts_with(directory)
}
