//! The allow/block decision and its diagnostic rendering.
//!
//! The policy is a pure function of the accumulated analysis and the
//! working-directory anchor, applied in a fixed order:
//!
//! 1. an unparseable line blocks as malformed;
//! 2. any unresolvable reason blocks, citing every reason. Resolved paths
//!    are irrelevant once ambiguity exists;
//! 3. any resolved target outside the working directory blocks, citing the
//!    first offender;
//! 4. otherwise the command is allowed.
//!
//! A block's `Display` output is the exact stderr diagnostic the agent sees.

use std::fmt;
use std::path::PathBuf;

use crate::analyze::Analysis;
use crate::resolve::{self, GuardContext, Unresolvable};

/// Outcome of gating one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The command may run.
    Allow,
    /// The command must not run; the report says why.
    Block(Blocked),
}

impl Verdict {
    #[must_use]
    pub fn is_allow(&self) -> bool {
        matches!(self, Verdict::Allow)
    }

    #[must_use]
    pub fn is_block(&self) -> bool {
        !self.is_allow()
    }

    /// The process exit status the hook protocol expects.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Verdict::Allow => 0,
            Verdict::Block(_) => 2,
        }
    }
}

/// A block decision with everything needed to explain it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Blocked {
    /// The command line failed to tokenize.
    Malformed { command: String },
    /// At least one deletion target could not be resolved statically.
    Unresolvable {
        reasons: Vec<Unresolvable>,
        command: String,
        working_dir: PathBuf,
    },
    /// A resolved deletion target falls outside the working directory.
    OutsideWorkingDir {
        target: PathBuf,
        working_dir: PathBuf,
        command: String,
    },
    /// The request itself was unusable (bad JSON, bad working directory).
    InvalidRequest { message: String },
}

impl fmt::Display for Blocked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Blocked::Malformed { command } => {
                write!(
                    f,
                    "BLOCKED: Malformed command (unclosed quotes or syntax error)\n  Command: {command}"
                )
            }
            Blocked::Unresolvable {
                reasons,
                command,
                working_dir,
            } => {
                write!(
                    f,
                    "BLOCKED: Command contains rm with unresolvable paths (safety block)\n  Reasons:"
                )?;
                for reason in reasons {
                    write!(f, "\n  - {reason}")?;
                }
                write!(
                    f,
                    "\n  Command: {command}\n  Working directory: {}",
                    working_dir.display()
                )
            }
            Blocked::OutsideWorkingDir {
                target,
                working_dir,
                command,
            } => {
                write!(
                    f,
                    "BLOCKED: rm targets path outside working directory\n  Target: {}\n  Working directory: {}\n  Command: {command}",
                    target.display(),
                    working_dir.display()
                )
            }
            Blocked::InvalidRequest { message } => f.write_str(message),
        }
    }
}

/// Applies the decision policy to a completed analysis.
#[must_use]
pub fn evaluate(analysis: &Analysis, command: &str, ctx: &GuardContext) -> Verdict {
    if !analysis.unresolvable.is_empty() {
        return Verdict::Block(Blocked::Unresolvable {
            reasons: analysis.unresolvable.clone(),
            command: command.to_string(),
            working_dir: ctx.cwd().to_path_buf(),
        });
    }

    for path in &analysis.resolved {
        if !resolve::is_within(path, ctx.cwd()) {
            return Verdict::Block(Blocked::OutsideWorkingDir {
                target: path.clone(),
                working_dir: ctx.cwd().to_path_buf(),
                command: command.to_string(),
            });
        }
    }

    Verdict::Allow
}
