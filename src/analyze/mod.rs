//! Recursive extraction of deletion targets from command lines.
//!
//! # Architecture
//!
//! ```text
//! command line
//!     ↓ tokenize + split
//! simple commands ──► analyze_command()
//!     ├─ wrapper (sudo, env, …)     → skip flags, recurse on the rest
//!     ├─ shell -c "…"               → reparse the payload, recurse
//!     ├─ xargs / parallel           → stream-sourced reason
//!     ├─ find with a deletion step  → dynamic-paths reason
//!     ├─ rm / unlink / rmdir / …    → resolve operands
//!     └─ anything else              → inert
//! ```
//!
//! Recursion terminates because every step either strictly consumes tokens
//! or descends into a distinct nested string. All evidence merges into one
//! [`Analysis`] per line; a single unresolvable reason anywhere is enough to
//! block, so order of discovery never matters.

use std::path::PathBuf;

use tracing::debug;

use crate::classify::{self, CommandClass};
use crate::parse::{self, ParseError};
use crate::resolve::{self, GuardContext, Unresolvable};

/// One unit of recursive analysis: an already tokenized invocation, or a
/// shell `-c` payload that still needs its own parse.
#[derive(Debug)]
pub enum ParsedCommand<'a> {
    /// A tokenized simple command.
    Simple(&'a [String]),
    /// An inline command string from the named shell.
    NestedString { shell: &'a str, text: &'a str },
}

/// Accumulated evidence from one command line.
#[derive(Debug, Default)]
pub struct Analysis {
    /// Deletion targets that resolved to concrete absolute paths.
    pub resolved: Vec<PathBuf>,
    /// Reasons the analysis could not pin down every target.
    pub unresolvable: Vec<Unresolvable>,
}

impl Analysis {
    fn merge(&mut self, other: Analysis) {
        self.resolved.extend(other.resolved);
        self.unresolvable.extend(other.unresolvable);
    }
}

impl From<Unresolvable> for Analysis {
    fn from(reason: Unresolvable) -> Self {
        Self {
            resolved: Vec::new(),
            unresolvable: vec![reason],
        }
    }
}

/// Analyzes a whole command line.
///
/// # Errors
///
/// Returns `ParseError` when the outer line itself fails to tokenize; the
/// caller blocks on it. A nested string that fails to tokenize instead folds
/// into the analysis as an unresolvable reason, so sibling commands still
/// contribute their evidence.
pub fn analyze_line(line: &str, ctx: &GuardContext) -> Result<Analysis, ParseError> {
    let commands = parse::parse_line(line)?;
    let mut analysis = Analysis::default();
    for tokens in &commands {
        analysis.merge(analyze_command(ParsedCommand::Simple(tokens), ctx));
    }
    Ok(analysis)
}

/// Analyzes one parsed command, recursing through wrappers and nested shell
/// strings.
#[must_use]
pub fn analyze_command(command: ParsedCommand<'_>, ctx: &GuardContext) -> Analysis {
    match command {
        ParsedCommand::Simple(tokens) => analyze_tokens(tokens, ctx),
        ParsedCommand::NestedString { shell, text } => match parse::parse_line(text) {
            Ok(commands) => {
                let mut analysis = Analysis::default();
                for tokens in &commands {
                    analysis.merge(analyze_command(ParsedCommand::Simple(tokens), ctx));
                }
                analysis
            }
            Err(err) => {
                debug!(shell, error = %err, "nested command string failed to parse");
                Analysis::from(Unresolvable::malformed_nested(shell))
            }
        },
    }
}

fn analyze_tokens(tokens: &[String], ctx: &GuardContext) -> Analysis {
    let Some(head) = tokens.first() else {
        return Analysis::default();
    };
    match classify::classify(head) {
        CommandClass::Wrapper => analyze_wrapper(tokens, ctx),
        CommandClass::Shell => analyze_shell(tokens, ctx),
        CommandClass::Stream => analyze_stream(tokens),
        CommandClass::Find => analyze_find(tokens),
        CommandClass::Deletion => analyze_deletion(tokens, ctx),
        CommandClass::Inert => Analysis::default(),
    }
}

/// Flags that take their value as a separate token, per wrapper.
fn wrapper_value_flags(name: &str) -> &'static [&'static str] {
    match name {
        "sudo" => &["-u", "-g", "-C"],
        "doas" => &["-u"],
        "env" => &["-u"],
        "nice" => &["-n", "--adjustment"],
        "watch" => &["-n", "--interval"],
        "timeout" => &["-k", "-s", "--kill-after", "--signal"],
        _ => &[],
    }
}

fn analyze_wrapper(tokens: &[String], ctx: &GuardContext) -> Analysis {
    let name = classify::command_basename(&tokens[0]);
    let value_flags = wrapper_value_flags(name);
    let mut index = 1;
    while index < tokens.len() {
        let token = &tokens[index];
        if value_flags.contains(&token.as_str()) {
            index += 2;
        } else if token.starts_with('-') {
            index += 1;
        } else if name == "env" && token.contains('=') {
            // env VAR=value assignments precede the wrapped command
            index += 1;
        } else {
            break;
        }
    }
    // timeout's first operand is the duration, not the wrapped command
    if name == "timeout" && index < tokens.len() {
        index += 1;
    }
    if index < tokens.len() {
        debug!(wrapper = name, "descending into wrapped command");
        analyze_tokens(&tokens[index..], ctx)
    } else {
        Analysis::default()
    }
}

fn analyze_shell(tokens: &[String], ctx: &GuardContext) -> Analysis {
    let shell = classify::command_basename(&tokens[0]);
    for (index, token) in tokens.iter().enumerate().skip(1) {
        if token == "-c" {
            if let Some(payload) = tokens.get(index + 1) {
                debug!(shell, "descending into -c command string");
                return analyze_command(
                    ParsedCommand::NestedString {
                        shell,
                        text: payload.as_str(),
                    },
                    ctx,
                );
            }
            break;
        }
        if !token.starts_with('-') {
            // First operand reached: a script path or session argument. A
            // -c after this point belongs to that script, not the shell.
            break;
        }
    }
    // No inline command string found: the payload may hide in a combined
    // flag cluster or a script file. Refusing to guess fails closed.
    Analysis::from(Unresolvable::opaque_shell(shell))
}

/// xargs/parallel flags that take their value as a separate token.
const STREAM_VALUE_FLAGS: &[&str] = &[
    "-I", "-i", "-n", "-L", "-l", "-P", "-s", "-d", "-a", "-E",
];

fn analyze_stream(tokens: &[String]) -> Analysis {
    let executor = classify::command_basename(&tokens[0]);
    let mut index = 1;
    while index < tokens.len() {
        let token = &tokens[index];
        if STREAM_VALUE_FLAGS.contains(&token.as_str()) {
            index += 2;
        } else if token.starts_with('-') {
            index += 1;
        } else {
            break;
        }
    }
    if let Some(target) = tokens.get(index) {
        if classify::is_deletion_command(target) {
            // Arguments arrive on stdin; nothing to resolve statically
            return Analysis::from(Unresolvable::stream_sourced(
                executor,
                classify::command_basename(target),
            ));
        }
    }
    Analysis::default()
}

fn analyze_find(tokens: &[String]) -> Analysis {
    let mut analysis = Analysis::default();
    for (index, token) in tokens.iter().enumerate() {
        match token.as_str() {
            "-exec" | "-execdir" | "-ok" | "-okdir" => {
                if let Some(target) = tokens.get(index + 1) {
                    if classify::is_deletion_command(target) {
                        analysis.unresolvable.push(Unresolvable::find_action(
                            token,
                            classify::command_basename(target),
                        ));
                    }
                }
            }
            "-delete" => analysis.unresolvable.push(Unresolvable::find_delete()),
            _ => {}
        }
    }
    analysis
}

fn analyze_deletion(tokens: &[String], ctx: &GuardContext) -> Analysis {
    let mut analysis = Analysis::default();
    let mut index = 1;
    while index < tokens.len() {
        let token = &tokens[index];
        if token == "--" {
            index += 1;
            break;
        }
        // Long and combined short options; a lone `-` is an operand
        if token.starts_with('-') && token.len() > 1 {
            index += 1;
            continue;
        }
        break;
    }
    for operand in &tokens[index..] {
        match resolve::resolve_path(operand, ctx) {
            Ok(path) => analysis.resolved.push(path),
            Err(reason) => analysis.unresolvable.push(reason),
        }
    }
    analysis
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::UnresolvableKind;
    use std::path::Path;

    fn ctx() -> GuardContext {
        GuardContext::new(PathBuf::from("/work/project"), PathBuf::from("/home/me"))
    }

    fn analyze(line: &str) -> Analysis {
        analyze_line(line, &ctx()).expect("line should parse")
    }

    fn kinds(analysis: &Analysis) -> Vec<UnresolvableKind> {
        analysis.unresolvable.iter().map(|r| r.kind).collect()
    }

    // =========================================================================
    // Plain deletion commands
    // =========================================================================

    #[test]
    fn test_inert_commands_produce_nothing() {
        let analysis = analyze("ls -la");
        assert!(analysis.resolved.is_empty());
        assert!(analysis.unresolvable.is_empty());
    }

    #[test]
    fn test_deletion_operands_resolve_against_cwd() {
        let analysis = analyze("rm -rf ./notes.txt");
        assert_eq!(
            analysis.resolved,
            vec![PathBuf::from("/work/project/notes.txt")]
        );
    }

    #[test]
    fn test_option_prefix_is_skipped() {
        let analysis = analyze("rm -r -f --verbose --interactive=never a b");
        assert_eq!(
            analysis.resolved,
            vec![
                PathBuf::from("/work/project/a"),
                PathBuf::from("/work/project/b"),
            ]
        );
    }

    #[test]
    fn test_double_dash_ends_options() {
        let analysis = analyze("rm -f -- -looks-like-a-flag");
        assert_eq!(
            analysis.resolved,
            vec![PathBuf::from("/work/project/-looks-like-a-flag")]
        );
    }

    #[test]
    fn test_deletion_without_operands_is_empty() {
        let analysis = analyze("rm -rf");
        assert!(analysis.resolved.is_empty());
        assert!(analysis.unresolvable.is_empty());
    }

    #[test]
    fn test_all_deletion_commands_are_analyzed() {
        for cmd in ["rm", "unlink", "rmdir", "shred"] {
            let analysis = analyze(&format!("{cmd} /tmp/target"));
            assert_eq!(
                analysis.resolved,
                vec![PathBuf::from("/tmp/target")],
                "cmd: {cmd}"
            );
        }
    }

    // =========================================================================
    // Chains and pipelines
    // =========================================================================

    #[test]
    fn test_every_segment_contributes() {
        let analysis = analyze("ls && rm a; rm b");
        assert_eq!(
            analysis.resolved,
            vec![
                PathBuf::from("/work/project/a"),
                PathBuf::from("/work/project/b"),
            ]
        );
    }

    #[test]
    fn test_unresolvable_and_resolved_accumulate() {
        let analysis = analyze("rm a; rm $TARGET");
        assert_eq!(analysis.resolved.len(), 1);
        assert_eq!(kinds(&analysis), vec![UnresolvableKind::Variable]);
    }

    // =========================================================================
    // Wrappers
    // =========================================================================

    #[test]
    fn test_wrappers_descend_into_wrapped_command() {
        for line in [
            "sudo rm -rf /tmp/x",
            "doas rm /tmp/x",
            "nohup rm /tmp/x",
            "nice -n 10 rm /tmp/x",
            "time rm /tmp/x",
            "watch -n 5 rm /tmp/x",
        ] {
            let analysis = analyze(line);
            assert_eq!(
                analysis.resolved,
                vec![PathBuf::from("/tmp/x")],
                "line: {line}"
            );
        }
    }

    #[test]
    fn test_sudo_value_flags_consume_their_argument() {
        let analysis = analyze("sudo -u root rm /tmp/x");
        assert_eq!(analysis.resolved, vec![PathBuf::from("/tmp/x")]);
    }

    #[test]
    fn test_env_assignments_are_skipped() {
        let analysis = analyze("env RUST_LOG=debug FOO=bar rm /tmp/x");
        assert_eq!(analysis.resolved, vec![PathBuf::from("/tmp/x")]);
    }

    #[test]
    fn test_timeout_duration_is_consumed() {
        let analysis = analyze("timeout 10 rm /tmp/x");
        assert_eq!(analysis.resolved, vec![PathBuf::from("/tmp/x")]);
        let analysis = analyze("timeout -k 5 30s rm /tmp/x");
        assert_eq!(analysis.resolved, vec![PathBuf::from("/tmp/x")]);
    }

    #[test]
    fn test_nested_wrappers_recurse() {
        let analysis = analyze("sudo env nice rm /tmp/x");
        assert_eq!(analysis.resolved, vec![PathBuf::from("/tmp/x")]);
    }

    #[test]
    fn test_bare_wrapper_is_empty() {
        let analysis = analyze("sudo -v");
        assert!(analysis.resolved.is_empty());
        assert!(analysis.unresolvable.is_empty());
    }

    // =========================================================================
    // Shell -c payloads
    // =========================================================================

    #[test]
    fn test_shell_dash_c_reenters_the_pipeline() {
        let analysis = analyze(r#"bash -c "rm -rf /etc""#);
        assert_eq!(analysis.resolved, vec![PathBuf::from("/etc")]);
        // flags before -c do not end the scan
        let analysis = analyze(r#"bash --noprofile -c "rm -rf /etc""#);
        assert_eq!(analysis.resolved, vec![PathBuf::from("/etc")]);
    }

    #[test]
    fn test_shell_payload_with_chain() {
        let analysis = analyze(r#"sh -c "cd /tmp && rm -rf subdir""#);
        assert_eq!(analysis.resolved, vec![PathBuf::from("/work/project/subdir")]);
    }

    #[test]
    fn test_shell_without_inline_command_fails_closed() {
        let analysis = analyze("bash script.sh");
        assert_eq!(kinds(&analysis), vec![UnresolvableKind::OpaqueShell]);
        let analysis = analyze("zsh");
        assert_eq!(kinds(&analysis), vec![UnresolvableKind::OpaqueShell]);
        // A clustered -c is not detected as inline either
        let analysis = analyze(r#"bash -lc "rm x""#);
        assert_eq!(kinds(&analysis), vec![UnresolvableKind::OpaqueShell]);
    }

    #[test]
    fn test_dash_c_after_a_script_operand_stays_opaque() {
        // Here -c is an argument to the script, not the shell; honoring it
        // would turn a blocked script invocation into an allow
        let analysis = analyze("bash cleanup.sh -c true");
        assert_eq!(kinds(&analysis), vec![UnresolvableKind::OpaqueShell]);
        assert!(analysis.unresolvable[0]
            .detail
            .contains("bash without an inline -c command"));
    }

    #[test]
    fn test_malformed_nested_string_folds_into_reasons() {
        let analysis = analyze(r#"bash -c "rm 'oops""#);
        assert_eq!(kinds(&analysis), vec![UnresolvableKind::MalformedNested]);
        assert!(analysis.unresolvable[0]
            .detail
            .contains("Malformed nested command in bash -c"));
    }

    #[test]
    fn test_wrapper_over_shell() {
        let analysis = analyze(r#"sudo sh -c "rm /var/log/syslog""#);
        assert_eq!(analysis.resolved, vec![PathBuf::from("/var/log/syslog")]);
    }

    // =========================================================================
    // Stream executors
    // =========================================================================

    #[test]
    fn test_xargs_with_deletion_is_stream_sourced() {
        let analysis = analyze("echo hi | xargs rm");
        assert_eq!(kinds(&analysis), vec![UnresolvableKind::StreamSourced]);
        assert!(analysis.unresolvable[0]
            .detail
            .contains("xargs with rm - paths come from stdin"));
    }

    #[test]
    fn test_xargs_flags_and_values_are_skipped() {
        let analysis = analyze("find . -name '?' | xargs -0 -n 1 rm -f");
        assert!(kinds(&analysis).contains(&UnresolvableKind::StreamSourced));
        let analysis = analyze("ls | xargs -I {} rm {}");
        assert_eq!(kinds(&analysis), vec![UnresolvableKind::StreamSourced]);
    }

    #[test]
    fn test_parallel_matches_xargs_treatment() {
        let analysis = analyze("cat list | parallel rm");
        assert_eq!(kinds(&analysis), vec![UnresolvableKind::StreamSourced]);
    }

    #[test]
    fn test_xargs_without_deletion_is_inert() {
        let analysis = analyze("ls | xargs wc -l");
        assert!(analysis.unresolvable.is_empty());
        assert!(analysis.resolved.is_empty());
    }

    // =========================================================================
    // find
    // =========================================================================

    #[test]
    fn test_find_exec_with_deletion_is_dynamic() {
        let analysis = analyze(r"find . -name '*.bak' -exec rm {} \;");
        assert_eq!(kinds(&analysis), vec![UnresolvableKind::DynamicPaths]);
        assert!(analysis.unresolvable[0]
            .detail
            .contains("find -exec with rm - paths are dynamic"));
    }

    #[test]
    fn test_find_exec_variants() {
        for action in ["-exec", "-execdir", "-ok", "-okdir"] {
            let analysis = analyze(&format!(r"find /tmp {action} rm {{}} \;"));
            assert_eq!(
                kinds(&analysis),
                vec![UnresolvableKind::DynamicPaths],
                "action: {action}"
            );
        }
    }

    #[test]
    fn test_find_delete_is_dynamic() {
        let analysis = analyze("find . -name 'x' -delete");
        assert_eq!(kinds(&analysis), vec![UnresolvableKind::DynamicPaths]);
    }

    #[test]
    fn test_find_without_deletion_action_is_inert() {
        let analysis = analyze("find . -name 'x' -print");
        assert!(analysis.unresolvable.is_empty());
        let analysis = analyze("find . -exec wc {} \\;");
        assert!(analysis.unresolvable.is_empty());
    }

    // =========================================================================
    // Incidental captures
    // =========================================================================

    #[test]
    fn test_redirection_target_is_captured_as_operand() {
        let analysis = analyze("rm x > /etc/passwd");
        assert!(analysis
            .resolved
            .contains(&PathBuf::from("/etc/passwd")));
    }

    #[test]
    fn test_tilde_operand_resolves_to_home() {
        let analysis = analyze("rm ~/notes.txt");
        assert_eq!(analysis.resolved, vec![PathBuf::from("/home/me/notes.txt")]);
    }

    #[test]
    fn test_direct_recursion_entry_points() {
        let context = ctx();
        let tokens: Vec<String> = ["rm", "a"].iter().map(|s| (*s).to_string()).collect();
        let analysis = analyze_command(ParsedCommand::Simple(&tokens), &context);
        assert_eq!(analysis.resolved, vec![PathBuf::from("/work/project/a")]);

        let analysis = analyze_command(
            ParsedCommand::NestedString {
                shell: "sh",
                text: "rm b",
            },
            &context,
        );
        assert_eq!(analysis.resolved, vec![Path::new("/work/project/b").to_path_buf()]);
    }
}
