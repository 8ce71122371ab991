use std::env;
use std::fs;
use std::path::Path;
use std::process::Command;

use anyhow::{bail, Context, Result};

use crate::config::EditorConfig;

const DRAFT_PREFIX: &str = "entry-";
const DRAFT_SUFFIX: &str = ".md";

/// A resolved editor invocation: program plus leading arguments. The draft
/// path is appended as the final argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorCommand {
    pub program: String,
    pub args: Vec<String>,
}

/// Split a user-supplied editor spec ("code --wait") into an invocation.
pub fn parse_command(spec: &str) -> Result<EditorCommand> {
    let mut parts = spec.split_whitespace().map(str::to_string);
    let Some(program) = parts.next() else {
        bail!("editor command cannot be empty");
    };
    Ok(EditorCommand {
        program,
        args: parts.collect(),
    })
}

/// Pick the editor to launch: config command, then $VISUAL, then $EDITOR,
/// then the configured fallback program.
pub fn resolve(config: &EditorConfig) -> EditorCommand {
    resolve_from(
        config,
        env::var("VISUAL").ok(),
        env::var("EDITOR").ok(),
    )
}

fn resolve_from(
    config: &EditorConfig,
    visual: Option<String>,
    editor: Option<String>,
) -> EditorCommand {
    let candidates = [config.command.clone(), visual, editor];
    for candidate in candidates.into_iter().flatten() {
        match parse_command(&candidate) {
            Ok(command) => return command,
            Err(_) => {
                tracing::warn!(spec = %candidate, "ignoring blank editor setting");
            }
        }
    }
    EditorCommand {
        program: config.fallback.clone(),
        args: Vec::new(),
    }
}

/// Open the editor on a fresh draft file and return what the user wrote.
/// Returns `Ok(None)` when the draft is empty after trimming, which callers
/// treat as an aborted entry. The draft file is removed when the handle
/// drops.
pub fn compose(editor: &EditorCommand, draft_dir: &Path) -> Result<Option<String>> {
    fs::create_dir_all(draft_dir)
        .with_context(|| format!("creating draft directory {}", draft_dir.display()))?;
    let draft = tempfile::Builder::new()
        .prefix(DRAFT_PREFIX)
        .suffix(DRAFT_SUFFIX)
        .tempfile_in(draft_dir)
        .with_context(|| format!("creating draft file in {}", draft_dir.display()))?;

    tracing::debug!(program = %editor.program, draft = %draft.path().display(), "launching editor");
    let status = Command::new(&editor.program)
        .args(&editor.args)
        .arg(draft.path())
        .status()
        .with_context(|| format!("launching editor '{}'", editor.program))?;
    if !status.success() {
        bail!("editor '{}' exited with {status}", editor.program);
    }

    let content = fs::read_to_string(draft.path())
        .with_context(|| format!("reading draft {}", draft.path().display()))?;
    if content.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(content))
}
