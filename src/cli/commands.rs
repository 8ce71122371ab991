use std::fmt::Write as _;
use std::io::{self, Read};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::config::AppConfig;
use crate::editor;
use crate::journal::{Entry, Journal};
use crate::storage::JournalStore;

#[derive(Args, Debug, Clone, Default)]
pub struct NewArgs {
    /// Journal that receives the entry (defaults to the configured journal)
    #[arg(long, short = 'j')]
    pub journal: Option<String>,
    /// Provide the entry content inline instead of launching an editor
    #[arg(long, short = 'm')]
    pub message: Option<String>,
    /// Override the editor command for this invocation
    #[arg(long)]
    pub editor: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Journal to print (defaults to the configured journal)
    #[arg(long, short = 'j')]
    pub journal: Option<String>,
    /// Limit the number of entries printed, most recent first
    #[arg(long)]
    pub limit: Option<usize>,
}

pub fn new_entry(config: Arc<AppConfig>, store: &JournalStore, args: NewArgs) -> Result<()> {
    let journal_name = args
        .journal
        .unwrap_or_else(|| config.default_journal.clone());

    let content = if let Some(message) = args.message {
        message
    } else if let Some(piped) = read_stdin()? {
        piped
    } else {
        let command = match &args.editor {
            Some(spec) => editor::parse_command(spec)?,
            None => editor::resolve(&config.editor),
        };
        match editor::compose(&command, &config.editor.draft_dir)? {
            Some(content) => content,
            None => bail!("aborting entry: draft is empty"),
        }
    };
    if content.trim().is_empty() {
        bail!("entry content cannot be empty");
    }

    let entry = record_entry(store, &journal_name, content)?;
    println!("Recorded entry {} in journal '{}'", entry.id, journal_name);
    Ok(())
}

/// Load-append-save for a single new entry. The whole journal is rewritten;
/// the last writer wins if two invocations race.
pub fn record_entry(store: &JournalStore, journal_name: &str, content: String) -> Result<Entry> {
    let entry = Entry::new(content);
    let mut journal = store
        .load(journal_name)
        .with_context(|| format!("loading journal '{journal_name}'"))?;
    journal.append(entry.clone());
    store
        .save(&journal)
        .with_context(|| format!("saving journal '{journal_name}'"))?;
    Ok(entry)
}

pub fn list_entries(config: Arc<AppConfig>, store: &JournalStore, args: ListArgs) -> Result<()> {
    let journal_name = args
        .journal
        .unwrap_or_else(|| config.default_journal.clone());
    let limit = args.limit.unwrap_or(config.list.max_entries);

    let journal = store
        .load(&journal_name)
        .with_context(|| format!("loading journal '{journal_name}'"))?;
    let output = render_entries(&journal, limit, config.list.snippet_width);
    print!("{output}");
    Ok(())
}

fn render_entries(journal: &Journal, limit: usize, snippet_width: usize) -> String {
    if journal.is_empty() {
        return format!("Journal '{}' has no entries.\n", journal.name());
    }
    let mut out = String::new();
    let shown = journal.entries().iter().rev().take(limit);
    for entry in shown {
        let _ = writeln!(
            &mut out,
            "{}  {}",
            entry.id,
            format_timestamp(entry.created_at)
        );
        if let Some(snippet) = build_snippet(&entry.content, snippet_width) {
            let _ = writeln!(&mut out, "    {snippet}");
        }
        out.push('\n');
    }
    let total = journal.num_entries();
    if total > limit {
        let _ = writeln!(&mut out, "({} of {} entries shown)", limit, total);
    }
    out
}

pub fn list_journals(store: &JournalStore) -> Result<()> {
    let names = store.list_journals()?;
    if names.is_empty() {
        println!("(no journals)");
        return Ok(());
    }
    for name in names {
        println!("- {name}");
    }
    Ok(())
}

fn read_stdin() -> Result<Option<String>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(Some(buf))
}

fn build_snippet(content: &str, width: usize) -> Option<String> {
    let mut segments = Vec::new();
    for line in content.lines().take(2) {
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            segments.push(trimmed.to_string());
        }
    }
    if segments.is_empty() {
        None
    } else {
        let snippet = segments.join(" ");
        let truncated = snippet.chars().take(width).collect::<String>();
        Some(truncated)
    }
}

fn format_timestamp(at: OffsetDateTime) -> String {
    at.format(&Rfc3339)
        .unwrap_or_else(|_| at.unix_timestamp().to_string())
}
