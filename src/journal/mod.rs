use rand::Rng;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::OffsetDateTime;

/// Second-precision stamp that forms the prefix of every entry id.
const ID_STAMP_FORMAT: &[FormatItem<'static>] =
    format_description!("[year][month][day][hour][minute][second]");

/// One journal record: free-text content plus its creation time and a
/// human-scannable identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub id: String,
    pub content: String,
    pub created_at: OffsetDateTime,
}

impl Entry {
    /// Stamp a new entry with the current UTC time.
    pub fn new(content: impl Into<String>) -> Self {
        let created_at = OffsetDateTime::now_utc();
        Self {
            id: generate_id(created_at),
            content: content.into(),
            created_at,
        }
    }

    pub fn from_parts(id: String, content: String, created_at: OffsetDateTime) -> Self {
        Self {
            id,
            content,
            created_at,
        }
    }
}

/// Ids are the UTC creation time down to the second plus a five-digit
/// random suffix. Two entries created in the same second can collide on
/// the suffix; nothing depends on ids being globally unique.
fn generate_id(at: OffsetDateTime) -> String {
    let stamp = at
        .format(ID_STAMP_FORMAT)
        .unwrap_or_else(|_| at.unix_timestamp().to_string());
    let suffix: u32 = rand::thread_rng().gen_range(0..100_000);
    format!("{stamp}{suffix:05}")
}

/// A named, append-only collection of entries. Insertion order is
/// chronological order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Journal {
    name: String,
    entries: Vec<Entry>,
    num_entries: usize,
}

impl Journal {
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
            num_entries: 0,
        }
    }

    /// Rebuild a journal from persisted parts. A stored count that
    /// disagrees with the entry list is logged and corrected.
    pub fn from_parts(name: impl Into<String>, entries: Vec<Entry>, num_entries: usize) -> Self {
        let name = name.into();
        if num_entries != entries.len() {
            tracing::warn!(
                journal = %name,
                stored = num_entries,
                actual = entries.len(),
                "journal entry count disagrees with entry list, trusting the list"
            );
        }
        let num_entries = entries.len();
        Self {
            name,
            entries,
            num_entries,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn num_entries(&self) -> usize {
        self.num_entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn append(&mut self, entry: Entry) {
        self.entries.push(entry);
        self.num_entries += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_id_is_stamp_plus_suffix() {
        let entry = Entry::new("content");
        assert_eq!(entry.id.len(), 19);
        assert!(entry.id.chars().all(|c| c.is_ascii_digit()));

        let stamp = entry
            .created_at
            .format(ID_STAMP_FORMAT)
            .expect("formatting id stamp");
        assert!(entry.id.starts_with(&stamp));
    }

    #[test]
    fn append_increments_count() {
        let mut journal = Journal::empty("default");
        assert_eq!(journal.num_entries(), 0);
        assert!(journal.is_empty());

        for n in 1..=3 {
            journal.append(Entry::new(format!("entry {n}")));
            assert_eq!(journal.num_entries(), n);
            assert_eq!(journal.entries().len(), n);
        }
        assert_eq!(journal.entries()[0].content, "entry 1");
        assert_eq!(journal.entries()[2].content, "entry 3");
    }

    #[test]
    fn from_parts_reconciles_stale_count() {
        let entries = vec![Entry::new("a"), Entry::new("b")];
        let journal = Journal::from_parts("default", entries, 7);
        assert_eq!(journal.num_entries(), 2);
    }
}
