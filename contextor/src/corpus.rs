//! Message records and the read-only document store.
//!
//! The corpus is a JSONL file, one message per line:
//!
//! ```text
//! {"idx": 0, "text": "User: Alice\nhey, you up?"}
//! {"idx": 1, "text": "User: Bob\nyeah", "speaker": "Bob"}
//! ```
//!
//! When `speaker` is absent it is taken from the first line of `text`
//! (`User: <name>`). Shape is validated once here; everything downstream
//! works with typed [`MessageRecord`]s.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::FormatError;

const SPEAKER_PREFIX: &str = "User:";

/// One historical chat message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageRecord {
    /// Position in the conversation; unique and ordered within a corpus.
    pub sequence_index: u64,
    pub speaker: String,
    /// Full message text, first line included.
    pub text: String,
}

impl MessageRecord {
    /// Builds a record, deriving the speaker from the first line of `text`.
    ///
    /// Returns `None` if the first line does not carry a `User: <name>` header.
    pub fn from_text(sequence_index: u64, text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        let speaker = speaker_from_text(&text)?.to_string();
        Some(Self {
            sequence_index,
            speaker,
            text,
        })
    }
}

/// Extracts `<name>` from a leading `User: <name>` line.
pub fn speaker_from_text(text: &str) -> Option<&str> {
    let first = text.lines().next()?.trim();
    let name = first.strip_prefix(SPEAKER_PREFIX)?.trim();
    (!name.is_empty()).then_some(name)
}

/// Ordered, immutable collection of [`MessageRecord`]s.
#[derive(Clone, Debug, Default)]
pub struct DocumentStore {
    records: Vec<MessageRecord>,
}

impl DocumentStore {
    /// Sorts by `sequence_index` and rejects duplicates.
    pub fn from_records(mut records: Vec<MessageRecord>) -> Result<Self, FormatError> {
        records.sort_by_key(|r| r.sequence_index);
        if let Some(w) = records
            .windows(2)
            .find(|w| w[0].sequence_index == w[1].sequence_index)
        {
            return Err(FormatError::DuplicateIndex(w[0].sequence_index));
        }
        Ok(Self { records })
    }

    /// Loads and validates a JSONL corpus. Empty lines are skipped.
    ///
    /// # Errors
    /// - [`FormatError::Io`] if the file cannot be read
    /// - [`FormatError::Malformed`] for invalid JSON, a missing `idx`/`text`,
    ///   or an unresolvable speaker
    /// - [`FormatError::DuplicateIndex`] if two rows share an index
    pub fn load_jsonl(path: impl AsRef<Path>) -> Result<Self, FormatError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading corpus");

        let io_err = |source| FormatError::Io {
            path: path.to_path_buf(),
            source,
        };
        let reader = BufReader::new(File::open(path).map_err(io_err)?);

        let mut records = Vec::new();
        for (i, line) in reader.lines().enumerate() {
            let line = line.map_err(io_err)?;
            if line.trim().is_empty() {
                continue;
            }
            let malformed = |reason: String| FormatError::Malformed {
                path: path.display().to_string(),
                line: i + 1,
                reason,
            };

            let row: Row = serde_json::from_str(&line).map_err(|e| malformed(e.to_string()))?;
            records.push(row.into_record().map_err(|r| malformed(r.to_string()))?);
        }

        let store = Self::from_records(records)?;
        debug!(records = store.len(), "corpus loaded");
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records, ascending by `sequence_index`.
    pub fn records(&self) -> &[MessageRecord] {
        &self.records
    }

    pub fn get(&self, sequence_index: u64) -> Option<&MessageRecord> {
        self.records
            .binary_search_by_key(&sequence_index, |r| r.sequence_index)
            .ok()
            .map(|i| &self.records[i])
    }

    /// Records with `lo <= sequence_index <= hi`, ascending.
    pub fn range(&self, lo: u64, hi: u64) -> &[MessageRecord] {
        if lo > hi {
            return &[];
        }
        let start = self.records.partition_point(|r| r.sequence_index < lo);
        let end = self.records.partition_point(|r| r.sequence_index <= hi);
        &self.records[start..end]
    }
}

/// Raw JSONL row before validation.
#[derive(Deserialize)]
struct Row {
    idx: Option<u64>,
    text: Option<String>,
    #[serde(default)]
    speaker: Option<String>,
}

impl Row {
    fn into_record(self) -> Result<MessageRecord, &'static str> {
        let sequence_index = self.idx.ok_or("missing `idx`")?;
        let text = self.text.ok_or("missing `text`")?;
        let speaker = match self.speaker.filter(|s| !s.trim().is_empty()) {
            Some(s) => s.trim().to_string(),
            None => speaker_from_text(&text)
                .ok_or("no `speaker` field and first line is not `User: <name>`")?
                .to_string(),
        };
        Ok(MessageRecord {
            sequence_index,
            speaker,
            text,
        })
    }
}
