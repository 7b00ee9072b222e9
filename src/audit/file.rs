//! File-backed audit journal
//!
//! - Append-only file format, one entry per line
//! - Each line is `<crc32 as 8 hex digits> <json entry>`
//! - fsync after each write
//! - Replayed in full on open; any bad line fails the open
//!
//! Amendments are journaled as their own entries rather than rewriting the
//! original record line.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use crc32fast::Hasher;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::observability::{log_event_with_fields, Event};

use super::change::ChangeEntry;
use super::errors::{AuditError, AuditResult};
use super::record::AuditRecord;
use super::store::{AuditStore, RecordIndex};

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum JournalEntry {
    Record {
        record: AuditRecord,
    },
    Amend {
        id: Uuid,
        change: ChangeEntry,
        at: DateTime<Utc>,
    },
}

fn compute_checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

fn encode_line(entry: &JournalEntry) -> AuditResult<String> {
    let body = serde_json::to_string(entry)?;
    Ok(format!("{:08x} {}\n", compute_checksum(body.as_bytes()), body))
}

fn decode_line(line_no: usize, line: &str) -> AuditResult<JournalEntry> {
    let corruption = |reason: &str| AuditError::Corruption {
        line: line_no,
        reason: reason.to_string(),
    };

    let (checksum, body) = line
        .split_once(' ')
        .ok_or_else(|| corruption("missing checksum"))?;
    let expected =
        u32::from_str_radix(checksum, 16).map_err(|_| corruption("malformed checksum"))?;
    if compute_checksum(body.as_bytes()) != expected {
        return Err(corruption("checksum mismatch"));
    }
    serde_json::from_str(body).map_err(|e| corruption(&e.to_string()))
}

struct Journal {
    writer: BufWriter<File>,
    index: RecordIndex,
}

/// File-backed [`AuditStore`]
pub struct FileAuditStore {
    path: PathBuf,
    inner: Mutex<Journal>,
}

impl FileAuditStore {
    /// Open or create a journal, replaying existing entries.
    pub fn open(path: impl AsRef<Path>) -> AuditResult<Self> {
        let path = path.as_ref().to_path_buf();
        let io_err = |source| AuditError::Io {
            path: path.display().to_string(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let mut index = RecordIndex::default();
        let mut entries = 0usize;
        if path.exists() {
            let contents = fs::read_to_string(&path).map_err(io_err)?;
            for (i, line) in contents.lines().enumerate() {
                if line.is_empty() {
                    continue;
                }
                match decode_line(i + 1, line)? {
                    JournalEntry::Record { record } => index.push(record),
                    JournalEntry::Amend { id, change, at } => {
                        index.amend(&id, change, at).map_err(|_| AuditError::Corruption {
                            line: i + 1,
                            reason: format!("amendment for unknown record {}", id),
                        })?;
                    }
                }
                entries += 1;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(io_err)?;

        log_event_with_fields(
            Event::AuditJournalReplayed,
            &[
                ("entries", &entries.to_string()),
                ("path", &path.display().to_string()),
                ("records", &index.records.len().to_string()),
            ],
        );

        Ok(Self {
            inner: Mutex::new(Journal {
                writer: BufWriter::new(file),
                index,
            }),
            path,
        })
    }

    /// Get the journal path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> AuditResult<MutexGuard<'_, Journal>> {
        self.inner.lock().map_err(|_| AuditError::Poisoned)
    }

    fn append(&self, journal: &mut Journal, entry: &JournalEntry) -> AuditResult<()> {
        let line = encode_line(entry)?;
        let io_err = |source| AuditError::Io {
            path: self.path.display().to_string(),
            source,
        };
        journal.writer.write_all(line.as_bytes()).map_err(io_err)?;
        journal.writer.flush().map_err(io_err)?;
        journal.writer.get_ref().sync_all().map_err(io_err)
    }
}

impl AuditStore for FileAuditStore {
    fn insert(&self, record: &AuditRecord) -> AuditResult<()> {
        let mut journal = self.lock()?;
        self.append(
            &mut journal,
            &JournalEntry::Record {
                record: record.clone(),
            },
        )?;
        journal.index.push(record.clone());
        Ok(())
    }

    fn append_change(
        &self,
        id: &Uuid,
        change: ChangeEntry,
        at: DateTime<Utc>,
    ) -> AuditResult<AuditRecord> {
        let mut journal = self.lock()?;
        if !journal.index.contains(id) {
            return Err(AuditError::NotFound(*id));
        }
        self.append(
            &mut journal,
            &JournalEntry::Amend {
                id: *id,
                change: change.clone(),
                at,
            },
        )?;
        journal.index.amend(id, change, at)
    }

    fn get(&self, id: &Uuid) -> AuditResult<Option<AuditRecord>> {
        Ok(self.lock()?.index.get(id).cloned())
    }

    fn records(&self) -> AuditResult<Vec<AuditRecord>> {
        Ok(self.lock()?.index.records.clone())
    }
}
