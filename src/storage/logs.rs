//! Workflow log store
//!
//! Bounded, append-mostly log of workflow executions. Entries are kept in
//! arrival order and persisted as newline-delimited JSON. Appends write one
//! line; the file is compacted down to the retained entries once it holds
//! twice the cap.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::error::StorageResult;
use super::types::{LogLevel, WorkflowLogEntry};

/// Default cap on retained entries
pub const DEFAULT_MAX_LOG_ENTRIES: usize = 5_000;

/// Longest duration a reported entry may carry (one week)
pub const MAX_LOG_DURATION_MS: u64 = 7 * 24 * 60 * 60 * 1000;

/// File lines allowed per retained entry before compaction
const COMPACT_FACTOR: usize = 2;

/// Log query filters, all optional and combined with AND
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogFilter {
    #[serde(default)]
    pub level: Option<LogLevel>,
    #[serde(default)]
    pub workflow: Option<String>,
    /// Case-insensitive match on message, workflow or execution id
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl LogFilter {
    pub fn matches(&self, entry: &WorkflowLogEntry) -> bool {
        if let Some(level) = self.level {
            if entry.level != level {
                return false;
            }
        }
        if let Some(workflow) = &self.workflow {
            if !entry.workflow.eq_ignore_ascii_case(workflow.trim()) {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.trim().to_lowercase();
            if !needle.is_empty()
                && !entry.message.to_lowercase().contains(&needle)
                && !entry.workflow.to_lowercase().contains(&needle)
                && !entry.execution_id.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        true
    }
}

/// Counts per level over the retained entries
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LogSummary {
    pub total: usize,
    pub by_level: BTreeMap<String, usize>,
    /// Mean duration over entries that carry one
    pub average_duration_ms: Option<u64>,
}

/// Bounded workflow log
#[derive(Debug)]
pub struct WorkflowLogStore {
    entries: VecDeque<WorkflowLogEntry>,
    max_entries: usize,
    path: Option<PathBuf>,
    /// Lines currently in the backing file, evicted ones included
    file_lines: usize,
}

impl WorkflowLogStore {
    /// In-memory store
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_entries: max_entries.max(1),
            path: None,
            file_lines: 0,
        }
    }

    /// Open a file-backed store, skipping lines that fail to parse
    pub fn open(path: &Path, max_entries: usize) -> StorageResult<Self> {
        let mut store = Self::new(max_entries);
        store.path = Some(path.to_path_buf());

        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            for (line_no, line) in content.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<WorkflowLogEntry>(line) {
                    Ok(entry) => store.entries.push_back(entry),
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            line = line_no + 1,
                            error = %e,
                            "Skipping malformed workflow log line"
                        );
                    }
                }
            }

            store.file_lines = content.lines().filter(|l| !l.trim().is_empty()).count();
            store.evict_overflow();
            if store.file_lines >= store.compact_threshold() {
                store.file_lines = write_entries(path, store.entries.iter())?;
            }
        }

        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Append an entry, evicting the oldest ones past the cap. The entry is
    /// only retained once it is on disk.
    pub fn append(&mut self, entry: WorkflowLogEntry) -> StorageResult<()> {
        if let Some(path) = &self.path {
            if self.file_lines + 1 >= self.compact_threshold() {
                let skip = (self.entries.len() + 1).saturating_sub(self.max_entries);
                let retained = self.entries.iter().chain(std::iter::once(&entry)).skip(skip);
                self.file_lines = write_entries(path, retained)?;
            } else {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                let line = serde_json::to_string(&entry)?;
                let mut file = OpenOptions::new().create(true).append(true).open(path)?;
                writeln!(file, "{}", line)?;
                self.file_lines += 1;
            }
        }

        self.entries.push_back(entry);
        self.evict_overflow();
        Ok(())
    }

    /// Drop every entry
    pub fn clear(&mut self) -> StorageResult<usize> {
        if let Some(path) = &self.path {
            self.file_lines = write_entries(path, std::iter::empty())?;
        }
        let removed = self.entries.len();
        self.entries.clear();
        Ok(removed)
    }

    /// Matching entries, newest first
    pub fn query(&self, filter: &LogFilter) -> Vec<WorkflowLogEntry> {
        let matched = self.entries.iter().rev().filter(|e| filter.matches(e));
        match filter.limit {
            Some(limit) => matched.take(limit).cloned().collect(),
            None => matched.cloned().collect(),
        }
    }

    /// Distinct workflow names seen in the log
    pub fn workflows(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.iter().map(|e| e.workflow.clone()).collect();
        names.sort();
        names.dedup();
        names
    }

    pub fn summary(&self) -> LogSummary {
        let mut by_level: BTreeMap<String, usize> = LogLevel::all()
            .iter()
            .map(|l| (l.to_string(), 0))
            .collect();
        let mut duration_total = 0u128;
        let mut duration_count = 0u128;

        for entry in &self.entries {
            *by_level.entry(entry.level.to_string()).or_default() += 1;
            if let Some(d) = entry.duration_ms {
                duration_total += u128::from(d);
                duration_count += 1;
            }
        }

        LogSummary {
            total: self.entries.len(),
            by_level,
            average_duration_ms: (duration_count > 0)
                .then(|| u64::try_from(duration_total / duration_count).unwrap_or(u64::MAX)),
        }
    }

    fn evict_overflow(&mut self) {
        while self.entries.len() > self.max_entries {
            self.entries.pop_front();
        }
    }

    fn compact_threshold(&self) -> usize {
        self.max_entries.saturating_mul(COMPACT_FACTOR)
    }
}

/// Replace the file at `path` with `entries`, returning the line count
fn write_entries<'a>(
    path: &Path,
    entries: impl Iterator<Item = &'a WorkflowLogEntry>,
) -> StorageResult<usize> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut content = String::new();
    let mut lines = 0;
    for entry in entries {
        content.push_str(&serde_json::to_string(entry)?);
        content.push('\n');
        lines += 1;
    }
    std::fs::write(path, content)?;
    tracing::debug!(path = %path.display(), lines, "Compacted workflow log");
    Ok(lines)
}
