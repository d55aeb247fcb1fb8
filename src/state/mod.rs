use crate::source::SourceRecord;
use crate::{AggregateTotals, FileChangeRecord};
use std::collections::HashMap;

/// In-memory review state for one load of the page.
///
/// Maps file path to its change counts and viewed flag, with a secondary
/// index from path digest to path so click targets can be resolved.
/// Totals are fixed at load time; viewed counts are recomputed per query.
#[derive(Debug, Default)]
pub struct ReviewState {
    files: Vec<FileChangeRecord>,
    by_path: HashMap<String, usize>,
    digest_to_path: HashMap<String, String>,
    total_added: u64,
    total_deleted: u64,
    total_lines: u64,
}

impl ReviewState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all state with `records`.
    ///
    /// Returns `false` and leaves the store empty when no records are
    /// available.
    pub fn load(&mut self, records: Option<Vec<SourceRecord>>) -> bool {
        *self = Self::default();

        let Some(records) = records else {
            return false;
        };

        for record in records {
            self.insert(record);
        }

        for file in &self.files {
            self.total_added = self.total_added.saturating_add(file.lines_added);
            self.total_deleted = self.total_deleted.saturating_add(file.lines_deleted);
            self.total_lines = self.total_lines.saturating_add(file.lines_changed);
        }

        true
    }

    fn insert(&mut self, record: SourceRecord) {
        let lines_added = record.lines_added.unwrap_or(0);
        let lines_deleted = record.lines_deleted.unwrap_or(0);
        let file = FileChangeRecord {
            lines_changed: record
                .lines_changed
                .unwrap_or(lines_added.saturating_add(lines_deleted)),
            path: record.path,
            path_digest: record.path_digest,
            lines_added,
            lines_deleted,
            viewed: record.marked_as_viewed.unwrap_or(false),
        };

        if let Some(digest) = &file.path_digest {
            self.digest_to_path.insert(digest.clone(), file.path.clone());
        }

        // A repeated path replaces the earlier entry. Its old digest is
        // dropped unless another file has claimed it since.
        if let Some(&idx) = self.by_path.get(&file.path) {
            if let Some(old_digest) = self.files[idx].path_digest.take()
                && file.path_digest.as_ref() != Some(&old_digest)
                && self.digest_to_path.get(&old_digest) == Some(&file.path)
            {
                self.digest_to_path.remove(&old_digest);
            }
            self.files[idx] = file;
            return;
        }

        self.by_path.insert(file.path.clone(), self.files.len());
        self.files.push(file);
    }

    /// Flip the viewed flag of `path`, returning the updated record.
    pub fn toggle_viewed(&mut self, path: &str) -> Option<&FileChangeRecord> {
        let idx = *self.by_path.get(path)?;
        let file = &mut self.files[idx];
        file.viewed = !file.viewed;
        Some(file)
    }

    /// Look up the path a digest belongs to.
    pub fn resolve_path_by_digest(&self, digest: &str) -> Option<&str> {
        self.digest_to_path.get(digest).map(String::as_str)
    }

    /// Current totals, with viewed counts summed over viewed files.
    pub fn aggregates(&self) -> AggregateTotals {
        let mut totals = AggregateTotals {
            total_added: self.total_added,
            total_deleted: self.total_deleted,
            total_lines: self.total_lines,
            ..AggregateTotals::default()
        };

        for file in self.files.iter().filter(|f| f.viewed) {
            totals.viewed_added = totals.viewed_added.saturating_add(file.lines_added);
            totals.viewed_deleted = totals.viewed_deleted.saturating_add(file.lines_deleted);
            totals.viewed_lines = totals.viewed_lines.saturating_add(file.lines_changed);
        }

        totals
    }

    pub fn get(&self, path: &str) -> Option<&FileChangeRecord> {
        self.by_path.get(path).map(|&idx| &self.files[idx])
    }

    /// All files in source order.
    pub fn files(&self) -> &[FileChangeRecord] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
