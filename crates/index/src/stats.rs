use serde::{Deserialize, Serialize};

/// Outcome of one refresh pass over the corpus directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefreshReport {
    /// Files seen for the first time.
    pub added: usize,

    /// Files whose stat changed and were re-derived.
    pub updated: usize,

    /// Files that disappeared from the directory.
    pub removed: usize,

    /// Files actually read and parsed this pass.
    pub parsed: usize,

    /// Per-file failures, as `file_name: message`.
    pub errors: Vec<String>,

    /// Wall time of the pass in milliseconds.
    pub time_ms: u64,
}

impl RefreshReport {
    pub fn add_error(&mut self, file_name: &str, message: impl std::fmt::Display) {
        self.errors.push(format!("{file_name}: {message}"));
    }

    /// True when the pass changed nothing observable.
    pub fn is_noop(&self) -> bool {
        self.added == 0 && self.updated == 0 && self.removed == 0 && self.errors.is_empty()
    }
}
