//! Checkpoint bookkeeping for an unfinished indexing run

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Written at every checkpoint, removed when a run completes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub processed_files: usize,
    pub total_files: usize,
    pub last_save_time: DateTime<Utc>,
}

impl ProgressRecord {
    pub fn new(processed_files: usize, total_files: usize) -> Self {
        Self {
            processed_files,
            total_files,
            last_save_time: Utc::now(),
        }
    }

    /// Files the interrupted run still had to go through
    pub fn remaining(&self) -> usize {
        self.total_files.saturating_sub(self.processed_files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remaining_saturates() {
        assert_eq!(ProgressRecord::new(40, 100).remaining(), 60);
        assert_eq!(ProgressRecord::new(120, 100).remaining(), 0);
    }

    #[test]
    fn test_json_field_names() {
        let record = ProgressRecord::new(100, 250);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["processed_files"], 100);
        assert_eq!(json["total_files"], 250);
        assert!(json["last_save_time"].is_string());
    }
}
