//! Observable progress snapshot.

use serde::{Deserialize, Serialize};

/// Point-in-time view of the coordinator's observable state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    /// Whether an operation currently holds the busy flag.
    pub busy: bool,
    /// Human-readable status line.
    pub status: String,
    /// Bytes copied so far by the current copy.
    pub copied_bytes: u64,
    /// Total bytes of the current copy (0 if unknown).
    pub total_bytes: u64,
}

impl ProgressSnapshot {
    /// Copy progress as a whole percentage in `0..=100`.
    ///
    /// Returns 0 while the total is unknown.
    pub fn percent(&self) -> u8 {
        percent_of(self.copied_bytes, self.total_bytes)
    }
}

/// `floor(done * 100 / total)`, 0 for an unknown total, capped at 100.
pub fn percent_of(done: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (u128::from(done) * 100) / u128::from(total);
    pct.min(100) as u8
}
