//! Session traffic accounting

use serde::{Deserialize, Serialize};
use std::fmt;

/// Cumulative traffic totals for the current connection
///
/// Totals never move backwards while connected. The engine's counters may
/// restart underneath us (process restart on its side); a shrinking
/// duration marks that boundary and opens a new accounting epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub duration_seconds: u32,
}

impl SessionStats {
    /// Fold one engine tick into the totals
    pub(crate) fn apply_tick(&mut self, bytes_in: u64, bytes_out: u64, duration_seconds: u32) {
        if duration_seconds < self.duration_seconds {
            // counter reset upstream: new epoch, totals restart
            self.bytes_in = bytes_in;
            self.bytes_out = bytes_out;
        } else {
            self.bytes_in = self.bytes_in.max(bytes_in);
            self.bytes_out = self.bytes_out.max(bytes_out);
        }
        self.duration_seconds = duration_seconds;
    }

    pub fn format_bytes(bytes: u64) -> String {
        let mb = bytes as f64 / (1024.0 * 1024.0);
        format!("{:.2} MB", mb)
    }

    pub fn format_duration(&self) -> String {
        let hours = self.duration_seconds / 3600;
        let minutes = (self.duration_seconds % 3600) / 60;
        let seconds = self.duration_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }
}

impl fmt::Display for SessionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} in, {} out, {}",
            Self::format_bytes(self.bytes_in),
            Self::format_bytes(self.bytes_out),
            self.format_duration()
        )
    }
}
