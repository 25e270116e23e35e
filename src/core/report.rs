use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Timestamp layout used in report lines, e.g. `2026-08-07 14:03:21.532107`.
const STAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// One immutable entry of the activity log. Entries are only ever appended,
/// so append order is chronological order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Report {
    at: NaiveDateTime,
    message: String,
}

impl Report {
    pub fn new(message: impl Into<String>) -> Report {
        Report {
            at: chrono::Local::now().naive_local(),
            message: message.into(),
        }
    }

    pub fn at(&self) -> NaiveDateTime {
        self.at
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Parses a stored `[timestamp] message` line.
    pub fn parse_line(line: &str) -> Option<Report> {
        let rest = line.strip_prefix('[')?;
        let (stamp, message) = rest.split_once("] ")?;
        let at = NaiveDateTime::parse_from_str(stamp, STAMP_FORMAT).ok()?;
        Some(Report {
            at,
            message: message.to_owned(),
        })
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.at.format(STAMP_FORMAT), self.message)
    }
}
