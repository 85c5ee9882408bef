use std::fmt;

use serde::{Deserialize, Serialize};

/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Calendar date without a time zone, as entered on letter forms.
pub type Date = chrono::NaiveDate;

/// Format used for every date string stored in step data (`YYYY-MM-DD`).
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Composite key owning an assessment and all of its step records.
///
/// Nothing is shared across candidates; every read and write is scoped to
/// one `(hr_id, candidate_id)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubjectId {
    pub hr_id: DbId,
    pub candidate_id: DbId,
}

impl SubjectId {
    pub fn new(hr_id: DbId, candidate_id: DbId) -> Self {
        Self {
            hr_id,
            candidate_id,
        }
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hr {} / candidate {}", self.hr_id, self.candidate_id)
    }
}

/// Format a date the way step data stores it.
pub fn format_date(date: Date) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parse a stored date string, tolerating surrounding whitespace.
pub fn parse_date(s: &str) -> Option<Date> {
    chrono::NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_format_roundtrip() {
        let date = chrono::NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        assert_eq!(format_date(date), "2026-03-09");
        assert_eq!(parse_date(" 2026-03-09 "), Some(date));
    }

    #[test]
    fn parse_date_rejects_other_formats() {
        assert_eq!(parse_date("03/09/2026"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn subject_display_names_both_ids() {
        assert_eq!(SubjectId::new(3, 17).to_string(), "hr 3 / candidate 17");
    }
}
