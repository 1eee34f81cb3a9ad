//! Run date context and the weekday skip gate.
//!
//! The date and weekday are resolved exactly once per run and shared
//! read-only by every pipeline, so all URL templates expand against the same
//! day even if the run straddles midnight.

use chrono::{Datelike, Local, NaiveDate};

use crate::comic::ComicSpec;

/// Character in a skip calendar marking "do not fetch on this weekday".
pub const SKIP_SENTINEL: u8 = b'X';

/// The resolved "today" for one run: full date plus weekday index.
///
/// Weekdays are numbered 0-6 with Sunday = 0, matching the skip calendar
/// layout in config files.
#[derive(Debug, Clone, Copy)]
pub struct RunContext {
    /// The date used to expand URL and regexp templates.
    pub today: NaiveDate,
    /// Weekday index, Sunday = 0.
    pub weekday: usize,
}

impl RunContext {
    /// Creates a context for the current local date.
    #[must_use]
    pub fn now() -> Self {
        Self::for_date(Local::now().date_naive())
    }

    /// Creates a context for an explicit date.
    #[must_use]
    pub fn for_date(today: NaiveDate) -> Self {
        let weekday = today.weekday().num_days_from_sunday() as usize;
        Self { today, weekday }
    }
}

/// Returns true iff the comic's skip calendar marks `weekday` as a skip day.
///
/// A comic with no calendar is never skipped by this gate; fetch failures are
/// a separate outcome.
#[must_use]
pub fn should_skip(spec: &ComicSpec, weekday: usize) -> bool {
    spec.skip_calendar
        .as_ref()
        .is_some_and(|mask| mask.as_bytes().get(weekday) == Some(&SKIP_SENTINEL))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::comic::ComicSpec;

    fn spec_with_calendar(mask: Option<&str>) -> ComicSpec {
        ComicSpec {
            id: 0,
            url: "http://example.com/a".to_string(),
            host: "http://example.com".to_string(),
            regexp: None,
            capture_index: 0,
            output_name: "a".to_string(),
            skip_calendar: mask.map(str::to_string),
            referer: None,
        }
    }

    #[test]
    fn test_skip_matches_sentinel_at_weekday() {
        let spec = spec_with_calendar(Some("X-----X"));
        assert!(should_skip(&spec, 0), "Sunday marked");
        assert!(should_skip(&spec, 6), "Saturday marked");
        for day in 1..6 {
            assert!(!should_skip(&spec, day), "weekday {day} not marked");
        }
    }

    #[test]
    fn test_no_calendar_never_skips() {
        let spec = spec_with_calendar(None);
        for day in 0..7 {
            assert!(!should_skip(&spec, day));
        }
    }

    #[test]
    fn test_non_sentinel_characters_do_not_skip() {
        let spec = spec_with_calendar(Some("x......"));
        // Lowercase 'x' is not the sentinel.
        assert!(!should_skip(&spec, 0));
    }

    #[test]
    fn test_run_context_weekday_sunday_is_zero() {
        // 2024-01-07 was a Sunday.
        let date = NaiveDate::from_ymd_opt(2024, 1, 7).unwrap();
        assert_eq!(RunContext::for_date(date).weekday, 0);
        // 2024-01-13 was a Saturday.
        let date = NaiveDate::from_ymd_opt(2024, 1, 13).unwrap();
        assert_eq!(RunContext::for_date(date).weekday, 6);
    }
}
