//! crates/campus_core/src/analytics.rs
//!
//! Pure aggregate arithmetic shared by every store adapter.

use chrono::{Datelike, NaiveDate};

use crate::domain::ResponseType;

/// Admin "top activities" ranking size.
pub const TOP_ACTIVITIES_LIMIT: i64 = 10;
/// Public "popular activities" ranking size.
pub const POPULAR_ACTIVITIES_LIMIT: i64 = 5;
/// Number of most recent calendar months reported by the monthly rollup.
pub const MONTHLY_BUCKETS: i64 = 12;
/// Length of the "recent" feeds on the landing and student dashboards.
pub const RECENT_LIMIT: i64 = 5;

/// Percentage of registrants who respond "attend".
///
/// Returns `None` when nobody has registered, so "no data" never reads as 0%.
pub fn completion_rate(attendee_count: i64, registration_count: i64) -> Option<f64> {
    if registration_count <= 0 {
        return None;
    }
    Some(attendee_count as f64 / registration_count as f64 * 100.0)
}

/// Mean of the defined rates, or `None` if there are none.
pub fn average_rate<I>(rates: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let (sum, count) = rates
        .into_iter()
        .flatten()
        .fold((0.0, 0u32), |(sum, count), rate| (sum + rate, count + 1));
    (count > 0).then(|| sum / f64::from(count))
}

/// Calendar month bucket key, `YYYY-MM`.
pub fn month_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// Attendance counters over the current response set of one activity.
///
/// Each user contributes at most one response per activity, so counting rows
/// is the same as counting distinct users.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResponseTally {
    pub attendee_count: i64,
    pub registration_count: i64,
}

impl ResponseTally {
    pub fn from_responses<'a, I>(responses: I) -> Self
    where
        I: IntoIterator<Item = &'a ResponseType>,
    {
        responses
            .into_iter()
            .fold(Self::default(), |mut tally, response| {
                tally.registration_count += 1;
                if *response == ResponseType::Attend {
                    tally.attendee_count += 1;
                }
                tally
            })
    }

    pub fn completion_rate(&self) -> Option<f64> {
        completion_rate(self.attendee_count, self.registration_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_rate_is_undefined_without_registrations() {
        assert_eq!(completion_rate(0, 0), None);
        assert_eq!(completion_rate(0, 4), Some(0.0));
        assert_eq!(completion_rate(1, 4), Some(25.0));
    }

    #[test]
    fn tally_counts_attendees_and_registrations() {
        let responses = [
            ResponseType::Attend,
            ResponseType::NotAttend,
            ResponseType::TimeConflict,
            ResponseType::Attend,
        ];
        let tally = ResponseTally::from_responses(responses.iter());
        assert_eq!(tally.attendee_count, 2);
        assert_eq!(tally.registration_count, 4);
        assert_eq!(tally.completion_rate(), Some(50.0));
    }

    #[test]
    fn average_ignores_undefined_rates() {
        assert_eq!(average_rate([None, None]), None);
        assert_eq!(average_rate([Some(50.0), None, Some(100.0)]), Some(75.0));
    }

    #[test]
    fn month_key_is_zero_padded() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 17).unwrap();
        assert_eq!(month_key(date), "2024-03");
    }
}
