//! Date rules shared by the meetup and subscription services.

use chrono::{
    DateTime, Duration, DurationRound, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone,
    Utc,
};

/// Converts a millisecond unix timestamp into the stored form, dropping
/// sub-second precision.
pub fn normalize_timestamp(millis: i64) -> Option<DateTime<Utc>> {
    let date = DateTime::<Utc>::from_timestamp_millis(millis)?;
    date.duration_trunc(Duration::seconds(1)).ok()
}

pub fn hour_start(date: DateTime<Utc>) -> DateTime<Utc> {
    date.duration_trunc(Duration::hours(1)).unwrap_or(date)
}

/// A meetup can be scheduled at `date` only if the start of that hour is
/// strictly after `now`.
pub fn is_schedulable(date: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    hour_start(date) > now
}

/// Accepts `2024-06-01`, `2024-06-01T10:00:00` or a full RFC 3339 string
/// and returns the calendar day it names.
pub fn parse_day(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(day) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(day);
    }
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Some(date.date_naive());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|date| date.date())
}

/// Bounds of `day` in `tz`, as a half-open `[start, end)` range in UTC.
pub fn day_bounds<Tz: TimeZone>(day: NaiveDate, tz: &Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = start_of_day(day, tz);
    let end = day
        .succ_opt()
        .map(|next| start_of_day(next, tz))
        .unwrap_or(start + Duration::days(1));
    (start, end)
}

fn start_of_day<Tz: TimeZone>(day: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    let midnight = day.and_time(NaiveTime::MIN);
    match tz.from_local_datetime(&midnight) {
        LocalResult::Single(date) => date.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        // midnight skipped by a DST jump, the day starts an hour later
        LocalResult::None => tz
            .from_local_datetime(&(midnight + Duration::hours(1)))
            .earliest()
            .map(|date| date.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&midnight)),
    }
}
