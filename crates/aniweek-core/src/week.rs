//! Week window math. Every boundary here is anchored in one configured zone
//! so that all viewers see the same schedule.

use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use aniweek_models::Weekday;

pub const SECONDS_PER_DAY: i64 = 86_400;
pub const SECONDS_PER_WEEK: i64 = 7 * SECONDS_PER_DAY;

/// Unix seconds of the week window start for `offset` weeks away from now.
///
/// Offset 0 anchors on the most recent Sunday 00:00:00 wall clock in `tz`;
/// other offsets shift that anchor by exact multiples of 604800 seconds, so
/// `week_start(now, n) - week_start(now, 0)` is always `n` whole weeks even
/// when a DST transition falls inside the span.
pub fn week_start(now: DateTime<Utc>, offset: i32, tz: Tz) -> i64 {
    let local = now.with_timezone(&tz);
    let days_back = local.weekday().num_days_from_sunday() as i64;
    let sunday = local.date_naive() - Duration::days(days_back);
    let midnight = sunday.and_time(NaiveTime::MIN);

    let anchor = match midnight.and_local_timezone(tz) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt,
        // A zone that springs forward across midnight has no 00:00 that day
        LocalResult::None => (midnight + Duration::hours(1))
            .and_local_timezone(tz)
            .earliest()
            .unwrap_or_else(|| tz.from_utc_datetime(&midnight)),
    };

    anchor.timestamp() + offset as i64 * SECONDS_PER_WEEK
}

/// Which Sunday-first bucket an airing instant belongs to, evaluated in the
/// same zone as `week_start`.
pub fn weekday_of(airing_at: i64, tz: Tz) -> Weekday {
    let utc = DateTime::from_timestamp(airing_at, 0).unwrap_or_default();
    Weekday::from_chrono(utc.with_timezone(&tz).weekday())
}

/// The two upstream query windows covering one week. Upstream bounds are
/// strict comparisons, so both ends of each pair are exclusive; the second
/// window ends one second before the next week starts.
pub fn sub_ranges(week_start: i64) -> [(i64, i64); 2] {
    let split = week_start + 4 * SECONDS_PER_DAY;
    [
        (week_start, split),
        (split, week_start + 6 * SECONDS_PER_DAY + SECONDS_PER_DAY - 1),
    ]
}

/// Reject navigation outside the allowed window, keeping the current offset.
pub fn clamp_offset(requested: i32, current: i32, max_range: i32) -> i32 {
    if requested < -max_range || requested > max_range {
        current
    } else {
        requested
    }
}

/// Wall-clock label for an airing instant, e.g. "9:00 PM".
pub fn format_air_time(airing_at: i64, tz: Tz) -> String {
    DateTime::from_timestamp(airing_at, 0)
        .map(|utc| utc.with_timezone(&tz).format("%-I:%M %p").to_string())
        .unwrap_or_default()
}

/// Short date for a day header, e.g. "Jul 7" for day_index days past the
/// week start.
pub fn month_day_label(week_start: i64, day_index: usize, tz: Tz) -> String {
    let instant = week_start + day_index as i64 * SECONDS_PER_DAY;
    DateTime::from_timestamp(instant, 0)
        .map(|utc| utc.with_timezone(&tz).format("%b %-d").to_string())
        .unwrap_or_default()
}

/// Sunday-first index of today in `tz`, for highlighting the current day.
pub fn today_index(now: DateTime<Utc>, tz: Tz) -> usize {
    now.with_timezone(&tz).weekday().num_days_from_sunday() as usize
}
