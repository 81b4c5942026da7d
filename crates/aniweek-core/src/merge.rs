use std::cmp::Ordering;
use std::collections::HashMap;

use chrono_tz::Tz;
use tracing::debug;

use aniweek_models::{AiringEntry, DaySchedule, MergedShow, WeekData, Weekday};

use crate::week;

/// Group raw airing entries into the seven Sunday-first day buckets, merge
/// same-day episodes of the same title into one row, and rank each day.
///
/// Pure with respect to its inputs: merging the same entries twice produces
/// identical output.
pub fn group_and_merge(entries: &[AiringEntry], week_start: i64, tz: Tz) -> WeekData {
    let mut buckets: [Vec<MergedShow>; 7] = Default::default();
    let mut slots: [HashMap<i32, usize>; 7] = Default::default();

    for entry in entries {
        let day = week::weekday_of(entry.airing_at, tz);
        let bucket = &mut buckets[day.index()];
        let id = entry.media.id;

        match slots[day.index()].get(&id) {
            None => {
                slots[day.index()].insert(id, bucket.len());
                bucket.push(MergedShow {
                    id,
                    title: entry.media.display_title().to_string(),
                    image: entry.media.poster().unwrap_or_default().to_string(),
                    first_ep: entry.episode,
                    last_ep: entry.episode,
                    airing_at: entry.airing_at,
                    air_time: week::format_air_time(entry.airing_at, tz),
                    score: entry.media.average_score.unwrap_or(0),
                    trending: entry.media.trending.unwrap_or(0),
                    popularity: entry.media.popularity.unwrap_or(0),
                });
            }
            Some(&slot) => {
                let show = &mut bucket[slot];
                show.first_ep = show.first_ep.min(entry.episode);
                show.last_ep = show.last_ep.max(entry.episode);
                // Earliest instant wins; instants compare correctly across
                // the AM/PM boundary where formatted labels do not
                if entry.airing_at < show.airing_at {
                    show.airing_at = entry.airing_at;
                    show.air_time = week::format_air_time(entry.airing_at, tz);
                }
            }
        }
    }

    let days: Vec<DaySchedule> = Weekday::ALL
        .into_iter()
        .zip(buckets)
        .map(|(day, mut shows)| {
            shows.sort_by(rank_order);
            DaySchedule { day, shows }
        })
        .collect();

    let week = WeekData { week_start, days };
    debug!(
        "Merged {} entries into {} shows for week {}",
        entries.len(),
        week.total_shows(),
        week_start
    );
    week
}

/// Descending by score, then trending, then popularity. `sort_by` is stable,
/// so full ties keep their first-seen order.
fn rank_order(a: &MergedShow, b: &MergedShow) -> Ordering {
    b.score
        .cmp(&a.score)
        .then(b.trending.cmp(&a.trending))
        .then(b.popularity.cmp(&a.popularity))
}
