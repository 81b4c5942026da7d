use serde::{Deserialize, Serialize};

use crate::weekday::Weekday;

/// One title's merged row within a single day: consecutive same-day episodes
/// collapse into an episode range anchored at the earliest airing instant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MergedShow {
    pub id: i32,
    pub title: String,
    pub image: String,
    #[serde(rename = "firstEp")]
    pub first_ep: i32,
    #[serde(rename = "lastEp")]
    pub last_ep: i32,
    /// Unix seconds of the earliest episode that day. Ordering and the time
    /// label are both derived from this instant.
    #[serde(rename = "airingAt")]
    pub airing_at: i64,
    /// Wall-clock label in the schedule's display zone, e.g. "9:00 PM".
    #[serde(rename = "airTime")]
    pub air_time: String,
    pub score: i32,
    pub trending: i32,
    pub popularity: i32,
}

impl MergedShow {
    /// "Ep 5" for a single episode, "Ep 3-5" for a same-day range.
    pub fn episode_label(&self) -> String {
        if self.first_ep == self.last_ep {
            format!("Ep {}", self.first_ep)
        } else {
            format!("Ep {}-{}", self.first_ep, self.last_ep)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DaySchedule {
    pub day: Weekday,
    pub shows: Vec<MergedShow>,
}

/// A fully grouped and ranked week. `days` always holds the seven weekdays in
/// schedule order, Sunday first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeekData {
    #[serde(rename = "weekStart")]
    pub week_start: i64,
    pub days: Vec<DaySchedule>,
}

impl WeekData {
    pub fn day(&self, day: Weekday) -> Option<&DaySchedule> {
        self.days.iter().find(|d| d.day == day)
    }

    pub fn total_shows(&self) -> usize {
        self.days.iter().map(|d| d.shows.len()).sum()
    }
}
