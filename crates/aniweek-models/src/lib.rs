pub mod airing;
pub mod detail;
pub mod schedule;
pub mod slug;
pub mod weekday;

pub use airing::{AiringEntry, CoverImage, Media, MediaTitle};
pub use detail::{
    ExternalLink, MediaDetail, MediaRanking, NextAiringEpisode, StreamingEpisode, Studio,
    StudioConnection, Trailer,
};
pub use schedule::{DaySchedule, MergedShow, WeekData};
pub use weekday::Weekday;
