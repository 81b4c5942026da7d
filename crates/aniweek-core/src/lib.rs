pub mod cache;
pub mod merge;
pub mod week;

pub use cache::{WeekCache, WeekEntries};
pub use merge::group_and_merge;
