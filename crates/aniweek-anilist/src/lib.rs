pub mod client;
pub mod error;
pub mod traits;

pub use client::AniListClient;
pub use error::FetchError;
pub use traits::ScheduleSource;
