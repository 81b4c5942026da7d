use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use aniweek_models::{AiringEntry, MediaDetail};

use crate::error::FetchError;

/// Upstream seam the week cache fetches through.
///
/// Implementations must honor the cancellation token: once it fires, the call
/// returns `FetchError::Cancelled` without processing any response.
#[async_trait]
pub trait ScheduleSource: Send + Sync {
    /// All airing slots strictly inside `(from, to)`, ordered by airing time.
    /// Bounds are exclusive on both ends.
    async fn fetch_airing_range(
        &self,
        from: i64,
        to: i64,
        cancel: &CancellationToken,
    ) -> Result<Vec<AiringEntry>, FetchError>;

    /// Full detail record for one title.
    async fn fetch_media(&self, id: i32) -> Result<MediaDetail, FetchError>;
}
