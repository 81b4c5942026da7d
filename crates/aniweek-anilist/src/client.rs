use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use aniweek_config::AniListConfig;
use aniweek_models::{AiringEntry, MediaDetail};

use crate::error::FetchError;
use crate::traits::ScheduleSource;

/// Page query for airing slots inside an exclusive time range. The upstream
/// filters are strict comparisons, so both bounds are open.
const AIRING_QUERY: &str = r#"
query ($from: Int, $to: Int, $perPage: Int) {
  Page(perPage: $perPage) {
    airingSchedules(airingAt_greater: $from, airingAt_lesser: $to, sort: TIME) {
      airingAt
      episode
      media {
        id
        title { romaji english }
        coverImage { large }
        averageScore
        trending
        popularity
      }
    }
  }
}
"#;

const MEDIA_QUERY: &str = r#"
query ($id: Int) {
  Media(id: $id, type: ANIME) {
    id
    title { romaji english native }
    description(asHtml: false)
    format
    status
    episodes
    duration
    season
    seasonYear
    genres
    coverImage { large extraLarge color }
    bannerImage
    averageScore
    meanScore
    popularity
    favourites
    studios(isMain: true) { nodes { name } }
    externalLinks { site url }
    streamingEpisodes { site url title thumbnail }
    nextAiringEpisode { episode timeUntilAiring }
    trailer { id site thumbnail }
    rankings { rank context year season allTime }
  }
}
"#;

#[derive(Debug, Clone)]
pub struct AniListClient {
    client: Client,
    endpoint: String,
    per_page: i32,
}

impl AniListClient {
    pub fn from_config(config: &AniListConfig) -> Result<Self, FetchError> {
        let user_agent = format!("aniweek/{}", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            per_page: config.per_page,
        })
    }

    async fn post_graphql<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<GraphQlResponse<T>, FetchError> {
        let body = json!({ "query": query, "variables": variables });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let bytes = response.bytes().await?;
        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
                message: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        serde_json::from_slice(&bytes).map_err(|e| FetchError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ScheduleSource for AniListClient {
    async fn fetch_airing_range(
        &self,
        from: i64,
        to: i64,
        cancel: &CancellationToken,
    ) -> Result<Vec<AiringEntry>, FetchError> {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        debug!("Fetching airing schedules in ({}, {})", from, to);
        let variables = json!({ "from": from, "to": to, "perPage": self.per_page });

        tokio::select! {
            _ = cancel.cancelled() => Err(FetchError::Cancelled),
            response = self.post_graphql::<AiringData>(AIRING_QUERY, variables) => {
                entries_from_response(response?)
            }
        }
    }

    async fn fetch_media(&self, id: i32) -> Result<MediaDetail, FetchError> {
        debug!("Fetching media detail for id {}", id);
        let response = self.post_graphql(MEDIA_QUERY, json!({ "id": id })).await?;
        media_from_response(id, response)
    }
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
    status: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct AiringData {
    #[serde(rename = "Page")]
    page: Option<AiringPage>,
}

#[derive(Debug, Deserialize)]
struct AiringPage {
    #[serde(rename = "airingSchedules", default)]
    airing_schedules: Vec<AiringEntry>,
}

#[derive(Debug, Deserialize)]
struct DetailData {
    #[serde(rename = "Media")]
    media: Option<MediaDetail>,
}

fn join_errors(errors: &[GraphQlError]) -> String {
    errors
        .iter()
        .map(|e| match e.status {
            Some(status) => format!("{} (status {})", e.message, status),
            None => e.message.clone(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

fn entries_from_response(
    response: GraphQlResponse<AiringData>,
) -> Result<Vec<AiringEntry>, FetchError> {
    if let Some(errors) = response.errors {
        return Err(FetchError::GraphQl(join_errors(&errors)));
    }
    Ok(response
        .data
        .and_then(|d| d.page)
        .map(|p| p.airing_schedules)
        .unwrap_or_default())
}

fn media_from_response(
    id: i32,
    response: GraphQlResponse<DetailData>,
) -> Result<MediaDetail, FetchError> {
    if let Some(errors) = response.errors {
        // The upstream reports a missing id as a GraphQL error with data.Media null
        if errors.iter().any(|e| e.status == Some(404)) {
            return Err(FetchError::NotFound(id));
        }
        return Err(FetchError::GraphQl(join_errors(&errors)));
    }
    response
        .data
        .and_then(|d| d.media)
        .ok_or(FetchError::NotFound(id))
}
