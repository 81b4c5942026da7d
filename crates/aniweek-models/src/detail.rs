use serde::{Deserialize, Serialize};

use crate::airing::{CoverImage, MediaTitle};

/// Full media record backing the detail view. Every field except `id` is
/// nullable upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaDetail {
    pub id: i32,
    pub title: Option<MediaTitle>,
    pub description: Option<String>,
    pub format: Option<String>,
    pub status: Option<String>,
    pub episodes: Option<i32>,
    pub duration: Option<i32>,
    pub season: Option<String>,
    #[serde(rename = "seasonYear")]
    pub season_year: Option<i32>,
    pub genres: Option<Vec<String>>,
    #[serde(rename = "coverImage")]
    pub cover_image: Option<CoverImage>,
    #[serde(rename = "bannerImage")]
    pub banner_image: Option<String>,
    #[serde(rename = "averageScore")]
    pub average_score: Option<i32>,
    #[serde(rename = "meanScore")]
    pub mean_score: Option<i32>,
    pub popularity: Option<i32>,
    pub favourites: Option<i32>,
    pub studios: Option<StudioConnection>,
    #[serde(rename = "externalLinks")]
    pub external_links: Option<Vec<ExternalLink>>,
    #[serde(rename = "streamingEpisodes")]
    pub streaming_episodes: Option<Vec<StreamingEpisode>>,
    #[serde(rename = "nextAiringEpisode")]
    pub next_airing_episode: Option<NextAiringEpisode>,
    pub trailer: Option<Trailer>,
    pub rankings: Option<Vec<MediaRanking>>,
}

impl MediaDetail {
    /// Detail pages prefer English, then romaji, then the native script.
    pub fn display_title(&self) -> &str {
        let title = self.title.as_ref();
        [
            title.and_then(|t| t.english.as_deref()),
            title.and_then(|t| t.romaji.as_deref()),
            title.and_then(|t| t.native.as_deref()),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or("Unknown")
    }

    pub fn main_studio(&self) -> Option<&str> {
        self.studios
            .as_ref()?
            .nodes
            .first()
            .map(|s| s.name.as_str())
    }

    pub fn site_url(&self) -> String {
        format!("https://anilist.co/anime/{}", self.id)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudioConnection {
    #[serde(default)]
    pub nodes: Vec<Studio>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Studio {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalLink {
    pub site: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamingEpisode {
    pub site: Option<String>,
    pub url: Option<String>,
    pub title: Option<String>,
    pub thumbnail: Option<String>,
}

/// Countdown anchor for a currently-airing title.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NextAiringEpisode {
    pub episode: i32,
    #[serde(rename = "timeUntilAiring")]
    pub time_until_airing: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trailer {
    pub id: Option<String>,
    pub site: Option<String>,
    pub thumbnail: Option<String>,
}

impl Trailer {
    /// Watch URL for the hosting sites the upstream actually uses.
    pub fn watch_url(&self) -> Option<String> {
        let site = self.site.as_deref()?;
        let id = self.id.as_deref()?;
        if site.eq_ignore_ascii_case("youtube") {
            return Some(format!("https://www.youtube.com/watch?v={}", id));
        }
        if site.eq_ignore_ascii_case("vimeo") {
            return Some(format!("https://vimeo.com/{}", id));
        }
        None
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaRanking {
    pub rank: i32,
    pub context: String,
    pub year: Option<i32>,
    pub season: Option<String>,
    #[serde(rename = "allTime")]
    pub all_time: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_detail_from_wire_shape() {
        let value = json!({
            "id": 16498,
            "title": { "romaji": "Shingeki no Kyojin", "english": "Attack on Titan", "native": "進撃の巨人" },
            "description": "Humanity fights back.<br><br>Spoilers follow.",
            "format": "TV",
            "status": "FINISHED",
            "episodes": 25,
            "duration": 24,
            "season": "SPRING",
            "seasonYear": 2013,
            "genres": ["Action", "Drama"],
            "coverImage": { "large": "l.jpg", "extraLarge": "xl.jpg", "color": "#a1d2e6" },
            "bannerImage": "banner.jpg",
            "averageScore": 84,
            "meanScore": 84,
            "popularity": 800_000,
            "favourites": 50_000,
            "studios": { "nodes": [ { "name": "Wit Studio" } ] },
            "externalLinks": [ { "site": "Crunchyroll", "url": "https://cr.example/aot" } ],
            "streamingEpisodes": [
                { "site": "Crunchyroll", "url": "https://cr.example/aot/1", "title": "Episode 1", "thumbnail": "t.jpg" }
            ],
            "nextAiringEpisode": null,
            "trailer": { "id": "abc123", "site": "youtube", "thumbnail": null },
            "rankings": [ { "rank": 12, "context": "highest rated all time", "year": null, "season": null, "allTime": true } ]
        });
        let detail: MediaDetail = serde_json::from_value(value).expect("detail deserialize");
        assert_eq!(detail.display_title(), "Attack on Titan");
        assert_eq!(detail.main_studio(), Some("Wit Studio"));
        assert_eq!(detail.site_url(), "https://anilist.co/anime/16498");
        assert_eq!(
            detail.trailer.unwrap().watch_url().as_deref(),
            Some("https://www.youtube.com/watch?v=abc123")
        );
    }

    #[test]
    fn title_falls_back_through_romaji_to_native() {
        let detail: MediaDetail = serde_json::from_value(json!({
            "id": 1,
            "title": { "romaji": null, "english": null, "native": "夏目友人帳" }
        }))
        .expect("detail deserialize");
        assert_eq!(detail.display_title(), "夏目友人帳");
    }

    #[test]
    fn trailer_url_only_for_known_sites() {
        let vimeo = Trailer {
            id: Some("99".into()),
            site: Some("Vimeo".into()),
            thumbnail: None,
        };
        assert_eq!(vimeo.watch_url().as_deref(), Some("https://vimeo.com/99"));

        let other = Trailer {
            id: Some("99".into()),
            site: Some("dailymotion".into()),
            thumbnail: None,
        };
        assert_eq!(other.watch_url(), None);
    }
}
