use serde::{Deserialize, Serialize};

/// One slot from the upstream airing schedule: a single episode of a single
/// title airing at a fixed unix timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AiringEntry {
    #[serde(rename = "airingAt")]
    pub airing_at: i64,
    pub episode: i32,
    pub media: Media,
}

/// Media summary attached to a schedule entry. Metric fields are nullable on
/// the wire and default to 0 when ranking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Media {
    pub id: i32,
    pub title: Option<MediaTitle>,
    #[serde(rename = "coverImage")]
    pub cover_image: Option<CoverImage>,
    #[serde(rename = "averageScore")]
    pub average_score: Option<i32>,
    pub trending: Option<i32>,
    pub popularity: Option<i32>,
}

impl Media {
    /// Display title policy: English first, romaji second, "Untitled" last.
    /// Blank strings count as absent.
    pub fn display_title(&self) -> &str {
        let title = self.title.as_ref();
        title
            .and_then(|t| t.english.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .or_else(|| {
                title
                    .and_then(|t| t.romaji.as_deref())
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
            })
            .unwrap_or("Untitled")
    }

    pub fn poster(&self) -> Option<&str> {
        self.cover_image.as_ref().and_then(|c| c.large.as_deref())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MediaTitle {
    pub romaji: Option<String>,
    pub english: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CoverImage {
    pub large: Option<String>,
    #[serde(rename = "extraLarge", default, skip_serializing_if = "Option::is_none")]
    pub extra_large: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_schedule_entry_from_wire_shape() {
        let value = json!({
            "airingAt": 1_755_999_600,
            "episode": 8,
            "media": {
                "id": 21,
                "title": { "romaji": "One Piece", "english": "ONE PIECE" },
                "coverImage": { "large": "https://img.example/21.jpg" },
                "averageScore": 88,
                "trending": 42,
                "popularity": 500_000
            }
        });
        let entry: AiringEntry = serde_json::from_value(value).expect("entry deserialize");
        assert_eq!(entry.airing_at, 1_755_999_600);
        assert_eq!(entry.episode, 8);
        assert_eq!(entry.media.id, 21);
        assert_eq!(entry.media.display_title(), "ONE PIECE");
        assert_eq!(entry.media.poster(), Some("https://img.example/21.jpg"));
    }

    #[test]
    fn tolerates_null_metrics_and_missing_titles() {
        let value = json!({
            "airingAt": 1,
            "episode": 1,
            "media": {
                "id": 7,
                "title": { "romaji": null, "english": null },
                "coverImage": null,
                "averageScore": null,
                "trending": null,
                "popularity": null
            }
        });
        let entry: AiringEntry = serde_json::from_value(value).expect("entry deserialize");
        assert_eq!(entry.media.display_title(), "Untitled");
        assert_eq!(entry.media.poster(), None);
        assert_eq!(entry.media.average_score, None);
    }

    #[test]
    fn title_falls_back_to_romaji_when_english_is_blank() {
        let media = Media {
            id: 1,
            title: Some(MediaTitle {
                romaji: Some("Sousou no Frieren".into()),
                english: Some("  ".into()),
                native: None,
            }),
            cover_image: None,
            average_score: None,
            trending: None,
            popularity: None,
        };
        assert_eq!(media.display_title(), "Sousou no Frieren");
    }
}
