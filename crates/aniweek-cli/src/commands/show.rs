use color_eyre::Result;
use comfy_table::{Cell, Table};
use owo_colors::OwoColorize;

use aniweek_anilist::{AniListClient, ScheduleSource};
use aniweek_models::{slug, ExternalLink, MediaDetail};

use crate::output::{Output, OutputFormat};

/// Streaming platforms worth surfacing, in display priority order.
const STREAMING_SITES: [&str; 9] = [
    "Crunchyroll",
    "Netflix",
    "Hulu",
    "Amazon Prime Video",
    "Amazon",
    "Disney Plus",
    "Disney+",
    "HIDIVE",
    "Apple TV",
];

pub async fn run_show(reference: &str, output: &Output) -> Result<()> {
    tracing::debug!("Show command started");

    let id = parse_reference(reference).ok_or_else(|| {
        color_eyre::eyre::eyre!(
            "'{}' is not an AniList ID or a slug ending in one",
            reference
        )
    })?;

    let config = super::config::load_config()?;
    let client = AniListClient::from_config(&config.anilist)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to build AniList client: {}", e))?;

    let detail = match client.fetch_media(id).await {
        Ok(detail) => detail,
        Err(e) if e.is_not_found() => {
            output.error(&format!("No anime found with ID {}", id));
            return Ok(());
        }
        Err(e) => {
            return Err(color_eyre::eyre::eyre!(
                "Failed to fetch anime {}: {}",
                id,
                e
            ))
        }
    };

    match output.format() {
        OutputFormat::Human => render_detail(&detail, output),
        OutputFormat::Json | OutputFormat::JsonPretty => {
            output.json(&serde_json::to_value(&detail)?);
        }
    }

    Ok(())
}

/// Accepts a bare AniList ID or a "title-slug-12345" style reference.
fn parse_reference(reference: &str) -> Option<i32> {
    reference
        .parse::<i32>()
        .ok()
        .or_else(|| slug::parse_id(reference))
}

fn render_detail(detail: &MediaDetail, output: &Output) {
    if output.is_quiet() {
        return;
    }

    println!();
    println!("{}", detail.display_title().bold());
    if let Some(native) = detail.title.as_ref().and_then(|t| t.native.as_deref()) {
        if native != detail.display_title() {
            println!("{}", native.bright_black());
        }
    }
    println!();

    if let Some(next) = &detail.next_airing_episode {
        println!(
            "{} Episode {} airs in {}",
            "▶".green(),
            next.episode,
            format_countdown(next.time_until_airing)
        );
        println!();
    }

    let mut table = Table::new();
    table.set_header(vec![Cell::new("Details")
        .fg(comfy_table::Color::Cyan)
        .add_attribute(comfy_table::Attribute::Bold)]);
    if let Some(format) = &detail.format {
        table.add_row(vec![Cell::new("Format"), Cell::new(format)]);
    }
    if let Some(status) = &detail.status {
        table.add_row(vec![Cell::new("Status"), Cell::new(title_case(status))]);
    }
    if let Some(episodes) = detail.episodes {
        table.add_row(vec![Cell::new("Episodes"), Cell::new(episodes.to_string())]);
    }
    if let Some(duration) = detail.duration {
        table.add_row(vec![
            Cell::new("Duration"),
            Cell::new(format!("{} min", duration)),
        ]);
    }
    if let (Some(season), Some(year)) = (&detail.season, detail.season_year) {
        table.add_row(vec![
            Cell::new("Season"),
            Cell::new(format!("{} {}", title_case(season), year)),
        ]);
    }
    if let Some(genres) = &detail.genres {
        if !genres.is_empty() {
            table.add_row(vec![Cell::new("Genres"), Cell::new(genres.join(", "))]);
        }
    }
    if let Some(studio) = detail.main_studio() {
        table.add_row(vec![Cell::new("Studio"), Cell::new(studio)]);
    }
    if let Some(score) = detail.average_score {
        table.add_row(vec![
            Cell::new("Average score"),
            Cell::new(format!("{}%", score)),
        ]);
    }
    if let Some(popularity) = detail.popularity {
        table.add_row(vec![
            Cell::new("Popularity"),
            Cell::new(popularity.to_string()),
        ]);
    }
    if let Some(favourites) = detail.favourites {
        table.add_row(vec![
            Cell::new("Favourites"),
            Cell::new(favourites.to_string()),
        ]);
    }
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
    println!("{}", table);

    let rankings = top_rankings(detail);
    if !rankings.is_empty() {
        println!();
        for ranking in &rankings {
            println!("{}", ranking.yellow());
        }
    }

    let streams = streaming_links(detail);
    if !streams.is_empty() {
        println!();
        println!("{}", "Watch on".bold());
        for link in &streams {
            println!("  {}  {}", link.site, link.url.bright_black());
        }
    }

    if let Some(url) = detail.trailer.as_ref().and_then(|t| t.watch_url()) {
        println!();
        println!("Trailer: {}", url);
    }

    if let Some(description) = &detail.description {
        let text = strip_tags(description);
        if !text.is_empty() {
            println!();
            println!("{}", text);
        }
    }

    println!();
    println!("{}", detail.site_url().bright_black());
}

/// All-time rankings only; seasonal ones are too noisy for a summary view.
fn top_rankings(detail: &MediaDetail) -> Vec<String> {
    detail
        .rankings
        .iter()
        .flatten()
        .filter(|r| r.all_time.unwrap_or(false))
        .map(|r| format!("#{} {}", r.rank, title_case(&r.context)))
        .collect()
}

/// Known streaming platforms only, first link per site wins.
fn streaming_links(detail: &MediaDetail) -> Vec<&ExternalLink> {
    let mut seen: Vec<&str> = Vec::new();
    let mut links = Vec::new();
    for link in detail.external_links.iter().flatten() {
        if !STREAMING_SITES.contains(&link.site.as_str()) {
            continue;
        }
        if seen.contains(&link.site.as_str()) {
            continue;
        }
        seen.push(link.site.as_str());
        links.push(link);
    }
    links
}

/// AniList descriptions are HTML fragments. Line breaks survive as newlines,
/// every other tag is dropped.
fn strip_tags(html: &str) -> String {
    let normalized = html
        .replace("<br>", "\n")
        .replace("<br/>", "\n")
        .replace("<br />", "\n");

    let mut text = String::with_capacity(normalized.len());
    let mut in_tag = false;
    for c in normalized.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            c if !in_tag => text.push(c),
            _ => {}
        }
    }
    text.trim().to_string()
}

fn format_countdown(total_secs: i64) -> String {
    let days = total_secs / 86_400;
    let hours = (total_secs % 86_400) / 3_600;
    let minutes = (total_secs % 3_600) / 60;
    let seconds = total_secs % 60;

    if days > 0 {
        format!("{}d {}h {}m", days, hours, minutes)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_reference_accepts_id_and_slug() {
        assert_eq!(parse_reference("170068"), Some(170068));
        assert_eq!(parse_reference("sousou-no-frieren-154587"), Some(154587));
        assert_eq!(parse_reference("not-a-reference"), None);
    }

    #[test]
    fn test_strip_tags_converts_breaks_and_drops_markup() {
        let html = "First line.<br><br/>Second <i>line</i>.<br />Third.";
        assert_eq!(strip_tags(html), "First line.\n\nSecond line.\nThird.");
    }

    #[test]
    fn test_strip_tags_handles_plain_text() {
        assert_eq!(strip_tags("  no markup here  "), "no markup here");
    }

    #[test]
    fn test_format_countdown_picks_largest_units() {
        assert_eq!(format_countdown(90_061), "1d 1h 1m");
        assert_eq!(format_countdown(3_725), "1h 2m");
        assert_eq!(format_countdown(125), "2m 5s");
        assert_eq!(format_countdown(45), "45s");
    }

    #[test]
    fn test_streaming_links_keep_known_sites_first_link_wins() {
        let detail: MediaDetail = serde_json::from_value(json!({
            "id": 1,
            "externalLinks": [
                { "site": "Official Site", "url": "https://example.com" },
                { "site": "Crunchyroll", "url": "https://crunchyroll.com/a" },
                { "site": "Crunchyroll", "url": "https://crunchyroll.com/b" },
                { "site": "Netflix", "url": "https://netflix.com/title" }
            ]
        }))
        .unwrap();

        let links = streaming_links(&detail);
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].site, "Crunchyroll");
        assert_eq!(links[0].url, "https://crunchyroll.com/a");
        assert_eq!(links[1].site, "Netflix");
    }

    #[test]
    fn test_title_case_normalizes_upstream_enums() {
        assert_eq!(title_case("RELEASING"), "Releasing");
        assert_eq!(title_case("highest rated all time"), "Highest Rated All Time");
    }
}
