use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use chrono_tz::Tz;
use color_eyre::Result;
use comfy_table::{Cell, Table};
use indicatif::{ProgressBar, ProgressStyle};

use aniweek_anilist::AniListClient;
use aniweek_core::{group_and_merge, week, WeekCache};
use aniweek_models::{WeekData, Weekday};

use crate::output::{Output, OutputFormat};

pub async fn run_schedule(
    requested_week: i32,
    day: Option<String>,
    refresh: bool,
    output: &Output,
) -> Result<()> {
    tracing::debug!("Schedule command started");

    let config = super::config::load_config()?;
    let tz = config
        .schedule
        .tz()
        .map_err(|e| color_eyre::eyre::eyre!("{}", e))?;

    let day_filter = day
        .map(|name| name.parse::<Weekday>())
        .transpose()
        .map_err(|e| color_eyre::eyre::eyre!("{}", e))?;

    let client = AniListClient::from_config(&config.anilist)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to build AniList client: {}", e))?;

    // One-shot command, so warming adjacent weeks would never be observed
    let schedule_config = aniweek_config::ScheduleConfig {
        prefetch: false,
        ..config.schedule.clone()
    };
    let cache = WeekCache::new(Arc::new(client), tz, &schedule_config);

    let offset = week::clamp_offset(requested_week, 0, config.schedule.week_range);
    if offset != requested_week {
        output.warn(&format!(
            "Week {} is outside the supported range of +/-{} weeks, showing the current week",
            requested_week, config.schedule.week_range
        ));
    }

    let spinner = fetch_spinner(output);
    let result = if refresh {
        cache.refresh_week(offset).await
    } else {
        cache.get_week(offset).await
    };
    if let Some(pb) = &spinner {
        pb.finish_and_clear();
    }

    let fetched = result.map_err(|e| color_eyre::eyre::eyre!("Failed to fetch schedule: {}", e))?;
    let week_data = group_and_merge(&fetched.entries, fetched.week_start, tz);

    match output.format() {
        OutputFormat::Human => render_week(&week_data, offset, day_filter, tz, output),
        OutputFormat::Json | OutputFormat::JsonPretty => {
            let value = match day_filter {
                Some(day) => serde_json::to_value(week_data.day(day))?,
                None => serde_json::to_value(&week_data)?,
            };
            output.json(&value);
        }
    }

    Ok(())
}

fn render_week(
    week_data: &WeekData,
    offset: i32,
    day_filter: Option<Weekday>,
    tz: Tz,
    output: &Output,
) {
    if output.is_quiet() {
        return;
    }

    let today = if offset == 0 {
        Some(week::today_index(Utc::now(), tz))
    } else {
        None
    };

    for (index, day) in week_data.days.iter().enumerate() {
        if day_filter.map_or(false, |f| f.index() != index) {
            continue;
        }

        let label = week::month_day_label(week_data.week_start, index, tz);
        let mut heading = Cell::new(format!("{} ({})", day.day.name(), label))
            .add_attribute(comfy_table::Attribute::Bold);
        if today == Some(index) {
            heading = heading.fg(comfy_table::Color::Cyan);
        }

        let mut table = Table::new();
        table.set_header(vec![
            heading,
            Cell::new("Ep"),
            Cell::new("Time"),
            Cell::new("Score"),
        ]);
        for show in &day.shows {
            table.add_row(vec![
                Cell::new(&show.title),
                Cell::new(show.episode_label()),
                Cell::new(&show.air_time),
                Cell::new(score_label(show.score)),
            ]);
        }
        if day.shows.is_empty() {
            table.add_row(vec![Cell::new("Nothing airing").fg(comfy_table::Color::DarkGrey)]);
        }
        table.load_preset(comfy_table::presets::UTF8_FULL);
        table.apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
        println!("{}", table);
        println!();
    }

    let shown = match day_filter {
        Some(day) => week_data.day(day).map(|d| d.shows.len()).unwrap_or(0),
        None => week_data.total_shows(),
    };
    println!("{} {} airing", shown, if shown == 1 { "show" } else { "shows" });
}

fn score_label(score: i32) -> String {
    if score > 0 {
        score.to_string()
    } else {
        "-".to_string()
    }
}

fn fetch_spinner(output: &Output) -> Option<ProgressBar> {
    if output.is_quiet()
        || output.format() != OutputFormat::Human
        || !std::io::stdout().is_terminal()
    {
        return None;
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    );
    pb.set_message("Fetching schedule...");
    pb.enable_steady_tick(Duration::from_millis(80));
    Some(pb)
}
