use color_eyre::Result;
use comfy_table::{Cell, Table};
use serde_json::json;

use aniweek_config::{Config, PathManager};

use crate::output::{Output, OutputFormat};

/// Load and validate the effective configuration. Missing files fall back to
/// defaults so every command works out of the box.
pub fn load_config() -> Result<Config> {
    let path_manager = PathManager::default();
    let config_file = path_manager.config_file();

    let config = Config::load_or_default(&config_file).map_err(|e| {
        color_eyre::eyre::eyre!("Failed to load config from {}: {}", config_file.display(), e)
    })?;
    config
        .validate()
        .map_err(|e| color_eyre::eyre::eyre!("Invalid configuration: {}", e))?;

    Ok(config)
}

pub async fn run_config(cmd: crate::ConfigCommands, output: &Output) -> Result<()> {
    match cmd {
        crate::ConfigCommands::Show => show_config(output),
        crate::ConfigCommands::Init { force } => init_config(force, output),
    }
}

fn show_config(output: &Output) -> Result<()> {
    let path_manager = PathManager::default();
    let config_file = path_manager.config_file();
    let exists = config_file.exists();

    let config = load_config()?;

    match output.format() {
        OutputFormat::Human => {
            if output.is_quiet() {
                return Ok(());
            }

            if !exists {
                output.warn(&format!(
                    "No configuration file at {}, showing defaults",
                    config_file.display()
                ));
                output.info("Run 'aniweek config init' to create one.");
                println!();
            }

            let mut info_table = Table::new();
            info_table.set_header(vec![
                Cell::new("Config File").add_attribute(comfy_table::Attribute::Bold),
                Cell::new(config_file.display().to_string()),
            ]);
            info_table.load_preset(comfy_table::presets::UTF8_FULL);
            info_table.apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
            println!("{}", info_table);
            println!();

            let mut schedule_table = Table::new();
            schedule_table.set_header(vec![Cell::new("Schedule")
                .fg(comfy_table::Color::Cyan)
                .add_attribute(comfy_table::Attribute::Bold)]);
            schedule_table.add_row(vec![
                Cell::new("Timezone"),
                Cell::new(&config.schedule.timezone),
            ]);
            schedule_table.add_row(vec![
                Cell::new("Week range"),
                Cell::new(format!("+/-{} weeks", config.schedule.week_range)),
            ]);
            schedule_table.add_row(vec![
                Cell::new("Prefetch adjacent weeks"),
                Cell::new(if config.schedule.prefetch { "yes" } else { "no" }),
            ]);
            schedule_table.add_row(vec![
                Cell::new("Prefetch delay"),
                Cell::new(format!("{} ms", config.schedule.prefetch_delay_ms)),
            ]);
            schedule_table.load_preset(comfy_table::presets::UTF8_FULL);
            schedule_table.apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
            println!("{}", schedule_table);
            println!();

            let mut anilist_table = Table::new();
            anilist_table.set_header(vec![Cell::new("AniList")
                .fg(comfy_table::Color::Cyan)
                .add_attribute(comfy_table::Attribute::Bold)]);
            anilist_table.add_row(vec![
                Cell::new("Endpoint"),
                Cell::new(&config.anilist.endpoint),
            ]);
            anilist_table.add_row(vec![
                Cell::new("Page size"),
                Cell::new(config.anilist.per_page.to_string()),
            ]);
            anilist_table.add_row(vec![
                Cell::new("Request timeout"),
                Cell::new(format!("{} s", config.anilist.timeout_secs)),
            ]);
            anilist_table.add_row(vec![
                Cell::new("Connect timeout"),
                Cell::new(format!("{} s", config.anilist.connect_timeout_secs)),
            ]);
            anilist_table.load_preset(comfy_table::presets::UTF8_FULL);
            anilist_table.apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
            println!("{}", anilist_table);
            println!();

            let mut server_table = Table::new();
            server_table.set_header(vec![Cell::new("Server")
                .fg(comfy_table::Color::Cyan)
                .add_attribute(comfy_table::Attribute::Bold)]);
            server_table.add_row(vec![Cell::new("Bind"), Cell::new(&config.server.bind)]);
            server_table.add_row(vec![
                Cell::new("Cache max-age"),
                Cell::new(format!("{} s", config.server.cache_max_age_secs)),
            ]);
            server_table.add_row(vec![
                Cell::new("Cache stale window"),
                Cell::new(format!("{} s", config.server.cache_stale_secs)),
            ]);
            server_table.load_preset(comfy_table::presets::UTF8_FULL);
            server_table.apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
            println!("{}", server_table);
        }
        OutputFormat::Json | OutputFormat::JsonPretty => {
            let value = json!({
                "configFile": config_file.display().to_string(),
                "exists": exists,
                "config": serde_json::to_value(&config)?,
            });
            output.json(&value);
        }
    }

    Ok(())
}

fn init_config(force: bool, output: &Output) -> Result<()> {
    let path_manager = PathManager::default();
    let config_file = path_manager.config_file();

    if config_file.exists() && !force {
        output.warn(&format!(
            "Configuration already exists at {} (use --force to overwrite)",
            config_file.display()
        ));
        return Ok(());
    }

    path_manager
        .ensure_directories()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to create config directories: {}", e))?;

    let config = Config::default();
    config.save_to_file(&config_file).map_err(|e| {
        color_eyre::eyre::eyre!(
            "Failed to write config to {}: {}",
            config_file.display(),
            e
        )
    })?;

    output.success(&format!(
        "Wrote default configuration to {}",
        config_file.display()
    ));
    Ok(())
}
