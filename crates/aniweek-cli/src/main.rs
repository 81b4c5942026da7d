use clap::{ArgAction, Parser, Subcommand};
use commands::{config, schedule, serve, show};

mod commands;
mod logging;
mod output;

#[derive(Parser)]
#[command(name = "aniweek")]
#[command(about = "aniweek - Weekly anime airing schedules from AniList")]
#[command(version)]
struct Cli {
    /// Enable verbose output (use multiple times for more verbosity: -v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "human", value_enum)]
    output: output::OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the airing schedule for a week
    #[command(long_about = "Display one week of airing anime, grouped by day. Weeks start on Sunday in the configured timezone. Offset 0 is the current week, -1 the previous one, 1 the next one.")]
    Schedule {
        /// Week offset relative to the current week (e.g. -1, 0, 2)
        #[arg(short = 'w', long, default_value_t = 0, allow_negative_numbers = true)]
        week: i32,

        /// Only show a single day (e.g. 'monday' or 'mon')
        #[arg(long, value_name = "DAY")]
        day: Option<String>,

        /// Discard any cached data for the week and fetch fresh
        #[arg(long, action = ArgAction::SetTrue)]
        refresh: bool,
    },
    /// Show details for a single anime
    #[command(long_about = "Display details for one anime, looked up by AniList ID or by a slug ending in the ID (e.g. 'sousou-no-frieren-154587').")]
    Show {
        /// AniList ID or slug ending in the ID
        #[arg(value_name = "ID_OR_SLUG")]
        reference: String,
    },
    /// Run the HTTP schedule API
    #[command(long_about = "Serve the weekly schedule over HTTP. Endpoints: /api/schedule?offset=N, /api/anime/:id and /health. Schedule responses carry CDN cache headers sized from configuration.")]
    Serve {
        /// Bind address (overrides configuration, e.g. 0.0.0.0:8080)
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,

        /// Write logs to the server log file instead of stderr
        #[arg(long, action = ArgAction::SetTrue)]
        log_to_file: bool,
    },
    /// Show or create configuration
    Config {
        #[command(subcommand)]
        cmd: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Write a default configuration file
    #[command(long_about = "Write a configuration file with default settings to the standard location. Refuses to overwrite an existing file unless --force is given.")]
    Init {
        /// Overwrite an existing configuration file
        #[arg(long, action = ArgAction::SetTrue)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    // The server can log to a rolling file; everything else logs to stderr
    let log_file = match &cli.command {
        Commands::Serve {
            log_to_file: true, ..
        } => Some(aniweek_config::PathManager::default().server_log_file()),
        _ => None,
    };
    logging::init_logging(cli.verbose, cli.quiet, log_file)
        .map_err(|e| color_eyre::eyre::eyre!("{}", e))?;

    // Create output handler
    let output = output::Output::new(cli.output, cli.quiet);

    match cli.command {
        Commands::Schedule { week, day, refresh } => {
            schedule::run_schedule(week, day, refresh, &output).await
        }
        Commands::Show { reference } => show::run_show(&reference, &output).await,
        Commands::Serve { bind, .. } => serve::run_serve(bind, &output).await,
        Commands::Config { cmd } => {
            let cmd = cmd.unwrap_or(ConfigCommands::Show);
            config::run_config(cmd, &output).await
        }
    }
}
