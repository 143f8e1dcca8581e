use clap::{
    Parser,
    Subcommand,
};
use lobby_tracker_collector::QueryOptions;
use lobby_tracker_config::{
    version,
    ConfigArgs,
};
use std::{
    path::PathBuf,
    time::Duration,
};

/// Lobby Tracker
#[derive(Parser, Debug, Clone)]
#[command(author, version = version(), about, long_about = None)]
pub struct Args {
    #[clap(flatten)]
    pub config: ConfigArgs,

    /// Log at debug level unless `RUST_LOG` says otherwise.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Fetch every lobby listing and print it without storing anything.
    Collect {
        /// Listings fetched at once, defaults to `sync.concurrency`.
        #[arg(long)]
        limit: Option<usize>,

        /// Write the servers as JSON to this file instead of printing a table.
        #[arg(long, value_name = "FILE")]
        output_file: Option<PathBuf>,
    },

    /// Collect one snapshot and store it.
    Sync {
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Page through the newest stored snapshot.
    List(ListArgs),

    /// Read a single server from its regional lobby.
    Details {
        region: String,
        row_id: String,
    },

    /// Remove snapshots older than the ttl.
    Clear {
        #[arg(long, value_parser = humantime::parse_duration)]
        ttl: Option<Duration>,
    },

    /// Sync and clear on an interval until interrupted.
    Watch {
        #[arg(long, value_parser = parse_interval)]
        interval: Option<Duration>,

        #[arg(long, value_parser = humantime::parse_duration)]
        ttl: Option<Duration>,

        #[arg(long)]
        limit: Option<usize>,
    },

    /// Print the effective configuration.
    Config {
        /// Also write it to `config.yaml` in the config directory.
        #[arg(long)]
        save: bool,
    },
}

fn parse_interval(raw: &str) -> Result<Duration, String> {
    let interval = humantime::parse_duration(raw).map_err(|e| e.to_string())?;
    if interval.is_zero() {
        return Err("interval must be greater than zero".to_string());
    }
    Ok(interval)
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// Case insensitive regular expression matched against server names.
    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub address: Option<String>,

    /// Two letter country code.
    #[arg(long)]
    pub area: Option<String>,

    #[arg(long)]
    pub intent: Option<String>,

    #[arg(long)]
    pub game_mode: Option<String>,

    #[arg(long)]
    pub pvp: Option<bool>,

    #[arg(long)]
    pub password: Option<bool>,

    #[arg(long)]
    pub mods: Option<bool>,

    /// Comma separated; servers carrying any of them match.
    #[arg(long)]
    pub tags: Option<String>,

    #[arg(long, default_value_t = 1)]
    pub page: i64,

    #[arg(long, default_value_t = 10)]
    pub size: i64,

    #[arg(long, default_value = "name")]
    pub sort: String,

    /// Print JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

impl From<&ListArgs> for QueryOptions {
    fn from(args: &ListArgs) -> Self {
        Self {
            name: args.name.clone().unwrap_or_default(),
            address: args.address.clone().unwrap_or_default(),
            area: args.area.clone().unwrap_or_default(),
            intent: args.intent.clone().unwrap_or_default(),
            game_mode: args.game_mode.clone().unwrap_or_default(),
            pvp_enabled: args.pvp,
            has_password: args.password,
            mod_enabled: args.mods,
            tags: args.tags.clone().unwrap_or_default(),
            page: args.page,
            size: args.size,
            sort: args.sort.clone(),
        }
    }
}
