//! Layered configuration of the lobby tracker.
//!
//! Sources, later ones winning: the embedded defaults, `config.yaml` in the
//! config directory, an explicit `--config` file, `LOBBY_TRACKER__*`
//! environment variables and finally command line flags.

#[macro_use]
extern crate tracing;

mod app_config;
mod args;
pub mod duration;

pub use app_config::{
    get_config_dir,
    get_data_dir,
    AppConfig,
};
pub use args::{
    version,
    ConfigArgs,
};
use color_eyre::Result;
use eyre::{
    bail,
    Context as _,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    path::{
        Path,
        PathBuf,
    },
    time::Duration,
};
use strum::{
    Display,
    EnumString,
};
use url::Url;

const DEFAULT_CONFIG: &str = include_str!("default-config.yaml");

/// Default file name of the MaxMind database inside the data directory.
pub const GEOIP_DATABASE_FILE: &str = "GeoLite2-City.mmdb";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TrackerConfig {
    #[serde(flatten, skip_serializing)]
    pub app_config: AppConfig,
    pub lobby: LobbyConfig,
    #[serde(default)]
    pub geoip: GeoIpConfig,
    pub store: StoreConfig,
    pub sync: SyncConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LobbyConfig {
    pub cdn_url: Url,
    /// Details endpoint; `{region}` is replaced with the server's region.
    pub read_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(with = "duration")]
    pub timeout: Duration,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct GeoIpConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,
}

#[derive(
    Clone, Copy, Debug, Default, Display, EnumString, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Kept in process memory, gone on exit.
    #[default]
    Memory,
    #[value(name = "clickhouse")]
    ClickHouse,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    pub clickhouse: ClickHouseConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ClickHouseConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<Url>,
    pub user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub database: String,
    pub table: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SyncConfig {
    /// Upper bound of lobby listings fetched at once.
    pub concurrency: usize,
    #[serde(with = "duration")]
    pub interval: Duration,
    /// Snapshots older than this are removed.
    #[serde(with = "duration")]
    pub ttl: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        serde_yml::from_str(DEFAULT_CONFIG).expect("Failed to parse default config")
    }
}

impl TrackerConfig {
    pub fn new(args: ConfigArgs) -> Result<Self, config::ConfigError> {
        let data_dir = get_data_dir();
        let config_dir = get_config_dir();
        let mut builder = config::Config::builder()
            .set_default("data_dir", data_dir.display().to_string())?
            .set_default("config_dir", config_dir.display().to_string())?
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Yaml));

        let config_files = [("config.yaml", config::FileFormat::Yaml)];

        for (file, format) in &config_files {
            let source = config::File::from(config_dir.join(file))
                .format(*format)
                .required(false);
            builder = builder.add_source(source);
        }

        if let Some(path) = &args.config {
            debug!(?path, "loading configuration file");
            builder = builder.add_source(config::File::from(path.clone()).format(config::FileFormat::Yaml));
        }

        builder = builder
            .add_source(
                config::Environment::with_prefix(app_config::ENV_PREFIX.as_str())
                    .separator("__")
                    .try_parsing(true),
            )
            .add_source(args);

        let cfg: Self = builder.build()?.try_deserialize()?;

        Ok(cfg)
    }

    pub fn data_dir(&self) -> &Path {
        &self.app_config.data_dir
    }

    /// The configured MaxMind database or the default one in the data directory.
    pub fn geoip_database(&self) -> PathBuf {
        self.geoip
            .database
            .clone()
            .unwrap_or_else(|| self.app_config.data_dir.join(GEOIP_DATABASE_FILE))
    }

    pub fn validate(&self) -> Result<()> {
        if self.sync.concurrency == 0 {
            bail!("sync.concurrency must be at least 1");
        }
        if self.sync.interval.is_zero() {
            bail!("sync.interval must be greater than zero");
        }
        let database = self.geoip_database();
        if !database.is_file() {
            bail!("geoip database {database:?} not found, set geoip.database or --geoip-database");
        }
        if self.store.backend == StoreBackend::ClickHouse && self.store.clickhouse.url.is_none() {
            bail!("store.clickhouse.url is required for the clickhouse backend");
        }
        Ok(())
    }

    /// Writes the configuration to `config.yaml` in the config directory.
    pub fn save(&self) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.app_config.config_dir).context("Failed to create config directory")?;
        let path = self.app_config.config_dir.join("config.yaml");
        let content = serde_yml::to_string(self).context("Failed to serialize config")?;
        std::fs::write(&path, content).wrap_err_with(|| format!("Failed to write config to {:?}", path))?;
        info!(?path, "saved configuration");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::Source as _;
    use pretty_assertions::assert_eq;

    #[test]
    fn embedded_defaults_parse() {
        let config = TrackerConfig::default();
        assert_eq!(config.lobby.cdn_url.as_str(), "https://lobby-v2-cdn.klei.com/");
        assert_eq!(config.lobby.timeout, Duration::from_secs(30));
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.store.clickhouse.table, "lobby_servers");
        assert_eq!(config.sync.concurrency, 8);
        assert_eq!(config.sync.interval, Duration::from_secs(60));
        assert_eq!(config.sync.ttl, Duration::from_secs(24 * 60 * 60));
    }

    #[test]
    fn args_override_nested_keys() {
        let args = ConfigArgs {
            store: Some(StoreBackend::ClickHouse),
            clickhouse_url: Some(Url::parse("http://localhost:8123").unwrap()),
            concurrency: Some(3),
            ..ConfigArgs::default()
        };
        let collected = args.collect().unwrap();
        assert_eq!(
            collected["store.backend"].clone().into_string().unwrap(),
            "clickhouse"
        );

        let config: TrackerConfig = config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Yaml))
            .add_source(args)
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(config.store.backend, StoreBackend::ClickHouse);
        assert_eq!(config.sync.concurrency, 3);
        assert_eq!(
            config.store.clickhouse.url.as_ref().map(Url::as_str),
            Some("http://localhost:8123/")
        );
    }

    #[test]
    fn validation_rejects_bad_settings() {
        let mut config = TrackerConfig::default();
        config.geoip.database = Some(PathBuf::from("/nonexistent/GeoLite2-City.mmdb"));
        assert!(config.validate().is_err());

        config.geoip.database = Some(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("src/lib.rs"));
        assert!(config.validate().is_ok());

        config.sync.concurrency = 0;
        assert!(config.validate().is_err());
        config.sync.concurrency = 1;

        config.sync.interval = Duration::ZERO;
        assert!(config.validate().is_err());
        config.sync.interval = Duration::from_secs(1);
        assert!(config.validate().is_ok());

        config.store.backend = StoreBackend::ClickHouse;
        assert!(config.validate().is_err());
    }

    #[test]
    fn durations_round_trip_through_yaml() {
        let yaml = serde_yml::to_string(&TrackerConfig::default()).unwrap();
        assert!(yaml.contains("interval: 1m"), "{yaml}");
    }
}
