use crate::StoreBackend;
use std::path::PathBuf;
use url::Url;

/// Settings that can be overridden from the command line.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Extra configuration file, applied after the one in the config directory.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Base URL of the lobby listing CDN.
    #[arg(long, global = true, value_name = "URL")]
    pub lobby_cdn_url: Option<Url>,

    /// Token used to read single server details.
    #[arg(long, global = true, env = "LOBBY_TRACKER_TOKEN", hide_env_values = true)]
    pub lobby_token: Option<String>,

    /// Path to a MaxMind City database.
    #[arg(long, global = true, value_name = "FILE")]
    pub geoip_database: Option<PathBuf>,

    /// Where collected servers are stored.
    #[arg(long, global = true, value_enum)]
    pub store: Option<StoreBackend>,

    /// ClickHouse HTTP endpoint, e.g. `http://localhost:8123`.
    #[arg(long, global = true, value_name = "URL")]
    pub clickhouse_url: Option<Url>,

    /// Number of lobby listings fetched at once.
    #[arg(long, global = true)]
    pub concurrency: Option<usize>,
}

mod config_ext {
    use super::*;
    use config::{
        Map,
        Source,
        Value,
    };
    use std::collections::HashMap;

    impl Source for ConfigArgs {
        fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
            Box::new((*self).clone())
        }

        fn collect(&self) -> Result<Map<String, Value>, config::ConfigError> {
            let mut cache = HashMap::<String, Value>::new();
            if let Some(url) = &self.lobby_cdn_url {
                cache.insert("lobby.cdn_url".to_string(), url.to_string().into());
            }
            if let Some(token) = &self.lobby_token {
                cache.insert("lobby.token".to_string(), token.clone().into());
            }
            if let Some(path) = &self.geoip_database {
                cache.insert("geoip.database".to_string(), path.display().to_string().into());
            }
            if let Some(backend) = &self.store {
                cache.insert("store.backend".to_string(), backend.to_string().into());
            }
            if let Some(url) = &self.clickhouse_url {
                cache.insert("store.clickhouse.url".to_string(), url.to_string().into());
            }
            if let Some(concurrency) = self.concurrency {
                cache.insert("sync.concurrency".to_string(), (concurrency as u64).into());
            }
            Ok(cache)
        }
    }
}

pub fn version() -> String {
    let author = clap::crate_authors!();
    let config_dir_path = crate::get_config_dir().display().to_string();
    let data_dir_path = crate::get_data_dir().display().to_string();

    format!(
        "\
{version}

Authors: {author}

Config directory: {config_dir_path}
Data directory: {data_dir_path}",
        version = clap::crate_version!()
    )
}
