use crate::{
    args::Command,
    report,
};
use clickhouse::Client;
use color_eyre::Result;
use eyre::Context as _;
use lobby_tracker_collector::{
    schedule::{
        self,
        Schedule,
    },
    store::{
        ClickHouseCollection,
        Collection,
        MemoryCollection,
    },
    Enricher,
    LobbyCollector,
    LobbyService,
    MaxMindGeoLocator,
    QueryOptions,
    SnapshotStore,
};
use lobby_tracker_config::{
    StoreBackend,
    TrackerConfig,
};
use lobby_tracker_lobby::LobbyClient;
use std::sync::Arc;

pub struct App {
    config: TrackerConfig,
    service: LobbyService,
}

impl App {
    pub async fn new(config: TrackerConfig) -> Result<Self> {
        config.validate()?;

        let lobby = LobbyClient::new(
            config.lobby.cdn_url.clone(),
            config.lobby.read_url.clone(),
            config.lobby.token.clone(),
            config.lobby.timeout,
        )?;
        let database = config.geoip_database();
        let geo = MaxMindGeoLocator::open(&database)
            .wrap_err_with(|| format!("Failed to open geoip database {database:?}"))?;

        let store = SnapshotStore::open(open_collection(&config).await?).await?;
        let collector = LobbyCollector::new(Arc::new(lobby), Enricher::new(Arc::new(geo)));

        Ok(Self {
            config,
            service: LobbyService::new(collector, store),
        })
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn run(self, command: Command) -> Result<()> {
        let default_limit = self.config.sync.concurrency;

        match command {
            Command::Collect { limit, output_file } => {
                let servers = self.service.servers_from_lobby(limit.unwrap_or(default_limit)).await?;
                if let Some(output_file) = &output_file {
                    let json = serde_json::to_string_pretty(&servers)?;
                    tokio::fs::write(output_file, json)
                        .await
                        .wrap_err_with(|| format!("Failed to write {output_file:?}"))?;
                    info!(?output_file, servers = servers.len(), "exported collected servers");
                } else {
                    println!("{}", report::collected(&servers));
                }
            }

            Command::Sync { limit } => {
                let inserted = self.service.sync_local_servers(limit.unwrap_or(default_limit)).await?;
                println!("stored {inserted} servers");
            }

            Command::List(list) => {
                self.sync_if_ephemeral().await?;
                let options = QueryOptions::from(&list);
                let page = self.service.servers_by_page(options).await?;
                if list.json {
                    println!("{}", serde_json::to_string_pretty(&page)?);
                } else {
                    println!("{}", report::page(&page, list.page.max(1)));
                }
            }

            Command::Details { region, row_id } => {
                let detail = self.service.server_details(&region, &row_id).await?;
                println!("{}", report::details(&detail));
            }

            Command::Clear { ttl } => {
                let (deleted, remaining) = self
                    .service
                    .clear_expired_servers(ttl.unwrap_or(self.config.sync.ttl))
                    .await?;
                println!("deleted {deleted} servers, {remaining} remaining");
            }

            Command::Watch { interval, ttl, limit } => {
                let schedule = Schedule {
                    interval: interval.unwrap_or(self.config.sync.interval),
                    limit: limit.unwrap_or(default_limit),
                    ttl: ttl.unwrap_or(self.config.sync.ttl),
                };
                let shutdown = async {
                    if let Err(err) = tokio::signal::ctrl_c().await {
                        error!(%err, "cannot listen for ctrl-c");
                        std::future::pending::<()>().await;
                    }
                };
                let cycles = schedule::watch(&self.service, schedule, shutdown).await;
                println!("ran {cycles} cycles");
            }

            Command::Config { save } => {
                println!("{}", serde_yml::to_string(&self.config)?);
                if save {
                    let path = self.config.save()?;
                    println!("saved to {path:?}");
                }
            }
        }

        Ok(())
    }

    /// The memory store starts out empty in every process, so reads sync first.
    async fn sync_if_ephemeral(&self) -> Result<()> {
        if self.config.store.backend == StoreBackend::Memory {
            info!("memory store is empty at startup, collecting a snapshot first");
            self.service.sync_local_servers(self.config.sync.concurrency).await?;
        }
        Ok(())
    }
}

async fn open_collection(config: &TrackerConfig) -> Result<Arc<dyn Collection>> {
    match config.store.backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryCollection::new())),
        StoreBackend::ClickHouse => {
            let settings = &config.store.clickhouse;
            let url = settings
                .url
                .as_ref()
                .ok_or_else(|| eyre::eyre!("store.clickhouse.url is not set"))?;

            let mut client = Client::default()
                .with_url(url.as_str())
                .with_user(settings.user.clone())
                .with_database(settings.database.clone());
            if let Some(password) = &settings.password {
                client = client.with_password(password.clone());
            }

            let collection = ClickHouseCollection::open(client, settings.table.clone())
                .await
                .wrap_err("Failed to open clickhouse table")?;
            Ok(Arc::new(collection))
        }
    }
}
