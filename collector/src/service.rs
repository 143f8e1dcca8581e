use crate::{
    collector::LobbyCollector,
    error::{
        Result,
        TrackerError,
    },
    model::{
        DetailResult,
        LobbyServer,
        PageResult,
        QueryOptions,
        ServerView,
    },
    store::{
        Field,
        Filter,
        PageRequest,
        SnapshotStore,
    },
    sync::{
        SyncState,
        Syncer,
    },
};
use std::time::Duration;
use tokio::sync::watch;

/// Operations offered to front ends (CLI, HTTP).
pub struct LobbyService {
    collector: LobbyCollector,
    store: SnapshotStore,
    syncer: Syncer,
}

impl LobbyService {
    pub fn new(collector: LobbyCollector, store: SnapshotStore) -> Self {
        let syncer = Syncer::new(collector.clone(), store.clone());
        Self {
            collector,
            store,
            syncer,
        }
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn sync_state(&self) -> watch::Receiver<SyncState> {
        self.syncer.subscribe()
    }

    /// A page of the newest snapshot matching the options.
    pub async fn servers_by_page(&self, options: QueryOptions) -> Result<PageResult<ServerView>> {
        let request = PageRequest::new(options.page, options.size, options.sort.clone());
        let page = self.store.find_page(request, query_filter(&options)).await?;
        Ok(page.map(ServerView::from))
    }

    /// Collects from the lobby without storing anything.
    pub async fn servers_from_lobby(&self, limit: usize) -> Result<Vec<LobbyServer>> {
        Ok(self.collector.collect(limit).await?.servers)
    }

    pub async fn sync_local_servers(&self, limit: usize) -> Result<u64> {
        self.syncer.sync(limit).await
    }

    pub async fn clear_expired_servers(&self, ttl: Duration) -> Result<(u64, u64)> {
        Ok(self.store.remove_expired(ttl).await?)
    }

    /// Reads one server straight from its regional lobby.
    #[instrument(level = "debug", skip(self))]
    pub async fn server_details(&self, region: &str, row_id: &str) -> Result<DetailResult> {
        let details = self.collector.provider().server_details(region, row_id).await?;

        let server = self
            .collector
            .enricher()
            .enrich_batch(vec![details.server], region, 0)?
            .into_iter()
            .next()
            .ok_or_else(|| TrackerError::InvalidResult(format!("no server left after enriching {row_id}")))?;

        Ok(DetailResult {
            server: server.into(),
            details: details.details,
        })
    }
}

/// Translates client query options into a store filter.
pub fn query_filter(options: &QueryOptions) -> Filter {
    let mut filter = Filter::new();

    if !options.name.is_empty() {
        filter = filter.regex(Field::Name, options.name.as_str());
    }
    for (field, value) in [
        (Field::Address, &options.address),
        (Field::Area, &options.area),
        (Field::Intent, &options.intent),
        (Field::GameMode, &options.game_mode),
    ] {
        if !value.is_empty() {
            filter = filter.eq(field, value.as_str());
        }
    }
    for (field, value) in [
        (Field::PvpEnabled, options.pvp_enabled),
        (Field::HasPassword, options.has_password),
        (Field::ModEnabled, options.mod_enabled),
    ] {
        if let Some(value) = value {
            filter = filter.eq(field, value);
        }
    }

    let tags: Vec<String> = options
        .tags
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect();
    if !tags.is_empty() {
        filter = filter.any_of(Field::TagNames, tags);
    }

    filter
}
