use crate::{
    enricher::Enricher,
    error::{
        Result,
        TrackerError,
    },
    model::LobbyServer,
};
use chrono::Utc;
use lobby_tracker_lobby::{
    LobbyProvider,
    Platform,
};
use std::sync::Arc;
use strum::IntoEnumIterator;
use tokio::{
    sync::Semaphore,
    task::JoinSet,
};
use tracing::Instrument;

/// Outcome of one collection run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collected {
    /// Snapshot timestamp shared by every server, epoch milliseconds.
    pub created_at: i64,
    pub servers: Vec<LobbyServer>,
    /// Number of (region, platform) units launched.
    pub units: usize,
    /// Units whose listing was empty.
    pub empty_units: usize,
}

/// Fans out over every (region, platform) pair of the lobby and gathers one snapshot.
#[derive(Clone)]
pub struct LobbyCollector {
    provider: Arc<dyn LobbyProvider>,
    enricher: Enricher,
}

impl LobbyCollector {
    pub fn new(provider: Arc<dyn LobbyProvider>, enricher: Enricher) -> Self {
        Self { provider, enricher }
    }

    pub fn provider(&self) -> &Arc<dyn LobbyProvider> {
        &self.provider
    }

    pub fn enricher(&self) -> &Enricher {
        &self.enricher
    }

    /// Collects and enriches every listed server.
    ///
    /// At most `limit` units talk to the lobby at once; a limit of zero is
    /// treated as one. The first failing unit cancels the others and its
    /// error is returned.
    #[instrument(level = "debug", skip(self))]
    pub async fn collect(&self, limit: usize) -> Result<Collected> {
        let regions = self.provider.regions().await?;
        let created_at = Utc::now().timestamp_millis();
        let permits = Arc::new(Semaphore::new(limit.max(1)));

        let mut units = JoinSet::new();
        let mut launched = 0;
        for region in regions {
            for platform in Platform::iter() {
                let index = launched;
                launched += 1;

                let provider = self.provider.clone();
                let enricher = self.enricher.clone();
                let permits = permits.clone();
                let region = region.region.clone();
                let span = debug_span!("unit", %region, %platform);

                units.spawn(
                    async move {
                        let _permit = permits.acquire_owned().await.ok();
                        run_unit(provider.as_ref(), &enricher, &region, platform, created_at)
                            .await
                            .map(|batch| (index, batch))
                    }
                    .instrument(span),
                );
            }
        }

        let mut batches: Vec<(usize, Option<Vec<LobbyServer>>)> = Vec::with_capacity(launched);
        while let Some(joined) = units.join_next().await {
            let outcome = joined.map_err(TrackerError::from).and_then(|unit| unit);
            match outcome {
                Ok(batch) => batches.push(batch),
                Err(err) => {
                    units.abort_all();
                    warn!(%err, "collection unit failed, cancelling the rest");
                    return Err(err);
                }
            }
        }

        batches.sort_by_key(|(index, _)| *index);
        let empty_units = batches.iter().filter(|(_, batch)| batch.is_none()).count();
        let servers: Vec<LobbyServer> = batches
            .into_iter()
            .filter_map(|(_, batch)| batch)
            .flatten()
            .collect();

        info!(
            created_at,
            units = launched,
            empty_units,
            servers = servers.len(),
            "collected lobby snapshot"
        );

        Ok(Collected {
            created_at,
            servers,
            units: launched,
            empty_units,
        })
    }
}

/// Lists one (region, platform) pair. `None` when the listing is empty.
async fn run_unit(
    provider: &dyn LobbyProvider,
    enricher: &Enricher,
    region: &str,
    platform: Platform,
    created_at: i64,
) -> Result<Option<Vec<LobbyServer>>> {
    let servers = provider.servers(region, platform).await?;
    trace!(count = servers.len(), "listed");
    if servers.is_empty() {
        return Ok(None);
    }
    Ok(Some(enricher.enrich_batch(servers, region, created_at)?))
}
