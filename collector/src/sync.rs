use crate::{
    collector::LobbyCollector,
    error::Result,
    store::SnapshotStore,
};
use serde::Serialize;
use strum::Display;
use tokio::sync::watch;

/// Where the current sync cycle is.
///
/// `Done` and `Failed` describe the last finished cycle and stay published
/// until the next cycle starts with `Collecting`. `Idle` only means no cycle
/// has run yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    #[default]
    Idle,
    Collecting,
    Collected,
    Persisting,
    Done,
    Failed,
}

/// Collects a snapshot and persists it in one go.
///
/// A failed collection persists nothing, so every stored snapshot is complete.
pub struct Syncer {
    collector: LobbyCollector,
    store: SnapshotStore,
    state: watch::Sender<SyncState>,
}

impl Syncer {
    pub fn new(collector: LobbyCollector, store: SnapshotStore) -> Self {
        let (state, _) = watch::channel(SyncState::Idle);
        Self {
            collector,
            store,
            state,
        }
    }

    pub fn state(&self) -> SyncState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    /// Runs one cycle and returns the number of stored servers.
    #[instrument(level = "debug", skip(self))]
    pub async fn sync(&self, limit: usize) -> Result<u64> {
        self.transition(SyncState::Collecting);
        let collected = match self.collector.collect(limit).await {
            Ok(collected) => collected,
            Err(err) => {
                self.transition(SyncState::Failed);
                return Err(err);
            }
        };
        self.transition(SyncState::Collected);

        self.transition(SyncState::Persisting);
        let created_at = collected.created_at;
        match self.store.insert_many(collected.servers).await {
            Ok(inserted) => {
                self.transition(SyncState::Done);
                info!(inserted, created_at, "stored lobby snapshot");
                Ok(inserted)
            }
            Err(err) => {
                self.transition(SyncState::Failed);
                Err(err.into())
            }
        }
    }

    fn transition(&self, state: SyncState) {
        debug!(%state, "sync state");
        self.state.send_replace(state);
    }
}
