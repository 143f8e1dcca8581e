use crate::{
    geo::GeoError,
    store::StoreError,
};
use lobby_tracker_lobby::LobbyApiError;

pub type Result<T, E = TrackerError> = std::result::Result<T, E>;

#[derive(thiserror::Error, Debug)]
pub enum TrackerError {
    #[error("lobby unavailable: {0}")]
    UpstreamUnavailable(#[from] LobbyApiError),
    #[error("cannot enrich server {row_id} at {address:?}: {source}")]
    Enrichment {
        row_id: String,
        address: String,
        #[source]
        source: GeoError,
    },
    #[error("store failure: {0}")]
    Persistence(#[from] StoreError),
    #[error("invalid result: {0}")]
    InvalidResult(String),
    #[error("collection unit failed: {0}")]
    Unit(#[from] tokio::task::JoinError),
}
