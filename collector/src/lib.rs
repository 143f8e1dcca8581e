//! # Lobby Tracker Collector
//!
//! Periodic snapshots of the game lobby.
//!
//! ## Flow
//!
//! - **Collect**: [`LobbyCollector`] lists every (region, platform) pair with
//!   bounded concurrency and enriches each server through the [`Enricher`]
//!   (geolocation, platform label, tags). All servers of one run share a
//!   snapshot timestamp.
//! - **Persist**: [`Syncer`] writes a complete snapshot to the
//!   [`SnapshotStore`] or nothing at all.
//! - **Query**: [`SnapshotStore::find_page`] serves pages of the newest
//!   snapshot, one entry per server row id.
//! - **Expire**: [`SnapshotStore::remove_expired`] drops old snapshots.
//!
//! [`LobbyService`] bundles these for front ends and [`schedule::watch`]
//! drives them on an interval.

#[macro_use]
extern crate tracing;

mod collector;
mod enricher;
mod error;
pub mod geo;
mod model;
pub mod schedule;
mod service;
pub mod store;
mod sync;

pub use collector::{
    Collected,
    LobbyCollector,
};
pub use enricher::Enricher;
pub use error::{
    Result,
    TrackerError,
};
pub use geo::{
    GeoLocation,
    GeoLocator,
    MaxMindGeoLocator,
};
pub use model::{
    parse_tags,
    DetailResult,
    DocId,
    Document,
    LobbyServer,
    PageResult,
    QueryOptions,
    ServerView,
};
pub use schedule::Schedule;
pub use service::{
    query_filter,
    LobbyService,
};
pub use store::{
    SnapshotStore,
    StoreError,
};
pub use sync::{
    SyncState,
    Syncer,
};
