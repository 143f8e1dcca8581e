//! Client side of the game lobby: region discovery, per platform listings and
//! single server reads.
//!
//! [`LobbyProvider`] is the seam the collector works against; [`LobbyClient`]
//! is the HTTP implementation of it.

#[macro_use]
extern crate tracing;

mod client;
mod error;
mod platform;
mod server;

pub use client::{
    LobbyClient,
    DEFAULT_LOBBY_CDN,
    DEFAULT_READ_URL,
};
pub use error::LobbyApiError;
pub use platform::{
    platform_display_name,
    Platform,
    PlatformIter,
    RAIL_REGION,
};
pub use server::{
    Region,
    Server,
    ServerDetails,
};

use futures::future::BoxFuture;

/// Source of lobby data.
pub trait LobbyProvider: Send + Sync {
    /// Regions that can be queried for listings.
    fn regions(&self) -> BoxFuture<'_, Result<Vec<Region>, LobbyApiError>>;

    /// All servers listed for one region and platform.
    fn servers<'a>(&'a self, region: &'a str, platform: Platform)
        -> BoxFuture<'a, Result<Vec<Server>, LobbyApiError>>;

    /// Full details of a single server.
    fn server_details<'a>(
        &'a self,
        region: &'a str,
        row_id: &'a str,
    ) -> BoxFuture<'a, Result<ServerDetails, LobbyApiError>>;
}
