use crate::{
    error::{
        Result,
        TrackerError,
    },
    geo::{
        GeoError,
        GeoLocator,
    },
    model::LobbyServer,
};
use lobby_tracker_lobby::Server;
use std::{
    net::IpAddr,
    sync::Arc,
};

/// Turns raw lobby entries into storable servers: geolocation, platform label and tags.
#[derive(Clone)]
pub struct Enricher {
    geo: Arc<dyn GeoLocator>,
}

impl Enricher {
    pub fn new(geo: Arc<dyn GeoLocator>) -> Self {
        Self { geo }
    }

    pub fn enrich(&self, server: Server, region: &str, created_at: i64) -> Result<LobbyServer> {
        let location = server
            .address
            .parse::<IpAddr>()
            .map_err(GeoError::from)
            .and_then(|ip| self.geo.lookup(ip))
            .map_err(|source| TrackerError::Enrichment {
                row_id: server.row_id.clone(),
                address: server.address.clone(),
                source,
            })?;

        Ok(LobbyServer::new(server, region, location, created_at))
    }

    /// Enriches a whole listing. The first server that cannot be resolved fails the batch.
    pub fn enrich_batch(&self, servers: Vec<Server>, region: &str, created_at: i64) -> Result<Vec<LobbyServer>> {
        servers
            .into_iter()
            .map(|server| self.enrich(server, region, created_at))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoLocation;
    use pretty_assertions::assert_eq;

    struct OnlyLoopback;

    impl GeoLocator for OnlyLoopback {
        fn lookup(&self, ip: IpAddr) -> Result<GeoLocation, GeoError> {
            if ip.is_unspecified() {
                return Err(GeoError::Incomplete { ip, field: "city" });
            }
            if ip.is_loopback() {
                Ok(GeoLocation {
                    continent: "NA".to_string(),
                    country: "US".to_string(),
                    city: "Ashburn".to_string(),
                })
            } else {
                Err(GeoError::NotFound(ip))
            }
        }
    }

    fn server(row_id: &str, address: &str) -> Server {
        Server {
            row_id: row_id.to_string(),
            address: address.to_string(),
            platform: 1,
            ..Server::default()
        }
    }

    fn enricher() -> Enricher {
        Enricher::new(Arc::new(OnlyLoopback))
    }

    #[test]
    fn enriches_every_server_in_batch() {
        let batch = vec![server("a", "127.0.0.1"), server("b", "::1")];
        let enriched = enricher().enrich_batch(batch, "us-east-1", 42).unwrap();

        assert_eq!(enriched.len(), 2);
        for server in &enriched {
            assert_eq!(server.area, "US");
            assert_eq!(server.platform_name, "Steam");
            assert_eq!(server.region, "us-east-1");
            assert_eq!(server.created_at, 42);
        }
    }

    #[test]
    fn unresolvable_address_fails_the_batch() {
        let batch = vec![server("a", "127.0.0.1"), server("b", "198.51.100.1")];
        let err = enricher().enrich_batch(batch, "us-east-1", 42).unwrap_err();

        match err {
            TrackerError::Enrichment { row_id, source, .. } => {
                assert_eq!(row_id, "b");
                assert!(matches!(source, GeoError::NotFound(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn incomplete_location_fails_the_batch() {
        let batch = vec![server("a", "127.0.0.1"), server("b", "0.0.0.0")];
        let err = enricher().enrich_batch(batch, "us-east-1", 42).unwrap_err();

        match err {
            TrackerError::Enrichment { row_id, source, .. } => {
                assert_eq!(row_id, "b");
                assert!(matches!(source, GeoError::Incomplete { field: "city", .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn malformed_address_is_an_enrichment_failure() {
        let err = enricher()
            .enrich(server("a", "not-an-ip"), "us-east-1", 42)
            .unwrap_err();
        assert!(matches!(
            err,
            TrackerError::Enrichment {
                source: GeoError::InvalidAddress(_),
                ..
            }
        ));
    }

    #[test]
    fn unknown_platform_gets_empty_label() {
        let mut raw = server("a", "127.0.0.1");
        raw.platform = 4;
        let enriched = enricher().enrich(raw, "us-east-1", 42).unwrap();
        assert_eq!(enriched.platform_name, "");
    }
}
