use maxminddb::{
    geoip2,
    MaxMindDBError,
    Reader,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    net::{
        AddrParseError,
        IpAddr,
    },
    path::Path,
};

/// Location an address resolves to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoLocation {
    /// Two letter continent code, e.g. `EU`.
    pub continent: String,
    /// ISO 3166 country code, e.g. `DE`.
    pub country: String,
    /// English city name.
    pub city: String,
}

#[derive(thiserror::Error, Debug)]
pub enum GeoError {
    #[error("not an ip address: {0}")]
    InvalidAddress(#[from] AddrParseError),
    #[error("address {0} not found in geolocation database")]
    NotFound(IpAddr),
    #[error("geolocation record for {ip} has no {field}")]
    Incomplete { ip: IpAddr, field: &'static str },
    #[error("geolocation database error: {0}")]
    Database(MaxMindDBError),
}

pub trait GeoLocator: Send + Sync {
    fn lookup(&self, ip: IpAddr) -> Result<GeoLocation, GeoError>;
}

/// Geolocation backed by a MaxMind City database (GeoLite2 or GeoIP2).
pub struct MaxMindGeoLocator {
    reader: Reader<Vec<u8>>,
}

impl MaxMindGeoLocator {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, GeoError> {
        let reader = Reader::open_readfile(path).map_err(GeoError::Database)?;
        debug!(database = %reader.metadata.database_type, "opened geolocation database");
        Ok(Self { reader })
    }
}

impl GeoLocator for MaxMindGeoLocator {
    fn lookup(&self, ip: IpAddr) -> Result<GeoLocation, GeoError> {
        let record: geoip2::City = self.reader.lookup(ip).map_err(|e| match e {
            MaxMindDBError::AddressNotFoundError(_) => GeoError::NotFound(ip),
            other => GeoError::Database(other),
        })?;

        location_from_city(ip, record)
    }
}

/// Continent code, country ISO code and English city name are all required.
fn location_from_city(ip: IpAddr, record: geoip2::City<'_>) -> Result<GeoLocation, GeoError> {
    let missing = |field| GeoError::Incomplete { ip, field };

    let continent = record.continent.and_then(|c| c.code).ok_or_else(|| missing("continent"))?;
    let country = record.country.and_then(|c| c.iso_code).ok_or_else(|| missing("country"))?;
    let city = record
        .city
        .and_then(|c| c.names)
        .and_then(|names| names.get("en").copied())
        .ok_or_else(|| missing("city"))?;

    Ok(GeoLocation {
        continent: continent.to_string(),
        country: country.to_string(),
        city: city.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const IP: &str = "203.0.113.9";

    fn city(json: &str) -> geoip2::City<'_> {
        serde_json::from_str(json).expect("valid city record")
    }

    #[test]
    fn complete_record_resolves() {
        let record = city(
            r#"{"continent":{"code":"EU"},"country":{"iso_code":"DE"},"city":{"names":{"en":"Frankfurt am Main","de":"Frankfurt"}}}"#,
        );
        let location = location_from_city(IP.parse().unwrap(), record).unwrap();
        assert_eq!(
            location,
            GeoLocation {
                continent: "EU".to_string(),
                country: "DE".to_string(),
                city: "Frankfurt am Main".to_string(),
            }
        );
    }

    #[test]
    fn record_without_city_is_incomplete() {
        let record = city(r#"{"continent":{"code":"EU"},"country":{"iso_code":"DE"}}"#);
        let err = location_from_city(IP.parse().unwrap(), record).unwrap_err();
        assert!(matches!(err, GeoError::Incomplete { field: "city", .. }), "{err}");
    }

    #[test]
    fn city_without_english_name_is_incomplete() {
        let record = city(r#"{"continent":{"code":"AS"},"country":{"iso_code":"JP"},"city":{"names":{"ja":"東京"}}}"#);
        let err = location_from_city(IP.parse().unwrap(), record).unwrap_err();
        assert!(matches!(err, GeoError::Incomplete { field: "city", .. }), "{err}");
    }

    #[test]
    fn missing_continent_or_country_is_incomplete() {
        let no_continent = city(r#"{"country":{"iso_code":"DE"},"city":{"names":{"en":"Berlin"}}}"#);
        assert!(matches!(
            location_from_city(IP.parse().unwrap(), no_continent),
            Err(GeoError::Incomplete { field: "continent", .. })
        ));

        let no_country = city(r#"{"continent":{"code":"EU"},"city":{"names":{"en":"Berlin"}}}"#);
        assert!(matches!(
            location_from_city(IP.parse().unwrap(), no_country),
            Err(GeoError::Incomplete { field: "country", .. })
        ));
    }
}
