use crate::{
    server::{
        ListResponse,
        RegionsResponse,
    },
    LobbyApiError,
    LobbyProvider,
    Platform,
    Region,
    Server,
    ServerDetails,
};
use futures::future::BoxFuture;
use reqwest::Client as HttpClient;
use serde::Serialize;
use std::time::Duration;
use url::Url;

pub const DEFAULT_LOBBY_CDN: &str = "https://lobby-v2-cdn.klei.com/";
pub const DEFAULT_READ_URL: &str = "https://lobby-v2-{region}.klei.com/lobby/read";
const GAME_ID: &str = "DontStarveTogether";

/// HTTP client for the public lobby listings and the regional read endpoint.
#[derive(Debug, Clone)]
pub struct LobbyClient {
    http: HttpClient,
    cdn_url: Url,
    read_url: String,
    token: Option<String>,
}

#[derive(Serialize)]
struct ReadRequest<'a> {
    #[serde(rename = "__gameId")]
    game_id: &'a str,
    #[serde(rename = "__token")]
    token: &'a str,
    query: ReadQuery<'a>,
}

#[derive(Serialize)]
struct ReadQuery<'a> {
    #[serde(rename = "__rowId")]
    row_id: &'a str,
}

impl LobbyClient {
    /// `read_url` may contain a `{region}` placeholder that is substituted per request.
    pub fn new(
        mut cdn_url: Url,
        read_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, LobbyApiError> {
        // `Url::join` replaces the last segment unless the base ends in a slash
        if !cdn_url.path().ends_with('/') {
            let path = format!("{}/", cdn_url.path());
            cdn_url.set_path(&path);
        }

        let http = HttpClient::builder().timeout(timeout).gzip(true).build()?;

        Ok(Self {
            http,
            cdn_url,
            read_url: read_url.into(),
            token: token.filter(|t| !t.is_empty()),
        })
    }

    pub fn regions_url(&self) -> Result<Url, LobbyApiError> {
        Ok(self.cdn_url.join("regioncapabilities-v2.json")?)
    }

    pub fn listing_url(&self, region: &str, platform: Platform) -> Result<Url, LobbyApiError> {
        Ok(self.cdn_url.join(&format!("{region}-{platform}.json.gz"))?)
    }

    pub fn read_url(&self, region: &str) -> Result<Url, LobbyApiError> {
        Ok(Url::parse(&self.read_url.replace("{region}", region))?)
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn capable_regions(&self) -> Result<Vec<Region>, LobbyApiError> {
        let url = self.regions_url()?;
        let response: RegionsResponse = self.http.get(url).send().await?.error_for_status()?.json().await?;
        debug!(regions = response.regions.len(), "fetched lobby regions");
        Ok(response.regions)
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn lobby_servers(&self, region: &str, platform: Platform) -> Result<Vec<Server>, LobbyApiError> {
        let url = self.listing_url(region, platform)?;
        let response: ListResponse<Server> = self.http.get(url).send().await?.error_for_status()?.json().await?;
        debug!(servers = response.list.len(), "fetched lobby listing");
        Ok(response.list)
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn read_server(&self, region: &str, row_id: &str) -> Result<ServerDetails, LobbyApiError> {
        let token = self.token.as_deref().ok_or(LobbyApiError::MissingToken)?;
        let request = ReadRequest {
            game_id: GAME_ID,
            token,
            query: ReadQuery { row_id },
        };

        let response: ListResponse<ServerDetails> = self
            .http
            .post(self.read_url(region)?)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response
            .list
            .into_iter()
            .next()
            .ok_or_else(|| LobbyApiError::NotFound {
                region: region.to_string(),
                row_id: row_id.to_string(),
            })
    }
}

impl LobbyProvider for LobbyClient {
    fn regions(&self) -> BoxFuture<'_, Result<Vec<Region>, LobbyApiError>> {
        Box::pin(self.capable_regions())
    }

    fn servers<'a>(
        &'a self,
        region: &'a str,
        platform: Platform,
    ) -> BoxFuture<'a, Result<Vec<Server>, LobbyApiError>> {
        Box::pin(self.lobby_servers(region, platform))
    }

    fn server_details<'a>(
        &'a self,
        region: &'a str,
        row_id: &'a str,
    ) -> BoxFuture<'a, Result<ServerDetails, LobbyApiError>> {
        Box::pin(self.read_server(region, row_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(cdn: &str) -> LobbyClient {
        LobbyClient::new(
            Url::parse(cdn).unwrap(),
            DEFAULT_READ_URL,
            None,
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn builds_listing_urls() {
        let client = client(DEFAULT_LOBBY_CDN);
        assert_eq!(
            client.listing_url("us-east-1", Platform::Steam).unwrap().as_str(),
            "https://lobby-v2-cdn.klei.com/us-east-1-Steam.json.gz"
        );
        assert_eq!(
            client.regions_url().unwrap().as_str(),
            "https://lobby-v2-cdn.klei.com/regioncapabilities-v2.json"
        );
    }

    #[test]
    fn cdn_path_without_trailing_slash_is_kept() {
        let client = client("http://localhost:8080/mirror");
        assert_eq!(
            client.listing_url("ap-east-1", Platform::Rail).unwrap().as_str(),
            "http://localhost:8080/mirror/ap-east-1-Rail.json.gz"
        );
    }

    #[test]
    fn read_url_substitutes_region() {
        let client = client(DEFAULT_LOBBY_CDN);
        assert_eq!(
            client.read_url("eu-central-1").unwrap().as_str(),
            "https://lobby-v2-eu-central-1.klei.com/lobby/read"
        );
    }

    #[tokio::test]
    async fn reading_details_without_token_fails() {
        let client = client(DEFAULT_LOBBY_CDN);
        let result = client.read_server("us-east-1", "KU_abc").await;
        assert!(matches!(result, Err(LobbyApiError::MissingToken)));
    }
}
