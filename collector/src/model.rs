use crate::geo::GeoLocation;
use lobby_tracker_lobby::{
    platform_display_name,
    Server,
};
use serde::{
    Deserialize,
    Serialize,
};

/// A lobby server observed during one collection run, enriched and ready to be stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LobbyServer {
    pub row_id: String,
    pub address: String,
    pub port: u16,
    pub host: String,
    pub steam_clan_id: String,
    pub name: String,

    // geo information
    pub region: String,
    pub continent: String,
    pub area: String,
    pub city: String,

    pub platform: i32,
    pub platform_name: String,
    pub game_mode: String,
    pub intent: String,
    pub season: String,
    pub version: i64,
    pub tags: String,
    pub tag_names: Vec<String>,

    pub max_connections: i32,
    pub connected: i32,
    pub pvp_enabled: bool,
    pub has_password: bool,
    pub mod_enabled: bool,
    pub is_dedicated: bool,
    pub client_hosted: bool,
    pub allow_new_players: bool,
    pub server_paused: bool,
    pub friend_only: bool,
    pub clan_only: bool,
    pub lan_only: bool,
    pub session: String,

    /// Snapshot timestamp in epoch milliseconds.
    pub created_at: i64,
}

impl LobbyServer {
    pub fn new(server: Server, region: &str, geo: GeoLocation, created_at: i64) -> Self {
        let tag_names = parse_tags(&server.tags);
        let platform_name = platform_display_name(region, server.platform).to_string();

        Self {
            row_id: server.row_id,
            address: server.address,
            port: server.port,
            host: server.host,
            steam_clan_id: server.steam_clan_id,
            name: server.name,
            region: region.to_string(),
            continent: geo.continent,
            area: geo.country,
            city: geo.city,
            platform: server.platform,
            platform_name,
            game_mode: server.game_mode,
            intent: server.intent,
            season: server.season,
            version: server.version,
            tags: server.tags,
            tag_names,
            max_connections: server.max_connections,
            connected: server.connected,
            pvp_enabled: server.pvp_enabled,
            has_password: server.has_password,
            mod_enabled: server.mod_enabled,
            is_dedicated: server.is_dedicated,
            client_hosted: server.client_hosted,
            allow_new_players: server.allow_new_players,
            server_paused: server.server_paused,
            friend_only: server.friend_only,
            clan_only: server.clan_only,
            lan_only: server.lan_only,
            session: server.session,
            created_at,
        }
    }
}

/// Splits the lobby's comma separated tag string. An empty string has no tags.
pub fn parse_tags(tags: &str) -> Vec<String> {
    if tags.is_empty() {
        return Vec::new();
    }
    tags.split(',').map(str::to_string).collect()
}

/// Internal sequence id of a stored document, increasing in insertion order.
pub type DocId = u64;

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: DocId,
    pub server: LobbyServer,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageResult<T> {
    pub total: u64,
    pub list: Vec<T>,
}

impl<T> PageResult<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PageResult<U> {
        PageResult {
            total: self.total,
            list: self.list.into_iter().map(f).collect(),
        }
    }
}

/// Server list query as accepted from clients.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Case insensitive regular expression matched against the server name.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub area: String,
    #[serde(default)]
    pub intent: String,
    #[serde(default)]
    pub game_mode: String,
    #[serde(default)]
    pub pvp_enabled: Option<bool>,
    #[serde(default)]
    pub has_password: Option<bool>,
    #[serde(default)]
    pub mod_enabled: Option<bool>,
    /// Comma separated list, a server matches when it carries any of them.
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub page: i64,
    #[serde(default)]
    pub size: i64,
    #[serde(default)]
    pub sort: String,
}

/// Server as presented to clients.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerView {
    pub row_id: String,
    pub steam_clan_id: String,
    pub address: String,
    pub port: u16,
    pub host: String,
    pub region: String,
    pub continent: String,
    pub area: String,
    pub city: String,
    pub platform_name: String,
    pub platform: i32,
    pub version: i64,
    pub name: String,
    pub game_mode: String,
    pub intent: String,
    pub season: String,
    pub tags: Vec<String>,
    pub max_players: i32,
    pub online: i32,
    #[serde(rename = "mod")]
    pub mod_enabled: bool,
    pub pvp: bool,
    pub has_password: bool,
    pub is_dedicated: bool,
    pub client_hosted: bool,
    pub allow_new_players: bool,
    pub server_paused: bool,
    pub friend_only: bool,
    pub clan_only: bool,
}

impl From<LobbyServer> for ServerView {
    fn from(server: LobbyServer) -> Self {
        Self {
            row_id: server.row_id,
            steam_clan_id: server.steam_clan_id,
            address: server.address,
            port: server.port,
            host: server.host,
            region: server.region,
            continent: server.continent,
            area: server.area,
            city: server.city,
            platform_name: server.platform_name,
            platform: server.platform,
            version: server.version,
            name: server.name,
            game_mode: server.game_mode,
            intent: server.intent,
            season: server.season,
            tags: server.tag_names,
            max_players: server.max_connections,
            online: server.connected,
            mod_enabled: server.mod_enabled,
            pvp: server.pvp_enabled,
            has_password: server.has_password,
            is_dedicated: server.is_dedicated,
            client_hosted: server.client_hosted,
            allow_new_players: server.allow_new_players,
            server_paused: server.server_paused,
            friend_only: server.friend_only,
            clan_only: server.clan_only,
        }
    }
}

/// A single server read from the lobby along with its opaque detail fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailResult {
    #[serde(flatten)]
    pub server: ServerView,
    pub details: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn tags_are_split_on_commas() {
        assert_eq!(parse_tags("cooperative,mods,english"), ["cooperative", "mods", "english"]);
        assert_eq!(parse_tags("single"), ["single"]);
        assert!(parse_tags("").is_empty());
    }

    #[test]
    fn builds_enriched_server() {
        let server = Server {
            row_id: "KU_1".to_string(),
            address: "203.0.113.7".to_string(),
            name: "Camp".to_string(),
            platform: 4,
            tags: "a,b".to_string(),
            ..Server::default()
        };
        let geo = GeoLocation {
            continent: "AS".to_string(),
            country: "CN".to_string(),
            city: "Shanghai".to_string(),
        };

        let enriched = LobbyServer::new(server, "ap-east-1", geo, 1_700_000_000_000);
        assert_eq!(enriched.region, "ap-east-1");
        assert_eq!(enriched.platform_name, "WeGame");
        assert_eq!(enriched.area, "CN");
        assert_eq!(enriched.continent, "AS");
        assert_eq!(enriched.city, "Shanghai");
        assert_eq!(enriched.tag_names, ["a", "b"]);
        assert_eq!(enriched.created_at, 1_700_000_000_000);
    }

    #[test]
    fn view_renames_capacity_fields() {
        let server = LobbyServer {
            max_connections: 6,
            connected: 3,
            mod_enabled: true,
            tag_names: vec!["x".to_string()],
            ..LobbyServer::default()
        };
        let view = ServerView::from(server);
        assert_eq!(view.max_players, 6);
        assert_eq!(view.online, 3);
        assert!(view.mod_enabled);
        assert_eq!(view.tags, ["x"]);

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["mod"], serde_json::json!(true));
    }
}
