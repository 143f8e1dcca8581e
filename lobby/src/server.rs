use serde::{
    Deserialize,
    Serialize,
};

/// A region the lobby accepts listing queries for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    #[serde(rename = "Region")]
    pub region: String,
}

impl Region {
    pub fn new(region: impl Into<String>) -> Self {
        Self { region: region.into() }
    }
}

/// One server entry as published by the lobby.
///
/// Field names on the wire are the lobby's own; everything except the row id
/// and address is optional there.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Server {
    #[serde(rename = "__rowId")]
    pub row_id: String,
    #[serde(rename = "__addr")]
    pub address: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub host: String,
    #[serde(default, rename = "steamclanid")]
    pub steam_clan_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "mode")]
    pub game_mode: String,
    #[serde(default)]
    pub intent: String,
    #[serde(default)]
    pub season: String,
    #[serde(default, rename = "v")]
    pub version: i64,
    /// Comma separated tag list.
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub platform: i32,
    #[serde(default, rename = "maxconnections")]
    pub max_connections: i32,
    #[serde(default)]
    pub connected: i32,
    #[serde(default, rename = "pvp")]
    pub pvp_enabled: bool,
    #[serde(default, rename = "password")]
    pub has_password: bool,
    #[serde(default, rename = "mods")]
    pub mod_enabled: bool,
    #[serde(default, rename = "dedicated")]
    pub is_dedicated: bool,
    #[serde(default, rename = "clienthosted")]
    pub client_hosted: bool,
    #[serde(default, rename = "allownewplayers")]
    pub allow_new_players: bool,
    #[serde(default, rename = "serverpaused")]
    pub server_paused: bool,
    #[serde(default, rename = "fo")]
    pub friend_only: bool,
    #[serde(default, rename = "clanonly")]
    pub clan_only: bool,
    #[serde(default, rename = "lanonly")]
    pub lan_only: bool,
    #[serde(default)]
    pub session: String,
}

/// A server read back from the regional lobby together with everything the
/// listing does not carry (players, world generation, mod info ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerDetails {
    #[serde(flatten)]
    pub server: Server,
    /// Remaining fields, kept as the lobby sent them.
    #[serde(flatten)]
    pub details: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RegionsResponse {
    #[serde(rename = "LobbyRegions", default)]
    pub(crate) regions: Vec<Region>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListResponse<T> {
    #[serde(rename = "GET", default = "Vec::new")]
    pub(crate) list: Vec<T>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const LISTING: &str = r#"{
        "GET": [{
            "__addr": "203.0.113.7",
            "__rowId": "KU_abc123",
            "host": "KU_host",
            "clanonly": false,
            "platform": 1,
            "mods": true,
            "name": "Wilson's Camp",
            "pvp": false,
            "session": "8A3F",
            "fo": false,
            "password": true,
            "guid": "1234",
            "maxconnections": 6,
            "dedicated": true,
            "clienthosted": false,
            "connected": 2,
            "mode": "survival",
            "port": 10999,
            "v": 581,
            "tags": "cooperative,mods",
            "season": "autumn",
            "lanonly": false,
            "intent": "cooperative",
            "allownewplayers": true,
            "serverpaused": false
        }]
    }"#;

    #[test]
    fn parses_listing() {
        let response: ListResponse<Server> = serde_json::from_str(LISTING).unwrap();
        assert_eq!(response.list.len(), 1);

        let server = &response.list[0];
        assert_eq!(server.row_id, "KU_abc123");
        assert_eq!(server.address, "203.0.113.7");
        assert_eq!(server.port, 10999);
        assert_eq!(server.game_mode, "survival");
        assert_eq!(server.version, 581);
        assert_eq!(server.tags, "cooperative,mods");
        assert_eq!(server.max_connections, 6);
        assert_eq!(server.connected, 2);
        assert!(server.mod_enabled);
        assert!(server.has_password);
        assert!(server.is_dedicated);
        assert!(server.allow_new_players);
        assert!(!server.pvp_enabled);
    }

    #[test]
    fn missing_list_is_empty() {
        let response: ListResponse<Server> = serde_json::from_str("{}").unwrap();
        assert!(response.list.is_empty());
    }

    #[test]
    fn parses_regions() {
        let response: RegionsResponse =
            serde_json::from_str(r#"{"LobbyRegions":[{"Region":"us-east-1"},{"Region":"ap-east-1"}]}"#).unwrap();
        assert_eq!(response.regions, vec![Region::new("us-east-1"), Region::new("ap-east-1")]);
    }

    #[test]
    fn details_keep_unknown_fields() {
        let raw = r#"{
            "__addr": "203.0.113.7",
            "__rowId": "KU_abc123",
            "name": "Wilson's Camp",
            "players": "return {}",
            "tick": 15
        }"#;
        let details: ServerDetails = serde_json::from_str(raw).unwrap();
        assert_eq!(details.server.row_id, "KU_abc123");
        assert_eq!(details.server.name, "Wilson's Camp");
        assert_eq!(details.details.get("tick"), Some(&serde_json::json!(15)));
        assert_eq!(details.details.get("players"), Some(&serde_json::json!("return {}")));
        assert!(!details.details.contains_key("__rowId"));
    }
}
