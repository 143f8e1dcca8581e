use super::{
    Collection,
    Field,
    FieldKind,
    Filter,
    Group,
    GroupOrder,
    Pipeline,
    Predicate,
    StoreError,
    Value,
};
use crate::model::{
    DocId,
    Document,
    LobbyServer,
};
use clickhouse::Client;
use futures::future::BoxFuture;
use serde::{
    Deserialize,
    Serialize,
};
use std::sync::atomic::{
    AtomicU64,
    Ordering,
};

/// Collection stored in a ClickHouse `MergeTree` table.
///
/// Document ids are assigned by this process from a counter seeded with the
/// largest id already in the table.
pub struct ClickHouseCollection {
    client: Client,
    table: String,
    next_id: AtomicU64,
}

impl ClickHouseCollection {
    /// Creates the table if needed and seeds the id counter.
    pub async fn open(client: Client, table: impl Into<String>) -> Result<Self, StoreError> {
        let table = table.into();
        if table.is_empty() || !table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(StoreError::TableName(table));
        }

        client.query(&create_table_sql(&table)).execute().await?;

        let max_id = client
            .query(&format!("SELECT max(id) FROM {table}"))
            .fetch_one::<u64>()
            .await?;
        debug!(%table, max_id, "opened clickhouse collection");

        Ok(Self {
            client,
            table,
            next_id: AtomicU64::new(max_id + 1),
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

impl Collection for ClickHouseCollection {
    fn create_indexes<'a>(&'a self, fields: &'a [Field]) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            for field in fields {
                self.client.query(&index_sql(&self.table, *field)).execute().await?;
            }
            Ok(())
        })
    }

    fn insert_many(&self, servers: Vec<LobbyServer>) -> BoxFuture<'_, Result<u64, StoreError>> {
        Box::pin(async move {
            let count = servers.len() as u64;
            if count == 0 {
                return Ok(0);
            }

            let first_id = self.next_id.fetch_add(count, Ordering::SeqCst);
            let mut insert = self.client.insert(&self.table)?;
            for (id, server) in (first_id..).zip(servers) {
                insert.write(&ServerRow::new(id, server)).await?;
            }
            insert.end().await?;

            Ok(count)
        })
    }

    fn aggregate(&self, pipeline: Pipeline) -> BoxFuture<'_, Result<Vec<Group>, StoreError>> {
        Box::pin(async move {
            let (sql, binds) = aggregate_sql(&self.table, &pipeline);
            let mut query = self.client.query(&sql);
            for value in binds {
                query = query.bind(value);
            }
            let rows = query.fetch_all::<GroupRow>().await?;

            let kind = pipeline.group_by.kind();
            Ok(rows
                .into_iter()
                .map(|row| Group {
                    key: parse_key(kind, row.key),
                    first_id: row.first_id,
                })
                .collect())
        })
    }

    fn count(&self, filter: Filter) -> BoxFuture<'_, Result<u64, StoreError>> {
        Box::pin(async move {
            let (condition, binds) = render_filter(&filter);
            let mut query = self
                .client
                .query(&format!("SELECT count() FROM {} WHERE {condition}", self.table));
            for value in binds {
                query = query.bind(value);
            }
            Ok(query.fetch_one::<u64>().await?)
        })
    }

    fn find_by_ids(&self, ids: Vec<DocId>) -> BoxFuture<'_, Result<Vec<Document>, StoreError>> {
        Box::pin(async move {
            if ids.is_empty() {
                return Ok(Vec::new());
            }
            let rows = self
                .client
                .query(&format!("SELECT ?fields FROM {} WHERE has(?, id)", self.table))
                .bind(ids)
                .fetch_all::<ServerRow>()
                .await?;
            Ok(rows.into_iter().map(ServerRow::into_document).collect())
        })
    }

    fn delete_many(&self, filter: Filter) -> BoxFuture<'_, Result<u64, StoreError>> {
        Box::pin(async move {
            let matched = self.count(filter.clone()).await?;
            if matched == 0 {
                return Ok(0);
            }

            let (condition, binds) = render_filter(&filter);
            let mut query = self
                .client
                .query(&format!("DELETE FROM {} WHERE {condition}", self.table));
            for value in binds {
                query = query.bind(value);
            }
            query.execute().await?;

            Ok(matched)
        })
    }
}

fn create_table_sql(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            id UInt64,
            row_id String,
            address String,
            port UInt16,
            host String,
            steam_clan_id String,
            name String,
            region String,
            continent String,
            area String,
            city String,
            platform Int32,
            platform_name String,
            game_mode String,
            intent String,
            season String,
            version Int64,
            tags String,
            tag_names Array(String),
            max_connections Int32,
            connected Int32,
            pvp_enabled Bool,
            has_password Bool,
            mod_enabled Bool,
            is_dedicated Bool,
            client_hosted Bool,
            allow_new_players Bool,
            server_paused Bool,
            friend_only Bool,
            clan_only Bool,
            lan_only Bool,
            session String,
            created_at Int64
        ) ENGINE = MergeTree ORDER BY (created_at, id)"
    )
}

fn index_sql(table: &str, field: Field) -> String {
    let kind = match field.kind() {
        FieldKind::Int => "minmax",
        _ => "bloom_filter",
    };
    format!("ALTER TABLE {table} ADD INDEX IF NOT EXISTS idx_{field} {field} TYPE {kind} GRANULARITY 4")
}

/// Renders a filter as a `WHERE` condition with `?` placeholders.
fn render_filter(filter: &Filter) -> (String, Vec<Value>) {
    if filter.is_empty() {
        return ("1".to_string(), Vec::new());
    }

    let mut binds = Vec::new();
    let conditions = filter
        .predicates()
        .iter()
        .map(|predicate| {
            let field = predicate.field();
            let list = field.kind() == FieldKind::List;
            match predicate {
                Predicate::Eq(_, value) => {
                    binds.push(value.clone());
                    match (list, value) {
                        (true, Value::Str(_)) => format!("has({field}, ?)"),
                        _ => format!("{field} = ?"),
                    }
                }
                Predicate::Regex {
                    pattern,
                    case_insensitive,
                    ..
                } => {
                    let pattern = if *case_insensitive {
                        format!("(?i){pattern}")
                    } else {
                        pattern.clone()
                    };
                    binds.push(Value::Str(pattern));
                    if list {
                        format!("arrayExists(x -> match(x, ?), {field})")
                    } else {
                        format!("match({field}, ?)")
                    }
                }
                Predicate::AnyOf(_, values) => {
                    binds.push(Value::List(values.clone()));
                    if list {
                        format!("hasAny({field}, ?)")
                    } else {
                        format!("has(?, {field})")
                    }
                }
                Predicate::Lte(_, bound) => {
                    binds.push(Value::Int(*bound));
                    format!("{field} <= ?")
                }
            }
        })
        .collect::<Vec<_>>();

    (conditions.join(" AND "), binds)
}

fn aggregate_sql(table: &str, pipeline: &Pipeline) -> (String, Vec<Value>) {
    let (condition, binds) = render_filter(&pipeline.filter);
    let field = pipeline.group_by;
    let key = match field.kind() {
        FieldKind::List => format!("arrayStringConcat({field}, ',')"),
        _ => format!("toString({field})"),
    };
    let order = match pipeline.order {
        GroupOrder::KeyDescending => format!("{field} DESC"),
        GroupOrder::FirstInserted => "first_id ASC".to_string(),
    };

    let mut sql = format!(
        "SELECT {key} AS key, min(id) AS first_id FROM {table} WHERE {condition} GROUP BY {field} ORDER BY {order}"
    );
    match pipeline.limit {
        Some(limit) => sql.push_str(&format!(" LIMIT {limit} OFFSET {}", pipeline.skip)),
        None if pipeline.skip > 0 => sql.push_str(&format!(" OFFSET {} ROWS", pipeline.skip)),
        None => {}
    }

    (sql, binds)
}

fn parse_key(kind: FieldKind, key: String) -> Value {
    match kind {
        FieldKind::Str => Value::Str(key),
        FieldKind::Int => key.parse().map(Value::Int).unwrap_or(Value::Str(key)),
        FieldKind::Bool => Value::Bool(key == "true"),
        FieldKind::List => Value::List(crate::model::parse_tags(&key)),
    }
}

#[derive(Debug, Deserialize, clickhouse::Row)]
struct GroupRow {
    key: String,
    first_id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, clickhouse::Row)]
struct ServerRow {
    id: u64,
    row_id: String,
    address: String,
    port: u16,
    host: String,
    steam_clan_id: String,
    name: String,
    region: String,
    continent: String,
    area: String,
    city: String,
    platform: i32,
    platform_name: String,
    game_mode: String,
    intent: String,
    season: String,
    version: i64,
    tags: String,
    tag_names: Vec<String>,
    max_connections: i32,
    connected: i32,
    pvp_enabled: bool,
    has_password: bool,
    mod_enabled: bool,
    is_dedicated: bool,
    client_hosted: bool,
    allow_new_players: bool,
    server_paused: bool,
    friend_only: bool,
    clan_only: bool,
    lan_only: bool,
    session: String,
    created_at: i64,
}

impl ServerRow {
    fn new(id: DocId, s: LobbyServer) -> Self {
        Self {
            id,
            row_id: s.row_id,
            address: s.address,
            port: s.port,
            host: s.host,
            steam_clan_id: s.steam_clan_id,
            name: s.name,
            region: s.region,
            continent: s.continent,
            area: s.area,
            city: s.city,
            platform: s.platform,
            platform_name: s.platform_name,
            game_mode: s.game_mode,
            intent: s.intent,
            season: s.season,
            version: s.version,
            tags: s.tags,
            tag_names: s.tag_names,
            max_connections: s.max_connections,
            connected: s.connected,
            pvp_enabled: s.pvp_enabled,
            has_password: s.has_password,
            mod_enabled: s.mod_enabled,
            is_dedicated: s.is_dedicated,
            client_hosted: s.client_hosted,
            allow_new_players: s.allow_new_players,
            server_paused: s.server_paused,
            friend_only: s.friend_only,
            clan_only: s.clan_only,
            lan_only: s.lan_only,
            session: s.session,
            created_at: s.created_at,
        }
    }

    fn into_document(self) -> Document {
        Document {
            id: self.id,
            server: LobbyServer {
                row_id: self.row_id,
                address: self.address,
                port: self.port,
                host: self.host,
                steam_clan_id: self.steam_clan_id,
                name: self.name,
                region: self.region,
                continent: self.continent,
                area: self.area,
                city: self.city,
                platform: self.platform,
                platform_name: self.platform_name,
                game_mode: self.game_mode,
                intent: self.intent,
                season: self.season,
                version: self.version,
                tags: self.tags,
                tag_names: self.tag_names,
                max_connections: self.max_connections,
                connected: self.connected,
                pvp_enabled: self.pvp_enabled,
                has_password: self.has_password,
                mod_enabled: self.mod_enabled,
                is_dedicated: self.is_dedicated,
                client_hosted: self.client_hosted,
                allow_new_players: self.allow_new_players,
                server_paused: self.server_paused,
                friend_only: self.friend_only,
                clan_only: self.clan_only,
                lan_only: self.lan_only,
                session: self.session,
                created_at: self.created_at,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_filter_matches_everything() {
        assert_eq!(render_filter(&Filter::new()), ("1".to_string(), vec![]));
    }

    #[test]
    fn renders_conjunction_with_binds_in_order() {
        let filter = Filter::new()
            .regex(Field::Name, "camp")
            .eq(Field::Area, "US")
            .eq(Field::PvpEnabled, true)
            .any_of(Field::TagNames, vec!["pvp".to_string(), "english".to_string()])
            .eq(Field::CreatedAt, 42_i64);

        let (sql, binds) = render_filter(&filter);
        assert_eq!(
            sql,
            "match(name, ?) AND area = ? AND pvp_enabled = ? AND hasAny(tag_names, ?) AND created_at = ?"
        );
        assert_eq!(
            binds,
            vec![
                Value::from("(?i)camp"),
                Value::from("US"),
                Value::Bool(true),
                Value::List(vec!["pvp".to_string(), "english".to_string()]),
                Value::Int(42),
            ]
        );
    }

    #[test]
    fn list_fields_use_array_functions() {
        let (sql, _) = render_filter(
            &Filter::new()
                .eq(Field::TagNames, "mods")
                .regex(Field::TagNames, "^eng"),
        );
        assert_eq!(sql, "has(tag_names, ?) AND arrayExists(x -> match(x, ?), tag_names)");

        let (sql, _) = render_filter(&Filter::new().any_of(Field::Area, vec!["US".to_string()]));
        assert_eq!(sql, "has(?, area)");
    }

    #[test]
    fn expiry_renders_inclusive_bound() {
        let (sql, binds) = render_filter(&Filter::new().lte(Field::CreatedAt, 1_000));
        assert_eq!(sql, "created_at <= ?");
        assert_eq!(binds, vec![Value::Int(1_000)]);
    }

    #[test]
    fn aggregate_for_latest_snapshot() {
        let pipeline = Pipeline::group_by(Field::CreatedAt)
            .sort(GroupOrder::KeyDescending)
            .limit(1);
        let (sql, binds) = aggregate_sql("lobby_servers", &pipeline);
        assert_eq!(
            sql,
            "SELECT toString(created_at) AS key, min(id) AS first_id FROM lobby_servers WHERE 1 \
             GROUP BY created_at ORDER BY created_at DESC LIMIT 1 OFFSET 0"
        );
        assert!(binds.is_empty());
    }

    #[test]
    fn aggregate_page_by_row_id() {
        let pipeline = Pipeline::group_by(Field::RowId)
            .matching(Filter::new().eq(Field::CreatedAt, 7_i64))
            .skip(20)
            .limit(10);
        let (sql, binds) = aggregate_sql("servers", &pipeline);
        assert_eq!(
            sql,
            "SELECT toString(row_id) AS key, min(id) AS first_id FROM servers WHERE created_at = ? \
             GROUP BY row_id ORDER BY first_id ASC LIMIT 10 OFFSET 20"
        );
        assert_eq!(binds, vec![Value::Int(7)]);
    }

    #[test]
    fn keys_convert_back_by_field_kind() {
        assert_eq!(parse_key(FieldKind::Int, "1700".to_string()), Value::Int(1700));
        assert_eq!(parse_key(FieldKind::Bool, "true".to_string()), Value::Bool(true));
        assert_eq!(parse_key(FieldKind::Str, "KU_1".to_string()), Value::from("KU_1"));
    }

    #[test]
    fn indexes_use_minmax_for_timestamps() {
        assert_eq!(
            index_sql("t", Field::CreatedAt),
            "ALTER TABLE t ADD INDEX IF NOT EXISTS idx_created_at created_at TYPE minmax GRANULARITY 4"
        );
        assert_eq!(
            index_sql("t", Field::TagNames),
            "ALTER TABLE t ADD INDEX IF NOT EXISTS idx_tag_names tag_names TYPE bloom_filter GRANULARITY 4"
        );
    }

    #[tokio::test]
    async fn rejects_unsafe_table_names() {
        let result = ClickHouseCollection::open(Client::default(), "servers; DROP TABLE x").await;
        assert!(matches!(result, Err(StoreError::TableName(_))));
    }
}
