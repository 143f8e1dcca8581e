use comfy_table::{
    presets,
    Attribute,
    Cell,
    Color,
    ContentArrangement,
    Table,
};
use lobby_tracker_collector::{
    DetailResult,
    LobbyServer,
    PageResult,
    ServerView,
};

const SERVER_HEADER: [&str; 9] = [
    "Row id", "Name", "Region", "Area", "Platform", "Mode", "Players", "Flags", "Address",
];

fn server_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(SERVER_HEADER.iter().map(|h| Cell::new(h).add_attribute(Attribute::Bold).fg(Color::Cyan)));
    table
}

fn flags(pvp: bool, password: bool, mods: bool) -> String {
    [(pvp, "pvp"), (password, "password"), (mods, "mods")]
        .iter()
        .filter(|(set, _)| *set)
        .map(|(_, name)| *name)
        .collect::<Vec<_>>()
        .join(",")
}

fn players_cell(online: i32, max: i32) -> Cell {
    let color = if max > 0 && online >= max {
        Color::Red
    } else if online > 0 {
        Color::Green
    } else {
        Color::Reset
    };
    Cell::new(format!("{online}/{max}")).fg(color)
}

fn view_row(server: &ServerView) -> Vec<Cell> {
    vec![
        Cell::new(&server.row_id),
        Cell::new(&server.name),
        Cell::new(&server.region),
        Cell::new(&server.area),
        Cell::new(&server.platform_name),
        Cell::new(&server.game_mode),
        players_cell(server.online, server.max_players),
        Cell::new(flags(server.pvp, server.has_password, server.mod_enabled)),
        Cell::new(format!("{}:{}", server.address, server.port)),
    ]
}

pub fn page(page: &PageResult<ServerView>, number: i64) -> String {
    let mut table = server_table();
    for server in &page.list {
        table.add_row(view_row(server));
    }
    format!(
        "{table}\npage {number}: {} servers shown, {} listings in snapshot",
        page.list.len(),
        page.total
    )
}

pub fn collected(servers: &[LobbyServer]) -> String {
    let mut table = server_table();
    for server in servers {
        table.add_row(vec![
            Cell::new(&server.row_id),
            Cell::new(&server.name),
            Cell::new(&server.region),
            Cell::new(&server.area),
            Cell::new(&server.platform_name),
            Cell::new(&server.game_mode),
            players_cell(server.connected, server.max_connections),
            Cell::new(flags(server.pvp_enabled, server.has_password, server.mod_enabled)),
            Cell::new(format!("{}:{}", server.address, server.port)),
        ]);
    }
    format!("{table}\n{} servers collected", servers.len())
}

pub fn details(detail: &DetailResult) -> String {
    let mut table = server_table();
    table.add_row(view_row(&detail.server));

    let mut extra = Table::new();
    extra
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Field").add_attribute(Attribute::Bold),
            Cell::new("Value").add_attribute(Attribute::Bold),
        ]);
    for (key, value) in &detail.details {
        let value = match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        extra.add_row(vec![Cell::new(key), Cell::new(value)]);
    }

    format!("{table}\n{extra}")
}
