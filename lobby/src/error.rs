#[derive(thiserror::Error, Debug)]
pub enum LobbyApiError {
    #[error("lobby request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid lobby url: {0}")]
    Url(#[from] url::ParseError),
    #[error("reading server details requires a lobby token")]
    MissingToken,
    #[error("server {row_id} not found in region {region}")]
    NotFound { region: String, row_id: String },
}
