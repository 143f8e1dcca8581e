//! Directories the tracker reads its config file from and keeps its GeoIP
//! database in.
//!
//! `LOBBY_TRACKER_DATA` and `LOBBY_TRACKER_CONFIG` replace the platform
//! directories (`~/.local/share/lobby-tracker` and `~/.config/lobby-tracker`
//! on Linux). Without a home directory both fall back to `./.data` and
//! `./.config`.

use directories::ProjectDirs;
use serde::Deserialize;
use std::{
    env,
    path::PathBuf,
};

/// Resolved directories, filled in as defaults before any config source loads.
#[derive(Clone, Debug, Deserialize, Default, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub config_dir: PathBuf,
}

lazy_static::lazy_static! {
    /// Prefix of every environment variable the tracker reads.
    pub(crate) static ref ENV_PREFIX: String = "LOBBY_TRACKER".to_string();
    static ref PROJECT_DIRS: Option<ProjectDirs> = ProjectDirs::from("com", "klei-lobby", "lobby-tracker");
}

/// `LOBBY_TRACKER_<kind>`, ignored when empty.
fn dir_override(kind: &str) -> Option<PathBuf> {
    env::var_os(format!("{}_{kind}", ENV_PREFIX.as_str()))
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

pub fn get_data_dir() -> PathBuf {
    dir_override("DATA")
        .or_else(|| PROJECT_DIRS.as_ref().map(|dirs| dirs.data_local_dir().to_path_buf()))
        .unwrap_or_else(|| PathBuf::from(".").join(".data"))
}

pub fn get_config_dir() -> PathBuf {
    dir_override("CONFIG")
        .or_else(|| PROJECT_DIRS.as_ref().map(|dirs| dirs.config_local_dir().to_path_buf()))
        .unwrap_or_else(|| PathBuf::from(".").join(".config"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn env_override_wins_unless_empty() {
        env::set_var("LOBBY_TRACKER_SCRATCH", "/srv/lobby");
        assert_eq!(dir_override("SCRATCH"), Some(PathBuf::from("/srv/lobby")));

        env::set_var("LOBBY_TRACKER_SCRATCH", "");
        assert_eq!(dir_override("SCRATCH"), None);
        env::remove_var("LOBBY_TRACKER_SCRATCH");
    }
}
