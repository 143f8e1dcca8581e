use strum::{
    Display,
    EnumIter,
    EnumString,
};

/// Region that hosts the WeGame (Rail) lobby.
pub const RAIL_REGION: &str = "ap-east-1";

/// Platforms the lobby publishes separate listings for.
///
/// The numeric value is the code the lobby puts into the `platform` field of a
/// server, the display string is the segment used in listing URLs.
#[derive(Debug, Clone, Copy, Display, EnumIter, EnumString, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Platform {
    Steam = 1,
    PSN = 2,
    Rail = 4,
    XBone = 16,
    Switch = 32,
}

impl Platform {
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Platform::Steam),
            2 => Some(Platform::PSN),
            4 => Some(Platform::Rail),
            16 => Some(Platform::XBone),
            32 => Some(Platform::Switch),
            _ => None,
        }
    }
}

/// Human readable label for a platform code as seen from `region`.
///
/// Unknown codes and combinations the lobby never serves yield an empty label.
pub fn platform_display_name(region: &str, code: i32) -> &'static str {
    match Platform::from_code(code) {
        Some(Platform::Steam) => "Steam",
        Some(Platform::PSN) => "PlayStation",
        Some(Platform::XBone) => "Xbox",
        Some(Platform::Switch) => "Switch",
        Some(Platform::Rail) if region == RAIL_REGION => "WeGame",
        Some(Platform::Rail) | None => "",
    }
}
