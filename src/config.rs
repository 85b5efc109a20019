use std::path::PathBuf;

use serde::Deserialize;

use crate::aggregate::SeriesOrder;
use crate::money::Currency;

/// Application settings, read from the same figment as Rocket's own
/// (`Rocket.toml`, then `ROCKET_*` environment variables).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub default_currency: Currency,
    pub max_sessions: i64,
    pub enforce_category_kind: bool,
    pub series_order: SeriesOrder,
    pub recent_points: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_path: PathBuf::from("data").join("finboard.sqlite"),
            default_currency: Currency::Brl,
            max_sessions: 5,
            enforce_category_kind: true,
            series_order: SeriesOrder::FirstSeen,
            recent_points: 7,
        }
    }
}
