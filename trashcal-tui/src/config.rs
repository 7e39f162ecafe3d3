use std::{env, fs};

use anyhow::{Context, Result};
use trashcal_core::TownRegistry;

/// Origin that replaces every town's configured base URL.
pub(crate) const API_BASE_VAR: &str = "TRASHCAL_API_BASE_URL";
/// Path of a registry document replacing the bundled one.
pub(crate) const TOWNS_FILE_VAR: &str = "TRASHCAL_TOWNS_FILE";
/// Slug of a town to open on startup.
pub(crate) const TOWN_VAR: &str = "TRASHCAL_TOWN";
/// Log destination; logging is off without it.
pub(crate) const LOG_FILE_VAR: &str = "TRASHCAL_LOG_FILE";

const BUNDLED_TOWNS: &str = include_str!("../config/towns.json");

/// Settings read once from the environment at startup.
pub(crate) struct Settings {
    pub api_base_override: Option<String>,
    pub start_town: Option<String>,
    pub towns: TownRegistry,
}

impl Settings {
    pub(crate) fn from_env() -> Result<Self> {
        let api_base_override = non_blank_var(API_BASE_VAR);
        let start_town = non_blank_var(TOWN_VAR);

        let towns = match env::var_os(TOWNS_FILE_VAR) {
            Some(path) => {
                let raw = fs::read_to_string(&path)
                    .with_context(|| format!("reading {}", path.to_string_lossy()))?;
                TownRegistry::from_json(&raw)?
            }
            None => TownRegistry::from_json(BUNDLED_TOWNS)?,
        };

        Ok(Self {
            api_base_override,
            start_town,
            towns,
        })
    }
}

fn non_blank_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}
