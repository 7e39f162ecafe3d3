//! Domain data structures for towns, pickup selections, and service payloads.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Weekday on which a route is collected.
pub enum Weekday {
    /// Monday route.
    Monday,
    /// Tuesday route.
    Tuesday,
    /// Wednesday route.
    Wednesday,
    /// Thursday route.
    Thursday,
    /// Friday route.
    Friday,
}

impl Weekday {
    /// All collection weekdays in calendar order.
    pub const ALL: [Weekday; 5] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
    ];

    /// Query string representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Recycling week color assigned to a route.
pub enum RecyclingColor {
    /// Blue recycling weeks.
    #[serde(rename = "BLUE")]
    Blue,
    /// Green recycling weeks.
    #[serde(rename = "GREEN")]
    Green,
}

impl RecyclingColor {
    /// All recycling colors.
    pub const ALL: [RecyclingColor; 2] = [RecyclingColor::Blue, RecyclingColor::Green];

    /// Query string representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RecyclingColor::Blue => "BLUE",
            RecyclingColor::Green => "GREEN",
        }
    }
}

impl fmt::Display for RecyclingColor {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Kind of pickup that can appear on the calendar.
pub enum CollectionType {
    /// Household trash.
    Trash,
    /// Curbside recycling.
    Recycling,
}

impl CollectionType {
    /// Every collection type in canonical order.
    pub const ALL: [CollectionType; 2] = [CollectionType::Trash, CollectionType::Recycling];

    /// Query string representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CollectionType::Trash => "trash",
            CollectionType::Recycling => "recycling",
        }
    }
}

impl fmt::Display for CollectionType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// What the user wants on their calendar.
pub struct Selection {
    /// Collection weekday.
    pub weekday: Weekday,
    /// Recycling week color.
    pub color: RecyclingColor,
    /// Selected collection types; never empty.
    pub types: Vec<CollectionType>,
    /// Optional horizon in days. `None` leaves the service default in place.
    pub days: Option<u32>,
}

impl Selection {
    /// Selection covering every collection type with the service's default horizon.
    #[must_use]
    pub fn new(weekday: Weekday, color: RecyclingColor) -> Self {
        Self {
            weekday,
            color,
            types: CollectionType::ALL.to_vec(),
            days: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Endpoint layout of a town's calendar service.
pub struct TownApiConfig {
    /// Base URL; may be blank to fall back to the default origin.
    #[serde(default)]
    pub base_url: String,
    /// Subscription calendar path.
    pub ics_path: String,
    /// Address resolution path.
    pub resolve_path: String,
    /// Debug preview path.
    pub debug_path: String,
    /// Service version path.
    pub version_path: String,
    /// Street listing path.
    pub streets_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Town record as found in the registry.
pub struct TownConfig {
    /// Stable identifier, e.g. `westford_ma`.
    pub id: String,
    /// Display name.
    pub name: String,
    /// URL-friendly slug.
    pub slug: String,
    /// Service endpoints.
    pub api: TownApiConfig,
    /// What the town page offers.
    #[serde(default)]
    pub capabilities: TownCapabilities,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Feature switches of a town page.
pub struct TownCapabilities {
    /// Direct mode, where weekday and color are picked by hand.
    #[serde(default)]
    pub explicit_bypass: ExplicitBypass,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Values offered in direct mode.
pub struct ExplicitBypass {
    /// Weekdays offered in direct mode.
    #[serde(default = "default_weekdays")]
    pub weekday_values: Vec<Weekday>,
    /// Recycling colors offered in direct mode.
    #[serde(default = "default_colors")]
    pub color_values: Vec<RecyclingColor>,
}

impl Default for ExplicitBypass {
    fn default() -> Self {
        Self {
            weekday_values: default_weekdays(),
            color_values: default_colors(),
        }
    }
}

fn default_weekdays() -> Vec<Weekday> {
    Weekday::ALL.to_vec()
}

fn default_colors() -> Vec<RecyclingColor> {
    RecyclingColor::ALL.to_vec()
}

impl TownConfig {
    /// Weekdays offered in direct mode.
    #[must_use]
    pub fn weekday_values(&self) -> &[Weekday] {
        &self.capabilities.explicit_bypass.weekday_values
    }

    /// Recycling colors offered in direct mode.
    #[must_use]
    pub fn color_values(&self) -> &[RecyclingColor] {
        &self.capabilities.explicit_bypass.color_values
    }

    /// Initial selection for this town: first offered weekday and color.
    #[must_use]
    pub fn initial_selection(&self) -> Selection {
        Selection::new(
            self.weekday_values().first().copied().unwrap_or(Weekday::Monday),
            self.color_values().first().copied().unwrap_or(RecyclingColor::Blue),
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// User-entered address data used to look up a route.
pub struct ResolutionInput {
    /// Full free-form address.
    pub address: Option<String>,
    /// Street name.
    pub street: Option<String>,
    /// House number.
    pub number: Option<String>,
}

impl ResolutionInput {
    /// Query parameters to send: a non-blank address wins over street and number.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(&'static str, &str)> {
        if let Some(address) = non_blank(self.address.as_deref()) {
            return vec![("address", address)];
        }

        let mut pairs = Vec::new();
        if let Some(street) = non_blank(self.street.as_deref()) {
            pairs.push(("street", street));
        }
        if let Some(number) = non_blank(self.number.as_deref()) {
            pairs.push(("number", number));
        }
        pairs
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|segment| !segment.is_empty())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
/// Route returned by the resolver. Either field may be missing.
///
/// Blank or unrecognised values read as missing.
pub struct ResolvedRoute {
    /// Collection weekday.
    #[serde(default, deserialize_with = "lenient_weekday")]
    pub weekday: Option<Weekday>,
    /// Recycling color.
    #[serde(default, deserialize_with = "lenient_color")]
    pub recycling_color: Option<RecyclingColor>,
}

fn lenient_weekday<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Weekday>, D::Error> {
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(known_value(raw.as_ref(), &Weekday::ALL, Weekday::as_str))
}

fn lenient_color<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<RecyclingColor>, D::Error> {
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(known_value(raw.as_ref(), &RecyclingColor::ALL, RecyclingColor::as_str))
}

fn known_value<T: Copy>(
    raw: Option<&Value>,
    all: &[T],
    name: fn(T) -> &'static str,
) -> Option<T> {
    let text = raw.and_then(Value::as_str).map(str::trim)?;
    all.iter().copied().find(|candidate| name(*candidate) == text)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Successful `/resolve` response.
pub struct ResolveSuccess {
    /// `address` when present; only `route` is relied on.
    #[serde(default)]
    pub mode: Option<PreviewMode>,
    /// Resolved route.
    pub route: ResolvedRoute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// How the service arrived at a schedule.
pub enum PreviewMode {
    /// Weekday and color were given explicitly.
    Bypass,
    /// Route came from an address lookup.
    Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// One upcoming pickup in a preview.
pub struct PreviewEvent {
    /// Pickup date.
    pub date: NaiveDate,
    /// Types collected on that date.
    pub types: Vec<CollectionType>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Successful `/debug` response.
pub struct DebugPreview {
    /// Resolution mode used by the service.
    pub mode: PreviewMode,
    /// Horizon the service applied.
    pub days: u32,
    /// Types the service applied.
    pub types: Vec<CollectionType>,
    /// Upcoming pickups.
    pub events: Vec<PreviewEvent>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
/// Metadata attached to the service's schedule database.
pub struct VersionMeta {
    /// Timestamp of the last database build.
    #[serde(default)]
    pub generated_at: Option<String>,
    /// Town the database was built for.
    #[serde(default)]
    pub town_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// `/version` response.
pub struct VersionResponse {
    /// Service build version.
    #[serde(default)]
    pub service_version: Option<String>,
    /// Database schema version.
    pub schema_version: u32,
    /// Database metadata.
    #[serde(default)]
    pub meta: Option<VersionMeta>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_wins_over_street_and_number() {
        let input = ResolutionInput {
            address: Some("  65 Boston Road, Westford ".to_owned()),
            street: Some("Main Street".to_owned()),
            number: Some("1".to_owned()),
        };
        assert_eq!(input.query_pairs(), vec![("address", "65 Boston Road, Westford")]);
    }

    #[test]
    fn blank_address_falls_back_to_street_fields() {
        let input = ResolutionInput {
            address: Some("   ".to_owned()),
            street: Some(" Boston Road ".to_owned()),
            number: Some(String::new()),
        };
        assert_eq!(input.query_pairs(), vec![("street", "Boston Road")]);
    }

    #[test]
    fn town_config_reads_registry_shape() {
        let raw = r#"{
            "id": "westford_ma",
            "name": "Westford, MA",
            "slug": "westford-ma",
            "api": {
                "baseUrl": "https://trash.example.com",
                "icsPath": "/town.ics",
                "resolvePath": "/resolve",
                "debugPath": "/debug",
                "versionPath": "/version",
                "streetsPath": "/streets"
            },
            "capabilities": {
                "explicitBypass": {"enabled": true, "weekdayValues": ["Thursday", "Friday"]}
            }
        }"#;
        let town: TownConfig = serde_json::from_str(raw).expect("town config parses");
        assert_eq!(town.api.ics_path, "/town.ics");
        assert_eq!(town.weekday_values(), [Weekday::Thursday, Weekday::Friday]);
        assert_eq!(town.color_values(), RecyclingColor::ALL);

        let selection = town.initial_selection();
        assert_eq!(selection.weekday, Weekday::Thursday);
        assert_eq!(selection.color, RecyclingColor::Blue);
        assert_eq!(selection.types, CollectionType::ALL.to_vec());
        assert_eq!(selection.days, None);
    }

    #[test]
    fn town_without_capabilities_offers_everything() {
        let raw = r#"{
            "id": "westford_ma",
            "name": "Westford, MA",
            "slug": "westford-ma",
            "api": {
                "icsPath": "/town.ics",
                "resolvePath": "/resolve",
                "debugPath": "/debug",
                "versionPath": "/version",
                "streetsPath": "/streets"
            }
        }"#;
        let town: TownConfig = serde_json::from_str(raw).expect("town config parses");
        assert_eq!(town.weekday_values(), Weekday::ALL);
        assert_eq!(town.color_values(), RecyclingColor::ALL);
        assert_eq!(town.api.base_url, "");
    }

    #[test]
    fn blank_or_unknown_route_fields_read_as_missing() {
        let raw = r#"{"route":{"weekday":"","recycling_color":"PURPLE"}}"#;
        let resolved: ResolveSuccess = serde_json::from_str(raw).expect("resolve body parses");
        assert_eq!(resolved.mode, None);
        assert_eq!(resolved.route, ResolvedRoute::default());

        let raw = r#"{"mode":"address","route":{"weekday":" Thursday ","recycling_color":null}}"#;
        let resolved: ResolveSuccess = serde_json::from_str(raw).expect("resolve body parses");
        assert_eq!(resolved.mode, Some(PreviewMode::Address));
        assert_eq!(resolved.route.weekday, Some(Weekday::Thursday));
        assert_eq!(resolved.route.recycling_color, None);
    }

    #[test]
    fn preview_parses_dates_and_types() {
        let raw = r#"{"mode":"bypass","days":365,"types":["trash","recycling"],
            "events":[{"date":"2026-02-10","types":["trash"]}]}"#;
        let preview: DebugPreview = serde_json::from_str(raw).expect("preview parses");
        assert_eq!(preview.mode, PreviewMode::Bypass);
        assert_eq!(
            preview.events.first().map(|event| event.date),
            NaiveDate::from_ymd_opt(2026, 2, 10)
        );
    }
}
