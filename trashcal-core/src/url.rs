//! Canonical subscription and debug URLs for a selection.

use reqwest::Url;

use crate::model::{Selection, TownApiConfig};
use crate::selection::{canonical_types, is_default_types, join_types};

/// Origin used when neither an override nor the town provides a base URL.
pub const FALLBACK_ORIGIN: &str = "http://localhost";

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
/// A base URL or path that cannot be turned into an absolute URL.
pub enum EndpointError {
    /// The configured base is not an absolute URL.
    #[error("Invalid base URL {base:?}: {reason}")]
    InvalidBase {
        /// Offending base.
        base: String,
        /// Parser message.
        reason: String,
    },
    /// A path could not be joined onto the base.
    #[error("Invalid endpoint path {path:?}: {reason}")]
    InvalidPath {
        /// Offending path.
        path: String,
        /// Parser message.
        reason: String,
    },
}

/// Pick the base URL for a town: override first, then the town's own base URL.
///
/// Blank values count as missing. `None` means the caller should use its own origin.
#[must_use]
pub fn api_base<'cfg>(
    override_base: Option<&'cfg str>,
    api: &'cfg TownApiConfig,
) -> Option<&'cfg str> {
    override_base
        .map(str::trim)
        .filter(|base| !base.is_empty())
        .or_else(|| Some(api.base_url.trim()).filter(|base| !base.is_empty()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A town's endpoint layout bound to a resolved base URL.
pub struct Endpoints {
    base: Url,
    api: TownApiConfig,
}

impl Endpoints {
    /// Resolve the base URL (override, town base, [`FALLBACK_ORIGIN`]) once.
    ///
    /// # Errors
    ///
    /// Returns [`EndpointError::InvalidBase`] when the chosen base does not parse.
    pub fn resolve(
        api: &TownApiConfig,
        override_base: Option<&str>,
    ) -> Result<Self, EndpointError> {
        let base = api_base(override_base, api).unwrap_or(FALLBACK_ORIGIN);
        let parsed = Url::parse(base).map_err(|err| EndpointError::InvalidBase {
            base: base.to_owned(),
            reason: err.to_string(),
        })?;
        Ok(Self {
            base: parsed,
            api: api.clone(),
        })
    }

    /// Resolved base URL.
    #[must_use]
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Endpoint paths this instance was built from.
    #[must_use]
    pub fn api(&self) -> &TownApiConfig {
        &self.api
    }

    /// Join a relative path onto the base without any query string.
    ///
    /// # Errors
    ///
    /// Returns [`EndpointError::InvalidPath`] when the path cannot be joined.
    pub fn join(&self, path: &str) -> Result<Url, EndpointError> {
        self.base
            .join(path)
            .map_err(|err| EndpointError::InvalidPath {
                path: path.to_owned(),
                reason: err.to_string(),
            })
    }

    /// Build a canonical selection URL for `path`.
    ///
    /// `types` is left out for the default set and `days` unless positive. Address fields
    /// never take part in these URLs.
    ///
    /// # Errors
    ///
    /// Returns [`EndpointError::InvalidPath`] when the path cannot be joined.
    pub fn build_url(&self, path: &str, selection: &Selection) -> Result<String, EndpointError> {
        let mut url = self.join(path)?;
        let types = canonical_types(&selection.types);
        {
            let mut query = url.query_pairs_mut();
            query.clear();
            query.append_pair("weekday", selection.weekday.as_str());
            query.append_pair("color", selection.color.as_str());
            if !is_default_types(&types) {
                query.append_pair("types", &join_types(&types));
            }
            if let Some(days) = selection.days.filter(|days| *days > 0) {
                query.append_pair("days", &days.to_string());
            }
        }
        Ok(url.to_string())
    }

    /// Durable calendar subscription URL.
    ///
    /// # Errors
    ///
    /// See [`Endpoints::build_url`].
    pub fn subscription_url(&self, selection: &Selection) -> Result<String, EndpointError> {
        self.build_url(&self.api.ics_path, selection)
    }

    /// Troubleshooting preview URL with the same parameters.
    ///
    /// # Errors
    ///
    /// See [`Endpoints::build_url`].
    pub fn debug_url(&self, selection: &Selection) -> Result<String, EndpointError> {
        self.build_url(&self.api.debug_path, selection)
    }
}

/// Swap an `https://` or `http://` prefix for `webcal://`; other strings pass through.
#[must_use]
pub fn to_webcal(url: &str) -> String {
    url.strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .map_or_else(|| url.to_owned(), |rest| format!("webcal://{rest}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CollectionType, RecyclingColor, Weekday};

    fn api(base_url: &str) -> TownApiConfig {
        TownApiConfig {
            base_url: base_url.to_owned(),
            ics_path: "/town.ics".to_owned(),
            resolve_path: "/resolve".to_owned(),
            debug_path: "/debug".to_owned(),
            version_path: "/version".to_owned(),
            streets_path: "/streets".to_owned(),
        }
    }

    fn thursday_blue(types: Vec<CollectionType>, days: Option<u32>) -> Selection {
        Selection {
            weekday: Weekday::Thursday,
            color: RecyclingColor::Blue,
            types,
            days,
        }
    }

    fn endpoints() -> Endpoints {
        Endpoints::resolve(&api("https://trash.example.com"), None).expect("valid base")
    }

    #[test]
    fn default_types_are_omitted() {
        let selection = thursday_blue(CollectionType::ALL.to_vec(), Some(120));
        assert_eq!(
            endpoints().subscription_url(&selection).expect("url builds"),
            "https://trash.example.com/town.ics?weekday=Thursday&color=BLUE&days=120"
        );
    }

    #[test]
    fn non_default_types_are_included() {
        let selection = thursday_blue(vec![CollectionType::Trash], Some(120));
        assert_eq!(
            endpoints().subscription_url(&selection).expect("url builds"),
            "https://trash.example.com/town.ics?weekday=Thursday&color=BLUE&types=trash&days=120"
        );
    }

    #[test]
    fn reversed_duplicate_types_collapse_to_default() {
        let selection = thursday_blue(
            vec![
                CollectionType::Recycling,
                CollectionType::Trash,
                CollectionType::Recycling,
            ],
            None,
        );
        assert_eq!(
            endpoints().subscription_url(&selection).expect("url builds"),
            "https://trash.example.com/town.ics?weekday=Thursday&color=BLUE"
        );
    }

    #[test]
    fn zero_days_is_omitted() {
        let selection = thursday_blue(vec![CollectionType::Recycling], Some(0));
        let url = endpoints().debug_url(&selection).expect("url builds");
        assert_eq!(
            url,
            "https://trash.example.com/debug?weekday=Thursday&color=BLUE&types=recycling"
        );
        assert!(!url.contains("days="));
    }

    #[test]
    fn address_fields_never_appear() {
        let endpoints = endpoints();
        for types in [
            vec![CollectionType::Trash],
            vec![CollectionType::Recycling],
            CollectionType::ALL.to_vec(),
        ] {
            for days in [None, Some(0), Some(30)] {
                let selection = thursday_blue(types.clone(), days);
                for url in [
                    endpoints.subscription_url(&selection).expect("url builds"),
                    endpoints.debug_url(&selection).expect("url builds"),
                ] {
                    assert!(!url.contains("address="), "{url}");
                    assert!(!url.contains("street="), "{url}");
                    assert!(!url.contains("number="), "{url}");
                }
            }
        }
    }

    #[test]
    fn override_beats_town_base_and_blank_falls_back() {
        let town = api("https://trash.example.com");
        let overridden =
            Endpoints::resolve(&town, Some(" https://override.example.org ")).expect("valid base");
        assert_eq!(overridden.base().as_str(), "https://override.example.org/");

        let blank_override = Endpoints::resolve(&town, Some("  ")).expect("valid base");
        assert_eq!(blank_override.base().as_str(), "https://trash.example.com/");

        let fallback = Endpoints::resolve(&api(""), None).expect("valid base");
        let selection = thursday_blue(CollectionType::ALL.to_vec(), None);
        assert_eq!(
            fallback.subscription_url(&selection).expect("url builds"),
            "http://localhost/town.ics?weekday=Thursday&color=BLUE"
        );
    }

    #[test]
    fn malformed_base_is_rejected() {
        let result = Endpoints::resolve(&api("not a url"), None);
        assert!(matches!(result, Err(EndpointError::InvalidBase { .. })));
    }

    #[test]
    fn webcal_swaps_scheme_only() {
        assert_eq!(
            to_webcal("https://trash.example.com/town.ics?weekday=Monday"),
            "webcal://trash.example.com/town.ics?weekday=Monday"
        );
        assert_eq!(to_webcal("http://localhost/town.ics"), "webcal://localhost/town.ics");
        assert_eq!(to_webcal("ftp://example.com/x"), "ftp://example.com/x");
    }
}
