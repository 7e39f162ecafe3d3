//! Per-town session coordinating validation, resolution, preview and URL synthesis.
//!
//! Requests are split into `begin_*` (local validation, returns a [`PendingRequest`]),
//! [`PendingRequest::run`] (network only) and [`TownSession::apply`]. Every request carries a
//! sequence number; only the most recently started one may change the phase.

use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDateTime};
use tracing::{debug, info, warn};

use crate::model::{
    CollectionType, DebugPreview, PreviewEvent, RecyclingColor, ResolutionInput, Selection,
    TownConfig, VersionResponse, Weekday,
};
use crate::ports::{ApiError, Clipboard, ResolverPort};
use crate::selection::{DaysInputError, toggle_type, validate_days_input};
use crate::url::{EndpointError, Endpoints};

/// Number of preview events kept for display.
pub const PREVIEW_LIMIT: usize = 12;
/// Shown when a resolved route lacks weekday or color.
pub const MISSING_ROUTE_MESSAGE: &str =
    "Resolved route is missing weekday/color. Please try the direct mode.";
/// Shown instead of the service message when a house number is required.
pub const REQUIRES_NUMBER_MESSAGE: &str =
    "This street needs a house number to find the right route.";
/// Shown when the subscription URL could not be copied.
pub const COPY_FAILED_MESSAGE: &str = "Could not copy automatically. Please copy the URL manually.";
/// Shown after a successful copy.
pub const COPIED_MESSAGE: &str = "Copied";
/// Version label when the version call fails.
pub const VERSION_UNAVAILABLE: &str = "version unavailable";

#[derive(Debug, Clone, PartialEq, Eq)]
/// URLs and preview produced by a successful submission.
pub struct Generated {
    /// Calendar subscription URL.
    pub subscription_url: String,
    /// Debug preview URL.
    pub debug_url: String,
    /// First upcoming pickups.
    pub events: Vec<PreviewEvent>,
    /// Human-readable note about an address resolution.
    pub summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A failed submission as shown to the user.
pub struct Failure {
    /// User-facing message.
    pub message: String,
    /// Street suggestions to offer.
    pub suggestions: Vec<String>,
}

impl Failure {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestions: Vec::new(),
        }
    }

    fn from_resolve(err: &ApiError) -> Self {
        let message = if err.requires_number() {
            REQUIRES_NUMBER_MESSAGE.to_owned()
        } else {
            err.message()
        };
        Self {
            message,
            suggestions: err.suggestions().to_vec(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Where the session currently stands.
pub enum Phase {
    /// Nothing submitted yet.
    #[default]
    Idle,
    /// A request is in flight.
    Loading,
    /// The latest request produced URLs.
    Success(Generated),
    /// The latest request failed.
    Failure(Failure),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// Sequence number of a submission.
pub struct RequestId(u64);

#[derive(Debug, Clone)]
enum RequestKind {
    Direct,
    Resolve(ResolutionInput),
}

#[derive(Debug, Clone)]
/// A validated submission waiting for its network calls.
pub struct PendingRequest {
    id: RequestId,
    selection: Selection,
    kind: RequestKind,
}

#[derive(Debug, Clone)]
/// Result of running a [`PendingRequest`].
pub struct Completion {
    id: RequestId,
    selection: Selection,
    route: Option<(Weekday, RecyclingColor)>,
    summary: Option<String>,
    outcome: Result<DebugPreview, Failure>,
}

impl PendingRequest {
    /// Request sequence number.
    #[must_use]
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Perform the network calls for this submission.
    pub async fn run(self, port: &dyn ResolverPort) -> Completion {
        let PendingRequest {
            id,
            selection,
            kind,
        } = self;

        match kind {
            RequestKind::Direct => {
                let outcome = port
                    .fetch_debug_preview(&selection)
                    .await
                    .map_err(|err| Failure::new(err.message()));
                Completion {
                    id,
                    selection,
                    route: None,
                    summary: None,
                    outcome,
                }
            }
            RequestKind::Resolve(input) => run_resolve(id, selection, &input, port).await,
        }
    }
}

async fn run_resolve(
    id: RequestId,
    selection: Selection,
    input: &ResolutionInput,
    port: &dyn ResolverPort,
) -> Completion {
    let failed = |selection: Selection, failure: Failure| Completion {
        id,
        selection,
        route: None,
        summary: None,
        outcome: Err(failure),
    };

    let route = match port.resolve_route(input).await {
        Ok(route) => route,
        Err(err) => {
            debug!(?id, error = %err, "route resolution rejected");
            return failed(selection, Failure::from_resolve(&err));
        }
    };

    let (Some(weekday), Some(color)) = (route.weekday, route.recycling_color) else {
        warn!(?id, ?route, "resolved route is incomplete");
        return failed(selection, Failure::new(MISSING_ROUTE_MESSAGE));
    };

    let merged = Selection {
        weekday,
        color,
        ..selection
    };
    let summary = format!("Resolved to {weekday} + {color}");
    let outcome = port
        .fetch_debug_preview(&merged)
        .await
        .map_err(|err| Failure::new(err.message()));

    Completion {
        id,
        selection: merged,
        route: Some((weekday, color)),
        summary: Some(summary),
        outcome,
    }
}

/// State of one town page: current selection, form inputs and the latest result.
pub struct TownSession {
    town: TownConfig,
    endpoints: Endpoints,
    port: Arc<dyn ResolverPort>,

    selection: Selection,
    days_input: String,

    address: String,
    street: String,
    number: String,

    phase: Phase,
    notice: Option<String>,
    version_label: Option<String>,
    known_streets: Vec<String>,
    latest_request: u64,
}

impl TownSession {
    /// Create a session for the port's town.
    #[must_use]
    pub fn new(port: Arc<dyn ResolverPort>, endpoints: Endpoints) -> Self {
        let town = port.town().clone();
        let selection = town.initial_selection();
        Self {
            town,
            endpoints,
            port,
            selection,
            days_input: String::new(),
            address: String::new(),
            street: String::new(),
            number: String::new(),
            phase: Phase::Idle,
            notice: None,
            version_label: None,
            known_streets: Vec::new(),
            latest_request: 0,
        }
    }

    /// Town this session belongs to.
    #[must_use]
    pub fn town(&self) -> &TownConfig {
        &self.town
    }

    /// Shared handle to the resolver, for running requests elsewhere.
    #[must_use]
    pub fn port(&self) -> Arc<dyn ResolverPort> {
        Arc::clone(&self.port)
    }

    /// Current selection.
    #[must_use]
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// Whether a request is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self.phase, Phase::Loading)
    }

    /// Successful result, if the latest request produced one.
    #[must_use]
    pub fn generated(&self) -> Option<&Generated> {
        match &self.phase {
            Phase::Success(generated) => Some(generated),
            _ => None,
        }
    }

    /// Failure of the latest request, if any.
    #[must_use]
    pub fn failure(&self) -> Option<&Failure> {
        match &self.phase {
            Phase::Failure(failure) => Some(failure),
            _ => None,
        }
    }

    /// Copy feedback, shown next to a successful result.
    #[must_use]
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Formatted service version, once loaded.
    #[must_use]
    pub fn version_label(&self) -> Option<&str> {
        self.version_label.as_deref()
    }

    /// Street names known to the service.
    #[must_use]
    pub fn known_streets(&self) -> &[String] {
        &self.known_streets
    }

    /// Raw days input.
    #[must_use]
    pub fn days_input(&self) -> &str {
        &self.days_input
    }

    /// Address field.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Street field.
    #[must_use]
    pub fn street(&self) -> &str {
        &self.street
    }

    /// House number field.
    #[must_use]
    pub fn number(&self) -> &str {
        &self.number
    }

    /// Validation result of the days field.
    ///
    /// # Errors
    ///
    /// Returns the [`DaysInputError`] describing why the input is rejected.
    pub fn days_validation(&self) -> Result<Option<u32>, DaysInputError> {
        validate_days_input(&self.days_input)
    }

    /// Set the weekday.
    pub fn set_weekday(&mut self, weekday: Weekday) {
        self.selection.weekday = weekday;
    }

    /// Set the recycling color.
    pub fn set_color(&mut self, color: RecyclingColor) {
        self.selection.color = color;
    }

    /// Toggle a collection type; the last remaining type stays selected.
    pub fn toggle_type(&mut self, value: CollectionType) {
        self.selection.types = toggle_type(&self.selection.types, value);
    }

    /// Replace the raw days input and revalidate it.
    pub fn set_days_input(&mut self, raw: impl Into<String>) {
        self.days_input = raw.into();
        self.selection.days = self.days_validation().ok().flatten();
    }

    /// Replace the address field.
    pub fn set_address(&mut self, address: impl Into<String>) {
        self.address = address.into();
    }

    /// Replace the street field.
    pub fn set_street(&mut self, street: impl Into<String>) {
        self.street = street.into();
    }

    /// Replace the house number field.
    pub fn set_number(&mut self, number: impl Into<String>) {
        self.number = number.into();
    }

    /// Current address inputs as a resolution request.
    #[must_use]
    pub fn resolution_input(&self) -> ResolutionInput {
        ResolutionInput {
            address: Some(self.address.clone()),
            street: Some(self.street.clone()),
            number: Some(self.number.clone()),
        }
    }

    /// Start a submission with the weekday and color already known.
    ///
    /// Returns `None` when the days field is invalid; the phase then holds that failure.
    pub fn begin_direct(&mut self) -> Option<PendingRequest> {
        if let Err(err) = self.days_validation() {
            self.fail_locally(&err);
            return None;
        }
        Some(self.start(RequestKind::Direct))
    }

    /// Start a submission that first resolves the address fields to a route.
    ///
    /// Returns `None` when the days field is invalid; the phase then holds that failure.
    pub fn begin_resolve(&mut self) -> Option<PendingRequest> {
        if let Err(err) = self.days_validation() {
            self.fail_locally(&err);
            return None;
        }
        let input = self.resolution_input();
        Some(self.start(RequestKind::Resolve(input)))
    }

    /// Accept a suggested street: clear the address, keep the number, and resolve again.
    pub fn begin_suggestion(&mut self, street: &str) -> Option<PendingRequest> {
        self.street = street.to_owned();
        self.address.clear();
        self.begin_resolve()
    }

    fn start(&mut self, kind: RequestKind) -> PendingRequest {
        let id = self.next_request();
        self.phase = Phase::Loading;
        debug!(town = %self.town.id, ?id, ?kind, "request started");
        PendingRequest {
            id,
            selection: self.selection.clone(),
            kind,
        }
    }

    fn next_request(&mut self) -> RequestId {
        self.latest_request += 1;
        self.notice = None;
        RequestId(self.latest_request)
    }

    fn fail_locally(&mut self, err: &DaysInputError) {
        // A local failure supersedes anything still in flight.
        self.next_request();
        self.phase = Phase::Failure(Failure::new(err.to_string()));
    }

    /// Apply a finished request. Returns `false` when it was superseded and dropped.
    pub fn apply(&mut self, completion: Completion) -> bool {
        if completion.id != RequestId(self.latest_request) {
            debug!(
                town = %self.town.id,
                stale = ?completion.id,
                latest = self.latest_request,
                "dropping superseded result"
            );
            return false;
        }

        let Completion {
            selection,
            route,
            summary,
            outcome,
            ..
        } = completion;

        if let Some((weekday, color)) = route {
            self.selection.weekday = weekday;
            self.selection.color = color;
        }

        self.phase = match outcome.and_then(|preview| {
            self.generate(&selection, preview, summary)
                .map_err(|err| Failure::new(ApiError::from(err).message()))
        }) {
            Ok(generated) => {
                info!(
                    town = %self.town.id,
                    url = %generated.subscription_url,
                    "subscription URL ready"
                );
                Phase::Success(generated)
            }
            Err(failure) => {
                info!(town = %self.town.id, message = %failure.message, "submission failed");
                Phase::Failure(failure)
            }
        };
        true
    }

    fn generate(
        &self,
        selection: &Selection,
        preview: DebugPreview,
        summary: Option<String>,
    ) -> Result<Generated, EndpointError> {
        let mut events = preview.events;
        events.truncate(PREVIEW_LIMIT);
        Ok(Generated {
            subscription_url: self.endpoints.subscription_url(selection)?,
            debug_url: self.endpoints.debug_url(selection)?,
            events,
            summary,
        })
    }

    /// Invalidate anything in flight, e.g. when the user leaves the town page.
    pub fn cancel(&mut self) {
        self.next_request();
        if self.is_loading() {
            self.phase = Phase::Idle;
        }
    }

    /// Submit with known weekday and color and wait for the result.
    pub async fn submit_direct(&mut self) {
        if let Some(pending) = self.begin_direct() {
            self.finish(pending).await;
        }
    }

    /// Resolve the address fields and wait for the result.
    pub async fn submit_resolve(&mut self) {
        if let Some(pending) = self.begin_resolve() {
            self.finish(pending).await;
        }
    }

    /// Accept a suggestion and wait for the result.
    pub async fn accept_suggestion(&mut self, street: &str) {
        if let Some(pending) = self.begin_suggestion(street) {
            self.finish(pending).await;
        }
    }

    async fn finish(&mut self, pending: PendingRequest) {
        let completion = pending.run(self.port.as_ref()).await;
        self.apply(completion);
    }

    /// Copy the subscription URL. Failure leaves the result in place and sets a notice.
    pub fn copy_subscription_url(&mut self, clipboard: &mut dyn Clipboard) {
        let Some(url) = self.generated().map(|generated| generated.subscription_url.clone()) else {
            return;
        };
        self.notice = Some(match clipboard.write_text(&url) {
            Ok(()) => COPIED_MESSAGE.to_owned(),
            Err(err) => {
                warn!(error = %err, "copy to clipboard failed");
                COPY_FAILED_MESSAGE.to_owned()
            }
        });
    }

    /// Load the version label. Failures are not retried.
    pub async fn refresh_version(&mut self) {
        let result = self.port.fetch_version().await;
        self.apply_version(result);
    }

    /// Record the outcome of a version fetch.
    pub fn apply_version(&mut self, result: Result<VersionResponse, ApiError>) {
        self.version_label = Some(match result {
            Ok(version) => version_label(&version),
            Err(err) => {
                debug!(error = %err, "version unavailable");
                VERSION_UNAVAILABLE.to_owned()
            }
        });
    }

    /// Load the street list used for completion.
    pub async fn refresh_streets(&mut self) {
        let result = self.port.fetch_streets().await;
        self.apply_streets(result);
    }

    /// Record the outcome of a street list fetch. Failures leave the list empty.
    pub fn apply_streets(&mut self, result: Result<Vec<String>, ApiError>) {
        match result {
            Ok(streets) => self.known_streets = streets,
            Err(err) => {
                debug!(error = %err, "street list unavailable");
                self.known_streets.clear();
            }
        }
    }

    /// Complete the street field from the known streets. Returns whether it changed.
    pub fn complete_street(&mut self) -> bool {
        let typed = self.street.trim().to_lowercase();
        if typed.is_empty() {
            return false;
        }
        let Some(found) = self
            .known_streets
            .iter()
            .find(|street| street.to_lowercase().starts_with(&typed))
        else {
            return false;
        };
        if *found == self.street {
            return false;
        }
        self.street = found.clone();
        true
    }
}

/// `service <v> · schema <n> · generated <time>`.
#[must_use]
pub fn version_label(version: &VersionResponse) -> String {
    let generated = version
        .meta
        .as_ref()
        .and_then(|meta| meta.generated_at.as_deref())
        .map_or_else(|| "unknown".to_owned(), format_timestamp);
    format!(
        "service {} · schema {} · generated {generated}",
        version.service_version.as_deref().unwrap_or("n/a"),
        version.schema_version,
    )
}

fn format_timestamp(raw: &str) -> String {
    const DISPLAY: &str = "%Y-%m-%d %H:%M";

    if let Ok(stamped) = DateTime::parse_from_rfc3339(raw) {
        return stamped.with_timezone(&Local).format(DISPLAY).to_string();
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"]
        .into_iter()
        .find_map(|pattern| NaiveDateTime::parse_from_str(raw, pattern).ok())
        .map_or_else(|| raw.to_owned(), |naive| naive.format(DISPLAY).to_string())
}
