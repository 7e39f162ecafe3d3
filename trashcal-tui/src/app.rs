use std::sync::Arc;

use reqwest::Client;
use trashcal_client::HttpResolver;
use trashcal_core::{
    CollectionType, EndpointError, Endpoints, RegistryError, ResolverPort, TownConfig, TownRegistry,
    TownSession,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Screen {
    TownSelect,
    Planner,
}

/// Focusable inputs on the planner screen, in tab order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Field {
    Weekday,
    Color,
    Trash,
    Recycling,
    Days,
    Address,
    Street,
    Number,
    Suggestions,
}

impl Field {
    const ORDER: [Field; 9] = [
        Field::Weekday,
        Field::Color,
        Field::Trash,
        Field::Recycling,
        Field::Days,
        Field::Address,
        Field::Street,
        Field::Number,
        Field::Suggestions,
    ];

    /// Fields that belong to the "I do not know my pickup info" form.
    pub(crate) fn is_resolve_field(self) -> bool {
        matches!(
            self,
            Field::Address | Field::Street | Field::Number | Field::Suggestions
        )
    }

    pub(crate) fn collection_type(self) -> Option<CollectionType> {
        match self {
            Field::Trash => Some(CollectionType::Trash),
            Field::Recycling => Some(CollectionType::Recycling),
            _ => None,
        }
    }
}

pub(crate) struct App {
    pub client: Client,
    pub api_base_override: Option<String>,

    pub screen: Screen,
    pub towns: TownRegistry,
    pub town_list_index: usize,

    pub session: Option<TownSession>,
    pub focus: Field,
    pub suggestion_index: usize,
    pub show_debug_link: bool,

    pub error_message: Option<String>,
}

impl App {
    pub(crate) fn new(
        client: Client,
        towns: TownRegistry,
        api_base_override: Option<String>,
    ) -> Self {
        Self {
            client,
            api_base_override,
            screen: Screen::TownSelect,
            towns,
            town_list_index: 0,
            session: None,
            focus: Field::Weekday,
            suggestion_index: 0,
            show_debug_link: false,
            error_message: None,
        }
    }

    pub(crate) fn selected_town(&self) -> Option<&TownConfig> {
        self.towns.towns().get(self.town_list_index)
    }

    /// Highlight the town registered under `slug`.
    pub(crate) fn select_town(&mut self, slug: &str) -> Result<(), RegistryError> {
        let id = self.towns.by_slug(slug)?.id.clone();
        if let Some(index) = self.towns.towns().iter().position(|town| town.id == id) {
            self.town_list_index = index;
        }
        Ok(())
    }

    /// Build a session for the highlighted town and switch to the planner.
    pub(crate) fn open_current_town(&mut self) -> Result<(), EndpointError> {
        let Some(town) = self.selected_town().cloned() else {
            return Ok(());
        };
        let endpoints = Endpoints::resolve(&town.api, self.api_base_override.as_deref())?;
        let port: Arc<dyn ResolverPort> = Arc::new(HttpResolver::new(
            self.client.clone(),
            town,
            endpoints.clone(),
        ));

        self.session = Some(TownSession::new(port, endpoints));
        self.focus = Field::Weekday;
        self.suggestion_index = 0;
        self.error_message = None;
        self.screen = Screen::Planner;
        Ok(())
    }

    /// Drop the planner session; anything still in flight is ignored.
    pub(crate) fn leave_town(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.cancel();
        }
        self.session = None;
        self.screen = Screen::TownSelect;
    }

    pub(crate) fn suggestions(&self) -> &[String] {
        self.session
            .as_ref()
            .and_then(TownSession::failure)
            .map_or(&[], |failure| failure.suggestions.as_slice())
    }

    pub(crate) fn current_suggestion(&self) -> Option<String> {
        self.suggestions().get(self.suggestion_index).cloned()
    }

    pub(crate) fn focus_next(&mut self) {
        self.move_focus(1);
    }

    pub(crate) fn focus_prev(&mut self) {
        self.move_focus(Field::ORDER.len() - 1);
    }

    fn move_focus(&mut self, step: usize) {
        let has_suggestions = !self.suggestions().is_empty();
        let count = Field::ORDER.len();
        let mut index = Field::ORDER
            .iter()
            .position(|field| *field == self.focus)
            .unwrap_or(0);
        loop {
            index = (index + step) % count;
            let Some(candidate) = Field::ORDER.get(index).copied() else {
                return;
            };
            if candidate != Field::Suggestions || has_suggestions {
                self.focus = candidate;
                return;
            }
        }
    }

    /// Keep focus and list cursor valid after the suggestion list changed.
    pub(crate) fn sync_suggestions(&mut self) {
        let count = self.suggestions().len();
        if count == 0 {
            self.suggestion_index = 0;
            if self.focus == Field::Suggestions {
                self.focus = Field::Street;
            }
        } else if self.suggestion_index >= count {
            self.suggestion_index = count - 1;
        }
    }
}
