use std::sync::Arc;

use ramasse_core::{
    model::{AddressQuery, ScheduleSnapshot},
    service::RamasseService,
};

#[derive(Debug, Clone, Copy)]
pub(crate) enum Screen {
    StreetSelect,
    CivicSelect,
    ScheduleView,
}

pub(crate) struct App {
    pub service: Arc<RamasseService>,

    pub screen: Screen,

    pub streets: Vec<String>,
    pub street_input: String,
    pub street_list_index: usize,
    pub selected_street: Option<String>,

    pub civic_numbers: Vec<String>,
    pub civic_input: String,
    pub civic_list_index: usize,

    pub selected_address: Option<AddressQuery>,
    pub snapshot: Option<ScheduleSnapshot>,

    pub is_loading: bool,
    pub error_message: Option<String>,
}

impl App {
    pub(crate) fn new(service: Arc<RamasseService>) -> Self {
        Self {
            service,
            screen: Screen::StreetSelect,
            streets: Vec::new(),
            street_input: String::new(),
            street_list_index: 0,
            selected_street: None,
            civic_numbers: Vec::new(),
            civic_input: String::new(),
            civic_list_index: 0,
            selected_address: None,
            snapshot: None,
            is_loading: false,
            error_message: None,
        }
    }

    /// Streets whose name contains the typed filter, case-insensitively.
    pub(crate) fn filtered_streets(&self) -> Vec<&str> {
        let needle = self.street_input.to_lowercase();
        self.streets
            .iter()
            .filter(|street| needle.is_empty() || street.to_lowercase().contains(&needle))
            .map(String::as_str)
            .collect()
    }

    /// Civic numbers starting with the typed filter.
    pub(crate) fn filtered_civic_numbers(&self) -> Vec<&str> {
        let needle = self.civic_input.trim();
        self.civic_numbers
            .iter()
            .filter(|number| needle.is_empty() || number.starts_with(needle))
            .map(String::as_str)
            .collect()
    }

    /// Street the cursor points at, or the typed text when the picker has
    /// nothing left to offer. `None` only when there is neither.
    pub(crate) fn current_street(&self) -> Option<String> {
        self.filtered_streets()
            .get(self.street_list_index)
            .map(|street| (*street).to_owned())
            .or_else(|| {
                let typed = self.street_input.trim();
                (!typed.is_empty()).then(|| typed.to_owned())
            })
    }

    /// Civic number the cursor points at, falling back to the typed text.
    pub(crate) fn current_civic_number(&self) -> Option<String> {
        self.filtered_civic_numbers()
            .get(self.civic_list_index)
            .map(|number| (*number).to_owned())
            .or_else(|| {
                let typed = self.civic_input.trim();
                (!typed.is_empty()).then(|| typed.to_owned())
            })
    }

    pub(crate) fn clamp_street_index(&mut self) {
        let len = self.filtered_streets().len();
        self.street_list_index = self.street_list_index.min(len.saturating_sub(1));
    }

    pub(crate) fn clamp_civic_index(&mut self) {
        let len = self.filtered_civic_numbers().len();
        self.civic_list_index = self.civic_list_index.min(len.saturating_sub(1));
    }

    pub(crate) fn enter_civic_select(&mut self, street: String, numbers: Vec<String>) {
        self.selected_street = Some(street);
        self.civic_numbers = numbers;
        self.civic_input.clear();
        self.civic_list_index = 0;
        self.screen = Screen::CivicSelect;
    }

    pub(crate) fn show_snapshot(&mut self, query: AddressQuery, snapshot: ScheduleSnapshot) {
        self.selected_address = Some(query);
        self.snapshot = Some(snapshot);
        self.screen = Screen::ScheduleView;
    }
}
