//! Domain data structures shared across the pipeline: collection categories,
//! materialized occurrences, schedule snapshots, and the expansion horizon.

use std::collections::HashMap;

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::{America, Tz};
use serde::{Deserialize, Serialize};

/// IANA timezone of the municipality. Every timestamp in the pipeline is
/// normalized into it so comparisons and "days until" math stay coherent
/// across DST transitions.
pub const CIVIC_TZ: Tz = America::Toronto;

/// Number of days the expansion horizon extends past its start date.
pub const HORIZON_DAYS: i64 = 365;

/// Collection categories published on the portal feed.
///
/// Declaration order is the matching priority: a title carrying several
/// labels lands in the first matching category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Household waste ("Déchets").
    Waste,
    /// Recyclables ("Récupération").
    Recycling,
    /// Organic waste ("Compost").
    Compost,
    /// Bulky items ("Encombrants").
    Bulky,
    /// Green waste ("Résidus verts").
    GreenWaste,
    /// Christmas tree pickup ("Arbre de Noël").
    ChristmasTree,
}

impl Category {
    /// Every category, in matching priority order.
    pub const ALL: [Self; 6] = [
        Self::Waste,
        Self::Recycling,
        Self::Compost,
        Self::Bulky,
        Self::GreenWaste,
        Self::ChristmasTree,
    ];

    /// Label as it appears in feed event titles.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Waste => "Déchets",
            Self::Recycling => "Récupération",
            Self::Compost => "Compost",
            Self::Bulky => "Encombrants",
            Self::GreenWaste => "Résidus verts",
            Self::ChristmasTree => "Arbre de Noël",
        }
    }

    /// Match a free-text event title against the known labels.
    ///
    /// Containment is case-insensitive and the first label in [`Category::ALL`]
    /// order wins. Relies on the municipality's labels not being substrings of
    /// one another; a title matching nothing stays uncategorized.
    #[must_use]
    pub fn classify(title: &str) -> Option<Self> {
        let title = title.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|category| title.contains(&category.label().to_lowercase()))
    }
}

/// One concrete scheduled pickup, materialized from the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Occurrence {
    /// Pickup timestamp in the civic timezone. Date-only feed values sit at
    /// local midnight.
    pub date: DateTime<Tz>,
    /// Event title as published on the feed (e.g. "Déchets - secteur 3").
    pub title: String,
    /// Optional free-text details from the feed.
    pub description: Option<String>,
}

/// Address pair submitted to the portal pickers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressQuery {
    /// Street name, exactly as the portal lists it.
    pub street: String,
    /// Civic number, free text.
    pub civic_number: String,
}

impl AddressQuery {
    /// Create a query for the given street and civic number.
    #[must_use]
    pub fn new<S: Into<String>, C: Into<String>>(street: S, civic_number: C) -> Self {
        Self {
            street: street.into(),
            civic_number: civic_number.into(),
        }
    }
}

/// Forward window within which occurrences are materialized.
///
/// Bounds are civic-local dates and both are inclusive: a pickup dated
/// exactly [`HORIZON_DAYS`] days after the start is still in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Horizon {
    /// First date inside the window.
    pub start: NaiveDate,
    /// Last date inside the window.
    pub end: NaiveDate,
}

impl Horizon {
    /// Window of [`HORIZON_DAYS`] days beginning on `start`.
    #[must_use]
    pub fn starting(start: NaiveDate) -> Self {
        Self {
            start,
            end: start + Duration::days(HORIZON_DAYS),
        }
    }

    /// Whether a civic-local date falls inside the window.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Current instant in the civic timezone.
#[must_use]
pub fn civic_now() -> DateTime<Tz> {
    Utc::now().with_timezone(&CIVIC_TZ)
}

/// Localize a civic-local calendar date to its midnight timestamp.
#[must_use]
pub fn civic_midnight(date: NaiveDate) -> DateTime<Tz> {
    localize_naive(date.and_time(NaiveTime::MIN))
}

/// Attach the civic timezone to a naive wall-clock value.
#[must_use]
pub fn localize_naive(naive: NaiveDateTime) -> DateTime<Tz> {
    localize_in(CIVIC_TZ, naive)
}

/// Attach `zone` to a naive wall-clock value without panicking on DST edges:
/// ambiguous values take the earlier instant, values erased by a
/// spring-forward gap are reinterpreted from UTC.
pub(crate) fn localize_in(zone: Tz, naive: NaiveDateTime) -> DateTime<Tz> {
    match naive.and_local_timezone(zone) {
        LocalResult::Single(moment) | LocalResult::Ambiguous(moment, _) => moment,
        LocalResult::None => zone.from_utc_datetime(&naive),
    }
}

/// Output of one pipeline run: every materialized occurrence, indexed by
/// category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleSnapshot {
    /// Occurrences per category, each list sorted by date ascending. All six
    /// categories are always present, possibly with an empty list.
    pub by_category: HashMap<Category, Vec<Occurrence>>,
    /// Every occurrence, categorized or not, sorted by date ascending.
    pub all_occurrences: Vec<Occurrence>,
    /// When the pipeline produced this snapshot.
    pub fetched_at: DateTime<Tz>,
}

impl ScheduleSnapshot {
    /// Snapshot carrying no occurrences, the "portal published nothing" shape.
    #[must_use]
    pub fn empty(fetched_at: DateTime<Tz>) -> Self {
        Self::assemble(Vec::new(), fetched_at)
    }

    /// Categorize and index raw occurrences into a snapshot.
    ///
    /// Sorting is stable, so occurrences sharing a date keep the order in
    /// which the expander produced them.
    #[must_use]
    pub fn assemble(occurrences: Vec<Occurrence>, fetched_at: DateTime<Tz>) -> Self {
        let mut by_category: HashMap<Category, Vec<Occurrence>> = Category::ALL
            .into_iter()
            .map(|category| (category, Vec::new()))
            .collect();
        let mut all_occurrences = Vec::with_capacity(occurrences.len());

        for occurrence in occurrences {
            if let Some(category) = Category::classify(&occurrence.title) {
                if let Some(list) = by_category.get_mut(&category) {
                    list.push(occurrence.clone());
                }
            }
            all_occurrences.push(occurrence);
        }

        for list in by_category.values_mut() {
            list.sort_by_key(|occurrence| occurrence.date);
        }
        all_occurrences.sort_by_key(|occurrence| occurrence.date);

        Self {
            by_category,
            all_occurrences,
            fetched_at,
        }
    }

    /// Occurrences for one category, sorted by date ascending.
    #[must_use]
    pub fn for_category(&self, category: Category) -> &[Occurrence] {
        self.by_category
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Next pickup of a category at or after `now`.
    #[must_use]
    pub fn next_for(&self, category: Category, now: DateTime<Tz>) -> Option<&Occurrence> {
        self.for_category(category)
            .iter()
            .find(|occurrence| occurrence.date >= now)
    }

    /// Up to `limit` upcoming pickups of a category at or after `now`.
    #[must_use]
    pub fn upcoming_for(
        &self,
        category: Category,
        now: DateTime<Tz>,
        limit: usize,
    ) -> Vec<&Occurrence> {
        self.for_category(category)
            .iter()
            .filter(|occurrence| occurrence.date >= now)
            .take(limit)
            .collect()
    }

    /// Next pickup of any category at or after `now`.
    #[must_use]
    pub fn next_overall(&self, now: DateTime<Tz>) -> Option<&Occurrence> {
        self.all_occurrences
            .iter()
            .find(|occurrence| occurrence.date >= now)
    }

    /// All occurrences within `[start, end]`, both bounds inclusive.
    #[must_use]
    pub fn occurrences_between(
        &self,
        start: DateTime<Tz>,
        end: DateTime<Tz>,
    ) -> Vec<&Occurrence> {
        self.all_occurrences
            .iter()
            .filter(|occurrence| start <= occurrence.date && occurrence.date <= end)
            .collect()
    }

    /// Whether the snapshot carries no occurrences at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.all_occurrences.is_empty()
    }
}
