// Client-side narrowing and ordering of the accumulated ride list

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::models::{GenderPreference, LuggageSize, Ride};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
}

impl TimeOfDay {
    /// Whether `hour` (0-23) falls in this bucket. Evening wraps past midnight
    /// and also covers 0-5.
    pub fn contains(self, hour: u32) -> bool {
        match self {
            TimeOfDay::Morning => (6..=11).contains(&hour),
            TimeOfDay::Afternoon => (12..=17).contains(&hour),
            TimeOfDay::Evening => hour >= 18 || hour < 6,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    PriceAsc,
    PriceDesc,
    TimeAsc,
    TimeDesc,
    // Empty or unrecognised keys keep the order the server returned
    #[default]
    #[serde(other, rename = "")]
    ServerOrder,
}

/// Filter and sort options chosen by the user. Replaced wholesale on every change.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchFilters {
    pub sort_by: SortKey,
    pub time_of_day: BTreeSet<TimeOfDay>,
    pub max_price: Option<u32>,
    pub ladies_only: bool,
    pub no_smoking: bool,
    // Declared for the UI; not applied below
    pub allows_music: bool,
    pub allows_pets: bool,
    pub luggage_size: Option<LuggageSize>,
}

impl SearchFilters {
    fn active_flags(&self) -> [bool; 8] {
        [
            self.sort_by != SortKey::ServerOrder,
            !self.time_of_day.is_empty(),
            self.max_price.is_some(),
            self.ladies_only,
            self.no_smoking,
            self.allows_music,
            self.allows_pets,
            self.luggage_size.is_some(),
        ]
    }

    pub fn has_active_filters(&self) -> bool {
        self.active_flags().iter().any(|&f| f)
    }

    pub fn active_filters_count(&self) -> usize {
        self.active_flags().iter().filter(|&&f| f).count()
    }
}

// Reads the hour out of "YYYY-MM-DDTHH:..."
fn departure_hour(departure_time: &str) -> Option<u32> {
    departure_time
        .get(11..13)
        .and_then(|h| h.parse::<u32>().ok())
        .filter(|h| *h < 24)
}

fn matches_time_of_day(ride: &Ride, buckets: &BTreeSet<TimeOfDay>) -> bool {
    if buckets.is_empty() {
        return true;
    }
    match departure_hour(&ride.departure_time) {
        Some(hour) => buckets.iter().any(|b| b.contains(hour)),
        // Unreadable timestamps stay visible
        None => true,
    }
}

/// Builds the list to display from the accumulated rides. Pure: the input is
/// left untouched and the output only ever contains rides from `rides`.
pub fn apply(rides: &[Ride], filters: &SearchFilters) -> Vec<Ride> {
    let mut result: Vec<Ride> = rides
        .iter()
        .filter(|ride| matches_time_of_day(ride, &filters.time_of_day))
        .filter(|ride| {
            filters
                .max_price
                .is_none_or(|max| ride.price_per_seat <= f64::from(max))
        })
        .filter(|ride| !filters.ladies_only || ride.gender_preference == GenderPreference::FemaleOnly)
        .filter(|ride| !filters.no_smoking || !ride.allows_smoking)
        .cloned()
        .collect();

    // sort_by is stable, ties keep server order
    match filters.sort_by {
        SortKey::PriceAsc => result.sort_by(|a, b| a.price_per_seat.total_cmp(&b.price_per_seat)),
        SortKey::PriceDesc => result.sort_by(|a, b| b.price_per_seat.total_cmp(&a.price_per_seat)),
        SortKey::TimeAsc => result.sort_by(|a, b| a.departure_time.cmp(&b.departure_time)),
        SortKey::TimeDesc => result.sort_by(|a, b| b.departure_time.cmp(&a.departure_time)),
        SortKey::ServerOrder => {}
    }

    result
}
