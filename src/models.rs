// Data structures exchanged with the Blassa backend and the local UI

use serde::{Deserialize, Serialize};

// Passenger restriction attached to a ride
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GenderPreference {
    #[default]
    Any,
    MaleOnly,
    FemaleOnly,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RideStatus {
    Scheduled,
    Full,
    InProgress,
    Completed,
    Cancelled,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LuggageSize {
    Small,
    #[default]
    Medium,
    Large,
}

// A single published ride, as returned by the search endpoint.
// Never mutated after deserialization; views are built from clones.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Ride {
    pub id: String,
    pub driver_name: Option<String>,
    pub driver_email: Option<String>,
    pub driver_rating: Option<f64>,
    pub driver_profile_picture_url: Option<String>,
    pub origin_name: String,
    pub origin_lat: Option<f64>,
    pub origin_lon: Option<f64>,
    pub destination_name: String,
    pub destination_lat: Option<f64>,
    pub destination_lon: Option<f64>,
    pub departure_time: String, // ISO 8601, kept verbatim
    pub total_seats: u32,
    pub available_seats: u32,
    pub price_per_seat: f64,
    #[serde(default)]
    pub allows_smoking: bool,
    #[serde(default)]
    pub allows_music: bool,
    #[serde(default)]
    pub allows_pets: bool,
    #[serde(default)]
    pub luggage_size: LuggageSize,
    #[serde(default)]
    pub gender_preference: GenderPreference,
    pub status: RideStatus,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PageMetadata {
    #[serde(default)]
    pub size: u32,
    #[serde(default)]
    pub total_elements: u64,
    pub total_pages: u32,
    pub number: u32,
}

// Paginated envelope used by every list endpoint of the backend
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PagedResponse<T> {
    pub content: Vec<T>,
    pub page: PageMetadata,
}

pub type RidePage = PagedResponse<Ride>;

// Query issued by the user; fixed for the lifetime of a search session
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub from: String,
    pub to: String,
    pub origin_lat: f64,
    pub origin_lon: f64,
    pub dest_lat: f64,
    pub dest_lon: f64,
    pub date: Option<String>, // YYYY-MM-DD
    #[serde(default = "default_passengers")]
    pub passengers: u32,
    pub gender_filter: Option<GenderPreference>,
}

fn default_passengers() -> u32 {
    1
}

impl SearchParams {
    // The backend expects a full local datetime; only the day is chosen by the user
    pub fn departure_time(&self) -> Option<String> {
        self.date.as_ref().map(|d| format!("{}T00:00:00", d))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub user_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub link: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct MobileAuthResponse {
    pub status: String,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
    pub email: Option<String>,
    pub message: Option<String>,
}

// Error body returned by the backend on non-2xx responses
#[derive(Debug, Deserialize, Default)]
pub struct ErrorResponse {
    pub error: Option<String>,
    pub message: Option<String>,
}
