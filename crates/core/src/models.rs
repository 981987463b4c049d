use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;
use crate::geo::DistanceMetric;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Museum,
    Park,
    Mall,
    Attraction,
    Landmark,
    Other,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Self::Museum,
        Self::Park,
        Self::Mall,
        Self::Attraction,
        Self::Landmark,
        Self::Other,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "museum" | "museums" | "gallery" | "galleries" => Some(Self::Museum),
            "park" | "parks" | "garden" | "gardens" | "gardens_and_parks" => Some(Self::Park),
            "mall" | "malls" | "shop" | "shops" | "shopping" | "market" => Some(Self::Mall),
            "attraction" | "attractions" | "interesting_places" | "tourist_facilities"
            | "amusements" => Some(Self::Attraction),
            "landmark" | "landmarks" | "historic" | "architecture" | "monuments"
            | "monuments_and_memorials" | "fortifications" | "religion" => Some(Self::Landmark),
            "other" => Some(Self::Other),
            _ => None,
        }
    }

    /// Maps an OpenTripMap `kinds` list ("historic,forts,interesting_places")
    /// to a category. The first recognised kind wins.
    pub fn from_kinds(kinds: &str) -> Self {
        kinds
            .split(',')
            .find_map(Self::parse)
            .unwrap_or(Self::Other)
    }

    pub fn as_code(self) -> &'static str {
        match self {
            Self::Museum => "museum",
            Self::Park => "park",
            Self::Mall => "mall",
            Self::Attraction => "attraction",
            Self::Landmark => "landmark",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

pub type CategorySet = BTreeSet<Category>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub id: String,
    pub name: String,
    pub category: Category,
    pub coordinates: Coordinates,
    #[serde(default)]
    pub popularity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Great-circle distance from the search center, set by radius searches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

impl Place {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: Category,
        coordinates: Coordinates,
        popularity: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category,
            coordinates,
            popularity,
            description: None,
            distance_km: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    DiscoverPlaces,
    GetDetails,
    PlanRoute,
    FilterByPreference,
    Composite,
    MeasureDistance,
}

impl Intent {
    pub fn as_code(self) -> &'static str {
        match self {
            Self::DiscoverPlaces => "discover_places",
            Self::GetDetails => "get_details",
            Self::PlanRoute => "plan_route",
            Self::FilterByPreference => "filter_by_preference",
            Self::Composite => "composite",
            Self::MeasureDistance => "measure_distance",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

/// Category weights used to rank places. Categories without an entry weigh 1.0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PreferenceProfile {
    weights: BTreeMap<Category, f64>,
}

impl PreferenceProfile {
    pub const DEFAULT_WEIGHT: f64 = 1.0;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weight(mut self, category: Category, weight: f64) -> Self {
        self.weights.insert(category, weight);
        self
    }

    pub fn set_weight(&mut self, category: Category, weight: f64) {
        self.weights.insert(category, weight);
    }

    pub fn weight(&self, category: Category) -> f64 {
        self.weights
            .get(&category)
            .copied()
            .unwrap_or(Self::DEFAULT_WEIGHT)
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, f64)> + '_ {
        self.weights.iter().map(|(category, weight)| (*category, *weight))
    }
}

impl FromIterator<(Category, f64)> for PreferenceProfile {
    fn from_iter<T: IntoIterator<Item = (Category, f64)>>(iter: T) -> Self {
        Self {
            weights: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub intent: Intent,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub categories: Option<CategorySet>,
    #[serde(default)]
    pub preferences: Option<PreferenceProfile>,
    #[serde(default)]
    pub place_id: Option<String>,
    /// Places already resolved by the caller; `plan_route` orders these
    /// instead of asking the place source.
    #[serde(default)]
    pub places: Option<Vec<Place>>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub include_details: bool,
    /// Point to search around. Results are ordered nearest first.
    #[serde(default)]
    pub center: Option<Coordinates>,
    /// Only keep places within this many kilometres of `center`.
    #[serde(default)]
    pub radius_km: Option<f64>,
    /// Second endpoint for `measure_distance`; `place_id` is the first.
    #[serde(default)]
    pub to_place_id: Option<String>,
}

impl QueryRequest {
    pub fn new(intent: Intent) -> Self {
        Self {
            intent,
            city: None,
            categories: None,
            preferences: None,
            place_id: None,
            places: None,
            limit: None,
            include_details: false,
            center: None,
            radius_km: None,
            to_place_id: None,
        }
    }

    pub fn discover(city: impl Into<String>) -> Self {
        Self::new(Intent::DiscoverPlaces).with_city(city)
    }

    pub fn details(place_id: impl Into<String>) -> Self {
        Self::new(Intent::GetDetails).with_place_id(place_id)
    }

    pub fn plan_route(city: impl Into<String>) -> Self {
        Self::new(Intent::PlanRoute).with_city(city)
    }

    pub fn filter(city: impl Into<String>, preferences: PreferenceProfile) -> Self {
        Self::new(Intent::FilterByPreference)
            .with_city(city)
            .with_preferences(preferences)
    }

    pub fn composite(city: impl Into<String>) -> Self {
        Self::new(Intent::Composite).with_city(city)
    }

    /// Discovery limited to `radius_km` around `center`.
    pub fn nearby(city: impl Into<String>, center: Coordinates, radius_km: f64) -> Self {
        Self::discover(city).with_center(center).with_radius_km(radius_km)
    }

    pub fn measure(
        city: impl Into<String>,
        from_place_id: impl Into<String>,
        to_place_id: impl Into<String>,
    ) -> Self {
        let mut request = Self::new(Intent::MeasureDistance)
            .with_city(city)
            .with_place_id(from_place_id);
        request.to_place_id = Some(to_place_id.into());
        request
    }

    pub fn with_city(mut self, city: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self
    }

    pub fn with_categories(mut self, categories: impl IntoIterator<Item = Category>) -> Self {
        self.categories = Some(categories.into_iter().collect());
        self
    }

    pub fn with_preferences(mut self, preferences: PreferenceProfile) -> Self {
        self.preferences = Some(preferences);
        self
    }

    pub fn with_place_id(mut self, place_id: impl Into<String>) -> Self {
        self.place_id = Some(place_id.into());
        self
    }

    pub fn with_places(mut self, places: Vec<Place>) -> Self {
        self.places = Some(places);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_details(mut self, include_details: bool) -> Self {
        self.include_details = include_details;
        self
    }

    pub fn with_center(mut self, center: Coordinates) -> Self {
        self.center = Some(center);
        self
    }

    pub fn with_radius_km(mut self, radius_km: f64) -> Self {
        self.radius_km = Some(radius_km);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteLeg {
    pub from: String,
    pub to: String,
    pub distance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteResult {
    pub places: Vec<Place>,
    pub total_distance: f64,
    pub legs: Vec<RouteLeg>,
    pub metric: DistanceMetric,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSummary {
    pub stops: Vec<String>,
    pub legs: Vec<RouteLeg>,
    pub total_distance: f64,
    pub unit: String,
    pub path_text: String,
}

/// Straight-line distance between two resolved places.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceSummary {
    pub from: String,
    pub to: String,
    pub distance: f64,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseNotice {
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub handled_at: String,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedResponse {
    pub intent: Intent,
    pub city: Option<String>,
    pub places: Vec<Place>,
    pub route: Option<RouteSummary>,
    pub distance: Option<DistanceSummary>,
    pub description: Option<String>,
    pub notices: Vec<ResponseNotice>,
    pub meta: Option<ResponseMeta>,
}

impl AggregatedResponse {
    pub fn new(intent: Intent, city: Option<String>) -> Self {
        Self {
            intent,
            city,
            places: Vec::new(),
            route: None,
            distance: None,
            description: None,
            notices: Vec::new(),
            meta: None,
        }
    }

    pub fn result_count(&self) -> usize {
        self.places.len()
    }

    pub fn is_degraded(&self) -> bool {
        !self.notices.is_empty()
    }

    pub fn push_notice(&mut self, kind: ErrorKind, message: impl Into<String>) {
        self.notices.push(ResponseNotice {
            kind,
            message: message.into(),
        });
    }
}
