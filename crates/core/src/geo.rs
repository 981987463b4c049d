use serde::{Deserialize, Serialize};

use crate::models::Coordinates;

/// How the distance between two stops is measured.
///
/// `Haversine` is the great-circle distance in kilometres. `Planar` is plain
/// Euclidean distance over (lat, lon) degrees, an approximation that only
/// holds at same-city scale and ignores the shrinking of longitude degrees
/// away from the equator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    #[default]
    Haversine,
    Planar,
}

impl DistanceMetric {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "haversine" | "great_circle" | "km" => Some(Self::Haversine),
            "planar" | "euclidean" | "degrees" => Some(Self::Planar),
            _ => None,
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Self::Haversine => "km",
            Self::Planar => "deg",
        }
    }

    pub fn distance(self, a: Coordinates, b: Coordinates) -> f64 {
        // Fixed argument order keeps the float result bit-identical both ways.
        let (a, b) = if a.lat.total_cmp(&b.lat).then(a.lon.total_cmp(&b.lon)).is_gt() {
            (b, a)
        } else {
            (a, b)
        };

        match self {
            Self::Haversine => haversine::distance(
                haversine::Location {
                    latitude: a.lat,
                    longitude: a.lon,
                },
                haversine::Location {
                    latitude: b.lat,
                    longitude: b.lon,
                },
                haversine::Units::Kilometers,
            ),
            Self::Planar => (a.lat - b.lat).hypot(a.lon - b.lon),
        }
    }
}
