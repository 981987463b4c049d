use std::collections::HashSet;

use crate::geo::DistanceMetric;
use crate::models::{Coordinates, Place};

/// Orders places by great-circle distance from `center`, nearest first, and
/// drops those farther than `radius_km` when a radius is given.
///
/// Sources often return the same landmark under several ids; only the nearest
/// entry per (case-insensitive) name is kept. Every kept place gets its
/// `distance_km` set.
pub fn rank_by_proximity(
    places: Vec<Place>,
    center: Coordinates,
    radius_km: Option<f64>,
) -> Vec<Place> {
    let mut measured = places
        .into_iter()
        .map(|mut place| {
            let distance = DistanceMetric::Haversine.distance(center, place.coordinates);
            place.distance_km = Some(distance);
            (distance, place)
        })
        .filter(|(distance, _)| radius_km.map_or(true, |radius| *distance <= radius))
        .collect::<Vec<_>>();

    measured.sort_by(|(a, _), (b, _)| a.total_cmp(b));

    let mut seen = HashSet::new();
    measured
        .into_iter()
        .map(|(_, place)| place)
        .filter(|place| seen.insert(place.name.trim().to_lowercase()))
        .collect()
}
