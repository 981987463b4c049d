use crate::error::RouterError;
use crate::models::{Intent, QueryRequest};
use crate::preference::validate_profile;

pub fn normalize_text(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Resolves the action tag set by the caller (or by an upstream classifier).
pub fn parse_intent(tag: &str) -> Option<Intent> {
    let lower = normalize_text(tag).to_lowercase().replace(['-', ' '], "_");

    match lower.as_str() {
        "discover_places" | "discover" | "nearby" | "search" | "places" => {
            Some(Intent::DiscoverPlaces)
        }
        "get_details" | "details" | "describe" | "place_description" => Some(Intent::GetDetails),
        "plan_route" | "route" | "best_route" => Some(Intent::PlanRoute),
        "filter_by_preference" | "filter" | "rank" | "preferences" => {
            Some(Intent::FilterByPreference)
        }
        "composite" | "itinerary" | "plan_trip" | "generate_itinerary" => Some(Intent::Composite),
        "measure_distance" | "distance" | "calculate_distance" | "how_far" => {
            Some(Intent::MeasureDistance)
        }
        _ => None,
    }
}

/// Checks that the fields the intent depends on are present and sane.
///
/// Returns the normalized city when the request carries one.
pub fn validate_request(request: &QueryRequest) -> Result<Option<String>, RouterError> {
    let city = request
        .city
        .as_deref()
        .map(normalize_text)
        .filter(|city| !city.is_empty());

    let has_supplied_places = request
        .places
        .as_ref()
        .is_some_and(|places| !places.is_empty());

    match request.intent {
        Intent::DiscoverPlaces | Intent::FilterByPreference | Intent::Composite => {
            if city.is_none() {
                return Err(RouterError::invalid_request(format!(
                    "{} requires a city",
                    request.intent
                )));
            }
        }
        Intent::GetDetails => {
            let has_place_id = request
                .place_id
                .as_deref()
                .is_some_and(|id| !id.trim().is_empty());
            if !has_place_id {
                return Err(RouterError::invalid_request(
                    "get_details requires a place_id",
                ));
            }
        }
        Intent::PlanRoute => {
            if city.is_none() && !has_supplied_places {
                return Err(RouterError::invalid_request(
                    "plan_route requires a city or a list of places",
                ));
            }
        }
        Intent::MeasureDistance => {
            let has_both_ids = [&request.place_id, &request.to_place_id]
                .iter()
                .all(|id| id.as_deref().is_some_and(|id| !id.trim().is_empty()));
            if !has_both_ids {
                return Err(RouterError::invalid_request(
                    "measure_distance requires place_id and to_place_id",
                ));
            }
            if city.is_none() && !has_supplied_places {
                return Err(RouterError::invalid_request(
                    "measure_distance requires a city or a list of places",
                ));
            }
        }
    }

    if request.limit == Some(0) {
        return Err(RouterError::invalid_request("limit must be at least 1"));
    }

    if let Some(center) = &request.center {
        if !center.is_valid() {
            return Err(RouterError::invalid_request("center has invalid coordinates"));
        }
    }

    if let Some(radius) = request.radius_km {
        if !radius.is_finite() || radius <= 0.0 {
            return Err(RouterError::invalid_request(format!(
                "radius_km must be a positive number, got {radius}"
            )));
        }
        if request.center.is_none() {
            return Err(RouterError::invalid_request("radius_km requires a center"));
        }
    }

    if let Some(profile) = &request.preferences {
        validate_profile(profile).map_err(RouterError::invalid_request)?;
    }

    if let Some(places) = &request.places {
        if let Some(bad) = places.iter().find(|place| !place.coordinates.is_valid()) {
            return Err(RouterError::invalid_request(format!(
                "place {} has invalid coordinates",
                bad.id
            )));
        }
    }

    Ok(city)
}
