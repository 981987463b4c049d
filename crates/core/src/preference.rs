use crate::models::{Place, PreferenceProfile};

pub fn preference_score(place: &Place, profile: &PreferenceProfile) -> f64 {
    place.popularity * profile.weight(place.category)
}

/// Ranks places by `popularity * weight[category]`, highest first.
///
/// Places whose category is weighted at or below zero are dropped. The sort is
/// stable, so equal scores keep their input order.
pub fn filter_by_preference(places: Vec<Place>, profile: &PreferenceProfile) -> Vec<Place> {
    let mut scored = places
        .into_iter()
        .filter(|place| profile.weight(place.category) > 0.0)
        .map(|place| (preference_score(&place, profile), place))
        .collect::<Vec<_>>();

    scored.sort_by(|(a, _), (b, _)| b.total_cmp(a));

    scored.into_iter().map(|(_, place)| place).collect()
}

/// Rejects weights that would make the ranking meaningless.
pub fn validate_profile(profile: &PreferenceProfile) -> Result<(), String> {
    match profile.iter().find(|(_, weight)| !weight.is_finite()) {
        Some((category, weight)) => Err(format!(
            "preference weight for {category} must be a finite number, got {weight}"
        )),
        None => Ok(()),
    }
}
