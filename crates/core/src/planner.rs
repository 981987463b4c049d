use crate::models::{DistanceSummary, Place, RouteResult, RouteSummary};

pub fn summarize_route(route: &RouteResult, city: Option<&str>) -> RouteSummary {
    let unit = route.metric.unit();

    let mut names = Vec::with_capacity(route.places.len() + 1);
    if let Some(city) = city {
        names.push(city.to_string());
    }
    names.extend(route.places.iter().map(|place| place.name.clone()));

    let path_text = if names.is_empty() {
        "No stops to visit".to_string()
    } else {
        format!(
            "{} (total {:.2} {})",
            names.join(" → "),
            route.total_distance,
            unit
        )
    };

    RouteSummary {
        stops: route.places.iter().map(|place| place.id.clone()).collect(),
        legs: route.legs.clone(),
        total_distance: route.total_distance,
        unit: unit.to_string(),
        path_text,
    }
}

/// Short walking-order instructions for an ordered route.
pub fn compose_route_narrative(route: &RouteResult, city: Option<&str>) -> String {
    let unit = route.metric.unit();
    let Some(first) = route.places.first() else {
        return match city {
            Some(city) => format!("No stops were resolved for {city}."),
            None => "No stops were resolved.".to_string(),
        };
    };

    let mut lines = Vec::with_capacity(route.places.len() + 1);
    lines.push(match city {
        Some(city) => format!("In {city}, start at {}.", first.name),
        None => format!("Start at {}.", first.name),
    });

    for (idx, leg) in route.legs.iter().enumerate() {
        lines.push(format!(
            "{}. Continue {:.2} {} to {}.",
            idx + 1,
            leg.distance,
            unit,
            leg.to
        ));
    }

    lines.push(format!(
        "{} stops, {:.2} {} in total.",
        route.places.len(),
        route.total_distance,
        unit
    ));

    lines.join("\n")
}

pub fn compose_distance_text(from: &Place, to: &Place, summary: &DistanceSummary) -> String {
    format!(
        "Distance between {} and {}: {:.2} {}",
        from.name, to.name, summary.distance, summary.unit
    )
}

/// One line per place, used when a response carries no richer description.
pub fn compose_place_digest(places: &[Place]) -> String {
    places
        .iter()
        .enumerate()
        .map(|(idx, place)| {
            format!(
                "{}. {} ({}, popularity {:.1})",
                idx + 1,
                place.name,
                place.category,
                place.popularity
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
