use crate::geo::DistanceMetric;
use crate::models::{Place, RouteLeg, RouteResult};

/// Orders stops with a greedy nearest-neighbour walk.
///
/// The walk starts at the first input place and always moves to the closest
/// unvisited place, preferring the lower input index on ties. It runs in
/// O(n²) and gives a short path, not the shortest one.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouteOrderer {
    metric: DistanceMetric,
}

impl RouteOrderer {
    pub fn new(metric: DistanceMetric) -> Self {
        Self { metric }
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    pub fn distance(&self, a: &Place, b: &Place) -> f64 {
        self.metric.distance(a.coordinates, b.coordinates)
    }

    pub fn order(&self, places: Vec<Place>) -> RouteResult {
        if places.len() < 2 {
            return RouteResult {
                places,
                total_distance: 0.0,
                legs: Vec::new(),
                metric: self.metric,
            };
        }

        let mut visited = vec![false; places.len()];
        let mut sequence = Vec::with_capacity(places.len());
        let mut legs = Vec::with_capacity(places.len() - 1);
        let mut total_distance = 0.0;

        let mut current = 0;
        visited[current] = true;
        sequence.push(current);

        while sequence.len() < places.len() {
            let mut best: Option<(usize, f64)> = None;
            for (idx, place) in places.iter().enumerate() {
                if visited[idx] {
                    continue;
                }
                let d = self.distance(&places[current], place);
                // Strict comparison keeps the earliest index on ties.
                if best.map_or(true, |(_, best_d)| d < best_d) {
                    best = Some((idx, d));
                }
            }

            let Some((next, d)) = best else {
                break;
            };

            legs.push(RouteLeg {
                from: places[current].name.clone(),
                to: places[next].name.clone(),
                distance: d,
            });
            total_distance += d;
            visited[next] = true;
            sequence.push(next);
            current = next;
        }

        let mut slots = places.into_iter().map(Some).collect::<Vec<_>>();
        let ordered = sequence
            .into_iter()
            .filter_map(|idx| slots[idx].take())
            .collect();

        RouteResult {
            places: ordered,
            total_distance,
            legs,
            metric: self.metric,
        }
    }

    /// Length of the path visiting `places` exactly in the given order.
    pub fn path_length(&self, places: &[Place]) -> f64 {
        places
            .windows(2)
            .map(|pair| self.distance(&pair[0], &pair[1]))
            .sum()
    }
}
