pub mod error;
pub mod geo;
pub mod intent;
pub mod models;
pub mod planner;
pub mod preference;
pub mod proximity;
pub mod route;

pub use error::{ErrorBody, ErrorKind, RouterError};
pub use geo::DistanceMetric;
pub use intent::{normalize_text, parse_intent, validate_request};
pub use models::*;
pub use planner::{
    compose_distance_text, compose_place_digest, compose_route_narrative, summarize_route,
};
pub use preference::{filter_by_preference, preference_score};
pub use proximity::rank_by_proximity;
pub use route::RouteOrderer;
