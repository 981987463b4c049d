use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use travelmind_agents::{QueryRouter, RouterConfig};
use travelmind_core::{
    Category, Coordinates, DistanceMetric, ErrorKind, Intent, Place, PreferenceProfile,
    QueryRequest, RouteOrderer, RouterError,
};
use travelmind_observability::AppMetrics;
use travelmind_sources::{MemoryCatalog, RetryPolicy, Retrying};
use travelmind_tests::{place, square_city, ScriptedSource};

type ScriptedRouter = QueryRouter<Retrying<ScriptedSource>, Retrying<ScriptedSource>>;

fn planar() -> RouterConfig {
    RouterConfig {
        distance_metric: DistanceMetric::Planar,
        ..RouterConfig::default()
    }
}

fn router_with(
    source: &ScriptedSource,
    config: RouterConfig,
    retry: RetryPolicy,
) -> (ScriptedRouter, Arc<AppMetrics>) {
    let metrics = AppMetrics::shared();
    let wrapped = Arc::new(Retrying::new(source.clone(), retry));
    let router = QueryRouter::new(wrapped.clone(), wrapped, config, metrics.clone());
    (router, metrics)
}

#[tokio::test]
async fn route_is_never_longer_than_input_order() {
    let source = ScriptedSource::new().with_city("Square", square_city());
    let (router, _) = router_with(&source, planar(), RetryPolicy::none());

    let response = router
        .handle(QueryRequest::plan_route("Square"))
        .await
        .unwrap();

    let route = response.route.unwrap();
    let identity = RouteOrderer::new(DistanceMetric::Planar).path_length(&square_city());
    assert!(route.total_distance <= identity);
    assert!((route.total_distance - 3.0).abs() < 1e-9);
    assert_eq!(
        route.stops,
        vec!["north-west", "north-east", "south-east", "south-west"]
    );
    assert_eq!(route.unit, "deg");
}

#[tokio::test]
async fn jaipur_quadrilateral_beats_listed_order() {
    let listed = vec![
        place("amber-fort", Category::Landmark, 26.9855, 75.8513, 9.0),
        place("albert-hall", Category::Museum, 26.9116, 75.8195, 7.0),
        place("hawa-mahal", Category::Landmark, 26.9239, 75.8267, 8.0),
        place("jal-mahal", Category::Attraction, 26.9535, 75.8462, 6.0),
    ];
    let source = ScriptedSource::new().with_city("Jaipur", listed.clone());
    let (router, _) = router_with(&source, RouterConfig::default(), RetryPolicy::none());

    let response = router
        .handle(QueryRequest::plan_route("  jaipur "))
        .await
        .unwrap();

    let route = response.route.unwrap();
    let identity = RouteOrderer::new(DistanceMetric::Haversine).path_length(&listed);
    assert!(route.total_distance <= identity);
    assert_eq!(
        route.stops,
        vec!["amber-fort", "jal-mahal", "hawa-mahal", "albert-hall"]
    );
    assert_eq!(route.unit, "km");
    assert_eq!(response.city.as_deref(), Some("jaipur"));
}

#[tokio::test]
async fn supplied_places_are_permuted_not_altered() {
    let source = ScriptedSource::new();
    let (router, _) = router_with(&source, planar(), RetryPolicy::none());
    let orderer = RouteOrderer::new(DistanceMetric::Planar);

    let base = square_city();
    for rotation in 0..base.len() {
        let mut input = base.clone();
        input.rotate_left(rotation);

        let response = router
            .handle(QueryRequest::new(Intent::PlanRoute).with_places(input.clone()))
            .await
            .unwrap();

        assert_eq!(response.places[0], input[0]);
        let mut got = response.places.clone();
        let mut want = input.clone();
        got.sort_by(|a, b| a.id.cmp(&b.id));
        want.sort_by(|a, b| a.id.cmp(&b.id));
        assert_eq!(got, want);

        let total = response.route.unwrap().total_distance;
        assert!(total <= orderer.path_length(&input) + 1e-9);
    }
    assert_eq!(source.search_calls(), 0);
}

#[tokio::test]
async fn unknown_place_in_known_city_is_not_found() {
    let source = ScriptedSource::new().with_city("Square", square_city());
    let (router, _) = router_with(&source, planar(), RetryPolicy::none());

    let err = router
        .handle(QueryRequest::details("lighthouse").with_city("Square"))
        .await
        .unwrap_err();

    assert_eq!(err, RouterError::place_not_found("lighthouse"));
    assert!(!err.is_retryable());
    assert!(source.describe_calls().is_empty());
}

#[tokio::test]
async fn composite_with_no_places_is_empty_not_an_error() {
    let source = ScriptedSource::new().with_city("Ghost Town", Vec::new());
    let (router, metrics) = router_with(&source, planar(), RetryPolicy::none());

    let response = router
        .handle(QueryRequest::composite("Ghost Town").with_details(true))
        .await
        .unwrap();

    assert!(response.places.is_empty());
    assert_eq!(response.notices.len(), 1);
    assert_eq!(response.notices[0].kind, ErrorKind::NoPlacesFound);
    assert!(source.describe_calls().is_empty());
    assert_eq!(metrics.snapshot().degraded_total, 1);
}

#[tokio::test]
async fn transient_search_failures_are_retried() {
    let source = ScriptedSource::new()
        .with_city("Square", square_city())
        .failing_searches([
            RouterError::upstream("places", "503"),
            RouterError::upstream("places", "timeout"),
        ]);
    let (router, _) = router_with(&source, planar(), RetryPolicy::immediate(2));

    let response = router
        .handle(QueryRequest::discover("Square"))
        .await
        .unwrap();

    assert_eq!(response.result_count(), 4);
    assert_eq!(source.search_calls(), 3);
}

#[tokio::test]
async fn exhausted_retries_surface_upstream_unavailable() {
    let source = ScriptedSource::new()
        .with_city("Square", square_city())
        .failing_searches((0..3).map(|_| RouterError::upstream("places", "connection refused")));
    let (router, metrics) = router_with(&source, planar(), RetryPolicy::immediate(2));

    let err = router
        .handle(QueryRequest::composite("Square"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UpstreamUnavailable);
    assert!(!err.is_caller_error());
    assert_eq!(source.search_calls(), 3);
    assert_eq!(metrics.snapshot().failures_total, 1);
}

#[tokio::test]
async fn unknown_city_is_not_retried() {
    let source = ScriptedSource::new();
    let (router, _) = router_with(&source, planar(), RetryPolicy::immediate(3));

    let err = router
        .handle(QueryRequest::discover("Atlantis"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NoPlacesFound);
    assert_eq!(source.search_calls(), 1);
}

#[tokio::test]
async fn enrichment_gathers_all_lookups_and_notes_missing_ones() {
    let source = ScriptedSource::new()
        .with_city("Square", square_city())
        .with_description("north-west", "Old observatory.")
        .with_description("north-east", "Clock tower.");
    let config = RouterConfig {
        max_enriched: 3,
        ..planar()
    };
    let (router, _) = router_with(&source, config, RetryPolicy::none());

    let response = router
        .handle(QueryRequest::composite("Square").with_details(true))
        .await
        .unwrap();

    let mut looked_up = source.describe_calls();
    looked_up.sort();
    assert_eq!(looked_up, vec!["north-east", "north-west", "south-east"]);

    assert_eq!(response.result_count(), 4);
    assert_eq!(response.notices.len(), 1);
    assert_eq!(response.notices[0].kind, ErrorKind::PlaceNotFound);

    let described = response
        .places
        .iter()
        .filter_map(|place| place.description.as_deref())
        .collect::<Vec<_>>();
    assert_eq!(described.len(), 2);
}

#[tokio::test]
async fn upstream_failure_during_enrichment_aborts() {
    let source = ScriptedSource::new()
        .with_city("Square", square_city())
        .failing_describe("south-east", RouterError::upstream("details", "502"));
    let (router, _) = router_with(&source, planar(), RetryPolicy::immediate(1));

    let err = router
        .handle(QueryRequest::composite("Square").with_details(true))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UpstreamUnavailable);
    let retried = source
        .describe_calls()
        .iter()
        .filter(|id| id.as_str() == "south-east")
        .count();
    assert_eq!(retried, 2);
}

#[tokio::test]
async fn composite_ranks_then_orders() {
    let source = ScriptedSource::new().with_city(
        "Line",
        vec![
            place("far-mall", Category::Mall, 0.0, 9.0, 9.0),
            place("museum-a", Category::Museum, 0.0, 0.0, 5.0),
            place("museum-b", Category::Museum, 0.0, 2.0, 4.0),
            place("park", Category::Park, 0.0, 1.0, 3.0),
        ],
    );
    let (router, _) = router_with(&source, planar(), RetryPolicy::none());

    let profile = PreferenceProfile::new()
        .with_weight(Category::Museum, 3.0)
        .with_weight(Category::Mall, 0.0);
    let response = router
        .handle(
            QueryRequest::composite("Line")
                .with_preferences(profile)
                .with_limit(3),
        )
        .await
        .unwrap();

    let stops = response.route.as_ref().unwrap().stops.clone();
    assert_eq!(stops, vec!["museum-a", "park", "museum-b"]);
    assert!(response.description.is_some());
}

#[tokio::test]
async fn cancelled_token_short_circuits() {
    let source = ScriptedSource::new().with_city("Square", square_city());
    let (router, metrics) = router_with(&source, planar(), RetryPolicy::none());

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = router
        .handle_with_cancel(QueryRequest::discover("Square"), cancel)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::RequestCancelled);
    assert_eq!(metrics.snapshot().cancelled_total, 1);
}

#[tokio::test]
async fn cancelling_mid_flight_stops_waiting() {
    let source = ScriptedSource::new()
        .with_city("Square", square_city())
        .with_delay(Duration::from_secs(5));
    let (router, _) = router_with(&source, planar(), RetryPolicy::none());

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let err = tokio::time::timeout(
        Duration::from_secs(2),
        router.handle_with_cancel(QueryRequest::plan_route("Square"), cancel),
    )
    .await
    .expect("cancellation should end the request promptly")
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::RequestCancelled);
}

#[tokio::test]
async fn deadline_turns_slow_sources_into_cancellation() {
    let source = ScriptedSource::new()
        .with_city("Square", square_city())
        .with_delay(Duration::from_secs(5));
    let config = RouterConfig {
        request_timeout_ms: 30,
        ..planar()
    };
    let (router, _) = router_with(&source, config, RetryPolicy::none());

    let err = router
        .handle(QueryRequest::discover("Square"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::RequestCancelled);
    assert!(err.to_string().contains("30 ms"));
}

#[tokio::test]
async fn json_request_round_trips_through_router() {
    let source = ScriptedSource::new().with_city("Square", square_city());
    let (router, _) = router_with(&source, planar(), RetryPolicy::none());

    let request: QueryRequest = serde_json::from_str(
        r#"{ "intent": "filter_by_preference", "city": "square", "preferences": { "park": 4.0 } }"#,
    )
    .unwrap();
    let response = router.handle(request).await.unwrap();

    assert_eq!(response.places[0].id, "south-east");
    let body = serde_json::to_value(&response).unwrap();
    assert_eq!(body["intent"], "filter_by_preference");
    assert!(body["meta"]["request_id"].is_string());
}

#[tokio::test]
async fn bundled_catalog_answers_bundled_request() {
    let root = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../data");
    let catalog = Arc::new(MemoryCatalog::from_file(root.join("catalog.json")).unwrap());
    let raw = std::fs::read_to_string(root.join("composite_request.json")).unwrap();
    let request: QueryRequest = serde_json::from_str(&raw).unwrap();

    let router = QueryRouter::new(
        catalog.clone(),
        catalog,
        RouterConfig::default(),
        AppMetrics::shared(),
    );
    let response = router.handle(request).await.unwrap();

    assert_eq!(response.result_count(), 4);
    assert!(response
        .places
        .iter()
        .all(|place| place.category != Category::Mall));
    assert!(response.places.iter().all(|place| place.description.is_some()));
    assert!(response.notices.is_empty());
    assert_eq!(response.route.unwrap().stops[0], "indian-museum");
}

fn jaipur_landmarks() -> Vec<Place> {
    vec![
        place("amber-fort", Category::Landmark, 26.9855, 75.8513, 9.0),
        place("albert-hall", Category::Museum, 26.9116, 75.8195, 7.0),
        place("jantar-mantar", Category::Landmark, 26.9248, 75.8246, 8.0),
        place("jantar-mantar-gate", Category::Landmark, 26.9262, 75.8230, 2.0),
        place("jal-mahal", Category::Attraction, 26.9535, 75.8462, 6.0),
    ]
}

#[tokio::test]
async fn radius_search_keeps_close_places_nearest_first() {
    let mut places = jaipur_landmarks();
    places[3].name = "Jantar Mantar".to_string();
    let source = ScriptedSource::new().with_city("Jaipur", places);
    let (router, _) = router_with(&source, RouterConfig::default(), RetryPolicy::none());

    let hawa_mahal = Coordinates::new(26.9239, 75.8267);
    let response = router
        .handle(QueryRequest::nearby("Jaipur", hawa_mahal, 5.0))
        .await
        .unwrap();

    let ids = response
        .places
        .iter()
        .map(|place| place.id.as_str())
        .collect::<Vec<_>>();
    assert_eq!(ids, vec!["jantar-mantar", "albert-hall", "jal-mahal"]);

    let distances = response
        .places
        .iter()
        .map(|place| place.distance_km.unwrap())
        .collect::<Vec<_>>();
    assert!(distances.windows(2).all(|pair| pair[0] <= pair[1]));
    assert!(distances.iter().all(|km| *km <= 5.0));
}

#[tokio::test]
async fn radius_without_center_is_rejected() {
    let source = ScriptedSource::new().with_city("Jaipur", jaipur_landmarks());
    let (router, _) = router_with(&source, RouterConfig::default(), RetryPolicy::none());

    let request: QueryRequest = serde_json::from_str(
        r#"{ "intent": "discover_places", "city": "Jaipur", "radius_km": 2.0 }"#,
    )
    .unwrap();
    let err = router.handle(request).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    assert_eq!(source.search_calls(), 0);
}

#[tokio::test]
async fn distance_between_two_places_uses_configured_metric() {
    let source = ScriptedSource::new().with_city("Square", square_city());
    let (router, _) = router_with(&source, planar(), RetryPolicy::none());

    let response = router
        .handle(QueryRequest::measure("Square", "south-west", "north-east"))
        .await
        .unwrap();

    let distance = response.distance.unwrap();
    assert!((distance.distance - 2f64.sqrt()).abs() < 1e-12);
    assert_eq!(distance.unit, "deg");
    assert_eq!(
        response.description.as_deref(),
        Some("Distance between South West and North East: 1.41 deg")
    );

    let err = router
        .handle(QueryRequest::measure("Square", "south-west", "lighthouse"))
        .await
        .unwrap_err();
    assert_eq!(err, RouterError::place_not_found("lighthouse"));
}

#[tokio::test]
async fn empty_category_list_in_json_means_no_filter() {
    let source = ScriptedSource::new().with_city("Square", square_city());
    let (router, _) = router_with(&source, planar(), RetryPolicy::none());

    let discover: QueryRequest = serde_json::from_str(
        r#"{ "intent": "discover_places", "city": "Square", "categories": [] }"#,
    )
    .unwrap();
    assert_eq!(router.handle(discover).await.unwrap().result_count(), 4);

    let route: QueryRequest =
        serde_json::from_str(r#"{ "intent": "plan_route", "city": "Square", "categories": [] }"#)
            .unwrap();
    let response = router.handle(route).await.unwrap();
    assert_eq!(response.route.unwrap().stops.len(), 4);
}

#[tokio::test]
async fn unusable_popularity_never_outranks_real_scores() {
    let mut places = square_city();
    places[3].popularity = f64::NAN;
    let source = ScriptedSource::new().with_city("Square", places);
    let (router, _) = router_with(&source, planar(), RetryPolicy::none());

    let response = router
        .handle(QueryRequest::filter("Square", PreferenceProfile::new()))
        .await
        .unwrap();

    assert_eq!(response.places[0].id, "north-west");
    assert_eq!(response.places[3].id, "south-west");
    assert_eq!(response.places[3].popularity, 0.0);
}

#[tokio::test]
async fn composite_explains_when_preferences_exclude_everything() {
    let source = ScriptedSource::new().with_city("Square", square_city());
    let (router, metrics) = router_with(&source, planar(), RetryPolicy::none());

    let profile = [Category::Museum, Category::Park, Category::Landmark, Category::Mall]
        .into_iter()
        .map(|category| (category, 0.0))
        .collect::<PreferenceProfile>();
    let response = router
        .handle(QueryRequest::composite("Square").with_preferences(profile))
        .await
        .unwrap();

    assert!(response.places.is_empty());
    assert_eq!(response.notices.len(), 1);
    assert_eq!(response.notices[0].kind, ErrorKind::NoPlacesFound);
    assert!(response.notices[0].message.contains("preference weights"));
    assert_eq!(metrics.snapshot().degraded_total, 1);
}
