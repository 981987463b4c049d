mod config;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use travelmind_core::{
    compose_distance_text, compose_route_narrative, filter_by_preference, rank_by_proximity,
    summarize_route, validate_request, AggregatedResponse, CategorySet, DistanceSummary,
    ErrorKind, Intent, Place, QueryRequest, ResponseMeta, RouteOrderer, RouterError,
};
use travelmind_observability::AppMetrics;
use travelmind_sources::{DetailSource, PlaceSource};
use uuid::Uuid;

pub use config::{AppConfig, RouterConfig, SourceConfig};

/// Routes a structured travel query to the place and detail collaborators.
///
/// The router keeps no per-request state between calls; everything a request
/// produces lives in the returned [`AggregatedResponse`].
#[derive(Clone)]
pub struct QueryRouter<P, D>
where
    P: PlaceSource,
    D: DetailSource,
{
    places: Arc<P>,
    details: Arc<D>,
    orderer: RouteOrderer,
    config: RouterConfig,
    metrics: Arc<AppMetrics>,
}

impl<P, D> QueryRouter<P, D>
where
    P: PlaceSource,
    D: DetailSource,
{
    pub fn new(
        places: Arc<P>,
        details: Arc<D>,
        config: RouterConfig,
        metrics: Arc<AppMetrics>,
    ) -> Self {
        Self {
            places,
            details,
            orderer: RouteOrderer::new(config.distance_metric),
            config,
            metrics,
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub async fn handle(&self, request: QueryRequest) -> Result<AggregatedResponse, RouterError> {
        self.handle_with_cancel(request, CancellationToken::new())
            .await
    }

    /// Like [`handle`](Self::handle), but gives up with `RequestCancelled` as
    /// soon as `cancel` fires or the configured deadline passes.
    #[instrument(skip(self, request, cancel), fields(intent = %request.intent))]
    pub async fn handle_with_cancel(
        &self,
        request: QueryRequest,
        cancel: CancellationToken,
    ) -> Result<AggregatedResponse, RouterError> {
        let started = Instant::now();
        let request_id = Uuid::new_v4().to_string();
        self.metrics.inc_request(request.intent.as_code());

        let deadline = match self.config.request_timeout_ms {
            0 => Duration::MAX,
            ms => Duration::from_millis(ms),
        };

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(RouterError::cancelled("caller cancelled the request")),
            result = tokio::time::timeout(deadline, self.dispatch(&request)) => match result {
                Ok(result) => result,
                Err(_) => Err(RouterError::cancelled(format!(
                    "request exceeded {} ms",
                    self.config.request_timeout_ms
                ))),
            },
        };

        let elapsed = started.elapsed();
        self.metrics.observe_latency(elapsed);

        match outcome {
            Ok(mut response) => {
                if response.is_degraded() {
                    self.metrics.inc_degraded();
                }
                response.meta = Some(ResponseMeta {
                    request_id: request_id.clone(),
                    handled_at: Utc::now().to_rfc3339(),
                    elapsed_ms: elapsed.as_millis() as u64,
                });

                info!(
                    request_id = %request_id,
                    results = response.result_count(),
                    notices = response.notices.len(),
                    routed = response.route.is_some(),
                    "query handled"
                );
                Ok(response)
            }
            Err(err) => {
                if err.kind() == ErrorKind::RequestCancelled {
                    self.metrics.inc_cancelled();
                }
                self.metrics.inc_failure(err.kind().as_code());
                warn!(request_id = %request_id, kind = err.kind().as_code(), error = %err, "query failed");
                Err(err)
            }
        }
    }

    async fn dispatch(&self, request: &QueryRequest) -> Result<AggregatedResponse, RouterError> {
        let city = validate_request(request)?;
        let limit = request.limit.unwrap_or(self.config.max_results);

        match request.intent {
            Intent::DiscoverPlaces => {
                let city = require_city(city, request.intent)?;
                self.discover(request, city, limit).await
            }
            Intent::GetDetails => self.get_details(request, city).await,
            Intent::PlanRoute => self.plan_route(request, city, limit).await,
            Intent::FilterByPreference => {
                let city = require_city(city, request.intent)?;
                self.filter(request, city, limit).await
            }
            Intent::Composite => {
                let city = require_city(city, request.intent)?;
                self.composite(request, city, limit).await
            }
            Intent::MeasureDistance => self.measure_distance(request, city).await,
        }
    }

    async fn discover(
        &self,
        request: &QueryRequest,
        city: String,
        limit: usize,
    ) -> Result<AggregatedResponse, RouterError> {
        let found = self.search(&city, request.categories.as_ref()).await?;
        let mut places = narrow_to_center(request, found);
        places.truncate(limit);

        let mut response = AggregatedResponse::new(request.intent, Some(city));
        response.places = places;
        Ok(response)
    }

    async fn get_details(
        &self,
        request: &QueryRequest,
        city: Option<String>,
    ) -> Result<AggregatedResponse, RouterError> {
        let place_id = request.place_id.as_deref().unwrap_or_default().trim();

        let context = match (&request.places, &city) {
            (Some(supplied), _) if !supplied.is_empty() => Some(supplied.clone()),
            (_, Some(city)) => Some(self.search(city, None).await?),
            _ => None,
        };

        let place = match context {
            Some(places) => Some(
                places
                    .into_iter()
                    .find(|place| place.id == place_id)
                    .ok_or_else(|| RouterError::place_not_found(place_id))?,
            ),
            None => None,
        };

        self.metrics.add_upstream_calls(1);
        let description = self.details.describe(place_id).await?;

        let mut response = AggregatedResponse::new(request.intent, city);
        if let Some(mut place) = place {
            place.description = Some(description.clone());
            response.places.push(place);
        }
        response.description = Some(description);
        Ok(response)
    }

    async fn plan_route(
        &self,
        request: &QueryRequest,
        city: Option<String>,
        limit: usize,
    ) -> Result<AggregatedResponse, RouterError> {
        let places = match (&request.places, &city) {
            (Some(supplied), _) if !supplied.is_empty() => sanitize_places(supplied.clone()),
            (_, Some(city)) => {
                let found = self.search(city, request.categories.as_ref()).await?;
                let mut places = narrow_to_center(request, found);
                places.truncate(limit);
                places
            }
            _ => Vec::new(),
        };

        if places.len() < 2 {
            return Err(RouterError::InsufficientPlaces {
                required: 2,
                found: places.len(),
            });
        }

        let route = self.orderer.order(places);
        debug!(
            stops = route.places.len(),
            total_distance = route.total_distance,
            "route ordered"
        );

        let mut response = AggregatedResponse::new(request.intent, city);
        response.route = Some(summarize_route(&route, response.city.as_deref()));
        response.description = Some(compose_route_narrative(&route, response.city.as_deref()));
        response.places = route.places;
        Ok(response)
    }

    async fn filter(
        &self,
        request: &QueryRequest,
        city: String,
        limit: usize,
    ) -> Result<AggregatedResponse, RouterError> {
        let found = self.search(&city, request.categories.as_ref()).await?;
        let places = narrow_to_center(request, found);
        let profile = request.preferences.clone().unwrap_or_default();

        let mut ranked = filter_by_preference(places, &profile);
        ranked.truncate(limit);

        let mut response = AggregatedResponse::new(request.intent, Some(city));
        response.places = ranked;
        Ok(response)
    }

    /// discover → filter → enrich → order. Hard failures abort the chain;
    /// missing places or details degrade to notices.
    async fn composite(
        &self,
        request: &QueryRequest,
        city: String,
        limit: usize,
    ) -> Result<AggregatedResponse, RouterError> {
        let mut response = AggregatedResponse::new(request.intent, Some(city.clone()));

        let places = match self.search(&city, request.categories.as_ref()).await {
            Ok(places) => places,
            Err(err) if err.is_degradable() => {
                warn!(city = %city, error = %err, "discovery degraded to an empty set");
                response.push_notice(err.kind(), err.to_string());
                Vec::new()
            }
            Err(err) => return Err(err),
        };

        let discovered = places.len();
        let places = narrow_to_center(request, places);
        let nearby = places.len();

        let profile = request.preferences.clone().unwrap_or_default();
        let mut ranked = filter_by_preference(places, &profile);
        ranked.truncate(limit);

        if ranked.is_empty() && response.notices.is_empty() {
            let message = if discovered == 0 {
                format!("no places matched the request in {city}")
            } else if nearby == 0 {
                format!("none of the {discovered} places in {city} lie within the search radius")
            } else {
                format!("preference weights excluded all {nearby} places found in {city}")
            };
            response.push_notice(ErrorKind::NoPlacesFound, message);
        }

        if request.include_details {
            self.enrich(&mut ranked, &mut response).await?;
        }

        let route = self.orderer.order(ranked);
        response.route = Some(summarize_route(&route, Some(&city)));
        if !route.places.is_empty() {
            response.description = Some(compose_route_narrative(&route, Some(&city)));
        }
        response.places = route.places;
        Ok(response)
    }

    async fn measure_distance(
        &self,
        request: &QueryRequest,
        city: Option<String>,
    ) -> Result<AggregatedResponse, RouterError> {
        let places = match (&request.places, &city) {
            (Some(supplied), _) if !supplied.is_empty() => sanitize_places(supplied.clone()),
            (_, Some(city)) => self.search(city, None).await?,
            _ => Vec::new(),
        };

        let from_id = request.place_id.as_deref().unwrap_or_default().trim();
        let to_id = request.to_place_id.as_deref().unwrap_or_default().trim();
        let find = |id: &str| {
            places
                .iter()
                .find(|place| place.id == id)
                .cloned()
                .ok_or_else(|| RouterError::place_not_found(id))
        };
        let from = find(from_id)?;
        let to = find(to_id)?;

        let summary = DistanceSummary {
            from: from.id.clone(),
            to: to.id.clone(),
            distance: self.orderer.distance(&from, &to),
            unit: self.orderer.metric().unit().to_string(),
        };
        debug!(from = %summary.from, to = %summary.to, distance = summary.distance, "distance measured");

        let mut response = AggregatedResponse::new(request.intent, city);
        response.description = Some(compose_distance_text(&from, &to, &summary));
        response.distance = Some(summary);
        response.places = vec![from, to];
        Ok(response)
    }

    /// Fetches descriptions for the leading places concurrently and waits for
    /// all of them before touching the list.
    async fn enrich(
        &self,
        places: &mut [Place],
        response: &mut AggregatedResponse,
    ) -> Result<(), RouterError> {
        let ids = places
            .iter()
            .filter(|place| place.description.is_none())
            .take(self.config.max_enriched)
            .map(|place| place.id.clone())
            .collect::<Vec<_>>();

        if ids.is_empty() {
            return Ok(());
        }

        self.metrics.add_upstream_calls(ids.len());
        let results = join_all(ids.iter().map(|id| self.details.describe(id))).await;

        for (id, result) in ids.iter().zip(results) {
            match result {
                Ok(text) => {
                    if let Some(place) = places.iter_mut().find(|place| &place.id == id) {
                        place.description = Some(text);
                    }
                }
                Err(err) if err.is_degradable() => {
                    debug!(place_id = %id, error = %err, "detail lookup skipped");
                    response.push_notice(err.kind(), err.to_string());
                }
                Err(err) => return Err(err),
            }
        }

        Ok(())
    }

    async fn search(
        &self,
        city: &str,
        categories: Option<&CategorySet>,
    ) -> Result<Vec<Place>, RouterError> {
        // An empty set carries no filter.
        let categories = categories.filter(|set| !set.is_empty());

        self.metrics.add_upstream_calls(1);
        let found = self.places.search(city, categories).await?;
        let fetched = found.len();

        let mut places = sanitize_places(found);
        // Sources may ignore the category hint.
        if let Some(categories) = categories {
            places.retain(|place| categories.contains(&place.category));
        }

        debug!(city, fetched, kept = places.len(), "places discovered");
        Ok(places)
    }
}

fn require_city(city: Option<String>, intent: Intent) -> Result<String, RouterError> {
    city.ok_or_else(|| RouterError::invalid_request(format!("{intent} requires a city")))
}

fn narrow_to_center(request: &QueryRequest, places: Vec<Place>) -> Vec<Place> {
    match request.center {
        Some(center) => rank_by_proximity(places, center, request.radius_km),
        None => places,
    }
}

/// Drops unnamed places, unusable coordinates and repeated ids (first wins).
/// A popularity that is not a finite number counts as zero.
fn sanitize_places(places: Vec<Place>) -> Vec<Place> {
    let mut seen = HashSet::new();
    places
        .into_iter()
        .filter(|place| !place.id.trim().is_empty() && !place.name.trim().is_empty())
        .filter(|place| place.coordinates.is_valid())
        .filter(|place| seen.insert(place.id.clone()))
        .map(|mut place| {
            if !place.popularity.is_finite() {
                place.popularity = 0.0;
            }
            place
        })
        .collect()
}
