use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use travelmind_agents::{AppConfig, QueryRouter};
use travelmind_core::{
    compose_place_digest, normalize_text, parse_intent, AggregatedResponse, Category,
    Coordinates, Intent, PreferenceProfile, QueryRequest, RouterError,
};
use travelmind_observability::{init_tracing, AppMetrics};
use travelmind_sources::{MemoryCatalog, Retrying};

type CatalogRouter = QueryRouter<Retrying<MemoryCatalog>, Retrying<MemoryCatalog>>;

#[derive(Debug, Parser)]
#[command(name = "travelmind")]
#[command(about = "TravelMind place discovery and route planning")]
struct Cli {
    /// JSON catalog of places grouped by city.
    #[arg(long, env = "TRAVELMIND_CATALOG")]
    catalog: Option<PathBuf>,

    /// Optional JSON config file; `TRAVELMIND_*` variables override it.
    #[arg(long, env = "TRAVELMIND_CONFIG")]
    config: Option<PathBuf>,

    /// Print a plain-text digest instead of JSON.
    #[arg(long, global = true)]
    text: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a request read from a JSON file.
    Request { path: PathBuf },
    Discover {
        city: String,
        #[arg(long = "category", value_parser = parse_category)]
        categories: Vec<Category>,
        #[arg(long)]
        limit: Option<usize>,
        /// Search around `<lat>,<lon>`, nearest first.
        #[arg(long, value_parser = parse_coordinates)]
        near: Option<Coordinates>,
        /// Radius in km around `--near`.
        #[arg(long, requires = "near")]
        radius: Option<f64>,
    },
    /// Straight-line distance between two places of a city.
    Distance {
        city: String,
        from: String,
        to: String,
    },
    Details {
        place_id: String,
        #[arg(long)]
        city: Option<String>,
    },
    Route {
        city: String,
        #[arg(long = "category", value_parser = parse_category)]
        categories: Vec<Category>,
        #[arg(long)]
        limit: Option<usize>,
    },
    Filter {
        city: String,
        /// Category weight, e.g. `--weight museum=2.5`.
        #[arg(long = "weight", value_parser = parse_weight)]
        weights: Vec<(Category, f64)>,
        #[arg(long)]
        limit: Option<usize>,
    },
    Composite {
        city: String,
        #[arg(long = "category", value_parser = parse_category)]
        categories: Vec<Category>,
        #[arg(long = "weight", value_parser = parse_weight)]
        weights: Vec<(Category, f64)>,
        #[arg(long)]
        details: bool,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Read `<action> <city or place id>` lines from stdin.
    Shell,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("travelmind_cli");
    let cli = Cli::parse();

    let router = build_router(&cli)?;

    let request = match cli.command {
        Command::Shell => return run_shell(&router, cli.text).await,
        Command::Request { path } => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("failed reading request {}", path.display()))?;
            serde_json::from_str::<QueryRequest>(&raw)
                .with_context(|| format!("failed parsing request {}", path.display()))?
        }
        Command::Discover {
            city,
            categories,
            limit,
            near,
            radius,
        } => {
            let mut request = with_optional(QueryRequest::discover(city), categories, limit);
            request.center = near;
            request.radius_km = radius;
            request
        }
        Command::Distance { city, from, to } => QueryRequest::measure(city, from, to),
        Command::Details { place_id, city } => {
            let request = QueryRequest::details(place_id);
            match city {
                Some(city) => request.with_city(city),
                None => request,
            }
        }
        Command::Route {
            city,
            categories,
            limit,
        } => with_optional(QueryRequest::plan_route(city), categories, limit),
        Command::Filter {
            city,
            weights,
            limit,
        } => with_optional(
            QueryRequest::filter(city, weights.into_iter().collect()),
            Vec::new(),
            limit,
        ),
        Command::Composite {
            city,
            categories,
            weights,
            details,
            limit,
        } => with_optional(
            QueryRequest::composite(city)
                .with_preferences(weights.into_iter().collect::<PreferenceProfile>())
                .with_details(details),
            categories,
            limit,
        ),
    };

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    match router.handle_with_cancel(request, cancel).await {
        Ok(response) => print_response(&response, cli.text),
        Err(err) => {
            println!("{}", serde_json::to_string_pretty(&err.to_body())?);
            std::process::exit(exit_code(&err));
        }
    }
}

/// 2 for requests the caller must fix, 1 for everything else.
fn exit_code(err: &RouterError) -> i32 {
    if err.is_caller_error() {
        2
    } else {
        1
    }
}

async fn run_shell(router: &CatalogRouter, text: bool) -> Result<()> {
    println!("TravelMind shell. e.g. 'route Jaipur', 'details amber-fort'. type 'exit' to quit.");

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            break;
        }

        let line = normalize_text(&line);
        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }
        if line.is_empty() {
            continue;
        }

        let (action, target) = line.split_once(' ').unwrap_or((line.as_str(), ""));
        let Some(intent) = parse_intent(action) else {
            println!("unknown action '{action}'");
            continue;
        };

        let request = match intent {
            Intent::GetDetails => QueryRequest::details(target),
            other => QueryRequest::new(other).with_city(target),
        };

        match router.handle(request).await {
            Ok(response) => print_response(&response, text)?,
            Err(err) => println!("{}", serde_json::to_string_pretty(&err.to_body())?),
        }
    }

    Ok(())
}

fn build_router(cli: &Cli) -> Result<CatalogRouter> {
    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(catalog) = &cli.catalog {
        config.sources.catalog_path = Some(catalog.clone());
    }

    let catalog = match &config.sources.catalog_path {
        Some(path) => MemoryCatalog::from_file(path)?,
        None => bail!("no catalog given; pass --catalog or set TRAVELMIND_CATALOG"),
    };
    tracing::info!(
        cities = catalog.city_count(),
        places = catalog.place_count(),
        "catalog loaded"
    );

    let source = Arc::new(Retrying::new(catalog, config.sources.retry));
    Ok(QueryRouter::new(
        source.clone(),
        source,
        config.router,
        AppMetrics::shared(),
    ))
}

fn with_optional(
    request: QueryRequest,
    categories: Vec<Category>,
    limit: Option<usize>,
) -> QueryRequest {
    let request = if categories.is_empty() {
        request
    } else {
        request.with_categories(categories)
    };
    match limit {
        Some(limit) => request.with_limit(limit),
        None => request,
    }
}

fn print_response(response: &AggregatedResponse, text: bool) -> Result<()> {
    if !text {
        println!("{}", serde_json::to_string_pretty(response)?);
        return Ok(());
    }

    if response.places.is_empty() {
        println!("No places found.");
    } else {
        println!("{}", compose_place_digest(&response.places));
    }
    if let Some(distance) = &response.distance {
        println!("\n{:.2} {}", distance.distance, distance.unit);
    }
    if let Some(route) = &response.route {
        println!("\n{}", route.path_text);
    }
    if let Some(description) = &response.description {
        println!("\n{description}");
    }
    for notice in &response.notices {
        println!("note: {}", notice.message);
    }
    Ok(())
}

fn parse_category(value: &str) -> Result<Category, String> {
    Category::parse(value).ok_or_else(|| format!("unknown category '{value}'"))
}

fn parse_coordinates(value: &str) -> Result<Coordinates, String> {
    let (lat, lon) = value
        .split_once(',')
        .ok_or_else(|| format!("expected <lat>,<lon>, got '{value}'"))?;
    let parse = |part: &str| {
        part.trim()
            .parse::<f64>()
            .map_err(|_| format!("'{part}' is not a coordinate"))
    };
    let coordinates = Coordinates::new(parse(lat)?, parse(lon)?);
    if coordinates.is_valid() {
        Ok(coordinates)
    } else {
        Err(format!("'{value}' is outside the valid lat/lon range"))
    }
}

fn parse_weight(value: &str) -> Result<(Category, f64), String> {
    let (category, weight) = value
        .split_once('=')
        .ok_or_else(|| format!("expected <category>=<weight>, got '{value}'"))?;
    let category = parse_category(category)?;
    let weight = weight
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("weight for {category} is not a number: '{weight}'"))?;
    Ok((category, weight))
}
