use crate::{air_quality, climate, health, routes, Cli};
use anyhow::anyhow;
use axum::{
    body::Body,
    extract::Request,
    middleware::{self, Next},
    response::IntoResponse,
    routing::get,
    Router,
};
use hyper::{
    header::{ACCEPT, CONTENT_TYPE},
    Method,
};
use log::{info, warn};
use readings::{
    AirQualityService, AirQualitySource, GridSampler, NasaPowerClient, SamplerConfig,
    SeriesProvider, WaqiClient,
};
use std::{sync::Arc, time::Duration};
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

#[derive(Clone)]
pub struct AppState {
    pub sampler: Arc<GridSampler>,
    pub air_quality: Option<Arc<AirQualityService>>,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::climate::climate,
        routes::air_quality::air_quality,
        routes::health::health,
    ),
    tags(
        (name = "envgrid api", description = "grid-aggregated daily climate readings and nearest-station air quality for a coordinate")
    )
)]
struct ApiDoc;

/// Wires the live upstream clients from configuration.
pub fn build_app_state_from_cli(cli: &Cli) -> Result<AppState, anyhow::Error> {
    let user_agent = cli.user_agent();
    let timeout = cli.upstream_timeout();

    let nasa = NasaPowerClient::new(cli.nasa_base_url(), &user_agent, timeout)
        .map_err(|e| anyhow!("error setting up NASA POWER client: {}", e))?
        .with_parameters(cli.nasa_parameters())
        .with_community(cli.nasa_community());

    let waqi: Option<Arc<dyn AirQualitySource>> = match cli.waqi_token() {
        Some(token) => Some(Arc::new(
            WaqiClient::new(cli.waqi_base_url(), token, &user_agent, timeout)
                .map_err(|e| anyhow!("error setting up WAQI client: {}", e))?,
        )),
        None => {
            warn!("no WAQI token configured, /air-quality will answer 503");
            None
        }
    };

    build_app_state(Arc::new(nasa), waqi, cli.sampler_config())
}

pub fn build_app_state(
    series: Arc<dyn SeriesProvider>,
    air_quality: Option<Arc<dyn AirQualitySource>>,
    config: SamplerConfig,
) -> Result<AppState, anyhow::Error> {
    let ttl = config.cache_ttl();
    let timeout = config.upstream_timeout();
    let sampler = GridSampler::new(series, config)
        .map_err(|e| anyhow!("error setting up grid sampler: {}", e))?;
    let air_quality =
        air_quality.map(|source| Arc::new(AirQualityService::new(source, ttl, timeout)));

    Ok(AppState {
        sampler: Arc::new(sampler),
        air_quality,
    })
}

pub fn app(app_state: AppState) -> Router {
    let api_docs = ApiDoc::openapi();
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([ACCEPT, CONTENT_TYPE])
        .allow_origin(Any)
        .max_age(Duration::from_secs(86400));

    Router::new()
        .route("/climate", get(climate))
        .route("/air-quality", get(air_quality))
        .route("/health", get(health))
        .with_state(Arc::new(app_state))
        .layer(middleware::from_fn(log_request))
        .merge(Scalar::with_url("/docs", api_docs))
        .layer(cors)
}

async fn log_request(request: Request<Body>, next: Next) -> impl IntoResponse {
    let now = time::OffsetDateTime::now_utc();
    let path = request
        .uri()
        .path_and_query()
        .map(|p| p.as_str().to_string())
        .unwrap_or_default();
    info!(target: "http_request", "new request, {} {}", request.method().as_str(), path);

    let response = next.run(request).await;
    let response_time = time::OffsetDateTime::now_utc() - now;
    info!(target: "http_response", "response, code: {}, time: {}", response.status().as_str(), response_time);

    response
}
