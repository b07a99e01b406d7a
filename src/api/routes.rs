use axum::{
    extract::{rejection::JsonRejection, Json, State},
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::api::models::{EndpointInfo, HealthResponse, ScrapeRequest, ScrapeResponse, ServiceStatus};
use crate::api::response::assemble;
use crate::config::CorsOrigins;
use crate::error::{AppError, Result};
use crate::extractor::{ensure_text_content, extract};
use crate::fetcher::PageSnapshot;
use crate::AppState;

pub fn create_router(app_state: AppState) -> Router {
    let cors = cors_layer(&app_state.config.cors);

    Router::new()
        .route("/", get(status_handler))
        .route("/health", get(health_handler))
        .route("/scrape", post(scrape_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

fn cors_layer(origins: &CorsOrigins) -> CorsLayer {
    let allow_origin = match origins {
        CorsOrigins::Any => AllowOrigin::from(Any),
        CorsOrigins::List(list) => AllowOrigin::list(list.iter().filter_map(|origin| {
            HeaderValue::from_str(origin)
                .map_err(|e| warn!(origin = %origin, "ignoring invalid CORS origin: {}", e))
                .ok()
        })),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

async fn status_handler() -> Json<ServiceStatus> {
    Json(ServiceStatus {
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        status: "running",
        endpoints: vec![
            EndpointInfo { method: "GET", path: "/", description: "API status" },
            EndpointInfo { method: "GET", path: "/health", description: "Health check" },
            EndpointInfo { method: "POST", path: "/scrape", description: "Scrape website" },
        ],
    })
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now().timestamp_millis() as f64 / 1000.0,
    })
}

async fn scrape_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ScrapeRequest>, JsonRejection>,
) -> Result<Json<ScrapeResponse>> {
    let start_time = Instant::now();

    let result = match payload {
        Ok(Json(req)) => process_scrape_request(&state, req).await,
        Err(rejection) => Err(AppError::from(rejection)),
    };

    match result {
        Ok(response) => {
            info!(
                url = %response.url,
                links = response.links_count,
                images = response.images_count,
                elapsed = ?start_time.elapsed(),
                "successfully scraped page"
            );
            Ok(Json(response))
        }
        Err(err) => {
            match &err {
                AppError::ValidationError(msg) => warn!("rejected scrape request: {}", msg),
                other => error!(elapsed = ?start_time.elapsed(), "scrape failed: {}", other),
            }
            Err(err)
        }
    }
}

async fn process_scrape_request(state: &AppState, req: ScrapeRequest) -> Result<ScrapeResponse> {
    let url = req
        .url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .ok_or_else(|| AppError::ValidationError("URL is required".to_string()))?;

    info!(url = %url, "processing scrape request");
    if req.use_playwright {
        debug!("usePlaywright requested; fetching statically");
    }

    let start_time = Instant::now();
    let PageSnapshot {
        html,
        final_url,
        content_type,
    } = state.fetcher.fetch(url).await?;
    ensure_text_content(content_type.as_deref())?;

    // The parsed DOM is not Send, so extraction stays on one blocking thread.
    let options = state.config.extract;
    let base_url = final_url.clone();
    let (html, content) = tokio::task::spawn_blocking(move || {
        let content = extract(&html, &base_url, options);
        (html, content)
    })
    .await?;

    Ok(assemble(
        &final_url,
        html,
        content,
        start_time.elapsed(),
        state.config.include_html,
    ))
}
