use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use nr_core::{ArticleRecord, Error};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ScrapeParams {
    pub url: Option<String>,
}

/// Error body for the HTTP surface: `{"detail": "..."}`.
#[derive(Debug)]
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_caller_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        let detail = match &self.0 {
            Error::InvalidRequest(msg) | Error::ForbiddenDomain(msg) => msg.clone(),
            other => other.to_string(),
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

/// `GET /scrape?url=...`: scrape failures degrade to `[]`, only bad input is an error.
pub async fn scrape(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ScrapeParams>,
) -> Result<Json<Vec<ArticleRecord>>, ApiError> {
    let url = state.gate.validate(params.url.as_deref()).map_err(|e| {
        warn!("🚫 Rejected scrape request: {}", e);
        e
    })?;

    let report = state.manager.scrape(&url).await;
    info!(
        "📰 {} records for {} (layout: {}, tier: {})",
        report.records.len(),
        url,
        report.layout.as_deref().unwrap_or("none"),
        report.tier.map_or("none", |t| t.as_str())
    );
    Ok(Json(report.records))
}
