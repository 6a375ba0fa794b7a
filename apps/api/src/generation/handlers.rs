//! Axum route handler for the Generation API.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::auth::extractor::CurrentUser;
use crate::errors::AppError;
use crate::generation::graph::run_graph;
use crate::state::AppState;

const QUERY_MIN_CHARS: usize = 10;

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub query: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub query: String,
    pub output: String,
    pub status: String,
}

/// POST /generate
///
/// Every graph termination, including "could not determine intent" and the
/// completeness gate asking for more details, is a successful response.
/// Only completion failures become errors.
#[instrument(skip_all)]
pub async fn handle_generate(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    request: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<GenerateResponse>, AppError> {
    let Json(request) = request?;
    if request.query.chars().count() < QUERY_MIN_CHARS {
        return Err(AppError::Validation(format!(
            "query must be at least {QUERY_MIN_CHARS} characters"
        )));
    }

    info!(user_id = %user.id, "generation requested");
    let outcome = run_graph(state.llm.as_ref(), &request.query).await?;
    info!(
        user_id = %user.id,
        termination = ?outcome.termination,
        steps = outcome.path.len(),
        "document generated"
    );

    Ok(Json(GenerateResponse {
        query: request.query,
        output: outcome.output,
        status: "success".to_string(),
    }))
}
