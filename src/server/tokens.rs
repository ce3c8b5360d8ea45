use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::server::server::AppState;
use crate::store::StoreError;

#[derive(Debug, Deserialize, Serialize)]
pub struct TokenRequest {
    pub token: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct IssuedToken {
    pub token: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Validity {
    pub valid: bool,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tokens", post(issue).delete(drop_token))
        .route("/tokens/checkout", post(checkout))
        .route("/tokens/redeem", post(redeem))
}

async fn issue(State(state): State<AppState>) -> Response {
    match state.store.new_token().await {
        Ok(token) => (StatusCode::CREATED, Json(IssuedToken { token })).into_response(),
        Err(err) => unavailable(err),
    }
}

async fn checkout(State(state): State<AppState>, Json(req): Json<TokenRequest>) -> Response {
    match state.store.checkout(&req.token).await {
        Ok(valid) => {
            debug!("checkout valid={}", valid);
            Json(Validity { valid }).into_response()
        }
        Err(err) => unavailable(err),
    }
}

async fn redeem(State(state): State<AppState>, Json(req): Json<TokenRequest>) -> Response {
    match state.store.checkout_and_drop(&req.token).await {
        Ok(valid) => Json(Validity { valid }).into_response(),
        Err(err) => unavailable(err),
    }
}

async fn drop_token(State(state): State<AppState>, Json(req): Json<TokenRequest>) -> Response {
    match state.store.drop_token(&req.token).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => unavailable(err),
    }
}

pub(crate) fn unavailable(err: StoreError) -> Response {
    warn!("token store unavailable: {}", err);
    (StatusCode::SERVICE_UNAVAILABLE, err.to_string()).into_response()
}
