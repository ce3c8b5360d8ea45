use axum::{
    extract::{Path, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde_json::json;
use tracing::{error, info};

use crate::server::server::AppState;
use crate::server::tokens::unavailable;
use crate::templates::TemplateError;

pub fn router() -> Router<AppState> {
    Router::new().route("/pages/{name}", get(render_page))
}

/// Renders a template with a freshly issued token bound to `.token`.
async fn render_page(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    if !state.templates.is_loaded().await {
        return (StatusCode::SERVICE_UNAVAILABLE, TemplateError::NotLoaded.to_string()).into_response();
    }

    let token = match state.store.new_token().await {
        Ok(token) => token,
        Err(err) => return unavailable(err),
    };

    let mut body = Vec::new();
    match state.templates.apply(&mut body, &name, &json!({ "token": token })).await {
        Ok(()) => ([(CONTENT_TYPE, "text/html; charset=utf-8")], body).into_response(),
        Err(err) => {
            // the token never reached anyone
            if let Err(drop_err) = state.store.drop_token(&token).await {
                error!("failed to drop unused token: {}", drop_err);
            }
            match err {
                TemplateError::NotFound(_) => {
                    info!("page '{}' not found", name);
                    (StatusCode::NOT_FOUND, err.to_string()).into_response()
                }
                TemplateError::NotLoaded => {
                    (StatusCode::SERVICE_UNAVAILABLE, err.to_string()).into_response()
                }
                _ => {
                    error!("page '{}' failed to render: {}", name, err);
                    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
                }
            }
        }
    }
}
