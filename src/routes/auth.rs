// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Calendar OAuth routes, one family per provider:
//! `/api/auth/{google,outlook}/{url,callback,status,disconnect}`.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::Html,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::models::Provider;
use crate::services::OAuthState;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/{provider}/url", post(auth_url))
        .route("/api/auth/{provider}/callback", get(auth_callback))
        .route("/api/auth/{provider}/status", post(auth_status))
        .route("/api/auth/{provider}/disconnect", post(disconnect))
}

/// Body of `POST /api/auth/{provider}/url`.
#[derive(Deserialize, Validate, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthUrlRequest {
    #[validate(length(min = 1, message = "userId is required"))]
    user_id: String,
    #[validate(length(min = 1, message = "userEmail is required"))]
    user_email: String,
    #[validate(length(min = 1, message = "agency is required"))]
    agency: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct AuthUrlResponse {
    pub auth_url: String,
}

/// Body carrying only the dashboard user id.
#[derive(Deserialize, Validate, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct UserRequest {
    #[validate(length(min = 1, message = "userId is required"))]
    pub user_id: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct StatusResponse {
    pub connected: bool,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Build the consent URL the dashboard redirects the browser to.
async fn auth_url(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<Provider>,
    body: std::result::Result<Json<AuthUrlRequest>, JsonRejection>,
) -> Result<Json<AuthUrlResponse>> {
    let Json(body) = body?;
    body.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let oauth_state = OAuthState::new(body.user_id, body.user_email, body.agency, Some(provider));
    let auth_url = state.tokens.auth_url(provider, &oauth_state)?;

    tracing::info!(
        user_id = %oauth_state.user_id,
        provider = %provider,
        "Starting OAuth flow"
    );

    Ok(Json(AuthUrlResponse { auth_url }))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// OAuth callback - browser redirect target, answers with an HTML page.
async fn auth_callback(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<Provider>,
    Query(params): Query<CallbackParams>,
) -> (StatusCode, Html<String>) {
    if let Some(error) = params.error {
        tracing::warn!(provider = %provider, error = %error, "OAuth error from provider");
        let detail = params.error_description.unwrap_or(error);
        return callback_page(provider, StatusCode::BAD_REQUEST, Err(detail.as_str()));
    }

    let Some(oauth_state) = params.state.as_deref().and_then(OAuthState::decode) else {
        tracing::warn!(provider = %provider, "Missing or undecodable OAuth state");
        return callback_page(
            provider,
            StatusCode::BAD_REQUEST,
            Err("Paramètre state invalide"),
        );
    };

    if oauth_state.provider.is_some_and(|p| p != provider) {
        tracing::warn!(provider = %provider, "OAuth state issued for another provider");
        return callback_page(
            provider,
            StatusCode::BAD_REQUEST,
            Err("Paramètre state invalide"),
        );
    }

    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        return callback_page(
            provider,
            StatusCode::BAD_REQUEST,
            Err("Code d'autorisation manquant"),
        );
    };

    tracing::info!(
        user_id = %oauth_state.user_id,
        provider = %provider,
        "Exchanging authorization code for tokens"
    );

    match state
        .tokens
        .handle_oauth_callback(provider, &code, &oauth_state)
        .await
    {
        Ok(_) => callback_page(provider, StatusCode::OK, Ok(())),
        Err(e) => {
            tracing::error!(
                user_id = %oauth_state.user_id,
                provider = %provider,
                error = %e,
                "OAuth callback failed"
            );
            callback_page(
                provider,
                StatusCode::INTERNAL_SERVER_ERROR,
                Err(e.to_string().as_str()),
            )
        }
    }
}

fn callback_page(
    provider: Provider,
    status: StatusCode,
    outcome: std::result::Result<(), &str>,
) -> (StatusCode, Html<String>) {
    let name = provider.display_name();
    let (title, message) = match outcome {
        Ok(()) => (
            format!("{} connecté", name),
            "Votre agenda est maintenant synchronisé. Vous pouvez fermer cette fenêtre.".to_string(),
        ),
        Err(detail) => (
            format!("Échec de la connexion à {}", name),
            format!("Erreur : {}. Veuillez réessayer depuis les paramètres.", escape_html(detail)),
        ),
    };

    let page = format!(
        "<!DOCTYPE html>\n<html lang=\"fr\">\n<head><meta charset=\"utf-8\"><title>{title}</title></head>\n\
         <body>\n<h1>{title}</h1>\n<p>{message}</p>\n</body>\n</html>\n"
    );
    (status, Html(page))
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Whether the user has a stored token for this provider.
async fn auth_status(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<Provider>,
    body: std::result::Result<Json<UserRequest>, JsonRejection>,
) -> Result<Json<StatusResponse>> {
    let Json(body) = body?;
    body.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let connected = state.tokens.is_connected(provider, &body.user_id).await?;
    Ok(Json(StatusResponse { connected }))
}

/// Forget the user's tokens for this provider.
async fn disconnect(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<Provider>,
    body: std::result::Result<Json<UserRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>> {
    let Json(body) = body?;
    body.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let existed = state.tokens.disconnect(provider, &body.user_id).await?;
    if !existed {
        tracing::info!(user_id = %body.user_id, provider = %provider, "Nothing to disconnect");
    }
    Ok(Json(SuccessResponse { success: true }))
}
