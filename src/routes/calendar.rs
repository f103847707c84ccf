// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Calendar event routes used by the visit scheduler.
//!
//! Google keeps the historical unprefixed paths; Outlook lives under
//! `/api/calendar/outlook`.

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use super::auth::SuccessResponse;
use crate::error::{AppError, Result};
use crate::models::{EventDetails, Provider};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/calendar/event", post(create_google_event))
        .route("/api/calendar/event/delete", post(delete_google_event))
        .route("/api/calendar/outlook/event", post(create_outlook_event))
        .route(
            "/api/calendar/outlook/event/delete",
            post(delete_outlook_event),
        )
}

#[derive(Deserialize, Validate, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateEventRequest {
    #[validate(length(min = 1, message = "userId is required"))]
    user_id: String,
    #[validate(nested)]
    event_details: EventDetails,
}

#[derive(Deserialize, Validate, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct DeleteEventRequest {
    #[validate(length(min = 1, message = "userId is required"))]
    user_id: String,
    #[validate(length(min = 1, message = "eventId is required"))]
    event_id: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventResponse {
    pub success: bool,
    pub event_id: String,
    pub event_link: String,
}

async fn create_google_event(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<CreateEventRequest>, JsonRejection>,
) -> Result<Json<CreateEventResponse>> {
    let Json(body) = body?;
    create_event(&state, Provider::Google, body).await
}

async fn create_outlook_event(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<CreateEventRequest>, JsonRejection>,
) -> Result<Json<CreateEventResponse>> {
    let Json(body) = body?;
    create_event(&state, Provider::Outlook, body).await
}

async fn delete_google_event(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<DeleteEventRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>> {
    let Json(body) = body?;
    delete_event(&state, Provider::Google, body).await
}

async fn delete_outlook_event(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<DeleteEventRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>> {
    let Json(body) = body?;
    delete_event(&state, Provider::Outlook, body).await
}

async fn create_event(
    state: &AppState,
    provider: Provider,
    body: CreateEventRequest,
) -> Result<Json<CreateEventResponse>> {
    body.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let event = state
        .calendar
        .create_event(provider, &body.user_id, &body.event_details)
        .await
        .inspect_err(|e| {
            tracing::warn!(
                user_id = %body.user_id,
                provider = %provider,
                error = %e,
                reconnect = e.requires_reconnect(),
                "Calendar sync failed"
            )
        })?;

    Ok(Json(CreateEventResponse {
        success: true,
        event_id: event.provider_event_id,
        event_link: event.html_link,
    }))
}

async fn delete_event(
    state: &AppState,
    provider: Provider,
    body: DeleteEventRequest,
) -> Result<Json<SuccessResponse>> {
    body.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    state
        .calendar
        .delete_event(provider, &body.user_id, &body.event_id)
        .await?;

    Ok(Json(SuccessResponse { success: true }))
}
