// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Creating and deleting visit events in the agent's external calendar.
//!
//! Calls are single-shot: no retry, errors go straight back to the caller.
//! Creating twice creates two events.

use validator::Validate;

use crate::error::AppError;
use crate::models::{CalendarEventRef, EventDetails, Provider};
use crate::services::tokens::TokenManager;
use crate::time_utils::is_iso_datetime;

#[derive(Clone)]
pub struct CalendarService {
    tokens: TokenManager,
}

impl CalendarService {
    pub fn new(tokens: TokenManager) -> Self {
        Self { tokens }
    }

    /// Create one event in the user's calendar.
    pub async fn create_event(
        &self,
        provider: Provider,
        user_id: &str,
        details: &EventDetails,
    ) -> Result<CalendarEventRef, AppError> {
        validate_details(details)?;

        let access_token = self.tokens.get_valid_access_token(provider, user_id).await?;
        let time_zone = &self.tokens.config().calendar_time_zone;

        let event = match provider {
            Provider::Google => {
                self.tokens
                    .google()?
                    .create_event(&access_token, details, time_zone)
                    .await?
            }
            Provider::Outlook => {
                self.tokens
                    .outlook()?
                    .create_event(&access_token, details, time_zone)
                    .await?
            }
        };

        tracing::info!(
            user_id,
            provider = %provider,
            event_id = %event.provider_event_id,
            "Calendar event created"
        );
        Ok(event)
    }

    /// Delete an event previously returned by [`CalendarService::create_event`].
    pub async fn delete_event(
        &self,
        provider: Provider,
        user_id: &str,
        event_id: &str,
    ) -> Result<(), AppError> {
        if event_id.trim().is_empty() {
            return Err(AppError::BadRequest("eventId is required".to_string()));
        }

        let access_token = self.tokens.get_valid_access_token(provider, user_id).await?;

        match provider {
            Provider::Google => {
                self.tokens
                    .google()?
                    .delete_event(&access_token, event_id)
                    .await?
            }
            Provider::Outlook => {
                self.tokens
                    .outlook()?
                    .delete_event(&access_token, event_id)
                    .await?
            }
        }

        tracing::info!(user_id, provider = %provider, event_id, "Calendar event deleted");
        Ok(())
    }
}

fn validate_details(details: &EventDetails) -> Result<(), AppError> {
    details
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    for (field, value) in [
        ("startDateTime", &details.start_date_time),
        ("endDateTime", &details.end_date_time),
    ] {
        if !is_iso_datetime(value) {
            return Err(AppError::BadRequest(format!(
                "{} is not an ISO 8601 date-time: {}",
                field, value
            )));
        }
    }
    Ok(())
}
