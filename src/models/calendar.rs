// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Calendar event payloads exchanged with the dashboard.

use serde::{Deserialize, Serialize};
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// A property visit to put in the agent's calendar.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct EventDetails {
    #[validate(length(min = 1, message = "title is required"))]
    pub title: String,
    pub description: String,
    /// ISO 8601, forwarded unchanged
    #[validate(length(min = 1, message = "startDateTime is required"))]
    pub start_date_time: String,
    #[validate(length(min = 1, message = "endDateTime is required"))]
    pub end_date_time: String,
}

/// Reference to an event created in the provider calendar.
///
/// Not persisted here; the visit scheduler keeps the id to delete it later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEventRef {
    pub provider_event_id: String,
    /// `htmlLink` (Google) or `webLink` (Outlook)
    pub html_link: String,
}
