// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod calendar;
pub mod token;

pub use calendar::{CalendarEventRef, EventDetails};
pub use token::{AccountHandle, Provider, RefreshMethod, TokenRecord};
