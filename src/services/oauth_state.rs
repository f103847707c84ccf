// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OAuth `state` parameter carrying the dashboard session context.
//!
//! The blob is Base64-encoded JSON. It is visible to the browser and is not
//! signed, so it only routes the callback to a user; it grants nothing.

use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
    Engine as _,
};
use serde::{Deserialize, Serialize};

use crate::models::Provider;

/// Session context round-tripped through the provider consent screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthState {
    pub user_id: String,
    pub user_email: String,
    pub agency_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<Provider>,
}

impl OAuthState {
    pub fn new(
        user_id: impl Into<String>,
        user_email: impl Into<String>,
        agency_id: impl Into<String>,
        provider: Option<Provider>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            user_email: user_email.into(),
            agency_id: agency_id.into(),
            provider,
        }
    }

    /// Serialize as JSON and Base64-encode (standard alphabet, padded).
    pub fn encode(&self) -> String {
        // Serializing plain strings cannot fail.
        let json = serde_json::to_vec(self).unwrap_or_default();
        STANDARD.encode(json)
    }

    /// Decode a `state` value. Accepts the URL-safe alphabet as well, since
    /// some user agents rewrite `+` and `/`.
    pub fn decode(state: &str) -> Option<Self> {
        let state = state.trim();
        let bytes = STANDARD
            .decode(state)
            .or_else(|_| URL_SAFE_NO_PAD.decode(state.trim_end_matches('=')))
            .ok()?;
        let decoded: Self = serde_json::from_slice(&bytes).ok()?;

        if decoded.user_id.is_empty() {
            return None;
        }
        Some(decoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_roundtrip() {
        let state = OAuthState::new("u1", "agent@example.fr", "agency-7", Some(Provider::Outlook));
        let decoded = OAuthState::decode(&state.encode()).unwrap();
        assert_eq!(decoded, state);
    }

    #[test]
    fn test_state_is_plain_base64_json() {
        let encoded = OAuthState::new("u1", "a@b.fr", "ag", None).encode();
        let json: serde_json::Value =
            serde_json::from_slice(&STANDARD.decode(&encoded).unwrap()).unwrap();
        assert_eq!(json["userId"], "u1");
        assert_eq!(json["userEmail"], "a@b.fr");
        assert_eq!(json["agencyId"], "ag");
        assert!(json.get("provider").is_none());
    }

    #[test]
    fn test_state_accepts_url_safe_alphabet() {
        let state = OAuthState::new("ü?>>", "é@x.fr", "agence", Some(Provider::Google));
        let json = serde_json::to_vec(&state).unwrap();
        let url_safe = URL_SAFE_NO_PAD.encode(json);
        assert_eq!(OAuthState::decode(&url_safe), Some(state));
    }

    #[test]
    fn test_state_decode_invalid() {
        assert_eq!(OAuthState::decode("not-valid-base64!!!"), None);
        assert_eq!(OAuthState::decode(&STANDARD.encode("not json")), None);
        assert_eq!(
            OAuthState::decode(&STANDARD.encode(r#"{"userId":"","userEmail":"","agencyId":""}"#)),
            None
        );
    }
}
