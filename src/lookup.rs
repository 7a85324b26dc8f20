// 🌐 Lookup Boundary
// The crate's only external interface: two read-only JSON endpoints, treated
// as black boxes. Behind an async trait so the classifier can be exercised
// against an in-memory fake; the reqwest client is one implementation.

use crate::payload::parse_focus_ids;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Best-effort enrichment, not a critical path: keep the round-trip short.
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Top-level keys whose presence in a verification response body marks the
/// entity as having an investor profile.
pub const INVESTOR_PROFILE_KEYS: &[&str] =
    &["Investor", "Investor_Details", "investor_profile"];

// ============================================================================
// ERRORS
// ============================================================================

/// Lookup failures. Callers never surface these to the UI; every variant
/// degrades to the classifier's fallback path.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("network error: {0}")]
    Network(String),

    #[error("entity {0} not found")]
    NotFound(i64),

    #[error("upstream error {0}: {1}")]
    Upstream(u16, String),

    #[error("malformed response body: {0}")]
    Malformed(String),
}

// ============================================================================
// ENTITY DETAIL
// ============================================================================

/// Sector/focus metadata for one entity, flattened out of whichever
/// sub-object (`Company` or `Investor`) the detail endpoint nested it under.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityDetail {
    /// Normalized primary-business-focus ids
    pub focus_ids: Vec<i64>,

    /// Normalized sector ids
    pub sector_ids: Vec<i64>,

    /// The record's own "is investor" indicator, when it carries one.
    /// Used as the classifier's fallback flag.
    pub investor_flag: Option<bool>,
}

/// Flatten a raw detail body into [`EntityDetail`].
///
/// The metadata may sit at the top level or one level down under a
/// `Company`- or `Investor`-shaped sub-object; focus and sector fields use
/// the same zoo of id encodings everywhere, so both go through
/// [`parse_focus_ids`]. Total; an unrecognizable body flattens to empty.
pub fn parse_entity_detail(body: &Value) -> EntityDetail {
    let top = match body.as_object() {
        Some(map) => map,
        None => return EntityDetail::default(),
    };

    let nested = top
        .get("Company")
        .or_else(|| top.get("Investor"))
        .and_then(|v| v.as_object());

    let field = |name: &str| -> Option<&Value> {
        top.get(name).or_else(|| nested.and_then(|n| n.get(name)))
    };

    EntityDetail {
        focus_ids: field("primary_business_focus_id")
            .map(parse_focus_ids)
            .unwrap_or_default(),
        sector_ids: field("sectors_id").map(parse_focus_ids).unwrap_or_default(),
        investor_flag: field("is_investor").and_then(|v| v.as_bool()),
    }
}

/// Does a verification response body carry an investor-profile marker?
pub fn body_has_investor_profile(body: &Value) -> bool {
    body.as_object()
        .map(|map| INVESTOR_PROFILE_KEYS.iter().any(|key| map.contains_key(*key)))
        .unwrap_or(false)
}

// ============================================================================
// LOOKUP TRAIT
// ============================================================================

/// The classifier's view of the backend.
#[async_trait]
pub trait EntityLookup: Send + Sync {
    /// Fetch sector/focus metadata for an entity by id.
    async fn entity_detail(&self, entity_id: i64) -> std::result::Result<EntityDetail, LookupError>;

    /// Check whether an entity has an investor profile.
    ///
    /// `Ok(false)` means the endpoint answered and no marker was present —
    /// which is NOT "confirmed as company", it only fails to strengthen a
    /// prior heuristic. Errors route the caller to its fallback flag.
    async fn has_investor_profile(
        &self,
        entity_id: i64,
    ) -> std::result::Result<bool, LookupError>;
}

// ============================================================================
// HTTP IMPLEMENTATION
// ============================================================================

/// `reqwest`-backed lookup against the upstream backend.
pub struct HttpEntityLookup {
    http: reqwest::Client,
    base_url: String,
}

impl HttpEntityLookup {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(LOOKUP_TIMEOUT)
            .build()
            .context("Failed to build lookup HTTP client")?;

        Ok(HttpEntityLookup {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn get_json(&self, url: &str, entity_id: i64) -> std::result::Result<Value, LookupError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| LookupError::Network(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Err(LookupError::NotFound(entity_id));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LookupError::Upstream(status.as_u16(), body));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| LookupError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl EntityLookup for HttpEntityLookup {
    async fn entity_detail(&self, entity_id: i64) -> std::result::Result<EntityDetail, LookupError> {
        let url = format!("{}/entities/{}", self.base_url, entity_id);
        tracing::debug!(entity_id, url = %url, "Fetching entity detail");

        let body = self.get_json(&url, entity_id).await?;
        Ok(parse_entity_detail(&body))
    }

    async fn has_investor_profile(
        &self,
        entity_id: i64,
    ) -> std::result::Result<bool, LookupError> {
        let url = format!("{}/investors/{}/profile", self.base_url, entity_id);
        tracing::debug!(entity_id, url = %url, "Checking investor profile");

        let body = self.get_json(&url, entity_id).await?;
        let confirmed = body_has_investor_profile(&body);

        tracing::debug!(entity_id, confirmed, "Investor profile check settled");
        Ok(confirmed)
    }
}

// ============================================================================
// TESTS
// ============================================================================
