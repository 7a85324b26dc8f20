// 🧭 Entity Reference Normalizer
// Turns parsed entity elements into deduplicated canonical references with
// resolved navigation targets. Identity is the upstream numeric id.

use crate::dedupe::dedupe_by_id;
use crate::payload::{parse_entity_list, ParsedEntity};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// ENTITY KIND
// ============================================================================

/// What kind of business entity a reference points at, as far as routing
/// can tell without the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    Company,
    Investor,
    Unknown,
}

// ============================================================================
// ENTITY REF
// ============================================================================

/// Canonical entity reference handed to the presentation layer.
///
/// `id` is `Some` only for valid positive upstream ids; `None` marks a
/// display-only reference that is never deduplicated or clickable-by-id.
/// An empty `navigation_path` renders as plain text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRef {
    pub id: Option<i64>,
    pub name: String,
    pub kind: EntityKind,
    pub navigation_path: String,
}

impl EntityRef {
    pub fn is_clickable(&self) -> bool {
        !self.navigation_path.is_empty()
    }
}

// ============================================================================
// NAVIGATION TARGETS
// ============================================================================

const INVESTORS_PREFIX: &str = "/investors/";
const COMPANIES_PREFIX: &str = "/companies/";

/// Legacy singular prefix some generations shipped in explicit path strings.
const LEGACY_INVESTOR_PREFIX: &str = "/investor/";

pub fn investor_path(id: i64) -> String {
    format!("{}{}", INVESTORS_PREFIX, id)
}

pub fn company_path(id: i64) -> String {
    format!("{}{}", COMPANIES_PREFIX, id)
}

/// Does a route/entity-type word say "investor"? Singular or plural,
/// any casing.
fn route_says_investor(route: &str) -> bool {
    matches!(route.trim().to_lowercase().as_str(), "investor" | "investors")
}

fn route_says_company(route: &str) -> bool {
    matches!(route.trim().to_lowercase().as_str(), "company" | "companies")
}

/// Rewrite the legacy singular `/investor/` prefix to the plural form.
fn normalize_explicit_path(path: &str) -> String {
    let trimmed = path.trim();
    if let Some(rest) = trimmed.strip_prefix(LEGACY_INVESTOR_PREFIX) {
        return format!("{}{}", INVESTORS_PREFIX, rest);
    }
    trimmed.to_string()
}

// ============================================================================
// NORMALIZATION
// ============================================================================

/// Resolve one parsed element to a canonical reference.
///
/// Navigation precedence:
/// 1. Numeric id present → build the path; the route word decides investor
///    vs company, defaulting to the company path (the superset view) when
///    absent or unrecognized
/// 2. No id but an explicit path string → use it, rewriting the legacy
///    singular investor prefix
/// 3. Neither → empty target, rendered as plain text
pub fn to_entity_ref(parsed: &ParsedEntity) -> EntityRef {
    let name = parsed.name.clone().unwrap_or_default();

    if let Some(id) = parsed.id {
        let (kind, path) = match parsed.route.as_deref() {
            Some(route) if route_says_investor(route) => {
                (EntityKind::Investor, investor_path(id))
            }
            Some(route) if route_says_company(route) => {
                (EntityKind::Company, company_path(id))
            }
            // No usable route word: company path, kind left for the classifier
            _ => (EntityKind::Unknown, company_path(id)),
        };
        return EntityRef {
            id: Some(id),
            name,
            kind,
            navigation_path: path,
        };
    }

    if let Some(path) = parsed.path.as_deref() {
        let normalized = normalize_explicit_path(path);
        let kind = if normalized.starts_with(INVESTORS_PREFIX) {
            EntityKind::Investor
        } else if normalized.starts_with(COMPANIES_PREFIX) {
            EntityKind::Company
        } else {
            EntityKind::Unknown
        };
        return EntityRef {
            id: None,
            name,
            kind,
            navigation_path: normalized,
        };
    }

    EntityRef {
        id: None,
        name,
        kind: EntityKind::Unknown,
        navigation_path: String::new(),
    }
}

/// Resolve and deduplicate a whole parsed list. Stable first-seen-wins
/// ordering; id-less references always survive.
pub fn to_entity_refs(parsed: Vec<ParsedEntity>) -> Vec<EntityRef> {
    let refs = parsed.iter().map(to_entity_ref).collect();
    dedupe_by_id(refs, |r: &EntityRef| r.id)
}

/// One-call convenience for raw payload fields: parse any generation's
/// shape and normalize. Total; malformed input is an empty list.
pub fn normalize_entity_field(raw: &Value) -> Vec<EntityRef> {
    to_entity_refs(parse_entity_list(raw))
}

// ============================================================================
// TESTS
// ============================================================================
