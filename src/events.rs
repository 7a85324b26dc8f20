// 📰 Corporate Event Canonicalization
// Funnels either envelope generation of a corporate-event payload into the
// one canonical shape the presentation layer renders: parties resolved and
// deduplicated, amounts normalized, sectors partitioned.

use crate::entity_refs::{normalize_entity_field, to_entity_refs, EntityRef};
use crate::payload::{
    coerce_id, coerce_to_list, detect_event_envelope, unwrap_payload, EventEnvelope,
};
use crate::scalars::{normalize_date, MoneyAmount};
use crate::sectors::{resolve_sectors, SectorBuckets};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// CANONICAL EVENT
// ============================================================================

/// Everyone involved in one corporate event, bucketed by role.
/// Advisors are display-only names; every other bucket is deduplicated by id.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EventParties {
    pub targets: Vec<EntityRef>,
    pub buyers: Vec<EntityRef>,
    pub investors: Vec<EntityRef>,
    pub sellers: Vec<EntityRef>,
    pub advisors: Vec<String>,
    pub other_counterparties: Vec<EntityRef>,
}

/// The single normalized representation of a corporate event, independent of
/// which upstream schema generation produced the raw data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorporateEventCanonical {
    pub id: Option<i64>,
    pub description: String,
    pub announcement_date: String,
    pub deal_type: String,
    pub parties: EventParties,
    pub investment_amount: MoneyAmount,
    pub enterprise_value: MoneyAmount,
    pub sectors: SectorBuckets,
}

// ============================================================================
// ROLE MAPPING
// ============================================================================

/// Which party bucket a role word lands in. Singular/plural, any casing;
/// unrecognized roles go to `other_counterparties` rather than being lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PartyRole {
    Target,
    Buyer,
    Investor,
    Seller,
    Advisor,
    Other,
}

fn party_role(role: Option<&str>) -> PartyRole {
    let word = match role {
        Some(r) => r.trim().to_lowercase(),
        None => return PartyRole::Other,
    };
    match word.as_str() {
        "target" | "targets" => PartyRole::Target,
        "buyer" | "buyers" | "acquirer" | "acquirers" => PartyRole::Buyer,
        "investor" | "investors" => PartyRole::Investor,
        "seller" | "sellers" | "vendor" | "vendors" => PartyRole::Seller,
        "advisor" | "advisors" | "adviser" | "advisers" => PartyRole::Advisor,
        _ => PartyRole::Other,
    }
}

fn dedupe_names(names: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    names
        .into_iter()
        .filter(|n| seen.insert(n.to_lowercase()))
        .collect()
}

// ============================================================================
// PARTY ASSEMBLY
// ============================================================================

/// Resolve the parties of one event payload, whichever envelope it uses.
pub fn resolve_parties(raw: &Value) -> EventParties {
    match detect_event_envelope(raw) {
        EventEnvelope::Modern { counterparties } => {
            let mut parties = EventParties::default();
            for group in counterparties {
                let refs = to_entity_refs(group.members.clone());
                match party_role(group.role.as_deref()) {
                    PartyRole::Target => parties.targets.extend(refs),
                    PartyRole::Buyer => parties.buyers.extend(refs),
                    PartyRole::Investor => parties.investors.extend(refs),
                    PartyRole::Seller => parties.sellers.extend(refs),
                    PartyRole::Advisor => parties
                        .advisors
                        .extend(refs.into_iter().map(|r| r.name).filter(|n| !n.is_empty())),
                    PartyRole::Other => parties.other_counterparties.extend(refs),
                }
            }
            finish_parties(parties)
        }
        EventEnvelope::Legacy { events } => {
            let mut parties = EventParties::default();
            for event in &events {
                parties.targets.extend(field_refs(event, "targets"));
                parties.buyers.extend(field_refs(event, "buyers"));
                parties.investors.extend(field_refs(event, "investors"));
                parties.sellers.extend(field_refs(event, "sellers"));
                parties.advisors.extend(field_names(event, "advisors"));
                parties
                    .other_counterparties
                    .extend(field_refs(event, "counterparties"));
            }
            finish_parties(parties)
        }
        EventEnvelope::Empty => EventParties::default(),
    }
}

fn field_refs(event: &Value, field: &str) -> Vec<EntityRef> {
    event
        .get(field)
        .map(normalize_entity_field)
        .unwrap_or_default()
}

fn field_names(event: &Value, field: &str) -> Vec<String> {
    event
        .get(field)
        .map(|v| {
            coerce_to_list(v)
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                    Value::Object(map) => map
                        .get("name")
                        .and_then(|n| n.as_str())
                        .map(|s| s.trim().to_string()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Re-dedupe each bucket after merging across groups/events.
fn finish_parties(parties: EventParties) -> EventParties {
    use crate::dedupe::dedupe_by_id;
    let by_id = |refs: Vec<EntityRef>| dedupe_by_id(refs, |r: &EntityRef| r.id);
    EventParties {
        targets: by_id(parties.targets),
        buyers: by_id(parties.buyers),
        investors: by_id(parties.investors),
        sellers: by_id(parties.sellers),
        advisors: dedupe_names(parties.advisors),
        other_counterparties: by_id(parties.other_counterparties),
    }
}

// ============================================================================
// EVENT ASSEMBLY
// ============================================================================

fn string_field(raw: &Value, field: &str) -> String {
    raw.get(field)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .unwrap_or_default()
        .to_string()
}

/// Normalize one raw corporate-event payload.
///
/// Total: every malformed or missing piece degrades to its neutral value
/// (empty buckets, "Not available" amounts, raw text dates), never an error.
pub fn normalize_event(raw: &Value) -> CorporateEventCanonical {
    let unwrapped = unwrap_payload(raw).unwrap_or(Value::Null);

    let currency = unwrapped.get("currency").and_then(|v| v.as_str());

    CorporateEventCanonical {
        id: unwrapped.get("id").and_then(coerce_id),
        description: string_field(&unwrapped, "description"),
        announcement_date: normalize_date(&string_field(&unwrapped, "announcement_date")),
        deal_type: string_field(&unwrapped, "deal_type"),
        parties: resolve_parties(&unwrapped),
        investment_amount: MoneyAmount::from_json(
            unwrapped.get("investment_amount"),
            currency,
        ),
        enterprise_value: MoneyAmount::from_json(unwrapped.get("enterprise_value"), currency),
        sectors: resolve_sectors(unwrapped.get("sectors").unwrap_or(&Value::Null)),
    }
}

/// Normalize a container that holds one event or a list of them.
pub fn normalize_events(raw: &Value) -> Vec<CorporateEventCanonical> {
    let unwrapped = match unwrap_payload(raw) {
        Some(v) => v,
        None => return Vec::new(),
    };
    coerce_to_list(&unwrapped).iter().map(normalize_event).collect()
}

// ============================================================================
// TESTS
// ============================================================================
