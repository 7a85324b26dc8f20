// 📦 Union Payload Parser
// The upstream has shipped the same concepts in several incompatible shapes
// over time: JSON embedded as strings inside JSON, bare objects where arrays
// belong, id fields that are numbers or strings or objects. No payload
// carries a version tag, so every variant is detected structurally and every
// parse degrades to an empty value instead of failing.

use crate::dedupe::safe_parse_json_value;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// PAYLOAD UNWRAPPING
// ============================================================================

/// Unwrap a field that may be a JSON-encoded string, an already-decoded
/// object/array, or nothing at all.
///
/// String payloads are parsed strictly; if that fails, escaped-quote
/// sequences (`\"`) are normalized once and the parse retried — the upstream
/// double-encodes some generations. Anything still unparseable yields `None`.
pub fn unwrap_payload(raw: &Value) -> Option<Value> {
    match raw {
        Value::Null => None,
        Value::String(s) => {
            if s.trim().is_empty() {
                return None;
            }
            safe_parse_json_value(s)
                .or_else(|| safe_parse_json_value(&s.replace("\\\"", "\"")))
        }
        Value::Object(_) | Value::Array(_) => Some(raw.clone()),
        _ => None,
    }
}

/// Coerce a field to a list: arrays pass through, a single object is wrapped
/// in a one-element list, anything else is empty.
pub fn coerce_to_list(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        Value::Object(_) => vec![value.clone()],
        _ => Vec::new(),
    }
}

/// Coerce an id field to a positive integer. Numbers and numeric strings
/// both count; zero, negatives and anything else do not.
pub fn coerce_id(value: &Value) -> Option<i64> {
    let id = match value {
        Value::Number(n) => n.as_i64()?,
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    (id > 0).then_some(id)
}

fn coerce_name(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

// ============================================================================
// ENTITY-REFERENCE ELEMENTS
// ============================================================================

/// One entity reference as parsed out of any generation's shape, before
/// navigation targets are resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedEntity {
    /// Positive upstream id, when one was usable
    pub id: Option<i64>,

    /// Display name, when one was usable
    pub name: Option<String>,

    /// Raw route/entity-type word ("investor", "Companies", ...) if present
    pub route: Option<String>,

    /// Explicit navigation path string, legacy generations only
    pub path: Option<String>,
}

/// Parse one element of an entity-reference list.
///
/// An element may be a full object, a bare numeric id, a bare name string,
/// or a legacy counterparty whose name lives one level deeper under a nested
/// company object. Elements with neither a usable id nor a usable name are
/// dropped (`None`).
pub fn parse_entity_element(element: &Value) -> Option<ParsedEntity> {
    match element {
        Value::Number(_) => Some(ParsedEntity {
            id: coerce_id(element),
            name: None,
            route: None,
            path: None,
        }),
        Value::String(s) => {
            // A numeric string is an id; any other non-empty string is a name
            if let Some(id) = coerce_id(element) {
                return Some(ParsedEntity {
                    id: Some(id),
                    name: None,
                    route: None,
                    path: None,
                });
            }
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            Some(ParsedEntity {
                id: None,
                name: Some(trimmed.to_string()),
                route: None,
                path: None,
            })
        }
        Value::Object(map) => {
            // Legacy counterparty sub-shape: identity nested under `company`
            let nested = map.get("company").and_then(|v| v.as_object());

            let id = map
                .get("id")
                .or_else(|| map.get("company_id"))
                .and_then(coerce_id)
                .or_else(|| nested.and_then(|n| n.get("id")).and_then(coerce_id));

            let name = map
                .get("name")
                .or_else(|| map.get("company_name"))
                .or_else(|| map.get("Company_name"))
                .and_then(coerce_name)
                .or_else(|| {
                    nested
                        .and_then(|n| n.get("name").or_else(|| n.get("company_name")))
                        .and_then(coerce_name)
                });

            let route = map
                .get("route")
                .or_else(|| map.get("entity_type"))
                .and_then(coerce_name);

            let path = map
                .get("url")
                .or_else(|| map.get("path"))
                .and_then(coerce_name);

            if id.is_none() && name.is_none() {
                return None;
            }
            Some(ParsedEntity { id, name, route, path })
        }
        _ => None,
    }
}

/// Parse a whole entity-reference field: JSON-string, array of mixed-shape
/// elements, or a single bare object. Always total; malformed input is an
/// empty list.
pub fn parse_entity_list(raw: &Value) -> Vec<ParsedEntity> {
    let unwrapped = match unwrap_payload(raw) {
        Some(v) => v,
        None => return Vec::new(),
    };
    coerce_to_list(&unwrapped)
        .iter()
        .filter_map(parse_entity_element)
        .collect()
}

// ============================================================================
// BUSINESS-FOCUS IDS
// ============================================================================

/// Normalize the business-focus field to a flat id list.
///
/// Observed encodings: a single id, a string-encoded id ("74"), an array of
/// ids, an array of objects each carrying an id. Anything unusable is
/// skipped; the result may be empty.
pub fn parse_focus_ids(raw: &Value) -> Vec<i64> {
    match raw {
        Value::Number(_) | Value::String(_) => {
            // A string may be one id or a JSON-encoded array of them
            if let Some(id) = coerce_id(raw) {
                return vec![id];
            }
            match unwrap_payload(raw) {
                Some(inner) if inner != *raw => parse_focus_ids(&inner),
                _ => Vec::new(),
            }
        }
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::Object(map) => map.get("id").and_then(coerce_id),
                other => coerce_id(other),
            })
            .collect(),
        _ => Vec::new(),
    }
}

// ============================================================================
// CORPORATE-EVENT ENVELOPES
// ============================================================================

/// The two envelope generations the upstream has used for corporate events.
/// Neither carries a version tag; detection is by mutually exclusive field
/// names.
#[derive(Debug, Clone, PartialEq)]
pub enum EventEnvelope {
    /// Current shape: `new_counterparties: [{ type, items: string|array }]`
    Modern { counterparties: Vec<CounterpartyGroup> },

    /// Legacy shape: `New_Events_Wits_Advisors: [...]` with role-named
    /// fields on each element
    Legacy { events: Vec<Value> },

    /// Unrecognized or absent: render nothing, never fail
    Empty,
}

/// One role-tagged group of counterparties from the modern envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct CounterpartyGroup {
    /// Role word as shipped ("Target", "Buyer", "Seller", "Investor", ...)
    pub role: Option<String>,

    /// Parsed members; the `items` field arrives as either a JSON-encoded
    /// string or a bare array
    pub members: Vec<ParsedEntity>,
}

/// Detect which envelope generation a raw corporate-event payload uses.
pub fn detect_event_envelope(raw: &Value) -> EventEnvelope {
    let unwrapped = match unwrap_payload(raw) {
        Some(v) => v,
        None => return EventEnvelope::Empty,
    };
    let map = match unwrapped.as_object() {
        Some(m) => m,
        None => return EventEnvelope::Empty,
    };

    if let Some(groups) = map.get("new_counterparties") {
        let counterparties = coerce_to_list(groups)
            .iter()
            .filter_map(|group| {
                let obj = group.as_object()?;
                let role = obj
                    .get("type")
                    .or_else(|| obj.get("role"))
                    .and_then(|v| v.as_str())
                    .map(|s| s.trim().to_string());
                let members = obj
                    .get("items")
                    .map(parse_entity_list)
                    .unwrap_or_default();
                Some(CounterpartyGroup { role, members })
            })
            .collect();
        return EventEnvelope::Modern { counterparties };
    }

    if let Some(events) = map.get("New_Events_Wits_Advisors") {
        return EventEnvelope::Legacy {
            events: coerce_to_list(events),
        };
    }

    EventEnvelope::Empty
}

// ============================================================================
// TESTS
// ============================================================================
