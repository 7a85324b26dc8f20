// 🗂️ Sector Hierarchy Resolver
// Reconciles primary/secondary sector associations across the two schema
// generations the upstream has shipped, including the secondary→primary
// back-references the newer generation uses instead of explicit primaries.

use crate::payload::{coerce_id, coerce_to_list, unwrap_payload};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

// ============================================================================
// SECTOR TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SectorImportance {
    Primary,
    Secondary,
}

/// One sector association. `id` is absent for sectors surfaced only through
/// back-references or the keyword fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorRef {
    pub id: Option<i64>,
    pub name: String,
    pub importance: SectorImportance,
}

/// The canonical partition the presentation layer consumes. A sector name
/// never appears in both buckets for the same source list.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SectorBuckets {
    pub primary: Vec<SectorRef>,
    pub secondary: Vec<SectorRef>,
}

// ============================================================================
// KEYWORD FALLBACK
// ============================================================================

/// Last-resort mapping from secondary-sector keywords to an approximate
/// primary grouping, applied only when neither schema generation yields an
/// explicit primary sector.
///
/// Deliberately lossy and hand-maintained. Do not extend without product
/// confirmation; it may drift from the upstream taxonomy.
pub const KEYWORD_PRIMARY_FALLBACK: &[(&str, &str)] = &[
    ("crypto", "Web 3"),
    ("blockchain", "Web 3"),
    ("defi", "Web 3"),
    ("nft", "Web 3"),
    ("web3", "Web 3"),
];

fn keyword_primary_for(secondary_name: &str) -> Option<&'static str> {
    let lower = secondary_name.to_lowercase();
    KEYWORD_PRIMARY_FALLBACK
        .iter()
        .find(|(keyword, _)| lower.contains(keyword))
        .map(|(_, primary)| *primary)
}

// ============================================================================
// ENTRY PARSING
// ============================================================================

fn sector_name(entry: &Value) -> Option<String> {
    let obj = entry.as_object()?;
    obj.get("sector_name")
        .or_else(|| obj.get("Sector_name"))
        .or_else(|| obj.get("name"))
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn sector_id(entry: &Value) -> Option<i64> {
    entry.as_object()?.get("id").and_then(coerce_id)
}

fn importance_tag(entry: &Value) -> Option<SectorImportance> {
    let tag = entry
        .as_object()?
        .get("Sector_importance")
        .or_else(|| entry.get("sector_importance"))
        .or_else(|| entry.get("importance"))?
        .as_str()?;
    match tag.trim().to_lowercase().as_str() {
        "primary" => Some(SectorImportance::Primary),
        "secondary" => Some(SectorImportance::Secondary),
        _ => None,
    }
}

/// Names from a `related_to_primary_sectors` back-reference, which arrives
/// either as an array of bare name strings or as an array of objects
/// carrying a `sector_name`.
fn related_primary_names(entry: &Value) -> Vec<String> {
    let related = match entry.as_object().and_then(|obj| {
        obj.get("Related_to_primary_sectors")
            .or_else(|| obj.get("related_to_primary_sectors"))
    }) {
        Some(v) => v,
        None => return Vec::new(),
    };

    coerce_to_list(related)
        .iter()
        .filter_map(|item| match item {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Object(_) => sector_name(item),
            _ => None,
        })
        .collect()
}

fn parse_sector_array(raw: &Value, importance: SectorImportance) -> Vec<SectorRef> {
    coerce_to_list(raw)
        .iter()
        .filter_map(|entry| {
            sector_name(entry).map(|name| SectorRef {
                id: sector_id(entry),
                name,
                importance,
            })
        })
        .collect()
}

// ============================================================================
// RESOLUTION
// ============================================================================

/// Resolve a raw sector payload of either generation into the canonical
/// primary/secondary partition.
///
/// Precedence:
/// 1. Explicit `primary_sectors`/`secondary_sectors` arrays, when either
///    list is non-empty; an empty primary list still keeps the secondary
///    bucket and goes through the keyword fallback
/// 2. A flat importance-tagged list; the primary set is the union of
///    explicitly-tagged Primary entries and the secondary entries'
///    related-primary back-references, deduplicated by name
/// 3. When neither yields a primary sector, the keyword fallback table
///    approximates one from secondary names
///
/// Total; malformed payloads resolve to empty buckets.
pub fn resolve_sectors(raw: &Value) -> SectorBuckets {
    let unwrapped = match unwrap_payload(raw) {
        Some(v) => v,
        None => return SectorBuckets::default(),
    };

    // Generation (a): explicit primary/secondary arrays. An empty primary
    // list with a populated secondary list is still this generation; the
    // secondary bucket survives and the keyword fallback fills in a primary.
    if let Some(obj) = unwrapped.as_object() {
        let mut explicit_primary = obj
            .get("primary_sectors")
            .map(|v| parse_sector_array(v, SectorImportance::Primary))
            .unwrap_or_default();
        let explicit_secondary = obj
            .get("secondary_sectors")
            .map(|v| parse_sector_array(v, SectorImportance::Secondary))
            .unwrap_or_default();
        if !explicit_primary.is_empty() || !explicit_secondary.is_empty() {
            if explicit_primary.is_empty() {
                approximate_primary(&mut explicit_primary, &explicit_secondary);
            }
            return partition(explicit_primary, explicit_secondary);
        }
    }

    // Generation (b): flat importance-tagged list; a lone object counts as
    // a one-entry list
    let flat = match &unwrapped {
        Value::Array(_) => coerce_to_list(&unwrapped),
        Value::Object(obj) => match obj.get("sectors") {
            Some(list) => coerce_to_list(list),
            None if importance_tag(&unwrapped).is_some() => vec![unwrapped.clone()],
            None => Vec::new(),
        },
        _ => Vec::new(),
    };

    let mut primary: Vec<SectorRef> = Vec::new();
    let mut secondary: Vec<SectorRef> = Vec::new();

    for entry in &flat {
        let name = match sector_name(entry) {
            Some(n) => n,
            None => continue,
        };
        match importance_tag(entry) {
            Some(SectorImportance::Primary) => primary.push(SectorRef {
                id: sector_id(entry),
                name,
                importance: SectorImportance::Primary,
            }),
            Some(SectorImportance::Secondary) => {
                for related in related_primary_names(entry) {
                    primary.push(SectorRef {
                        id: None,
                        name: related,
                        importance: SectorImportance::Primary,
                    });
                }
                secondary.push(SectorRef {
                    id: sector_id(entry),
                    name,
                    importance: SectorImportance::Secondary,
                });
            }
            None => {}
        }
    }

    // Last resort: approximate a primary grouping from secondary names
    if primary.is_empty() {
        approximate_primary(&mut primary, &secondary);
    }

    partition(primary, secondary)
}

/// Keyword-fallback step shared by both generations: approximate primary
/// sectors from secondary names when no shape yielded an explicit one.
fn approximate_primary(primary: &mut Vec<SectorRef>, secondary: &[SectorRef]) {
    for sector in secondary {
        if let Some(fallback) = keyword_primary_for(&sector.name) {
            primary.push(SectorRef {
                id: None,
                name: fallback.to_string(),
                importance: SectorImportance::Primary,
            });
        }
    }
}

/// Dedupe both buckets by name and enforce the partition invariant: a name
/// tagged Primary never also appears as Secondary.
fn partition(primary: Vec<SectorRef>, secondary: Vec<SectorRef>) -> SectorBuckets {
    let primary = dedupe_by_name(primary);
    let primary_names: HashSet<String> =
        primary.iter().map(|s| s.name.to_lowercase()).collect();
    let secondary = dedupe_by_name(secondary)
        .into_iter()
        .filter(|s| !primary_names.contains(&s.name.to_lowercase()))
        .collect();
    SectorBuckets { primary, secondary }
}

fn dedupe_by_name(sectors: Vec<SectorRef>) -> Vec<SectorRef> {
    let mut seen: HashSet<String> = HashSet::new();
    sectors
        .into_iter()
        .filter(|s| seen.insert(s.name.to_lowercase()))
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
