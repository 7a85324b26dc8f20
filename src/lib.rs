// Entity Resolution & Normalization Core
// Reconciles the upstream backend's incompatible schema generations into the
// canonical shapes the presentation layer renders, and resolves whether an
// entity routes as a company or an investor.

pub mod classifier;
pub mod dedupe;
pub mod entity_refs;
pub mod events;
pub mod lookup;
pub mod payload;
pub mod scalars;
pub mod sectors;

// Re-export commonly used types
pub use classifier::{
    heuristic_says_investor, ClassificationCache, ClassificationRequest,
    ClassificationResult, ClassificationSource, EntityKindClassifier,
    FINANCIAL_SERVICES_FOCUS_ID, INVESTOR_SECTOR_IDS,
};
pub use dedupe::{dedupe_by_id, safe_parse_json, safe_parse_json_value};
pub use entity_refs::{
    company_path, investor_path, normalize_entity_field, to_entity_ref, to_entity_refs,
    EntityKind, EntityRef,
};
pub use events::{
    normalize_event, normalize_events, resolve_parties, CorporateEventCanonical,
    EventParties,
};
pub use lookup::{
    body_has_investor_profile, parse_entity_detail, EntityDetail, EntityLookup,
    HttpEntityLookup, LookupError, INVESTOR_PROFILE_KEYS,
};
pub use payload::{
    coerce_id, coerce_to_list, detect_event_envelope, parse_entity_element,
    parse_entity_list, parse_focus_ids, unwrap_payload, CounterpartyGroup,
    EventEnvelope, ParsedEntity,
};
pub use scalars::{
    extract_currency_code, extract_year, group_thousands, is_not_available,
    normalize_date, parse_numeric, MoneyAmount, NOT_AVAILABLE,
};
pub use sectors::{
    resolve_sectors, SectorBuckets, SectorImportance, SectorRef,
    KEYWORD_PRIMARY_FALLBACK,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
