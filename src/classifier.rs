// 🎯 Entity Kind Classifier
// Decides whether an entity id routes as an investor or a plain company,
// through an ordered strategy chain: session cache → static heuristic →
// verification lookup → caller-supplied fallback flag → company default.

use crate::entity_refs::EntityKind;
use crate::lookup::{EntityDetail, EntityLookup};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

// ============================================================================
// CLASSIFIER CONSTANTS
// ============================================================================
// Read-only configuration owned by the classifier for the process lifetime.

/// Business-focus id for "Financial Services".
pub const FINANCIAL_SERVICES_FOCUS_ID: i64 = 74;

/// Sector ids for the investor archetypes: venture capital, private equity,
/// asset management, family office, wealth management, investment
/// management, accelerator.
pub const INVESTOR_SECTOR_IDS: &[i64] =
    &[23877, 23878, 23881, 23885, 23890, 23893, 23901];

// ============================================================================
// CLASSIFICATION RESULT
// ============================================================================

/// How a classification was obtained, weakest to strongest.
/// `VerifiedByLookup` is terminal: once cached it is never overwritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassificationSource {
    HeuristicRule,
    VerifiedByLookup,
    FallbackFlag,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub entity_id: i64,
    pub kind: EntityKind,
    pub source: ClassificationSource,
}

// ============================================================================
// SESSION CACHE
// ============================================================================

/// Per-page-view classification cache, keyed by entity id.
///
/// Verified entries are write-once: a `VerifiedByLookup` result can replace
/// a weaker one but nothing replaces it. Weak entries are kept stable too —
/// the first decided result stands until a verified upgrade arrives.
/// `clear` models navigation away from the page.
#[derive(Default)]
pub struct ClassificationCache {
    entries: Mutex<HashMap<i64, ClassificationResult>>,
}

impl ClassificationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, entity_id: i64) -> Option<ClassificationResult> {
        self.entries.lock().await.get(&entity_id).cloned()
    }

    /// Store a result, honoring the write-once rule for verified entries.
    /// Returns the entry that ends up cached.
    pub async fn store(&self, result: ClassificationResult) -> ClassificationResult {
        let mut entries = self.entries.lock().await;
        match entries.get(&result.entity_id) {
            Some(existing) if existing.source == ClassificationSource::VerifiedByLookup => {
                existing.clone()
            }
            Some(existing) if result.source != ClassificationSource::VerifiedByLookup => {
                existing.clone()
            }
            _ => {
                entries.insert(result.entity_id, result.clone());
                result
            }
        }
    }

    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

// ============================================================================
// STATIC HEURISTIC
// ============================================================================

/// Classify from locally-available fields alone, no network.
///
/// Definitive as `Investor` only when the focus list carries the
/// Financial-Services id AND the sector list intersects the
/// investor-archetype set. Anything else is "company or inconclusive".
pub fn heuristic_says_investor(detail: &EntityDetail) -> bool {
    detail
        .focus_ids
        .contains(&FINANCIAL_SERVICES_FOCUS_ID)
        && detail
            .sector_ids
            .iter()
            .any(|id| INVESTOR_SECTOR_IDS.contains(id))
}

// ============================================================================
// CLASSIFIER
// ============================================================================

/// One classification request, as fed to [`EntityKindClassifier::classify`]
/// or its batch variant.
#[derive(Debug, Clone)]
pub struct ClassificationRequest {
    pub entity_id: i64,
    pub detail: EntityDetail,
    /// The entity record's own "is investor" indicator, consulted only when
    /// the verification call fails or is skipped
    pub fallback_flag: Option<bool>,
}

pub struct EntityKindClassifier {
    lookup: Arc<dyn EntityLookup>,
    cache: ClassificationCache,
}

impl EntityKindClassifier {
    pub fn new(lookup: Arc<dyn EntityLookup>) -> Self {
        EntityKindClassifier {
            lookup,
            cache: ClassificationCache::new(),
        }
    }

    pub fn cache(&self) -> &ClassificationCache {
        &self.cache
    }

    /// Classify without any network work: heuristic, then fallback flag,
    /// then the company default. For callers that do not need a confident
    /// answer. Results are memoized like any other.
    pub async fn classify_heuristic(
        &self,
        request: &ClassificationRequest,
    ) -> ClassificationResult {
        if let Some(hit) = self.cache.get(request.entity_id).await {
            return hit;
        }
        let result = if heuristic_says_investor(&request.detail) {
            ClassificationResult {
                entity_id: request.entity_id,
                kind: EntityKind::Investor,
                source: ClassificationSource::HeuristicRule,
            }
        } else {
            self.fallback_result(request)
        };
        self.cache.store(result).await
    }

    /// Full classification chain, verification included.
    ///
    /// 1. Session cache hit short-circuits everything
    /// 2. Static heuristic: definitive `Investor` needs no network
    /// 3. Verification lookup: a profile marker upgrades to
    ///    `VerifiedByLookup`; a clean miss keeps the heuristic's `Company`
    /// 4. On lookup failure, the caller-supplied flag decides; absent that,
    ///    `Company` — the lower-consequence default
    pub async fn classify(&self, request: &ClassificationRequest) -> ClassificationResult {
        if let Some(hit) = self.cache.get(request.entity_id).await {
            tracing::debug!(entity_id = request.entity_id, "Classification cache hit");
            return hit;
        }

        let result = if heuristic_says_investor(&request.detail) {
            tracing::debug!(
                entity_id = request.entity_id,
                "Heuristic classified as investor"
            );
            ClassificationResult {
                entity_id: request.entity_id,
                kind: EntityKind::Investor,
                source: ClassificationSource::HeuristicRule,
            }
        } else {
            match self.lookup.has_investor_profile(request.entity_id).await {
                Ok(true) => {
                    tracing::debug!(
                        entity_id = request.entity_id,
                        "Verification upgraded classification to investor"
                    );
                    ClassificationResult {
                        entity_id: request.entity_id,
                        kind: EntityKind::Investor,
                        source: ClassificationSource::VerifiedByLookup,
                    }
                }
                // Answered, no marker: not "confirmed company", but nothing
                // strengthens the heuristic either
                Ok(false) => ClassificationResult {
                    entity_id: request.entity_id,
                    kind: EntityKind::Company,
                    source: ClassificationSource::HeuristicRule,
                },
                Err(err) => {
                    tracing::warn!(
                        entity_id = request.entity_id,
                        error = %err,
                        "Verification lookup failed, using fallback flag"
                    );
                    self.fallback_result(request)
                }
            }
        };

        self.cache.store(result).await
    }

    /// Classify a list concurrently, cancellable as a unit.
    ///
    /// The returned map is complete: it is assembled only after every
    /// per-entity future settles, and one entity's lookup failure never
    /// aborts the rest (per-entity failures resolve through the fallback
    /// chain). On cancellation the whole batch is discarded; futures still
    /// in flight are dropped before they can touch the cache.
    pub async fn classify_batch(
        &self,
        requests: &[ClassificationRequest],
        cancel: &CancellationToken,
    ) -> HashMap<i64, ClassificationResult> {
        // One lookup per distinct id at most
        let mut seen = std::collections::HashSet::new();
        let distinct: Vec<&ClassificationRequest> = requests
            .iter()
            .filter(|r| seen.insert(r.entity_id))
            .collect();

        let futures = distinct.iter().map(|request| self.classify(request));
        let all_settled = join_all(futures);

        tokio::select! {
            // Cancellation wins over simultaneously-ready results
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(count = distinct.len(), "Batch classification cancelled");
                HashMap::new()
            }
            results = all_settled => results
                .into_iter()
                .map(|result| (result.entity_id, result))
                .collect(),
        }
    }

    fn fallback_result(&self, request: &ClassificationRequest) -> ClassificationResult {
        let kind = match request.fallback_flag {
            Some(true) => EntityKind::Investor,
            _ => EntityKind::Company,
        };
        ClassificationResult {
            entity_id: request.entity_id,
            kind,
            source: ClassificationSource::FallbackFlag,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::LookupError;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory stand-in for the backend: a fixed set of ids with investor
    /// profiles, a set of ids whose lookups fail, and a call counter.
    struct FakeLookup {
        profiles: HashSet<i64>,
        failing: HashSet<i64>,
        calls: AtomicUsize,
    }

    impl FakeLookup {
        fn new(profiles: &[i64], failing: &[i64]) -> Self {
            FakeLookup {
                profiles: profiles.iter().copied().collect(),
                failing: failing.iter().copied().collect(),
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EntityLookup for FakeLookup {
        async fn entity_detail(
            &self,
            entity_id: i64,
        ) -> Result<EntityDetail, LookupError> {
            if self.failing.contains(&entity_id) {
                return Err(LookupError::NotFound(entity_id));
            }
            Ok(EntityDetail::default())
        }

        async fn has_investor_profile(&self, entity_id: i64) -> Result<bool, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.contains(&entity_id) {
                return Err(LookupError::NotFound(entity_id));
            }
            Ok(self.profiles.contains(&entity_id))
        }
    }

    /// Route classifier tracing through the test writer. Safe to call from
    /// every test; only the first registration wins.
    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    fn investor_detail() -> EntityDetail {
        EntityDetail {
            focus_ids: vec![FINANCIAL_SERVICES_FOCUS_ID],
            sector_ids: vec![23877],
            investor_flag: None,
        }
    }

    fn request(entity_id: i64, detail: EntityDetail, flag: Option<bool>) -> ClassificationRequest {
        ClassificationRequest {
            entity_id,
            detail,
            fallback_flag: flag,
        }
    }

    #[test]
    fn test_heuristic_requires_both_conditions() {
        assert!(heuristic_says_investor(&investor_detail()));

        // Focus without an investor sector: inconclusive
        let focus_only = EntityDetail {
            focus_ids: vec![FINANCIAL_SERVICES_FOCUS_ID],
            sector_ids: vec![99],
            investor_flag: None,
        };
        assert!(!heuristic_says_investor(&focus_only));

        // Investor sector without the focus: inconclusive
        let sector_only = EntityDetail {
            focus_ids: vec![12],
            sector_ids: vec![23877],
            investor_flag: None,
        };
        assert!(!heuristic_says_investor(&sector_only));
    }

    #[tokio::test]
    async fn test_string_encoded_focus_classifies_investor() {
        // Focus id arrives string-encoded, sectors as objects; both normalize
        // before the heuristic runs
        let detail = crate::lookup::parse_entity_detail(&serde_json::json!({
            "primary_business_focus_id": "74",
            "sectors_id": [{"id": 23877}]
        }));
        assert_eq!(detail.focus_ids, vec![74]);

        let lookup = Arc::new(FakeLookup::new(&[], &[]));
        let classifier = EntityKindClassifier::new(lookup.clone());
        let result = classifier.classify(&request(42, detail, None)).await;

        assert_eq!(result.kind, EntityKind::Investor);
        assert_eq!(result.source, ClassificationSource::HeuristicRule);
        assert_eq!(lookup.call_count(), 0);
    }

    #[tokio::test]
    async fn test_heuristic_investor_needs_no_network() {
        let lookup = Arc::new(FakeLookup::new(&[], &[]));
        let classifier = EntityKindClassifier::new(lookup.clone());

        let result = classifier
            .classify(&request(5, investor_detail(), None))
            .await;

        assert_eq!(result.kind, EntityKind::Investor);
        assert_eq!(result.source, ClassificationSource::HeuristicRule);
        assert_eq!(lookup.call_count(), 0);
    }

    #[tokio::test]
    async fn test_verification_upgrades_heuristic_company() {
        init_tracing();
        let lookup = Arc::new(FakeLookup::new(&[9], &[]));
        let classifier = EntityKindClassifier::new(lookup.clone());

        let result = classifier
            .classify(&request(9, EntityDetail::default(), None))
            .await;

        assert_eq!(result.kind, EntityKind::Investor);
        assert_eq!(result.source, ClassificationSource::VerifiedByLookup);
    }

    #[tokio::test]
    async fn test_clean_miss_keeps_heuristic_company() {
        let lookup = Arc::new(FakeLookup::new(&[], &[]));
        let classifier = EntityKindClassifier::new(lookup.clone());

        let result = classifier
            .classify(&request(9, EntityDetail::default(), Some(true)))
            .await;

        // Endpoint answered without a marker: fallback flag is NOT consulted
        assert_eq!(result.kind, EntityKind::Company);
        assert_eq!(result.source, ClassificationSource::HeuristicRule);
    }

    #[tokio::test]
    async fn test_lookup_failure_uses_fallback_flag() {
        init_tracing();
        let lookup = Arc::new(FakeLookup::new(&[], &[9]));
        let classifier = EntityKindClassifier::new(lookup.clone());

        let result = classifier
            .classify(&request(9, EntityDetail::default(), Some(true)))
            .await;

        assert_eq!(result.kind, EntityKind::Investor);
        assert_eq!(result.source, ClassificationSource::FallbackFlag);
    }

    #[tokio::test]
    async fn test_lookup_failure_without_flag_defaults_to_company() {
        let lookup = Arc::new(FakeLookup::new(&[], &[9]));
        let classifier = EntityKindClassifier::new(lookup.clone());

        let result = classifier
            .classify(&request(9, EntityDetail::default(), None))
            .await;

        assert_eq!(result.kind, EntityKind::Company);
        assert_eq!(result.source, ClassificationSource::FallbackFlag);
    }

    #[tokio::test]
    async fn test_verified_result_is_memoized() {
        let lookup = Arc::new(FakeLookup::new(&[9], &[]));
        let classifier = EntityKindClassifier::new(lookup.clone());
        let req = request(9, EntityDetail::default(), None);

        let first = classifier.classify(&req).await;
        let second = classifier.classify(&req).await;

        assert_eq!(first.source, ClassificationSource::VerifiedByLookup);
        assert_eq!(second, first);
        // Second call was a cache hit: still exactly one network call
        assert_eq!(lookup.call_count(), 1);
    }

    #[tokio::test]
    async fn test_cache_write_once_for_verified() {
        let cache = ClassificationCache::new();
        let verified = ClassificationResult {
            entity_id: 9,
            kind: EntityKind::Investor,
            source: ClassificationSource::VerifiedByLookup,
        };
        let weak = ClassificationResult {
            entity_id: 9,
            kind: EntityKind::Company,
            source: ClassificationSource::FallbackFlag,
        };

        cache.store(verified.clone()).await;
        let kept = cache.store(weak).await;

        assert_eq!(kept, verified);
        assert_eq!(cache.get(9).await, Some(verified));
    }

    #[tokio::test]
    async fn test_cache_weak_entry_upgraded_by_verified() {
        let cache = ClassificationCache::new();
        let weak = ClassificationResult {
            entity_id: 9,
            kind: EntityKind::Company,
            source: ClassificationSource::HeuristicRule,
        };
        let verified = ClassificationResult {
            entity_id: 9,
            kind: EntityKind::Investor,
            source: ClassificationSource::VerifiedByLookup,
        };

        cache.store(weak).await;
        cache.store(verified.clone()).await;

        assert_eq!(cache.get(9).await, Some(verified));
    }

    #[tokio::test]
    async fn test_cache_clear() {
        let cache = ClassificationCache::new();
        cache
            .store(ClassificationResult {
                entity_id: 1,
                kind: EntityKind::Company,
                source: ClassificationSource::HeuristicRule,
            })
            .await;
        assert_eq!(cache.len().await, 1);

        cache.clear().await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_batch_assembles_complete_map() {
        let lookup = Arc::new(FakeLookup::new(&[2], &[3]));
        let classifier = EntityKindClassifier::new(lookup.clone());
        let requests = vec![
            request(1, investor_detail(), None),
            request(2, EntityDetail::default(), None),
            request(3, EntityDetail::default(), None),
        ];

        let results = classifier
            .classify_batch(&requests, &CancellationToken::new())
            .await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[&1].source, ClassificationSource::HeuristicRule);
        assert_eq!(results[&2].source, ClassificationSource::VerifiedByLookup);
        // The failing entity degraded instead of aborting the batch
        assert_eq!(results[&3].kind, EntityKind::Company);
        assert_eq!(results[&3].source, ClassificationSource::FallbackFlag);
    }

    #[tokio::test]
    async fn test_batch_deduplicates_ids() {
        let lookup = Arc::new(FakeLookup::new(&[], &[]));
        let classifier = EntityKindClassifier::new(lookup.clone());
        let requests = vec![
            request(7, EntityDetail::default(), None),
            request(7, EntityDetail::default(), None),
            request(7, EntityDetail::default(), None),
        ];

        let results = classifier
            .classify_batch(&requests, &CancellationToken::new())
            .await;

        assert_eq!(results.len(), 1);
        assert_eq!(lookup.call_count(), 1);
    }

    #[tokio::test]
    async fn test_batch_cancelled_as_a_unit() {
        init_tracing();
        let lookup = Arc::new(FakeLookup::new(&[2], &[]));
        let classifier = EntityKindClassifier::new(lookup.clone());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let requests = vec![request(2, EntityDetail::default(), None)];
        let results = classifier.classify_batch(&requests, &cancel).await;

        assert!(results.is_empty());
    }
}
