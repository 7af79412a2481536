use super::normalizer::normalize;
use crate::models::CachedExtraction;
use dashmap::DashMap;

/// Read-only view of the host's learned names and extraction cache.
///
/// The engine may consult it but never mutates it.
pub trait NameLookup: Send + Sync {
    /// Preferred spelling for a raw item name, if one was learned
    fn suggest_canonical_name(&self, _raw: &str) -> Option<String> {
        None
    }

    /// Lists previously extracted from the document with this hash
    fn lookup_cached_extraction(&self, _document_hash: &str) -> Option<CachedExtraction> {
        None
    }
}

/// Lookup that knows nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLookup;

impl NameLookup for NoLookup {}

/// In-process learned-name store and extraction cache, safe to share across requests
#[derive(Debug, Default)]
pub struct LearnedNameStore {
    /// normalized raw name -> canonical spelling
    canonical: DashMap<String, String>,
    /// document hash -> extraction
    extractions: DashMap<String, CachedExtraction>,
}

impl LearnedNameStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember `canonical` as the preferred spelling of `raw`.
    /// Returns false when either side normalizes to nothing.
    pub fn learn_name(&self, raw: &str, canonical: &str) -> bool {
        let key = normalize(raw);
        let canonical = canonical.trim();
        if key.is_empty() || normalize(canonical).is_empty() {
            return false;
        }
        self.canonical.insert(key, canonical.to_string());
        true
    }

    pub fn cache_extraction(&self, document_hash: &str, extraction: CachedExtraction) {
        self.extractions.insert(document_hash.to_string(), extraction);
    }

    pub fn len(&self) -> usize {
        self.canonical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }

    pub fn cached_count(&self) -> usize {
        self.extractions.len()
    }
}

impl NameLookup for LearnedNameStore {
    fn suggest_canonical_name(&self, raw: &str) -> Option<String> {
        self.canonical.get(&normalize(raw)).map(|entry| entry.value().clone())
    }

    fn lookup_cached_extraction(&self, document_hash: &str) -> Option<CachedExtraction> {
        self.extractions
            .get(document_hash)
            .map(|entry| entry.value().clone())
    }
}
