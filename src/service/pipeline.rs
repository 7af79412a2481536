use super::claim_form::ClaimFormExtractor;
use super::lookup::{NameLookup, NoLookup};
use super::reconciler::ReconciliationEngine;
use super::verifier::CrossVerifier;
use crate::config::EngineConfig;
use crate::models::{
    BillItem, CachedExtraction, ReconciliationOutcome, ReconciliationRequest, ReconciliationSummary,
};
use rayon::prelude::*;
use std::sync::Arc;
use std::time::Instant;

/// Shared entry point: reconcile, then extract and verify a claim form when one is supplied.
///
/// Holds no per-request state, so one instance serves concurrent callers.
#[derive(Clone)]
pub struct ClaimReconciler {
    config: Arc<EngineConfig>,
    lookup: Arc<dyn NameLookup>,
}

impl ClaimReconciler {
    pub fn new(config: Arc<EngineConfig>, lookup: Arc<dyn NameLookup>) -> Self {
        Self { config, lookup }
    }

    /// Default configuration, no learned names
    pub fn with_defaults() -> Self {
        Self::new(Arc::new(EngineConfig::default()), Arc::new(NoLookup))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn reconcile(
        &self,
        prescriptions: &[String],
        bill_items: &[BillItem],
        tests: &[String],
    ) -> ReconciliationSummary {
        ReconciliationEngine::new(&self.config, self.lookup.as_ref()).reconcile(prescriptions, bill_items, tests)
    }

    /// Request lists, or the cached extraction for its document when it came with none
    fn resolve_input(&self, request: &ReconciliationRequest) -> CachedExtraction {
        if request.has_no_lists() {
            if let Some(hash) = request.document_hash.as_deref() {
                if let Some(cached) = self.lookup.lookup_cached_extraction(hash) {
                    tracing::info!("Using cached extraction for document {}", hash);
                    return cached;
                }
                tracing::debug!("No cached extraction for document {}", hash);
            }
        }
        request.extraction()
    }

    pub fn process(&self, request: &ReconciliationRequest) -> ReconciliationOutcome {
        let input = self.resolve_input(request);
        let summary = self.reconcile(&input.prescriptions, &input.bill_items, &input.tests);

        let claim_form = request
            .claim_form_text
            .as_deref()
            .and_then(|text| ClaimFormExtractor::new(&self.config.vocabulary).extract(text));

        let verification = claim_form
            .as_ref()
            .map(|form| CrossVerifier::new(&self.config).verify(form, &summary));

        ReconciliationOutcome {
            summary,
            claim_form,
            verification,
        }
    }

    /// Independent requests run in parallel; output order follows input order
    pub fn process_batch(&self, requests: &[ReconciliationRequest]) -> Vec<ReconciliationOutcome> {
        let start = Instant::now();
        let outcomes: Vec<ReconciliationOutcome> =
            requests.par_iter().map(|request| self.process(request)).collect();
        tracing::info!(
            "Processed batch of {} requests in {:?}",
            requests.len(),
            start.elapsed()
        );
        outcomes
    }
}
