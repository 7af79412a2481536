use super::classifier::ItemClassifier;
use super::fuzzy::best_match;
use super::lookup::NameLookup;
use super::normalizer::normalize;
use crate::config::EngineConfig;
use crate::models::{
    format_rupees, BillItem, ConsultationAdjustment, InadmissibleEntry, MatchFlags, MatchResult,
    MatchStatus, ReconciliationCounts, ReconciliationSummary, ReconciliationTotals, UnmatchedEntry,
};
use bigdecimal::{BigDecimal, Zero};
use indexmap::IndexSet;

/// Which list a source name came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceKind {
    Prescription,
    Test,
}

impl SourceKind {
    fn label(&self, name: &str) -> String {
        match self {
            SourceKind::Prescription => name.to_string(),
            SourceKind::Test => format!("Test: {}", name),
        }
    }

    fn unmatched_reason(&self) -> &'static str {
        match self {
            SourceKind::Prescription => "No matching bill found",
            SourceKind::Test => "Test not found in bills",
        }
    }
}

/// A bill line still available for matching
#[derive(Debug, Clone, Copy)]
struct PooledBill<'b> {
    index: usize,
    item: &'b BillItem,
}

/// Working state of one run: the shrinking bill pool plus running ledgers
struct ReconciliationState<'b> {
    pool: Vec<PooledBill<'b>>,
    /// Normalized names of bill lines consumed by a prescription/test
    consumed_names: IndexSet<String>,
    matched_items: Vec<MatchResult>,
    unmatched_prescriptions: Vec<UnmatchedEntry>,
    unmatched_tests: Vec<UnmatchedEntry>,
    inadmissible_items: Vec<InadmissibleEntry>,
    consultation_adjustments: Vec<ConsultationAdjustment>,
    total_admissible: BigDecimal,
    total_inadmissible: BigDecimal,
    total_consultation_excess: BigDecimal,
    duplicate_bill_items: usize,
}

impl<'b> ReconciliationState<'b> {
    fn new(pool: Vec<PooledBill<'b>>) -> Self {
        Self {
            pool,
            consumed_names: IndexSet::new(),
            matched_items: Vec::new(),
            unmatched_prescriptions: Vec::new(),
            unmatched_tests: Vec::new(),
            inadmissible_items: Vec::new(),
            consultation_adjustments: Vec::new(),
            total_admissible: BigDecimal::zero(),
            total_inadmissible: BigDecimal::zero(),
            total_consultation_excess: BigDecimal::zero(),
            duplicate_bill_items: 0,
        }
    }

    /// Remove a line from the pool so no later search can claim it
    fn take(&mut self, position: usize) -> PooledBill<'b> {
        let bill = self.pool.remove(position);
        self.consumed_names.insert(normalize(&bill.item.name));
        bill
    }
}

/// Deduplicate by normalized name, first occurrence wins; names that normalize to nothing are dropped
fn unique_by_normalized(names: &[String]) -> Vec<&String> {
    let mut seen: IndexSet<String> = IndexSet::new();
    names
        .iter()
        .filter(|name| {
            let key = normalize(name);
            !key.is_empty() && seen.insert(key)
        })
        .collect()
}

/// Greedy three-phase reconciliation of prescriptions and tests against bill lines.
pub struct ReconciliationEngine<'a> {
    config: &'a EngineConfig,
    lookup: &'a dyn NameLookup,
}

impl<'a> ReconciliationEngine<'a> {
    pub fn new(config: &'a EngineConfig, lookup: &'a dyn NameLookup) -> Self {
        Self { config, lookup }
    }

    fn classifier(&self) -> ItemClassifier<'a> {
        ItemClassifier::new(self.config)
    }

    fn cap_reason(&self, excess: &BigDecimal) -> String {
        format!(
            "Consultation fee capped at {}. Excess: {}",
            format_rupees(&self.config.consultation_fee_cap),
            format_rupees(excess)
        )
    }

    /// Partition bills into matched, inadmissible and capped-consultation sets.
    ///
    /// Phases run in order: prescriptions, then tests, then whatever is left of
    /// the pool. Each bill line is consumed by at most one prescription/test.
    pub fn reconcile(
        &self,
        prescriptions: &[String],
        bill_items: &[BillItem],
        tests: &[String],
    ) -> ReconciliationSummary {
        // 1. drop totals/tax lines and build the pool
        let (kept, excluded_bill_items) = self.classifier().filter_bill_items(bill_items);
        let pool = kept
            .into_iter()
            .map(|(index, item)| PooledBill { index, item })
            .collect();
        let mut state = ReconciliationState::new(pool);

        // 2. ordered dedupe of prescriptions and tests
        let unique_prescriptions = unique_by_normalized(prescriptions);
        let unique_tests = unique_by_normalized(tests);

        tracing::info!(
            "Reconciling {} prescriptions, {} tests against {} bill lines ({} excluded)",
            unique_prescriptions.len(),
            unique_tests.len(),
            state.pool.len(),
            excluded_bill_items
        );

        // 3. prescription phase
        self.match_sources(
            &unique_prescriptions,
            SourceKind::Prescription,
            self.config.prescription_threshold,
            &mut state,
        );
        // 4. test phase, against what prescriptions left
        self.match_sources(
            &unique_tests,
            SourceKind::Test,
            self.config.test_threshold,
            &mut state,
        );
        // 5. remaining lines: exemptions or inadmissible
        self.settle_remaining(&mut state);

        // 6. rounded totals and counts
        let totals = ReconciliationTotals::new(
            state.total_admissible,
            state.total_inadmissible,
            state.total_consultation_excess,
        );

        let counts = ReconciliationCounts {
            total_prescriptions: unique_prescriptions.len(),
            total_tests: unique_tests.len(),
            total_bill_items: bill_items.len(),
            excluded_bill_items,
            duplicate_bill_items: state.duplicate_bill_items,
            matched_count: state.matched_items.len(),
            unmatched_prescription_count: state.unmatched_prescriptions.len(),
            unmatched_test_count: state.unmatched_tests.len(),
            inadmissible_count: state.inadmissible_items.len(),
            consultation_adjustment_count: state.consultation_adjustments.len(),
        };

        tracing::info!(
            "Reconciliation complete: matched {}, unmatched {}/{}, inadmissible {}, admissible {}, total {}",
            counts.matched_count,
            counts.unmatched_prescription_count,
            counts.unmatched_test_count,
            counts.inadmissible_count,
            totals.admissible,
            totals.total_amount
        );

        ReconciliationSummary {
            matched_items: state.matched_items,
            unmatched_prescriptions: state.unmatched_prescriptions,
            unmatched_tests: state.unmatched_tests,
            inadmissible_items: state.inadmissible_items,
            consultation_adjustments: state.consultation_adjustments,
            counts,
            totals,
        }
    }

    /// Prescription and test phases: one greedy search per unique name
    fn match_sources(
        &self,
        names: &[&String],
        kind: SourceKind,
        threshold: f64,
        state: &mut ReconciliationState<'_>,
    ) {
        let classifier = self.classifier();

        for name in names {
            let probe = match self.lookup.suggest_canonical_name(name) {
                Some(canonical) => {
                    tracing::debug!("Using learned spelling {:?} for {:?}", canonical, name);
                    canonical
                }
                None => name.to_string(),
            };

            let hit = best_match(&probe, &state.pool, |b| b.item.name.as_str(), threshold);
            let Some(hit) = hit else {
                tracing::debug!("No bill line for {:?} {:?}", kind, name);
                let entry = UnmatchedEntry {
                    name: name.to_string(),
                    reason: kind.unmatched_reason().to_string(),
                };
                match kind {
                    SourceKind::Prescription => state.unmatched_prescriptions.push(entry),
                    SourceKind::Test => state.unmatched_tests.push(entry),
                }
                continue;
            };

            let bill = state.take(hit.position);
            tracing::debug!(
                "Matched {:?} -> {:?} (score {:.3})",
                name,
                bill.item.name,
                hit.score
            );

            let fee = classifier.classify_consultation_fee(&bill.item.name, &bill.item.amount);
            if fee.is_consultation && fee.excess > BigDecimal::zero() {
                state.total_admissible += &fee.admissible;
                state.total_consultation_excess += &fee.excess;
                state.consultation_adjustments.push(ConsultationAdjustment {
                    item_name: bill.item.name.clone(),
                    source_name: Some(kind.label(name)),
                    bill_index: bill.index,
                    score: hit.score,
                    billed_amount: bill.item.amount.clone(),
                    admissible_amount: fee.admissible,
                    reason: self.cap_reason(&fee.excess),
                    excess_amount: fee.excess,
                });
                continue;
            }

            state.total_admissible += &bill.item.amount;
            state.matched_items.push(MatchResult {
                source_name: kind.label(name),
                bill_item_name: bill.item.name.clone(),
                bill_index: bill.index,
                amount: bill.item.amount.clone(),
                score: hit.score,
                status: MatchStatus::Admissible,
                flags: MatchFlags {
                    is_consultation: fee.is_consultation,
                    is_test: kind == SourceKind::Test,
                    is_vaccination: false,
                },
            });
        }
    }

    /// Remaining-bills phase: vaccinations and consultations are exempt, the rest is inadmissible
    fn settle_remaining(&self, state: &mut ReconciliationState<'_>) {
        let classifier = self.classifier();
        let remaining = std::mem::take(&mut state.pool);
        let mut processed: IndexSet<String> = IndexSet::new();

        for bill in remaining {
            let key = normalize(&bill.item.name);
            if state.consumed_names.contains(&key) || !processed.insert(key) {
                tracing::debug!("Skipping duplicate bill line {:?}", bill.item.name);
                state.duplicate_bill_items += 1;
                continue;
            }

            if classifier.is_vaccination(&bill.item.name) {
                state.total_admissible += &bill.item.amount;
                state.matched_items.push(MatchResult {
                    source_name: "Vaccination".to_string(),
                    bill_item_name: bill.item.name.clone(),
                    bill_index: bill.index,
                    amount: bill.item.amount.clone(),
                    score: 1.0,
                    status: MatchStatus::Admissible,
                    flags: MatchFlags {
                        is_vaccination: true,
                        ..MatchFlags::default()
                    },
                });
                continue;
            }

            let fee = classifier.classify_consultation_fee(&bill.item.name, &bill.item.amount);
            if !fee.is_consultation {
                state.total_inadmissible += &bill.item.amount;
                state.inadmissible_items.push(InadmissibleEntry {
                    bill_item_name: bill.item.name.clone(),
                    bill_index: bill.index,
                    amount: bill.item.amount.clone(),
                    reason: "Item not found in prescription".to_string(),
                });
                continue;
            }

            if fee.excess > BigDecimal::zero() {
                state.total_admissible += &fee.admissible;
                state.total_consultation_excess += &fee.excess;
                state.consultation_adjustments.push(ConsultationAdjustment {
                    item_name: bill.item.name.clone(),
                    source_name: None,
                    bill_index: bill.index,
                    score: 0.0,
                    billed_amount: bill.item.amount.clone(),
                    admissible_amount: fee.admissible,
                    reason: self.cap_reason(&fee.excess),
                    excess_amount: fee.excess,
                });
            } else {
                state.total_admissible += &bill.item.amount;
                state.matched_items.push(MatchResult {
                    source_name: "Consultation Fee".to_string(),
                    bill_item_name: bill.item.name.clone(),
                    bill_index: bill.index,
                    amount: bill.item.amount.clone(),
                    score: 1.0,
                    status: MatchStatus::Admissible,
                    flags: MatchFlags {
                        is_consultation: true,
                        ..MatchFlags::default()
                    },
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::lookup::{LearnedNameStore, NoLookup};
    use std::collections::HashSet;
    use std::str::FromStr;

    fn bill(name: &str, amount: &str) -> BillItem {
        BillItem::new(name, BigDecimal::from_str(amount).expect("valid amount"))
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn assert_conserved(summary: &ReconciliationSummary) {
        let t = &summary.totals;
        assert_eq!(
            &t.admissible + &t.inadmissible + &t.consultation_excess,
            t.total_amount
        );
    }

    fn consumed_indices(summary: &ReconciliationSummary) -> Vec<usize> {
        summary
            .matched_items
            .iter()
            .map(|m| m.bill_index)
            .chain(summary.consultation_adjustments.iter().map(|a| a.bill_index))
            .chain(summary.inadmissible_items.iter().map(|i| i.bill_index))
            .collect()
    }

    #[test]
    fn basic_scenario() {
        let config = EngineConfig::default();
        let engine = ReconciliationEngine::new(&config, &NoLookup);
        let summary = engine.reconcile(
            &names(&["CROCIN 650MG", "AZITHROMYCIN 250"]),
            &[
                bill("CROCIN TAB 650MG", "50.0"),
                bill("AZITHROMYCIN 250 TAB", "120.0"),
                bill("CONSULTATION FEE", "450.0"),
            ],
            &[],
        );

        assert_eq!(summary.matched_items.len(), 2);
        let matched_total = summary
            .matched_items
            .iter()
            .fold(BigDecimal::zero(), |acc, m| acc + &m.amount);
        assert_eq!(matched_total, BigDecimal::from(170));

        assert_eq!(summary.consultation_adjustments.len(), 1);
        let adj = &summary.consultation_adjustments[0];
        assert_eq!(adj.admissible_amount, BigDecimal::from(300));
        assert_eq!(adj.excess_amount, BigDecimal::from(150));
        assert_eq!(adj.reason, "Consultation fee capped at ₹300.00. Excess: ₹150.00");
        assert!(adj.source_name.is_none());

        assert_eq!(summary.totals.admissible, BigDecimal::from(470));
        assert_eq!(summary.totals.consultation_excess, BigDecimal::from(150));
        assert_eq!(summary.totals.inadmissible, BigDecimal::zero());
        assert_eq!(summary.totals.total_amount, BigDecimal::from(620));
        assert_conserved(&summary);
    }

    #[test]
    fn duplicate_prescriptions_are_matched_once() {
        let config = EngineConfig::default();
        let engine = ReconciliationEngine::new(&config, &NoLookup);
        let summary = engine.reconcile(
            &names(&["Crocin 650mg", "CROCIN TAB", "crocin"]),
            &[bill("CROCIN TAB 650MG", "50"), bill("CROCIN 650", "50")],
            &[],
        );
        assert_eq!(summary.counts.total_prescriptions, 1);
        assert_eq!(summary.matched_items.len(), 1);
        assert_eq!(summary.matched_items[0].source_name, "Crocin 650mg");
        // second crocin line normalizes differently ("crocin 650") and is not prescribed
        assert_eq!(summary.inadmissible_items.len(), 1);
    }

    #[test]
    fn pool_lines_are_never_consumed_twice() {
        let config = EngineConfig::default();
        let engine = ReconciliationEngine::new(&config, &NoLookup);
        let summary = engine.reconcile(
            &names(&["DOLO 650", "DOLO 650 DT", "CROCIN", "CROCIN ADVANCE"]),
            &[bill("DOLO-650 TABLET", "45"), bill("CROCIN ADVANCE", "60")],
            &names(&["DOLO"]),
        );
        let indices = consumed_indices(&summary);
        let unique: HashSet<_> = indices.iter().collect();
        assert_eq!(indices.len(), unique.len());
        assert_eq!(summary.matched_items.len(), 2);
        assert_eq!(summary.unmatched_prescriptions.len(), 2);
        assert_eq!(summary.unmatched_tests.len(), 1);
        assert_eq!(summary.unmatched_tests[0].reason, "Test not found in bills");
        assert_conserved(&summary);
    }

    #[test]
    fn tests_match_after_prescriptions() {
        let config = EngineConfig::default();
        let engine = ReconciliationEngine::new(&config, &NoLookup);
        let summary = engine.reconcile(
            &names(&["CETIRIZINE 10MG"]),
            &[
                bill("CETIRIZINE TAB 10MG", "25"),
                bill("CBC TEST", "350"),
                bill("X-RAY CHEST PA VIEW", "400"),
            ],
            &names(&["CBC", "X RAY CHEST"]),
        );
        let tests: Vec<_> = summary.matched_items.iter().filter(|m| m.flags.is_test).collect();
        assert_eq!(tests.len(), 2);
        assert_eq!(tests[0].source_name, "Test: CBC");
        assert_eq!(summary.totals.admissible, BigDecimal::from(775));
        assert!(summary.inadmissible_items.is_empty());
    }

    #[test]
    fn remaining_lines_are_classified() {
        let config = EngineConfig::default();
        let engine = ReconciliationEngine::new(&config, &NoLookup);
        let summary = engine.reconcile(
            &[],
            &[
                bill("MMR VACCINE", "800"),
                bill("DOCTOR FEE", "200"),
                bill("FACE WASH", "150"),
                bill("Face-Wash", "150"),
                bill("GST 12%", "30"),
            ],
            &[],
        );
        assert_eq!(summary.counts.excluded_bill_items, 1);
        assert_eq!(summary.counts.duplicate_bill_items, 1);
        assert!(summary.matched_items[0].flags.is_vaccination);
        assert!(summary.matched_items[1].flags.is_consultation);
        assert_eq!(summary.matched_items[1].source_name, "Consultation Fee");
        assert_eq!(summary.inadmissible_items.len(), 1);
        assert_eq!(summary.totals.admissible, BigDecimal::from(1000));
        assert_eq!(summary.totals.inadmissible, BigDecimal::from(150));
        assert_conserved(&summary);
    }

    #[test]
    fn matched_consultation_above_cap_keeps_source() {
        let config = EngineConfig::default();
        let engine = ReconciliationEngine::new(&config, &NoLookup);
        let summary = engine.reconcile(
            &names(&["Consultation"]),
            &[bill("Consultation Charges", "500")],
            &[],
        );
        assert!(summary.matched_items.is_empty());
        let adj = &summary.consultation_adjustments[0];
        assert_eq!(adj.source_name.as_deref(), Some("Consultation"));
        assert!(adj.score >= config.prescription_threshold);
        assert_eq!(summary.totals.consultation_excess, BigDecimal::from(200));
    }

    #[test]
    fn empty_inputs_are_a_valid_outcome() {
        let config = EngineConfig::default();
        let engine = ReconciliationEngine::new(&config, &NoLookup);
        let summary = engine.reconcile(&names(&["CROCIN"]), &[], &[]);
        assert_eq!(summary.unmatched_prescriptions.len(), 1);
        assert_eq!(summary.totals.total_amount, BigDecimal::zero());

        let summary = engine.reconcile(&[], &[bill("RANDOM ITEM", "99.50")], &[]);
        assert_eq!(summary.totals.inadmissible, BigDecimal::from_str("99.50").unwrap());
        assert_conserved(&summary);
    }

    #[test]
    fn learned_spelling_is_used_for_matching() {
        let config = EngineConfig::default();
        let store = LearnedNameStore::new();
        let bills = [bill("AZITHROMYCIN TAB", "110")];

        let plain = ReconciliationEngine::new(&config, &NoLookup).reconcile(&names(&["AZEE"]), &bills, &[]);
        assert!(plain.matched_items.is_empty());

        store.learn_name("AZEE", "AZITHROMYCIN");
        let learned = ReconciliationEngine::new(&config, &store).reconcile(&names(&["AZEE"]), &bills, &[]);
        assert_eq!(learned.matched_items.len(), 1);
        assert_eq!(learned.matched_items[0].source_name, "AZEE");
        assert_eq!(learned.matched_items[0].score, 1.0);
    }
}
