use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Admissible,
}

/// Category tags attached to a matched bill line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchFlags {
    pub is_consultation: bool,
    pub is_test: bool,
    pub is_vaccination: bool,
}

/// A bill line accepted for reimbursement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    /// Prescription/test that justified the line, or the exemption label
    pub source_name: String,
    pub bill_item_name: String,
    /// Position of the consumed line in the caller's bill list
    pub bill_index: usize,
    pub amount: BigDecimal,
    /// Fuzzy similarity in [0, 1]
    pub score: f64,
    pub status: MatchStatus,
    pub flags: MatchFlags,
}

/// Prescription or test with no acceptable bill counterpart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnmatchedEntry {
    pub name: String,
    pub reason: String,
}

/// Bill line with no prescription/test justification and no exemption
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InadmissibleEntry {
    pub bill_item_name: String,
    pub bill_index: usize,
    pub amount: BigDecimal,
    pub reason: String,
}

/// Consultation fee above the cap: admissible part and tracked excess
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsultationAdjustment {
    pub item_name: String,
    /// Prescription that matched the fee, if it was matched rather than exempted
    pub source_name: Option<String>,
    pub bill_index: usize,
    pub score: f64,
    pub billed_amount: BigDecimal,
    pub admissible_amount: BigDecimal,
    pub excess_amount: BigDecimal,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationCounts {
    pub total_prescriptions: usize,
    pub total_tests: usize,
    pub total_bill_items: usize,
    /// Totals/tax/footer lines dropped before matching
    pub excluded_bill_items: usize,
    /// Unmatched lines skipped because an equal normalized name was already handled
    pub duplicate_bill_items: usize,
    pub matched_count: usize,
    pub unmatched_prescription_count: usize,
    pub unmatched_test_count: usize,
    pub inadmissible_count: usize,
    pub consultation_adjustment_count: usize,
}

/// Monetary totals. `total_amount = admissible + inadmissible + consultation_excess`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationTotals {
    pub admissible: BigDecimal,
    pub inadmissible: BigDecimal,
    pub consultation_excess: BigDecimal,
    pub total_amount: BigDecimal,
}

impl ReconciliationTotals {
    /// Round each component to paise and derive the total from the rounded parts
    pub fn new(admissible: BigDecimal, inadmissible: BigDecimal, consultation_excess: BigDecimal) -> Self {
        let admissible = admissible.round(2);
        let inadmissible = inadmissible.round(2);
        let consultation_excess = consultation_excess.round(2);
        let total_amount = &admissible + &inadmissible + &consultation_excess;
        Self {
            admissible,
            inadmissible,
            consultation_excess,
            total_amount,
        }
    }
}

impl Default for ReconciliationTotals {
    fn default() -> Self {
        Self::new(BigDecimal::zero(), BigDecimal::zero(), BigDecimal::zero())
    }
}

/// Output of one reconciliation run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationSummary {
    pub matched_items: Vec<MatchResult>,
    pub unmatched_prescriptions: Vec<UnmatchedEntry>,
    pub unmatched_tests: Vec<UnmatchedEntry>,
    pub inadmissible_items: Vec<InadmissibleEntry>,
    pub consultation_adjustments: Vec<ConsultationAdjustment>,
    pub counts: ReconciliationCounts,
    pub totals: ReconciliationTotals,
}

impl ReconciliationSummary {
    /// Matched items plus capped consultations that were consulting fees
    pub fn consultation_count(&self) -> usize {
        self.matched_items
            .iter()
            .filter(|m| m.flags.is_consultation)
            .count()
            + self.consultation_adjustments.len()
    }

    /// Matched items that are neither consultations nor tests
    pub fn medicine_count(&self) -> usize {
        self.matched_items
            .iter()
            .filter(|m| !m.flags.is_consultation && !m.flags.is_test)
            .count()
    }
}

/// `₹1234.50` style rendering used in reasons and reports
pub fn format_rupees(amount: &BigDecimal) -> String {
    format!("₹{}", amount.round(2).with_scale(2))
}
