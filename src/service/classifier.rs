use super::normalizer::normalize;
use crate::config::EngineConfig;
use crate::models::BillItem;
use bigdecimal::{BigDecimal, Zero};

/// Minimum trimmed length of a bill line name worth matching
const MIN_BILL_NAME_LEN: usize = 3;

/// Result of checking a bill line against the consultation-fee rules
#[derive(Debug, Clone, PartialEq)]
pub struct ConsultationFee {
    pub is_consultation: bool,
    pub admissible: BigDecimal,
    pub excess: BigDecimal,
}

/// Tags bill lines as consultation fee, vaccination, or non-item noise.
pub struct ItemClassifier<'a> {
    config: &'a EngineConfig,
}

impl<'a> ItemClassifier<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Consultation fees are admissible up to the cap; the rest is excess.
    /// Anything else passes through with its full amount and zero excess.
    pub fn classify_consultation_fee(&self, name: &str, amount: &BigDecimal) -> ConsultationFee {
        let normalized = normalize(name);
        let is_consultation = self
            .config
            .vocabulary
            .consultation
            .iter()
            .any(|keyword| normalized.contains(keyword.as_str()));

        let cap = &self.config.consultation_fee_cap;
        if is_consultation && amount > cap {
            return ConsultationFee {
                is_consultation,
                admissible: cap.clone(),
                excess: amount - cap,
            };
        }

        ConsultationFee {
            is_consultation,
            admissible: amount.clone(),
            excess: BigDecimal::zero(),
        }
    }

    pub fn is_vaccination(&self, name: &str) -> bool {
        let normalized = normalize(name);
        self.config
            .vocabulary
            .vaccination
            .iter()
            .any(|keyword| normalized.contains(keyword.as_str()))
    }

    /// Totals, taxes, discounts and near-empty names are not line items
    pub fn is_excluded(&self, name: &str) -> bool {
        let lowered = name.to_lowercase();
        if lowered.trim().chars().count() < MIN_BILL_NAME_LEN {
            return true;
        }
        self.config
            .vocabulary
            .exclusion
            .iter()
            .any(|keyword| lowered.contains(keyword.as_str()))
    }

    /// Split bills into (input index, item) pairs worth matching and a count of dropped lines
    pub fn filter_bill_items<'b>(&self, bill_items: &'b [BillItem]) -> (Vec<(usize, &'b BillItem)>, usize) {
        let mut kept = Vec::with_capacity(bill_items.len());
        let mut excluded = 0;
        for (index, item) in bill_items.iter().enumerate() {
            if self.is_excluded(&item.name) {
                tracing::debug!("Excluding non-item bill line {:?}", item.name);
                excluded += 1;
                continue;
            }
            kept.push((index, item));
        }
        (kept, excluded)
    }
}
