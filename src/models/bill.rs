use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

/// A billed line item (name + amount) as extracted from a pharmacy/hospital bill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillItem {
    pub name: String,
    pub amount: BigDecimal,
}

impl BillItem {
    pub fn new(name: impl Into<String>, amount: BigDecimal) -> Self {
        Self {
            name: name.into(),
            amount,
        }
    }
}

/// Lists previously extracted from a document, served by the host's cache
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CachedExtraction {
    pub prescriptions: Vec<String>,
    pub bill_items: Vec<BillItem>,
    pub tests: Vec<String>,
}

/// One reconciliation request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReconciliationRequest {
    pub prescriptions: Vec<String>,
    pub bill_items: Vec<BillItem>,
    pub tests: Vec<String>,
    pub claim_form_text: Option<String>,
    /// Hash of the source document; lets the host reuse a cached extraction
    pub document_hash: Option<String>,
}

impl ReconciliationRequest {
    pub fn new(prescriptions: Vec<String>, bill_items: Vec<BillItem>, tests: Vec<String>) -> Self {
        Self {
            prescriptions,
            bill_items,
            tests,
            ..Default::default()
        }
    }

    pub fn with_claim_form(mut self, text: impl Into<String>) -> Self {
        self.claim_form_text = Some(text.into());
        self
    }

    /// True when no extraction lists were supplied
    pub fn has_no_lists(&self) -> bool {
        self.prescriptions.is_empty() && self.bill_items.is_empty() && self.tests.is_empty()
    }

    pub fn extraction(&self) -> CachedExtraction {
        CachedExtraction {
            prescriptions: self.prescriptions.clone(),
            bill_items: self.bill_items.clone(),
            tests: self.tests.clone(),
        }
    }
}
