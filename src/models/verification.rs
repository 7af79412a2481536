use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Verified,
    OverClaimed,
    UnderClaimed,
}

impl VerificationStatus {
    pub fn label(&self) -> &'static str {
        match self {
            VerificationStatus::Verified => "VERIFIED",
            VerificationStatus::OverClaimed => "OVER-CLAIMED",
            VerificationStatus::UnderClaimed => "UNDER-CLAIMED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Low => "LOW",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscrepancyKind {
    AmountMismatch,
    MissingSupportingDocument,
    MissingBills,
    MissingPrescriptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Discrepancy {
    #[serde(rename = "type")]
    pub kind: DiscrepancyKind,
    pub severity: Severity,
    pub description: String,
    pub difference: Option<BigDecimal>,
    pub claimed_amount: Option<BigDecimal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationMatchKind {
    AmountMatch,
    ItemMatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Confidence {
    High,
    Medium,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationMatch {
    #[serde(rename = "type")]
    pub kind: VerificationMatchKind,
    pub description: String,
    pub form_item: Option<String>,
    pub bill_item: Option<String>,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationSummary {
    pub claimed_amount: BigDecimal,
    pub actual_bill_amount: BigDecimal,
    pub admissible_amount: BigDecimal,
    /// Absolute claimed-vs-admissible difference
    pub difference: BigDecimal,
    /// Difference as a percentage of the claimed amount; 0 when nothing was claimed
    pub discrepancy_percentage: BigDecimal,
}

/// Outcome of comparing a claim form against a reconciliation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationReport {
    pub status: VerificationStatus,
    pub discrepancies: Vec<Discrepancy>,
    pub matches: Vec<VerificationMatch>,
    pub summary: VerificationSummary,
}
