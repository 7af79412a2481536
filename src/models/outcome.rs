use serde::{Deserialize, Serialize};

use super::{ClaimFormRecord, ReconciliationSummary, VerificationReport};

/// Full result for one request: reconciliation, plus claim-form checks when a form was found
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationOutcome {
    pub summary: ReconciliationSummary,
    pub claim_form: Option<ClaimFormRecord>,
    pub verification: Option<VerificationReport>,
}
