pub mod bill;
pub mod claim_form;
pub mod outcome;
pub mod result;
pub mod verification;

pub use bill::{BillItem, CachedExtraction, ReconciliationRequest};
pub use claim_form::{ClaimDetails, ClaimFormRecord, DeclaredAmounts, EmployeeDetails, TreatmentRow};
pub use outcome::ReconciliationOutcome;
pub use result::{
    format_rupees, ConsultationAdjustment, InadmissibleEntry, MatchFlags, MatchResult, MatchStatus,
    ReconciliationCounts, ReconciliationSummary, ReconciliationTotals, UnmatchedEntry,
};
pub use verification::{
    Confidence, Discrepancy, DiscrepancyKind, Severity, VerificationMatch, VerificationMatchKind,
    VerificationReport, VerificationStatus, VerificationSummary,
};
