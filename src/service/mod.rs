pub mod claim_form;
pub mod classifier;
pub mod fuzzy;
pub mod lookup;
pub mod normalizer;
pub mod pipeline;
pub mod reconciler;
pub mod report;
pub mod verifier;

pub use claim_form::ClaimFormExtractor;
pub use classifier::ItemClassifier;
pub use lookup::{LearnedNameStore, NameLookup, NoLookup};
pub use pipeline::ClaimReconciler;
pub use reconciler::ReconciliationEngine;
pub use report::{export_to_csv, format_verification_report, write_csv, write_verification_report};
pub use verifier::CrossVerifier;
