use crate::config::EngineConfig;
use crate::models::{
    format_rupees, ClaimFormRecord, Confidence, Discrepancy, DiscrepancyKind, ReconciliationSummary,
    Severity, TreatmentRow, VerificationMatch, VerificationMatchKind, VerificationReport,
    VerificationStatus, VerificationSummary,
};
use bigdecimal::{BigDecimal, Zero};

/// Compares what a claim form declares with what the bills support.
pub struct CrossVerifier<'a> {
    config: &'a EngineConfig,
}

impl<'a> CrossVerifier<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    pub fn verify(&self, claim_form: &ClaimFormRecord, summary: &ReconciliationSummary) -> VerificationReport {
        let claimed = claim_form
            .declared_amounts
            .total_claimed
            .clone()
            .unwrap_or_else(BigDecimal::zero);
        let admissible = summary.totals.admissible.clone();
        let difference = (&claimed - &admissible).abs().round(2);

        let discrepancy_percentage = if claimed > BigDecimal::zero() {
            (&(&difference * &BigDecimal::from(100)) / &claimed).round(2)
        } else {
            BigDecimal::zero()
        };

        let mut discrepancies = Vec::new();
        let mut matches = Vec::new();

        let status = if difference > self.config.total_tolerance {
            if claimed > admissible {
                let severity = if difference > self.config.high_severity_threshold {
                    Severity::High
                } else {
                    Severity::Medium
                };
                discrepancies.push(Discrepancy {
                    kind: DiscrepancyKind::AmountMismatch,
                    severity,
                    description: format!(
                        "Claimed amount ({}) exceeds admissible amount ({})",
                        format_rupees(&claimed),
                        format_rupees(&admissible)
                    ),
                    difference: Some(difference.clone()),
                    claimed_amount: Some(claimed.clone()),
                });
                VerificationStatus::OverClaimed
            } else {
                discrepancies.push(Discrepancy {
                    kind: DiscrepancyKind::AmountMismatch,
                    severity: Severity::Low,
                    description: format!(
                        "Claimed amount ({}) is less than admissible amount ({})",
                        format_rupees(&claimed),
                        format_rupees(&admissible)
                    ),
                    difference: Some(difference.clone()),
                    claimed_amount: Some(claimed.clone()),
                });
                VerificationStatus::UnderClaimed
            }
        } else {
            matches.push(VerificationMatch {
                kind: VerificationMatchKind::AmountMatch,
                description: format!(
                    "Claimed amount matches admissible amount ({})",
                    format_rupees(&admissible)
                ),
                form_item: None,
                bill_item: None,
                confidence: Confidence::High,
            });
            VerificationStatus::Verified
        };

        self.verify_treatment_rows(&claim_form.treatment_details, summary, &mut discrepancies, &mut matches);
        self.check_supporting_documents(&claim_form.treatment_details, summary, &mut discrepancies);

        tracing::info!(
            "Verification {:?}: claimed {}, admissible {}, {} discrepancies",
            status,
            claimed,
            admissible,
            discrepancies.len()
        );

        VerificationReport {
            status,
            discrepancies,
            matches,
            summary: VerificationSummary {
                claimed_amount: claimed,
                actual_bill_amount: summary.totals.total_amount.clone(),
                admissible_amount: admissible,
                difference,
                discrepancy_percentage,
            },
        }
    }

    /// Within the absolute band, or within the relative band of a positive claim
    fn amounts_agree(&self, claimed: &BigDecimal, billed: &BigDecimal) -> bool {
        let diff = (claimed - billed).abs();
        if diff <= self.config.row_amount_tolerance {
            return true;
        }
        *claimed > BigDecimal::zero() && diff <= claimed * &self.config.row_relative_tolerance
    }

    /// First matched bill line whose amount agrees with each claimed row
    fn verify_treatment_rows(
        &self,
        rows: &[TreatmentRow],
        summary: &ReconciliationSummary,
        discrepancies: &mut Vec<Discrepancy>,
        matches: &mut Vec<VerificationMatch>,
    ) {
        for row in rows {
            let treatment_type = row.treatment_type_or_unknown();
            let found = summary
                .matched_items
                .iter()
                .find(|item| self.amounts_agree(&row.amount, &item.amount));

            match found {
                Some(item) => {
                    let diff = (&row.amount - &item.amount).abs();
                    let confidence = if diff <= self.config.item_match_high_confidence {
                        Confidence::High
                    } else {
                        Confidence::Medium
                    };
                    let form_item = format!("{} - {}", treatment_type, format_rupees(&row.amount));
                    let bill_item = format!("{} - {}", item.bill_item_name, format_rupees(&item.amount));
                    matches.push(VerificationMatch {
                        kind: VerificationMatchKind::ItemMatch,
                        description: format!("{} matched to {}", form_item, bill_item),
                        form_item: Some(form_item),
                        bill_item: Some(bill_item),
                        confidence,
                    });
                }
                None if row.amount > BigDecimal::zero() => {
                    discrepancies.push(Discrepancy {
                        kind: DiscrepancyKind::MissingSupportingDocument,
                        severity: Severity::Medium,
                        description: format!(
                            "Claimed {} ({}) on {} - no matching bill found",
                            treatment_type,
                            format_rupees(&row.amount),
                            row.date
                        ),
                        difference: None,
                        claimed_amount: Some(row.amount.clone()),
                    });
                }
                None => {}
            }
        }
    }

    /// More consultations/medicine purchases claimed than bills found
    fn check_supporting_documents(
        &self,
        rows: &[TreatmentRow],
        summary: &ReconciliationSummary,
        discrepancies: &mut Vec<Discrepancy>,
    ) {
        let consultations_claimed = rows.iter().filter(|r| r.is_consultation()).count();
        let medicines_claimed = rows.iter().filter(|r| r.is_medicine()).count();
        let consultations_found = summary.consultation_count();
        let medicines_found = summary.medicine_count();

        if consultations_claimed > consultations_found {
            discrepancies.push(Discrepancy {
                kind: DiscrepancyKind::MissingBills,
                severity: Severity::High,
                description: format!(
                    "Claimed {} consultations but found {} consultation bills",
                    consultations_claimed, consultations_found
                ),
                difference: None,
                claimed_amount: None,
            });
        }

        if medicines_claimed > medicines_found {
            discrepancies.push(Discrepancy {
                kind: DiscrepancyKind::MissingPrescriptions,
                severity: Severity::Medium,
                description: format!(
                    "Claimed {} medicine purchases but found {} medicine bills",
                    medicines_claimed, medicines_found
                ),
                difference: None,
                claimed_amount: None,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ConsultationAdjustment, DeclaredAmounts, MatchFlags, MatchResult, MatchStatus,
        ReconciliationTotals,
    };
    use std::str::FromStr;

    fn money(v: &str) -> BigDecimal {
        BigDecimal::from_str(v).expect("valid amount")
    }

    fn matched(name: &str, amount: &str, flags: MatchFlags) -> MatchResult {
        MatchResult {
            source_name: name.to_string(),
            bill_item_name: name.to_string(),
            bill_index: 0,
            amount: money(amount),
            score: 1.0,
            status: MatchStatus::Admissible,
            flags,
        }
    }

    /// The crocin/azithromycin/consultation reconciliation: admissible 470
    fn reconciled() -> ReconciliationSummary {
        ReconciliationSummary {
            matched_items: vec![
                matched("CROCIN TAB 650MG", "50", MatchFlags::default()),
                matched("AZITHROMYCIN 250 TAB", "120", MatchFlags::default()),
            ],
            consultation_adjustments: vec![ConsultationAdjustment {
                item_name: "CONSULTATION FEE".to_string(),
                source_name: None,
                bill_index: 2,
                score: 0.0,
                billed_amount: money("450"),
                admissible_amount: money("300"),
                excess_amount: money("150"),
                reason: String::new(),
            }],
            totals: ReconciliationTotals::new(money("470"), money("0"), money("150")),
            ..Default::default()
        }
    }

    fn form_claiming(total: &str, rows: Vec<TreatmentRow>) -> ClaimFormRecord {
        ClaimFormRecord {
            treatment_details: rows,
            declared_amounts: DeclaredAmounts {
                total_claimed: Some(money(total)),
                total_claimed_on_form: None,
            },
            ..Default::default()
        }
    }

    fn row(treatment_type: &str, amount: &str) -> TreatmentRow {
        TreatmentRow {
            date: "01.03.2024".to_string(),
            parsed_date: None,
            patient_name: None,
            relation: None,
            hospital_name: None,
            treatment_type: Some(treatment_type.to_string()),
            amount: money(amount),
            raw_text: String::new(),
        }
    }

    #[test]
    fn over_claim_is_medium_below_500() {
        let config = EngineConfig::default();
        let report = CrossVerifier::new(&config).verify(&form_claiming("620", vec![]), &reconciled());
        assert_eq!(report.status, VerificationStatus::OverClaimed);
        assert_eq!(report.summary.difference, money("150"));
        assert_eq!(report.discrepancies.len(), 1);
        assert_eq!(report.discrepancies[0].kind, DiscrepancyKind::AmountMismatch);
        assert_eq!(report.discrepancies[0].severity, Severity::Medium);
        assert_eq!(report.summary.discrepancy_percentage, money("24.19"));
        assert_eq!(report.summary.actual_bill_amount, money("620"));
    }

    #[test]
    fn large_over_claim_is_high() {
        let config = EngineConfig::default();
        let report = CrossVerifier::new(&config).verify(&form_claiming("1200", vec![]), &reconciled());
        assert_eq!(report.discrepancies[0].severity, Severity::High);
    }

    #[test]
    fn equal_amounts_verify() {
        let config = EngineConfig::default();
        let report = CrossVerifier::new(&config).verify(&form_claiming("470", vec![]), &reconciled());
        assert_eq!(report.status, VerificationStatus::Verified);
        assert!(report.discrepancies.is_empty());
        assert_eq!(report.matches.len(), 1);
        assert_eq!(report.matches[0].kind, VerificationMatchKind::AmountMatch);
    }

    #[test]
    fn within_rupee_tolerance_verifies() {
        let config = EngineConfig::default();
        let report = CrossVerifier::new(&config).verify(&form_claiming("470.80", vec![]), &reconciled());
        assert_eq!(report.status, VerificationStatus::Verified);
    }

    #[test]
    fn under_claim_is_low() {
        let config = EngineConfig::default();
        let report = CrossVerifier::new(&config).verify(&form_claiming("400", vec![]), &reconciled());
        assert_eq!(report.status, VerificationStatus::UnderClaimed);
        assert_eq!(report.discrepancies[0].severity, Severity::Low);
    }

    #[test]
    fn missing_claimed_total_counts_as_zero() {
        let config = EngineConfig::default();
        let report = CrossVerifier::new(&config).verify(&ClaimFormRecord::default(), &reconciled());
        assert_eq!(report.status, VerificationStatus::UnderClaimed);
        assert_eq!(report.summary.discrepancy_percentage, BigDecimal::zero());
    }

    #[test]
    fn rows_match_first_bill_within_band() {
        let config = EngineConfig::default();
        let form = form_claiming("145", vec![row("MEDICINE", "55"), row("MEDICINE", "90")]);
        let report = CrossVerifier::new(&config).verify(&form, &reconciled());

        let items: Vec<_> = report
            .matches
            .iter()
            .filter(|m| m.kind == VerificationMatchKind::ItemMatch)
            .collect();
        assert_eq!(items.len(), 2);
        // both rows are within 50 of the crocin line, which comes first
        assert_eq!(items[0].bill_item.as_deref(), Some("CROCIN TAB 650MG - ₹50.00"));
        assert_eq!(items[0].confidence, Confidence::High);
        assert_eq!(items[1].bill_item.as_deref(), Some("CROCIN TAB 650MG - ₹50.00"));
        assert_eq!(items[1].confidence, Confidence::Medium);
    }

    #[test]
    fn unsupported_row_is_flagged() {
        let config = EngineConfig::default();
        let form = form_claiming("470", vec![row("SURGERY", "5000"), row("SURGERY", "0")]);
        let report = CrossVerifier::new(&config).verify(&form, &reconciled());
        let missing: Vec<_> = report
            .discrepancies
            .iter()
            .filter(|d| d.kind == DiscrepancyKind::MissingSupportingDocument)
            .collect();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].claimed_amount, Some(money("5000")));
    }

    #[test]
    fn claimed_counts_exceeding_found_counts() {
        let config = EngineConfig::default();
        let form = form_claiming(
            "470",
            vec![
                row("CONSULTATION", "450"),
                row("CONSULTATION", "300"),
                row("MEDICINE", "50"),
                row("MEDICINE", "120"),
                row("MEDICINE", "20"),
            ],
        );
        let report = CrossVerifier::new(&config).verify(&form, &reconciled());
        let kinds: Vec<_> = report.discrepancies.iter().map(|d| d.kind).collect();
        assert!(kinds.contains(&DiscrepancyKind::MissingBills));
        assert!(kinds.contains(&DiscrepancyKind::MissingPrescriptions));
    }

    #[test]
    fn capped_consultation_counts_as_found() {
        let config = EngineConfig::default();
        let form = form_claiming("470", vec![row("CONSULTATION", "450")]);
        let report = CrossVerifier::new(&config).verify(&form, &reconciled());
        assert!(!report
            .discrepancies
            .iter()
            .any(|d| d.kind == DiscrepancyKind::MissingBills));
    }
}
