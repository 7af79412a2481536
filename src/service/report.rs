use crate::error::AppError;
use crate::models::{format_rupees, ClaimFormRecord, ReconciliationSummary, VerificationReport};
use bigdecimal::{BigDecimal, Zero};
use std::fmt;
use std::io;
use std::path::Path;

/// Matches listed in full before the report summarizes the rest
const REPORT_MATCH_LIMIT: usize = 5;

const RULE: &str = "============================================================";

fn or_na(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("N/A")
}

/// Plain-text verification report for reviewers
pub fn format_verification_report(claim_form: &ClaimFormRecord, report: &VerificationReport) -> String {
    let mut out = String::new();
    if let Err(e) = write_verification_report(&mut out, claim_form, report) {
        tracing::warn!("Verification report truncated: {}", e);
    }
    out
}

/// Render the verification report into any text sink
pub fn write_verification_report<W: fmt::Write>(
    out: &mut W,
    claim_form: &ClaimFormRecord,
    report: &VerificationReport,
) -> fmt::Result {
    let employee = &claim_form.employee_details;
    let claim = &claim_form.claim_details;
    let summary = &report.summary;

    // 1. header and employee block
    writeln!(out, "{}", RULE)?;
    writeln!(out, "MEDICAL CLAIM VERIFICATION REPORT")?;
    writeln!(out, "{}", RULE)?;
    writeln!(out)?;
    writeln!(out, "Employee: {} ({})", or_na(&employee.name), or_na(&employee.employee_no))?;
    writeln!(out, "Department: {}", or_na(&employee.department))?;
    writeln!(out, "Claim No: {}", or_na(&claim.claim_no))?;
    writeln!(out)?;

    // 2. amounts and status
    writeln!(out, "AMOUNT VERIFICATION")?;
    writeln!(out, "  Claimed Amount:    {}", format_rupees(&summary.claimed_amount))?;
    writeln!(out, "  Bill Amount:       {}", format_rupees(&summary.actual_bill_amount))?;
    writeln!(out, "  Admissible Amount: {}", format_rupees(&summary.admissible_amount))?;
    writeln!(
        out,
        "  Difference:        {} ({}%)",
        format_rupees(&summary.difference),
        summary.discrepancy_percentage.with_scale(2)
    )?;
    writeln!(out)?;
    writeln!(out, "STATUS: {}", report.status.label())?;

    // 3. discrepancies
    if !report.discrepancies.is_empty() {
        writeln!(out)?;
        writeln!(out, "DISCREPANCIES FOUND: {}", report.discrepancies.len())?;
        for (i, discrepancy) in report.discrepancies.iter().enumerate() {
            writeln!(
                out,
                "  {}. [{}] {}",
                i + 1,
                discrepancy.severity.label(),
                discrepancy.description
            )?;
        }
    }

    // 4. matches, truncated
    if !report.matches.is_empty() {
        writeln!(out)?;
        writeln!(out, "VERIFIED MATCHES: {}", report.matches.len())?;
        for entry in report.matches.iter().take(REPORT_MATCH_LIMIT) {
            writeln!(out, "  - {}", entry.description)?;
        }
        if report.matches.len() > REPORT_MATCH_LIMIT {
            writeln!(out, "  ... and {} more", report.matches.len() - REPORT_MATCH_LIMIT)?;
        }
    }

    writeln!(out, "{}", RULE)
}

const CSV_HEADER: [&str; 7] = [
    "category",
    "source",
    "bill_item",
    "billed_amount",
    "admissible_amount",
    "excess_amount",
    "score",
];

/// One CSV row per classified bill line: matched, capped consultation, then inadmissible
pub fn write_csv<W: io::Write>(summary: &ReconciliationSummary, writer: W) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(CSV_HEADER)?;

    let zero = BigDecimal::zero();

    for item in &summary.matched_items {
        writer.write_record(&[
            "matched".to_string(),
            item.source_name.clone(),
            item.bill_item_name.clone(),
            item.amount.to_string(),
            item.amount.to_string(),
            zero.to_string(),
            format!("{:.3}", item.score),
        ])?;
    }

    for adjustment in &summary.consultation_adjustments {
        writer.write_record(&[
            "consultation_capped".to_string(),
            adjustment.source_name.clone().unwrap_or_default(),
            adjustment.item_name.clone(),
            adjustment.billed_amount.to_string(),
            adjustment.admissible_amount.to_string(),
            adjustment.excess_amount.to_string(),
            format!("{:.3}", adjustment.score),
        ])?;
    }

    for item in &summary.inadmissible_items {
        writer.write_record(&[
            "inadmissible".to_string(),
            String::new(),
            item.bill_item_name.clone(),
            item.amount.to_string(),
            zero.to_string(),
            zero.to_string(),
            String::new(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Export a reconciliation to a CSV file
pub fn export_to_csv(summary: &ReconciliationSummary, output_path: &Path) -> Result<(), AppError> {
    let file = std::fs::File::create(output_path)?;
    write_csv(summary, file)?;
    tracing::info!("Exported reconciliation to {}", output_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Confidence, ConsultationAdjustment, Discrepancy, DiscrepancyKind, EmployeeDetails,
        InadmissibleEntry, MatchFlags, MatchResult, MatchStatus, ReconciliationTotals, Severity,
        VerificationMatch, VerificationMatchKind, VerificationStatus, VerificationSummary,
    };

    fn summary() -> ReconciliationSummary {
        ReconciliationSummary {
            matched_items: vec![MatchResult {
                source_name: "Crocin 650".to_string(),
                bill_item_name: "CROCIN TAB 650MG".to_string(),
                bill_index: 0,
                amount: BigDecimal::from(50),
                score: 0.8,
                status: MatchStatus::Admissible,
                flags: MatchFlags::default(),
            }],
            consultation_adjustments: vec![ConsultationAdjustment {
                item_name: "CONSULTATION FEE".to_string(),
                source_name: None,
                bill_index: 2,
                score: 0.0,
                billed_amount: BigDecimal::from(450),
                admissible_amount: BigDecimal::from(300),
                excess_amount: BigDecimal::from(150),
                reason: "Consultation fee capped at ₹300.00. Excess: ₹150.00".to_string(),
            }],
            inadmissible_items: vec![InadmissibleEntry {
                bill_item_name: "Vitamin D".to_string(),
                bill_index: 3,
                amount: BigDecimal::from(200),
                reason: "Item not found in prescription".to_string(),
            }],
            totals: ReconciliationTotals::new(
                BigDecimal::from(350),
                BigDecimal::from(200),
                BigDecimal::from(150),
            ),
            ..Default::default()
        }
    }

    fn report(match_count: usize) -> VerificationReport {
        VerificationReport {
            status: VerificationStatus::OverClaimed,
            discrepancies: vec![Discrepancy {
                kind: DiscrepancyKind::AmountMismatch,
                severity: Severity::Medium,
                description: "Claimed amount (₹620.00) exceeds admissible amount (₹470.00)".to_string(),
                difference: Some(BigDecimal::from(150)),
                claimed_amount: Some(BigDecimal::from(620)),
            }],
            matches: (0..match_count)
                .map(|i| VerificationMatch {
                    kind: VerificationMatchKind::ItemMatch,
                    description: format!("row {}", i),
                    form_item: None,
                    bill_item: None,
                    confidence: Confidence::High,
                })
                .collect(),
            summary: VerificationSummary {
                claimed_amount: BigDecimal::from(620),
                actual_bill_amount: BigDecimal::from(620),
                admissible_amount: BigDecimal::from(470),
                difference: BigDecimal::from(150),
                discrepancy_percentage: "24.19".parse().expect("decimal"),
            },
        }
    }

    #[test]
    fn text_report_lists_status_and_discrepancies() {
        let form = ClaimFormRecord {
            employee_details: EmployeeDetails {
                name: Some("Ramesh Kumar".to_string()),
                employee_no: Some("E12345".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let text = format_verification_report(&form, &report(2));
        assert!(text.contains("Employee: Ramesh Kumar (E12345)"));
        assert!(text.contains("Department: N/A"));
        assert!(text.contains("Difference:        ₹150.00 (24.19%)"));
        assert!(text.contains("STATUS: OVER-CLAIMED"));
        assert!(text.contains("1. [MEDIUM] Claimed amount (₹620.00)"));
        assert!(text.contains("VERIFIED MATCHES: 2"));
        assert!(!text.contains("more"));
    }

    #[test]
    fn text_report_truncates_matches() {
        let text = format_verification_report(&ClaimFormRecord::default(), &report(8));
        assert!(text.contains("  - row 4"));
        assert!(!text.contains("  - row 5"));
        assert!(text.contains("... and 3 more"));
    }

    #[test]
    fn report_writer_matches_string_rendering() {
        let form = ClaimFormRecord::default();
        let mut out = String::new();
        write_verification_report(&mut out, &form, &report(1)).expect("write to string");
        assert_eq!(out, format_verification_report(&form, &report(1)));
        assert!(out.starts_with(RULE));
        assert!(out.trim_end().ends_with(RULE));
    }

    #[test]
    fn csv_has_a_row_per_classified_line() {
        let mut buf = Vec::new();
        write_csv(&summary(), &mut buf).expect("csv write");
        let text = String::from_utf8(buf).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(
            lines[0],
            "category,source,bill_item,billed_amount,admissible_amount,excess_amount,score"
        );
        assert_eq!(lines[1], "matched,Crocin 650,CROCIN TAB 650MG,50,50,0,0.800");
        assert!(lines[2].starts_with("consultation_capped,,CONSULTATION FEE,450,300,150,"));
        assert_eq!(lines[3], "inadmissible,,Vitamin D,200,0,0,");
    }

    #[test]
    fn export_writes_file() {
        let path = std::env::temp_dir().join(format!("reconcile-export-{}.csv", std::process::id()));
        export_to_csv(&summary(), &path).expect("export");
        let text = std::fs::read_to_string(&path).expect("read back");
        assert!(text.contains("Vitamin D"));
        let _ = std::fs::remove_file(&path);
    }
}
