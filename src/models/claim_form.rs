use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeDetails {
    pub employee_no: Option<String>,
    pub name: Option<String>,
    pub designation: Option<String>,
    pub department: Option<String>,
    pub grade: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimDetails {
    pub claim_no: Option<String>,
    pub claim_date: Option<String>,
    pub place_of_treatment: Option<String>,
    pub township: Option<String>,
}

/// One row of the claim form's treatment table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreatmentRow {
    /// Date token as written on the form
    pub date: String,
    /// Calendar date, when the token is a real date
    pub parsed_date: Option<NaiveDate>,
    pub patient_name: Option<String>,
    pub relation: Option<String>,
    pub hospital_name: Option<String>,
    pub treatment_type: Option<String>,
    pub amount: BigDecimal,
    pub raw_text: String,
}

impl TreatmentRow {
    pub fn treatment_type_or_unknown(&self) -> &str {
        self.treatment_type.as_deref().unwrap_or("UNKNOWN")
    }

    pub fn is_consultation(&self) -> bool {
        self.treatment_type
            .as_deref()
            .is_some_and(|t| t.to_uppercase().contains("CONSULT"))
    }

    pub fn is_medicine(&self) -> bool {
        self.treatment_type
            .as_deref()
            .is_some_and(|t| t.to_uppercase().contains("MEDICINE"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclaredAmounts {
    /// Sum of treatment row amounts; absent when no rows were found
    pub total_claimed: Option<BigDecimal>,
    /// Explicit "amount in rupees"/"total" figure printed on the form
    pub total_claimed_on_form: Option<BigDecimal>,
}

/// Structured view of a medical reimbursement claim form
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimFormRecord {
    pub employee_details: EmployeeDetails,
    pub claim_details: ClaimDetails,
    pub treatment_details: Vec<TreatmentRow>,
    pub declared_amounts: DeclaredAmounts,
}
