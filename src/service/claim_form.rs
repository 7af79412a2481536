use crate::config::Vocabulary;
use crate::models::{ClaimDetails, ClaimFormRecord, DeclaredAmounts, EmployeeDetails, TreatmentRow};
use bigdecimal::{BigDecimal, Zero};
use chrono::NaiveDate;
use regex::Regex;
use std::str::FromStr;
use std::sync::LazyLock;

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("invalid claim form pattern")
}

static RE_EMPLOYEE_NO: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)employee\s*no[:.]?\s*([A-Z0-9]+)"));
static RE_NAME: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)(?:name|नाम)[:\s]+([A-Za-z\s]+?)(?:\n|designation)"));
static RE_DESIGNATION: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)designation[:\s]+([A-Za-z\s]+?)(?:\n|department)"));
static RE_DEPARTMENT: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)department[:\s]+([A-Za-z\s]+?)(?:\n|grade)"));
static RE_GRADE: LazyLock<Regex> = LazyLock::new(|| compile(r"(?i)grade[:\s]+([A-Z0-9]+)"));
static RE_CLAIM_NO: LazyLock<Regex> = LazyLock::new(|| compile(r"(?i)claim\s*no[:.]?\s*([0-9]+)"));
static RE_CLAIM_DATE: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"(?i)claim\s*submitted\s*date[:\s]*([0-9]{2}[./-][0-9]{2}[./-][0-9]{4})")
});
static RE_PLACE: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"(?i)place\s*of\s*(?:stay|treatment)[:\s]+([A-Za-z\s,]+?)(?:\n|township)")
});
static RE_TOWNSHIP: LazyLock<Regex> = LazyLock::new(|| compile(r"(?i)township[:\s]+([A-Za-z \t]+)"));

static RE_ROW_DATE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"\b([0-9]{2})[./-]([0-9]{2})[./-]([0-9]{4})\b"));
/// Trailing amount: Indian or western grouping, or plain digits, with optional paise
static RE_ROW_AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"\b([0-9]{1,3}(?:,[0-9]{2,3})+(?:\.[0-9]{1,2})?|[0-9]+(?:\.[0-9]{1,2})?)\s*$")
});
static RE_HOSPITAL: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"(?i)(DR\.?\s+[A-Z][A-Z\s]*|[A-Z\s]*[A-Z]\s+HOSPITAL|[A-Z\s]*[A-Z]\s+CLINIC)")
});

/// Explicit total on the form, most specific phrasing first
static RE_TOTALS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        compile(r"(?i)amount\s*in\s*rupees[:\s]*(?:rs\.?|₹)?\s*([0-9,]+(?:\.[0-9]{2})?)"),
        compile(r"(?i)total[:\s]*(?:rs\.?|₹)?\s*([0-9,]+(?:\.[0-9]{2})?)"),
        compile(r"([0-9]{1,2},?[0-9]{3}\.[0-9]{2})\s*(?:rupees)?"),
    ]
});

/// Header lines of the treatment table
const TABLE_HEADERS: &[&str] = &["s.no", "bill date", "name of patient", "relation"];

/// `1,20,000.50` -> 120000.50; `None` when nothing numeric is left
pub fn parse_amount(raw: &str) -> Option<BigDecimal> {
    let cleaned: String = raw.chars().filter(|c| *c != ',').collect();
    BigDecimal::from_str(cleaned.trim()).ok()
}

fn first_capture(regex: &Regex, text: &str) -> Option<String> {
    regex
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Best-effort parser for medical reimbursement claim forms.
pub struct ClaimFormExtractor<'a> {
    vocabulary: &'a Vocabulary,
}

impl<'a> ClaimFormExtractor<'a> {
    pub fn new(vocabulary: &'a Vocabulary) -> Self {
        Self { vocabulary }
    }

    pub fn is_claim_form(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        self.vocabulary
            .claim_form_indicators
            .iter()
            .any(|indicator| lowered.contains(&indicator.to_lowercase()))
    }

    /// Structured record, or `None` when the text carries no claim-form vocabulary.
    /// Fields that cannot be found are left absent.
    pub fn extract(&self, text: &str) -> Option<ClaimFormRecord> {
        if !self.is_claim_form(text) {
            tracing::debug!("Text has no claim form indicators");
            return None;
        }

        let employee_details = EmployeeDetails {
            employee_no: first_capture(&RE_EMPLOYEE_NO, text),
            name: first_capture(&RE_NAME, text),
            designation: first_capture(&RE_DESIGNATION, text),
            department: first_capture(&RE_DEPARTMENT, text),
            grade: first_capture(&RE_GRADE, text),
        };

        let claim_details = ClaimDetails {
            claim_no: first_capture(&RE_CLAIM_NO, text),
            claim_date: first_capture(&RE_CLAIM_DATE, text),
            place_of_treatment: first_capture(&RE_PLACE, text),
            township: first_capture(&RE_TOWNSHIP, text),
        };

        let treatment_details = self.extract_treatment_table(text);

        let total_claimed = if treatment_details.is_empty() {
            None
        } else {
            let sum = treatment_details
                .iter()
                .fold(BigDecimal::zero(), |acc, row| acc + &row.amount);
            Some(sum.round(2))
        };

        let total_claimed_on_form = RE_TOTALS
            .iter()
            .find_map(|pattern| first_capture(pattern, text).and_then(|raw| parse_amount(&raw)));

        tracing::info!(
            "Claim form parsed: {} treatment rows, claimed {:?}, on form {:?}",
            treatment_details.len(),
            total_claimed,
            total_claimed_on_form
        );

        Some(ClaimFormRecord {
            employee_details,
            claim_details,
            treatment_details,
            declared_amounts: DeclaredAmounts {
                total_claimed,
                total_claimed_on_form,
            },
        })
    }

    /// Rows are lines with a DD.MM.YYYY date and a trailing amount
    pub fn extract_treatment_table(&self, text: &str) -> Vec<TreatmentRow> {
        text.lines()
            .filter(|line| {
                let lowered = line.to_lowercase();
                !TABLE_HEADERS.iter().any(|h| lowered.contains(h))
            })
            .filter_map(|line| self.parse_row(line))
            .collect()
    }

    fn parse_row(&self, line: &str) -> Option<TreatmentRow> {
        let date_caps = RE_ROW_DATE.captures(line)?;
        let date_match = date_caps.get(0)?;
        let amount_match = RE_ROW_AMOUNT.captures(line)?.get(1)?;

        // the trailing number must not be the date itself
        if amount_match.start() < date_match.end() {
            return None;
        }
        let amount = parse_amount(amount_match.as_str())?;

        let parsed_date = match (
            date_caps[1].parse::<u32>(),
            date_caps[2].parse::<u32>(),
            date_caps[3].parse::<i32>(),
        ) {
            (Ok(day), Ok(month), Ok(year)) => NaiveDate::from_ymd_opt(year, month, day),
            _ => None,
        };

        let middle = line[date_match.end()..amount_match.start()].trim();
        let middle_upper = middle.to_uppercase();
        let relation = self.find_relation(&middle_upper);

        // doctor/hospital names follow the relation column when there is one
        let hospital_scope = match &relation {
            Some(found) => &middle_upper[found.end..],
            None => middle_upper.as_str(),
        };
        let hospital_name = RE_HOSPITAL
            .captures(hospital_scope)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|name| !name.is_empty());

        let treatment_type = self
            .vocabulary
            .treatment_type
            .iter()
            .find(|t| middle_upper.contains(&t.to_uppercase()))
            .map(|t| t.to_uppercase());

        Some(TreatmentRow {
            date: date_match.as_str().to_string(),
            parsed_date,
            patient_name: relation.as_ref().and_then(|r| r.patient_name.clone()),
            relation: relation.map(|r| r.keyword),
            hospital_name,
            treatment_type,
            amount,
            raw_text: line.trim().to_string(),
        })
    }

    /// First relation keyword standing as a whole word; the patient name is the text before it
    fn find_relation(&self, upper: &str) -> Option<RelationMatch> {
        self.vocabulary.relation.iter().find_map(|keyword| {
            let keyword = keyword.to_uppercase();
            let start = find_word(upper, &keyword)?;
            let before = upper[..start].trim();
            Some(RelationMatch {
                end: start + keyword.len(),
                patient_name: (!before.is_empty()).then(|| before.to_string()),
                keyword,
            })
        })
    }
}

struct RelationMatch {
    keyword: String,
    patient_name: Option<String>,
    /// Byte offset just past the keyword
    end: usize,
}

/// Byte offset of `word` in `haystack` where it is not part of a longer word
fn find_word(haystack: &str, word: &str) -> Option<usize> {
    if word.is_empty() {
        return None;
    }
    haystack.match_indices(word).map(|(i, _)| i).find(|&i| {
        let before = haystack[..i].chars().next_back();
        let after = haystack[i + word.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}
