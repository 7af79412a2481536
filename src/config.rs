use crate::error::AppError;
use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Application config
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Tunables for matching, capping and cross-verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Minimum fuzzy score for a prescription to claim a bill line
    pub prescription_threshold: f64,
    /// Minimum fuzzy score for a test to claim a bill line
    pub test_threshold: f64,
    /// Reimbursement ceiling for a single consultation fee
    pub consultation_fee_cap: BigDecimal,
    /// Absolute band for matching a claimed row to a matched bill item
    pub row_amount_tolerance: BigDecimal,
    /// Relative band (fraction of the claimed amount) for the same comparison
    pub row_relative_tolerance: BigDecimal,
    /// Allowed claimed-vs-admissible drift before flagging
    pub total_tolerance: BigDecimal,
    /// Over-claims above this difference are HIGH severity
    pub high_severity_threshold: BigDecimal,
    /// Row matches within this difference are reported with HIGH confidence
    pub item_match_high_confidence: BigDecimal,
    pub vocabulary: Vocabulary,
}

/// Keyword lists used by the classifier and the claim-form parser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vocabulary {
    pub claim_form_indicators: Vec<String>,
    pub exclusion: Vec<String>,
    pub consultation: Vec<String>,
    pub vaccination: Vec<String>,
    pub relation: Vec<String>,
    pub treatment_type: Vec<String>,
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

fn money(value: &str) -> BigDecimal {
    BigDecimal::from_str(value).unwrap_or_else(|_| BigDecimal::zero())
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            claim_form_indicators: words(&[
                "claim format",
                "reimbursement",
                "employee no",
                "claim no",
                "hospitalized from date",
                "treatment received",
                "details of treatment",
                "declaration by",
            ]),
            exclusion: words(&[
                "total", "subtotal", "sub total", "grand total", "cgst", "sgst", "igst", "gst",
                "tax", "vat", "amount before", "net amount", "round off", "rounding", "discount",
                "payment", "balance", "due",
            ]),
            consultation: words(&[
                "consultation",
                "doctor fee",
                "doctor charge",
                "consulting",
                "visit",
                "opd",
                "dr fee",
                "dr charge",
                "physician fee",
            ]),
            vaccination: words(&[
                "vaccin", "vaccine", "immunization", "immunisation", "varilrix", "influrate",
                "fluarix", "influvac", "pentavac", "hexavac", "tdap", "mmr", "bcg", "hepatitis",
                "rotavirus", "pneumococcal", "hpv", "meningococcal", "typhoid", "cholera", "rabies",
            ]),
            relation: words(&["SON", "WIFE", "SELF", "DAUGHTER", "HUSBAND", "FATHER", "MOTHER"]),
            treatment_type: words(&[
                "CONSULTATION",
                "MEDICINE",
                "VACCINATION",
                "SURGERY",
                "DIAGNOSTIC",
                "TEST",
            ]),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            prescription_threshold: 0.55,
            test_threshold: 0.6,
            consultation_fee_cap: BigDecimal::from(300),
            row_amount_tolerance: BigDecimal::from(50),
            row_relative_tolerance: money("0.1"),
            total_tolerance: BigDecimal::from(1),
            high_severity_threshold: BigDecimal::from(500),
            item_match_high_confidence: BigDecimal::from(10),
            vocabulary: Vocabulary::default(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            engine: EngineConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Reject thresholds outside [0, 1] and negative monetary constants
    pub fn validate(&self) -> Result<(), AppError> {
        for (name, value) in [
            ("prescription_threshold", self.prescription_threshold),
            ("test_threshold", self.test_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(AppError::InvalidConfig(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }

        for (name, value) in [
            ("consultation_fee_cap", &self.consultation_fee_cap),
            ("row_amount_tolerance", &self.row_amount_tolerance),
            ("row_relative_tolerance", &self.row_relative_tolerance),
            ("total_tolerance", &self.total_tolerance),
            ("high_severity_threshold", &self.high_severity_threshold),
            ("item_match_high_confidence", &self.item_match_high_confidence),
        ] {
            if *value < BigDecimal::zero() {
                return Err(AppError::InvalidConfig(format!(
                    "{} must not be negative, got {}",
                    name, value
                )));
            }
        }

        Ok(())
    }
}

impl AppConfig {
    /// Layered load: defaults, then an optional TOML file, then `RECONCILER__*` env vars
    pub fn load(path: Option<&str>) -> Result<Self, AppError> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&AppConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix("RECONCILER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let app: AppConfig = settings.try_deserialize()?;
        app.validate()?;
        Ok(app)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.server.port == 0 {
            return Err(AppError::InvalidConfig("server.port must not be 0".to_string()));
        }
        self.engine.validate()
    }

    /// Load using the file named by `RECONCILER_CONFIG`, if any
    pub fn from_env() -> Result<Self, AppError> {
        let path = std::env::var("RECONCILER_CONFIG").ok();
        Self::load(path.as_deref())
    }
}
