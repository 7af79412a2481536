use regex::Regex;
use std::sync::LazyLock;

/// `spf 50%`, `spf 30`
static RE_SPF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"spf\s*\d+\s*%?").expect("invalid spf pattern"));

/// Strength tokens: `650mg`, `2.5 ml`, `10 gm`, `100mcg`, bare `1%`
static RE_DOSAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d+(?:\.\d+)?\s*(?:(?:mcg|mg|ml|gm)\b|%)").expect("invalid dosage pattern")
});

static RE_PUNCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s]").expect("invalid punctuation pattern"));

/// Product-form words dropped when they stand alone
const FORM_WORDS: &[&str] = &[
    "tab", "tablet", "tablets", "tabs", "cap", "capsule", "capsules", "caps", "syrup", "syp",
    "inj", "injection", "susp", "suspension", "drops", "sol", "solution", "cream", "ointment",
    "oint", "lotion", "gel", "balm",
];

fn single_pass(text: &str) -> String {
    let lowered = text.to_lowercase();
    let without_spf = RE_SPF.replace_all(lowered.trim(), " ");
    let without_dosage = RE_DOSAGE.replace_all(&without_spf, " ");

    let without_forms = without_dosage
        .split_whitespace()
        .filter(|w| !FORM_WORDS.contains(w))
        .collect::<Vec<_>>()
        .join(" ");

    let dehyphenated = without_forms.replace('-', " ");
    let without_punct = RE_PUNCT.replace_all(&dehyphenated, " ");

    without_punct.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Canonical form of a drug/test/bill item name.
///
/// Lowercases, strips strength and product-form tokens, splits hyphens,
/// drops punctuation and collapses whitespace. Total and idempotent.
pub fn normalize(text: &str) -> String {
    let mut current = single_pass(text);
    // Splitting on punctuation can expose another strength or form token
    // ("pan-tab", "(500)mg"); iterate to a fixpoint. Each repeat strictly shortens.
    loop {
        let next = single_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Digit groups left in a normalized name (`pan 40` -> `["40"]`)
pub fn digit_groups(normalized: &str) -> Vec<&str> {
    normalized
        .split(|c: char| !c.is_ascii_digit())
        .filter(|g| !g.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_form_and_dosage() {
        assert_eq!(normalize("CROCIN TAB 650MG"), "crocin");
        assert_eq!(normalize("CROCIN 650MG"), "crocin");
        assert_eq!(normalize("AMOXICILLIN CAP 500MG"), "amoxicillin");
    }

    #[test]
    fn hyphen_and_space_agree() {
        assert_eq!(normalize("PAN-40"), normalize("PAN 40"));
        assert_eq!(normalize("PAN-40 TAB"), "pan 40");
        assert_eq!(normalize("LEVOCET-M TAB"), "levocet m");
    }

    #[test]
    fn strips_percent_and_spf() {
        assert_eq!(normalize("Sunscreen SPF 50% Lotion"), "sunscreen");
        assert_eq!(normalize("Betadine 5% Ointment"), "betadine");
        assert_eq!(normalize("Calpol 120mg/5ml Syrup"), "calpol");
    }

    #[test]
    fn empty_and_blank_input() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
        assert_eq!(normalize("TAB"), "");
    }

    #[test]
    fn keeps_bare_numbers() {
        assert_eq!(normalize("AZITHROMYCIN 250 TAB"), "azithromycin 250");
    }

    #[test]
    fn idempotent_on_awkward_input() {
        for raw in [
            "CROCIN TAB 650MG",
            "foo-tab",
            "(500)mg Paracetamol",
            "D-COLD TOTAL TAB.",
            "Vit. B12 inj 1500 mcg",
            "₹ 50 --- gel!!",
            "  Multi   space\tname ",
        ] {
            let once = normalize(raw);
            assert_eq!(normalize(&once), once, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn digit_groups_of_normalized() {
        assert_eq!(digit_groups("pan 40"), vec!["40"]);
        assert_eq!(digit_groups("b12 d3"), vec!["12", "3"]);
        assert!(digit_groups("crocin").is_empty());
    }
}
