use std::sync::LazyLock;

use regex::Regex;

static PRODUCT_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)-loan|-card|-insurance").expect("valid suffix regex"));

const BASE36: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

const FALLBACK_CATEGORY: &str = "GEN";

fn type_code(product_type: &str) -> char {
    match product_type {
        "LOAN" => 'L',
        "CREDIT_CARD" => 'C',
        "INSURANCE" => 'I',
        "APP" => 'A',
        _ => 'X',
    }
}

fn category_code(category_slug: Option<&str>) -> String {
    let Some(slug) = category_slug else {
        return FALLBACK_CATEGORY.to_string();
    };

    let cleaned = PRODUCT_SUFFIX_RE
        .replace_all(slug, "")
        .replace('-', "")
        .to_uppercase();

    if cleaned.chars().count() < 2 {
        return FALLBACK_CATEGORY.to_string();
    }

    cleaned.chars().take(3).collect()
}

/// Sum of character codes mod 36, as two base-36 digits (the first is always `0`).
fn checksum(input: &str) -> String {
    let sum: u32 = input.chars().map(u32::from).sum();
    let digit = BASE36[(sum % 36) as usize] as char;
    format!("0{}", digit)
}

/// Human-friendly application reference: `SIX-{type}-{category}-{id}-{checksum}`.
///
/// The id is zero padded to five digits and widens past that. The checksum
/// only catches typing mistakes; uniqueness comes from the id.
pub fn generate(application_id: u64, product_type: &str, category_slug: Option<&str>) -> String {
    let type_code = type_code(product_type);
    let category = category_code(category_slug);
    let id = format!("{:05}", application_id);
    let checksum = checksum(&format!("{}{}{}", type_code, category, id));

    format!("SIX-{}-{}-{}-{}", type_code, category, id, checksum)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_references() {
        assert_eq!(generate(123, "LOAN", Some("personal-loan")), "SIX-L-PER-00123-0D");
        assert_eq!(generate(1, "CREDIT_CARD", None), "SIX-C-GEN-00001-0M");
        assert_eq!(generate(7, "APP", Some("app")), "SIX-A-APP-00007-0X");
    }

    #[test]
    fn wide_ids_widen_the_field() {
        assert_eq!(
            generate(123456, "INSURANCE", Some("health-insurance")),
            "SIX-I-HEA-123456-0C"
        );
    }

    #[test]
    fn unknown_type_and_short_slug_fall_back() {
        assert_eq!(generate(42, "MORTGAGE", Some("x")), "SIX-X-GEN-00042-0C");
        assert_eq!(category_code(Some("-loan")), "GEN");
    }

    #[test]
    fn suffixes_are_stripped_case_insensitively() {
        assert_eq!(category_code(Some("Personal-LOAN")), "PER");
        assert_eq!(category_code(Some("credit-card")), "CRE");
        assert_eq!(category_code(Some("two-wheeler-loan")), "TWO");
        assert_eq!(category_code(Some("gold")), "GOL");
        assert_eq!(category_code(Some("ab")), "AB");
    }

    #[test]
    fn generation_is_deterministic() {
        let first = generate(99, "LOAN", Some("home-loan"));
        assert_eq!(first, generate(99, "LOAN", Some("home-loan")));
    }

    #[test]
    fn ids_never_share_the_numeric_part() {
        let a = generate(12, "LOAN", Some("home-loan"));
        let b = generate(13, "LOAN", Some("home-loan"));
        assert_ne!(a.split('-').nth(3), b.split('-').nth(3));
    }
}
