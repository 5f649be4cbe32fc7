//! String normalization applied between lookup attempts.

use once_cell::sync::Lazy;
use regex::Regex;

/// Administrative-unit words removed by [`strip_administrative_suffix`].
pub const SUFFIXES: &[&str] = &[
    "Province",
    "Region",
    "District",
    "State",
    "Governate",
    "Department",
    "Oblast",
    "City",
    "Zone",
    "Prefecture",
];

static PARENTHETICAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r" ?\([^)]+\)").expect("parenthetical pattern"));
static REPEATED_SPACES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r" {2,}").expect("space pattern"));

/// Remove parenthesized groups: `"Georgia (US)"` → `"Georgia"`.
pub fn strip_parentheticals(s: &str) -> String {
    PARENTHETICAL.replace_all(s, "").into_owned()
}

fn contains_suffix(s: &str) -> bool {
    SUFFIXES.iter().any(|suffix| s.contains(suffix))
}

/// Remove every administrative-unit word anywhere in `s`, collapse repeated
/// spaces and trim the end. Strings without any such word come back as-is.
pub fn strip_administrative_suffix(s: &str) -> String {
    if !contains_suffix(s) {
        return s.to_string();
    }

    // Removing one word can splice together another ("ProvCityince").
    // Every pass shortens the string, so this terminates.
    let mut out = s.to_string();
    while contains_suffix(&out) {
        for suffix in SUFFIXES {
            out = out.replace(suffix, "");
        }
    }

    REPEATED_SPACES.replace_all(&out, " ").trim_end().to_string()
}
