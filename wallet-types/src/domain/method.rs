//! Payment method label canonicalization.
//!
//! The gateway expects one canonical label per rail; users type
//! anything ("tele birr", "CBE-Birr", "m_pesa"). One table is the
//! single source of truth for synonyms — extend it by adding a row.

/// Synonym table, matched after lowercasing and separator removal.
const SYNONYMS: &[(&str, &str)] = &[
    ("telebirr", "Telebirr"),
    ("tele", "Telebirr"),
    ("cbe", "CBE"),
    ("cbebirr", "CBE"),
    ("hellocash", "HelloCash"),
    ("mpesa", "MPesa"),
    ("abyssinia", "Abyssinia"),
    ("bankofabyssinia", "Abyssinia"),
    ("awash", "Awash"),
    ("awashbank", "Awash"),
    ("dashen", "Dashen"),
    ("dashenbank", "Dashen"),
    ("bunna", "Bunna"),
    ("bunnabank", "Bunna"),
    ("amhara", "Amhara"),
    ("amharabank", "Amhara"),
    ("berhan", "Berhan"),
    ("berhanbank", "Berhan"),
    ("zamzam", "ZamZam"),
    ("zamzambank", "ZamZam"),
    ("yimlu", "Yimlu"),
];

/// Fallback rail for any unmatched label that mentions a bank.
const GENERIC_BANK_RAIL: &str = "CBE";

/// Maps a user-supplied payment method label to the gateway's
/// canonical vocabulary. Unknown non-bank labels pass through
/// unchanged so uncommon rails still work.
pub fn normalize_method(label: &str) -> String {
    let raw = label.trim();
    let key: String = raw
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '-' | '_'))
        .collect();

    if let Some((_, canonical)) = SYNONYMS.iter().find(|(k, _)| *k == key) {
        return (*canonical).to_string();
    }
    if key.contains("bank") {
        return GENERIC_BANK_RAIL.to_string();
    }
    raw.to_string()
}
