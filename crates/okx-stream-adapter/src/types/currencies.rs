/*
[INPUT]:  Raw exchange ticker codes
[OUTPUT]: Canonical uppercase currency and instrument identifiers
[POS]:    Data layer - static alias resolution
[UPDATE]: When the exchange renames a listed currency
*/

/// Vendor ticker codes that differ from their canonical names.
///
/// Keys are the uppercased codes as enumerated by the exchange; the table
/// is static and never mutated at runtime.
const COMMON_CURRENCIES: &[(&str, &str)] = &[
    ("FAIR", "FAIRGAME"),
    ("HOT", "HYDRO"),
    ("HSR", "HC"),
    ("MAG", "MAGGIE"),
    ("YOYO", "YOYOW"),
];

/// Resolve a raw currency code to its canonical uppercase form.
///
/// Unmapped codes pass through uppercased, so the function is idempotent:
/// an already-canonical code resolves to itself.
pub fn canonical_currency(raw: &str) -> String {
    let upper = raw.to_uppercase();
    for (code, alias) in COMMON_CURRENCIES {
        if upper == *code {
            return (*alias).to_string();
        }
    }
    upper
}

/// Resolve a combined instrument identifier to canonical `BASE-QUOTE`.
///
/// The separator differs across protocol generations (`_` on the oldest,
/// `-` on the newer ones); each part is alias-resolved independently.
/// Identifiers without the separator pass through uppercased.
pub fn canonical_instrument(raw: &str, separator: char) -> String {
    match raw.split_once(separator) {
        Some((base, quote)) => format!(
            "{}-{}",
            canonical_currency(base),
            canonical_currency(quote)
        ),
        None => raw.to_uppercase(),
    }
}
