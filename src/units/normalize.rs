// Unit Spelling Normalization
//
// Unit codes arrive from user-entered grid cells and AI extraction with
// cosmetic variance: mixed case, stray whitespace, and the two Unicode
// micro signs. Every equality comparison and table lookup in the engine
// goes through `normalize` first; the display spelling shown to users is
// owned by the UI layer, not here.

/// Canonicalize a unit code: trim, strip interior whitespace, fold the
/// micro signs `µ` (U+00B5) and `μ` (U+03BC) to `u`, lowercase the rest.
pub fn normalize(unit: &str) -> String {
    unit.chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| match c {
            '\u{00B5}' | '\u{03BC}' => 'u',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

/// Canonicalize a biomarker name for keying: trim, lowercase, collapse
/// internal whitespace runs to single spaces.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// An opaque-label unit is a brace-wrapped assay label (`{cells}/uL`,
/// `{positive}`) or the UCUM unity code `1`. Measurements under such a
/// unit carry no dimension and can never be converted to anything but
/// themselves; they are excluded from merge participation entirely.
pub fn is_opaque_label(unit: &str) -> bool {
    let n = normalize(unit);
    n == "1" || n.contains('{')
}
