/// Item separators. Period is left out so decimal quantities like "1.5 kg" stay whole.
const DELIMITERS: &[char] = &[',', ';', '\n'];

/// Split free text into trimmed, non-empty item names, keeping their order.
pub fn segment(raw: &str) -> Vec<String> {
    raw.split(DELIMITERS)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
