/// Reduces a raw OCR span to an uppercase token made only of `A-Z` and `0-9`.
///
/// Embedded whitespace is removed, the text is uppercased and every other
/// character is dropped. An empty result means the span carried no usable
/// content.
pub fn normalize_fragment(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        .collect()
}
