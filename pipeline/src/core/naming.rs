//! Naming helpers for step ids and structured descriptions.

/// Guess a short step id from an `NN_name`-style module or file stem.
///
/// Digit segments are concatenated; if fewer than two characters come out of
/// the digits, first letters of the remaining segments pad the id
/// (`"00_conversion"` -> `"00"`, `"preprocess_raw"` -> `"pr"`).
pub fn guess_short_id(stem: &str) -> String {
    let stem = stem.rsplit("::").next().unwrap_or(stem);
    let mut short_id = String::new();
    for word in stem.split('_') {
        if !word.is_empty() && word.chars().all(|c| c.is_ascii_digit()) {
            short_id.push_str(word);
        } else if short_id.len() < 2
            && let Some(first) = word.chars().next()
        {
            short_id.extend(first.to_lowercase());
        }
    }
    short_id
}

/// Convert a `snake_case` output name to `PascalCase` for structured
/// description fields (`"summary_plot"` -> `"SummaryPlot"`).
pub fn pascal_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for word in name.split(['_', '-']) {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}
