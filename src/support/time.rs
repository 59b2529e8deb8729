/// Rounds to two decimals, the precision every timeline time is kept at.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Formats seconds with the shortest exact representation, always keeping at
/// least one decimal (`1.0`, `2.5`, `4.25`).
pub fn format_seconds(value: f64) -> String {
    // -0.0 prints as "-0"
    let value = if value == 0.0 { 0.0 } else { value };
    let text = format!("{value}");
    if value.is_finite() && !text.contains('.') {
        format!("{text}.0")
    } else {
        text
    }
}
