// Conversion Engine - pure amount math, no I/O

/// Convert `amount` at `rate`, rounded to 2 decimal places
pub fn convert(amount: f64, rate: f64) -> f64 {
    (amount * rate * 100.0).round() / 100.0
}

/// Parse the amount field. `None` means "skip the conversion".
///
/// Empty, non-numeric, NaN, infinite and negative inputs are all rejected.
pub fn parse_amount(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    match text.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => Some(value),
        _ => None,
    }
}

/// Result field rendering
pub fn format_amount(value: f64) -> String {
    format!("{:.2}", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_rounds_to_cents() {
        assert_eq!(convert(100.0, 1.25), 125.00);
        assert_eq!(convert(0.0, 0.9213), 0.00);
        assert_eq!(convert(10.0, 0.12345), 1.23);
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("50"), Some(50.0));
        assert_eq!(parse_amount(" 62.50 "), Some(62.5));
        assert_eq!(parse_amount("0"), Some(0.0));
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("abc"), None);
        assert_eq!(parse_amount("NaN"), None);
        assert_eq!(parse_amount("inf"), None);
        assert_eq!(parse_amount("-5"), None);
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(125.0), "125.00");
        assert_eq!(format_amount(convert(50.0, 1.25)), "62.50");
    }
}
