//! Display formatting for tile fields, shared by the index and any caller
//! that renders tiles.

/// Round to `digits` significant digits, ties to even. Sorting on quality
/// relies on this being the one rounding rule everywhere.
pub fn round_sig(value: f64, digits: u32) -> f64 {
    if value == 0.0 || !value.is_finite() {
        return value;
    }
    let magnitude = value.abs().log10().floor() as i32;
    let factor = 10f64.powi(magnitude + 1 - digits as i32);
    (value / factor).round_ties_even() * factor
}

/// `12345678` -> `12 345 678` (space as thousands separator).
pub fn format_int(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    let offset = digits.len() % 3;
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (i + 3 - offset) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(c);
    }
    if value < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

/// Short human form with base-1000 units: `1234` -> `1.2K`, `3400000` -> `3.4M`.
pub fn format_short_number(n: f64) -> String {
    if !n.is_finite() {
        return "—".to_string();
    }
    let neg = n < 0.0;
    let mut num = n.abs();
    const UNITS: [&str; 6] = ["", "K", "M", "B", "T", "Q"];
    let mut i = 0;
    while num >= 1000.0 && i < UNITS.len() - 1 {
        num /= 1000.0;
        i += 1;
    }
    let body = if num >= 100.0 || (num - num.round()).abs() < 1e-6 {
        format!("{}{}", num.round() as i64, UNITS[i])
    } else {
        format!("{num:.1}{}", UNITS[i])
    };
    if neg {
        format!("-{body}")
    } else {
        body
    }
}

/// Budget with currency suffix; `—` for absent values.
pub fn format_budget(currency: &str, amount: Option<i64>) -> String {
    match amount {
        None => "—".to_string(),
        Some(amount) if currency.is_empty() => format_int(amount),
        Some(amount) => format!("{} {currency}", format_int(amount)),
    }
}

/// Average ballot length with fixed 3-decimal precision; `—` when absent.
pub fn format_vote_length(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.3}"),
        None => "—".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn round_sig_keeps_six_digits() {
        assert_eq!(round_sig(1_234_567.0, 6), 1_234_570.0);
        assert!((round_sig(0.001234567, 6) - 0.00123457).abs() < 1e-12);
        assert_eq!(round_sig(0.0, 6), 0.0);
    }

    #[test]
    fn round_sig_ties_go_to_even() {
        assert_eq!(round_sig(1_234_565.0, 6), 1_234_560.0);
        assert_eq!(round_sig(1_234_575.0, 6), 1_234_580.0);
    }

    #[test]
    fn ints_group_with_spaces() {
        assert_eq!(format_int(0), "0");
        assert_eq!(format_int(999), "999");
        assert_eq!(format_int(1_000), "1 000");
        assert_eq!(format_int(12_345_678), "12 345 678");
        assert_eq!(format_int(-4_500), "-4 500");
    }

    #[test]
    fn short_numbers_use_base_1000_units() {
        assert_eq!(format_short_number(950.0), "950");
        assert_eq!(format_short_number(1_234.0), "1.2K");
        assert_eq!(format_short_number(3_400_000.0), "3.4M");
        assert_eq!(format_short_number(123_400.0), "123K");
        assert_eq!(format_short_number(-1_234.0), "-1.2K");
    }

    #[test]
    fn budget_and_vote_length_placeholders() {
        assert_eq!(format_budget("PLN", Some(100_000)), "100 000 PLN");
        assert_eq!(format_budget("", Some(5_000)), "5 000");
        assert_eq!(format_budget("PLN", None), "—");
        assert_eq!(format_vote_length(Some(1.5)), "1.500");
        assert_eq!(format_vote_length(None), "—");
    }
}
