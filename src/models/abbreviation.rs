/// Compact display form of a count, e.g. `10300` → `"10.3k"`.
///
/// Thousands keep one decimal, millions two, billions and trillions three.
/// Trailing zeros are dropped, and values within ±999 print unchanged.
pub fn abbreviate(source: i64) -> String {
    let (divisor, suffix, decimals) = match source.unsigned_abs() {
        n if n > 999_999_999_999 => (1_000_000_000_000_i64, "T", 3),
        n if n > 999_999_999 => (1_000_000_000, "B", 3),
        n if n > 999_999 => (1_000_000, "M", 2),
        n if n > 999 => (1_000, "k", 1),
        _ => return source.to_string(),
    };

    // Divided in single precision; last-digit rounding depends on it.
    let scaled = f64::from(source as f32 / divisor as f32);
    let mut digits = format!("{scaled:.decimals$}");
    if digits.contains('.') {
        let trimmed = digits.trim_end_matches('0').trim_end_matches('.').len();
        digits.truncate(trimmed);
    }
    format!("{digits}{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn small_values_are_unchanged() {
        assert_eq!(abbreviate(0), "0");
        assert_eq!(abbreviate(999), "999");
        assert_eq!(abbreviate(-999), "-999");
    }

    #[test]
    fn thousands() {
        assert_eq!(abbreviate(1001), "1k");
        assert_eq!(abbreviate(1010), "1k");
        assert_eq!(abbreviate(10300), "10.3k");
        assert_eq!(abbreviate(-1500), "-1.5k");
    }

    #[test]
    fn millions() {
        assert_eq!(abbreviate(3_900_120), "3.9M");
        assert_eq!(abbreviate(3_910_120), "3.91M");
        assert_eq!(abbreviate(3_000_120), "3M");
    }

    #[test]
    fn billions_and_trillions() {
        assert_eq!(abbreviate(1_400_000_120), "1.4B");
        assert_eq!(abbreviate(1_000_000_120), "1B");
        assert_eq!(abbreviate(1_004_000_120), "1.004B");
        assert_eq!(abbreviate(1_044_000_120), "1.044B");
        assert_eq!(abbreviate(10_044_000_120), "10.044B");
        assert_eq!(abbreviate(10_044_000_120_000), "10.044T");
    }
}
