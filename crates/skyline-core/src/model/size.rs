/// Human-readable byte counts.
///
/// All sizes are `u64` bytes internally; floating point only appears at the
/// formatting boundary.
use serde::{Deserialize, Serialize};

/// Unit family used when formatting sizes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SizePrefix {
    /// Powers of 1024: KiB, MiB, GiB, TiB.
    #[default]
    Binary,
    /// Powers of 1000: KB, MB, GB, TB.
    Decimal,
}

impl SizePrefix {
    fn base(self) -> f64 {
        match self {
            SizePrefix::Binary => 1024.0,
            SizePrefix::Decimal => 1000.0,
        }
    }

    fn units(self) -> [&'static str; 4] {
        match self {
            SizePrefix::Binary => ["KiB", "MiB", "GiB", "TiB"],
            SizePrefix::Decimal => ["KB", "MB", "GB", "TB"],
        }
    }
}

/// Format a byte count with the largest unit that keeps the value >= 1.
pub fn format_size(bytes: u64, prefix: SizePrefix) -> String {
    let base = prefix.base();
    let mut value = bytes as f64;
    if value < base {
        return format!("{bytes} B");
    }

    let units = prefix.units();
    let mut unit = 0;
    value /= base;
    while value >= base && unit + 1 < units.len() {
        value /= base;
        unit += 1;
    }
    // Small units get one decimal, GB and up get two.
    if unit < 2 {
        format!("{value:.1} {}", units[unit])
    } else {
        format!("{value:.2} {}", units[unit])
    }
}

/// Format a count with thousand separators.
pub fn format_count(count: u64) -> String {
    let digits = count.to_string();
    let mut result = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(ch);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size_bytes() {
        assert_eq!(format_size(0, SizePrefix::Binary), "0 B");
        assert_eq!(format_size(1023, SizePrefix::Binary), "1023 B");
        assert_eq!(format_size(999, SizePrefix::Decimal), "999 B");
    }

    #[test]
    fn test_format_size_binary() {
        assert_eq!(format_size(1024, SizePrefix::Binary), "1.0 KiB");
        assert_eq!(format_size(1536, SizePrefix::Binary), "1.5 KiB");
        assert_eq!(format_size(1_048_576, SizePrefix::Binary), "1.0 MiB");
        assert_eq!(format_size(1_073_741_824, SizePrefix::Binary), "1.00 GiB");
        assert_eq!(format_size(1_099_511_627_776, SizePrefix::Binary), "1.00 TiB");
    }

    #[test]
    fn test_format_size_decimal() {
        assert_eq!(format_size(1_000, SizePrefix::Decimal), "1.0 KB");
        assert_eq!(format_size(2_500_000, SizePrefix::Decimal), "2.5 MB");
        assert_eq!(format_size(3_000_000_000, SizePrefix::Decimal), "3.00 GB");
    }

    #[test]
    fn test_format_size_saturates_at_largest_unit() {
        assert_eq!(format_size(2048 * 1_099_511_627_776, SizePrefix::Binary), "2048.00 TiB");
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1_000), "1,000");
        assert_eq!(format_count(1_234_567), "1,234,567");
    }
}
