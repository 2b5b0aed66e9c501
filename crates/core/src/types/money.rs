//! Currency formatting.

use rust_decimal::{Decimal, RoundingStrategy};

/// Format an amount as dollars with two decimal places, e.g. `$12.50`.
///
/// Midpoints round away from zero, matching how totals are shown on
/// receipts and in flash messages.
#[must_use]
pub fn format_money(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("-${:.2}", rounded.abs())
    } else {
        format!("${:.2}", rounded.abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(Decimal::new(1250, 2)), "$12.50");
        assert_eq!(format_money(Decimal::new(7, 0)), "$7.00");
        assert_eq!(format_money(Decimal::new(19_995, 3)), "$20.00");
        assert_eq!(format_money(Decimal::ZERO), "$0.00");
        assert_eq!(format_money(Decimal::new(-350, 2)), "-$3.50");
    }
}
