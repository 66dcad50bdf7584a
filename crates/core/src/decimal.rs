//! Precision bounds of persisted decimal columns.
//!
//! Postgres rounds a value to its column's scale on insert and rejects one
//! that exceeds its precision, so every decimal a command carries is checked
//! here first. Both stores then agree on what was written.

use rust_decimal::Decimal;

use crate::error::{DomainError, DomainResult};

/// 999_999_999_999 split into the low and middle words of a `Decimal`.
const TWELVE_NINES_LO: u32 = 3_567_587_327;
const TWELVE_NINES_MID: u32 = 232;

/// Shape of a `NUMERIC(precision, scale)` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecimalColumn {
    /// Largest magnitude the column holds.
    pub max: Decimal,
    pub scale: u32,
}

impl DecimalColumn {
    /// Quantities and grams: `NUMERIC(12, 3)`.
    pub const QUANTITY: Self = Self {
        max: Decimal::from_parts(TWELVE_NINES_LO, TWELVE_NINES_MID, 0, false, 3),
        scale: 3,
    };

    /// List prices, line totals and order totals: `NUMERIC(12, 2)`.
    pub const MONEY: Self = Self {
        max: Decimal::from_parts(TWELVE_NINES_LO, TWELVE_NINES_MID, 0, false, 2),
        scale: 2,
    };

    /// Line unit prices: `NUMERIC(14, 4)`.
    pub const UNIT_PRICE: Self = Self {
        max: Decimal::from_parts(276_447_231, 23_283, 0, false, 4),
        scale: 4,
    };

    /// Filament cost per gram: `NUMERIC(12, 4)`.
    pub const COST_PER_GRAM: Self = Self {
        max: Decimal::from_parts(TWELVE_NINES_LO, TWELVE_NINES_MID, 0, false, 4),
        scale: 4,
    };

    /// Reject `value` unless the column stores it exactly.
    ///
    /// Trailing zeros do not count against the scale.
    pub fn check(self, field: &str, value: Decimal) -> DomainResult<Decimal> {
        if value.abs() > self.max {
            return Err(DomainError::validation(
                field,
                format!("must be at most {} in magnitude", self.max),
            ));
        }
        if value.normalize().scale() > self.scale {
            return Err(DomainError::validation(
                field,
                format!("at most {} decimal places", self.scale),
            ));
        }
        Ok(value)
    }

    /// Sum `values` with overflow checks and bound the result to the column.
    pub fn checked_sum(
        self,
        field: &str,
        values: impl IntoIterator<Item = Decimal>,
    ) -> DomainResult<Decimal> {
        let sum = values.into_iter().try_fold(Decimal::ZERO, |acc, v| {
            acc.checked_add(v)
                .ok_or_else(|| DomainError::validation(field, "sum overflows"))
        })?;
        self.check(field, sum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn column_maxima_match_their_precision() {
        assert_eq!(DecimalColumn::QUANTITY.max, dec!(999999999.999));
        assert_eq!(DecimalColumn::MONEY.max, dec!(9999999999.99));
        assert_eq!(DecimalColumn::UNIT_PRICE.max, dec!(9999999999.9999));
        assert_eq!(DecimalColumn::COST_PER_GRAM.max, dec!(99999999.9999));
    }

    #[test]
    fn values_within_bounds_pass_unchanged() {
        let q = DecimalColumn::QUANTITY.check("quantity", dec!(1.250)).unwrap();
        assert_eq!(q, dec!(1.250));
        assert!(DecimalColumn::QUANTITY.check("quantity", dec!(999999999.999)).is_ok());
        assert!(DecimalColumn::MONEY.check("total_price", dec!(-12.30)).is_ok());
    }

    #[test]
    fn trailing_zeros_do_not_count_as_scale() {
        assert!(DecimalColumn::MONEY.check("total_price", dec!(4.5000000)).is_ok());
    }

    #[test]
    fn excess_scale_is_rejected_with_field() {
        let err = DecimalColumn::QUANTITY.check("quantity_grams", dec!(0.0001)).unwrap_err();
        assert_eq!(err.field(), Some("quantity_grams"));
        assert!(DecimalColumn::UNIT_PRICE.check("unit_price", dec!(10.00005)).is_err());
    }

    #[test]
    fn excess_magnitude_is_rejected_with_field() {
        let err = DecimalColumn::QUANTITY.check("quantity", Decimal::MAX).unwrap_err();
        assert_eq!(err.field(), Some("quantity"));
        assert!(DecimalColumn::MONEY.check("total_price", Decimal::MIN).is_err());
        assert!(DecimalColumn::QUANTITY.check("quantity", dec!(1000000000)).is_err());
    }

    #[test]
    fn checked_sum_reports_overflow_instead_of_panicking() {
        let err = DecimalColumn::MONEY
            .checked_sum("total_price", [Decimal::MAX, Decimal::MAX])
            .unwrap_err();
        assert_eq!(err.field(), Some("total_price"));
    }

    #[test]
    fn checked_sum_bounds_the_result() {
        let half = dec!(6000000000);
        assert!(DecimalColumn::MONEY.checked_sum("total_cost", [half, half]).is_err());
        assert_eq!(
            DecimalColumn::MONEY.checked_sum("total_cost", [dec!(1.10), dec!(2.20)]).unwrap(),
            dec!(3.30)
        );
    }
}
