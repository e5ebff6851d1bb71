//! Monetary types for price and size representation.

use rust_decimal::Decimal;

/// Price represented as a Decimal for precision.
pub type Price = Decimal;

/// Contract size represented as a Decimal for precision.
pub type Size = Decimal;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn price_and_size_are_decimal() {
        let price: Price = dec!(0.45);
        let size: Size = dec!(100);

        assert_eq!(price * size, dec!(45.00));
    }
}
