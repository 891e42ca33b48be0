//! A validated amount of money entered in a form.

use std::{fmt::Display, str::FromStr};

use rust_decimal::Decimal;

use crate::Error;

/// The most digits an amount may have, two of which are after the decimal point.
const MAX_DIGITS: u32 = 12;
const DECIMAL_PLACES: u32 = 2;

/// A positive amount of money with at most two decimal places and ten whole digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Amount(Decimal);

impl Amount {
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }
}

impl FromStr for Amount {
    type Err = Error;

    fn from_str(raw_amount: &str) -> Result<Self, Self::Err> {
        let raw_amount = raw_amount.trim();

        if raw_amount.is_empty() {
            return Err(Error::InvalidAmount("Enter an amount.".to_owned()));
        }

        let amount = Decimal::from_str(raw_amount).map_err(|_| {
            Error::InvalidAmount(format!("\"{raw_amount}\" is not a number."))
        })?;

        if amount <= Decimal::ZERO {
            return Err(Error::InvalidAmount(
                "The amount must be greater than zero.".to_owned(),
            ));
        }

        if amount.scale() > DECIMAL_PLACES {
            return Err(Error::InvalidAmount(format!(
                "The amount cannot have more than {DECIMAL_PLACES} decimal places."
            )));
        }

        let whole_digit_limit = Decimal::from(10_i64.pow(MAX_DIGITS - DECIMAL_PLACES));
        if amount >= whole_digit_limit {
            return Err(Error::InvalidAmount(format!(
                "The amount cannot have more than {} digits before the decimal point.",
                MAX_DIGITS - DECIMAL_PLACES
            )));
        }

        Ok(Self(amount))
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use crate::Error;

    use super::Amount;

    #[test]
    fn parses_amount_with_cents() {
        let amount: Amount = " 100.50 ".parse().unwrap();

        assert_eq!(amount.as_decimal(), dec!(100.50));
    }

    #[test]
    fn parses_whole_amount() {
        let amount: Amount = "7".parse().unwrap();

        assert_eq!(amount.as_decimal(), dec!(7));
    }

    #[test]
    fn rejects_zero_and_negative_amounts() {
        for raw_amount in ["0", "0.00", "-5"] {
            assert!(
                matches!(raw_amount.parse::<Amount>(), Err(Error::InvalidAmount(_))),
                "want {raw_amount:?} to be rejected"
            );
        }
    }

    #[test]
    fn rejects_fractions_of_a_cent() {
        assert!(matches!(
            "1.005".parse::<Amount>(),
            Err(Error::InvalidAmount(_))
        ));
    }

    #[test]
    fn rejects_text_and_empty_input() {
        assert!(matches!("ten".parse::<Amount>(), Err(Error::InvalidAmount(_))));
        assert!(matches!("".parse::<Amount>(), Err(Error::InvalidAmount(_))));
    }

    #[test]
    fn accepts_largest_amount() {
        assert!("9999999999.99".parse::<Amount>().is_ok());
        assert!(matches!(
            "10000000000".parse::<Amount>(),
            Err(Error::InvalidAmount(_))
        ));
    }
}
