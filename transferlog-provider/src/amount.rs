//! Conversions between human-readable ether amounts and wei.

use alloy::primitives::{
    U256,
    utils::{UnitsError, format_ether, parse_ether},
};

#[derive(Debug, thiserror::Error)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,
    #[error("amount {0:?} is negative")]
    Negative(String),
    #[error("amount {input:?} is not a decimal ether value")]
    Invalid {
        input: String,
        #[source]
        source: UnitsError,
    },
}

/// Parse a decimal ether string (e.g. `"1.5"`) into wei.
pub fn parse_amount(amount: &str) -> Result<U256, AmountError> {
    let trimmed = amount.trim();
    if trimmed.is_empty() {
        return Err(AmountError::Empty);
    }
    // parse_ether accepts signed input; a negative value would wrap into a huge U256
    if trimmed.starts_with('-') {
        return Err(AmountError::Negative(trimmed.to_string()));
    }
    parse_ether(trimmed).map_err(|source| AmountError::Invalid {
        input: trimmed.to_string(),
        source,
    })
}

/// Scale a wei amount down to ether as a float, for display.
pub fn wei_to_ether(wei: U256) -> f64 {
    // format_ether always yields a plain decimal string
    format_ether(wei).parse().unwrap_or(f64::INFINITY)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WEI_PER_ETHER: u128 = 1_000_000_000_000_000_000;

    #[test]
    fn test_parse_amount() {
        assert_eq!(
            parse_amount("1.5").unwrap(),
            U256::from(3 * WEI_PER_ETHER / 2)
        );
        assert_eq!(parse_amount("0").unwrap(), U256::ZERO);
        assert_eq!(parse_amount(" 2 ").unwrap(), U256::from(2 * WEI_PER_ETHER));
        assert_eq!(parse_amount("0.000000000000000001").unwrap(), U256::from(1));
    }

    #[test]
    fn test_parse_amount_rejects_malformed() {
        assert!(matches!(parse_amount(""), Err(AmountError::Empty)));
        assert!(matches!(parse_amount("   "), Err(AmountError::Empty)));
        assert!(matches!(parse_amount("-1"), Err(AmountError::Negative(_))));
        assert!(matches!(
            parse_amount("one"),
            Err(AmountError::Invalid { .. })
        ));
        assert!(matches!(
            parse_amount("1.2.3"),
            Err(AmountError::Invalid { .. })
        ));
    }

    #[test]
    fn test_scale_down_recovers_input() {
        for input in ["1.5", "0.01", "42", "0.000123", "1000000.25"] {
            let wei = parse_amount(input).unwrap();
            let expected: f64 = input.parse().unwrap();
            let recovered = wei_to_ether(wei);
            assert!(
                (recovered - expected).abs() <= expected * 1e-12,
                "{input}: got {recovered}"
            );
        }
    }

    #[test]
    fn test_wei_to_ether() {
        assert_eq!(wei_to_ether(U256::ZERO), 0.0);
        assert_eq!(wei_to_ether(U256::from(WEI_PER_ETHER)), 1.0);
    }
}
