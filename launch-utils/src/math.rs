//! Fixed-point conversion between funding-asset units and sale-token units.
//!
//! All rates share the scale [`RATE_DENOM`](crate::RATE_DENOM). Products are
//! computed in `u128` and truncate toward zero; a result that does not fit
//! in `u64` is rejected, never wrapped.

use crate::error::CustomContractError;
use crate::types::{ContractTokenAmount, FundAmount, Rate};
use crate::RATE_DENOM;
use concordium_std::*;

/// Sale-token entitlement for `fund_amount` at `rate`.
pub fn sale_tokens_for(
    fund_amount: FundAmount,
    rate: Rate,
) -> Result<ContractTokenAmount, CustomContractError> {
    let amount = (fund_amount as u128) * (rate as u128) / (RATE_DENOM as u128);
    ensure!(
        amount <= u64::MAX as u128,
        CustomContractError::ArithmeticOverflow
    );
    Ok(ContractTokenAmount::from(amount as u64))
}

/// Share of `total` funding at `rate`, used for the liquidity and
/// protocol-fee splits.
pub fn share_of(total: FundAmount, rate: Rate) -> Result<FundAmount, CustomContractError> {
    let amount = (total as u128) * (rate as u128) / (RATE_DENOM as u128);
    ensure!(
        amount <= u64::MAX as u128,
        CustomContractError::ArithmeticOverflow
    );
    Ok(amount as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    // 0.2 tokens per funding unit.
    const RATE_ONE_FIFTH: Rate = RATE_DENOM / 5;

    #[test]
    fn test_one_fifth() {
        // 2 units at 0.2 => 0.4 units, exactly.
        let got = sale_tokens_for(2_000_000, RATE_ONE_FIFTH).unwrap();
        assert_eq!(got.0, 400_000);
    }

    #[test]
    fn test_truncates_toward_zero() {
        // 7 * 0.2 = 1.4 => 1 at unit scale.
        let got = sale_tokens_for(7, RATE_ONE_FIFTH).unwrap();
        assert_eq!(got.0, 1);
        // Anything strictly below one funding unit at rate 1/10^18 floors to 0.
        let got = sale_tokens_for(RATE_DENOM - 1, 1).unwrap();
        assert_eq!(got.0, 0);
    }

    #[test]
    fn test_monotonic() {
        let mut prev = 0u64;
        for fund in [0u64, 1, 4, 5, 9, 10, 1_000, u64::MAX / 2] {
            let got = sale_tokens_for(fund, RATE_ONE_FIFTH).unwrap().0;
            assert!(got >= prev, "not monotonic at {}", fund);
            prev = got;
        }
    }

    #[test]
    fn test_overflow_rejected() {
        // u64::MAX funding units at 2 tokens per unit cannot fit in u64.
        let got = sale_tokens_for(u64::MAX, 2 * RATE_DENOM);
        assert_eq!(got, Err(CustomContractError::ArithmeticOverflow));
    }

    #[test]
    fn test_rate_one_is_identity() {
        let got = sale_tokens_for(123_456_789, RATE_DENOM).unwrap();
        assert_eq!(got.0, 123_456_789);
    }

    #[test]
    fn test_share_of() {
        // 25% of 1000.
        assert_eq!(share_of(1_000, RATE_DENOM / 4), Ok(250));
        // A full-denominator rate takes everything.
        assert_eq!(share_of(u64::MAX, RATE_DENOM), Ok(u64::MAX));
        assert_eq!(share_of(1_000, 0), Ok(0));
    }
}
