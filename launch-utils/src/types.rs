use crate::error::CustomContractError;
use crate::RATE_DENOM;
use concordium_cis2::{TokenAmountU64, TokenIdUnit};
use concordium_std::*;

pub type ContractTokenId = TokenIdUnit;
pub type ContractTokenAmount = TokenAmountU64;
/// Funding-asset amount in the asset's smallest unit
/// (micro CCD for the native path, the token's own unit otherwise).
pub type FundAmount = u64;
/// Fixed-point rate scaled by [`RATE_DENOM`](crate::RATE_DENOM).
pub type Rate = u64;
/// Identifier the factory assigns to each created sale.
pub type SaleHandle = u64;

/// The asset contributors pay in.
#[derive(Debug, Serialize, SchemaType, Clone, Copy, PartialEq, Eq)]
pub enum FundAsset {
    /// Native value attached to the call.
    Native,
    /// A CIS2 fungible token contract.
    Token(ContractAddress),
}

/// Disposition of sale-token inventory that was never sold.
#[derive(Debug, Serialize, SchemaType, Clone, Copy, PartialEq, Eq)]
pub enum RefundPolicy {
    ReturnToCreator,
    Burn,
}

/// Who may drive the terminal transitions (`finalize` / `markFailed`).
#[derive(Debug, Serialize, SchemaType, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeAuth {
    Anyone,
    CreatorOnly,
}

/// Immutable sale parameters, fixed at creation.
/// All amounts are funding-asset units; all rates are scaled by
/// [`RATE_DENOM`](crate::RATE_DENOM).
#[derive(Debug, Serialize, SchemaType, Clone, PartialEq, Eq)]
pub struct SaleConfig {
    /// No contribution is accepted before this time.
    pub sale_start: Timestamp,
    /// No contribution is accepted at or after this time.
    pub sale_end: Timestamp,
    /// Smallest single contribution.
    pub min_buy_per_user: FundAmount,
    /// Cap on a contributor's cumulative total, not on a single call.
    pub max_buy_per_user: FundAmount,
    /// Maximum aggregate raise.
    pub hard_cap: FundAmount,
    /// Minimum viable raise.
    pub soft_cap: FundAmount,
    /// The token being sold.
    pub sale_token: ContractAddress,
    /// The asset contributors pay in.
    pub fund_asset: FundAsset,
    /// Sale tokens per funding unit during the sale.
    pub sale_rate: Rate,
    /// Sale tokens per funding unit for the post-sale listing deposit.
    pub listing_rate: Rate,
    /// Share of raised funds earmarked for liquidity.
    pub liquidity_rate: Rate,
    /// Share of raised funds taken as protocol fee.
    pub protocol_fee_rate: Rate,
    /// What happens to unsold inventory.
    pub refund_policy: RefundPolicy,
}

impl SaleConfig {
    /// Structural validation, required before a sale may be instantiated.
    pub fn ensure_valid(&self) -> Result<(), CustomContractError> {
        ensure!(
            self.sale_start < self.sale_end,
            CustomContractError::InvalidConfiguration
        );
        ensure!(
            self.min_buy_per_user > 0 && self.min_buy_per_user <= self.max_buy_per_user,
            CustomContractError::InvalidConfiguration
        );
        ensure!(
            self.soft_cap > 0 && self.soft_cap <= self.hard_cap,
            CustomContractError::InvalidConfiguration
        );
        ensure!(self.sale_rate > 0, CustomContractError::InvalidConfiguration);
        // The finalize split would underflow otherwise.
        ensure!(
            self.liquidity_rate
                .checked_add(self.protocol_fee_rate)
                .map_or(false, |total| total <= RATE_DENOM),
            CustomContractError::InvalidConfiguration
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> SaleConfig {
        SaleConfig {
            sale_start: Timestamp::from_timestamp_millis(10),
            sale_end: Timestamp::from_timestamp_millis(30),
            min_buy_per_user: 2_000_000,
            max_buy_per_user: 100_000_000,
            hard_cap: 1_000_000_000,
            soft_cap: 10_000_000,
            sale_token: ContractAddress::new(1, 0),
            fund_asset: FundAsset::Native,
            sale_rate: RATE_DENOM / 5,
            listing_rate: RATE_DENOM / 5,
            liquidity_rate: RATE_DENOM / 2,
            protocol_fee_rate: RATE_DENOM / 4,
            refund_policy: RefundPolicy::Burn,
        }
    }

    #[test]
    fn test_valid_config() {
        assert_eq!(valid_config().ensure_valid(), Ok(()));
    }

    #[test]
    fn test_inverted_window() {
        let mut config = valid_config();
        config.sale_end = config.sale_start;
        assert_eq!(
            config.ensure_valid(),
            Err(CustomContractError::InvalidConfiguration)
        );
    }

    #[test]
    fn test_zero_min_buy() {
        let mut config = valid_config();
        config.min_buy_per_user = 0;
        assert_eq!(
            config.ensure_valid(),
            Err(CustomContractError::InvalidConfiguration)
        );
    }

    #[test]
    fn test_min_above_max() {
        let mut config = valid_config();
        config.min_buy_per_user = config.max_buy_per_user + 1;
        assert_eq!(
            config.ensure_valid(),
            Err(CustomContractError::InvalidConfiguration)
        );
    }

    #[test]
    fn test_soft_cap_above_hard_cap() {
        let mut config = valid_config();
        config.soft_cap = config.hard_cap + 1;
        assert_eq!(
            config.ensure_valid(),
            Err(CustomContractError::InvalidConfiguration)
        );
    }

    #[test]
    fn test_split_rates_above_one() {
        let mut config = valid_config();
        config.liquidity_rate = RATE_DENOM;
        config.protocol_fee_rate = 1;
        assert_eq!(
            config.ensure_valid(),
            Err(CustomContractError::InvalidConfiguration)
        );
    }
}
