use concordium_std::*;
pub use launch_utils::{
    error::{ContractError, ContractResult, CustomContractError},
    math,
    types::*,
    RATE_DENOM,
};

/// Lifecycle stage derived from the clock and the terminal flags.
/// A sale only ever moves forward through these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaleStage {
    Pending,
    Active,
    Ended,
    Finalized,
}

/// A contributor's cumulative position.
#[derive(Debug, Serialize, SchemaType, Clone, PartialEq, Eq)]
pub struct Contribution {
    /// Cumulative funding-asset amount contributed.
    pub amount: FundAmount,
    /// Whether the sale-token entitlement has been collected.
    pub claimed: bool,
}

/// Mutable per-sale bookkeeping, owned exclusively by one sale instance.
#[derive(Debug, Serial, DeserialWithState, StateClone)]
#[concordium(state_parameter = "S")]
pub struct SaleLedger<S: HasStateApi> {
    /// Monotonically non-decreasing; refunds do not roll it back.
    pub(crate) total_fund_received: FundAmount,
    /// Always `sale_tokens_for(total_fund_received)`, never tracked
    /// incrementally.
    pub(crate) total_sale_token_sold: ContractTokenAmount,
    /// Cumulative contribution per contributor.
    pub(crate) contributions: StateMap<AccountAddress, Contribution, S>,
    /// Transitions false -> true exactly once.
    pub(crate) finalized: bool,
    /// Terminal failure flag; enables the refund path.
    pub(crate) failed: bool,
    /// Receiver of the protocol fee share, captured at creation.
    pub(crate) protocol_addr: AccountAddress,
    /// Sale-token inventory the creator escrowed, if any.
    pub(crate) sale_token_deposited: Option<ContractTokenAmount>,
}

/// How the raised funds and remaining inventory settle on success.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Distribution {
    pub(crate) protocol_fee: FundAmount,
    pub(crate) liquidity_fund: FundAmount,
    pub(crate) liquidity_tokens: ContractTokenAmount,
    pub(crate) creator_proceeds: FundAmount,
    pub(crate) leftover_tokens: ContractTokenAmount,
}

/// The contract state.
#[derive(Debug, Serial, DeserialWithState, StateClone)]
#[concordium(state_parameter = "S")]
pub struct State<S: HasStateApi> {
    /// Account that set up the sale; receives the proceeds.
    pub(crate) creator: AccountAddress,
    /// Collaborator receiving the paired liquidity deposit.
    pub(crate) liquidity_addr: Address,
    /// Where burned inventory goes under `RefundPolicy::Burn`.
    pub(crate) burn_addr: Address,
    /// Who may call `finalize` / `markFailed`.
    pub(crate) finalize_auth: FinalizeAuth,
    /// If `true`, state-mutating user functions stop working.
    pub(crate) paused: bool,
    /// Immutable sale parameters.
    pub(crate) config: SaleConfig,
    /// Mutable bookkeeping.
    pub(crate) ledger: SaleLedger<S>,
}

impl<S: HasStateApi> State<S> {
    pub(crate) fn new(
        state_builder: &mut StateBuilder<S>,
        creator: AccountAddress,
        protocol_addr: AccountAddress,
        liquidity_addr: Address,
        burn_addr: Address,
        finalize_auth: FinalizeAuth,
        config: SaleConfig,
    ) -> Self {
        State {
            creator,
            liquidity_addr,
            burn_addr,
            finalize_auth,
            paused: false,
            config,
            ledger: SaleLedger {
                total_fund_received: 0,
                total_sale_token_sold: 0.into(),
                contributions: state_builder.new_map(),
                finalized: false,
                failed: false,
                protocol_addr,
                sale_token_deposited: None,
            },
        }
    }

    pub(crate) fn stage(&self, now: Timestamp) -> SaleStage {
        if self.ledger.finalized || self.ledger.failed {
            SaleStage::Finalized
        } else if now < self.config.sale_start {
            SaleStage::Pending
        } else if now < self.config.sale_end {
            SaleStage::Active
        } else {
            SaleStage::Ended
        }
    }

    pub(crate) fn reached_hard_cap(&self) -> bool {
        self.ledger.total_fund_received >= self.config.hard_cap
    }

    pub(crate) fn reached_soft_cap(&self) -> bool {
        self.ledger.total_fund_received >= self.config.soft_cap
    }

    /// Record a contribution. Preconditions run in a fixed order so
    /// callers always see the same error for the same situation; the
    /// ledger is only touched once every check has passed.
    pub(crate) fn contribute(
        &mut self,
        now: Timestamp,
        contributor: &AccountAddress,
        amount: FundAmount,
    ) -> ContractResult<()> {
        match self.stage(now) {
            SaleStage::Pending => bail!(CustomContractError::SaleNotStarted.into()),
            SaleStage::Active => (),
            SaleStage::Ended | SaleStage::Finalized => {
                bail!(CustomContractError::SaleEnded.into())
            }
        }
        ensure!(
            amount >= self.config.min_buy_per_user,
            CustomContractError::BelowMinBuy.into()
        );
        let prior = self
            .ledger
            .contributions
            .get(contributor)
            .map(|c| c.amount)
            .unwrap_or(0);
        let user_total = prior
            .checked_add(amount)
            .ok_or(ContractError::from(CustomContractError::ArithmeticOverflow))?;
        ensure!(
            user_total <= self.config.max_buy_per_user,
            CustomContractError::AboveMaxBuy.into()
        );
        let new_total = self
            .ledger
            .total_fund_received
            .checked_add(amount)
            .ok_or(ContractError::from(CustomContractError::ArithmeticOverflow))?;
        ensure!(
            new_total <= self.config.hard_cap,
            CustomContractError::HardCapExceeded.into()
        );

        // Recomputed from the running total so repeated truncation never
        // drifts from the rate function.
        let sold = math::sale_tokens_for(new_total, self.config.sale_rate)?;

        let updated = match self.ledger.contributions.get_mut(contributor) {
            Some(mut contribution) => {
                contribution.amount = user_total;
                true
            }
            None => false,
        };
        if !updated {
            let _ = self.ledger.contributions.insert(
                *contributor,
                Contribution {
                    amount: user_total,
                    claimed: false,
                },
            );
        }
        self.ledger.total_fund_received = new_total;
        self.ledger.total_sale_token_sold = sold;
        Ok(())
    }

    /// Inventory the creator must escrow before the sale can finalize:
    /// the full hard-cap sale entitlement plus the hard-cap listing
    /// liquidity at `listing_rate`.
    pub(crate) fn required_sale_tokens(&self) -> ContractResult<ContractTokenAmount> {
        let sale_side = math::sale_tokens_for(self.config.hard_cap, self.config.sale_rate)?;
        let listing_fund = math::share_of(self.config.hard_cap, self.config.liquidity_rate)?;
        let listing_side = math::sale_tokens_for(listing_fund, self.config.listing_rate)?;
        let required = sale_side
            .0
            .checked_add(listing_side.0)
            .ok_or(ContractError::from(CustomContractError::ArithmeticOverflow))?;
        Ok(ContractTokenAmount::from(required))
    }

    /// Settlement splits of `total_fund_received`. Only meaningful once
    /// the inventory is escrowed.
    pub(crate) fn distribution(&self) -> ContractResult<Distribution> {
        let deposited = self
            .ledger
            .sale_token_deposited
            .ok_or(ContractError::from(CustomContractError::TokensNotDeposited))?;

        let total = self.ledger.total_fund_received;
        let protocol_fee = math::share_of(total, self.config.protocol_fee_rate)?;
        let liquidity_fund = math::share_of(total, self.config.liquidity_rate)?;
        let creator_proceeds = total
            .checked_sub(protocol_fee)
            .and_then(|rest| rest.checked_sub(liquidity_fund))
            .ok_or(ContractError::from(CustomContractError::ArithmeticOverflow))?;
        let liquidity_tokens = math::sale_tokens_for(liquidity_fund, self.config.listing_rate)?;
        let leftover_tokens = deposited
            .0
            .checked_sub(self.ledger.total_sale_token_sold.0)
            .and_then(|rest| rest.checked_sub(liquidity_tokens.0))
            .ok_or(ContractError::from(CustomContractError::ArithmeticOverflow))?;

        Ok(Distribution {
            protocol_fee,
            liquidity_fund,
            liquidity_tokens,
            creator_proceeds,
            leftover_tokens: ContractTokenAmount::from(leftover_tokens),
        })
    }

    /// Remove and return a contributor's position for a refund.
    /// The running totals stay untouched; they are monotone.
    pub(crate) fn take_refund(&mut self, contributor: &AccountAddress) -> ContractResult<FundAmount> {
        let contribution = self
            .ledger
            .contributions
            .remove_and_get(contributor)
            .ok_or(ContractError::from(CustomContractError::NotContributed))?;
        Ok(contribution.amount)
    }

    /// Mark a contributor's entitlement as collected and return it.
    pub(crate) fn claim_entitlement(
        &mut self,
        contributor: &AccountAddress,
    ) -> ContractResult<ContractTokenAmount> {
        let sale_rate = self.config.sale_rate;
        let mut contribution = self
            .ledger
            .contributions
            .get_mut(contributor)
            .ok_or(ContractError::from(CustomContractError::NotContributed))?;
        ensure!(
            !contribution.claimed,
            CustomContractError::AlreadyClaimed.into()
        );
        let entitlement = math::sale_tokens_for(contribution.amount, sale_rate)?;
        contribution.claimed = true;
        Ok(entitlement)
    }

    pub(crate) fn contribution_of(&self, contributor: &AccountAddress) -> Option<Contribution> {
        self.ledger
            .contributions
            .get(contributor)
            .map(|c| c.clone())
    }
}

#[cfg(any(feature = "wasm-test", test))]
/// implements PartialEq for `claim_eq` inside test functions.
impl<S: HasStateApi> PartialEq for State<S> {
    fn eq(&self, other: &Self) -> bool {
        if self.creator != other.creator {
            return false;
        }
        if self.liquidity_addr != other.liquidity_addr {
            return false;
        }
        if self.burn_addr != other.burn_addr {
            return false;
        }
        if self.finalize_auth != other.finalize_auth {
            return false;
        }
        if self.paused != other.paused {
            return false;
        }
        if self.config != other.config {
            return false;
        }
        if self.ledger.total_fund_received != other.ledger.total_fund_received {
            return false;
        }
        if self.ledger.total_sale_token_sold != other.ledger.total_sale_token_sold {
            return false;
        }
        if self.ledger.finalized != other.ledger.finalized {
            return false;
        }
        if self.ledger.failed != other.ledger.failed {
            return false;
        }
        if self.ledger.protocol_addr != other.ledger.protocol_addr {
            return false;
        }
        if self.ledger.sale_token_deposited != other.ledger.sale_token_deposited {
            return false;
        }
        if self.ledger.contributions.iter().count() != other.ledger.contributions.iter().count() {
            return false;
        }
        for (contributor, contribution) in self.ledger.contributions.iter() {
            let other_contribution = other.ledger.contributions.get(&contributor);
            if other_contribution.is_none() {
                return false;
            }
            if contribution.clone() != other_contribution.unwrap().clone() {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concordium_std::test_infrastructure::*;

    const CREATOR: AccountAddress = AccountAddress([1u8; 32]);
    const PROTOCOL: AccountAddress = AccountAddress([2u8; 32]);
    const LIQUIDITY: Address = Address::Account(AccountAddress([3u8; 32]));
    const BURN: Address = Address::Contract(ContractAddress {
        index: 900,
        subindex: 0,
    });
    const USER1: AccountAddress = AccountAddress([10u8; 32]);
    const USER2: AccountAddress = AccountAddress([11u8; 32]);

    // 0.2 sale tokens per funding unit.
    const SALE_RATE: Rate = RATE_DENOM / 5;

    /// The reference scenario: min 2 / max 100 / soft 10 / hard 1000
    /// funding units at a six-decimal unit scale.
    fn test_config() -> SaleConfig {
        SaleConfig {
            sale_start: Timestamp::from_timestamp_millis(10),
            sale_end: Timestamp::from_timestamp_millis(30),
            min_buy_per_user: 2_000_000,
            max_buy_per_user: 100_000_000,
            hard_cap: 1_000_000_000,
            soft_cap: 10_000_000,
            sale_token: ContractAddress::new(1, 0),
            fund_asset: FundAsset::Native,
            sale_rate: SALE_RATE,
            listing_rate: SALE_RATE,
            liquidity_rate: RATE_DENOM / 2,
            protocol_fee_rate: RATE_DENOM / 4,
            refund_policy: RefundPolicy::Burn,
        }
    }

    fn initial_state<S: HasStateApi>(
        state_builder: &mut StateBuilder<S>,
        config: SaleConfig,
    ) -> State<S> {
        State::new(
            state_builder,
            CREATOR,
            PROTOCOL,
            LIQUIDITY,
            BURN,
            FinalizeAuth::Anyone,
            config,
        )
    }

    fn on_sale() -> Timestamp {
        Timestamp::from_timestamp_millis(15)
    }

    #[test]
    fn test_stage_progression() {
        let mut state_builder = TestStateBuilder::new();
        let mut state = initial_state(&mut state_builder, test_config());

        assert_eq!(
            state.stage(Timestamp::from_timestamp_millis(9)),
            SaleStage::Pending
        );
        assert_eq!(state.stage(on_sale()), SaleStage::Active);
        // The end bound is exclusive.
        assert_eq!(
            state.stage(Timestamp::from_timestamp_millis(30)),
            SaleStage::Ended
        );
        state.ledger.finalized = true;
        assert_eq!(state.stage(on_sale()), SaleStage::Finalized);
    }

    #[test]
    fn test_contribute_tracks_rate_function() {
        let mut state_builder = TestStateBuilder::new();
        let mut state = initial_state(&mut state_builder, test_config());

        // 2 units at 0.2 => 0.4 sold.
        state.contribute(on_sale(), &USER1, 2_000_000).unwrap();
        assert_eq!(state.ledger.total_fund_received, 2_000_000);
        assert_eq!(state.ledger.total_sale_token_sold.0, 400_000);

        // Never drifts from a fresh recomputation over the running total.
        state.contribute(on_sale(), &USER2, 10_000_000).unwrap();
        state.contribute(on_sale(), &USER1, 3_000_001).unwrap();
        let total = state.ledger.total_fund_received;
        assert_eq!(total, 15_000_001);
        assert_eq!(
            state.ledger.total_sale_token_sold,
            math::sale_tokens_for(total, SALE_RATE).unwrap()
        );
        assert_eq!(
            state.contribution_of(&USER1).unwrap().amount,
            5_000_001,
            "per-user totals accumulate across calls"
        );
    }

    #[test]
    fn test_contribute_rejects_outside_window() {
        let mut state_builder = TestStateBuilder::new();
        let mut state = initial_state(&mut state_builder, test_config());

        let before = state.contribute(Timestamp::from_timestamp_millis(9), &USER1, 2_000_000);
        assert_eq!(
            before,
            Err(CustomContractError::SaleNotStarted.into()),
            "pending sale must reject with SaleNotStarted"
        );
        let after = state.contribute(Timestamp::from_timestamp_millis(30), &USER1, 2_000_000);
        assert_eq!(after, Err(CustomContractError::SaleEnded.into()));
        assert_eq!(state.ledger.total_fund_received, 0, "no partial mutation");
    }

    #[test]
    fn test_contribute_below_min() {
        let mut state_builder = TestStateBuilder::new();
        let mut state = initial_state(&mut state_builder, test_config());

        let result = state.contribute(on_sale(), &USER1, 1_000_000);
        assert_eq!(result, Err(CustomContractError::BelowMinBuy.into()));
    }

    #[test]
    fn test_contribute_cumulative_max() {
        let mut state_builder = TestStateBuilder::new();
        let mut state = initial_state(&mut state_builder, test_config());

        // A single oversized call.
        let result = state.contribute(on_sale(), &USER1, 1_000_000_000);
        assert_eq!(result, Err(CustomContractError::AboveMaxBuy.into()));

        // Individually valid calls whose sum crosses the per-user cap.
        state.contribute(on_sale(), &USER1, 60_000_000).unwrap();
        let result = state.contribute(on_sale(), &USER1, 60_000_000);
        assert_eq!(result, Err(CustomContractError::AboveMaxBuy.into()));
        assert_eq!(
            state.contribution_of(&USER1).unwrap().amount,
            60_000_000,
            "failed call must not move the cumulative total"
        );
    }

    #[test]
    fn test_contribute_hard_cap() {
        let mut config = test_config();
        config.max_buy_per_user = config.hard_cap;
        let mut state_builder = TestStateBuilder::new();
        let mut state = initial_state(&mut state_builder, config);

        state.contribute(on_sale(), &USER1, 999_000_000).unwrap();
        let result = state.contribute(on_sale(), &USER2, 2_000_000);
        assert_eq!(result, Err(CustomContractError::HardCapExceeded.into()));
        // Filling exactly to the cap is fine.
        state.contribute(on_sale(), &USER2, 1_000_000).unwrap();
        assert!(state.reached_hard_cap());
    }

    #[test]
    fn test_required_sale_tokens() {
        let mut state_builder = TestStateBuilder::new();
        let state = initial_state(&mut state_builder, test_config());

        // hard cap 1000 units: 200 units sold side + 500 * 0.2 listing side.
        let required = state.required_sale_tokens().unwrap();
        assert_eq!(required.0, 200_000_000 + 100_000_000);
    }

    #[test]
    fn test_distribution_splits() {
        let mut state_builder = TestStateBuilder::new();
        let mut state = initial_state(&mut state_builder, test_config());
        state.ledger.sale_token_deposited = Some(state.required_sale_tokens().unwrap());

        state.contribute(on_sale(), &USER1, 100_000_000).unwrap();
        let dist = state.distribution().unwrap();
        assert_eq!(dist.protocol_fee, 25_000_000);
        assert_eq!(dist.liquidity_fund, 50_000_000);
        assert_eq!(dist.liquidity_tokens.0, 10_000_000);
        assert_eq!(dist.creator_proceeds, 25_000_000);
        assert_eq!(
            dist.leftover_tokens.0,
            300_000_000 - 20_000_000 - 10_000_000
        );
        assert_eq!(
            dist.protocol_fee + dist.liquidity_fund + dist.creator_proceeds,
            state.ledger.total_fund_received,
            "fund splits must account for every unit raised"
        );
    }

    #[test]
    fn test_distribution_requires_escrow() {
        let mut state_builder = TestStateBuilder::new();
        let state = initial_state(&mut state_builder, test_config());
        assert_eq!(
            state.distribution(),
            Err(CustomContractError::TokensNotDeposited.into())
        );
    }

    #[test]
    fn test_take_refund_removes_position() {
        let mut state_builder = TestStateBuilder::new();
        let mut state = initial_state(&mut state_builder, test_config());

        state.contribute(on_sale(), &USER1, 5_000_000).unwrap();
        let amount = state.take_refund(&USER1).unwrap();
        assert_eq!(amount, 5_000_000);
        assert_eq!(
            state.take_refund(&USER1),
            Err(CustomContractError::NotContributed.into()),
            "second refund must reject"
        );
        // Totals are monotone and unaffected by refunds.
        assert_eq!(state.ledger.total_fund_received, 5_000_000);
    }

    #[test]
    fn test_claim_entitlement_once() {
        let mut state_builder = TestStateBuilder::new();
        let mut state = initial_state(&mut state_builder, test_config());

        state.contribute(on_sale(), &USER1, 10_000_000).unwrap();
        let entitlement = state.claim_entitlement(&USER1).unwrap();
        assert_eq!(entitlement.0, 2_000_000);
        assert_eq!(
            state.claim_entitlement(&USER1),
            Err(CustomContractError::AlreadyClaimed.into())
        );
        assert_eq!(
            state.claim_entitlement(&USER2),
            Err(CustomContractError::NotContributed.into())
        );
    }
}
