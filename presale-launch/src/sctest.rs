use crate::{test_infrastructure::*, *};
use launch_utils::RATE_DENOM;
use std::sync::atomic::{AtomicU8, Ordering};

static ADDRESS_COUNTER: AtomicU8 = AtomicU8::new(10);
const OWNER_ACC: AccountAddress = AccountAddress([0u8; 32]);
const CREATOR_ACC: AccountAddress = AccountAddress([1u8; 32]);
const PROTOCOL_ACC: AccountAddress = AccountAddress([2u8; 32]);
const LIQUIDITY_ADDR: Address = Address::Account(AccountAddress([3u8; 32]));
const BURN_ADDR: Address = Address::Contract(ContractAddress {
    index: 900,
    subindex: 0,
});
const SALE_TOKEN: ContractAddress = ContractAddress {
    index: 1,
    subindex: 0,
};
const FUND_TOKEN: ContractAddress = ContractAddress {
    index: 2,
    subindex: 0,
};
const SELF_ADDRESS: ContractAddress = ContractAddress {
    index: 10,
    subindex: 0,
};

fn sale_start() -> Timestamp {
    Timestamp::from_timestamp_millis(10)
}
fn sale_end() -> Timestamp {
    Timestamp::from_timestamp_millis(30)
}
fn on_sale() -> Timestamp {
    Timestamp::from_timestamp_millis(15)
}
fn after_sale() -> Timestamp {
    Timestamp::from_timestamp_millis(35)
}

const MIN_BUY: FundAmount = 2_000_000;
const MAX_BUY: FundAmount = 100_000_000;
const SOFT_CAP: FundAmount = 10_000_000;
const HARD_CAP: FundAmount = 1_000_000_000;
// 0.2 sale tokens per funding unit.
const SALE_RATE: Rate = RATE_DENOM / 5;
const LISTING_RATE: Rate = RATE_DENOM / 5;
// Half the raise pairs into liquidity, 5% protocol fee.
const LIQUIDITY_RATE: Rate = RATE_DENOM / 2;
const PROTOCOL_FEE_RATE: Rate = RATE_DENOM / 20;

fn new_account() -> AccountAddress {
    let account = AccountAddress([ADDRESS_COUNTER.load(Ordering::SeqCst); 32]);
    ADDRESS_COUNTER.fetch_add(1, Ordering::SeqCst);
    account
}

fn sale_config(fund_asset: FundAsset, refund_policy: RefundPolicy) -> SaleConfig {
    SaleConfig {
        sale_start: sale_start(),
        sale_end: sale_end(),
        min_buy_per_user: MIN_BUY,
        max_buy_per_user: MAX_BUY,
        hard_cap: HARD_CAP,
        soft_cap: SOFT_CAP,
        sale_token: SALE_TOKEN,
        fund_asset,
        sale_rate: SALE_RATE,
        listing_rate: LISTING_RATE,
        liquidity_rate: LIQUIDITY_RATE,
        protocol_fee_rate: PROTOCOL_FEE_RATE,
        refund_policy,
    }
}

pub(crate) fn init_parameter(fund_asset: FundAsset, refund_policy: RefundPolicy) -> InitParams {
    InitParams {
        creator: CREATOR_ACC,
        protocol_addr: PROTOCOL_ACC,
        liquidity_addr: LIQUIDITY_ADDR,
        burn_addr: BURN_ADDR,
        finalize_auth: FinalizeAuth::Anyone,
        config: sale_config(fund_asset, refund_policy),
    }
}

fn initial_state<S: HasStateApi>(
    state_builder: &mut StateBuilder<S>,
    fund_asset: FundAsset,
    refund_policy: RefundPolicy,
) -> State<S> {
    let params = init_parameter(fund_asset, refund_policy);
    State::new(
        state_builder,
        params.creator,
        params.protocol_addr,
        params.liquidity_addr,
        params.burn_addr,
        params.finalize_auth,
        params.config,
    )
}

fn receive_context<'a>(sender: Address, slot_time: Timestamp) -> TestReceiveContext<'a> {
    let mut ctx = TestReceiveContext::empty();
    ctx.set_self_address(SELF_ADDRESS);
    ctx.set_owner(OWNER_ACC);
    ctx.set_sender(sender);
    ctx.set_metadata_slot_time(slot_time);
    ctx
}

fn token_receive_params(from: AccountAddress, amount: u64) -> Vec<u8> {
    let params: OnReceivingCis2Params<ContractTokenId, ContractTokenAmount> =
        OnReceivingCis2Params {
            token_id: TokenIdUnit(),
            amount: ContractTokenAmount::from(amount),
            from: Address::from(from),
            data: AdditionalData::empty(),
        };
    to_bytes(&params)
}

mod creator;
mod participant;

#[concordium_cfg_test]
mod test_init {
    use super::*;

    #[concordium_test]
    fn test_init_valid_parameter() {
        let params = init_parameter(FundAsset::Native, RefundPolicy::ReturnToCreator);
        let param_bytes = to_bytes(&params);

        let mut ctx = TestInitContext::empty();
        ctx.set_parameter(&param_bytes);
        ctx.set_init_origin(CREATOR_ACC);

        let mut state_builder = TestStateBuilder::new();
        let result = contract_init(&ctx, &mut state_builder);
        let state = result.expect_report("Contract initialization failed");

        claim_eq!(state.creator, CREATOR_ACC);
        claim_eq!(state.ledger.total_fund_received, 0);
        claim_eq!(state.ledger.total_sale_token_sold, 0.into());
        claim!(!state.ledger.finalized);
        claim!(!state.ledger.failed);
        claim_eq!(state.ledger.sale_token_deposited, None);
    }

    #[concordium_test]
    fn test_init_rejects_inverted_caps() {
        let mut params = init_parameter(FundAsset::Native, RefundPolicy::ReturnToCreator);
        params.config.soft_cap = params.config.hard_cap + 1;
        let param_bytes = to_bytes(&params);

        let mut ctx = TestInitContext::empty();
        ctx.set_parameter(&param_bytes);
        ctx.set_init_origin(CREATOR_ACC);

        let mut state_builder = TestStateBuilder::new();
        let result = contract_init(&ctx, &mut state_builder);
        claim!(result.is_err(), "Init should reject soft_cap > hard_cap");
    }

    #[concordium_test]
    fn test_init_rejects_inverted_window() {
        let mut params = init_parameter(FundAsset::Native, RefundPolicy::ReturnToCreator);
        params.config.sale_end = params.config.sale_start;
        let param_bytes = to_bytes(&params);

        let mut ctx = TestInitContext::empty();
        ctx.set_parameter(&param_bytes);
        ctx.set_init_origin(CREATOR_ACC);

        let mut state_builder = TestStateBuilder::new();
        let result = contract_init(&ctx, &mut state_builder);
        claim!(result.is_err(), "Init should reject an empty sale window");
    }
}
