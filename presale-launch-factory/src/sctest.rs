use crate::{test_infrastructure::*, *};
use launch_utils::RATE_DENOM;

const OWNER_ACC: AccountAddress = AccountAddress([0u8; 32]);
const PROTOCOL_ACC: AccountAddress = AccountAddress([2u8; 32]);
const CREATOR_ACC: AccountAddress = AccountAddress([10u8; 32]);
const SALE_TOKEN: ContractAddress = ContractAddress {
    index: 1,
    subindex: 0,
};
const SELF_ADDRESS: ContractAddress = ContractAddress {
    index: 20,
    subindex: 0,
};

fn creation_fee() -> Amount {
    Amount::from_micro_ccd(50_000_000)
}

fn sale_config() -> SaleConfig {
    SaleConfig {
        sale_start: Timestamp::from_timestamp_millis(10),
        sale_end: Timestamp::from_timestamp_millis(30),
        min_buy_per_user: 2_000_000,
        max_buy_per_user: 100_000_000,
        hard_cap: 1_000_000_000,
        soft_cap: 10_000_000,
        sale_token: SALE_TOKEN,
        fund_asset: FundAsset::Native,
        sale_rate: RATE_DENOM / 5,
        listing_rate: RATE_DENOM / 5,
        liquidity_rate: RATE_DENOM / 2,
        protocol_fee_rate: RATE_DENOM / 20,
        refund_policy: RefundPolicy::ReturnToCreator,
    }
}

fn initial_host() -> TestHost<State<TestStateApi>> {
    let mut state_builder = TestStateBuilder::new();
    let state = State::new(&mut state_builder, creation_fee(), PROTOCOL_ACC);
    TestHost::new(state, state_builder)
}

fn receive_context<'a>(sender: Address) -> TestReceiveContext<'a> {
    let mut ctx = TestReceiveContext::empty();
    ctx.set_self_address(SELF_ADDRESS);
    ctx.set_owner(OWNER_ACC);
    ctx.set_sender(sender);
    ctx.set_metadata_slot_time(Timestamp::from_timestamp_millis(5));
    ctx
}

#[concordium_cfg_test]
mod tests {
    use super::*;

    #[concordium_test]
    /// Handles are sequential from 1 and each creation is logged.
    fn test_create_sale() {
        let mut host = initial_host();
        let mut logger = TestLogger::init();

        let params = CreateSaleParams {
            config: sale_config(),
        };
        let param_bytes = to_bytes(&params);
        let mut ctx = receive_context(Address::from(CREATOR_ACC));
        ctx.set_parameter(&param_bytes);

        let ret: ContractResult<SaleHandle> =
            contract_create_sale(&ctx, &mut host, creation_fee(), &mut logger);
        claim_eq!(ret, Ok(1));
        let ret: ContractResult<SaleHandle> =
            contract_create_sale(&ctx, &mut host, creation_fee(), &mut logger);
        claim_eq!(ret, Ok(2));
        claim_eq!(logger.logs.len(), 2);

        let record = host
            .state()
            .sales
            .get(&1)
            .expect_report("handle 1 not registered");
        claim_eq!(record.creator, CREATOR_ACC);
        claim_eq!(record.config, sale_config());
    }

    #[concordium_test]
    fn test_create_sale_fee_not_paid() {
        let mut host = initial_host();
        let mut logger = TestLogger::init();

        let params = CreateSaleParams {
            config: sale_config(),
        };
        let param_bytes = to_bytes(&params);
        let mut ctx = receive_context(Address::from(CREATOR_ACC));
        ctx.set_parameter(&param_bytes);

        let ret: ContractResult<SaleHandle> = contract_create_sale(
            &ctx,
            &mut host,
            creation_fee() - Amount::from_micro_ccd(1),
            &mut logger,
        );
        claim_eq!(ret, Err(CustomContractError::CreationFeeNotPaid.into()));
    }

    #[concordium_test]
    /// A structurally broken configuration never gets a handle.
    fn test_create_sale_invalid_config() {
        let mut host = initial_host();
        let mut logger = TestLogger::init();

        let mut config = sale_config();
        config.min_buy_per_user = config.max_buy_per_user + 1;
        let params = CreateSaleParams { config };
        let param_bytes = to_bytes(&params);
        let mut ctx = receive_context(Address::from(CREATOR_ACC));
        ctx.set_parameter(&param_bytes);

        let ret: ContractResult<SaleHandle> =
            contract_create_sale(&ctx, &mut host, creation_fee(), &mut logger);
        claim_eq!(
            ret,
            Err(CustomContractError::InvalidConfiguration.into())
        );
        claim_eq!(host.state().next_handle, 1);
    }

    #[concordium_test]
    fn test_withdraw_fees() {
        let mut host = initial_host();
        host.set_self_balance(Amount::from_micro_ccd(100_000_000));

        let ctx = receive_context(Address::from(CREATOR_ACC));
        let ret: ContractResult<()> = contract_withdraw_fees(&ctx, &mut host);
        claim_eq!(ret, Err(ContractError::Unauthorized));

        let ctx = receive_context(Address::from(OWNER_ACC));
        let ret: ContractResult<()> = contract_withdraw_fees(&ctx, &mut host);
        claim!(ret.is_ok(), "Results in rejection");
        claim_eq!(
            host.get_transfers(),
            [(OWNER_ACC, Amount::from_micro_ccd(100_000_000))]
        );
    }

    #[concordium_test]
    fn test_view_sale_unknown_handle() {
        let host = initial_host();

        let handle: SaleHandle = 7;
        let param_bytes = to_bytes(&handle);
        let mut ctx = receive_context(Address::from(CREATOR_ACC));
        ctx.set_parameter(&param_bytes);

        let ret = contract_view_sale(&ctx, &host);
        claim!(ret.is_err(), "Unknown handle should reject");
    }
}
