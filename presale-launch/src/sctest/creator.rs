use concordium_std::concordium_cfg_test;

#[concordium_cfg_test]
mod tests {
    use crate::sctest::*;

    /// Hard-cap entitlement (0.2 * hard_cap) plus listing liquidity
    /// (0.2 * 0.5 * hard_cap).
    const REQUIRED_INVENTORY: u64 = 200_000_000 + 100_000_000;

    fn deposit_context<'a>(slot_time: Timestamp) -> TestReceiveContext<'a> {
        let mut ctx = receive_context(Address::from(SALE_TOKEN), slot_time);
        ctx.set_invoker(CREATOR_ACC);
        ctx
    }

    #[concordium_test]
    fn test_deposit_tokens() {
        let mut state_builder = TestStateBuilder::new();
        let state = initial_state(
            &mut state_builder,
            FundAsset::Native,
            RefundPolicy::ReturnToCreator,
        );
        let mut host = TestHost::new(state, state_builder);

        let params = token_receive_params(CREATOR_ACC, REQUIRED_INVENTORY - 1);
        let mut ctx = deposit_context(on_sale());
        ctx.set_parameter(&params);
        let ret: ContractResult<()> = contract_deposit_tokens(&ctx, &mut host);
        claim_eq!(ret, Err(CustomContractError::NotMatchAmount.into()));

        let params = token_receive_params(CREATOR_ACC, REQUIRED_INVENTORY);
        let mut ctx = deposit_context(on_sale());
        ctx.set_parameter(&params);
        let ret: ContractResult<()> = contract_deposit_tokens(&ctx, &mut host);
        claim!(ret.is_ok(), "Results in rejection");
        claim_eq!(
            host.state().ledger.sale_token_deposited,
            Some(REQUIRED_INVENTORY.into())
        );

        let ret: ContractResult<()> = contract_deposit_tokens(&ctx, &mut host);
        claim_eq!(ret, Err(CustomContractError::AlreadyDeposited.into()));
    }

    #[concordium_test]
    fn test_deposit_tokens_wrong_invoker() {
        let intruder = new_account();
        let mut state_builder = TestStateBuilder::new();
        let state = initial_state(
            &mut state_builder,
            FundAsset::Native,
            RefundPolicy::ReturnToCreator,
        );
        let mut host = TestHost::new(state, state_builder);

        let params = token_receive_params(intruder, REQUIRED_INVENTORY);
        let mut ctx = receive_context(Address::from(SALE_TOKEN), on_sale());
        ctx.set_invoker(intruder);
        ctx.set_parameter(&params);
        let ret: ContractResult<()> = contract_deposit_tokens(&ctx, &mut host);
        claim_eq!(ret, Err(ContractError::Unauthorized));
    }

    /// A sale with one contribution of `raised` and the full inventory
    /// escrowed, ready to settle.
    fn funded_sale(
        raised: FundAmount,
        refund_policy: RefundPolicy,
    ) -> (TestHost<State<TestStateApi>>, AccountAddress) {
        let user = new_account();
        let mut state_builder = TestStateBuilder::new();
        let state = initial_state(&mut state_builder, FundAsset::Native, refund_policy);
        let mut host = TestHost::new(state, state_builder);
        let mut logger = TestLogger::init();

        let ctx = receive_context(Address::from(user), on_sale());
        let ret: ContractResult<()> = contract_buy(
            &ctx,
            &mut host,
            Amount::from_micro_ccd(raised),
            &mut logger,
        );
        claim!(ret.is_ok(), "Results in rejection");

        host.state_mut().ledger.sale_token_deposited = Some(REQUIRED_INVENTORY.into());
        host.set_self_balance(Amount::from_micro_ccd(raised));
        host.setup_mock_entrypoint(
            SALE_TOKEN,
            OwnedEntrypointName::new_unchecked("transfer".into()),
            MockFn::returning_ok(()),
        );
        (host, user)
    }

    #[concordium_test]
    /// Settling 20M raised: 5% protocol fee, half into liquidity, the
    /// rest to the creator.
    fn test_finalize() {
        let (mut host, _) = funded_sale(20_000_000, RefundPolicy::ReturnToCreator);
        let mut logger = TestLogger::init();
        let caller = new_account();

        let ctx = receive_context(Address::from(caller), on_sale());
        let ret: ContractResult<()> = contract_finalize(&ctx, &mut host, &mut logger);
        claim_eq!(ret, Err(CustomContractError::SaleNotEnded.into()));

        let ctx = receive_context(Address::from(caller), after_sale());
        let ret: ContractResult<()> = contract_finalize(&ctx, &mut host, &mut logger);
        claim!(ret.is_ok(), "Results in rejection");
        claim!(host.state().ledger.finalized);

        let liquidity_acc = match LIQUIDITY_ADDR {
            Address::Account(acc) => acc,
            _ => unreachable!(),
        };
        claim_eq!(
            host.get_transfers(),
            [
                (PROTOCOL_ACC, Amount::from_micro_ccd(1_000_000)),
                (liquidity_acc, Amount::from_micro_ccd(10_000_000)),
                (CREATOR_ACC, Amount::from_micro_ccd(9_000_000)),
            ]
        );
        claim_eq!(logger.logs.len(), 1);

        let ret: ContractResult<()> = contract_finalize(&ctx, &mut host, &mut logger);
        claim_eq!(ret, Err(CustomContractError::AlreadyFinalized.into()));
    }

    #[concordium_test]
    /// A fully subscribed sale settles before its scheduled end.
    fn test_finalize_early_on_hard_cap() {
        let mut state_builder = TestStateBuilder::new();
        let mut state = initial_state(
            &mut state_builder,
            FundAsset::Native,
            RefundPolicy::ReturnToCreator,
        );
        state.ledger.total_fund_received = HARD_CAP;
        state.ledger.total_sale_token_sold = (HARD_CAP / 5).into();
        state.ledger.sale_token_deposited = Some(REQUIRED_INVENTORY.into());
        let mut host = TestHost::new(state, state_builder);
        let mut logger = TestLogger::init();
        host.set_self_balance(Amount::from_micro_ccd(HARD_CAP));
        host.setup_mock_entrypoint(
            SALE_TOKEN,
            OwnedEntrypointName::new_unchecked("transfer".into()),
            MockFn::returning_ok(()),
        );

        let caller = new_account();
        let ctx = receive_context(Address::from(caller), on_sale());
        let ret: ContractResult<()> = contract_finalize(&ctx, &mut host, &mut logger);
        claim!(ret.is_ok(), "Results in rejection");
        claim!(host.state().ledger.finalized);
    }

    #[concordium_test]
    fn test_finalize_below_soft_cap() {
        let (mut host, _) = funded_sale(SOFT_CAP - 1, RefundPolicy::ReturnToCreator);
        let mut logger = TestLogger::init();
        let caller = new_account();

        let ctx = receive_context(Address::from(caller), after_sale());
        let ret: ContractResult<()> = contract_finalize(&ctx, &mut host, &mut logger);
        claim_eq!(ret, Err(CustomContractError::SoftCapNotReached.into()));
    }

    #[concordium_test]
    fn test_finalize_without_inventory() {
        let user = new_account();
        let mut state_builder = TestStateBuilder::new();
        let state = initial_state(
            &mut state_builder,
            FundAsset::Native,
            RefundPolicy::ReturnToCreator,
        );
        let mut host = TestHost::new(state, state_builder);
        let mut logger = TestLogger::init();

        let ctx = receive_context(Address::from(user), on_sale());
        let ret: ContractResult<()> = contract_buy(
            &ctx,
            &mut host,
            Amount::from_micro_ccd(SOFT_CAP),
            &mut logger,
        );
        claim!(ret.is_ok(), "Results in rejection");

        let ctx = receive_context(Address::from(user), after_sale());
        let ret: ContractResult<()> = contract_finalize(&ctx, &mut host, &mut logger);
        claim_eq!(ret, Err(CustomContractError::TokensNotDeposited.into()));
    }

    #[concordium_test]
    /// Under `CreatorOnly` authorization only the creator settles.
    fn test_finalize_creator_only() {
        let (mut host, _) = funded_sale(20_000_000, RefundPolicy::ReturnToCreator);
        host.state_mut().finalize_auth = FinalizeAuth::CreatorOnly;
        let mut logger = TestLogger::init();

        let stranger = new_account();
        let ctx = receive_context(Address::from(stranger), after_sale());
        let ret: ContractResult<()> = contract_finalize(&ctx, &mut host, &mut logger);
        claim_eq!(ret, Err(ContractError::Unauthorized));

        let ctx = receive_context(Address::from(CREATOR_ACC), after_sale());
        let ret: ContractResult<()> = contract_finalize(&ctx, &mut host, &mut logger);
        claim!(ret.is_ok(), "Results in rejection");
    }

    #[concordium_test]
    /// Failing a sale below soft cap disposes the escrow and blocks a
    /// later finalize.
    fn test_mark_failed() {
        let (mut host, _) = funded_sale(SOFT_CAP - 1, RefundPolicy::ReturnToCreator);
        let mut logger = TestLogger::init();
        let caller = new_account();

        let ctx = receive_context(Address::from(caller), on_sale());
        let ret: ContractResult<()> = contract_mark_failed(&ctx, &mut host, &mut logger);
        claim_eq!(ret, Err(CustomContractError::SaleNotEnded.into()));

        let ctx = receive_context(Address::from(caller), after_sale());
        let ret: ContractResult<()> = contract_mark_failed(&ctx, &mut host, &mut logger);
        claim!(ret.is_ok(), "Results in rejection");
        claim!(host.state().ledger.failed);
        claim_eq!(logger.logs.len(), 1);

        let ret: ContractResult<()> = contract_finalize(&ctx, &mut host, &mut logger);
        claim_eq!(ret, Err(CustomContractError::AlreadyFinalized.into()));
    }

    #[concordium_test]
    fn test_mark_failed_above_soft_cap() {
        let (mut host, _) = funded_sale(SOFT_CAP, RefundPolicy::ReturnToCreator);
        let mut logger = TestLogger::init();
        let caller = new_account();

        let ctx = receive_context(Address::from(caller), after_sale());
        let ret: ContractResult<()> = contract_mark_failed(&ctx, &mut host, &mut logger);
        claim_eq!(ret, Err(CustomContractError::SoftCapReached.into()));
    }
}
