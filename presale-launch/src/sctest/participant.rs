use concordium_std::concordium_cfg_test;

#[concordium_cfg_test]
mod tests {
    use crate::sctest::*;

    #[concordium_test]
    /// Buying 2 funding units at a rate of 0.2 sells 0.4 sale tokens.
    fn test_buy_native() {
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
        let ret: ContractResult<()> =
            contract_buy(&ctx, &mut host, Amount::from_micro_ccd(2_000_000), &mut logger);
        claim!(ret.is_ok(), "Results in rejection");

        let state = host.state();
        claim_eq!(state.ledger.total_fund_received, 2_000_000);
        claim_eq!(state.ledger.total_sale_token_sold, 400_000.into());
        let contribution = state.contribution_of(&user).expect_report("no position");
        claim_eq!(contribution.amount, 2_000_000);
        claim!(!contribution.claimed);
        claim_eq!(logger.logs.len(), 1);
    }

    #[concordium_test]
    /// Equal contributions through either entrypoint leave the same ledger.
    fn test_buy_with_token_matches_native() {
        let user = new_account();
        let mut state_builder = TestStateBuilder::new();
        let state = initial_state(
            &mut state_builder,
            FundAsset::Token(FUND_TOKEN),
            RefundPolicy::ReturnToCreator,
        );
        let mut host = TestHost::new(state, state_builder);
        let mut logger = TestLogger::init();

        let params = token_receive_params(user, 2_000_000);
        let mut ctx = receive_context(Address::from(FUND_TOKEN), on_sale());
        ctx.set_parameter(&params);

        let ret: ContractResult<()> = contract_buy_with_token(&ctx, &mut host, &mut logger);
        claim!(ret.is_ok(), "Results in rejection");

        let state = host.state();
        claim_eq!(state.ledger.total_fund_received, 2_000_000);
        claim_eq!(state.ledger.total_sale_token_sold, 400_000.into());
        let contribution = state.contribution_of(&user).expect_report("no position");
        claim_eq!(contribution.amount, 2_000_000);
    }

    #[concordium_test]
    /// The token entrypoint only accepts the configured fund token.
    fn test_buy_with_token_wrong_sender() {
        let user = new_account();
        let mut state_builder = TestStateBuilder::new();
        let state = initial_state(
            &mut state_builder,
            FundAsset::Token(FUND_TOKEN),
            RefundPolicy::ReturnToCreator,
        );
        let mut host = TestHost::new(state, state_builder);
        let mut logger = TestLogger::init();

        let params = token_receive_params(user, 2_000_000);
        let mut ctx = receive_context(Address::from(SALE_TOKEN), on_sale());
        ctx.set_parameter(&params);

        let ret: ContractResult<()> = contract_buy_with_token(&ctx, &mut host, &mut logger);
        claim_eq!(ret, Err(ContractError::Unauthorized));
    }

    #[concordium_test]
    /// Native value is rejected when the sale is funded by a token.
    fn test_buy_wrong_fund_asset() {
        let user = new_account();
        let mut state_builder = TestStateBuilder::new();
        let state = initial_state(
            &mut state_builder,
            FundAsset::Token(FUND_TOKEN),
            RefundPolicy::ReturnToCreator,
        );
        let mut host = TestHost::new(state, state_builder);
        let mut logger = TestLogger::init();

        let ctx = receive_context(Address::from(user), on_sale());
        let ret: ContractResult<()> =
            contract_buy(&ctx, &mut host, Amount::from_micro_ccd(2_000_000), &mut logger);
        claim_eq!(
            ret,
            Err(CustomContractError::FundAssetMismatch.into())
        );
    }

    #[concordium_test]
    fn test_buy_outside_window() {
        let user = new_account();
        let mut state_builder = TestStateBuilder::new();
        let state = initial_state(
            &mut state_builder,
            FundAsset::Native,
            RefundPolicy::ReturnToCreator,
        );
        let mut host = TestHost::new(state, state_builder);
        let mut logger = TestLogger::init();

        let ctx = receive_context(Address::from(user), Timestamp::from_timestamp_millis(5));
        let ret: ContractResult<()> =
            contract_buy(&ctx, &mut host, Amount::from_micro_ccd(2_000_000), &mut logger);
        claim_eq!(ret, Err(CustomContractError::SaleNotStarted.into()));

        // The end bound is exclusive.
        let ctx = receive_context(Address::from(user), sale_end());
        let ret: ContractResult<()> =
            contract_buy(&ctx, &mut host, Amount::from_micro_ccd(2_000_000), &mut logger);
        claim_eq!(ret, Err(CustomContractError::SaleEnded.into()));
    }

    #[concordium_test]
    /// The per-user ceiling applies to the cumulative position, not
    /// the single order.
    fn test_buy_bounds() {
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
        let ret: ContractResult<()> =
            contract_buy(&ctx, &mut host, Amount::from_micro_ccd(MIN_BUY - 1), &mut logger);
        claim_eq!(ret, Err(CustomContractError::BelowMinBuy.into()));

        let ret: ContractResult<()> =
            contract_buy(&ctx, &mut host, Amount::from_micro_ccd(MAX_BUY), &mut logger);
        claim!(ret.is_ok(), "Results in rejection");

        let ret: ContractResult<()> =
            contract_buy(&ctx, &mut host, Amount::from_micro_ccd(MIN_BUY), &mut logger);
        claim_eq!(ret, Err(CustomContractError::AboveMaxBuy.into()));

        // A rejected order leaves the ledger untouched.
        claim_eq!(host.state().ledger.total_fund_received, MAX_BUY);
    }

    #[concordium_test]
    /// Filling the hard cap exactly is allowed; one unit more is not.
    fn test_buy_hard_cap() {
        let mut state_builder = TestStateBuilder::new();
        let mut state = initial_state(
            &mut state_builder,
            FundAsset::Native,
            RefundPolicy::ReturnToCreator,
        );
        state.ledger.total_fund_received = HARD_CAP - MIN_BUY;
        let mut host = TestHost::new(state, state_builder);
        let mut logger = TestLogger::init();

        let filler = new_account();
        let ctx = receive_context(Address::from(filler), on_sale());
        let ret: ContractResult<()> =
            contract_buy(&ctx, &mut host, Amount::from_micro_ccd(MIN_BUY), &mut logger);
        claim!(ret.is_ok(), "Results in rejection");
        claim_eq!(host.state().ledger.total_fund_received, HARD_CAP);
        claim_eq!(
            host.state().ledger.total_sale_token_sold,
            (HARD_CAP / 5).into()
        );

        let late = new_account();
        let ctx = receive_context(Address::from(late), on_sale());
        let ret: ContractResult<()> =
            contract_buy(&ctx, &mut host, Amount::from_micro_ccd(MIN_BUY), &mut logger);
        claim_eq!(ret, Err(CustomContractError::HardCapExceeded.into()));
    }

    #[concordium_test]
    fn test_buy_rejected_while_paused() {
        let user = new_account();
        let mut state_builder = TestStateBuilder::new();
        let state = initial_state(
            &mut state_builder,
            FundAsset::Native,
            RefundPolicy::ReturnToCreator,
        );
        let mut host = TestHost::new(state, state_builder);
        let mut logger = TestLogger::init();

        let ctx = receive_context(Address::from(OWNER_ACC), on_sale());
        let ret: ContractResult<()> = contract_set_paused(&ctx, &mut host);
        claim!(ret.is_ok(), "Results in rejection");

        let ctx = receive_context(Address::from(user), on_sale());
        let ret: ContractResult<()> =
            contract_buy(&ctx, &mut host, Amount::from_micro_ccd(2_000_000), &mut logger);
        claim_eq!(ret, Err(CustomContractError::ContractPaused.into()));

        let ctx = receive_context(Address::from(OWNER_ACC), on_sale());
        let ret: ContractResult<()> = contract_set_unpaused(&ctx, &mut host);
        claim!(ret.is_ok(), "Results in rejection");

        let ctx = receive_context(Address::from(user), on_sale());
        let ret: ContractResult<()> =
            contract_buy(&ctx, &mut host, Amount::from_micro_ccd(2_000_000), &mut logger);
        claim!(ret.is_ok(), "Results in rejection");
    }

    #[concordium_test]
    /// A contributor reclaims exactly their cumulative position from a
    /// failed sale; a second attempt rejects.
    fn test_user_refund() {
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
        let ret: ContractResult<()> =
            contract_buy(&ctx, &mut host, Amount::from_micro_ccd(3_000_000), &mut logger);
        claim!(ret.is_ok(), "Results in rejection");
        host.set_self_balance(Amount::from_micro_ccd(3_000_000));

        let caller = new_account();
        let ctx = receive_context(Address::from(caller), after_sale());
        let ret: ContractResult<()> = contract_mark_failed(&ctx, &mut host, &mut logger);
        claim!(ret.is_ok(), "Results in rejection");

        let ctx = receive_context(Address::from(user), after_sale());
        let ret: ContractResult<()> = contract_user_refund(&ctx, &mut host, &mut logger);
        claim!(ret.is_ok(), "Results in rejection");
        claim_eq!(
            host.get_transfers(),
            [(user, Amount::from_micro_ccd(3_000_000))]
        );
        // Totals stay monotone after the position is gone.
        claim_eq!(host.state().ledger.total_fund_received, 3_000_000);
        claim!(host.state().contribution_of(&user).is_none());

        let ret: ContractResult<()> = contract_user_refund(&ctx, &mut host, &mut logger);
        claim_eq!(ret, Err(CustomContractError::NotContributed.into()));
    }

    #[concordium_test]
    /// Claims require a finalized sale and pay out once.
    fn test_user_claim() {
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
        let ret: ContractResult<()> = contract_user_claim(&ctx, &mut host);
        claim_eq!(ret, Err(CustomContractError::SaleNotFinalized.into()));

        host.state_mut().ledger.finalized = true;
        host.setup_mock_entrypoint(
            SALE_TOKEN,
            OwnedEntrypointName::new_unchecked("transfer".into()),
            MockFn::returning_ok(()),
        );

        let ret: ContractResult<()> = contract_user_claim(&ctx, &mut host);
        claim!(ret.is_ok(), "Results in rejection");
        claim!(
            host.state()
                .contribution_of(&user)
                .expect_report("no position")
                .claimed
        );

        let ret: ContractResult<()> = contract_user_claim(&ctx, &mut host);
        claim_eq!(ret, Err(CustomContractError::AlreadyClaimed.into()));
    }
}
