use crate::state::{State, *};
use concordium_std::*;

#[derive(Debug, Serialize, SchemaType)]
struct InfoResponse {
    creator: AccountAddress,
    config: SaleConfig,
}

/// The immutable sale parameters.
#[receive(contract = "presale_launch", name = "info", return_value = "InfoResponse")]
fn contract_info<S: HasStateApi>(
    _ctx: &impl HasReceiveContext,
    host: &impl HasHost<State<S>, StateApiType = S>,
) -> ReceiveResult<InfoResponse> {
    let state = host.state();

    Ok(InfoResponse {
        creator: state.creator,
        config: state.config.clone(),
    })
}

// ------------------------------------------

#[derive(Debug, Serialize, SchemaType)]
struct Slot0Response {
    total_fund_received: FundAmount,
    total_sale_token_sold: ContractTokenAmount,
    protocol_addr: AccountAddress,
    finalized: bool,
}

/// The hot mutable slice of the ledger, cheap to poll.
#[receive(contract = "presale_launch", name = "slot0", return_value = "Slot0Response")]
fn contract_slot0<S: HasStateApi>(
    _ctx: &impl HasReceiveContext,
    host: &impl HasHost<State<S>, StateApiType = S>,
) -> ReceiveResult<Slot0Response> {
    let state = host.state();

    Ok(Slot0Response {
        total_fund_received: state.ledger.total_fund_received,
        total_sale_token_sold: state.ledger.total_sale_token_sold,
        protocol_addr: state.ledger.protocol_addr,
        finalized: state.ledger.finalized,
    })
}

// ------------------------------------------

#[derive(Debug, Serialize, SchemaType)]
struct ViewResponse {
    creator: AccountAddress,
    liquidity_addr: Address,
    burn_addr: Address,
    finalize_auth: FinalizeAuth,
    paused: bool,
    config: SaleConfig,
    total_fund_received: FundAmount,
    total_sale_token_sold: ContractTokenAmount,
    finalized: bool,
    failed: bool,
    sale_token_deposited: Option<ContractTokenAmount>,
}

#[receive(contract = "presale_launch", name = "view", return_value = "ViewResponse")]
fn contract_view<S: HasStateApi>(
    _ctx: &impl HasReceiveContext,
    host: &impl HasHost<State<S>, StateApiType = S>,
) -> ReceiveResult<ViewResponse> {
    let state = host.state();

    Ok(ViewResponse {
        creator: state.creator,
        liquidity_addr: state.liquidity_addr,
        burn_addr: state.burn_addr,
        finalize_auth: state.finalize_auth,
        paused: state.paused,
        config: state.config.clone(),
        total_fund_received: state.ledger.total_fund_received,
        total_sale_token_sold: state.ledger.total_sale_token_sold,
        finalized: state.ledger.finalized,
        failed: state.ledger.failed,
        sale_token_deposited: state.ledger.sale_token_deposited,
    })
}

// ------------------------------------------

type ViewContributorsResponse = Vec<(AccountAddress, Contribution)>;

#[receive(
    contract = "presale_launch",
    name = "viewContributors",
    return_value = "ViewContributorsResponse"
)]
fn contract_view_contributors<S: HasStateApi>(
    _ctx: &impl HasReceiveContext,
    host: &impl HasHost<State<S>, StateApiType = S>,
) -> ReceiveResult<ViewContributorsResponse> {
    let state = host.state();

    let mut ret: Vec<(AccountAddress, Contribution)> = Vec::new();
    for (addr, contribution) in state.ledger.contributions.iter() {
        ret.push((*addr, contribution.clone()));
    }

    Ok(ret)
}

// ------------------------------------------

/// The caller's own cumulative position.
#[receive(
    contract = "presale_launch",
    name = "viewContribution",
    return_value = "Contribution"
)]
fn contract_view_contribution<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &impl HasHost<State<S>, StateApiType = S>,
) -> ReceiveResult<Contribution> {
    let state = host.state();
    let contributor = if let Address::Account(addr) = ctx.sender() {
        addr
    } else {
        bail!(ContractError::Unauthorized.into())
    };

    let contribution = state
        .contribution_of(&contributor)
        .ok_or(ContractError::from(CustomContractError::NotContributed))?;

    Ok(contribution)
}

#[concordium_cfg_test]
mod tests {
    use super::*;
    use crate::sctest::init_parameter;
    use concordium_std::test_infrastructure::*;

    fn view_host(
        params: &crate::InitParams,
    ) -> TestHost<State<TestStateApi>> {
        let mut state_builder = TestStateBuilder::new();
        let state = State::new(
            &mut state_builder,
            params.creator,
            params.protocol_addr,
            params.liquidity_addr,
            params.burn_addr,
            params.finalize_auth,
            params.config.clone(),
        );
        TestHost::new(state, state_builder)
    }

    #[concordium_test]
    /// A freshly created sale reports exactly the configuration it was
    /// given.
    fn test_info_round_trips_configuration() {
        let params = init_parameter(FundAsset::Native, RefundPolicy::Burn);
        let host = view_host(&params);

        let ctx = TestReceiveContext::empty();
        let response = contract_info(&ctx, &host).expect_report("info failed");
        claim_eq!(response.creator, params.creator);
        claim_eq!(response.config, params.config);
    }

    #[concordium_test]
    fn test_slot0_snapshot() {
        let params = init_parameter(FundAsset::Native, RefundPolicy::ReturnToCreator);
        let mut host = view_host(&params);

        let ctx = TestReceiveContext::empty();
        let response = contract_slot0(&ctx, &host).expect_report("slot0 failed");
        claim_eq!(response.total_fund_received, 0);
        claim_eq!(response.total_sale_token_sold, 0.into());
        claim_eq!(response.protocol_addr, params.protocol_addr);
        claim!(!response.finalized);

        // 2 units at 0.2 show up in the snapshot unchanged.
        host.state_mut()
            .contribute(
                Timestamp::from_timestamp_millis(15),
                &AccountAddress([10u8; 32]),
                2_000_000,
            )
            .expect_report("contribute failed");

        let response = contract_slot0(&ctx, &host).expect_report("slot0 failed");
        claim_eq!(response.total_fund_received, 2_000_000);
        claim_eq!(response.total_sale_token_sold, 400_000.into());
        claim!(!response.finalized);
    }
}
